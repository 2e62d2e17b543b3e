//! One listener run: bind, wait for the controller, read until released.

use std::net::SocketAddr;
use std::time::Duration;

use startgate_core::{ControlMessage, DEFAULT_MESSAGE_CEILING, START_PORT, wire};
use tokio::net::{TcpListener, TcpSocket};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::ListenerError;
use crate::state::{ListenerEvent, ListenerOutcome, ListenerState};

/// Listener configuration.
#[derive(Clone, Debug)]
pub struct ListenerConfig {
    /// Address to bind, `0.0.0.0:50000` by default.
    pub bind_addr: SocketAddr,
    /// How long to wait for the controller to connect.
    pub idle_timeout: Duration,
    /// Non-matching messages tolerated before releasing anyway.
    pub message_ceiling: u32,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], START_PORT)),
            idle_timeout: Duration::from_secs(60),
            message_ceiling: DEFAULT_MESSAGE_CEILING,
        }
    }
}

/// A bound listener waiting for its start signal.
///
/// The session owns the listening socket and, once a peer connects, the
/// accepted stream. [`ListenerSession::run`] consumes the session, so both
/// sockets are closed by the time it returns, whatever the outcome.
pub struct ListenerSession {
    config: ListenerConfig,
    listener: TcpListener,
    local_addr: SocketAddr,
    state: ListenerState,
}

impl ListenerSession {
    /// Bind and start listening with a backlog of one.
    ///
    /// Must be called from within a tokio runtime.
    pub fn bind(config: ListenerConfig) -> Result<Self, ListenerError> {
        let ceiling = config.message_ceiling;
        let addr = config.bind_addr;
        let mut state = ListenerState::Idle;

        let socket = if addr.is_ipv4() {
            TcpSocket::new_v4()
        } else {
            TcpSocket::new_v6()
        }
        .map_err(ListenerError::Socket)?;
        socket.set_reuseaddr(true).map_err(ListenerError::Socket)?;
        socket
            .bind(addr)
            .map_err(|source| ListenerError::Bind { addr, source })?;
        state = state.transition(&ListenerEvent::Bound, ceiling)?;

        let listener = socket
            .listen(1)
            .map_err(|source| ListenerError::Bind { addr, source })?;
        state = state.transition(&ListenerEvent::Listening, ceiling)?;

        let local_addr = listener.local_addr().map_err(ListenerError::Socket)?;
        info!(
            addr = %local_addr,
            port = local_addr.port(),
            idle_timeout_secs = config.idle_timeout.as_secs(),
            "listening for start signal"
        );

        Ok(Self {
            config,
            listener,
            local_addr,
            state,
        })
    }

    /// Address the listening socket is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Current state.
    pub fn state(&self) -> ListenerState {
        self.state
    }

    /// Wait for the controller and read until released.
    ///
    /// Cancelling `cancel` models the termination signal: it preempts a
    /// pending accept or receive and yields [`ListenerOutcome::Terminated`].
    pub async fn run(mut self, cancel: CancellationToken) -> Result<ListenerOutcome, ListenerError> {
        let accepted = tokio::select! {
            biased;
            () = cancel.cancelled() => None,
            res = tokio::time::timeout(self.config.idle_timeout, self.listener.accept()) => Some(res),
        };

        let (mut stream, peer) = match accepted {
            None => {
                info!(state = %self.state, "termination requested, closing socket");
                self.apply(ListenerEvent::TerminationRequested)?;
                return self.close();
            }
            Some(Err(_elapsed)) => {
                info!(
                    idle_timeout_secs = self.config.idle_timeout.as_secs(),
                    "no connection before idle timeout, starting without signal"
                );
                self.apply(ListenerEvent::AcceptTimedOut)?;
                return self.close();
            }
            Some(Ok(Err(e))) => {
                warn!(error = %e, addr = %self.local_addr, "accept failed, closing socket");
                return Err(ListenerError::Accept(e));
            }
            Some(Ok(Ok(conn))) => conn,
        };

        self.apply(ListenerEvent::Accepted)?;
        info!(%peer, "controller connected");

        let mut ordinal = 0u32;
        while !self.state.is_terminal() {
            let event = tokio::select! {
                biased;
                () = cancel.cancelled() => {
                    info!(state = %self.state, %peer, "termination requested, closing sockets");
                    ListenerEvent::TerminationRequested
                }
                res = wire::receive(&mut stream) => match res {
                    Ok(Some(text)) => {
                        ordinal += 1;
                        let msg = ControlMessage::decode(&text);
                        info!(ordinal, message = %msg, "received message");
                        ListenerEvent::Message(msg)
                    }
                    Ok(None) => {
                        info!(%peer, "peer closed connection");
                        ListenerEvent::PeerClosed
                    }
                    Err(e) => {
                        warn!(%peer, error = %e, error_kind = e.error_kind(), "read failed");
                        ListenerEvent::ReadFailed
                    }
                },
            };
            self.apply(event)?;
        }

        drop(stream);
        self.close()
    }

    fn apply(&mut self, event: ListenerEvent) -> Result<(), ListenerError> {
        let next = self.state.transition(&event, self.config.message_ceiling)?;
        debug!(from = %self.state, to = %next, "listener transition");
        self.state = next;
        Ok(())
    }

    /// Drop the listening socket and report the terminal outcome.
    fn close(self) -> Result<ListenerOutcome, ListenerError> {
        let Self {
            listener, state, local_addr, ..
        } = self;
        drop(listener);

        let outcome = state.outcome().ok_or(ListenerError::InvalidTransition {
            state: state.name(),
            event: "close",
        })?;
        info!(state = %state, addr = %local_addr, "listener socket closed");
        Ok(outcome)
    }
}
