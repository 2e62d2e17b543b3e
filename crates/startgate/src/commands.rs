//! Subcommand bodies. Each returns the process exit status.

use startgate_core::{DISPATCH_FAILED_EXIT_CODE, parse_host_list};
use startgate_dispatch::{DispatchConfig, Dispatcher};
use startgate_listener::{ListenerConfig, ListenerOutcome, ListenerSession};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::shutdown::TerminationSignals;

/// Run one listener session to completion.
pub async fn listen(config: ListenerConfig) -> u8 {
    let signals = TerminationSignals::install();

    let session = match ListenerSession::bind(config) {
        Ok(session) => session,
        Err(e) => {
            error!(error = %e, "listener could not start");
            return e.exit_code();
        }
    };

    let cancel = CancellationToken::new();
    let watcher = signals.cancel_on_signal(cancel.clone());
    let result = session.run(cancel).await;
    watcher.abort();

    match result {
        Ok(outcome) => {
            let code = outcome.exit_code();
            match outcome {
                ListenerOutcome::Released(reason) => {
                    info!(reason = reason.as_str(), code, "released, starting workload");
                }
                ListenerOutcome::TimedOut => {
                    info!(code, "timed out, starting workload without signal");
                }
                ListenerOutcome::Terminated => info!(code, "terminated"),
            }
            code
        }
        Err(e) => {
            error!(error = %e, "listener failed");
            e.exit_code()
        }
    }
}

/// Send the start signal to every host id in `host_ids` (comma-delimited).
pub async fn dispatch(network_prefix: &str, host_ids: &str, config: DispatchConfig) -> u8 {
    let hosts = parse_host_list(host_ids);
    if hosts.is_empty() {
        error!(host_ids, "no host ids given");
        return DISPATCH_FAILED_EXIT_CODE;
    }

    let report = Dispatcher::new(config)
        .dispatch(network_prefix, hosts.as_slice())
        .await;
    if report.is_success() {
        info!(workers = report.len(), "start messages sent successfully");
        return 0;
    }

    for outcome in report.failures() {
        if let Err(e) = &outcome.result {
            warn!(address = %outcome.address, error_kind = e.error_kind(), "worker missed");
        }
    }
    error!(
        failed = report.failed(),
        total = report.len(),
        "start signal not delivered to every worker"
    );
    DISPATCH_FAILED_EXIT_CODE
}
