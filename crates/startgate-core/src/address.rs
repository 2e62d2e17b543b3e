//! Worker addressing.

use std::fmt;

/// Address of one worker's listening endpoint: `prefix.host_id`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct WorkerAddress {
    /// Network prefix shared by the fleet, e.g. `10.0`.
    pub prefix: String,
    /// Host part of the address, e.g. `1.23`.
    pub host_id: String,
}

impl WorkerAddress {
    /// Delimiter placed between prefix and host id.
    pub const DELIMITER: char = '.';

    /// Create an address from its two parts.
    pub fn new(prefix: impl Into<String>, host_id: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            host_id: host_id.into(),
        }
    }

    /// One address per host id, in input order. Duplicates are kept.
    pub fn for_hosts<S: AsRef<str>>(prefix: &str, host_ids: &[S]) -> Vec<Self> {
        host_ids
            .iter()
            .map(|id| Self::new(prefix, id.as_ref()))
            .collect()
    }

    /// The full host string handed to the resolver.
    pub fn host(&self) -> String {
        format!("{}{}{}", self.prefix, Self::DELIMITER, self.host_id)
    }
}

impl fmt::Display for WorkerAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.prefix, Self::DELIMITER, self.host_id)
    }
}

/// Split a comma-delimited host id list.
///
/// Whitespace around each entry is trimmed and empty entries are dropped, so
/// `"1.2, 1.3,,"` yields `["1.2", "1.3"]`.
pub fn parse_host_list(csv: &str) -> Vec<String> {
    csv.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn host_joins_with_dot() {
        let addr = WorkerAddress::new("127.0", "0.1");
        assert_eq!(addr.host(), "127.0.0.1");
        assert_eq!(addr.to_string(), "127.0.0.1");
    }

    #[test]
    fn for_hosts_preserves_order_and_duplicates() {
        let addrs = WorkerAddress::for_hosts("10.0", &["1.5", "1.6", "1.5"]);
        let hosts: Vec<String> = addrs.iter().map(WorkerAddress::host).collect();
        assert_eq!(hosts, ["10.0.1.5", "10.0.1.6", "10.0.1.5"]);
    }

    #[test]
    fn for_hosts_empty() {
        let none: [&str; 0] = [];
        assert!(WorkerAddress::for_hosts("10.0", &none).is_empty());
    }

    #[test]
    fn parse_host_list_trims_and_skips_empty() {
        assert_eq!(parse_host_list("1.2, 1.3,,"), ["1.2", "1.3"]);
        assert_eq!(parse_host_list("0.0.1"), ["0.0.1"]);
        assert!(parse_host_list("").is_empty());
        assert!(parse_host_list(" , ").is_empty());
    }
}
