use std::fmt;

use rand::Rng;

/// Process identity stamped into account leases. Hostname plus pid
/// distinguishes workers across machines; the random suffix separates
/// a restarted process from an earlier holder of the same pid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerId(String);

impl WorkerId {
    pub fn generate() -> Self {
        let host = hostname
            ::get()
            .ok()
            .and_then(|h| h.into_string().ok())
            .unwrap_or_else(|| "unknown-host".to_string());
        let suffix: u16 = rand::rng().random();

        Self(format!("{}-{}-{:04x}", host, std::process::id(), suffix))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for WorkerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_worker_id_carries_pid_and_suffix() {
        let id = WorkerId::generate();
        let text = id.as_str();

        assert!(text.contains(&std::process::id().to_string()));

        let suffix = text.rsplit('-').next().unwrap();
        assert_eq!(suffix.len(), 4);
        assert!(suffix.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
