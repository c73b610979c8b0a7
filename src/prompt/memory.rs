//! Process memory checks
//!
//! Used before decryption to decide whether soft caches should be dropped,
//! and by readiness checks. A probe failure is treated as "unknown" and
//! never blocks the caller.

use sysinfo::{Pid, System};

const MB: u64 = 1024 * 1024;

/// Source of the current process's memory footprint
pub trait MemoryProbe: Send + Sync {
    /// Resident memory in bytes, or `None` when unavailable
    fn resident_bytes(&self) -> Option<u64>;
}

/// Reads resident memory of this process from the OS
#[derive(Debug, Default)]
pub struct SystemMemoryProbe;

impl MemoryProbe for SystemMemoryProbe {
    fn resident_bytes(&self) -> Option<u64> {
        let pid: Pid = sysinfo::get_current_pid().ok()?;
        let mut system = System::new();
        system.refresh_process(pid);
        system.process(pid).map(|process| process.memory())
    }
}

/// A fixed reading, for tests and diagnostics
#[derive(Debug, Clone, Copy)]
pub struct FixedMemoryProbe(pub Option<u64>);

impl MemoryProbe for FixedMemoryProbe {
    fn resident_bytes(&self) -> Option<u64> {
        self.0
    }
}

/// Memory thresholds in megabytes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryThresholds {
    /// Above this, soft caches are cleared before decrypting
    pub warn_mb: u64,
    /// Below this, the process counts as ready for a prompt
    pub ready_mb: u64,
}

impl Default for MemoryThresholds {
    fn default() -> Self {
        Self {
            warn_mb: 100,
            ready_mb: 200,
        }
    }
}

impl MemoryThresholds {
    /// Whether `bytes` exceeds the warning threshold
    pub fn is_under_pressure(&self, bytes: u64) -> bool {
        bytes > self.warn_mb.saturating_mul(MB)
    }

    /// Whether `bytes` is within the readiness bound
    pub fn is_ready(&self, bytes: u64) -> bool {
        bytes < self.ready_mb.saturating_mul(MB)
    }
}

/// Format a byte count as megabytes with two decimals
pub fn format_mb(bytes: u64) -> String {
    format!("{:.2} MB", bytes as f64 / MB as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_thresholds() {
        let thresholds = MemoryThresholds::default();
        assert!(!thresholds.is_under_pressure(100 * MB));
        assert!(thresholds.is_under_pressure(100 * MB + 1));
        assert!(thresholds.is_ready(199 * MB));
        assert!(!thresholds.is_ready(200 * MB));
    }

    #[test]
    fn test_huge_thresholds_saturate() {
        let thresholds = MemoryThresholds {
            warn_mb: u64::MAX,
            ready_mb: u64::MAX,
        };
        assert!(!thresholds.is_under_pressure(u64::MAX - 1));
        assert!(thresholds.is_ready(u64::MAX - 1));
    }

    #[test]
    fn test_system_probe_reports_something() {
        let bytes = SystemMemoryProbe.resident_bytes();
        assert!(bytes.map(|b| b > 0).unwrap_or(true));
    }

    #[test]
    fn test_format_mb() {
        assert_eq!(format_mb(3 * MB / 2), "1.50 MB");
    }
}
