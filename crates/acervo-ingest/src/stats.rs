//! Run statistics

use serde::Serialize;
use std::fmt;
use tracing::info;

/// Counters for one run, owned and advanced only by the orchestrator
///
/// Every counter is monotonically non-decreasing within a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunStats {
    /// Raw records returned by collectors
    pub collected: usize,
    /// Raw records that normalized into clean records
    pub validated: usize,
    /// Raw records the normalizer rejected
    pub rejected: usize,
    pub duplicates_skipped: usize,
    /// Clean records that passed dedup (accepted for insert)
    pub accepted: usize,
    pub inserted: usize,
    pub errors: usize,
    /// Accepted records dropped by the per-run cap
    pub truncated: usize,
    /// Batches attempted
    pub batches: usize,
    pub sources_failed: usize,
}

impl RunStats {
    /// Check the cross-counter relations that must hold once persistence ends
    pub fn check_invariants(&self) -> Result<(), String> {
        if self.collected != self.validated + self.rejected {
            return Err(format!(
                "collected ({}) != validated ({}) + rejected ({})",
                self.collected, self.validated, self.rejected
            ));
        }
        if self.validated != self.accepted + self.duplicates_skipped {
            return Err(format!(
                "validated ({}) != accepted ({}) + duplicates_skipped ({})",
                self.validated, self.accepted, self.duplicates_skipped
            ));
        }
        if self.inserted + self.errors + self.truncated > self.accepted {
            return Err(format!(
                "inserted ({}) + errors ({}) + truncated ({}) > accepted ({})",
                self.inserted, self.errors, self.truncated, self.accepted
            ));
        }
        Ok(())
    }

    pub fn log_summary(&self) {
        info!("Collected:          {}", self.collected);
        info!("Validated:          {}", self.validated);
        info!("Rejected:           {}", self.rejected);
        info!("Duplicates skipped: {}", self.duplicates_skipped);
        info!("Accepted:           {}", self.accepted);
        info!("Inserted:           {}", self.inserted);
        info!("Errors:             {}", self.errors);
        if self.truncated > 0 {
            info!("Left for next run:  {}", self.truncated);
        }
        if self.sources_failed > 0 {
            info!("Failed sources:     {}", self.sources_failed);
        }
    }
}

impl fmt::Display for RunStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "collected={} validated={} duplicates_skipped={} inserted={} errors={}",
            self.collected, self.validated, self.duplicates_skipped, self.inserted, self.errors
        )
    }
}
