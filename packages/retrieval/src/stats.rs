//! Informational counters for a collection run.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Counters for one district.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DistrictStats {
    /// Pages fetched and parsed.
    pub pages_fetched: u64,
    /// Pages whose fetch failed.
    pub page_errors: u64,
    /// Listings extracted from fetched pages.
    pub processed: u64,
    /// Listings that passed the validity filter.
    pub accepted: u64,
    /// Listings rejected by the validity filter.
    pub rejected: u64,
    /// Rejections keyed by reason kind, e.g. `"price too low"`.
    #[serde(default)]
    pub rejection_reasons: BTreeMap<String, u64>,
    /// Listing fragments that could not be parsed.
    pub parse_errors: u64,
}

impl DistrictStats {
    /// Counts one rejected listing under `kind`.
    pub fn record_rejection(&mut self, kind: &str) {
        self.rejected += 1;
        *self.rejection_reasons.entry(kind.to_string()).or_default() += 1;
    }

    /// Rejections counted under `kind`.
    #[must_use]
    pub fn rejections(&self, kind: &str) -> u64 {
        self.rejection_reasons.get(kind).copied().unwrap_or_default()
    }

    fn absorb(&mut self, other: &Self) {
        self.pages_fetched += other.pages_fetched;
        self.page_errors += other.page_errors;
        self.processed += other.processed;
        self.accepted += other.accepted;
        self.rejected += other.rejected;
        self.parse_errors += other.parse_errors;
        for (kind, count) in &other.rejection_reasons {
            *self.rejection_reasons.entry(kind.clone()).or_default() += count;
        }
    }
}

impl fmt::Display for DistrictStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} pages ({} failed), {} listings: {} accepted, {} rejected, {} unparseable",
            self.pages_fetched,
            self.page_errors,
            self.processed,
            self.accepted,
            self.rejected,
            self.parse_errors,
        )
    }
}

/// Counters for a whole run, keyed by district name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionStats {
    pub districts: BTreeMap<String, DistrictStats>,
    /// Whether the run stopped early on cancellation.
    pub cancelled: bool,
}

impl CollectionStats {
    /// Mutable counters of one district, created on first use.
    pub fn district_mut(&mut self, name: &str) -> &mut DistrictStats {
        self.districts.entry(name.to_string()).or_default()
    }

    /// Sum of all district counters.
    #[must_use]
    pub fn totals(&self) -> DistrictStats {
        let mut totals = DistrictStats::default();
        for stats in self.districts.values() {
            totals.absorb(stats);
        }
        totals
    }
}
