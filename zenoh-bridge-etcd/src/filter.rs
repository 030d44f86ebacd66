//! Selection of optional metrics from the `/metrics` endpoint.
//!
//! Two mutually exclusive modes:
//! - enhanced: everything that was parsed, minus the exclude list;
//! - otherwise: only what the include list names.

use std::collections::{BTreeSet, HashMap};

use crate::exposition::ParsedMetric;

/// Include/exclude settings for optional metrics.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OptionalMetricFilter {
    enhanced: bool,
    include: BTreeSet<String>,
    exclude: BTreeSet<String>,
}

impl OptionalMetricFilter {
    pub fn new(enhanced: bool, include: BTreeSet<String>, exclude: BTreeSet<String>) -> Self {
        Self {
            enhanced,
            include,
            exclude,
        }
    }

    /// Whether the `/metrics` endpoint needs to be polled at all.
    pub fn is_active(&self) -> bool {
        self.enhanced || !self.include.is_empty()
    }

    /// Check if a raw metric key should be emitted.
    pub fn should_include(&self, raw_key: &str) -> bool {
        if self.enhanced {
            !self.exclude.contains(raw_key)
        } else {
            self.include.contains(raw_key)
        }
    }

    /// Select the metrics to emit from a parsed `/metrics` payload.
    pub fn select<'a>(&self, parsed: &'a HashMap<String, ParsedMetric>) -> Vec<&'a ParsedMetric> {
        if self.enhanced {
            parsed
                .values()
                .filter(|metric| self.should_include(&metric.raw_key))
                .collect()
        } else {
            self.include
                .iter()
                .filter_map(|raw_key| parsed.get(raw_key))
                .collect()
        }
    }
}
