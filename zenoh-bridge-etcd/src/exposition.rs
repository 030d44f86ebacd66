//! Parser for the text exposition format served on `/metrics`.
//!
//! Only two kinds of lines matter:
//!
//! ```text
//! # TYPE etcd_server_has_leader gauge
//! etcd_server_has_leader 1
//! etcd_network_peer_sent_bytes_total{To="8211f1d0f64f3269"} 3.1557e+06
//! ```
//!
//! A value line is only kept when its metric was declared by an earlier
//! `# TYPE` line. Histograms and summaries are rejected at declaration time,
//! so their bucket/quantile lines never match anything.

use std::collections::HashMap;

use crate::telemetry::MetricKind;

/// Kind declared by a `# TYPE` line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpositionKind {
    Counter,
    Gauge,
    /// Any other accepted declaration (e.g. `untyped`). Parsed but never emitted.
    Unsupported,
}

impl ExpositionKind {
    /// Parse a declared kind. Returns `None` for kinds that are rejected outright.
    fn from_declared(kind: &str) -> Option<Self> {
        match kind {
            "counter" => Some(Self::Counter),
            "gauge" => Some(Self::Gauge),
            "histogram" | "summary" => None,
            _ => Some(Self::Unsupported),
        }
    }

    /// Kind to emit the metric with, if it can be emitted at all.
    pub fn metric_kind(&self) -> Option<MetricKind> {
        match self {
            Self::Counter => Some(MetricKind::Counter),
            Self::Gauge => Some(MetricKind::Gauge),
            Self::Unsupported => None,
        }
    }
}

/// A metric read from the exposition text.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedMetric {
    /// Metric name as it appears in the text (`etcd_server_has_leader`).
    pub raw_key: String,
    /// Name used when emitting (`etcd.server.has.leader`).
    pub display_name: String,
    pub kind: ExpositionKind,
    pub value: f64,
    /// Label block without braces or quotes (`To=8211f1d0f64f3269`), possibly empty.
    pub dimensions: String,
}

#[derive(Debug)]
struct Declaration {
    display_name: String,
    kind: ExpositionKind,
}

/// Parse exposition text into a map keyed by raw metric name.
///
/// When a metric has several value lines the last one wins.
pub fn parse(text: &str) -> HashMap<String, ParsedMetric> {
    let mut declared: HashMap<String, Declaration> = HashMap::new();
    let mut metrics: HashMap<String, ParsedMetric> = HashMap::new();

    for line in text.lines() {
        let tokens: Vec<&str> = line.split_whitespace().collect();

        match tokens.as_slice() {
            ["#", "TYPE", raw_key, kind] => {
                let raw_key = raw_key.to_string();
                match ExpositionKind::from_declared(kind) {
                    Some(kind) => {
                        declared.insert(
                            raw_key.clone(),
                            Declaration {
                                display_name: raw_key.replace('_', "."),
                                kind,
                            },
                        );
                    }
                    None => {
                        tracing::trace!(metric = %raw_key, kind, "Dropping unsupported metric type");
                        declared.remove(&raw_key);
                    }
                }
                // A redeclaration starts over.
                metrics.remove(&raw_key);
            }
            [name_and_dims, value] if !name_and_dims.starts_with('#') => {
                let (name, dimensions) = split_dimensions(name_and_dims);

                let Some(declaration) = declared.get(name) else {
                    continue;
                };

                let value: f64 = match value.parse() {
                    Ok(v) => v,
                    Err(e) => {
                        tracing::warn!(metric = %name, value, error = %e, "Skipping metric with non-numeric value");
                        continue;
                    }
                };

                metrics.insert(
                    name.to_string(),
                    ParsedMetric {
                        raw_key: name.to_string(),
                        display_name: declaration.display_name.clone(),
                        kind: declaration.kind,
                        value,
                        dimensions,
                    },
                );
            }
            _ => {}
        }
    }

    metrics
}

/// Split `name{a="1",b="2"}` into `("name", "a=1,b=2")`.
fn split_dimensions(token: &str) -> (&str, String) {
    match token.split_once('{') {
        Some((name, rest)) => {
            let dimensions: String = rest.chars().filter(|c| *c != '}' && *c != '"').collect();
            (name, dimensions)
        }
        None => (token, String::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counter_with_dimensions() {
        let text = "# TYPE foo_bar counter\nfoo_bar{a=\"1\"} 42\n";
        let metrics = parse(text);

        assert_eq!(metrics.len(), 1);
        let metric = &metrics["foo_bar"];
        assert_eq!(metric.display_name, "foo.bar");
        assert_eq!(metric.kind, ExpositionKind::Counter);
        assert_eq!(metric.value, 42.0);
        assert_eq!(metric.dimensions, "a=1");
    }

    #[test]
    fn test_gauge_without_dimensions() {
        let text = "# HELP etcd_server_has_leader Whether or not a leader exists.\n\
                    # TYPE etcd_server_has_leader gauge\n\
                    etcd_server_has_leader 1\n";
        let metrics = parse(text);

        let metric = &metrics["etcd_server_has_leader"];
        assert_eq!(metric.display_name, "etcd.server.has.leader");
        assert_eq!(metric.kind, ExpositionKind::Gauge);
        assert_eq!(metric.value, 1.0);
        assert!(metric.dimensions.is_empty());
    }

    #[test]
    fn test_histogram_and_summary_dropped() {
        let text = "# TYPE x histogram\n\
                    x_bucket{le=\"0.5\"} 3\n\
                    x 7\n\
                    # TYPE y summary\n\
                    y{quantile=\"0.9\"} 0.2\n\
                    y 4\n";
        let metrics = parse(text);
        assert!(metrics.is_empty());
    }

    #[test]
    fn test_undeclared_value_dropped() {
        let text = "orphan_metric 5\n# TYPE declared gauge\ndeclared 1\n";
        let metrics = parse(text);

        assert_eq!(metrics.len(), 1);
        assert!(metrics.contains_key("declared"));
    }

    #[test]
    fn test_value_before_declaration_dropped() {
        let text = "late_metric 5\n# TYPE late_metric gauge\n";
        let metrics = parse(text);
        assert!(metrics.is_empty());
    }

    #[test]
    fn test_non_numeric_value_skips_only_that_metric() {
        let text = "# TYPE bad gauge\nbad not_a_number\n# TYPE good counter\ngood 3\n";
        let metrics = parse(text);

        assert!(!metrics.contains_key("bad"));
        assert_eq!(metrics["good"].value, 3.0);
    }

    #[test]
    fn test_untyped_metric_is_unsupported() {
        let text = "# TYPE misc untyped\nmisc 2\n";
        let metrics = parse(text);

        assert_eq!(metrics["misc"].kind, ExpositionKind::Unsupported);
        assert!(metrics["misc"].kind.metric_kind().is_none());
    }

    #[test]
    fn test_last_value_wins() {
        let text = "# TYPE peer_bytes counter\n\
                    peer_bytes{To=\"a\"} 1\n\
                    peer_bytes{To=\"b\"} 2\n";
        let metrics = parse(text);

        assert_eq!(metrics["peer_bytes"].value, 2.0);
        assert_eq!(metrics["peer_bytes"].dimensions, "To=b");
    }

    #[test]
    fn test_multiple_dimensions_and_exponent() {
        let text = "# TYPE grpc_requests counter\n\
                    grpc_requests{grpc_method=\"Range\",grpc_service=\"etcdserverpb.KV\"} 1.5e+03\n";
        let metrics = parse(text);

        let metric = &metrics["grpc_requests"];
        assert_eq!(metric.value, 1500.0);
        assert_eq!(
            metric.dimensions,
            "grpc_method=Range,grpc_service=etcdserverpb.KV"
        );
    }

    #[test]
    fn test_lines_with_timestamps_ignored() {
        let text = "# TYPE ts gauge\nts 1 1700000000000\n";
        assert!(parse(text).is_empty());
    }

    #[test]
    fn test_empty_input() {
        assert!(parse("").is_empty());
        assert!(parse("\n\n# just a comment\n").is_empty());
    }
}
