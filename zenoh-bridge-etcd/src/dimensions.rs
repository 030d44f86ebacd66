//! Dimension composition and instance keys.
//!
//! Every record carries an instance key of the form
//!
//! ```text
//! <member_id>[state=StateLeader,region=eu,To=8211f1d0f64f3269]
//! ```
//!
//! where the bracket holds the per-call dimensions merged with the
//! configured custom dimensions, optionally followed by the raw label block
//! of an exposition metric.

use std::collections::BTreeMap;

use crate::topology::Role;

/// Dimension set attached to a group of records.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Dimensions {
    entries: BTreeMap<String, String>,
}

impl Dimensions {
    /// Base dimensions for a cycle: `state=<role>`.
    pub fn for_role(role: Role) -> Self {
        Self::default().with("state", role.as_str())
    }

    /// Add or replace a dimension.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.entries.insert(key.into(), value.into());
        self
    }

    /// Merge configured custom dimensions. Colliding keys take the custom value.
    pub fn merge(mut self, custom: &BTreeMap<String, String>) -> Self {
        self.entries
            .extend(custom.iter().map(|(k, v)| (k.clone(), v.clone())));
        self
    }

    /// Render the bracketed dimension block.
    ///
    /// `extra` is a raw `k=v,...` label block appended verbatim when non-empty.
    pub fn render(&self, extra: &str) -> String {
        let mut pairs: Vec<String> = self
            .entries
            .iter()
            .map(|(k, v)| format!("{}={}", sanitize(k), sanitize(v)))
            .collect();

        if !extra.is_empty() {
            pairs.push(extra.to_string());
        }

        format!("[{}]", pairs.join(","))
    }

    /// Instance key for a record: `member_id` followed by the rendered block.
    pub fn instance_key(&self, member_id: &str, extra: &str) -> String {
        format!("{}{}", member_id, self.render(extra))
    }
}

/// Strip characters that may not appear inside the dimension block and
/// escape the pair separators, so `a="1,b=2"` never reads as two pairs.
fn sanitize(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            c if c.is_whitespace() => {}
            '"' | '\'' | '[' | ']' => {}
            '\\' | ',' | '=' => {
                out.push('\\');
                out.push(c);
            }
            c => out.push(c),
        }
    }
    out
}

/// Whether a dimension key or value renders unchanged.
pub fn is_plain(s: &str) -> bool {
    sanitize(s) == s
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    fn pairs(rendered: &str) -> BTreeSet<String> {
        rendered
            .trim_start_matches('[')
            .trim_end_matches(']')
            .split(',')
            .filter(|p| !p.is_empty())
            .map(str::to_string)
            .collect()
    }

    fn custom(items: &[(&str, &str)]) -> BTreeMap<String, String> {
        items
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_base_dimensions() {
        let dims = Dimensions::for_role(Role::Leader);
        assert_eq!(dims.render(""), "[state=StateLeader]");
        assert_eq!(
            dims.instance_key("10.0.0.1:2379", ""),
            "10.0.0.1:2379[state=StateLeader]"
        );
    }

    #[test]
    fn test_custom_dimensions_extend() {
        let dims =
            Dimensions::for_role(Role::Follower).merge(&custom(&[("region", "eu"), ("team", "db")]));

        assert_eq!(
            pairs(&dims.render("")),
            ["region=eu", "state=StateFollower", "team=db"]
                .iter()
                .map(|s| s.to_string())
                .collect::<BTreeSet<String>>()
        );
    }

    #[test]
    fn test_custom_dimensions_override() {
        let dims = Dimensions::for_role(Role::Follower).merge(&custom(&[("state", "pinned")]));
        assert_eq!(dims.render(""), "[state=pinned]");
    }

    #[test]
    fn test_extra_dimensions_appended() {
        let dims = Dimensions::for_role(Role::Leader);
        let rendered = dims.render("To=8211f1d0f64f3269,Kind=raft");
        assert_eq!(rendered, "[state=StateLeader,To=8211f1d0f64f3269,Kind=raft]");
    }

    #[test]
    fn test_whitespace_and_quotes_stripped() {
        let dims = Dimensions::default().with("data center", "\"us east\"");
        assert_eq!(dims.render(""), "[datacenter=useast]");
    }

    #[test]
    fn test_separators_escaped() {
        let dims = Dimensions::default().merge(&custom(&[("a", "1,b=2")]));
        assert_eq!(dims.render(""), r"[a=1\,b\=2]");

        assert!(is_plain("eu-west"));
        assert!(!is_plain("1,b=2"));
        assert!(!is_plain("us east"));
    }

    #[test]
    fn test_render_is_deterministic() {
        let a = Dimensions::for_role(Role::Leader).merge(&custom(&[("b", "2"), ("a", "1")]));
        let b = Dimensions::for_role(Role::Leader).merge(&custom(&[("a", "1"), ("b", "2")]));
        assert_eq!(a.render(""), b.render(""));
    }

    #[test]
    fn test_distinct_sets_render_distinctly() {
        let sets = [
            Dimensions::for_role(Role::Leader),
            Dimensions::for_role(Role::Follower),
            Dimensions::for_role(Role::Leader).with("follower", "10.0.0.2:2379"),
            Dimensions::for_role(Role::Leader).with("follower", "10.0.0.3:2379"),
            Dimensions::for_role(Role::Leader).with("region", "eu"),
            Dimensions::default().merge(&custom(&[("a", "1,b=2")])),
            Dimensions::default().merge(&custom(&[("a", "1"), ("b", "2")])),
            Dimensions::default().merge(&custom(&[("a=1", "2")])),
            Dimensions::default().merge(&custom(&[("a", "1=2")])),
        ];

        let rendered: BTreeSet<String> = sets.iter().map(|d| d.render("")).collect();
        assert_eq!(rendered.len(), sets.len());
    }
}
