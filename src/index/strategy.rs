//! Time-based physical segment resolution
//!
//! The strategy maps a logical dataset plus a record (writes) or a query
//! time range (reads) to physical segment names. Partitioning variants are
//! a capability set selected by configuration: each policy knows how to
//! label an instant, which interval it steps by, and which wildcard
//! pattern matches all of its partitions.
//!
//! Segment labels do not zero-pad date components, so a lexicographic sort
//! of segment names is not chronological. Callers ordering segments must
//! sort by parsed time.

use chrono::{DateTime, Datelike, TimeZone, Utc};
use tracing::debug;

use crate::index::interval::Interval;
use crate::index::metadata::IndexMetadata;
use crate::translate::Term;
use crate::types::cast_epoch_millis;

// ============================================================================
// Partition Policies
// ============================================================================

/// Partitioning policy of a logical dataset
///
/// Labels are computed in UTC so that segment resolution is a pure
/// function of the instant, independent of the host timezone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartitionPolicy {
    /// One segment per calendar day: `base_YYYY-M-D`
    Daily,
    /// One segment per week of year: `base_YYYY-woy-W`
    Weekly,
}

impl PartitionPolicy {
    /// Stable policy identifier
    pub fn id(&self) -> &'static str {
        match self {
            PartitionPolicy::Daily => "time-by-day",
            PartitionPolicy::Weekly => "time-by-week",
        }
    }

    /// Enumeration step between partition boundaries
    pub fn interval(&self) -> Interval {
        match self {
            PartitionPolicy::Daily => Interval::of_days(1),
            PartitionPolicy::Weekly => Interval::of_weeks(1),
        }
    }

    /// Wildcard pattern matching every partition of `base`
    pub fn pattern(&self, base: &str) -> String {
        match self {
            PartitionPolicy::Daily => format!("{base}_*-*"),
            PartitionPolicy::Weekly => format!("{base}_*-woy-*"),
        }
    }

    /// Calendar bucket label for an instant, appended to the base name
    fn label(&self, base: &str, time: DateTime<Utc>) -> String {
        match self {
            PartitionPolicy::Daily => {
                format!("{base}_{}-{}-{}", time.year(), time.month(), time.day())
            }
            PartitionPolicy::Weekly => {
                let week = time.iso_week();
                format!("{base}_{}-woy-{}", week.year(), week.week())
            }
        }
    }
}

// ============================================================================
// Index Strategy
// ============================================================================

/// Resolves physical segments for a logical dataset
#[derive(Debug, Clone, Copy)]
pub struct IndexStrategy {
    policy: PartitionPolicy,
}

impl IndexStrategy {
    /// Create a strategy with the given partitioning policy
    pub fn new(policy: PartitionPolicy) -> Self {
        Self { policy }
    }

    /// Daily partitioning
    pub fn time_by_day() -> Self {
        Self::new(PartitionPolicy::Daily)
    }

    /// Weekly partitioning
    pub fn time_by_week() -> Self {
        Self::new(PartitionPolicy::Weekly)
    }

    /// The configured policy
    pub fn policy(&self) -> PartitionPolicy {
        self.policy
    }

    /// Wildcard pattern matching every partition of the dataset
    pub fn pattern(&self, metadata: &IndexMetadata) -> String {
        self.policy.pattern(metadata.name())
    }

    /// Segment name for an explicit instant
    pub fn target_for_instant(&self, metadata: &IndexMetadata, epoch_millis: i64) -> String {
        let time = Utc
            .timestamp_millis_opt(epoch_millis)
            .single()
            .unwrap_or_else(Utc::now);
        self.policy.label(metadata.name(), time)
    }

    /// Resolve the segment a record should be written to.
    ///
    /// Uses the record's value under the dataset's timestamp property. A
    /// dataset without a timestamp property, a record lacking the value,
    /// or a value that cannot be coerced to an instant all fall back to
    /// wall-clock-time partitioning; resolution never fails.
    pub fn write_target(
        &self,
        metadata: &IndexMetadata,
        record: &serde_json::Map<String, serde_json::Value>,
    ) -> String {
        let instant = metadata
            .timestamp_property()
            .and_then(|prop| record.get(&prop.id))
            .and_then(cast_epoch_millis);
        match instant {
            Some(millis) => self.target_for_instant(metadata, millis),
            None => self
                .policy
                .label(metadata.name(), Utc::now()),
        }
    }

    /// Resolve the ordered segment list a query should read from.
    ///
    /// When the term tree pins the timestamp property to a concrete
    /// `[start, end]` range, every partition boundary within the inclusive
    /// range maps to one segment, ascending and duplicate-free. Otherwise
    /// a single wildcard pattern matching all partitions is returned.
    pub fn read_targets(&self, metadata: &IndexMetadata, terms: &[Term]) -> Vec<String> {
        let Some(prop) = metadata.timestamp_property() else {
            return vec![self.pattern(metadata)];
        };
        let Some((start, end)) = resolve_timestamp_range(&prop.id, terms) else {
            return vec![self.pattern(metadata)];
        };

        let mut seen = std::collections::HashSet::new();
        let mut segments = Vec::new();
        for boundary in self.policy.interval().iterate(start, end) {
            let segment = self.target_for_instant(metadata, boundary);
            if seen.insert(segment.clone()) {
                segments.push(segment);
            }
        }
        debug!(
            index = metadata.name(),
            start, end,
            segments = segments.len(),
            "resolved read targets"
        );
        segments
    }
}

/// Extract a concrete `[start, end]` bound on `property` from a term tree.
///
/// `btw` supplies both bounds at once, `eq` pins both to the same instant,
/// and `gt`/`gte` + `lt`/`lte` pairs combine. Unparseable bound values are
/// ignored rather than raised. Returns `None` unless both bounds resolve.
pub fn resolve_timestamp_range(property: &str, terms: &[Term]) -> Option<(i64, i64)> {
    let mut start = None;
    let mut end = None;
    collect_bounds(property, terms, &mut start, &mut end);
    match (start, end) {
        (Some(s), Some(e)) if s <= e => Some((s, e)),
        _ => None,
    }
}

fn collect_bounds(property: &str, terms: &[Term], start: &mut Option<i64>, end: &mut Option<i64>) {
    for term in terms {
        if term.column == property {
            match (term.operator.as_str(), term.value.as_ref()) {
                ("btw", Some(value)) => {
                    if let Some(range) = as_pair(value) {
                        *start = Some(range.0);
                        *end = Some(range.1);
                    }
                }
                ("eq", Some(value)) => {
                    if let Some(at) = cast_epoch_millis(value) {
                        *start = Some(at);
                        *end = Some(at);
                    }
                }
                ("gt" | "gte", Some(value)) => {
                    if let Some(at) = cast_epoch_millis(value) {
                        *start = Some(at);
                    }
                }
                ("lt" | "lte", Some(value)) => {
                    if let Some(at) = cast_epoch_millis(value) {
                        *end = Some(at);
                    }
                }
                _ => {}
            }
        }
        collect_bounds(property, &term.terms, start, end);
    }
}

fn as_pair(value: &serde_json::Value) -> Option<(i64, i64)> {
    match value {
        serde_json::Value::Array(items) if items.len() >= 2 => {
            let s = cast_epoch_millis(&items[0])?;
            let e = cast_epoch_millis(&items[1])?;
            Some((s, e))
        }
        serde_json::Value::String(s) => {
            let mut parts = s.splitn(2, ',');
            let a = cast_epoch_millis(&serde_json::Value::String(parts.next()?.to_string()))?;
            let b = cast_epoch_millis(&serde_json::Value::String(parts.next()?.to_string()))?;
            Some((a, b))
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::metadata::PropertyType;
    use serde_json::json;

    fn metadata() -> IndexMetadata {
        IndexMetadata::new("device_metrics")
            .unwrap()
            .add_property("timestamp", PropertyType::Date)
            .add_property("value", PropertyType::Double)
    }

    const DAY: i64 = 24 * 60 * 60 * 1000;
    // 2024-03-15T12:00:00Z
    const MARCH_15: i64 = 1_710_504_000_000;

    #[test]
    fn test_daily_write_target_from_record_time() {
        let strategy = IndexStrategy::time_by_day();
        let mut record = serde_json::Map::new();
        record.insert("timestamp".into(), json!(MARCH_15));
        assert_eq!(
            strategy.write_target(&metadata(), &record),
            "device_metrics_2024-3-15"
        );
    }

    #[test]
    fn test_daily_write_target_is_deterministic() {
        let strategy = IndexStrategy::time_by_day();
        let a = strategy.target_for_instant(&metadata(), MARCH_15);
        let b = strategy.target_for_instant(&metadata(), MARCH_15 + 60_000);
        assert_eq!(a, b);
        assert_eq!(a, "device_metrics_2024-3-15");
    }

    #[test]
    fn test_weekly_write_target() {
        let strategy = IndexStrategy::time_by_week();
        // 2024-03-15 is in ISO week 11 of 2024
        assert_eq!(
            strategy.target_for_instant(&metadata(), MARCH_15),
            "device_metrics_2024-woy-11"
        );
    }

    #[test]
    fn test_read_targets_enumerates_days() {
        let strategy = IndexStrategy::time_by_day();
        let terms = vec![Term::btw("timestamp", MARCH_15, MARCH_15 + 2 * DAY)];
        let segments = strategy.read_targets(&metadata(), &terms);
        assert_eq!(
            segments,
            vec![
                "device_metrics_2024-3-15",
                "device_metrics_2024-3-16",
                "device_metrics_2024-3-17",
            ]
        );
    }

    #[test]
    fn test_read_targets_are_duplicate_free() {
        let strategy = IndexStrategy::time_by_week();
        // ten days spans at most three distinct weeks
        let terms = vec![Term::btw("timestamp", MARCH_15, MARCH_15 + 10 * DAY)];
        let segments = strategy.read_targets(&metadata(), &terms);
        let unique: std::collections::HashSet<_> = segments.iter().collect();
        assert_eq!(unique.len(), segments.len());
        assert!(segments.len() >= 2);
    }

    #[test]
    fn test_read_targets_from_bound_pair() {
        let strategy = IndexStrategy::time_by_day();
        let terms = vec![
            Term::new("timestamp", "gte", json!(MARCH_15)),
            Term::new("timestamp", "lte", json!(MARCH_15 + DAY)),
        ];
        let segments = strategy.read_targets(&metadata(), &terms);
        assert_eq!(
            segments,
            vec!["device_metrics_2024-3-15", "device_metrics_2024-3-16"]
        );
    }

    #[test]
    fn test_read_targets_wildcard_without_range() {
        let strategy = IndexStrategy::time_by_day();
        let terms = vec![Term::eq("value", json!(42))];
        assert_eq!(
            strategy.read_targets(&metadata(), &terms),
            vec!["device_metrics_*-*"]
        );

        // lower bound alone is not a resolvable range
        let open = vec![Term::new("timestamp", "gte", json!(MARCH_15))];
        assert_eq!(
            strategy.read_targets(&metadata(), &open),
            vec!["device_metrics_*-*"]
        );
    }

    #[test]
    fn test_read_targets_wildcard_without_timestamp_property() {
        let strategy = IndexStrategy::time_by_week();
        let bare = IndexMetadata::new("events").unwrap();
        assert_eq!(
            strategy.read_targets(&bare, &[]),
            vec!["events_*-woy-*"]
        );
    }

    #[test]
    fn test_unparsable_record_timestamp_falls_back() {
        let strategy = IndexStrategy::time_by_day();
        let mut record = serde_json::Map::new();
        record.insert("timestamp".into(), json!("garbage"));
        // falls back to wall-clock partitioning, never raises
        let segment = strategy.write_target(&metadata(), &record);
        assert!(segment.starts_with("device_metrics_"));
    }

    #[test]
    fn test_out_of_range_timestamp_still_valid_segment() {
        let strategy = IndexStrategy::time_by_day();
        // year 3000, implausible but accepted
        let segment = strategy.target_for_instant(&metadata(), 32_503_680_000_000);
        assert_eq!(segment, "device_metrics_3000-1-1");
    }

    #[test]
    fn test_eq_term_pins_single_partition() {
        let strategy = IndexStrategy::time_by_day();
        let terms = vec![Term::eq("timestamp", json!(MARCH_15))];
        assert_eq!(
            strategy.read_targets(&metadata(), &terms),
            vec!["device_metrics_2024-3-15"]
        );
    }
}
