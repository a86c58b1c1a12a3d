//! Revealed-round vote statistics.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::votes::parse_numeric_value;

/// Aggregate statistics for a set of revealed votes.
///
/// Serialized field names match the wire protocol consumed by clients.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteStats {
    pub total: usize,
    pub value_breakdown: BTreeMap<String, usize>,
    pub most_common_value: String,
    pub agreement_percentage: f64,
    /// True iff every submitted vote carries the same value.
    pub consensus: bool,
    /// Mean of the numerically parseable votes; absent when none parse.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub average: Option<f64>,
}

/// Compute statistics over the given vote values.
///
/// Returns `None` for an empty vote set. Ties for the most common value
/// are broken by lexicographic order so the result is deterministic.
pub fn calculate_stats<'a, I>(values: I) -> Option<VoteStats>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut breakdown: BTreeMap<String, usize> = BTreeMap::new();
    let mut numeric_sum = 0.0;
    let mut numeric_count = 0usize;
    let mut total = 0usize;

    for value in values {
        *breakdown.entry(value.to_string()).or_insert(0) += 1;
        if let Some(num) = parse_numeric_value(value) {
            numeric_sum += num;
            numeric_count += 1;
        }
        total += 1;
    }

    if total == 0 {
        return None;
    }

    let (most_common_value, most_common_count) = breakdown
        .iter()
        .max_by(|a, b| a.1.cmp(b.1).then_with(|| b.0.cmp(a.0)))
        .map(|(value, count)| (value.clone(), *count))?;

    let agreement_percentage = (most_common_count as f64 / total as f64) * 100.0;

    Some(VoteStats {
        total,
        value_breakdown: breakdown,
        most_common_value,
        agreement_percentage,
        consensus: most_common_count == total,
        average: (numeric_count > 0).then(|| numeric_sum / numeric_count as f64),
    })
}
