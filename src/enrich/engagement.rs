// Engagement ratios per post.
//
// Splits each post's Facebook interactions into reaction, comment and share
// shares of the total. Downstream reports aggregate these by cluster label.

use serde_json::{json, Value};
use tracing::info;

use crate::records::Dataset;

pub const FIELD_REACTIONS: &str = "facebook_reactions";
pub const FIELD_SHARES: &str = "facebook_shares";
pub const FIELD_COMMENTS: &str = "facebook_comments";
pub const FIELD_TOTAL: &str = "total_interactions";

/// Ratios for one post: (reactions, comments, shares).
pub fn engagement_ratios(reactions: f64, shares: f64, comments: f64) -> (f64, f64, f64) {
    let total = reactions + shares + comments;
    let denom = if total == 0.0 { 1.0 } else { total };
    (reactions / denom, comments / denom, shares / denom)
}

/// Read a metric as a number. Numeric strings are accepted; anything else
/// counts as zero.
fn metric(value: Option<&Value>) -> f64 {
    match value {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(Value::String(s)) => s.trim().parse().unwrap_or(0.0),
        _ => 0.0,
    }
}

/// Add `ratio_reacciones`, `ratio_comentarios` and `ratio_shares` to every
/// record. Missing metric fields are created with value 0.
pub fn add_engagement_metrics(dataset: &mut Dataset) {
    let metric_fields = [FIELD_REACTIONS, FIELD_SHARES, FIELD_COMMENTS, FIELD_TOTAL];
    let missing: Vec<&str> = metric_fields
        .iter()
        .copied()
        .filter(|f| !dataset.has_field(f))
        .collect();

    for record in dataset.records_mut() {
        for field in &missing {
            record.insert(field.to_string(), json!(0));
        }
        let (r, c, s) = engagement_ratios(
            metric(record.get(FIELD_REACTIONS)),
            metric(record.get(FIELD_SHARES)),
            metric(record.get(FIELD_COMMENTS)),
        );
        record.insert("ratio_reacciones".to_string(), json!(r));
        record.insert("ratio_comentarios".to_string(), json!(c));
        record.insert("ratio_shares".to_string(), json!(s));
    }

    for field in missing
        .iter()
        .copied()
        .chain(["ratio_reacciones", "ratio_comentarios", "ratio_shares"])
    {
        dataset.add_column(field);
    }

    info!(records = dataset.len(), "Computed engagement ratios");
}
