//! Synthesis of backend query strings
//!
//! Queries are built from the inside out: a `{label op "value", ...}`
//! selector over the intrinsic tags, a `rate(...)` wrapper when the metric
//! is counter-typed, and finally the requested aggregation function.

use crate::sanitize::{
    escape_matcher_value, sanitize_label_name, sanitize_label_value, sanitize_metric_name,
    METRIC_NAME_LABEL,
};
use crate::types::{tag_names, FetchRequest, Metric, Tag, TagMatcher};

/// Upper bound on data points per range query
///
/// The backend caps responses around 11,000 points; staying well under
/// that leaves margin for series fan-out. Deliberately conservative.
pub const MAX_SAMPLES_PER_QUERY: i64 = 1200;

/// Rate windows span `step * 2.1` so at least two raw samples fall inside
/// each window regardless of the backend's own scrape interval
const RATE_WINDOW_FACTOR: f64 = 2.1;

/// Metric-type values treated as counters
const COUNTER_TYPES: [&str; 2] = ["count", "counter"];

/// Render tag matchers as the body of a `{...}` selector
///
/// The `name` tag renders in the reserved metric-name label. Literal
/// equals/not-equals values are sanitized and backslash-escaped; regex
/// values pass through verbatim.
pub fn matchers_to_selector(matchers: &[TagMatcher]) -> String {
    let mut out = String::new();
    for matcher in matchers {
        let (label, value) = if matcher.key == tag_names::NAME {
            let value = if matcher.kind.is_regex() {
                matcher.value.clone()
            } else {
                escape_matcher_value(&sanitize_metric_name(&matcher.value))
            };
            (METRIC_NAME_LABEL.to_string(), value)
        } else {
            let value = if matcher.kind.is_regex() {
                matcher.value.clone()
            } else {
                escape_matcher_value(&sanitize_label_value(&matcher.value))
            };
            (sanitize_label_name(&matcher.key), value)
        };
        if !out.is_empty() {
            out.push_str(", ");
        }
        out.push_str(&label);
        out.push_str(matcher.kind.op());
        out.push('"');
        out.push_str(&value);
        out.push('"');
    }
    out
}

/// Render tags as an exact-match selector body
pub fn tags_to_selector<'a>(tags: impl IntoIterator<Item = &'a Tag>) -> String {
    let matchers: Vec<TagMatcher> = tags
        .into_iter()
        .map(|tag| TagMatcher::equals(tag.key.clone(), tag.value.clone()))
        .collect();
    matchers_to_selector(&matchers)
}

/// Build the full range-query expression for a fetch request
///
/// `resolved` must carry the metric's meta tags (from the metric cache or a
/// series lookup); the request's own metric typically lacks them.
pub fn build_range_query(request: &FetchRequest, resolved: &Metric) -> String {
    let mut query = format!(
        "{{{}}}",
        tags_to_selector(request.metric.intrinsic_tags.iter())
    );

    let mtype = resolved
        .first_tag_by_key(tag_names::MTYPE)
        .map(|t| t.value.as_str());
    if mtype.is_some_and(|t| COUNTER_TYPES.contains(&t)) {
        let interval = (step_seconds(request) as f64 * RATE_WINDOW_FACTOR) as i64;
        query = format!("rate({query}[{interval}s])");
    }

    if let Some(function) = request.aggregation.function() {
        query = format!("{function}({query})");
    }

    query
}

/// Determine the query step in seconds
///
/// The backend always aggregates in a range query, so step cannot be 0: an
/// explicit step wins, otherwise the smallest step that keeps the response
/// under [`MAX_SAMPLES_PER_QUERY`] points.
pub fn step_seconds(request: &FetchRequest) -> i64 {
    if request.step > 0 {
        return request.step;
    }
    let duration = request.end - request.start;
    let step = (duration as f64 / MAX_SAMPLES_PER_QUERY as f64).ceil();
    (step as i64).max(1)
}
