//! Parsing of backend query responses
//!
//! Series lookups return `{"data": [{label: value, ...}, ...]}`; range
//! queries return `{"data": {"result": [{"metric": {...}, "values":
//! [[ts, "v"], ...]}, ...]}}`. A structurally valid "no results" response
//! parses to an empty list; a malformed response is a [`ParseError`],
//! never a panic or silently partial data. Field order is not assumed.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Deserialize;

use crate::error::ParseError;
use crate::sanitize::METRIC_NAME_LABEL;
use crate::types::{tag_names, Metric, Sample};

/// Label names mapped back to intrinsic tags when reconstructing metrics
const INTRINSIC_LABEL_NAMES: [&str; 2] = [tag_names::NAME, tag_names::RESOURCE_ID];

#[derive(Debug, Deserialize)]
struct SeriesResponse {
    #[serde(default)]
    data: Vec<BTreeMap<String, String>>,
}

#[derive(Debug, Default, Deserialize)]
struct RangeResponse {
    #[serde(default)]
    data: RangeData,
}

#[derive(Debug, Default, Deserialize)]
struct RangeData {
    #[serde(default)]
    result: Vec<RangeSeries>,
}

#[derive(Debug, Deserialize)]
struct RangeSeries {
    #[serde(default)]
    values: Vec<(f64, String)>,
}

/// Parse a series-lookup response into metrics
///
/// Each label set becomes one metric: the reserved name label becomes the
/// `name` intrinsic tag, known intrinsic label names stay intrinsic, and
/// everything else becomes a meta tag. External tags are not present on
/// the backend and are enriched separately from the tag store.
pub fn parse_series(json: &str) -> Result<Vec<Metric>, ParseError> {
    let response: SeriesResponse = serde_json::from_str(json)?;
    Ok(response.data.into_iter().map(labels_to_metric).collect())
}

fn labels_to_metric(labels: BTreeMap<String, String>) -> Metric {
    let mut builder = Metric::builder();
    for (name, value) in labels {
        if name == METRIC_NAME_LABEL {
            builder = builder.intrinsic_tag(tag_names::NAME, value);
        } else if INTRINSIC_LABEL_NAMES.contains(&name.as_str()) {
            builder = builder.intrinsic_tag(name, value);
        } else {
            builder = builder.meta_tag(name, value);
        }
    }
    builder.build()
}

/// Parse a range-query response into samples for a known metric
///
/// Aggregated results strip labels, so every sample carries the
/// caller-supplied `metric`. When the backend returns several series for
/// what the caller treats as one logical series, only the first is used;
/// the rest are ignored. This is a documented limitation, not an error.
pub fn parse_range(json: &str, metric: &Arc<Metric>) -> Result<Vec<Sample>, ParseError> {
    let response: RangeResponse = serde_json::from_str(json)?;

    let Some(series) = response.data.result.into_iter().next() else {
        return Ok(Vec::new());
    };

    series
        .values
        .into_iter()
        .map(|(ts, raw)| {
            let value: f64 = raw.parse().map_err(|_| {
                ParseError::Structure(format!("sample value is not a float: {raw:?}"))
            })?;
            Ok(Sample::new(Arc::clone(metric), (ts as i64) * 1000, value))
        })
        .collect()
}
