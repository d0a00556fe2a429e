//! Core value types shared by the write and read pipelines
//!
//! These mirror the host platform's time-series data contract:
//!
//! - **`Tag`**: a key/value attribute attached to a metric
//! - **`Metric`**: a series identity made of intrinsic, meta and external tags
//! - **`Sample`**: a single measurement (metric + timestamp + value)
//! - **`TagMatcher`**: a read-side filter predicate
//! - **`FetchRequest`**: parameters of a range read
//!
//! A metric is uniquely identified by its intrinsic tags only; meta tags are
//! carried as backend labels for indexing, external tags live in the side
//! store and never reach the backend's label index.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

/// Well-known tag names with reserved meaning
pub mod tag_names {
    /// The metric name; always present as an intrinsic tag
    pub const NAME: &str = "name";
    /// The owning resource; by convention part of series identity
    pub const RESOURCE_ID: &str = "resourceId";
    /// Meta tag carrying the metric type (gauge, counter, ...)
    pub const MTYPE: &str = "mtype";
}

/// A key/value attribute attached to a [`Metric`]
///
/// Keys and values are caller-controlled and may contain characters that are
/// illegal in the backend's label grammar; sanitization happens at the wire
/// and query boundaries, never here.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Tag {
    /// Tag name
    pub key: String,
    /// Tag value
    pub value: String,
}

impl Tag {
    /// Create a new tag
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.key, self.value)
    }
}

/// A time series identity
///
/// Two metrics with identical intrinsic tags are the same series regardless
/// of their meta or external tags.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metric {
    /// Tags that uniquely identify the series (must include `name`)
    pub intrinsic_tags: BTreeSet<Tag>,
    /// Denormalized indexing/classification tags (e.g. `mtype`)
    pub meta_tags: BTreeSet<Tag>,
    /// Tags the backend cannot store as labels; persisted in the side store
    pub external_tags: BTreeSet<Tag>,
}

impl Metric {
    /// Start building a metric
    pub fn builder() -> MetricBuilder {
        MetricBuilder::default()
    }

    /// Deterministic series key derived from the intrinsic tags only
    ///
    /// Stable across processes: tags are visited in their natural (key,
    /// value) order and joined as `key=value` pairs.
    pub fn key(&self) -> String {
        let mut out = String::new();
        for tag in &self.intrinsic_tags {
            if !out.is_empty() {
                out.push('_');
            }
            out.push_str(&tag.key);
            out.push('=');
            out.push_str(&tag.value);
        }
        out
    }

    /// First tag with the given key, searching intrinsic, meta, then
    /// external tags
    pub fn first_tag_by_key(&self, key: &str) -> Option<&Tag> {
        self.intrinsic_tags
            .iter()
            .chain(self.meta_tags.iter())
            .chain(self.external_tags.iter())
            .find(|t| t.key == key)
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Metric[{}]", self.key())
    }
}

/// Builder for [`Metric`]
#[derive(Debug, Default)]
pub struct MetricBuilder {
    metric: Metric,
}

impl MetricBuilder {
    /// Add an intrinsic tag
    pub fn intrinsic_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metric.intrinsic_tags.insert(Tag::new(key, value));
        self
    }

    /// Replace the intrinsic tag set
    pub fn intrinsic_tags(mut self, tags: BTreeSet<Tag>) -> Self {
        self.metric.intrinsic_tags = tags;
        self
    }

    /// Add a meta tag
    pub fn meta_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metric.meta_tags.insert(Tag::new(key, value));
        self
    }

    /// Replace the meta tag set
    pub fn meta_tags(mut self, tags: BTreeSet<Tag>) -> Self {
        self.metric.meta_tags = tags;
        self
    }

    /// Add an external tag
    pub fn external_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metric.external_tags.insert(Tag::new(key, value));
        self
    }

    /// Build the metric
    pub fn build(self) -> Metric {
        self.metric
    }
}

/// A single measurement belonging to one series
///
/// Samples are created by the caller and never mutated by this crate. The
/// metric is shared so large batches for one series don't clone tag sets.
#[derive(Clone, Debug, PartialEq)]
pub struct Sample {
    /// The series this sample belongs to
    pub metric: Arc<Metric>,
    /// Timestamp in milliseconds since the epoch
    pub time_ms: i64,
    /// Measured value
    pub value: f64,
}

impl Sample {
    /// Create a new sample
    pub fn new(metric: Arc<Metric>, time_ms: i64, value: f64) -> Self {
        Self {
            metric,
            time_ms,
            value,
        }
    }
}

/// Matcher operator for read-side filtering
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatcherKind {
    /// Exact match (`=`)
    Equals,
    /// Exact non-match (`!=`)
    NotEquals,
    /// Regex match (`=~`)
    EqualsRegex,
    /// Regex non-match (`!~`)
    NotEqualsRegex,
}

impl MatcherKind {
    /// The PromQL operator symbol for this matcher kind
    pub fn op(&self) -> &'static str {
        match self {
            MatcherKind::Equals => "=",
            MatcherKind::NotEquals => "!=",
            MatcherKind::EqualsRegex => "=~",
            MatcherKind::NotEqualsRegex => "!~",
        }
    }

    /// Whether the matcher value is a caller-supplied regex
    ///
    /// Regex values are passed through to the backend verbatim; literal
    /// values are sanitized and escaped.
    pub fn is_regex(&self) -> bool {
        matches!(self, MatcherKind::EqualsRegex | MatcherKind::NotEqualsRegex)
    }
}

/// A read-side filter predicate over one tag
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagMatcher {
    /// Tag key to match on
    pub key: String,
    /// Value or regex to match against
    pub value: String,
    /// Matcher operator
    pub kind: MatcherKind,
}

impl TagMatcher {
    /// Create an exact-match predicate
    pub fn equals(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            kind: MatcherKind::Equals,
        }
    }

    /// Create a predicate with an explicit operator
    pub fn new(key: impl Into<String>, value: impl Into<String>, kind: MatcherKind) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            kind,
        }
    }
}

/// Aggregation requested for a range read
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Aggregation {
    /// No aggregation; raw series values
    #[default]
    None,
    /// Arithmetic mean over the matched series
    Average,
    /// Maximum over the matched series
    Max,
    /// Minimum over the matched series
    Min,
}

impl Aggregation {
    /// The PromQL aggregation function, if any
    pub fn function(&self) -> Option<&'static str> {
        match self {
            Aggregation::None => None,
            Aggregation::Average => Some("avg"),
            Aggregation::Max => Some("max"),
            Aggregation::Min => Some("min"),
        }
    }
}

/// Parameters of a range read
#[derive(Clone, Debug)]
pub struct FetchRequest {
    /// The series to read; only intrinsic tags are required, the rest is
    /// resolved through the metric cache
    pub metric: Metric,
    /// Window start, epoch seconds
    pub start: i64,
    /// Window end, epoch seconds
    pub end: i64,
    /// Requested resolution in seconds; `0` lets the adapter pick one
    pub step: i64,
    /// Requested aggregation
    pub aggregation: Aggregation,
}

impl FetchRequest {
    /// Create a new fetch request
    pub fn new(metric: Metric, start: i64, end: i64, step: i64, aggregation: Aggregation) -> Self {
        Self {
            metric,
            start,
            end,
            step,
            aggregation,
        }
    }
}
