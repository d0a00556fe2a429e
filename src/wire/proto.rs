//! Prometheus remote-write protobuf types
//!
//! Hand-written messages matching `prometheus/prompb/remote.proto`. Using
//! prost derives avoids the need for protoc and proto file management.

use prost::Message;

/// A write request containing one or more time series
#[derive(Clone, PartialEq, Message)]
pub struct WriteRequest {
    /// The time series to write
    #[prost(message, repeated, tag = "1")]
    pub timeseries: Vec<TimeSeries>,
}

/// A single time series with labels and samples
#[derive(Clone, PartialEq, Message)]
pub struct TimeSeries {
    /// Labels identifying the series; must be sorted by name
    #[prost(message, repeated, tag = "1")]
    pub labels: Vec<Label>,
    /// Data samples for this series; must be in timestamp order
    #[prost(message, repeated, tag = "2")]
    pub samples: Vec<Sample>,
}

/// A key/value label pair
#[derive(Clone, PartialEq, Message)]
pub struct Label {
    /// Label name
    #[prost(string, tag = "1")]
    pub name: String,
    /// Label value
    #[prost(string, tag = "2")]
    pub value: String,
}

/// A single data sample
#[derive(Clone, PartialEq, Message)]
pub struct Sample {
    /// The sample value
    #[prost(double, tag = "1")]
    pub value: f64,
    /// Timestamp in milliseconds since the epoch
    #[prost(int64, tag = "2")]
    pub timestamp: i64,
}
