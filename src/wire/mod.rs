//! Wire encoding of sample batches into the remote-write body
//!
//! The backend rejects out-of-order submissions within one request and
//! expects each series' labels sorted by name, so encoding is where batch
//! hygiene happens: NaN values are dropped, samples are time-sorted, tags
//! become sanitized labels, and the protobuf payload is snappy-compressed.
//!
//! External tags never reach the wire; they are persisted through the
//! [tag store](crate::tagstore) instead so they stay out of the backend's
//! label index.

pub mod proto;

use bytes::Bytes;
use prost::Message;

use crate::error::EncodeError;
use crate::sanitize::{
    sanitize_label_name, sanitize_label_value, sanitize_metric_name, METRIC_NAME_LABEL,
};
use crate::types::{tag_names, Sample};

/// A compressed write-request body ready for HTTP submission
#[derive(Clone, Debug)]
pub struct EncodedBatch {
    /// Snappy-compressed protobuf payload
    pub body: Bytes,
    /// Samples actually encoded (NaN values excluded)
    pub sample_count: usize,
}

/// Encode a batch of samples into a compressed write request
///
/// Samples with a NaN value are silently dropped; the rest are sorted by
/// timestamp ascending before serialization.
pub fn encode_batch(samples: &[Sample]) -> Result<EncodedBatch, EncodeError> {
    let mut kept: Vec<&Sample> = samples.iter().filter(|s| !s.value.is_nan()).collect();
    kept.sort_by_key(|s| s.time_ms);

    let request = proto::WriteRequest {
        timeseries: kept.iter().map(|s| to_timeseries(s)).collect(),
    };

    let mut buf = Vec::with_capacity(request.encoded_len());
    request.encode(&mut buf)?;
    let compressed = snap::raw::Encoder::new().compress_vec(&buf)?;

    Ok(EncodedBatch {
        body: Bytes::from(compressed),
        sample_count: kept.len(),
    })
}

/// Convert one sample into its wire representation
///
/// Intrinsic and meta tags map to labels; the `name` tag maps to the
/// reserved metric-name label. The label set is sorted by name as the
/// protocol requires.
fn to_timeseries(sample: &Sample) -> proto::TimeSeries {
    let metric = &sample.metric;
    let mut labels: Vec<proto::Label> = metric
        .intrinsic_tags
        .iter()
        .chain(metric.meta_tags.iter())
        .map(|tag| {
            if tag.key == tag_names::NAME {
                proto::Label {
                    name: METRIC_NAME_LABEL.to_string(),
                    value: sanitize_metric_name(&tag.value),
                }
            } else {
                proto::Label {
                    name: sanitize_label_name(&tag.key),
                    value: sanitize_label_value(&tag.value),
                }
            }
        })
        .collect();
    labels.sort_by(|a, b| a.name.cmp(&b.name));

    proto::TimeSeries {
        labels,
        samples: vec![proto::Sample {
            value: sample.value,
            timestamp: sample.time_ms,
        }],
    }
}
