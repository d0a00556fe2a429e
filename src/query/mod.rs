//! Query synthesis and result parsing for the read pipeline
//!
//! The adapter only speaks the fixed query shapes the platform needs: a
//! label-matcher series lookup and a range query optionally wrapped in
//! `rate()` and one aggregation function. General PromQL generation is out
//! of scope.

pub mod builder;
pub mod result;
