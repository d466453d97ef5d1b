//! Attachment extraction: filesystem-safe naming and the batch pipeline.

pub mod pipeline;
pub mod sanitize;
