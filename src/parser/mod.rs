//! Email parsing: EML file loading, header decoding, and MIME tree construction.

pub mod eml;
pub mod header;
pub mod mime;
