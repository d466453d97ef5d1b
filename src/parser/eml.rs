//! Loading and decoding individual `.eml` files (bare RFC 5322 messages).

use std::path::Path;

use tracing::debug;

use crate::error::{ExtractError, Result};
use crate::model::message::ParsedMessage;
use crate::parser::mime;

/// Read and decode a single `.eml` file into a [`ParsedMessage`].
///
/// Missing files map to [`ExtractError::FileNotFound`]; bytes that cannot be
/// recognized as an email message map to [`ExtractError::MalformedMessage`].
pub fn load_eml(path: impl AsRef<Path>) -> Result<ParsedMessage> {
    let path = path.as_ref();
    let data = std::fs::read(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            ExtractError::FileNotFound(path.to_path_buf())
        } else {
            ExtractError::io(path, e)
        }
    })?;

    debug!(path = %path.display(), bytes = data.len(), "Read EML file");

    mime::parse_message(&data).ok_or_else(|| ExtractError::MalformedMessage(path.to_path_buf()))
}
