//! MIME tree construction on top of `mail-parser`.
//!
//! `mail-parser` handles boundary splitting and content-transfer decoding;
//! this module reshapes its flat part table into the owned
//! [`MessagePart`] tree the extraction pipeline walks.

use mail_parser::{MessageParser, MimeHeaders, PartType};

use crate::model::message::{Disposition, MessagePart, ParsedMessage};
use crate::parser::header;

/// Parse a raw RFC 5322 message into a [`ParsedMessage`] tree.
///
/// Returns `None` when the bytes are not recognizable as an email message:
/// either `mail-parser` rejects them outright, or it yields a root part with
/// no headers at all (plain junk text).
pub fn parse_message(raw: &[u8]) -> Option<ParsedMessage> {
    let message_bytes = strip_bom(raw);

    let msg = MessageParser::default().parse(message_bytes)?;
    if msg.parts.first().map_or(true, |p| p.headers.is_empty()) {
        return None;
    }

    let raw_subject = header::raw_header_value(message_bytes, "subject");

    Some(ParsedMessage {
        raw_subject,
        root: build_part(&msg, 0),
    })
}

/// Build one tree node from the part table, recursing into containers.
fn build_part(msg: &mail_parser::Message<'_>, id: usize) -> MessagePart {
    let part = &msg.parts[id];

    let disposition = part
        .content_disposition()
        .and_then(|d| Disposition::from_label(d.ctype()));

    let filename = part.attachment_name().map(String::from);

    let content_type = part.content_type().map(|ct: &mail_parser::ContentType| {
        let main = ct.ctype();
        match ct.subtype() {
            Some(sub) => format!("{main}/{sub}"),
            None => main.to_string(),
        }
    });

    let (payload, children) = match &part.body {
        PartType::Text(text) | PartType::Html(text) => {
            (Some(text.as_bytes().to_vec()), Vec::new())
        }
        PartType::Binary(bytes) | PartType::InlineBinary(bytes) => {
            (Some(bytes.to_vec()), Vec::new())
        }
        // An attached message's own content shows up as children; the
        // envelope node itself carries no payload.
        PartType::Message(nested) => (None, vec![build_part(nested, 0)]),
        PartType::Multipart(ids) => (
            None,
            ids.iter().map(|&child| build_part(msg, child)).collect(),
        ),
    };

    MessagePart {
        disposition,
        filename,
        content_type,
        payload,
        children,
    }
}

/// Strip a UTF-8 BOM some producers prepend to the message bytes.
fn strip_bom(data: &[u8]) -> &[u8] {
    data.strip_prefix(&[0xEF, 0xBB, 0xBF][..]).unwrap_or(data)
}
