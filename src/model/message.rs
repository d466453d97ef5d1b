//! Decoded message tree types.

/// How a part asks to be presented, from its `Content-Disposition` header.
///
/// Only `attachment` parts are ever written to disk; `inline` parts are
/// embedded display content (e.g. images referenced from HTML).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    Attachment,
    Inline,
}

impl Disposition {
    /// Map a `Content-Disposition` type token to a known disposition.
    pub fn from_label(label: &str) -> Option<Self> {
        if label.eq_ignore_ascii_case("attachment") {
            Some(Self::Attachment)
        } else if label.eq_ignore_ascii_case("inline") {
            Some(Self::Inline)
        } else {
            None
        }
    }
}

/// One node in the decoded message tree.
///
/// Multipart containers carry children and no payload; leaves carry their
/// transfer-decoded body bytes. Built once per input file, never mutated.
#[derive(Debug, Clone)]
pub struct MessagePart {
    /// Disposition from the part headers, if one was declared and recognized.
    pub disposition: Option<Disposition>,

    /// Filename as recovered from the part headers. May still contain RFC
    /// 2047 encoded-words when the producer put them where they don't belong.
    pub filename: Option<String>,

    /// MIME type of the part (e.g. `"application/pdf"`), if declared.
    pub content_type: Option<String>,

    /// Transfer-decoded body bytes. `None` for multipart containers and for
    /// attached `message/rfc822` parts (their content appears as children).
    pub payload: Option<Vec<u8>>,

    /// Nested parts, in document order.
    pub children: Vec<MessagePart>,
}

impl MessagePart {
    /// Depth-first traversal in document order, visiting every node once.
    pub fn walk<'a>(&'a self, visit: &mut dyn FnMut(&'a MessagePart)) {
        visit(self);
        for child in &self.children {
            child.walk(visit);
        }
    }

    /// All parts declared `Content-Disposition: attachment`, in document order.
    ///
    /// Parts with a missing filename or an empty payload are still returned;
    /// the extraction pipeline decides whether to skip them.
    pub fn attachment_parts(&self) -> Vec<&MessagePart> {
        let mut found = Vec::new();
        self.walk(&mut |part| {
            if part.disposition == Some(Disposition::Attachment) {
                found.push(part);
            }
        });
        found
    }
}

/// A fully decoded message: its raw subject header plus the part tree.
#[derive(Debug, Clone)]
pub struct ParsedMessage {
    /// Raw `Subject:` header value, undecoded. `None` when the header is
    /// absent. Decoding happens in the pipeline via
    /// [`crate::parser::header::decode_header_text`].
    pub raw_subject: Option<String>,

    /// Root of the part tree (the message itself).
    pub root: MessagePart,
}

impl ParsedMessage {
    /// Shorthand for [`MessagePart::attachment_parts`] on the root.
    pub fn attachment_parts(&self) -> Vec<&MessagePart> {
        self.root.attachment_parts()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf(disposition: Option<Disposition>, payload: &[u8]) -> MessagePart {
        MessagePart {
            disposition,
            filename: None,
            content_type: None,
            payload: Some(payload.to_vec()),
            children: Vec::new(),
        }
    }

    #[test]
    fn test_disposition_labels() {
        assert_eq!(
            Disposition::from_label("attachment"),
            Some(Disposition::Attachment)
        );
        assert_eq!(Disposition::from_label("INLINE"), Some(Disposition::Inline));
        assert_eq!(Disposition::from_label("form-data"), None);
    }

    #[test]
    fn test_walk_visits_all_nodes_in_order() {
        let tree = MessagePart {
            disposition: None,
            filename: None,
            content_type: None,
            payload: None,
            children: vec![
                leaf(None, b"a"),
                MessagePart {
                    disposition: None,
                    filename: None,
                    content_type: None,
                    payload: None,
                    children: vec![leaf(Some(Disposition::Attachment), b"b")],
                },
                leaf(Some(Disposition::Attachment), b"c"),
            ],
        };

        let mut order = Vec::new();
        tree.walk(&mut |p| {
            order.push(p.payload.as_deref().map(|b| b[0]).unwrap_or(b'-'));
        });
        assert_eq!(order, vec![b'-', b'a', b'-', b'b', b'c']);
    }

    #[test]
    fn test_attachment_parts_filters_and_preserves_order() {
        let tree = MessagePart {
            disposition: None,
            filename: None,
            content_type: None,
            payload: None,
            children: vec![
                leaf(Some(Disposition::Inline), b"i"),
                leaf(Some(Disposition::Attachment), b"1"),
                leaf(None, b"t"),
                leaf(Some(Disposition::Attachment), b"2"),
            ],
        };

        let parts = tree.attachment_parts();
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[0].payload.as_deref(), Some(&b"1"[..]));
        assert_eq!(parts[1].payload.as_deref(), Some(&b"2"[..]));
    }
}
