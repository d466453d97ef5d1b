//! RFC 5322 header handling: folding, raw lookup, and RFC 2047 encoded-words.

use tracing::warn;

/// Decode an optional raw header value into display text.
///
/// Absent headers decode to the empty string. Present values go through
/// [`decode_encoded_words`]; plain ASCII values pass through unchanged.
pub fn decode_header_text(value: Option<&str>) -> String {
    match value {
        Some(v) => decode_encoded_words(v),
        None => String::new(),
    }
}

/// Decode RFC 2047 encoded-words in a header value.
///
/// Example: `"=?UTF-8?B?SG9sYQ==?= =?UTF-8?B?IG11bmRv?="` → `"Hola mundo"`
///
/// Adjacent encoded words are concatenated with no separator (whitespace
/// between two encoded words is elided per RFC 2047 §6.2). If decoding fails
/// for any token, the original text is preserved.
pub fn decode_encoded_words(input: &str) -> String {
    let mut result = String::with_capacity(input.len());
    let mut remaining = input;
    let mut last_was_encoded = false;

    while let Some(start) = remaining.find("=?") {
        let before = &remaining[..start];
        if !last_was_encoded || !before.trim().is_empty() {
            result.push_str(before);
        }

        let after_start = &remaining[start + 2..];

        if let Some((text, consumed)) = try_decode_one_word(after_start) {
            result.push_str(&text);
            remaining = &remaining[start + 2 + consumed..];
            last_was_encoded = true;
        } else {
            result.push_str("=?");
            remaining = after_start;
            last_was_encoded = false;
        }
    }

    result.push_str(remaining);
    result
}

/// Decode a single encoded word, given the text after the leading `"=?"`.
///
/// Returns the decoded text and the number of bytes consumed.
fn try_decode_one_word(s: &str) -> Option<(String, usize)> {
    // Format: charset?encoding?encoded_text?=
    let first_q = s.find('?')?;
    let charset = &s[..first_q];

    let rest = &s[first_q + 1..];
    let second_q = rest.find('?')?;
    let encoding = &rest[..second_q];

    let rest2 = &rest[second_q + 1..];
    let end = rest2.find("?=")?;
    let encoded_text = &rest2[..end];

    let consumed = first_q + 1 + second_q + 1 + end + 2;

    let bytes = match encoding.to_uppercase().as_str() {
        "B" => decode_base64(encoded_text)?,
        "Q" => decode_q_encoding(encoded_text),
        _ => return None,
    };

    Some((decode_charset(charset, &bytes), consumed))
}

/// Minimal base64 decoder. Whitespace and padding are ignored; any other
/// non-alphabet byte rejects the whole input.
fn decode_base64(input: &str) -> Option<Vec<u8>> {
    fn value(c: u8) -> Option<u32> {
        match c {
            b'A'..=b'Z' => Some((c - b'A') as u32),
            b'a'..=b'z' => Some((c - b'a') as u32 + 26),
            b'0'..=b'9' => Some((c - b'0') as u32 + 52),
            b'+' => Some(62),
            b'/' => Some(63),
            _ => None,
        }
    }

    let mut out = Vec::with_capacity(input.len() / 4 * 3);
    let mut acc: u32 = 0;
    let mut bits = 0u32;

    for &b in input.as_bytes() {
        if b.is_ascii_whitespace() || b == b'=' {
            continue;
        }
        acc = (acc << 6) | value(b)?;
        bits += 6;
        if bits >= 8 {
            bits -= 8;
            out.push((acc >> bits) as u8);
        }
    }

    Some(out)
}

/// Decode Q-encoding (RFC 2047): underscores → spaces, `=XX` → byte.
fn decode_q_encoding(input: &str) -> Vec<u8> {
    let bytes = input.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'_' => {
                out.push(b' ');
                i += 1;
            }
            b'=' if i + 2 < bytes.len() => {
                let hex = std::str::from_utf8(&bytes[i + 1..i + 3]).unwrap_or("");
                if let Ok(byte) = u8::from_str_radix(hex, 16) {
                    out.push(byte);
                    i += 3;
                } else {
                    out.push(b'=');
                    i += 1;
                }
            }
            b => {
                out.push(b);
                i += 1;
            }
        }
    }

    out
}

/// Decode bytes using a named charset.
///
/// Unknown charset labels fall back to lossy UTF-8; bytes invalid for the
/// declared charset are replaced, never dropped.
fn decode_charset(charset: &str, bytes: &[u8]) -> String {
    match encoding_rs::Encoding::for_label(charset.trim().as_bytes()) {
        Some(encoding) => {
            let (decoded, _, _) = encoding.decode(bytes);
            decoded.into_owned()
        }
        None => {
            warn!(charset, "Unknown charset, falling back to UTF-8 lossy");
            String::from_utf8_lossy(bytes).into_owned()
        }
    }
}

/// Look up the first value of a named header in a raw message.
///
/// Scans only the header block (everything before the first blank line),
/// unfolding continuation lines. The returned value is raw: encoded-words
/// are not resolved here.
pub fn raw_header_value(raw: &[u8], name: &str) -> Option<String> {
    let end = header_block_end(raw).unwrap_or(raw.len());
    let text = decode_header_bytes(&raw[..end]);
    let headers = unfold_headers(&text);
    headers
        .into_iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(name))
        .map(|(_, v)| v)
}

/// Find the byte offset where the header block ends (first blank line).
fn header_block_end(data: &[u8]) -> Option<usize> {
    for i in 0..data.len().saturating_sub(1) {
        if data[i] == b'\n' && data[i + 1] == b'\n' {
            return Some(i);
        }
        if i + 3 < data.len()
            && data[i] == b'\r'
            && data[i + 1] == b'\n'
            && data[i + 2] == b'\r'
            && data[i + 3] == b'\n'
        {
            return Some(i);
        }
    }
    None
}

/// Decode raw header bytes to a string.
///
/// Tries UTF-8 first, then falls back to Windows-1252 (which accepts every byte).
fn decode_header_bytes(bytes: &[u8]) -> String {
    let bytes = bytes.strip_prefix(&[0xEF, 0xBB, 0xBF][..]).unwrap_or(bytes);

    match std::str::from_utf8(bytes) {
        Ok(s) => s.to_string(),
        Err(_) => {
            let (decoded, _, _) = encoding_rs::WINDOWS_1252.decode(bytes);
            decoded.into_owned()
        }
    }
}

/// Unfold headers: join continuation lines (starting with space or tab) with
/// the previous header. Returns `(lowercase_name, raw_value)` pairs.
fn unfold_headers(text: &str) -> Vec<(String, String)> {
    let mut result: Vec<(String, String)> = Vec::new();

    for line in text.lines() {
        if line.starts_with(' ') || line.starts_with('\t') {
            if let Some(last) = result.last_mut() {
                last.1.push(' ');
                last.1.push_str(line.trim());
            }
        } else if let Some(colon_pos) = line.find(':') {
            let name = line[..colon_pos].trim().to_lowercase();
            let value = line[colon_pos + 1..].trim().to_string();
            result.push((name, value));
        }
        // Lines without a colon and not a continuation are silently skipped
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_absent_header() {
        assert_eq!(decode_header_text(None), "");
    }

    #[test]
    fn test_decode_plain_passthrough() {
        assert_eq!(decode_header_text(Some("Q4 Report")), "Q4 Report");
    }

    #[test]
    fn test_decode_base64_encoded_word() {
        let input = "=?UTF-8?B?SG9sYSBtdW5kbw==?=";
        assert_eq!(decode_encoded_words(input), "Hola mundo");
    }

    #[test]
    fn test_decode_q_encoded_word() {
        let input = "=?ISO-8859-1?Q?caf=E9?=";
        assert_eq!(decode_encoded_words(input), "café");
    }

    #[test]
    fn test_decode_multiple_encoded_words_no_separator() {
        let input = "=?UTF-8?B?SG9sYQ==?= =?UTF-8?B?IG11bmRv?=";
        assert_eq!(decode_encoded_words(input), "Hola mundo");
    }

    #[test]
    fn test_decode_mixed_charsets_concatenate() {
        // "Résumé" (ISO-8859-1, Q) followed by " 報告" (UTF-8, B)
        let input = "=?ISO-8859-1?Q?R=E9sum=E9?= =?UTF-8?B?IOWgseWRig==?=";
        assert_eq!(decode_encoded_words(input), "Résumé 報告");
    }

    #[test]
    fn test_decode_mixed_plain_and_encoded() {
        let input = "Re: =?UTF-8?B?SG9sYQ==?= there";
        assert_eq!(decode_encoded_words(input), "Re: Hola there");
    }

    #[test]
    fn test_decode_unknown_charset_falls_back() {
        // Bytes are valid UTF-8, charset label is garbage
        let input = "=?X-NO-SUCH-CHARSET?B?SGVsbG8=?=";
        assert_eq!(decode_encoded_words(input), "Hello");
    }

    #[test]
    fn test_decode_invalid_bytes_replaced_not_dropped() {
        // 0xFF is invalid UTF-8; the word must survive with a replacement char
        let input = "=?UTF-8?Q?a=FFb?=";
        let decoded = decode_encoded_words(input);
        assert!(decoded.starts_with('a') && decoded.ends_with('b'));
        assert_eq!(decoded.chars().count(), 3);
    }

    #[test]
    fn test_decode_malformed_word_preserved() {
        let input = "=?UTF-8?B?broken";
        assert_eq!(decode_encoded_words(input), "=?UTF-8?B?broken");
    }

    #[test]
    fn test_decode_windows1252_encoded_word() {
        // Müller
        let input = "=?Windows-1252?Q?M=FCller?=";
        assert_eq!(decode_encoded_words(input), "Müller");
    }

    #[test]
    fn test_decode_utf8_base64_japanese() {
        // 山田太郎
        let input = "=?UTF-8?B?5bGx55Sw5aSq6YOO?=";
        assert_eq!(decode_encoded_words(input), "山田太郎");
    }

    #[test]
    fn test_base64_rejects_invalid_input() {
        assert!(decode_base64("not!!valid##").is_none());
        assert_eq!(decode_base64("SGk=").as_deref(), Some(&b"Hi"[..]));
    }

    #[test]
    fn test_q_encoding_underscore_is_space() {
        assert_eq!(decode_q_encoding("a_b"), b"a b");
    }

    #[test]
    fn test_raw_header_value_simple() {
        let raw = b"From: a@b.com\nSubject: Hi there\n\nBody\n";
        assert_eq!(
            raw_header_value(raw, "subject").as_deref(),
            Some("Hi there")
        );
        assert_eq!(raw_header_value(raw, "cc"), None);
    }

    #[test]
    fn test_raw_header_value_folded() {
        let raw = b"Subject: This is a long\n\tsubject line\nFrom: user@example.com\n\nBody\n";
        assert_eq!(
            raw_header_value(raw, "Subject").as_deref(),
            Some("This is a long subject line")
        );
    }

    #[test]
    fn test_raw_header_value_ignores_body() {
        let raw = b"From: a@b.com\n\nSubject: not a header\n";
        assert_eq!(raw_header_value(raw, "subject"), None);
    }

    #[test]
    fn test_header_block_end_crlf() {
        let data = b"From: a@b.com\r\nSubject: Hi\r\n\r\nBody\r\n";
        assert_eq!(header_block_end(data), Some(26));
    }
}
