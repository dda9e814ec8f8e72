//! Content-ID reference rewriting for HTML bodies.
//!
//! `cid:` references are replaced by message-scoped content paths with a
//! plain text substitution. The markup is never parsed or re-serialized, so
//! everything outside the references stays byte-for-byte identical.

use tracing::debug;

use crate::store::MessageId;

const SCHEME: &[u8] = b"cid:";

/// Externally resolvable path of a part within a message.
pub fn content_path(message_id: MessageId, content_id: &str) -> String {
    format!("/messages/{message_id}/content/{content_id}")
}

/// Rewrite every `cid:<identifier>` reference in `html` to
/// `/messages/{message_id}/content/{identifier}`.
///
/// The scheme is matched case-insensitively and only at a word boundary;
/// the identifier runs until a quote, whitespace, `<`, `>` or `)`. A bare
/// `cid:` with no identifier is left alone, as is any `cid:` that follows a
/// content path within the same token. The latter keeps the rewrite
/// idempotent even when an identifier itself contains `cid:`.
pub fn rewrite(html: &str, message_id: MessageId) -> String {
    let bytes = html.as_bytes();
    let prefix = content_path(message_id, "");
    let prefix = prefix.as_bytes();

    let mut out = String::with_capacity(html.len());
    let mut copied = 0;
    let mut rewritten = 0usize;
    let mut in_path = false;
    let mut i = 0;

    while i < bytes.len() {
        if is_terminator(bytes[i]) {
            in_path = false;
            i += 1;
            continue;
        }

        if bytes[i..].starts_with(prefix) {
            in_path = true;
            i += prefix.len();
            continue;
        }

        if in_path || !is_scheme_at(bytes, i) {
            i += 1;
            continue;
        }

        let start = i + SCHEME.len();
        let end = bytes[start..]
            .iter()
            .position(|&b| is_terminator(b))
            .map(|p| start + p)
            .unwrap_or(bytes.len());

        if end == start {
            i = start;
            continue;
        }

        out.push_str(&html[copied..i]);
        out.push_str(&content_path(message_id, &html[start..end]));
        copied = end;
        rewritten += 1;
        i = end;
    }

    if rewritten == 0 {
        return html.to_string();
    }

    out.push_str(&html[copied..]);

    debug!(
        message_id = %message_id,
        references_rewritten = rewritten,
        "html_content_ids_rewritten"
    );

    out
}

fn is_scheme_at(bytes: &[u8], i: usize) -> bool {
    let Some(candidate) = bytes.get(i..i + SCHEME.len()) else {
        return false;
    };
    if !candidate.eq_ignore_ascii_case(SCHEME) {
        return false;
    }
    // "acid:" or "x-cid:" are not references
    i == 0 || !(bytes[i - 1].is_ascii_alphanumeric() || matches!(bytes[i - 1], b'-' | b'_' | b'.'))
}

fn is_terminator(b: u8) -> bool {
    b.is_ascii_whitespace() || matches!(b, b'"' | b'\'' | b'<' | b'>' | b')')
}
