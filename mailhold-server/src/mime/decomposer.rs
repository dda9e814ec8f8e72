//! MIME decomposition using mailparse.
//!
//! Turns a raw RFC 5322 message into a [`DecomposedMessage`]: the MIME tree is
//! walked into an explicit [`PartNode`] tree, validated structurally, then
//! flattened into the ordered part list from which the text and HTML bodies
//! are picked.

use std::collections::HashSet;

use mailparse::{
    parse_content_type, parse_headers, parse_mail, DispositionType, MailHeaderMap, ParsedMail,
};
use tracing::{debug, info, warn};

use super::types::{ContentPart, DecomposedMessage, PartNode};
use crate::error::DecomposeError;

/// Maximum multipart nesting accepted before the message is rejected.
const MAX_DEPTH: usize = 32;

/// Decompose a raw message into its bodies and addressable parts.
///
/// Fails with [`DecomposeError::Malformed`] when the bytes cannot be parsed
/// as a structurally valid message: no header block, a multipart entity
/// without a boundary, an unterminated boundary, or an undecodable body.
pub fn decompose(raw: &[u8]) -> Result<DecomposedMessage, DecomposeError> {
    debug!(raw_length = raw.len(), "message_decompose_start");

    // mailparse recurses without a limit, so the structure is checked first
    check_structure(raw)?;

    let mail = parse_mail(raw)
        .map_err(|e| DecomposeError::Malformed(format!("unparseable message: {e}")))?;

    if mail.headers.is_empty() {
        return Err(DecomposeError::Malformed("missing header block".to_string()));
    }

    let headers: Vec<(String, String)> = mail
        .headers
        .iter()
        .map(|h| (h.get_key(), h.get_value()))
        .collect();

    let tree = walk(&mail, 0)?;
    let mut parts = tree.flatten();

    let mut seen = HashSet::new();
    for (index, part) in parts.iter_mut().enumerate() {
        part.index = index;
        if let Some(cid) = &part.content_id {
            if !seen.insert(cid.clone()) {
                warn!(content_id = %cid, part_index = index, "message_duplicate_content_id");
                part.content_id = None;
            }
        }
    }

    let text_body = select_body(&parts, "text/plain");
    let html_body = select_body(&parts, "text/html");

    info!(
        parts_count = parts.len(),
        has_text = text_body.is_some(),
        has_html = html_body.is_some(),
        "message_decompose_complete"
    );

    Ok(DecomposedMessage {
        headers,
        text_body,
        html_body,
        parts,
    })
}

/// Build the part tree for an entity and everything below it.
fn walk(mail: &ParsedMail, depth: usize) -> Result<PartNode, DecomposeError> {
    if depth > MAX_DEPTH {
        return Err(DecomposeError::Malformed(format!(
            "multipart nesting deeper than {MAX_DEPTH}"
        )));
    }

    let mimetype = mail.ctype.mimetype.as_str();

    if let Some(subtype) = mimetype.strip_prefix("multipart/") {
        validate_multipart(mail)?;

        let children = mail
            .subparts
            .iter()
            .map(|part| walk(part, depth + 1))
            .collect::<Result<Vec<_>, _>>()?;

        debug!(
            subtype = subtype,
            depth = depth,
            children_count = children.len(),
            "message_group_walked"
        );

        return Ok(PartNode::Group {
            subtype: subtype.to_string(),
            children,
        });
    }

    leaf(mail, depth).map(PartNode::Leaf)
}

/// Check the structural requirements of a multipart entity.
fn validate_multipart(mail: &ParsedMail) -> Result<(), DecomposeError> {
    let boundary = mail
        .ctype
        .params
        .get("boundary")
        .filter(|b| !b.is_empty())
        .ok_or_else(|| {
            DecomposeError::Malformed(format!(
                "{} without a boundary parameter",
                mail.ctype.mimetype
            ))
        })?;

    if mail.subparts.is_empty() {
        return Err(DecomposeError::Malformed(format!(
            "no body parts delimited by '{boundary}'"
        )));
    }

    Ok(())
}

/// Scan the multipart structure without recursion.
///
/// Every multipart entity must close its boundary on a line of its own
/// inside its own section, and nesting may not exceed [`MAX_DEPTH`].
/// Entities without a boundary parameter are left to [`validate_multipart`].
fn check_structure(raw: &[u8]) -> Result<(), DecomposeError> {
    let mut pending = vec![(raw, 0usize)];

    while let Some((entity, depth)) = pending.pop() {
        let Ok((headers, body_offset)) = parse_headers(entity) else {
            continue;
        };

        let Some(value) = headers.get_first_value("Content-Type") else {
            continue;
        };
        let ctype = parse_content_type(&value);

        if !ctype.mimetype.starts_with("multipart/") {
            continue;
        }
        let Some(boundary) = ctype.params.get("boundary").filter(|b| !b.is_empty()) else {
            continue;
        };

        if depth >= MAX_DEPTH {
            return Err(DecomposeError::Malformed(format!(
                "multipart nesting deeper than {MAX_DEPTH}"
            )));
        }

        let body = entity.get(body_offset..).unwrap_or_default();
        let sections = split_sections(body, boundary).ok_or_else(|| {
            DecomposeError::Malformed(format!("unterminated boundary '{boundary}'"))
        })?;

        pending.extend(sections.into_iter().map(|section| (section, depth + 1)));
    }

    Ok(())
}

/// Split a multipart body into the sections between its delimiter lines.
///
/// Returns `None` when no closing delimiter line (`--boundary--`) is found.
fn split_sections<'a>(body: &'a [u8], boundary: &str) -> Option<Vec<&'a [u8]>> {
    let delimiter = format!("--{boundary}");
    let delimiter = delimiter.as_bytes();

    let mut sections = Vec::new();
    let mut section_start: Option<usize> = None;
    let mut line_start = 0;

    while line_start < body.len() {
        let line_end = body[line_start..]
            .iter()
            .position(|&b| b == b'\n')
            .map(|p| line_start + p + 1)
            .unwrap_or(body.len());
        let line = &body[line_start..line_end];

        if let Some(rest) = line.strip_prefix(delimiter) {
            if let Some(start) = section_start {
                sections.push(&body[start..line_start]);
            }
            if rest.starts_with(b"--") {
                return Some(sections);
            }
            section_start = Some(line_end);
        }

        line_start = line_end;
    }

    None
}

/// Decode a leaf entity into a content part.
fn leaf(mail: &ParsedMail, depth: usize) -> Result<ContentPart, DecomposeError> {
    let content_type = mail.ctype.mimetype.clone();

    let mut data = mail.get_body_raw().map_err(|e| {
        DecomposeError::Malformed(format!("undecodable {content_type} body: {e}"))
    })?;

    let mut text = if content_type.starts_with("text/") {
        Some(mail.get_body().map_err(|e| {
            DecomposeError::Malformed(format!("undecodable {content_type} text: {e}"))
        })?)
    } else {
        None
    };

    // Inside a multipart the line break before the next delimiter belongs to
    // the delimiter. Base64 decoding already discards it.
    let base64 = mail
        .headers
        .get_first_value("Content-Transfer-Encoding")
        .map(|v| v.trim().eq_ignore_ascii_case("base64"))
        .unwrap_or(false);
    if depth > 0 && !base64 {
        strip_delimiter_newline(&mut data);
        if let Some(text) = text.as_mut() {
            if text.ends_with("\r\n") {
                text.truncate(text.len() - 2);
            } else if text.ends_with('\n') {
                text.truncate(text.len() - 1);
            }
        }
    }

    let disposition = mail.get_content_disposition();
    let filename = disposition
        .params
        .get("filename")
        .or_else(|| mail.ctype.params.get("name"))
        .cloned();

    let mut part = ContentPart::new(content_type, data).with_text(text);
    part.content_id = mail
        .headers
        .get_first_value("Content-ID")
        .and_then(|v| normalize_content_id(&v));
    part.charset = mail.ctype.params.get("charset").cloned();
    part.filename = filename;
    part.attachment = matches!(disposition.disposition, DispositionType::Attachment);
    part.depth = depth;

    Ok(part)
}

fn strip_delimiter_newline(data: &mut Vec<u8>) {
    if data.ends_with(b"\r\n") {
        data.truncate(data.len() - 2);
    } else if data.ends_with(b"\n") {
        data.truncate(data.len() - 1);
    }
}

/// Strip whitespace and angle-bracket delimiters from a Content-ID value.
pub fn normalize_content_id(value: &str) -> Option<String> {
    let trimmed = value.trim();
    let inner = trimmed
        .strip_prefix('<')
        .and_then(|v| v.strip_suffix('>'))
        .unwrap_or(trimmed)
        .trim();

    if inner.is_empty() {
        None
    } else {
        Some(inner.to_string())
    }
}

/// Pick the body of the given type: shallowest depth wins, then source order.
///
/// Parts declared as attachments below the top level are not body candidates.
fn select_body(parts: &[ContentPart], mimetype: &str) -> Option<String> {
    parts
        .iter()
        .filter(|p| p.content_type == mimetype)
        .filter(|p| !p.attachment || p.depth == 0)
        .min_by_key(|p| (p.depth, p.index))
        .and_then(|p| p.text().map(str::to_string))
}
