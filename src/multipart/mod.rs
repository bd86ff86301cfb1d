//! Byte-level `multipart/form-data` decoding.
//!
//! The decoder works on the fully buffered body and never converts file payloads to
//! text, so binary uploads survive untouched even when they contain bytes that look
//! like a boundary or a header.
//!
//! Layout handled (RFC 2046 §5.1.1):
//!
//! ```text
//! --BOUNDARY\r\n
//! Content-Disposition: form-data; name="image"; filename="me.png"\r\n
//! Content-Type: image/png\r\n
//! \r\n
//! <payload bytes>\r\n
//! --BOUNDARY\r\n
//! Content-Disposition: form-data; name="username"\r\n
//! \r\n
//! alice\r\n
//! --BOUNDARY--\r\n
//! ```

mod disposition;

use bytes::Bytes;
use thiserror::Error;

use disposition::ContentDisposition;

/// Field carrying the uploaded image
pub const IMAGE_FIELD: &str = "image";
/// Text field carrying the username
pub const USERNAME_FIELD: &str = "username";
/// Filename used when the image part declares none
pub const DEFAULT_IMAGE_NAME: &str = "image.jpg";

const CRLF: &[u8] = b"\r\n";
const HEADER_TERMINATOR: &[u8] = b"\r\n\r\n";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MultipartError {
    #[error("Content-Type must be multipart/form-data")]
    NotMultipart,

    #[error("multipart boundary missing from Content-Type")]
    MissingBoundary,
}

/// Fields extracted from one upload request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedForm {
    /// Empty when the `image` field is absent
    pub image_bytes: Bytes,
    pub image_file_name: String,
    /// `Content-Type` declared by the image part, when it is a valid media type
    pub image_content_type: Option<String>,
    /// Trimmed; `None` when the `username` field is absent
    pub username: Option<String>,
}

impl Default for DecodedForm {
    fn default() -> Self {
        Self {
            image_bytes: Bytes::new(),
            image_file_name: DEFAULT_IMAGE_NAME.to_string(),
            image_content_type: None,
            username: None,
        }
    }
}

/// Extracts the boundary token from a `Content-Type` header value.
///
/// Rejects anything that is not `multipart/form-data`, and multipart types that
/// carry no usable `boundary` parameter. Boundaries that are not valid MIME tokens,
/// such as `a(b)?c`, are still accepted when left unquoted.
pub fn boundary_from_content_type(content_type: &str) -> Result<String, MultipartError> {
    let boundary = match content_type.parse::<mime::Mime>() {
        Ok(media_type) => {
            if media_type.type_() != mime::MULTIPART || media_type.subtype() != mime::FORM_DATA {
                return Err(MultipartError::NotMultipart);
            }
            media_type
                .get_param(mime::BOUNDARY)
                .map(|name| name.as_str().trim_matches('"').to_string())
        }
        Err(_) => {
            let essence = content_type.split(';').next().unwrap_or_default().trim();
            if !essence.eq_ignore_ascii_case("multipart/form-data") {
                return Err(MultipartError::NotMultipart);
            }
            disposition::param(content_type, "boundary")
        }
    };

    boundary
        .filter(|boundary| !boundary.is_empty())
        .ok_or(MultipartError::MissingBoundary)
}

/// Decodes `body` into the known form fields.
///
/// Total over its input: missing fields, an empty body or a body without any
/// boundary yield a [`DecodedForm`] with empty values. Unknown field names are
/// skipped and a repeated field keeps its last occurrence.
pub fn decode(body: &Bytes, boundary: &str) -> DecodedForm {
    let mut form = DecodedForm::default();

    for (headers, payload) in parts(body, boundary) {
        let headers = String::from_utf8_lossy(&body[headers]);
        let Some(disposition) = header_value(&headers, "content-disposition")
            .map(|value| ContentDisposition::parse(&value))
        else {
            continue;
        };

        match disposition.name.as_deref() {
            Some(IMAGE_FIELD) => {
                form.image_bytes = body.slice(payload);
                form.image_file_name = disposition
                    .filename
                    .filter(|name| !name.is_empty())
                    .unwrap_or_else(|| DEFAULT_IMAGE_NAME.to_string());
                form.image_content_type = header_value(&headers, "content-type")
                    .filter(|value| value.parse::<mime::Mime>().is_ok());
            }
            Some(USERNAME_FIELD) => {
                let text = String::from_utf8_lossy(&body[payload]);
                form.username = Some(text.trim().to_string());
            }
            _ => {}
        }
    }

    form
}

type Span = std::ops::Range<usize>;

/// Splits the body into `(header block, payload)` spans, in order.
fn parts(body: &[u8], boundary: &str) -> Vec<(Span, Span)> {
    let dash_boundary = [b"--".as_slice(), boundary.as_bytes()].concat();
    // Every delimiter after the first one owns the CRLF that precedes it.
    let delimiter = [CRLF, dash_boundary.as_slice()].concat();

    let mut spans = Vec::new();
    let Some(first) = find(body, &dash_boundary, 0) else {
        return spans;
    };
    let mut cursor = first + dash_boundary.len();

    loop {
        // `--BOUNDARY--` closes the body; anything after it is epilogue.
        if body[cursor..].starts_with(b"--") {
            break;
        }
        // Skip transport padding up to the end of the delimiter line.
        let Some(line_end) = find(body, CRLF, cursor) else {
            break;
        };
        let part_start = line_end + CRLF.len();

        let (part_end, next) = match find(body, &delimiter, part_start) {
            Some(at) => (at, at + delimiter.len()),
            None => (body.len(), body.len()),
        };

        if let Some(split) = split_part(body, part_start, part_end) {
            spans.push(split);
        }

        if next >= body.len() {
            break;
        }
        cursor = next;
    }

    spans
}

/// Separates one part into header and payload spans at the first blank line.
fn split_part(body: &[u8], start: usize, end: usize) -> Option<(Span, Span)> {
    let part = &body[start..end];
    if part.starts_with(CRLF) {
        // No headers at all, so no Content-Disposition either.
        return None;
    }
    let terminator = find(part, HEADER_TERMINATOR, 0)?;
    let payload_start = start + terminator + HEADER_TERMINATOR.len();
    Some((start..start + terminator, payload_start..end))
}

/// First header in a part's header block named `name`, value trimmed.
fn header_value(headers: &str, name: &str) -> Option<String> {
    headers
        .split("\r\n")
        .filter_map(|line| line.split_once(':'))
        .find(|(key, _)| key.trim().eq_ignore_ascii_case(name))
        .map(|(_, value)| value.trim().to_string())
}

/// Literal byte search; boundaries are never treated as patterns.
fn find(haystack: &[u8], needle: &[u8], from: usize) -> Option<usize> {
    if needle.is_empty() || from > haystack.len() {
        return None;
    }
    haystack[from..]
        .windows(needle.len())
        .position(|window| window == needle)
        .map(|offset| from + offset)
}

#[cfg(test)]
mod tests {
    use super::*;

    const BOUNDARY: &str = "----WebKitFormBoundary7MA4YWxkTrZu0gW";

    fn body_of(boundary: &str, parts: &[(&str, Option<&str>, &[u8])]) -> Bytes {
        let mut body = Vec::new();
        for (name, filename, payload) in parts {
            body.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
            match filename {
                Some(file) => body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{name}\"; filename=\"{file}\"\r\n\
                         Content-Type: application/octet-stream\r\n"
                    )
                    .as_bytes(),
                ),
                None => body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{name}\"\r\n").as_bytes(),
                ),
            }
            body.extend_from_slice(b"\r\n");
            body.extend_from_slice(payload);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{boundary}--\r\n").as_bytes());
        Bytes::from(body)
    }

    #[test]
    fn decodes_image_and_username() {
        let png = [0x89, 0x50, 0x4e, 0x47, 0x0d, 0x0a, 0x1a, 0x0a, 0x00, 0xff];
        let body = body_of(
            BOUNDARY,
            &[("image", Some("me.png"), &png), ("username", None, b"  alice \r\n")],
        );

        let form = decode(&body, BOUNDARY);
        assert_eq!(form.image_bytes.as_ref(), &png);
        assert_eq!(form.image_file_name, "me.png");
        assert_eq!(form.username.as_deref(), Some("alice"));
    }

    #[test]
    fn binary_payload_with_crlf_and_boundary_like_text_survives() {
        let mut payload = b"\r\n--not-the-boundary\r\n\r\n".to_vec();
        payload.extend_from_slice(&[0x00, 0x0d, 0x0a, 0xfe]);
        payload.extend_from_slice(b"\r\n");
        let body = body_of(BOUNDARY, &[("image", Some("x.bin"), &payload)]);

        let form = decode(&body, BOUNDARY);
        assert_eq!(form.image_bytes.as_ref(), payload.as_slice());
    }

    #[test]
    fn boundary_with_regex_characters_is_literal() {
        let boundary = "a.b*c+(d)?[e]$^|";
        let body = body_of(boundary, &[("username", None, b"bob")]);

        let form = decode(&body, boundary);
        assert_eq!(form.username.as_deref(), Some("bob"));
    }

    #[test]
    fn missing_username_is_none() {
        let body = body_of(BOUNDARY, &[("image", Some("a.png"), b"data")]);

        let form = decode(&body, BOUNDARY);
        assert_eq!(form.username, None);
        assert_eq!(form.image_bytes.as_ref(), b"data");
    }

    #[test]
    fn missing_filename_uses_default() {
        let body = body_of(BOUNDARY, &[("image", None, b"data")]);
        assert_eq!(decode(&body, BOUNDARY).image_file_name, DEFAULT_IMAGE_NAME);

        let body = body_of(BOUNDARY, &[("image", Some(""), b"data")]);
        assert_eq!(decode(&body, BOUNDARY).image_file_name, DEFAULT_IMAGE_NAME);
    }

    #[test]
    fn last_duplicate_field_wins() {
        let body = body_of(
            BOUNDARY,
            &[
                ("username", None, b"first"),
                ("image", Some("one.png"), b"1"),
                ("image", Some("two.png"), b"22"),
                ("username", None, b"second"),
            ],
        );

        let form = decode(&body, BOUNDARY);
        assert_eq!(form.username.as_deref(), Some("second"));
        assert_eq!(form.image_bytes.as_ref(), b"22");
        assert_eq!(form.image_file_name, "two.png");
    }

    #[test]
    fn unknown_fields_are_ignored() {
        let body = body_of(BOUNDARY, &[("avatar", Some("a.png"), b"zzz"), ("note", None, b"hi")]);
        assert_eq!(decode(&body, BOUNDARY), DecodedForm::default());
    }

    #[test]
    fn empty_body_yields_empty_form() {
        let form = decode(&Bytes::new(), BOUNDARY);
        assert!(form.image_bytes.is_empty());
        assert_eq!(form.username, None);
    }

    #[test]
    fn decoding_is_idempotent() {
        let body = body_of(
            BOUNDARY,
            &[("image", Some("me.png"), &[1, 2, 3, 13, 10]), ("username", None, b"alice")],
        );

        assert_eq!(decode(&body, BOUNDARY), decode(&body, BOUNDARY));
    }

    #[test]
    fn truncated_body_keeps_complete_parts() {
        let mut raw = body_of(BOUNDARY, &[("username", None, b"carol")]).to_vec();
        raw.truncate(raw.len() - format!("--{BOUNDARY}--\r\n").len());
        raw.extend_from_slice(
            format!("--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"image\"").as_bytes(),
        );

        let form = decode(&Bytes::from(raw), BOUNDARY);
        assert_eq!(form.username.as_deref(), Some("carol"));
        assert!(form.image_bytes.is_empty());
    }

    #[test]
    fn header_names_are_case_insensitive() {
        let raw = format!(
            "--{BOUNDARY}\r\ncontent-disposition: form-data; name=\"username\"\r\n\r\n\
             dave\r\n--{BOUNDARY}--\r\n"
        );
        let form = decode(&Bytes::from(raw), BOUNDARY);
        assert_eq!(form.username.as_deref(), Some("dave"));
    }

    #[test]
    fn boundary_extraction() {
        assert_eq!(
            boundary_from_content_type("multipart/form-data; boundary=abc123").unwrap(),
            "abc123"
        );
        assert_eq!(
            boundary_from_content_type("multipart/form-data; boundary=\"quoted-123\"").unwrap(),
            "quoted-123"
        );
        assert_eq!(
            boundary_from_content_type("multipart/form-data"),
            Err(MultipartError::MissingBoundary)
        );
        assert_eq!(
            boundary_from_content_type("application/json"),
            Err(MultipartError::NotMultipart)
        );
        assert_eq!(
            boundary_from_content_type("not a media type"),
            Err(MultipartError::NotMultipart)
        );
    }

    #[test]
    fn boundary_extraction_accepts_non_token_characters() {
        assert_eq!(
            boundary_from_content_type("multipart/form-data; boundary=a(b)c").unwrap(),
            "a(b)c"
        );
        assert_eq!(
            boundary_from_content_type("multipart/form-data; boundary=a?b; charset=utf-8").unwrap(),
            "a?b"
        );
        assert_eq!(
            boundary_from_content_type(r#"Multipart/Form-Data; boundary="a\"b""#).unwrap(),
            r#"a"b"#
        );
        assert_eq!(
            boundary_from_content_type("multipart/form-data; boundary=; x=[y]"),
            Err(MultipartError::MissingBoundary)
        );
        assert_eq!(
            boundary_from_content_type("text/plain; boundary=a(b)c"),
            Err(MultipartError::NotMultipart)
        );
    }

    #[test]
    fn image_content_type_is_recorded() {
        let body = body_of(BOUNDARY, &[("image", Some("me.png"), b"data")]);
        assert_eq!(
            decode(&body, BOUNDARY).image_content_type.as_deref(),
            Some("application/octet-stream")
        );

        let raw = format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"image\"\r\n\
             Content-Type: not a type\r\n\r\nxyz\r\n--{BOUNDARY}--\r\n"
        );
        let form = decode(&Bytes::from(raw), BOUNDARY);
        assert_eq!(form.image_bytes.as_ref(), b"xyz");
        assert_eq!(form.image_content_type, None);
    }
}
