//! Minimal multipart/form-data parsing
//!
//! The upload endpoints receive small bodies (an address list, a database
//! file), fully buffered before parsing, so this parser works on a complete
//! byte slice. Parts are delimited by `--<boundary>` lines per RFC 7578;
//! part headers end at a blank line; the closing delimiter carries a
//! trailing `--`.

/// One decoded form part
#[derive(Debug, Clone, PartialEq)]
pub struct Part {
    pub name: String,
    pub filename: Option<String>,
    pub data: Vec<u8>,
}

/// Extract the boundary token from a Content-Type header value
pub fn boundary_from_content_type(content_type: &str) -> Option<String> {
    let (mime, rest) = match content_type.split_once(';') {
        Some((mime, rest)) => (mime.trim(), rest),
        None => return None,
    };
    if !mime.eq_ignore_ascii_case("multipart/form-data") {
        return None;
    }

    for param in rest.split(';') {
        if let Some((key, value)) = param.split_once('=') {
            if key.trim().eq_ignore_ascii_case("boundary") {
                let value = value.trim().trim_matches('"');
                if !value.is_empty() {
                    return Some(value.to_string());
                }
            }
        }
    }
    None
}

/// Parse a complete multipart body. Malformed segments are skipped rather
/// than failing the whole request.
pub fn parse(body: &[u8], boundary: &str) -> Vec<Part> {
    let delimiter = format!("--{}", boundary).into_bytes();
    let mut parts = Vec::new();

    let Some(mut pos) = find(body, &delimiter, 0) else {
        return parts;
    };

    loop {
        let mut cursor = pos + delimiter.len();

        // Closing delimiter: --boundary--
        if body[cursor..].starts_with(b"--") {
            break;
        }
        if body[cursor..].starts_with(b"\r\n") {
            cursor += 2;
        }

        // Headers run until the blank line
        let Some(headers_end) = find(body, b"\r\n\r\n", cursor) else {
            break;
        };
        let headers = String::from_utf8_lossy(&body[cursor..headers_end]);
        let data_start = headers_end + 4;

        // Data runs until the next delimiter, minus its leading CRLF
        let Some(next) = find(body, &delimiter, data_start) else {
            break;
        };
        let data_end = next.saturating_sub(2).max(data_start);

        if let Some((name, filename)) = content_disposition(&headers) {
            parts.push(Part { name, filename, data: body[data_start..data_end].to_vec() });
        }

        pos = next;
    }

    parts
}

/// Find the part with the given field name
pub fn field<'a>(parts: &'a [Part], name: &str) -> Option<&'a Part> {
    parts.iter().find(|p| p.name == name)
}

/// Pull name and filename out of a part's Content-Disposition header
fn content_disposition(headers: &str) -> Option<(String, Option<String>)> {
    let line = headers
        .lines()
        .find(|l| l.to_ascii_lowercase().starts_with("content-disposition:"))?;

    let name = header_param(line, "name")?;
    let filename = header_param(line, "filename");
    Some((name, filename))
}

fn header_param(line: &str, key: &str) -> Option<String> {
    for segment in line.split(';') {
        if let Some((k, v)) = segment.split_once('=') {
            if k.trim().eq_ignore_ascii_case(key) {
                return Some(v.trim().trim_matches('"').to_string());
            }
        }
    }
    None
}

fn find(haystack: &[u8], needle: &[u8], from: usize) -> Option<usize> {
    if from > haystack.len() || needle.is_empty() {
        return None;
    }
    haystack[from..].windows(needle.len()).position(|w| w == needle).map(|i| i + from)
}
