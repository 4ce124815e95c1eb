use std::borrow::Cow;

use base64::Engine;
use tracing::warn;

use crate::attributes::{AttributeMap, Value};
use crate::directory::DirectoryEntry;


/// Lines longer than this are folded.
const LINE_WIDTH: usize = 76;


fn normalize_newlines<'a>(ldif: &'a str) -> Cow<'a, str> {
    if ldif.contains("\r\n") {
        Cow::Owned(ldif.replace("\r\n", "\n"))
    } else {
        Cow::Borrowed(ldif)
    }
}

fn strip_comments<'a>(ldif: &'a str) -> Cow<'a, str> {
    if ldif.starts_with('#') || ldif.contains("\n#") {
        let mut uncommented = String::with_capacity(ldif.len());
        let mut in_comment = false;
        for ln in ldif.split('\n') {
            // continuation lines of a comment belong to the comment
            if ln.starts_with('#') || (in_comment && ln.starts_with(' ')) {
                in_comment = true;
                continue;
            }
            in_comment = false;

            uncommented.push_str(ln);
            uncommented.push('\n');
        }
        Cow::Owned(uncommented)
    } else {
        Cow::Borrowed(ldif)
    }
}

fn join_continuations<'a>(ldif: &'a str) -> Cow<'a, str> {
    if ldif.contains("\n ") {
        Cow::Owned(ldif.replace("\n ", ""))
    } else {
        Cow::Borrowed(ldif)
    }
}

fn compress_newlines<'a>(ldif: &'a str) -> Cow<'a, str> {
    if ldif.contains("\n\n\n") {
        let mut compressed = ldif.replace("\n\n\n", "\n\n");
        while compressed.contains("\n\n\n") {
            compressed = compressed.replace("\n\n\n", "\n\n");
        }
        Cow::Owned(compressed)
    } else {
        Cow::Borrowed(ldif)
    }
}

fn cut_str_to_max(s: &str, mut max_bytes: usize) -> &str {
    if max_bytes >= s.len() {
        return s;
    }
    while !s.is_char_boundary(max_bytes) {
        max_bytes -= 1;
    }
    &s[0..max_bytes]
}


/// Parses the content records of an LDIF document.
///
/// Lines that cannot be understood are skipped with a warning, as are records without a
/// `dn`. Values given by URL (`attr:< url`) are not fetched and skipped as well.
pub fn parse_ldif(ldif: &str) -> Vec<DirectoryEntry> {
    // normalize LDIF
    let normalized = normalize_newlines(ldif);
    let stripped = strip_comments(&*normalized);
    let joined = join_continuations(&*stripped);
    let compressed = compress_newlines(&*joined);

    // each record is now separated by "\n\n"
    let mut records = Vec::new();
    for record in compressed.split("\n\n") {
        if record.trim().is_empty() {
            continue;
        }

        let mut dn = None;
        let mut attributes = AttributeMap::new();

        // and each attribute in the record by "\n"
        for attribute in record.split('\n') {
            if attribute.is_empty() {
                continue;
            }

            // split at the attribute name
            let Some((key, rest)) = attribute.split_once(':') else {
                warn!(line = %attribute, "skipping LDIF line missing colon");
                continue;
            };

            // how many colons?
            let value = if rest.is_empty() || rest.trim_matches(' ').is_empty() {
                // empty value
                Vec::with_capacity(0)
            } else if let Some(base64_str) = rest.strip_prefix(':') {
                // base64
                // strip off additional spaces
                let base64_str = base64_str.trim_matches(' ');

                // decode
                match base64::engine::general_purpose::STANDARD.decode(base64_str) {
                    Ok(bs) => bs,
                    Err(_) => {
                        if base64_str.len() > 64 {
                            warn!(value = %cut_str_to_max(base64_str, 64), "skipping invalid base64 value (truncated)");
                        } else {
                            warn!(value = %base64_str, "skipping invalid base64 value");
                        }
                        continue;
                    },
                }
            } else if rest.starts_with('<') {
                warn!(line = %attribute, "skipping LDIF value given by URL");
                continue;
            } else {
                // plain
                // strip off leading spaces
                rest.trim_start_matches(' ').as_bytes().to_vec()
            };

            if key.eq_ignore_ascii_case("version") && dn.is_none() {
                continue;
            }
            if key.eq_ignore_ascii_case("dn") {
                match String::from_utf8(value) {
                    Ok(d) => dn = Some(d),
                    Err(_) => warn!(line = %attribute, "skipping LDIF record with non-UTF-8 dn"),
                }
                continue;
            }

            attributes.push(key, Value::from(value));
        }

        let Some(dn) = dn else {
            warn!(record = %cut_str_to_max(record, 64), "skipping LDIF record missing required \"dn\" pseudo-attribute");
            continue;
        };
        records.push(DirectoryEntry::new(dn, attributes));
    }

    records
}


/// Whether the value has to be written base64-encoded.
///
/// Safe values are ASCII without NUL, CR or LF, do not start with a space, colon or
/// less-than sign and do not end with a space.
fn needs_base64(value: &[u8]) -> bool {
    if let Some(first) = value.first() {
        if [b'\0', b'\n', b'\r', b' ', b':', b'<'].contains(first) {
            return true;
        }
    }
    if value.last() == Some(&b' ') {
        return true;
    }
    value.iter().any(|b| *b == b'\0' || *b == b'\n' || *b == b'\r' || *b >= 0x80)
}

fn write_folded(out: &mut String, line: &str) {
    // values are ASCII by now, but attribute names are not checked; fold at char boundaries
    let first = cut_str_to_max(line, LINE_WIDTH);
    out.push_str(first);
    out.push('\n');
    let mut rest = &line[first.len()..];
    while !rest.is_empty() {
        let piece = cut_str_to_max(rest, LINE_WIDTH - 1);
        out.push(' ');
        out.push_str(piece);
        out.push('\n');
        rest = &rest[piece.len()..];
    }
}

fn write_attribute(out: &mut String, name: &str, value: &[u8]) {
    let line = if needs_base64(value) {
        let encoded = base64::engine::general_purpose::STANDARD.encode(value);
        format!("{}:: {}", name, encoded)
    } else {
        // needs_base64 rejects everything beyond ASCII
        format!("{}: {}", name, String::from_utf8_lossy(value))
    };
    write_folded(out, &line);
}

/// Renders one entry as an LDIF content record, followed by an empty line.
///
/// Attributes are written sorted by name, values in their stored order.
pub fn to_ldif(dn: &str, attributes: &AttributeMap) -> String {
    let mut out = String::new();
    write_attribute(&mut out, "dn", dn.as_bytes());

    let mut sorted: Vec<(&str, &[Value])> = attributes.iter().collect();
    sorted.sort_by(|a, b| a.0.cmp(b.0));
    for (name, values) in sorted {
        for value in values {
            write_attribute(&mut out, name, value.as_bytes());
        }
    }

    out.push('\n');
    out
}
