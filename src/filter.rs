use uuid::Uuid;

use crate::attributes::{AttributeMap, Value};
use crate::error::{Error, Result};


/// Turns a bare `attr=value` assertion into a filter, escaping `\`, `*`, `(`, `)` and NUL.
///
/// As everything is escaped, wildcards in the input match literally.
pub fn simple_filter(assertion: &str) -> String {
    format!("({})", ldap3::ldap_escape(assertion))
}

/// Parses a textual GUID and renders the filter matching it on `objectGUID`.
///
/// Each byte of the GUID becomes a `\xx` escape, in the order the GUID is written.
pub fn guid_filter(guid: &str) -> Result<String> {
    let uuid = Uuid::parse_str(guid)
        .map_err(|e| Error::InvalidGuid(guid.to_owned(), e))?;
    let mut filter = String::from("(objectGUID=");
    for b in uuid.as_bytes() {
        filter.push_str(&format!("\\{:02x}", b));
    }
    filter.push(')');
    Ok(filter)
}


/// A parsed search filter (RFC 4515).
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Filter {
    And(Vec<Filter>),
    Or(Vec<Filter>),
    Not(Box<Filter>),
    Present(String),
    Equality(String, Vec<u8>),
    Substrings {
        attribute: String,
        initial: Option<Vec<u8>>,
        any: Vec<Vec<u8>>,
        last: Option<Vec<u8>>,
    },
}
impl Filter {
    /// Parses a filter; the outer parentheses may be omitted.
    pub fn parse(filter: &str) -> Result<Self> {
        let trimmed = filter.trim();
        let wrapped;
        let source = if trimmed.starts_with('(') {
            trimmed
        } else {
            wrapped = format!("({})", trimmed);
            &wrapped
        };

        let mut parser = Parser { input: source.as_bytes(), pos: 0 };
        let parsed = parser.filter()
            .ok_or_else(|| Error::InvalidFilter(filter.to_owned()))?;
        if parser.pos != parser.input.len() {
            return Err(Error::InvalidFilter(filter.to_owned()));
        }
        Ok(parsed)
    }

    pub fn matches(&self, attributes: &AttributeMap) -> bool {
        match self {
            Self::And(filters) => filters.iter().all(|f| f.matches(attributes)),
            Self::Or(filters) => filters.iter().any(|f| f.matches(attributes)),
            Self::Not(filter) => !filter.matches(attributes),
            // every entry has an object class, even when the record does not list one
            Self::Present(attribute) => unicase::eq(attribute.as_str(), "objectClass")
                || attributes.contains(attribute),
            Self::Equality(attribute, wanted) => {
                let binary = is_binary_attribute(attribute);
                attributes
                    .get(attribute)
                    .iter()
                    .any(|v| values_equal(v, wanted, binary))
            },
            Self::Substrings { attribute, initial, any, last } => attributes
                .get(attribute)
                .iter()
                .any(|v| substrings_match(v, initial.as_deref(), any, last.as_deref())),
        }
    }
}

/// Attributes whose values are octet strings, even when the bytes happen to be valid UTF-8.
const BINARY_ATTRIBUTES: [&str; 7] = [
    "objectGUID", "objectSid", "jpegPhoto", "thumbnailPhoto", "userCertificate",
    "cACertificate", "userPassword",
];

fn is_binary_attribute(attribute: &str) -> bool {
    let name = attribute.split(';').next().unwrap_or(attribute);
    attribute.to_ascii_lowercase().ends_with(";binary")
        || BINARY_ATTRIBUTES.iter().any(|b| unicase::eq(*b, name))
}

/// Text compares case-insensitively, binary attributes and non-text byte by byte.
fn values_equal(value: &Value, wanted: &[u8], binary: bool) -> bool {
    if binary {
        return value.as_bytes() == wanted;
    }
    match (value.as_str(), std::str::from_utf8(wanted)) {
        (Some(text), Ok(wanted_text)) => unicase::eq(text, wanted_text),
        _ => value.as_bytes() == wanted,
    }
}

fn substrings_match(value: &Value, initial: Option<&[u8]>, any: &[Vec<u8>], last: Option<&[u8]>) -> bool {
    let haystack = value.as_bytes().to_ascii_lowercase();
    let mut rest = &haystack[..];

    if let Some(initial) = initial {
        let initial = initial.to_ascii_lowercase();
        if !rest.starts_with(&initial) {
            return false;
        }
        rest = &rest[initial.len()..];
    }
    for piece in any {
        let piece = piece.to_ascii_lowercase();
        match find_bytes(rest, &piece) {
            Some(i) => rest = &rest[i + piece.len()..],
            None => return false,
        }
    }
    match last {
        Some(last) => rest.ends_with(&last.to_ascii_lowercase()),
        None => true,
    }
}

fn find_bytes(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() {
        return Some(0);
    }
    haystack
        .windows(needle.len())
        .position(|w| w == needle)
}


struct Parser<'a> {
    input: &'a [u8],
    pos: usize,
}
impl<'a> Parser<'a> {
    fn peek(&self) -> Option<u8> {
        self.input.get(self.pos).copied()
    }

    fn eat(&mut self, expected: u8) -> Option<()> {
        if self.peek() == Some(expected) {
            self.pos += 1;
            Some(())
        } else {
            None
        }
    }

    fn filter(&mut self) -> Option<Filter> {
        self.eat(b'(')?;
        let parsed = match self.peek()? {
            b'&' => {
                self.pos += 1;
                Filter::And(self.filter_list()?)
            },
            b'|' => {
                self.pos += 1;
                Filter::Or(self.filter_list()?)
            },
            b'!' => {
                self.pos += 1;
                Filter::Not(Box::new(self.filter()?))
            },
            _ => self.item()?,
        };
        self.eat(b')')?;
        Some(parsed)
    }

    fn filter_list(&mut self) -> Option<Vec<Filter>> {
        let mut filters = Vec::new();
        while self.peek() == Some(b'(') {
            filters.push(self.filter()?);
        }
        Some(filters)
    }

    fn item(&mut self) -> Option<Filter> {
        let start = self.pos;
        while let Some(b) = self.peek() {
            if b == b'=' || b == b'(' || b == b')' {
                break;
            }
            self.pos += 1;
        }
        let attribute = std::str::from_utf8(&self.input[start..self.pos]).ok()?.trim().to_owned();
        if attribute.is_empty() || attribute.ends_with(['<', '>', '~', ':']) {
            // ordering, approximate and extensible matches are not supported
            return None;
        }
        self.eat(b'=')?;

        // raw value up to the closing parenthesis; split at unescaped asterisks
        let mut pieces: Vec<Vec<u8>> = vec![Vec::new()];
        loop {
            match self.peek()? {
                b')' => break,
                b'(' => return None,
                b'*' => {
                    self.pos += 1;
                    pieces.push(Vec::new());
                },
                b'\\' => {
                    let hex = self.input.get(self.pos + 1..self.pos + 3)?;
                    let hex = std::str::from_utf8(hex).ok()?;
                    let byte = u8::from_str_radix(hex, 16).ok()?;
                    pieces.last_mut()?.push(byte);
                    self.pos += 3;
                },
                b => {
                    pieces.last_mut()?.push(b);
                    self.pos += 1;
                },
            }
        }

        if pieces.len() == 1 {
            let value = pieces.pop()?;
            return Some(Filter::Equality(attribute, value));
        }
        if pieces.len() == 2 && pieces[0].is_empty() && pieces[1].is_empty() {
            return Some(Filter::Present(attribute));
        }

        let last = pieces.pop().filter(|p| !p.is_empty());
        let mut rest = pieces.into_iter();
        let initial = rest.next().filter(|p| !p.is_empty());
        let any = rest.filter(|p| !p.is_empty()).collect();
        Some(Filter::Substrings { attribute, initial, any, last })
    }
}
