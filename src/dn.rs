/// One `key=value` component of a distinguished name.
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct Rdn {
    pub key: String,
    pub value: Vec<u8>,
}
impl Rdn {
    pub fn new(key: String, value: Vec<u8>) -> Self {
        Self {
            key,
            value,
        }
    }

    /// The form used for comparisons: lowercase key, lowercase (ASCII) value.
    pub fn normalized(&self) -> Self {
        Self::new(
            self.key.to_ascii_lowercase(),
            self.value.to_ascii_lowercase(),
        )
    }
}

/// Splits a DN into its RDNs, leftmost first.
///
/// Returns `None` if the DN is malformed.
pub fn dn_to_rdns(dn: &str) -> Option<Vec<Rdn>> {
    // RFC4514

    if dn.trim().len() == 0 {
        return Some(Vec::with_capacity(0));
    }

    let tokens = tokenize(dn)?;

    let pieces = split_at_unescaped_commas(&tokens);
    let mut rdns = Vec::with_capacity(pieces.len());
    for piece in pieces {
        let (key_tokens, value_tokens) = split_at_first_unescaped_equals(&piece)?;
        let key_bytes = tokens_to_bytes(&key_tokens, true);
        let rear_bytes = tokens_to_bytes(&value_tokens, true);

        let key_string = String::from_utf8(key_bytes).ok()?;
        if key_string.len() == 0 {
            return None;
        }
        rdns.push(Rdn::new(key_string, rear_bytes));
    }

    Some(rdns)
}

/// RDNs of the DN in comparable form.
pub fn normalized_rdns(dn: &str) -> Option<Vec<Rdn>> {
    let rdns = dn_to_rdns(dn)?;
    Some(rdns.iter().map(Rdn::normalized).collect())
}

/// Whether `dn` names `base` itself or an entry below it.
pub fn is_within(dn: &[Rdn], base: &[Rdn]) -> bool {
    dn.ends_with(base)
}

#[derive(Clone, Copy, Debug, Hash, Eq, Ord, PartialEq, PartialOrd)]
enum Token<'a> {
    UnescapedSlice(&'a str),
    EscapedByte(u8),
}

/// Tokenizes the given DN string.
///
/// Used to abstract away escapes.
fn tokenize(dn: &str) -> Option<Vec<Token<'_>>> {
    let mut tokens = Vec::new();

    let mut current_start = 0;
    loop {
        let next_backslash = match find_from(dn, '\\', current_start) {
            Some(nb) => nb,
            None => {
                let rest_slice = &dn[current_start..];
                if rest_slice.len() > 0 {
                    tokens.push(Token::UnescapedSlice(rest_slice));
                }
                break;
            },
        };

        // eat the part until the backslash
        let eaten = &dn[current_start..next_backslash];
        tokens.push(Token::UnescapedSlice(eaten));

        // what follows the backslash?
        match dn[next_backslash+1..].chars().nth(0) {
            None => {
                // backslash at the end is invalid
                return None;
            },
            Some(c) => {
                if [' ', '"', '#', '+', ',', ';', '<', '=', '>', '\\'].binary_search(&c).is_ok() {
                    tokens.push(Token::EscapedByte(c as u8));

                    // continue after that escaped character
                    current_start = next_backslash + 2;
                } else if c.is_ascii_hexdigit() {
                    // okay, do we have another hex digit?
                    let c2 = match dn[next_backslash+2..].chars().nth(0) {
                        Some(c2) => c2,
                        None => {
                            // DN ends with a string like "\9" or "\F"
                            return None;
                        },
                    };
                    if !c2.is_ascii_hexdigit() {
                        // a string like "\A%"
                        return None;
                    }
                    let hex_slice = &dn[next_backslash+1..next_backslash+3];
                    let hex_value = u8::from_str_radix(hex_slice, 16).ok()?;
                    tokens.push(Token::EscapedByte(hex_value));

                    // continue after the second hex digit
                    current_start = next_backslash + 3;
                } else {
                    // a string like "\q"
                    return None;
                }
            },
        }
    }

    Some(tokens)
}


fn find_from(haystack: &str, needle: char, offset: usize) -> Option<usize> {
    haystack[offset..]
        .find(needle)
        .map(|i| i + offset)
}

fn split_at_unescaped_commas<'a>(tokens: &[Token<'a>]) -> Vec<Vec<Token<'a>>> {
    let mut pieces = Vec::new();
    let mut current_piece = Vec::new();
    for token in tokens {
        match token {
            Token::EscapedByte(_) => {
                current_piece.push(*token);
            },
            Token::UnescapedSlice(s) => {
                let mut rest = *s;
                while let Some(comma_index) = rest.find(',') {
                    let before = &rest[..comma_index];
                    if before.len() > 0 {
                        current_piece.push(Token::UnescapedSlice(before));
                    }
                    let push_me = std::mem::replace(&mut current_piece, Vec::new());
                    pieces.push(push_me);
                    rest = &rest[comma_index+1..];
                }
                if rest.len() > 0 {
                    current_piece.push(Token::UnescapedSlice(rest));
                }
            },
        }
    }
    // kept even when empty, so that a trailing comma yields an invalid RDN
    pieces.push(current_piece);
    pieces
}

fn split_at_first_unescaped_equals<'a>(tokens: &[Token<'a>]) -> Option<(Vec<Token<'a>>, Vec<Token<'a>>)> {
    let mut front_pieces = Vec::new();
    for (i, token) in tokens.iter().enumerate() {
        match token {
            Token::EscapedByte(_) => {
                front_pieces.push(*token);
            },
            Token::UnescapedSlice(s) => {
                if s.len() == 0 {
                    continue;
                }

                match s.find('=') {
                    None => {
                        front_pieces.push(*token);
                    },
                    Some(equals_index) => {
                        let before = &s[..equals_index];
                        let after = &s[equals_index+1..];

                        if before.len() > 0 {
                            front_pieces.push(Token::UnescapedSlice(before));
                        }

                        // handle the rest
                        let mut rear_pieces = Vec::new();
                        if after.len() > 0 {
                            rear_pieces.push(Token::UnescapedSlice(after));
                        }
                        for rest_piece in tokens.iter().skip(i + 1) {
                            rear_pieces.push(*rest_piece);
                        }

                        return Some((front_pieces, rear_pieces));
                    },
                }
            },
        }
    }

    // no unescaped equals found
    None
}

/// Concatenates the tokens; with `trim`, unescaped spaces at either end are dropped.
fn tokens_to_bytes(tokens: &[Token], trim: bool) -> Vec<u8> {
    let mut ret = Vec::new();
    let last_index = tokens.len().saturating_sub(1);
    for (i, token) in tokens.iter().enumerate() {
        match token {
            Token::EscapedByte(b) => ret.push(*b),
            Token::UnescapedSlice(slice) => {
                let mut slice = *slice;
                if trim && i == 0 {
                    slice = slice.trim_start_matches(' ');
                }
                if trim && i == last_index {
                    slice = slice.trim_end_matches(' ');
                }
                ret.extend_from_slice(slice.as_bytes());
            },
        }
    }
    ret
}
