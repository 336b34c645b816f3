//! Incremental scanner for the INDI XML stream.
//!
//! INDI is a stream of top-level elements with no enclosing document, so
//! a full XML parser is the wrong shape.  [`Scanner`] buffers raw bytes
//! and yields each complete top-level element as an [`Element`] tree.
//! Partial elements stay buffered until the rest arrives.  Malformed
//! input is reported once and skipped past so the stream resynchronises.
//!
//! Supported subset: elements, single- or double-quoted attributes, text,
//! the five predefined entities, numeric character references, `<?...?>`
//! and `<!--...-->`.  CDATA and DTDs are not used by INDI servers.

use core::fmt;

/// Drop the buffer if a single element grows past this.
pub const MAX_BUFFER: usize = 16 * 1024 * 1024;

const MAX_DEPTH: usize = 8;

/// One parsed element.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Element {
    pub name: String,
    pub attrs: Vec<(String, String)>,
    pub text: String,
    pub children: Vec<Element>,
}

impl Element {
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum XmlError {
    Malformed(&'static str),
    Oversized,
}

impl fmt::Display for XmlError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Malformed(why) => write!(f, "malformed INDI XML: {why}"),
            Self::Oversized => write!(f, "INDI element exceeds {MAX_BUFFER} bytes"),
        }
    }
}

impl std::error::Error for XmlError {}

/// Outcome of parsing from a position in the buffer.
enum Step<T> {
    Done(T, usize),
    Incomplete,
}

type ParseResult<T> = Result<Step<T>, XmlError>;

/// Byte buffer that yields complete top-level elements.
#[derive(Debug, Default)]
pub struct Scanner {
    buf: Vec<u8>,
}

impl Scanner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn feed(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Bytes held waiting for the rest of an element.
    pub fn pending(&self) -> usize {
        self.buf.len()
    }

    /// Next complete element, `None` if more input is needed.
    pub fn next_element(&mut self) -> Option<Result<Element, XmlError>> {
        loop {
            let Some(open) = self.buf.iter().position(|&b| b == b'<') else {
                self.buf.clear();
                return None;
            };
            self.buf.drain(..open);

            if let Some(skip) = skip_prolog(&self.buf) {
                match skip {
                    Some(end) => {
                        self.buf.drain(..end);
                        continue;
                    }
                    None => return self.incomplete(),
                }
            }

            return match parse_element(&self.buf, 0, 0) {
                Ok(Step::Done(element, end)) => {
                    self.buf.drain(..end);
                    Some(Ok(element))
                }
                Ok(Step::Incomplete) => self.incomplete(),
                Err(e) => {
                    // Skip the offending '<' and resync on the next one.
                    self.buf.drain(..1);
                    Some(Err(e))
                }
            };
        }
    }

    fn incomplete(&mut self) -> Option<Result<Element, XmlError>> {
        if self.buf.len() > MAX_BUFFER {
            self.buf.clear();
            return Some(Err(XmlError::Oversized));
        }
        None
    }
}

/// `Some(Some(end))` to skip a `<?...?>` or comment, `Some(None)` if it is
/// not yet complete, `None` if the buffer does not start with one.
fn skip_prolog(buf: &[u8]) -> Option<Option<usize>> {
    let (close, skip): (&[u8], usize) = if buf.starts_with(b"<?") {
        (b"?>", 2)
    } else if buf.starts_with(b"<!--") {
        (b"-->", 4)
    } else if buf.len() < 4 && b"<!--".starts_with(buf) && buf.len() > 1 {
        return Some(None);
    } else {
        return None;
    };
    Some(find(buf, close, skip).map(|at| at + close.len()))
}

fn find(haystack: &[u8], needle: &[u8], from: usize) -> Option<usize> {
    haystack
        .get(from..)?
        .windows(needle.len())
        .position(|w| w == needle)
        .map(|p| p + from)
}

fn is_name_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || matches!(b, b'_' | b'-' | b':' | b'.') || b >= 0x80
}

/// Read a name at `*i`.  `None` when the name may continue past the buffer.
fn read_name(buf: &[u8], i: &mut usize) -> Option<String> {
    let start = *i;
    while *i < buf.len() && is_name_byte(buf[*i]) {
        *i += 1;
    }
    if *i == buf.len() {
        return None;
    }
    Some(String::from_utf8_lossy(&buf[start..*i]).into_owned())
}

fn skip_ws(buf: &[u8], i: &mut usize) {
    while *i < buf.len() && buf[*i].is_ascii_whitespace() {
        *i += 1;
    }
}

fn parse_element(buf: &[u8], start: usize, depth: usize) -> ParseResult<Element> {
    if depth > MAX_DEPTH {
        return Err(XmlError::Malformed("nesting too deep"));
    }
    let mut i = start + 1;
    let Some(name) = read_name(buf, &mut i) else {
        return Ok(Step::Incomplete);
    };
    if name.is_empty() {
        return Err(XmlError::Malformed("expected element name"));
    }
    let mut element = Element {
        name,
        ..Element::default()
    };

    // ── Attributes ────────────────────────────────────────────
    loop {
        skip_ws(buf, &mut i);
        match buf.get(i) {
            None => return Ok(Step::Incomplete),
            Some(b'/') => {
                return match buf.get(i + 1) {
                    None => Ok(Step::Incomplete),
                    Some(b'>') => Ok(Step::Done(element, i + 2)),
                    Some(_) => Err(XmlError::Malformed("expected '>' after '/'")),
                };
            }
            Some(b'>') => {
                i += 1;
                break;
            }
            Some(_) => {}
        }

        let Some(key) = read_name(buf, &mut i) else {
            return Ok(Step::Incomplete);
        };
        if key.is_empty() {
            return Err(XmlError::Malformed("expected attribute name"));
        }
        skip_ws(buf, &mut i);
        match buf.get(i) {
            None => return Ok(Step::Incomplete),
            Some(b'=') => i += 1,
            Some(_) => return Err(XmlError::Malformed("expected '=' after attribute")),
        }
        skip_ws(buf, &mut i);
        let quote = match buf.get(i) {
            None => return Ok(Step::Incomplete),
            Some(&q @ (b'"' | b'\'')) => q,
            Some(_) => return Err(XmlError::Malformed("unquoted attribute value")),
        };
        let Some(close) = buf[i + 1..].iter().position(|&b| b == quote) else {
            return Ok(Step::Incomplete);
        };
        let raw = &buf[i + 1..i + 1 + close];
        element.attrs.push((key, unescape(&String::from_utf8_lossy(raw))));
        i += close + 2;
    }

    // ── Content ───────────────────────────────────────────────
    loop {
        let Some(&b) = buf.get(i) else {
            return Ok(Step::Incomplete);
        };
        if b != b'<' {
            let Some(next) = buf[i..].iter().position(|&b| b == b'<') else {
                return Ok(Step::Incomplete);
            };
            element
                .text
                .push_str(&unescape(&String::from_utf8_lossy(&buf[i..i + next])));
            i += next;
            continue;
        }

        match buf.get(i + 1) {
            None => return Ok(Step::Incomplete),
            Some(b'/') => {
                let mut j = i + 2;
                let Some(closing) = read_name(buf, &mut j) else {
                    return Ok(Step::Incomplete);
                };
                if closing != element.name {
                    return Err(XmlError::Malformed("mismatched closing tag"));
                }
                skip_ws(buf, &mut j);
                return match buf.get(j) {
                    None => Ok(Step::Incomplete),
                    Some(b'>') => {
                        element.text = element.text.trim().to_owned();
                        Ok(Step::Done(element, j + 1))
                    }
                    Some(_) => Err(XmlError::Malformed("expected '>' in closing tag")),
                };
            }
            Some(b'!') => match skip_prolog(&buf[i..]) {
                Some(Some(len)) => i += len,
                Some(None) => return Ok(Step::Incomplete),
                None => return Err(XmlError::Malformed("unsupported markup declaration")),
            },
            Some(_) => match parse_element(buf, i, depth + 1)? {
                Step::Done(child, end) => {
                    element.children.push(child);
                    i = end;
                }
                Step::Incomplete => return Ok(Step::Incomplete),
            },
        }
    }
}

/// Decode predefined entities and numeric character references.
/// Unknown entities are kept verbatim.
pub fn unescape(raw: &str) -> String {
    if !raw.contains('&') {
        return raw.to_owned();
    }
    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        rest = &rest[amp..];
        let Some(semi) = rest.find(';') else { break };
        let entity = &rest[1..semi];
        let decoded = match entity {
            "lt" => Some('<'),
            "gt" => Some('>'),
            "amp" => Some('&'),
            "quot" => Some('"'),
            "apos" => Some('\''),
            _ => entity
                .strip_prefix("#x")
                .map(|hex| u32::from_str_radix(hex, 16))
                .or_else(|| entity.strip_prefix('#').map(str::parse))
                .and_then(Result::ok)
                .and_then(char::from_u32),
        };
        match decoded {
            Some(c) => {
                out.push(c);
                rest = &rest[semi + 1..];
            }
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

/// Escape text for an attribute value or element body.
pub fn escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            c => out.push(c),
        }
    }
    out
}
