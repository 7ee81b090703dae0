use alloc::string::String;
use alloc::vec::Vec;

use crate::{Error, Result};

/// How option text is rendered for, and parsed from, the outside world.
///
/// The escaped forms are an external format: scripts consume them, so the
/// rules below must not change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TextMode {
    /// Printable ASCII; rendering stops at the first NUL.
    Plain,
    /// ASCII with control characters octal escaped.
    Ascii,
    /// Everything outside printable ASCII, plus `\` and `"`, is escaped.
    EscString,
    /// As `EscString`, additionally escaping `/` and space.
    EscFile,
    /// Bytes pass through untouched.
    Raw,
    /// Printable ASCII without whitespace.
    Uri,
    /// Two lowercase hex digits per byte.
    BinHex,
}

const HEX: &[u8; 16] = b"0123456789abcdef";

fn is_printable(c: u8) -> bool {
    (0x20..=0x7e).contains(&c)
}

fn needs_escape(c: u8, mode: TextMode) -> bool {
    match mode {
        TextMode::Ascii => c == b'\\' || !is_printable(c),
        TextMode::EscString => c == b'\\' || c == b'"' || !is_printable(c),
        TextMode::EscFile => {
            c == b'\\' || c == b'"' || c == b'/' || c == b' ' || !is_printable(c)
        }
        _ => false,
    }
}

fn push_octal(out: &mut String, c: u8) {
    out.push('\\');
    out.push((b'0' + ((c >> 6) & 0o3)) as char);
    out.push((b'0' + ((c >> 3) & 0o7)) as char);
    out.push((b'0' + (c & 0o7)) as char);
}

/// Render `data` as text according to `mode`.
pub fn render(data: &[u8], mode: TextMode) -> Result<String> {
    let mut out = String::with_capacity(data.len());

    match mode {
        TextMode::BinHex => return Ok(hex(data)),
        TextMode::Plain => {
            for &c in data.iter().take_while(|c| **c != 0) {
                if !is_printable(c) {
                    return Err(Error::InvalidFieldValue);
                }
                out.push(c as char);
            }
        }
        TextMode::Uri => {
            for &c in data {
                if !is_printable(c) || c == b' ' {
                    return Err(Error::InvalidFieldValue);
                }
                out.push(c as char);
            }
        }
        TextMode::Ascii | TextMode::EscString | TextMode::EscFile => {
            for &c in data {
                if mode == TextMode::Ascii && !c.is_ascii() {
                    return Err(Error::InvalidFieldValue);
                }
                if !needs_escape(c, mode) {
                    out.push(c as char);
                } else if c == b'\\' || c == b'"' {
                    out.push('\\');
                    out.push(c as char);
                } else {
                    push_octal(&mut out, c);
                }
            }
        }
        TextMode::Raw => {
            // Only valid when the bytes happen to be printable; callers that
            // need arbitrary bytes keep them as bytes.
            for &c in data {
                if !is_printable(c) {
                    return Err(Error::InvalidFieldValue);
                }
                out.push(c as char);
            }
        }
    }

    Ok(out)
}

fn hex_digit(c: u8) -> Result<u8> {
    match c {
        b'0'..=b'9' => Ok(c - b'0'),
        b'a'..=b'f' => Ok(c - b'a' + 10),
        b'A'..=b'F' => Ok(c - b'A' + 10),
        _ => Err(Error::InvalidFieldValue),
    }
}

fn parse_hex(text: &str) -> Result<Vec<u8>> {
    let digits: Vec<u8> = text.bytes().filter(|c| *c != b':').collect();
    if digits.len() % 2 != 0 {
        return Err(Error::InvalidFieldValue);
    }
    digits
        .chunks(2)
        .map(|pair| Ok(hex_digit(pair[0])? << 4 | hex_digit(pair[1])?))
        .collect()
}

fn parse_escaped(text: &str, mode: TextMode) -> Result<Vec<u8>> {
    let bytes = text.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        let c = bytes[i];
        if c != b'\\' {
            if needs_escape(c, mode) {
                return Err(Error::InvalidFieldValue);
            }
            out.push(c);
            i += 1;
            continue;
        }
        match bytes.get(i + 1..i + 4) {
            Some(&[a, b, c]) if a.is_ascii_digit() && b.is_ascii_digit() && c.is_ascii_digit() => {
                let (a, b, c) = (a - b'0', b - b'0', c - b'0');
                if a > 3 || b > 7 || c > 7 {
                    return Err(Error::InvalidFieldValue);
                }
                out.push(a << 6 | b << 3 | c);
                i += 4;
            }
            _ => match bytes.get(i + 1) {
                Some(&c) if c == b'\\' || c == b'"' => {
                    out.push(c);
                    i += 2;
                }
                _ => return Err(Error::InvalidFieldValue),
            },
        }
    }

    Ok(out)
}

/// Parse text previously produced by [render], or written by a user in the
/// same convention, back into payload bytes.
pub fn parse(text: &str, mode: TextMode) -> Result<Vec<u8>> {
    match mode {
        TextMode::BinHex => parse_hex(text),
        TextMode::Ascii | TextMode::EscString | TextMode::EscFile => parse_escaped(text, mode),
        TextMode::Plain | TextMode::Raw => {
            if !text.bytes().all(is_printable) {
                return Err(Error::InvalidFieldValue);
            }
            Ok(text.as_bytes().to_vec())
        }
        TextMode::Uri => {
            if !text.bytes().all(|c| is_printable(c) && c != b' ') {
                return Err(Error::InvalidFieldValue);
            }
            Ok(text.as_bytes().to_vec())
        }
    }
}

/// Render `data` as lowercase hex with no separators.
pub fn hex(data: &[u8]) -> String {
    let mut out = String::with_capacity(data.len() * 2);
    for c in data {
        out.push(HEX[(c >> 4) as usize] as char);
        out.push(HEX[(c & 0x0f) as usize] as char);
    }
    out
}
