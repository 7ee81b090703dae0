// See https://tools.ietf.org/html/rfc1035#section-4.1.4 for name compression.

use alloc::string::String;
use alloc::vec::Vec;
use heapless::Vec as BoundedVec;

use crate::{Error, Result};

/// Longest label, in octets.
pub const MAX_LABEL_LEN: usize = 63;
/// Longest name on the wire, including length octets and the root label.
pub const MAX_NAME_WIRE_LEN: usize = 255;
/// Longest name accepted from the wire once decompressed and rendered.
pub const MAX_NAME_TEXT_LEN: usize = 1024;
/// Compression pointers followed for a single name.
pub const MAX_POINTER_HOPS: usize = 128;

fn is_label_octet(c: u8) -> bool {
    c.is_ascii_alphanumeric() || c == b'-' || c == b'_'
}

/// Return whether `name` is a dotted domain name made of safe labels.
///
/// A single trailing dot is accepted.
pub fn is_valid_name(name: &str) -> bool {
    let name = name.strip_suffix('.').unwrap_or(name);
    if name.is_empty() || name.len() > MAX_NAME_WIRE_LEN - 2 {
        return false;
    }
    name.split('.').all(|label| {
        !label.is_empty()
            && label.len() <= MAX_LABEL_LEN
            && label.bytes().all(is_label_octet)
    })
}

/// Encode a dotted name as a sequence of length-prefixed labels.
///
/// The empty name and `.` encode as the root label alone.
pub fn encode(name: &str) -> Result<BoundedVec<u8, MAX_NAME_WIRE_LEN>> {
    let name = name.strip_suffix('.').unwrap_or(name);
    let mut out = BoundedVec::new();

    if !name.is_empty() {
        for label in name.split('.') {
            if label.is_empty()
                || label.len() > MAX_LABEL_LEN
                || !label.bytes().all(is_label_octet)
            {
                return Err(Error::InvalidFieldValue);
            }
            out.push(label.len() as u8)
                .map_err(|_| Error::BufferTooSmall)?;
            out.extend_from_slice(label.as_bytes())
                .map_err(|_| Error::BufferTooSmall)?;
        }
    }
    out.push(0).map_err(|_| Error::BufferTooSmall)?;

    Ok(out)
}

/// Encode a whitespace separated list of names back to back.
pub fn encode_list(names: &str) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    for name in names.split_whitespace() {
        out.extend_from_slice(&encode(name)?);
    }
    if out.is_empty() {
        return Err(Error::SchemaMismatch);
    }
    Ok(out)
}

/// Decode every name in `buffer`, joined by single spaces.
///
/// Compression pointers are offsets into `buffer` itself, which is how
/// DHCP carries name lists (RFC 3397, RFC 3315).
pub fn decode_list(buffer: &[u8]) -> Result<String> {
    let mut out = String::new();
    let mut offset = 0;

    while offset < buffer.len() {
        let (name, next) = decode_name(buffer, offset)?;
        if !name.is_empty() {
            if !out.is_empty() {
                out.push(' ');
            }
            out.push_str(&name);
        }
        offset = next;
    }

    Ok(out)
}

/// Decode the name starting at `start`.
///
/// Returns the dotted name and the offset just past its encoding in
/// `buffer`, which is where the next name in a list begins.
pub fn decode_name(buffer: &[u8], start: usize) -> Result<(String, usize)> {
    let mut name = String::new();
    let mut pos = start;
    // Every pointer must land strictly below this offset, so each jump
    // moves backwards and a name can never revisit a pointer.
    let mut limit = start;
    let mut resume = None;
    let mut hops = 0;

    loop {
        let len = *buffer.get(pos).ok_or(Error::UnterminatedCompression)?;
        match len & 0xc0 {
            0x00 if len == 0 => {
                pos += 1;
                break;
            }
            0x00 => {
                let len = len as usize;
                let label = buffer
                    .get(pos + 1..pos + 1 + len)
                    .ok_or(Error::UnterminatedCompression)?;
                if !label.iter().copied().all(is_label_octet) {
                    return Err(Error::InvalidFieldValue);
                }
                if name.len() + 1 + len > MAX_NAME_TEXT_LEN {
                    return Err(Error::MalformedLength);
                }
                if !name.is_empty() {
                    name.push('.');
                }
                name.extend(label.iter().map(|c| *c as char));
                pos += 1 + len;
            }
            0xc0 => {
                let low = *buffer.get(pos + 1).ok_or(Error::UnterminatedCompression)?;
                let ptr = ((len & 0x3f) as usize) << 8 | low as usize;
                if ptr >= limit {
                    net_debug!("dname: pointer to {} at {} is not backwards", ptr, pos);
                    return Err(Error::CompressionLoop);
                }
                hops += 1;
                if hops > MAX_POINTER_HOPS {
                    return Err(Error::CompressionLoop);
                }
                if resume.is_none() {
                    resume = Some(pos + 2);
                }
                limit = ptr;
                pos = ptr;
            }
            _ => return Err(Error::InvalidFieldValue),
        }
    }

    Ok((name, resume.unwrap_or(pos)))
}

#[cfg(test)]
mod test {
    use super::*;
    use alloc::vec;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    #[test]
    fn test_long_name_decodes_but_does_not_encode() {
        let mut wire = Vec::new();
        for _ in 0..5 {
            wire.push(63);
            wire.extend_from_slice(&[b'a'; 63]);
        }
        wire.push(0);

        let names = decode_list(&wire).unwrap();
        assert_eq!(names.len(), 5 * 63 + 4);
        assert_eq!(encode_list(&names), Err(Error::BufferTooSmall));
    }

    #[test]
    fn test_encode() {
        assert_eq!(
            &encode("www.example.com").unwrap()[..],
            b"\x03www\x07example\x03com\x00"
        );
        assert_eq!(
            &encode("www.example.com.").unwrap()[..],
            b"\x03www\x07example\x03com\x00"
        );
        assert_eq!(&encode("").unwrap()[..], b"\x00");
        assert_eq!(&encode(".").unwrap()[..], b"\x00");
    }

    #[test]
    fn test_encode_rejects() {
        let long_label = "a".repeat(64);
        assert_eq!(encode(&long_label), Err(Error::InvalidFieldValue));
        assert_eq!(encode("a..b"), Err(Error::InvalidFieldValue));
        assert_eq!(encode("semi;colon"), Err(Error::InvalidFieldValue));

        let label = "a".repeat(63);
        let long_name = [&label[..]; 5].join(".");
        assert_eq!(encode(&long_name), Err(Error::BufferTooSmall));
    }

    #[test]
    fn test_round_trip() {
        let mut rng = StdRng::seed_from_u64(1035);
        let alphabet = b"abcdefghijklmnopqrstuvwxyz0123456789-_";
        for _ in 0..200 {
            let labels = rng.gen_range(1..5);
            let mut name = String::new();
            for i in 0..labels {
                if i > 0 {
                    name.push('.');
                }
                for _ in 0..rng.gen_range(1..=MAX_LABEL_LEN) {
                    name.push(alphabet[rng.gen_range(0..alphabet.len())] as char);
                }
            }
            let wire = encode(&name).unwrap();
            assert_eq!(decode_list(&wire).unwrap(), name);
        }
    }

    #[test]
    fn test_decode_list_with_pointers() {
        let bytes = b"\x07example\x03com\x00\x03www\xc0\x00\x04mail\xc0\x00";
        assert_eq!(
            decode_list(bytes).unwrap(),
            "example.com www.example.com mail.example.com"
        );
    }

    #[test]
    fn test_decode_name_resume_offset() {
        let bytes = b"\x03com\x00\x07example\xc0\x00";
        assert_eq!(decode_name(bytes, 5).unwrap(), ("example.com".into(), 15));
        assert_eq!(decode_name(bytes, 0).unwrap(), ("com".into(), 5));
    }

    #[test]
    fn test_forward_pointer() {
        assert_eq!(decode_list(&[0xc0, 0x02, 0x00]), Err(Error::CompressionLoop));
    }

    #[test]
    fn test_self_pointer() {
        assert_eq!(decode_list(&[0xc0, 0x00]), Err(Error::CompressionLoop));
    }

    #[test]
    fn test_pointer_loop() {
        // "a" followed by a pointer back to the start of the same name.
        assert_eq!(
            decode_list(&[0x01, b'a', 0xc0, 0x00]),
            Err(Error::CompressionLoop)
        );
        // Second name points at the first, whose tail points forward again.
        assert_eq!(
            decode_list(&[0x01, b'a', 0xc0, 0x04, 0x01, b'b', 0xc0, 0x00]),
            Err(Error::CompressionLoop)
        );
    }

    #[test]
    fn test_truncated() {
        assert_eq!(decode_list(&[0x05, b'a']), Err(Error::UnterminatedCompression));
        assert_eq!(decode_list(&[0x01, b'a']), Err(Error::UnterminatedCompression));
        assert_eq!(
            decode_list(&[0x01, b'a', 0x00, 0xc0]),
            Err(Error::UnterminatedCompression)
        );
    }

    #[test]
    fn test_reserved_label_types() {
        assert_eq!(decode_list(&[0x41, b'a', 0x00]), Err(Error::InvalidFieldValue));
        assert_eq!(decode_list(&[0x81, b'a', 0x00]), Err(Error::InvalidFieldValue));
    }

    #[test]
    fn test_unsafe_label() {
        assert_eq!(
            decode_list(b"\x04a\"b;\x00"),
            Err(Error::InvalidFieldValue)
        );
    }

    #[test]
    fn test_text_cap() {
        let mut bytes = vec![];
        for _ in 0..17 {
            bytes.push(63);
            bytes.extend_from_slice(&[b'a'; 63]);
        }
        bytes.push(0);
        assert_eq!(decode_list(&bytes), Err(Error::MalformedLength));
    }

    #[test]
    fn test_is_valid_name() {
        assert!(is_valid_name("example.com"));
        assert!(is_valid_name("example.com."));
        assert!(is_valid_name("host_1-a"));
        assert!(!is_valid_name(""));
        assert!(!is_valid_name("a..b"));
        assert!(!is_valid_name("a b"));
        assert!(!is_valid_name("$(reboot)"));
    }
}
