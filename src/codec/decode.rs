use alloc::string::{String, ToString};
use alloc::vec::Vec;
use byteorder::{ByteOrder, NetworkEndian};
use core::fmt::Write;
use core::net::{Ipv4Addr, Ipv6Addr};

use super::{text_mode, Codec, DecodeContext, Decoded, DecodedOption, Value, MAX_DEPTH};
use crate::schema::{Descriptor, OptionType};
use crate::wire::escape::{self, TextMode};
use crate::wire::{dname, Framing, OptionSource, RawOption, TlvSource};
use crate::{Error, Result};

enum_with_unknown! {
    /// Encoding octet of the SIP servers option (RFC 3361).
    pub enum Rfc3361Encoding(u8) {
        Names = 0,
        Addresses = 1,
    }
}

impl<'r> Codec<'r> {
    /// Decode the payload of one option.
    pub fn decode(&self, descriptor: &Descriptor, data: &[u8], ctx: &mut DecodeContext) -> Result<Value> {
        self.decode_at(descriptor, data, ctx, 0)
    }

    /// Decode every known option in a message.
    ///
    /// Options are returned in the order they appear. Repeated instances of
    /// a DHCPv4 option are concatenated (RFC 3396) and returned once, in the
    /// position of the first; in DHCPv6 only `TRUNCATED` options are joined. Options the registry has no descriptor for, and `RESERVED`
    /// ones, are skipped. Only errors in the option framing itself fail the
    /// whole message.
    pub fn decode_all<'a, S>(&self, source: &mut S, ctx: &mut DecodeContext) -> Result<Vec<DecodedOption>>
    where
        S: OptionSource<'a> + ?Sized,
    {
        let mut options: Vec<RawOption<'a>> = Vec::new();
        source.rewind();
        while let Some(option) = source.next_option() {
            options.push(option?);
        }

        let mut decoded = Vec::new();
        for (i, option) in options.iter().enumerate() {
            let descriptor = match self.registry.lookup(self.space, option.code) {
                Some(descriptor) => descriptor,
                None => {
                    net_trace!("decode: no descriptor for option {}", option.code);
                    continue;
                }
            };
            if descriptor.kind.contains(OptionType::RESERVED) {
                continue;
            }

            let joined;
            let join = self.space.framing() == Framing::Dhcpv4
                || descriptor.kind.contains(OptionType::TRUNCATED);
            let data = if join {
                if options[..i].iter().any(|o| o.code == option.code) {
                    continue;
                }
                joined = options
                    .iter()
                    .filter(|o| o.code == option.code)
                    .flat_map(|o| o.data.iter().copied())
                    .collect::<Vec<u8>>();
                &joined[..]
            } else {
                option.data
            };

            let index = if descriptor.kind.contains(OptionType::INDEX) {
                Some(ctx.next_index(0, option.code)?)
            } else {
                None
            };

            let value = self.decode_at(descriptor, data, ctx, 0);
            if let Err(err) = &value {
                net_debug!("decode: option {} ({}): {}", option.code, descriptor.name, err);
            }
            decoded.push(DecodedOption {
                code: option.code,
                index,
                value,
            });
        }

        Ok(decoded)
    }

    pub(crate) fn decode_at(
        &self,
        descriptor: &Descriptor,
        data: &[u8],
        ctx: &mut DecodeContext,
        depth: usize,
    ) -> Result<Value> {
        if depth > MAX_DEPTH {
            return Err(Error::TooDeep);
        }
        let kind = descriptor.kind;

        if data.is_empty() {
            return if kind.contains(OptionType::OPTIONAL) {
                Ok(Value::Absent)
            } else if kind.contains(OptionType::FLAG) {
                Ok(Value::Present)
            } else {
                Err(Error::MalformedLength)
            };
        }
        if kind.contains(OptionType::FLAG) {
            return Err(Error::MalformedLength);
        }

        if self.is_vendor(descriptor, depth) {
            self.decode_vendor(data, ctx, depth)
        } else if kind.intersects(OptionType::EMBED | OptionType::ENCAP) {
            self.decode_composite(descriptor, data, ctx, depth)
        } else {
            decode_scalar(descriptor, data)
        }
    }

    fn decode_composite(
        &self,
        descriptor: &Descriptor,
        data: &[u8],
        ctx: &mut DecodeContext,
        depth: usize,
    ) -> Result<Value> {
        let mut embedded = Vec::with_capacity(descriptor.embedded.len());
        let mut offset = 0;

        for child in &descriptor.embedded {
            let rest = &data[offset..];
            if rest.is_empty() && !child.kind.contains(OptionType::FLAG) {
                if child.kind.contains(OptionType::OPTIONAL) {
                    embedded.push(Value::Absent);
                    break;
                }
                net_debug!("decode: {}: missing field {}", descriptor.name, child.name);
                return Err(Error::MalformedLength);
            }

            let width = child.width(rest.len());
            if width > rest.len() {
                net_debug!(
                    "decode: {}: field {} needs {} octets, {} left",
                    descriptor.name,
                    child.name,
                    width,
                    rest.len()
                );
                return Err(Error::MalformedLength);
            }
            embedded.push(self.decode_at(child, &rest[..width], ctx, depth + 1)?);
            offset += width;
        }

        let rest = &data[offset..];
        let encapsulated = if descriptor.kind.contains(OptionType::ENCAP) {
            self.decode_stream(descriptor, rest, ctx, depth + 1)?
        } else if rest.is_empty() {
            Vec::new()
        } else {
            net_debug!("decode: {}: {} trailing octets", descriptor.name, rest.len());
            return Err(Error::MalformedLength);
        };

        Ok(Value::Composite {
            embedded,
            encapsulated,
        })
    }

    /// Decode a TLV stream of the sub-options of `parent`.
    fn decode_stream(
        &self,
        parent: &Descriptor,
        data: &[u8],
        ctx: &mut DecodeContext,
        depth: usize,
    ) -> Result<Vec<Decoded>> {
        if depth > MAX_DEPTH {
            return Err(Error::TooDeep);
        }
        let scope = ctx.open_scope();
        let result = self.decode_stream_in(parent, data, ctx, depth, scope);
        ctx.close_scope(scope);
        result
    }

    fn decode_stream_in(
        &self,
        parent: &Descriptor,
        data: &[u8],
        ctx: &mut DecodeContext,
        depth: usize,
        scope: u32,
    ) -> Result<Vec<Decoded>> {
        let mut source = TlvSource::new(self.space.framing(), data);
        let mut decoded = Vec::new();

        while let Some(option) = source.next_option() {
            let option = option?;
            let child = match self.resolve(parent, option.code) {
                Some(child) => child,
                None => {
                    net_trace!("decode: {}: unknown sub-option {}", parent.name, option.code);
                    decoded.push(Decoded {
                        code: option.code,
                        index: None,
                        value: Value::Raw(option.data.to_vec()),
                    });
                    continue;
                }
            };
            if child.kind.contains(OptionType::RESERVED) {
                continue;
            }

            let index = if child.kind.contains(OptionType::INDEX) {
                Some(ctx.next_index(scope, option.code)?)
            } else {
                None
            };
            let value = self.decode_at(child, option.data, ctx, depth + 1)?;
            decoded.push(Decoded {
                code: option.code,
                index,
                value,
            });
        }

        Ok(decoded)
    }

    fn decode_vendor(&self, data: &[u8], ctx: &mut DecodeContext, depth: usize) -> Result<Value> {
        let mut encapsulated = Vec::new();
        let mut rest = data;

        while !rest.is_empty() {
            if rest.len() < 4 {
                return Err(Error::MalformedLength);
            }
            let enterprise = NetworkEndian::read_u32(&rest[..4]);
            let stream = match self.space.framing() {
                Framing::Dhcpv4 => {
                    let len = *rest.get(4).ok_or(Error::MalformedLength)? as usize;
                    let stream = rest.get(5..5 + len).ok_or(Error::MalformedLength)?;
                    rest = &rest[5 + len..];
                    stream
                }
                Framing::Dhcpv6 => {
                    let stream = &rest[4..];
                    rest = &[];
                    stream
                }
            };

            let value = match self.registry.vendor_lookup(self.space, enterprise) {
                Some(vendor) => Value::Composite {
                    embedded: Vec::new(),
                    encapsulated: self.decode_stream(vendor, stream, ctx, depth + 1)?,
                },
                None => {
                    net_debug!("decode: no table for enterprise {}", enterprise);
                    Value::Raw(stream.to_vec())
                }
            };
            encapsulated.push(Decoded {
                code: enterprise,
                index: None,
                value,
            });
        }

        Ok(Value::Composite {
            embedded: Vec::new(),
            encapsulated,
        })
    }
}

fn join<I: Iterator<Item = String>>(items: I) -> String {
    let mut out = String::new();
    for item in items {
        if !out.is_empty() {
            out.push(' ');
        }
        out.push_str(&item);
    }
    out
}

/// Render one element of a fixed-width type. `chunk` has the exact width.
fn render_element(kind: OptionType, chunk: &[u8]) -> String {
    if kind.contains(OptionType::UINT8) {
        chunk[0].to_string()
    } else if kind.contains(OptionType::INT8) {
        (chunk[0] as i8).to_string()
    } else if kind.contains(OptionType::UINT16) {
        NetworkEndian::read_u16(chunk).to_string()
    } else if kind.contains(OptionType::INT16) {
        NetworkEndian::read_i16(chunk).to_string()
    } else if kind.contains(OptionType::UINT32) {
        NetworkEndian::read_u32(chunk).to_string()
    } else if kind.contains(OptionType::INT32) {
        NetworkEndian::read_i32(chunk).to_string()
    } else if kind.contains(OptionType::ADDRIPV4) {
        Ipv4Addr::new(chunk[0], chunk[1], chunk[2], chunk[3]).to_string()
    } else {
        let mut octets = [0u8; 16];
        octets.copy_from_slice(chunk);
        Ipv6Addr::from(octets).to_string()
    }
}

fn decode_scalar(descriptor: &Descriptor, data: &[u8]) -> Result<Value> {
    let kind = descriptor.kind;

    if kind.contains(OptionType::RFC3442) {
        return decode_rfc3442(data).map(Value::Text);
    }
    if kind.contains(OptionType::RFC3361) {
        return decode_rfc3361(data).map(Value::Text);
    }
    if kind.contains(OptionType::RFC1035) {
        return dname::decode_list(data).map(Value::Text);
    }
    if kind.contains(OptionType::BITFLAG) {
        return decode_bitflags(descriptor, data).map(Value::Text);
    }

    if let Some(width) = kind.fixed_width() {
        let valid = if kind.contains(OptionType::ARRAY) {
            data.len() % width == 0
        } else {
            data.len() == width
        };
        if !valid {
            return Err(Error::MalformedLength);
        }
        let text = join(data.chunks(width).map(|chunk| render_element(kind, chunk)));
        return Ok(Value::Text(text));
    }

    if kind.contains(OptionType::ARRAY | OptionType::URI) {
        return decode_uri_list(data).map(Value::Text);
    }

    if descriptor.len > 0 && data.len() != descriptor.len {
        return Err(Error::MalformedLength);
    }

    if kind.contains(OptionType::DOMAIN) {
        let name = escape::render(data, TextMode::Plain)?;
        if !dname::is_valid_name(&name) {
            return Err(Error::InvalidFieldValue);
        }
        return Ok(Value::Text(name));
    }

    match text_mode(kind) {
        Some(TextMode::Raw) | None => Ok(Value::Raw(data.to_vec())),
        Some(mode) => escape::render(data, mode).map(Value::Text),
    }
}

// See https://tools.ietf.org/html/rfc3442 for the route encoding.
fn decode_rfc3442(data: &[u8]) -> Result<String> {
    let mut out = String::new();
    let mut rest = data;

    while let Some(&prefix) = rest.first() {
        if prefix > 32 {
            return Err(Error::InvalidFieldValue);
        }
        let dest_len = (prefix as usize).div_ceil(8);
        let entry = rest
            .get(1..1 + dest_len + 4)
            .ok_or(Error::MalformedLength)?;

        let mut dest = [0u8; 4];
        dest[..dest_len].copy_from_slice(&entry[..dest_len]);
        let gateway = Ipv4Addr::new(
            entry[dest_len],
            entry[dest_len + 1],
            entry[dest_len + 2],
            entry[dest_len + 3],
        );

        if !out.is_empty() {
            out.push(' ');
        }
        // Writing to a String cannot fail.
        let _ = write!(out, "{}/{} {}", Ipv4Addr::from(dest), prefix, gateway);
        rest = &rest[1 + dest_len + 4..];
    }

    Ok(out)
}

fn decode_rfc3361(data: &[u8]) -> Result<String> {
    let (&encoding, rest) = data.split_first().ok_or(Error::MalformedLength)?;
    if rest.is_empty() {
        return Err(Error::MalformedLength);
    }

    match Rfc3361Encoding::from(encoding) {
        Rfc3361Encoding::Names => dname::decode_list(rest),
        Rfc3361Encoding::Addresses => {
            if rest.len() % 4 != 0 {
                return Err(Error::MalformedLength);
            }
            Ok(join(rest.chunks(4).map(|chunk| {
                Ipv4Addr::new(chunk[0], chunk[1], chunk[2], chunk[3]).to_string()
            })))
        }
        Rfc3361Encoding::Unknown(other) => {
            net_debug!("decode: unknown sip server encoding {}", other);
            Err(Error::InvalidFieldValue)
        }
    }
}

fn decode_bitflags(descriptor: &Descriptor, data: &[u8]) -> Result<String> {
    let byte = match data {
        [byte] => *byte,
        _ => return Err(Error::MalformedLength),
    };

    let mut out = String::new();
    for (bit, label) in descriptor.bitflags.iter().enumerate() {
        if *label == b'0' || *label == 0 {
            continue;
        }
        if byte & (0x80 >> bit) != 0 {
            out.push(*label as char);
        }
    }
    Ok(out)
}

/// Decode a list of URIs, each preceded by a 16-bit length (RFC 5970).
fn decode_uri_list(data: &[u8]) -> Result<String> {
    let mut out = String::new();
    let mut rest = data;

    while !rest.is_empty() {
        if rest.len() < 2 {
            return Err(Error::MalformedLength);
        }
        let len = NetworkEndian::read_u16(&rest[..2]) as usize;
        let uri = rest.get(2..2 + len).ok_or(Error::MalformedLength)?;
        if uri.is_empty() {
            return Err(Error::MalformedLength);
        }
        if !out.is_empty() {
            out.push(' ');
        }
        out.push_str(&escape::render(uri, TextMode::Uri)?);
        rest = &rest[2 + len..];
    }

    Ok(out)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::schema::{OptionType as T, Registry, Space};
    use alloc::vec;

    fn decode(registry: &Registry, space: Space, descriptor: &Descriptor, data: &[u8]) -> Result<Value> {
        Codec::new(registry, space).decode(descriptor, data, &mut DecodeContext::new())
    }

    fn text(s: &str) -> Value {
        Value::Text(s.into())
    }

    #[test]
    fn test_fixed_widths() {
        let registry = Registry::new();
        let d = Descriptor::new(1, T::UINT16, "mtu");
        assert_eq!(decode(&registry, Space::Dhcp, &d, &[0x05, 0xdc]), Ok(text("1500")));
        assert_eq!(decode(&registry, Space::Dhcp, &d, &[0x05]), Err(Error::MalformedLength));
        assert_eq!(decode(&registry, Space::Dhcp, &d, &[0, 0, 0]), Err(Error::MalformedLength));

        let d = Descriptor::new(2, T::INT32, "offset");
        assert_eq!(decode(&registry, Space::Dhcp, &d, &[0xff, 0xff, 0xf1, 0xf0]), Ok(text("-3600")));

        let d = Descriptor::new(3, T::ARRAY | T::ADDRIPV4, "routers");
        assert_eq!(
            decode(&registry, Space::Dhcp, &d, &[10, 0, 0, 1, 10, 0, 0, 2]),
            Ok(text("10.0.0.1 10.0.0.2"))
        );
        assert_eq!(
            decode(&registry, Space::Dhcp, &d, &[10, 0, 0, 1, 10]),
            Err(Error::MalformedLength)
        );
        assert_eq!(decode(&registry, Space::Dhcp, &d, &[]), Err(Error::MalformedLength));

        let d = Descriptor::new(12, T::ADDRIPV6, "unicast");
        let mut addr = [0u8; 16];
        addr[0] = 0xfe;
        addr[1] = 0x80;
        addr[15] = 1;
        assert_eq!(decode(&registry, Space::Dhcp6, &d, &addr), Ok(text("fe80::1")));
    }

    #[test]
    fn test_empty_payloads() {
        let registry = Registry::new();
        let flag = Descriptor::new(80, T::FLAG, "rapid_commit");
        assert_eq!(decode(&registry, Space::Dhcp, &flag, &[]), Ok(Value::Present));
        assert_eq!(decode(&registry, Space::Dhcp, &flag, &[1]), Err(Error::MalformedLength));

        let optional = Descriptor::new(1, T::OPTIONAL | T::STRING, "message");
        assert_eq!(decode(&registry, Space::Dhcp, &optional, &[]), Ok(Value::Absent));
    }

    #[test]
    fn test_embedded_widths() {
        let registry = Registry::new();
        let d = Descriptor::new(200, T::empty(), "pair")
            .embed(Descriptor::new(0, T::UINT8, "a"))
            .embed(Descriptor::new(0, T::UINT16, "b"));
        assert_eq!(
            decode(&registry, Space::Dhcp, &d, &[7, 0x01, 0x02]),
            Ok(Value::Composite {
                embedded: vec![text("7"), text("258")],
                encapsulated: vec![],
            })
        );
        assert_eq!(decode(&registry, Space::Dhcp, &d, &[7, 0x01]), Err(Error::MalformedLength));
        assert_eq!(
            decode(&registry, Space::Dhcp, &d, &[7, 0x01, 0x02, 0x03]),
            Err(Error::MalformedLength)
        );
    }

    #[test]
    fn test_embedded_optional_tail() {
        let registry = Registry::new();
        let d = Descriptor::new(81, T::empty(), "fqdn")
            .embed(Descriptor::new(0, T::BITFLAG, "flags").with_bitflags(b"0000NEOS"))
            .embed(Descriptor::new(0, T::UINT8, "rcode1"))
            .embed(Descriptor::new(0, T::UINT8, "rcode2"))
            .embed(Descriptor::new(0, T::OPTIONAL | T::RFC1035, "fqdn"));

        assert_eq!(
            decode(&registry, Space::Dhcp, &d, &[0x05, 0, 0]),
            Ok(Value::Composite {
                embedded: vec![text("ES"), text("0"), text("0"), Value::Absent],
                encapsulated: vec![],
            })
        );
        assert_eq!(
            decode(&registry, Space::Dhcp, &d, b"\x0c\xff\xff\x04host\x03lan\x00"),
            Ok(Value::Composite {
                embedded: vec![text("NE"), text("255"), text("255"), text("host.lan")],
                encapsulated: vec![],
            })
        );
    }

    #[test]
    fn test_encapsulated_unknown_is_raw() {
        let registry = Registry::new();
        let d = Descriptor::new(43, T::empty(), "vendor")
            .encap(Descriptor::new(1, T::ADDRIPV4, "server"));
        let data = [1, 4, 10, 0, 0, 1, 9, 2, 0xab, 0xcd];
        assert_eq!(
            decode(&registry, Space::Dhcp, &d, &data),
            Ok(Value::Composite {
                embedded: vec![],
                encapsulated: vec![
                    Decoded { code: 1, index: None, value: text("10.0.0.1") },
                    Decoded { code: 9, index: None, value: Value::Raw(vec![0xab, 0xcd]) },
                ],
            })
        );
        assert_eq!(
            decode(&registry, Space::Dhcp, &d, &[1, 4, 10, 0]),
            Err(Error::MalformedLength)
        );
    }

    #[test]
    fn test_rfc3442() {
        let registry = Registry::new();
        let d = Descriptor::new(121, T::RFC3442, "classless_static_routes");
        let data = [24, 192, 168, 1, 10, 0, 0, 1, 0, 10, 0, 0, 254];
        assert_eq!(
            decode(&registry, Space::Dhcp, &d, &data),
            Ok(text("192.168.1.0/24 10.0.0.1 0.0.0.0/0 10.0.0.254"))
        );
        assert_eq!(
            decode(&registry, Space::Dhcp, &d, &[33, 1, 2, 3, 4, 5, 10, 0, 0, 1]),
            Err(Error::InvalidFieldValue)
        );
        assert_eq!(
            decode(&registry, Space::Dhcp, &d, &[24, 192, 168, 1, 10, 0, 0]),
            Err(Error::MalformedLength)
        );
    }

    #[test]
    fn test_rfc3361() {
        let registry = Registry::new();
        let d = Descriptor::new(120, T::RFC3361, "sip_server");
        assert_eq!(
            decode(&registry, Space::Dhcp, &d, b"\x00\x03sip\x07example\x03com\x00"),
            Ok(text("sip.example.com"))
        );
        assert_eq!(
            decode(&registry, Space::Dhcp, &d, &[1, 10, 0, 0, 1, 10, 0, 0, 2]),
            Ok(text("10.0.0.1 10.0.0.2"))
        );
        assert_eq!(decode(&registry, Space::Dhcp, &d, &[1, 10, 0]), Err(Error::MalformedLength));
        assert_eq!(decode(&registry, Space::Dhcp, &d, &[2, 10, 0, 0, 1]), Err(Error::InvalidFieldValue));
    }

    #[test]
    fn test_strings() {
        let registry = Registry::new();
        let d = Descriptor::new(56, T::STRING | T::ESCSTRING, "message");
        assert_eq!(decode(&registry, Space::Dhcp, &d, b"a\"b"), Ok(text("a\\\"b")));

        let d = Descriptor::new(61, T::BINHEX, "client_id");
        assert_eq!(decode(&registry, Space::Dhcp, &d, &[1, 0xaa]), Ok(text("01aa")));

        let d = Descriptor::new(1, T::RAW, "blob");
        assert_eq!(decode(&registry, Space::Dhcp, &d, &[0, 1]), Ok(Value::Raw(vec![0, 1])));

        let d = Descriptor::new(1, T::BINHEX, "iaid").with_len(4);
        assert_eq!(decode(&registry, Space::Dhcp, &d, &[1, 2, 3]), Err(Error::MalformedLength));

        let d = Descriptor::new(12, T::STRING | T::DOMAIN, "host_name");
        assert_eq!(decode(&registry, Space::Dhcp, &d, b"router\0"), Ok(text("router")));
        assert_eq!(decode(&registry, Space::Dhcp, &d, b"a;reboot"), Err(Error::InvalidFieldValue));
    }

    #[test]
    fn test_uri_list() {
        let registry = Registry::new();
        let d = Descriptor::new(60, T::ARRAY | T::URI, "bootfile_param");
        assert_eq!(
            decode(&registry, Space::Dhcp6, &d, b"\x00\x03abc\x00\x02de"),
            Ok(text("abc de"))
        );
        assert_eq!(decode(&registry, Space::Dhcp6, &d, b"\x00\x05abc"), Err(Error::MalformedLength));
    }

    #[test]
    fn test_depth_cap() {
        let mut registry = Registry::new();
        registry
            .insert(
                Space::Dhcp6,
                Descriptor::new(100, T::empty(), "nest").encap(Descriptor::new(100, T::OPTION, "")),
            )
            .unwrap();
        let codec = Codec::new(&registry, Space::Dhcp6);
        let d = registry.lookup(Space::Dhcp6, 100).unwrap();

        // Each level is a header wrapping the next, with a leaf of one octet.
        let mut data = vec![0xff];
        for _ in 0..MAX_DEPTH + 2 {
            let mut outer = vec![0, 100];
            outer.extend_from_slice(&(data.len() as u16).to_be_bytes());
            outer.extend_from_slice(&data);
            data = outer;
        }
        assert_eq!(
            codec.decode(d, &data, &mut DecodeContext::new()),
            Err(Error::TooDeep)
        );
    }
}
