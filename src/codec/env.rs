//! Rendering decoded options as `name=value` variables, the form in which
//! they are handed to hook scripts.
//!
//! A variable is named after the option, prefixed with the names of the
//! options it is nested in, and suffixed with its instance number if the
//! option is indexed: `new_ia_na1_ia_addr1_vltime`. An embedded field that
//! shares its parent's name takes the parent's variable name.

use alloc::format;
use alloc::string::{String, ToString};
use alloc::vec::Vec;

use super::{Codec, DecodedOption, Value};
use crate::schema::Descriptor;
use crate::wire::escape;

/// A single rendered variable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Variable {
    pub name: String,
    pub value: String,
}

fn join_name(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else if name.is_empty() {
        prefix.to_string()
    } else {
        format!("{prefix}_{name}")
    }
}

fn indexed(name: String, index: Option<u32>) -> String {
    match index {
        Some(index) => format!("{name}{index}"),
        None => name,
    }
}

fn push(out: &mut Vec<Variable>, name: String, value: String) {
    out.push(Variable { name, value })
}

/// Render every successfully decoded option in `options`.
///
/// Options that failed to decode are left out.
pub fn variables(codec: &Codec, prefix: &str, options: &[DecodedOption]) -> Vec<Variable> {
    let mut out = Vec::new();

    for option in options {
        let value = match &option.value {
            Ok(value) => value,
            Err(_err) => {
                net_debug!("env: skipping option {}: {}", option.code, _err);
                continue;
            }
        };
        let descriptor = match codec.registry().lookup(codec.space(), option.code) {
            Some(descriptor) => descriptor,
            None => continue,
        };

        let name = indexed(join_name(prefix, &descriptor.name), option.index);
        if codec.is_vendor(descriptor, 0) {
            render_vendor(codec, &name, value, &mut out);
        } else {
            render(codec, descriptor, &name, value, &mut out);
        }
    }

    out
}

fn render(codec: &Codec, descriptor: &Descriptor, name: &str, value: &Value, out: &mut Vec<Variable>) {
    match value {
        Value::Absent => push(out, name.into(), String::new()),
        Value::Present => push(out, name.into(), "1".into()),
        Value::Text(text) => push(out, name.into(), text.clone()),
        Value::Raw(bytes) => push(out, name.into(), escape::hex(bytes)),
        Value::Composite {
            embedded,
            encapsulated,
        } => {
            for (child, value) in descriptor.embedded.iter().zip(embedded) {
                let child_name = if child.name == descriptor.name {
                    name.to_string()
                } else {
                    join_name(name, &child.name)
                };
                render(codec, child, &child_name, value, out);
            }

            for entry in encapsulated {
                match codec.resolve(descriptor, entry.code) {
                    Some(child) => {
                        let child_name = indexed(join_name(name, &child.name), entry.index);
                        render(codec, child, &child_name, &entry.value, out);
                    }
                    None => render_unknown(name, entry.code, &entry.value, out),
                }
            }
        }
    }
}

fn render_unknown(name: &str, code: u32, value: &Value, out: &mut Vec<Variable>) {
    match value {
        Value::Raw(bytes) => push(out, format!("{name}_unknown_{code}"), escape::hex(bytes)),
        _ => {
            net_trace!("env: {}: no name for sub-option {}", name, code);
        }
    }
}

fn render_vendor(codec: &Codec, name: &str, value: &Value, out: &mut Vec<Variable>) {
    let entries = match value {
        Value::Composite { encapsulated, .. } => encapsulated,
        _ => return,
    };

    for entry in entries {
        match codec.registry().vendor_lookup(codec.space(), entry.code) {
            Some(vendor) => render(codec, vendor, &join_name(name, &vendor.name), &entry.value, out),
            None => render_unknown(name, entry.code, &entry.value, out),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::codec::{DecodeContext, Decoded};
    use crate::schema::{OptionType as T, Registry, Space};
    use crate::wire::{Framing, TlvSource};
    use alloc::vec;

    fn pairs(vars: &[Variable]) -> Vec<(&str, &str)> {
        vars.iter().map(|v| (v.name.as_str(), v.value.as_str())).collect()
    }

    #[test]
    fn test_names() {
        let mut registry = Registry::new();
        registry
            .insert(
                Space::Dhcp6,
                Descriptor::new(13, T::empty(), "status_code")
                    .embed(Descriptor::new(0, T::UINT16, "status_code"))
                    .embed(Descriptor::new(0, T::OPTIONAL | T::STRING, "message")),
            )
            .unwrap();
        registry
            .insert(
                Space::Dhcp6,
                Descriptor::new(100, T::INDEX, "box")
                    .embed(Descriptor::new(0, T::UINT8, "id"))
                    .encap(Descriptor::new(13, T::OPTION, ""))
                    .encap(Descriptor::new(1, T::FLAG, "lit")),
            )
            .unwrap();
        let codec = Codec::new(&registry, Space::Dhcp6);

        let options = vec![
            DecodedOption {
                code: 100,
                index: Some(2),
                value: Ok(Value::Composite {
                    embedded: vec![Value::Text("7".into())],
                    encapsulated: vec![
                        Decoded {
                            code: 13,
                            index: None,
                            value: Value::Composite {
                                embedded: vec![Value::Text("0".into()), Value::Text("ok".into())],
                                encapsulated: vec![],
                            },
                        },
                        Decoded { code: 1, index: None, value: Value::Present },
                        Decoded { code: 77, index: None, value: Value::Raw(vec![0xbe, 0xef]) },
                    ],
                }),
            },
            DecodedOption {
                code: 13,
                index: None,
                value: Err(crate::Error::MalformedLength),
            },
        ];

        assert_eq!(
            pairs(&variables(&codec, "new", &options)),
            [
                ("new_box2_id", "7"),
                ("new_box2_status_code", "0"),
                ("new_box2_status_code_message", "ok"),
                ("new_box2_lit", "1"),
                ("new_box2_unknown_77", "beef"),
            ]
        );
    }

    #[test]
    fn test_decoded_message() {
        let mut registry = Registry::new();
        registry
            .insert(Space::Dhcp, Descriptor::new(3, T::ARRAY | T::ADDRIPV4, "routers"))
            .unwrap();
        registry
            .insert(Space::Dhcp, Descriptor::new(61, T::RAW, "client_id"))
            .unwrap();
        let codec = Codec::new(&registry, Space::Dhcp);

        let bytes = [3, 4, 10, 0, 0, 1, 61, 2, 1, 2, 200, 1, 0, 255];
        let mut source = TlvSource::new(Framing::Dhcpv4, &bytes);
        let options = codec.decode_all(&mut source, &mut DecodeContext::new()).unwrap();
        assert_eq!(
            pairs(&variables(&codec, "", &options)),
            [("routers", "10.0.0.1"), ("client_id", "0102")]
        );
    }
}
