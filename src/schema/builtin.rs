//! Built-in option tables.
//!
//! These cover the options a client commonly requests or has to make
//! sense of; anything else can be added to a [Registry](super::Registry)
//! at runtime.

use alloc::vec;
use alloc::vec::Vec;

use super::{Descriptor, OptionType as T};

fn opt(code: u32, kind: T, name: &str) -> Descriptor {
    Descriptor::new(code, kind, name)
}

/// A field of an embedded block. Fields have no code of their own.
fn field(kind: T, name: &str) -> Descriptor {
    Descriptor::new(0, kind, name)
}

/// A sub-option that is laid out like the top-level option of `code`.
#[cfg(feature = "proto-dhcpv6")]
fn option_ref(code: u32) -> Descriptor {
    Descriptor::new(code, T::OPTION, "")
}

/// Options of DHCP for IPv4 (RFC 2132 and later).
#[cfg(feature = "proto-dhcpv4")]
pub fn dhcp_options() -> Vec<Descriptor> {
    vec![
        opt(1, T::REQUEST | T::ADDRIPV4, "subnet_mask"),
        opt(2, T::INT32, "time_offset"),
        opt(3, T::REQUEST | T::ARRAY | T::ADDRIPV4, "routers"),
        opt(4, T::ARRAY | T::ADDRIPV4, "time_servers"),
        opt(6, T::REQUEST | T::ARRAY | T::ADDRIPV4, "domain_name_servers"),
        opt(7, T::ARRAY | T::ADDRIPV4, "log_servers"),
        opt(12, T::STRING | T::DOMAIN, "host_name"),
        opt(15, T::REQUEST | T::STRING | T::DOMAIN, "domain_name"),
        opt(26, T::REQUEST | T::UINT16, "interface_mtu"),
        opt(28, T::REQUEST | T::ADDRIPV4, "broadcast_address"),
        opt(33, T::REQUEST | T::ARRAY | T::ADDRIPV4, "static_routes"),
        opt(42, T::REQUEST | T::ARRAY | T::ADDRIPV4, "ntp_servers"),
        opt(43, T::BINHEX, "vendor_encapsulated_options"),
        opt(50, T::NOREQ | T::ADDRIPV4, "dhcp_requested_address"),
        opt(51, T::REQUEST | T::UINT32, "dhcp_lease_time"),
        opt(52, T::NOREQ | T::UINT8, "dhcp_option_overload"),
        opt(53, T::NOREQ | T::UINT8, "dhcp_message_type"),
        opt(54, T::NOREQ | T::ADDRIPV4, "dhcp_server_identifier"),
        opt(55, T::NOREQ | T::ARRAY | T::UINT8, "dhcp_parameter_request_list"),
        opt(56, T::NOREQ | T::STRING | T::ESCSTRING, "dhcp_message"),
        opt(57, T::NOREQ | T::UINT16, "dhcp_max_message_size"),
        opt(58, T::REQUEST | T::UINT32, "dhcp_renewal_time"),
        opt(59, T::REQUEST | T::UINT32, "dhcp_rebinding_time"),
        opt(60, T::NOREQ | T::STRING | T::ESCSTRING, "vendor_class_identifier"),
        opt(61, T::NOREQ | T::BINHEX, "dhcp_client_identifier"),
        opt(66, T::STRING | T::DOMAIN, "tftp_server_name"),
        opt(67, T::STRING | T::ESCFILE, "bootfile_name"),
        opt(80, T::NOREQ | T::FLAG, "rapid_commit"),
        opt(81, T::NOREQ, "fqdn")
            .embed(field(T::BITFLAG, "flags").with_bitflags(b"0000NEOS"))
            .embed(field(T::UINT8, "rcode1"))
            .embed(field(T::UINT8, "rcode2"))
            .embed(field(T::OPTIONAL | T::RFC1035, "fqdn")),
        opt(119, T::REQUEST | T::RFC1035, "domain_search"),
        opt(120, T::RFC3361, "sip_server"),
        opt(121, T::REQUEST | T::RFC3442, "classless_static_routes"),
        opt(125, T::NOREQ | T::ENCAP, "vivso"),
        opt(249, T::REQUEST | T::RFC3442, "ms_classless_static_routes"),
        opt(252, T::STRING | T::URI, "wpad_url"),
    ]
}

/// Options of DHCP for IPv6 (RFC 8415 and later).
#[cfg(feature = "proto-dhcpv6")]
pub fn dhcp6_options() -> Vec<Descriptor> {
    let iaid = || field(T::BINHEX, "iaid").with_len(4);
    let timers = |d: Descriptor| {
        d.embed(field(T::UINT32, "t1"))
            .embed(field(T::UINT32, "t2"))
    };

    vec![
        opt(1, T::NOREQ | T::BINHEX, "client_id"),
        opt(2, T::NOREQ | T::BINHEX, "server_id"),
        timers(opt(3, T::NOREQ | T::INDEX, "ia_na").embed(iaid()))
            .encap(option_ref(5))
            .encap(option_ref(13)),
        opt(4, T::NOREQ | T::INDEX, "ia_ta")
            .embed(iaid())
            .encap(option_ref(5))
            .encap(option_ref(13)),
        opt(5, T::NOREQ | T::INDEX, "ia_addr")
            .embed(field(T::ADDRIPV6, "ia_addr"))
            .embed(field(T::UINT32, "pltime"))
            .embed(field(T::UINT32, "vltime"))
            .encap(option_ref(13)),
        opt(6, T::NOREQ | T::ARRAY | T::UINT16, "option_request"),
        opt(7, T::NOREQ | T::UINT8, "preference"),
        opt(12, T::ADDRIPV6, "unicast"),
        opt(13, T::NOREQ, "status_code")
            .embed(field(T::UINT16, "status_code"))
            .embed(field(T::OPTIONAL | T::STRING | T::ESCSTRING, "message")),
        opt(14, T::NOREQ | T::FLAG, "rapid_commit"),
        opt(17, T::NOREQ | T::ENCAP, "vivso"),
        opt(21, T::RFC1035, "sip_servers_names"),
        opt(22, T::ARRAY | T::ADDRIPV6, "sip_servers_addresses"),
        opt(23, T::REQUEST | T::ARRAY | T::ADDRIPV6, "name_servers"),
        opt(24, T::REQUEST | T::RFC1035, "domain_search"),
        timers(opt(25, T::NOREQ | T::INDEX, "ia_pd").embed(iaid()))
            .encap(option_ref(26))
            .encap(option_ref(13)),
        opt(26, T::NOREQ | T::INDEX, "prefix")
            .embed(field(T::UINT32, "pltime"))
            .embed(field(T::UINT32, "vltime"))
            .embed(field(T::UINT8, "length"))
            .embed(field(T::ADDRIPV6, "prefix"))
            .encap(option_ref(13)),
        opt(31, T::ARRAY | T::ADDRIPV6, "sntp_servers"),
        opt(32, T::UINT32, "info_refresh_time"),
        opt(39, T::NOREQ, "fqdn")
            .embed(field(T::BITFLAG, "flags").with_bitflags(b"00000NOS"))
            .embed(field(T::OPTIONAL | T::RFC1035, "fqdn")),
        opt(56, T::REQUEST, "ntp_server")
            .encap(opt(1, T::ADDRIPV6, "addr"))
            .encap(opt(2, T::ADDRIPV6, "mcast_addr"))
            .encap(opt(3, T::RFC1035, "fqdn")),
        opt(59, T::STRING | T::URI, "bootfile_url"),
        opt(60, T::ARRAY | T::URI, "bootfile_param"),
        opt(82, T::REQUEST | T::UINT32, "sol_max_rt"),
        opt(83, T::REQUEST | T::UINT32, "inf_max_rt"),
    ]
}

/// Vendor tables of DHCPv6, keyed by enterprise number.
#[cfg(feature = "proto-dhcpv6")]
pub fn dhcp6_vendor_options() -> Vec<Descriptor> {
    vec![
        // CableLabs client configuration.
        opt(4491, T::empty(), "cablelabs")
            .encap(opt(32, T::ARRAY | T::ADDRIPV6, "tftp_servers"))
            .encap(opt(33, T::STRING | T::ESCFILE, "config_file"))
            .encap(opt(34, T::ARRAY | T::ADDRIPV6, "syslog_servers"))
            .encap(opt(37, T::ARRAY | T::ADDRIPV6, "rfc868_servers"))
            .encap(opt(38, T::INT32, "time_offset")),
    ]
}
