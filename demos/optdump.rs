use std::env;
use std::io::Write;
use std::process;

use env_logger::Builder;
use getopts::{Matches, Options};
use log::{error, info, Level, LevelFilter};

use dhcpopt::codec::{variables, Codec, DecodeContext};
use dhcpopt::schema::{Registry, Space};
use dhcpopt::wire::escape::{self, TextMode};
use dhcpopt::wire::{OptionMask, TlvSource, TlvWriter, DHCPV4_MASK_LEN, DHCPV6_MASK_LEN};

fn setup_logging(filter: &str) {
    Builder::new()
        .format(|buf, record| {
            if record.target().starts_with("dhcpopt::") {
                writeln!(
                    buf,
                    "\x1b[0m({}): {}\x1b[0m",
                    record.target().replace("dhcpopt::", ""),
                    record.args()
                )
            } else if record.level() == Level::Trace {
                writeln!(buf, "\x1b[37m{}\x1b[0m", record.args())
            } else {
                writeln!(buf, "\x1b[32m({}): {}\x1b[0m", record.target(), record.args())
            }
        })
        .filter(None, LevelFilter::Info)
        .parse_filters(filter)
        .parse_filters(&env::var("RUST_LOG").unwrap_or_default())
        .init();
}

fn parse_options(options: &Options, free: &[&str]) -> Matches {
    match options.parse(env::args().skip(1)) {
        Err(err) => {
            println!("{err}");
            process::exit(1)
        }
        Ok(matches) => {
            if matches.opt_present("h") || matches.free.len() != free.len() {
                let brief = format!(
                    "Usage: {} [OPTION]... {}",
                    env::args().next().unwrap_or_default(),
                    free.join(" ")
                );
                print!("{}", options.usage(&brief));
                process::exit(if matches.free.len() != free.len() { 1 } else { 0 })
            }
            matches
        }
    }
}

fn print_request<const N: usize>(registry: &Registry, space: Space, names: &str) {
    let mut include = OptionMask::<N>::new();
    if let Err(err) = registry.apply_names(space, &[], names, &mut include, true) {
        error!("bad option list {names:?}: {err}");
        process::exit(1)
    }
    let mask = registry.build_request_mask(space, &[], &include, &OptionMask::new());
    info!("requesting {mask}");

    let code = match space {
        Space::Dhcp => 55,
        Space::Dhcp6 => 6,
    };
    let mut buffer = vec![0u8; TlvWriter::buffer_len(space.framing(), mask.iter().count() * 2)];
    let mut writer = TlvWriter::new(space.framing(), &mut buffer);
    match writer.emit_request_list(code, &mask) {
        Ok(()) => {
            let len = writer.len();
            println!("request={}", escape::hex(&buffer[..len]))
        }
        Err(err) => error!("cannot emit request list: {err}"),
    }
}

fn main() {
    let mut opts = Options::new();
    opts.optflag("h", "help", "print this help menu");
    opts.optflag("6", "dhcp6", "decode DHCPv6 options");
    opts.optopt("p", "prefix", "variable name prefix (default: new)", "PREFIX");
    opts.optopt("r", "request", "also print the request list for these options", "NAMES");
    opts.optopt("l", "log", "log filter (default: info)", "FILTER");
    let matches = parse_options(&opts, &["HEX"]);

    setup_logging(&matches.opt_str("l").unwrap_or_default());

    let space = if matches.opt_present("6") {
        Space::Dhcp6
    } else {
        Space::Dhcp
    };
    let prefix = matches.opt_str("p").unwrap_or_else(|| "new".into());
    let options = match escape::parse(&matches.free[0], TextMode::BinHex) {
        Ok(options) => options,
        Err(err) => {
            error!("options must be given as hex: {err}");
            process::exit(1)
        }
    };

    let registry = Registry::with_builtin();
    let codec = Codec::new(&registry, space);

    if let Some(names) = matches.opt_str("r") {
        match space {
            Space::Dhcp => print_request::<DHCPV4_MASK_LEN>(&registry, space, &names),
            Space::Dhcp6 => print_request::<DHCPV6_MASK_LEN>(&registry, space, &names),
        }
    }

    let mut source = TlvSource::new(space.framing(), &options);
    let decoded = match codec.decode_all(&mut source, &mut DecodeContext::new()) {
        Ok(decoded) => decoded,
        Err(err) => {
            error!("malformed options: {err}");
            process::exit(1)
        }
    };

    for option in decoded.iter().filter(|o| o.value.is_err()) {
        info!("option {} not decoded", option.code);
    }
    for variable in variables(&codec, &prefix, &decoded) {
        println!("{}={}", variable.name, variable.value);
    }
}
