//! Command-line interface for doxstrux
//! Inspects a serialized token stream (as produced by the external
//! tokenizer shim) without running any collectors.
//!
//! Usage:
//!   doxstrux sections `<path>` [--limits `<config>`]  - Print the section index as JSON
//!   doxstrux stats `<path>` [--limits `<config>`]     - Print warehouse index statistics

use clap::{Arg, Command};

use doxstrux::{ResourceLimits, SourceInfo, Token, Warehouse};

/// On-disk token stream: the tokenizer's output plus the shape of the
/// normalized buffer it was produced from
#[derive(serde::Deserialize)]
struct TokenStreamFile {
    line_count: usize,
    byte_len: usize,
    tokens: Vec<Token>,
}

fn main() {
    let matches = Command::new("doxstrux")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Inspect warehouse indices built from a token stream")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(
            Command::new("sections")
                .about("Print the heading-delimited section index as JSON")
                .arg(stream_arg())
                .arg(limits_arg()),
        )
        .subcommand(
            Command::new("stats")
                .about("Print warehouse index statistics as JSON")
                .arg(stream_arg())
                .arg(limits_arg()),
        )
        .get_matches();

    match matches.subcommand() {
        Some(("sections", sub)) => {
            let warehouse = load_warehouse(sub);
            print_json(&warehouse.sections());
        }
        Some(("stats", sub)) => {
            let warehouse = load_warehouse(sub);
            print_json(&serde_json::json!({
                "version": env!("CARGO_PKG_VERSION"),
                "tokens": warehouse.len(),
                "lines": warehouse.line_count(),
                "pairs": warehouse.pair_count(),
                "unmatched_opens": warehouse.unmatched_open_count(),
                "malformed_maps": warehouse.malformed_map_count(),
                "sections": warehouse.sections().len(),
            }));
        }
        _ => unreachable!(),
    }
}

fn stream_arg() -> Arg {
    Arg::new("path")
        .help("Path to the JSON token stream file")
        .required(true)
        .index(1)
}

fn limits_arg() -> Arg {
    Arg::new("limits")
        .long("limits")
        .short('l')
        .help("Path to a JSON resource-limits configuration")
}

fn load_warehouse(matches: &clap::ArgMatches) -> Warehouse {
    let path = matches.get_one::<String>("path").unwrap();
    let limits = match matches.get_one::<String>("limits") {
        Some(limits_path) => read_json::<ResourceLimits>(limits_path),
        None => ResourceLimits::default(),
    };
    let stream = read_json::<TokenStreamFile>(path);
    let source = SourceInfo {
        line_count: stream.line_count,
        byte_len: stream.byte_len,
    };
    Warehouse::build(stream.tokens, source, &limits).unwrap_or_else(|e| {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    })
}

fn read_json<T: serde::de::DeserializeOwned>(path: &str) -> T {
    let text = std::fs::read_to_string(path).unwrap_or_else(|e| {
        eprintln!("Error reading {}: {}", path, e);
        std::process::exit(1);
    });
    serde_json::from_str(&text).unwrap_or_else(|e| {
        eprintln!("Error parsing {}: {}", path, e);
        std::process::exit(1);
    })
}

fn print_json<T: serde::Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(e) => {
            eprintln!("Error serializing output: {}", e);
            std::process::exit(1);
        }
    }
}
