//
// Copyright 2020 bplist Developers
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.
//

//! Thin CLI front-end over the `viewstate_codec` library (`SPEC_FULL.md` §6a).

use std::io::Read as _;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing::Level;
use tracing_subscriber::EnvFilter;

use viewstate_codec::{decode, encode, parse_json, validate_json};

#[derive(Debug, Parser)]
#[command(name = "viewstate", version, about = "Decode and encode ASP.NET ViewState payloads")]
struct Cli {
    /// Raise the log level; repeat for more (-v info, -vv debug, -vvv trace).
    #[arg(short = 'v', long = "verbose", global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Decode a Base64 ViewState string into a JSON value tree.
    Decode {
        input: Option<String>,
        #[arg(long)]
        file: Option<PathBuf>,
        /// Also print decode statistics to stderr.
        #[arg(long)]
        stats: bool,
    },
    /// Encode a JSON value tree into a Base64 ViewState string.
    Encode {
        input: Option<String>,
        #[arg(long)]
        file: Option<PathBuf>,
    },
    /// Decode and print only the statistics counters.
    Stats {
        input: Option<String>,
        #[arg(long)]
        file: Option<PathBuf>,
    },
    /// Validate a JSON document without decoding it into a ViewState payload.
    ValidateJson {
        input: Option<String>,
        #[arg(long)]
        file: Option<PathBuf>,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        Command::Decode { input, file, stats } => run_decode(input, file, stats),
        Command::Encode { input, file } => run_encode(input, file),
        Command::Stats { input, file } => run_stats(input, file),
        Command::ValidateJson { input, file } => run_validate_json(input, file),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("{}", message);
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.to_string()));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn run_decode(input: Option<String>, file: Option<PathBuf>, print_stats: bool) -> Result<(), String> {
    let text = read_input(input, file)?;
    let result = decode(&text).map_err(|e| format_error(&e))?;

    let json = viewstate_codec::to_json(&result.value).map_err(|e| e.to_string())?;
    println!("{}", json);

    if let Some(note) = &result.note {
        eprintln!("note: {}", note);
    }
    if print_stats {
        eprintln!("{}", serde_json::to_string_pretty(&result.stats).unwrap());
    }
    Ok(())
}

fn run_encode(input: Option<String>, file: Option<PathBuf>) -> Result<(), String> {
    let text = read_input(input, file)?;
    if text.trim().is_empty() {
        return Err(viewstate_codec::CodecError::NothingToEncode.to_string());
    }
    let value = parse_json(&text).map_err(|e| e.to_string())?;
    let encoded = encode(&value).map_err(|e| e.to_string())?;
    println!("{}", encoded);
    Ok(())
}

fn run_stats(input: Option<String>, file: Option<PathBuf>) -> Result<(), String> {
    let text = read_input(input, file)?;
    let result = decode(&text).map_err(|e| format_error(&e))?;
    println!("{}", serde_json::to_string_pretty(&result.stats).unwrap());
    Ok(())
}

fn run_validate_json(input: Option<String>, file: Option<PathBuf>) -> Result<(), String> {
    let text = read_input(input, file)?;
    let result = validate_json(&text);
    println!("{}", serde_json::to_string_pretty(&result).unwrap());
    Ok(())
}

fn format_error(error: &viewstate_codec::CodecError) -> String {
    match error.suggestion() {
        Some(suggestion) => format!("{}\nsuggestion: {}", error, suggestion),
        None => error.to_string(),
    }
}

/// Reads from the positional argument, then `--file`, then falls back to stdin.
fn read_input(input: Option<String>, file: Option<PathBuf>) -> Result<String, String> {
    if let Some(text) = input {
        return Ok(text);
    }
    if let Some(path) = file {
        return std::fs::read_to_string(&path).map_err(|e| format!("{}: {}", path.display(), e));
    }
    let mut buffer = String::new();
    std::io::stdin()
        .read_to_string(&mut buffer)
        .map_err(|e| e.to_string())?;
    Ok(buffer.trim().to_string())
}
