//! CLI entry point for the `asm-demangle` binary.

use std::env;
use std::ffi::OsString;
use std::path::PathBuf;

use asm_demangle::io::{demangle_document, read_input, write_output, ListingError, ListingFormat};
use asm_demangle::logging::init_tracing;
use demangle_core::{Demangler, OracleConfig, ProcessOracle};
use serde_json as _;
#[cfg(test)]
use tempfile as _;
use thiserror as _;
use tracing_subscriber as _;

const USAGE_TEXT: &str = "\
Usage: asm-demangle [<input>] [options]

Demangles C++ symbol names in an assembly listing.

Options:
  -o, --output <file>    Write the listing to <file> (default: stdout)
      --json             Read and write a JSON array of line objects
      --tool <program>   Demangling tool (default: $ASM_DEMANGLE_CXXFILT or c++filt)
      --tool-arg <arg>   Extra argument for the tool (repeatable)
  -h, --help             Show this help message

Input is read from stdin when <input> is omitted or `-`.
Set RUST_LOG=debug to trace the pipeline on stderr.

Examples:
  asm-demangle square.s
  g++ -S -o - square.cpp | asm-demangle -o square.demangled.s
  asm-demangle listing.json --json --tool llvm-cxxfilt
";

#[derive(Debug, Default, PartialEq, Eq)]
struct Args {
    input: Option<PathBuf>,
    output: Option<PathBuf>,
    format: ListingFormat,
    tool: Option<String>,
    tool_args: Vec<String>,
}

#[derive(Debug)]
enum ParseResult {
    Run(Args),
    Help,
}

#[allow(clippy::while_let_on_iterator)]
fn parse_args(mut args: impl Iterator<Item = OsString>) -> Result<ParseResult, String> {
    let mut parsed = Args::default();

    while let Some(arg) = args.next() {
        if arg == "--help" || arg == "-h" {
            return Ok(ParseResult::Help);
        }

        if arg == "--json" {
            parsed.format = ListingFormat::Json;
            continue;
        }

        if arg == "-o" || arg == "--output" {
            let value = args
                .next()
                .ok_or_else(|| "missing value for -o".to_string())?;
            parsed.output = Some(PathBuf::from(value));
            continue;
        }

        if arg == "--tool" {
            let value = args
                .next()
                .ok_or_else(|| "missing value for --tool".to_string())?;
            parsed.tool = Some(value.to_string_lossy().to_string());
            continue;
        }

        if arg == "--tool-arg" {
            let value = args
                .next()
                .ok_or_else(|| "missing value for --tool-arg".to_string())?;
            parsed.tool_args.push(value.to_string_lossy().to_string());
            continue;
        }

        if arg != "-" && arg.to_string_lossy().starts_with('-') {
            return Err(format!("unknown option: {}", arg.to_string_lossy()));
        }

        if parsed.input.is_some() {
            return Err("multiple input paths provided".to_string());
        }
        if arg != "-" {
            parsed.input = Some(PathBuf::from(arg));
        }
    }

    Ok(ParseResult::Run(parsed))
}

fn oracle_config(base: OracleConfig, args: &Args) -> OracleConfig {
    let mut config = base;
    if let Some(tool) = &args.tool {
        config.program.clone_from(tool);
    }
    config.args.extend(args.tool_args.iter().cloned());
    config
}

fn report(error: &ListingError) -> i32 {
    eprintln!("error: {error}");
    1
}

async fn run(args: Args) -> Result<(), i32> {
    let config = oracle_config(OracleConfig::from_env(), &args);
    tracing::debug!(tool = %config.program, args = ?config.args, "using demangler");
    let demangler = Demangler::new(ProcessOracle::new(config));

    let input = read_input(args.input.as_deref()).map_err(|e| report(&e))?;
    let output = demangle_document(&demangler, &input, args.format)
        .await
        .map_err(|e| report(&e))?;
    write_output(args.output.as_deref(), &output).map_err(|e| report(&e))
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    init_tracing();

    let exit_code = match parse_args(env::args_os().skip(1)) {
        Ok(ParseResult::Help) => {
            println!("{USAGE_TEXT}");
            0
        }
        Ok(ParseResult::Run(args)) => match run(args).await {
            Ok(()) => 0,
            Err(code) => code,
        },
        Err(error) => {
            eprintln!("error: {error}");
            eprintln!("{USAGE_TEXT}");
            1
        }
    };

    std::process::exit(exit_code);
}
