//! gemtools CLI - inspect GEM map files from the shell
//!
//! # Usage
//!
//! ```bash
//! # Uniqueness level of every template
//! gemtools levels sample.map.gz
//!
//! # Tags of uniquely mapped templates, or of templates with no good block
//! gemtools unique --max-level 0 sample.map.gz
//! gemtools unmapped --max-mismatches 2 sample.map.gz
//!
//! # Round-robin merge of mate files
//! gemtools interleave sample_1.map sample_2.map
//!
//! # Summary statistics (best mapping only)
//! gemtools stats --best sample.map.gz
//! ```
//!
//! Input is read from stdin when no file (or `-`) is given. Set `RUST_LOG`
//! or pass `--verbose` for diagnostics on stderr.

use gemtools::io::{DataSource, InputFile, ParserOptions};
use gemtools::operations::{interleave, unique, unmapped, MapStats};
use gemtools::{Result, Template};
use log::{debug, error, LevelFilter};
use std::env;
use std::io::{self, BufWriter, Write};
use std::process;

/// Options shared by every command
struct CommonArgs {
    inputs: Vec<String>,
    permissive: bool,
    verbose: bool,
    max_level: i64,
    max_mismatches: usize,
    best_map_only: bool,
}

fn main() {
    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        print_usage();
        process::exit(1);
    }

    let command = args[1].as_str();
    if matches!(command, "--help" | "-h" | "help") {
        print_usage();
        return;
    }
    if matches!(command, "--version" | "-V") {
        println!("gemtools {}", gemtools::VERSION);
        return;
    }

    let common = parse_args(&args[2..]);

    env_logger::Builder::from_default_env()
        .filter_level(if common.verbose {
            LevelFilter::Debug
        } else {
            LevelFilter::Warn
        })
        .format_timestamp(None)
        .format_target(false)
        .init();

    let result = match command {
        "levels" => levels(&common),
        "unique" => filter_unique(&common),
        "unmapped" => filter_unmapped(&common),
        "interleave" => interleave_inputs(&common),
        "stats" => stats(&common),
        _ => {
            eprintln!("Error: Unknown command '{}'", command);
            eprintln!();
            print_usage();
            process::exit(1);
        }
    };

    if let Err(e) = result {
        error!("{}", e);
        process::exit(1);
    }
}

fn parse_args(args: &[String]) -> CommonArgs {
    let mut common = CommonArgs {
        inputs: Vec::new(),
        permissive: false,
        verbose: false,
        max_level: 0,
        max_mismatches: 0,
        best_map_only: false,
    };
    let mut i = 0;

    while i < args.len() {
        match args[i].as_str() {
            "--permissive" => common.permissive = true,
            "--verbose" | "-v" => common.verbose = true,
            "--best" => common.best_map_only = true,
            "--max-level" => {
                common.max_level = option_value(args, i, "--max-level");
                i += 1;
            }
            "--max-mismatches" => {
                common.max_mismatches = option_value(args, i, "--max-mismatches");
                i += 1;
            }
            "--help" | "-h" => {
                print_usage();
                process::exit(0);
            }
            arg if arg == "-" || !arg.starts_with('-') => common.inputs.push(arg.to_string()),
            other => {
                eprintln!("Error: Unknown option '{}'", other);
                process::exit(1);
            }
        }
        i += 1;
    }

    common
}

fn option_value<T: std::str::FromStr>(args: &[String], i: usize, name: &str) -> T {
    let Some(value) = args.get(i + 1) else {
        eprintln!("Error: {} requires a value", name);
        process::exit(1);
    };
    match value.parse() {
        Ok(parsed) => parsed,
        Err(_) => {
            eprintln!("Error: Invalid value '{}' for {}", value, name);
            process::exit(1);
        }
    }
}

fn input_file(path: &str, common: &CommonArgs) -> InputFile {
    let source = if path == "-" {
        DataSource::Stdin
    } else {
        DataSource::from_path(path)
    };
    InputFile::new(source).with_options(ParserOptions::new().permissive(common.permissive))
}

/// The single input of a one-input command (stdin when none is given)
fn single_input(common: &CommonArgs) -> InputFile {
    match common.inputs.as_slice() {
        [] => input_file("-", common),
        [path] => input_file(path, common),
        _ => {
            eprintln!("Error: Multiple input files specified");
            process::exit(1);
        }
    }
}

fn write_tags<I>(stream: I) -> Result<()>
where
    I: Iterator<Item = Result<Template>>,
{
    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    let mut count = 0usize;
    for template in stream {
        writeln!(out, "{}", template?.tag())?;
        count += 1;
    }
    out.flush()?;
    debug!("Wrote {} tags", count);
    Ok(())
}

fn levels(common: &CommonArgs) -> Result<()> {
    let input = single_input(common);
    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    for template in input.templates() {
        let template = template?;
        writeln!(out, "{}\t{}", template.tag(), template.level())?;
    }
    out.flush()?;
    Ok(())
}

fn filter_unique(common: &CommonArgs) -> Result<()> {
    let input = single_input(common);
    write_tags(unique(input.templates(), common.max_level))
}

fn filter_unmapped(common: &CommonArgs) -> Result<()> {
    let input = single_input(common);
    write_tags(unmapped(input.templates(), common.max_mismatches))
}

fn interleave_inputs(common: &CommonArgs) -> Result<()> {
    if common.inputs.len() < 2 {
        eprintln!("Error: interleave needs at least two inputs");
        process::exit(1);
    }
    let streams = common
        .inputs
        .iter()
        .map(|path| input_file(path, common).templates())
        .collect();
    write_tags(interleave(streams))
}

fn stats(common: &CommonArgs) -> Result<()> {
    let input = single_input(common);
    let stats = MapStats::from_stream(input.templates(), common.best_map_only)?;
    write!(io::stdout().lock(), "{}", stats)?;
    Ok(())
}

fn print_usage() {
    println!(
        r#"gemtools {} - GEM map file inspection

USAGE:
    gemtools <COMMAND> [OPTIONS] [INPUT...]

COMMANDS:
    levels        Print tag and uniqueness level of every template
    unique        Print tags of templates with level in 0..=N (--max-level N, default 0)
    unmapped      Print tags of templates with no block within N mismatches
                  (--max-mismatches N, default 0)
    interleave    Print tags of two or more inputs, round-robin
    stats         Print summary statistics (--best: best mapping only)

OPTIONS:
    --permissive  Skip malformed lines instead of failing
    -v, --verbose Debug logging on stderr
    -h, --help    Show this message
    -V, --version Show version

INPUT:
    Plain or gzip map file; stdin when omitted or '-'"#,
        gemtools::VERSION
    );
}
