use clap::{ArgAction, Parser, Subcommand};
use flz4::block::{DecodeOptions, DEFAULT_OUTPUT_CAPACITY, DEFAULT_STAGING_CAPACITY, MAX_CAPACITY};
use flz4::container::{decompress_file, default_output_path};
use flz4::scan::{scan, BlockHealth, ScanReport};
use flz4::Flz4Reader;
use log::LevelFilter;
use std::fs::File;
use std::io::{self, BufReader};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "flz4", about = "Unpack FLZ4 (length-prefixed LZ4 block) containers")]
struct Cli {
    /// More log output (-v info, -vv debug, -vvv trace); RUST_LOG overrides
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Decompress a container to <INPUT>.dec (or --output)
    Decompress {
        input: PathBuf,
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Keep whatever was decoded before a failure
        #[arg(long)]
        keep_partial: bool,
        #[command(flatten)]
        limits: Limits,
    },
    /// Walk a container and report every block without writing output
    Info {
        input: PathBuf,
        /// Emit the report as JSON
        #[arg(long)]
        json: bool,
        #[command(flatten)]
        limits: Limits,
    },
    /// Write the decompressed contents to stdout
    Cat {
        input: PathBuf,
        #[command(flatten)]
        limits: Limits,
    },
}

#[derive(clap::Args)]
struct Limits {
    /// Largest compressed block accepted, in bytes
    #[arg(long, default_value_t = DEFAULT_STAGING_CAPACITY as u32, value_parser = capacity_parser())]
    block_capacity: u32,
    /// Largest decompressed block accepted, in bytes
    #[arg(long, default_value_t = DEFAULT_OUTPUT_CAPACITY as u32, value_parser = capacity_parser())]
    output_capacity: u32,
}

fn capacity_parser() -> clap::builder::RangedI64ValueParser<u32> {
    clap::value_parser!(u32).range(1..=MAX_CAPACITY as i64)
}

impl Limits {
    fn options(&self, keep_partial: bool) -> DecodeOptions {
        DecodeOptions {
            staging_capacity: self.block_capacity as usize,
            output_capacity: self.output_capacity as usize,
            keep_partial,
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    run(cli.command)
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();
}

fn run(command: Commands) -> Result<(), Box<dyn std::error::Error>> {
    match command {

        // ── Decompress ───────────────────────────────────────────────────────
        Commands::Decompress { input, output, keep_partial, limits } => {
            let output = output.unwrap_or_else(|| default_output_path(&input));
            println!("decompress : {} -> {}", input.display(), output.display());
            let summary = decompress_file(&input, &output, &limits.options(keep_partial))?;
            println!(
                "decompress : done, {} block(s), {} -> {} bytes",
                summary.blocks, summary.bytes_in, summary.bytes_out
            );
            Ok(())
        }

        // ── Info ─────────────────────────────────────────────────────────────
        Commands::Info { input, json, limits } => {
            let mut reader = BufReader::new(File::open(&input)?);
            let report = scan(&mut reader, &limits.options(false))?;
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print_report(&input, &report);
            }
            if !report.is_complete() {
                return Err(format!("{}: {}", input.display(), report.summary()).into());
            }
            Ok(())
        }

        // ── Cat ──────────────────────────────────────────────────────────────
        Commands::Cat { input, limits } => {
            let src = BufReader::new(File::open(&input)?);
            let mut reader = Flz4Reader::with_options(src, &limits.options(false))?;
            let stdout = io::stdout();
            let mut lock = stdout.lock();
            io::copy(&mut reader, &mut lock)?;
            Ok(())
        }
    }
}

fn print_report(input: &Path, report: &ScanReport) {
    println!("── FLZ4 container ───────────────────────────────────────");
    println!("  Path           {}", input.display());
    println!("  Outcome        {:?}", report.outcome);
    println!("  Scanned        {} B", report.bytes_scanned);
    println!("  Decompressed   {} B", report.decompressed_bytes);
    println!("  Records        {}", report.blocks.len());
    println!("{:>7} {:>12} {:>10} {:>12}  Health", "Block", "Offset", "Packed", "Unpacked");
    for b in &report.blocks {
        let unpacked = b.decompressed_len
            .map(|n| n.to_string())
            .unwrap_or_else(|| "-".into());
        let health = match &b.health {
            BlockHealth::Healthy => "ok".to_string(),
            other => format!("{other:?}"),
        };
        println!("{:>7} {:>12} {:>10} {:>12}  {}",
            b.index, b.offset, b.compressed_len, unpacked, health);
    }
}
