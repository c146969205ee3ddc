use clap::{Parser, Subcommand, ValueEnum};
use cxb::archive::{self, ConvertOptions};
use cxb::codec::MAX_CHUNK_SIZE;
use cxb::{DecodeOptions, EncodeOptions};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "cxb", version, about = "Pack and unpack .cxb XML containers")]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write every document in an archive to a directory
    Export {
        input:      PathBuf,
        output_dir: PathBuf,
        /// Fail on the first warning instead of continuing
        #[arg(long)]
        strict: bool,
    },
    /// Build an archive from the *.xml files in a directory
    Convert {
        input_dir: PathBuf,
        output:    PathBuf,
        /// Accept any set of documents, not only the required one
        #[arg(long)]
        no_validate: bool,
        /// Uncompressed bytes per block (at most 32768)
        #[arg(long, default_value_t = MAX_CHUNK_SIZE)]
        chunk_size: usize,
    },
    /// List the segments of an archive
    List {
        input: PathBuf,
        #[arg(short, long, value_enum, default_value_t = Format::Text)]
        format: Format,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Text,
    Json,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // --verbose wins over RUST_LOG; without either the level is info.
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {

        // ── Export ───────────────────────────────────────────────────────────
        Commands::Export { input, output_dir, strict } => {
            let outcome = archive::export(&input, &output_dir, &DecodeOptions { strict })?;
            for path in &outcome.value {
                println!("  wrote  {}", path.display());
            }
            println!(
                "Exported {} document(s) to {} ({} warning(s))",
                outcome.value.len(),
                output_dir.display(),
                outcome.warnings.len()
            );
        }

        // ── Convert ──────────────────────────────────────────────────────────
        Commands::Convert { input_dir, output, no_validate, chunk_size } => {
            let opts = ConvertOptions {
                validate_set: !no_validate,
                encode:       EncodeOptions { chunk_size },
            };
            let size = archive::convert(&input_dir, &output, &opts)?;
            println!("Created: {} ({} B)", output.display(), size);
        }

        // ── List ─────────────────────────────────────────────────────────────
        Commands::List { input, format } => {
            let outcome = archive::inspect(&input)?;
            match format {
                Format::Json => println!("{}", serde_json::to_string_pretty(&outcome.value)?),
                Format::Text => {
                    println!("Archive: {}", input.display());
                    println!("{:<32} {:>10} {:>10} {:>10} {:>7} {:>7}  Warnings",
                             "Name", "Offset", "Declared", "Decoded", "Blocks", "Codec");
                    for seg in &outcome.value {
                        println!("{:<32} {:>10} {:>10} {:>10} {:>7} {:>7}  {}",
                            seg.name, seg.magic_offset, seg.declared_size,
                            seg.decoded_size, seg.blocks.len(), seg.codec.unwrap_or("?"),
                            seg.warnings.len());
                    }
                }
            }
        }
    }

    Ok(())
}
