// static_arith_demo/src/main.rs

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use static_arith::{Artifact, Precision};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(about = "Static arithmetic coding of whole files")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Encode a file into a codeword artifact.
    Compress {
        input: PathBuf,
        output: PathBuf,
        /// Significant digits; sized from the input when omitted.
        #[arg(long)]
        precision: Option<u32>,
        /// Write the JSON artifact instead of the binary one.
        #[arg(long)]
        json: bool,
    },
    /// Restore a file from a binary or JSON codeword artifact.
    Decompress { input: PathBuf, output: PathBuf },
    /// Compress, restore and compare, then report sizes.
    Roundtrip {
        input: PathBuf,
        #[arg(long)]
        precision: Option<u32>,
        #[arg(long)]
        json: bool,
    },
}

fn parse_precision(digits: Option<u32>) -> Result<Option<Precision>> {
    digits
        .map(|digits| Precision::new(digits).context("invalid --precision"))
        .transpose()
}

fn compress(input: &Path, output: &Path, precision: Option<u32>, json: bool) -> Result<Artifact> {
    let text = fs::read(input).with_context(|| format!("reading {}", input.display()))?;
    let artifact = Artifact::compress(&text, parse_precision(precision)?)
        .with_context(|| format!("compressing {}", input.display()))?;

    let file = File::create(output).with_context(|| format!("creating {}", output.display()))?;
    let mut writer = BufWriter::new(file);
    if json {
        artifact.to_writer(&mut writer)?;
    } else {
        artifact.write_binary(&mut writer)?;
    }
    writer.flush()?;
    info!(output = %output.display(), json, "artifact written");
    Ok(artifact)
}

fn decompress(input: &Path, output: &Path) -> Result<Vec<u8>> {
    let bytes = fs::read(input).with_context(|| format!("reading {}", input.display()))?;
    let artifact = if bytes.first() == Some(&b'{') {
        Artifact::from_reader(bytes.as_slice())
    } else {
        Artifact::from_bytes(&bytes)
    }
    .with_context(|| format!("parsing artifact {}", input.display()))?;
    let text = artifact
        .decompress()
        .with_context(|| format!("decoding {}", input.display()))?;
    fs::write(output, &text).with_context(|| format!("writing {}", output.display()))?;
    Ok(text)
}

fn roundtrip(input: &Path, precision: Option<u32>, json: bool) -> Result<()> {
    let compressed = input.with_extension(if json { "arith.json" } else { "arith" });
    let restored = input.with_extension("restored");

    println!("Compressing {} ...", input.display());
    let artifact = compress(input, &compressed, precision, json)?;
    println!(
        "Encoded {} symbols at {} significant digits",
        artifact.length(),
        artifact.precision()?.digits()
    );

    println!("Decompressing {} ...", compressed.display());
    let text = decompress(&compressed, &restored)?;

    let original = fs::read(input)?;
    if text != original {
        bail!("Decoding failed. The decoded bytes do not match the original input.");
    }
    println!("Decoding successful. The decoded bytes match the original input.");

    let in_bytes = fs::metadata(input)?.len();
    let out_bytes = fs::metadata(&compressed)?.len();
    println!("Input file size in bytes {}", in_bytes);
    println!("Compressed file size in bytes {}", out_bytes);
    if out_bytes > 0 {
        println!(
            "Compression ratio {:.2}",
            in_bytes as f64 / out_bytes as f64
        );
    }
    Ok(())
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    match Cli::parse().command {
        Command::Compress {
            input,
            output,
            precision,
            json,
        } => {
            compress(&input, &output, precision, json)?;
        }
        Command::Decompress { input, output } => {
            let text = decompress(&input, &output)?;
            info!(bytes = text.len(), "restored");
        }
        Command::Roundtrip {
            input,
            precision,
            json,
        } => roundtrip(&input, precision, json)?,
    }
    Ok(())
}
