//! xv - decode a flat file of x86-64 machine code
//!
//! Usage:
//!   xv <file>                 Decode from offset 0 and print one line per instruction
//!   xv <file> --dump          Print a hex dump of the file first
//!   xv <file> --resync        Skip undecodable bytes instead of stopping
//!   xv <file> --json          Emit JSON lines instead of text

use std::fs;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use log::{info, warn};
use serde::Serialize;
use xv_x64::{
    Cursor, DecodeError, DecodeStatus, Decoder, DecoderConfig, Instruction, RexPolicy,
    MAX_INSTRUCTION_LENGTH,
};

#[derive(Parser)]
#[command(name = "xv")]
#[command(about = "Decode a flat file of x86-64 machine code", long_about = None)]
struct Cli {
    /// Path to the raw code file
    file: PathBuf,

    /// Logical address of the first byte (hex)
    #[arg(short, long, value_parser = parse_hex, default_value = "0")]
    base: u64,

    /// Print a hex dump of the file before decoding
    #[arg(short, long)]
    dump: bool,

    /// Skip one byte after a malformed or conflicting encoding and continue
    #[arg(short, long)]
    resync: bool,

    /// Emit one JSON object per line
    #[arg(long)]
    json: bool,

    /// Reject instructions longer than this many bytes
    #[arg(long, default_value_t = MAX_INSTRUCTION_LENGTH)]
    max_length: usize,

    /// Drop a REX prefix that is followed by a legacy prefix instead of failing
    #[arg(long)]
    lenient_rex: bool,

    /// Report truncated instructions instead of end of input
    #[arg(long)]
    report_truncation: bool,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

impl Cli {
    fn decoder_config(&self) -> DecoderConfig {
        let rex_policy = if self.lenient_rex {
            RexPolicy::Lenient
        } else {
            RexPolicy::Strict
        };
        DecoderConfig::new()
            .with_max_length(self.max_length)
            .with_rex_policy(rex_policy)
            .with_report_truncation(self.report_truncation)
    }
}

fn parse_hex(s: &str) -> Result<u64, String> {
    let s = s.strip_prefix("0x").unwrap_or(s);
    u64::from_str_radix(s, 16).map_err(|e| e.to_string())
}

/// One decoded instruction in `--json` output.
#[derive(Serialize)]
struct InstructionLine<'a> {
    rip: u64,
    opcode: u8,
    escape: u8,
    length: usize,
    bytes: String,
    instruction: &'a Instruction,
}

/// Final line of `--json` output.
#[derive(Serialize)]
struct Summary {
    status: DecodeStatus,
    code: i32,
    instructions: usize,
    skipped: usize,
}

/// What a decode run ended with.
struct Outcome {
    last: DecodeError,
    instructions: usize,
    skipped: usize,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let data = fs::read(&cli.file).with_context(|| format!("Failed to read {}", cli.file.display()))?;
    info!("read {} bytes from {}", data.len(), cli.file.display());

    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());

    if cli.dump {
        hex_dump(&mut out, &data, cli.base).context("Failed to write hex dump")?;
    }

    let decoder = Decoder::with_config(cli.decoder_config());
    let outcome = decode_file(&mut out, &decoder, &data, &cli)?;
    let status = outcome.last.status();

    if cli.json {
        let summary = Summary {
            status,
            code: status.code(),
            instructions: outcome.instructions,
            skipped: outcome.skipped,
        };
        writeln!(out, "{}", serde_json::to_string(&summary)?)?;
    } else {
        if !status.is_end_of_input() {
            writeln!(out, "error: {}", outcome.last)?;
        }
        if cli.resync {
            writeln!(out, "skipped bytes: {}", outcome.skipped)?;
        }
        writeln!(out, "instructions: {}", outcome.instructions)?;
        writeln!(out, "status: {status}")?;
        writeln!(out, "last status code: {}", status.code())?;
    }

    out.flush().context("Failed to flush output")?;
    Ok(())
}

/// Decodes from offset 0 until a failure that ends the run.
fn decode_file(out: &mut impl Write, decoder: &Decoder, data: &[u8], cli: &Cli) -> Result<Outcome> {
    let mut cursor = Cursor::new(data, cli.base);
    let mut instructions = 0;
    let mut skipped = 0;

    let last = loop {
        match decoder.decode(&mut cursor) {
            Ok(insn) => {
                print_instruction(out, &insn, data, cli)?;
                instructions += 1;
            }
            Err(err) if cli.resync && err.is_resynchronizable() => {
                warn!("{err}; skipping one byte");
                if !cli.json {
                    writeln!(out, "skip: {:04x} ({})", err.address(), err.status())?;
                }
                cursor
                    .advance(1)
                    .with_context(|| format!("Failed to skip byte at {:#x}", err.address()))?;
                skipped += 1;
            }
            Err(err) => break err,
        }
    };

    Ok(Outcome {
        last,
        instructions,
        skipped,
    })
}

fn print_instruction(out: &mut impl Write, insn: &Instruction, data: &[u8], cli: &Cli) -> Result<()> {
    if cli.json {
        let bytes = insn
            .bytes(data, cli.base)
            .map(|bytes| bytes.iter().map(|b| format!("{b:02x}")).collect::<Vec<_>>().join(" "))
            .unwrap_or_default();
        let line = InstructionLine {
            rip: insn.address,
            opcode: insn.opcode.opcode(),
            escape: insn.escape_depth(),
            length: insn.length,
            bytes,
            instruction: insn,
        };
        writeln!(out, "{}", serde_json::to_string(&line)?)?;
    } else {
        writeln!(
            out,
            "rip: {:04x}, opcode: {:02x}, escape: {}",
            insn.address,
            insn.opcode.opcode(),
            insn.escape_depth()
        )?;
    }
    Ok(())
}

/// Writes `data` as 16 bytes per line, each line prefixed by its address.
fn hex_dump(out: &mut impl Write, data: &[u8], base: u64) -> io::Result<()> {
    for (i, chunk) in data.chunks(16).enumerate() {
        let address = base.wrapping_add((i * 16) as u64);
        write!(out, "{address:08x}:")?;
        for byte in chunk {
            write!(out, " {byte:02x}")?;
        }
        writeln!(out)?;
    }
    Ok(())
}
