use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

mod render;
mod slot;

use slot::SlotSpec;

/// Checks QSPI memory-slot descriptions and generates the firmware side of
/// them: slot constants and the XIP linker fragment.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Validate a slot description and print its geometry.
    Check {
        /// HJSON slot description.
        file: PathBuf,
    },
    /// Write the Rust slot constants and the linker fragment.
    Generate {
        /// HJSON slot description.
        file: PathBuf,
        /// Output path for the Rust constants.
        #[arg(long)]
        rust: PathBuf,
        /// Output path for the linker fragment.
        #[arg(long)]
        linker: PathBuf,
    },
}

fn load(path: &Path) -> Result<SlotSpec> {
    let text =
        fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    SlotSpec::from_hjson(&text).with_context(|| format!("in {}", path.display()))
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Check { file } => {
            let spec = load(&file)?;
            println!("slot:          {}", spec.name);
            println!(
                "window:        {:#010x}..{:#010x}",
                spec.base_address,
                u64::from(spec.base_address) + u64::from(spec.total_size)
            );
            println!("total size:    {} bytes", spec.total_size);
            println!(
                "erase size:    {} bytes ({} sectors)",
                spec.erase_size,
                spec.sector_count()
            );
            println!("program size:  {} bytes", spec.program_size);
            println!("data lines:    {}", spec.data_width.lines());
            println!("bus frequency: {} Hz", spec.bus_frequency_hz);
            println!(
                "sections:      {} {}",
                spec.sections.rodata, spec.sections.text
            );
        }
        Command::Generate { file, rust, linker } => {
            let spec = load(&file)?;
            fs::write(&rust, render::rust_source(&spec))
                .with_context(|| format!("writing {}", rust.display()))?;
            fs::write(&linker, render::linker_script(&spec))
                .with_context(|| format!("writing {}", linker.display()))?;
            println!(
                "{}: wrote {} and {}",
                spec.name,
                rust.display(),
                linker.display()
            );
        }
    }

    Ok(())
}
