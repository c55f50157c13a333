use anyhow::{Context, Result};
use clap::Parser;
use kspace2png::ConvertParams;
use std::fs;
use std::path::PathBuf;

/// Writes the default kspace2png conversion parameters as toml, ready to edit and pass back
/// with `kspace2png --params`.
#[derive(Debug, Parser)]
#[command(version)]
struct Args {
    /// output path, the extension is replaced by .toml
    out: PathBuf,
    /// refuse to replace an existing parameter file
    #[arg(long)]
    no_clobber: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    let out = args.out.with_extension("toml");
    if args.no_clobber && out.exists() {
        anyhow::bail!("{} already exists", out.display());
    }

    let defaults = toml::to_string(&ConvertParams::default()).context("can't serialize conversion parameters")?;
    fs::write(&out, format!("# kspace2png conversion parameters\n{defaults}"))
        .with_context(|| format!("can't write {}", out.display()))?;
    println!("kspace2png parameters written to {}, use with --params {}", out.display(), out.display());
    Ok(())
}
