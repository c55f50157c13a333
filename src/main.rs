use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use env_logger::{Builder, Env};
use kspace2png::data_import::resolve_case_dir;
use kspace2png::{convert_directory, extract_archive, CaseErrorPolicy, ConvertParams, ExistingOutput};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(version, about = "Reconstruct MRI k-space case files into grayscale PNG slices")]
struct Cli {
    /// path to a toml parameter file, see kspace2png-params
    #[arg(long, global = true)]
    params: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// unpack a tar archive (plain, gzip, xz or bzip2) into a directory
    Extract {
        archive: PathBuf,
        target_dir: PathBuf,
    },
    /// convert every case file in a directory
    Convert {
        input_dir: PathBuf,
        output_root: PathBuf,
        #[command(flatten)]
        opts: ConvertOpts,
    },
    /// extract an archive, then convert the case files it contained
    Run {
        archive: PathBuf,
        extract_dir: PathBuf,
        output_root: PathBuf,
        /// directory below EXTRACT_DIR holding the case files. Defaults to EXTRACT_DIR, or to
        /// its only sub-directory when EXTRACT_DIR holds no case files itself
        #[arg(long)]
        input_subdir: Option<PathBuf>,
        #[command(flatten)]
        opts: ConvertOpts,
    },
}

#[derive(Debug, Args)]
struct ConvertOpts {
    /// number of evenly spaced slices to export per case
    #[arg(long, short = 'n')]
    frames_per_file: Option<usize>,
    /// delete slice images left over from earlier runs before writing
    #[arg(long)]
    clear: bool,
    /// convert cases in parallel
    #[arg(long)]
    parallel: bool,
    /// stop at the first case that fails instead of skipping it
    #[arg(long)]
    abort_on_error: bool,
    /// write a json report of the batch to this path
    #[arg(long)]
    report: Option<PathBuf>,
}

impl ConvertOpts {
    fn apply(&self, mut params: ConvertParams) -> ConvertParams {
        if let Some(n) = self.frames_per_file {
            params.frames_per_file = n;
        }
        if self.clear {
            params.existing_output = ExistingOutput::Clear;
        }
        if self.parallel {
            params.parallel = true;
        }
        if self.abort_on_error {
            params.on_case_error = CaseErrorPolicy::Abort;
        }
        params
    }
}

fn load_params(path: Option<&Path>) -> Result<ConvertParams> {
    match path {
        Some(p) => ConvertParams::from_toml_file(p.with_extension("toml"))
            .with_context(|| format!("failed to load parameter file {}", p.display())),
        None => Ok(ConvertParams::default()),
    }
}

fn convert(input_dir: &Path, output_root: &Path, opts: &ConvertOpts, params: ConvertParams) -> Result<()> {
    let params = opts.apply(params);
    let report = convert_directory(input_dir, output_root, &params)
        .with_context(|| format!("failed to convert {}", input_dir.display()))?;
    if let Some(path) = &opts.report {
        report.write_json(path)?;
        log::info!("wrote report to {}", path.display());
    }
    Ok(())
}

fn run(cli: Cli) -> Result<()> {
    let params = load_params(cli.params.as_deref())?;
    match cli.command {
        Command::Extract { archive, target_dir } => {
            let summary = extract_archive(&archive, &target_dir)?;
            log::info!("{:?} archive unpacked into {}", summary.format, summary.target.display());
        }
        Command::Convert { input_dir, output_root, opts } => {
            convert(&input_dir, &output_root, &opts, params)?;
        }
        Command::Run { archive, extract_dir, output_root, input_subdir, opts } => {
            let summary = extract_archive(&archive, &extract_dir)?;
            log::info!("{} entries from {} ready for conversion", summary.entries, summary.archive.display());
            let input_dir = resolve_case_dir(&summary.target, input_subdir.as_deref(), &params.file_suffix)?;
            convert(&input_dir, &output_root, &opts, params)?;
        }
    }
    Ok(())
}

fn main() -> ExitCode {
    let mut builder = Builder::from_env(Env::default().default_filter_or("info"));
    builder.format_timestamp_secs();
    builder.init();

    match run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}
