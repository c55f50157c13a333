use crate::data_import::{list_case_files, read_kspace, CaseFile};
use crate::error::{ReconError, Result};
use crate::normalize::normalize_to_u8;
use crate::signal_model::reconstruct_magnitude;
use crate::slice_select::select_slice_indices;
use crate::{CaseErrorPolicy, ConvertParams, ExistingOutput};
use image::error::{ParameterError, ParameterErrorKind};
use image::{GrayImage, ImageError, ImageFormat};
use indicatif::{ProgressBar, ProgressStyle};
use ndarray::{Array2, ArrayView2, Axis};
use num_complex::Complex32;
use rayon::prelude::*;
use serde::Serialize;
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};

/// file name of a slice image, e.g. `case1_slice0042.png`. Indices above 9999 keep all digits.
pub fn slice_file_name(case_id: &str, slice_idx: usize) -> String {
    format!("{case_id}_slice{slice_idx:04}.png")
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum CaseStatus {
    Converted { slices: Vec<usize>, files: Vec<PathBuf> },
    Failed { error: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CaseReport {
    pub case_id: String,
    pub source: PathBuf,
    #[serde(flatten)]
    pub status: CaseStatus,
}

impl CaseReport {
    fn failed(case: &CaseFile, error: &ReconError) -> Self {
        Self {
            case_id: case.id.clone(),
            source: case.path.clone(),
            status: CaseStatus::Failed { error: error.to_string() },
        }
    }

    pub fn is_converted(&self) -> bool {
        matches!(self.status, CaseStatus::Converted { .. })
    }
}

/// outcome of a batch, one entry per case file in processing order
#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    pub input_dir: PathBuf,
    pub output_root: PathBuf,
    pub frames_per_file: usize,
    pub cases: Vec<CaseReport>,
}

impl BatchReport {
    pub fn n_converted(&self) -> usize {
        self.cases.iter().filter(|c| c.is_converted()).count()
    }

    pub fn failures(&self) -> impl Iterator<Item = &CaseReport> {
        self.cases.iter().filter(|c| !c.is_converted())
    }

    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let io_err = |source: std::io::Error| ReconError::Io { path: path.to_path_buf(), source };
        let f = File::create(path).map_err(io_err)?;
        serde_json::to_writer_pretty(BufWriter::new(f), self).map_err(|e| io_err(e.into()))
    }
}

/// reconstructs one k-space slice into an 8-bit image normalized against the given percentile
pub fn reconstruct_slice(kspace: ArrayView2<Complex32>, percentile: f64) -> Array2<u8> {
    let magnitude = reconstruct_magnitude(kspace);
    normalize_to_u8(&magnitude, percentile)
}

fn write_png(img: &Array2<u8>, path: &Path) -> Result<()> {
    let (rows, cols) = img.dim();
    let pixels = img.iter().copied().collect::<Vec<u8>>();
    let png = GrayImage::from_raw(cols as u32, rows as u32, pixels).ok_or_else(|| ReconError::WriteImage {
        path: path.to_path_buf(),
        source: ImageError::Parameter(ParameterError::from_kind(ParameterErrorKind::DimensionMismatch)),
    })?;
    png.save_with_format(path, ImageFormat::Png).map_err(|source| ReconError::WriteImage { path: path.to_path_buf(), source })
}

/// removes `<case_id>_slice*.png` files left in a case directory by an earlier run
fn clear_stale_slices(case_dir: &Path, case_id: &str) -> Result<usize> {
    let pattern = format!(
        "{}/{}_slice*.png",
        glob::Pattern::escape(&case_dir.display().to_string()),
        glob::Pattern::escape(case_id)
    );
    let read_dir_err = |reason: String| ReconError::ReadDir { path: case_dir.to_path_buf(), reason };
    let mut removed = 0;
    for entry in glob::glob(&pattern).map_err(|e| read_dir_err(e.to_string()))? {
        let path = entry.map_err(|e| read_dir_err(e.to_string()))?;
        if path.is_file() {
            fs::remove_file(&path).map_err(|source| ReconError::RemoveStale { path: path.clone(), source })?;
            removed += 1;
        }
    }
    Ok(removed)
}

/// Converts the selected slices of a single case file into `output_root/<case_id>/`.
pub fn convert_case(case: &CaseFile, output_root: impl AsRef<Path>, params: &ConvertParams) -> Result<CaseReport> {
    // an unreadable case leaves earlier output untouched
    let kspace = read_kspace(&case.path, &params.dataset)?;

    let case_dir = output_root.as_ref().join(&case.id);
    fs::create_dir_all(&case_dir).map_err(|source| ReconError::CreateDir { path: case_dir.clone(), source })?;

    if params.existing_output == ExistingOutput::Clear {
        let removed = clear_stale_slices(&case_dir, &case.id)?;
        if removed > 0 {
            log::info!("{}: removed {} stale slice images", case.id, removed);
        }
    }

    let total_slices = kspace.len_of(Axis(0));

    // repeated indices map to the same file, each is written once
    let mut slices = select_slice_indices(total_slices, params.frames_per_file);
    slices.dedup();

    log::info!("{}: matrix size {:?}, exporting {} of {} slices", case.id, kspace.shape(), slices.len(), total_slices);

    let mut files = Vec::with_capacity(slices.len());
    for &slice_idx in &slices {
        let img = reconstruct_slice(kspace.index_axis(Axis(0), slice_idx), params.percentile);
        let path = case_dir.join(slice_file_name(&case.id, slice_idx));
        write_png(&img, &path)?;
        log::debug!("{}: slice {} -> {}", case.id, slice_idx, path.display());
        files.push(path);
    }

    Ok(CaseReport {
        case_id: case.id.clone(),
        source: case.path.clone(),
        status: CaseStatus::Converted { slices, files },
    })
}

fn progress_bar(n_cases: usize) -> ProgressBar {
    let pb = ProgressBar::new(n_cases as u64);
    match ProgressStyle::default_bar().template("[{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta}) {msg}") {
        Ok(style) => pb.set_style(style.progress_chars("#>-")),
        Err(e) => log::debug!("default progress style kept: {e}"),
    }
    pb
}

/// applies the case error policy to the outcome of one case
fn settle(case: &CaseFile, result: Result<CaseReport>, policy: CaseErrorPolicy, reports: &mut Vec<CaseReport>) -> Result<()> {
    match result {
        Ok(report) => reports.push(report),
        Err(e) => match policy {
            CaseErrorPolicy::Abort => {
                log::error!("{}: conversion failed, aborting batch: {}", case.id, e);
                return Err(e);
            }
            CaseErrorPolicy::Continue => {
                log::error!("{}: conversion failed: {}", case.id, e);
                reports.push(CaseReport::failed(case, &e));
            }
        },
    }
    Ok(())
}

/// Converts every case file in `input_dir` into per-case image directories below `output_root`.
///
/// Setup failures (invalid parameters, uncreatable output root, unreadable input directory) are
/// returned as errors. Failures of a single case are handled according to
/// [ConvertParams::on_case_error]: recorded in the report and skipped, or returned immediately.
/// With [ConvertParams::parallel] set, cases run on the rayon thread pool; the report keeps case
/// order and an aborting policy reports the first failed case in that order once all cases are
/// done.
pub fn convert_directory(input_dir: impl AsRef<Path>, output_root: impl AsRef<Path>, params: &ConvertParams) -> Result<BatchReport> {
    let input_dir = input_dir.as_ref();
    let output_root = output_root.as_ref();
    params.validate()?;

    fs::create_dir_all(output_root).map_err(|source| ReconError::CreateDir { path: output_root.to_path_buf(), source })?;

    let cases = list_case_files(input_dir, params.suffix())?;
    if cases.is_empty() {
        log::warn!("no *.{} files found in {}", params.suffix(), input_dir.display());
    } else {
        log::info!("found {} case files in {}", cases.len(), input_dir.display());
    }

    let pb = progress_bar(cases.len());
    let run = |case: &CaseFile| {
        pb.set_message(case.id.clone());
        let result = convert_case(case, output_root, params);
        pb.inc(1);
        result
    };

    let mut reports = Vec::with_capacity(cases.len());
    if params.parallel {
        let results = cases.par_iter().map(run).collect::<Vec<_>>();
        for (case, result) in cases.iter().zip(results) {
            if let Err(e) = settle(case, result, params.on_case_error, &mut reports) {
                pb.abandon();
                return Err(e);
            }
        }
    } else {
        for case in &cases {
            if let Err(e) = settle(case, run(case), params.on_case_error, &mut reports) {
                pb.abandon();
                return Err(e);
            }
        }
    }
    pb.finish_with_message("done");

    let report = BatchReport {
        input_dir: input_dir.to_path_buf(),
        output_root: output_root.to_path_buf(),
        frames_per_file: params.frames_per_file,
        cases: reports,
    };
    log::info!("converted {} of {} cases", report.n_converted(), report.cases.len());
    for failed in report.failures() {
        if let CaseStatus::Failed { error } = &failed.status {
            log::warn!("failed case {} ({}): {}", failed.case_id, failed.source.display(), error);
        }
    }
    Ok(report)
}
