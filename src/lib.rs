pub mod archive;
pub mod convert;
pub mod data_import;
pub mod error;
pub mod fftshift;
pub mod normalize;
pub mod signal_model;
pub mod slice_select;

pub use archive::{extract_archive, ArchiveFormat, ExtractSummary};
pub use convert::{convert_case, convert_directory, slice_file_name, BatchReport, CaseReport, CaseStatus};
pub use error::{ReconError, Result};

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// what to do with a case output directory left over from a previous run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExistingOutput {
    /// keep the directory, overwriting only files of the same name
    #[default]
    Merge,
    /// delete stale slice images of the case before writing
    Clear,
}

/// what happens to the rest of the batch when one case fails
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaseErrorPolicy {
    /// log the failure, record it in the report, move on
    #[default]
    Continue,
    /// stop the batch and return the case error
    Abort,
}

/// Conversion parameters. These are usually loaded from a toml file written by
/// `kspace2png-params` and then overridden from the command line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConvertParams {
    /// number of evenly spaced slices to export per case
    pub frames_per_file: usize,
    /// suffix of case files in the input directory, without the dot
    pub file_suffix: String,
    /// name of the k-space dataset inside each case file
    pub dataset: String,
    /// percentile of the magnitude image that maps to full white
    pub percentile: f64,
    pub existing_output: ExistingOutput,
    pub on_case_error: CaseErrorPolicy,
    /// convert cases on the rayon thread pool
    pub parallel: bool,
}

impl Default for ConvertParams {
    fn default() -> Self {
        Self {
            frames_per_file: 20,
            file_suffix: "h5".to_string(),
            dataset: "kspace".to_string(),
            percentile: 99.0,
            existing_output: ExistingOutput::Merge,
            on_case_error: CaseErrorPolicy::Continue,
            parallel: false,
        }
    }
}

impl ConvertParams {
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let toml_str = fs::read_to_string(path).map_err(|source| ReconError::Io { path: path.to_path_buf(), source })?;
        let params: Self = toml::from_str(&toml_str).map_err(|source| ReconError::Params { path: path.to_path_buf(), source })?;
        params.validate()?;
        Ok(params)
    }

    pub fn validate(&self) -> Result<()> {
        if self.frames_per_file == 0 {
            return Err(ReconError::InvalidParams("frames_per_file must be at least 1".to_string()));
        }
        if self.file_suffix.trim_start_matches('.').is_empty() {
            return Err(ReconError::InvalidParams("file_suffix must not be empty".to_string()));
        }
        if self.dataset.is_empty() {
            return Err(ReconError::InvalidParams("dataset must not be empty".to_string()));
        }
        if !(self.percentile > 0. && self.percentile <= 100.) {
            return Err(ReconError::InvalidParams(format!("percentile must be in (0, 100], got {}", self.percentile)));
        }
        Ok(())
    }

    /// the file suffix with any leading dot removed
    pub(crate) fn suffix(&self) -> &str {
        self.file_suffix.trim_start_matches('.')
    }
}

#[cfg(test)]
mod tests {
    use crate::{CaseErrorPolicy, ConvertParams, ExistingOutput, ReconError};
    use std::fs;

    #[test]
    fn default_params_survive_toml() {
        let params = ConvertParams::default();
        let toml_string = toml::to_string(&params).unwrap();
        let parsed: ConvertParams = toml::from_str(&toml_string).unwrap();
        assert_eq!(parsed, params);
        assert!(toml_string.contains("existing_output = \"merge\""));
    }

    #[test]
    fn partial_toml_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("params.toml");
        fs::write(&file, "frames_per_file = 4\non_case_error = \"abort\"\nexisting_output = \"clear\"\n").unwrap();
        let params = ConvertParams::from_toml_file(&file).unwrap();
        assert_eq!(params.frames_per_file, 4);
        assert_eq!(params.on_case_error, CaseErrorPolicy::Abort);
        assert_eq!(params.existing_output, ExistingOutput::Clear);
        assert_eq!(params.dataset, "kspace");
        assert_eq!(params.percentile, 99.0);
    }

    #[test]
    fn invalid_params_are_rejected() {
        let mut params = ConvertParams::default();
        params.frames_per_file = 0;
        assert!(matches!(params.validate(), Err(ReconError::InvalidParams(_))));

        let mut params = ConvertParams::default();
        params.percentile = 0.;
        assert!(params.validate().is_err());
        params.percentile = 100.5;
        assert!(params.validate().is_err());
        params.percentile = 100.;
        assert!(params.validate().is_ok());

        let mut params = ConvertParams::default();
        params.file_suffix = ".".to_string();
        assert!(params.validate().is_err());
    }

    #[test]
    fn bad_toml_reports_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("params.toml");
        fs::write(&file, "frames_per_file = \"many\"\n").unwrap();
        match ConvertParams::from_toml_file(&file) {
            Err(ReconError::Params { path, .. }) => assert_eq!(path, file),
            other => panic!("unexpected result {:?}", other),
        }
    }
}
