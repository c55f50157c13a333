use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReconError {
    #[error("failed to read archive {path}: {source}")]
    Archive { path: PathBuf, source: io::Error },
    #[error("unsupported archive format: {0}")]
    UnsupportedArchive(PathBuf),
    #[error("failed to create directory {path}: {source}")]
    CreateDir { path: PathBuf, source: io::Error },
    #[error("failed to list case files in {path}: {reason}")]
    ReadDir { path: PathBuf, reason: String },
    #[error("failed to read {dataset} from {path}: {source}")]
    Hdf5 { path: PathBuf, dataset: String, source: hdf5::Error },
    #[error("malformed k-space in {path}: {reason}")]
    MalformedKspace { path: PathBuf, reason: String },
    #[error("failed to write image {path}: {source}")]
    WriteImage { path: PathBuf, source: image::ImageError },
    #[error("failed to remove stale image {path}: {source}")]
    RemoveStale { path: PathBuf, source: io::Error },
    #[error("failed to parse parameter file {path}: {source}")]
    Params { path: PathBuf, source: toml::de::Error },
    #[error("invalid parameters: {0}")]
    InvalidParams(String),
    #[error("io error on {path}: {source}")]
    Io { path: PathBuf, source: io::Error },
}

pub type Result<T> = std::result::Result<T, ReconError>;
