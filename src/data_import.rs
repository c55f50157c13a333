use crate::error::{ReconError, Result};
use ndarray::{Array3, Ix3};
use num_complex::Complex32;
use std::fs;
use std::path::{Path, PathBuf};

/// a single examination file and the id its images are named after
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaseFile {
    pub id: String,
    pub path: PathBuf,
}

/// case id of a file: the file name up to the first '.'
pub fn case_id(path: impl AsRef<Path>) -> Option<String> {
    let name = path.as_ref().file_name()?.to_str()?;
    let id = name.split('.').next().unwrap_or(name);
    Some(id.to_string())
}

/// Lists the case files directly inside `input_dir` whose names end with `.<suffix>`, sorted by
/// path. Sub-directories are not searched.
pub fn list_case_files(input_dir: impl AsRef<Path>, suffix: &str) -> Result<Vec<CaseFile>> {
    let input_dir = input_dir.as_ref();
    let read_dir_err = |reason: String| ReconError::ReadDir { path: input_dir.to_path_buf(), reason };

    if !input_dir.is_dir() {
        return Err(read_dir_err("not a directory".to_string()));
    }

    let pattern = format!(
        "{}/*.{}",
        glob::Pattern::escape(&input_dir.display().to_string()),
        glob::Pattern::escape(suffix.trim_start_matches('.'))
    );
    let p = glob::glob(&pattern).map_err(|e| read_dir_err(e.to_string()))?;

    let mut paths = Vec::new();
    for entry in p {
        let path = entry.map_err(|e| read_dir_err(e.to_string()))?;
        if path.is_file() {
            paths.push(path);
        }
    }
    paths.sort();

    Ok(paths
        .into_iter()
        .filter_map(|path| match case_id(&path) {
            Some(id) if !id.is_empty() => Some(CaseFile { id, path }),
            _ => {
                log::warn!("skipping {}: no usable case id in file name", path.display());
                None
            }
        })
        .collect())
}

/// Picks the directory holding the case files of an extracted archive: `root/<subdir>` when a
/// sub-directory is given, otherwise `root` itself unless it has no case files and exactly one
/// sub-directory, as archives that unpack into a single folder do.
pub fn resolve_case_dir(root: impl AsRef<Path>, subdir: Option<&Path>, suffix: &str) -> Result<PathBuf> {
    let root = root.as_ref();
    if let Some(sub) = subdir {
        return Ok(root.join(sub));
    }
    if !list_case_files(root, suffix)?.is_empty() {
        return Ok(root.to_path_buf());
    }

    let read_dir_err = |e: std::io::Error| ReconError::ReadDir { path: root.to_path_buf(), reason: e.to_string() };
    let mut sub_dirs = Vec::new();
    for entry in fs::read_dir(root).map_err(read_dir_err)? {
        let path = entry.map_err(read_dir_err)?.path();
        if path.is_dir() {
            sub_dirs.push(path);
        }
    }
    match sub_dirs.as_slice() {
        [only] => {
            log::info!("using case files in {}", only.display());
            Ok(only.clone())
        }
        _ => Ok(root.to_path_buf()),
    }
}

/// Reads the k-space dataset of a case file fully into memory. The array is expected to have the
/// shape [slices, rows, cols] with at least one slice and non-empty slices.
pub fn read_kspace(file: impl AsRef<Path>, dataset: &str) -> Result<Array3<Complex32>> {
    let file = file.as_ref();
    let h5_err = |source: hdf5::Error| ReconError::Hdf5 { path: file.to_path_buf(), dataset: dataset.to_string(), source };

    let h5 = hdf5::File::open(file).map_err(h5_err)?;
    let ds = h5.dataset(dataset).map_err(h5_err)?;

    let shape = ds.shape();
    if shape.len() != 3 {
        return Err(ReconError::MalformedKspace {
            path: file.to_path_buf(),
            reason: format!("expected a 3-D [slices, rows, cols] array, found shape {:?}", shape),
        });
    }
    if shape.iter().any(|&d| d == 0) {
        return Err(ReconError::MalformedKspace {
            path: file.to_path_buf(),
            reason: format!("empty k-space array with shape {:?}", shape),
        });
    }

    let kspace = ds.read_dyn::<Complex32>().map_err(h5_err)?;
    kspace.into_dimensionality::<Ix3>().map_err(|e| ReconError::MalformedKspace {
        path: file.to_path_buf(),
        reason: e.to_string(),
    })
}
