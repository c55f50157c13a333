use crate::error::{ReconError, Result};
use bzip2::read::BzDecoder;
use flate2::read::GzDecoder;
use std::fs::{self, File};
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use xz2::read::XzDecoder;

const GZIP_MAGIC: &[u8] = &[0x1f, 0x8b];
const XZ_MAGIC: &[u8] = &[0xfd, 0x37, 0x7a, 0x58, 0x5a, 0x00];
const BZIP2_MAGIC: &[u8] = b"BZh";
/// offset of the "ustar" marker in a posix/gnu tar header block
const USTAR_OFFSET: usize = 257;
const TAR_BLOCK: u64 = 512;

/// tarball flavours understood by [extract_archive]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveFormat {
    Tar,
    TarGz,
    TarXz,
    TarBz2,
}

impl ArchiveFormat {
    /// format suggested by the file name alone
    pub fn from_path(path: impl AsRef<Path>) -> Option<Self> {
        let name = path.as_ref().file_name()?.to_str()?.to_ascii_lowercase();
        if name.ends_with(".tar.xz") || name.ends_with(".txz") {
            Some(Self::TarXz)
        } else if name.ends_with(".tar.gz") || name.ends_with(".tgz") {
            Some(Self::TarGz)
        } else if name.ends_with(".tar.bz2") || name.ends_with(".tbz2") || name.ends_with(".tbz") {
            Some(Self::TarBz2)
        } else if name.ends_with(".tar") {
            Some(Self::Tar)
        } else {
            None
        }
    }

    /// Format recognized from the first bytes of the archive: a compression magic number, or the
    /// ustar marker of an uncompressed tar header. Old v7 tarballs carry no marker and give `None`.
    pub fn from_magic(head: &[u8]) -> Option<Self> {
        if head.starts_with(XZ_MAGIC) {
            Some(Self::TarXz)
        } else if head.starts_with(GZIP_MAGIC) {
            Some(Self::TarGz)
        } else if head.starts_with(BZIP2_MAGIC) {
            Some(Self::TarBz2)
        } else if head.get(USTAR_OFFSET..USTAR_OFFSET + 5) == Some(&b"ustar"[..]) {
            Some(Self::Tar)
        } else {
            None
        }
    }

    /// content decides, the file name is the fallback
    pub fn detect(head: &[u8], path: impl AsRef<Path>) -> Option<Self> {
        Self::from_magic(head).or_else(|| Self::from_path(path))
    }
}

#[derive(Debug, Clone)]
pub struct ExtractSummary {
    pub archive: PathBuf,
    pub target: PathBuf,
    pub format: ArchiveFormat,
    /// number of entries written below the target directory
    pub entries: usize,
}

/// Unpacks a whole archive into `target`, creating the directory (and its parents) first.
/// Entries that would land outside of `target` are skipped.
pub fn extract_archive(archive: impl AsRef<Path>, target: impl AsRef<Path>) -> Result<ExtractSummary> {
    let archive = archive.as_ref();
    let target = target.as_ref();
    let archive_err = |source: std::io::Error| ReconError::Archive { path: archive.to_path_buf(), source };

    let mut file = File::open(archive).map_err(archive_err)?;
    let mut head = Vec::with_capacity(TAR_BLOCK as usize);
    file.by_ref().take(TAR_BLOCK).read_to_end(&mut head).map_err(archive_err)?;
    file.seek(SeekFrom::Start(0)).map_err(archive_err)?;

    let format = ArchiveFormat::detect(&head, archive).ok_or_else(|| ReconError::UnsupportedArchive(archive.to_path_buf()))?;
    if ArchiveFormat::from_path(archive).is_some_and(|hint| hint != format) {
        log::warn!("{} is named like another archive format, reading it as {:?}", archive.display(), format);
    }

    fs::create_dir_all(target).map_err(|source| ReconError::CreateDir { path: target.to_path_buf(), source })?;

    let reader = BufReader::new(file);
    log::info!("extracting {} ({:?}) to {} ...", archive.display(), format, target.display());
    let entries = match format {
        ArchiveFormat::Tar => unpack_tar(reader, archive, target)?,
        ArchiveFormat::TarGz => unpack_tar(GzDecoder::new(reader), archive, target)?,
        ArchiveFormat::TarXz => unpack_tar(XzDecoder::new(reader), archive, target)?,
        ArchiveFormat::TarBz2 => unpack_tar(BzDecoder::new(reader), archive, target)?,
    };
    log::info!("extracted {} entries", entries);

    Ok(ExtractSummary {
        archive: archive.to_path_buf(),
        target: target.to_path_buf(),
        format,
        entries,
    })
}

fn unpack_tar<R: Read>(reader: R, archive_path: &Path, target: &Path) -> Result<usize> {
    let archive_err = |source: std::io::Error| ReconError::Archive { path: archive_path.to_path_buf(), source };

    let mut archive = tar::Archive::new(reader);
    let mut count = 0;
    for entry in archive.entries().map_err(archive_err)? {
        let mut entry = entry.map_err(archive_err)?;
        if entry.unpack_in(target).map_err(archive_err)? {
            count += 1;
        } else {
            let name = entry.path().map(|p| p.display().to_string()).unwrap_or_default();
            log::warn!("skipped archive entry outside of target directory: {}", name);
        }
    }
    Ok(count)
}
