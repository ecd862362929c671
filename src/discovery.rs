//! Finding datasets on disk and telling their formats apart.

use crate::errors::{CfKitError, Result};
use std::fmt;
use std::fs::{self, File};
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use tracing::debug;

const HDF5_SIGNATURE: &[u8; 8] = b"\x89HDF\r\n\x1a\n";

/// On-disk format of a dataset, named as `ncdump -k` names it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    Classic,
    Offset64,
    Cdf5,
    Netcdf4,
    Unknown,
}

impl fmt::Display for FileFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FileFormat::Classic => "classic",
            FileFormat::Offset64 => "64-bit offset",
            FileFormat::Cdf5 => "cdf5",
            FileFormat::Netcdf4 => "netCDF-4",
            FileFormat::Unknown => "unknown",
        })
    }
}

/// Non-hidden entries of a directory, sorted by name.
pub fn list_dataset_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut entries = Vec::new();
    for entry in fs::read_dir(dir).map_err(|source| CfKitError::FileOpen {
        path: dir.to_path_buf(),
        source,
    })? {
        let entry = entry?;
        if entry.file_name().to_string_lossy().starts_with('.') {
            continue;
        }
        entries.push(entry.path());
    }
    entries.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    debug!(dir = %dir.display(), count = entries.len(), "listed directory");
    Ok(entries)
}

/// Sniff the format from the file's magic number.
///
/// The HDF5 superblock may sit at byte 0, 512, 1024, 2048 and so on, so each
/// of those offsets is tried in turn.
pub fn detect_format(path: &Path) -> Result<FileFormat> {
    let mut file = File::open(path).map_err(|source| CfKitError::FileOpen {
        path: path.to_path_buf(),
        source,
    })?;
    let len = file.metadata()?.len();

    let mut magic = [0u8; 4];
    if len >= 4 {
        file.read_exact(&mut magic)?;
        match &magic {
            b"CDF\x01" => return Ok(FileFormat::Classic),
            b"CDF\x02" => return Ok(FileFormat::Offset64),
            b"CDF\x05" => return Ok(FileFormat::Cdf5),
            _ => {}
        }
    }

    let mut offset = 0u64;
    let mut signature = [0u8; 8];
    while offset + 8 <= len {
        file.seek(SeekFrom::Start(offset))?;
        file.read_exact(&mut signature)?;
        if &signature == HDF5_SIGNATURE {
            return Ok(FileFormat::Netcdf4);
        }
        offset = if offset == 0 { 512 } else { offset * 2 };
    }
    Ok(FileFormat::Unknown)
}
