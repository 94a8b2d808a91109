use std::fs;
use std::io;
use std::path::Path;

use zip::ZipArchive;
use zip::result::ZipError;

use crate::error::FetchError;

/// Unpacks every entry of `zip_path` below `target_dir` and returns the number
/// of files written. The archive handle is released before this returns,
/// whether or not extraction succeeded.
pub fn extract_zip(zip_path: &Path, target_dir: &Path) -> Result<usize, FetchError> {
    let mut archive = open_archive(zip_path)?;
    let mut files = 0;

    for i in 0..archive.len() {
        let mut entry = archive
            .by_index(i)
            .map_err(|source| archive_error(zip_path, source))?;
        let entry_path = match entry.enclosed_name() {
            Some(path) => target_dir.join(path),
            None => return Err(FetchError::UnsafeArchiveEntry(entry.name().to_string())),
        };

        if entry.is_dir() {
            fs::create_dir_all(&entry_path)
                .map_err(|err| FetchError::Filesystem(err.to_string()))?;
            continue;
        }

        if let Some(parent) = entry_path.parent() {
            fs::create_dir_all(parent).map_err(|err| FetchError::Filesystem(err.to_string()))?;
        }
        let mut outfile = fs::File::create(&entry_path).map_err(|err| {
            FetchError::Filesystem(format!("create {}: {err}", entry_path.display()))
        })?;
        io::copy(&mut entry, &mut outfile)
            .map_err(|err| FetchError::Filesystem(err.to_string()))?;
        files += 1;
    }
    Ok(files)
}

/// Reads every entry to the end so CRC mismatches surface without writing
/// anything.
pub fn validate_zip(zip_path: &Path) -> Result<(), FetchError> {
    let mut archive = open_archive(zip_path)?;

    for i in 0..archive.len() {
        let mut entry = archive
            .by_index(i)
            .map_err(|source| archive_error(zip_path, source))?;
        if entry.is_dir() {
            continue;
        }
        io::copy(&mut entry, &mut io::sink())
            .map_err(|err| archive_error(zip_path, ZipError::Io(err)))?;
    }
    Ok(())
}

fn open_archive(zip_path: &Path) -> Result<ZipArchive<fs::File>, FetchError> {
    let file = fs::File::open(zip_path).map_err(|err| archive_error(zip_path, ZipError::Io(err)))?;
    ZipArchive::new(file).map_err(|source| archive_error(zip_path, source))
}

fn archive_error(zip_path: &Path, source: ZipError) -> FetchError {
    FetchError::Archive {
        path: zip_path.to_path_buf(),
        source,
    }
}

/// Deletes `path` if it exists. Returns whether something was removed.
pub fn remove_if_exists(path: &Path) -> Result<bool, FetchError> {
    match fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(err) => Err(FetchError::Filesystem(format!(
            "remove {}: {err}",
            path.display()
        ))),
    }
}
