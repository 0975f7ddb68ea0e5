use flate2::read::MultiGzDecoder;
use std::fs::{self, File};
use std::io::{self, BufRead, BufReader, Read};
use std::path::{Path, PathBuf};

/// Magic bytes at the start of every gzip member.
const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Read buffer for snapshot files. Snapshots are tens of gigabytes, so the
/// default 8 KiB buffer costs too many syscalls.
const SNAPSHOT_BUFFER_SIZE: usize = 1 << 20;

/// Open a snapshot file for sequential reading.
///
/// Gzip-compressed files are detected by their magic bytes (not by extension)
/// and decompressed on the fly.
///
/// # Errors
/// Returns an error if the file cannot be opened or its first bytes cannot be read.
pub fn open_snapshot(path: &Path) -> io::Result<Box<dyn Read + Send>> {
    let file = File::open(path)?;
    let mut reader = BufReader::with_capacity(SNAPSHOT_BUFFER_SIZE, file);

    if reader.fill_buf()?.starts_with(&GZIP_MAGIC) {
        let decoder = MultiGzDecoder::new(reader);
        Ok(Box::new(BufReader::with_capacity(
            SNAPSHOT_BUFFER_SIZE,
            decoder,
        )))
    } else {
        Ok(Box::new(reader))
    }
}

/// Path used while a file is still being written.
///
/// `data/all_docs.json` becomes `data/all_docs.json.partial`.
#[must_use]
pub fn partial_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(std::ffi::OsStr::to_os_string)
        .unwrap_or_default();
    name.push(".partial");
    path.with_file_name(name)
}

/// Move a completed partial file into its final location.
///
/// The rename is atomic on the same filesystem: readers see either no file or
/// the complete file.
///
/// # Errors
/// Returns an error if the rename fails.
pub fn commit_partial(partial: &Path, dest: &Path) -> io::Result<()> {
    match fs::rename(partial, dest) {
        Ok(()) => Ok(()),
        Err(e) => {
            // On Windows, rename can fail if target exists. Try copy + remove as fallback.
            if cfg!(windows) {
                fs::copy(partial, dest)?;
                let _ = fs::remove_file(partial);
                Ok(())
            } else {
                let _ = fs::remove_file(partial);
                Err(e)
            }
        }
    }
}

/// Return the first path in `paths` that already exists.
#[must_use]
pub fn first_existing<'a, I>(paths: I) -> Option<&'a Path>
where
    I: IntoIterator<Item = &'a Path>,
{
    paths.into_iter().find(|p| p.exists())
}

/// Create the parent directory of `path` if it is missing.
///
/// # Errors
/// Returns an error if the directory cannot be created.
pub fn ensure_parent_dir(path: &Path) -> io::Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => fs::create_dir_all(parent),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::Write;
    use tempfile::tempdir;

    #[test]
    fn test_open_snapshot_plain() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("all_docs.json");
        fs::write(&path, br#"{"rows":[]}"#).unwrap();

        let mut content = String::new();
        open_snapshot(&path)
            .unwrap()
            .read_to_string(&mut content)
            .unwrap();
        assert_eq!(content, r#"{"rows":[]}"#);
    }

    #[test]
    fn test_open_snapshot_gzip_detected_by_magic() {
        let dir = tempdir().unwrap();
        // No .gz extension on purpose
        let path = dir.path().join("all_docs.json");
        let mut encoder = GzEncoder::new(Vec::new(), Compression::fast());
        encoder.write_all(br#"{"total_rows":0}"#).unwrap();
        fs::write(&path, encoder.finish().unwrap()).unwrap();

        let mut content = String::new();
        open_snapshot(&path)
            .unwrap()
            .read_to_string(&mut content)
            .unwrap();
        assert_eq!(content, r#"{"total_rows":0}"#);
    }

    #[test]
    fn test_open_snapshot_missing_file() {
        let dir = tempdir().unwrap();
        assert!(open_snapshot(&dir.path().join("nope.json")).is_err());
    }

    #[test]
    fn test_partial_path() {
        let path = Path::new("data/all_docs.json");
        assert_eq!(partial_path(path), PathBuf::from("data/all_docs.json.partial"));
    }

    #[test]
    fn test_commit_partial() {
        let dir = tempdir().unwrap();
        let dest = dir.path().join("all_docs.json");
        let partial = partial_path(&dest);
        fs::write(&partial, b"done").unwrap();

        commit_partial(&partial, &dest).unwrap();

        assert!(!partial.exists());
        assert_eq!(fs::read_to_string(&dest).unwrap(), "done");
    }

    #[test]
    fn test_first_existing() {
        let dir = tempdir().unwrap();
        let a = dir.path().join("a.csv");
        let b = dir.path().join("b.csv");
        fs::write(&b, b"").unwrap();

        assert_eq!(first_existing([a.as_path(), b.as_path()]), Some(b.as_path()));
        assert_eq!(first_existing([a.as_path()]), None);
    }

    #[test]
    fn test_ensure_parent_dir() {
        let dir = tempdir().unwrap();
        let nested = dir.path().join("nodes").join("package.csv");
        ensure_parent_dir(&nested).unwrap();
        assert!(dir.path().join("nodes").is_dir());
    }
}
