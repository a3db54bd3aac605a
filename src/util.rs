use anyhow::{anyhow, Result};
use std::fs::File;
use std::io;
use std::path::Path;

/// Opens `path`, naming the kind of file (e.g., `project`) in the error.
pub fn open(path: &Path, kind: &str) -> Result<File> {
    match File::open(path) {
        Err(e) => Err(anyhow!("Opening {} file `{}`: {}", kind, path.display(), e)),
        Ok(file) => Ok(file),
    }
}

/// Whether `name` can be used as a single path component under a directory
/// we own: non-empty, not `.` or `..`, and free of path separators.
pub fn is_file_name(name: &str) -> bool {
    !name.is_empty() && name != "." && name != ".." && !name.contains(|c: char| c == '/' || c == '\\')
}

/// Removes `dir` and its contents. A directory that doesn't exist is not an
/// error.
pub fn rmdir(dir: &Path) -> io::Result<()> {
    match std::fs::remove_dir_all(dir) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}

/// Copies the files under `src` into `dst`, recreating the directory
/// structure. Existing files are overwritten. Returns the number of files
/// copied.
pub fn copy_dir(src: &Path, dst: &Path) -> io::Result<usize> {
    use walkdir::WalkDir;

    let mut copied = 0;
    for result in WalkDir::new(src).sort_by(|a, b| a.file_name().cmp(b.file_name())) {
        let entry = result.map_err(io::Error::from)?;
        // strip_prefix() can't fail; every entry is under `src`
        let relative = entry.path().strip_prefix(src).unwrap_or_else(|_| entry.path());
        let target = dst.join(relative);
        if entry.file_type().is_dir() {
            std::fs::create_dir_all(&target)?;
        } else {
            std::fs::copy(entry.path(), &target)?;
            copied += 1;
        }
    }
    Ok(copied)
}

#[cfg(test)]
mod test {
    use super::*;
    use std::fs;

    #[test]
    fn test_copy_dir() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let src = tempfile::tempdir()?;
        let dst = tempfile::tempdir()?;
        fs::create_dir_all(src.path().join("css"))?;
        fs::write(src.path().join("css/style.css"), "body {}")?;
        fs::write(src.path().join("favicon.ico"), [0u8, 1, 2])?;

        assert_eq!(2, copy_dir(src.path(), dst.path())?);
        assert_eq!("body {}", fs::read_to_string(dst.path().join("css/style.css"))?);
        assert_eq!(vec![0u8, 1, 2], fs::read(dst.path().join("favicon.ico"))?);
        Ok(())
    }

    #[test]
    fn test_is_file_name() {
        assert!(is_file_name("en"));
        assert!(is_file_name("pt-br"));
        assert!(is_file_name("..en"));
        for name in ["", ".", "..", "../en", "en/", "a\\b"].iter() {
            assert!(!is_file_name(name), "{:?}", name);
        }
    }

    #[test]
    fn test_rmdir_missing_is_ok() -> io::Result<()> {
        let dir = tempfile::tempdir()?;
        rmdir(&dir.path().join("nope"))?;
        fs::create_dir_all(dir.path().join("cities/deep"))?;
        rmdir(&dir.path().join("cities"))?;
        assert!(!dir.path().join("cities").exists());
        Ok(())
    }
}
