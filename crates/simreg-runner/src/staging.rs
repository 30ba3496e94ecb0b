//! Copying inputs and build products into a case's run directory

use std::io;
use std::path::Path;
use walkdir::WalkDir;

/// Recursively copy the contents of `from` into `to`, creating `to` as needed
pub fn copy_tree(from: &Path, to: &Path) -> io::Result<u64> {
    let mut copied = 0;
    for entry in WalkDir::new(from).follow_links(true) {
        let entry = entry.map_err(io::Error::other)?;
        let relative = entry.path().strip_prefix(from).map_err(io::Error::other)?;
        let target = to.join(relative);
        if entry.file_type().is_dir() {
            std::fs::create_dir_all(&target)?;
        } else {
            std::fs::copy(entry.path(), &target)?;
            copied += 1;
        }
    }
    Ok(copied)
}

/// Copy one file into `dir`, keeping its name
pub fn copy_into(file: &Path, dir: &Path) -> io::Result<()> {
    let name = file
        .file_name()
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "path has no file name"))?;
    std::fs::copy(file, dir.join(name))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn copies_nested_inputs() {
        let src = TempDir::new().unwrap();
        std::fs::write(src.path().join("Input__Parameter"), "END_T 1\n").unwrap();
        std::fs::create_dir(src.path().join("sub")).unwrap();
        std::fs::write(src.path().join("sub/table"), "1 2\n").unwrap();

        let dst = TempDir::new().unwrap();
        let target = dst.path().join("case");
        assert_eq!(copy_tree(src.path(), &target).unwrap(), 2);
        assert_eq!(std::fs::read_to_string(target.join("sub/table")).unwrap(), "1 2\n");
    }

    #[test]
    fn missing_source_is_an_error() {
        let dst = TempDir::new().unwrap();
        assert!(copy_tree(&dst.path().join("nope"), dst.path()).is_err());
        assert!(copy_into(&dst.path().join("nope"), dst.path()).is_err());
    }
}
