//! Input directory listing.

use crate::{BidsError, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::{DirEntry, WalkDir};

/// List input files below `dir` whose name ends with one of `extensions`.
///
/// Extensions are matched case-insensitively and may be multi-part
/// (`.nii.gz`). Hidden files and directories are skipped. The result holds
/// absolute paths in sorted order.
pub fn list_input_files(dir: &Path, extensions: &[String]) -> Result<Vec<PathBuf>> {
    let root = fs::canonicalize(dir).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => BidsError::FileNotFound(dir.to_path_buf()),
        _ => BidsError::io_with_path(e, dir),
    })?;
    if !root.is_dir() {
        return Err(BidsError::config(format!(
            "input {} is not a directory",
            dir.display()
        )));
    }

    let extensions: Vec<String> = extensions.iter().map(|e| e.to_lowercase()).collect();

    let mut files: Vec<PathBuf> = WalkDir::new(&root)
        .min_depth(1)
        .into_iter()
        .filter_entry(|e| !is_hidden(e))
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter(|e| {
            let name = e.file_name().to_string_lossy().to_lowercase();
            extensions.iter().any(|ext| name.ends_with(ext.as_str()))
        })
        .map(|e| e.into_path())
        .collect();
    files.sort();

    debug!("Found {} input files under {}", files.len(), root.display());
    Ok(files)
}

/// The walk root itself is never treated as hidden.
fn is_hidden(entry: &DirEntry) -> bool {
    entry.depth() > 0 && entry.file_name().to_string_lossy().starts_with('.')
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn touch(path: &Path) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, b"").unwrap();
    }

    fn default_extensions() -> Vec<String> {
        vec![".nii".to_string(), ".nii.gz".to_string()]
    }

    #[test]
    fn test_lists_matching_files_sorted() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        touch(&root.join("patient_002/FLAIR.nii.gz"));
        touch(&root.join("patient_001/T1w.NII"));
        touch(&root.join("patient_001/notes.txt"));
        touch(&root.join(".cache/scan.nii"));
        touch(&root.join("patient_001/.scan.nii"));

        let files = list_input_files(root, &default_extensions()).unwrap();
        let names: Vec<String> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();

        assert_eq!(names, vec!["T1w.NII", "FLAIR.nii.gz"]);
        assert!(files.iter().all(|p| p.is_absolute()));
    }

    #[test]
    fn test_missing_directory() {
        let temp_dir = TempDir::new().unwrap();
        let result = list_input_files(&temp_dir.path().join("absent"), &default_extensions());
        assert!(matches!(result, Err(BidsError::FileNotFound(_))));
    }

    #[test]
    fn test_file_instead_of_directory() {
        let temp_dir = TempDir::new().unwrap();
        let file = temp_dir.path().join("scan.nii");
        touch(&file);
        let result = list_input_files(&file, &default_extensions());
        assert!(matches!(result, Err(BidsError::Configuration { .. })));
    }
}
