//! Destination path synthesis.

use crate::config::PathsConfig;
use crate::naming::{Category, NormalizedId};
use crate::planner::DatasetType;
use std::path::{Path, PathBuf};

/// Compression suffixes that form a multi-part extension with the part
/// before them (`.nii.gz`, `.tar.bz2`).
const COMPRESSION_SUFFIXES: &[&str] = &["gz", "bz2", "xz", "zst"];

/// Split a file name into stem and extension, keeping multi-part extensions
/// such as `.nii.gz` together. The extension keeps its original case and its
/// leading dot; a leading dot of a hidden file is not an extension.
///
/// ```ignore
/// assert_eq!(split_extension("T1w.nii.gz"), ("T1w", ".nii.gz"));
/// assert_eq!(split_extension("scan.NII"), ("scan", ".NII"));
/// ```
pub fn split_extension(file_name: &str) -> (&str, &str) {
    let Some(last_dot) = file_name.rfind('.').filter(|&pos| pos > 0) else {
        return (file_name, "");
    };

    let last_part = &file_name[last_dot + 1..];
    if COMPRESSION_SUFFIXES.contains(&last_part.to_lowercase().as_str()) {
        if let Some(inner_dot) = file_name[..last_dot].rfind('.').filter(|&pos| pos > 0) {
            return (&file_name[..inner_dot], &file_name[inner_dot..]);
        }
    }

    (&file_name[..last_dot], &file_name[last_dot..])
}

/// Root of the dataset being written: the output root for raw data,
/// `derivatives/<pipeline>` below it for derivatives.
pub fn dataset_root(
    output_root: &Path,
    dataset_type: DatasetType,
    pipeline_name: Option<&str>,
) -> PathBuf {
    match (dataset_type, pipeline_name) {
        (DatasetType::Derivatives, Some(pipeline)) => output_root
            .join(PathsConfig::DERIVATIVES_DIR_NAME)
            .join(pipeline),
        _ => output_root.to_path_buf(),
    }
}

/// `{root}/sub-{pid}/[ses-{sid}/]{folder}/sub-{pid}[_ses-{sid}]_{label}{ext}`
pub fn bids_destination(
    dataset_root: &Path,
    participant: &NormalizedId,
    session: Option<&NormalizedId>,
    category: &Category,
    extension: &str,
) -> PathBuf {
    let mut dir = dataset_root.join(format!("sub-{}", participant));
    let mut file_name = format!("sub-{}", participant);

    if let Some(session) = session {
        dir.push(format!("ses-{}", session));
        file_name.push_str(&format!("_ses-{}", session));
    }

    if let Some(folder) = &category.folder {
        dir.push(folder);
    }

    file_name.push_str(&format!("_{}{}", category.label, extension));
    dir.join(file_name)
}

/// Destination of a retained unknown-category file:
/// `{root}/sourcedata/sub-{pid}/[ses-{sid}/]{original name}`.
pub fn sourcedata_destination(
    dataset_root: &Path,
    participant: &NormalizedId,
    session: Option<&NormalizedId>,
    original_name: &str,
) -> PathBuf {
    let mut dir = dataset_root
        .join(PathsConfig::SOURCEDATA_DIR_NAME)
        .join(format!("sub-{}", participant));
    if let Some(session) = session {
        dir.push(format!("ses-{}", session));
    }
    dir.join(original_name)
}

/// Phenotype side folder: next to the dataset description.
pub fn phenotype_dir(dataset_root: &Path) -> PathBuf {
    dataset_root.join(PathsConfig::PHENOTYPE_DIR_NAME)
}

/// Publications side folder: `derivatives/publications/<pipeline>`.
pub fn publications_dir(output_root: &Path, pipeline_name: &str) -> PathBuf {
    output_root
        .join(PathsConfig::DERIVATIVES_DIR_NAME)
        .join(PathsConfig::PUBLICATIONS_DIR_NAME)
        .join(pipeline_name)
}

/// Append `_{n}` to the stem of `path`, keeping its extension.
pub fn with_collision_suffix(path: &Path, n: usize) -> PathBuf {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let (stem, extension) = split_extension(&file_name);
    path.with_file_name(format!("{}_{}{}", stem, n, extension))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::naming::{CategoryGroup, IdNormalizer};

    fn id(raw: &str) -> NormalizedId {
        IdNormalizer::new(3).normalize(raw).unwrap()
    }

    fn session(raw: &str) -> NormalizedId {
        IdNormalizer::new(2).normalize(raw).unwrap()
    }

    #[test]
    fn test_split_extension() {
        assert_eq!(split_extension("T1w.nii.gz"), ("T1w", ".nii.gz"));
        assert_eq!(split_extension("T1w.nii"), ("T1w", ".nii"));
        assert_eq!(split_extension("scan.v2.NII.GZ"), ("scan.v2", ".NII.GZ"));
        assert_eq!(split_extension("archive.gz"), ("archive", ".gz"));
        assert_eq!(split_extension("README"), ("README", ""));
        assert_eq!(split_extension(".hidden"), (".hidden", ""));
    }

    #[test]
    fn test_raw_destination() {
        let root = Path::new("/out");
        let anat = Category::new("T1w", CategoryGroup::Anatomical, "anat");
        let dest = bids_destination(root, &id("001"), Some(&session("01")), &anat, ".nii.gz");
        assert_eq!(
            dest,
            PathBuf::from("/out/sub-001/ses-01/anat/sub-001_ses-01_T1w.nii.gz")
        );
    }

    #[test]
    fn test_derivative_destination_without_session() {
        let root = dataset_root(Path::new("/out"), DatasetType::Derivatives, Some("lesion_analysis"));
        let lesion = Category::new("lesion", CategoryGroup::Anatomical, "anat");
        let dest = bids_destination(&root, &id("Ross1981-case2"), None, &lesion, ".nii.gz");
        assert_eq!(
            dest,
            PathBuf::from(
                "/out/derivatives/lesion_analysis/sub-ross1981ucase2/anat/sub-ross1981ucase2_lesion.nii.gz"
            )
        );
    }

    #[test]
    fn test_sourcedata_destination() {
        let dest = sourcedata_destination(
            Path::new("/out"),
            &id("002"),
            Some(&session("01")),
            "notes_scan.nii",
        );
        assert_eq!(
            dest,
            PathBuf::from("/out/sourcedata/sub-002/ses-01/notes_scan.nii")
        );
    }

    #[test]
    fn test_collision_suffix() {
        let path = Path::new("/out/sub-001/ses-01/anat/sub-001_ses-01_T1w.nii.gz");
        assert_eq!(
            with_collision_suffix(path, 2),
            PathBuf::from("/out/sub-001/ses-01/anat/sub-001_ses-01_T1w_2.nii.gz")
        );
    }

    #[test]
    fn test_side_folders() {
        assert_eq!(
            phenotype_dir(Path::new("/out/derivatives/p")),
            PathBuf::from("/out/derivatives/p/phenotype")
        );
        assert_eq!(
            publications_dir(Path::new("/out"), "p"),
            PathBuf::from("/out/derivatives/publications/p")
        );
    }
}
