//src/discover.rs

use std::path::{Path, PathBuf};

use crate::errors::AggregateError;

/// Lists the regular files in `dir` whose names match `pattern`, sorted by path.
/// The sort order is the discovery order used for sample columns.
pub fn discover_sample_files<P: AsRef<Path>>(
    dir: P,
    pattern: &str,
) -> Result<Vec<PathBuf>, AggregateError> {
    // The directory is literal; only the file name part is a pattern.
    let escaped_dir = glob::Pattern::escape(&dir.as_ref().to_string_lossy());
    let full_pattern = Path::new(&escaped_dir).join(pattern);
    let full_pattern = full_pattern.to_string_lossy();

    // `*.tsv` must not pick up dotfiles such as macOS `._S1.tsv`.
    let options = glob::MatchOptions {
        require_literal_leading_dot: true,
        ..Default::default()
    };
    let entries = glob::glob_with(&full_pattern, options).map_err(|source| AggregateError::Pattern {
        pattern: pattern.to_string(),
        source,
    })?;

    let mut files = Vec::new();
    for entry in entries {
        let path = entry?;
        if path.is_file() {
            files.push(path);
        } else {
            log::debug!("Ignoring non-file match {}", path.display());
        }
    }
    files.sort();

    log::info!(
        "Found {} file(s) matching '{}' in {}",
        files.len(),
        pattern,
        dir.as_ref().display()
    );
    Ok(files)
}

/// Whether the path names a gzip-compressed file.
pub fn is_gzipped(path: &Path) -> bool {
    path.extension().map(|ext| ext == "gz").unwrap_or(false)
}

/// Derives a sample name from a file path: the base name with its extension
/// stripped. A trailing `.gz` is removed first, so `S1.tsv.gz` gives `S1`.
pub fn sample_name(path: &Path) -> Option<String> {
    let file_name = path.file_name()?;
    let mut stem = Path::new(file_name);
    if is_gzipped(stem) {
        stem = Path::new(stem.file_stem()?);
    }
    let name = stem.file_stem()?.to_string_lossy().into_owned();
    if name.is_empty() {
        None
    } else {
        Some(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_sample_name_strips_one_extension() {
        assert_eq!(sample_name(Path::new("/data/S1.tsv")).as_deref(), Some("S1"));
        assert_eq!(sample_name(Path::new("run.2024.tsv")).as_deref(), Some("run.2024"));
        assert_eq!(sample_name(Path::new("noext")).as_deref(), Some("noext"));
    }

    #[test]
    fn test_sample_name_strips_gz_then_extension() {
        assert_eq!(sample_name(Path::new("out/S1.tsv.gz")).as_deref(), Some("S1"));
        assert!(is_gzipped(Path::new("S1.tsv.gz")));
        assert!(!is_gzipped(Path::new("S1.tsv")));
    }

    #[test]
    fn test_discover_sorts_and_filters() {
        let dir = tempfile::tempdir().expect("tempdir");
        fs::write(dir.path().join("b.tsv"), "x").unwrap();
        fs::write(dir.path().join("a.tsv"), "x").unwrap();
        fs::write(dir.path().join("c.txt"), "x").unwrap();
        fs::create_dir(dir.path().join("d.tsv")).unwrap();
        fs::write(dir.path().join(".hidden.tsv"), "x").unwrap();
        fs::write(dir.path().join("._a.tsv"), "x").unwrap();

        let files = discover_sample_files(dir.path(), "*.tsv").expect("discovery failed");
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.tsv", "b.tsv"]);
    }

    #[test]
    fn test_discover_empty_dir() {
        let dir = tempfile::tempdir().expect("tempdir");
        let files = discover_sample_files(dir.path(), "*.tsv").expect("discovery failed");
        assert!(files.is_empty());
    }

    #[test]
    fn test_discover_rejects_bad_pattern() {
        let dir = tempfile::tempdir().expect("tempdir");
        let err = discover_sample_files(dir.path(), "[").unwrap_err();
        assert!(matches!(err, AggregateError::Pattern { .. }));
    }
}
