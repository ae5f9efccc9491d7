//! Patch discovery across one or more filesystem locations.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{debug, warn};

use crate::core::naming::patch_name;
use crate::core::types::{DuplicatePolicy, PatchFile};
use crate::error::PatchError;

/// Discover candidate patches and return them sorted by name.
///
/// A location ending in `.{extension}` is taken as a direct file reference and
/// included as-is. Any other location is listed as a directory, non-recursively,
/// keeping files that match `*_*.{extension}`. Missing directories contribute
/// nothing.
pub fn discover(
    locations: &[PathBuf],
    extension: &str,
    duplicates: DuplicatePolicy,
) -> Result<Vec<PatchFile>> {
    let mut found: BTreeMap<String, PathBuf> = BTreeMap::new();
    for location in locations {
        for path in candidates(location, extension)? {
            let name = patch_name(&path);
            match found.get(&name) {
                Some(existing) if existing != &path => match duplicates {
                    DuplicatePolicy::Reject => {
                        return Err(PatchError::DuplicatePatch {
                            name,
                            first: existing.clone(),
                            second: path,
                        }
                        .into());
                    }
                    DuplicatePolicy::LastWins => {
                        warn!(
                            patch = %name,
                            shadowed = %existing.display(),
                            by = %path.display(),
                            "duplicate patch name, later file wins"
                        );
                    }
                },
                _ => {}
            }
            found.insert(name, path);
        }
    }
    debug!(count = found.len(), "patches discovered");
    Ok(found
        .into_iter()
        .map(|(name, path)| PatchFile { name, path })
        .collect())
}

fn candidates(location: &Path, extension: &str) -> Result<Vec<PathBuf>> {
    if has_extension(location, extension) {
        return Ok(vec![location.to_path_buf()]);
    }
    if !location.is_dir() {
        debug!(location = %location.display(), "patch directory missing, skipping");
        return Ok(Vec::new());
    }
    let mut paths = Vec::new();
    let entries = fs::read_dir(location)
        .with_context(|| format!("read patch directory {}", location.display()))?;
    for entry in entries {
        let entry = entry
            .with_context(|| format!("read patch directory entry in {}", location.display()))?;
        let path = entry.path();
        if path.is_file() && matches_pattern(&path, extension) {
            paths.push(path);
        }
    }
    Ok(paths)
}

fn has_extension(path: &Path, extension: &str) -> bool {
    path.extension().and_then(|ext| ext.to_str()) == Some(extension)
}

/// `*_*.{extension}`, excluding dotfiles.
fn matches_pattern(path: &Path, extension: &str) -> bool {
    if !has_extension(path, extension) {
        return false;
    }
    let Some(file_name) = path.file_name().and_then(|name| name.to_str()) else {
        return false;
    };
    if file_name.starts_with('.') {
        return false;
    }
    patch_name(path).contains('_')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::classify;

    fn touch(dir: &Path, file_name: &str) -> PathBuf {
        let path = dir.join(file_name);
        fs::write(&path, "-- patch\n").expect("write patch");
        path
    }

    fn names(files: &[PatchFile]) -> Vec<&str> {
        files.iter().map(|file| file.name.as_str()).collect()
    }

    #[test]
    fn lists_matching_files_sorted_by_name() {
        let temp = tempfile::tempdir().expect("tempdir");
        let dir = temp.path();
        touch(dir, "2024_01_01_000002_c.sql");
        touch(dir, "2024_01_01_000000_a.sql");
        touch(dir, "2024_01_01_000001_b.sql");

        let files = discover(&[dir.to_path_buf()], "sql", DuplicatePolicy::Reject)
            .expect("discover");
        assert_eq!(
            names(&files),
            vec![
                "2024_01_01_000000_a",
                "2024_01_01_000001_b",
                "2024_01_01_000002_c"
            ]
        );
        assert_eq!(files[0].path, dir.join("2024_01_01_000000_a.sql"));
    }

    #[test]
    fn ignores_non_matching_entries() {
        let temp = tempfile::tempdir().expect("tempdir");
        let dir = temp.path();
        touch(dir, "2024_01_01_000000_a.sql");
        touch(dir, "README.sql");
        touch(dir, "2024_01_01_000001_b.txt");
        touch(dir, ".2024_01_01_000002_hidden.sql");
        fs::create_dir(dir.join("2024_01_01_000003_dir.sql")).expect("mkdir");
        let nested = dir.join("nested");
        fs::create_dir(&nested).expect("mkdir");
        touch(&nested, "2024_01_01_000004_nested.sql");

        let files = discover(&[dir.to_path_buf()], "sql", DuplicatePolicy::Reject)
            .expect("discover");
        assert_eq!(names(&files), vec!["2024_01_01_000000_a"]);
    }

    #[test]
    fn includes_direct_file_references_as_is() {
        let temp = tempfile::tempdir().expect("tempdir");
        let dir = temp.path().join("patches");
        fs::create_dir(&dir).expect("mkdir");
        touch(&dir, "2024_01_01_000001_b.sql");
        let direct = temp.path().join("one_off.sql");

        let files = discover(
            &[dir.clone(), direct.clone()],
            "sql",
            DuplicatePolicy::Reject,
        )
        .expect("discover");
        assert_eq!(names(&files), vec!["2024_01_01_000001_b", "one_off"]);
        assert_eq!(files[1].path, direct);
    }

    #[test]
    fn missing_directory_contributes_nothing() {
        let temp = tempfile::tempdir().expect("tempdir");
        let files = discover(
            &[temp.path().join("missing")],
            "sql",
            DuplicatePolicy::Reject,
        )
        .expect("discover");
        assert!(files.is_empty());
    }

    #[test]
    fn rejects_duplicate_names_across_locations() {
        let temp = tempfile::tempdir().expect("tempdir");
        let first = temp.path().join("first");
        let second = temp.path().join("second");
        fs::create_dir(&first).expect("mkdir");
        fs::create_dir(&second).expect("mkdir");
        touch(&first, "2024_01_01_000000_a.sql");
        touch(&second, "2024_01_01_000000_a.sql");

        let err = discover(&[first, second], "sql", DuplicatePolicy::Reject).unwrap_err();
        assert!(matches!(
            classify(&err),
            Some(PatchError::DuplicatePatch { name, .. }) if name == "2024_01_01_000000_a"
        ));
    }

    #[test]
    fn last_wins_keeps_later_location() {
        let temp = tempfile::tempdir().expect("tempdir");
        let first = temp.path().join("first");
        let second = temp.path().join("second");
        fs::create_dir(&first).expect("mkdir");
        fs::create_dir(&second).expect("mkdir");
        touch(&first, "2024_01_01_000000_a.sql");
        let later = touch(&second, "2024_01_01_000000_a.sql");

        let files = discover(&[first, second], "sql", DuplicatePolicy::LastWins)
            .expect("discover");
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].path, later);
    }

    #[test]
    fn same_path_twice_is_not_a_conflict() {
        let temp = tempfile::tempdir().expect("tempdir");
        let dir = temp.path().to_path_buf();
        let file = touch(&dir, "2024_01_01_000000_a.sql");

        let files = discover(&[dir, file], "sql", DuplicatePolicy::Reject).expect("discover");
        assert_eq!(names(&files), vec!["2024_01_01_000000_a"]);
    }
}
