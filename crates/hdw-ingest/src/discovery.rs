//! Locating the raw entity extracts in the input directory.

use std::path::{Path, PathBuf};

use hdw_model::Entity;

use crate::error::{IngestError, Result};

/// Lists all CSV files in a directory, sorted by file name.
pub fn list_csv_files(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(IngestError::DirectoryNotFound {
            path: dir.to_path_buf(),
        });
    }

    let entries = std::fs::read_dir(dir).map_err(|e| IngestError::DirectoryRead {
        path: dir.to_path_buf(),
        source: e,
    })?;

    let mut files = Vec::new();
    for entry_result in entries {
        let entry = entry_result.map_err(|e| IngestError::DirectoryRead {
            path: dir.to_path_buf(),
            source: e,
        })?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let is_csv = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));
        if is_csv {
            files.push(path);
        }
    }

    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(files)
}

/// Raw files matched to entities.
#[derive(Debug, Clone, Default)]
pub struct InputSet {
    pub found: Vec<(Entity, PathBuf)>,
    pub missing: Vec<Entity>,
    /// CSV files that belong to no entity.
    pub unrecognized: Vec<PathBuf>,
}

impl InputSet {
    pub fn path_for(&self, entity: Entity) -> Option<&Path> {
        self.found
            .iter()
            .find(|(candidate, _)| *candidate == entity)
            .map(|(_, path)| path.as_path())
    }
}

/// Matches the CSV files in `dir` to entities by file stem, case-insensitively.
pub fn discover_inputs(dir: &Path) -> Result<InputSet> {
    let files = list_csv_files(dir)?;
    let mut set = InputSet::default();
    let mut claimed = vec![false; files.len()];
    for entity in Entity::ALL {
        let position = files.iter().position(|path| {
            path.file_stem()
                .and_then(|stem| stem.to_str())
                .is_some_and(|stem| stem.eq_ignore_ascii_case(entity.file_stem()))
        });
        match position {
            Some(idx) => {
                claimed[idx] = true;
                set.found.push((entity, files[idx].clone()));
            }
            None => set.missing.push(entity),
        }
    }
    set.unrecognized = files
        .into_iter()
        .zip(claimed)
        .filter(|(_, claimed)| !claimed)
        .map(|(path, _)| path)
        .collect();
    Ok(set)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn create_test_dir(names: &[&str]) -> TempDir {
        let dir = TempDir::new().unwrap();
        for name in names {
            std::fs::write(dir.path().join(name), "header\ndata").unwrap();
        }
        dir
    }

    #[test]
    fn test_list_csv_files_sorted() {
        let dir = create_test_dir(&["visits.csv", "doctors.CSV", "notes.txt"]);
        let files = list_csv_files(dir.path()).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["doctors.CSV", "visits.csv"]);
    }

    #[test]
    fn test_list_csv_files_missing_dir() {
        let result = list_csv_files(Path::new("/nonexistent/raw"));
        assert!(matches!(result, Err(IngestError::DirectoryNotFound { .. })));
    }

    #[test]
    fn test_discover_inputs() {
        let dir = create_test_dir(&["patients.csv", "Visits.csv", "extra.csv"]);
        let set = discover_inputs(dir.path()).unwrap();
        assert!(set.path_for(Entity::Patient).is_some());
        assert!(set.path_for(Entity::Visit).is_some());
        assert_eq!(
            set.missing,
            vec![
                Entity::Doctor,
                Entity::Department,
                Entity::Diagnosis,
                Entity::Date
            ]
        );
        assert_eq!(set.unrecognized.len(), 1);
    }
}
