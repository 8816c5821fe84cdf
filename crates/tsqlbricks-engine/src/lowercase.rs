//! Lowercase an already converted tree
//!
//! Content is lowercased in place, then the file is renamed to its
//! lowercase name. Planning and applying are separate so the caller can ask
//! for confirmation in between.

use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::error::BatchError;

/// Files a lowercase run will touch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LowercasePlan {
    pub root: PathBuf,
    pub files: Vec<PathBuf>,
}

/// What happened to one file
#[derive(Debug)]
pub struct LowercaseOutcome {
    pub from: PathBuf,
    pub to: PathBuf,
    pub result: io::Result<()>,
}

impl LowercaseOutcome {
    pub fn renamed(&self) -> bool {
        self.from != self.to
    }
}

impl LowercasePlan {
    /// Collect every file under `root` with the given extension
    pub fn scan(root: &Path, extension: &str) -> Result<Self, BatchError> {
        if !root.is_dir() {
            return Err(BatchError::MissingInput {
                path: root.to_path_buf(),
            });
        }

        let suffix = format!(".{}", extension);
        let mut files = Vec::new();
        for entry in WalkDir::new(root).sort_by_file_name() {
            let entry = entry?;
            if entry.file_type().is_file() && entry.file_name().to_string_lossy().ends_with(&suffix) {
                files.push(entry.into_path());
            }
        }

        Ok(Self {
            root: root.to_path_buf(),
            files,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Planned files grouped by parent directory, for the confirmation listing
    pub fn by_directory(&self) -> BTreeMap<&Path, Vec<&str>> {
        let mut groups: BTreeMap<&Path, Vec<&str>> = BTreeMap::new();
        for file in &self.files {
            let (Some(parent), Some(name)) = (file.parent(), file.file_name().and_then(|n| n.to_str())) else {
                continue;
            };
            groups.entry(parent).or_default().push(name);
        }
        groups
    }

    /// Lowercase every planned file. A failure on one file does not stop
    /// the others.
    pub fn apply(&self) -> Vec<LowercaseOutcome> {
        self.files.iter().map(|file| lowercase_file(file)).collect()
    }
}

fn lowercase_file(path: &Path) -> LowercaseOutcome {
    let to = match path.file_name() {
        Some(name) => path.with_file_name(name.to_string_lossy().to_lowercase()),
        None => path.to_path_buf(),
    };

    let result = std::fs::read_to_string(path)
        .and_then(|content| std::fs::write(path, content.to_lowercase()))
        .and_then(|()| if to != path { std::fs::rename(path, &to) } else { Ok(()) });

    match &result {
        Ok(()) => tracing::debug!(file = %to.display(), "lowercased"),
        Err(err) => tracing::warn!(file = %path.display(), error = %err, "lowercase failed"),
    }

    LowercaseOutcome {
        from: path.to_path_buf(),
        to,
        result,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn plan_groups_by_directory() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("staging")).unwrap();
        fs::write(dir.path().join("Top.sql"), "").unwrap();
        fs::write(dir.path().join("staging").join("A.sql"), "").unwrap();
        fs::write(dir.path().join("staging").join("readme.md"), "").unwrap();

        let plan = LowercasePlan::scan(dir.path(), "sql").unwrap();
        let groups = plan.by_directory();

        assert_eq!(plan.files.len(), 2);
        assert_eq!(groups[dir.path()], vec!["Top.sql"]);
        assert_eq!(groups[dir.path().join("staging").as_path()], vec!["A.sql"]);
    }

    #[test]
    fn apply_lowercases_content_and_name() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("Orders.sql"), "SELECT `Id` FROM T").unwrap();
        fs::write(dir.path().join("plain.sql"), "SELECT 1").unwrap();

        let outcomes = LowercasePlan::scan(dir.path(), "sql").unwrap().apply();

        assert!(outcomes.iter().all(|o| o.result.is_ok()));
        assert_eq!(outcomes.iter().filter(|o| o.renamed()).count(), 1);
        assert_eq!(fs::read_to_string(dir.path().join("orders.sql")).unwrap(), "select `id` from t");
        assert_eq!(fs::read_to_string(dir.path().join("plain.sql")).unwrap(), "select 1");
    }

    #[test]
    fn missing_directory() {
        let dir = TempDir::new().unwrap();
        assert!(LowercasePlan::scan(&dir.path().join("output"), "sql").is_err());
    }
}
