//! Recursive file discovery following the study's naming conventions

use crate::io::configuration::{FUNCTIONAL_DIR, SUBJECT_ID_LENGTH};
use crate::io::error::{AnalysisError, Result, invalid_parameter};
use globset::{GlobBuilder, GlobMatcher};
use ignore::WalkBuilder;
use std::path::{Path, PathBuf};

/// Shell glob matched against paths relative to the search root
///
/// `*` stops at path separators and `**/` spans any number of directories,
/// e.g. `**/func/*resting_*mask.nii`. Hidden files never match.
#[derive(Debug, Clone)]
pub struct FilePattern {
    matcher: GlobMatcher,
}

impl FilePattern {
    /// Compile a glob pattern
    ///
    /// # Errors
    ///
    /// Returns an error if `glob` is not a valid pattern
    pub fn new(glob: &str) -> Result<Self> {
        let matcher = GlobBuilder::new(glob)
            .literal_separator(true)
            .build()
            .map_err(|e| invalid_parameter("pattern", &glob, &e))?
            .compile_matcher();
        Ok(Self { matcher })
    }

    /// fMRIPrep brain masks of `task`: `**/func/*{task}_*mask.nii`
    ///
    /// # Errors
    ///
    /// Returns an error if the task name breaks the pattern
    pub fn brain_masks(task: &str) -> Result<Self> {
        let task = globset::escape(task);
        Self::new(&format!("**/{FUNCTIONAL_DIR}/*{task}_*mask.nii"))
    }

    /// Denoised scans of `task` with `strategy`: `**/*{task}_*{strategy}.nii`
    ///
    /// # Errors
    ///
    /// Returns an error if the task or strategy name breaks the pattern
    pub fn denoised_scans(task: &str, strategy: &str) -> Result<Self> {
        let task = globset::escape(task);
        let strategy = globset::escape(strategy);
        Self::new(&format!("**/*{task}_*{strategy}.nii"))
    }

    /// The glob this pattern was compiled from
    pub fn as_str(&self) -> &str {
        self.matcher.glob().glob()
    }

    /// Check whether `path` matches the pattern
    pub fn matches(&self, path: &Path) -> bool {
        let hidden = path
            .file_name()
            .and_then(|n| n.to_str())
            .is_none_or(|n| n.starts_with('.'));
        !hidden && self.matcher.is_match(path)
    }
}

/// Collect every file below `root` matching `pattern`, sorted by path
///
/// Hidden files and directories are skipped, ignore files are not consulted.
///
/// # Errors
///
/// Returns an error if `root` or one of its subdirectories cannot be read
pub fn find_files(root: &Path, pattern: &FilePattern) -> Result<Vec<PathBuf>> {
    if !root.is_dir() {
        return Err(AnalysisError::FileSystem {
            path: root.to_path_buf(),
            operation: "list directory",
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "not a directory"),
        });
    }

    let walker = WalkBuilder::new(root)
        .standard_filters(false)
        .hidden(true)
        .follow_links(true)
        .build();

    let mut files = Vec::new();
    for entry in walker {
        let entry = entry.map_err(|e| {
            let message = e.to_string();
            AnalysisError::FileSystem {
                path: root.to_path_buf(),
                operation: "list directory",
                source: e.into_io_error().unwrap_or_else(|| std::io::Error::other(message)),
            }
        })?;

        if !entry.file_type().is_some_and(|t| t.is_file()) {
            continue;
        }
        let relative = entry.path().strip_prefix(root).unwrap_or(entry.path());
        if pattern.matches(relative) {
            files.push(entry.into_path());
        }
    }

    files.sort();
    tracing::debug!(
        "Found {} files matching {} under {}",
        files.len(),
        pattern.as_str(),
        root.display()
    );
    Ok(files)
}

/// Create the parent directory of an output file if it does not exist yet
///
/// # Errors
///
/// Returns an error if the directory cannot be created
pub fn create_parent_dir(path: &Path) -> Result<()> {
    match path.parent().filter(|p| !p.as_os_str().is_empty()) {
        Some(parent) => std::fs::create_dir_all(parent).map_err(|e| AnalysisError::FileSystem {
            path: parent.to_path_buf(),
            operation: "create directory",
            source: e,
        }),
        None => Ok(()),
    }
}

/// Subject identifier encoded in the first characters of a file name
pub fn subject_id(path: &Path) -> Option<&str> {
    path.file_name()
        .and_then(|n| n.to_str())
        .and_then(|n| n.get(..SUBJECT_ID_LENGTH))
}
