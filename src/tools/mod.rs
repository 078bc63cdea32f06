use crate::config::SearchConfig;
use crate::error::ActionError;
use crate::intent::{Extension, Intent};
use serde::Serialize;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Upper bound on `name_N.ext` candidates tried before giving up on a file.
const MAX_RENAME_SUFFIX: u32 = 10_000;

/// A file that matched a search
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileMatch {
    pub path: PathBuf,
    pub extension: String,
    pub size: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MovedFile {
    pub from: PathBuf,
    pub to: PathBuf,
    /// True when the original name was taken and a suffix was added.
    pub renamed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedFile {
    pub path: PathBuf,
    pub error: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ActionKind {
    FindFiles,
    OrganizeFiles,
    Unknown,
}

/// Outcome of executing one intent. `Display` renders the message shown to the user.
#[derive(Debug, Clone, Serialize)]
pub struct ActionResult {
    pub kind: ActionKind,
    pub extension: Option<Extension>,
    pub source: Option<PathBuf>,
    pub matches: Vec<FileMatch>,
    pub moved: Vec<MovedFile>,
    pub failed: Vec<FailedFile>,
    pub destination: Option<PathBuf>,
    pub truncated: bool,
    pub success: bool,
    pub error: Option<String>,
}

impl ActionResult {
    fn new(kind: ActionKind, extension: Option<&Extension>, source: Option<&Path>) -> Self {
        Self {
            kind,
            extension: extension.cloned(),
            source: source.map(Path::to_path_buf),
            matches: Vec::new(),
            moved: Vec::new(),
            failed: Vec::new(),
            destination: None,
            truncated: false,
            success: true,
            error: None,
        }
    }

    pub fn not_understood(reason: impl Into<String>) -> Self {
        let mut result = Self::new(ActionKind::Unknown, None, None);
        result.success = false;
        result.error = Some(reason.into());
        result
    }

    fn failure(mut self, error: ActionError) -> Self {
        self.success = false;
        self.error = Some(error.to_string());
        self
    }
}

impl fmt::Display for ActionResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ext = self
            .extension
            .as_ref()
            .map(|e| e.to_string())
            .unwrap_or_default();
        let source = self
            .source
            .as_ref()
            .map(|s| s.display().to_string())
            .unwrap_or_default();

        if self.kind == ActionKind::Unknown {
            return write!(
                f,
                "🤔 Sorry, I didn't understand that: {}",
                self.error.as_deref().unwrap_or("unrecognized command")
            );
        }
        if let Some(error) = self.error.as_deref() {
            return write!(f, "❌ {}", error);
        }

        match self.kind {
            ActionKind::FindFiles => {
                if self.matches.is_empty() {
                    return write!(f, "No {} files found in {}.", ext, source);
                }
                write!(f, "🔍 Found {} {} file(s) in {}:", self.matches.len(), ext, source)?;
                for m in &self.matches {
                    match m.size {
                        Some(size) => write!(f, "\n  - {} ({} bytes)", m.path.display(), size)?,
                        None => write!(f, "\n  - {}", m.path.display())?,
                    }
                }
                if self.truncated {
                    write!(f, "\n(stopped after {} results)", self.matches.len())?;
                }
                Ok(())
            }
            ActionKind::OrganizeFiles => {
                let Some(destination) = self.destination.as_ref() else {
                    return write!(f, "No {} files to move in {}.", ext, source);
                };
                write!(
                    f,
                    "📦 Moved {} of {} {} file(s) to {}",
                    self.moved.len(),
                    self.matches.len(),
                    ext,
                    destination.display()
                )?;
                for moved in &self.moved {
                    let from = display_name(&moved.from);
                    if moved.renamed {
                        write!(f, "\n  - {} → {} (name was taken)", from, display_name(&moved.to))?;
                    } else {
                        write!(f, "\n  - {}", from)?;
                    }
                }
                if !self.failed.is_empty() {
                    write!(f, "\n⚠️ Failed to move {} file(s):", self.failed.len())?;
                    for failed in &self.failed {
                        write!(f, "\n  - {}: {}", failed.path.display(), failed.error)?;
                    }
                }
                Ok(())
            }
            ActionKind::Unknown => Ok(()),
        }
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Executes validated intents against the local filesystem
pub struct FileActionExecutor {
    base_dir: PathBuf,
    recursive: bool,
    max_results: usize,
}

impl FileActionExecutor {
    pub fn new(base_dir: PathBuf, search: &SearchConfig) -> Self {
        Self {
            base_dir,
            recursive: search.recursive,
            max_results: search.max_results,
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Never fails; errors end up inside the returned result.
    pub fn execute(&self, intent: &Intent) -> ActionResult {
        match intent {
            Intent::FindFiles {
                extension,
                source_directory,
            } => {
                let source = self.resolve_source(source_directory.as_deref());
                let result = ActionResult::new(ActionKind::FindFiles, Some(extension), Some(source.as_path()));
                match self.find_files(extension, &source) {
                    Ok((matches, truncated)) => ActionResult {
                        matches,
                        truncated,
                        ..result
                    },
                    Err(e) => {
                        log::warn!("find {} in {} failed: {}", extension, source.display(), e);
                        result.failure(e)
                    }
                }
            }
            Intent::OrganizeFiles {
                extension,
                source_directory,
                destination_folder,
            } => {
                let source = self.resolve_source(source_directory.as_deref());
                match self.organize_files(extension, &source, destination_folder) {
                    Ok(result) => result,
                    Err(e) => {
                        log::warn!("organize {} in {} failed: {}", extension, source.display(), e);
                        ActionResult::new(ActionKind::OrganizeFiles, Some(extension), Some(source.as_path()))
                            .failure(e)
                    }
                }
            }
            Intent::Unknown { reason } => ActionResult::not_understood(reason.clone()),
        }
    }

    /// Resolve a user-supplied directory: `~` is the home directory, relative
    /// paths hang off the base directory, `None` is the base directory itself.
    pub fn resolve_source(&self, dir: Option<&Path>) -> PathBuf {
        let Some(dir) = dir else {
            return self.base_dir.clone();
        };

        if let Ok(rest) = dir.strip_prefix("~") {
            if let Some(home) = dirs::home_dir() {
                return home.join(rest);
            }
        }

        if dir.is_absolute() {
            dir.to_path_buf()
        } else {
            self.base_dir.join(dir)
        }
    }

    /// Read-only search. Returns the matches and whether the result cap was hit.
    pub fn find_files(
        &self,
        extension: &Extension,
        source: &Path,
    ) -> Result<(Vec<FileMatch>, bool), ActionError> {
        let root = open_source_dir(source)?;
        log::info!("searching for {} files in {}", extension, root.display());
        self.collect_matches(&root, extension, Some(self.max_results), None)
    }

    /// Move every match into `source/destination_folder`, creating it if needed.
    pub fn organize_files(
        &self,
        extension: &Extension,
        source: &Path,
        destination_folder: &str,
    ) -> Result<ActionResult, ActionError> {
        let root = open_source_dir(source)?;
        let destination = root.join(destination_folder);
        let mut result = ActionResult::new(ActionKind::OrganizeFiles, Some(extension), Some(root.as_path()));

        // Files already in the destination are where they belong.
        let (matches, _) = self.collect_matches(&root, extension, None, Some(&destination))?;
        if matches.is_empty() {
            return Ok(result);
        }

        ensure_directory(&destination)?;
        log::info!(
            "moving {} {} file(s) into {}",
            matches.len(),
            extension,
            destination.display()
        );

        move_matches(&mut result, matches, destination);
        Ok(result)
    }

    fn collect_matches(
        &self,
        root: &Path,
        extension: &Extension,
        limit: Option<usize>,
        exclude: Option<&Path>,
    ) -> Result<(Vec<FileMatch>, bool), ActionError> {
        let walker = WalkDir::new(root)
            .follow_links(false)
            .sort_by_file_name()
            .max_depth(if self.recursive { usize::MAX } else { 1 })
            .into_iter()
            .filter_entry(|entry| exclude.map_or(true, |excluded| entry.path() != excluded));

        let mut matches = Vec::new();
        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) if e.depth() == 0 => {
                    let io_error = e
                        .into_io_error()
                        .unwrap_or_else(|| io::Error::new(io::ErrorKind::Other, "filesystem loop"));
                    return Err(ActionError::from_io(root, io_error));
                }
                Err(e) => {
                    log::warn!("skipping unreadable entry: {}", e);
                    continue;
                }
            };

            if !entry.file_type().is_file() || !extension.matches(entry.path()) {
                continue;
            }

            if limit.is_some_and(|limit| matches.len() >= limit) {
                log::info!("result limit of {} reached, stopping search", matches.len());
                return Ok((matches, true));
            }

            let path = entry.path().to_path_buf();
            matches.push(FileMatch {
                extension: path
                    .extension()
                    .map(|e| e.to_string_lossy().into_owned())
                    .unwrap_or_default(),
                size: entry.metadata().ok().map(|m| m.len()),
                path,
            });
        }

        Ok((matches, false))
    }
}

/// Check the source exists and is a directory; returns its absolute form.
fn open_source_dir(source: &Path) -> Result<PathBuf, ActionError> {
    let metadata = fs::metadata(source).map_err(|e| ActionError::from_io(source, e))?;
    if !metadata.is_dir() {
        return Err(ActionError::NotADirectory(source.to_path_buf()));
    }
    fs::canonicalize(source).map_err(|e| ActionError::from_io(source, e))
}

/// Idempotent: an existing directory is fine, an existing file is not.
fn ensure_directory(path: &Path) -> Result<(), ActionError> {
    match fs::metadata(path) {
        Ok(metadata) if metadata.is_dir() => Ok(()),
        Ok(_) => Err(ActionError::NotADirectory(path.to_path_buf())),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            fs::create_dir_all(path).map_err(|e| ActionError::from_io(path, e))?;
            log::info!("created directory {}", path.display());
            Ok(())
        }
        Err(e) => Err(ActionError::from_io(path, e)),
    }
}

/// Move each match on its own; one failure never stops the rest of the batch.
fn move_matches(result: &mut ActionResult, matches: Vec<FileMatch>, destination: PathBuf) {
    for file in &matches {
        match move_into(&file.path, &destination) {
            Ok(moved) => {
                log::debug!("moved {} -> {}", moved.from.display(), moved.to.display());
                result.moved.push(moved);
            }
            Err(e) => {
                log::warn!("could not move {}: {}", file.path.display(), e);
                result.failed.push(FailedFile {
                    path: file.path.clone(),
                    error: e.to_string(),
                });
            }
        }
    }

    result.success = result.failed.is_empty();
    result.destination = Some(destination);
    result.matches = matches;
}

fn move_into(file: &Path, destination: &Path) -> Result<MovedFile, ActionError> {
    let name = file
        .file_name()
        .ok_or_else(|| ActionError::PathNotFound(file.to_path_buf()))?;
    let (target, renamed) = free_target(destination, Path::new(name))?;
    move_file(file, &target)?;

    Ok(MovedFile {
        from: file.to_path_buf(),
        to: target,
        renamed,
    })
}

/// First unused name in `destination`: `name.ext`, then `name_1.ext`, `name_2.ext`, ...
fn free_target(destination: &Path, name: &Path) -> Result<(PathBuf, bool), ActionError> {
    let candidate = destination.join(name);
    if !occupied(&candidate) {
        return Ok((candidate, false));
    }

    // Built from OsStr pieces so names that are not valid UTF-8 keep their bytes.
    let stem = name.file_stem().unwrap_or_default();
    let ext = name.extension();

    for counter in 1..=MAX_RENAME_SUFFIX {
        let mut candidate_name = stem.to_os_string();
        candidate_name.push(format!("_{}", counter));
        if let Some(ext) = ext {
            candidate_name.push(".");
            candidate_name.push(ext);
        }
        let candidate = destination.join(candidate_name);
        if !occupied(&candidate) {
            return Ok((candidate, true));
        }
    }

    Err(ActionError::Collision {
        name: name.to_string_lossy().into_owned(),
        destination: destination.to_path_buf(),
    })
}

fn occupied(path: &Path) -> bool {
    // symlink_metadata so a dangling symlink still counts as taken
    fs::symlink_metadata(path).is_ok()
}

/// `rename`, falling back to copy + remove when the rename itself cannot work
/// (for example across filesystems).
fn move_file(from: &Path, to: &Path) -> Result<(), ActionError> {
    match fs::rename(from, to) {
        Ok(()) => Ok(()),
        Err(e) if matches!(e.kind(), io::ErrorKind::NotFound | io::ErrorKind::PermissionDenied) => {
            Err(ActionError::from_io(from, e))
        }
        Err(rename_error) => {
            log::debug!(
                "rename {} failed ({}), copying instead",
                from.display(),
                rename_error
            );
            fs::copy(from, to).map_err(|e| ActionError::from_io(from, e))?;
            if let Err(e) = fs::remove_file(from) {
                let _ = fs::remove_file(to);
                return Err(ActionError::from_io(from, e));
            }
            Ok(())
        }
    }
}
