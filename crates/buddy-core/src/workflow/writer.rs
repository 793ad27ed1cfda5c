//! File-writing collaborator for the Code stage

use crate::error::{BuddyError, BuddyResult};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Component, Path, PathBuf};
use tokio::fs;
use tracing::debug;

const PREVIEW_CHARS: usize = 200;

/// Side-effecting sink for generated files
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait FileWriter: Send + Sync {
    /// Make sure the output location exists before a run starts
    async fn prepare(&self) -> BuddyResult<()>;

    /// Write `content` to the relative `path`, returning where it landed
    async fn write(&self, path: &Path, content: &str) -> BuddyResult<PathBuf>;
}

/// File under the output root, as listed for dashboards
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedFile {
    /// Path relative to the output root, `/`-separated
    pub path: String,
    pub size: u64,
    pub modified: Option<DateTime<Utc>>,
    pub preview: String,
}

/// Writes generated projects under a fixed root directory
#[derive(Debug, Clone)]
pub struct ProjectFileWriter {
    root: PathBuf,
}

impl ProjectFileWriter {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a relative path under the root, rejecting escapes
    pub fn resolve(&self, path: &Path) -> BuddyResult<PathBuf> {
        if path.as_os_str().is_empty() {
            return Err(BuddyError::invalid_field("path", "empty file path"));
        }
        for component in path.components() {
            match component {
                Component::Normal(_) | Component::CurDir => {}
                Component::ParentDir => {
                    return Err(BuddyError::invalid_field(
                        "path",
                        format!("'{}' escapes the output directory", path.display()),
                    ));
                }
                Component::RootDir | Component::Prefix(_) => {
                    return Err(BuddyError::invalid_field(
                        "path",
                        format!("'{}' is absolute", path.display()),
                    ));
                }
            }
        }
        Ok(self.root.join(path))
    }

    /// Full text of a previously generated file
    pub async fn read(&self, path: &Path) -> BuddyResult<String> {
        let target = self.resolve(path)?;
        match fs::read(&target).await {
            Ok(bytes) => Ok(String::from_utf8_lossy(&bytes).into_owned()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(BuddyError::not_found("file", path.display()))
            }
            Err(e) => Err(BuddyError::io_with_path(
                format!("Failed to read file: {}", e),
                target.display().to_string(),
            )),
        }
    }

    /// Every file under the root with a short preview, sorted by path
    pub async fn list_generated(&self) -> BuddyResult<Vec<GeneratedFile>> {
        let mut files = Vec::new();
        if !fs::try_exists(&self.root).await.unwrap_or(false) {
            return Ok(files);
        }

        let mut pending = vec![self.root.clone()];
        while let Some(dir) = pending.pop() {
            let mut entries = fs::read_dir(&dir).await?;
            while let Some(entry) = entries.next_entry().await? {
                let file_type = entry.file_type().await?;
                let path = entry.path();
                if file_type.is_dir() {
                    pending.push(path);
                    continue;
                }
                if !file_type.is_file() {
                    continue;
                }

                let metadata = entry.metadata().await?;
                let preview = match fs::read(&path).await {
                    Ok(bytes) => String::from_utf8_lossy(&bytes)
                        .chars()
                        .take(PREVIEW_CHARS)
                        .collect(),
                    Err(_) => String::new(),
                };
                let relative = path
                    .strip_prefix(&self.root)
                    .unwrap_or(&path)
                    .components()
                    .map(|c| c.as_os_str().to_string_lossy().into_owned())
                    .collect::<Vec<_>>()
                    .join("/");

                files.push(GeneratedFile {
                    path: relative,
                    size: metadata.len(),
                    modified: metadata.modified().ok().map(DateTime::<Utc>::from),
                    preview,
                });
            }
        }

        files.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(files)
    }
}

#[async_trait]
impl FileWriter for ProjectFileWriter {
    async fn prepare(&self) -> BuddyResult<()> {
        fs::create_dir_all(&self.root).await.map_err(|e| {
            BuddyError::io_with_path(
                format!("Failed to create output directory: {}", e),
                self.root.display().to_string(),
            )
        })
    }

    async fn write(&self, path: &Path, content: &str) -> BuddyResult<PathBuf> {
        let target = self.resolve(path)?;
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).await.map_err(|e| {
                BuddyError::io_with_path(
                    format!("Failed to create directory: {}", e),
                    parent.display().to_string(),
                )
            })?;
        }
        fs::write(&target, content).await.map_err(|e| {
            BuddyError::io_with_path(
                format!("Failed to write file: {}", e),
                target.display().to_string(),
            )
        })?;
        debug!("Wrote {} ({} bytes)", target.display(), content.len());
        Ok(target)
    }
}
