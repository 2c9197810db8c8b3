//! Per-application transcript recorder.
//!
//! A [`TranscriptRecorder`] owns one application's configuration, finds the
//! transcript element once, and turns every later export into a timestamped
//! snapshot file. Snapshots are tracked in memory so they can be written out
//! as an index or folded into one merged transcript.
//!
//! ```text
//! Uninitialized ──find──▶ ElementFound ⇄ Exporting
//!                              │
//!                   empty text / lost element
//!                              ▼
//!                         ElementLost ──find──▶ ElementFound
//! ```
//!
//! Calls must not overlap: the recorder takes `&mut self` for every
//! operation that touches the cached element or the row offset.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use regex_lite::Regex;

use crate::ax::{describe, AxHost};
use crate::collect::{serialize_tree, Collector, Traversal};
use crate::config::AppConfig;
use crate::merge::{merge_transcript_files, write_transcript_lines};
use crate::process::{ProcessLister, SysinfoProcessLister};
use crate::search::resolve;
use crate::types::{ExportOutcome, MergeOutcome, NotFound, RecorderError, RecorderState, SnapshotRecord};

pub const DEFAULT_INDEX_FILENAME: &str = "snapshots_index.json";
pub const DEFAULT_MERGED_FILENAME: &str = "transcript_merged.txt";

/// Subdirectory of the base directory receiving tree dumps.
pub const JSON_DUMP_DIR: &str = "json";

pub struct TranscriptRecorder<H: AxHost, P: ProcessLister = SysinfoProcessLister> {
    config: AppConfig,
    exclude: Option<Regex>,
    base_dir: PathBuf,
    host: H,
    processes: P,
    transcript_element: Option<H::Node>,
    export_row_offset: usize,
    snapshots: Vec<SnapshotRecord>,
    state: RecorderState,
}

impl<H: AxHost, P: ProcessLister> TranscriptRecorder<H, P> {
    /// Create a recorder.
    ///
    /// # Errors
    ///
    /// Returns `RecorderError::Config` if the configuration is invalid (empty
    /// base directory, bad `exclude_pattern`). Nothing is searched and no
    /// directory is created yet.
    pub fn new(config: AppConfig, host: H, processes: P) -> Result<Self, RecorderError> {
        config.validate()?;
        let exclude = config.exclude_regex()?;
        let base_dir = config.transcript_base_dir();

        log::info!(
            "[AX-RECORDER] Recorder for '{}' writing to {}",
            config.name,
            base_dir.display()
        );

        Ok(Self {
            config,
            exclude,
            base_dir,
            host,
            processes,
            transcript_element: None,
            export_row_offset: 0,
            snapshots: Vec::new(),
            state: RecorderState::Uninitialized,
        })
    }

    /// Search for the transcript element and cache it.
    ///
    /// Any cached element is dropped first. On failure the reason is returned
    /// and the recorder moves to `ElementLost` if it had found an element
    /// before, `Uninitialized` otherwise.
    pub fn find_transcript_element(&mut self) -> Result<(), NotFound> {
        self.transcript_element = None;

        match self.locate() {
            Ok(element) => {
                log::info!(
                    "[AX-RECORDER] ✅ Transcript element for '{}': {}",
                    self.config.name,
                    describe(&element)
                );
                self.transcript_element = Some(element);
                self.state = RecorderState::ElementFound;
                Ok(())
            }
            Err(reason) => {
                log::warn!(
                    "[AX-RECORDER] Transcript element for '{}' not found: {}",
                    self.config.name,
                    reason
                );
                self.state = match self.state {
                    RecorderState::Uninitialized => RecorderState::Uninitialized,
                    _ => RecorderState::ElementLost,
                };
                Err(reason)
            }
        }
    }

    fn locate(&self) -> Result<H::Node, NotFound> {
        if !self.host.is_trusted() {
            return Err(NotFound::PermissionDenied);
        }
        let paths = &self.config.rules_to_find_transcript_table;
        if paths.is_empty() {
            return Err(NotFound::NoSearchPaths);
        }

        let pids = self
            .processes
            .list_candidate_pids(&self.config.command_paths, &self.config.app_names);
        let roots: Vec<H::Node> = pids
            .iter()
            .filter_map(|&pid| {
                let root = self.host.application(pid);
                if root.is_none() {
                    log::debug!("[AX-RECORDER] No accessibility root for pid {}", pid);
                }
                root
            })
            .collect();
        if roots.is_empty() {
            return Err(NotFound::NoProcesses);
        }
        log::debug!(
            "[AX-RECORDER] Searching {} process root(s) with {} path(s)",
            roots.len(),
            paths.len()
        );

        resolve(&roots, paths, &self.config.traversal_roles_to_skip).ok_or(NotFound::NoPathMatched)
    }

    /// Collect the transcript text and write it as a new snapshot.
    ///
    /// `filename` overrides the default `transcript_<slug>_<timestamp>.txt`
    /// name; `.txt` is appended when it has no extension. An existing file is
    /// never overwritten; a numeric suffix is added instead.
    ///
    /// The row offset only advances once the snapshot is on disk, so a failed
    /// write is re-read by the next incremental call. A failed tree dump is
    /// logged and the snapshot is still recorded.
    ///
    /// "Nothing to capture" is `Ok(ExportOutcome::NotFound(..))`. When the
    /// cached element yields no text it is searched for again once, and the
    /// call still reports `NoTextCollected`.
    ///
    /// # Errors
    ///
    /// `InvalidFilename` for a name with path components, and I/O failures
    /// while writing the snapshot.
    pub fn export_transcript_text(&mut self, filename: Option<&str>) -> Result<ExportOutcome, RecorderError> {
        let filename = filename.map(snapshot_name).transpose()?;
        if self.transcript_element.is_none() {
            if let Err(reason) = self.find_transcript_element() {
                return Ok(ExportOutcome::NotFound(reason));
            }
        }
        let Some(element) = self.transcript_element.clone() else {
            return Ok(ExportOutcome::NotFound(NotFound::NoPathMatched));
        };

        self.state = RecorderState::Exporting;
        let traversal = Traversal::select(
            self.config.traversal_mode,
            self.config.incremental_export,
            self.export_row_offset,
        );
        let collected = Collector::from_config(&self.config, self.exclude.as_ref()).collect(&element, traversal);

        if collected.lines.is_empty() {
            if let Some(rows) = collected.table_rows {
                self.export_row_offset = rows;
            }
            log::warn!(
                "[AX-RECORDER] No text collected for '{}', searching for the element again",
                self.config.name
            );
            self.state = RecorderState::ElementLost;
            // The outcome is the same either way; a found element is used next call.
            let _ = self.find_transcript_element();
            return Ok(ExportOutcome::NotFound(NotFound::NoTextCollected));
        }
        self.state = RecorderState::ElementFound;

        let now = Local::now();
        let result = self.write_snapshot(&element, &collected.lines, filename.as_deref(), &now);
        let record = result.map_err(|e| {
            log::error!("[AX-RECORDER] Failed to write snapshot: {}", e);
            e
        })?;
        if let Some(rows) = collected.table_rows {
            self.export_row_offset = rows;
        }

        log::info!(
            "[AX-RECORDER] 📄 Exported {} line(s) to {}",
            record.text_element_count,
            record.file_path
        );
        self.snapshots.push(record.clone());
        Ok(ExportOutcome::Exported(record))
    }

    fn write_snapshot(
        &self,
        element: &H::Node,
        lines: &[String],
        filename: Option<&str>,
        now: &DateTime<Local>,
    ) -> Result<SnapshotRecord, RecorderError> {
        fs::create_dir_all(&self.base_dir).map_err(|e| RecorderError::io(&self.base_dir, e))?;

        let name = match filename {
            Some(name) => name.to_string(),
            None => snapshot_filename(&self.config.slug(), now),
        };
        let path = unique_path(&self.base_dir.join(name));
        write_transcript_lines(&path, lines)?;

        if self.config.serialization_save_json {
            if let Err(e) = self.write_tree_dump(element, &path) {
                log::error!("[AX-RECORDER] Failed to write tree dump for {}: {}", path.display(), e);
            }
        }

        Ok(SnapshotRecord {
            file_path: path.to_string_lossy().into_owned(),
            timestamp: now.to_rfc3339(),
            text_element_count: lines.len(),
        })
    }

    fn write_tree_dump(&self, element: &H::Node, snapshot: &Path) -> Result<(), RecorderError> {
        let dir = self.base_dir.join(JSON_DUMP_DIR);
        fs::create_dir_all(&dir).map_err(|e| RecorderError::io(&dir, e))?;

        let stem = snapshot
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "transcript".to_string());
        let path = dir.join(format!("{}.json", stem));

        let dump = serialize_tree(element, self.config.export_depth(), &self.config.traversal_roles_to_skip);
        let json = serde_json::to_string_pretty(&dump)?;
        fs::write(&path, json).map_err(|e| RecorderError::io(&path, e))?;
        log::debug!("[AX-RECORDER] Tree dump written to {}", path.display());
        Ok(())
    }

    /// Write the snapshot list as a JSON array into the base directory.
    ///
    /// An empty list is written as `[]`.
    pub fn export_snapshots_index(&self, filename: Option<&str>) -> Result<PathBuf, RecorderError> {
        fs::create_dir_all(&self.base_dir).map_err(|e| RecorderError::io(&self.base_dir, e))?;
        let path = self.base_dir.join(plain_name(filename.unwrap_or(DEFAULT_INDEX_FILENAME))?);
        let json = serde_json::to_string_pretty(&self.snapshots)?;
        fs::write(&path, json).map_err(|e| RecorderError::io(&path, e))?;
        log::info!(
            "[AX-RECORDER] Snapshot index ({} entries) written to {}",
            self.snapshots.len(),
            path.display()
        );
        Ok(path)
    }

    /// Forget recorded snapshots. Files on disk are left alone.
    pub fn clear_snapshots_list(&mut self) {
        self.snapshots.clear();
    }

    /// Fold every recorded snapshot, oldest first, into one transcript file.
    pub fn merge_snapshots(
        &self,
        output_filename: Option<&str>,
        min_match_length: usize,
    ) -> Result<MergeOutcome, RecorderError> {
        match self.snapshots.as_slice() {
            [] => {
                log::info!("[AX-RECORDER] No snapshots to merge");
                Ok(MergeOutcome::NoSnapshots)
            }
            [only] => Ok(MergeOutcome::Single(PathBuf::from(&only.file_path))),
            all => {
                let paths: Vec<PathBuf> = all.iter().map(|s| PathBuf::from(&s.file_path)).collect();
                let output = self
                    .base_dir
                    .join(plain_name(output_filename.unwrap_or(DEFAULT_MERGED_FILENAME))?);
                let overlap_count = merge_transcript_files(&paths, &output, min_match_length)?
                    .map(|m| m.overlap_count)
                    .unwrap_or(0);
                Ok(MergeOutcome::Merged {
                    path: output,
                    snapshot_count: paths.len(),
                    overlap_count,
                })
            }
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn snapshots(&self) -> &[SnapshotRecord] {
        &self.snapshots
    }

    pub fn transcript_element(&self) -> Option<&H::Node> {
        self.transcript_element.as_ref()
    }

    pub fn transcript_base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Root-table row count seen by the last incremental export.
    pub fn export_row_offset(&self) -> usize {
        self.export_row_offset
    }

    pub fn state(&self) -> RecorderState {
        self.state
    }
}

#[cfg(target_os = "macos")]
impl TranscriptRecorder<crate::platform::macos::MacAxHost, SysinfoProcessLister> {
    /// Recorder over the native accessibility API and the live process table.
    pub fn for_macos(config: AppConfig) -> Result<Self, RecorderError> {
        Self::new(config, crate::platform::macos::MacAxHost::new(), SysinfoProcessLister::new())
    }
}

/// `transcript_<slug>_<YYYYMMDD_HHMMSS>.txt`
pub fn snapshot_filename(slug: &str, now: &DateTime<Local>) -> String {
    format!("transcript_{}_{}.txt", slug, now.format("%Y%m%d_%H%M%S"))
}

/// `name` if it is a single path component, otherwise `InvalidFilename`.
fn plain_name(name: &str) -> Result<&str, RecorderError> {
    let single = Path::new(name).file_name().and_then(|n| n.to_str()) == Some(name);
    if !single || name.chars().any(std::path::is_separator) {
        return Err(RecorderError::InvalidFilename(name.to_string()));
    }
    Ok(name)
}

/// A caller-chosen snapshot name, with `.txt` added when it has no extension.
fn snapshot_name(name: &str) -> Result<String, RecorderError> {
    let name = plain_name(name)?;
    if Path::new(name).extension().is_some() {
        Ok(name.to_string())
    } else {
        Ok(format!("{}.txt", name))
    }
}

/// First of `path`, `stem_1.ext`, `stem_2.ext`, ... that doesn't exist.
fn unique_path(path: &Path) -> PathBuf {
    if !path.exists() {
        return path.to_path_buf();
    }
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let ext = path.extension().map(|e| e.to_string_lossy().into_owned());

    (1..)
        .map(|n| {
            let name = match &ext {
                Some(ext) => format!("{}_{}.{}", stem, n, ext),
                None => format!("{}_{}", stem, n),
            };
            path.with_file_name(name)
        })
        .find(|candidate| !candidate.exists())
        .unwrap_or_else(|| path.to_path_buf())
}
