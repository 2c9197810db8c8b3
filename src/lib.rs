//! Transcript Recorder - capture live captions from desktop applications via
//! their accessibility trees.
//!
//! Meeting and chat applications (Zoom, Teams, WebEx, Slack, browser tabs)
//! render live captions into their UI but offer no API for them. This crate
//! finds the caption container in the application's accessibility tree using
//! declarative, per-application search paths, repeatedly extracts its text
//! into timestamped snapshot files, and stitches those overlapping snapshots
//! into one deduplicated transcript.
//!
//! # Quick Start
//!
//! ```
//! use transcript_recorder::ax::memory::{MemoryHost, MemoryNode};
//! use transcript_recorder::config::{AppConfig, Criteria, SearchPath, Step};
//! use transcript_recorder::TranscriptRecorder;
//!
//! let captions = MemoryNode::new("AXGroup")
//!     .with_description("Captions")
//!     .with_child(MemoryNode::new("AXStaticText").with_value("Hello everyone"));
//! let app = MemoryNode::new("AXApplication").with_child(captions);
//! let host = MemoryHost::new().with_application(42, app);
//!
//! let dir = std::env::temp_dir().join("transcript-recorder-doc");
//! let mut config = AppConfig::new("demo", &dir);
//! config.app_names = vec!["demo".into()];
//! config.rules_to_find_transcript_table = vec![SearchPath::new(
//!     "captions group",
//!     vec![Step::new(
//!         Criteria { description_contains: Some("caption".into()), ..Criteria::default() },
//!         3,
//!     )],
//! )];
//!
//! let pids = |_: &[String], _: &[String]| vec![42];
//! let mut recorder = TranscriptRecorder::new(config, host, pids).unwrap();
//! let outcome = recorder.export_transcript_text(None).unwrap();
//! assert_eq!(outcome.snapshot().unwrap().text_element_count, 1);
//! # std::fs::remove_dir_all(&dir).ok();
//! ```
//!
//! # Modules
//!
//! - [`ax`]: read-only node/host traits, attribute vocabulary, in-memory tree
//! - [`config`]: per-application configuration and the search-path model
//! - [`search`]: criteria matching, bounded tree search, search-path resolution
//! - [`collect`]: text collection (BFS, DFS, incremental) and tree dumps
//! - [`merge`]: diff-based snapshot merging
//! - [`process`]: candidate process discovery
//! - [`recorder`]: the [`TranscriptRecorder`] orchestrator
//! - [`types`]: errors and result records
//! - [`platform`]: native hosts (macOS only)

pub mod ax;
pub mod collect;
pub mod config;
pub mod merge;
pub mod platform;
pub mod process;
pub mod recorder;
pub mod search;
pub mod types;

pub use ax::{describe, AttrValue, Attribute, AxHost, AxNode};
pub use config::{load_app_config, AppConfig, Criteria, SearchPath, SearchScope, Step, TraversalMode};
pub use merge::{merge_lines, MergeResult, DEFAULT_MIN_MATCH_LENGTH};
pub use process::{ProcessLister, SysinfoProcessLister};
pub use recorder::TranscriptRecorder;
pub use types::{
    ConfigError, ExportOutcome, MergeOutcome, NotFound, RecorderError, RecorderState, SnapshotRecord,
};
