//! Per-application recorder configuration.
//!
//! Configuration is JSON, in the layout the rule editor produces. Search-path
//! steps carry their match criteria flattened next to `search_scope` and
//! `index`:
//!
//! ```json
//! {
//!   "base_transcript_directory": "~/Transcripts/zoom",
//!   "app_names": ["zoom.us"],
//!   "rules_to_find_transcript_table": [
//!     {"path_name": "Captions window", "steps": [
//!       {"role": "AXWindow", "title_contains": "Meeting", "search_scope": {"levels_deep": 2}},
//!       {"role": "AXTable", "index": 0, "search_scope": {"levels_deep": 5}}
//!     ]}
//!   ],
//!   "serialization_text_element_roles": {"AXStaticText": "AXValue"},
//!   "incremental_export": true
//! }
//! ```
//!
//! Only `base_transcript_directory` is required; every other key has a default.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use regex_lite::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use crate::ax::roles::default_text_element_roles;
use crate::ax::Attribute;
use crate::types::ConfigError;

pub const BASE_DIRECTORY_KEY: &str = "base_transcript_directory";

/// Depth used when a configured depth is zero or negative.
pub const UNBOUNDED_DEPTH: usize = 50;

pub const DEFAULT_EXPORT_DEPTH: i64 = 15;
pub const DEFAULT_MONITOR_INTERVAL_SECONDS: u64 = 30;
pub const DEFAULT_APP_NAME: &str = "UnknownApp";

/// Turn a configured depth into an effective one. Zero and negative values
/// mean "search very deep", not "search nothing".
///
/// ```
/// use transcript_recorder::config::effective_depth;
///
/// assert_eq!(effective_depth(3), 3);
/// assert_eq!(effective_depth(0), 50);
/// assert_eq!(effective_depth(-1), 50);
/// ```
pub fn effective_depth(levels: i64) -> usize {
    if levels > 0 {
        usize::try_from(levels).unwrap_or(UNBOUNDED_DEPTH)
    } else {
        UNBOUNDED_DEPTH
    }
}

/// Match criteria for a single node. Every present key must pass.
///
/// Unknown keys are ignored when deserializing so that newer criteria kinds
/// don't break older builds.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Criteria {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subrole: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title_contains: Option<String>,

    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "optional_string_or_list"
    )]
    pub title_matches_one_of: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description_contains: Option<String>,
}

impl Criteria {
    pub fn role(role: &str) -> Self {
        Criteria {
            role: Some(role.to_string()),
            ..Criteria::default()
        }
    }
}

/// How deep below each candidate node a step searches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchScope {
    #[serde(default = "default_levels_deep")]
    pub levels_deep: i64,
}

impl Default for SearchScope {
    fn default() -> Self {
        Self {
            levels_deep: default_levels_deep(),
        }
    }
}

/// One narrowing step of a search path.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Step {
    #[serde(flatten)]
    pub criteria: Criteria,

    #[serde(default)]
    pub search_scope: SearchScope,

    /// Select a single match (0-based). Out of range fails the whole path.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<usize>,
}

impl Step {
    pub fn new(criteria: Criteria, levels_deep: i64) -> Self {
        Self {
            criteria,
            search_scope: SearchScope { levels_deep },
            index: None,
        }
    }

    pub fn with_index(mut self, index: usize) -> Self {
        self.index = Some(index);
        self
    }
}

/// Ordered chain of steps leading from a process root to the transcript element.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchPath {
    /// Informational only; shows up in logs
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path_name: Option<String>,

    #[serde(default)]
    pub steps: Vec<Step>,
}

impl SearchPath {
    pub fn new(name: &str, steps: Vec<Step>) -> Self {
        Self {
            path_name: Some(name.to_string()),
            steps,
        }
    }

    /// Name for log lines; unnamed paths are numbered from 1.
    pub fn display_name(&self, position: usize) -> String {
        self.path_name
            .clone()
            .unwrap_or_else(|| format!("PathOption-{}", position + 1))
    }
}

/// Order in which the text collector visits nodes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TraversalMode {
    /// Level order
    #[default]
    Bfs,
    /// Pre-order, depth first
    Dfs,
}

impl TraversalMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            TraversalMode::Bfs => "bfs",
            TraversalMode::Dfs => "dfs",
        }
    }
}

impl fmt::Display for TraversalMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for TraversalMode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for TraversalMode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let mode = String::deserialize(deserializer)?;
        match mode.to_ascii_lowercase().as_str() {
            "bfs" => Ok(TraversalMode::Bfs),
            "dfs" => Ok(TraversalMode::Dfs),
            _ => Err(serde::de::Error::custom(format!(
                "unsupported traversal_mode '{}' (expected 'bfs' or 'dfs')",
                mode
            ))),
        }
    }
}

/// Configuration for recording one application.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Application identifier, used in logs and snapshot file names
    #[serde(default = "default_app_name")]
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,

    /// Where snapshots, the index and merged transcripts are written
    pub base_transcript_directory: String,

    /// Executable paths identifying the application's processes
    #[serde(default, deserialize_with = "string_or_list")]
    pub command_paths: Vec<String>,

    /// Case-insensitive process name / command line fragments
    #[serde(default, deserialize_with = "string_or_list")]
    pub app_names: Vec<String>,

    /// Tried in order; the first path that fully succeeds wins
    #[serde(default, alias = "transcript_search_paths")]
    pub rules_to_find_transcript_table: Vec<SearchPath>,

    /// Roles whose subtrees are never descended (except at depth 0)
    #[serde(default)]
    pub traversal_roles_to_skip: BTreeSet<String>,

    /// Role → attribute read as a line of text
    #[serde(default = "default_text_element_roles")]
    pub serialization_text_element_roles: BTreeMap<String, Attribute>,

    #[serde(default = "default_export_depth")]
    pub serialization_export_depth: i64,

    /// Also dump the transcript element's subtree as JSON on every export
    #[serde(default)]
    pub serialization_save_json: bool,

    #[serde(default)]
    pub traversal_mode: TraversalMode,

    #[serde(default)]
    pub incremental_export: bool,

    /// Regular expression removed from every extracted value
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exclude_pattern: Option<String>,

    /// Polling interval used by the CLI recorder loop
    #[serde(default = "default_monitor_interval")]
    pub monitor_interval_seconds: u64,
}

impl AppConfig {
    /// Minimal configuration writing into `base_dir`, with all defaults.
    pub fn new(name: &str, base_dir: impl AsRef<Path>) -> Self {
        AppConfig {
            name: name.to_string(),
            display_name: None,
            base_transcript_directory: base_dir.as_ref().to_string_lossy().into_owned(),
            command_paths: Vec::new(),
            app_names: Vec::new(),
            rules_to_find_transcript_table: Vec::new(),
            traversal_roles_to_skip: BTreeSet::new(),
            serialization_text_element_roles: default_text_element_roles(),
            serialization_export_depth: DEFAULT_EXPORT_DEPTH,
            serialization_save_json: false,
            traversal_mode: TraversalMode::Bfs,
            incremental_export: false,
            exclude_pattern: None,
            monitor_interval_seconds: DEFAULT_MONITOR_INTERVAL_SECONDS,
        }
    }

    /// Parse and validate a configuration object.
    ///
    /// # Errors
    ///
    /// - `ConfigError::MissingKey` if `base_transcript_directory` is absent or null
    /// - `ConfigError::InvalidValue` if it is not a non-empty string, or if
    ///   `exclude_pattern` is not a valid regular expression
    /// - `ConfigError::Json` for any other shape or type mismatch
    pub fn from_json_value(value: Value) -> Result<Self, ConfigError> {
        match value.get(BASE_DIRECTORY_KEY) {
            None | Some(Value::Null) => {
                return Err(ConfigError::MissingKey(BASE_DIRECTORY_KEY.to_string()))
            }
            Some(Value::String(_)) => {}
            Some(other) => {
                return Err(ConfigError::InvalidValue {
                    key: BASE_DIRECTORY_KEY.to_string(),
                    message: format!("expected a string path, got {}", other),
                })
            }
        }

        let config: AppConfig = serde_json::from_value(value)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let value: Value = serde_json::from_str(json)?;
        Self::from_json_value(value)
    }

    /// Check the invariants serde can't express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.base_transcript_directory.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                key: BASE_DIRECTORY_KEY.to_string(),
                message: "path must not be empty".to_string(),
            });
        }
        self.exclude_regex()?;
        Ok(())
    }

    /// Compiled `exclude_pattern`; `None` when unset or empty.
    pub fn exclude_regex(&self) -> Result<Option<Regex>, ConfigError> {
        match self.exclude_pattern.as_deref() {
            None | Some("") => Ok(None),
            Some(pattern) => Regex::new(pattern).map(Some).map_err(|e| {
                ConfigError::InvalidValue {
                    key: "exclude_pattern".to_string(),
                    message: e.to_string(),
                }
            }),
        }
    }

    /// Base directory with a leading `~` expanded.
    pub fn transcript_base_dir(&self) -> PathBuf {
        expand_home(&self.base_transcript_directory)
    }

    pub fn export_depth(&self) -> usize {
        effective_depth(self.serialization_export_depth)
    }

    /// File-name-safe lowercase identifier derived from `name`.
    ///
    /// ```
    /// use transcript_recorder::config::AppConfig;
    ///
    /// let config = AppConfig::new("MS Teams (new)", "/tmp");
    /// assert_eq!(config.slug(), "ms_teams__new_");
    /// ```
    pub fn slug(&self) -> String {
        self.name
            .chars()
            .map(|c| if c.is_alphanumeric() { c } else { '_' })
            .collect::<String>()
            .to_lowercase()
    }
}

/// Load one application's configuration from a file mapping app keys to configs.
///
/// When `app_key` is `None` the file must contain exactly one application.
/// `base_dir_override` replaces (or supplies) `base_transcript_directory`.
/// A missing `name` defaults to the app key.
pub fn load_app_config(
    path: &Path,
    app_key: Option<&str>,
    base_dir_override: Option<&Path>,
) -> Result<AppConfig, ConfigError> {
    let raw = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let root: Value = serde_json::from_str(&raw)?;
    let Value::Object(mut apps) = root else {
        return Err(ConfigError::InvalidValue {
            key: "<root>".to_string(),
            message: "expected an object mapping application keys to configurations".to_string(),
        });
    };

    let key = match app_key {
        Some(key) => key.to_string(),
        None if apps.len() == 1 => apps.keys().next().cloned().unwrap_or_default(),
        None => {
            let known: Vec<&String> = apps.keys().collect();
            return Err(ConfigError::UnknownApp(format!(
                "no application selected (configured: {:?})",
                known
            )));
        }
    };

    let mut app = apps
        .remove(&key)
        .ok_or_else(|| ConfigError::UnknownApp(key.clone()))?;
    let Some(fields) = app.as_object_mut() else {
        return Err(ConfigError::InvalidValue {
            key,
            message: "expected an object".to_string(),
        });
    };

    fields
        .entry("name")
        .or_insert_with(|| Value::String(key.clone()));
    if let Some(dir) = base_dir_override {
        fields.insert(
            BASE_DIRECTORY_KEY.to_string(),
            Value::String(dir.to_string_lossy().into_owned()),
        );
    }

    log::debug!("[AX-CONFIG] Loaded configuration '{}' from {}", key, path.display());
    AppConfig::from_json_value(app)
}

fn expand_home(path: &str) -> PathBuf {
    if path == "~" {
        if let Some(home) = dirs::home_dir() {
            return home;
        }
    } else if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}

fn default_app_name() -> String {
    DEFAULT_APP_NAME.to_string()
}

fn default_levels_deep() -> i64 {
    1
}

fn default_export_depth() -> i64 {
    DEFAULT_EXPORT_DEPTH
}

fn default_monitor_interval() -> u64 {
    DEFAULT_MONITOR_INTERVAL_SECONDS
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StringOrList {
    One(String),
    Many(Vec<String>),
}

impl From<StringOrList> for Vec<String> {
    fn from(value: StringOrList) -> Self {
        match value {
            StringOrList::One(s) => vec![s],
            StringOrList::Many(v) => v,
        }
    }
}

fn string_or_list<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
    StringOrList::deserialize(deserializer).map(Vec::from)
}

fn optional_string_or_list<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<Vec<String>>, D::Error> {
    Option::<StringOrList>::deserialize(deserializer).map(|v| v.map(Vec::from))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    // ============================================================================
    // Defaults and required keys
    // ============================================================================

    #[test]
    fn test_minimal_config_uses_documented_defaults() {
        let config = AppConfig::from_json_value(json!({
            "base_transcript_directory": "/tmp/transcripts"
        }))
        .unwrap();

        assert_eq!(config.name, "UnknownApp");
        assert_eq!(config.serialization_export_depth, 15);
        assert_eq!(config.traversal_mode, TraversalMode::Bfs);
        assert!(!config.incremental_export);
        assert!(!config.serialization_save_json);
        assert!(config.traversal_roles_to_skip.is_empty());
        assert!(config.rules_to_find_transcript_table.is_empty());
        assert_eq!(config.serialization_text_element_roles, default_text_element_roles());
        assert_eq!(config.exclude_pattern, None);
        assert_eq!(config.monitor_interval_seconds, 30);
    }

    #[test]
    fn test_missing_base_directory_is_rejected() {
        let err = AppConfig::from_json_value(json!({"name": "zoom"})).unwrap_err();
        assert!(matches!(err, ConfigError::MissingKey(ref k) if k == "base_transcript_directory"));

        let err = AppConfig::from_json_value(json!({"base_transcript_directory": null})).unwrap_err();
        assert!(matches!(err, ConfigError::MissingKey(_)));
    }

    #[test]
    fn test_wrong_type_base_directory_is_rejected() {
        let err = AppConfig::from_json_value(json!({"base_transcript_directory": 12})).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));

        let err = AppConfig::from_json_value(json!({"base_transcript_directory": "  "})).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }

    #[test]
    fn test_invalid_exclude_pattern_is_rejected() {
        let err = AppConfig::from_json_value(json!({
            "base_transcript_directory": "/tmp",
            "exclude_pattern": "[unclosed"
        }))
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref key, .. } if key == "exclude_pattern"));
    }

    #[test]
    fn test_empty_exclude_pattern_means_none() {
        let mut config = AppConfig::new("zoom", "/tmp");
        config.exclude_pattern = Some(String::new());
        assert!(config.exclude_regex().unwrap().is_none());
    }

    #[test]
    fn test_unsupported_traversal_mode_is_rejected() {
        let err = AppConfig::from_json_value(json!({
            "base_transcript_directory": "/tmp",
            "traversal_mode": "random"
        }))
        .unwrap_err();
        assert!(err.to_string().contains("random"));

        let upper = AppConfig::from_json_value(json!({
            "base_transcript_directory": "/tmp",
            "traversal_mode": "DFS"
        }))
        .unwrap();
        assert_eq!(upper.traversal_mode, TraversalMode::Dfs);
    }

    // ============================================================================
    // Search paths
    // ============================================================================

    #[test]
    fn test_flattened_step_criteria() {
        let config = AppConfig::from_json_value(json!({
            "base_transcript_directory": "/tmp",
            "rules_to_find_transcript_table": [{
                "path_name": "Captions",
                "steps": [
                    {"role": "AXWindow", "title_contains": "Meeting", "search_scope": {"levels_deep": 2}},
                    {"role": "AXStaticText", "index": 0, "search_scope": {"levels_deep": 5}, "future_key": 1}
                ]
            }]
        }))
        .unwrap();

        let path = &config.rules_to_find_transcript_table[0];
        assert_eq!(path.display_name(0), "Captions");
        assert_eq!(
            path.steps[0],
            Step::new(
                Criteria {
                    role: Some("AXWindow".into()),
                    title_contains: Some("Meeting".into()),
                    ..Criteria::default()
                },
                2
            )
        );
        assert_eq!(
            path.steps[1],
            Step::new(Criteria::role("AXStaticText"), 5).with_index(0)
        );
    }

    #[test]
    fn test_legacy_search_paths_key_and_defaults() {
        let config = AppConfig::from_json_value(json!({
            "base_transcript_directory": "/tmp",
            "transcript_search_paths": [{"steps": [{"subrole": "AXTranscript"}]}]
        }))
        .unwrap();

        let path = &config.rules_to_find_transcript_table[0];
        assert_eq!(path.display_name(0), "PathOption-1");
        assert_eq!(path.steps[0].search_scope.levels_deep, 1);
        assert_eq!(path.steps[0].index, None);
    }

    #[test]
    fn test_title_matches_one_of_accepts_string_or_list() {
        let step: Step = serde_json::from_value(json!({"title_matches_one_of": ["Zoom", "Meeting"]})).unwrap();
        assert_eq!(
            step.criteria.title_matches_one_of,
            Some(vec!["Zoom".to_string(), "Meeting".to_string()])
        );

        let step: Step = serde_json::from_value(json!({"title_matches_one_of": "Zoom"})).unwrap();
        assert_eq!(step.criteria.title_matches_one_of, Some(vec!["Zoom".to_string()]));
    }

    #[test]
    fn test_process_hints_accept_string_or_list() {
        let config = AppConfig::from_json_value(json!({
            "base_transcript_directory": "/tmp",
            "command_paths": "/Applications/zoom.us.app/Contents/MacOS/zoom.us",
            "app_names": ["zoom", "CptHost"]
        }))
        .unwrap();
        assert_eq!(config.command_paths.len(), 1);
        assert_eq!(config.app_names, vec!["zoom", "CptHost"]);
    }

    #[test]
    fn test_text_role_attribute_spellings() {
        let config = AppConfig::from_json_value(json!({
            "base_transcript_directory": "/tmp",
            "serialization_text_element_roles": {
                "AXStaticText": "AXValue",
                "AXCell": "description",
                "AXGroup": "kAXTitleAttribute"
            }
        }))
        .unwrap();
        let roles = &config.serialization_text_element_roles;
        assert_eq!(roles["AXStaticText"], Attribute::Value);
        assert_eq!(roles["AXCell"], Attribute::Description);
        assert_eq!(roles["AXGroup"], Attribute::Title);
    }

    // ============================================================================
    // Derived values
    // ============================================================================

    #[test]
    fn test_effective_depth_normalization() {
        assert_eq!(effective_depth(1), 1);
        assert_eq!(effective_depth(15), 15);
        assert_eq!(effective_depth(0), UNBOUNDED_DEPTH);
        assert_eq!(effective_depth(-20), UNBOUNDED_DEPTH);
    }

    #[test]
    fn test_slug_replaces_non_alphanumerics() {
        assert_eq!(AppConfig::new("Zoom", "/tmp").slug(), "zoom");
        assert_eq!(AppConfig::new("Google Meet/Chrome", "/tmp").slug(), "google_meet_chrome");
    }

    #[test]
    fn test_home_expansion() {
        let config = AppConfig::new("zoom", "~/Transcripts");
        let dir = config.transcript_base_dir();
        if let Some(home) = dirs::home_dir() {
            assert_eq!(dir, home.join("Transcripts"));
        }
        assert_eq!(AppConfig::new("zoom", "/abs/dir").transcript_base_dir(), PathBuf::from("/abs/dir"));
    }

    // ============================================================================
    // Config files
    // ============================================================================

    #[test]
    fn test_load_app_config_selects_key_and_defaults_name() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("apps.json");
        fs::write(
            &path,
            json!({
                "zoom": {"base_transcript_directory": "/tmp/zoom", "app_names": ["zoom.us"]},
                "teams": {"name": "Teams", "base_transcript_directory": "/tmp/teams"}
            })
            .to_string(),
        )
        .unwrap();

        let zoom = load_app_config(&path, Some("zoom"), None).unwrap();
        assert_eq!(zoom.name, "zoom");
        assert_eq!(zoom.app_names, vec!["zoom.us"]);

        let teams = load_app_config(&path, Some("teams"), Some(Path::new("/override"))).unwrap();
        assert_eq!(teams.name, "Teams");
        assert_eq!(teams.base_transcript_directory, "/override");

        assert!(matches!(
            load_app_config(&path, Some("webex"), None),
            Err(ConfigError::UnknownApp(_))
        ));
        assert!(matches!(load_app_config(&path, None, None), Err(ConfigError::UnknownApp(_))));
    }

    #[test]
    fn test_load_app_config_single_entry_and_override_supplies_base_dir() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("apps.json");
        fs::write(&path, json!({"slack": {"app_names": "Slack"}}).to_string()).unwrap();

        assert!(matches!(
            load_app_config(&path, None, None),
            Err(ConfigError::MissingKey(_))
        ));

        let slack = load_app_config(&path, None, Some(dir.path())).unwrap();
        assert_eq!(slack.name, "slack");
        assert_eq!(slack.transcript_base_dir(), dir.path());
    }

    #[test]
    fn test_load_app_config_missing_file() {
        let err = load_app_config(Path::new("/nonexistent/apps.json"), None, None).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
