//! User settings
//!
//! Settings are read from a VS Code style settings document, which is JSON
//! with comments and trailing commas. Only the keys this crate knows about
//! are kept, everything else in the document is ignored.

use std::path::{Path, PathBuf};

use eyre::Context;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Directory name used below the platform data directory.
const APP_DIR: &str = "testbridge";

/// Settings consumed by the test session coordinator.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    /// Options merged into every test launch configuration.
    #[serde(default, alias = "csharp.unitTestDebuggingOptions")]
    pub unit_test_debugging_options: DebugOptions,

    /// Where filesystem-backed debugger event endpoints are created.
    #[serde(default)]
    pub debug_events_directory: Option<PathBuf>,
}

impl Settings {
    pub fn debug_options(&self) -> &DebugOptions {
        &self.unit_test_debugging_options
    }

    /// The configured events directory, or the platform default.
    pub fn events_directory(&self) -> PathBuf {
        self.debug_events_directory
            .clone()
            .unwrap_or_else(default_events_directory)
    }
}

/// `<local data dir>/testbridge`, falling back to the temp directory.
pub fn default_events_directory() -> PathBuf {
    match dirs::data_local_dir() {
        Some(dir) => dir.join(APP_DIR),
        None => {
            tracing::warn!("cannot determine local data directory, using temp directory");
            std::env::temp_dir()
        }
    }
}

/// User-configured default debug options.
///
/// This is an arbitrary JSON object; the debugging front-end decides what the
/// keys mean.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DebugOptions(Map<String, Value>);

impl DebugOptions {
    pub fn new(options: Map<String, Value>) -> Self {
        Self(options)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    /// Copy the defaults and apply `overrides` on top.
    ///
    /// The copy is shallow: nested objects are replaced wholesale, never
    /// merged, and the stored defaults are left untouched.
    pub fn merged_with(
        &self,
        overrides: impl IntoIterator<Item = (String, Value)>,
    ) -> Map<String, Value> {
        let mut merged = self.0.clone();
        for (key, value) in overrides {
            merged.insert(key, value);
        }
        merged
    }
}

impl From<Map<String, Value>> for DebugOptions {
    fn from(value: Map<String, Value>) -> Self {
        Self(value)
    }
}

pub fn load(mut r: impl std::io::Read) -> eyre::Result<Settings> {
    let mut contents = String::new();
    r.read_to_string(&mut contents)
        .wrap_err("reading settings contents")?;
    let settings = from_str(&contents).wrap_err("parsing settings")?;
    Ok(settings)
}

pub fn load_from_path(path: impl AsRef<Path>) -> eyre::Result<Settings> {
    let path = path.as_ref();
    let f = std::fs::File::open(path)
        .wrap_err_with(|| format!("opening settings file {}", path.display()))?;
    let settings = crate::load(f).context("loading settings from given path")?;
    tracing::debug!(path = %path.display(), "loaded settings");
    Ok(settings)
}

fn from_str(contents: &str) -> eyre::Result<Settings> {
    let value = jsonc_parser::parse_to_serde_value(contents, &Default::default())
        .wrap_err("parsing jsonc settings")?;
    let Some(value) = value else {
        tracing::debug!("empty settings document, using defaults");
        return Ok(Settings::default());
    };

    let settings = serde_json::from_value(value).wrap_err("deserializing settings")?;
    Ok(settings)
}
