use anyhow::{Context, Result};
use camino::Utf8Path;
use fs_err as fs;
use serde::Deserialize;

#[derive(Debug, Deserialize, Default)]
struct FilesSection {
    extension: Option<String>,
    dispatcher: Option<String>,
    lib_dir: Option<String>,
    core_module: Option<String>,
    init_module: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct RawConfig {
    #[serde(default)]
    files: FilesSection,
}

/// File-naming conventions for directory mode. Loaded from an optional
/// `toolsmith.toml` next to the target; every key has a default.
#[derive(Debug, Clone)]
pub struct RefitConfig {
    pub extension: String,
    pub dispatcher: String,
    pub lib_dir: String,
    pub core_module: String,
    pub init_module: String,
}

impl Default for RefitConfig {
    fn default() -> Self {
        Self {
            extension: "cjs".to_string(),
            dispatcher: "gsd-tools.cjs".to_string(),
            lib_dir: "lib".to_string(),
            core_module: "core.cjs".to_string(),
            init_module: "init.cjs".to_string(),
        }
    }
}

impl RefitConfig {
    /// Reads `toolsmith.toml` from the target directory (or the target
    /// file's parent). A missing file yields the defaults; a malformed
    /// one is an error.
    pub fn load(target: &Utf8Path) -> Result<Self> {
        let dir = if target.is_dir() {
            target
        } else {
            target.parent().unwrap_or(Utf8Path::new("."))
        };
        let path = dir.join("toolsmith.toml");
        if !path.exists() {
            return Ok(Self::default());
        }
        let data = fs::read_to_string(&path).with_context(|| format!("reading config {path}"))?;
        let raw: RawConfig =
            toml::from_str(&data).with_context(|| format!("parsing {path}"))?;
        let defaults = Self::default();
        Ok(Self {
            extension: raw.files.extension.unwrap_or(defaults.extension),
            dispatcher: raw.files.dispatcher.unwrap_or(defaults.dispatcher),
            lib_dir: raw.files.lib_dir.unwrap_or(defaults.lib_dir),
            core_module: raw.files.core_module.unwrap_or(defaults.core_module),
            init_module: raw.files.init_module.unwrap_or(defaults.init_module),
        })
    }
}
