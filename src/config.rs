use crate::bundle::LintSettings;
use crate::compat::CompatContext;
use crate::level::LintLevel;
use crate::metadata::Metadata;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

#[derive(Debug, Default, Deserialize)]
pub struct XpiLintConfig {
    /// Treat warnings as failures.
    #[serde(default)]
    pub strict: bool,

    /// Seed metadata (`is_jetpack`, `em:bootstrap`, ...).
    #[serde(default)]
    pub metadata: BTreeMap<String, toml::Value>,

    /// Application GUID -> targeted versions.
    #[serde(default)]
    pub target: BTreeMap<String, Vec<String>>,

    #[serde(default)]
    pub lints: LintsConfig,
}

#[derive(Debug, Default, Deserialize)]
pub struct LintsConfig {
    #[serde(default)]
    pub disabled: Vec<String>,

    /// Identifier or identifier prefix -> level.
    #[serde(flatten)]
    pub levels: HashMap<String, LintLevel>,
}

impl XpiLintConfig {
    pub fn settings(&self) -> LintSettings {
        LintSettings::default()
            .with_config_levels(self.lints.levels.clone())
            .disable(self.lints.disabled.clone())
            .strict(self.strict)
    }

    pub fn metadata(&self) -> Result<Metadata> {
        let mut metadata = Metadata::new();
        for (key, value) in &self.metadata {
            let json = serde_json::to_value(value)
                .with_context(|| format!("invalid metadata value for `{key}`"))?;
            metadata.set(key.clone(), json);
        }
        Ok(metadata)
    }

    pub fn compat(&self) -> CompatContext {
        let mut compat = CompatContext::new();
        for (app, versions) in &self.target {
            for version in versions {
                compat.add_target(app.clone(), version.clone());
            }
        }
        compat
    }
}

pub const DEFAULT_CONFIG_FILE_NAME: &str = "xpi-lint.toml";

pub fn find_config_file(start_dir: &Path) -> Option<PathBuf> {
    let mut cur = Some(start_dir);
    while let Some(dir) = cur {
        let candidate = dir.join(DEFAULT_CONFIG_FILE_NAME);
        if candidate.is_file() {
            return Some(candidate);
        }
        cur = dir.parent();
    }
    None
}

pub fn load_config_file(path: &Path) -> Result<XpiLintConfig> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config file: {}", path.display()))?;
    let cfg: XpiLintConfig = toml::from_str(&raw)
        .with_context(|| format!("failed to parse config file: {}", path.display()))?;
    Ok(cfg)
}

pub fn load_config(
    explicit_path: Option<&Path>,
    start_dir: &Path,
) -> Result<Option<(PathBuf, XpiLintConfig)>> {
    if let Some(p) = explicit_path {
        let cfg = load_config_file(p)?;
        return Ok(Some((p.to_path_buf(), cfg)));
    }

    let Some(p) = find_config_file(start_dir) else {
        return Ok(None);
    };
    let cfg = load_config_file(&p)?;
    Ok(Some((p, cfg)))
}
