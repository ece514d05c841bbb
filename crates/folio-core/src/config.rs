use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use anyhow::{Result, anyhow};

use crate::ai::gemini::{DEFAULT_BASE_URL, DEFAULT_MODEL};
use crate::parser::ParserKind;
use crate::profile::Profile;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct Config {
    pub gemini_api_key: Option<String>,
    pub model: String,
    pub gemini_base_url: String,
    pub supabase_url: Option<String>,
    pub supabase_anon_key: Option<String>,
    /// Pass prior turns to the model as context
    pub include_history: bool,
    pub parser: ParserKind,
    pub profile: Profile,
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

impl Config {
    pub fn new() -> Self {
        Self {
            gemini_api_key: None,
            model: DEFAULT_MODEL.to_string(),
            gemini_base_url: DEFAULT_BASE_URL.to_string(),
            supabase_url: None,
            supabase_anon_key: None,
            include_history: true,
            parser: ParserKind::default(),
            profile: Profile::default(),
        }
    }

    /// Load from the default location, then apply environment overrides
    pub fn load() -> Result<Self> {
        let config = Self::load_from(&Self::get_config_path()?)?;
        Ok(config.with_env_overrides(|key| std::env::var(key).ok()))
    }

    /// Missing file means defaults
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::new());
        }

        let config_content = fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&config_content)
            .map_err(|e| anyhow!("Invalid config {:?}: {}", path, e))?;
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::get_config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        // Create config directory if it doesn't exist
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let config_content = serde_json::to_string_pretty(self)?;
        fs::write(path, config_content)?;
        Ok(())
    }

    /// Environment wins over the file. `lookup` is `std::env::var` outside tests.
    pub fn with_env_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(key) = non_empty("GEMINI_API_KEY").or_else(|| non_empty("API_KEY")) {
            self.gemini_api_key = Some(key);
        }
        if let Some(url) = non_empty("SUPABASE_URL") {
            self.supabase_url = Some(url);
        }
        if let Some(key) = non_empty("SUPABASE_ANON_KEY") {
            self.supabase_anon_key = Some(key);
        }
        self
    }

    pub fn has_store_credentials(&self) -> bool {
        self.supabase_url.as_deref().is_some_and(|u| !u.is_empty())
            && self.supabase_anon_key.as_deref().is_some_and(|k| !k.is_empty())
    }

    pub fn get_config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow!("Could not determine config directory"))?;

        Ok(config_dir.join("folio").join("config.json"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_from(&dir.path().join("nope.json")).unwrap();
        assert_eq!(config, Config::new());
        assert_eq!(config.model, "gemini-2.5-flash");
        assert!(config.include_history);
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");

        let mut config = Config::new();
        config.model = "gemini-2.5-pro".to_string();
        config.include_history = false;
        config.parser = ParserKind::Balanced;
        config.save_to(&path).unwrap();

        assert_eq!(Config::load_from(&path).unwrap(), config);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{"parser": "balanced", "profile": {"name": "Ana Lima"}}"#).unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.parser, ParserKind::Balanced);
        assert_eq!(config.profile.name, "Ana Lima");
        assert_eq!(config.model, DEFAULT_MODEL);
    }

    #[test]
    fn test_invalid_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{ not json").unwrap();
        assert!(Config::load_from(&path).is_err());
    }

    #[test]
    fn test_env_overrides_file() {
        let env: HashMap<&str, &str> = [
            ("API_KEY", "from-api-key"),
            ("SUPABASE_URL", "https://x.supabase.co"),
            ("SUPABASE_ANON_KEY", "  "),
        ]
        .into_iter()
        .collect();

        let mut config = Config::new();
        config.supabase_anon_key = Some("file-key".to_string());
        let config = config.with_env_overrides(|k| env.get(k).map(|v| v.to_string()));

        assert_eq!(config.gemini_api_key.as_deref(), Some("from-api-key"));
        assert_eq!(config.supabase_url.as_deref(), Some("https://x.supabase.co"));
        assert_eq!(config.supabase_anon_key.as_deref(), Some("file-key"));
        assert!(config.has_store_credentials());
    }

    #[test]
    fn test_gemini_key_preferred_over_api_key() {
        let config = Config::new().with_env_overrides(|k| match k {
            "GEMINI_API_KEY" => Some("gemini".to_string()),
            "API_KEY" => Some("generic".to_string()),
            _ => None,
        });
        assert_eq!(config.gemini_api_key.as_deref(), Some("gemini"));
        assert!(!config.has_store_credentials());
    }
}
