use dirs;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

pub const API_KEY_ENV_VARS: [&str; 2] = ["FILEBOT_API_KEY", "GEMINI_API_KEY"];

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct Config {
    pub api: ApiConfig,
    pub preferences: PreferencesConfig,
    pub search: SearchConfig,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct ApiConfig {
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
    pub timeout_secs: u64,
    pub max_retries: u32,
    pub retry_backoff_ms: u64,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct PreferencesConfig {
    pub default_directory: Option<String>,
    pub verbose: bool,
    pub history_limit: usize,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct SearchConfig {
    pub recursive: bool,
    pub max_results: usize,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: "gemini-2.0-flash".to_string(),
            base_url: "https://generativelanguage.googleapis.com/v1beta/openai".to_string(),
            timeout_secs: 30,
            max_retries: 2,
            retry_backoff_ms: 10_000,
        }
    }
}

impl Default for PreferencesConfig {
    fn default() -> Self {
        Self {
            default_directory: None,
            verbose: false,
            history_limit: 10,
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            recursive: true,
            max_results: 50,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api: ApiConfig::default(),
            preferences: PreferencesConfig::default(),
            search: SearchConfig::default(),
        }
    }
}

impl Config {
    /// Overlay environment variables, looked up through `lookup` so callers
    /// (and tests) decide where values come from.
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(api_key) = API_KEY_ENV_VARS
            .iter()
            .find_map(|name| lookup(name).filter(|v| !v.trim().is_empty()))
        {
            self.api.api_key = Some(api_key);
        }
        if let Some(model) = lookup("FILEBOT_MODEL") {
            self.api.model = model;
        }
        if let Some(base_url) = lookup("FILEBOT_BASE_URL") {
            self.api.base_url = base_url;
        }
    }

    /// The credential is the one setting the bot cannot start without.
    pub fn require_api_key(&self) -> Result<&str, Box<dyn std::error::Error>> {
        self.api
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .ok_or_else(|| {
                format!(
                    "API key not found. Set {} (or {}) in the environment or a .env file, \
                     or run: filebot config set api.api_key <your-key>",
                    API_KEY_ENV_VARS[0], API_KEY_ENV_VARS[1]
                )
                .into()
            })
    }

    /// Copy with the API key hidden, for display.
    pub fn redacted(&self) -> Config {
        let mut config = self.clone();
        if let Some(key) = config.api.api_key.as_mut() {
            // Short keys would be mostly or fully exposed by a prefix.
            let visible: String = if key.chars().count() > 8 {
                key.chars().take(4).collect()
            } else {
                String::new()
            };
            *key = format!("{}…", visible);
        }
        config
    }

    pub fn set_value(&mut self, key: &str, value: &str) -> Result<(), Box<dyn std::error::Error>> {
        match key {
            "api.api_key" => self.api.api_key = Some(value.to_string()),
            "api.model" => self.api.model = value.to_string(),
            "api.base_url" => self.api.base_url = value.to_string(),
            "api.timeout_secs" => self.api.timeout_secs = value.parse()?,
            "api.max_retries" => self.api.max_retries = value.parse()?,
            "api.retry_backoff_ms" => self.api.retry_backoff_ms = value.parse()?,
            "preferences.default_directory" => {
                self.preferences.default_directory = Some(value.to_string())
            }
            "preferences.verbose" => self.preferences.verbose = value.parse()?,
            "preferences.history_limit" => self.preferences.history_limit = value.parse()?,
            "search.recursive" => self.search.recursive = value.parse()?,
            "search.max_results" => self.search.max_results = value.parse()?,
            _ => return Err(format!("Unknown config key: {}", key).into()),
        }
        Ok(())
    }
}

pub struct ConfigManager;

impl ConfigManager {
    pub fn config_path() -> Result<PathBuf, Box<dyn std::error::Error>> {
        let config_dir = dirs::config_dir()
            .ok_or("Could not find config directory")?
            .join("filebot");

        Ok(config_dir.join("config.toml"))
    }

    /// Load the config file (defaults when absent) and overlay the process environment.
    pub fn load_config() -> Result<Config, Box<dyn std::error::Error>> {
        let mut config = Self::load_from(&Self::config_path()?)?;
        config.apply_env_overrides(|name| env::var(name).ok());
        Ok(config)
    }

    pub fn load_from(path: &Path) -> Result<Config, Box<dyn std::error::Error>> {
        if !path.exists() {
            log::debug!("no config file at {}, using defaults", path.display());
            return Ok(Config::default());
        }

        let config_content = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&config_content)
            .map_err(|e| format!("Invalid config file {}: {}", path.display(), e))?;
        Ok(config)
    }

    pub fn save_to(path: &Path, config: &Config) -> Result<(), Box<dyn std::error::Error>> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let toml_string = toml::to_string_pretty(config)?;
        fs::write(path, toml_string)?;
        Ok(())
    }

    pub fn save_config(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
        Self::save_to(&Self::config_path()?, config)
    }

    pub fn init_config() -> Result<(), Box<dyn std::error::Error>> {
        let config_path = Self::config_path()?;

        if config_path.exists() {
            println!("Configuration file already exists at: {}", config_path.display());
            return Ok(());
        }

        Self::save_config(&Config::default())?;

        println!("✅ Configuration initialized at: {}", config_path.display());
        println!("📝 Set your API key with:");
        println!("   filebot config set api.api_key <your-key>");
        println!("   or export {}=<your-key>", API_KEY_ENV_VARS[0]);

        Ok(())
    }

    pub fn set_config_value(key: &str, value: &str) -> Result<(), Box<dyn std::error::Error>> {
        let config_path = Self::config_path()?;
        // Only the file's contents are persisted, never environment overrides.
        let mut config = Self::load_from(&config_path)?;
        config.set_value(key, value)?;
        Self::save_to(&config_path, &config)?;
        println!("✅ Updated {}", key);
        Ok(())
    }

    pub fn validate_config() -> Result<(), Box<dyn std::error::Error>> {
        let config = Self::load_config()?;

        match config.require_api_key() {
            Ok(_) => {
                println!("✅ Configuration is valid");
                println!("🔧 Model: {}", config.api.model);
                println!("🔧 Base URL: {}", config.api.base_url);
                Ok(())
            }
            Err(e) => {
                println!("❌ {}", e);
                Err("Missing API key".into())
            }
        }
    }
}
