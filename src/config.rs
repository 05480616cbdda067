use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

use crate::core::BoostWeights;

/// Application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub server: ServerSettings,
    pub database: DatabaseSettings,
    #[serde(default)]
    pub search: SearchSettings,
    #[serde(default)]
    pub classifier: ClassifierSettings,
    #[serde(default)]
    pub matching: MatchingSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    pub workers: Option<usize>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseSettings {
    pub url: String,
    pub max_connections: Option<u32>,
    pub min_connections: Option<u32>,
    pub acquire_timeout_secs: Option<u64>,
    pub idle_timeout_secs: Option<u64>,
}

/// Elasticsearch settings. Without a `url` the service runs with search disabled.
#[derive(Debug, Clone, Deserialize)]
pub struct SearchSettings {
    pub url: Option<String>,
    #[serde(default = "default_index")]
    pub index: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Page window for free-text chat search
    #[serde(default = "default_page_size")]
    pub default_page_size: u32,
    #[serde(default = "default_search_max_page_size")]
    pub max_page_size: u32,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            url: None,
            index: default_index(),
            timeout_secs: default_timeout_secs(),
            default_page_size: default_page_size(),
            max_page_size: default_search_max_page_size(),
        }
    }
}

/// Settings for the chat-completion service used by the content classifier
#[derive(Debug, Clone, Deserialize)]
pub struct ClassifierSettings {
    pub api_key: Option<String>,
    #[serde(default = "default_classifier_url")]
    pub base_url: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ClassifierSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_classifier_url(),
            model: default_model(),
            temperature: default_temperature(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MatchingSettings {
    #[serde(default = "default_page_size")]
    pub default_page_size: u32,
    #[serde(default = "default_max_page_size")]
    pub max_page_size: u32,
    #[serde(default)]
    pub boosts: BoostsConfig,
}

impl Default for MatchingSettings {
    fn default() -> Self {
        Self {
            default_page_size: default_page_size(),
            max_page_size: default_max_page_size(),
            boosts: BoostsConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct BoostsConfig {
    #[serde(default = "default_category_boost")]
    pub category: f64,
    #[serde(default = "default_location_boost")]
    pub location: f64,
    #[serde(default = "default_condition_boost")]
    pub condition: f64,
    #[serde(default = "default_keywords_boost")]
    pub keywords: f64,
    #[serde(default = "default_keyword_content_boost")]
    pub keyword_content: f64,
}

impl Default for BoostsConfig {
    fn default() -> Self {
        Self {
            category: default_category_boost(),
            location: default_location_boost(),
            condition: default_condition_boost(),
            keywords: default_keywords_boost(),
            keyword_content: default_keyword_content_boost(),
        }
    }
}

impl From<&BoostsConfig> for BoostWeights {
    fn from(value: &BoostsConfig) -> Self {
        BoostWeights {
            category: value.category,
            location: value.location,
            condition: value.condition,
            keywords: value.keywords,
            keyword_content: value.keyword_content,
        }
    }
}

fn default_index() -> String { "chat_messages".to_string() }
fn default_timeout_secs() -> u64 { 30 }
fn default_classifier_url() -> String { "https://api.openai.com/v1".to_string() }
fn default_model() -> String { "gpt-4o".to_string() }
fn default_temperature() -> f64 { 0.3 }
fn default_page_size() -> u32 { 10 }
fn default_max_page_size() -> u32 { 50 }
fn default_search_max_page_size() -> u32 { 100 }
fn default_category_boost() -> f64 { 3.0 }
fn default_location_boost() -> f64 { 2.0 }
fn default_condition_boost() -> f64 { 1.5 }
fn default_keywords_boost() -> f64 { 2.0 }
fn default_keyword_content_boost() -> f64 { 1.0 }

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingSettings {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

fn default_log_level() -> String { "info".to_string() }
fn default_log_format() -> String { "json".to_string() }

impl Settings {
    /// Load configuration from file and environment variables
    ///
    /// Configuration is loaded in the following order (later overrides earlier):
    /// 1. Default values in the struct
    /// 2. Configuration file (config/default.toml)
    /// 3. Local overrides (config/local.toml)
    /// 4. Environment variables (prefixed with BUYSELL__)
    /// 5. Well-known variables: DATABASE_URL, OPENAI_API_KEY, ELASTICSEARCH_URL
    pub fn load() -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            // e.g., BUYSELL__SERVER__PORT -> server.port
            .add_source(
                Environment::with_prefix("BUYSELL")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let settings = apply_well_known_env(settings, |name| std::env::var(name).ok())?;

        settings.try_deserialize()
    }

    pub fn boost_weights(&self) -> BoostWeights {
        BoostWeights::from(&self.matching.boosts)
    }
}

/// Overlay the conventional unprefixed variables that deployments already set.
///
/// `lookup` is injected so tests never touch the process environment.
fn apply_well_known_env<F>(settings: Config, lookup: F) -> Result<Config, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    const OVERRIDES: [(&str, &str); 3] = [
        ("DATABASE_URL", "database.url"),
        ("OPENAI_API_KEY", "classifier.api_key"),
        ("ELASTICSEARCH_URL", "search.url"),
    ];

    let mut builder = Config::builder().add_source(settings);

    for (variable, key) in OVERRIDES {
        if let Some(value) = lookup(variable).filter(|v| !v.trim().is_empty()) {
            builder = builder.set_override(key, value)?;
        }
    }

    builder.build()
}
