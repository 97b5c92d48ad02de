use serde::Deserialize;

/// Root application configuration. Loaded from an optional
/// `audience-engine.toml` and environment variables with the prefix
/// `AUDIENCE_ENGINE__`.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_org_id")]
    pub org_id: String,
    #[serde(default)]
    pub log: LogConfig,
    #[serde(default)]
    pub segmentation: SegmentationConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LogConfig {
    #[serde(default = "default_log_filter")]
    pub filter: String,
    #[serde(default)]
    pub json: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SegmentationConfig {
    /// Serve the last successfully fetched association list for a static
    /// audience when the store is unreachable.
    #[serde(default = "default_static_fallback")]
    pub static_fallback: bool,
    /// Maximum number of member ids the preview tool prints.
    #[serde(default = "default_preview_limit")]
    pub preview_limit: usize,
}

// Default functions
fn default_org_id() -> String {
    "default-org".to_string()
}
fn default_log_filter() -> String {
    "audience_preview=info,audience_segmentation=info".to_string()
}
fn default_static_fallback() -> bool {
    true
}
fn default_preview_limit() -> usize {
    50
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            filter: default_log_filter(),
            json: false,
        }
    }
}

impl Default for SegmentationConfig {
    fn default() -> Self {
        Self {
            static_fallback: default_static_fallback(),
            preview_limit: default_preview_limit(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            org_id: default_org_id(),
            log: LogConfig::default(),
            segmentation: SegmentationConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from `audience-engine.toml` (if present) and environment.
    pub fn load() -> Result<Self, config::ConfigError> {
        Self::load_from("audience-engine")
    }

    pub fn load_from(file_stem: &str) -> Result<Self, config::ConfigError> {
        let builder = config::Config::builder()
            .add_source(config::File::with_name(file_stem).required(false))
            .add_source(
                config::Environment::with_prefix("AUDIENCE_ENGINE")
                    .separator("__")
                    .try_parsing(true),
            );

        let config = builder.build()?;
        config.try_deserialize()
    }
}
