use crate::core::cards::{is_valid_date_format, DEFAULT_DATE_FORMAT};
use crate::core::formatter::{FormatterRules, PriorityRule};
use crate::core::service::DEFAULT_FEED_LIMIT;
use crate::core::ConfigProvider;
use crate::domain::model::{Category, ALL_CATEGORIES};
use crate::utils::error::{OrbitError, Result};
use crate::utils::validation::{
    validate_non_empty_string, validate_path, validate_positive_number, validate_required_field,
    validate_url, Validate,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

pub const DEFAULT_TIMEOUT_SECONDS: u64 = 30;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TomlConfig {
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub feed: FeedConfig,
    pub formatter: Option<FormatterConfig>,
    pub categories: Option<Vec<Category>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BackendConfig {
    pub url: Option<String>,
    pub anon_key: Option<String>,
    pub timeout_seconds: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionConfig {
    pub dir: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FeedConfig {
    pub limit: Option<usize>,
    pub date_format: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FormatterConfig {
    /// Merged over the built-in label table.
    pub labels: Option<HashMap<String, String>>,
    /// Replaces the built-in priority rules when present.
    pub priorities: Option<Vec<PriorityRule>>,
    pub fallback_priority: Option<u8>,
    pub ordinal_keywords: Option<Vec<String>>,
    /// Added to `hidden_id`, which is always hidden.
    pub hidden_keys: Option<Vec<String>>,
    pub placeholder: Option<String>,
}

impl TomlConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(OrbitError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 檔案不存在時使用預設值
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        if path.as_ref().exists() {
            tracing::debug!("📁 Loading configuration from {}", path.as_ref().display());
            Self::from_file(path)
        } else {
            tracing::debug!(
                "No configuration file at {}, using defaults",
                path.as_ref().display()
            );
            Ok(Self::default())
        }
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| OrbitError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${SUPABASE_ANON_KEY})
    fn substitute_env_vars(content: &str) -> Result<String> {
        use regex::Regex;
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| OrbitError::ConfigError {
            message: format!("Invalid placeholder pattern: {}", e),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    /// 未設定的後端參數從 SUPABASE_URL / SUPABASE_ANON_KEY 補上
    pub fn apply_env_defaults(&mut self) {
        if self.backend.url.is_none() {
            self.backend.url = std::env::var("SUPABASE_URL").ok();
        }
        if self.backend.anon_key.is_none() {
            self.backend.anon_key = std::env::var("SUPABASE_ANON_KEY").ok();
        }
    }

    pub fn validate_config(&self) -> Result<()> {
        if let Some(url) = &self.backend.url {
            validate_url("backend.url", url)?;
        }

        if let Some(timeout) = self.backend.timeout_seconds {
            validate_positive_number("backend.timeout_seconds", timeout as usize, 1)?;
        }

        validate_path("session.dir", &self.session_dir_or_default())?;

        if let Some(limit) = self.feed.limit {
            validate_positive_number("feed.limit", limit, 1)?;
        }

        if let Some(format) = &self.feed.date_format {
            validate_non_empty_string("feed.date_format", format)?;
            if !is_valid_date_format(format) {
                return Err(OrbitError::ConfigValidationError {
                    field: "feed.date_format".to_string(),
                    message: format!("'{}' cannot format a calendar date", format),
                });
            }
        }

        if let Some(formatter) = &self.formatter {
            for (index, rule) in formatter.priorities.iter().flatten().enumerate() {
                let field = format!("formatter.priorities[{}]", index);
                if rule.keywords.iter().all(|k| k.trim().is_empty()) {
                    return Err(OrbitError::ConfigValidationError {
                        field,
                        message: "Priority rule needs at least one keyword".to_string(),
                    });
                }
                validate_positive_number(&field, rule.priority as usize, 1)?;
            }
        }

        if let Some(categories) = &self.categories {
            for category in categories {
                validate_non_empty_string("categories.id", &category.id)?;
            }
        }

        Ok(())
    }

    /// Backend commands need both a valid URL and the anon key.
    pub fn validate_backend(&self) -> Result<()> {
        let url = validate_required_field("backend.url", &self.backend.url)?;
        validate_url("backend.url", url)?;
        let key = validate_required_field("backend.anon_key", &self.backend.anon_key)?;
        validate_non_empty_string("backend.anon_key", key)
    }

    pub fn session_dir_or_default(&self) -> String {
        match &self.session.dir {
            Some(dir) => dir.clone(),
            None => default_session_dir(),
        }
    }

    pub fn date_format(&self) -> &str {
        self.feed.date_format.as_deref().unwrap_or(DEFAULT_DATE_FORMAT)
    }

    pub fn formatter_rules(&self) -> FormatterRules {
        let mut rules = FormatterRules::default();
        let Some(config) = &self.formatter else {
            return rules;
        };

        if let Some(labels) = &config.labels {
            rules
                .labels
                .extend(labels.iter().map(|(k, v)| (k.clone(), v.clone())));
        }
        if let Some(priorities) = &config.priorities {
            rules.priorities = priorities.clone();
        }
        if let Some(fallback) = config.fallback_priority {
            rules.fallback_priority = fallback;
        }
        if let Some(keywords) = &config.ordinal_keywords {
            rules.ordinal_keywords = keywords.iter().map(|k| k.to_lowercase()).collect();
        }
        if let Some(hidden) = &config.hidden_keys {
            for key in hidden {
                if !rules.hidden_keys.contains(key) {
                    rules.hidden_keys.push(key.clone());
                }
            }
        }
        if let Some(placeholder) = &config.placeholder {
            rules.placeholder = placeholder.clone();
        }
        rules
    }

    /// Configured category pills, always led by `all`.
    pub fn categories(&self) -> Vec<Category> {
        let mut categories = match &self.categories {
            Some(list) if !list.is_empty() => list.clone(),
            _ => return Category::defaults(),
        };

        if !categories.iter().any(|c| c.id == ALL_CATEGORIES) {
            categories.insert(0, Category::new(ALL_CATEGORIES, "All", "apps"));
        }
        categories
    }
}

fn default_session_dir() -> String {
    match std::env::var("HOME") {
        Ok(home) if !home.is_empty() => Path::new(&home)
            .join(".orbit")
            .to_string_lossy()
            .into_owned(),
        _ => ".orbit".to_string(),
    }
}

impl ConfigProvider for TomlConfig {
    fn backend_url(&self) -> &str {
        self.backend.url.as_deref().unwrap_or_default()
    }

    fn anon_key(&self) -> &str {
        self.backend.anon_key.as_deref().unwrap_or_default()
    }

    fn session_dir(&self) -> &str {
        // session.dir 在 CliConfig::resolve 時一定會被填入
        self.session.dir.as_deref().unwrap_or(".orbit")
    }

    fn feed_limit(&self) -> usize {
        self.feed.limit.unwrap_or(DEFAULT_FEED_LIMIT)
    }

    fn request_timeout_seconds(&self) -> u64 {
        self.backend.timeout_seconds.unwrap_or(DEFAULT_TIMEOUT_SECONDS)
    }
}

impl Validate for TomlConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}
