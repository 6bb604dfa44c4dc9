use crate::core::ConfigProvider;
use crate::domain::filter::{QuickFilterField, NULL_OPTION_KEY};
use crate::domain::hierarchy::{HierarchyChain, HierarchyMode, ENTITY_TYPE, SERVICE, SERVICE_TYPE};
use crate::utils::error::{CatalogError, Result};
use crate::utils::validation::{validate_non_empty_string, validate_unique, Validate};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogConfig {
    pub catalog: CatalogInfo,
    pub search: Option<SearchConfig>,
    pub hierarchy: Option<HierarchyConfig>,
    #[serde(default)]
    pub quick_filters: Vec<QuickFilterConfig>,
    pub logging: Option<LoggingConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogInfo {
    pub name: String,
    pub description: Option<String>,
    pub version: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// 代表「欄位不存在」的選取值
    pub null_option_key: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HierarchyConfig {
    pub default_mode: Option<HierarchyMode>,
    pub database: Option<Vec<String>>,
    pub entity: Option<Vec<String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuickFilterConfig {
    pub label: String,
    pub key: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub verbose: Option<bool>,
    pub json: Option<bool>,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        let quick_filter = |label: &str, key: &str| QuickFilterConfig {
            label: label.to_string(),
            key: key.to_string(),
        };
        Self {
            catalog: CatalogInfo {
                name: "default".to_string(),
                description: None,
                version: None,
            },
            search: None,
            hierarchy: None,
            quick_filters: vec![
                quick_filter("Domain", "domain.displayName.keyword"),
                quick_filter("Owner", "owner.displayName.keyword"),
                quick_filter("Tag", "tags.tagFQN"),
                quick_filter("Tier", "tier.tagFQN"),
                quick_filter("Service", SERVICE),
                quick_filter("Service Type", SERVICE_TYPE),
                quick_filter("Entity Type", ENTITY_TYPE),
            ],
            logging: None,
        }
    }
}

impl CatalogConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(CatalogError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| CatalogError::ConfigError {
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${CATALOG_NAME})
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| CatalogError::ConfigError {
            message: format!("Invalid substitution pattern: {}", e),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    pub fn default_mode(&self) -> HierarchyMode {
        self.hierarchy
            .as_ref()
            .and_then(|h| h.default_mode)
            .unwrap_or_default()
    }

    /// 命令列旗標與 `[logging]` 任一開啟即生效，回傳 `(verbose, json)`
    pub fn logging_flags(&self, verbose: bool, json: bool) -> (bool, bool) {
        let logging = self.logging.as_ref();
        (
            verbose || logging.and_then(|l| l.verbose).unwrap_or(false),
            json || logging.and_then(|l| l.json).unwrap_or(false),
        )
    }

    fn configured_chain(&self, mode: HierarchyMode) -> Option<&Vec<String>> {
        let hierarchy = self.hierarchy.as_ref()?;
        match mode {
            HierarchyMode::Database => hierarchy.database.as_ref(),
            HierarchyMode::Entity => hierarchy.entity.as_ref(),
        }
    }

    /// 驗證配置的合理性
    pub fn validate_config(&self) -> Result<()> {
        validate_non_empty_string("catalog.name", &self.catalog.name)?;
        validate_non_empty_string("search.null_option_key", self.null_option_key())?;

        for filter in &self.quick_filters {
            validate_non_empty_string("quick_filters.label", &filter.label)?;
            validate_non_empty_string("quick_filters.key", &filter.key)?;
        }
        validate_unique(
            "quick_filters.label",
            self.quick_filters.iter().map(|f| f.label.as_str()),
        )?;
        // 同一個 key 對應兩個 label 時，還原出的選取值會重複
        validate_unique(
            "quick_filters.key",
            self.quick_filters.iter().map(|f| f.key.as_str()),
        )?;

        for (field, mode) in [
            ("hierarchy.database", HierarchyMode::Database),
            ("hierarchy.entity", HierarchyMode::Entity),
        ] {
            if let Some(levels) = self.configured_chain(mode) {
                if levels.is_empty() {
                    return Err(CatalogError::InvalidConfigValueError {
                        field: field.to_string(),
                        value: "[]".to_string(),
                        reason: "Hierarchy must have at least one level".to_string(),
                    });
                }
                validate_unique(field, levels.iter().map(String::as_str))?;
            }
        }

        Ok(())
    }
}

impl ConfigProvider for CatalogConfig {
    fn null_option_key(&self) -> &str {
        self.search
            .as_ref()
            .and_then(|s| s.null_option_key.as_deref())
            .unwrap_or(NULL_OPTION_KEY)
    }

    fn quick_filters(&self) -> Vec<QuickFilterField> {
        self.quick_filters
            .iter()
            .map(|f| QuickFilterField::new(f.label.clone(), f.key.clone()))
            .collect()
    }

    fn hierarchy_chain(&self, mode: HierarchyMode) -> HierarchyChain {
        match self.configured_chain(mode) {
            Some(levels) => HierarchyChain::new(levels.iter().cloned()),
            None => HierarchyChain::for_mode(mode),
        }
    }
}

impl Validate for CatalogConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_parse_basic_toml_config() {
        let toml_content = r#"
[catalog]
name = "test-catalog"

[search]
null_option_key = "__none__"

[hierarchy]
default_mode = "database"
entity = ["serviceType", "entityType"]

[[quick_filters]]
label = "Owner"
key = "owner.displayName.keyword"

[[quick_filters]]
label = "Tag"
key = "tags.tagFQN"
"#;

        let config = CatalogConfig::from_toml_str(toml_content).unwrap();

        assert_eq!(config.catalog.name, "test-catalog");
        assert_eq!(config.null_option_key(), "__none__");
        assert_eq!(config.default_mode(), HierarchyMode::Database);
        assert_eq!(config.quick_filters().len(), 2);
        assert_eq!(
            config.hierarchy_chain(HierarchyMode::Entity).next_after("serviceType"),
            Some("entityType")
        );
        assert_eq!(
            config.hierarchy_chain(HierarchyMode::Database),
            HierarchyChain::database()
        );
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_env_var_substitution() {
        std::env::set_var("TEST_CATALOG_NAME", "from-env");

        let toml_content = r#"
[catalog]
name = "${TEST_CATALOG_NAME}"
"#;

        let config = CatalogConfig::from_toml_str(toml_content).unwrap();
        assert_eq!(config.catalog.name, "from-env");

        std::env::remove_var("TEST_CATALOG_NAME");
    }

    #[test]
    fn test_config_validation() {
        let toml_content = r#"
[catalog]
name = "dup"

[[quick_filters]]
label = "Owner"
key = "owner.displayName.keyword"

[[quick_filters]]
label = "Owner"
key = "owners.displayName.keyword"
"#;

        let config = CatalogConfig::from_toml_str(toml_content).unwrap();
        assert!(config.validate().is_err());

        let empty_chain = r#"
[catalog]
name = "x"

[hierarchy]
database = []
"#;
        let config = CatalogConfig::from_toml_str(empty_chain).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_duplicate_quick_filter_keys_rejected() {
        let toml_content = r#"
[catalog]
name = "dup-keys"

[[quick_filters]]
label = "Owner"
key = "owner.displayName.keyword"

[[quick_filters]]
label = "Owned By"
key = "owner.displayName.keyword"
"#;

        let config = CatalogConfig::from_toml_str(toml_content).unwrap();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("quick_filters.key"));
    }

    #[test]
    fn test_logging_section_combines_with_flags() {
        let toml_content = r#"
[catalog]
name = "logs"

[logging]
json = true
"#;

        let config = CatalogConfig::from_toml_str(toml_content).unwrap();
        assert_eq!(config.logging_flags(false, false), (false, true));
        assert_eq!(config.logging_flags(true, false), (true, true));
        assert_eq!(CatalogConfig::default().logging_flags(false, false), (false, false));
    }

    #[test]
    fn test_defaults() {
        let config = CatalogConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.null_option_key(), NULL_OPTION_KEY);
        assert_eq!(config.default_mode(), HierarchyMode::Entity);
        assert!(config.quick_filters().iter().any(|f| f.label == "Owner"));
    }

    #[test]
    fn test_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();

        let toml_content = r#"
[catalog]
name = "file-test"
"#;

        temp_file.write_all(toml_content.as_bytes()).unwrap();

        let config = CatalogConfig::from_file(temp_file.path()).unwrap();
        assert_eq!(config.catalog.name, "file-test");
    }
}
