use thiserror::Error;

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Invalid value '{value}' for {field}: {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },

    /// 建立/更新請求驗證失敗，訊息格式為 `[a must not be null, b ...]`
    #[error("[{}]", violations.join(", "))]
    InvalidRequest { violations: Vec<String> },

    #[error("Invalid field name {field}")]
    InvalidField { field: String },

    #[error("{entity_type} instance for {key} not found")]
    EntityNotFound { entity_type: String, key: String },

    #[error("Entity already exists: {fqn}")]
    EntityAlreadyExists { fqn: String },

    #[error("Invalid patch: {message}")]
    InvalidPatch { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Io,
    Configuration,
    Request,
    NotFound,
    Conflict,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl CatalogError {
    pub fn not_found(entity_type: &str, key: impl Into<String>) -> Self {
        CatalogError::EntityNotFound {
            entity_type: entity_type.to_string(),
            key: key.into(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            CatalogError::IoError(_) | CatalogError::SerializationError(_) => ErrorCategory::Io,
            CatalogError::ConfigError { .. }
            | CatalogError::InvalidConfigValueError { .. }
            | CatalogError::MissingConfigError { .. } => ErrorCategory::Configuration,
            CatalogError::InvalidRequest { .. }
            | CatalogError::InvalidField { .. }
            | CatalogError::InvalidPatch { .. } => ErrorCategory::Request,
            CatalogError::EntityNotFound { .. } => ErrorCategory::NotFound,
            CatalogError::EntityAlreadyExists { .. } => ErrorCategory::Conflict,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::Io => ErrorSeverity::Critical,
            ErrorCategory::Configuration => ErrorSeverity::High,
            ErrorCategory::Request | ErrorCategory::NotFound => ErrorSeverity::High,
            ErrorCategory::Conflict => ErrorSeverity::Medium,
        }
    }

    /// 對應 REST 介面的狀態碼
    pub fn status_code(&self) -> u16 {
        match self.category() {
            ErrorCategory::Request => 400,
            ErrorCategory::NotFound => 404,
            ErrorCategory::Conflict => 409,
            ErrorCategory::Configuration | ErrorCategory::Io => 500,
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            CatalogError::IoError(_) => "Check that the file exists and is readable",
            CatalogError::SerializationError(_) => "Check that the input is valid JSON",
            CatalogError::ConfigError { .. }
            | CatalogError::InvalidConfigValueError { .. }
            | CatalogError::MissingConfigError { .. } => {
                "Review the catalog configuration file and fix the reported field"
            }
            CatalogError::InvalidRequest { .. } => "Provide every required attribute",
            CatalogError::InvalidField { .. } => {
                "Use only supported names in the fields parameter"
            }
            CatalogError::EntityNotFound { .. } => "Check the id or fully qualified name",
            CatalogError::EntityAlreadyExists { .. } => "Use PUT to update the existing entity",
            CatalogError::InvalidPatch { .. } => "Patch only mutable attributes",
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self.category() {
            ErrorCategory::Io => format!("Could not read or write data: {}", self),
            ErrorCategory::Configuration => format!("Configuration problem: {}", self),
            ErrorCategory::Request => format!("Bad request: {}", self),
            ErrorCategory::NotFound => format!("Not found: {}", self),
            ErrorCategory::Conflict => format!("Conflict: {}", self),
        }
    }
}

pub type Result<T> = std::result::Result<T, CatalogError>;
