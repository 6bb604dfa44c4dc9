use serde::{Deserialize, Serialize};

pub const SERVICE_TYPE: &str = "serviceType";
pub const SERVICE: &str = "service.displayName.keyword";
pub const DATABASE_DISPLAY_NAME: &str = "database.displayName.keyword";
pub const DATABASE_SCHEMA_DISPLAY_NAME: &str = "databaseSchema.displayName.keyword";
pub const ENTITY_TYPE: &str = "entityType";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HierarchyMode {
    /// serviceType → service → database → schema
    Database,
    /// serviceType → service → entityType
    #[default]
    Entity,
}

/// 一條有序的 bucket 層級
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HierarchyChain {
    levels: Vec<String>,
}

impl HierarchyChain {
    pub fn new<I, S>(levels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            levels: levels.into_iter().map(Into::into).collect(),
        }
    }

    pub fn database() -> Self {
        Self::new([
            SERVICE_TYPE,
            SERVICE,
            DATABASE_DISPLAY_NAME,
            DATABASE_SCHEMA_DISPLAY_NAME,
        ])
    }

    pub fn entity() -> Self {
        Self::new([SERVICE_TYPE, SERVICE, ENTITY_TYPE])
    }

    pub fn for_mode(mode: HierarchyMode) -> Self {
        match mode {
            HierarchyMode::Database => Self::database(),
            HierarchyMode::Entity => Self::entity(),
        }
    }

    pub fn levels(&self) -> &[String] {
        &self.levels
    }

    pub fn first(&self) -> Option<&str> {
        self.levels.first().map(String::as_str)
    }

    /// `key` 的下一層；`key` 不在鏈上或已是最後一層時回傳 `None`
    pub fn next_after(&self, key: &str) -> Option<&str> {
        let position = self.levels.iter().position(|level| level == key)?;
        self.levels.get(position + 1).map(String::as_str)
    }

    pub fn is_terminal(&self, key: &str) -> bool {
        self.levels.last().is_some_and(|last| last == key)
    }
}
