use crate::domain::hierarchy::{HierarchyChain, HierarchyMode};
use crate::domain::filter::QuickFilterField;
use crate::domain::model::EntityInterface;
use crate::utils::error::Result;
use async_trait::async_trait;
use uuid::Uuid;

pub trait Storage: Send + Sync {
    fn read_file(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}

pub trait ConfigProvider: Send + Sync {
    fn null_option_key(&self) -> &str;
    fn quick_filters(&self) -> Vec<QuickFilterField>;
    fn hierarchy_chain(&self, mode: HierarchyMode) -> HierarchyChain;
}

/// 實體的持久化介面，每個版本都保留
#[async_trait]
pub trait EntityStore<T: EntityInterface>: Send + Sync {
    async fn get(&self, id: Uuid) -> Result<Option<T>>;
    async fn get_by_fqn(&self, fqn: &str) -> Result<Option<T>>;
    async fn list(&self) -> Result<Vec<T>>;
    /// 新增或覆蓋目前版本，並記錄到歷史
    async fn put(&self, entity: T) -> Result<()>;
    async fn remove(&self, id: Uuid) -> Result<Option<T>>;
    /// 所有版本，最新的在前
    async fn versions(&self, id: Uuid) -> Result<Vec<T>>;
}

/// 搜尋索引的寫入端
#[async_trait]
pub trait SearchSink: Send + Sync {
    async fn index(&self, id: Uuid, doc: serde_json::Value) -> Result<()>;
    async fn remove(&self, id: Uuid) -> Result<()>;
}
