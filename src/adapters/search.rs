use crate::domain::ports::SearchSink;
use crate::domain::query::{bucket_key, leaf_values, QueryFilter};
use crate::utils::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bucket {
    pub key: String,
    /// 文件中的原始值，查詢時以它建立 term
    pub value: Value,
    pub doc_count: u64,
}

/// 以文件數由多到少排序，同數量時依 key 排序
pub fn terms_aggregation<'a>(docs: impl IntoIterator<Item = &'a Value>, field: &str) -> Vec<Bucket> {
    let mut counts: BTreeMap<String, (&'a Value, u64)> = BTreeMap::new();
    for doc in docs {
        let mut keyed: Vec<(String, &'a Value)> = leaf_values(doc, field)
            .filter_map(|value| bucket_key(value).map(|key| (key, value)))
            .collect();
        // 同一文件只計一次
        keyed.sort_by(|a, b| a.0.cmp(&b.0));
        keyed.dedup_by(|a, b| a.0 == b.0);
        for (key, value) in keyed {
            counts.entry(key).or_insert((value, 0)).1 += 1;
        }
    }
    let mut buckets: Vec<Bucket> = counts
        .into_iter()
        .map(|(key, (value, doc_count))| Bucket {
            key,
            value: value.clone(),
            doc_count,
        })
        .collect();
    buckets.sort_by(|a, b| b.doc_count.cmp(&a.doc_count).then_with(|| a.key.cmp(&b.key)));
    buckets
}

/// 記憶體內的搜尋索引
#[derive(Debug, Default)]
pub struct InMemorySearchIndex {
    docs: RwLock<HashMap<Uuid, Value>>,
}

impl InMemorySearchIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.docs.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.docs.read().await.is_empty()
    }

    pub async fn get(&self, id: Uuid) -> Option<Value> {
        self.docs.read().await.get(&id).cloned()
    }

    /// 回傳符合查詢的文件，依 fullyQualifiedName 排序
    pub async fn search(&self, query: Option<&QueryFilter>) -> Vec<Value> {
        let docs = self.docs.read().await;
        let mut hits: Vec<Value> = docs
            .values()
            .filter(|doc| query.map_or(true, |q| q.matches(doc)))
            .cloned()
            .collect();
        hits.sort_by(|a, b| {
            let fqn = |v: &Value| v.get("fullyQualifiedName").and_then(Value::as_str).map(str::to_string);
            fqn(a).cmp(&fqn(b))
        });
        hits
    }

    pub async fn aggregate(&self, field: &str, query: Option<&QueryFilter>) -> Vec<Bucket> {
        let docs = self.docs.read().await;
        let scoped = docs.values().filter(|doc| query.map_or(true, |q| q.matches(doc)));
        terms_aggregation(scoped, field)
    }
}

#[async_trait]
impl SearchSink for InMemorySearchIndex {
    async fn index(&self, id: Uuid, doc: Value) -> Result<()> {
        self.docs.write().await.insert(id, doc);
        Ok(())
    }

    async fn remove(&self, id: Uuid) -> Result<()> {
        self.docs.write().await.remove(&id);
        Ok(())
    }
}
