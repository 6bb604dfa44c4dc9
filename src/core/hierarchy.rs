use serde::{Deserialize, Serialize};

use crate::domain::hierarchy::{HierarchyChain, HierarchyMode};
use crate::domain::query::{BoolQuery, Clause, QueryFilter};

/// 下一層要聚合的 bucket 與限定範圍的查詢
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubLevel {
    pub bucket: String,
    pub query_filter: QueryFilter,
}

/// 以內建的階層鏈解析下一層
pub fn sub_level_hierarchy_key(
    mode: HierarchyMode,
    key: Option<&str>,
    value: Option<&str>,
) -> SubLevel {
    resolve_sub_level(&HierarchyChain::for_mode(mode), key, value)
}

/// 給定目前層級的 key 與點選的值，決定下一個 bucket。
///
/// key 與 value 都有時，查詢為 `must: [term {key: value}]`，否則為空的 `bool`。
/// key 未提供、不在鏈上或已是最後一層時，bucket 回到第一層。
pub fn resolve_sub_level(chain: &HierarchyChain, key: Option<&str>, value: Option<&str>) -> SubLevel {
    let query_filter = match (key, value) {
        (Some(key), Some(value)) => {
            QueryFilter::new(BoolQuery::must(vec![Clause::term(key, value)]))
        }
        _ => QueryFilter::match_all(),
    };

    let bucket = key
        .and_then(|key| chain.next_after(key))
        .or_else(|| chain.first())
        .unwrap_or_default()
        .to_string();

    tracing::debug!(?key, ?value, %bucket, "Resolved sub level hierarchy key");
    SubLevel {
        bucket,
        query_filter,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::hierarchy::{
        DATABASE_DISPLAY_NAME, DATABASE_SCHEMA_DISPLAY_NAME, ENTITY_TYPE, SERVICE, SERVICE_TYPE,
    };
    use serde_json::json;

    #[test]
    fn test_no_key_returns_first_level_and_empty_query() {
        let level = sub_level_hierarchy_key(HierarchyMode::Database, None, None);
        assert_eq!(level.bucket, SERVICE_TYPE);
        assert_eq!(
            serde_json::to_value(&level.query_filter).unwrap(),
            json!({"query": {"bool": {}}})
        );
    }

    #[test]
    fn test_database_chain() {
        let level = sub_level_hierarchy_key(HierarchyMode::Database, Some(SERVICE_TYPE), Some("mysql"));
        assert_eq!(level.bucket, SERVICE);
        assert_eq!(
            serde_json::to_value(&level.query_filter).unwrap(),
            json!({"query": {"bool": {"must": [{"term": {"serviceType": "mysql"}}]}}})
        );

        let level = sub_level_hierarchy_key(HierarchyMode::Database, Some(SERVICE), Some("prod"));
        assert_eq!(level.bucket, DATABASE_DISPLAY_NAME);

        let level =
            sub_level_hierarchy_key(HierarchyMode::Database, Some(DATABASE_DISPLAY_NAME), Some("db"));
        assert_eq!(level.bucket, DATABASE_SCHEMA_DISPLAY_NAME);
    }

    #[test]
    fn test_entity_chain() {
        let level = sub_level_hierarchy_key(HierarchyMode::Entity, Some(SERVICE), Some("sample_api"));
        assert_eq!(level.bucket, ENTITY_TYPE);
    }

    #[test]
    fn test_terminal_or_unknown_key_falls_back_to_first_level() {
        let level = sub_level_hierarchy_key(HierarchyMode::Entity, Some(ENTITY_TYPE), Some("table"));
        assert_eq!(level.bucket, SERVICE_TYPE);
        assert_eq!(level.query_filter.bool_query().must.len(), 1);

        let level = sub_level_hierarchy_key(HierarchyMode::Entity, Some("owner"), None);
        assert_eq!(level.bucket, SERVICE_TYPE);
        assert!(level.query_filter.is_empty());
    }

    #[test]
    fn test_custom_chain() {
        let chain = HierarchyChain::new(["domain.displayName.keyword", "entityType"]);
        let level = resolve_sub_level(&chain, None, None);
        assert_eq!(level.bucket, "domain.displayName.keyword");
        let level = resolve_sub_level(&chain, Some("domain.displayName.keyword"), Some("Finance"));
        assert_eq!(level.bucket, "entityType");
    }
}
