use catalog_facets::adapters::memory::InMemoryEntityStore;
use catalog_facets::adapters::search::InMemorySearchIndex;
use catalog_facets::app::explorer::HierarchyExplorer;
use catalog_facets::app::selections::{query_from_selections, selections_from_query, Selections};
use catalog_facets::core::tree::find_node;
use catalog_facets::core::{ConfigProvider, SearchSink};
use catalog_facets::domain::hierarchy::HierarchyMode;
use catalog_facets::domain::model::{
    ApiCollection, ApiRequestMethod, ApiService, CreateApiEndpoint, EntityReference, TagLabel,
};
use catalog_facets::domain::query::QueryFilter;
use catalog_facets::{sub_level_hierarchy_key, ApiEndpointRepository, CatalogConfig};
use serde_json::json;
use std::io::Write;
use std::sync::Arc;
use tempfile::NamedTempFile;
use uuid::Uuid;

const CATALOG_TOML: &str = r#"
[catalog]
name = "facets"

[search]
null_option_key = "OM_NULL_FIELD"

[[quick_filters]]
label = "Owner"
key = "owner.displayName.keyword"

[[quick_filters]]
label = "Tag"
key = "tags.tagFQN"

[[quick_filters]]
label = "Service Type"
key = "serviceType"
"#;

fn config_from_file() -> anyhow::Result<CatalogConfig> {
    let mut file = NamedTempFile::new()?;
    file.write_all(CATALOG_TOML.as_bytes())?;
    Ok(CatalogConfig::from_file(file.path())?)
}

fn selections(entries: &[(&str, &[&str])]) -> Selections {
    entries
        .iter()
        .map(|(label, values)| (label.to_string(), values.iter().map(|v| v.to_string()).collect()))
        .collect()
}

async fn populated_index() -> anyhow::Result<Arc<InMemorySearchIndex>> {
    let index = Arc::new(InMemorySearchIndex::new());
    let repository =
        ApiEndpointRepository::new(InMemoryEntityStore::new()).with_search_sink(index.clone());

    let service = ApiService::new("sample_api", "Rest");
    let users = ApiCollection::new(&service, "users")?;
    repository.register_collection(users.clone()).await;

    let mut alice = EntityReference::user("alice");
    alice.display_name = Some("Alice".to_string());

    for (name, owner, tag) in [
        ("listUsers", Some(alice.clone()), Some("PII.Sensitive")),
        ("getUser", Some(alice), None),
        ("health", None, None),
    ] {
        let mut request = CreateApiEndpoint::new(name)
            .with_api_collection(Some(&users.fully_qualified_name))
            .with_endpoint_url(Some("https://localhost:8585/api/v1/users"))
            .with_request_method(ApiRequestMethod::Get);
        if let Some(owner) = owner {
            request = request.with_owner(owner);
        }
        if let Some(tag) = tag {
            request = request.with_tags(vec![TagLabel::classification(tag)]);
        }
        repository.create(&request, "admin").await?;
    }

    index
        .index(
            Uuid::new_v4(),
            json!({"fullyQualifiedName": "mysql.db.orders", "serviceType": "Mysql",
                   "service": {"displayName": "mysql"}, "entityType": "table"}),
        )
        .await?;
    Ok(index)
}

#[tokio::test]
async fn quick_filter_selections_narrow_search_results() -> anyhow::Result<()> {
    let config = config_from_file()?;
    let index = populated_index().await?;

    let query = query_from_selections(&config, &selections(&[("Owner", &["Alice"])]));
    let hits = index.search(query.as_ref()).await;
    assert_eq!(hits.len(), 2);
    assert!(hits.iter().all(|doc| doc["owner"]["displayName"] == "Alice"));

    // 「沒有 owner」的文件
    let query = query_from_selections(&config, &selections(&[("Owner", &["OM_NULL_FIELD"])]));
    let names: Vec<_> = index
        .search(query.as_ref())
        .await
        .iter()
        .map(|doc| doc["fullyQualifiedName"].clone())
        .collect();
    assert_eq!(names, vec![json!("mysql.db.orders"), json!("sample_api.users.health")]);

    // 不同欄位之間為 AND，同一欄位內為 OR
    let query = query_from_selections(
        &config,
        &selections(&[("Owner", &["Alice", "OM_NULL_FIELD"]), ("Tag", &["PII.Sensitive"])]),
    );
    let hits = index.search(query.as_ref()).await;
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0]["name"], "listUsers");

    assert_eq!(index.search(None).await.len(), 4);
    Ok(())
}

#[tokio::test]
async fn selections_survive_query_serialization() -> anyhow::Result<()> {
    let config = config_from_file()?;
    let input = selections(&[
        ("Owner", &["Alice", "OM_NULL_FIELD"]),
        ("Service Type", &["Rest"]),
    ]);

    let query = query_from_selections(&config, &input).expect("query for selections");
    let wire = serde_json::to_string(&query)?;
    let parsed: QueryFilter = serde_json::from_str(&wire)?;

    assert_eq!(selections_from_query(&config, Some(&parsed)), input);
    Ok(())
}

#[tokio::test]
async fn explorer_walks_entity_hierarchy() -> anyhow::Result<()> {
    let config = config_from_file()?;
    let index = populated_index().await?;
    let mut explorer =
        HierarchyExplorer::new(index.as_ref(), config.hierarchy_chain(HierarchyMode::Entity));

    let root = explorer.load_root().await;
    let titles: Vec<&str> = root.iter().map(|n| n.title.as_str()).collect();
    assert_eq!(titles, vec!["Rest", "Mysql"]);

    let tree = explorer.expand(&root, "serviceType=Rest").await;
    let rest = find_node(&tree, "serviceType=Rest").expect("rest node");
    let services = rest.children.as_ref().expect("services loaded");
    assert_eq!(services.len(), 1);
    assert_eq!(services[0].title, "sample_api");
    assert_eq!(services[0].count, Some(3));
    assert!(Arc::ptr_eq(&tree[1], &root[1]));
    Ok(())
}

#[test]
fn database_hierarchy_restarts_after_schema_level() {
    let level = sub_level_hierarchy_key(HierarchyMode::Database, Some("serviceType"), Some("Mysql"));
    assert_eq!(level.bucket, "service.displayName.keyword");
    assert_eq!(
        serde_json::to_value(&level.query_filter).unwrap(),
        json!({"query": {"bool": {"must": [{"term": {"serviceType": "Mysql"}}]}}})
    );

    let level = sub_level_hierarchy_key(
        HierarchyMode::Database,
        Some("databaseSchema.displayName.keyword"),
        Some("public"),
    );
    assert_eq!(level.bucket, "serviceType");
}
