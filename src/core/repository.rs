//! API endpoint 的建立、查詢、更新與版本紀錄。

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

use crate::core::change::{apply_change, UpdateType};
use crate::core::search_index::{ApiEndpointIndex, SearchIndex};
use crate::domain::model::{
    ApiCollection, ApiEndpoint, ApiSchema, CreateApiEndpoint, EntityReference, Field, Fields, Include,
    API_COLLECTION, API_ENDPOINT, FIELD_FOLLOWERS, FIELD_OWNER, FIELD_TAGS, TEAM,
    USER,
};
use crate::domain::ports::{EntityStore, SearchSink};
use crate::utils::error::{CatalogError, Result};
use crate::utils::fqn::FullyQualifiedName;
use crate::utils::validation::{validate_range, validate_url, Violations};

/// `fields` 參數可用的名稱
pub const FIELDS: &[&str] = &[FIELD_OWNER, FIELD_FOLLOWERS, FIELD_TAGS];

pub const DEFAULT_LIMIT: usize = 10;
pub const MAX_LIMIT: usize = 1_000_000;

const IMMUTABLE_FIELDS: &[&str] = &["id", "name", "fullyQualifiedName", "apiCollection", "service"];

#[derive(Debug, Clone, Default)]
pub struct ListParams {
    pub api_collection: Option<String>,
    pub service: Option<String>,
    pub fields: Option<String>,
    pub limit: Option<usize>,
    pub after: Option<String>,
    pub include: Include,
}

impl ListParams {
    pub fn for_collection(fqn: &str) -> Self {
        Self {
            api_collection: Some(fqn.to_string()),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Paging {
    pub total: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub after: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultList<T> {
    pub data: Vec<T>,
    pub paging: Paging,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PutStatus {
    Created,
    Ok,
}

#[derive(Debug, Clone)]
pub struct PutResponse {
    pub entity: ApiEndpoint,
    pub status: PutStatus,
    /// 新建立的實體為 `NoChange`
    pub update_type: UpdateType,
}

pub struct ApiEndpointRepository<S: EntityStore<ApiEndpoint>> {
    store: S,
    collections: RwLock<HashMap<String, ApiCollection>>,
    search: Option<Arc<dyn SearchSink>>,
    // 寫入操作依序執行，讀-改-寫之間不會交錯
    write_lock: Mutex<()>,
}

impl<S: EntityStore<ApiEndpoint>> ApiEndpointRepository<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            collections: RwLock::new(HashMap::new()),
            search: None,
            write_lock: Mutex::new(()),
        }
    }

    pub fn with_search_sink(mut self, sink: Arc<dyn SearchSink>) -> Self {
        self.search = Some(sink);
        self
    }

    pub async fn register_collection(&self, collection: ApiCollection) {
        tracing::debug!("Registering api collection {}", collection.fully_qualified_name);
        self.collections
            .write()
            .await
            .insert(collection.fully_qualified_name.clone(), collection);
    }

    pub async fn create(&self, request: &CreateApiEndpoint, user: &str) -> Result<ApiEndpoint> {
        let _guard = self.write_lock.lock().await;
        let entity = self.prepare(request, user).await?;
        if self.store.get_by_fqn(&entity.fully_qualified_name).await?.is_some() {
            return Err(CatalogError::EntityAlreadyExists {
                fqn: entity.fully_qualified_name,
            });
        }
        self.persist(&entity).await?;
        tracing::info!("✅ Created {} {}", API_ENDPOINT, entity.fully_qualified_name);
        Ok(entity)
    }

    pub async fn get(&self, id: Uuid, fields: Option<&str>, include: Include) -> Result<ApiEndpoint> {
        let fields = Fields::parse(fields, FIELDS)?;
        let entity = self
            .store
            .get(id)
            .await?
            .filter(|e| include.admits(e.deleted))
            .ok_or_else(|| CatalogError::not_found(API_ENDPOINT, id.to_string()))?;
        Ok(set_fields(entity, &fields))
    }

    pub async fn get_by_name(&self, fqn: &str, fields: Option<&str>, include: Include) -> Result<ApiEndpoint> {
        let fields = Fields::parse(fields, FIELDS)?;
        let entity = self
            .store
            .get_by_fqn(fqn)
            .await?
            .filter(|e| include.admits(e.deleted))
            .ok_or_else(|| CatalogError::not_found(API_ENDPOINT, fqn))?;
        Ok(set_fields(entity, &fields))
    }

    pub async fn list(&self, params: &ListParams) -> Result<ResultList<ApiEndpoint>> {
        let fields = Fields::parse(params.fields.as_deref(), FIELDS)?;
        let limit = params.limit.unwrap_or(DEFAULT_LIMIT);
        validate_range("limit", limit, 1, MAX_LIMIT).map_err(|e| CatalogError::InvalidRequest {
            violations: vec![e.to_string()],
        })?;

        let mut matching: Vec<ApiEndpoint> = self
            .store
            .list()
            .await?
            .into_iter()
            .filter(|e| params.include.admits(e.deleted))
            .filter(|e| {
                params
                    .api_collection
                    .as_deref()
                    .map_or(true, |fqn| e.api_collection.fully_qualified_name == fqn)
            })
            .filter(|e| {
                params
                    .service
                    .as_deref()
                    .map_or(true, |fqn| e.service.fully_qualified_name == fqn)
            })
            .collect();
        matching.sort_by(|a, b| a.fully_qualified_name.cmp(&b.fully_qualified_name));
        let total = matching.len();

        let remaining: Vec<ApiEndpoint> = matching
            .into_iter()
            .filter(|e| {
                params
                    .after
                    .as_deref()
                    .map_or(true, |after| e.fully_qualified_name.as_str() > after)
            })
            .collect();
        let has_more = remaining.len() > limit;
        let data: Vec<ApiEndpoint> = remaining
            .into_iter()
            .take(limit)
            .map(|e| set_fields(e, &fields))
            .collect();
        let after = if has_more {
            data.last().map(|e| e.fully_qualified_name.clone())
        } else {
            None
        };

        tracing::debug!("Listed {} of {} api endpoints", data.len(), total);
        Ok(ResultList {
            data,
            paging: Paging { total, after },
        })
    }

    /// PUT：不存在時建立，存在時套用請求並記錄變更
    pub async fn create_or_update(&self, request: &CreateApiEndpoint, user: &str) -> Result<PutResponse> {
        let _guard = self.write_lock.lock().await;
        let prepared = self.prepare(request, user).await?;
        let Some(original) = self.store.get_by_fqn(&prepared.fully_qualified_name).await? else {
            self.persist(&prepared).await?;
            tracing::info!("✅ Created {} {}", API_ENDPOINT, prepared.fully_qualified_name);
            return Ok(PutResponse {
                entity: prepared,
                status: PutStatus::Created,
                update_type: UpdateType::NoChange,
            });
        };

        let mut updated = original.clone();
        if prepared.display_name.is_some() {
            updated.display_name = prepared.display_name;
        }
        if prepared.description.is_some() {
            updated.description = prepared.description;
        }
        if prepared.owner.is_some() {
            updated.owner = prepared.owner;
        }
        if prepared.request_method.is_some() {
            updated.request_method = prepared.request_method;
        }
        if prepared.request_schema.is_some() {
            updated.request_schema = prepared.request_schema;
        }
        if prepared.response_schema.is_some() {
            updated.response_schema = prepared.response_schema;
        }
        if prepared.tags.as_ref().is_some_and(|tags| !tags.is_empty()) {
            updated.tags = prepared.tags;
        }
        updated.endpoint_url = prepared.endpoint_url;
        // PUT 會還原軟刪除的實體
        if original.deleted {
            updated.deleted = false;
            tracing::info!("♻️ Restoring {} {}", API_ENDPOINT, original.fully_qualified_name);
        }

        self.store_update(&original, updated, user).await
    }

    /// PATCH：以 JSON merge patch 修改實體
    pub async fn patch(&self, id: Uuid, patch: &Value, user: &str) -> Result<PutResponse> {
        let _guard = self.write_lock.lock().await;
        let original = self
            .store
            .get(id)
            .await?
            .filter(|e| !e.deleted)
            .ok_or_else(|| CatalogError::not_found(API_ENDPOINT, id.to_string()))?;

        if let Some(patch_map) = patch.as_object() {
            if let Some(field) = IMMUTABLE_FIELDS.iter().find(|f| patch_map.contains_key(**f)) {
                return Err(CatalogError::InvalidPatch {
                    message: format!("{} cannot be changed", field),
                });
            }
        }

        let mut document = serde_json::to_value(&original)?;
        merge_patch(&mut document, patch);
        let mut updated: ApiEndpoint =
            serde_json::from_value(document).map_err(|e| CatalogError::InvalidPatch {
                message: e.to_string(),
            })?;
        validate_owner(updated.owner.as_ref())?;
        validate_url("endpointURL", updated.endpoint_url.as_str()).map_err(|e| {
            CatalogError::InvalidPatch {
                message: e.to_string(),
            }
        })?;
        if let Some(schema) = updated.request_schema.as_mut() {
            set_schema_fqns(&original.fully_qualified_name, "requestSchema", schema)?;
        }
        if let Some(schema) = updated.response_schema.as_mut() {
            set_schema_fqns(&original.fully_qualified_name, "responseSchema", schema)?;
        }

        self.store_update(&original, updated, user).await
    }

    pub async fn add_follower(&self, id: Uuid, follower: EntityReference, user: &str) -> Result<PutResponse> {
        if follower.entity_type != USER {
            return Err(CatalogError::InvalidRequest {
                violations: vec![format!("Entity type {} can't follow", follower.entity_type)],
            });
        }
        let _guard = self.write_lock.lock().await;
        let original = self.current(id).await?;
        let mut updated = original.clone();
        let followers = updated.followers.get_or_insert_with(Vec::new);
        if !followers.iter().any(|f| f.id == follower.id) {
            followers.push(follower);
        }
        self.store_update(&original, updated, user).await
    }

    pub async fn remove_follower(&self, id: Uuid, follower_id: Uuid, user: &str) -> Result<PutResponse> {
        let _guard = self.write_lock.lock().await;
        let original = self.current(id).await?;
        let mut updated = original.clone();
        if let Some(followers) = updated.followers.as_mut() {
            followers.retain(|f| f.id != follower_id);
        }
        self.store_update(&original, updated, user).await
    }

    /// 軟刪除只標記 `deleted`；硬刪除移除實體與索引文件
    pub async fn delete(&self, id: Uuid, hard_delete: bool, user: &str) -> Result<ApiEndpoint> {
        let _guard = self.write_lock.lock().await;
        let original = self
            .store
            .get(id)
            .await?
            .ok_or_else(|| CatalogError::not_found(API_ENDPOINT, id.to_string()))?;

        if hard_delete {
            self.store.remove(id).await?;
            if let Some(search) = &self.search {
                search.remove(id).await?;
            }
            tracing::info!("🗑️ Hard deleted {} {}", API_ENDPOINT, original.fully_qualified_name);
            return Ok(original);
        }

        if original.deleted {
            return Err(CatalogError::not_found(API_ENDPOINT, id.to_string()));
        }
        let mut updated = original.clone();
        updated.deleted = true;
        let response = self.store_update(&original, updated, user).await?;
        tracing::info!("🗑️ Soft deleted {} {}", API_ENDPOINT, original.fully_qualified_name);
        Ok(response.entity)
    }

    /// 所有版本，最新的在前
    pub async fn list_versions(&self, id: Uuid) -> Result<Vec<ApiEndpoint>> {
        let versions = self.store.versions(id).await?;
        if versions.is_empty() {
            return Err(CatalogError::not_found(API_ENDPOINT, id.to_string()));
        }
        Ok(versions)
    }

    pub async fn get_version(&self, id: Uuid, version: f64) -> Result<ApiEndpoint> {
        self.list_versions(id)
            .await?
            .into_iter()
            .find(|e| (e.version - version).abs() < 1e-9)
            .ok_or_else(|| CatalogError::not_found(API_ENDPOINT, format!("{} version {}", id, version)))
    }

    async fn current(&self, id: Uuid) -> Result<ApiEndpoint> {
        self.store
            .get(id)
            .await?
            .filter(|e| !e.deleted)
            .ok_or_else(|| CatalogError::not_found(API_ENDPOINT, id.to_string()))
    }

    async fn store_update(
        &self,
        original: &ApiEndpoint,
        mut updated: ApiEndpoint,
        user: &str,
    ) -> Result<PutResponse> {
        let update_type = apply_change(original, &mut updated, user);
        if update_type != UpdateType::NoChange {
            self.persist(&updated).await?;
            tracing::info!(
                "📝 Updated {} {} ({:?}, version {})",
                API_ENDPOINT,
                updated.fully_qualified_name,
                update_type,
                updated.version
            );
        }
        Ok(PutResponse {
            entity: updated,
            status: PutStatus::Ok,
            update_type,
        })
    }

    async fn persist(&self, entity: &ApiEndpoint) -> Result<()> {
        self.store.put(entity.clone()).await?;
        if let Some(search) = &self.search {
            let doc = ApiEndpointIndex::new(entity).build_search_index_doc();
            search.index(entity.id, doc).await?;
        }
        Ok(())
    }

    /// 驗證請求並建出新的實體 (尚未儲存)
    async fn prepare(&self, request: &CreateApiEndpoint, user: &str) -> Result<ApiEndpoint> {
        Violations::new()
            .require("name", &request.name)
            .size("name", request.name.as_deref(), 1, 256)
            .require("apiCollection", &request.api_collection)
            .require("endpointURL", &request.endpoint_url)
            .finish()?;

        let (Some(name), Some(collection_fqn), Some(endpoint_url)) = (
            request.name.as_deref(),
            request.api_collection.as_deref(),
            request.endpoint_url.as_deref(),
        ) else {
            return Err(CatalogError::InvalidRequest {
                violations: vec!["request is incomplete".to_string()],
            });
        };

        let endpoint_url = validate_url("endpointURL", endpoint_url).map_err(|e| {
            CatalogError::InvalidRequest {
                violations: vec![e.to_string()],
            }
        })?;
        validate_owner(request.owner.as_ref())?;

        let collection = self
            .collections
            .read()
            .await
            .get(collection_fqn)
            .cloned()
            .ok_or_else(|| CatalogError::not_found(API_COLLECTION, collection_fqn))?;

        let fully_qualified_name = FullyQualifiedName::add(&collection.fully_qualified_name, name)?;
        let mut request_schema = request.request_schema.clone();
        if let Some(schema) = request_schema.as_mut() {
            set_schema_fqns(&fully_qualified_name, "requestSchema", schema)?;
        }
        let mut response_schema = request.response_schema.clone();
        if let Some(schema) = response_schema.as_mut() {
            set_schema_fqns(&fully_qualified_name, "responseSchema", schema)?;
        }

        Ok(ApiEndpoint {
            id: Uuid::new_v4(),
            name: name.to_string(),
            display_name: request.display_name.clone(),
            fully_qualified_name,
            description: request.description.clone(),
            endpoint_url,
            request_method: request.request_method,
            request_schema,
            response_schema,
            api_collection: collection.reference(),
            service: collection.service.clone(),
            service_type: collection.service_type.clone(),
            owner: request.owner.clone(),
            followers: Some(Vec::new()),
            tags: Some(request.tags.clone()),
            version: 0.1,
            updated_at: Utc::now(),
            updated_by: user.to_string(),
            change_description: None,
            deleted: false,
        })
    }
}

fn validate_owner(owner: Option<&EntityReference>) -> Result<()> {
    match owner {
        Some(owner) if owner.entity_type != USER && owner.entity_type != TEAM => {
            Err(CatalogError::InvalidRequest {
                violations: vec![format!("Entity type {} can't be an owner", owner.entity_type)],
            })
        }
        _ => Ok(()),
    }
}

/// 依 `fields` 參數決定要回傳的關聯
fn set_fields(mut entity: ApiEndpoint, fields: &Fields) -> ApiEndpoint {
    if !fields.contains(FIELD_OWNER) {
        entity.owner = None;
    }
    entity.followers = if fields.contains(FIELD_FOLLOWERS) {
        Some(entity.followers.unwrap_or_default())
    } else {
        None
    };
    entity.tags = if fields.contains(FIELD_TAGS) {
        Some(entity.tags.unwrap_or_default())
    } else {
        None
    };
    entity
}

fn set_schema_fqns(endpoint_fqn: &str, schema_name: &str, schema: &mut ApiSchema) -> Result<()> {
    fn walk(parent: &str, fields: &mut [Field]) -> Result<()> {
        for field in fields {
            let fqn = FullyQualifiedName::add(parent, &field.name)?;
            walk(&fqn, &mut field.children)?;
            field.fully_qualified_name = Some(fqn);
        }
        Ok(())
    }
    walk(&format!("{}.{}", endpoint_fqn, schema_name), &mut schema.schema_fields)
}

/// RFC 7386 JSON merge patch
fn merge_patch(target: &mut Value, patch: &Value) {
    let Value::Object(patch_map) = patch else {
        *target = patch.clone();
        return;
    };
    if !target.is_object() {
        *target = Value::Object(Map::new());
    }
    if let Value::Object(map) = target {
        for (key, value) in patch_map {
            if value.is_null() {
                map.remove(key);
            } else {
                merge_patch(map.entry(key.clone()).or_insert(Value::Null), value);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_merge_patch() {
        let mut target = json!({"a": "b", "c": {"d": "e", "f": "g"}, "tags": [1]});
        merge_patch(
            &mut target,
            &json!({"a": "z", "c": {"f": null}, "tags": [2, 3], "new": true}),
        );
        assert_eq!(
            target,
            json!({"a": "z", "c": {"d": "e"}, "tags": [2, 3], "new": true})
        );
    }

    #[test]
    fn test_set_schema_fqns() {
        let mut schema = ApiSchema::with_fields(vec![Field::new(
            "address",
            crate::domain::model::FieldDataType::Record,
        )
        .with_children(vec![Field::new(
            "post.code",
            crate::domain::model::FieldDataType::String,
        )])]);
        set_schema_fqns("svc.users.get", "responseSchema", &mut schema).unwrap();
        let address = &schema.schema_fields[0];
        assert_eq!(
            address.fully_qualified_name.as_deref(),
            Some("svc.users.get.responseSchema.address")
        );
        assert_eq!(
            address.children[0].fully_qualified_name.as_deref(),
            Some("svc.users.get.responseSchema.address.\"post.code\"")
        );
    }

    #[test]
    fn test_validate_owner() {
        assert!(validate_owner(Some(&EntityReference::user("alice"))).is_ok());
        assert!(validate_owner(Some(&EntityReference::team("eng"))).is_ok());
        assert!(validate_owner(Some(&EntityReference::new("table", "t", "t"))).is_err());
        assert!(validate_owner(None).is_ok());
    }
}
