use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use url::Url;
use uuid::Uuid;

use crate::utils::error::{CatalogError, Result};

pub const API_ENDPOINT: &str = "apiEndpoint";
pub const API_COLLECTION: &str = "apiCollection";
pub const API_SERVICE: &str = "apiService";
pub const USER: &str = "user";
pub const TEAM: &str = "team";

pub const FIELD_OWNER: &str = "owner";
pub const FIELD_FOLLOWERS: &str = "followers";
pub const FIELD_TAGS: &str = "tags";

pub trait EntityInterface: Clone + Send + Sync {
    fn id(&self) -> Uuid;
    fn fully_qualified_name(&self) -> &str;
    fn version(&self) -> f64;
    fn is_deleted(&self) -> bool;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityReference {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub entity_type: String,
    pub name: String,
    pub fully_qualified_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

impl EntityReference {
    pub fn new(entity_type: &str, name: impl Into<String>, fqn: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            entity_type: entity_type.to_string(),
            name: name.into(),
            fully_qualified_name: fqn.into(),
            display_name: None,
        }
    }

    pub fn user(name: &str) -> Self {
        Self::new(USER, name, name)
    }

    pub fn team(name: &str) -> Self {
        Self::new(TEAM, name, name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TagSource {
    Classification,
    Glossary,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LabelType {
    Manual,
    Propagated,
    Automated,
    Derived,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TagLabel {
    #[serde(rename = "tagFQN")]
    pub tag_fqn: String,
    pub source: TagSource,
    pub label_type: LabelType,
}

impl TagLabel {
    pub fn classification(tag_fqn: impl Into<String>) -> Self {
        Self {
            tag_fqn: tag_fqn.into(),
            source: TagSource::Classification,
            label_type: LabelType::Manual,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ApiRequestMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl ApiRequestMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApiRequestMethod::Get => "GET",
            ApiRequestMethod::Post => "POST",
            ApiRequestMethod::Put => "PUT",
            ApiRequestMethod::Patch => "PATCH",
            ApiRequestMethod::Delete => "DELETE",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FieldDataType {
    Record,
    Null,
    Boolean,
    Int,
    Long,
    Bytes,
    Float,
    Double,
    Timestamp,
    Time,
    Date,
    String,
    Array,
    Map,
    Enum,
    Union,
    Fixed,
    Error,
    Unknown,
}

/// 請求/回應 schema 中的欄位，可巢狀
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Field {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    pub data_type: FieldDataType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fully_qualified_name: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<TagLabel>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Field>,
}

impl Field {
    pub fn new(name: impl Into<String>, data_type: FieldDataType) -> Self {
        Self {
            name: name.into(),
            display_name: None,
            data_type,
            description: None,
            fully_qualified_name: None,
            tags: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn with_tag(mut self, tag: TagLabel) -> Self {
        self.tags.push(tag);
        self
    }

    pub fn with_children(mut self, children: Vec<Field>) -> Self {
        self.children = children;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiSchema {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema_type: Option<String>,
    #[serde(default)]
    pub schema_fields: Vec<Field>,
}

impl ApiSchema {
    pub fn with_fields(fields: Vec<Field>) -> Self {
        Self {
            schema_type: None,
            schema_fields: fields,
        }
    }

    /// 所有欄位 (含巢狀) 的名稱，以 `.` 連接父子
    pub fn flattened_names(&self) -> Vec<String> {
        fn walk(prefix: Option<&str>, fields: &[Field], out: &mut Vec<String>) {
            for field in fields {
                let name = match prefix {
                    Some(p) => format!("{}.{}", p, field.name),
                    None => field.name.clone(),
                };
                walk(Some(&name), &field.children, out);
                out.push(name);
            }
        }
        let mut out = Vec::new();
        walk(None, &self.schema_fields, &mut out);
        out.sort();
        out
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldChange {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub old_value: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_value: Option<serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeDescription {
    #[serde(default)]
    pub fields_added: Vec<FieldChange>,
    #[serde(default)]
    pub fields_updated: Vec<FieldChange>,
    #[serde(default)]
    pub fields_deleted: Vec<FieldChange>,
    pub previous_version: f64,
}

impl ChangeDescription {
    pub fn new(previous_version: f64) -> Self {
        Self {
            previous_version,
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.fields_added.is_empty() && self.fields_updated.is_empty() && self.fields_deleted.is_empty()
    }
}

/// API 所屬的服務
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiService {
    pub id: Uuid,
    pub name: String,
    pub fully_qualified_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub service_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<EntityReference>,
    #[serde(default)]
    pub tags: Vec<TagLabel>,
    #[serde(default)]
    pub followers: Vec<EntityReference>,
    pub version: f64,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub deleted: bool,
}

impl ApiService {
    pub fn new(name: impl Into<String>, service_type: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            id: Uuid::new_v4(),
            fully_qualified_name: name.clone(),
            name,
            display_name: None,
            description: None,
            service_type: service_type.into(),
            owner: None,
            tags: Vec::new(),
            followers: Vec::new(),
            version: 0.1,
            updated_at: Utc::now(),
            deleted: false,
        }
    }

    pub fn reference(&self) -> EntityReference {
        EntityReference {
            id: self.id,
            entity_type: API_SERVICE.to_string(),
            name: self.name.clone(),
            fully_qualified_name: self.fully_qualified_name.clone(),
            display_name: self.display_name.clone(),
        }
    }
}

/// 一組 endpoint 的容器，屬於某個 API 服務
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiCollection {
    pub id: Uuid,
    pub name: String,
    pub fully_qualified_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    pub service: EntityReference,
    pub service_type: String,
}

impl ApiCollection {
    pub fn new(service: &ApiService, name: &str) -> Result<Self> {
        Ok(Self {
            id: Uuid::new_v4(),
            name: name.to_string(),
            fully_qualified_name: crate::utils::fqn::FullyQualifiedName::add(
                &service.fully_qualified_name,
                name,
            )?,
            display_name: None,
            service: service.reference(),
            service_type: service.service_type.clone(),
        })
    }

    pub fn reference(&self) -> EntityReference {
        EntityReference {
            id: self.id,
            entity_type: API_COLLECTION.to_string(),
            name: self.name.clone(),
            fully_qualified_name: self.fully_qualified_name.clone(),
            display_name: self.display_name.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiEndpoint {
    pub id: Uuid,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    pub fully_qualified_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "endpointURL")]
    pub endpoint_url: Url,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_method: Option<ApiRequestMethod>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_schema: Option<ApiSchema>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_schema: Option<ApiSchema>,
    pub api_collection: EntityReference,
    pub service: EntityReference,
    pub service_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<EntityReference>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub followers: Option<Vec<EntityReference>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<TagLabel>>,
    pub version: f64,
    pub updated_at: DateTime<Utc>,
    pub updated_by: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub change_description: Option<ChangeDescription>,
    #[serde(default)]
    pub deleted: bool,
}

impl ApiEndpoint {
    pub fn reference(&self) -> EntityReference {
        EntityReference {
            id: self.id,
            entity_type: API_ENDPOINT.to_string(),
            name: self.name.clone(),
            fully_qualified_name: self.fully_qualified_name.clone(),
            display_name: self.display_name.clone(),
        }
    }
}

impl EntityInterface for ApiEndpoint {
    fn id(&self) -> Uuid {
        self.id
    }

    fn fully_qualified_name(&self) -> &str {
        &self.fully_qualified_name
    }

    fn version(&self) -> f64 {
        self.version
    }

    fn is_deleted(&self) -> bool {
        self.deleted
    }
}

/// 建立/更新 endpoint 的請求
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateApiEndpoint {
    pub name: Option<String>,
    pub display_name: Option<String>,
    pub description: Option<String>,
    /// collection 的 FQN
    pub api_collection: Option<String>,
    #[serde(rename = "endpointURL")]
    pub endpoint_url: Option<String>,
    pub request_method: Option<ApiRequestMethod>,
    pub request_schema: Option<ApiSchema>,
    pub response_schema: Option<ApiSchema>,
    pub owner: Option<EntityReference>,
    #[serde(default)]
    pub tags: Vec<TagLabel>,
}

impl CreateApiEndpoint {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    pub fn with_api_collection(mut self, fqn: Option<&str>) -> Self {
        self.api_collection = fqn.map(str::to_string);
        self
    }

    pub fn with_endpoint_url(mut self, url: Option<&str>) -> Self {
        self.endpoint_url = url.map(str::to_string);
        self
    }

    pub fn with_request_method(mut self, method: ApiRequestMethod) -> Self {
        self.request_method = Some(method);
        self
    }

    pub fn with_request_schema(mut self, schema: ApiSchema) -> Self {
        self.request_schema = Some(schema);
        self
    }

    pub fn with_response_schema(mut self, schema: ApiSchema) -> Self {
        self.response_schema = Some(schema);
        self
    }

    pub fn with_owner(mut self, owner: EntityReference) -> Self {
        self.owner = Some(owner);
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_tags(mut self, tags: Vec<TagLabel>) -> Self {
        self.tags = tags;
        self
    }
}

/// 讀取時是否包含已刪除的實體
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Include {
    #[default]
    NonDeleted,
    Deleted,
    All,
}

impl Include {
    pub fn admits(&self, deleted: bool) -> bool {
        match self {
            Include::NonDeleted => !deleted,
            Include::Deleted => deleted,
            Include::All => true,
        }
    }
}

/// `fields` 查詢參數：要一併載入的關聯
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Fields(BTreeSet<String>);

impl Fields {
    /// 解析 `"owner, followers, tags"`，未知欄位回報錯誤
    pub fn parse(raw: Option<&str>, allowed: &[&str]) -> Result<Self> {
        let mut fields = BTreeSet::new();
        for name in raw.unwrap_or_default().split(',') {
            let name = name.trim();
            if name.is_empty() {
                continue;
            }
            if !allowed.contains(&name) {
                return Err(CatalogError::InvalidField {
                    field: name.to_string(),
                });
            }
            fields.insert(name.to_string());
        }
        Ok(Self(fields))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains(name)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fields_parse() {
        let allowed = [FIELD_OWNER, FIELD_FOLLOWERS, FIELD_TAGS];
        let fields = Fields::parse(Some("owner, followers, tags"), &allowed).unwrap();
        assert!(fields.contains("owner"));
        assert!(fields.contains("tags"));
        assert!(Fields::parse(Some(""), &allowed).unwrap().is_empty());
        assert!(Fields::parse(None, &allowed).unwrap().is_empty());
        assert!(matches!(
            Fields::parse(Some("owner,columns"), &allowed),
            Err(CatalogError::InvalidField { .. })
        ));
    }

    #[test]
    fn test_request_method_serializes_uppercase() {
        assert_eq!(
            serde_json::to_value(ApiRequestMethod::Post).unwrap(),
            serde_json::json!("POST")
        );
        assert_eq!(ApiRequestMethod::Get.as_str(), "GET");
    }

    #[test]
    fn test_schema_flattened_names() {
        let schema = ApiSchema::with_fields(vec![
            Field::new("id", FieldDataType::String),
            Field::new("address", FieldDataType::Record)
                .with_children(vec![Field::new("post_code", FieldDataType::String)]),
        ]);
        assert_eq!(
            schema.flattened_names(),
            vec!["address", "address.post_code", "id"]
        );
    }

    #[test]
    fn test_include_admits() {
        assert!(Include::NonDeleted.admits(false));
        assert!(!Include::NonDeleted.admits(true));
        assert!(Include::Deleted.admits(true));
        assert!(Include::All.admits(true));
    }
}
