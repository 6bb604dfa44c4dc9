//! 將實體投影為搜尋索引文件。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::collections::BTreeSet;
use uuid::Uuid;

use crate::domain::model::{
    ApiEndpoint, ApiService, EntityReference, TagLabel, API_ENDPOINT, API_SERVICE,
};
use crate::utils::fqn::FullyQualifiedName;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchSuggest {
    pub input: String,
    pub weight: u32,
}

impl SearchSuggest {
    pub fn new(input: impl Into<String>, weight: u32) -> Self {
        Self {
            input: input.into(),
            weight,
        }
    }
}

/// 所有實體文件共有的欄位
pub struct CommonAttributes<'a> {
    pub id: Uuid,
    pub name: &'a str,
    pub fully_qualified_name: &'a str,
    pub display_name: Option<&'a str>,
    pub description: Option<&'a str>,
    pub owner: Option<&'a EntityReference>,
    pub tags: &'a [TagLabel],
    pub followers: &'a [EntityReference],
    pub version: f64,
    pub updated_at: DateTime<Utc>,
    pub deleted: bool,
}

pub trait SearchIndex {
    fn entity_type(&self) -> &'static str;

    fn suggest(&self) -> Vec<SearchSuggest>;

    fn common_attributes(&self) -> CommonAttributes<'_>;

    /// 各實體自己的欄位
    fn build_search_index_doc_internal(&self, doc: Map<String, Value>) -> Map<String, Value> {
        doc
    }

    fn build_search_index_doc(&self) -> Value {
        let attrs = self.common_attributes();
        let mut doc = Map::new();
        doc.insert("id".into(), json!(attrs.id));
        doc.insert("name".into(), json!(attrs.name));
        doc.insert("fullyQualifiedName".into(), json!(attrs.fully_qualified_name));
        doc.insert("fqnParts".into(), json!(fqn_parts(attrs.fully_qualified_name)));
        doc.insert(
            "displayName".into(),
            json!(attrs.display_name.unwrap_or(attrs.name)),
        );
        doc.insert("description".into(), json!(attrs.description));
        doc.insert("entityType".into(), json!(self.entity_type()));
        doc.insert("deleted".into(), json!(attrs.deleted));
        doc.insert("owner".into(), json!(attrs.owner));
        doc.insert("tags".into(), json!(attrs.tags));
        doc.insert(
            "followers".into(),
            json!(attrs.followers.iter().map(|f| f.id).collect::<Vec<_>>()),
        );
        doc.insert("version".into(), json!(attrs.version));
        doc.insert("updatedAt".into(), json!(attrs.updated_at.timestamp_millis()));
        doc.insert("suggest".into(), json!(self.suggest()));
        Value::Object(self.build_search_index_doc_internal(doc))
    }
}

/// FQN 的各段、所有前綴與所有後綴
pub fn fqn_parts(fqn: &str) -> BTreeSet<String> {
    let parts = FullyQualifiedName::split(fqn);
    let refs: Vec<&str> = parts.iter().map(String::as_str).collect();
    let mut out = BTreeSet::new();
    for i in 0..refs.len() {
        out.insert(parts[i].clone());
        if let Ok(prefix) = FullyQualifiedName::build(&refs[..=i]) {
            out.insert(prefix);
        }
        if let Ok(suffix) = FullyQualifiedName::build(&refs[i..]) {
            out.insert(suffix);
        }
    }
    out
}

pub struct ApiServiceIndex<'a> {
    api_service: &'a ApiService,
}

impl<'a> ApiServiceIndex<'a> {
    pub fn new(api_service: &'a ApiService) -> Self {
        Self { api_service }
    }
}

impl SearchIndex for ApiServiceIndex<'_> {
    fn entity_type(&self) -> &'static str {
        API_SERVICE
    }

    fn suggest(&self) -> Vec<SearchSuggest> {
        vec![
            SearchSuggest::new(&self.api_service.name, 5),
            SearchSuggest::new(&self.api_service.fully_qualified_name, 5),
        ]
    }

    fn common_attributes(&self) -> CommonAttributes<'_> {
        let service = self.api_service;
        CommonAttributes {
            id: service.id,
            name: &service.name,
            fully_qualified_name: &service.fully_qualified_name,
            display_name: service.display_name.as_deref(),
            description: service.description.as_deref(),
            owner: service.owner.as_ref(),
            tags: &service.tags,
            followers: &service.followers,
            version: service.version,
            updated_at: service.updated_at,
            deleted: service.deleted,
        }
    }

    fn build_search_index_doc_internal(&self, mut doc: Map<String, Value>) -> Map<String, Value> {
        doc.insert("serviceType".into(), json!(self.api_service.service_type));
        doc
    }
}

pub struct ApiEndpointIndex<'a> {
    api_endpoint: &'a ApiEndpoint,
}

impl<'a> ApiEndpointIndex<'a> {
    pub fn new(api_endpoint: &'a ApiEndpoint) -> Self {
        Self { api_endpoint }
    }
}

impl SearchIndex for ApiEndpointIndex<'_> {
    fn entity_type(&self) -> &'static str {
        API_ENDPOINT
    }

    fn suggest(&self) -> Vec<SearchSuggest> {
        vec![
            SearchSuggest::new(&self.api_endpoint.name, 5),
            SearchSuggest::new(&self.api_endpoint.fully_qualified_name, 5),
        ]
    }

    fn common_attributes(&self) -> CommonAttributes<'_> {
        let endpoint = self.api_endpoint;
        CommonAttributes {
            id: endpoint.id,
            name: &endpoint.name,
            fully_qualified_name: &endpoint.fully_qualified_name,
            display_name: endpoint.display_name.as_deref(),
            description: endpoint.description.as_deref(),
            owner: endpoint.owner.as_ref(),
            tags: endpoint.tags.as_deref().unwrap_or_default(),
            followers: endpoint.followers.as_deref().unwrap_or_default(),
            version: endpoint.version,
            updated_at: endpoint.updated_at,
            deleted: endpoint.deleted,
        }
    }

    fn build_search_index_doc_internal(&self, mut doc: Map<String, Value>) -> Map<String, Value> {
        let endpoint = self.api_endpoint;
        let with_display_name = |reference: &EntityReference| {
            let mut reference = reference.clone();
            if reference.display_name.is_none() {
                reference.display_name = Some(reference.name.clone());
            }
            reference
        };
        doc.insert("endpointURL".into(), json!(endpoint.endpoint_url.as_str()));
        doc.insert(
            "requestMethod".into(),
            json!(endpoint.request_method.map(|m| m.as_str())),
        );
        doc.insert(
            "apiCollection".into(),
            json!(with_display_name(&endpoint.api_collection)),
        );
        doc.insert("service".into(), json!(with_display_name(&endpoint.service)));
        doc.insert("serviceType".into(), json!(endpoint.service_type));
        doc.insert(
            "requestSchemaFields".into(),
            json!(endpoint
                .request_schema
                .as_ref()
                .map(|s| s.flattened_names())
                .unwrap_or_default()),
        );
        doc.insert(
            "responseSchemaFields".into(),
            json!(endpoint
                .response_schema
                .as_ref()
                .map(|s| s.flattened_names())
                .unwrap_or_default()),
        );
        doc
    }
}
