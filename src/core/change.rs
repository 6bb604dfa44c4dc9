//! 比對實體前後狀態，產生欄位層級的變更紀錄並決定新版本號。

use chrono::Utc;
use serde::Serialize;
use serde_json::Value;

use crate::domain::model::{
    ApiEndpoint, ApiSchema, ChangeDescription, EntityReference, FieldChange, TagLabel, FIELD_FOLLOWERS,
    FIELD_OWNER, FIELD_TAGS,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum UpdateType {
    NoChange,
    MinorUpdate,
    MajorUpdate,
}

pub fn next_version(previous: f64, update_type: UpdateType) -> f64 {
    let next = match update_type {
        UpdateType::NoChange => previous,
        UpdateType::MinorUpdate => previous + 0.1,
        UpdateType::MajorUpdate => previous + 1.0,
    };
    (next * 10.0).round() / 10.0
}

fn to_json<T: Serialize>(value: &T) -> Option<Value> {
    serde_json::to_value(value).ok()
}

/// 收集變更的輔助結構
pub struct ChangeRecorder {
    change: ChangeDescription,
    major: bool,
}

impl ChangeRecorder {
    pub fn new(previous_version: f64) -> Self {
        Self {
            change: ChangeDescription::new(previous_version),
            major: false,
        }
    }

    /// 依新舊值是否存在，記為 added / updated / deleted
    pub fn record<T: Serialize + PartialEq>(&mut self, name: &str, old: Option<&T>, new: Option<&T>) {
        match (old, new) {
            (None, None) => {}
            (Some(o), Some(n)) if o == n => {}
            (None, Some(n)) => self.change.fields_added.push(FieldChange {
                name: name.to_string(),
                old_value: None,
                new_value: to_json(n),
            }),
            (Some(o), None) => self.change.fields_deleted.push(FieldChange {
                name: name.to_string(),
                old_value: to_json(o),
                new_value: None,
            }),
            (Some(o), Some(n)) => self.change.fields_updated.push(FieldChange {
                name: name.to_string(),
                old_value: to_json(o),
                new_value: to_json(n),
            }),
        }
    }

    /// 清單型欄位 (tags、followers)：分別記錄新增與移除的項目
    pub fn record_list<T, K>(&mut self, name: &str, old: &[T], new: &[T], key: impl Fn(&T) -> K)
    where
        T: Serialize + Clone,
        K: PartialEq,
    {
        let added: Vec<T> = new
            .iter()
            .filter(|n| !old.iter().any(|o| key(o) == key(*n)))
            .cloned()
            .collect();
        let deleted: Vec<T> = old
            .iter()
            .filter(|o| !new.iter().any(|n| key(n) == key(*o)))
            .cloned()
            .collect();
        if !added.is_empty() {
            self.change.fields_added.push(FieldChange {
                name: name.to_string(),
                old_value: None,
                new_value: to_json(&added),
            });
        }
        if !deleted.is_empty() {
            self.change.fields_deleted.push(FieldChange {
                name: name.to_string(),
                old_value: to_json(&deleted),
                new_value: None,
            });
        }
    }

    fn record_schema(&mut self, name: &str, old: Option<&ApiSchema>, new: Option<&ApiSchema>) {
        let (Some(old), Some(new)) = (old, new) else {
            if old.is_some() && new.is_none() {
                self.major = true;
            }
            self.record(name, old, new);
            return;
        };
        if old == new {
            return;
        }

        let old_names = old.flattened_names();
        let new_names = new.flattened_names();
        let removed: Vec<&String> = old_names.iter().filter(|n| !new_names.contains(n)).collect();
        let added: Vec<&String> = new_names.iter().filter(|n| !old_names.contains(n)).collect();
        let field_name = format!("{}.schemaFields", name);

        if !removed.is_empty() {
            self.major = true;
            self.change.fields_deleted.push(FieldChange {
                name: field_name.clone(),
                old_value: to_json(&removed),
                new_value: None,
            });
        }
        if !added.is_empty() {
            self.change.fields_added.push(FieldChange {
                name: field_name,
                old_value: None,
                new_value: to_json(&added),
            });
        }
        if removed.is_empty() && added.is_empty() {
            // 欄位名稱相同，內容 (型別、描述、標籤) 有變
            self.record(name, Some(old), Some(new));
        }
    }

    pub fn finish(self) -> (ChangeDescription, UpdateType) {
        let update_type = if self.change.is_empty() {
            UpdateType::NoChange
        } else if self.major {
            UpdateType::MajorUpdate
        } else {
            UpdateType::MinorUpdate
        };
        (self.change, update_type)
    }
}

pub fn diff_endpoints(original: &ApiEndpoint, updated: &ApiEndpoint) -> (ChangeDescription, UpdateType) {
    let mut recorder = ChangeRecorder::new(original.version);

    recorder.record("displayName", original.display_name.as_ref(), updated.display_name.as_ref());
    recorder.record("description", original.description.as_ref(), updated.description.as_ref());
    recorder.record(FIELD_OWNER, original.owner.as_ref(), updated.owner.as_ref());
    recorder.record(
        "requestMethod",
        original.request_method.map(|m| m.as_str()).as_ref(),
        updated.request_method.map(|m| m.as_str()).as_ref(),
    );
    recorder.record(
        "endpointURL",
        Some(&original.endpoint_url.as_str()),
        Some(&updated.endpoint_url.as_str()),
    );
    recorder.record_list(
        FIELD_TAGS,
        original.tags.as_deref().unwrap_or_default(),
        updated.tags.as_deref().unwrap_or_default(),
        |tag: &TagLabel| tag.tag_fqn.clone(),
    );
    recorder.record_list(
        FIELD_FOLLOWERS,
        original.followers.as_deref().unwrap_or_default(),
        updated.followers.as_deref().unwrap_or_default(),
        |follower: &EntityReference| follower.id,
    );
    recorder.record_schema(
        "requestSchema",
        original.request_schema.as_ref(),
        updated.request_schema.as_ref(),
    );
    recorder.record_schema(
        "responseSchema",
        original.response_schema.as_ref(),
        updated.response_schema.as_ref(),
    );
    recorder.record("deleted", Some(&original.deleted), Some(&updated.deleted));

    recorder.finish()
}

/// 比對後寫入新版本號與變更紀錄；沒有變更時保留原本的版本資訊
pub fn apply_change(original: &ApiEndpoint, updated: &mut ApiEndpoint, updated_by: &str) -> UpdateType {
    let (change, update_type) = diff_endpoints(original, updated);
    if update_type == UpdateType::NoChange {
        updated.version = original.version;
        updated.change_description = original.change_description.clone();
        updated.updated_at = original.updated_at;
        updated.updated_by = original.updated_by.clone();
        return update_type;
    }

    updated.version = next_version(original.version, update_type);
    updated.change_description = Some(change);
    updated.updated_at = Utc::now();
    updated.updated_by = updated_by.to_string();
    tracing::debug!(
        fqn = %updated.fully_qualified_name,
        from = original.version,
        to = updated.version,
        ?update_type,
        "Recorded entity change"
    );
    update_type
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::{ApiRequestMethod, Field, FieldDataType, API_COLLECTION, API_SERVICE};
    use url::Url;
    use uuid::Uuid;

    fn endpoint() -> ApiEndpoint {
        ApiEndpoint {
            id: Uuid::new_v4(),
            name: "getUsers".into(),
            display_name: None,
            fully_qualified_name: "svc.users.getUsers".into(),
            description: None,
            endpoint_url: Url::parse("https://localhost:8585/api/v1/users").unwrap(),
            request_method: Some(ApiRequestMethod::Get),
            request_schema: None,
            response_schema: Some(ApiSchema::with_fields(vec![
                Field::new("id", FieldDataType::String),
                Field::new("email", FieldDataType::String),
            ])),
            api_collection: EntityReference::new(API_COLLECTION, "users", "svc.users"),
            service: EntityReference::new(API_SERVICE, "svc", "svc"),
            service_type: "Rest".into(),
            owner: Some(EntityReference::user("user1")),
            followers: None,
            tags: None,
            version: 0.1,
            updated_at: Utc::now(),
            updated_by: "admin".into(),
            change_description: None,
            deleted: false,
        }
    }

    #[test]
    fn test_next_version() {
        assert_eq!(next_version(0.1, UpdateType::MinorUpdate), 0.2);
        assert_eq!(next_version(0.9, UpdateType::MinorUpdate), 1.0);
        assert_eq!(next_version(0.2, UpdateType::MajorUpdate), 1.2);
        assert_eq!(next_version(1.3, UpdateType::NoChange), 1.3);
    }

    #[test]
    fn test_owner_and_method_change_is_minor() {
        let original = endpoint();
        let mut updated = original.clone();
        updated.owner = Some(EntityReference::team("team11"));
        updated.request_method = Some(ApiRequestMethod::Post);

        let (change, update_type) = diff_endpoints(&original, &updated);
        assert_eq!(update_type, UpdateType::MinorUpdate);
        assert_eq!(change.previous_version, 0.1);
        let names: Vec<&str> = change.fields_updated.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["owner", "requestMethod"]);
        let method = &change.fields_updated[1];
        assert_eq!(method.old_value, Some(Value::from("GET")));
        assert_eq!(method.new_value, Some(Value::from("POST")));
    }

    #[test]
    fn test_removing_schema_field_is_major() {
        let original = endpoint();
        let mut updated = original.clone();
        updated.response_schema = Some(ApiSchema::with_fields(vec![Field::new(
            "id",
            FieldDataType::String,
        )]));

        let (change, update_type) = diff_endpoints(&original, &updated);
        assert_eq!(update_type, UpdateType::MajorUpdate);
        assert_eq!(change.fields_deleted[0].name, "responseSchema.schemaFields");
    }

    #[test]
    fn test_tags_added_and_removed() {
        let mut original = endpoint();
        original.tags = Some(vec![TagLabel::classification("PII.Sensitive")]);
        let mut updated = original.clone();
        updated.tags = Some(vec![TagLabel::classification("Tier.Tier1")]);

        let (change, update_type) = diff_endpoints(&original, &updated);
        assert_eq!(update_type, UpdateType::MinorUpdate);
        assert_eq!(change.fields_added[0].name, "tags");
        assert_eq!(change.fields_deleted[0].name, "tags");
    }

    #[test]
    fn test_no_change_keeps_version() {
        let original = endpoint();
        let mut updated = original.clone();
        assert_eq!(apply_change(&original, &mut updated, "bob"), UpdateType::NoChange);
        assert_eq!(updated.version, 0.1);
        assert_eq!(updated.updated_by, "admin");
    }
}
