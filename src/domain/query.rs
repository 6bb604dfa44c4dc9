//! 搜尋引擎布林查詢 DSL (`bool` / `must` / `should` / `must_not` / `exists` / `term`)
//! 以及對 JSON 文件的本地求值。

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct QueryFilter {
    pub query: Query,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Query {
    #[serde(rename = "bool", default)]
    pub bool_query: BoolQuery,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct BoolQuery {
    #[serde(default, skip_serializing_if = "Vec::is_empty", deserialize_with = "one_or_many")]
    pub must: Vec<Clause>,
    #[serde(default, skip_serializing_if = "Vec::is_empty", deserialize_with = "one_or_many")]
    pub should: Vec<Clause>,
    #[serde(default, skip_serializing_if = "Vec::is_empty", deserialize_with = "one_or_many")]
    pub must_not: Vec<Clause>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Clause {
    Term(TermQuery),
    Exists(ExistsQuery),
    Bool(BoolQuery),
    /// 無法辨識的子句，保留原樣
    #[serde(untagged)]
    Other(Value),
}

/// `{"term": {"<field>": <value>}}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TermQuery(BTreeMap<String, Value>);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExistsQuery {
    pub field: String,
}

fn one_or_many<'de, D>(deserializer: D) -> Result<Vec<Clause>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        Many(Vec<Clause>),
        One(Clause),
    }

    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::Many(clauses) => clauses,
        OneOrMany::One(clause) => vec![clause],
    })
}

impl QueryFilter {
    pub fn new(bool_query: BoolQuery) -> Self {
        Self {
            query: Query { bool_query },
        }
    }

    /// 空查詢 `{"query": {"bool": {}}}`，匹配所有文件
    pub fn match_all() -> Self {
        Self::default()
    }

    pub fn bool_query(&self) -> &BoolQuery {
        &self.query.bool_query
    }

    pub fn is_empty(&self) -> bool {
        self.query.bool_query.is_empty()
    }

    pub fn matches(&self, doc: &Value) -> bool {
        self.query.bool_query.matches(doc)
    }
}

impl BoolQuery {
    pub fn must(clauses: Vec<Clause>) -> Self {
        Self {
            must: clauses,
            ..Self::default()
        }
    }

    pub fn should(clauses: Vec<Clause>) -> Self {
        Self {
            should: clauses,
            ..Self::default()
        }
    }

    pub fn must_not(clauses: Vec<Clause>) -> Self {
        Self {
            must_not: clauses,
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.must.is_empty() && self.should.is_empty() && self.must_not.is_empty()
    }

    pub fn matches(&self, doc: &Value) -> bool {
        self.must.iter().all(|c| c.matches(doc))
            && (self.should.is_empty() || self.should.iter().any(|c| c.matches(doc)))
            && !self.must_not.iter().any(|c| c.matches(doc))
    }
}

impl Clause {
    pub fn term(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Clause::Term(TermQuery::new(field, value))
    }

    pub fn exists(field: impl Into<String>) -> Self {
        Clause::Exists(ExistsQuery {
            field: field.into(),
        })
    }

    /// `{"bool": {"must_not": [{"exists": {"field": <field>}}]}}`
    pub fn missing(field: impl Into<String>) -> Self {
        Clause::Bool(BoolQuery::must_not(vec![Clause::exists(field)]))
    }

    pub fn matches(&self, doc: &Value) -> bool {
        match self {
            Clause::Term(term) => term
                .entries()
                .all(|(field, expected)| leaf_values(doc, field).any(|v| v == expected)),
            Clause::Exists(exists) => leaf_values(doc, &exists.field).any(|v| !v.is_null()),
            Clause::Bool(bool_query) => bool_query.matches(doc),
            Clause::Other(_) => false,
        }
    }
}

impl TermQuery {
    pub fn new(field: impl Into<String>, value: impl Into<Value>) -> Self {
        let mut map = BTreeMap::new();
        map.insert(field.into(), value.into());
        Self(map)
    }

    /// 取出 `(field, value)`；也接受 `{"field": {"value": x}}` 寫法
    pub fn entries(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.0.iter().map(|(field, value)| {
            let value = value
                .as_object()
                .and_then(|obj| obj.get("value"))
                .unwrap_or(value);
            (field.as_str(), value)
        })
    }

    pub fn value_for(&self, field: &str) -> Option<&Value> {
        self.entries().find(|(f, _)| *f == field).map(|(_, v)| v)
    }
}

/// 依 dot-path 取出所有葉節點值，陣列會被展開。
/// 路徑找不到且以 `.keyword` 結尾時，改用去掉後綴的路徑。
pub fn leaf_values<'a>(doc: &'a Value, path: &str) -> std::vec::IntoIter<&'a Value> {
    let mut found = Vec::new();
    collect_path(doc, &path.split('.').collect::<Vec<_>>(), &mut found);
    if found.is_empty() {
        if let Some(stripped) = path.strip_suffix(".keyword") {
            collect_path(doc, &stripped.split('.').collect::<Vec<_>>(), &mut found);
        }
    }
    found.into_iter()
}

fn collect_path<'a>(value: &'a Value, segments: &[&str], out: &mut Vec<&'a Value>) {
    match value {
        Value::Array(items) => {
            for item in items {
                collect_path(item, segments, out);
            }
        }
        _ => match segments.split_first() {
            None => out.push(value),
            Some((head, rest)) => {
                if let Some(child) = value.as_object().and_then(|obj| obj.get(*head)) {
                    collect_path(child, rest, out);
                }
            }
        },
    }
}

/// 將葉節點值轉為聚合用的字串 key
pub fn bucket_key(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}
