use crate::domain::filter::{FieldSelection, QuickFilterField, Token};
use crate::domain::query::{BoolQuery, Clause, QueryFilter};

/// 將快速篩選的選取值轉為布林查詢。
///
/// 每個有選值的欄位產生一組 `bool.should`，所有組合放在同一個
/// `query.bool.must` 之下。沒有任何選值時回傳 `None`。
pub fn build_quick_filter_query(fields: &[QuickFilterField]) -> Option<QueryFilter> {
    let must: Vec<Clause> = fields
        .iter()
        .filter(|field| !field.value.is_empty())
        .map(|field| {
            let should = field
                .value
                .iter()
                .map(|option| match &option.token {
                    Token::Present(value) => Clause::term(field.key.clone(), value.clone()),
                    Token::Absent => Clause::missing(field.key.clone()),
                })
                .collect();
            Clause::Bool(BoolQuery::should(should))
        })
        .collect();

    if must.is_empty() {
        tracing::debug!("No quick filter selections, skipping query filter");
        return None;
    }

    tracing::debug!("Built quick filter query with {} field group(s)", must.len());
    Some(QueryFilter::new(BoolQuery::must(must)))
}

pub fn selected_values(fields: &[QuickFilterField]) -> Vec<FieldSelection> {
    fields
        .iter()
        .map(|field| FieldSelection {
            label: field.label.clone(),
            key: field.key.clone(),
            tokens: field.value.iter().map(|option| option.token.clone()).collect(),
        })
        .collect()
}

/// [`build_quick_filter_query`] 的反向操作：從查詢還原每個欄位的選取值。
///
/// 只走 `must → bool.should`，辨識 `term` 以及 `bool.must_not.exists`
/// 兩種形狀，其餘子句忽略。非字串的 term 值以 JSON 文字表示。
pub fn recover_selected_values(
    catalog: &[QuickFilterField],
    query_filter: Option<&QueryFilter>,
) -> Vec<FieldSelection> {
    let must = query_filter
        .map(|filter| filter.bool_query().must.as_slice())
        .unwrap_or_default();

    catalog
        .iter()
        .map(|field| {
            let tokens = must
                .iter()
                .filter_map(|clause| match clause {
                    Clause::Bool(group) => Some(group.should.iter()),
                    _ => None,
                })
                .flatten()
                .filter_map(|clause| token_for_field(clause, &field.key))
                .collect();
            FieldSelection {
                label: field.label.clone(),
                key: field.key.clone(),
                tokens,
            }
        })
        .collect()
}

fn token_for_field(clause: &Clause, key: &str) -> Option<Token> {
    match clause {
        Clause::Term(term) => term.value_for(key).map(|value| match value {
            serde_json::Value::String(s) => Token::Present(s.clone()),
            other => Token::Present(other.to_string()),
        }),
        Clause::Bool(inner) => inner
            .must_not
            .iter()
            .any(|c| matches!(c, Clause::Exists(exists) if exists.field == key))
            .then_some(Token::Absent),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn catalog() -> Vec<QuickFilterField> {
        vec![
            QuickFilterField::new("Owner", "owner.displayName.keyword"),
            QuickFilterField::new("Tag", "tags.tagFQN"),
            QuickFilterField::new("Service", "service.displayName.keyword"),
        ]
    }

    #[test]
    fn test_all_empty_returns_none() {
        assert_eq!(build_quick_filter_query(&catalog()), None);
        assert_eq!(build_quick_filter_query(&[]), None);
    }

    #[test]
    fn test_single_present_token_emits_one_term() {
        let mut fields = catalog();
        fields[0] = fields[0].clone().with_values([Token::present("alice")]);

        let query = build_quick_filter_query(&fields).unwrap();
        assert_eq!(
            serde_json::to_value(&query).unwrap(),
            json!({"query": {"bool": {"must": [
                {"bool": {"should": [{"term": {"owner.displayName.keyword": "alice"}}]}}
            ]}}})
        );
    }

    #[test]
    fn test_absent_token_emits_must_not_exists() {
        let mut fields = catalog();
        fields[1] = fields[1]
            .clone()
            .with_values([Token::Absent, Token::present("PII.Sensitive")]);

        let query = build_quick_filter_query(&fields).unwrap();
        let value = serde_json::to_value(&query).unwrap();
        assert_eq!(
            value,
            json!({"query": {"bool": {"must": [
                {"bool": {"should": [
                    {"bool": {"must_not": [{"exists": {"field": "tags.tagFQN"}}]}},
                    {"term": {"tags.tagFQN": "PII.Sensitive"}}
                ]}}
            ]}}})
        );
        assert!(!value.to_string().contains("OM_NULL_FIELD"));
    }

    #[test]
    fn test_round_trip() {
        let mut fields = catalog();
        fields[0] = fields[0]
            .clone()
            .with_values([Token::present("alice"), Token::Absent]);
        fields[2] = fields[2].clone().with_values([Token::present("sample_api")]);

        let query = build_quick_filter_query(&fields);
        assert_eq!(
            recover_selected_values(&catalog(), query.as_ref()),
            selected_values(&fields)
        );
    }

    #[test]
    fn test_round_trip_with_nothing_selected() {
        let fields = catalog();
        let query = build_quick_filter_query(&fields);
        assert_eq!(
            recover_selected_values(&catalog(), query.as_ref()),
            selected_values(&fields)
        );
    }

    #[test]
    fn test_recover_hand_written_query_is_best_effort() {
        let filter: QueryFilter = serde_json::from_value(json!({"query": {"bool": {"must": [
            {"bool": {"should": {"term": {"tags.tagFQN": {"value": "Tier.Tier1"}}}}},
            {"bool": {"should": [{"match": {"name": "x"}}, {"term": {"version": 2}}]}},
            {"term": {"owner.displayName.keyword": "ignored"}}
        ]}}}))
        .unwrap();

        let mut catalog = catalog();
        catalog.push(QuickFilterField::new("Version", "version"));
        let recovered = recover_selected_values(&catalog, Some(&filter));

        assert!(recovered[0].tokens.is_empty());
        assert_eq!(recovered[1].tokens, vec![Token::present("Tier.Tier1")]);
        assert_eq!(recovered[3].tokens, vec![Token::present("2")]);
    }
}
