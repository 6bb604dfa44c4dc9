use std::collections::BTreeMap;

use crate::core::ConfigProvider;
use crate::core::quick_filter::{build_quick_filter_query, recover_selected_values};
use crate::domain::filter::{QuickFilterField, Token};
use crate::domain::query::QueryFilter;

/// 外部格式：欄位 label 對應到選取值，空值以 null 哨兵字串表示
pub type Selections = BTreeMap<String, Vec<String>>;

/// 依配置的欄位順序套用選取值，未知的 label 會被忽略
pub fn fields_from_selections<C: ConfigProvider + ?Sized>(
    config: &C,
    selections: &Selections,
) -> Vec<QuickFilterField> {
    let null_key = config.null_option_key();
    let catalog = config.quick_filters();

    for label in selections.keys() {
        if !catalog.iter().any(|field| &field.label == label) {
            tracing::warn!("⚠️ Unknown quick filter label '{}', ignored", label);
        }
    }

    catalog
        .into_iter()
        .map(|field| match selections.get(&field.label) {
            Some(values) => {
                let tokens = values.iter().map(|v| Token::from_wire(v, null_key));
                field.with_values(tokens)
            }
            None => field,
        })
        .collect()
}

pub fn query_from_selections<C: ConfigProvider + ?Sized>(
    config: &C,
    selections: &Selections,
) -> Option<QueryFilter> {
    build_quick_filter_query(&fields_from_selections(config, selections))
}

/// 從查詢還原選取值；沒有選值的欄位不輸出
pub fn selections_from_query<C: ConfigProvider + ?Sized>(
    config: &C,
    query_filter: Option<&QueryFilter>,
) -> Selections {
    let null_key = config.null_option_key();

    recover_selected_values(&config.quick_filters(), query_filter)
        .into_iter()
        .filter(|selection| !selection.tokens.is_empty())
        .map(|selection| {
            let values = selection
                .tokens
                .iter()
                .map(|token| token.to_wire(null_key).to_string())
                .collect();
            (selection.label, values)
        })
        .collect()
}
