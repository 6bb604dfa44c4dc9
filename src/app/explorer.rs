use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;
use url::form_urlencoded;

use crate::adapters::search::InMemorySearchIndex;
use crate::core::hierarchy::resolve_sub_level;
use crate::core::tree::{update_tree_data, TreeNode};
use crate::domain::hierarchy::HierarchyChain;
use crate::domain::query::{BoolQuery, Clause, QueryFilter};

#[derive(Debug, Clone)]
struct ScopeTerm {
    field: String,
    /// 聚合 bucket 的字串 key，用於節點 key 與標題
    key: String,
    /// 文件中的原始值，用於 term 查詢
    value: Value,
}

/// 節點代表的範圍：從根到此節點的所有 (bucket, value)
#[derive(Debug, Clone)]
struct NodeScope {
    terms: Vec<ScopeTerm>,
}

impl NodeScope {
    /// `field=value` 以 `/` 串接，各段經過 URL 編碼，不同範圍不會產生相同的 key
    fn key(&self) -> String {
        let encode = |s: &str| form_urlencoded::byte_serialize(s.as_bytes()).collect::<String>();
        self.terms
            .iter()
            .map(|term| format!("{}={}", encode(&term.field), encode(&term.key)))
            .collect::<Vec<_>>()
            .join("/")
    }

    fn query(&self) -> QueryFilter {
        let must = self
            .terms
            .iter()
            .map(|term| Clause::term(term.field.clone(), term.value.clone()))
            .collect();
        QueryFilter::new(BoolQuery::must(must))
    }
}

/// 在索引上逐層展開的階層樹
pub struct HierarchyExplorer<'a> {
    index: &'a InMemorySearchIndex,
    chain: HierarchyChain,
    scopes: HashMap<String, NodeScope>,
}

impl<'a> HierarchyExplorer<'a> {
    pub fn new(index: &'a InMemorySearchIndex, chain: HierarchyChain) -> Self {
        Self {
            index,
            chain,
            scopes: HashMap::new(),
        }
    }

    pub async fn load_root(&mut self) -> Vec<Arc<TreeNode>> {
        let level = resolve_sub_level(&self.chain, None, None);
        self.build_nodes(&level.bucket, &[], &level.query_filter).await
    }

    /// 展開 `node_key`；未知節點或葉節點時原樣回傳
    pub async fn expand(&mut self, tree: &[Arc<TreeNode>], node_key: &str) -> Vec<Arc<TreeNode>> {
        let Some(scope) = self.scopes.get(node_key).cloned() else {
            tracing::debug!("Unknown tree node {}, nothing to expand", node_key);
            return tree.to_vec();
        };
        let Some(last) = scope.terms.last() else {
            return tree.to_vec();
        };
        if self.chain.is_terminal(&last.field) {
            return tree.to_vec();
        }

        // 值以原始 JSON 型別進入 term，數字與布林層級才比對得到
        let bucket = resolve_sub_level(&self.chain, Some(last.field.as_str()), None).bucket;
        let children = self.build_nodes(&bucket, &scope.terms, &scope.query()).await;
        tracing::debug!("Expanded {} with {} child node(s)", node_key, children.len());
        update_tree_data(tree, node_key, &children)
    }

    async fn build_nodes(
        &mut self,
        bucket: &str,
        parent_terms: &[ScopeTerm],
        query: &QueryFilter,
    ) -> Vec<Arc<TreeNode>> {
        let is_leaf = self.chain.is_terminal(bucket);
        let buckets = self.index.aggregate(bucket, Some(query)).await;

        buckets
            .into_iter()
            .map(|b| {
                let mut terms = parent_terms.to_vec();
                terms.push(ScopeTerm {
                    field: bucket.to_string(),
                    key: b.key.clone(),
                    value: b.value,
                });
                let scope = NodeScope { terms };
                let key = scope.key();
                self.scopes.insert(key.clone(), scope);

                let mut node = TreeNode::new(key, b.key).with_count(b.doc_count);
                if is_leaf {
                    node = node.leaf();
                }
                Arc::new(node)
            })
            .collect()
    }
}
