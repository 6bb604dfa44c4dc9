//! 可延遲載入的樹狀結構，更新時共用未變動的子樹。

use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TreeNode {
    pub key: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<u64>,
    #[serde(default)]
    pub is_leaf: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<Arc<TreeNode>>>,
}

impl TreeNode {
    pub fn new(key: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            title: title.into(),
            count: None,
            is_leaf: false,
            children: None,
        }
    }

    pub fn with_count(mut self, count: u64) -> Self {
        self.count = Some(count);
        self
    }

    pub fn leaf(mut self) -> Self {
        self.is_leaf = true;
        self
    }

    pub fn with_children(mut self, children: Vec<Arc<TreeNode>>) -> Self {
        self.children = Some(children);
        self
    }
}

/// 把 `key` 節點的子節點換成 `children`。
///
/// 所有 key 相符的節點都會被替換 (不再往下找)；沒有相符節點的子樹
/// 直接沿用原本的 `Arc`。找不到任何相符節點時，結果與輸入指向同一批節點。
pub fn update_tree_data(
    tree: &[Arc<TreeNode>],
    key: &str,
    children: &[Arc<TreeNode>],
) -> Vec<Arc<TreeNode>> {
    tree.iter()
        .map(|node| update_node(node, key, children).unwrap_or_else(|| Arc::clone(node)))
        .collect()
}

// None 代表子樹沒有變動
fn update_node(node: &Arc<TreeNode>, key: &str, children: &[Arc<TreeNode>]) -> Option<Arc<TreeNode>> {
    if node.key == key {
        let mut updated = TreeNode::clone(node);
        updated.children = Some(children.to_vec());
        return Some(Arc::new(updated));
    }

    let current = node.children.as_ref()?;
    let mut changed = false;
    let next: Vec<Arc<TreeNode>> = current
        .iter()
        .map(|child| match update_node(child, key, children) {
            Some(updated) => {
                changed = true;
                updated
            }
            None => Arc::clone(child),
        })
        .collect();

    if !changed {
        return None;
    }
    let mut updated = TreeNode::clone(node);
    updated.children = Some(next);
    Some(Arc::new(updated))
}

/// 深度優先尋找第一個 key 相符的節點
pub fn find_node<'a>(tree: &'a [Arc<TreeNode>], key: &str) -> Option<&'a Arc<TreeNode>> {
    tree.iter().find_map(|node| {
        if node.key == key {
            Some(node)
        } else {
            node.children
                .as_deref()
                .and_then(|children| find_node(children, key))
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_tree() -> Vec<Arc<TreeNode>> {
        vec![
            Arc::new(TreeNode::new("mysql", "mysql").with_children(vec![
                Arc::new(TreeNode::new("mysql/prod", "prod")),
                Arc::new(TreeNode::new("mysql/dev", "dev")),
            ])),
            Arc::new(TreeNode::new("rest", "rest")),
        ]
    }

    #[test]
    fn test_update_replaces_only_matching_children() {
        let tree = sample_tree();
        let new_children = vec![Arc::new(TreeNode::new("mysql/prod/shop", "shop").leaf())];

        let updated = update_tree_data(&tree, "mysql/prod", &new_children);

        let prod = find_node(&updated, "mysql/prod").unwrap();
        assert_eq!(prod.children.as_deref(), Some(new_children.as_slice()));
        assert_eq!(prod.title, "prod");

        // 兄弟節點與無關子樹共用原本的 Arc
        assert!(Arc::ptr_eq(&updated[1], &tree[1]));
        let old_dev = find_node(&tree, "mysql/dev").unwrap();
        let new_dev = find_node(&updated, "mysql/dev").unwrap();
        assert!(Arc::ptr_eq(old_dev, new_dev));

        // 祖先是新節點，但內容只差在該子節點
        assert!(!Arc::ptr_eq(&updated[0], &tree[0]));
        assert_eq!(updated[0].key, tree[0].key);

        // 原樹不被修改
        assert!(find_node(&tree, "mysql/prod").unwrap().children.is_none());
    }

    #[test]
    fn test_update_root_level_node() {
        let tree = sample_tree();
        let new_children = vec![Arc::new(TreeNode::new("rest/sample", "sample"))];
        let updated = update_tree_data(&tree, "rest", &new_children);
        assert_eq!(updated[1].children.as_ref().map(Vec::len), Some(1));
        assert!(Arc::ptr_eq(&updated[0], &tree[0]));
    }

    #[test]
    fn test_unknown_key_returns_equal_tree() {
        let tree = sample_tree();
        let updated = update_tree_data(&tree, "missing", &[]);
        assert_eq!(updated, tree);
        assert!(updated.iter().zip(&tree).all(|(a, b)| Arc::ptr_eq(a, b)));
    }

    #[test]
    fn test_update_with_empty_children() {
        let tree = sample_tree();
        let updated = update_tree_data(&tree, "mysql", &[]);
        assert_eq!(updated[0].children.as_deref(), Some(&[][..]));
    }

    #[test]
    fn test_tree_serializes_through_arc_children() {
        let tree = sample_tree();
        let value = serde_json::to_value(&tree).unwrap();
        assert_eq!(value[0]["children"][1]["key"], "mysql/dev");
        assert_eq!(value[1]["isLeaf"], false);
        assert!(value[1].get("children").is_none());

        let parsed: Vec<Arc<TreeNode>> = serde_json::from_value(value).unwrap();
        assert_eq!(parsed, tree);
    }
}
