use serde::{Deserialize, Serialize};

/// 預設的「欄位不存在」哨兵字串，只在輸入/輸出邊界使用
pub const NULL_OPTION_KEY: &str = "OM_NULL_FIELD";

/// 使用者選取的值：一般值，或是「欄位不存在」
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Token {
    Present(String),
    Absent,
}

impl Token {
    pub fn present(value: impl Into<String>) -> Self {
        Token::Present(value.into())
    }

    /// 從外部字串解析，`null_key` 對應到 [`Token::Absent`]
    pub fn from_wire(value: &str, null_key: &str) -> Self {
        if value == null_key {
            Token::Absent
        } else {
            Token::Present(value.to_string())
        }
    }

    pub fn to_wire<'a>(&'a self, null_key: &'a str) -> &'a str {
        match self {
            Token::Present(value) => value,
            Token::Absent => null_key,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterOption {
    pub token: Token,
    pub label: String,
    pub count: Option<u64>,
}

impl FilterOption {
    pub fn new(token: Token, label: impl Into<String>) -> Self {
        Self {
            token,
            label: label.into(),
            count: None,
        }
    }

    pub fn with_count(mut self, count: u64) -> Self {
        self.count = Some(count);
        self
    }
}

impl From<Token> for FilterOption {
    fn from(token: Token) -> Self {
        let label = match &token {
            Token::Present(value) => value.clone(),
            Token::Absent => NULL_OPTION_KEY.to_string(),
        };
        Self::new(token, label)
    }
}

/// 搜尋頁上的快速篩選欄位
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuickFilterField {
    pub label: String,
    /// 文件中的 dot-path，例如 `owner.displayName.keyword`
    pub key: String,
    #[serde(default)]
    pub value: Vec<FilterOption>,
}

impl QuickFilterField {
    pub fn new(label: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            key: key.into(),
            value: Vec::new(),
        }
    }

    pub fn with_values(mut self, tokens: impl IntoIterator<Item = Token>) -> Self {
        self.value = tokens.into_iter().map(FilterOption::from).collect();
        self
    }
}

/// 每個欄位目前選取的值
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSelection {
    pub label: String,
    pub key: String,
    pub tokens: Vec<Token>,
}
