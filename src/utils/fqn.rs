//! Fully qualified name helpers.
//!
//! FQN 以 `.` 連接各段，名稱本身含有 `.` 時以雙引號包起來，
//! 例如 `svc.coll."v1.users"`。

use crate::utils::error::{CatalogError, Result};

pub struct FullyQualifiedName;

impl FullyQualifiedName {
    /// 在既有 FQN 後面加上一段名稱
    pub fn add(prefix: &str, name: &str) -> Result<String> {
        Ok(format!("{}.{}", prefix, Self::quote_name(name)?))
    }

    pub fn build(parts: &[&str]) -> Result<String> {
        let quoted = parts
            .iter()
            .map(|part| Self::quote_name(part))
            .collect::<Result<Vec<_>>>()?;
        Ok(quoted.join("."))
    }

    pub fn quote_name(name: &str) -> Result<String> {
        let unquoted = name.strip_prefix('"').and_then(|n| n.strip_suffix('"'));
        match unquoted {
            Some(inner) if inner.contains('"') => Err(invalid_name(name)),
            Some(inner) if inner.contains('.') => Ok(name.to_string()),
            Some(inner) => Ok(inner.to_string()),
            None if name.contains('"') => Err(invalid_name(name)),
            None if name.contains('.') => Ok(format!("\"{}\"", name)),
            None => Ok(name.to_string()),
        }
    }

    /// 依 `.` 拆段，忽略引號內的 `.`，並去掉引號
    pub fn split(fqn: &str) -> Vec<String> {
        let mut parts = Vec::new();
        let mut current = String::new();
        let mut in_quotes = false;
        for ch in fqn.chars() {
            match ch {
                '"' => in_quotes = !in_quotes,
                '.' if !in_quotes => parts.push(std::mem::take(&mut current)),
                _ => current.push(ch),
            }
        }
        parts.push(current);
        parts
    }
}

fn invalid_name(name: &str) -> CatalogError {
    CatalogError::InvalidRequest {
        violations: vec![format!("Invalid name {}", name)],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_plain_and_dotted_names() {
        assert_eq!(
            FullyQualifiedName::add("openmetadata.users", "getUsers").unwrap(),
            "openmetadata.users.getUsers"
        );
        assert_eq!(
            FullyQualifiedName::add("svc.coll", "v1.users").unwrap(),
            "svc.coll.\"v1.users\""
        );
    }

    #[test]
    fn test_quote_name_rejects_embedded_quotes() {
        assert!(FullyQualifiedName::quote_name("a\"b").is_err());
        assert_eq!(FullyQualifiedName::quote_name("\"plain\"").unwrap(), "plain");
    }

    #[test]
    fn test_split_respects_quotes() {
        assert_eq!(
            FullyQualifiedName::split("svc.coll.\"v1.users\""),
            vec!["svc", "coll", "v1.users"]
        );
    }
}
