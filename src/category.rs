use std::collections::HashMap;

use serde::{Deserialize, Deserializer, Serialize};

pub const DEFAULT_COLOR: &str = "#000000";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(deserialize_with = "crate::types::nullable")]
    pub code: String,
    #[serde(default, deserialize_with = "crate::types::nullable")]
    pub label: String,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default = "default_color", deserialize_with = "nullable_color")]
    pub color: String,
}

fn default_color() -> String { DEFAULT_COLOR.to_string() }

fn nullable_color<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<String, D::Error> {
    Ok(Option::<String>::deserialize(d)?.unwrap_or_else(default_color))
}

impl Category {
    pub fn new(code: impl Into<String>, label: impl Into<String>) -> Self {
        Self { id: None, code: code.into(), label: label.into(), icon: None, color: default_color() }
    }
}

/// Code -> category lookup built from the categories list.
#[derive(Debug, Clone, Default)]
pub struct CategoryRegistry {
    by_code: HashMap<String, Category>,
}

impl CategoryRegistry {
    pub fn new(categories: impl IntoIterator<Item = Category>) -> Self {
        let by_code = categories.into_iter().map(|c| (c.code.clone(), c)).collect();
        Self { by_code }
    }

    pub fn contains(&self, code: &str) -> bool { self.by_code.contains_key(code) }
    pub fn get(&self, code: &str) -> Option<&Category> { self.by_code.get(code) }
    pub fn len(&self) -> usize { self.by_code.len() }
    pub fn is_empty(&self) -> bool { self.by_code.is_empty() }

    /// Display label, falling back to the raw code for unknown categories.
    pub fn label<'a>(&'a self, code: &'a str) -> &'a str {
        self.by_code.get(code).map(|c| c.label.as_str()).unwrap_or(code)
    }

    pub fn icon(&self, code: &str) -> Option<&str> {
        self.by_code.get(code).and_then(|c| c.icon.as_deref())
    }

    /// Categories sorted by label, the order the admin list shows them in.
    pub fn sorted(&self) -> Vec<&Category> {
        let mut all: Vec<&Category> = self.by_code.values().collect();
        all.sort_by(|a, b| a.label.cmp(&b.label).then_with(|| a.code.cmp(&b.code)));
        all
    }
}
