//! Replacement text supplied by the rewriting service.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Rewritten text for one block.
///
/// Rewriting services either return a plain string or a bilingual pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Text {
    Plain(String),
    Bilingual {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        en: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        zh: Option<String>,
    },
}

impl Text {
    /// Text to typeset: `en`, else `zh`, else empty.
    pub fn preferred(&self) -> &str {
        match self {
            Text::Plain(s) => s,
            Text::Bilingual { en, zh } => en
                .as_deref()
                .filter(|s| !s.is_empty())
                .or_else(|| zh.as_deref().filter(|s| !s.is_empty()))
                .unwrap_or(""),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.preferred().is_empty()
    }
}

impl From<String> for Text {
    fn from(s: String) -> Self {
        Text::Plain(s)
    }
}

impl From<&str> for Text {
    fn from(s: &str) -> Self {
        Text::Plain(s.to_string())
    }
}

/// Block id to replacement text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Rewrites(BTreeMap<String, Text>);

impl Rewrites {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, block_id: impl Into<String>, text: impl Into<Text>) {
        self.0.insert(block_id.into(), text.into());
    }

    pub fn with(mut self, block_id: impl Into<String>, text: impl Into<Text>) -> Self {
        self.insert(block_id, text);
        self
    }

    pub fn get(&self, block_id: &str) -> Option<&Text> {
        self.0.get(block_id)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Text)> {
        self.0.iter()
    }

    /// Parse a JSON object mapping block ids to strings or `{en, zh}` pairs.
    pub fn from_json(json: &str) -> crate::Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

impl FromIterator<(String, Text)> for Rewrites {
    fn from_iter<I: IntoIterator<Item = (String, Text)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preferred() {
        assert_eq!(Text::from("hello").preferred(), "hello");

        let both = Text::Bilingual {
            en: Some("Results".into()),
            zh: Some("结果".into()),
        };
        assert_eq!(both.preferred(), "Results");

        let zh_only = Text::Bilingual {
            en: Some(String::new()),
            zh: Some("结果".into()),
        };
        assert_eq!(zh_only.preferred(), "结果");

        let none = Text::Bilingual { en: None, zh: None };
        assert_eq!(none.preferred(), "");
        assert!(none.is_empty());
    }

    #[test]
    fn test_rewrites_from_json() {
        let rewrites = Rewrites::from_json(
            r#"{"block_0": "plain", "block_1": {"en": "english", "zh": "中文"}, "block_2": {"zh": "仅中文"}}"#,
        )
        .unwrap();
        assert_eq!(rewrites.len(), 3);
        assert_eq!(rewrites.get("block_0").unwrap().preferred(), "plain");
        assert_eq!(rewrites.get("block_1").unwrap().preferred(), "english");
        assert_eq!(rewrites.get("block_2").unwrap().preferred(), "仅中文");
        assert!(rewrites.get("block_9").is_none());
    }

    #[test]
    fn test_rewrites_rejects_non_object() {
        assert!(Rewrites::from_json("[1, 2]").is_err());
    }
}
