use serde::{Deserialize, Serialize};
use serde_json::Value;

/// data URI から復元したトークンメタデータ
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NftMetadata {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub attributes: Vec<Attribute>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Attribute {
    #[serde(default)]
    pub trait_type: String,
    #[serde(default)]
    pub value: Value,
}

impl NftMetadata {
    pub fn from_json(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }

    /// trait_type が完全一致する最初の属性値
    pub fn attribute(&self, trait_type: &str) -> Option<&Value> {
        self.attributes
            .iter()
            .find(|a| a.trait_type == trait_type)
            .map(|a| &a.value)
    }

    /// 文字列として取得（数値・真偽値も文字列化する）
    pub fn text(&self, trait_type: &str) -> Option<String> {
        match self.attribute(trait_type)? {
            Value::Null => None,
            Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// 整数として取得。i32 に収まらない値や数値でない値は None
    pub fn integer(&self, trait_type: &str) -> Option<i32> {
        match self.attribute(trait_type)? {
            Value::Number(n) => n.as_i64().and_then(|v| i32::try_from(v).ok()),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }
}
