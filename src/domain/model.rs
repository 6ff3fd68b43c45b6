use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;
use std::fmt;

/// 單場賽事的結果欄位，鍵名由後端決定，沒有固定 schema
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResultRecord {
    pub data: HashMap<String, serde_json::Value>,
}

impl ResultRecord {
    pub fn new(data: HashMap<String, serde_json::Value>) -> Self {
        Self { data }
    }

    /// Only JSON objects are result records; anything else has no fields.
    pub fn from_value(value: &serde_json::Value) -> Option<Self> {
        match value {
            serde_json::Value::Object(obj) => Some(Self {
                data: obj.iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
            }),
            _ => None,
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl<K: Into<String>> FromIterator<(K, serde_json::Value)> for ResultRecord {
    fn from_iter<I: IntoIterator<Item = (K, serde_json::Value)>>(iter: I) -> Self {
        Self {
            data: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DisplayField {
    pub label: String,
    pub value: String,
}

impl DisplayField {
    pub fn new(label: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            value: value.into(),
        }
    }
}

/// Row identifier. The backend hands out either uuids or integers, so both
/// are normalized to text.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct EntityId(String);

impl EntityId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EntityId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl<'de> Deserialize<'de> for EntityId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawId {
            Text(String),
            Number(serde_json::Number),
        }

        Ok(match RawId::deserialize(deserializer)? {
            RawId::Text(s) => EntityId(s),
            RawId::Number(n) => EntityId(n.to_string()),
        })
    }
}

pub const PLACEHOLDER_AVATAR: &str = "https://via.placeholder.com/150";

/// `entities` 資料表的一列
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Athlete {
    pub id: EntityId,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub name: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub subcategory: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
}

impl Athlete {
    /// Subcategory first, then category, then `default`.
    pub fn display_category<'a>(&'a self, default: &'a str) -> &'a str {
        non_blank(&self.subcategory)
            .or_else(|| non_blank(&self.category))
            .unwrap_or(default)
    }

    pub fn sport<'a>(&'a self, default: &'a str) -> &'a str {
        non_blank(&self.category).unwrap_or(default)
    }

    pub fn avatar_url(&self) -> &str {
        non_blank(&self.image_url).unwrap_or(PLACEHOLDER_AVATAR)
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|s| !s.is_empty())
}

fn null_as_empty<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// Athlete columns embedded in feed rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddedAthlete {
    #[serde(default)]
    pub id: Option<EntityId>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
}

/// `events` 資料表的一列
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AthleteEvent {
    pub id: EntityId,
    #[serde(default)]
    pub entity_id: Option<EntityId>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub title: String,
    #[serde(default)]
    pub start_time: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub result: serde_json::Value,
    #[serde(default, rename = "entities")]
    pub athlete: Option<EmbeddedAthlete>,
}

impl AthleteEvent {
    pub fn result_record(&self) -> Option<ResultRecord> {
        ResultRecord::from_value(&self.result)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AthleteProfile {
    pub athlete: Athlete,
    pub events: Vec<AthleteEvent>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default = "default_token_type")]
    pub token_type: String,
    #[serde(default)]
    pub expires_in: Option<i64>,
    #[serde(default)]
    pub expires_at: Option<i64>,
    pub user: User,
}

fn default_token_type() -> String {
    "bearer".to_string()
}

/// 提早一分鐘視為過期，避免請求途中 token 失效
pub const SESSION_EXPIRY_LEEWAY_SECS: i64 = 60;

impl Session {
    pub fn is_expired(&self, now: chrono::DateTime<chrono::Utc>) -> bool {
        match self.expires_at {
            Some(expires_at) => now.timestamp() + SESSION_EXPIRY_LEEWAY_SECS >= expires_at,
            None => false,
        }
    }

    pub fn user_id(&self) -> &str {
        &self.user.id
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub icon: String,
}

pub const ALL_CATEGORIES: &str = "all";

impl Category {
    pub fn new(id: &str, name: &str, icon: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            icon: icon.to_string(),
        }
    }

    pub fn defaults() -> Vec<Category> {
        vec![
            Category::new(ALL_CATEGORIES, "All", "apps"),
            Category::new("tennis", "Tennis", "tennisball"),
            Category::new("f1", "F1", "car-sport"),
            Category::new("basketball", "Basketball", "basketball"),
        ]
    }
}
