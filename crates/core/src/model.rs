//! Followup action and response item records.
//!
//! The JSON shape follows the REST backend's camelCase convention: a response item refers to
//! its owner as `"followupAction": {"id": 7}` rather than embedding the whole record.

use chrono::{DateTime, Utc};
use proms_types::QuestionId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A single answer value as entered on the form.
///
/// Values are kept as raw JSON primitives and are not interpreted. Arrays and objects are
/// carried through untouched.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnswerValue(serde_json::Value);

impl AnswerValue {
    pub fn new(value: serde_json::Value) -> Self {
        Self(value)
    }

    pub fn null() -> Self {
        Self(serde_json::Value::Null)
    }

    pub fn into_json(self) -> serde_json::Value {
        self.0
    }

    /// Loose truthiness as used by browser form handling.
    ///
    /// `null`, `false`, numeric zero and the empty string are falsy. Arrays and objects are
    /// always truthy.
    pub fn is_truthy(&self) -> bool {
        match &self.0 {
            serde_json::Value::Null => false,
            serde_json::Value::Bool(b) => *b,
            serde_json::Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
            serde_json::Value::String(s) => !s.is_empty(),
            serde_json::Value::Array(_) | serde_json::Value::Object(_) => true,
        }
    }

    /// True unless the value is `null` or the empty string.
    pub fn is_present(&self) -> bool {
        match &self.0 {
            serde_json::Value::Null => false,
            serde_json::Value::String(s) => !s.is_empty(),
            _ => true,
        }
    }
}

impl From<serde_json::Value> for AnswerValue {
    fn from(value: serde_json::Value) -> Self {
        Self(value)
    }
}

impl From<&str> for AnswerValue {
    fn from(value: &str) -> Self {
        Self(serde_json::Value::String(value.to_owned()))
    }
}

impl From<String> for AnswerValue {
    fn from(value: String) -> Self {
        Self(serde_json::Value::String(value))
    }
}

impl From<i64> for AnswerValue {
    fn from(value: i64) -> Self {
        Self(serde_json::Value::from(value))
    }
}

impl From<i32> for AnswerValue {
    fn from(value: i32) -> Self {
        Self(serde_json::Value::from(value))
    }
}

impl From<bool> for AnswerValue {
    fn from(value: bool) -> Self {
        Self(serde_json::Value::Bool(value))
    }
}

/// Editable key-indexed answers for one questionnaire.
///
/// Keys are plain strings because the form may carry non-question fields (`comment`) and
/// keys nobody has validated yet.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FormData(BTreeMap<String, AnswerValue>);

impl FormData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<AnswerValue>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&AnswerValue> {
        self.0.get(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &AnswerValue)> {
        self.0.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.0.keys()
    }
}

impl<K: Into<String>, V: Into<AnswerValue>> FromIterator<(K, V)> for FormData {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

impl IntoIterator for FormData {
    type Item = (String, AnswerValue);
    type IntoIter = std::collections::btree_map::IntoIter<String, AnswerValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

/// Back-reference from a response item to the followup action owning it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FollowupActionRef {
    pub id: Option<i64>,
}

/// One answered question within a followup action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseItem {
    #[serde(default)]
    pub id: Option<i64>,
    pub local_id: QuestionId,
    #[serde(default)]
    pub value: AnswerValue,
    #[serde(default)]
    pub followup_action: Option<FollowupActionRef>,
}

impl ResponseItem {
    pub fn new(local_id: QuestionId, value: AnswerValue, owner: FollowupActionRef) -> Self {
        Self {
            id: None,
            local_id,
            value,
            followup_action: Some(owner),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FollowupStatus {
    #[default]
    Pending,
    Started,
    Completed,
    Unknown,
}

impl FollowupStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            FollowupStatus::Pending => "PENDING",
            FollowupStatus::Started => "STARTED",
            FollowupStatus::Completed => "COMPLETED",
            FollowupStatus::Unknown => "UNKNOWN",
        }
    }
}

impl std::str::FromStr for FollowupStatus {
    type Err = crate::PromsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "PENDING" => Ok(FollowupStatus::Pending),
            "STARTED" => Ok(FollowupStatus::Started),
            "COMPLETED" => Ok(FollowupStatus::Completed),
            "UNKNOWN" => Ok(FollowupStatus::Unknown),
            other => Err(crate::PromsError::InvalidInput(format!(
                "unknown followup status '{other}'"
            ))),
        }
    }
}

/// An instance of a clinical questionnaire assigned to a patient.
///
/// Patient, procedure and scheduling details are opaque here and ride along in `extra`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FollowupAction {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub status: FollowupStatus,
    #[serde(default)]
    pub outcome_comment: Option<String>,
    #[serde(default)]
    pub completed_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_modified: Option<DateTime<Utc>>,
    #[serde(default)]
    pub response_items: Vec<ResponseItem>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl FollowupAction {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    /// Reference suitable for the `followupAction` field of owned response items.
    pub fn owner_ref(&self) -> FollowupActionRef {
        FollowupActionRef { id: self.id }
    }
}
