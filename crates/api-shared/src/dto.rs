//! Request and response bodies exchanged over the REST API.
//!
//! Answer values are free-form JSON primitives, documented as `Object` in the OpenAPI schema.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use utoipa::ToSchema;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct HealthRes {
    pub ok: bool,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ErrorRes {
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ResponseItemDto {
    #[serde(default)]
    pub id: Option<i64>,
    pub local_id: String,
    #[schema(value_type = Object)]
    #[serde(default)]
    pub value: serde_json::Value,
    #[serde(default)]
    pub followup_action_id: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FollowupActionDto {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub name: Option<String>,
    /// One of `PENDING`, `STARTED`, `COMPLETED`, `UNKNOWN`.
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub outcome_comment: Option<String>,
    /// RFC 3339 timestamp.
    #[serde(default)]
    pub completed_date: Option<String>,
    /// RFC 3339 timestamp, set by the server on every save.
    #[serde(default)]
    pub last_modified: Option<String>,
    #[serde(default)]
    pub response_items: Vec<ResponseItemDto>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ListFollowupActionsRes {
    pub followup_actions: Vec<FollowupActionDto>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateFollowupActionReq {
    pub name: String,
    #[serde(default)]
    pub status: Option<String>,
}

/// Editable answers keyed by question identifier.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FormDataDto {
    #[schema(value_type = Object)]
    pub form_data: BTreeMap<String, serde_json::Value>,
}
