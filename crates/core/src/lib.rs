//! # PROMs Core
//!
//! Core business logic for the PROMs followup questionnaire platform.
//!
//! This crate contains:
//! - The followup action / response item data model
//! - Conversion between stored response items and editable form data
//! - The form submission controller, with its event bus and alert channel
//! - File-backed followup action storage under the configured data directory
//!
//! **No API concerns**: HTTP servers and wire DTOs belong in `api-rest` and `api-shared`.

pub mod alerts;
pub mod config;
pub mod constants;
pub mod error;
pub mod events;
pub mod forms;
pub mod model;
pub mod service;
pub mod store;

pub use alerts::{Alert, AlertService};
pub use config::CoreConfig;
pub use constants::DEFAULT_DATA_DIR;
pub use error::{PromsError, PromsResult};
pub use events::{EventBus, PromsEvent};
pub use forms::{AnswerPolicy, FormController, FormSchema, SaveState};
pub use model::{
    AnswerValue, FollowupAction, FollowupActionRef, FollowupStatus, FormData, ResponseItem,
};
pub use proms_types::{NonEmptyText, QuestionId, TextError};
pub use service::FollowupActionService;
pub use store::FollowupActionStore;
