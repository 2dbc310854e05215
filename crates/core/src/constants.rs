//! Constants used throughout the PROMs core crate.

/// Default directory for followup action storage when no explicit directory is configured.
pub const DEFAULT_DATA_DIR: &str = "proms_data";

/// Directory name (under the data directory) holding one JSON file per followup action.
pub const FOLLOWUP_ACTIONS_DIR_NAME: &str = "followup_actions";

/// Name of the event broadcast after a followup action has been saved.
pub const FOLLOWUP_ACTION_LIST_MODIFICATION: &str = "followupActionListModification";

/// Default capacity of the event and alert broadcast channels.
pub const DEFAULT_EVENT_CAPACITY: usize = 64;

/// Built-in MOXFQ questionnaire definition.
pub const MOXFQ_SCHEMA_YAML: &str = include_str!("../templates/forms/moxfq.yaml");
