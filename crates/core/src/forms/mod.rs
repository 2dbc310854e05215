//! Questionnaire handling: codec, schemas and the submission controller.

pub mod codec;
pub mod controller;
pub mod schema;

pub use codec::{form_data_from_items, load_to_form_data, save_from_form_data, AnswerPolicy};
pub use controller::{FormController, SaveState};
pub use schema::{FormSchema, QuestionDef};
