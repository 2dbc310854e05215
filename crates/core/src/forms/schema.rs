//! Questionnaire definitions used to check submitted form keys.
//!
//! Schemas are YAML documents listing the question identifiers a form may contain. The
//! MOXFQ definition ships with the crate under `templates/forms/`.

use crate::constants::MOXFQ_SCHEMA_YAML;
use crate::model::FormData;
use crate::{PromsError, PromsResult};
use proms_types::{NonEmptyText, QuestionId};
use serde::Deserialize;
use std::collections::HashSet;

#[derive(Debug, Clone, Deserialize)]
pub struct QuestionDef {
    pub id: QuestionId,
    pub label: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FormSchema {
    pub name: NonEmptyText,
    pub title: String,
    pub questions: Vec<QuestionDef>,
}

impl FormSchema {
    /// Parses a schema and checks that question identifiers are unique.
    pub fn from_yaml_str(raw: &str) -> PromsResult<Self> {
        let schema: FormSchema =
            serde_yaml::from_str(raw).map_err(PromsError::YamlDeserialization)?;

        let mut seen = HashSet::new();
        for question in &schema.questions {
            if question.id.is_comment() {
                return Err(PromsError::InvalidInput(format!(
                    "form '{}' declares the reserved key '{}' as a question",
                    schema.name,
                    QuestionId::COMMENT
                )));
            }
            if !seen.insert(question.id.as_str()) {
                return Err(PromsError::InvalidInput(format!(
                    "form '{}' declares question '{}' twice",
                    schema.name, question.id
                )));
            }
        }

        Ok(schema)
    }

    pub fn moxfq() -> PromsResult<Self> {
        Self::from_yaml_str(MOXFQ_SCHEMA_YAML)
    }

    /// Looks up a built-in schema by name, ignoring case.
    pub fn builtin(name: &str) -> PromsResult<Option<Self>> {
        if name.trim().eq_ignore_ascii_case("moxfq") {
            return Self::moxfq().map(Some);
        }
        Ok(None)
    }

    pub fn has_question(&self, key: &str) -> bool {
        self.questions.iter().any(|q| q.id.as_str() == key)
    }

    /// Rejects keys that are neither declared questions nor the `comment` field.
    ///
    /// Values are not inspected.
    pub fn validate(&self, data: &FormData) -> PromsResult<()> {
        for key in data.keys() {
            if key == QuestionId::COMMENT || self.has_question(key) {
                continue;
            }
            return Err(PromsError::UnknownQuestion {
                form: self.name.to_string(),
                question: key.clone(),
            });
        }
        Ok(())
    }
}
