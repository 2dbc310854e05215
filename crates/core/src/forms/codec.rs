//! Conversion between stored response items and editable form data.
//!
//! The mapping is lossy on purpose:
//! - loading keeps only the last item for a repeated question identifier;
//! - saving skips the `comment` key and every answer the [`AnswerPolicy`] treats as
//!   unanswered.

use crate::model::{FollowupActionRef, FormData, ResponseItem};
use proms_types::QuestionId;

/// Decides which form answers count as "answered" when saving.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AnswerPolicy {
    /// Drop every falsy answer: `null`, `""`, `0` and `false`.
    ///
    /// A genuine answer of `0` is indistinguishable from "not answered" under this policy.
    #[default]
    Truthy,
    /// Drop only `null` and `""`; numeric zero and `false` are kept.
    Present,
}

impl AnswerPolicy {
    pub fn is_answered(&self, value: &crate::model::AnswerValue) -> bool {
        match self {
            AnswerPolicy::Truthy => value.is_truthy(),
            AnswerPolicy::Present => value.is_present(),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AnswerPolicy::Truthy => "truthy",
            AnswerPolicy::Present => "present",
        }
    }
}

impl std::str::FromStr for AnswerPolicy {
    type Err = crate::PromsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "truthy" => Ok(AnswerPolicy::Truthy),
            "present" => Ok(AnswerPolicy::Present),
            other => Err(crate::PromsError::InvalidInput(format!(
                "unknown answer policy '{other}' (expected 'truthy' or 'present')"
            ))),
        }
    }
}

/// Copies each item's answer into `target`, keyed by question identifier.
///
/// Later items overwrite earlier ones with the same identifier. `None` or an empty slice
/// leaves `target` untouched, so callers wanting a clean map must pass a fresh one.
pub fn load_to_form_data(items: Option<&[ResponseItem]>, target: &mut FormData) {
    let Some(items) = items else {
        return;
    };

    for item in items {
        target.insert(item.local_id.as_str(), item.value.clone());
    }
}

/// Builds a fresh form-data map from `items`.
pub fn form_data_from_items(items: &[ResponseItem]) -> FormData {
    let mut data = FormData::new();
    load_to_form_data(Some(items), &mut data);
    data
}

/// Converts form answers into response items owned by `owner`.
///
/// Never fails: the `comment` key, unanswered values and keys that are not exactly a question
/// identifier (blank, or with surrounding whitespace) are skipped. Output follows key order, which callers must not rely on.
pub fn save_from_form_data(
    data: &FormData,
    owner: FollowupActionRef,
    policy: AnswerPolicy,
) -> Vec<ResponseItem> {
    let mut items = Vec::with_capacity(data.len());

    for (key, value) in data.iter() {
        // Keys must already be in trimmed form; otherwise they could alias another question.
        let local_id = match QuestionId::new(key) {
            Ok(id) if id.as_str() == key.as_str() => id,
            _ => {
                tracing::warn!("skipping form key that is not a question id: {key:?}");
                continue;
            }
        };

        if local_id.is_comment() || !policy.is_answered(value) {
            continue;
        }

        items.push(ResponseItem::new(local_id, value.clone(), owner));
    }

    tracing::debug!(
        answered = items.len(),
        submitted = data.len(),
        policy = policy.as_str(),
        "converted form data to response items"
    );

    items
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::AnswerValue;
    use serde_json::json;

    fn owner(id: i64) -> FollowupActionRef {
        FollowupActionRef { id: Some(id) }
    }

    fn item(key: &str, value: serde_json::Value, owner_id: i64) -> ResponseItem {
        ResponseItem::new(
            QuestionId::new(key).unwrap(),
            AnswerValue::new(value),
            owner(owner_id),
        )
    }

    fn keys(items: &[ResponseItem]) -> Vec<&str> {
        let mut keys: Vec<&str> = items.iter().map(|i| i.local_id.as_str()).collect();
        keys.sort_unstable();
        keys
    }

    #[test]
    fn load_maps_each_identifier_to_its_value() {
        let items = vec![item("q1", json!("yes"), 1), item("q2", json!(3), 1)];
        let data = form_data_from_items(&items);

        assert_eq!(data.len(), 2);
        assert_eq!(data.get("q1"), Some(&AnswerValue::from("yes")));
        assert_eq!(data.get("q2"), Some(&AnswerValue::new(json!(3))));
    }

    #[test]
    fn load_last_item_wins_for_duplicate_identifiers() {
        let items = vec![
            item("q1", json!("first"), 1),
            item("q2", json!("other"), 1),
            item("q1", json!("last"), 1),
        ];
        let data = form_data_from_items(&items);

        assert_eq!(data.len(), 2);
        assert_eq!(data.get("q1"), Some(&AnswerValue::from("last")));
    }

    #[test]
    fn load_of_empty_or_absent_items_yields_empty_map() {
        let mut data = FormData::new();
        load_to_form_data(None, &mut data);
        assert!(data.is_empty());

        let empty: Vec<ResponseItem> = Vec::new();
        load_to_form_data(Some(empty.as_slice()), &mut data);
        assert!(data.is_empty());
    }

    #[test]
    fn load_writes_into_caller_supplied_target() {
        let mut data = FormData::new();
        data.insert("comment", "kept");
        let items = vec![item("q1", json!(2), 1)];
        load_to_form_data(Some(items.as_slice()), &mut data);

        assert_eq!(data.len(), 2);
        assert_eq!(data.get("comment"), Some(&AnswerValue::from("kept")));
    }

    #[test]
    fn save_sets_owner_on_every_item() {
        let data: FormData = [("q1", "a"), ("q2", "b"), ("q3", "c")].into_iter().collect();
        let items = save_from_form_data(&data, owner(42), AnswerPolicy::Truthy);

        assert_eq!(items.len(), 3);
        assert!(items.iter().all(|i| i.followup_action == Some(owner(42))));
        assert!(items.iter().all(|i| i.id.is_none()));
    }

    #[test]
    fn save_never_emits_comment() {
        let mut data = FormData::new();
        data.insert("comment", "feeling better");
        data.insert("q1", "yes");

        for policy in [AnswerPolicy::Truthy, AnswerPolicy::Present] {
            let items = save_from_form_data(&data, owner(1), policy);
            assert_eq!(keys(&items), vec!["q1"]);
        }
    }

    #[test]
    fn save_drops_falsy_answers_by_default() {
        let mut data = FormData::new();
        data.insert("empty", "");
        data.insert("zero", 0);
        data.insert("no", false);
        data.insert("missing", AnswerValue::null());
        data.insert("q2", "5");

        let items = save_from_form_data(&data, owner(1), AnswerPolicy::default());
        assert_eq!(keys(&items), vec!["q2"]);
    }

    #[test]
    fn present_policy_keeps_zero_and_false() {
        let mut data = FormData::new();
        data.insert("empty", "");
        data.insert("zero", 0);
        data.insert("no", false);
        data.insert("missing", AnswerValue::null());

        let items = save_from_form_data(&data, owner(1), AnswerPolicy::Present);
        assert_eq!(keys(&items), vec!["no", "zero"]);
    }

    #[test]
    fn save_skips_blank_keys() {
        let mut data = FormData::new();
        data.insert("  ", "orphan");
        data.insert("q1", "kept");

        let items = save_from_form_data(&data, owner(1), AnswerPolicy::Truthy);
        assert_eq!(keys(&items), vec!["q1"]);
    }

    #[test]
    fn save_never_emits_padded_comment() {
        let mut data = FormData::new();
        data.insert(" comment", "free text");
        data.insert("comment ", "more text");
        data.insert("q1", "a");

        let items = save_from_form_data(&data, owner(1), AnswerPolicy::Truthy);
        assert_eq!(keys(&items), vec!["q1"]);
    }

    #[test]
    fn save_skips_keys_that_collide_after_trimming() {
        let mut data = FormData::new();
        data.insert("q1", "a");
        data.insert("q1 ", "b");
        data.insert(" q2", "c");

        let items = save_from_form_data(&data, owner(1), AnswerPolicy::Truthy);
        assert_eq!(keys(&items), vec!["q1"]);
        assert_eq!(items[0].value, AnswerValue::from("a"));
    }

    #[test]
    fn save_passes_malformed_values_through() {
        let mut data = FormData::new();
        data.insert("q1", AnswerValue::new(json!({"nested": [1, 2]})));

        let items = save_from_form_data(&data, owner(1), AnswerPolicy::Truthy);
        assert_eq!(items[0].value, AnswerValue::new(json!({"nested": [1, 2]})));
    }

    #[test]
    fn round_trip_keeps_only_truthy_non_comment_items() {
        let items = vec![
            item("q1", json!("yes"), 9),
            item("q2", json!(0), 9),
            item("comment", json!("free text"), 9),
            item("q3", json!(""), 9),
            item("q4", json!(4), 9),
        ];

        let data = form_data_from_items(&items);
        let saved = save_from_form_data(&data, owner(9), AnswerPolicy::Truthy);
        assert_eq!(keys(&saved), vec!["q1", "q4"]);
        assert!(saved.iter().all(|i| i.followup_action == Some(owner(9))));
    }

    #[test]
    fn answer_policy_parses_config_values() {
        assert_eq!("Truthy".parse::<AnswerPolicy>().unwrap(), AnswerPolicy::Truthy);
        assert_eq!(" present ".parse::<AnswerPolicy>().unwrap(), AnswerPolicy::Present);
        assert!("lenient".parse::<AnswerPolicy>().is_err());
    }
}
