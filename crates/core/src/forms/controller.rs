//! Form submission controller.
//!
//! Owns one followup action and its editable form data. Submitting converts the form into
//! response items, replaces the action's items wholesale and saves it through the injected
//! [`FollowupActionService`].
//!
//! State machine:
//!
//! ```text
//! Idle --submit/save--> Saving --update resolves (ok or err)--> Idle
//! ```
//!
//! A second submit while `Saving` is rejected with [`PromsError::SaveInProgress`]. The return
//! to `Idle` is tied to a guard, so it also happens if the save future is dropped mid-flight.
//! A failed save does not roll back the in-memory response items.

use crate::alerts::AlertService;
use crate::events::{EventBus, PromsEvent};
use crate::forms::codec::{load_to_form_data, save_from_form_data, AnswerPolicy};
use crate::forms::schema::FormSchema;
use crate::model::{FollowupAction, FormData};
use crate::service::FollowupActionService;
use crate::{PromsError, PromsResult};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SaveState {
    #[default]
    Idle,
    Saving,
}

#[derive(Debug)]
struct FormSession {
    state: SaveState,
    action: FollowupAction,
    form_data: FormData,
}

/// Returns the session to `Idle` when dropped.
struct SavingGuard<'a> {
    session: &'a Mutex<FormSession>,
}

impl Drop for SavingGuard<'_> {
    fn drop(&mut self) {
        lock(self.session).state = SaveState::Idle;
    }
}

fn lock(session: &Mutex<FormSession>) -> MutexGuard<'_, FormSession> {
    session.lock().unwrap_or_else(PoisonError::into_inner)
}

pub struct FormController<S: FollowupActionService + ?Sized> {
    service: Arc<S>,
    events: EventBus,
    alerts: AlertService,
    policy: AnswerPolicy,
    schema: Option<Arc<FormSchema>>,
    session: Mutex<FormSession>,
}

impl<S: FollowupActionService + ?Sized> FormController<S> {
    /// Creates a controller for `action`. Call [`initialize`](Self::initialize) before use.
    pub fn new(
        action: FollowupAction,
        service: Arc<S>,
        events: EventBus,
        alerts: AlertService,
    ) -> Self {
        Self {
            service,
            events,
            alerts,
            policy: AnswerPolicy::default(),
            schema: None,
            session: Mutex::new(FormSession {
                state: SaveState::Idle,
                action,
                form_data: FormData::new(),
            }),
        }
    }

    pub fn with_policy(mut self, policy: AnswerPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Submissions are validated against `schema` before conversion.
    pub fn with_schema(mut self, schema: Arc<FormSchema>) -> Self {
        self.schema = Some(schema);
        self
    }

    /// Resets to `Idle` and repopulates the form data from previously saved answers.
    ///
    /// # Errors
    ///
    /// Returns [`PromsError::SaveInProgress`] while a save is running; the session is left as is.
    pub fn initialize(&self) -> PromsResult<()> {
        let mut session = lock(&self.session);
        if session.state == SaveState::Saving {
            return Err(PromsError::SaveInProgress);
        }
        session.state = SaveState::Idle;

        let mut form_data = FormData::new();
        if !session.action.response_items.is_empty() {
            load_to_form_data(Some(session.action.response_items.as_slice()), &mut form_data);
        }
        session.form_data = form_data;

        tracing::debug!(
            followup_action = ?session.action.id,
            answers = session.form_data.len(),
            "initialised form"
        );
        Ok(())
    }

    pub fn state(&self) -> SaveState {
        lock(&self.session).state
    }

    pub fn form_data(&self) -> FormData {
        lock(&self.session).form_data.clone()
    }

    pub fn followup_action(&self) -> FollowupAction {
        lock(&self.session).action.clone()
    }

    /// Replaces the action's response items with the answers in `data` and saves it.
    ///
    /// # Errors
    ///
    /// - [`PromsError::UnknownQuestion`] if a schema is attached and `data` has undeclared keys;
    ///   nothing is changed in that case.
    /// - [`PromsError::SaveInProgress`] if a save is already running.
    /// - Any error returned by the update operation.
    pub async fn submit(&self, data: FormData) -> PromsResult<FollowupAction> {
        if let Some(schema) = &self.schema {
            schema.validate(&data)?;
        }

        let (guard, action) = {
            let mut session = lock(&self.session);
            if session.state == SaveState::Saving {
                return Err(PromsError::SaveInProgress);
            }

            let items = save_from_form_data(&data, session.action.owner_ref(), self.policy);
            session.action.response_items = items;
            session.form_data = data;
            session.state = SaveState::Saving;
            (
                SavingGuard {
                    session: &self.session,
                },
                session.action.clone(),
            )
        };

        self.persist(guard, action).await
    }

    /// Saves the action as it currently stands.
    pub async fn save(&self) -> PromsResult<FollowupAction> {
        let (guard, action) = {
            let mut session = lock(&self.session);
            if session.state == SaveState::Saving {
                return Err(PromsError::SaveInProgress);
            }
            session.state = SaveState::Saving;
            (
                SavingGuard {
                    session: &self.session,
                },
                session.action.clone(),
            )
        };

        self.persist(guard, action).await
    }

    async fn persist(
        &self,
        guard: SavingGuard<'_>,
        action: FollowupAction,
    ) -> PromsResult<FollowupAction> {
        let id = action.id;
        let result = self.service.update(action).await;

        match result {
            Ok(saved) => {
                lock(&self.session).action = saved.clone();
                drop(guard);
                tracing::info!(
                    followup_action = ?saved.id,
                    items = saved.response_items.len(),
                    "saved followup action"
                );
                self.events
                    .publish(PromsEvent::FollowupActionListModification(saved.clone()));
                Ok(saved)
            }
            Err(err) => {
                drop(guard);
                tracing::warn!(followup_action = ?id, "saving followup action failed: {err}");
                self.alerts.error(err.to_string());
                Err(err)
            }
        }
    }
}
