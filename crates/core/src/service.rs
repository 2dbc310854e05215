//! Persistence seam for followup actions.

use crate::model::FollowupAction;
use crate::PromsResult;
use async_trait::async_trait;

/// Operations the form controller and API layers need from the followup action backend.
///
/// `update` is not retried by callers and is not assumed to be idempotent.
#[async_trait]
pub trait FollowupActionService: Send + Sync {
    /// Persists `action` and returns the saved record.
    async fn update(&self, action: FollowupAction) -> PromsResult<FollowupAction>;

    async fn find(&self, id: i64) -> PromsResult<FollowupAction>;
}
