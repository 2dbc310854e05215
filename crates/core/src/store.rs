//! File-backed followup action storage.
//!
//! ## Storage Layout
//!
//! ```text
//! <data_dir>/
//!   followup_actions/
//!     1.json
//!     2.json
//! ```
//!
//! Each file holds one pretty-printed followup action. Writes go to a temporary sibling file
//! that is then renamed over the target, so readers never see a half-written record.

use crate::config::CoreConfig;
use crate::constants::FOLLOWUP_ACTIONS_DIR_NAME;
use crate::model::FollowupAction;
use crate::service::FollowupActionService;
use crate::{PromsError, PromsResult};
use async_trait::async_trait;
use chrono::Utc;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;

#[derive(Clone, Debug)]
pub struct FollowupActionStore {
    dir: PathBuf,
    // Serialises id allocation and record writes within this store.
    write_lock: Arc<Mutex<()>>,
}

impl FollowupActionStore {
    pub fn new(cfg: &CoreConfig) -> Self {
        Self::at(cfg.data_dir().join(FOLLOWUP_ACTIONS_DIR_NAME))
    }

    /// Store rooted directly at `dir`.
    pub fn at(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn record_path(&self, id: i64) -> PathBuf {
        self.dir.join(format!("{id}.json"))
    }

    async fn ensure_dir(&self) -> PromsResult<()> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(PromsError::StorageDirCreation)
    }

    async fn read_record(path: &Path) -> PromsResult<FollowupAction> {
        let raw = tokio::fs::read(path).await.map_err(PromsError::FileRead)?;
        serde_json::from_slice(&raw).map_err(PromsError::Deserialization)
    }

    async fn write_record(&self, id: i64, action: &FollowupAction) -> PromsResult<()> {
        let raw = serde_json::to_vec_pretty(action).map_err(PromsError::Serialization)?;
        let target = self.record_path(id);
        let tmp = self.dir.join(format!(".{id}.json.tmp"));

        tokio::fs::write(&tmp, raw)
            .await
            .map_err(PromsError::FileWrite)?;
        tokio::fs::rename(&tmp, &target)
            .await
            .map_err(PromsError::FileWrite)
    }

    /// Ids of every stored record, ascending.
    async fn ids(&self) -> PromsResult<Vec<i64>> {
        let mut ids = Vec::new();
        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(ids),
            Err(e) => return Err(PromsError::FileRead(e)),
        };

        while let Some(entry) = entries.next_entry().await.map_err(PromsError::FileRead)? {
            let name = entry.file_name();
            let Some(stem) = name.to_str().and_then(|n| n.strip_suffix(".json")) else {
                continue;
            };
            if let Ok(id) = stem.parse::<i64>() {
                ids.push(id);
            }
        }

        ids.sort_unstable();
        Ok(ids)
    }

    /// Lists every readable record, ordered by id.
    ///
    /// Files that cannot be parsed are logged and skipped.
    pub async fn list(&self) -> PromsResult<Vec<FollowupAction>> {
        let mut actions = Vec::new();
        for id in self.ids().await? {
            let path = self.record_path(id);
            match Self::read_record(&path).await {
                Ok(action) => actions.push(action),
                Err(e) => tracing::warn!("failed to read {}: {e}", path.display()),
            }
        }
        Ok(actions)
    }

    /// Stores a new record and returns it with its allocated id.
    ///
    /// # Errors
    ///
    /// Returns `PromsError::InvalidInput` if `action` already carries an id, or if the highest
    /// stored id leaves no room for another.
    pub async fn create(&self, mut action: FollowupAction) -> PromsResult<FollowupAction> {
        if action.id.is_some() {
            return Err(PromsError::InvalidInput(
                "a new followup action cannot already have an id".into(),
            ));
        }

        let _guard = self.write_lock.lock().await;
        self.ensure_dir().await?;

        let id = self
            .ids()
            .await?
            .last()
            .copied()
            .unwrap_or(0)
            .checked_add(1)
            .ok_or_else(|| PromsError::InvalidInput("followup action ids are exhausted".into()))?;
        action.id = Some(id);
        action.last_modified = Some(Utc::now());
        assign_item_ids(&mut action);

        self.write_record(id, &action).await?;
        tracing::info!(followup_action = id, "created followup action");
        Ok(action)
    }
}

/// Points every item at `action` and numbers the ones without an id.
fn assign_item_ids(action: &mut FollowupAction) {
    let owner = action.owner_ref();
    let mut next = action
        .response_items
        .iter()
        .filter_map(|item| item.id)
        .max()
        .unwrap_or(0);

    for item in &mut action.response_items {
        item.followup_action = Some(owner);
        if item.id.is_none() {
            next += 1;
            item.id = Some(next);
        }
    }
}

#[async_trait]
impl FollowupActionService for FollowupActionStore {
    /// Replaces the stored record, including its whole response item collection.
    async fn update(&self, mut action: FollowupAction) -> PromsResult<FollowupAction> {
        let id = action.id.ok_or_else(|| {
            PromsError::InvalidInput("cannot update a followup action without an id".into())
        })?;

        let _guard = self.write_lock.lock().await;
        if !tokio::fs::try_exists(self.record_path(id))
            .await
            .map_err(PromsError::FileRead)?
        {
            return Err(PromsError::NotFound(id));
        }

        action.last_modified = Some(Utc::now());
        assign_item_ids(&mut action);
        self.write_record(id, &action).await?;

        tracing::info!(
            followup_action = id,
            items = action.response_items.len(),
            "updated followup action"
        );
        Ok(action)
    }

    async fn find(&self, id: i64) -> PromsResult<FollowupAction> {
        match Self::read_record(&self.record_path(id)).await {
            Err(PromsError::FileRead(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(PromsError::NotFound(id))
            }
            other => other,
        }
    }
}
