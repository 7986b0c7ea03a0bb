//! In-process presence store with lazy, read-triggered expiry.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use super::{PresenceOverride, PresenceStatus, PresenceStore};
use crate::clock::Clock;
use crate::error::{EngineError, Result};
use crate::interval::PersonId;

/// A [`PresenceStore`] backed by a map and an injected clock.
///
/// There is no background sweep. An expired record is hidden from every read
/// and physically dropped the next time [`PresenceStore::get`] touches it.
pub struct InMemoryPresenceStore {
    records: RwLock<HashMap<PersonId, PresenceOverride>>,
    clock: Arc<dyn Clock>,
    online: AtomicBool,
}

impl InMemoryPresenceStore {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            records: RwLock::new(HashMap::new()),
            clock,
            online: AtomicBool::new(true),
        }
    }

    /// Simulate the backend becoming unreachable (or reachable again).
    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }

    /// Records physically held, expired or not.
    pub async fn stored_len(&self) -> usize {
        self.records.read().await.len()
    }

    fn ensure_online(&self) -> Result<()> {
        if self.online.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(EngineError::StoreUnavailable(
                "in-memory presence store is offline".to_string(),
            ))
        }
    }
}

#[async_trait]
impl PresenceStore for InMemoryPresenceStore {
    async fn get(&self, person_id: &PersonId) -> Result<Option<PresenceOverride>> {
        self.ensure_online()?;
        let now = self.clock.now();

        {
            let records = self.records.read().await;
            match records.get(person_id) {
                None => return Ok(None),
                Some(record) if record.is_live(now) => return Ok(Some(record.clone())),
                Some(_) => {}
            }
        }

        // Expired: drop it, unless a fresh write landed in between.
        let mut records = self.records.write().await;
        if records.get(person_id).is_some_and(|r| !r.is_live(now)) {
            records.remove(person_id);
        }
        Ok(None)
    }

    async fn get_many(
        &self,
        person_ids: &[PersonId],
    ) -> Result<HashMap<PersonId, PresenceOverride>> {
        self.ensure_online()?;
        let now = self.clock.now();
        let records = self.records.read().await;

        Ok(person_ids
            .iter()
            .filter_map(|id| records.get(id))
            .filter(|record| record.is_live(now))
            .map(|record| (record.person_id.clone(), record.clone()))
            .collect())
    }

    async fn set(
        &self,
        person_id: &PersonId,
        status: PresenceStatus,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<PresenceOverride> {
        self.ensure_online()?;
        let record = PresenceOverride {
            person_id: person_id.clone(),
            status,
            expires_at,
            updated_at: self.clock.now(),
        };
        self.records
            .write()
            .await
            .insert(person_id.clone(), record.clone());
        Ok(record)
    }

    async fn clear(&self, person_id: &PersonId) -> Result<()> {
        self.ensure_online()?;
        self.records.write().await.remove(person_id);
        Ok(())
    }
}
