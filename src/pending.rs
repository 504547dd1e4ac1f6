use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use tokio::sync::oneshot;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::{error::SummaryError, models::ExtractionResult, tabs::TabId};

struct Slot {
    request_id: Uuid,
    reply: oneshot::Sender<ExtractionResult>,
}

/// Correlation table between tabs and the extraction each is waiting on.
/// At most one live entry per tab.
#[derive(Default)]
pub struct PendingRequests {
    slots: Mutex<HashMap<TabId, Slot>>,
}

impl PendingRequests {
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn slots(&self) -> MutexGuard<'_, HashMap<TabId, Slot>> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Claims `tab` for a new extraction. The returned handle owns the entry
    /// and removes it when dropped.
    ///
    /// # Errors
    ///
    /// [`SummaryError::RequestInProgress`] when `tab` already has a live entry.
    pub fn register(self: &Arc<Self>, tab: TabId) -> Result<PendingHandle, SummaryError> {
        let mut slots = self.slots();
        if slots.contains_key(&tab) {
            warn!("Rejecting concurrent summarize request for {tab}");
            return Err(SummaryError::RequestInProgress);
        }
        let request_id = Uuid::new_v4();
        let (reply, receiver) = oneshot::channel();
        slots.insert(tab, Slot { request_id, reply });
        debug!("Registered request {request_id} for {tab}");

        Ok(PendingHandle {
            table: Arc::clone(self),
            tab,
            request_id,
            receiver: Some(receiver),
        })
    }

    /// Hands `result` to the request waiting on `tab`. Returns false when no
    /// entry exists or the reply belongs to a different request.
    #[must_use]
    pub fn resolve(&self, tab: TabId, request_id: Uuid, result: ExtractionResult) -> bool {
        let slot = {
            let mut slots = self.slots();
            match slots.get(&tab) {
                Some(slot) if slot.request_id == request_id => slots.remove(&tab),
                Some(_) => {
                    warn!("Dropping stale reply {request_id} for {tab}");
                    None
                }
                None => {
                    debug!("No pending request for {tab}, dropping reply {request_id}");
                    None
                }
            }
        };
        slot.is_some_and(|slot| slot.reply.send(result).is_ok())
    }

    /// Drops whatever entry `tab` has. Safe to call repeatedly.
    pub fn remove(&self, tab: TabId) {
        self.slots().remove(&tab);
    }

    #[must_use]
    pub fn contains(&self, tab: TabId) -> bool {
        self.slots().contains_key(&tab)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.slots().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots().is_empty()
    }

    fn remove_if_owned(&self, tab: TabId, request_id: Uuid) {
        let mut slots = self.slots();
        if slots
            .get(&tab)
            .is_some_and(|slot| slot.request_id == request_id)
        {
            slots.remove(&tab);
        }
    }
}

/// Ownership of one pending entry. Dropping it removes the entry unless a
/// newer request has since taken the tab over.
pub struct PendingHandle {
    table: Arc<PendingRequests>,
    tab: TabId,
    request_id: Uuid,
    receiver: Option<oneshot::Receiver<ExtractionResult>>,
}

impl PendingHandle {
    #[must_use]
    pub fn tab(&self) -> TabId {
        self.tab
    }

    #[must_use]
    pub fn request_id(&self) -> Uuid {
        self.request_id
    }

    /// Waits for the extractor's reply. `None` means the entry was removed
    /// without a reply ever arriving.
    pub async fn reply(&mut self) -> Option<ExtractionResult> {
        match self.receiver.take() {
            Some(receiver) => receiver.await.ok(),
            None => None,
        }
    }
}

impl Drop for PendingHandle {
    fn drop(&mut self) {
        self.table.remove_if_owned(self.tab, self.request_id);
    }
}
