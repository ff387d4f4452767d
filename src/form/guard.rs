use std::{
    collections::{HashMap, HashSet},
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use uuid::Uuid;

use crate::workflow::FormState;

#[derive(Debug, Default)]
struct Sessions {
    busy: HashSet<Uuid>,
    /// last revision saved per session key
    saved: HashMap<Uuid, u64>,
}

/// Session keys with a workflow action currently running.
#[derive(Debug, Clone, Default)]
pub struct InFlight(Arc<Mutex<Sessions>>);

impl InFlight {
    fn sessions(&self) -> MutexGuard<'_, Sessions> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Marks `form`'s session busy until the returned guard drops.
    ///
    /// `None` while another action runs for the session, or when `form` is older than what an
    /// earlier action already saved.
    pub fn enter(&self, form: &FormState) -> Option<InFlightGuard> {
        let mut sessions = self.sessions();
        if sessions.saved.get(&form.key).is_some_and(|&saved| saved > form.revision) {
            return None;
        }
        if !sessions.busy.insert(form.key) {
            return None;
        }
        Some(InFlightGuard { in_flight: self.clone(), key: form.key })
    }

    pub fn is_busy(&self, key: Uuid) -> bool {
        self.sessions().busy.contains(&key)
    }
}

#[derive(Debug)]
pub struct InFlightGuard {
    in_flight: InFlight,
    key: Uuid,
}

impl InFlightGuard {
    /// Records that `revision` of the session has been saved.
    pub fn saved(&self, revision: u64) {
        let mut sessions = self.in_flight.sessions();
        let saved = sessions.saved.entry(self.key).or_default();
        *saved = (*saved).max(revision);
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.in_flight.sessions().busy.remove(&self.key);
    }
}
