use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use crate::catalog::{CatalogState, Catalogs};
use crate::compare::ComparisonSlider;
use crate::llm::media::ImagePayload;
use crate::selection::SelectionRecord;

/// Sessions are per user within a chat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionKey {
    pub chat_id: i64,
    pub user_id: i64,
}

impl SessionKey {
    pub fn new(chat_id: i64, user_id: i64) -> Self {
        SessionKey { chat_id, user_id }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Session {
    pub selection: SelectionRecord,
    pub source_image: Option<ImagePayload>,
    pub enhanced_image: Option<ImagePayload>,
    pub slider: ComparisonSlider,
    pub in_flight: bool,
}

impl Session {
    fn new(catalogs: Option<Arc<Catalogs>>) -> Self {
        let selection = catalogs
            .map(|catalogs| SelectionRecord::from_catalog_defaults(&catalogs))
            .unwrap_or_default();
        Session {
            selection,
            ..Session::default()
        }
    }
}

#[derive(Clone, Default)]
pub struct AppState {
    pub catalogs: Arc<RwLock<CatalogState>>,
    pub sessions: Arc<Mutex<HashMap<SessionKey, Session>>>,
}

impl AppState {
    pub fn new() -> Self {
        AppState::default()
    }

    pub fn catalog_state(&self) -> CatalogState {
        self.catalogs.read().clone()
    }

    pub fn ready_catalogs(&self) -> Option<Arc<Catalogs>> {
        self.catalogs.read().ready()
    }

    /// Runs `update` against the session for `key`, creating it from the
    /// catalog defaults on first use. The lock is released before returning.
    pub fn with_session<R>(&self, key: SessionKey, update: impl FnOnce(&mut Session) -> R) -> R {
        let mut sessions = self.sessions.lock();
        let session = sessions
            .entry(key)
            .or_insert_with(|| Session::new(self.ready_catalogs()));
        update(session)
    }

    pub fn session_count(&self) -> usize {
        self.sessions.lock().len()
    }

    pub fn in_flight_count(&self) -> usize {
        self.sessions
            .lock()
            .values()
            .filter(|session| session.in_flight)
            .count()
    }

    /// Marks the session busy. Returns `None` while another enhancement for
    /// the same session is still outstanding.
    pub fn begin_enhancement(&self, key: SessionKey) -> Option<InFlightGuard> {
        let started = self.with_session(key, |session| {
            if session.in_flight {
                false
            } else {
                session.in_flight = true;
                true
            }
        });
        started.then(|| InFlightGuard {
            state: self.clone(),
            key,
        })
    }
}

/// Clears the session's in-flight flag when dropped, whichever way the
/// enhancement ended.
pub struct InFlightGuard {
    state: AppState,
    key: SessionKey,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.state
            .with_session(self.key, |session| session.in_flight = false);
    }
}
