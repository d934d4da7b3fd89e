//! Per-session feature component requests.
//!
//! Actions like [`AddComponentsAction`](crate::actions::AddComponentsAction)
//! record which features actors of a class should receive while an experience
//! is active. Pawn readiness reads them when a pawn spawns.

use std::collections::HashMap;
use std::sync::Arc;

use experience_core::{FeatureName, SessionId};
use parking_lot::Mutex;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ComponentRequest {
    /// Name of the action that made the request.
    pub action: String,
    pub actor_class: String,
    pub feature: FeatureName,
}

/// Shared, lock-guarded request table keyed by session.
#[derive(Clone, Debug, Default)]
pub struct ComponentRequests {
    inner: Arc<Mutex<HashMap<SessionId, Vec<ComponentRequest>>>>,
}

impl ComponentRequests {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, session: SessionId, request: ComponentRequest) {
        self.inner.lock().entry(session).or_default().push(request);
    }

    /// Removes every request `action` made for `session`; returns how many.
    pub fn remove_action(&self, session: SessionId, action: &str) -> usize {
        let mut inner = self.inner.lock();
        let Some(requests) = inner.get_mut(&session) else {
            return 0;
        };
        let before = requests.len();
        requests.retain(|request| request.action != action);
        let removed = before - requests.len();
        if requests.is_empty() {
            inner.remove(&session);
        }
        removed
    }

    /// Features requested for actors of `actor_class`, first request first,
    /// without duplicates.
    pub fn features_for(&self, session: SessionId, actor_class: &str) -> Vec<FeatureName> {
        let inner = self.inner.lock();
        let mut features: Vec<FeatureName> = Vec::new();
        for request in inner.get(&session).into_iter().flatten() {
            if request.actor_class == actor_class && !features.contains(&request.feature) {
                features.push(request.feature.clone());
            }
        }
        features
    }

    pub fn requests_for(&self, session: SessionId) -> Vec<ComponentRequest> {
        self.inner.lock().get(&session).cloned().unwrap_or_default()
    }

    pub fn clear_session(&self, session: SessionId) {
        self.inner.lock().remove(&session);
    }
}
