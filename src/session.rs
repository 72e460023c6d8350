//! Process-wide auth state.
//!
//! `Session::start` subscribes to the identity provider and mirrors every
//! auth change into a watch channel; `shutdown` (or drop) unsubscribes.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::watch;

use crate::backend::{IdentityProvider, Principal, Subscription};
use crate::error::Result;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "principal", rename_all = "kebab-case")]
pub enum SessionState {
    /// Subscribed but the provider has not reported yet
    Loading,
    SignedOut,
    SignedIn(Principal),
}

impl SessionState {
    fn from_principal(principal: Option<&Principal>) -> Self {
        match principal {
            Some(principal) => SessionState::SignedIn(principal.clone()),
            None => SessionState::SignedOut,
        }
    }
}

pub struct Session {
    state: Arc<watch::Sender<SessionState>>,
    subscription: Option<Subscription>,
}

impl Session {
    pub fn start(identity: &dyn IdentityProvider) -> Result<Self> {
        let state = Arc::new(watch::Sender::new(SessionState::Loading));
        let sink = Arc::clone(&state);
        let subscription = identity.subscribe(Arc::new(move |principal: Option<&Principal>| {
            sink.send_replace(SessionState::from_principal(principal));
        }))?;
        let initial = state.borrow().clone();
        tracing::debug!(state = ?initial, "session started");
        Ok(Self {
            state,
            subscription: Some(subscription),
        })
    }

    pub fn state(&self) -> SessionState {
        self.state.borrow().clone()
    }

    pub fn principal(&self) -> Option<Principal> {
        match &*self.state.borrow() {
            SessionState::SignedIn(principal) => Some(principal.clone()),
            _ => None,
        }
    }

    /// Stop listening to auth changes; safe to call more than once
    pub fn shutdown(&mut self) {
        if let Some(subscription) = self.subscription.take() {
            subscription.unsubscribe();
            tracing::debug!("session stopped");
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.shutdown();
    }
}
