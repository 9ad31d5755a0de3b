//! login / register exchange that turns a form into a stored token.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::api::BatteryApi;
use crate::domain::{AuthForm, AuthMode, AuthResponse, Notification};
use crate::store::CredentialStore;

use super::{InFlight, BUSY};

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum SessionState {
    #[default]
    Idle,
    Submitting,
    /// token received and stored
    Authenticated,
    /// the service accepted the request but returned no token
    AwaitingSession,
    Failed(String),
}

pub struct SessionWorkflow {
    api: Arc<dyn BatteryApi>,
    store: CredentialStore,
    mode: Mutex<AuthMode>,
    settled: Mutex<SessionState>,
    busy: AtomicBool,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl SessionWorkflow {
    pub fn new(api: Arc<dyn BatteryApi>, store: CredentialStore) -> Self {
        Self {
            api,
            store,
            mode: Mutex::new(AuthMode::default()),
            settled: Mutex::new(SessionState::Idle),
            busy: AtomicBool::new(false),
        }
    }

    pub fn state(&self) -> SessionState {
        if self.busy.load(Ordering::Acquire) {
            SessionState::Submitting
        } else {
            lock(&self.settled).clone()
        }
    }

    pub fn mode(&self) -> AuthMode {
        *lock(&self.mode)
    }

    pub fn set_mode(&self, mode: AuthMode) {
        *lock(&self.mode) = mode;
    }

    /// switch between login and register; the form is left untouched
    pub fn toggle_mode(&self) -> AuthMode {
        let mut mode = lock(&self.mode);
        *mode = mode.toggled();
        *mode
    }

    /// validate `form`, authenticate, and commit the token
    ///
    /// the form is cleared on success and kept as typed on failure.
    pub async fn submit(&self, form: &mut AuthForm) -> Notification {
        let Some(_in_flight) = InFlight::try_begin(&self.busy) else {
            tracing::debug!("session submit rejected: already in flight");
            return Notification::error(BUSY);
        };

        let mode = self.mode();
        let request = match form.to_request(mode) {
            Ok(request) => request,
            Err(e) => return Notification::error(e.to_string()),
        };

        tracing::info!(?mode, "session: submitting");
        let (state, notification) = match self.api.authenticate(&request).await {
            Ok(AuthResponse { token: Some(token), .. }) => match self.store.save(&token) {
                Ok(()) => {
                    form.clear();
                    (
                        SessionState::Authenticated,
                        Notification::success(mode.success_message()),
                    )
                }
                Err(e) => (SessionState::Failed(e.to_string()), Notification::error(e.to_string())),
            },
            Ok(AuthResponse { token: None, .. }) => {
                tracing::warn!(?mode, "session: accepted without a token, nothing stored");
                form.clear();
                (
                    SessionState::AwaitingSession,
                    Notification::success(mode.success_message()),
                )
            }
            Err(e) => {
                let message = e.to_string();
                tracing::warn!(?mode, %message, "session: failed");
                (SessionState::Failed(message.clone()), Notification::error(message))
            }
        };

        tracing::info!(?state, "session: settled");
        *lock(&self.settled) = state;
        notification
    }

    /// forget the stored token
    pub fn logout(&self) -> Notification {
        match self.store.clear() {
            Ok(()) => {
                *lock(&self.settled) = SessionState::Idle;
                Notification::success("Déconnexion réussie")
            }
            Err(e) => Notification::error(e.to_string()),
        }
    }
}
