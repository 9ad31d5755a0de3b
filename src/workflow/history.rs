//! ==============================================================================
//! history.rs - list of previously recorded readings
//! ==============================================================================
//!
//! the load runs as its own task when the screen is mounted. the current
//! render state is published through a watch channel, and unmounting aborts
//! the request so nothing keeps running for a screen that is gone.
//!
//! ==============================================================================

use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::api::BatteryApi;
use crate::domain::{BatteryReading, Notification};

/// shown when the load task dies without producing an outcome
pub const LOAD_ABORTED: &str = "Chargement de l'historique interrompu";

#[derive(Clone, Debug, PartialEq)]
pub enum HistoryView {
    Loading,
    Empty,
    /// entries in the order the service returned them
    Populated(Vec<BatteryReading>),
    Failed(String),
}

#[derive(Clone, Debug, PartialEq)]
pub struct HistoryOutcome {
    pub view: HistoryView,
    /// one-shot message, only on failure
    pub notification: Option<Notification>,
}

pub struct HistoryWorkflow {
    api: Arc<dyn BatteryApi>,
}

impl HistoryWorkflow {
    pub fn new(api: Arc<dyn BatteryApi>) -> Self {
        Self { api }
    }

    pub async fn load(&self) -> HistoryOutcome {
        match self.api.list_readings().await {
            Ok(entries) if entries.is_empty() => HistoryOutcome {
                view: HistoryView::Empty,
                notification: None,
            },
            Ok(entries) => {
                tracing::info!(count = entries.len(), "history loaded");
                HistoryOutcome {
                    view: HistoryView::Populated(entries),
                    notification: None,
                }
            }
            Err(e) => {
                let message = e.to_string();
                tracing::warn!(%message, "history load failed");
                HistoryOutcome {
                    view: HistoryView::Failed(message.clone()),
                    notification: Some(Notification::error(message)),
                }
            }
        }
    }

    /// start loading in the background; the returned handle is the screen
    pub fn mount(self: &Arc<Self>) -> MountedHistory {
        let (tx, rx) = watch::channel(HistoryView::Loading);
        let workflow = Arc::clone(self);
        let task = tokio::spawn(async move {
            let outcome = workflow.load().await;
            tx.send_replace(outcome.view);
            outcome.notification
        });
        MountedHistory {
            view: rx,
            task: Some(task),
        }
    }
}

pub struct MountedHistory {
    view: watch::Receiver<HistoryView>,
    task: Option<JoinHandle<Option<Notification>>>,
}

impl MountedHistory {
    pub fn view(&self) -> HistoryView {
        self.view.borrow().clone()
    }

    /// wait for the load to finish
    ///
    /// after an unmount, or a second call, the view is returned as it stands
    /// with no notification. a load task that panicked settles as Failed.
    pub async fn settled(&mut self) -> HistoryOutcome {
        let notification = match self.task.take() {
            Some(task) => match task.await {
                Ok(notification) => notification,
                Err(e) if e.is_cancelled() => None,
                Err(e) => {
                    tracing::error!(error = %e, "history load task failed");
                    return HistoryOutcome {
                        view: HistoryView::Failed(LOAD_ABORTED.to_string()),
                        notification: Some(Notification::error(LOAD_ABORTED)),
                    };
                }
            },
            None => None,
        };
        HistoryOutcome {
            view: self.view(),
            notification,
        }
    }

    /// leave the screen, cancelling a request still in flight
    pub fn unmount(&mut self) {
        if let Some(task) = self.task.take() {
            if !task.is_finished() {
                tracing::debug!("history unmounted, aborting request");
            }
            task.abort();
        }
    }
}

impl Drop for MountedHistory {
    fn drop(&mut self) {
        self.unmount();
    }
}
