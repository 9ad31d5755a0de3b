//! read the battery, show the percentage, post it.

use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex, PoisonError};

use crate::api::BatteryApi;
use crate::domain::{percentage, NewReading, Notification};
use crate::error::{ClientError, SensorError};
use crate::sensor::BatterySensor;

use super::{InFlight, BUSY};

pub const MISSING_TOKEN: &str = "Token manquant – connectez-vous d'abord";

/// what the battery screen shows after a refresh
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReadingReport {
    /// last level read from the sensor, kept even when submission fails
    pub level: Option<u8>,
    pub notification: Notification,
}

pub struct ReadingWorkflow {
    sensor: Arc<dyn BatterySensor>,
    api: Arc<dyn BatteryApi>,
    level: Mutex<Option<u8>>,
    busy: AtomicBool,
}

impl ReadingWorkflow {
    pub fn new(sensor: Arc<dyn BatterySensor>, api: Arc<dyn BatteryApi>) -> Self {
        Self {
            sensor,
            api,
            level: Mutex::new(None),
            busy: AtomicBool::new(false),
        }
    }

    /// currently displayed level
    pub fn level(&self) -> Option<u8> {
        *self.level.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn report(&self, notification: Notification) -> ReadingReport {
        ReadingReport {
            level: self.level(),
            notification,
        }
    }

    async fn read_sensor(&self) -> Result<u8, ClientError> {
        // sysfs reads are blocking file io
        let sensor = Arc::clone(&self.sensor);
        let fraction = tokio::task::spawn_blocking(move || sensor.read_battery_fraction())
            .await
            .map_err(|e| SensorError::Unavailable(format!("sensor task failed: {e}")))??;
        Ok(percentage(fraction))
    }

    pub async fn refresh_and_submit(&self) -> ReadingReport {
        let Some(_in_flight) = InFlight::try_begin(&self.busy) else {
            return self.report(Notification::error(BUSY));
        };

        let level = match self.read_sensor().await {
            Ok(level) => level,
            Err(e) => {
                tracing::warn!(error = %e, "battery read failed");
                return self.report(Notification::error(e.to_string()));
            }
        };
        *self.level.lock().unwrap_or_else(PoisonError::into_inner) = Some(level);
        tracing::info!(level, "battery level read");

        let notification = match self.api.submit_reading(NewReading { level }).await {
            Ok(_) => Notification::success(format!("Niveau {level}% enregistré !")),
            Err(ClientError::Unauthenticated) => Notification::error(MISSING_TOKEN),
            Err(e) => {
                tracing::warn!(level, error = %e, "reading submission failed");
                Notification::error(e.to_string())
            }
        };
        self.report(notification)
    }
}
