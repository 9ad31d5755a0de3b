//! ==============================================================================
//! battery-tracker - battery level client for a remote recording service
//! ==============================================================================
//!
//! purpose:
//!     reads the device battery level, authenticates against the service,
//!     submits readings and lists the recorded history.
//!
//! layout:
//!
//! ```text
//!     ┌──────────────┐   ┌──────────────┐   ┌──────────────┐
//!     │   session    │   │   reading    │   │   history    │  <- workflow/
//!     └──────┬───────┘   └──────┬───────┘   └──────┬───────┘
//!            │ save             │ sensor.rs        │
//!            ▼                  ▼                  ▼
//!     ┌──────────────┐   ┌──────────────────────────────────┐
//!     │  store.rs    │◀──│  api.rs  (BatteryApi / reqwest)  │
//!     └──────────────┘   └──────────────────────────────────┘
//! ```
//!
//! ==============================================================================

pub mod api;
pub mod config;
pub mod domain;
pub mod error;
pub mod sensor;
pub mod store;
pub mod workflow;

pub use api::{BatteryApi, HttpApiClient};
pub use domain::{AuthForm, AuthMode, BatteryReading, Credential, Notification};
pub use error::{ApiResult, ClientError, SensorError};
pub use store::CredentialStore;
