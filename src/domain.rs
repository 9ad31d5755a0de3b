use std::fmt;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::ClientError;

/// message shown when a form is submitted with blank fields
pub const MISSING_FIELDS: &str = "Tous les champs sont obligatoires";

/// an opaque bearer token
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// value for the `Authorization` header
    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.0)
    }
}

// tokens never end up in logs
impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(***)")
    }
}

/// one recorded battery measurement, as returned by the service
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatteryReading {
    pub id: String,
    pub level: u8,
    #[serde(deserialize_with = "deserialize_timestamp")]
    pub recorded_at: DateTime<Utc>,
}

/// rfc 3339, or a local date-time without offset taken as utc
fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_timestamp(&raw).ok_or_else(|| {
        serde::de::Error::custom(format!("invalid ISO-8601 timestamp {raw:?}"))
    })
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(at) = DateTime::parse_from_rfc3339(raw) {
        return Some(at.with_timezone(&Utc));
    }
    raw.parse::<NaiveDateTime>().ok().map(|naive| naive.and_utc())
}

/// body of a reading submission (wrapped in `data` by the api client)
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct NewReading {
    pub level: u8,
}

/// convert a sensor fraction in [0,1] to a whole percentage
///
/// out-of-range input is clamped so the result is always in [0,100].
pub fn percentage(fraction: f64) -> u8 {
    if fraction.is_nan() {
        return 0;
    }
    (fraction.clamp(0.0, 1.0) * 100.0).round() as u8
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum AuthMode {
    #[default]
    Login,
    Register,
}

impl AuthMode {
    pub fn toggled(self) -> Self {
        match self {
            Self::Login => Self::Register,
            Self::Register => Self::Login,
        }
    }

    pub fn endpoint(self) -> &'static str {
        match self {
            Self::Login => "/api/auth/login",
            Self::Register => "/api/auth/register",
        }
    }

    pub fn success_message(self) -> &'static str {
        match self {
            Self::Login => "Connexion réussie !",
            Self::Register => "Compte créé !",
        }
    }
}

/// the values currently typed into the session form
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AuthForm {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
}

impl AuthForm {
    pub fn login(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
            ..Self::default()
        }
    }

    pub fn register(
        email: impl Into<String>,
        password: impl Into<String>,
        first_name: impl Into<String>,
        last_name: impl Into<String>,
    ) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
            first_name: first_name.into(),
            last_name: last_name.into(),
        }
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// build the request for `mode`, rejecting blank required fields
    pub fn to_request(&self, mode: AuthMode) -> Result<AuthRequest, ClientError> {
        let filled = |value: &str| !value.trim().is_empty();
        let mut required = vec![self.email.as_str(), self.password.as_str()];
        if mode == AuthMode::Register {
            required.extend([self.first_name.as_str(), self.last_name.as_str()]);
        }
        if !required.into_iter().all(filled) {
            return Err(ClientError::Validation(MISSING_FIELDS.to_string()));
        }

        Ok(match mode {
            AuthMode::Login => AuthRequest::Login {
                email: self.email.clone(),
                password: self.password.clone(),
            },
            AuthMode::Register => AuthRequest::Register {
                email: self.email.clone(),
                password: self.password.clone(),
                first_name: self.first_name.clone(),
                last_name: self.last_name.clone(),
            },
        })
    }
}

/// login or register payload
#[derive(Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum AuthRequest {
    Login {
        email: String,
        password: String,
    },
    #[serde(rename_all = "camelCase")]
    Register {
        email: String,
        password: String,
        first_name: String,
        last_name: String,
    },
}

impl AuthRequest {
    pub fn mode(&self) -> AuthMode {
        match self {
            Self::Login { .. } => AuthMode::Login,
            Self::Register { .. } => AuthMode::Register,
        }
    }
}

impl fmt::Debug for AuthRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let email = match self {
            Self::Login { email, .. } | Self::Register { email, .. } => email,
        };
        f.debug_struct("AuthRequest")
            .field("mode", &self.mode())
            .field("email", email)
            .finish_non_exhaustive()
    }
}

/// response of the login/register endpoints
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct AuthResponse {
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NotificationKind {
    Success,
    Error,
}

/// one-shot message a workflow hands to the user
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Notification {
    pub kind: NotificationKind,
    pub message: String,
}

impl Notification {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            kind: NotificationKind::Success,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            kind: NotificationKind::Error,
            message: message.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.kind == NotificationKind::Error
    }

    pub fn title(&self) -> &'static str {
        match self.kind {
            NotificationKind::Success => "Succès",
            NotificationKind::Error => "Erreur",
        }
    }
}

impl fmt::Display for Notification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.title(), self.message)
    }
}
