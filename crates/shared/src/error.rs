use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    Network,
    NotFound,
    Validation,
    Backend,
    Decode,
}

/// Display-ready summary of a failure, as rendered next to a retry action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiError {
    pub code: ErrorCode,
    pub message: String,
}

impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

/// Field name to message for every required field a draft is missing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationErrors {
    fields: BTreeMap<String, String>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.fields.entry(field.into()).or_insert_with(|| message.into());
    }

    pub fn require(&mut self, field: &str, value: &str) {
        if value.trim().is_empty() {
            self.add(field, format!("{} is required", field.replace('_', " ")));
        }
    }

    pub fn require_some<T>(&mut self, field: &str, value: &Option<T>) {
        if value.is_none() {
            self.add(field, format!("{} is required", field.replace('_', " ")));
        }
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.fields.get(field).map(String::as_str)
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn into_result(self) -> Result<(), ClientError> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(ClientError::Validation(self))
        }
    }
}

impl std::fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let joined = self
            .fields
            .values()
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(", ");
        f.write_str(&joined)
    }
}

#[derive(Debug, Clone, Error)]
pub enum ClientError {
    #[error("network request failed: {0}")]
    Network(String),
    #[error("invalid input: {0}")]
    Validation(ValidationErrors),
    /// `target` is the requested id, or the resource path for list requests.
    #[error("{entity} not found: {target}")]
    NotFound { entity: String, target: String },
    #[error("backend returned {status}: {message}")]
    Backend { status: u16, message: String },
    #[error("could not decode backend response: {0}")]
    Decode(String),
}

impl ClientError {
    pub fn code(&self) -> ErrorCode {
        match self {
            ClientError::Network(_) => ErrorCode::Network,
            ClientError::Validation(_) => ErrorCode::Validation,
            ClientError::NotFound { .. } => ErrorCode::NotFound,
            ClientError::Backend { .. } => ErrorCode::Backend,
            ClientError::Decode(_) => ErrorCode::Decode,
        }
    }

    /// Whether re-issuing the same request could succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            ClientError::Network(_) => true,
            ClientError::Backend { status, .. } => *status >= 500,
            ClientError::Validation(_) | ClientError::NotFound { .. } | ClientError::Decode(_) => {
                false
            }
        }
    }
}

impl From<&ClientError> for ApiError {
    fn from(value: &ClientError) -> Self {
        Self {
            code: value.code(),
            message: value.to_string(),
        }
    }
}

impl From<ClientError> for ApiError {
    fn from(value: ClientError) -> Self {
        Self::from(&value)
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(value: serde_json::Error) -> Self {
        ClientError::Decode(value.to_string())
    }
}
