use thiserror::Error;

use crate::actuator::BackendKind;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum TeleopError {
    #[error("no input device detected")]
    NoInputDevice,
    #[error("{backend} backend unavailable: {detail}")]
    BackendUnavailable { backend: BackendKind, detail: String },
    #[error("transport failure: {0}")]
    TransportFailure(String),
    #[error("invalid axis sample: {value}")]
    InvalidSample { value: f32 },
    #[error("input error: {0}")]
    Input(String),
    #[error("configuration error: {0}")]
    Config(String),
}

#[derive(Debug, Error, Clone)]
pub enum BuildError {
    #[error("missing input source")]
    MissingInput,
    #[error("missing actuator")]
    MissingActuator,
    #[error("invalid config: {0}")]
    InvalidConfig(&'static str),
}

pub type Result<T> = eyre::Result<T>;
pub use eyre::Report;
