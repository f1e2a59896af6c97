use thiserror::Error;

#[derive(Debug, Error)]
pub enum HwError {
    #[error("gpio error: {0}")]
    Gpio(String),
    #[error("uart error: {0}")]
    Uart(String),
    #[error("resource busy: {0}")]
    Busy(String),
    #[error("permission denied: {0}")]
    PermissionDenied(String),
    #[error("device not found: {0}")]
    NotFound(String),
    #[error("link disconnected")]
    Disconnected,
    #[error("no input device connected")]
    NoDevice,
    #[error("input error: {0}")]
    Input(String),
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

impl HwError {
    /// Whether this error means the resource could not be claimed at all,
    /// as opposed to failing after it was opened.
    pub fn is_claim_failure(&self) -> bool {
        match self {
            HwError::Busy(_) | HwError::PermissionDenied(_) | HwError::NotFound(_) => true,
            HwError::Io(e) => matches!(
                e.kind(),
                std::io::ErrorKind::NotFound
                    | std::io::ErrorKind::PermissionDenied
                    | std::io::ErrorKind::ResourceBusy
            ),
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, HwError>;
