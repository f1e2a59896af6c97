//! Maps `Box<dyn Error>` from trait boundaries to typed `TeleopError`.
//!
//! The traits in `teleop_traits` use `Box<dyn Error + Send + Sync>`; this
//! module converts those to our typed error enum depending on where the
//! failure happened, with an optional feature-gated path for
//! `teleop_hardware::HwError` downcasting.

use crate::actuator::BackendKind;
use crate::error::TeleopError;

/// A failure while claiming a backend's physical resource.
pub fn map_open_error(backend: BackendKind, e: &(dyn std::error::Error + 'static)) -> TeleopError {
    TeleopError::BackendUnavailable {
        backend,
        detail: e.to_string(),
    }
}

/// A failure writing to an already-open backend.
pub fn map_transport_error(e: &(dyn std::error::Error + 'static)) -> TeleopError {
    TeleopError::TransportFailure(e.to_string())
}

/// A failure polling the input device.
pub fn map_input_error(e: &(dyn std::error::Error + 'static)) -> TeleopError {
    #[cfg(feature = "hardware-errors")]
    {
        if let Some(teleop_hardware::HwError::NoDevice) = e.downcast_ref::<teleop_hardware::HwError>() {
            return TeleopError::Input("input device disconnected".to_string());
        }
    }

    TeleopError::Input(e.to_string())
}
