//! Maps `Box<dyn Error>` from trait boundaries to typed `ControlError`.
//!
//! The traits in `poscon_traits` use `Box<dyn Error + Send + Sync>`; this
//! module converts those to our typed error enum, with an optional
//! feature-gated path for `poscon_hardware::error::HwError` downcasting.

use crate::error::ControlError;

/// Map a trait-boundary error to a typed `ControlError`.
///
/// Attempts to downcast known hardware error types first, then falls back
/// to string-based heuristics.
pub fn map_hw_error(e: &(dyn std::error::Error + 'static)) -> ControlError {
    #[cfg(feature = "hardware-errors")]
    {
        use poscon_hardware::error::HwError;
        if let Some(hw) = e.downcast_ref::<HwError>() {
            return match hw {
                HwError::Released | HwError::AlreadyClaimed(_) => {
                    ControlError::State(hw.to_string())
                }
                other => ControlError::Hardware(other.to_string()),
            };
        }
    }

    let s = e.to_string();
    if s.to_lowercase().contains("fault") {
        ControlError::HardwareFault(s)
    } else {
        ControlError::Hardware(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn string_fallback_detects_faults() {
        let e = std::io::Error::other("driver fault latched");
        assert!(matches!(map_hw_error(&e), ControlError::HardwareFault(_)));
        let e = std::io::Error::other("bus busy");
        assert_eq!(map_hw_error(&e), ControlError::Hardware("bus busy".into()));
    }

    #[cfg(feature = "hardware-errors")]
    #[test]
    fn typed_hardware_errors_are_downcast() {
        use poscon_hardware::error::HwError;
        assert!(matches!(
            map_hw_error(&HwError::Released),
            ControlError::State(_)
        ));
        assert_eq!(
            map_hw_error(&HwError::SimulatedBus),
            ControlError::Hardware("simulated bus failure".into())
        );
    }
}
