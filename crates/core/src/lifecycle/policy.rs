//! Service activation policy
//!
//! Counting must run while *any* interested caller needs it: the user
//! toggle, an active training session, walking-mode learning, or a running
//! distance measurement. The decision is derived, never stored - callers
//! rebuild the inputs at every decision point.

/// Inputs to the activation decision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ActivationInputs {
    pub user_enabled: bool,
    pub training_active: bool,
    pub walking_mode_learning_active: bool,
    /// Distance measurement is running while this is > 0
    pub distance_measurement_start_timestamp: i64,
}

impl ActivationInputs {
    /// Whether the counting service must be active
    pub fn is_activation_required(&self) -> bool {
        self.user_enabled
            || self.training_active
            || self.walking_mode_learning_active
            || self.distance_measurement_start_timestamp > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inactive_when_no_caller_needs_counting() {
        assert!(!ActivationInputs::default().is_activation_required());
    }

    #[test]
    fn any_single_input_activates() {
        let cases = [
            ActivationInputs { user_enabled: true, ..Default::default() },
            ActivationInputs { training_active: true, ..Default::default() },
            ActivationInputs { walking_mode_learning_active: true, ..Default::default() },
            ActivationInputs {
                distance_measurement_start_timestamp: 1_700_000_000_000,
                ..Default::default()
            },
        ];
        for inputs in cases {
            assert!(inputs.is_activation_required(), "{inputs:?}");
        }
    }

    #[test]
    fn non_positive_measurement_timestamp_does_not_activate() {
        let inputs =
            ActivationInputs { distance_measurement_start_timestamp: -1, ..Default::default() };
        assert!(!inputs.is_activation_required());
        let inputs =
            ActivationInputs { distance_measurement_start_timestamp: 0, ..Default::default() };
        assert!(!inputs.is_activation_required());
    }
}
