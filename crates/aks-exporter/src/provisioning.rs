//! Mapping of AKS provisioning states to gauge values.

/// Provisioning states reported by the AKS control plane. The discriminant is
/// the value exported in the gauge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProvisioningState {
    Unknown = 0,
    Succeeded = 1,
    Failed = 2,
    Canceled = 3,
    Creating = 4,
    Updating = 5,
    Deleting = 6,
    Upgrading = 7,
    UpgradingNodeImageVersion = 8,
    ReconcilingClusterETCDCertificates = 9,
}

impl ProvisioningState {
    pub const ALL: [ProvisioningState; 10] = [
        ProvisioningState::Unknown,
        ProvisioningState::Succeeded,
        ProvisioningState::Failed,
        ProvisioningState::Canceled,
        ProvisioningState::Creating,
        ProvisioningState::Updating,
        ProvisioningState::Deleting,
        ProvisioningState::Upgrading,
        ProvisioningState::UpgradingNodeImageVersion,
        ProvisioningState::ReconcilingClusterETCDCertificates,
    ];

    /// Parse the label reported by the API. Matching is exact; anything not
    /// recognised is `Unknown`.
    pub fn from_label(label: &str) -> Self {
        match label {
            "Succeeded" => Self::Succeeded,
            "Failed" => Self::Failed,
            "Canceled" => Self::Canceled,
            "Creating" => Self::Creating,
            "Updating" => Self::Updating,
            "Deleting" => Self::Deleting,
            "Upgrading" => Self::Upgrading,
            "UpgradingNodeImageVersion" => Self::UpgradingNodeImageVersion,
            "ReconcilingClusterETCDCertificates" => Self::ReconcilingClusterETCDCertificates,
            _ => Self::Unknown,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Unknown => "Unknown",
            Self::Succeeded => "Succeeded",
            Self::Failed => "Failed",
            Self::Canceled => "Canceled",
            Self::Creating => "Creating",
            Self::Updating => "Updating",
            Self::Deleting => "Deleting",
            Self::Upgrading => "Upgrading",
            Self::UpgradingNodeImageVersion => "UpgradingNodeImageVersion",
            Self::ReconcilingClusterETCDCertificates => "ReconcilingClusterETCDCertificates",
        }
    }

    pub fn code(self) -> u8 {
        self as u8
    }
}

/// Gauge value for a provisioning state label.
pub fn state_code(label: &str) -> f64 {
    f64::from(ProvisioningState::from_label(label).code())
}

/// Help text for a provisioning state gauge, listing every code.
pub fn help_text(subject: &str) -> String {
    let legend = ProvisioningState::ALL
        .iter()
        .map(|state| format!("{} - {}", state.code(), state.label()))
        .collect::<Vec<_>>()
        .join(", ");
    format!("The provisioning state of the {subject} ({legend})")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_every_known_state_to_its_code() {
        let cases = [
            ("Succeeded", 1.0),
            ("Failed", 2.0),
            ("Canceled", 3.0),
            ("Creating", 4.0),
            ("Updating", 5.0),
            ("Deleting", 6.0),
            ("Upgrading", 7.0),
            ("UpgradingNodeImageVersion", 8.0),
            ("ReconcilingClusterETCDCertificates", 9.0),
        ];
        for (label, code) in cases {
            assert_eq!(state_code(label), code, "state {label}");
        }
    }

    #[test]
    fn unrecognised_states_map_to_zero() {
        for label in ["", "Unknown", "succeeded", "SUCCEEDED", " Succeeded", "Migrating"] {
            assert_eq!(state_code(label), 0.0, "state {label:?}");
        }
    }

    #[test]
    fn labels_round_trip_through_from_label() {
        for state in ProvisioningState::ALL.iter().skip(1) {
            assert_eq!(ProvisioningState::from_label(state.label()), *state);
        }
    }

    #[test]
    fn help_text_lists_all_codes() {
        assert_eq!(
            help_text("cluster"),
            "The provisioning state of the cluster (0 - Unknown, 1 - Succeeded, 2 - Failed, \
             3 - Canceled, 4 - Creating, 5 - Updating, 6 - Deleting, 7 - Upgrading, \
             8 - UpgradingNodeImageVersion, 9 - ReconcilingClusterETCDCertificates)"
        );
    }
}
