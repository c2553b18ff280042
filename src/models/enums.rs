use crate::db::DatabaseError;
use serde::{Deserialize, Serialize};

/// Macro to generate enum with as_str + std::str::FromStr pattern
macro_rules! str_enum {
    ($name:ident { $($variant:ident => $s:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(rename_all = "snake_case")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $s),+
                }
            }
        }

        impl std::str::FromStr for $name {
            type Err = DatabaseError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($s => Ok(Self::$variant)),+,
                    _ => Err(DatabaseError::InvalidEnum {
                        field: stringify!($name).into(),
                        value: s.into(),
                    }),
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

str_enum!(Role {
    Patient => "patient",
    Doctor => "doctor",
    Pharmacy => "pharmacy",
});

str_enum!(AppointmentStatus {
    Pending => "pending",
    Confirmed => "confirmed",
    Rejected => "rejected",
});

str_enum!(PrescriptionStatus {
    Active => "active",
    Completed => "completed",
});

str_enum!(DoseTime {
    Morning => "morning",
    Noon => "noon",
    Night => "night",
});

str_enum!(NotificationKind {
    LowStock => "low_stock",
    PharmacyOffer => "pharmacy_offer",
});

str_enum!(VoteDirection {
    Up => "up",
    Down => "down",
});

str_enum!(VoteTarget {
    Post => "post",
    Comment => "comment",
    Reply => "reply",
});

impl Role {
    /// Dashboard a freshly signed-in user lands on.
    pub fn landing_page(&self) -> &'static str {
        match self {
            Self::Patient => "/patient-dashboard",
            Self::Doctor => "/doctor-dashboard",
            Self::Pharmacy => "/pharmacy-dashboard",
        }
    }
}

impl AppointmentStatus {
    /// Pending and confirmed appointments hold their slot.
    pub fn is_live(&self) -> bool {
        matches!(self, Self::Pending | Self::Confirmed)
    }
}

impl DoseTime {
    /// Display order within a day.
    pub const ALL: [DoseTime; 3] = [Self::Morning, Self::Noon, Self::Night];
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn role_round_trip() {
        for variant in [Role::Patient, Role::Doctor, Role::Pharmacy] {
            let s = variant.as_str();
            let parsed = Role::from_str(s).unwrap();
            assert_eq!(variant, parsed);
        }
    }

    #[test]
    fn dose_time_round_trip() {
        for variant in DoseTime::ALL {
            let parsed = DoseTime::from_str(variant.as_str()).unwrap();
            assert_eq!(variant, parsed);
        }
    }

    #[test]
    fn invalid_enum_value_returns_error() {
        let result = AppointmentStatus::from_str("cancelled");
        assert!(result.is_err());
        match result.unwrap_err() {
            DatabaseError::InvalidEnum { field, value } => {
                assert_eq!(field, "AppointmentStatus");
                assert_eq!(value, "cancelled");
            }
            other => panic!("Expected InvalidEnum, got: {other:?}"),
        }
    }

    #[test]
    fn serde_uses_storage_names() {
        let json = serde_json::to_string(&NotificationKind::LowStock).unwrap();
        assert_eq!(json, "\"low_stock\"");
        let back: VoteDirection = serde_json::from_str("\"down\"").unwrap();
        assert_eq!(back, VoteDirection::Down);
    }

    #[test]
    fn only_pending_and_confirmed_are_live() {
        assert!(AppointmentStatus::Pending.is_live());
        assert!(AppointmentStatus::Confirmed.is_live());
        assert!(!AppointmentStatus::Rejected.is_live());
    }

    #[test]
    fn landing_pages_per_role() {
        assert_eq!(Role::Patient.landing_page(), "/patient-dashboard");
        assert_eq!(Role::Doctor.landing_page(), "/doctor-dashboard");
        assert_eq!(Role::Pharmacy.landing_page(), "/pharmacy-dashboard");
    }
}
