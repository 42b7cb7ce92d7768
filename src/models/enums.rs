use crate::db::DatabaseError;
use serde::{Deserialize, Serialize};

/// Macro to generate enum with as_str + std::str::FromStr pattern
macro_rules! str_enum {
    ($name:ident { $($variant:ident => $s:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
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
    };
}

str_enum!(MedicationKind {
    Prescription => "prescription",
    OverTheCounter => "over_the_counter",
    Supplement => "supplement",
});

str_enum!(IntakeTiming {
    BeforeMeal => "before_meal",
    AfterMeal => "after_meal",
});

str_enum!(DoseSource {
    Device => "device",
    Manual => "manual",
});

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    #[test]
    fn kind_round_trips_through_str() {
        for kind in [
            MedicationKind::Prescription,
            MedicationKind::OverTheCounter,
            MedicationKind::Supplement,
        ] {
            assert_eq!(MedicationKind::from_str(kind.as_str()).unwrap(), kind);
        }
    }

    #[test]
    fn unknown_value_is_rejected() {
        let err = DoseSource::from_str("carrier-pigeon").unwrap_err();
        assert!(matches!(err, DatabaseError::InvalidEnum { .. }));
    }
}
