//! Type-safe identifier wrappers around [`Uuid`].
//!
//! Every entity in a scenario has a strongly-typed ID to prevent accidental
//! mixing of identifiers at compile time. IDs are UUID v5 values derived from
//! the entity's declared name, so the same scenario file always yields the
//! same identifiers and decision logs stay byte-identical across runs.

use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

/// Namespace for all name-derived Farmstead identifiers.
pub const FARMSTEAD_NAMESPACE: Uuid = Uuid::from_u128(0x5a1c_7e0d_42b9_4f6a_9c3e_d1f0_8b27_6e41);

/// Generates a newtype wrapper around [`Uuid`] with standard derives.
macro_rules! define_id {
    (
        $(#[$meta:meta])*
        $name:ident, $kind:literal
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
        #[ts(export, export_to = "bindings/")]
        pub struct $name(pub Uuid);

        impl $name {
            /// Derive the identifier from a declared name (UUID v5).
            ///
            /// The entity kind is mixed into the hash so a farm and a
            /// scenario sharing a name never collide.
            pub fn from_name(name: &str) -> Self {
                let key = format!("{}:{name}", $kind);
                Self(Uuid::new_v5(&FARMSTEAD_NAMESPACE, key.as_bytes()))
            }

            /// Return the inner [`Uuid`] value.
            pub const fn into_inner(self) -> Uuid {
                self.0
            }
        }

        impl core::fmt::Display for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<Uuid> for $name {
            fn from(id: Uuid) -> Self {
                Self(id)
            }
        }

        impl From<$name> for Uuid {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

define_id! {
    /// Unique identifier for a farm participating in the community scheme.
    FarmId, "farm"
}

define_id! {
    /// Unique identifier for a scenario run.
    ScenarioId, "scenario"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_name_same_id() {
        assert_eq!(FarmId::from_name("North Plot"), FarmId::from_name("North Plot"));
    }

    #[test]
    fn different_names_differ() {
        assert_ne!(FarmId::from_name("North Plot"), FarmId::from_name("South Plot"));
    }

    #[test]
    fn kind_is_part_of_the_hash() {
        let farm = FarmId::from_name("alpha").into_inner();
        let scenario = ScenarioId::from_name("alpha").into_inner();
        assert_ne!(farm, scenario);
    }

    #[test]
    fn id_roundtrip_serde() {
        let original = FarmId::from_name("east");
        let json = serde_json::to_string(&original).ok();
        assert!(json.is_some());
        let restored: Result<FarmId, _> = serde_json::from_str(json.as_deref().unwrap_or(""));
        assert_eq!(restored.ok(), Some(original));
    }

    #[test]
    fn id_display_matches_uuid() {
        let id = FarmId::from_name("west");
        assert_eq!(id.to_string(), id.into_inner().to_string());
    }
}
