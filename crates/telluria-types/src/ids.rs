//! Type-safe identifier wrappers around `u64`.
//!
//! Every entity has a strongly-typed id to prevent accidental mixing at
//! compile time. Ids are plain integers allocated from monotonic counters
//! held in world metadata -- never random, never reused -- so they persist
//! stably across snapshot/restore and feed directly into the stable-hash
//! determinism scheme.
//!
//! Entities reference each other only by id; every index (settlement →
//! members, for instance) is derived and rebuilt, never persisted.

use serde::{Deserialize, Serialize};

/// Generates a newtype wrapper around `u64` with standard derives.
macro_rules! define_id {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub u64);

        impl $name {
            /// Wrap a raw id value.
            #[must_use]
            pub const fn new(raw: u64) -> Self {
                Self(raw)
            }

            /// Return the raw `u64` value.
            #[must_use]
            pub const fn raw(self) -> u64 {
                self.0
            }
        }

        impl core::fmt::Display for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<u64> for $name {
            fn from(raw: u64) -> Self {
                Self(raw)
            }
        }

        impl From<$name> for u64 {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

define_id! {
    /// Unique identifier for an agent.
    AgentId
}

define_id! {
    /// Unique identifier for a settlement.
    SettlementId
}

define_id! {
    /// Unique identifier for a faction.
    FactionId
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn ids_round_trip_serde_as_bare_integers() {
        let id = AgentId::new(17);
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "17");
        let back: AgentId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn display_matches_raw() {
        let id = SettlementId::new(3);
        assert_eq!(id.to_string(), "3");
        assert_eq!(id.raw(), 3);
    }

    #[test]
    fn ordering_follows_raw_value() {
        assert!(FactionId::new(1) < FactionId::new(2));
    }
}
