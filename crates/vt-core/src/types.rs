//! Core type definitions with validation.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Validation errors for core types.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// The provided value was empty.
    #[error("{field} cannot be empty")]
    Empty { field: &'static str },

    /// Unknown activity kind token.
    #[error("unknown activity kind: {value} (expected voice, muted, deafened, or streaming)")]
    UnknownKind { value: String },

    /// Unknown accounting window token.
    #[error("unknown window: {value} (expected lifetime or current)")]
    UnknownWindow { value: String },

    /// An accumulator key string was not `<participant>:<kind>`.
    #[error("malformed accumulator key: {value}")]
    MalformedKey { value: String },
}

/// Generates a validated string ID newtype with common trait implementations.
macro_rules! define_string_id {
    (
        $(#[$meta:meta])*
        $name:ident, $field_name:literal
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            /// Creates a new ID after validation.
            pub fn new(id: impl Into<String>) -> Result<Self, ValidationError> {
                let id = id.into();
                if id.is_empty() {
                    return Err(ValidationError::Empty { field: $field_name });
                }
                Ok(Self(id))
            }

            /// Returns the ID as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl TryFrom<String> for $name {
            type Error = ValidationError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::new(value)
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

define_string_id!(
    /// A validated participant identifier.
    ///
    /// Participant IDs are opaque, stable identifiers assigned by the session
    /// transport. A participant need not be resolvable in the roster to be
    /// tracked; accounting outlives membership.
    ParticipantId, "participant ID"
);

define_string_id!(
    /// A validated voice container (channel) identifier.
    ContainerId, "container ID"
);

/// The four independently tracked activity states.
///
/// Each kind is accumulated separately per participant; there is no coupling
/// between kinds at the data-model level. Coupling (closing mute/deafen/stream
/// intervals when a participant leaves voice) lives in the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ActivityKind {
    /// Present in a non-idle voice container.
    Voice,
    /// Self-muted.
    Muted,
    /// Self-deafened.
    Deafened,
    /// Broadcasting a stream.
    Streaming,
}

impl ActivityKind {
    /// All kinds, in display order.
    pub const ALL: [Self; 4] = [Self::Voice, Self::Muted, Self::Deafened, Self::Streaming];

    /// Token used in commands and the snapshot document.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Voice => "voice",
            Self::Muted => "muted",
            Self::Deafened => "deafened",
            Self::Streaming => "streaming",
        }
    }
}

impl fmt::Display for ActivityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ActivityKind {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "voice" => Ok(Self::Voice),
            "muted" => Ok(Self::Muted),
            "deafened" => Ok(Self::Deafened),
            "streaming" => Ok(Self::Streaming),
            _ => Err(ValidationError::UnknownKind {
                value: s.to_string(),
            }),
        }
    }
}

impl Serialize for ActivityKind {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ActivityKind {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// The accounting window a query reads from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Window {
    /// Totals since the start epoch; never reset while data persists.
    #[default]
    Lifetime,
    /// Totals since the last rollover; cleared at every period end.
    CurrentPeriod,
}

impl Window {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Lifetime => "lifetime",
            Self::CurrentPeriod => "current",
        }
    }
}

impl fmt::Display for Window {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Window {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "lifetime" => Ok(Self::Lifetime),
            "current" | "currentPeriod" | "current-period" => Ok(Self::CurrentPeriod),
            _ => Err(ValidationError::UnknownWindow {
                value: s.to_string(),
            }),
        }
    }
}

/// Identifies one tracked quantity: a participant plus an activity kind.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AccumKey {
    pub participant: ParticipantId,
    pub kind: ActivityKind,
}

impl AccumKey {
    #[must_use]
    pub const fn new(participant: ParticipantId, kind: ActivityKind) -> Self {
        Self { participant, kind }
    }
}

impl fmt::Display for AccumKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.participant, self.kind)
    }
}

impl FromStr for AccumKey {
    type Err = ValidationError;

    /// Parses `<participant>:<kind>`. Participant IDs may themselves contain
    /// colons, so the kind is taken from the last segment.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (participant, kind) = s
            .rsplit_once(':')
            .ok_or_else(|| ValidationError::MalformedKey {
                value: s.to_string(),
            })?;
        let kind = kind.parse().map_err(|_| ValidationError::MalformedKey {
            value: s.to_string(),
        })?;
        let participant =
            ParticipantId::new(participant).map_err(|_| ValidationError::MalformedKey {
                value: s.to_string(),
            })?;
        Ok(Self { participant, kind })
    }
}
