//! Voice state-change events from the session transport.

use serde::{Deserialize, Serialize};

use crate::types::{ContainerId, ParticipantId};

/// One participant's complete voice state at an instant.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoiceState {
    /// The container (voice channel) occupied, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub container: Option<ContainerId>,

    /// Self-muted.
    #[serde(default)]
    pub muted: bool,

    /// Self-deafened.
    #[serde(default)]
    pub deafened: bool,

    /// Broadcasting a stream.
    #[serde(default)]
    pub streaming: bool,
}

/// A voice state-change event: the full before/after flag snapshot the
/// transport delivers for one participant.
///
/// No explicit timestamp is carried; wall-clock time at processing stands in
/// for the event time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoiceEvent {
    pub participant: ParticipantId,
    pub before: VoiceState,
    pub after: VoiceState,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_deserializes_with_defaults() {
        let json = r#"{
            "participant": "1157",
            "before": {},
            "after": {"container": "general", "muted": true}
        }"#;
        let event: VoiceEvent = serde_json::from_str(json).unwrap();
        assert_eq!(event.participant.as_str(), "1157");
        assert_eq!(event.before, VoiceState::default());
        assert_eq!(event.after.container.as_ref().unwrap().as_str(), "general");
        assert!(event.after.muted);
        assert!(!event.after.deafened);
    }

    #[test]
    fn event_rejects_empty_participant() {
        let json = r#"{"participant": "", "before": {}, "after": {}}"#;
        let result: Result<VoiceEvent, _> = serde_json::from_str(json);
        assert!(result.is_err());
    }

    #[test]
    fn event_serde_roundtrip() {
        let event = VoiceEvent {
            participant: ParticipantId::new("42").unwrap(),
            before: VoiceState {
                container: Some(ContainerId::new("lobby").unwrap()),
                muted: false,
                deafened: false,
                streaming: true,
            },
            after: VoiceState::default(),
        };
        let json = serde_json::to_string(&event).unwrap();
        let parsed: VoiceEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, event);
    }
}
