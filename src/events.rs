use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum WakeEvent {
    StateChanged,
    TimerExpired,
    CapabilityRevoked,
    AcquireFailed,
    OriginRejected,
    PeerClosed,
    RecoveryCompleted,
    Handoff,
}

impl WakeEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            WakeEvent::StateChanged => "wakelink:state-changed",
            WakeEvent::TimerExpired => "wakelink:timer-expired",
            WakeEvent::CapabilityRevoked => "wakelink:capability-revoked",
            WakeEvent::AcquireFailed => "wakelink:acquire-failed",
            WakeEvent::OriginRejected => "wakelink:origin-rejected",
            WakeEvent::PeerClosed => "wakelink:peer-closed",
            WakeEvent::RecoveryCompleted => "wakelink:recovery-completed",
            WakeEvent::Handoff => "wakelink:handoff",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RecoveryOutcome {
    Reacquired,
    ReacquireFailed,
    Cleared,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecoveryPayload {
    pub was_active: bool,
    pub had_timer: bool,
    pub time_remaining: u64,
    pub outcome: RecoveryOutcome,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OriginRejectedPayload {
    pub expected: String,
    pub actual: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_names_are_namespaced() {
        assert_eq!(WakeEvent::StateChanged.as_str(), "wakelink:state-changed");
        assert_eq!(WakeEvent::OriginRejected.as_str(), "wakelink:origin-rejected");
        assert_eq!(
            WakeEvent::RecoveryCompleted.as_str(),
            "wakelink:recovery-completed"
        );
    }

    #[test]
    fn recovery_payload_uses_camel_case() {
        let payload = RecoveryPayload {
            was_active: true,
            had_timer: false,
            time_remaining: 0,
            outcome: RecoveryOutcome::Reacquired,
        };
        let value = serde_json::to_value(payload).unwrap();
        assert_eq!(value["wasActive"], true);
        assert_eq!(value["outcome"], "reacquired");
    }
}
