use chrono::{DateTime, Utc};
use operator_types::domain::SessionStatus;

/// Snapshot of [`crate::TranslationSession`] internal state, as reported by
/// [`crate::TranslationSession::status`] and to `OnStatusChange` callbacks
/// (spec.md §4.3).
#[derive(Debug, Clone, PartialEq)]
pub struct Status {
    pub client_id: Option<String>,
    pub transport_ready: bool,
    pub registered: bool,
    pub last_heartbeat: Option<DateTime<Utc>>,
    pub missed_heartbeats: u32,
    pub heartbeat_interval_seconds: u32,
    pub status: SessionStatus,
}

/// Pure inputs to [`derive_status`], kept separate from the live mutex-guarded
/// state so the derivation rule itself has no lock-holding concerns and is
/// trivially unit-testable.
#[derive(Debug, Clone, Copy)]
pub struct StatusInputs {
    pub transport_ready: bool,
    pub registered: bool,
    pub last_heartbeat: Option<DateTime<Utc>>,
    pub missed_heartbeats: u32,
    pub heartbeat_interval_seconds: u32,
    pub now: DateTime<Utc>,
}

/// Effective-connection and health-status derivation (spec.md §4.3):
///
/// - Effective connection = transport `Ready` OR (registered AND
///   `now - last_heartbeat < 3*interval`).
/// - `status`: `error` if not registered; `error` if `missed_heartbeats >= 3`;
///   `warning` if `missed_heartbeats` in [1,2]; `warning` if registered but
///   no heartbeat yet; `healthy` if registered with a recent heartbeat;
///   `error` otherwise.
pub fn derive_status(inputs: StatusInputs) -> (bool, SessionStatus) {
    let interval = i64::from(inputs.heartbeat_interval_seconds.max(1));

    let recent_heartbeat = inputs
        .last_heartbeat
        .map(|last| (inputs.now - last).num_seconds() < 3 * interval)
        .unwrap_or(false);

    let effective_connection = inputs.transport_ready || (inputs.registered && recent_heartbeat);

    let status = if !inputs.registered {
        SessionStatus::Error
    } else if inputs.missed_heartbeats >= 3 {
        SessionStatus::Error
    } else if (1..=2).contains(&inputs.missed_heartbeats) {
        SessionStatus::Warning
    } else if inputs.last_heartbeat.is_none() {
        SessionStatus::Warning
    } else if recent_heartbeat {
        SessionStatus::Healthy
    } else {
        SessionStatus::Error
    };

    (effective_connection, status)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn inputs(
        registered: bool,
        last_heartbeat: Option<DateTime<Utc>>,
        missed_heartbeats: u32,
        now: DateTime<Utc>,
    ) -> StatusInputs {
        StatusInputs {
            transport_ready: false,
            registered,
            last_heartbeat,
            missed_heartbeats,
            heartbeat_interval_seconds: 5,
            now,
        }
    }

    #[test]
    fn unregistered_is_error() {
        let now = Utc::now();
        let (_, status) = derive_status(inputs(false, None, 0, now));
        assert_eq!(status, SessionStatus::Error);
    }

    #[test]
    fn registered_with_no_heartbeat_yet_is_warning() {
        let now = Utc::now();
        let (_, status) = derive_status(inputs(true, None, 0, now));
        assert_eq!(status, SessionStatus::Warning);
    }

    #[test]
    fn registered_recent_heartbeat_is_healthy() {
        let now = Utc::now();
        let (connected, status) = derive_status(inputs(true, Some(now), 0, now));
        assert_eq!(status, SessionStatus::Healthy);
        assert!(connected);
    }

    #[test]
    fn one_or_two_missed_heartbeats_is_warning() {
        let now = Utc::now();
        let (_, status) = derive_status(inputs(true, Some(now), 2, now));
        assert_eq!(status, SessionStatus::Warning);
    }

    #[test]
    fn three_or_more_missed_heartbeats_is_error() {
        let now = Utc::now();
        let (_, status) = derive_status(inputs(true, Some(now), 3, now));
        assert_eq!(status, SessionStatus::Error);
    }

    #[test]
    fn stale_heartbeat_beyond_three_intervals_is_error_and_disconnected() {
        let now = Utc::now();
        let last = now - chrono::Duration::seconds(16); // > 3*5s
        let (connected, status) = derive_status(inputs(true, Some(last), 0, now));
        assert_eq!(status, SessionStatus::Error);
        assert!(!connected);
    }
}
