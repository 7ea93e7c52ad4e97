use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// A `metav1.Condition`-shaped status entry. Every reconciler appends or
/// updates one of these rather than freely mutating `status` fields, so that
/// `kubectl describe` shows the same story the SSE stream does.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Condition {
    #[serde(rename = "type")]
    pub type_: String,
    pub status: ConditionStatus,
    pub reason: String,
    pub message: String,
    #[serde(rename = "lastTransitionTime", skip_serializing_if = "Option::is_none")]
    pub last_transition_time: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum ConditionStatus {
    True,
    False,
    Unknown,
}

impl Condition {
    pub fn ready(status: ConditionStatus, reason: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            type_: "Ready".to_string(),
            status,
            reason: reason.into(),
            message: message.into(),
            last_transition_time: Some(Utc::now()),
        }
    }

    /// Replace (by `type_`) or append `new` into `conditions`, only bumping
    /// `last_transition_time` if `status` actually changed — avoids status
    /// churn on every reconcile of an otherwise-steady resource.
    pub fn upsert(conditions: &mut Vec<Condition>, new: Condition) {
        if let Some(existing) = conditions.iter_mut().find(|c| c.type_ == new.type_) {
            if existing.status != new.status {
                existing.last_transition_time = new.last_transition_time;
            }
            existing.status = new.status;
            existing.reason = new.reason;
            existing.message = new.message;
        } else {
            conditions.push(new);
        }
    }
}
