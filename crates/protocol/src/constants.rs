use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Event name for [`StartEvent`](crate::events::StartEvent).
pub const ON_START: &str = "onStart";
/// Event name for [`ProgressEvent`](crate::events::ProgressEvent).
pub const ON_PROGRESS: &str = "onProgress";
/// Event name for [`SuccessEvent`](crate::events::SuccessEvent).
pub const ON_SUCCESS: &str = "onSuccess";
/// Event name for [`ErrorEvent`](crate::events::ErrorEvent).
pub const ON_ERROR: &str = "onError";

/// Metadata key injected with the source display name.
pub const FILENAME_METADATA_KEY: &str = "filename";

/// Display name used when the source cannot report one.
pub const UNKNOWN_FILENAME: &str = "unknown_file";

/// Listener event identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    #[serde(rename = "onStart")]
    Start,
    #[serde(rename = "onProgress")]
    Progress,
    #[serde(rename = "onSuccess")]
    Success,
    #[serde(rename = "onError")]
    Error,
}

impl EventKind {
    /// All event kinds, in lifecycle order.
    pub const ALL: [EventKind; 4] = [
        EventKind::Start,
        EventKind::Progress,
        EventKind::Success,
        EventKind::Error,
    ];

    /// Returns the listener name used by the host shell.
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Start => ON_START,
            EventKind::Progress => ON_PROGRESS,
            EventKind::Success => ON_SUCCESS,
            EventKind::Error => ON_ERROR,
        }
    }

    /// Returns `true` for events that end a session's stream.
    pub fn is_terminal(&self) -> bool {
        matches!(self, EventKind::Success | EventKind::Error)
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when parsing an event name that is not one of the four listeners.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown event name: {0}")]
pub struct UnknownEventKind(pub String);

impl FromStr for EventKind {
    type Err = UnknownEventKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            ON_START => Ok(EventKind::Start),
            ON_PROGRESS => Ok(EventKind::Progress),
            ON_SUCCESS => Ok(EventKind::Success),
            ON_ERROR => Ok(EventKind::Error),
            other => Err(UnknownEventKind(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_kind_serialization() {
        let json = serde_json::to_string(&EventKind::Progress).unwrap();
        assert_eq!(json, r#""onProgress""#);
        let json = serde_json::to_string(&EventKind::Error).unwrap();
        assert_eq!(json, r#""onError""#);
    }

    #[test]
    fn event_kind_from_str() {
        for kind in EventKind::ALL {
            assert_eq!(kind.as_str().parse::<EventKind>().unwrap(), kind);
        }
    }

    #[test]
    fn unknown_event_kind() {
        let err = "onFinish".parse::<EventKind>().unwrap_err();
        assert_eq!(err.to_string(), "unknown event name: onFinish");
    }

    #[test]
    fn terminal_kinds() {
        assert!(!EventKind::Start.is_terminal());
        assert!(!EventKind::Progress.is_terminal());
        assert!(EventKind::Success.is_terminal());
        assert!(EventKind::Error.is_terminal());
    }
}
