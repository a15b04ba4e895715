//! Progress event protocol for the batch upload stream
//!
//! Events are serialized one JSON object per line, tagged by `type`.
//! For a non-aborted batch the wire sequence is exactly `total` progress
//! events in address order followed by one complete event. An aborted
//! batch carries exactly one error event and nothing else.

use serde::{Deserialize, Serialize};

/// One unit of the pipeline's streamed output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ProgressEvent {
    /// Outcome of processing one destination address
    Progress {
        current: usize,
        total: usize,
        progress_pct: u32,
        address: String,
        success: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
    /// Batch-fatal failure before any per-item processing
    Error { error: String },
    /// Terminal summary for a non-aborted batch
    Complete { successful: usize, total: usize },
}

impl ProgressEvent {
    pub fn item_ok(current: usize, total: usize, address: &str) -> Self {
        Self::Progress {
            current,
            total,
            progress_pct: progress_pct(current, total),
            address: address.to_string(),
            success: true,
            error: None,
        }
    }

    pub fn item_failed(current: usize, total: usize, address: &str, error: &str) -> Self {
        Self::Progress {
            current,
            total,
            progress_pct: progress_pct(current, total),
            address: address.to_string(),
            success: false,
            error: Some(error.to_string()),
        }
    }

    pub fn aborted(error: String) -> Self {
        Self::Error { error }
    }

    /// Encode as one newline-terminated JSON object for the wire
    pub fn to_line(&self) -> String {
        let mut line =
            serde_json::to_string(self).expect("event serialization should not fail");
        line.push('\n');
        line
    }
}

/// Integer-truncating percentage: item `current` of `total` maps to
/// `current * 100 / total`, never rounded up.
pub fn progress_pct(current: usize, total: usize) -> u32 {
    debug_assert!(total > 0);
    ((current * 100) / total) as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_pct_truncates() {
        assert_eq!(progress_pct(1, 3), 33);
        assert_eq!(progress_pct(2, 3), 66);
        assert_eq!(progress_pct(3, 3), 100);
        assert_eq!(progress_pct(1, 7), 14);
        assert_eq!(progress_pct(1, 1), 100);
    }

    #[test]
    fn test_success_event_omits_error_field() {
        let event = ProgressEvent::item_ok(1, 2, "Laugavegur 1");
        let line = event.to_line();
        assert!(line.ends_with('\n'));

        let value: serde_json::Value = serde_json::from_str(line.trim()).unwrap();
        assert_eq!(value["type"], "progress");
        assert_eq!(value["current"], 1);
        assert_eq!(value["total"], 2);
        assert_eq!(value["progress_pct"], 50);
        assert_eq!(value["success"], true);
        assert!(value.get("error").is_none());
    }

    #[test]
    fn test_failure_event_carries_error() {
        let event = ProgressEvent::item_failed(2, 2, "Nowhere 99", "could not geocode address");
        let value: serde_json::Value = serde_json::from_str(event.to_line().trim()).unwrap();
        assert_eq!(value["success"], false);
        assert_eq!(value["error"], "could not geocode address");
    }

    #[test]
    fn test_error_and_complete_tags() {
        let error = ProgressEvent::aborted("start address is required".to_string());
        let value: serde_json::Value = serde_json::from_str(error.to_line().trim()).unwrap();
        assert_eq!(value["type"], "error");

        let complete = ProgressEvent::Complete { successful: 2, total: 3 };
        let value: serde_json::Value = serde_json::from_str(complete.to_line().trim()).unwrap();
        assert_eq!(value["type"], "complete");
        assert_eq!(value["successful"], 2);
        assert_eq!(value["total"], 3);
    }

    #[test]
    fn test_round_trip() {
        let event = ProgressEvent::item_failed(1, 4, "Somewhere 5", "could not calculate route");
        let parsed: ProgressEvent = serde_json::from_str(event.to_line().trim()).unwrap();
        assert_eq!(parsed, event);
    }
}
