use serde::{Deserialize, Serialize};

/// Messages from the page to the caching worker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum WorkerMessage {
    #[serde(rename = "SKIP_WAITING")]
    SkipWaiting,
    #[serde(rename = "CHECK_UPDATE")]
    CheckUpdate,
    #[serde(rename = "CACHE_QUIZ_DATA")]
    CacheQuizData(serde_json::Value),
    #[serde(rename = "SCHEDULE_SYNC")]
    ScheduleSync { tag: String },
}

/// Messages broadcast from the worker to all open clients
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ClientMessage {
    #[serde(rename = "UPDATE_AVAILABLE")]
    UpdateAvailable { version: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_worker_message_wire_format() {
        let msg: WorkerMessage = serde_json::from_str(r#"{"type":"SKIP_WAITING"}"#).unwrap();
        assert_eq!(msg, WorkerMessage::SkipWaiting);

        let msg: WorkerMessage =
            serde_json::from_str(r#"{"type":"SCHEDULE_SYNC","data":{"tag":"quiz-data-sync"}}"#)
                .unwrap();
        assert_eq!(
            msg,
            WorkerMessage::ScheduleSync {
                tag: "quiz-data-sync".to_string()
            }
        );
    }

    #[test]
    fn test_client_message_wire_format() {
        let json = serde_json::to_value(ClientMessage::UpdateAvailable {
            version: "v3".to_string(),
        })
        .unwrap();
        assert_eq!(json["type"], "UPDATE_AVAILABLE");
        assert_eq!(json["version"], "v3");
    }
}
