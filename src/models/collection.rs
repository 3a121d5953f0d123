use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A named, ordered grouping of question ids.
///
/// Referential integrity to questions is deliberately not enforced: a
/// collection may reference questions that were deleted later. Consumers
/// treat missing lookups as soft failures.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Collection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    #[serde(rename = "questionIds", default)]
    pub question_ids: Vec<String>,
    #[serde(rename = "createdAt", default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(rename = "updatedAt", default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collection_serde_camel_case() {
        let collection = Collection {
            id: Some("c1".to_string()),
            name: "Geography".to_string(),
            question_ids: vec!["q1".to_string(), "q2".to_string()],
            created_at: Some(Utc::now()),
            updated_at: None,
        };
        let json = serde_json::to_value(&collection).unwrap();
        assert_eq!(json["questionIds"][0], "q1");
        assert!(json.get("updatedAt").is_none());
    }
}
