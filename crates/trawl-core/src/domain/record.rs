//! Extracted records written to the sink.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A structured record produced by an extractor.
///
/// The field set is open (whatever the extractor found) and is flattened
/// into the top-level JSON object next to `extracted_at`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    #[serde(flatten)]
    fields: Map<String, Value>,
    extracted_at: DateTime<Utc>,
}

impl Record {
    pub fn new(extracted_at: DateTime<Utc>) -> Self {
        Self {
            fields: Map::new(),
            extracted_at,
        }
    }

    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    pub fn extracted_at(&self) -> DateTime<Utc> {
        self.extracted_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn fields_are_flattened_next_to_timestamp() {
        let at = Utc.with_ymd_and_hms(2024, 5, 1, 8, 30, 0).unwrap();
        let record = Record::new(at)
            .with_field("name", "Sample Hotel")
            .with_field("stars", 4.5);

        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["name"], "Sample Hotel");
        assert_eq!(value["stars"], 4.5);
        assert_eq!(value["extracted_at"], "2024-05-01T08:30:00Z");

        let back: Record = serde_json::from_value(value).unwrap();
        assert_eq!(back.get("name"), Some(&Value::from("Sample Hotel")));
        assert_eq!(back.extracted_at(), at);
        assert!(back.get("extracted_at").is_none());
    }
}
