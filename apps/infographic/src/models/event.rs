use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::graph::AdjacencyList;

/// A news event as it arrives from the ingestion side.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventRecord {
    pub request_id: String,
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub related_articles: Vec<String>,
    /// Image reference (object key or URL) attached to the event, if any.
    #[serde(default)]
    pub image: Option<String>,
    #[serde(alias = "adjList", default)]
    pub adj_list: AdjacencyList,
    #[serde(alias = "node_occurences", default)]
    pub node_occurrences: Vec<f64>,
    #[serde(default)]
    pub entity_labels: HashMap<usize, String>,
}

impl EventRecord {
    /// Flattens the event into a single JSON object keyed by field name.
    pub fn to_flat_map(&self) -> Result<Map<String, Value>, serde_json::Error> {
        match serde_json::to_value(self)? {
            Value::Object(map) => Ok(map),
            other => Err(serde::ser::Error::custom(format!(
                "event serialized to a non-object: {other}"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> EventRecord {
        serde_json::from_value(json!({
            "request_id": "req-1",
            "title": "Debate",
            "description": "Candidates meet on stage",
            "related_articles": ["https://example.com/a"],
            "image": "events/req-1.png",
            "adjList": {"0": [1], "1": []},
            "node_occurences": [300.0, 150.0],
            "entity_labels": {"0": "Biden", "1": "Trump"}
        }))
        .unwrap()
    }

    #[test]
    fn test_deserialize_accepts_source_field_names() {
        let event = sample();
        assert_eq!(event.adj_list.get(&0), Some(&vec![1]));
        assert_eq!(event.node_occurrences, vec![300.0, 150.0]);
        assert_eq!(event.entity_labels.get(&1).map(String::as_str), Some("Trump"));
    }

    #[test]
    fn test_flat_map_has_exactly_the_event_keys() {
        let map = sample().to_flat_map().unwrap();
        let mut keys: Vec<&str> = map.keys().map(String::as_str).collect();
        keys.sort_unstable();
        assert_eq!(
            keys,
            vec![
                "adj_list",
                "description",
                "entity_labels",
                "image",
                "node_occurrences",
                "related_articles",
                "request_id",
                "title"
            ]
        );
        assert_eq!(map["adj_list"], json!({"0": [1], "1": []}));
        assert_eq!(map["entity_labels"]["0"], json!("Biden"));
        assert_eq!(map["image"], json!("events/req-1.png"));
    }

    #[test]
    fn test_missing_optional_fields_default() {
        let event: EventRecord = serde_json::from_value(json!({
            "request_id": "r",
            "title": "t",
            "description": "d"
        }))
        .unwrap();
        assert!(event.adj_list.is_empty());
        assert_eq!(event.to_flat_map().unwrap()["image"], Value::Null);
    }
}
