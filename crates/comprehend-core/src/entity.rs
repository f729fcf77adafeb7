//! Batch responses from the extraction service and their reconciliation.
//!
//! Field names follow the service's wire format (PascalCase), so these types
//! deserialize straight from a `BatchDetectEntities` response body.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// One entity detected in a document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DetectedEntity {
  pub score:        f64,
  #[serde(rename = "Type")]
  pub entity_type:  String,
  pub text:         String,
  pub begin_offset: i64,
  pub end_offset:   i64,
}

/// Successful result for the document at `index` in the request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DocumentResult {
  pub index:    usize,
  #[serde(default)]
  pub entities: Vec<DetectedEntity>,
}

/// Per-document failure reported inside an otherwise successful call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DocumentError {
  pub index:         usize,
  #[serde(default)]
  pub error_code:    String,
  #[serde(default)]
  pub error_message: String,
}

/// Raw response of one batch call.
///
/// Not guaranteed to hold one entry per submitted document: a document may
/// appear only in `error_list`, and entries carry their request index
/// explicitly.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct BatchResponse {
  #[serde(default)]
  pub result_list: Vec<DocumentResult>,
  #[serde(default)]
  pub error_list:  Vec<DocumentError>,
}

impl BatchResponse {
  /// Index the response by request position.
  pub fn into_outcome(self) -> BatchOutcome {
    BatchOutcome {
      results: self
        .result_list
        .into_iter()
        .map(|r| (r.index, r.entities))
        .collect(),
      errors:  self.error_list.into_iter().map(|e| (e.index, e)).collect(),
    }
  }
}

/// What happened to a single submitted document.
#[derive(Debug, Clone, PartialEq)]
pub enum DocumentOutcome {
  Entities(Vec<DetectedEntity>),
  Failed(DocumentError),
  /// The response mentioned neither a result nor an error for this index.
  Missing,
}

/// A batch response keyed by request index.
#[derive(Debug, Default)]
pub struct BatchOutcome {
  results: HashMap<usize, Vec<DetectedEntity>>,
  errors:  HashMap<usize, DocumentError>,
}

impl BatchOutcome {
  /// Remove and return the outcome for request position `index`.
  ///
  /// An error entry wins over a result entry for the same index.
  pub fn take(&mut self, index: usize) -> DocumentOutcome {
    let result = self.results.remove(&index);
    match (self.errors.remove(&index), result) {
      (Some(error), _) => DocumentOutcome::Failed(error),
      (None, Some(entities)) => DocumentOutcome::Entities(entities),
      (None, None) => DocumentOutcome::Missing,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn person(text: &str) -> DetectedEntity {
    DetectedEntity {
      score:        0.8,
      entity_type:  "PERSON".into(),
      text:         text.into(),
      begin_offset: 0,
      end_offset:   5,
    }
  }

  #[test]
  fn deserializes_wire_format() {
    let body = r#"{
      "ResultList": [
        {"Index": 0, "Entities": [
          {"Score": 0.8, "Type": "PERSON", "Text": "John Bob",
           "BeginOffset": 0, "EndOffset": 5}
        ]}
      ],
      "ErrorList": [
        {"Index": 1, "ErrorCode": "INTERNAL_SERVER_ERROR", "ErrorMessage": "boom"}
      ]
    }"#;
    let response: BatchResponse = serde_json::from_str(body).unwrap();
    assert_eq!(response.result_list[0].entities[0], person("John Bob"));
    assert_eq!(response.error_list[0].error_code, "INTERNAL_SERVER_ERROR");
  }

  #[test]
  fn missing_lists_default_to_empty() {
    let response: BatchResponse = serde_json::from_str("{}").unwrap();
    assert_eq!(response, BatchResponse::default());
  }

  #[test]
  fn reconciles_by_index_not_position() {
    let response = BatchResponse {
      result_list: vec![
        DocumentResult { index: 2, entities: vec![person("Carol")] },
        DocumentResult { index: 0, entities: vec![person("Alice")] },
      ],
      error_list:  vec![DocumentError {
        index:         1,
        error_code:    "TEXT_SIZE_LIMIT_EXCEEDED".into(),
        error_message: "too big".into(),
      }],
    };
    let mut outcome = response.into_outcome();

    assert_eq!(outcome.take(0), DocumentOutcome::Entities(vec![person("Alice")]));
    assert!(matches!(outcome.take(1), DocumentOutcome::Failed(e) if e.index == 1));
    assert_eq!(outcome.take(2), DocumentOutcome::Entities(vec![person("Carol")]));
    assert_eq!(outcome.take(3), DocumentOutcome::Missing);
  }

  #[test]
  fn error_wins_over_result_for_same_index() {
    let response = BatchResponse {
      result_list: vec![DocumentResult { index: 0, entities: vec![person("A")] }],
      error_list:  vec![DocumentError {
        index:         0,
        error_code:    "X".into(),
        error_message: String::new(),
      }],
    };
    let mut outcome = response.into_outcome();
    assert!(matches!(outcome.take(0), DocumentOutcome::Failed(_)));
    assert_eq!(outcome.take(0), DocumentOutcome::Missing);
  }

  #[test]
  fn error_payload_serializes_in_wire_shape() {
    let error = DocumentError {
      index:         3,
      error_code:    "X".into(),
      error_message: "bad".into(),
    };
    assert_eq!(
      serde_json::to_string(&error).unwrap(),
      r#"{"Index":3,"ErrorCode":"X","ErrorMessage":"bad"}"#
    );
  }
}
