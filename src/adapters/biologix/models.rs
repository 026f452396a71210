//! Biologix API wire models
//!
//! A listing page is decoded element by element. A record whose fields do not
//! fit the model keeps its exam id and status code plus the decode error, and
//! the mapper reports it on its own instead of failing the whole page.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Body of `POST /sessions/open`
#[derive(Debug, Serialize)]
pub struct SessionOpenRequest<'a> {
    pub username: &'a str,
    pub password: &'a str,
    pub source: u32,
}

/// Body returned by `POST /sessions/open`; the token itself travels in a header
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionOpenResponse {
    #[serde(deserialize_with = "string_or_number")]
    pub session_id: String,
    #[serde(deserialize_with = "string_or_number")]
    pub user_id: String,
    #[serde(default)]
    pub token_start: Option<String>,
    #[serde(default)]
    pub mfa_verified: Option<bool>,
}

/// Exam record as listed by the provider
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawExamRecord {
    #[serde(default, deserialize_with = "string_or_number")]
    pub exam_id: String,
    #[serde(default)]
    pub exam_key: Option<String>,
    /// Status code, `-1` when absent or not numeric
    #[serde(default = "missing_code", deserialize_with = "lenient_code")]
    pub status: i64,
    #[serde(rename = "type", default = "missing_code", deserialize_with = "lenient_code")]
    pub exam_type: i64,
    #[serde(default)]
    pub start_time: Option<String>,
    #[serde(default)]
    pub patient: RawPatient,
    #[serde(default)]
    pub base: Option<RawBase>,
    #[serde(default)]
    pub result: Option<RawResult>,
    /// Set when the record did not fit this model
    #[serde(skip)]
    pub decode_error: Option<String>,
}

impl RawExamRecord {
    /// Decodes one listing element
    ///
    /// Never fails: on a decode error the exam id and status code are read
    /// straight from the JSON and the error is kept in `decode_error`.
    pub fn from_value(value: Value) -> Self {
        let exam_id = value.get("examId").and_then(id_text).unwrap_or_default();
        let status = value.get("status").and_then(code_of).unwrap_or(-1);
        let exam_type = value.get("type").and_then(code_of).unwrap_or(-1);

        serde_json::from_value(value).unwrap_or_else(|e| RawExamRecord {
            exam_id,
            status,
            exam_type,
            decode_error: Some(e.to_string()),
            ..Default::default()
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawPatient {
    #[serde(default)]
    pub name: Option<String>,
    /// Account login; carries the fiscal id, often decorated
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub gender: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub birth_date: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawBase {
    #[serde(default)]
    pub weight_kg: Option<f64>,
    #[serde(default)]
    pub height_cm: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RawResult {
    #[serde(default)]
    pub snoring: Option<RawSnoring>,
    #[serde(default)]
    pub oximetry: Option<RawOximetry>,
}

/// Share of the night spent in each snoring band, in percent
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawSnoring {
    #[serde(default)]
    pub low_duration_percent: f64,
    #[serde(default)]
    pub medium_duration_percent: f64,
    #[serde(default)]
    pub high_duration_percent: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawOximetry {
    #[serde(default)]
    pub odi: Option<f64>,
    #[serde(default)]
    pub odi_category: Option<i64>,
    #[serde(default, rename = "spO2Min")]
    pub spo2_min: Option<f64>,
    #[serde(default, rename = "spO2Avg")]
    pub spo2_avg: Option<f64>,
    #[serde(default, rename = "spO2Max")]
    pub spo2_max: Option<f64>,
}

/// Pagination values from the `X-Pagination-*` headers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub total: u64,
    pub limit: u64,
    pub offset: u64,
}

/// One page of the exam listing
#[derive(Debug, Clone, PartialEq)]
pub struct ExamPage {
    pub records: Vec<RawExamRecord>,
    pub pagination: Pagination,
}

fn missing_code() -> i64 {
    -1
}

fn id_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn code_of(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Integer code sent as a number or a numeric string; anything else is `-1`
fn lenient_code<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(code_of(&Value::deserialize(deserializer)?).unwrap_or(-1))
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Id {
        Text(String),
        Int(i64),
        Float(f64),
    }

    Ok(match Id::deserialize(deserializer)? {
        Id::Text(s) => s,
        Id::Int(n) => n.to_string(),
        Id::Float(n) => n.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_full_record_deserializes() {
        let value = json!({
            "examId": "EX-1",
            "examKey": "K1",
            "status": 6,
            "type": 1,
            "startTime": "2024-03-10T22:15:00Z",
            "patient": {
                "name": "Ana Souza",
                "username": "123.456.789-01",
                "gender": "F",
                "birthDate": "1980-05-02"
            },
            "base": { "weightKg": 70.0, "heightCm": 170.0 },
            "result": {
                "snoring": {
                    "lowDurationPercent": 60.0,
                    "mediumDurationPercent": 30.0,
                    "highDurationPercent": 10.0
                },
                "oximetry": { "odi": 12.5, "odiCategory": 1, "spO2Min": 84.0, "spO2Avg": 94.0, "spO2Max": 99.0 }
            },
            "unknownField": true
        });

        let record: RawExamRecord = serde_json::from_value(value).unwrap();
        assert_eq!(record.exam_id, "EX-1");
        assert_eq!(record.status, 6);
        assert_eq!(record.exam_type, 1);
        assert_eq!(record.patient.username.as_deref(), Some("123.456.789-01"));
        let oximetry = record.result.unwrap().oximetry.unwrap();
        assert_eq!(oximetry.odi_category, Some(1));
        assert_eq!(oximetry.spo2_min, Some(84.0));
    }

    #[test]
    fn test_sparse_record_uses_defaults() {
        let record: RawExamRecord =
            serde_json::from_value(json!({ "examId": 991, "patient": {} })).unwrap();
        assert_eq!(record.exam_id, "991");
        assert_eq!(record.status, -1);
        assert!(record.base.is_none());
        assert!(record.patient.name.is_none());
    }

    #[test]
    fn test_string_status_code_is_accepted() {
        let record = RawExamRecord::from_value(json!({
            "examId": "EX-2",
            "status": "6",
            "type": " 1 ",
            "patient": {}
        }));
        assert_eq!(record.status, 6);
        assert_eq!(record.exam_type, 1);
        assert!(record.decode_error.is_none());
    }

    #[test]
    fn test_malformed_field_keeps_id_and_status() {
        let record = RawExamRecord::from_value(json!({
            "examId": 3003,
            "status": 6,
            "type": 1,
            "patient": { "username": "12345678901" },
            "result": { "snoring": { "lowDurationPercent": null } }
        }));
        assert_eq!(record.exam_id, "3003");
        assert_eq!(record.status, 6);
        assert!(record.patient.username.is_none());
        assert!(record.decode_error.unwrap().contains("invalid type: null"));
    }

    #[test]
    fn test_non_object_element_is_marked() {
        let record = RawExamRecord::from_value(json!("garbage"));
        assert_eq!(record.exam_id, "");
        assert_eq!(record.status, -1);
        assert!(record.decode_error.is_some());
    }

    #[test]
    fn test_session_response_accepts_numeric_user_id() {
        let response: SessionOpenResponse = serde_json::from_value(json!({
            "sessionId": "s-1",
            "userId": 42,
            "tokenStart": "2024-03-10T10:00:00Z",
            "mfaVerified": false
        }))
        .unwrap();
        assert_eq!(response.user_id, "42");
        assert_eq!(response.mfa_verified, Some(false));
    }
}
