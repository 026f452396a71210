//! Field mapping from provider records to domain records
//!
//! Every rule here is pure; the only side effect is a warning when an exam
//! date has to fall back to the processing date.

use crate::adapters::biologix::RawExamRecord;
use crate::domain::{
    DesaturationCategory, ExamData, ExamStatus, ExamSyncError, ExamType, ExternalExamId, FiscalId,
    Gender, NewPatient, Result,
};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use regex::Regex;
use std::sync::OnceLock;

/// A raw record translated into the patient and exam it describes
#[derive(Debug, Clone, PartialEq)]
pub struct MappedExam {
    pub fiscal_id: FiscalId,
    pub patient: NewPatient,
    pub exam: ExamData,
}

fn fiscal_id_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"[0-9]{11}").ok()).as_ref()
}

/// Extracts the fiscal id carried in a provider username
///
/// The first run of eleven consecutive digits wins; otherwise all non-digits
/// are stripped and the remainder is accepted when exactly eleven digits are
/// left.
///
/// ```
/// use examsync::core::mapping::extract_fiscal_id;
///
/// assert_eq!(extract_fiscal_id("user-123.456.789-01-x").unwrap().as_str(), "12345678901");
/// assert!(extract_fiscal_id("abc").is_none());
/// ```
pub fn extract_fiscal_id(username: &str) -> Option<FiscalId> {
    if let Some(found) = fiscal_id_pattern().and_then(|re| re.find(username)) {
        return FiscalId::new(found.as_str()).ok();
    }

    let digits: String = username.chars().filter(|c| c.is_ascii_digit()).collect();
    FiscalId::new(digits).ok()
}

/// Weighted snoring score from the share of time in each band
///
/// `None` when no snoring was recorded at all.
pub fn snoring_score(low: f64, medium: f64, high: f64) -> Option<f64> {
    if low == 0.0 && medium == 0.0 && high == 0.0 {
        return None;
    }
    Some(round2((low + medium * 2.0 + high * 3.0) / 3.0))
}

/// Body mass index from weight in kg and height in cm
pub fn body_mass_index(weight_kg: Option<f64>, height_cm: Option<f64>) -> Option<f64> {
    match (weight_kg, height_cm) {
        (Some(weight), Some(height)) if weight > 0.0 && height > 0.0 => {
            let meters = height / 100.0;
            Some(round2(weight / (meters * meters)))
        }
        _ => None,
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Parses the provider's start time down to a calendar date
pub fn parse_exam_date(start_time: &str) -> Option<NaiveDate> {
    let value = start_time.trim();
    if value.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.date_naive());
    }

    for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(value, format) {
            return Some(dt.date());
        }
    }

    NaiveDate::parse_from_str(value, "%Y-%m-%d").ok()
}

fn parse_birth_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    let date_part = value.get(..10).unwrap_or(value);
    NaiveDate::parse_from_str(date_part, "%Y-%m-%d").ok()
}

fn non_blank(value: Option<&String>) -> Option<String> {
    value
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn mapping_error(message: impl Into<String>) -> ExamSyncError {
    ExamSyncError::Mapping(message.into())
}

/// Maps one raw record
///
/// `today` is the processing date, used when the record carries no usable
/// start time.
///
/// # Errors
///
/// Returns [`ExamSyncError::Mapping`] when the record did not decode, when
/// the fiscal id, patient name or exam id is missing, or when a code has no
/// known meaning.
pub fn map_record(record: &RawExamRecord, today: NaiveDate) -> Result<MappedExam> {
    if let Some(reason) = &record.decode_error {
        return Err(mapping_error(format!("malformed record: {reason}")));
    }

    let external_exam_id = ExternalExamId::new(record.exam_id.as_str())
        .map_err(|_| mapping_error("exam id missing"))?;

    let fiscal_id = record
        .patient
        .username
        .as_deref()
        .and_then(extract_fiscal_id)
        .ok_or_else(|| mapping_error("fiscal id not found"))?;

    let name = non_blank(record.patient.name.as_ref())
        .ok_or_else(|| mapping_error("patient name missing"))?;

    let exam_type = ExamType::from_code(record.exam_type)
        .ok_or_else(|| mapping_error(format!("unknown exam type code {}", record.exam_type)))?;

    let status = ExamStatus::from_code(record.status)
        .ok_or_else(|| mapping_error(format!("unknown exam status code {}", record.status)))?;

    let exam_date = match record.start_time.as_deref().and_then(parse_exam_date) {
        Some(date) => date,
        None => {
            tracing::warn!(
                exam_id = %external_exam_id,
                start_time = ?record.start_time,
                fallback = %today,
                "Exam has no usable start time, using processing date"
            );
            today
        }
    };

    let result = record.result.as_ref();

    let snoring = result
        .and_then(|r| r.snoring.as_ref())
        .and_then(|s| {
            snoring_score(
                s.low_duration_percent,
                s.medium_duration_percent,
                s.high_duration_percent,
            )
        });

    let oximetry = result.and_then(|r| r.oximetry.as_ref());

    let desaturation_category = match oximetry.and_then(|o| o.odi_category) {
        Some(code) => Some(DesaturationCategory::from_code(code).ok_or_else(|| {
            mapping_error(format!("unknown desaturation category code {code}"))
        })?),
        None => None,
    };

    let weight_kg = record.base.as_ref().and_then(|b| b.weight_kg);
    let height_cm = record.base.as_ref().and_then(|b| b.height_cm);

    let patient = NewPatient {
        fiscal_id: fiscal_id.clone(),
        name,
        email: non_blank(record.patient.email.as_ref()),
        phone: non_blank(record.patient.phone.as_ref()),
        birth_date: record.patient.birth_date.as_deref().and_then(parse_birth_date),
        gender: record.patient.gender.as_deref().and_then(Gender::from_code),
    };

    let exam = ExamData {
        external_exam_id,
        exam_type,
        status,
        exam_date,
        weight_kg,
        height_cm,
        bmi: body_mass_index(weight_kg, height_cm),
        snoring_score: snoring,
        desaturation_index: oximetry.and_then(|o| o.odi),
        desaturation_category,
        spo2_min: oximetry.and_then(|o| o.spo2_min),
        spo2_avg: oximetry.and_then(|o| o.spo2_avg),
        spo2_max: oximetry.and_then(|o| o.spo2_max),
    };

    Ok(MappedExam {
        fiscal_id,
        patient,
        exam,
    })
}

/// Pull-based mapping over a batch of raw records
///
/// Each item pairs the provider exam id with the mapping outcome so failures
/// can be reported without stopping the iteration.
pub struct MappedRecords<I> {
    records: I,
    today: NaiveDate,
}

impl<I> MappedRecords<I>
where
    I: Iterator<Item = RawExamRecord>,
{
    pub fn new(records: impl IntoIterator<IntoIter = I>, today: NaiveDate) -> Self {
        Self {
            records: records.into_iter(),
            today,
        }
    }
}

impl<I> Iterator for MappedRecords<I>
where
    I: Iterator<Item = RawExamRecord>,
{
    type Item = (String, Result<MappedExam>);

    fn next(&mut self) -> Option<Self::Item> {
        let record = self.records.next()?;
        let outcome = map_record(&record, self.today);
        Some((record.exam_id, outcome))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.records.size_hint()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::biologix::models::{RawBase, RawOximetry, RawPatient, RawResult, RawSnoring};
    use fake::faker::name::en::Name;
    use fake::Fake;
    use test_case::test_case;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 15).unwrap()
    }

    fn record(exam_id: &str, username: &str) -> RawExamRecord {
        RawExamRecord {
            exam_id: exam_id.to_string(),
            exam_key: None,
            status: 6,
            exam_type: 1,
            start_time: Some("2024-03-10T22:15:00Z".to_string()),
            patient: RawPatient {
                name: Some(Name().fake::<String>()),
                username: Some(username.to_string()),
                gender: Some("F".to_string()),
                email: Some("  ".to_string()),
                phone: Some("+55 11 98888-7777".to_string()),
                birth_date: Some("1980-05-02".to_string()),
            },
            base: Some(RawBase {
                weight_kg: Some(80.0),
                height_cm: Some(175.0),
            }),
            result: Some(RawResult {
                snoring: Some(RawSnoring {
                    low_duration_percent: 60.0,
                    medium_duration_percent: 30.0,
                    high_duration_percent: 10.0,
                }),
                oximetry: Some(RawOximetry {
                    odi: Some(18.0),
                    odi_category: Some(2),
                    spo2_min: Some(82.0),
                    spo2_avg: Some(93.5),
                    spo2_max: Some(98.0),
                }),
            }),
            decode_error: None,
        }
    }

    #[test_case("12345678901", Some("12345678901") ; "plain digits")]
    #[test_case("user-123.456.789-01-x", Some("12345678901") ; "decorated")]
    #[test_case("cpf98765432100@clinic", Some("98765432100") ; "embedded run")]
    #[test_case("1234567890123", Some("12345678901") ; "first eleven of a longer run")]
    #[test_case("abc", None ; "no digits")]
    #[test_case("123.456", None ; "too few digits")]
    #[test_case("12-34-56-78-90-12-3", None ; "too many scattered digits")]
    fn test_extract_fiscal_id(input: &str, expected: Option<&str>) {
        let got = extract_fiscal_id(input);
        assert_eq!(got.as_ref().map(FiscalId::as_str), expected);
    }

    #[test_case(0.0, 0.0, 0.0, None ; "no snoring")]
    #[test_case(60.0, 30.0, 10.0, Some(50.0) ; "mixed bands")]
    #[test_case(100.0, 0.0, 0.0, Some(33.33) ; "low only rounds")]
    #[test_case(0.0, 0.0, 100.0, Some(100.0) ; "high only")]
    fn test_snoring_score(low: f64, medium: f64, high: f64, expected: Option<f64>) {
        assert_eq!(snoring_score(low, medium, high), expected);
    }

    #[test_case("2024-03-10T22:15:00Z", Some((2024, 3, 10)) ; "rfc3339")]
    #[test_case("2024-03-10T23:30:00-03:00", Some((2024, 3, 10)) ; "rfc3339 with offset keeps local date")]
    #[test_case("2024-03-10 22:15:00", Some((2024, 3, 10)) ; "space separated")]
    #[test_case("2024-03-10", Some((2024, 3, 10)) ; "date only")]
    #[test_case("10/03/2024", None ; "unsupported format")]
    #[test_case("", None ; "empty")]
    fn test_parse_exam_date(input: &str, expected: Option<(i32, u32, u32)>) {
        let expected = expected.map(|(y, m, d)| NaiveDate::from_ymd_opt(y, m, d).unwrap());
        assert_eq!(parse_exam_date(input), expected);
    }

    #[test]
    fn test_body_mass_index() {
        assert_eq!(body_mass_index(Some(80.0), Some(175.0)), Some(26.12));
        assert_eq!(body_mass_index(Some(80.0), None), None);
        assert_eq!(body_mass_index(Some(80.0), Some(0.0)), None);
    }

    #[test]
    fn test_map_full_record() {
        let raw = record("EX-1", "123.456.789-01");
        let mapped = map_record(&raw, today()).unwrap();

        assert_eq!(mapped.fiscal_id.as_str(), "12345678901");
        assert_eq!(mapped.patient.name, raw.patient.name.clone().unwrap());
        assert_eq!(mapped.patient.gender, Some(Gender::Female));
        assert_eq!(mapped.patient.email, None);
        assert_eq!(
            mapped.patient.birth_date,
            NaiveDate::from_ymd_opt(1980, 5, 2)
        );
        assert_eq!(mapped.exam.external_exam_id.as_str(), "EX-1");
        assert_eq!(mapped.exam.exam_type, ExamType::Sleep);
        assert_eq!(mapped.exam.status, ExamStatus::Done);
        assert_eq!(mapped.exam.exam_date, NaiveDate::from_ymd_opt(2024, 3, 10).unwrap());
        assert_eq!(mapped.exam.snoring_score, Some(50.0));
        assert_eq!(mapped.exam.bmi, Some(26.12));
        assert_eq!(mapped.exam.desaturation_index, Some(18.0));
        assert_eq!(
            mapped.exam.desaturation_category,
            Some(DesaturationCategory::Moderate)
        );
        assert_eq!(mapped.exam.spo2_avg, Some(93.5));
    }

    #[test]
    fn test_missing_start_time_falls_back_to_today() {
        let mut raw = record("EX-1", "12345678901");
        raw.start_time = None;
        let mapped = map_record(&raw, today()).unwrap();
        assert_eq!(mapped.exam.exam_date, today());
    }

    #[test]
    fn test_missing_fiscal_id_is_mapping_error() {
        let raw = record("EX-1", "no-digits-here");
        let err = map_record(&raw, today()).unwrap_err();
        assert!(matches!(err, ExamSyncError::Mapping(ref m) if m == "fiscal id not found"));
    }

    #[test]
    fn test_missing_name_is_mapping_error() {
        let mut raw = record("EX-1", "12345678901");
        raw.patient.name = Some("   ".to_string());
        assert!(matches!(
            map_record(&raw, today()),
            Err(ExamSyncError::Mapping(_))
        ));
    }

    #[test]
    fn test_empty_exam_id_is_mapping_error() {
        let raw = record("  ", "12345678901");
        assert!(matches!(
            map_record(&raw, today()),
            Err(ExamSyncError::Mapping(_))
        ));
    }

    #[test]
    fn test_undecodable_record_is_mapping_error() {
        let mut raw = record("EX-1", "12345678901");
        raw.decode_error = Some("invalid type: null, expected f64".to_string());
        let err = map_record(&raw, today()).unwrap_err();
        assert!(matches!(err, ExamSyncError::Mapping(_)));
        assert!(err.to_string().contains("malformed record"));
    }

    #[test_case(5, 6, Some(1) ; "unknown type")]
    #[test_case(1, 42, Some(1) ; "unknown status")]
    #[test_case(1, 6, Some(9) ; "unknown desaturation category")]
    fn test_unknown_codes_are_mapping_errors(exam_type: i64, status: i64, category: Option<i64>) {
        let mut raw = record("EX-1", "12345678901");
        raw.exam_type = exam_type;
        raw.status = status;
        if let Some(oximetry) = raw.result.as_mut().and_then(|r| r.oximetry.as_mut()) {
            oximetry.odi_category = category;
        }
        assert!(matches!(
            map_record(&raw, today()),
            Err(ExamSyncError::Mapping(_))
        ));
    }

    #[test]
    fn test_record_without_results() {
        let mut raw = record("EX-1", "12345678901");
        raw.result = None;
        raw.base = None;
        let mapped = map_record(&raw, today()).unwrap();
        assert_eq!(mapped.exam.snoring_score, None);
        assert_eq!(mapped.exam.desaturation_category, None);
        assert_eq!(mapped.exam.bmi, None);
    }

    #[test]
    fn test_mapped_records_isolates_failures() {
        let raws = vec![
            record("EX-1", "12345678901"),
            record("EX-2", "nothing"),
            record("EX-3", "10987654321"),
        ];

        let outcomes: Vec<(String, bool)> = MappedRecords::new(raws, today())
            .map(|(id, result)| (id, result.is_ok()))
            .collect();

        assert_eq!(
            outcomes,
            vec![
                ("EX-1".to_string(), true),
                ("EX-2".to_string(), false),
                ("EX-3".to_string(), true),
            ]
        );
    }
}
