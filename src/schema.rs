use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{ValidationError, Violation};

/// Closed set of keys a `DocumentRecord` may carry, in output order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Document,
    Introduction,
    Thoughts,
    Answers,
    Hallmarks,
    FurtherReading,
    Images,
    FurtherDevelopment,
    ThoughtsI,
    AnswersI,
    AnswersII,
    FurtherThoughts,
    Ependymoma,
}

impl Field {
    pub const ALL: [Field; 13] = [
        Field::Document,
        Field::Introduction,
        Field::Thoughts,
        Field::Answers,
        Field::Hallmarks,
        Field::FurtherReading,
        Field::Images,
        Field::FurtherDevelopment,
        Field::ThoughtsI,
        Field::AnswersI,
        Field::AnswersII,
        Field::FurtherThoughts,
        Field::Ependymoma,
    ];

    pub fn key(self) -> &'static str {
        match self {
            Field::Document => "document",
            Field::Introduction => "Introduction",
            Field::Thoughts => "Thoughts",
            Field::Answers => "Answers",
            Field::Hallmarks => "Hallmarks",
            Field::FurtherReading => "Further_Reading",
            Field::Images => "Images",
            Field::FurtherDevelopment => "Further_Development",
            Field::ThoughtsI => "Thoughts_I",
            Field::AnswersI => "Answers_I",
            Field::AnswersII => "Answers_II",
            Field::FurtherThoughts => "Further_Thoughts",
            Field::Ependymoma => "Ependymoma",
        }
    }

    pub fn from_key(key: &str) -> Option<Field> {
        Field::ALL.into_iter().find(|f| f.key() == key)
    }

    pub fn is_required(self) -> bool {
        matches!(
            self,
            Field::Document | Field::Introduction | Field::Thoughts | Field::Answers
        )
    }

    /// Human description, embedded in the enhancement prompt.
    pub fn description(self) -> &'static str {
        match self {
            Field::Document => "Document title or identifier",
            Field::Introduction => "Introduction or summary of the document",
            Field::Thoughts => "Main thoughts, insights or methodology",
            Field::Answers => "Key findings, results or conclusions",
            Field::Hallmarks => "Key hallmarks or characteristics",
            Field::FurtherReading => "References or recommended further reading",
            Field::Images => "Description of relevant figures, tables or images",
            Field::FurtherDevelopment => "Future work, limitations, next steps",
            Field::ThoughtsI => "Additional thoughts - part I",
            Field::AnswersI => "Additional answers - part I",
            Field::AnswersII => "Additional answers - part II",
            Field::FurtherThoughts => "Further thoughts and considerations",
            Field::Ependymoma => "Any ependymoma-related content",
        }
    }
}

/// The validated output record. Serializes with exactly the closed key set;
/// absent optional fields are written as `null`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DocumentRecord {
    pub document: String,
    #[serde(rename = "Introduction")]
    pub introduction: String,
    #[serde(rename = "Thoughts")]
    pub thoughts: String,
    #[serde(rename = "Answers")]
    pub answers: String,
    #[serde(rename = "Hallmarks", default)]
    pub hallmarks: Option<String>,
    #[serde(rename = "Further_Reading", default)]
    pub further_reading: Option<String>,
    #[serde(rename = "Images", default)]
    pub images: Option<String>,
    #[serde(rename = "Further_Development", default)]
    pub further_development: Option<String>,
    #[serde(rename = "Thoughts_I", default)]
    pub thoughts_i: Option<String>,
    #[serde(rename = "Answers_I", default)]
    pub answers_i: Option<String>,
    #[serde(rename = "Answers_II", default)]
    pub answers_ii: Option<String>,
    #[serde(rename = "Further_Thoughts", default)]
    pub further_thoughts: Option<String>,
    #[serde(rename = "Ependymoma", default)]
    pub ependymoma: Option<String>,
}

impl DocumentRecord {
    pub fn get(&self, field: Field) -> Option<&str> {
        match field {
            Field::Document => Some(&self.document),
            Field::Introduction => Some(&self.introduction),
            Field::Thoughts => Some(&self.thoughts),
            Field::Answers => Some(&self.answers),
            Field::Hallmarks => self.hallmarks.as_deref(),
            Field::FurtherReading => self.further_reading.as_deref(),
            Field::Images => self.images.as_deref(),
            Field::FurtherDevelopment => self.further_development.as_deref(),
            Field::ThoughtsI => self.thoughts_i.as_deref(),
            Field::AnswersI => self.answers_i.as_deref(),
            Field::AnswersII => self.answers_ii.as_deref(),
            Field::FurtherThoughts => self.further_thoughts.as_deref(),
            Field::Ependymoma => self.ependymoma.as_deref(),
        }
    }

    /// Candidate mapping for (re-)validation. Every key is present.
    pub fn to_map(&self) -> Map<String, Value> {
        Field::ALL
            .into_iter()
            .map(|f| {
                let value = self
                    .get(f)
                    .map(|s| Value::String(s.to_string()))
                    .unwrap_or(Value::Null);
                (f.key().to_string(), value)
            })
            .collect()
    }
}

/// Single gate for every candidate record: closed key set, required fields
/// present as non-empty strings, optional fields string or null.
pub fn validate(candidate: &Map<String, Value>) -> Result<DocumentRecord, ValidationError> {
    if let Some(key) = candidate.keys().find(|k| Field::from_key(k).is_none()) {
        return Err(ValidationError::new(key, Violation::UnknownKey));
    }

    let required = |field: Field| -> Result<String, ValidationError> {
        match candidate.get(field.key()) {
            None | Some(Value::Null) => Err(ValidationError::new(field.key(), Violation::Missing)),
            Some(Value::String(s)) if s.trim().is_empty() => {
                Err(ValidationError::new(field.key(), Violation::Empty))
            }
            Some(Value::String(s)) => Ok(s.clone()),
            Some(_) => Err(ValidationError::new(field.key(), Violation::WrongType)),
        }
    };
    let optional = |field: Field| -> Result<Option<String>, ValidationError> {
        match candidate.get(field.key()) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.clone())),
            Some(_) => Err(ValidationError::new(field.key(), Violation::WrongType)),
        }
    };

    Ok(DocumentRecord {
        document: required(Field::Document)?,
        introduction: required(Field::Introduction)?,
        thoughts: required(Field::Thoughts)?,
        answers: required(Field::Answers)?,
        hallmarks: optional(Field::Hallmarks)?,
        further_reading: optional(Field::FurtherReading)?,
        images: optional(Field::Images)?,
        further_development: optional(Field::FurtherDevelopment)?,
        thoughts_i: optional(Field::ThoughtsI)?,
        answers_i: optional(Field::AnswersI)?,
        answers_ii: optional(Field::AnswersII)?,
        further_thoughts: optional(Field::FurtherThoughts)?,
        ependymoma: optional(Field::Ependymoma)?,
    })
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> DocumentRecord {
        DocumentRecord {
            document: "Molecular subgroups of ependymoma".into(),
            introduction: "Ependymomas are glial tumours.".into(),
            thoughts: "We profiled 500 tumours.".into(),
            answers: "Nine subgroups were identified.".into(),
            hallmarks: None,
            further_reading: Some("Pajtler et al. 2015".into()),
            images: Some("Figure 1: Overview.".into()),
            further_development: None,
            thoughts_i: None,
            answers_i: None,
            answers_ii: None,
            further_thoughts: None,
            ependymoma: Some("Posterior fossa ependymoma.".into()),
        }
    }

    fn as_map(v: Value) -> Map<String, Value> {
        v.as_object().cloned().unwrap()
    }

    #[test]
    fn keys_are_closed_and_ordered() {
        let keys: Vec<&str> = Field::ALL.iter().map(|f| f.key()).collect();
        assert_eq!(keys.len(), 13);
        assert_eq!(keys[0], "document");
        assert!(keys.contains(&"Further_Reading"));
        assert_eq!(Field::from_key("Answers_II"), Some(Field::AnswersII));
        assert_eq!(Field::from_key("answers"), None);
    }

    #[test]
    fn serializes_nulls_for_absent_optionals() {
        let v = serde_json::to_value(sample()).unwrap();
        let obj = v.as_object().unwrap();
        assert_eq!(obj.len(), 13);
        assert_eq!(obj["Hallmarks"], Value::Null);
        assert_eq!(obj["Images"], json!("Figure 1: Overview."));
    }

    #[test]
    fn json_round_trip() {
        let record = sample();
        let text = serde_json::to_string_pretty(&record).unwrap();
        let back: DocumentRecord = serde_json::from_str(&text).unwrap();
        assert_eq!(back, record);
        assert_eq!(validate(&record.to_map()).unwrap(), record);
    }

    #[test]
    fn missing_required_field() {
        let mut map = sample().to_map();
        map.remove("Thoughts");
        let err = validate(&map).unwrap_err();
        assert_eq!(err.field, "Thoughts");
        assert_eq!(err.violation, Violation::Missing);
    }

    #[test]
    fn null_required_field_is_missing() {
        let mut map = sample().to_map();
        map.insert("Answers".into(), Value::Null);
        assert_eq!(validate(&map).unwrap_err().violation, Violation::Missing);
    }

    #[test]
    fn empty_required_field() {
        let mut map = sample().to_map();
        map.insert("document".into(), json!("   "));
        let err = validate(&map).unwrap_err();
        assert_eq!(err.field, "document");
        assert_eq!(err.violation, Violation::Empty);
    }

    #[test]
    fn wrong_types() {
        let mut map = sample().to_map();
        map.insert("Introduction".into(), json!(42));
        assert_eq!(validate(&map).unwrap_err().violation, Violation::WrongType);

        let mut map = sample().to_map();
        map.insert("Images".into(), json!(["a", "b"]));
        let err = validate(&map).unwrap_err();
        assert_eq!(err.field, "Images");
        assert_eq!(err.violation, Violation::WrongType);
    }

    #[test]
    fn unknown_key_rejected() {
        let mut map = sample().to_map();
        map.insert("Summary".into(), json!("extra"));
        let err = validate(&map).unwrap_err();
        assert_eq!(err.field, "Summary");
        assert_eq!(err.violation, Violation::UnknownKey);
    }

    #[test]
    fn optional_keys_may_be_absent() {
        let map = as_map(json!({
            "document": "T",
            "Introduction": "I",
            "Thoughts": "T",
            "Answers": "A"
        }));
        let record = validate(&map).unwrap();
        assert!(record.images.is_none());
        assert!(record.ependymoma.is_none());
    }

    #[test]
    fn deserialize_rejects_unknown_fields() {
        let text = r#"{"document":"T","Introduction":"I","Thoughts":"T","Answers":"A","Extra":"x"}"#;
        assert!(serde_json::from_str::<DocumentRecord>(text).is_err());
    }
}
