use std::collections::BTreeMap;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_cbor::{to_vec, value::to_value};
use serde_json::{Map, Value, json};

use crate::spec::block::BlockType;
use crate::spec::rules::format_number;

/// Phone answer split into the selected dialling prefix and national number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct PhoneNumber {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prefix: Option<String>,
    pub number: String,
}

impl PhoneNumber {
    pub fn digit_count(&self) -> usize {
        self.number.chars().filter(char::is_ascii_digit).count()
    }
}

/// Descriptor of an uploaded file; the bytes live with the upload service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct FileRef {
    pub name: String,
    pub size: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(default, rename_all = "camelCase")]
pub struct Address {
    pub street: String,
    pub city: String,
    pub zip: String,
    pub country: String,
}

impl Address {
    pub fn parts(&self) -> [(&'static str, &str); 4] {
        [
            ("street", self.street.as_str()),
            ("city", self.city.as_str()),
            ("zip", self.zip.as_str()),
            ("country", self.country.as_str()),
        ]
    }
}

/// Typed answer. The block type decides which variant is acceptable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum AnswerValue {
    Text(String),
    Choice(String),
    Choices(Vec<String>),
    Bool(bool),
    Number(f64),
    Phone(PhoneNumber),
    Files(Vec<FileRef>),
    Address(Address),
}

/// Answers keyed by block id.
pub type Answers = BTreeMap<String, AnswerValue>;

impl AnswerValue {
    /// Converts the plain JSON a renderer or host hands over into the variant
    /// expected by `block_type`. Returns `None` when the shape does not fit.
    pub fn from_json(block_type: BlockType, value: &Value) -> Option<AnswerValue> {
        match block_type {
            BlockType::Text
            | BlockType::Textarea
            | BlockType::Email
            | BlockType::Website
            | BlockType::Captcha
            | BlockType::Date => value.as_str().map(|text| AnswerValue::Text(text.to_string())),
            BlockType::SingleChoice | BlockType::Dropdown => value
                .as_str()
                .map(|choice| AnswerValue::Choice(choice.to_string())),
            BlockType::MultipleChoice => match value {
                Value::Array(items) => items
                    .iter()
                    .map(|item| item.as_str().map(str::to_string))
                    .collect::<Option<Vec<_>>>()
                    .map(AnswerValue::Choices),
                Value::String(choice) => Some(AnswerValue::Choices(vec![choice.clone()])),
                _ => None,
            },
            BlockType::YesNo | BlockType::Consent => match value {
                Value::Bool(flag) => Some(AnswerValue::Bool(*flag)),
                Value::String(text) => match text.trim().to_ascii_lowercase().as_str() {
                    "yes" | "true" | "y" => Some(AnswerValue::Bool(true)),
                    "no" | "false" | "n" => Some(AnswerValue::Bool(false)),
                    _ => None,
                },
                _ => None,
            },
            BlockType::Number | BlockType::Slider | BlockType::Rating => match value {
                Value::Number(number) => number.as_f64().map(AnswerValue::Number),
                Value::String(text) => text
                    .trim()
                    .parse::<f64>()
                    .ok()
                    .filter(|number| number.is_finite())
                    .map(AnswerValue::Number),
                _ => None,
            },
            BlockType::Phone => match value {
                Value::String(number) => Some(AnswerValue::Phone(PhoneNumber {
                    prefix: None,
                    number: number.clone(),
                })),
                Value::Object(_) => serde_json::from_value(value.clone())
                    .ok()
                    .map(AnswerValue::Phone),
                _ => None,
            },
            BlockType::File => match value {
                Value::Array(_) => serde_json::from_value(value.clone())
                    .ok()
                    .map(AnswerValue::Files),
                Value::Object(_) => serde_json::from_value::<FileRef>(value.clone())
                    .ok()
                    .map(|file| AnswerValue::Files(vec![file])),
                _ => None,
            },
            BlockType::Address => serde_json::from_value(value.clone())
                .ok()
                .map(AnswerValue::Address),
            BlockType::Welcome
            | BlockType::Heading
            | BlockType::Paragraph
            | BlockType::Youtube
            | BlockType::MenuRestaurant
            | BlockType::Image => None,
        }
    }

    /// Plain JSON shape handed to the submission endpoint.
    pub fn to_json(&self) -> Value {
        match self {
            AnswerValue::Text(text) | AnswerValue::Choice(text) => Value::String(text.clone()),
            AnswerValue::Choices(items) => json!(items),
            AnswerValue::Bool(flag) => Value::Bool(*flag),
            AnswerValue::Number(number) => json!(number),
            AnswerValue::Phone(phone) => json!(phone),
            AnswerValue::Files(files) => json!(files),
            AnswerValue::Address(address) => json!(address),
        }
    }

    /// Stringified form used by `contains` and equality against text operands.
    pub fn scalar_text(&self) -> Option<String> {
        match self {
            AnswerValue::Text(text) | AnswerValue::Choice(text) => Some(text.trim().to_string()),
            AnswerValue::Choices(items) => Some(items.join(", ")),
            AnswerValue::Bool(flag) => Some(flag.to_string()),
            AnswerValue::Number(number) => Some(format_number(*number)),
            AnswerValue::Phone(phone) => Some(format!(
                "{}{}",
                phone.prefix.as_deref().unwrap_or_default(),
                phone.number
            )),
            AnswerValue::Files(_) | AnswerValue::Address(_) => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            AnswerValue::Number(number) => Some(*number),
            AnswerValue::Text(text) | AnswerValue::Choice(text) => {
                text.trim().parse::<f64>().ok().filter(|n| n.is_finite())
            }
            _ => None,
        }
    }
}

/// Plain JSON object for a whole answer map.
pub fn answers_to_json(answers: &Answers) -> Map<String, Value> {
    answers
        .iter()
        .map(|(id, value)| (id.clone(), value.to_json()))
        .collect()
}

/// Optional metadata paired with an `AnswerSet`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Meta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub saved_at_ms: Option<u64>,
}

/// Snapshot of a respondent's in-progress answers for one form version.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct AnswerSet {
    pub form_id: String,
    pub spec_version: String,
    pub answers: Answers,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<Meta>,
}

impl AnswerSet {
    pub fn new(form_id: impl Into<String>, spec_version: impl Into<String>) -> Self {
        Self {
            form_id: form_id.into(),
            spec_version: spec_version.into(),
            answers: Answers::new(),
            meta: None,
        }
    }

    /// Serializes the answer set as canonical CBOR bytes.
    pub fn to_cbor(&self) -> Result<Vec<u8>, serde_cbor::Error> {
        let canonical = to_value(self)?;
        to_vec(&canonical)
    }

    pub fn from_cbor(bytes: &[u8]) -> Result<Self, serde_cbor::Error> {
        serde_cbor::from_slice(bytes)
    }
}

/// Programmatic category of a surfaced error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    MissingRequired,
    BadFormat,
    FileTooLarge,
    FileTypeNotAllowed,
    CaptchaUnresolved,
    /// The only kind that originates outside the engine.
    SubmissionFailed,
}

impl ErrorKind {
    pub fn code(self) -> &'static str {
        match self {
            ErrorKind::MissingRequired => "missing_required",
            ErrorKind::BadFormat => "bad_format",
            ErrorKind::FileTooLarge => "file_too_large",
            ErrorKind::FileTypeNotAllowed => "file_type_not_allowed",
            ErrorKind::CaptchaUnresolved => "captcha_unresolved",
            ErrorKind::SubmissionFailed => "submission_failed",
        }
    }
}

/// Error metadata surfaced to the respondent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ValidationError {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_id: Option<String>,
    pub kind: ErrorKind,
    pub message: String,
}

impl ValidationError {
    pub fn new(block_id: &str, kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            block_id: Some(block_id.to_string()),
            kind,
            message: message.into(),
        }
    }

    pub fn submission_failed(message: impl Into<String>) -> Self {
        Self {
            block_id: None,
            kind: ErrorKind::SubmissionFailed,
            message: message.into(),
        }
    }

    pub fn code(&self) -> &'static str {
        self.kind.code()
    }
}

/// Verdict for a single block.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationOutcome {
    pub valid: bool,
    pub error: Option<ValidationError>,
}

impl ValidationOutcome {
    pub fn ok() -> Self {
        Self {
            valid: true,
            error: None,
        }
    }

    pub fn fail(error: ValidationError) -> Self {
        Self {
            valid: false,
            error: Some(error),
        }
    }

    pub fn is_valid(&self) -> bool {
        self.valid
    }

    pub fn into_result(self) -> Result<(), ValidationError> {
        match self.error {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

/// Result returned from whole-form validation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ValidationReport {
    pub valid: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<ValidationError>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub unknown_fields: Vec<String>,
}

impl ValidationReport {
    pub fn first_error(&self) -> Option<&ValidationError> {
        self.errors.first()
    }
}
