use std::collections::BTreeSet;
use std::sync::LazyLock;

use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use regex::Regex;

use crate::answers::{
    AnswerValue, Answers, ErrorKind, FileRef, ValidationError, ValidationOutcome,
    ValidationReport,
};
use crate::spec::block::{
    Block, BlockKind, BlockType, ChoiceProps, DateProps, FileProps, MultiChoiceProps, PhoneProps,
    RangeProps, TextProps,
};
use crate::spec::form::FormSpec;
use crate::visibility::visible_blocks;

/// Choice value standing for "Other"; free text may follow after a colon.
pub const OTHER_SENTINEL: &str = "__other__";

/// Generic E.164 bounds used when the selected prefix is not declared.
const PHONE_MIN_DIGITS: usize = 6;
const PHONE_MAX_DIGITS: usize = 15;

static EMAIL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]{2,}$").expect("email pattern compiles")
});

static URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(https?://)?([a-z0-9]([a-z0-9-]*[a-z0-9])?\.)+[a-z]{2,}(:\d{1,5})?([/?#]\S*)?$")
        .expect("url pattern compiles")
});

static PHONE_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9 ().\-]+$").expect("phone pattern compiles"));

static CAPTCHA_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_.:\-]{10,}$").expect("captcha pattern compiles"));

/// Lenient checks presence only; strict adds format checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strictness {
    Lenient,
    Strict,
}

/// Whether `answer` counts as an answer for `block` at all.
///
/// An answer of the wrong shape for the block type counts as absent.
pub fn is_answered(block: &Block, answer: Option<&AnswerValue>) -> bool {
    let Some(answer) = answer else {
        return false;
    };
    match (block.block_type(), answer) {
        (
            BlockType::Text
            | BlockType::Textarea
            | BlockType::Email
            | BlockType::Website
            | BlockType::Captcha
            | BlockType::Date,
            AnswerValue::Text(text),
        ) => !text.trim().is_empty(),
        (BlockType::SingleChoice | BlockType::Dropdown, AnswerValue::Choice(choice)) => {
            !choice.trim().is_empty()
        }
        (BlockType::MultipleChoice, AnswerValue::Choices(items)) => !items.is_empty(),
        (BlockType::YesNo | BlockType::Consent, AnswerValue::Bool(_)) => true,
        (BlockType::Number | BlockType::Slider, AnswerValue::Number(number)) => {
            number.is_finite()
        }
        (BlockType::Rating, AnswerValue::Number(number)) => number.is_finite() && *number != 0.0,
        (BlockType::Phone, AnswerValue::Phone(phone)) => !phone.number.trim().is_empty(),
        (BlockType::File, AnswerValue::Files(files)) => !files.is_empty(),
        (BlockType::Address, AnswerValue::Address(address)) => address
            .parts()
            .iter()
            .any(|(_, part)| !part.trim().is_empty()),
        _ => false,
    }
}

/// Validates one block's answer. Pure and deterministic.
pub fn validate_block(
    block: &Block,
    answer: Option<&AnswerValue>,
    strictness: Strictness,
) -> ValidationOutcome {
    if !block.block_type().is_interactive() {
        return ValidationOutcome::ok();
    }

    if !is_answered(block, answer) {
        if block.is_required() {
            return ValidationOutcome::fail(missing(block));
        }
        return ValidationOutcome::ok();
    }

    match (strictness, answer) {
        (Strictness::Strict, Some(answer)) => match check_format(block, answer) {
            Some(error) => ValidationOutcome::fail(error),
            None => ValidationOutcome::ok(),
        },
        _ => ValidationOutcome::ok(),
    }
}

/// Validates every visible non-welcome block and reports all failures.
pub fn validate_answers(
    spec: &FormSpec,
    answers: &Answers,
    strictness: Strictness,
) -> ValidationReport {
    let errors = visible_blocks(spec, answers)
        .into_iter()
        .filter(|block| block.block_type() != BlockType::Welcome)
        .filter_map(|block| validate_block(block, answers.get(&block.id), strictness).error)
        .collect::<Vec<_>>();

    let known: BTreeSet<&str> = spec.blocks.iter().map(|block| block.id.as_str()).collect();
    let unknown_fields = answers
        .keys()
        .filter(|key| !known.contains(key.as_str()))
        .cloned()
        .collect::<Vec<_>>();

    ValidationReport {
        valid: errors.is_empty() && unknown_fields.is_empty(),
        errors,
        unknown_fields,
    }
}

fn missing(block: &Block) -> ValidationError {
    let (kind, message) = match block.block_type() {
        BlockType::Captcha => (
            ErrorKind::CaptchaUnresolved,
            "Please complete the CAPTCHA challenge",
        ),
        BlockType::SingleChoice | BlockType::Dropdown | BlockType::YesNo => {
            (ErrorKind::MissingRequired, "Please select an option")
        }
        BlockType::MultipleChoice => (ErrorKind::MissingRequired, "Please select at least one option"),
        BlockType::Consent => (ErrorKind::MissingRequired, "Please answer to continue"),
        BlockType::File => (ErrorKind::MissingRequired, "Please upload a file"),
        BlockType::Rating => (ErrorKind::MissingRequired, "Please choose a rating"),
        _ => (ErrorKind::MissingRequired, "This field is required"),
    };
    ValidationError::new(&block.id, kind, message)
}

fn bad_format(block: &Block, message: impl Into<String>) -> ValidationError {
    ValidationError::new(&block.id, ErrorKind::BadFormat, message)
}

fn check_format(block: &Block, answer: &AnswerValue) -> Option<ValidationError> {
    match (&block.kind, answer) {
        (BlockKind::Email, AnswerValue::Text(text)) => (!EMAIL.is_match(text.trim()))
            .then(|| bad_format(block, "Please enter a valid email address")),
        (BlockKind::Website, AnswerValue::Text(text)) => (!URL.is_match(text.trim()))
            .then(|| bad_format(block, "Please enter a valid URL")),
        (BlockKind::Text(props) | BlockKind::Textarea(props), AnswerValue::Text(text)) => {
            check_length(block, props, text)
        }
        (BlockKind::Phone(props), AnswerValue::Phone(phone)) => check_phone(block, props, phone),
        (BlockKind::Number(range) | BlockKind::Slider(range), AnswerValue::Number(number)) => {
            check_range(block, range, *number)
        }
        (BlockKind::Rating(props), AnswerValue::Number(number)) => {
            let max = f64::from(props.max);
            (number.fract() != 0.0 || *number < 1.0 || *number > max)
                .then(|| bad_format(block, format!("Rating must be between 1 and {}", props.max)))
        }
        (BlockKind::Date(props), AnswerValue::Text(text)) => check_date(block, props, text),
        (BlockKind::File(props), AnswerValue::Files(files)) => check_files(block, props, files),
        (BlockKind::Captcha(_), AnswerValue::Text(token)) => {
            (!CAPTCHA_TOKEN.is_match(token.trim())).then(|| {
                ValidationError::new(
                    &block.id,
                    ErrorKind::CaptchaUnresolved,
                    "CAPTCHA verification is incomplete",
                )
            })
        }
        (
            BlockKind::SingleChoice(props) | BlockKind::Dropdown(props),
            AnswerValue::Choice(choice),
        ) => (!choice_allowed(props, choice))
            .then(|| bad_format(block, "Please select one of the available options")),
        (BlockKind::MultipleChoice(props), AnswerValue::Choices(items)) => {
            check_selections(block, props, items)
        }
        (BlockKind::Address(_), AnswerValue::Address(address)) => {
            let missing_parts = address
                .parts()
                .iter()
                .filter(|(_, part)| part.trim().is_empty())
                .map(|(name, _)| *name)
                .collect::<Vec<_>>();
            (!missing_parts.is_empty())
                .then(|| bad_format(block, format!("Please fill in {}", missing_parts.join(", "))))
        }
        (BlockKind::YesNo | BlockKind::Consent, AnswerValue::Bool(_)) => None,
        _ => Some(bad_format(block, "Unexpected answer for this field")),
    }
}

fn check_length(block: &Block, props: &TextProps, text: &str) -> Option<ValidationError> {
    let length = text.trim().chars().count();
    if let Some(min) = props.min_length
        && length < min
    {
        return Some(bad_format(block, format!("Please enter at least {} characters", min)));
    }
    if let Some(max) = props.max_length
        && length > max
    {
        return Some(bad_format(block, format!("Please enter at most {} characters", max)));
    }
    None
}

fn check_phone(
    block: &Block,
    props: &PhoneProps,
    phone: &crate::answers::PhoneNumber,
) -> Option<ValidationError> {
    if !PHONE_CHARS.is_match(phone.number.trim()) {
        return Some(bad_format(block, "Phone number may only contain digits"));
    }
    let prefix = phone
        .prefix
        .as_deref()
        .or(props.default_prefix.as_deref())
        .and_then(|code| props.prefix(code));
    let (min, max) = match prefix {
        Some(prefix) => (prefix.digits, prefix.digits),
        None => (PHONE_MIN_DIGITS, PHONE_MAX_DIGITS),
    };
    let digits = phone.digit_count();
    if digits < min {
        return Some(bad_format(block, "Phone number is too short"));
    }
    if digits > max {
        return Some(bad_format(block, "Phone number is too long"));
    }
    None
}

fn check_range(block: &Block, range: &RangeProps, number: f64) -> Option<ValidationError> {
    if let Some(min) = range.min
        && number < min
    {
        return Some(bad_format(block, format!("Value must be at least {}", min)));
    }
    if let Some(max) = range.max
        && number > max
    {
        return Some(bad_format(block, format!("Value must be at most {}", max)));
    }
    if let Some(step) = range.step
        && step > 0.0
    {
        let offset = (number - range.min.unwrap_or(0.0)) / step;
        if (offset - offset.round()).abs() > 1e-9 {
            return Some(bad_format(block, format!("Value must be a multiple of {}", step)));
        }
    }
    None
}

fn check_date(block: &Block, props: &DateProps, text: &str) -> Option<ValidationError> {
    let Ok(date) = text.trim().parse::<jiff::civil::Date>() else {
        return Some(bad_format(block, "Please enter a valid date"));
    };
    let bound = |raw: &Option<String>| {
        raw.as_deref()
            .and_then(|value| value.parse::<jiff::civil::Date>().ok())
    };
    if let Some(min) = bound(&props.min_date)
        && date < min
    {
        return Some(bad_format(block, format!("Date must be on or after {}", min)));
    }
    if let Some(max) = bound(&props.max_date)
        && date > max
    {
        return Some(bad_format(block, format!("Date must be on or before {}", max)));
    }
    None
}

fn check_files(block: &Block, props: &FileProps, files: &[FileRef]) -> Option<ValidationError> {
    if !props.multiple && files.len() > 1 {
        return Some(bad_format(block, "Only one file may be uploaded"));
    }
    if let Some(max_files) = props.max_files
        && files.len() > max_files
    {
        return Some(bad_format(block, format!("Upload at most {} files", max_files)));
    }
    let allowed = allowed_types(&props.allowed_types);
    for file in files {
        if let Some(limit) = props.max_file_size
            && file.size > limit
        {
            return Some(ValidationError::new(
                &block.id,
                ErrorKind::FileTooLarge,
                format!("{} exceeds the maximum size of {} bytes", file.name, limit),
            ));
        }
        if let Some(allowed) = &allowed
            && !file_type_allowed(allowed, file)
        {
            return Some(ValidationError::new(
                &block.id,
                ErrorKind::FileTypeNotAllowed,
                format!("{} is not an allowed file type", file.name),
            ));
        }
    }
    None
}

/// Builds the matcher for `allowedTypes`; `None` means any type is accepted.
fn allowed_types(patterns: &[String]) -> Option<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    let mut added = 0;
    for pattern in patterns {
        let pattern = pattern.trim();
        let normalized = match pattern.strip_prefix('.') {
            Some(extension) => format!("*.{}", extension),
            None => pattern.to_string(),
        };
        match GlobBuilder::new(&normalized).case_insensitive(true).build() {
            Ok(glob) => {
                builder.add(glob);
                added += 1;
            }
            Err(err) => log::warn!("ignoring allowed file type '{}': {}", pattern, err),
        }
    }
    if added == 0 {
        return None;
    }
    builder.build().ok()
}

fn file_type_allowed(allowed: &GlobSet, file: &FileRef) -> bool {
    allowed.is_match(&file.name)
        || file
            .mime_type
            .as_deref()
            .is_some_and(|mime| allowed.is_match(mime))
}

fn is_other(choice: &str) -> bool {
    choice == OTHER_SENTINEL
        || choice
            .strip_prefix(OTHER_SENTINEL)
            .is_some_and(|rest| rest.starts_with(':'))
}

fn choice_allowed(props: &ChoiceProps, choice: &str) -> bool {
    props.options.iter().any(|option| option == choice) || (props.allow_other && is_other(choice))
}

fn check_selections(
    block: &Block,
    props: &MultiChoiceProps,
    items: &[String],
) -> Option<ValidationError> {
    let unknown = items.iter().any(|item| {
        !(props.options.iter().any(|option| option == item) || (props.allow_other && is_other(item)))
    });
    if unknown {
        return Some(bad_format(block, "Please select from the available options"));
    }
    if let Some(min) = props.min_selections
        && items.len() < min
    {
        return Some(bad_format(block, format!("Please select at least {} options", min)));
    }
    if let Some(max) = props.max_selections
        && items.len() > max
    {
        return Some(bad_format(block, format!("Please select at most {} options", max)));
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn other_sentinel_accepts_free_text_suffix() {
        assert!(is_other("__other__"));
        assert!(is_other("__other__:pizza"));
        assert!(!is_other("__other__pizza"));
        assert!(!is_other("other"));
    }

    #[test]
    fn extension_patterns_match_case_insensitively() {
        let allowed = allowed_types(&[".pdf".into(), "image/*".into()]).expect("globs");
        let pdf = FileRef {
            name: "Report.PDF".into(),
            size: 10,
            mime_type: None,
            url: None,
        };
        let png = FileRef {
            name: "photo".into(),
            size: 10,
            mime_type: Some("image/png".into()),
            url: None,
        };
        let zip = FileRef {
            name: "archive.zip".into(),
            size: 10,
            mime_type: Some("application/zip".into()),
            url: None,
        };
        assert!(file_type_allowed(&allowed, &pdf));
        assert!(file_type_allowed(&allowed, &png));
        assert!(!file_type_allowed(&allowed, &zip));
    }

    #[test]
    fn empty_allowed_types_accepts_anything() {
        assert!(allowed_types(&[]).is_none());
    }
}
