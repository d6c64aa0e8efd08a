use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use thiserror::Error;

use form_spec::{
    AnswerValue, Answers, ErrorKind, FormSpec, PageStep, RenderPayload, RuntimeBuilder,
    Strictness, ValidationError, ValidationReport, answers_schema, build_render_payload,
    check_form, render_json_ui as form_render_json_ui, render_text as form_render_text,
    resolve_visibility, validate_answers as form_validate_answers,
};

const DEFAULT_SPEC: &str = include_str!("../../form-spec/tests/fixtures/coffee_survey.json");

#[derive(Debug, Error)]
enum ComponentError {
    #[error("failed to parse config/{0}")]
    ConfigParse(#[source] serde_json::Error),
    #[error("form '{0}' is not available")]
    FormUnavailable(String),
    #[error("json encode error: {0}")]
    JsonEncode(#[source] serde_json::Error),
}

#[derive(Debug, Deserialize, Serialize, Default)]
struct ComponentConfig {
    #[serde(default)]
    form_spec_json: Option<String>,
}

fn load_form_spec(config_json: &str) -> Result<FormSpec, ComponentError> {
    let config = if config_json.trim().is_empty() {
        ComponentConfig::default()
    } else {
        serde_json::from_str(config_json).map_err(ComponentError::ConfigParse)?
    };

    let spec_json = config.form_spec_json.as_deref().unwrap_or(DEFAULT_SPEC);

    serde_json::from_str(spec_json).map_err(ComponentError::ConfigParse)
}

fn ensure_form(form_id: &str, config_json: &str) -> Result<FormSpec, ComponentError> {
    let spec = load_form_spec(config_json)?;
    if spec.id != form_id {
        Err(ComponentError::FormUnavailable(form_id.to_string()))
    } else {
        Ok(spec)
    }
}

fn parse_answers(answers_json: &str) -> Map<String, Value> {
    serde_json::from_str::<Value>(answers_json)
        .ok()
        .and_then(|value| value.as_object().cloned())
        .unwrap_or_default()
}

/// Plain JSON answers converted to typed answers.
struct TypedAnswers {
    answers: Answers,
    /// Ids that are not blocks of the form.
    unknown: Vec<String>,
    /// Known blocks whose JSON value does not fit the block type.
    malformed: Vec<String>,
}

fn typed_answers(spec: &FormSpec, raw: &Map<String, Value>) -> TypedAnswers {
    let mut typed = TypedAnswers {
        answers: Answers::new(),
        unknown: Vec::new(),
        malformed: Vec::new(),
    };
    for (id, value) in raw {
        let Some(block) = spec.block(id) else {
            typed.unknown.push(id.clone());
            continue;
        };
        if value.is_null() {
            continue;
        }
        match AnswerValue::from_json(block.block_type(), value) {
            Some(answer) => {
                typed.answers.insert(id.clone(), answer);
            }
            None => typed.malformed.push(id.clone()),
        }
    }
    typed
}

fn full_report(spec: &FormSpec, typed: &TypedAnswers) -> ValidationReport {
    let mut report = form_validate_answers(spec, &typed.answers, Strictness::Strict);
    report.errors.extend(typed.malformed.iter().map(|id| {
        ValidationError::new(id, ErrorKind::BadFormat, "Unexpected answer for this field")
    }));
    report.unknown_fields.extend(typed.unknown.iter().cloned());
    report.valid = report.errors.is_empty() && report.unknown_fields.is_empty();
    report
}

fn respond(result: Result<Value, ComponentError>) -> String {
    match result {
        Ok(value) => serde_json::to_string(&value).unwrap_or_else(|error| {
            json!({"error": format!("json encode: {}", error)}).to_string()
        }),
        Err(err) => json!({ "error": err.to_string() }).to_string(),
    }
}

fn respond_string(result: Result<String, ComponentError>) -> String {
    match result {
        Ok(value) => value,
        Err(err) => json!({ "error": err.to_string() }).to_string(),
    }
}

pub fn describe(form_id: &str, config_json: &str) -> String {
    respond(
        ensure_form(form_id, config_json)
            .and_then(|spec| serde_json::to_value(spec).map_err(ComponentError::JsonEncode)),
    )
}

/// Lints the configured form document.
pub fn check_spec(config_json: &str) -> String {
    respond(load_form_spec(config_json).and_then(|spec| {
        let issues = check_form(&spec).err().unwrap_or_default();
        Ok(json!({
            "valid": issues.is_empty(),
            "issues": serde_json::to_value(issues).map_err(ComponentError::JsonEncode)?,
        }))
    }))
}

pub fn visible_blocks(form_id: &str, config_json: &str, answers_json: &str) -> String {
    respond(ensure_form(form_id, config_json).map(|spec| {
        let typed = typed_answers(&spec, &parse_answers(answers_json));
        let visibility = resolve_visibility(&spec, &typed.answers);
        let visible = spec
            .blocks
            .iter()
            .filter(|block| visibility.get(&block.id).copied().unwrap_or(true))
            .map(|block| block.id.clone())
            .collect::<Vec<_>>();
        json!({
            "visible": visible,
            "visibility": visibility,
        })
    }))
}

pub fn get_answer_schema(form_id: &str, config_json: &str, answers_json: &str) -> String {
    respond(ensure_form(form_id, config_json).map(|spec| {
        let typed = typed_answers(&spec, &parse_answers(answers_json));
        let visibility = resolve_visibility(&spec, &typed.answers);
        answers_schema(&spec, &visibility)
    }))
}

/// Strict whole-form validation.
pub fn validate_answers(form_id: &str, config_json: &str, answers_json: &str) -> String {
    respond(ensure_form(form_id, config_json).and_then(|spec| {
        let typed = typed_answers(&spec, &parse_answers(answers_json));
        serde_json::to_value(full_report(&spec, &typed)).map_err(ComponentError::JsonEncode)
    }))
}

fn render_payload(
    form_id: &str,
    config_json: &str,
    answers_json: &str,
) -> Result<RenderPayload, ComponentError> {
    let spec = ensure_form(form_id, config_json)?;
    let typed = typed_answers(&spec, &parse_answers(answers_json));
    Ok(build_render_payload(&spec, &typed.answers))
}

pub fn render_text(form_id: &str, config_json: &str, answers_json: &str) -> String {
    respond_string(
        render_payload(form_id, config_json, answers_json)
            .map(|payload| form_render_text(&payload)),
    )
}

pub fn render_json_ui(form_id: &str, config_json: &str, answers_json: &str) -> String {
    respond(
        render_payload(form_id, config_json, answers_json)
            .map(|payload| form_render_json_ui(&payload)),
    )
}

fn submission_progress(payload: &RenderPayload) -> Value {
    json!({
        "answered": payload.progress.answered,
        "total": payload.progress.total,
    })
}

/// Runs the all-in-one submission path and returns the request the host
/// should forward to its endpoint, or every error with the scroll target.
pub fn submit_all(form_id: &str, config_json: &str, answers_json: &str) -> String {
    respond(ensure_form(form_id, config_json).and_then(|spec| {
        let typed = typed_answers(&spec, &parse_answers(answers_json));
        let payload = build_render_payload(&spec, &typed.answers);

        if !typed.malformed.is_empty() || !typed.unknown.is_empty() {
            let report = full_report(&spec, &typed);
            return Ok(json!({
                "status": "error",
                "scroll_to": report.first_error().and_then(|error| error.block_id.clone()),
                "progress": submission_progress(&payload),
                "validation": serde_json::to_value(report).map_err(ComponentError::JsonEncode)?,
            }));
        }

        let mut page = RuntimeBuilder::new(spec)
            .with_server_answers(typed.answers)
            .build_page();
        match page.submit() {
            PageStep::SubmissionRequested(request) => Ok(json!({
                "status": "complete",
                "progress": submission_progress(&payload),
                "request": serde_json::to_value(request).map_err(ComponentError::JsonEncode)?,
            })),
            PageStep::Invalid { scroll_to, errors } => Ok(json!({
                "status": "error",
                "scroll_to": scroll_to,
                "progress": submission_progress(&payload),
                "validation": {
                    "valid": false,
                    "errors": serde_json::to_value(errors).map_err(ComponentError::JsonEncode)?,
                },
            })),
            other => {
                log::warn!("unexpected page outcome {:?}", other);
                Ok(json!({ "status": "error" }))
            }
        }
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const FORM: &str = "coffee-survey";

    #[test]
    fn describe_returns_spec_json() {
        let payload = describe(FORM, "");
        let spec: Value = serde_json::from_str(&payload).expect("valid json");
        assert_eq!(spec["id"], FORM);
        assert_eq!(spec["blocks"][0]["type"], "welcome");
    }

    #[test]
    fn describe_rejects_other_forms() {
        let payload = describe("other", "");
        let parsed: Value = serde_json::from_str(&payload).expect("json");
        assert_eq!(parsed["error"], "form 'other' is not available");
    }

    #[test]
    fn check_spec_reports_issues() {
        let spec = json!({
            "id": "broken",
            "title": "Broken",
            "blocks": [
                { "id": "pick", "type": "dropdown" },
                { "id": "pick", "type": "text" }
            ]
        });
        let config = json!({ "form_spec_json": spec.to_string() });
        let parsed: Value = serde_json::from_str(&check_spec(&config.to_string())).expect("json");
        assert_eq!(parsed["valid"], false);
        assert_eq!(parsed["issues"].as_array().map(Vec::len), Some(2));

        let parsed: Value = serde_json::from_str(&check_spec("")).expect("json");
        assert_eq!(parsed["valid"], true);
    }

    #[test]
    fn visible_blocks_follow_answers() {
        let parsed: Value = serde_json::from_str(&visible_blocks(
            FORM,
            "",
            r#"{"drinks-coffee": "yes"}"#,
        ))
        .expect("json");
        assert_eq!(parsed["visibility"]["favorites"], true);
        assert_eq!(parsed["visibility"]["cups"], true);

        let parsed: Value =
            serde_json::from_str(&visible_blocks(FORM, "", r#"{"drinks-coffee": false}"#))
                .expect("json");
        assert_eq!(parsed["visibility"]["favorites"], false);
        assert_eq!(parsed["visibility"]["cups"], false);
    }

    #[test]
    fn schema_matches_visible_blocks() {
        let schema = get_answer_schema(FORM, "", "{}");
        let value: Value = serde_json::from_str(&schema).expect("json");
        let properties = value["properties"].as_object().expect("properties");
        assert!(properties.contains_key("name"));
        assert!(!properties.contains_key("favorites"));
    }

    #[test]
    fn validate_answers_reports_valid_when_complete() {
        let answers = json!({ "name": "Ada", "drinks-coffee": false, "email": "ada@example.com" });
        let result = validate_answers(FORM, "", &answers.to_string());
        let parsed: Value = serde_json::from_str(&result).expect("json");
        assert!(parsed["valid"].as_bool().unwrap_or(false));
    }

    #[test]
    fn validate_answers_flags_malformed_and_unknown_values() {
        let answers = json!({ "name": "Ada", "drinks-coffee": "maybe", "ghost": 1 });
        let result = validate_answers(FORM, "", &answers.to_string());
        let parsed: Value = serde_json::from_str(&result).expect("json");
        assert_eq!(parsed["valid"], false);
        assert_eq!(parsed["unknown_fields"][0], "ghost");
        let codes = parsed["errors"]
            .as_array()
            .expect("errors")
            .iter()
            .map(|error| error["kind"].as_str().unwrap_or_default().to_string())
            .collect::<Vec<_>>();
        assert!(codes.contains(&"bad_format".to_string()));
    }

    #[test]
    fn render_text_outputs_summary() {
        let output = render_text(FORM, "", "{}");
        assert!(output.contains("Form: Coffee survey"));
        assert!(output.contains("Visible blocks"));
    }

    #[test]
    fn render_json_ui_outputs_json_payload() {
        let payload = render_json_ui(FORM, "", r#"{"name":"Grace"}"#);
        let parsed: Value = serde_json::from_str(&payload).expect("json");
        assert_eq!(parsed["form_id"], FORM);
        assert_eq!(parsed["current_block_id"], "drinks-coffee");
        assert_eq!(parsed["blocks"][3]["label"], "Do you drink coffee, Grace?");
    }

    #[test]
    fn submit_all_returns_request_for_valid_answers() {
        let response = submit_all(
            FORM,
            "",
            r#"{"name":"Ada","drinks-coffee":true,"favorites":["Latte"],"cups":2}"#,
        );
        let parsed: Value = serde_json::from_str(&response).expect("json");
        assert_eq!(parsed["status"], "complete");
        assert_eq!(parsed["request"]["formId"], FORM);
        assert_eq!(parsed["request"]["answers"]["favorites"][0], "Latte");
        assert_eq!(parsed["request"]["answers"]["cups"], 2.0);
    }

    #[test]
    fn submit_all_scrolls_to_first_error() {
        let response = submit_all(FORM, "", r#"{"drinks-coffee":true,"email":"nope"}"#);
        let parsed: Value = serde_json::from_str(&response).expect("json");
        assert_eq!(parsed["status"], "error");
        assert_eq!(parsed["scroll_to"], "name");
        let errors = parsed["validation"]["errors"].as_array().expect("errors");
        let ids = errors
            .iter()
            .map(|error| error["block_id"].as_str().unwrap_or_default())
            .collect::<Vec<_>>();
        assert_eq!(ids, vec!["name", "favorites", "email"]);
    }
}
