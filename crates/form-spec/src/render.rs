use serde_json::{Map, Value, json};

use crate::{
    answers::{Answers, ValidationError},
    answers_schema,
    navigation::StepNavigator,
    page::PageController,
    spec::{
        block::{Block, BlockType},
        form::{FormSpec, PresentationMode},
    },
    submission::SessionStatus,
    template::TemplateEngine,
    validate::is_answered,
    visibility::resolve_visibility,
};

/// Status labels returned by the renderers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderStatus {
    /// More input is required.
    NeedInput,
    /// Every visible required block is answered.
    Complete,
    Submitted,
    /// The last submission attempt failed.
    Error,
}

impl RenderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RenderStatus::NeedInput => "need_input",
            RenderStatus::Complete => "complete",
            RenderStatus::Submitted => "submitted",
            RenderStatus::Error => "error",
        }
    }
}

/// Progress counters exposed to renderers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderProgress {
    pub answered: usize,
    pub total: usize,
}

/// A single block as presented to a renderer, with answers piped into the
/// label and help text.
#[derive(Debug, Clone)]
pub struct RenderBlock {
    pub id: String,
    pub kind: BlockType,
    pub label: String,
    pub help_text: Option<String>,
    pub placeholder: Option<String>,
    pub required: bool,
    pub visible: bool,
    pub current_value: Option<Value>,
    pub options: Option<Vec<String>>,
    pub error: Option<ValidationError>,
}

/// Collected payload used by both text and JSON renderers.
#[derive(Debug, Clone)]
pub struct RenderPayload {
    pub form_id: String,
    pub form_title: String,
    pub form_version: String,
    pub mode: PresentationMode,
    pub status: RenderStatus,
    /// Block the respondent is on (one-by-one) or the first unanswered block.
    pub current_block_id: Option<String>,
    pub scroll_target: Option<String>,
    pub submission_error: Option<ValidationError>,
    pub progress: RenderProgress,
    pub help: Option<String>,
    pub blocks: Vec<RenderBlock>,
    pub schema: Value,
}

/// Build the renderer payload from a form and a set of answers.
pub fn build_render_payload(spec: &FormSpec, answers: &Answers) -> RenderPayload {
    let visibility = resolve_visibility(spec, answers);
    let engine = TemplateEngine::new();

    let is_shown = |block: &Block| visibility.get(&block.id).copied().unwrap_or(true);
    let interactive = spec
        .blocks
        .iter()
        .filter(|block| is_shown(block) && block.block_type().is_interactive())
        .collect::<Vec<_>>();
    let answered = interactive
        .iter()
        .filter(|block| is_answered(block, answers.get(&block.id)))
        .count();
    let current_block_id = interactive
        .iter()
        .find(|block| block.is_required() && !is_answered(block, answers.get(&block.id)))
        .map(|block| block.id.clone());

    let blocks = spec
        .blocks
        .iter()
        .map(|block| RenderBlock {
            id: block.id.clone(),
            kind: block.block_type(),
            label: engine.render_or_raw(block.display_label(), answers),
            help_text: block
                .help_text
                .as_deref()
                .map(|help| engine.render_or_raw(help, answers)),
            placeholder: block.placeholder.clone(),
            required: block.is_required(),
            visible: is_shown(block),
            current_value: answers.get(&block.id).map(|answer| answer.to_json()),
            options: (!block.kind.options().is_empty()).then(|| block.kind.options().to_vec()),
            error: None,
        })
        .collect::<Vec<_>>();

    let status = if current_block_id.is_some() {
        RenderStatus::NeedInput
    } else {
        RenderStatus::Complete
    };

    RenderPayload {
        form_id: spec.id.clone(),
        form_title: spec.title.clone(),
        form_version: spec.version.clone(),
        mode: spec.mode(),
        status,
        current_block_id,
        scroll_target: None,
        submission_error: None,
        progress: RenderProgress {
            answered,
            total: interactive.len(),
        },
        help: spec.help().map(|help| engine.render_or_raw(help, answers)),
        blocks,
        schema: answers_schema::generate(spec, &visibility),
    }
}

fn apply_status(payload: &mut RenderPayload, status: SessionStatus) {
    match status {
        SessionStatus::Submitted => payload.status = RenderStatus::Submitted,
        SessionStatus::Error => payload.status = RenderStatus::Error,
        SessionStatus::InProgress => {}
    }
}

/// Payload for the step-by-step presentation; `current_block_id` follows the
/// navigator.
pub fn build_step_payload(navigator: &StepNavigator) -> RenderPayload {
    let mut payload = build_render_payload(navigator.spec(), navigator.answers());
    payload.mode = PresentationMode::OneByOne;
    payload.current_block_id = navigator.current_block().map(|block| block.id.clone());
    payload.submission_error = navigator.submission_error().cloned();
    if let Some(error) = navigator.submission_error()
        && let Some(block_id) = error.block_id.as_deref()
        && let Some(block) = payload.blocks.iter_mut().find(|block| block.id == block_id)
    {
        block.error = Some(error.clone());
    }
    apply_status(&mut payload, navigator.status());
    payload
}

/// Payload for the all-in-one presentation with per-block errors attached.
pub fn build_page_payload(page: &PageController) -> RenderPayload {
    let mut payload = build_render_payload(page.spec(), page.answers());
    payload.mode = PresentationMode::AllInOne;
    for block in payload.blocks.iter_mut() {
        block.error = page.error_for(&block.id).cloned();
    }
    payload.scroll_target = page.scroll_target().map(str::to_string);
    payload.submission_error = page.submission_error().cloned();
    apply_status(&mut payload, page.status());
    payload
}

fn error_value(error: &ValidationError) -> Value {
    json!({
        "code": error.code(),
        "message": error.message,
    })
}

/// Render the payload as a structured JSON-friendly value.
pub fn render_json_ui(payload: &RenderPayload) -> Value {
    let blocks = payload
        .blocks
        .iter()
        .map(|block| {
            let mut map = Map::new();
            map.insert("id".into(), Value::String(block.id.clone()));
            map.insert("type".into(), Value::String(block.kind.as_str().to_string()));
            map.insert("label".into(), Value::String(block.label.clone()));
            if let Some(help) = &block.help_text {
                map.insert("help_text".into(), Value::String(help.clone()));
            }
            if let Some(placeholder) = &block.placeholder {
                map.insert("placeholder".into(), Value::String(placeholder.clone()));
            }
            map.insert("required".into(), Value::Bool(block.required));
            map.insert("visible".into(), Value::Bool(block.visible));
            if let Some(current_value) = &block.current_value {
                map.insert("current_value".into(), current_value.clone());
            }
            if let Some(options) = &block.options {
                map.insert("options".into(), json!(options));
            }
            if let Some(error) = &block.error {
                map.insert("error".into(), error_value(error));
            }
            Value::Object(map)
        })
        .collect::<Vec<_>>();

    json!({
        "form_id": payload.form_id,
        "form_title": payload.form_title,
        "form_version": payload.form_version,
        "mode": match payload.mode {
            PresentationMode::OneByOne => "one-by-one",
            PresentationMode::AllInOne => "all-in-one",
        },
        "status": payload.status.as_str(),
        "current_block_id": payload.current_block_id,
        "scroll_target": payload.scroll_target,
        "submission_error": payload.submission_error.as_ref().map(error_value),
        "progress": {
            "answered": payload.progress.answered,
            "total": payload.progress.total,
        },
        "help": payload.help,
        "blocks": blocks,
        "schema": payload.schema,
    })
}

/// Render the payload as human-friendly text.
pub fn render_text(payload: &RenderPayload) -> String {
    let mut lines = Vec::new();
    lines.push(format!("Form: {} ({})", payload.form_title, payload.form_id));
    lines.push(format!(
        "Status: {} ({}/{})",
        payload.status.as_str(),
        payload.progress.answered,
        payload.progress.total
    ));
    if let Some(help) = &payload.help {
        lines.push(format!("Help: {}", help));
    }
    if let Some(error) = &payload.submission_error {
        lines.push(format!("Error: {}", error.message));
    }

    if let Some(current) = &payload.current_block_id {
        lines.push(format!("Current block: {}", current));
        if let Some(block) = payload.blocks.iter().find(|block| &block.id == current) {
            lines.push(format!("  Label: {}", block.label));
            if let Some(help) = &block.help_text {
                lines.push(format!("  Help: {}", help));
            }
            if block.required {
                lines.push("  Required: yes".to_string());
            }
            if let Some(options) = &block.options {
                for (index, option) in options.iter().enumerate() {
                    lines.push(format!("  {}. {}", index + 1, option));
                }
            }
        }
    } else if payload.status != RenderStatus::Submitted {
        lines.push("All required blocks are answered.".to_string());
    }

    lines.push("Visible blocks:".to_string());
    for block in payload.blocks.iter().filter(|block| block.visible) {
        let mut entry = format!(" - {} [{}] {}", block.id, block.kind.as_str(), block.label);
        if block.required {
            entry.push_str(" [required]");
        }
        if let Some(current_value) = &block.current_value {
            entry.push_str(&format!(" = {}", value_to_display(current_value)));
        }
        if let Some(error) = &block.error {
            entry.push_str(&format!(" ! {}", error.message));
        }
        lines.push(entry);
    }

    lines.join("\n")
}

pub(crate) fn value_to_display(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Bool(flag) => flag.to_string(),
        Value::Number(num) => num.to_string(),
        Value::Array(items) => items
            .iter()
            .map(value_to_display)
            .collect::<Vec<_>>()
            .join(", "),
        other => other.to_string(),
    }
}
