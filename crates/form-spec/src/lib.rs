#![allow(missing_docs)]

pub mod answers;
pub mod answers_schema;
pub mod captcha;
pub mod clock;
pub mod error;
pub mod navigation;
pub mod page;
pub mod render;
pub mod runtime;
pub mod schedule;
pub mod session;
pub mod spec;
pub mod store;
pub mod submission;
pub mod template;
pub mod validate;
pub mod visibility;

pub use answers::{
    Address, AnswerSet, AnswerValue, Answers, ErrorKind, FileRef, Meta, PhoneNumber,
    ValidationError, ValidationOutcome, ValidationReport, answers_to_json,
};
pub use answers_schema::generate as answers_schema;
pub use captcha::{CaptchaHandle, CaptchaSource, CaptchaState, NoCaptcha};
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{FormError, Result};
pub use navigation::{Phase, Shortcut, Step, StepNavigator, visible_sequence};
pub use page::{PageController, PageStep};
pub use render::{
    RenderBlock, RenderPayload, RenderProgress, RenderStatus, build_page_payload,
    build_render_payload, build_step_payload, render_json_ui, render_text,
};
pub use runtime::{RuntimeBuilder, seed_defaults};
pub use schedule::{ScheduledTask, Scheduler, TaskKind};
pub use session::Session;
pub use spec::{
    Block, BlockKind, BlockType, Condition, ConditionOperator, FormSpec, LogicOperator,
    NavigationPolicy, Operand, PresentationMode, RuleAction, SpecIssue, Visibility,
    VisibilityRule, check_form,
};
pub use store::{AnswerStore, DirectoryRecovery, MemoryRecovery, RecoveryStore};
pub use submission::{
    RecordingEndpoint, SessionStatus, SubmissionEndpoint, SubmissionRequest, SubmissionResponse,
    SubmissionState,
};
pub use template::TemplateEngine;
pub use validate::{OTHER_SENTINEL, Strictness, is_answered, validate_answers, validate_block};
pub use visibility::{
    VisibilityMap, is_visible, resolve_visibility, visible_answers, visible_blocks,
};

/// JSON Schema of the form document format.
pub fn form_spec_schema() -> serde_json::Value {
    serde_json::to_value(schemars::schema_for!(FormSpec)).unwrap_or_default()
}

/// Parses a form document from JSON.
pub fn parse_form(json: &str) -> Result<FormSpec> {
    Ok(serde_json::from_str(json)?)
}
