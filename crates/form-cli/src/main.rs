mod wizard;

use std::{
    fs,
    io::{self, Write},
    path::{Path, PathBuf},
    thread,
    time::Duration,
};

use clap::{Parser, Subcommand, ValueEnum};
use component_form::{
    check_spec, get_answer_schema, render_json_ui as component_render_json_ui,
    render_text as component_render_text, validate_answers,
};
use form_spec::{
    AnswerValue, Answers, Block, BlockKind, BlockType, CaptchaHandle, DirectoryRecovery, FormSpec,
    OTHER_SENTINEL, Phase, PhoneNumber, RuntimeBuilder, Session, Shortcut, Step,
    SubmissionEndpoint, SubmissionRequest, SubmissionResponse, build_step_payload, check_form,
    form_spec_schema, parse_form, render_json_ui,
};
use log::{debug, info, warn};
use serde_json::{Value, json};
use wizard::{AnswerParseError, PromptContext, Verbosity, WizardPresenter};

type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

#[derive(Parser)]
#[command(
    author,
    version,
    about = "Terminal runner for block-based forms",
    long_about = "Walks a form one block at a time and offers validation, lint, render and schema helpers backed by the form component"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum RenderMode {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Command {
    /// Answer a form one block at a time in the terminal.
    Wizard {
        /// Path to the form JSON.
        #[arg(long, value_name = "SPEC")]
        spec: PathBuf,
        /// Optional JSON file with answers to start from.
        #[arg(long, value_name = "ANSWERS")]
        answers: Option<PathBuf>,
        /// Show verbose output (status, visible blocks, error codes).
        #[arg(long, alias = "debug")]
        verbose: bool,
        /// Also print the submitted answers as JSON.
        #[arg(long)]
        answers_json: bool,
        /// Render output mode for each step.
        #[arg(long, value_enum, default_value_t = RenderMode::Text)]
        format: RenderMode,
        /// Token reported by the CAPTCHA widget.
        #[arg(long, value_name = "TOKEN")]
        captcha_token: Option<String>,
        /// Directory used to recover unfinished answers between runs.
        #[arg(long, value_name = "DIR")]
        recovery_dir: Option<PathBuf>,
        /// Write the submission request to this file instead of keeping it in memory.
        #[arg(long, value_name = "FILE")]
        out: Option<PathBuf>,
    },
    /// Validate answers against a form.
    Validate {
        /// Path to the form JSON.
        #[arg(long, value_name = "SPEC")]
        spec: PathBuf,
        /// Path to the answers JSON file.
        #[arg(long, value_name = "ANSWERS")]
        answers: PathBuf,
    },
    /// Report structural problems in a form document.
    Check {
        /// Path to the form JSON.
        #[arg(long, value_name = "SPEC")]
        spec: PathBuf,
    },
    /// Render the form for a set of answers.
    Render {
        /// Path to the form JSON.
        #[arg(long, value_name = "SPEC")]
        spec: PathBuf,
        /// Optional JSON file with answers.
        #[arg(long, value_name = "ANSWERS")]
        answers: Option<PathBuf>,
        #[arg(long, value_enum, default_value_t = RenderMode::Text)]
        format: RenderMode,
    },
    /// Print the form document schema, or the answers schema of a form.
    Schema {
        /// Form whose answers schema should be printed.
        #[arg(long, value_name = "SPEC")]
        spec: Option<PathBuf>,
        /// Answers deciding which blocks are visible.
        #[arg(long, value_name = "ANSWERS", requires = "spec")]
        answers: Option<PathBuf>,
    },
}

fn main() -> CliResult<()> {
    env_logger::init();
    let cli = Cli::parse();
    match cli.command {
        Command::Wizard {
            spec,
            answers,
            verbose,
            answers_json,
            format,
            captcha_token,
            recovery_dir,
            out,
        } => run_wizard(WizardOptions {
            spec_path: spec,
            answers_path: answers,
            verbosity: Verbosity::from_verbose(verbose),
            answers_json,
            format,
            captcha_token,
            recovery_dir,
            out,
        }),
        Command::Validate { spec, answers } => run_validate(spec, answers),
        Command::Check { spec } => run_check(spec),
        Command::Render {
            spec,
            answers,
            format,
        } => run_render(spec, answers, format),
        Command::Schema { spec, answers } => run_schema(spec, answers),
    }
}

struct WizardOptions {
    spec_path: PathBuf,
    answers_path: Option<PathBuf>,
    verbosity: Verbosity,
    answers_json: bool,
    format: RenderMode,
    captcha_token: Option<String>,
    recovery_dir: Option<PathBuf>,
    out: Option<PathBuf>,
}

/// Stores the submission request in a file, or keeps it in memory.
struct OutputEndpoint {
    path: Option<PathBuf>,
    last: Option<SubmissionRequest>,
}

impl OutputEndpoint {
    fn new(path: Option<PathBuf>) -> Self {
        Self { path, last: None }
    }
}

impl SubmissionEndpoint for OutputEndpoint {
    fn submit(&mut self, request: &SubmissionRequest) -> SubmissionResponse {
        if let Some(path) = &self.path {
            let written = serde_json::to_string_pretty(request)
                .map_err(|err| err.to_string())
                .and_then(|body| fs::write(path, body).map_err(|err| err.to_string()));
            if let Err(err) = written {
                warn!("failed to write submission to {}: {}", path.display(), err);
                return SubmissionResponse::rejected(format!(
                    "Could not write {}: {}",
                    path.display(),
                    err
                ));
            }
            info!("submission written to {}", path.display());
        }
        self.last = Some(request.clone());
        SubmissionResponse::accepted()
    }
}

fn run_wizard(options: WizardOptions) -> CliResult<()> {
    let spec = parse_form(&fs::read_to_string(&options.spec_path)?)?;
    if let Err(issues) = check_form(&spec) {
        for issue in issues {
            warn!(
                "form issue{}: {}",
                issue
                    .block_id
                    .map(|id| format!(" on '{}'", id))
                    .unwrap_or_default(),
                issue.message
            );
        }
    }

    let mut builder = match &options.answers_path {
        Some(path) => {
            let raw: Value = serde_json::from_str(&fs::read_to_string(path)?)?;
            let answers = typed_answers(&spec, &raw)?;
            RuntimeBuilder::new(spec).with_server_answers(answers)
        }
        None => RuntimeBuilder::new(spec),
    };
    if let Some(token) = options.captcha_token {
        let captcha = CaptchaHandle::new();
        captcha.resolve(token);
        builder = builder.with_captcha(captcha);
    }
    if let Some(dir) = options.recovery_dir {
        fs::create_dir_all(&dir)?;
        builder = builder.with_recovery(DirectoryRecovery::new(dir));
    }

    let mut session = builder.build_session(OutputEndpoint::new(options.out));
    let mut presenter = WizardPresenter::new(options.verbosity, options.answers_json);

    loop {
        settle(&mut session, &presenter);
        let navigator = session.navigator();
        if navigator.phase() == Phase::Submitted {
            presenter.show_completion(session.endpoint().last.as_ref());
            break;
        }

        let payload = build_step_payload(navigator);
        print_render_output(options.format, &payload)?;
        presenter.show_header(&payload);
        presenter.show_status(&payload);

        let Some(block) = navigator.current_block().cloned() else {
            return Err("the form has no visible blocks".into());
        };
        let render_block = payload
            .blocks
            .iter()
            .find(|candidate| candidate.id == block.id)
            .ok_or_else(|| format!("render payload is missing block '{}'", block.id))?;
        let prompt = PromptContext::new(
            render_block,
            navigator.current_index() + 1,
            navigator.sequence().len(),
        );

        let step = match read_input(&prompt, &block, &presenter)? {
            WizardInput::Next => session.advance(),
            WizardInput::Back => session.retreat(),
            WizardInput::Submit => session.submit(),
            WizardInput::Select(number) => {
                let step = session.shortcut(Shortcut::SelectOption(number));
                if step == Step::Idle {
                    presenter.show_parse_error(&AnswerParseError::new(
                        format!("There is no option {}.", number),
                        None,
                    ));
                }
                step
            }
            WizardInput::Answer(value) => session.advance_with(value),
        };
        report_step(&presenter, &step);
    }

    Ok(())
}

/// Waits for pending timers (choice confirmation, paragraph auto-advance)
/// and applies them before the next prompt.
fn settle<E: SubmissionEndpoint>(session: &mut Session<E>, presenter: &WizardPresenter) {
    while let Some(wait) = session.navigator().next_due_in() {
        if wait > 0 {
            thread::sleep(Duration::from_millis(wait));
        }
        for step in session.tick() {
            report_step(presenter, &step);
        }
    }
}

fn report_step(presenter: &WizardPresenter, step: &Step) {
    match step {
        Step::Blocked(error) => presenter.show_block_error(error),
        Step::Busy => println!("A submission is already in progress."),
        other => debug!("wizard step {:?}", other),
    }
}

fn print_render_output(mode: RenderMode, payload: &form_spec::RenderPayload) -> CliResult<()> {
    match mode {
        RenderMode::Text => Ok(()),
        RenderMode::Json => {
            println!(
                "JSON UI:\n{}",
                serde_json::to_string_pretty(&render_json_ui(payload))?
            );
            Ok(())
        }
    }
}

/// What the respondent typed at a prompt.
#[derive(Debug, PartialEq)]
enum WizardInput {
    Next,
    Back,
    Submit,
    /// 1-based option number.
    Select(usize),
    Answer(AnswerValue),
}

fn read_input(
    prompt: &PromptContext,
    block: &Block,
    presenter: &WizardPresenter,
) -> CliResult<WizardInput> {
    loop {
        presenter.show_prompt(prompt);
        print!("> ");
        io::stdout().flush()?;
        let mut input = String::new();
        if io::stdin().read_line(&mut input)? == 0 {
            return Err("input closed before the form was submitted".into());
        }

        let trimmed = input.trim();
        if trimmed.eq_ignore_ascii_case("exit") {
            return Err("wizard aborted by user".into());
        }

        match parse_input(block, trimmed) {
            Ok(value) => return Ok(value),
            Err(err) => presenter.show_parse_error(&err),
        }
    }
}

fn parse_input(block: &Block, raw: &str) -> Result<WizardInput, AnswerParseError> {
    match raw {
        "" | ":next" => return Ok(WizardInput::Next),
        ":back" => return Ok(WizardInput::Back),
        ":submit" => return Ok(WizardInput::Submit),
        _ => {}
    }
    if takes_option_numbers(block.block_type())
        && let Ok(number) = raw.parse::<usize>()
    {
        return Ok(WizardInput::Select(number));
    }
    parse_answer(block, raw).map(WizardInput::Answer)
}

fn takes_option_numbers(kind: BlockType) -> bool {
    matches!(
        kind,
        BlockType::SingleChoice
            | BlockType::Dropdown
            | BlockType::MultipleChoice
            | BlockType::YesNo
            | BlockType::Consent
            | BlockType::Rating
    )
}

fn parse_answer(block: &Block, raw: &str) -> Result<AnswerValue, AnswerParseError> {
    match &block.kind {
        BlockKind::SingleChoice(props) | BlockKind::Dropdown(props) => {
            choose(&props.options, props.allow_other, raw).map(AnswerValue::Choice)
        }
        BlockKind::MultipleChoice(props) => raw
            .split(',')
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .map(|part| choose(&props.options, props.allow_other, part))
            .collect::<Result<Vec<_>, _>>()
            .map(AnswerValue::Choices),
        BlockKind::Phone(_) => Ok(AnswerValue::Phone(parse_phone(raw))),
        BlockKind::File(_) | BlockKind::Address(_) => {
            let value: Value = serde_json::from_str(raw).map_err(|err| {
                AnswerParseError::new("Please enter a JSON value.", Some(err.to_string()))
            })?;
            AnswerValue::from_json(block.block_type(), &value).ok_or_else(|| {
                AnswerParseError::new(
                    "That JSON does not fit this block.",
                    Some(format!("expected a {} answer", block.block_type().as_str())),
                )
            })
        }
        _ => {
            let kind = block.block_type();
            if !kind.is_interactive() {
                return Err(AnswerParseError::new(
                    "This block does not take an answer; press enter to continue.",
                    None,
                ));
            }
            AnswerValue::from_json(kind, &Value::String(raw.to_string()))
                .ok_or_else(|| shape_error(kind))
        }
    }
}

fn choose(options: &[String], allow_other: bool, raw: &str) -> Result<String, AnswerParseError> {
    if let Some(option) = options
        .iter()
        .find(|option| option.eq_ignore_ascii_case(raw))
    {
        Ok(option.clone())
    } else if allow_other {
        Ok(format!("{}:{}", OTHER_SENTINEL, raw))
    } else {
        Err(AnswerParseError::new(
            format!("Choose one of: {}.", options.join(", ")),
            Some(format!("allowed values: {}", options.join(", "))),
        ))
    }
}

fn parse_phone(raw: &str) -> PhoneNumber {
    match raw.split_once(char::is_whitespace) {
        Some((prefix, number)) if prefix.starts_with('+') => PhoneNumber {
            prefix: Some(prefix.to_string()),
            number: number.trim().to_string(),
        },
        _ => PhoneNumber {
            prefix: None,
            number: raw.to_string(),
        },
    }
}

fn shape_error(kind: BlockType) -> AnswerParseError {
    match kind {
        BlockType::Number | BlockType::Slider | BlockType::Rating => {
            AnswerParseError::new("Please enter a number.", Some("expected number".to_string()))
        }
        BlockType::YesNo | BlockType::Consent => AnswerParseError::new(
            "Please enter yes or no.",
            Some("expected boolean (y/n/yes/no)".to_string()),
        ),
        other => AnswerParseError::new(
            "Unexpected answer for this block.",
            Some(format!("expected a {} answer", other.as_str())),
        ),
    }
}

/// Converts plain JSON answers into typed answers for the runtime.
fn typed_answers(spec: &FormSpec, raw: &Value) -> CliResult<Answers> {
    let object = raw.as_object().ok_or("answers must be a JSON object")?;
    let mut answers = Answers::new();
    for (id, value) in object {
        let Some(block) = spec.block(id) else {
            warn!("ignoring answer for unknown block '{}'", id);
            continue;
        };
        match AnswerValue::from_json(block.block_type(), value) {
            Some(answer) => {
                answers.insert(id.clone(), answer);
            }
            None if value.is_null() => {}
            None => warn!("ignoring malformed answer for '{}'", id),
        }
    }
    Ok(answers)
}

/// Reads the form file and returns its id together with a component config.
fn component_config(spec_path: &Path) -> CliResult<(String, String)> {
    let spec_json = fs::read_to_string(spec_path)?;
    let spec = parse_form(&spec_json)?;
    let config_json = json!({ "form_spec_json": spec_json }).to_string();
    Ok((spec.id, config_json))
}

fn read_answers(path: Option<PathBuf>) -> CliResult<String> {
    match path {
        Some(path) => Ok(fs::read_to_string(path)?),
        None => Ok("{}".to_string()),
    }
}

fn parse_component_result(response: &str) -> CliResult<Value> {
    let value: Value = serde_json::from_str(response)?;
    if let Some(error) = value.get("error").and_then(Value::as_str) {
        Err(error.into())
    } else {
        Ok(value)
    }
}

fn run_validate(spec_path: PathBuf, answers_path: PathBuf) -> CliResult<()> {
    let (form_id, config_json) = component_config(&spec_path)?;
    let answers_json = fs::read_to_string(answers_path)?;
    serde_json::from_str::<Value>(&answers_json)?;

    let result = parse_component_result(&validate_answers(&form_id, &config_json, &answers_json))?;
    let valid = result.get("valid").and_then(Value::as_bool).unwrap_or(false);
    println!(
        "Validation result: {}",
        if valid { "valid" } else { "invalid" }
    );
    describe_validation(&result);

    if valid {
        Ok(())
    } else {
        Err("validation failed".into())
    }
}

fn describe_validation(result: &Value) {
    if let Some(errors) = result.get("errors").and_then(Value::as_array)
        && !errors.is_empty()
    {
        println!("Errors:");
        for error in errors {
            println!(
                "  {} - {} ({})",
                error
                    .get("block_id")
                    .and_then(Value::as_str)
                    .unwrap_or("<form>"),
                error.get("message").and_then(Value::as_str).unwrap_or(""),
                error.get("kind").and_then(Value::as_str).unwrap_or("error"),
            );
        }
    }
    if let Some(unknown) = result.get("unknown_fields").and_then(Value::as_array)
        && !unknown.is_empty()
    {
        let ids = unknown
            .iter()
            .filter_map(Value::as_str)
            .collect::<Vec<_>>();
        println!("Unknown answer fields: {}", ids.join(", "));
    }
}

fn run_check(spec_path: PathBuf) -> CliResult<()> {
    let (_, config_json) = component_config(&spec_path)?;
    let result = parse_component_result(&check_spec(&config_json))?;
    let issues = result
        .get("issues")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();
    if issues.is_empty() {
        println!("Form check: ok");
        return Ok(());
    }
    println!("Form check: {} issue(s)", issues.len());
    for issue in &issues {
        let message = issue.get("message").and_then(Value::as_str).unwrap_or("");
        match issue.get("block_id").and_then(Value::as_str) {
            Some(block_id) => println!("  {} - {}", block_id, message),
            None => println!("  {}", message),
        }
    }
    Err("form check failed".into())
}

fn run_render(spec_path: PathBuf, answers: Option<PathBuf>, format: RenderMode) -> CliResult<()> {
    let (form_id, config_json) = component_config(&spec_path)?;
    let answers_json = read_answers(answers)?;
    match format {
        RenderMode::Text => {
            let text = component_render_text(&form_id, &config_json, &answers_json);
            if text.starts_with('{') {
                parse_component_result(&text)?;
            }
            println!("{}", text);
        }
        RenderMode::Json => {
            let ui = parse_component_result(&component_render_json_ui(
                &form_id,
                &config_json,
                &answers_json,
            ))?;
            println!("{}", serde_json::to_string_pretty(&ui)?);
        }
    }
    Ok(())
}

fn run_schema(spec_path: Option<PathBuf>, answers: Option<PathBuf>) -> CliResult<()> {
    let schema = match spec_path {
        None => form_spec_schema(),
        Some(path) => {
            let (form_id, config_json) = component_config(&path)?;
            let answers_json = read_answers(answers)?;
            parse_component_result(&get_answer_schema(&form_id, &config_json, &answers_json))?
        }
    };
    println!("{}", serde_json::to_string_pretty(&schema)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use form_spec::spec::{ChoiceProps, MultiChoiceProps, RangeProps, RatingProps};

    fn single(allow_other: bool) -> Block {
        Block::new(
            "size",
            BlockKind::SingleChoice(ChoiceProps {
                options: vec!["Small".into(), "Large".into()],
                allow_other,
            }),
        )
    }

    #[test]
    fn navigation_commands_are_recognised() {
        let block = single(false);
        assert_eq!(parse_input(&block, "").unwrap(), WizardInput::Next);
        assert_eq!(parse_input(&block, ":next").unwrap(), WizardInput::Next);
        assert_eq!(parse_input(&block, ":back").unwrap(), WizardInput::Back);
        assert_eq!(parse_input(&block, ":submit").unwrap(), WizardInput::Submit);
    }

    #[test]
    fn digits_select_options_on_choice_blocks() {
        assert_eq!(
            parse_input(&single(false), "2").unwrap(),
            WizardInput::Select(2)
        );
        let rating = Block::new("stars", BlockKind::Rating(RatingProps { max: 5 }));
        assert_eq!(parse_input(&rating, "4").unwrap(), WizardInput::Select(4));

        let number = Block::new("cups", BlockKind::Number(RangeProps::default()));
        assert_eq!(
            parse_input(&number, "2").unwrap(),
            WizardInput::Answer(AnswerValue::Number(2.0))
        );
    }

    #[test]
    fn option_text_matches_case_insensitively() {
        assert_eq!(
            parse_answer(&single(false), "large").unwrap(),
            AnswerValue::Choice("Large".into())
        );
        let error = parse_answer(&single(false), "medium").unwrap_err();
        assert_eq!(error.user_message, "Choose one of: Small, Large.");
        assert_eq!(
            parse_answer(&single(true), "Medium").unwrap(),
            AnswerValue::Choice("__other__:Medium".into())
        );
    }

    #[test]
    fn multiple_choice_accepts_comma_lists() {
        let block = Block::new(
            "extras",
            BlockKind::MultipleChoice(MultiChoiceProps {
                options: vec!["cheese".into(), "olives".into()],
                ..Default::default()
            }),
        );
        assert_eq!(
            parse_answer(&block, "Cheese, olives").unwrap(),
            AnswerValue::Choices(vec!["cheese".into(), "olives".into()])
        );
    }

    #[test]
    fn yes_no_and_numbers_report_shape_errors() {
        let yes_no = Block::new("coffee", BlockKind::YesNo);
        assert_eq!(
            parse_answer(&yes_no, "yes").unwrap(),
            AnswerValue::Bool(true)
        );
        assert_eq!(
            parse_answer(&yes_no, "maybe").unwrap_err().user_message,
            "Please enter yes or no."
        );
        let number = Block::new("cups", BlockKind::Number(RangeProps::default()));
        assert_eq!(
            parse_answer(&number, "lots").unwrap_err().user_message,
            "Please enter a number."
        );
    }

    #[test]
    fn phone_input_splits_the_prefix() {
        assert_eq!(
            parse_phone("+33 6 12 34 56 78"),
            PhoneNumber {
                prefix: Some("+33".into()),
                number: "6 12 34 56 78".into(),
            }
        );
        assert_eq!(parse_phone("0612345678").prefix, None);
    }

    #[test]
    fn non_interactive_blocks_only_continue() {
        let heading = Block::new("intro", BlockKind::Heading);
        assert_eq!(parse_input(&heading, "").unwrap(), WizardInput::Next);
        assert!(parse_input(&heading, "hello").is_err());
    }

    #[test]
    fn typed_answers_skip_unknown_and_malformed_values() {
        let spec = FormSpec::new(
            "f",
            "F",
            vec![
                Block::new("cups", BlockKind::Number(RangeProps::default())),
                Block::new("coffee", BlockKind::YesNo),
            ],
        );
        let answers = typed_answers(
            &spec,
            &json!({ "cups": 2, "coffee": "sometimes", "ghost": true }),
        )
        .unwrap();
        assert_eq!(answers.len(), 1);
        assert_eq!(answers.get("cups"), Some(&AnswerValue::Number(2.0)));
        assert!(typed_answers(&spec, &json!([1, 2])).is_err());
    }

    #[test]
    fn output_endpoint_writes_the_request() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("response.json");
        let mut endpoint = OutputEndpoint::new(Some(path.clone()));
        let mut answers = Answers::new();
        answers.insert("cups".into(), AnswerValue::Number(2.0));
        let request = SubmissionRequest::new("coffee", &answers, 10);

        assert!(endpoint.submit(&request).success);
        let written: Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written["formId"], "coffee");
        assert_eq!(written["answers"]["cups"], json!(2.0));
        assert_eq!(endpoint.last.as_ref(), Some(&request));
    }

    #[test]
    fn output_endpoint_rejects_unwritable_paths() {
        let dir = tempfile::tempdir().unwrap();
        let mut endpoint = OutputEndpoint::new(Some(dir.path().join("missing").join("out.json")));
        let request = SubmissionRequest::new("coffee", &Answers::new(), 0);
        let response = endpoint.submit(&request);
        assert!(!response.success);
        assert!(endpoint.last.is_none());
    }
}
