use form_spec::{
    BlockType, RenderBlock, RenderPayload, RenderStatus, SubmissionRequest, ValidationError,
};
use serde_json::Value;

/// Controls which bits of state the wizard prints.
#[derive(Copy, Clone, Eq, PartialEq)]
pub enum Verbosity {
    /// Clean output: block prompts only.
    Clean,
    /// Verbose output: status, visible blocks, error codes, help text.
    Verbose,
}

impl Verbosity {
    pub fn from_verbose(verbose: bool) -> Self {
        if verbose {
            Verbosity::Verbose
        } else {
            Verbosity::Clean
        }
    }

    pub fn is_verbose(&self) -> bool {
        matches!(self, Verbosity::Verbose)
    }
}

/// Prints prompts and outcomes while the navigator walks the form.
pub struct WizardPresenter {
    verbosity: Verbosity,
    header_printed: bool,
    show_answers_json: bool,
}

impl WizardPresenter {
    pub fn new(verbosity: Verbosity, show_answers_json: bool) -> Self {
        Self {
            verbosity,
            header_printed: false,
            show_answers_json,
        }
    }

    pub fn show_header(&mut self, payload: &RenderPayload) {
        if self.header_printed {
            return;
        }
        println!("Form: {}", payload.form_title);
        if self.verbosity.is_verbose()
            && let Some(help) = &payload.help
        {
            println!("Help: {}", help);
        }
        self.header_printed = true;
    }

    pub fn show_status(&self, payload: &RenderPayload) {
        if self.verbosity.is_verbose() {
            println!(
                "Status: {} ({}/{})",
                payload.status.as_str(),
                payload.progress.answered,
                payload.progress.total
            );
            println!("Visible blocks:");
            for block in payload.blocks.iter().filter(|block| block.visible) {
                let mut entry = format!(" - {} ({})", block.id, block.kind.as_str());
                if block.required {
                    entry.push_str(" [required]");
                }
                println!("{}", entry);
            }
        } else if payload.status == RenderStatus::NeedInput
            && payload.blocks.iter().all(|block| !block.visible)
        {
            println!("No visible blocks are available; check your visibility rules.");
        }
    }

    pub fn show_prompt(&self, prompt: &PromptContext) {
        let mut line = format!("{}/{} {}", prompt.index, prompt.total, prompt.label);
        if prompt.required {
            line.push_str(" *");
        }
        if let Some(hint) = &prompt.hint {
            line.push(' ');
            line.push_str(hint);
        }
        println!("{}", line);
        if let Some(help) = &prompt.help {
            println!("{}", help);
        }
        for (index, option) in prompt.options.iter().enumerate() {
            println!("  {}. {}", index + 1, option);
        }
        if let Some(current) = &prompt.current {
            println!("Current answer: {}", current);
        } else if self.verbosity.is_verbose()
            && let Some(placeholder) = &prompt.placeholder
        {
            println!("e.g. {}", placeholder);
        }
    }

    pub fn show_parse_error(&self, error: &AnswerParseError) {
        eprintln!("Invalid answer: {}", error.user_message);
        if let Some(debug) = &error.debug_message
            && self.verbosity.is_verbose()
        {
            eprintln!("  Expected: {}", debug);
        }
    }

    pub fn show_block_error(&self, error: &ValidationError) {
        eprintln!("Invalid answer: {}", error.message);
        if self.verbosity.is_verbose() {
            eprintln!("  Code: {}", error.code());
        }
    }

    pub fn show_completion(&self, request: Option<&SubmissionRequest>) {
        println!("Done ✅");
        let Some(request) = request else {
            return;
        };
        println!(
            "Submitted {} answers for {} in {} ms",
            request.answers.len(),
            request.form_id,
            request.elapsed_ms
        );
        if self.show_answers_json {
            match serde_json::to_string_pretty(&request.answers) {
                Ok(pretty) => println!("{}", pretty),
                Err(err) => eprintln!("Failed to serialize answers to JSON: {}", err),
            }
        }
    }
}

/// Context used to format a single prompt.
pub struct PromptContext {
    pub index: usize,
    pub total: usize,
    pub label: String,
    pub help: Option<String>,
    pub placeholder: Option<String>,
    pub required: bool,
    pub hint: Option<String>,
    pub options: Vec<String>,
    pub current: Option<String>,
}

impl PromptContext {
    pub fn new(block: &RenderBlock, index: usize, total: usize) -> Self {
        let options = block.options.clone().unwrap_or_default();
        Self {
            index: index.max(1),
            total: total.max(index),
            label: block.label.clone(),
            help: block.help_text.clone(),
            placeholder: block.placeholder.clone(),
            required: block.required,
            hint: hint(block.kind, !options.is_empty()),
            options,
            current: block.current_value.as_ref().map(display_value),
        }
    }
}

fn hint(kind: BlockType, has_options: bool) -> Option<String> {
    let text = match kind {
        BlockType::SingleChoice | BlockType::Dropdown if has_options => "(number or option text)",
        BlockType::MultipleChoice => "(numbers toggle options, enter continues)",
        BlockType::YesNo => "(1 = yes, 2 = no)",
        BlockType::Consent => "(1 = I agree, 2 = I do not)",
        BlockType::Rating => "(stars)",
        BlockType::Number | BlockType::Slider => "(number)",
        BlockType::Date => "(YYYY-MM-DD)",
        BlockType::Phone => "(+prefix number)",
        BlockType::File => "(JSON file descriptor)",
        BlockType::Address => "(JSON with street, city, zip, country)",
        BlockType::Captcha => "(enter to use the verified token)",
        kind if !kind.is_interactive() => "(enter to continue)",
        _ => return None,
    };
    Some(text.to_string())
}

fn display_value(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Array(items) => items
            .iter()
            .map(display_value)
            .collect::<Vec<_>>()
            .join(", "),
        other => other.to_string(),
    }
}

/// Error produced when parsing answers from the user.
#[derive(Debug)]
pub struct AnswerParseError {
    pub user_message: String,
    pub debug_message: Option<String>,
}

impl AnswerParseError {
    pub fn new(user_message: impl Into<String>, debug_message: Option<String>) -> Self {
        Self {
            user_message: user_message.into(),
            debug_message,
        }
    }
}
