//! One-block-at-a-time respondent flow.
//!
//! The navigator walks the visible sequence (visible welcome blocks followed by
//! the other visible blocks). The sequence is recomputed from the answers on
//! every operation; `current_index` is the only positional state and always
//! addresses a visible block.

use std::collections::BTreeSet;
use std::sync::Arc;

use crate::answers::{AnswerValue, Answers, ValidationError};
use crate::captcha::CaptchaSource;
use crate::clock::Clock;
use crate::schedule::{ScheduledTask, Scheduler, TaskKind};
use crate::spec::block::{Block, BlockKind, BlockType};
use crate::spec::form::{FormSpec, NavigationPolicy};
use crate::store::AnswerStore;
use crate::submission::{
    SessionStatus, SubmissionRequest, SubmissionResponse, SubmissionState,
};
use crate::validate::{Strictness, is_answered, validate_block};
use crate::visibility::visible_blocks;

/// Visible welcome blocks first, then the remaining visible blocks.
pub fn visible_sequence<'a>(spec: &'a FormSpec, answers: &Answers) -> Vec<&'a Block> {
    let (welcome, rest): (Vec<&Block>, Vec<&Block>) = visible_blocks(spec, answers)
        .into_iter()
        .partition(|block| block.block_type() == BlockType::Welcome);
    welcome.into_iter().chain(rest).collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Welcome,
    Form,
    Submitting,
    Submitted,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Welcome => "welcome",
            Phase::Form => "form",
            Phase::Submitting => "submitting",
            Phase::Submitted => "submitted",
        }
    }
}

/// What an operation did.
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    /// Nothing changed.
    Idle,
    /// The answer was stored; the position did not change.
    Recorded,
    Moved { from: usize, to: usize },
    /// Navigation refused; the error is also surfaced on the navigator.
    Blocked(ValidationError),
    /// Strict validation passed and the request awaits the endpoint; finish
    /// with [`StepNavigator::finish_submission`].
    SubmissionRequested(SubmissionRequest),
    Submitted,
    /// A submission is in flight or already succeeded.
    Busy,
}

/// Keyboard triggers for the regular operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shortcut {
    Next,
    Previous,
    /// 1-based option number on the current block.
    SelectOption(usize),
}

pub struct StepNavigator {
    spec: Arc<FormSpec>,
    policy: NavigationPolicy,
    store: AnswerStore,
    current_index: usize,
    epoch: u64,
    submission_error: Option<ValidationError>,
    interacted: BTreeSet<String>,
    submission: SubmissionState,
    scheduler: Scheduler,
    clock: Box<dyn Clock>,
    captcha: Box<dyn CaptchaSource>,
    started_at_ms: u64,
}

impl std::fmt::Debug for StepNavigator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StepNavigator")
            .field("form_id", &self.spec.id)
            .field("current_index", &self.current_index)
            .field("submission", &self.submission)
            .field("submission_error", &self.submission_error)
            .field("pending_tasks", &self.scheduler.pending().len())
            .finish()
    }
}

fn has_valid_answer(block: &Block, answer: Option<&AnswerValue>) -> bool {
    is_answered(block, answer) && validate_block(block, answer, Strictness::Lenient).is_valid()
}

impl StepNavigator {
    pub(crate) fn new(
        spec: Arc<FormSpec>,
        store: AnswerStore,
        clock: Box<dyn Clock>,
        captcha: Box<dyn CaptchaSource>,
    ) -> Self {
        let started_at_ms = clock.now_ms();
        let mut navigator = Self {
            policy: spec.policy(),
            spec,
            store,
            current_index: 0,
            epoch: 0,
            submission_error: None,
            interacted: BTreeSet::new(),
            submission: SubmissionState::Idle,
            scheduler: Scheduler::new(),
            clock,
            captcha,
            started_at_ms,
        };
        navigator.enter_index(0);
        navigator
    }

    pub fn spec(&self) -> &FormSpec {
        &self.spec
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    pub fn sequence(&self) -> Vec<&Block> {
        visible_sequence(&self.spec, self.store.answers())
    }

    pub fn current_block(&self) -> Option<&Block> {
        self.sequence().get(self.current_index).copied()
    }

    fn current_block_id(&self) -> Option<String> {
        self.current_block().map(|block| block.id.clone())
    }

    pub fn phase(&self) -> Phase {
        match self.submission {
            SubmissionState::InFlight => Phase::Submitting,
            SubmissionState::Done => Phase::Submitted,
            SubmissionState::Idle | SubmissionState::Failed => {
                let welcome = self
                    .sequence()
                    .iter()
                    .filter(|block| block.block_type() == BlockType::Welcome)
                    .count();
                if self.current_index < welcome {
                    Phase::Welcome
                } else {
                    Phase::Form
                }
            }
        }
    }

    pub fn status(&self) -> SessionStatus {
        self.submission.status()
    }

    pub fn is_submitting(&self) -> bool {
        self.submission == SubmissionState::InFlight
    }

    pub fn submission_error(&self) -> Option<&ValidationError> {
        self.submission_error.as_ref()
    }

    pub fn answers(&self) -> &Answers {
        self.store.answers()
    }

    pub fn answer(&self, block_id: &str) -> Option<&AnswerValue> {
        self.store.get(block_id)
    }

    pub fn has_interacted(&self, block_id: &str) -> bool {
        self.interacted.contains(block_id)
    }

    pub fn pending_tasks(&self) -> &[ScheduledTask] {
        self.scheduler.pending()
    }

    /// Milliseconds until the next timer is due, if any.
    pub fn next_due_in(&self) -> Option<u64> {
        let now = self.clock.now_ms();
        self.scheduler
            .next_due()
            .map(|due| due.saturating_sub(now))
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.clock.now_ms().saturating_sub(self.started_at_ms)
    }

    /// Stores an answer coming from a renderer's change callback.
    pub fn record_answer(&mut self, block_id: &str, value: Option<AnswerValue>) -> Step {
        if self.submission.is_locked() {
            return Step::Busy;
        }
        let spec = Arc::clone(&self.spec);
        let Some(block) = spec.block(block_id) else {
            log::warn!("ignoring answer for unknown block '{}'", block_id);
            return Step::Idle;
        };
        if !block.block_type().is_interactive() {
            return Step::Idle;
        }

        let previous = self.store.get(block_id).cloned();
        let confirming = block.block_type().is_confirming_choice();
        if confirming
            && has_valid_answer(block, previous.as_ref())
            && (!is_answered(block, value.as_ref()) || value == previous)
        {
            return Step::Idle;
        }
        if value == previous {
            return Step::Idle;
        }

        let anchor = self.current_block_id();
        let now = self.clock.now_ms();
        self.interacted.insert(block_id.to_string());
        match &value {
            Some(value) => self.store.set(block_id, value.clone(), now),
            None => self.store.remove(block_id, now),
        }
        if is_answered(block, value.as_ref())
            && self
                .submission_error
                .as_ref()
                .and_then(|error| error.block_id.as_deref())
                == Some(block_id)
        {
            self.submission_error = None;
        }

        let step = self.reclamp(anchor.as_deref());

        if step == Step::Recorded
            && confirming
            && let Some(value) = value
            && has_valid_answer(block, Some(&value))
            && anchor.as_deref() == Some(block_id)
        {
            self.scheduler.cancel_choice_advances();
            self.scheduler.schedule(
                now.saturating_add(self.policy.choice_advance_ms),
                self.epoch,
                TaskKind::ChoiceAdvance {
                    block_id: block_id.to_string(),
                    value,
                },
            );
        }
        step
    }

    /// Validates the current block and moves forward, or submits at the end.
    pub fn advance(&mut self, override_value: Option<AnswerValue>) -> Step {
        if self.submission.is_locked() {
            return Step::Busy;
        }
        let spec = Arc::clone(&self.spec);
        let Some(block) = visible_sequence(&spec, self.store.answers())
            .get(self.current_index)
            .copied()
        else {
            log::debug!("advance with no block at index {}", self.current_index);
            return Step::Idle;
        };

        if let Err(error) = self.gate(block, override_value) {
            return self.surface(error);
        }
        self.submission_error = None;

        let sequence = visible_sequence(&spec, self.store.answers());
        let Some(position) = sequence.iter().position(|entry| entry.id == block.id) else {
            return Step::Idle;
        };

        let mut next = position + 1;
        if self.policy.pair_headings
            && block.block_type() == BlockType::Heading
            && let Some(partner) = sequence.get(next).copied()
        {
            if let Err(error) = self.gate(partner, None) {
                return self.surface(error);
            }
            next += 1;
        }

        if next < sequence.len() {
            self.move_to(next)
        } else {
            self.submit()
        }
    }

    /// Moves back one position without validating.
    pub fn retreat(&mut self) -> Step {
        if self.submission.is_locked() {
            return Step::Busy;
        }
        if self.current_index == 0 {
            return Step::Idle;
        }
        self.submission_error = None;
        self.move_to(self.current_index - 1)
    }

    /// Strictly validates every visible non-welcome block and, when all pass,
    /// hands the request to the caller.
    pub fn submit(&mut self) -> Step {
        if self.submission.is_locked() {
            return Step::Busy;
        }
        let spec = Arc::clone(&self.spec);

        let unresolved_captchas = visible_sequence(&spec, self.store.answers())
            .into_iter()
            .filter(|block| {
                block.block_type() == BlockType::Captcha && self.store.get(&block.id).is_none()
            })
            .collect::<Vec<_>>();
        for block in unresolved_captchas {
            self.backfill_captcha(block);
        }

        let failure = visible_sequence(&spec, self.store.answers())
            .into_iter()
            .enumerate()
            .filter(|(_, block)| block.block_type() != BlockType::Welcome)
            .find_map(|(position, block)| {
                validate_block(block, self.store.get(&block.id), Strictness::Strict)
                    .error
                    .map(|error| (position, error))
            });

        if let Some((position, error)) = failure {
            log::debug!(
                "submission of {} blocked by {}: {}",
                spec.id,
                error.block_id.as_deref().unwrap_or_default(),
                error.message
            );
            if position != self.current_index {
                self.enter_index(position);
            }
            return self.surface(error);
        }

        self.scheduler.cancel_all();
        self.submission = SubmissionState::InFlight;
        self.submission_error = None;
        Step::SubmissionRequested(SubmissionRequest::new(
            &spec.id,
            self.store.answers(),
            self.elapsed_ms(),
        ))
    }

    /// Applies the endpoint's reply to an in-flight submission.
    pub fn finish_submission(&mut self, response: SubmissionResponse) -> Step {
        if self.submission != SubmissionState::InFlight {
            log::warn!("submission reply for {} with nothing in flight", self.spec.id);
            return Step::Idle;
        }
        if response.success {
            log::debug!("form {} submitted", self.spec.id);
            self.submission = SubmissionState::Done;
            self.submission_error = None;
            self.scheduler.cancel_all();
            self.store.clear();
            Step::Submitted
        } else {
            self.submission = SubmissionState::Failed;
            let error = ValidationError::submission_failed(
                response
                    .error
                    .unwrap_or_else(|| "Submission failed, please try again".into()),
            );
            self.surface(error)
        }
    }

    /// Fires due timers. Tasks scheduled for an earlier index are dropped.
    pub fn tick(&mut self) -> Vec<Step> {
        let due = self.scheduler.take_due(self.clock.now_ms());
        let mut steps = Vec::new();
        for task in due {
            if task.epoch != self.epoch || self.submission.is_locked() {
                log::debug!("dropping stale task {}", task.id);
                continue;
            }
            let current = self.current_block_id();
            let step = match task.kind {
                TaskKind::AutoAdvance { block_id }
                    if current.as_deref() == Some(block_id.as_str()) =>
                {
                    self.advance(None)
                }
                TaskKind::ChoiceAdvance { block_id, value }
                    if current.as_deref() == Some(block_id.as_str()) =>
                {
                    self.advance(Some(value))
                }
                _ => continue,
            };
            steps.push(step);
        }
        steps
    }

    pub fn shortcut(&mut self, shortcut: Shortcut) -> Step {
        match shortcut {
            Shortcut::Next => self.advance(None),
            Shortcut::Previous => self.retreat(),
            Shortcut::SelectOption(number) => {
                let Some(block) = self.current_block() else {
                    return Step::Idle;
                };
                let block_id = block.id.clone();
                match option_value(block, number, self.store.get(&block.id)) {
                    Some(value) => self.record_answer(&block_id, Some(value)),
                    None => Step::Idle,
                }
            }
        }
    }

    /// Lenient gate shared by the current block and a paired heading partner.
    fn gate(
        &mut self,
        block: &Block,
        candidate: Option<AnswerValue>,
    ) -> Result<(), ValidationError> {
        let stored = self.store.get(&block.id).cloned();
        let mut answer = candidate.clone().or_else(|| stored.clone());
        if answer.is_none() && block.block_type() == BlockType::Captcha {
            answer = self.backfill_captcha(block);
        }

        let outcome = validate_block(block, answer.as_ref(), Strictness::Lenient);
        if outcome.is_valid() {
            if let Some(candidate) = candidate
                && is_answered(block, Some(&candidate))
                && Some(&candidate) != stored.as_ref()
            {
                let now = self.clock.now_ms();
                self.store.set(&block.id, candidate, now);
                self.interacted.insert(block.id.clone());
            }
            return Ok(());
        }

        if block.block_type().is_confirming_choice() && has_valid_answer(block, stored.as_ref()) {
            log::debug!("keeping confirmed answer for {}", block.id);
            return Ok(());
        }
        if !block.block_type().is_interactive() {
            return Ok(());
        }
        outcome.into_result()
    }

    fn backfill_captcha(&mut self, block: &Block) -> Option<AnswerValue> {
        let token = self.captcha.token()?;
        let value = AnswerValue::Text(token);
        let now = self.clock.now_ms();
        self.store.set(&block.id, value.clone(), now);
        log::debug!("backfilled captcha token for {}", block.id);
        Some(value)
    }

    fn surface(&mut self, error: ValidationError) -> Step {
        self.submission_error = Some(error.clone());
        Step::Blocked(error)
    }

    fn move_to(&mut self, index: usize) -> Step {
        let from = self.current_index;
        self.enter_index(index);
        log::debug!("{}: {} -> {}", self.spec.id, from, index);
        Step::Moved { from, to: index }
    }

    /// Every index change invalidates pending timers.
    fn enter_index(&mut self, index: usize) {
        self.current_index = index;
        self.epoch += 1;
        self.scheduler.cancel_all();

        let Some(block) = self.current_block() else {
            return;
        };
        if block.block_type() == BlockType::Paragraph {
            let block_id = block.id.clone();
            let due = self
                .clock
                .now_ms()
                .saturating_add(self.policy.auto_advance_ms);
            self.scheduler
                .schedule(due, self.epoch, TaskKind::AutoAdvance { block_id });
        }
    }

    /// Single recomputation after an answer change. If the block the index
    /// addressed disappeared, moves forward to the next visible block or
    /// submits when none remains. `move_to` and `submit` never record answers,
    /// so visibility cannot change again during the pass.
    fn reclamp(&mut self, anchor: Option<&str>) -> Step {
        let Some(anchor) = anchor else {
            return Step::Recorded;
        };
        let spec = Arc::clone(&self.spec);
        let sequence = visible_sequence(&spec, self.store.answers());

        if let Some(position) = sequence.iter().position(|block| block.id == anchor) {
            // Same block, possibly shifted by blocks appearing before it.
            self.current_index = position;
            return Step::Recorded;
        }

        let Some(anchor_key) = spec.sequence_key(anchor) else {
            return Step::Recorded;
        };
        let next = sequence.iter().position(|block| {
            spec.sequence_key(&block.id)
                .is_some_and(|key| key > anchor_key)
        });
        match next {
            Some(position) => {
                log::debug!("block {} hidden, moving forward", anchor);
                self.move_to(position)
            }
            None => {
                log::debug!("block {} hidden and nothing follows, submitting", anchor);
                self.enter_index(sequence.len().saturating_sub(1));
                self.submit()
            }
        }
    }
}

/// Answer selected by pressing option `number` (1-based) on `block`.
fn option_value(block: &Block, number: usize, current: Option<&AnswerValue>) -> Option<AnswerValue> {
    let index = number.checked_sub(1)?;
    match &block.kind {
        BlockKind::SingleChoice(props) | BlockKind::Dropdown(props) => props
            .options
            .get(index)
            .map(|option| AnswerValue::Choice(option.clone())),
        BlockKind::MultipleChoice(props) => {
            let option = props.options.get(index)?;
            let mut selected = match current {
                Some(AnswerValue::Choices(items)) => items.clone(),
                _ => Vec::new(),
            };
            if let Some(existing) = selected.iter().position(|item| item == option) {
                selected.remove(existing);
            } else {
                selected.push(option.clone());
            }
            Some(AnswerValue::Choices(selected))
        }
        BlockKind::YesNo | BlockKind::Consent => match number {
            1 => Some(AnswerValue::Bool(true)),
            2 => Some(AnswerValue::Bool(false)),
            _ => None,
        },
        BlockKind::Rating(props) => u32::try_from(number)
            .ok()
            .filter(|value| *value <= props.max)
            .map(|value| AnswerValue::Number(f64::from(value))),
        _ => None,
    }
}
