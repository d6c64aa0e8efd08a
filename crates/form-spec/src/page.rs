//! All-in-one presentation: every visible block on one page, validated
//! together on submit.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use crate::answers::{AnswerValue, Answers, ValidationError};
use crate::captcha::CaptchaSource;
use crate::clock::Clock;
use crate::spec::block::{Block, BlockType};
use crate::spec::form::FormSpec;
use crate::store::AnswerStore;
use crate::submission::{
    SessionStatus, SubmissionEndpoint, SubmissionRequest, SubmissionResponse, SubmissionState,
};
use crate::validate::{Strictness, validate_block};
use crate::visibility::visible_blocks;

#[derive(Debug, Clone, PartialEq)]
pub enum PageStep {
    Recorded,
    /// Hidden or unknown block, non-interactive block or unchanged value.
    Ignored,
    /// Strict validation failed; `scroll_to` is the first failing block in
    /// visible order.
    Invalid {
        scroll_to: Option<String>,
        errors: Vec<ValidationError>,
    },
    SubmissionRequested(SubmissionRequest),
    Submitted,
    Failed(ValidationError),
    Busy,
}

pub struct PageController {
    spec: Arc<FormSpec>,
    store: AnswerStore,
    errors: BTreeMap<String, ValidationError>,
    scroll_target: Option<String>,
    submission: SubmissionState,
    submission_error: Option<ValidationError>,
    interacted: BTreeSet<String>,
    clock: Box<dyn Clock>,
    captcha: Box<dyn CaptchaSource>,
    started_at_ms: u64,
}

impl std::fmt::Debug for PageController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PageController")
            .field("form_id", &self.spec.id)
            .field("errors", &self.errors)
            .field("submission", &self.submission)
            .finish()
    }
}

impl PageController {
    pub(crate) fn new(
        spec: Arc<FormSpec>,
        store: AnswerStore,
        clock: Box<dyn Clock>,
        captcha: Box<dyn CaptchaSource>,
    ) -> Self {
        let started_at_ms = clock.now_ms();
        Self {
            spec,
            store,
            errors: BTreeMap::new(),
            scroll_target: None,
            submission: SubmissionState::Idle,
            submission_error: None,
            interacted: BTreeSet::new(),
            clock,
            captcha,
            started_at_ms,
        }
    }

    pub fn spec(&self) -> &FormSpec {
        &self.spec
    }

    /// Visible blocks in form order; recomputed on every call.
    pub fn visible_blocks(&self) -> Vec<&Block> {
        visible_blocks(&self.spec, self.store.answers())
    }

    pub fn answers(&self) -> &Answers {
        self.store.answers()
    }

    pub fn error_for(&self, block_id: &str) -> Option<&ValidationError> {
        self.errors.get(block_id)
    }

    /// Per-block errors keyed by block id.
    pub fn errors(&self) -> &BTreeMap<String, ValidationError> {
        &self.errors
    }

    pub fn scroll_target(&self) -> Option<&str> {
        self.scroll_target.as_deref()
    }

    pub fn submission_error(&self) -> Option<&ValidationError> {
        self.submission_error.as_ref()
    }

    pub fn status(&self) -> SessionStatus {
        self.submission.status()
    }

    pub fn is_submitting(&self) -> bool {
        self.submission == SubmissionState::InFlight
    }

    pub fn has_interacted(&self, block_id: &str) -> bool {
        self.interacted.contains(block_id)
    }

    /// Stores an answer for a visible interactive block and clears that
    /// block's error.
    pub fn record_answer(&mut self, block_id: &str, value: Option<AnswerValue>) -> PageStep {
        if self.submission.is_locked() {
            return PageStep::Busy;
        }
        let spec = Arc::clone(&self.spec);
        let Some(block) = visible_blocks(&spec, self.store.answers())
            .into_iter()
            .find(|block| block.id == block_id)
        else {
            log::debug!("ignoring answer for hidden block '{}'", block_id);
            return PageStep::Ignored;
        };
        if !block.block_type().is_interactive() || self.store.get(block_id) == value.as_ref() {
            return PageStep::Ignored;
        }

        let now = self.clock.now_ms();
        self.interacted.insert(block_id.to_string());
        match value {
            Some(value) => self.store.set(block_id, value, now),
            None => self.store.remove(block_id, now),
        }
        self.errors.remove(block_id);

        let visible: BTreeSet<String> = visible_blocks(&spec, self.store.answers())
            .into_iter()
            .map(|block| block.id.clone())
            .collect();
        self.errors.retain(|id, _| visible.contains(id));
        if self
            .scroll_target
            .as_ref()
            .is_some_and(|target| !self.errors.contains_key(target))
        {
            self.scroll_target = self.first_error_in_order();
        }
        PageStep::Recorded
    }

    /// Strict validation of every visible block; on success the request is
    /// handed back for the endpoint.
    pub fn submit(&mut self) -> PageStep {
        if self.submission.is_locked() {
            return PageStep::Busy;
        }
        let spec = Arc::clone(&self.spec);
        let visible = visible_blocks(&spec, self.store.answers());

        for block in visible
            .iter()
            .filter(|block| block.block_type() == BlockType::Captcha)
        {
            if self.store.get(&block.id).is_none()
                && let Some(token) = self.captcha.token()
            {
                let now = self.clock.now_ms();
                self.store.set(&block.id, AnswerValue::Text(token), now);
            }
        }

        let errors: Vec<ValidationError> = visible
            .iter()
            .filter(|block| block.block_type() != BlockType::Welcome)
            .filter_map(|block| {
                validate_block(block, self.store.get(&block.id), Strictness::Strict).error
            })
            .collect();

        if !errors.is_empty() {
            self.errors = errors
                .iter()
                .filter_map(|error| Some((error.block_id.clone()?, error.clone())))
                .collect();
            self.scroll_target = errors.first().and_then(|error| error.block_id.clone());
            log::debug!(
                "page submission of {} has {} invalid blocks",
                spec.id,
                errors.len()
            );
            return PageStep::Invalid {
                scroll_to: self.scroll_target.clone(),
                errors,
            };
        }

        self.errors.clear();
        self.scroll_target = None;
        self.submission_error = None;
        self.submission = SubmissionState::InFlight;
        let elapsed = self.clock.now_ms().saturating_sub(self.started_at_ms);
        PageStep::SubmissionRequested(SubmissionRequest::new(
            &spec.id,
            self.store.answers(),
            elapsed,
        ))
    }

    pub fn finish_submission(&mut self, response: SubmissionResponse) -> PageStep {
        if self.submission != SubmissionState::InFlight {
            log::warn!("submission reply for {} with nothing in flight", self.spec.id);
            return PageStep::Ignored;
        }
        if response.success {
            self.submission = SubmissionState::Done;
            self.store.clear();
            PageStep::Submitted
        } else {
            self.submission = SubmissionState::Failed;
            let error = ValidationError::submission_failed(
                response
                    .error
                    .unwrap_or_else(|| "Submission failed, please try again".into()),
            );
            self.submission_error = Some(error.clone());
            PageStep::Failed(error)
        }
    }

    /// `submit` followed by a synchronous round trip to `endpoint`.
    pub fn submit_with(&mut self, endpoint: &mut dyn SubmissionEndpoint) -> PageStep {
        match self.submit() {
            PageStep::SubmissionRequested(request) => {
                let response = endpoint.submit(&request);
                self.finish_submission(response)
            }
            other => other,
        }
    }

    fn first_error_in_order(&self) -> Option<String> {
        self.visible_blocks()
            .into_iter()
            .find(|block| self.errors.contains_key(&block.id))
            .map(|block| block.id.clone())
    }
}
