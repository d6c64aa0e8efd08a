use std::sync::Arc;

use crate::answers::{AnswerValue, Answers};
use crate::captcha::{CaptchaSource, NoCaptcha};
use crate::clock::{Clock, SystemClock};
use crate::navigation::StepNavigator;
use crate::page::PageController;
use crate::session::Session;
use crate::spec::form::FormSpec;
use crate::store::{AnswerStore, RecoveryStore};
use crate::submission::SubmissionEndpoint;

/// Assembles a respondent runtime for one form.
///
/// Initial answers come from the host when it provides them, otherwise from
/// the recovery store. Block default values fill whatever is still missing.
pub struct RuntimeBuilder {
    spec: Arc<FormSpec>,
    clock: Option<Box<dyn Clock>>,
    captcha: Option<Box<dyn CaptchaSource>>,
    recovery: Option<Box<dyn RecoveryStore>>,
    server_answers: Option<Answers>,
}

impl RuntimeBuilder {
    pub fn new(spec: impl Into<Arc<FormSpec>>) -> Self {
        Self {
            spec: spec.into(),
            clock: None,
            captcha: None,
            recovery: None,
            server_answers: None,
        }
    }

    /// Defaults to [`SystemClock`].
    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Some(Box::new(clock));
        self
    }

    /// Defaults to [`NoCaptcha`].
    pub fn with_captcha(mut self, captcha: impl CaptchaSource + 'static) -> Self {
        self.captcha = Some(Box::new(captcha));
        self
    }

    pub fn with_recovery(mut self, recovery: impl RecoveryStore + 'static) -> Self {
        self.recovery = Some(Box::new(recovery));
        self
    }

    /// Answers supplied by the host. These take precedence over recovery.
    pub fn with_server_answers(mut self, answers: Answers) -> Self {
        self.server_answers = Some(answers);
        self
    }

    pub fn build_navigator(self) -> StepNavigator {
        let (spec, store, clock, captcha) = self.into_parts();
        StepNavigator::new(spec, store, clock, captcha)
    }

    pub fn build_page(self) -> PageController {
        let (spec, store, clock, captcha) = self.into_parts();
        PageController::new(spec, store, clock, captcha)
    }

    pub fn build_session<E: SubmissionEndpoint>(self, endpoint: E) -> Session<E> {
        Session::new(self.build_navigator(), endpoint)
    }

    #[allow(clippy::type_complexity)]
    fn into_parts(
        self,
    ) -> (
        Arc<FormSpec>,
        AnswerStore,
        Box<dyn Clock>,
        Box<dyn CaptchaSource>,
    ) {
        let mut store = AnswerStore::new(self.spec.id.clone(), self.spec.version.clone());
        if let Some(recovery) = self.recovery {
            store = store.with_recovery(recovery);
        }

        let mut answers = match self.server_answers {
            Some(answers) => answers,
            None => store.recover().unwrap_or_default(),
        };
        seed_defaults(&self.spec, &mut answers);
        store.replace(answers);

        let clock = self
            .clock
            .unwrap_or_else(|| Box::new(SystemClock::new()));
        let captcha = self.captcha.unwrap_or_else(|| Box::new(NoCaptcha));
        (self.spec, store, clock, captcha)
    }
}

/// Fills unanswered blocks from their `defaultValue`. Defaults that do not fit
/// the block type are skipped.
pub fn seed_defaults(spec: &FormSpec, answers: &mut Answers) {
    for block in &spec.blocks {
        if answers.contains_key(&block.id) {
            continue;
        }
        let Some(default) = block.default_value.as_ref() else {
            continue;
        };
        match AnswerValue::from_json(block.block_type(), default) {
            Some(value) => {
                answers.insert(block.id.clone(), value);
            }
            None => log::debug!("ignoring default value for {}", block.id),
        }
    }
}
