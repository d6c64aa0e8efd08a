use crate::answers::AnswerValue;
use crate::navigation::{Shortcut, Step, StepNavigator};
use crate::submission::SubmissionEndpoint;

/// A navigator wired to a submission endpoint. Submission requests are
/// resolved inline so callers only see terminal outcomes.
#[derive(Debug)]
pub struct Session<E> {
    navigator: StepNavigator,
    endpoint: E,
}

impl<E: SubmissionEndpoint> Session<E> {
    pub fn new(navigator: StepNavigator, endpoint: E) -> Self {
        Self {
            navigator,
            endpoint,
        }
    }

    pub fn navigator(&self) -> &StepNavigator {
        &self.navigator
    }

    pub fn endpoint(&self) -> &E {
        &self.endpoint
    }

    pub fn into_parts(self) -> (StepNavigator, E) {
        (self.navigator, self.endpoint)
    }

    pub fn record_answer(&mut self, block_id: &str, value: Option<AnswerValue>) -> Step {
        let step = self.navigator.record_answer(block_id, value);
        self.resolve(step)
    }

    pub fn advance(&mut self) -> Step {
        let step = self.navigator.advance(None);
        self.resolve(step)
    }

    pub fn advance_with(&mut self, value: AnswerValue) -> Step {
        let step = self.navigator.advance(Some(value));
        self.resolve(step)
    }

    pub fn retreat(&mut self) -> Step {
        self.navigator.retreat()
    }

    pub fn submit(&mut self) -> Step {
        let step = self.navigator.submit();
        self.resolve(step)
    }

    pub fn shortcut(&mut self, shortcut: Shortcut) -> Step {
        let step = self.navigator.shortcut(shortcut);
        self.resolve(step)
    }

    pub fn tick(&mut self) -> Vec<Step> {
        self.navigator
            .tick()
            .into_iter()
            .map(|step| self.resolve(step))
            .collect()
    }

    fn resolve(&mut self, step: Step) -> Step {
        match step {
            Step::SubmissionRequested(request) => {
                log::info!("submitting {} answers for {}", request.answers.len(), request.form_id);
                let response = self.endpoint.submit(&request);
                self.navigator.finish_submission(response)
            }
            other => other,
        }
    }
}
