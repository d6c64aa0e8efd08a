use std::cell::RefCell;
use std::rc::Rc;

/// Lifecycle reported by an embedded CAPTCHA widget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CaptchaState {
    #[default]
    Unstarted,
    Verifying,
    Verified,
}

/// Read-only view of a CAPTCHA widget the runtime polls but does not own.
pub trait CaptchaSource {
    fn state(&self) -> CaptchaState;

    /// Resolved token, only once the widget reports `Verified`.
    fn token(&self) -> Option<String>;
}

/// Used when the form has no CAPTCHA widget.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoCaptcha;

impl CaptchaSource for NoCaptcha {
    fn state(&self) -> CaptchaState {
        CaptchaState::Unstarted
    }

    fn token(&self) -> Option<String> {
        None
    }
}

#[derive(Debug, Default)]
struct WidgetState {
    state: CaptchaState,
    token: Option<String>,
}

/// Shared handle a host updates from widget callbacks; clones observe the
/// same widget, so the runtime sees tokens as soon as they resolve.
#[derive(Debug, Clone, Default)]
pub struct CaptchaHandle {
    inner: Rc<RefCell<WidgetState>>,
}

impl CaptchaHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin(&self) {
        let mut inner = self.inner.borrow_mut();
        inner.state = CaptchaState::Verifying;
        inner.token = None;
    }

    pub fn resolve(&self, token: impl Into<String>) {
        let mut inner = self.inner.borrow_mut();
        inner.state = CaptchaState::Verified;
        inner.token = Some(token.into());
    }

    pub fn reset(&self) {
        *self.inner.borrow_mut() = WidgetState::default();
    }
}

impl CaptchaSource for CaptchaHandle {
    fn state(&self) -> CaptchaState {
        self.inner.borrow().state
    }

    fn token(&self) -> Option<String> {
        let inner = self.inner.borrow();
        match inner.state {
            CaptchaState::Verified => inner.token.clone().filter(|token| !token.is_empty()),
            _ => None,
        }
    }
}
