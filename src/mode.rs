use std::time::{Duration, Instant};

use crate::validate::{self, JsonStatus};

/// Idle gap after which a pending JSON validation fires
pub const JSON_VALIDATE_DEBOUNCE: Duration = Duration::from_millis(500);

/// The two mutually exclusive presentation states for entering data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Form,
    Text,
}

/// Coalesces rapid text edits into at most one validation pass per idle gap.
///
/// Each `schedule` replaces the previous deadline, so only the last scheduled
/// validation ever fires. Driven by injected `Instant`s so callers (and
/// tests) decide when time advances.
#[derive(Debug, Clone)]
pub struct Debouncer {
    delay: Duration,
    deadline: Option<Instant>,
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Debouncer {
            delay,
            deadline: None,
        }
    }

    /// Schedules (or reschedules) the action; last scheduled wins.
    pub fn schedule(&mut self, now: Instant) {
        self.deadline = Some(now + self.delay);
    }

    pub fn pending(&self) -> bool {
        self.deadline.is_some()
    }

    /// Returns true exactly once per schedule, when the idle gap has passed.
    pub fn fire(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }
}

/// Controller of the form/text editing toggle and of the raw JSON buffer.
///
/// The two modes are never synchronized with each other: switching modes is a
/// plain state replace in both directions, so data entered in the hidden mode
/// survives untouched. Only the data-collection step at generate time treats
/// the two as equivalent sources.
#[derive(Debug, Clone)]
pub struct ModeController {
    mode: Mode,
    text: String,
    status: JsonStatus,
    debouncer: Debouncer,
}

impl Default for ModeController {
    fn default() -> Self {
        Self::new()
    }
}

impl ModeController {
    pub fn new() -> Self {
        ModeController {
            mode: Mode::Form,
            text: String::new(),
            status: JsonStatus::Empty,
            debouncer: Debouncer::new(JSON_VALIDATE_DEBOUNCE),
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Explicit user toggle. No serialization of form contents into the text
    /// buffer and no parse of the text buffer back into the form.
    pub fn set_mode(&mut self, mode: Mode) {
        self.mode = mode;
    }

    /// Template-load auto-reset: back to form mode. The text buffer is left
    /// alone so nothing typed there is discarded.
    pub fn reset_to_form(&mut self) {
        self.mode = Mode::Form;
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn status(&self) -> &JsonStatus {
        &self.status
    }

    /// Replaces the text buffer and schedules a debounced validation.
    pub fn edit_text(&mut self, text: String, now: Instant) {
        self.text = text;
        self.debouncer.schedule(now);
    }

    /// Runs the pending validation if its idle gap has elapsed. Returns the
    /// fresh status when a pass actually ran.
    pub fn poll_validation(&mut self, now: Instant) -> Option<&JsonStatus> {
        if self.debouncer.fire(now) {
            self.status = validate::validate_json_text(&self.text);
            Some(&self.status)
        } else {
            None
        }
    }

    /// Validates the buffer immediately, cancelling any pending pass.
    pub fn validate_now(&mut self) -> &JsonStatus {
        self.debouncer = Debouncer::new(JSON_VALIDATE_DEBOUNCE);
        self.status = validate::validate_json_text(&self.text);
        &self.status
    }

    /// The explicit "copy example" action: writes the example payload into
    /// the text buffer, switches to text mode and validates right away.
    pub fn copy_example(&mut self, example: &str) {
        self.text = example.to_string();
        self.mode = Mode::Text;
        self.validate_now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initial_mode_is_form() {
        let ctl = ModeController::new();
        assert_eq!(ctl.mode(), Mode::Form);
    }

    #[test]
    fn mode_toggle_never_touches_other_buffer() {
        let mut ctl = ModeController::new();
        ctl.edit_text("{\"kept\": true}".to_string(), Instant::now());
        ctl.set_mode(Mode::Form);
        ctl.set_mode(Mode::Text);
        assert_eq!(ctl.text(), "{\"kept\": true}");
    }

    #[test]
    fn template_load_resets_to_form_and_keeps_text() {
        let mut ctl = ModeController::new();
        ctl.edit_text("[1, 2]".to_string(), Instant::now());
        ctl.set_mode(Mode::Text);
        ctl.reset_to_form();
        assert_eq!(ctl.mode(), Mode::Form);
        assert_eq!(ctl.text(), "[1, 2]");
    }

    #[test]
    fn debounce_coalesces_rapid_edits() {
        let start = Instant::now();
        let mut ctl = ModeController::new();

        ctl.edit_text("{\"a\":".to_string(), start);
        // keystroke 100ms later reschedules, earlier pass never fires
        ctl.edit_text("{\"a\": 1}".to_string(), start + Duration::from_millis(100));

        assert!(ctl.poll_validation(start + Duration::from_millis(500)).is_none());
        let status = ctl
            .poll_validation(start + Duration::from_millis(600))
            .expect("validation should fire after the idle gap");
        assert_eq!(*status, JsonStatus::Valid);

        // fires at most once per schedule
        assert!(ctl.poll_validation(start + Duration::from_millis(700)).is_none());
    }

    #[test]
    fn malformed_text_reports_syntax_error() {
        let mut ctl = ModeController::new();
        ctl.edit_text("{\"a\":}".to_string(), Instant::now());
        match ctl.validate_now() {
            JsonStatus::Invalid(msg) => assert!(msg.contains("JSON error")),
            other => panic!("expected invalid, got {:?}", other),
        }
    }

    #[test]
    fn copy_example_switches_to_text_and_validates() {
        let mut ctl = ModeController::new();
        ctl.copy_example("{\"client_name\": \"\"}");
        assert_eq!(ctl.mode(), Mode::Text);
        assert_eq!(*ctl.status(), JsonStatus::Valid);
        assert_eq!(ctl.text(), "{\"client_name\": \"\"}");
    }
}
