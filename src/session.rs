use std::time::Instant;

use serde_json::Value;

use crate::error::ClientError;
use crate::form::FormState;
use crate::mapper;
use crate::mode::{Mode, ModeController};
use crate::schema::SchemaModel;
use crate::validate::{self, JsonStatus};

/// A template file the user picked locally, held until generation.
#[derive(Debug, Clone)]
pub struct LocalTemplate {
    pub filename: String,
    pub bytes: Vec<u8>,
}

/// Every way the page state can change. All mutation flows through
/// `PageSession::apply`, so handlers never share hidden mutable globals.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// The user picked a local file (already validated client-side)
    FileSelected { filename: String, bytes: Vec<u8> },
    /// `/parse-template` (or `/templates/{id}`) answered with a schema
    TemplateParsed {
        variables: Value,
        template_file: String,
    },
    /// The user cleared the selected file
    FileCleared,
    /// Explicit mode toggle
    ModeSwitched(Mode),
    /// Text typed into a top-level or group text widget
    TextEdited { widget_id: String, value: String },
    /// A Boolean toggle flipped
    ToggleEdited { widget_id: String, on: bool },
    /// "Add item" on a group container
    GroupItemAdded { group: String },
    /// "Remove item" on one group item
    GroupItemRemoved { group: String, index: usize },
    /// A keystroke in the raw JSON text area
    JsonEdited { text: String, at: Instant },
    /// The explicit "copy example" action
    ExampleCopied,
    /// A generate request went out
    GenerateStarted,
    /// The generate request finished, successfully or not
    GenerateFinished,
}

/// Owner of all per-page state: the selected file, the server-side template
/// reference, the loaded schema, the synthesized form and the mode
/// controller. One instance per page session; a new template load discards
/// the previous schema and form entirely.
#[derive(Debug, Clone, Default)]
pub struct PageSession {
    uploaded_file: Option<LocalTemplate>,
    template_file: Option<String>,
    schema: Option<SchemaModel>,
    form: Option<FormState>,
    mode: ModeController,
    generate_in_flight: bool,
}

impl PageSession {
    pub fn new() -> Self {
        PageSession::default()
    }

    pub fn uploaded_file(&self) -> Option<&LocalTemplate> {
        self.uploaded_file.as_ref()
    }

    /// Server-side session filename, once a template was parsed.
    pub fn template_file(&self) -> Option<&str> {
        self.template_file.as_deref()
    }

    pub fn schema(&self) -> Option<&SchemaModel> {
        self.schema.as_ref()
    }

    pub fn form(&self) -> Option<&FormState> {
        self.form.as_ref()
    }

    pub fn mode(&self) -> Mode {
        self.mode.mode()
    }

    pub fn json_text(&self) -> &str {
        self.mode.text()
    }

    pub fn json_status(&self) -> &JsonStatus {
        self.mode.status()
    }

    pub fn generate_in_flight(&self) -> bool {
        self.generate_in_flight
    }

    pub fn has_template(&self) -> bool {
        self.uploaded_file.is_some() || self.template_file.is_some()
    }

    fn form_mut(&mut self) -> Result<&mut FormState, ClientError> {
        self.form
            .as_mut()
            .ok_or_else(|| ClientError::Validation("Please upload a DOCX template".to_string()))
    }

    /// Central state-update function.
    pub fn apply(&mut self, event: SessionEvent) -> Result<(), ClientError> {
        match event {
            SessionEvent::FileSelected { filename, bytes } => {
                validate::validate_template_file(&filename, bytes.len() as u64)?;
                self.uploaded_file = Some(LocalTemplate { filename, bytes });
                Ok(())
            }
            SessionEvent::TemplateParsed {
                variables,
                template_file,
            } => {
                let schema = SchemaModel::load(&variables)?;
                self.form = Some(FormState::synthesize(&schema));
                self.schema = Some(schema);
                self.template_file = Some(template_file);
                self.mode.reset_to_form();
                Ok(())
            }
            SessionEvent::FileCleared => {
                self.uploaded_file = None;
                self.template_file = None;
                self.schema = None;
                self.form = None;
                Ok(())
            }
            SessionEvent::ModeSwitched(mode) => {
                self.mode.set_mode(mode);
                Ok(())
            }
            SessionEvent::TextEdited { widget_id, value } => {
                self.form_mut()?.set_text(&widget_id, &value)
            }
            SessionEvent::ToggleEdited { widget_id, on } => {
                self.form_mut()?.set_toggle(&widget_id, on)
            }
            SessionEvent::GroupItemAdded { group } => {
                self.form_mut()?.add_item(&group).map(|_| ())
            }
            SessionEvent::GroupItemRemoved { group, index } => {
                self.form_mut()?.remove_item(&group, index)
            }
            SessionEvent::JsonEdited { text, at } => {
                self.mode.edit_text(text, at);
                Ok(())
            }
            SessionEvent::ExampleCopied => {
                let example = self.example_payload()?;
                let pretty = serde_json::to_string_pretty(&example)
                    .map_err(|e| ClientError::Validation(format!("JSON error: {}", e)))?;
                self.mode.copy_example(&pretty);
                Ok(())
            }
            SessionEvent::GenerateStarted => {
                if self.generate_in_flight {
                    return Err(ClientError::Validation(
                        "A document is already being generated".to_string(),
                    ));
                }
                self.generate_in_flight = true;
                Ok(())
            }
            SessionEvent::GenerateFinished => {
                self.generate_in_flight = false;
                Ok(())
            }
        }
    }

    /// Runs the debounced JSON validation if due.
    pub fn poll_validation(&mut self, now: Instant) -> Option<&JsonStatus> {
        self.mode.poll_validation(now)
    }

    /// Example payload for the loaded schema: what an untouched form would
    /// submit. Used by the "copy example" action.
    pub fn example_payload(&self) -> Result<Value, ClientError> {
        let schema = self
            .schema
            .as_ref()
            .ok_or_else(|| ClientError::Validation("Please upload a DOCX template".to_string()))?;
        let blank = FormState::synthesize(schema);
        Ok(mapper::collect(&blank, schema))
    }

    /// Builds the `data` payload for `/generate` from whichever mode is
    /// active: the collected form in form mode, the validated text buffer in
    /// text mode. Reads a snapshot of the form so later edits cannot bleed
    /// into an in-flight submission.
    pub fn collect_payload(&self) -> Result<String, ClientError> {
        match self.mode.mode() {
            Mode::Form => {
                let schema = self.schema.as_ref().ok_or_else(|| {
                    ClientError::Validation("Please upload a DOCX template".to_string())
                })?;
                let form = self.form.as_ref().ok_or_else(|| {
                    ClientError::Validation("Please upload a DOCX template".to_string())
                })?;
                let snapshot = form.clone();
                let data = mapper::collect(&snapshot, schema);
                serde_json::to_string_pretty(&data)
                    .map_err(|e| ClientError::Validation(format!("JSON error: {}", e)))
            }
            Mode::Text => {
                let text = self.mode.text().trim().to_string();
                if text.is_empty() {
                    return Err(ClientError::Validation(
                        "Please enter JSON data".to_string(),
                    ));
                }
                match validate::validate_json_text(&text) {
                    JsonStatus::Valid => Ok(text),
                    JsonStatus::Invalid(msg) => Err(ClientError::Validation(msg)),
                    JsonStatus::Empty => Err(ClientError::Validation(
                        "Please enter JSON data".to_string(),
                    )),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parsed_session() -> PageSession {
        let mut session = PageSession::new();
        session
            .apply(SessionEvent::TemplateParsed {
                variables: json!({
                    "client_name": {"type": "simple", "position": 1},
                    "paid": {"type": "boolean", "position": 2},
                    "items": {"type": "array", "fields": ["desc", "amount"], "position": 3},
                }),
                template_file: "session_20250101_invoice.docx".to_string(),
            })
            .unwrap();
        session
    }

    #[test]
    fn file_selection_is_validated() {
        let mut session = PageSession::new();
        let err = session.apply(SessionEvent::FileSelected {
            filename: "invoice.pdf".to_string(),
            bytes: vec![1, 2, 3],
        });
        assert!(err.is_err());
        assert!(session.uploaded_file().is_none());

        session
            .apply(SessionEvent::FileSelected {
                filename: "invoice.docx".to_string(),
                bytes: vec![1, 2, 3],
            })
            .unwrap();
        assert!(session.has_template());
    }

    #[test]
    fn template_load_replaces_schema_and_resets_mode() {
        let mut session = parsed_session();
        session.apply(SessionEvent::ModeSwitched(Mode::Text)).unwrap();

        session
            .apply(SessionEvent::TemplateParsed {
                variables: json!({"city": {"type": "simple"}}),
                template_file: "session_other.docx".to_string(),
            })
            .unwrap();

        assert_eq!(session.mode(), Mode::Form);
        assert_eq!(session.schema().unwrap().len(), 1);
        assert!(session.form().unwrap().widget("field_city").is_some());
        assert!(session.form().unwrap().widget("field_client_name").is_none());
    }

    #[test]
    fn clearing_discards_everything() {
        let mut session = parsed_session();
        session.apply(SessionEvent::FileCleared).unwrap();
        assert!(!session.has_template());
        assert!(session.schema().is_none());
        assert!(session.form().is_none());
    }

    #[test]
    fn mode_toggles_never_discard_the_other_side() {
        let mut session = parsed_session();
        session
            .apply(SessionEvent::TextEdited {
                widget_id: "field_client_name".to_string(),
                value: "Acme".to_string(),
            })
            .unwrap();
        session
            .apply(SessionEvent::JsonEdited {
                text: "{\"raw\": 1}".to_string(),
                at: Instant::now(),
            })
            .unwrap();

        session.apply(SessionEvent::ModeSwitched(Mode::Text)).unwrap();
        session.apply(SessionEvent::ModeSwitched(Mode::Form)).unwrap();

        // both sides kept their data across the round trip
        assert_eq!(session.json_text(), "{\"raw\": 1}");
        let payload: Value =
            serde_json::from_str(&session.collect_payload().unwrap()).unwrap();
        assert_eq!(payload["client_name"], "Acme");
    }

    #[test]
    fn payload_comes_from_the_active_mode() {
        let mut session = parsed_session();
        session
            .apply(SessionEvent::TextEdited {
                widget_id: "field_client_name".to_string(),
                value: "Acme".to_string(),
            })
            .unwrap();

        session.apply(SessionEvent::ModeSwitched(Mode::Text)).unwrap();
        session
            .apply(SessionEvent::JsonEdited {
                text: "{\"client_name\": \"Other\"}".to_string(),
                at: Instant::now(),
            })
            .unwrap();
        assert_eq!(session.collect_payload().unwrap(), "{\"client_name\": \"Other\"}");

        session.apply(SessionEvent::ModeSwitched(Mode::Form)).unwrap();
        let payload: Value =
            serde_json::from_str(&session.collect_payload().unwrap()).unwrap();
        assert_eq!(payload["client_name"], "Acme");
    }

    #[test]
    fn malformed_text_blocks_submission() {
        let mut session = parsed_session();
        session.apply(SessionEvent::ModeSwitched(Mode::Text)).unwrap();
        session
            .apply(SessionEvent::JsonEdited {
                text: "{\"a\":}".to_string(),
                at: Instant::now(),
            })
            .unwrap();

        match session.collect_payload() {
            Err(ClientError::Validation(msg)) => assert!(msg.contains("JSON error")),
            other => panic!("expected validation failure, got {:?}", other),
        }
    }

    #[test]
    fn only_one_generate_in_flight() {
        let mut session = parsed_session();
        session.apply(SessionEvent::GenerateStarted).unwrap();
        assert!(session.apply(SessionEvent::GenerateStarted).is_err());
        session.apply(SessionEvent::GenerateFinished).unwrap();
        session.apply(SessionEvent::GenerateStarted).unwrap();
    }

    #[test]
    fn example_payload_matches_untouched_form() {
        let session = parsed_session();
        assert_eq!(
            session.example_payload().unwrap(),
            json!({
                "client_name": "",
                "paid": false,
                "items": [{"desc": "", "amount": ""}],
            })
        );
    }

    #[test]
    fn copy_example_switches_to_text_mode() {
        let mut session = parsed_session();
        session.apply(SessionEvent::ExampleCopied).unwrap();
        assert_eq!(session.mode(), Mode::Text);
        assert_eq!(*session.json_status(), JsonStatus::Valid);
        assert!(session.json_text().contains("client_name"));
    }
}
