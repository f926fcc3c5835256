use lazy_static::lazy_static;
use regex::Regex;
use serde_json::{Map, Value};

use crate::form::{FormState, WidgetRole, WidgetValue};
use crate::schema::{SchemaModel, VariableKind};

lazy_static! {
    // `items[3].amount` -> index 3, field "amount"
    static ref GROUP_FIELD_RE: Regex = Regex::new(r"\[(\d+)\]\.(.+)$").unwrap();
}

/// Reconstructs the structured data value the server expects from the live
/// form state.
///
/// Pure with respect to its two inputs: no network, no storage, no mutation.
/// Rules:
/// - every top-level Scalar widget contributes its current text, empty or not
/// - every Boolean widget contributes its toggle state
/// - every RepeatedGroup in the schema contributes an array built from its
///   surviving items in insertion order; sub-field names are recovered from
///   the widget identifier via the `index.fieldName` pattern. An item with at
///   least one present sub-field contributes an object (empty strings still
///   count as present); a free-text item contributes its raw text only when
///   non-empty; anything else is dropped silently.
///
/// # Arguments
/// * `form` - snapshot of the live form state
/// * `schema` - the schema the form was synthesized from
///
/// # Returns
/// * `Value` - a JSON object mapping variable name to string, bool or array
pub fn collect(form: &FormState, schema: &SchemaModel) -> Value {
    let mut data = Map::new();

    // Top-level scalars and toggles (identifiers without a group qualifier)
    for widget in form.widgets() {
        match (&widget.role, &widget.value) {
            (WidgetRole::Scalar { variable }, WidgetValue::Text(text)) => {
                data.insert(variable.clone(), Value::String(text.clone()));
            }
            (WidgetRole::Toggle { variable }, WidgetValue::Toggle(on)) => {
                data.insert(variable.clone(), Value::Bool(*on));
            }
            _ => {}
        }
    }

    // Repeated groups
    for var in schema.sorted_variables() {
        if var.kind != VariableKind::RepeatedGroup {
            continue;
        }
        let Some(group) = form.group(&var.name) else {
            continue;
        };

        let mut items_out = Vec::new();
        for &index in &group.items {
            if let Some(item) = collect_item(form, &var.name, index) {
                items_out.push(item);
            }
        }
        data.insert(var.name.clone(), Value::Array(items_out));
    }

    Value::Object(data)
}

/// Collects one group item, or None when it has nothing collectible.
fn collect_item(form: &FormState, group: &str, index: usize) -> Option<Value> {
    let mut fields = Map::new();
    let mut free_text = None;

    for id in form.item_widget_ids(group, index) {
        let Some(widget) = form.widget(&id) else {
            continue;
        };
        match (&widget.role, &widget.value) {
            (WidgetRole::GroupField { .. }, WidgetValue::Text(text)) => {
                // field name comes out of the identifier, not the role
                if let Some(caps) = GROUP_FIELD_RE.captures(&widget.id) {
                    if let Some(field) = caps.get(2) {
                        fields.insert(field.as_str().to_string(), Value::String(text.clone()));
                    }
                }
            }
            (WidgetRole::GroupText { .. }, WidgetValue::Text(text)) => {
                // kept as opaque text, not parsed as a structured value
                if !text.trim().is_empty() {
                    free_text = Some(text.clone());
                }
            }
            _ => {}
        }
    }

    if let Some(text) = free_text {
        Some(Value::String(text))
    } else if !fields.is_empty() {
        Some(Value::Object(fields))
    } else {
        None
    }
}
