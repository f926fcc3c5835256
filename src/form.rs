use std::collections::BTreeMap;

use crate::error::ClientError;
use crate::schema::{SchemaModel, VariableKind};

/// What a widget stands for. Widget identifiers already encode this through
/// the naming convention (`field_{name}`, `{name}[{index}].{field}`,
/// `{name}[{index}]`); the role is the explicit side-table entry kept next to
/// the identifier so structure recovery never depends on parsing alone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WidgetRole {
    /// Top-level text input for a Scalar variable
    Scalar { variable: String },
    /// Toggle for a Boolean variable
    Toggle { variable: String },
    /// Text input for one declared sub-field of a group item
    GroupField {
        variable: String,
        index: usize,
        field: String,
    },
    /// Free-text input of a group item that has no declared sub-fields
    GroupText { variable: String, index: usize },
}

/// Current value of a widget.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WidgetValue {
    Text(String),
    Toggle(bool),
}

/// One editable widget of the synthesized form.
#[derive(Debug, Clone)]
pub struct Widget {
    pub id: String,
    pub label: String,
    pub role: WidgetRole,
    pub value: WidgetValue,
}

/// Per-group bookkeeping: declared sub-field names and the live item indices
/// in insertion order. Indices are opaque identifiers; removals leave gaps
/// and survivors are never renumbered.
#[derive(Debug, Clone, Default)]
pub struct GroupState {
    pub fields: Vec<String>,
    pub items: Vec<usize>,
}

/// The live editable input tree synthesized from a SchemaModel.
///
/// One leaf widget per Scalar/Boolean variable, one repeatable list of
/// labeled sub-groups per RepeatedGroup variable. Owned by the page session;
/// discarded wholesale when a new template loads.
#[derive(Debug, Clone, Default)]
pub struct FormState {
    order: Vec<String>,
    widgets: BTreeMap<String, Widget>,
    groups: BTreeMap<String, GroupState>,
}

/// Human-readable label for a variable or field name: underscores become
/// spaces and each word is capitalized (`client_name` -> `Client Name`).
pub fn humanize_label(name: &str) -> String {
    name.split('_')
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

/// Identifier of the widget for a top-level Scalar or Boolean variable.
pub fn scalar_widget_id(name: &str) -> String {
    format!("field_{}", name)
}

/// Identifier of a declared sub-field widget inside a group item.
pub fn group_field_id(group: &str, index: usize, field: &str) -> String {
    format!("{}[{}].{}", group, index, field)
}

/// Identifier of the free-text widget of a group item without declared
/// sub-fields.
pub fn group_text_id(group: &str, index: usize) -> String {
    format!("{}[{}]", group, index)
}

impl FormState {
    /// Builds the editable input tree for a schema.
    ///
    /// Variables are visited in the schema's display order. Every
    /// RepeatedGroup starts out with exactly one eagerly added item.
    pub fn synthesize(schema: &SchemaModel) -> FormState {
        let mut form = FormState::default();

        for var in schema.sorted_variables() {
            form.order.push(var.name.clone());
            match var.kind {
                VariableKind::Scalar => {
                    let id = scalar_widget_id(&var.name);
                    form.widgets.insert(
                        id.clone(),
                        Widget {
                            id,
                            label: humanize_label(&var.name),
                            role: WidgetRole::Scalar {
                                variable: var.name.clone(),
                            },
                            value: WidgetValue::Text(String::new()),
                        },
                    );
                }
                VariableKind::Boolean => {
                    let id = scalar_widget_id(&var.name);
                    form.widgets.insert(
                        id.clone(),
                        Widget {
                            id,
                            label: humanize_label(&var.name),
                            role: WidgetRole::Toggle {
                                variable: var.name.clone(),
                            },
                            value: WidgetValue::Toggle(false),
                        },
                    );
                }
                VariableKind::RepeatedGroup => {
                    form.groups.insert(
                        var.name.clone(),
                        GroupState {
                            fields: var.fields.clone(),
                            items: Vec::new(),
                        },
                    );
                    // first item is synthesized eagerly
                    let _ = form.add_item(&var.name);
                }
            }
        }

        form
    }

    pub fn variables(&self) -> &[String] {
        &self.order
    }

    pub fn widget(&self, id: &str) -> Option<&Widget> {
        self.widgets.get(id)
    }

    pub fn widgets(&self) -> impl Iterator<Item = &Widget> {
        self.widgets.values()
    }

    pub fn group(&self, name: &str) -> Option<&GroupState> {
        self.groups.get(name)
    }

    /// Widget identifiers belonging to one group item, in declared field
    /// order. Derived purely from the naming convention.
    pub fn item_widget_ids(&self, group: &str, index: usize) -> Vec<String> {
        match self.groups.get(group) {
            Some(state) if !state.fields.is_empty() => state
                .fields
                .iter()
                .map(|field| group_field_id(group, index, field))
                .collect(),
            Some(_) => vec![group_text_id(group, index)],
            None => Vec::new(),
        }
    }

    /// Appends a new item to a group and returns its index.
    ///
    /// The fresh index starts at the current item count and is bumped past
    /// any index still live after removals, so identifiers stay unique.
    pub fn add_item(&mut self, group: &str) -> Result<usize, ClientError> {
        let state = self.groups.get(group).ok_or_else(|| {
            ClientError::Validation(format!("No such group variable: {}", group))
        })?;

        let mut index = state.items.len();
        while state.items.contains(&index) {
            index += 1;
        }

        let fields = state.fields.clone();
        if fields.is_empty() {
            let id = group_text_id(group, index);
            self.widgets.insert(
                id.clone(),
                Widget {
                    id,
                    label: "Data (JSON)".to_string(),
                    role: WidgetRole::GroupText {
                        variable: group.to_string(),
                        index,
                    },
                    value: WidgetValue::Text(String::new()),
                },
            );
        } else {
            for field in &fields {
                let id = group_field_id(group, index, field);
                self.widgets.insert(
                    id.clone(),
                    Widget {
                        id,
                        label: humanize_label(field),
                        role: WidgetRole::GroupField {
                            variable: group.to_string(),
                            index,
                            field: field.clone(),
                        },
                        value: WidgetValue::Text(String::new()),
                    },
                );
            }
        }

        self.groups
            .get_mut(group)
            .expect("group checked above")
            .items
            .push(index);
        Ok(index)
    }

    /// Deletes one item by its assigned index. Sibling indices keep their
    /// values; the gap is tolerated downstream.
    pub fn remove_item(&mut self, group: &str, index: usize) -> Result<(), ClientError> {
        let state = self.groups.get_mut(group).ok_or_else(|| {
            ClientError::Validation(format!("No such group variable: {}", group))
        })?;

        let before = state.items.len();
        state.items.retain(|&i| i != index);
        if state.items.len() == before {
            return Err(ClientError::Validation(format!(
                "Group '{}' has no item {}",
                group, index
            )));
        }

        self.widgets.retain(|_, w| match &w.role {
            WidgetRole::GroupField {
                variable, index: i, ..
            }
            | WidgetRole::GroupText { variable, index: i } => {
                !(variable == group && *i == index)
            }
            _ => true,
        });
        Ok(())
    }

    /// Sets the text of any text-holding widget.
    pub fn set_text(&mut self, id: &str, value: &str) -> Result<(), ClientError> {
        let widget = self
            .widgets
            .get_mut(id)
            .ok_or_else(|| ClientError::Validation(format!("No such field: {}", id)))?;
        match &mut widget.value {
            WidgetValue::Text(text) => {
                *text = value.to_string();
                Ok(())
            }
            WidgetValue::Toggle(_) => Err(ClientError::Validation(format!(
                "Field {} is a checkbox, not a text input",
                id
            ))),
        }
    }

    /// Sets a Boolean variable's toggle state.
    pub fn set_toggle(&mut self, id: &str, on: bool) -> Result<(), ClientError> {
        let widget = self
            .widgets
            .get_mut(id)
            .ok_or_else(|| ClientError::Validation(format!("No such field: {}", id)))?;
        match &mut widget.value {
            WidgetValue::Toggle(state) => {
                *state = on;
                Ok(())
            }
            WidgetValue::Text(_) => Err(ClientError::Validation(format!(
                "Field {} is a text input, not a checkbox",
                id
            ))),
        }
    }

    /// Convenience setter addressing a scalar by variable name.
    pub fn set_scalar(&mut self, variable: &str, value: &str) -> Result<(), ClientError> {
        self.set_text(&scalar_widget_id(variable), value)
    }

    /// Convenience setter addressing a group item field directly.
    pub fn set_group_field(
        &mut self,
        group: &str,
        index: usize,
        field: &str,
        value: &str,
    ) -> Result<(), ClientError> {
        self.set_text(&group_field_id(group, index, field), value)
    }
}
