use serde_json::Value;
use std::collections::HashMap;

use crate::error::ClientError;

/// Kind of a template variable, as declared by the server.
///
/// Wire names are `"simple"`, `"boolean"` and `"array"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VariableKind {
    Scalar,
    Boolean,
    RepeatedGroup,
}

impl VariableKind {
    fn from_wire(kind: &str) -> Option<Self> {
        match kind {
            "simple" => Some(VariableKind::Scalar),
            "boolean" => Some(VariableKind::Boolean),
            "array" => Some(VariableKind::RepeatedGroup),
            _ => None,
        }
    }
}

/// One placeholder variable extracted from a template.
#[derive(Debug, Clone)]
pub struct Variable {
    /// Unique key of the variable inside the template
    pub name: String,

    /// Declared kind
    pub kind: VariableKind,

    /// Sub-field names, non-empty only for a RepeatedGroup with known fields
    pub fields: Vec<String>,

    /// Display-ordering hint; a missing position sorts after all positioned
    /// entries
    pub position: Option<i64>,
}

/// In-memory representation of the variable schema returned by
/// `/parse-template`.
///
/// Built once per template load and never mutated; loading a new template
/// produces a wholly new instance.
#[derive(Debug, Clone, Default)]
pub struct SchemaModel {
    vars: HashMap<String, Variable>,
}

impl SchemaModel {
    /// Parses the raw `variables` value from the server.
    ///
    /// Fails with a validation error when the value is not an object of
    /// name -> descriptor, or a descriptor carries an unrecognized `type`.
    /// Descriptor shape: `{type: "simple"|"boolean"|"array", fields?: [..],
    /// position?: n}`.
    pub fn load(raw: &Value) -> Result<Self, ClientError> {
        let map = raw.as_object().ok_or_else(|| {
            ClientError::Validation("Variable schema must be a JSON object".to_string())
        })?;

        let mut vars = HashMap::new();
        for (name, descriptor) in map {
            let desc = descriptor.as_object().ok_or_else(|| {
                ClientError::Validation(format!(
                    "Descriptor for variable '{}' must be a JSON object",
                    name
                ))
            })?;

            let kind_str = desc.get("type").and_then(Value::as_str).ok_or_else(|| {
                ClientError::Validation(format!("Variable '{}' has no type", name))
            })?;

            let kind = VariableKind::from_wire(kind_str).ok_or_else(|| {
                ClientError::Validation(format!(
                    "Unrecognized variable type '{}' for '{}'",
                    kind_str, name
                ))
            })?;

            let fields = desc
                .get("fields")
                .and_then(Value::as_array)
                .map(|list| {
                    list.iter()
                        .filter_map(Value::as_str)
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_default();

            let position = desc.get("position").and_then(Value::as_i64);

            vars.insert(
                name.clone(),
                Variable {
                    name: name.clone(),
                    kind,
                    fields,
                    position,
                },
            );
        }

        Ok(SchemaModel { vars })
    }

    pub fn get(&self, name: &str) -> Option<&Variable> {
        self.vars.get(name)
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    /// Variables in display order: primary key is the declared `position`
    /// (missing treated as +infinity), ties broken by name.
    pub fn sorted_variables(&self) -> Vec<&Variable> {
        let mut vars: Vec<&Variable> = self.vars.values().collect();
        vars.sort_by(|a, b| {
            let pa = a.position.unwrap_or(i64::MAX);
            let pb = b.position.unwrap_or(i64::MAX);
            pa.cmp(&pb).then_with(|| a.name.cmp(&b.name))
        });
        vars
    }
}
