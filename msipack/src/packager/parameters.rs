//! Packager settings: the upgrade code and `<?define ?>` overrides.
//!
//! Setters validate before mutating, so a rejected value leaves the previous
//! setting in place and the error surfaces at the call site rather than when
//! files are rendered.

use std::collections::BTreeMap;

use serde_json::Value;

use super::{PackagerError, PackagerResult};

/// Name/value overrides written to the parameters file.
pub type Parameters = BTreeMap<String, String>;

/// Constants the parameters file always defines itself.
pub const RESERVED_PARAMETERS: &[&str] = &["VersionNumber", "DisplayVersionNumber", "UpgradeCode"];

/// A value that must be configured before it is read.
///
/// Unset is tracked separately from the value, so an explicitly configured
/// empty string is still "set".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequiredAttribute<T> {
    name: &'static str,
    value: Option<T>,
}

impl<T> RequiredAttribute<T> {
    /// Create an unset attribute.
    pub const fn new(name: &'static str) -> Self {
        Self { name, value: None }
    }

    /// The attribute name used in error messages.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Whether a value has been configured.
    pub fn is_set(&self) -> bool {
        self.value.is_some()
    }

    /// Read the configured value.
    ///
    /// # Errors
    ///
    /// [`PackagerError::MissingRequiredAttribute`] if the value was never set.
    pub fn get(&self) -> PackagerResult<&T> {
        self.value
            .as_ref()
            .ok_or(PackagerError::MissingRequiredAttribute {
                attribute: self.name,
            })
    }

    /// Store a value, replacing any previous one.
    pub fn set(&mut self, value: T) {
        self.value = Some(value);
    }
}

/// Settings specific to the MSI packager.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterSet {
    upgrade_code: RequiredAttribute<String>,
    parameters: Parameters,
}

impl Default for ParameterSet {
    fn default() -> Self {
        Self {
            upgrade_code: RequiredAttribute::new("upgrade_code"),
            parameters: Parameters::new(),
        }
    }
}

impl ParameterSet {
    /// Create settings with no upgrade code and no parameters.
    pub fn new() -> Self {
        Self::default()
    }

    /// The upgrade code identifying the product family.
    ///
    /// The returned slice borrows the stored value; no copy is made.
    pub fn upgrade_code(&self) -> PackagerResult<&str> {
        self.upgrade_code.get().map(String::as_str)
    }

    /// Set the upgrade code (conventionally a GUID).
    pub fn set_upgrade_code(&mut self, code: impl Into<String>) -> PackagerResult<()> {
        let code = code.into();
        check_define_value("upgrade_code", &code)?;
        self.upgrade_code.set(code);
        Ok(())
    }

    /// Set the upgrade code from a loosely typed value.
    ///
    /// # Errors
    ///
    /// [`PackagerError::InvalidValue`] unless `value` is a string.
    pub fn set_upgrade_code_value(&mut self, value: &Value) -> PackagerResult<()> {
        match value {
            Value::String(code) => self.set_upgrade_code(code.as_str()),
            other => Err(PackagerError::InvalidValue {
                attribute: "upgrade_code",
                reason: format!("expected a string, got {}", kind(other)),
            }),
        }
    }

    /// The parameter overrides.
    pub fn parameters(&self) -> &Parameters {
        &self.parameters
    }

    /// Mutable access to the stored parameter overrides.
    ///
    /// Changes made through this reference are what the next render sees.
    /// Names are re-checked when the parameters file is written.
    pub fn parameters_mut(&mut self) -> &mut Parameters {
        &mut self.parameters
    }

    /// Replace the parameter overrides.
    ///
    /// # Errors
    ///
    /// [`PackagerError::InvalidValue`] if a name is not a preprocessor
    /// identifier, shadows one of [`RESERVED_PARAMETERS`], or a value cannot be
    /// written inside `<?define ?>`. Nothing is changed on error.
    pub fn set_parameters(&mut self, parameters: Parameters) -> PackagerResult<()> {
        validate_parameters(&parameters)?;
        self.parameters = parameters;
        Ok(())
    }

    /// Replace the parameter overrides from a loosely typed value.
    ///
    /// # Errors
    ///
    /// [`PackagerError::InvalidValue`] unless `value` is an object whose
    /// entries are all strings, plus everything [`Self::set_parameters`] checks.
    pub fn set_parameters_value(&mut self, value: &Value) -> PackagerResult<()> {
        let object = value.as_object().ok_or_else(|| PackagerError::InvalidValue {
            attribute: "parameters",
            reason: format!("expected an object, got {}", kind(value)),
        })?;

        let mut parameters = Parameters::new();
        for (name, entry) in object {
            let Value::String(entry) = entry else {
                return Err(PackagerError::InvalidValue {
                    attribute: "parameters",
                    reason: format!("value of '{}' must be a string, got {}", name, kind(entry)),
                });
            };
            parameters.insert(name.clone(), entry.clone());
        }

        self.set_parameters(parameters)
    }
}

/// Check every entry of a parameter map.
pub(crate) fn validate_parameters(parameters: &Parameters) -> PackagerResult<()> {
    for (name, value) in parameters {
        validate_name(name)?;
        check_define_value("parameters", value)?;
    }
    Ok(())
}

fn validate_name(name: &str) -> PackagerResult<()> {
    let invalid = |reason: String| PackagerError::InvalidValue {
        attribute: "parameters",
        reason,
    };

    let mut chars = name.chars();
    let starts_well = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_');
    if !starts_well || !chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.') {
        return Err(invalid(format!("'{}' is not a valid preprocessor name", name)));
    }
    if RESERVED_PARAMETERS.contains(&name) {
        return Err(invalid(format!("'{}' is defined by the packager", name)));
    }
    Ok(())
}

/// `<?define ?>` bodies are not entity-decoded, so quotes cannot be escaped.
fn check_define_value(attribute: &'static str, value: &str) -> PackagerResult<()> {
    if value.contains('"') || value.contains("?>") {
        return Err(PackagerError::InvalidValue {
            attribute,
            reason: format!("'{}' may not contain '\"' or '?>'", value),
        });
    }
    Ok(())
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
