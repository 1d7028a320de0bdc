//! HTML form-control builders
//!
//! Controls render as Bootstrap-style control groups wired for Angular:
//! `ng-model` bindings, per-validator attributes, and `ng-show` error spans.
//! Attribute order is deterministic (alphabetical) so rendered output is
//! stable across runs.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use thiserror::Error;

use crate::validators::Validator;

/// Misconfigured form definition
#[derive(Debug, Error)]
pub enum FormError {
    /// A validator was attached to a field type that does not support it
    #[error("validator '{validator}' not allowed on field '{field}'")]
    ValidatorNotAllowed {
        field: String,
        validator: &'static str,
    },

    /// A field type requires a validator that was not attached
    #[error("field '{field}' is missing its required '{validator}' validator")]
    MissingValidator {
        field: String,
        validator: &'static str,
    },
}

/// A renderable form field
pub trait Field {
    /// Render the field to HTML
    ///
    /// # Errors
    ///
    /// Returns an error if the field definition is inconsistent
    fn build(&self) -> Result<String, FormError>;

    /// Revalidate a submitted value server-side
    fn validate(&self, value: &str) -> bool;
}

/// Shared identity and validation rules for a labelled control
pub struct Control {
    id: String,
    label: String,
    help: Option<String>,
    validations: Vec<Validator>,
}

impl Control {
    pub fn new(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            help: None,
            validations: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }

    #[must_use]
    pub fn with_validator(mut self, validator: Validator) -> Self {
        self.validations.push(validator);
        self
    }

    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    #[must_use]
    pub fn validators(&self) -> &[Validator] {
        &self.validations
    }

    /// Run every validator against a submitted value
    #[must_use]
    pub fn validate(&self, value: &str) -> bool {
        self.validations.iter().all(|v| v.check(value))
    }

    /// Wrap a rendered control and its error block in the control group
    fn wrap(&self, control_html: &str, errors_html: &str, error_keys: &[&'static str]) -> String {
        let condition = error_keys
            .iter()
            .map(|key| format!("f.{}.$error.{key}", self.id))
            .collect::<Vec<_>>()
            .join(" || ");

        let help = self
            .help
            .as_deref()
            .map(|help| format!(r#"<span class="help-block">{help}</span>"#))
            .unwrap_or_default();

        format!(
            "<div class=\"control-group\" ng-class=\"val && ({condition}) && 'error'\">\
             <label class=\"control-label\" for=\"{id}\">{label}</label>\
             <div class=\"controls\">{control_html}{errors_html}{help}</div>\
             </div>",
            id = self.id,
            label = self.label,
        )
    }

    /// Collect validator attributes and error spans, rejecting validators the
    /// field type does not allow
    fn validation_parts(
        &self,
        allowed: &[&str],
        attrs: &mut BTreeMap<String, String>,
    ) -> Result<(String, Vec<&'static str>), FormError> {
        let mut errors = format!(
            r#"<p class="help-block error" ng-show="val && f.{}.$invalid">"#,
            self.id
        );
        let mut keys = Vec::new();

        for validator in &self.validations {
            if !allowed.contains(&validator.key()) {
                return Err(FormError::ValidatorNotAllowed {
                    field: self.id.clone(),
                    validator: validator.key(),
                });
            }

            for (name, value) in validator.attrs() {
                attrs.insert(name.clone(), value.clone());
            }
            let _ = write!(
                errors,
                r#"<span ng-show="f.{}.$error.{}">{}</span>"#,
                self.id,
                validator.key(),
                validator.message()
            );
            keys.push(validator.key());
        }

        errors.push_str("</p>");
        Ok((errors, keys))
    }

    fn require_validators(&self, needed: &[&'static str]) -> Result<(), FormError> {
        for required in needed {
            if !self.validations.iter().any(|v| v.key() == *required) {
                return Err(FormError::MissingValidator {
                    field: self.id.clone(),
                    validator: required,
                });
            }
        }
        Ok(())
    }
}

fn render_tag(name: &str, attrs: &BTreeMap<String, String>) -> String {
    let mut tag = format!("<{name}");
    for (attr, value) in attrs {
        let _ = write!(tag, r#" {attr}="{value}""#);
    }
    tag.push('>');
    tag
}

/// `<input>` flavors and the validators each allows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputKind {
    Text,
    Email,
    Password,
}

impl InputKind {
    fn as_str(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Email => "email",
            Self::Password => "password",
        }
    }

    fn allowed_validators(self) -> &'static [&'static str] {
        match self {
            Self::Text => &["required", "minlength", "maxlength", "pattern"],
            Self::Email => &["required", "email"],
            Self::Password => &["required", "minlength", "match"],
        }
    }

    /// Validators the input type cannot render without
    fn needed_validators(self) -> &'static [&'static str] {
        match self {
            Self::Email => &["email"],
            Self::Text | Self::Password => &[],
        }
    }
}

/// A single-line input control
pub struct InputField {
    pub kind: InputKind,
    pub control: Control,
    pub class: Vec<String>,
    pub disabled: bool,
    pub read_only: bool,
    pub placeholder: String,
}

impl InputField {
    #[must_use]
    pub fn new(kind: InputKind, control: Control) -> Self {
        Self {
            kind,
            control,
            class: Vec::new(),
            disabled: false,
            read_only: false,
            placeholder: String::new(),
        }
    }
}

impl Field for InputField {
    fn build(&self) -> Result<String, FormError> {
        let id = self.control.id();
        let mut attrs = BTreeMap::from([
            ("type".to_owned(), self.kind.as_str().to_owned()),
            ("id".to_owned(), id.to_owned()),
            ("name".to_owned(), id.to_owned()),
            ("placeholder".to_owned(), self.placeholder.clone()),
            ("class".to_owned(), self.class.join(" ")),
            ("ng-model".to_owned(), format!("data.{id}")),
        ]);
        if self.disabled {
            attrs.insert("disabled".to_owned(), "disabled".to_owned());
        }
        if self.read_only {
            attrs.insert("readonly".to_owned(), "readonly".to_owned());
        }

        let (errors, keys) = self
            .control
            .validation_parts(self.kind.allowed_validators(), &mut attrs)?;
        self.control.require_validators(self.kind.needed_validators())?;

        let input = render_tag("input", &attrs);
        Ok(self.control.wrap(&input, &errors, &keys))
    }

    fn validate(&self, value: &str) -> bool {
        self.control.validate(value)
    }
}

/// A `<select>` control with fixed options
pub struct SelectField {
    pub control: Control,
    pub class: Vec<String>,
    /// `(label, value)` pairs rendered as `<option>` tags
    pub options: Vec<(String, String)>,
}

impl Field for SelectField {
    fn build(&self) -> Result<String, FormError> {
        let id = self.control.id();
        let mut attrs = BTreeMap::from([
            ("id".to_owned(), id.to_owned()),
            ("name".to_owned(), id.to_owned()),
            ("ng-model".to_owned(), format!("data.{id}")),
        ]);
        if !self.class.is_empty() {
            attrs.insert("class".to_owned(), self.class.join(" "));
        }

        let (errors, keys) = self.control.validation_parts(&["required", "select"], &mut attrs)?;

        let mut select = render_tag("select", &attrs);
        for (label, value) in &self.options {
            let _ = write!(select, r#"<option value="{value}">{label}</option>"#);
        }
        select.push_str("</select>");

        Ok(self.control.wrap(&select, &errors, &keys))
    }

    fn validate(&self, value: &str) -> bool {
        self.control.validate(value)
    }
}

/// A multi-line text control
pub struct TextAreaField {
    pub control: Control,
    pub class: Vec<String>,
    pub rows: u32,
    pub placeholder: String,
}

impl Field for TextAreaField {
    fn build(&self) -> Result<String, FormError> {
        let id = self.control.id();
        let mut attrs = BTreeMap::from([
            ("id".to_owned(), id.to_owned()),
            ("name".to_owned(), id.to_owned()),
            ("placeholder".to_owned(), self.placeholder.clone()),
            ("class".to_owned(), self.class.join(" ")),
            ("ng-model".to_owned(), format!("data.{id}")),
            ("rows".to_owned(), self.rows.to_string()),
        ]);

        // Textareas accept the text-input validator set
        let (errors, keys) = self
            .control
            .validation_parts(InputKind::Text.allowed_validators(), &mut attrs)?;

        let mut textarea = render_tag("textarea", &attrs);
        textarea.push_str("</textarea>");

        Ok(self.control.wrap(&textarea, &errors, &keys))
    }

    fn validate(&self, value: &str) -> bool {
        self.control.validate(value)
    }
}

/// The submit button row, with an optional cancel link
pub struct SubmitField {
    pub label: String,
    pub cancel_url: Option<String>,
    pub cancel_label: Option<String>,
}

impl Field for SubmitField {
    fn build(&self) -> Result<String, FormError> {
        let cancel = match (&self.cancel_url, &self.cancel_label) {
            (Some(url), Some(label)) => {
                format!(r#"&nbsp;&nbsp;&nbsp;<a href="{url}" class="btn">{label}</a>"#)
            }
            _ => String::new(),
        };

        Ok(format!(
            "<div class=\"form-actions\">\
             <button ng-click=\"trySubmit(); val = true;\" class=\"btn btn-primary\" \
             ng-disabled=\"val && !f.$valid\">{}</button>{cancel}\
             </div>",
            self.label,
        ))
    }

    fn validate(&self, _value: &str) -> bool {
        true
    }
}
