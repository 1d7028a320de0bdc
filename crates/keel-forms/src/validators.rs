//! Client/server validators for form controls
//!
//! Each validator carries the HTML attributes that trigger it client-side,
//! the Angular error key it reports under, the message shown to the user,
//! and a server-side predicate for revalidation.

use std::sync::OnceLock;

use regex::Regex;

type Check = Box<dyn Fn(&str) -> bool + Send + Sync>;

/// One validation rule attached to a control
pub struct Validator {
    key: &'static str,
    message: String,
    attrs: Vec<(String, String)>,
    check: Check,
}

impl Validator {
    /// Error key this validator reports under (e.g. `required`)
    #[must_use]
    pub fn key(&self) -> &'static str {
        self.key
    }

    /// User-facing message shown when the rule fails
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// HTML attributes that enable the rule client-side
    #[must_use]
    pub fn attrs(&self) -> &[(String, String)] {
        &self.attrs
    }

    /// Run the server-side predicate
    #[must_use]
    pub fn check(&self, value: &str) -> bool {
        (self.check)(value)
    }

    /// Value must be non-empty
    pub fn required(message: impl Into<String>) -> Self {
        Self {
            key: "required",
            message: message.into(),
            attrs: vec![("required".to_owned(), "required".to_owned())],
            check: Box::new(|value| !value.trim().is_empty()),
        }
    }

    /// Value must be at least `n` characters
    pub fn min_length(n: usize, message: impl Into<String>) -> Self {
        Self {
            key: "minlength",
            message: message.into(),
            attrs: vec![("ng-minlength".to_owned(), n.to_string())],
            check: Box::new(move |value| value.chars().count() >= n),
        }
    }

    /// Value must be at most `n` characters
    pub fn max_length(n: usize, message: impl Into<String>) -> Self {
        Self {
            key: "maxlength",
            message: message.into(),
            attrs: vec![("ng-maxlength".to_owned(), n.to_string())],
            check: Box::new(move |value| value.chars().count() <= n),
        }
    }

    /// Value must match a regular expression
    ///
    /// # Errors
    ///
    /// Returns the compile error when `pattern` is not a valid regex
    pub fn pattern(pattern: &str, message: impl Into<String>) -> Result<Self, regex::Error> {
        let re = Regex::new(pattern)?;
        Ok(Self {
            key: "pattern",
            message: message.into(),
            attrs: vec![("ng-pattern".to_owned(), format!("/{pattern}/"))],
            check: Box::new(move |value| re.is_match(value)),
        })
    }

    /// Value must look like an email address
    pub fn email(message: impl Into<String>) -> Self {
        Self {
            key: "email",
            message: message.into(),
            // type="email" already enables the client check
            attrs: Vec::new(),
            check: Box::new(|value| email_re().is_match(value)),
        }
    }

    /// Value must equal another field's value (client-side only)
    ///
    /// The server-side predicate always passes; cross-field comparison
    /// happens in the browser via the match directive.
    pub fn matches(other_id: &str, message: impl Into<String>) -> Self {
        Self {
            key: "match",
            message: message.into(),
            attrs: vec![("match".to_owned(), format!("data.{other_id}"))],
            check: Box::new(|_| true),
        }
    }
}

fn email_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("must be valid regex"))
}

impl std::fmt::Debug for Validator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Validator")
            .field("key", &self.key)
            .field("message", &self.message)
            .field("attrs", &self.attrs)
            .finish_non_exhaustive()
    }
}
