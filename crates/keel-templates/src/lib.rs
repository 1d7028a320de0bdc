//! Template rendering for Keel
//!
//! The [`TemplateEngine`] trait is the seam the request layer and the
//! notifier render through; [`MiniJinjaEngine`] is the directory-backed
//! implementation.

use std::path::Path;

use thiserror::Error;

/// Errors from template lookup or rendering
#[derive(Debug, Error)]
pub enum TemplateError {
    /// No entry template was named
    #[error("no template names given")]
    Empty,

    /// Lookup or render failure in the underlying engine
    #[error("template render failed: {0}")]
    Render(#[from] minijinja::Error),

    /// Rendering was attempted without an engine configured
    #[error("no template engine configured")]
    NotConfigured,
}

/// Renders named templates with JSON-shaped data
///
/// `names` lists the templates a page is composed from; the last entry is the
/// one rendered, with earlier entries available for `{% extends %}` and
/// `{% include %}`.
pub trait TemplateEngine: Send + Sync {
    /// Render the last of `names` with `data`
    ///
    /// # Errors
    ///
    /// Returns an error if `names` is empty or the engine fails to load or
    /// render the template
    fn render(&self, names: &[&str], data: &serde_json::Value) -> Result<String, TemplateError>;
}

/// Directory-backed engine using `MiniJinja`
pub struct MiniJinjaEngine {
    env: minijinja::Environment<'static>,
}

impl MiniJinjaEngine {
    /// Create an engine loading templates from `dir`
    ///
    /// Templates are addressed by their path relative to `dir` and loaded
    /// lazily on first use.
    #[must_use]
    pub fn from_dir(dir: &Path) -> Self {
        let mut env = minijinja::Environment::new();
        env.set_loader(minijinja::path_loader(dir));
        Self { env }
    }

    /// Create an engine from the template configuration section
    #[must_use]
    pub fn from_config(config: &keel_config::TemplateConfig) -> Self {
        Self::from_dir(&config.dir)
    }
}

impl TemplateEngine for MiniJinjaEngine {
    fn render(&self, names: &[&str], data: &serde_json::Value) -> Result<String, TemplateError> {
        let entry = names.last().ok_or(TemplateError::Empty)?;
        let template = self.env.get_template(entry)?;
        Ok(template.render(data)?)
    }
}

/// Placeholder for applications that never render
///
/// Used as the default engine so rendering without configuration is a
/// classified failure instead of a construction-time requirement.
#[derive(Debug, Default)]
pub struct NullEngine;

impl TemplateEngine for NullEngine {
    fn render(&self, _names: &[&str], _data: &serde_json::Value) -> Result<String, TemplateError> {
        Err(TemplateError::NotConfigured)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine_with(templates: &[(&str, &str)]) -> (tempfile::TempDir, MiniJinjaEngine) {
        let dir = tempfile::tempdir().unwrap();
        for (name, body) in templates {
            let path = dir.path().join(name);
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent).unwrap();
            }
            std::fs::write(path, body).unwrap();
        }
        let engine = MiniJinjaEngine::from_dir(dir.path());
        (dir, engine)
    }

    #[test]
    fn renders_with_data() {
        let (_dir, engine) = engine_with(&[("hello.html", "Hello {{ name }}!")]);
        let html = engine
            .render(&["hello.html"], &serde_json::json!({ "name": "world" }))
            .unwrap();
        assert_eq!(html, "Hello world!");
    }

    #[test]
    fn last_name_is_the_entry_point() {
        let (_dir, engine) = engine_with(&[
            ("base.html", "<main>{% block body %}{% endblock %}</main>"),
            (
                "page.html",
                "{% extends \"base.html\" %}{% block body %}{{ msg }}{% endblock %}",
            ),
        ]);
        let html = engine
            .render(&["base.html", "page.html"], &serde_json::json!({ "msg": "hi" }))
            .unwrap();
        assert_eq!(html, "<main>hi</main>");
    }

    #[test]
    fn missing_template_is_an_error() {
        let (_dir, engine) = engine_with(&[]);
        let err = engine
            .render(&["absent.html"], &serde_json::Value::Null)
            .unwrap_err();
        assert!(matches!(err, TemplateError::Render(_)));
    }

    #[test]
    fn from_config_loads_the_configured_dir() {
        let (dir, _engine) = engine_with(&[("hello.html", "hi {{ name }}")]);
        let config = keel_config::TemplateConfig { dir: dir.path().to_path_buf() };

        let engine = MiniJinjaEngine::from_config(&config);
        let html = engine
            .render(&["hello.html"], &serde_json::json!({ "name": "keel" }))
            .unwrap();
        assert_eq!(html, "hi keel");
    }

    #[test]
    fn empty_name_list_is_an_error() {
        let (_dir, engine) = engine_with(&[]);
        assert!(matches!(
            engine.render(&[], &serde_json::Value::Null),
            Err(TemplateError::Empty)
        ));
    }
}
