use std::sync::OnceLock;

use regex::Regex;

fn placeholder() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // `{{ env.VAR }}` with an optional `| default("fallback")` clause
    RE.get_or_init(|| {
        Regex::new(r#"\{\{\s*env\.([A-Za-z0-9_]+)\s*(?:\|\s*default\("([^"]*)"\))?\s*\}\}"#)
            .expect("must be valid regex")
    })
}

fn any_placeholder() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\{\{\s*([A-Za-z0-9_.]+)[^}]*\}\}").expect("must be valid regex"))
}

/// Expand `{{ env.VAR }}` placeholders in a raw TOML string
///
/// When the variable is unset, an optional `{{ env.VAR | default("x") }}`
/// fallback is used; without one, expansion fails. TOML comment lines pass
/// through unexpanded. Any surviving placeholder with a scope other than
/// `env.` is rejected.
pub fn expand_env(input: &str) -> Result<String, String> {
    let mut output = String::with_capacity(input.len());

    for line in input.split_inclusive('\n') {
        if line.trim_start().starts_with('#') {
            output.push_str(line);
            continue;
        }

        let mut failure: Option<String> = None;
        let expanded = placeholder().replace_all(line, |caps: &regex::Captures<'_>| {
            let var = &caps[1];
            match std::env::var(var) {
                Ok(value) => value,
                Err(_) => caps.get(2).map_or_else(
                    || {
                        failure = Some(format!("environment variable not found: `{var}`"));
                        String::new()
                    },
                    |default| default.as_str().to_owned(),
                ),
            }
        });
        if let Some(message) = failure {
            return Err(message);
        }

        if let Some(caps) = any_placeholder().captures(&expanded) {
            return Err(format!(
                "only variables scoped with 'env.' are supported: `{}`",
                &caps[1]
            ));
        }

        output.push_str(&expanded);
    }

    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_is_untouched() {
        let input = "key = \"value\"\n";
        assert_eq!(expand_env(input).unwrap(), input);
    }

    #[test]
    fn expands_set_variable() {
        temp_env::with_var("KEEL_TEST_VAR", Some("hello"), || {
            let result = expand_env("key = \"{{ env.KEEL_TEST_VAR }}\"").unwrap();
            assert_eq!(result, "key = \"hello\"");
        });
    }

    #[test]
    fn missing_variable_fails() {
        temp_env::with_var_unset("KEEL_MISSING_VAR", || {
            let err = expand_env("key = \"{{ env.KEEL_MISSING_VAR }}\"").unwrap_err();
            assert!(err.contains("KEEL_MISSING_VAR"));
        });
    }

    #[test]
    fn default_covers_missing_variable() {
        temp_env::with_var_unset("KEEL_MISSING_VAR", || {
            let result =
                expand_env("key = \"{{ env.KEEL_MISSING_VAR | default(\"fallback\") }}\"").unwrap();
            assert_eq!(result, "key = \"fallback\"");
        });
    }

    #[test]
    fn set_variable_wins_over_default() {
        temp_env::with_var("KEEL_TEST_VAR", Some("actual"), || {
            let result =
                expand_env("key = \"{{ env.KEEL_TEST_VAR | default(\"fallback\") }}\"").unwrap();
            assert_eq!(result, "key = \"actual\"");
        });
    }

    #[test]
    fn comment_lines_are_skipped() {
        temp_env::with_var_unset("KEEL_MISSING_VAR", || {
            let input = "# key = \"{{ env.KEEL_MISSING_VAR }}\"\n";
            assert_eq!(expand_env(input).unwrap(), input);
        });
    }

    #[test]
    fn non_env_scope_is_rejected() {
        let err = expand_env("key = \"{{ secrets.FOO }}\"").unwrap_err();
        assert!(err.contains("only variables scoped with 'env.'"));
    }
}
