//! `${VAR}` and `${VAR:-default}` references in string settings.
//!
//! A reference without a default fails when the variable is unset or not
//! valid UTF-8. Strings without `${` are left untouched.

use std::env::{self, VarError};

use crate::ConfigError;

/// Expand variable references in each `(field, value)` pair in place.
///
/// Stops at the first failing field; earlier fields stay expanded.
pub(crate) fn expand_in_place<'a>(
    fields: impl IntoIterator<Item = (&'static str, &'a mut String)>,
) -> Result<(), ConfigError> {
    for (field, value) in fields {
        if !value.contains("${") {
            continue;
        }
        let expanded = shellexpand::env_with_context(value.as_str(), |name| env::var(name).map(Some))
            .map_err(|e| ConfigError::EnvVar {
                field: field.to_owned(),
                message: match e.cause {
                    VarError::NotPresent => format!("${{{}}} not set", e.var_name),
                    VarError::NotUnicode(_) => format!("${{{}}} is not valid UTF-8", e.var_name),
                },
            })?
            .into_owned();
        *value = expanded;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn expand_one(field: &'static str, value: &str) -> Result<String, ConfigError> {
        let mut value = value.to_owned();
        expand_in_place([(field, &mut value)])?;
        Ok(value)
    }

    #[test]
    fn test_expands_set_variable() {
        // SAFETY: the variable name is unique to this test
        unsafe {
            env::set_var("VPAGE_EXPAND_HOST", "0.0.0.0");
        }

        assert_eq!(expand_one("server.host", "${VPAGE_EXPAND_HOST}").unwrap(), "0.0.0.0");

        unsafe {
            env::remove_var("VPAGE_EXPAND_HOST");
        }
    }

    #[test]
    fn test_default_applies_when_unset() {
        assert_eq!(
            expand_one("render.command", "node ${VPAGE_EXPAND_UNSET:-worker.mjs}").unwrap(),
            "node worker.mjs"
        );
    }

    #[test]
    fn test_unset_variable_names_field() {
        let err = expand_one("render.command", "${VPAGE_EXPAND_MISSING}").unwrap_err();

        assert!(matches!(
            err,
            ConfigError::EnvVar { ref field, ref message }
                if field == "render.command" && message == "${VPAGE_EXPAND_MISSING} not set"
        ));
    }

    #[test]
    fn test_literal_is_untouched() {
        assert_eq!(
            expand_one("render.command", "node render-worker.mjs").unwrap(),
            "node render-worker.mjs"
        );
    }

    #[test]
    fn test_stops_at_first_failing_field() {
        let mut host = "${VPAGE_EXPAND_FIRST:-localhost}".to_owned();
        let mut command = "${VPAGE_EXPAND_SECOND}".to_owned();

        let err = expand_in_place([("server.host", &mut host), ("render.command", &mut command)])
            .unwrap_err();

        assert_eq!(host, "localhost");
        assert_eq!(command, "${VPAGE_EXPAND_SECOND}");
        assert!(err.to_string().contains("render.command"));
    }
}
