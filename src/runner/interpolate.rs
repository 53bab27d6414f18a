//! `${name}` interpolation of task arguments into config task commands
//!
//! Names are looked up in the task's arguments first, then in the process
//! environment. Unknown names are left untouched.

use crate::error::{InterpolationError, InterpolationResult};
use crate::runner::params::{ArgValue, TaskArguments};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use std::env;

static VARIABLE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\$\{([^}]+)\}").expect("valid regex"));

/// Upper bound on substitution passes, reached only by self-referencing values
const MAX_PASSES: usize = 32;

/// Interpolate task arguments and environment variables in a string
pub fn interpolate(s: &str, args: &TaskArguments) -> InterpolationResult<String> {
    let mut result = s.to_string();

    for _ in 0..MAX_PASSES {
        let mut changed = false;
        let next = VARIABLE
            .replace_all(&result, |caps: &Captures| match lookup(&caps[1], args) {
                Some(value) => {
                    changed = true;
                    value
                }
                None => caps[0].to_string(),
            })
            .into_owned();

        if !changed {
            return Ok(next);
        }
        result = next;
    }

    Err(InterpolationError::RecursiveInterpolation)
}

/// Interpolate the string values of an argument map, leaving other values as they are
pub fn interpolate_args(
    values: &TaskArguments,
    args: &TaskArguments,
) -> InterpolationResult<TaskArguments> {
    values
        .iter()
        .map(|(key, value)| {
            let value = match value {
                ArgValue::String(s) => ArgValue::String(interpolate(s, args)?),
                other => other.clone(),
            };
            Ok((key.clone(), value))
        })
        .collect()
}

fn lookup(name: &str, args: &TaskArguments) -> Option<String> {
    args.get(name)
        .map(ToString::to_string)
        .or_else(|| env::var(name).ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(pairs: &[(&str, ArgValue)]) -> TaskArguments {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_simple_interpolation() {
        let vars = args(&[("script", "scripts/deploy.sh".into())]);
        let result = interpolate("running ${script}", &vars).unwrap();
        assert_eq!(result, "running scripts/deploy.sh");
    }

    #[test]
    fn test_non_string_values() {
        let vars = args(&[
            ("runs", ArgValue::Integer(200)),
            ("ratio", ArgValue::Number(0.5)),
            ("optimize", true.into()),
        ]);
        let result =
            interpolate("--runs ${runs} --optimize=${optimize} --ratio ${ratio}", &vars).unwrap();
        assert_eq!(result, "--runs 200 --optimize=true --ratio 0.5");
    }

    #[test]
    fn test_environment_variable() {
        env::set_var("BUIDL_TEST_INTERPOLATE", "from-env");
        let result = interpolate("${BUIDL_TEST_INTERPOLATE}", &TaskArguments::new()).unwrap();
        assert_eq!(result, "from-env");
        env::remove_var("BUIDL_TEST_INTERPOLATE");
    }

    #[test]
    fn test_undefined_variable_lenient() {
        let result = interpolate("Hello, ${undefined_xyz}!", &TaskArguments::new()).unwrap();
        assert_eq!(result, "Hello, ${undefined_xyz}!");
    }

    #[test]
    fn test_nested_interpolation() {
        let vars = args(&[("inner", "value".into()), ("outer", "${inner}".into())]);
        assert_eq!(interpolate("${outer}", &vars).unwrap(), "value");
    }

    #[test]
    fn test_self_reference_is_an_error() {
        let vars = args(&[("loop", "${loop}".into())]);
        assert!(matches!(
            interpolate("${loop}", &vars),
            Err(InterpolationError::RecursiveInterpolation)
        ));
    }

    #[test]
    fn test_interpolate_args() {
        let vars = args(&[("network", "develop".into())]);
        let values = args(&[("target", "${network}".into()), ("dry", false.into())]);

        let result = interpolate_args(&values, &vars).unwrap();
        assert_eq!(result["target"], ArgValue::from("develop"));
        assert_eq!(result["dry"], ArgValue::Bool(false));
    }
}
