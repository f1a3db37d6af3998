//! Secret references in `config.toml`.
//!
//! `client_id` and `client_secret` may point outside the file:
//!
//! - `pass::path/in/store` runs `pass show path/in/store` and keeps the first line
//! - `env::VAR_NAME` reads `$VAR_NAME`
//! - anything else is the secret itself

use std::process::Command;

const PASS_PREFIX: &str = "pass::";
const ENV_PREFIX: &str = "env::";

/// A configured secret value, classified by where it lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecretRef<'a> {
    Pass(&'a str),
    Env(&'a str),
    Plain(&'a str),
}

impl<'a> SecretRef<'a> {
    pub fn parse(value: &'a str) -> Self {
        if let Some(path) = value.strip_prefix(PASS_PREFIX) {
            Self::Pass(path)
        } else if let Some(var) = value.strip_prefix(ENV_PREFIX) {
            Self::Env(var)
        } else {
            Self::Plain(value)
        }
    }

    /// Fetches the secret.
    pub fn resolve(self) -> Result<String, String> {
        match self {
            Self::Pass(path) => from_pass(path),
            Self::Env(var) => {
                std::env::var(var).map_err(|_| format!("environment variable `{}` is not set", var))
            }
            Self::Plain(value) => Ok(value.to_string()),
        }
    }

    /// Returns the value as it may be shown to the user: references verbatim,
    /// plain secrets masked.
    pub fn redacted(self) -> String {
        match self {
            Self::Pass(path) => format!("{}{}", PASS_PREFIX, path),
            Self::Env(var) => format!("{}{}", ENV_PREFIX, var),
            Self::Plain(value) if value.is_empty() => String::new(),
            Self::Plain(_) => "********".to_string(),
        }
    }
}

/// Resolves a value that may be a secret reference.
pub fn resolve(value: &str) -> Result<String, String> {
    SecretRef::parse(value).resolve()
}

fn from_pass(path: &str) -> Result<String, String> {
    let output = Command::new("pass")
        .args(["show", path])
        .output()
        .map_err(|e| format!("failed to run `pass show {}`: {}", path, e))?;

    if !output.status.success() {
        return Err(format!(
            "`pass show {}` failed ({}): {}",
            path,
            output.status,
            String::from_utf8_lossy(&output.stderr).trim()
        ));
    }

    String::from_utf8_lossy(&output.stdout)
        .lines()
        .next()
        .map(str::to_string)
        .ok_or_else(|| format!("`pass show {}` produced no output", path))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classification() {
        assert_eq!(SecretRef::parse("pass::google/quickevent"), SecretRef::Pass("google/quickevent"));
        assert_eq!(SecretRef::parse("env::QE_SECRET"), SecretRef::Env("QE_SECRET"));
        assert_eq!(SecretRef::parse("hunter2"), SecretRef::Plain("hunter2"));
        assert_eq!(SecretRef::parse("env:QE"), SecretRef::Plain("env:QE"));
    }

    #[test]
    fn plain_text_passthrough() {
        assert_eq!(resolve("xxx.apps.googleusercontent.com").unwrap(), "xxx.apps.googleusercontent.com");
        assert_eq!(resolve("").unwrap(), "");
    }

    #[test]
    fn env_reference() {
        unsafe {
            std::env::set_var("_QUICKEVENT_SECRET_TEST", "from-env");
        }
        assert_eq!(resolve("env::_QUICKEVENT_SECRET_TEST").unwrap(), "from-env");
        unsafe {
            std::env::remove_var("_QUICKEVENT_SECRET_TEST");
        }

        let err = resolve("env::_QUICKEVENT_SECRET_UNSET_4242").unwrap_err();
        assert!(err.contains("not set"));
    }

    #[test]
    fn pass_reference_failure() {
        // fails whether or not `pass` is installed
        assert!(resolve("pass::quickevent/no/such/entry/4242").is_err());
    }

    #[test]
    fn redaction() {
        assert_eq!(SecretRef::parse("hunter2").redacted(), "********");
        assert_eq!(SecretRef::parse("env::QE").redacted(), "env::QE");
        assert_eq!(SecretRef::parse("pass::a/b").redacted(), "pass::a/b");
        assert_eq!(SecretRef::parse("").redacted(), "");
    }
}
