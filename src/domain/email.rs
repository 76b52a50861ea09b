//! Email address value object.

use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;

const MAX_LEN: usize = 254;
const MAX_LOCAL_LEN: usize = 64;
const MAX_DOMAIN_LEN: usize = 253;

static EMAIL_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").expect("email pattern is valid")
});

/// A syntactically valid email address.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Email(String);

impl Email {
    pub fn parse(value: &str) -> Result<Self, String> {
        if value.is_empty() {
            return Err("email cannot be empty".into());
        }
        if value.len() > MAX_LEN {
            return Err("email too long".into());
        }
        if !EMAIL_PATTERN.is_match(value) {
            return Err("invalid email format".into());
        }
        let Some((local, domain)) = value.split_once('@') else {
            return Err("email must contain exactly one @ symbol".into());
        };
        if domain.contains('@') {
            return Err("email must contain exactly one @ symbol".into());
        }
        if local.is_empty() || local.len() > MAX_LOCAL_LEN {
            return Err(format!("local part must be between 1 and {} characters", MAX_LOCAL_LEN));
        }
        if domain.is_empty() || domain.len() > MAX_DOMAIN_LEN {
            return Err(format!("domain part must be between 1 and {} characters", MAX_DOMAIN_LEN));
        }
        if value.starts_with('.') || value.ends_with('.') {
            return Err("email cannot start or end with a dot".into());
        }
        if value.contains("..") {
            return Err("email cannot contain consecutive dots".into());
        }
        Ok(Self(value.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Email {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
