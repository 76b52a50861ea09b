//! Public display name value object.

use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;

const MIN_LEN: usize = 3;
const MAX_LEN: usize = 15;

static NAME_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-zA-Z0-9._-]+$").expect("public name pattern is valid"));

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PublicName(String);

impl PublicName {
    pub fn parse(value: &str) -> Result<Self, String> {
        if value.len() < MIN_LEN || value.len() > MAX_LEN {
            return Err(format!("public name must be between {} and {} characters", MIN_LEN, MAX_LEN));
        }
        if !NAME_PATTERN.is_match(value) {
            return Err("public name must contain only Latin letters, digits, and special characters".into());
        }
        Ok(Self(value.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PublicName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
