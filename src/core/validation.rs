//! Field-level form checks.
//!
//! Each check appends a message to [`FormErrors`] under the field name, so a
//! handler can run every check and report all failures at once.

use regex::Regex;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::OnceLock;

use crate::config::VALID_IMAGE_EXTENSIONS;

pub const REQUIRED: &str = "This field is required.";

#[derive(Debug, Default, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct FormErrors(BTreeMap<String, Vec<String>>);

impl FormErrors {
    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0.entry(field.to_string()).or_default().push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn has(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }

    pub fn into_result(self) -> Result<(), FormErrors> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for FormErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fields: Vec<&str> = self.0.keys().map(String::as_str).collect();
        write!(f, "{}", fields.join(", "))
    }
}

fn email_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| {
        Regex::new(r"^[A-Za-z0-9.!#$%&'*+/=?^_`{|}~-]+@[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?(?:\.[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?)+$")
            .expect("Regex should compile")
    })
}

fn url_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| {
        Regex::new(r"^https?://[^\s/?#]+\.[^\s/?#]+(?::\d+)?(?:[/?#]\S*)?$|^https?://localhost(?::\d+)?(?:[/?#]\S*)?$")
            .expect("Regex should compile")
    })
}

fn username_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| Regex::new(r"^[\w.@+-]+$").expect("Regex should compile"))
}

pub fn is_valid_email(value: &str) -> bool {
    email_regex().is_match(value)
}

pub fn is_valid_url(value: &str) -> bool {
    url_regex().is_match(value)
}

pub fn required(errors: &mut FormErrors, field: &str, value: &str) -> bool {
    if value.trim().is_empty() {
        errors.add(field, REQUIRED);
        false
    } else {
        true
    }
}

pub fn max_length(errors: &mut FormErrors, field: &str, value: &str, max: usize) {
    let length = value.chars().count();
    if length > max {
        errors.add(
            field,
            format!("Ensure this value has at most {} characters (it has {}).", max, length),
        );
    }
}

/// Optional email: empty passes, anything else must look like an address.
pub fn email(errors: &mut FormErrors, field: &str, value: &str) {
    if !value.is_empty() && !is_valid_email(value) {
        errors.add(field, "Enter a valid email address.");
    }
}

pub fn required_email(errors: &mut FormErrors, field: &str, value: &str) {
    if required(errors, field, value) {
        email(errors, field, value);
    }
}

pub fn username(errors: &mut FormErrors, field: &str, value: &str) {
    if !value.is_empty() && !username_regex().is_match(value) {
        errors.add(
            field,
            "Enter a valid username. This value may contain only letters, numbers, and @/./+/-/_ characters.",
        );
    }
}

/// File extension of an image URL: whatever follows the last `.`, lowercased.
pub fn image_extension(url: &str) -> Option<String> {
    url.rsplit_once('.').map(|(_, ext)| ext.to_lowercase())
}

/// Returns the lowercased extension when the URL is acceptable.
pub fn image_url(errors: &mut FormErrors, field: &str, url: &str) -> Option<String> {
    if !required(errors, field, url) {
        return None;
    }
    max_length(errors, field, url, crate::config::MAX_IMAGE_URL_LENGTH);
    if !is_valid_url(url) {
        errors.add(field, "Enter a valid URL.");
        return None;
    }
    match image_extension(url) {
        Some(ext) if VALID_IMAGE_EXTENSIONS.contains(&ext.as_str()) => Some(ext),
        _ => {
            errors.add(field, "The given URL does not match valid image extensions.");
            None
        }
    }
}
