use ammonia::Builder;
use argon2::password_hash::SaltString;
use argon2::{Argon2, PasswordHasher, PasswordVerifier};
use rand::distributions::Alphanumeric;
use rand::rngs::OsRng;
use rand::Rng;
use serde::de::DeserializeOwned;
use serde::Serialize;
use spin_sdk::http::{Request, Response};
use unicode_normalization::UnicodeNormalization;
use uuid::Uuid;

use crate::config::sequence_key;
use crate::core::errors::ApiError;
use crate::core::kv::Kv;

pub fn now_iso() -> String {
    chrono::Utc::now().to_rfc3339()
}

pub fn hash_password(password: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| anyhow::anyhow!("Failed to hash password: {}", e))
}

pub fn verify_password(password: &str, hash: &str) -> bool {
    use argon2::PasswordHash;

    let parsed_hash = match PasswordHash::new(hash) {
        Ok(h) => h,
        Err(_) => return false,
    };

    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok()
}

pub fn validate_uuid(id: &str) -> bool {
    Uuid::parse_str(id).is_ok()
}

/// Next value of a named id sequence.
pub fn next_id(store: &impl Kv, name: &str) -> anyhow::Result<u64> {
    let value = store.incr(&sequence_key(name))?;
    u64::try_from(value).map_err(|_| anyhow::anyhow!("sequence {} went negative", name))
}

/// ASCII slug: lowercase alphanumerics separated by single hyphens.
///
/// Accented letters are decomposed (NFKD) first, so `é` becomes `e`; anything
/// still outside ASCII is dropped.
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    let mut pending_dash = false;
    for c in text.nfkd() {
        if c.is_ascii_alphanumeric() || c == '_' {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c.to_ascii_lowercase());
        } else if c.is_whitespace() || c == '-' {
            pending_dash = true;
        }
    }
    slug
}

pub fn random_suffix(len: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

/// Plain text only: every tag is stripped and entities are decoded, so
/// `Fish & chips <3` is stored as typed. Escape it when rendering markup.
pub fn sanitize_text(text: &str) -> String {
    let stripped = Builder::default()
        .tags(std::collections::HashSet::new())
        .clean(text)
        .to_string();
    html_escape::decode_html_entities(&stripped).into_owned()
}

pub fn bearer_token(req: &Request) -> Option<String> {
    let auth_header = req.header("Authorization")?.as_str()?;
    auth_header.strip_prefix("Bearer ").map(str::to_string)
}

pub fn parse_json<T: DeserializeOwned>(req: &Request) -> Result<T, ApiError> {
    serde_json::from_slice(req.body())
        .map_err(|e| ApiError::BadRequest(format!("Invalid JSON body: {}", e)))
}

pub fn json<T: Serialize>(status: u16, value: &T) -> anyhow::Result<Response> {
    Ok(Response::builder()
        .status(status)
        .header("Content-Type", "application/json")
        .body(serde_json::to_vec(value)?)
        .build())
}

pub fn redirect<T: Serialize>(location: &str, value: &T) -> anyhow::Result<Response> {
    Ok(Response::builder()
        .status(302)
        .header("Location", location)
        .header("Content-Type", "application/json")
        .body(serde_json::to_vec(value)?)
        .build())
}
