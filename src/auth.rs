use chrono::Utc;
use serde::Deserialize;
use spin_sdk::http::Request;
use uuid::Uuid;

use crate::config::*;
use crate::core::errors::{ApiError, HandlerResult};
use crate::core::helpers::{
    bearer_token, hash_password, json, now_iso, parse_json, sanitize_text, verify_password,
};
use crate::core::kv::Kv;
use crate::core::validation::{self, FormErrors};
use crate::models::models::{Profile, ResetToken, TokenData, User};
use crate::users::{build_user_json, find_user_by_email, find_user_by_username, save_user};

#[derive(Deserialize, Default)]
#[serde(default)]
pub struct RegistrationForm {
    pub username: String,
    pub first_name: String,
    pub email: String,
    pub password: String,
    pub password2: String,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct LoginForm {
    username: String,
    password: String,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct PasswordChangeForm {
    old_password: String,
    new_password1: String,
    new_password2: String,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct PasswordResetForm {
    email: String,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct PasswordResetConfirmForm {
    token: String,
    new_password1: String,
    new_password2: String,
}

fn check_new_password(
    errors: &mut FormErrors,
    field: &str,
    password: &str,
    confirmation: &str,
    confirmation_field: &str,
) {
    if !validation::required(errors, field, password) {
        return;
    }
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        errors.add(
            field,
            format!("This password is too short. It must contain at least {} characters.", MIN_PASSWORD_LENGTH),
        );
    }
    if password != confirmation {
        errors.add(confirmation_field, "Passwords don't match.");
    }
}

fn age_hours(created_at: &str) -> Option<i64> {
    let created = chrono::DateTime::parse_from_rfc3339(created_at).ok()?;
    Some((Utc::now() - created.with_timezone(&Utc)).num_hours())
}

pub fn issue_token(store: &impl Kv, user_id: &str) -> anyhow::Result<String> {
    let token = Uuid::new_v4().to_string();
    let data = TokenData {
        user_id: user_id.to_string(),
        created_at: now_iso(),
    };
    store.set_json(&token_key(&token), &data)?;

    let mut tokens = live_tokens(store)?;
    tokens.push(token.clone());
    store.set_json(TOKENS_LIST_KEY, &tokens)?;
    Ok(token)
}

fn is_expired(created_at: &str) -> bool {
    age_hours(created_at).map_or(false, |age| age > token_expiration_hours())
}

/// Session tokens that are still usable; expired ones are deleted on the way.
fn live_tokens(store: &impl Kv) -> anyhow::Result<Vec<String>> {
    let all_tokens: Vec<String> = store.get_json(TOKENS_LIST_KEY)?.unwrap_or_default();
    let mut live = Vec::with_capacity(all_tokens.len());
    for token in all_tokens {
        let key = token_key(&token);
        match store.get_json::<TokenData>(&key)? {
            Some(data) if is_expired(&data.created_at) => store.delete(&key)?,
            Some(_) => live.push(token),
            None => {}
        }
    }
    Ok(live)
}

/// Deletes every session token belonging to `user_id`.
pub fn revoke_tokens(store: &impl Kv, user_id: &str) -> anyhow::Result<()> {
    let all_tokens: Vec<String> = store.get_json(TOKENS_LIST_KEY)?.unwrap_or_default();
    let mut kept = Vec::with_capacity(all_tokens.len());
    for token in all_tokens {
        let key = token_key(&token);
        match store.get_json::<TokenData>(&key)? {
            Some(data) if data.user_id == user_id => store.delete(&key)?,
            Some(_) => kept.push(token),
            // Already logged out
            None => {}
        }
    }
    store.set_json(TOKENS_LIST_KEY, &kept)?;
    Ok(())
}

pub fn validate_token(store: &impl Kv, req: &Request) -> Option<String> {
    let token = bearer_token(req)?;
    let data = store.get_json::<TokenData>(&token_key(&token)).ok()??;
    // Check if token is expired
    if let Some(age) = age_hours(&data.created_at) {
        if age > token_expiration_hours() {
            return None;
        }
    }
    // Check if user still exists
    if store.get_json::<User>(&user_key(&data.user_id)).ok()?.is_none() {
        return None;
    }
    Some(data.user_id)
}

/// The authenticated user, or `Unauthorized`.
pub fn require_user(store: &impl Kv, req: &Request) -> Result<User, ApiError> {
    let user_id = validate_token(store, req).ok_or(ApiError::Unauthorized)?;
    store
        .get_json::<User>(&user_key(&user_id))?
        .ok_or(ApiError::Unauthorized)
}

pub fn create_user(store: &impl Kv, form: RegistrationForm) -> Result<User, ApiError> {
    let mut errors = FormErrors::default();
    if validation::required(&mut errors, "username", &form.username) {
        validation::max_length(&mut errors, "username", &form.username, MAX_USERNAME_LENGTH);
        validation::username(&mut errors, "username", &form.username);
    }
    validation::max_length(&mut errors, "first_name", &form.first_name, MAX_NAME_LENGTH);
    validation::max_length(&mut errors, "email", &form.email, MAX_EMAIL_LENGTH);
    validation::email(&mut errors, "email", &form.email);
    check_new_password(&mut errors, "password", &form.password, &form.password2, "password2");

    if !errors.has("email") && !form.email.is_empty() && find_user_by_email(store, &form.email)?.is_some() {
        errors.add("email", "Email already in use.");
    }
    errors.into_result()?;

    if find_user_by_username(store, &form.username)?.is_some() {
        return Err(ApiError::Conflict("A user with that username already exists.".to_string()));
    }

    let user = User {
        id: Uuid::new_v4().to_string(),
        username: form.username,
        password: hash_password(&form.password)?,
        first_name: sanitize_text(form.first_name.trim()),
        last_name: String::new(),
        email: form.email.trim().to_string(),
        date_joined: Utc::now(),
    };
    save_user(store, &user)?;

    let mut users: Vec<String> = store.get_json(USERS_LIST_KEY)?.unwrap_or_default();
    users.push(user.id.clone());
    store.set_json(USERS_LIST_KEY, &users)?;

    let profile = Profile {
        user_id: user.id.clone(),
        ..Profile::default()
    };
    store.set_json(&profile_key(&user.id), &profile)?;

    tracing::info!(user_id = %user.id, username = %user.username, "registered user");
    Ok(user)
}

pub fn register(store: &impl Kv, req: Request) -> HandlerResult {
    let form: RegistrationForm = parse_json(&req)?;
    let user = create_user(store, form)?;
    Ok(json(201, &build_user_json(&user))?)
}

pub fn login_user(store: &impl Kv, req: Request) -> HandlerResult {
    let form: LoginForm = parse_json(&req)?;

    let mut errors = FormErrors::default();
    validation::required(&mut errors, "username", &form.username);
    validation::required(&mut errors, "password", &form.password);
    errors.into_result()?;

    match find_user_by_username(store, &form.username)? {
        Some(user) if verify_password(&form.password, &user.password) => {
            let token = issue_token(store, &user.id)?;
            tracing::info!(user_id = %user.id, "user logged in");
            let resp = serde_json::json!({
                "token": token,
                "user_id": user.id
            });
            Ok(json(200, &resp)?)
        }
        _ => {
            tracing::warn!(username = %form.username, "rejected login");
            Ok(json(401, &serde_json::json!({"error": "Invalid login"}))?)
        }
    }
}

pub fn logout_user(store: &impl Kv, req: Request) -> HandlerResult {
    let token = bearer_token(&req).ok_or(ApiError::Unauthorized)?;
    store.delete(&token_key(&token))?;

    let mut tokens: Vec<String> = store.get_json(TOKENS_LIST_KEY)?.unwrap_or_default();
    tokens.retain(|t| t != &token);
    store.set_json(TOKENS_LIST_KEY, &tokens)?;

    let resp = serde_json::json!({
        "message": "Logged out successfully"
    });
    Ok(json(200, &resp)?)
}

pub fn password_change(store: &impl Kv, req: Request) -> HandlerResult {
    let mut user = require_user(store, &req)?;
    let form: PasswordChangeForm = parse_json(&req)?;

    let mut errors = FormErrors::default();
    if validation::required(&mut errors, "old_password", &form.old_password)
        && !verify_password(&form.old_password, &user.password)
    {
        errors.add(
            "old_password",
            "Your old password was entered incorrectly. Please enter it again.",
        );
    }
    check_new_password(&mut errors, "new_password1", &form.new_password1, &form.new_password2, "new_password2");
    errors.into_result()?;

    user.password = hash_password(&form.new_password1)?;
    save_user(store, &user)?;

    // Every other session is invalidated, the caller gets a fresh token
    revoke_tokens(store, &user.id)?;
    let token = issue_token(store, &user.id)?;
    tracing::info!(user_id = %user.id, "password changed");

    let mut response_data = build_user_json(&user);
    response_data["token"] = serde_json::Value::String(token);
    Ok(json(200, &response_data)?)
}

/// Stores a single-use reset token for `user_id` and returns it.
pub fn issue_reset_token(store: &impl Kv, user_id: &str) -> anyhow::Result<String> {
    let token = Uuid::new_v4().to_string();
    let data = ResetToken {
        user_id: user_id.to_string(),
        created_at: now_iso(),
    };
    store.set_json(&reset_key(&token), &data)?;
    Ok(token)
}

/// Where the reset mail points: `GET` checks the token, `POST` sets the password.
pub fn reset_link(token: &str) -> String {
    format!("{}/password-reset/{}/", site_url(), token)
}

pub fn password_reset(store: &impl Kv, req: Request) -> HandlerResult {
    let form: PasswordResetForm = parse_json(&req)?;

    let mut errors = FormErrors::default();
    validation::required_email(&mut errors, "email", &form.email);
    errors.into_result()?;

    // Same answer whether or not the address is known
    if let Some(user) = find_user_by_email(store, &form.email)? {
        let token = issue_reset_token(store, &user.id)?;
        tracing::info!(
            user_id = %user.id,
            to = %user.email,
            link = %reset_link(&token),
            "password reset requested"
        );
    }

    Ok(json(200, &serde_json::json!({"status": "sent"}))?)
}

/// The live reset token under `token`; expired ones are deleted on sight.
fn valid_reset(store: &impl Kv, token: &str) -> Result<ResetToken, ApiError> {
    let key = reset_key(token);
    let reset = store
        .get_json::<ResetToken>(&key)?
        .ok_or_else(|| ApiError::BadRequest("The password reset link was invalid".to_string()))?;
    if age_hours(&reset.created_at).map_or(true, |age| age > password_reset_hours()) {
        store.delete(&key)?;
        return Err(ApiError::BadRequest("The password reset link has expired".to_string()));
    }
    Ok(reset)
}

/// `GET /password-reset/<token>/`: lets the client know whether to show the form.
pub fn password_reset_check(store: &impl Kv, token: &str) -> HandlerResult {
    let reset = valid_reset(store, token)?;
    let username = store
        .get_json::<User>(&user_key(&reset.user_id))?
        .map(|u| u.username)
        .ok_or_else(|| ApiError::BadRequest("The password reset link was invalid".to_string()))?;
    Ok(json(200, &serde_json::json!({"valid": true, "username": username}))?)
}

/// Confirms a reset with the token in the body (`/password-reset/confirm/`)
/// or in the path (`/password-reset/<token>/`).
pub fn password_reset_confirm(store: &impl Kv, path_token: Option<&str>, req: Request) -> HandlerResult {
    let mut form: PasswordResetConfirmForm = parse_json(&req)?;
    if let Some(token) = path_token {
        form.token = token.to_string();
    }
    let reset = valid_reset(store, &form.token)?;

    let mut errors = FormErrors::default();
    check_new_password(&mut errors, "new_password1", &form.new_password1, &form.new_password2, "new_password2");
    errors.into_result()?;

    let mut user = store
        .get_json::<User>(&user_key(&reset.user_id))?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;
    user.password = hash_password(&form.new_password1)?;
    save_user(store, &user)?;
    store.delete(&reset_key(&form.token))?;
    revoke_tokens(store, &user.id)?;
    tracing::info!(user_id = %user.id, "password reset completed");

    Ok(json(200, &serde_json::json!({"status": "complete"}))?)
}
