use chrono::NaiveDate;
use serde::Deserialize;
use spin_sdk::http::Request;

use crate::actions::{action_json, dashboard_actions};
use crate::auth::require_user;
use crate::config::*;
use crate::core::errors::{ApiError, HandlerResult};
use crate::core::helpers::{json, parse_json, sanitize_text};
use crate::core::kv::Kv;
use crate::core::validation::{self, FormErrors};
use crate::follow::{get_followers, get_followings};
use crate::images::{bookmark_json, bookmarks_by_user};
use crate::models::models::{ImageKind, Profile, User};

#[derive(Deserialize, Default)]
#[serde(default)]
struct EditForm {
    first_name: Option<String>,
    last_name: Option<String>,
    email: Option<String>,
    date_of_birth: Option<String>,
    photo: Option<String>,
}

pub fn build_user_json(user: &User) -> serde_json::Value {
    serde_json::json!({
        "id": user.id,
        "username": user.username,
        "first_name": user.first_name,
        "last_name": user.last_name,
        "email": user.email,
        "date_joined": user.date_joined,
    })
}

pub fn save_user(store: &impl Kv, user: &User) -> anyhow::Result<()> {
    store.set_json(&user_key(&user.id), user)
}

pub fn load_users(store: &impl Kv) -> anyhow::Result<Vec<User>> {
    let ids: Vec<String> = store.get_json(USERS_LIST_KEY)?.unwrap_or_default();
    let mut users = Vec::with_capacity(ids.len());
    for id in ids {
        if let Some(u) = store.get_json::<User>(&user_key(&id))? {
            users.push(u);
        }
    }
    Ok(users)
}

pub fn find_user_by_username(store: &impl Kv, username: &str) -> anyhow::Result<Option<User>> {
    Ok(load_users(store)?.into_iter().find(|u| u.username == username))
}

pub fn find_user_by_email(store: &impl Kv, email: &str) -> anyhow::Result<Option<User>> {
    let email = email.trim();
    Ok(load_users(store)?
        .into_iter()
        .find(|u| !u.email.is_empty() && u.email.eq_ignore_ascii_case(email)))
}

fn load_profile(store: &impl Kv, user_id: &str) -> anyhow::Result<Profile> {
    Ok(store
        .get_json::<Profile>(&profile_key(user_id))?
        .unwrap_or_else(|| Profile {
            user_id: user_id.to_string(),
            ..Profile::default()
        }))
}

pub fn dashboard(store: &impl Kv, req: Request) -> HandlerResult {
    let user = require_user(store, &req)?;
    let profile = load_profile(store, &user.id)?;
    let actions = dashboard_actions(store, &user.id)?
        .iter()
        .map(|a| action_json(store, a))
        .collect::<anyhow::Result<Vec<_>>>()?;

    let resp = serde_json::json!({
        "section": "dashboard",
        "user": build_user_json(&user),
        "profile": profile,
        "actions": actions,
    });
    Ok(json(200, &resp)?)
}

pub fn edit_profile(store: &impl Kv, req: Request) -> HandlerResult {
    let mut user = require_user(store, &req)?;
    let mut profile = load_profile(store, &user.id)?;
    let form: EditForm = parse_json(&req)?;

    let mut errors = FormErrors::default();
    if let Some(first_name) = &form.first_name {
        validation::max_length(&mut errors, "first_name", first_name, MAX_NAME_LENGTH);
    }
    if let Some(last_name) = &form.last_name {
        validation::max_length(&mut errors, "last_name", last_name, MAX_NAME_LENGTH);
    }
    if let Some(email) = &form.email {
        validation::max_length(&mut errors, "email", email, MAX_EMAIL_LENGTH);
        validation::email(&mut errors, "email", email);
        if !errors.has("email") && !email.is_empty() {
            if let Some(other) = find_user_by_email(store, email)? {
                if other.id != user.id {
                    errors.add("email", "Email already in use.");
                }
            }
        }
    }
    let date_of_birth = match form.date_of_birth.as_deref().map(str::trim) {
        None => profile.date_of_birth,
        Some("") => None,
        Some(raw) => match NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
            Ok(date) => Some(date),
            Err(_) => {
                errors.add("date_of_birth", "Enter a valid date.");
                None
            }
        },
    };
    errors.into_result()?;

    if let Some(first_name) = form.first_name {
        user.first_name = sanitize_text(first_name.trim());
    }
    if let Some(last_name) = form.last_name {
        user.last_name = sanitize_text(last_name.trim());
    }
    if let Some(email) = form.email {
        user.email = email.trim().to_string();
    }
    profile.date_of_birth = date_of_birth;
    if let Some(photo) = form.photo {
        profile.photo = if photo.trim().is_empty() { None } else { Some(photo.trim().to_string()) };
    }

    save_user(store, &user)?;
    store.set_json(&profile_key(&user.id), &profile)?;
    tracing::info!(user_id = %user.id, "profile updated");

    let resp = serde_json::json!({
        "message": "Profile updated successfully",
        "user": build_user_json(&user),
        "profile": profile,
    });
    Ok(json(200, &resp)?)
}

pub fn user_list(store: &impl Kv, req: Request) -> HandlerResult {
    require_user(store, &req)?;
    let users: Vec<serde_json::Value> = load_users(store)?.iter().map(build_user_json).collect();
    Ok(json(200, &serde_json::json!({"section": "people", "users": users}))?)
}

pub fn user_detail(store: &impl Kv, req: Request, username: &str) -> HandlerResult {
    require_user(store, &req)?;
    let user = find_user_by_username(store, username)?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    let followers = get_followers(store, &user.id)?;
    let followings = get_followings(store, &user.id)?;
    let mut bookmarks = Vec::new();
    for kind in [ImageKind::Image, ImageKind::RecipeImage] {
        for bookmark in bookmarks_by_user(store, kind, &user.id)? {
            bookmarks.push(bookmark_json(&bookmark));
        }
    }

    let mut resp = build_user_json(&user);
    resp["followers"] = serde_json::json!(followers);
    resp["total_followers"] = serde_json::json!(followers.len());
    resp["total_followings"] = serde_json::json!(followings.len());
    resp["images"] = serde_json::json!(bookmarks);
    Ok(json(200, &resp)?)
}
