use serde::Deserialize;
use spin_sdk::http::Request;

use crate::actions::create_action;
use crate::auth::require_user;
use crate::config::*;
use crate::core::errors::HandlerResult;
use crate::core::helpers::{json, parse_json, validate_uuid};
use crate::core::kv::Kv;
use crate::models::models::{Followings, Target, User};

#[derive(Deserialize, Default)]
#[serde(default)]
struct FollowForm {
    id: String,
    action: String,
}

pub fn follow_user(store: &impl Kv, follower_id: &str, following_id: &str) -> anyhow::Result<bool> {
    let key = followings_key(follower_id);
    let mut followings: Followings = store.get_json(&key)?.unwrap_or_default();

    if followings.iter().any(|id| id == following_id) {
        return Ok(false);
    }
    followings.push(following_id.to_string());
    store.set_json(&key, &followings)?;
    Ok(true)
}

pub fn unfollow_user(store: &impl Kv, follower_id: &str, following_id: &str) -> anyhow::Result<()> {
    let key = followings_key(follower_id);
    let mut followings: Followings = store.get_json(&key)?.unwrap_or_default();

    followings.retain(|id| id != following_id);
    store.set_json(&key, &followings)?;
    Ok(())
}

pub fn get_followings(store: &impl Kv, user_id: &str) -> anyhow::Result<Followings> {
    Ok(store.get_json(&followings_key(user_id))?.unwrap_or_default())
}

pub fn get_followers(store: &impl Kv, user_id: &str) -> anyhow::Result<Vec<String>> {
    let users: Vec<String> = store.get_json(USERS_LIST_KEY)?.unwrap_or_default();
    let mut followers = Vec::new();

    for id in users {
        if get_followings(store, &id)?.iter().any(|f| f == user_id) {
            followers.push(id);
        }
    }

    Ok(followers)
}

/// `{id, action}` with action `follow` or `unfollow`; answers `{"status": "ok"|"error"}`.
pub fn user_follow(store: &impl Kv, req: Request) -> HandlerResult {
    let user = require_user(store, &req)?;
    let form: FollowForm = parse_json(&req)?;

    let target_exists = validate_uuid(&form.id)
        && form.id != user.id
        && store.get_json::<User>(&user_key(&form.id))?.is_some();
    if !target_exists || form.action.is_empty() {
        return Ok(json(200, &serde_json::json!({"status": "error"}))?);
    }

    if form.action == "follow" {
        if follow_user(store, &user.id, &form.id)? {
            create_action(store, &user.id, "is following", Some(Target::User { id: form.id.clone() }))?;
        }
    } else {
        unfollow_user(store, &user.id, &form.id)?;
    }

    Ok(json(200, &serde_json::json!({"status": "ok"}))?)
}
