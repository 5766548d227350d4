//! Activity stream: "alice bookmarked image", "bob likes image", ...

use chrono::{DateTime, Duration, Utc};

use crate::config::*;
use crate::core::helpers::next_id;
use crate::core::kv::Kv;
use crate::follow::get_followings;
use crate::models::models::{Action, Bookmark, Target, User};

fn load_actions(store: &impl Kv) -> anyhow::Result<Vec<Action>> {
    let ids: Vec<u64> = store.get_json(ACTIONS_LIST_KEY)?.unwrap_or_default();
    let mut actions = Vec::with_capacity(ids.len());
    for id in ids {
        if let Some(action) = store.get_json::<Action>(&action_key(id))? {
            actions.push(action);
        }
    }
    Ok(actions)
}

/// Whether the same action was recorded at or after `since`.
/// The id list is newest first, so the scan stops at the first older action.
fn recorded_since(
    store: &impl Kv,
    user_id: &str,
    verb: &str,
    target: &Option<Target>,
    since: DateTime<Utc>,
) -> anyhow::Result<bool> {
    let ids: Vec<u64> = store.get_json(ACTIONS_LIST_KEY)?.unwrap_or_default();
    for id in ids {
        let action = match store.get_json::<Action>(&action_key(id))? {
            Some(action) => action,
            None => continue,
        };
        if action.created < since {
            break;
        }
        if action.user_id == user_id && action.verb == verb && &action.target == target {
            return Ok(true);
        }
    }
    Ok(false)
}

/// Records an action unless the same one was recorded within the dedup window.
/// Returns whether a new action was stored.
pub fn create_action(
    store: &impl Kv,
    user_id: &str,
    verb: &str,
    target: Option<Target>,
) -> anyhow::Result<bool> {
    let now = Utc::now();
    let window_start = now - Duration::seconds(ACTION_DEDUP_SECONDS);

    if recorded_since(store, user_id, verb, &target, window_start)? {
        tracing::debug!(%user_id, %verb, "skipping duplicate action");
        return Ok(false);
    }

    let action = Action {
        id: next_id(store, "action")?,
        user_id: user_id.to_string(),
        verb: verb.to_string(),
        target,
        created: now,
    };
    store.set_json(&action_key(action.id), &action)?;

    let mut ids: Vec<u64> = store.get_json(ACTIONS_LIST_KEY)?.unwrap_or_default();
    ids.insert(0, action.id);
    store.set_json(ACTIONS_LIST_KEY, &ids)?;
    Ok(true)
}

/// Latest actions by other users, limited to followed users when there are any.
pub fn dashboard_actions(store: &impl Kv, user_id: &str) -> anyhow::Result<Vec<Action>> {
    let followings = get_followings(store, user_id)?;
    let mut actions: Vec<Action> = load_actions(store)?
        .into_iter()
        .filter(|a| a.user_id != user_id)
        .filter(|a| followings.is_empty() || followings.contains(&a.user_id))
        .collect();
    actions.sort_by(|a, b| b.created.cmp(&a.created).then_with(|| b.id.cmp(&a.id)));
    actions.truncate(DASHBOARD_ACTIONS);
    Ok(actions)
}

pub fn action_json(store: &impl Kv, action: &Action) -> anyhow::Result<serde_json::Value> {
    let username = store
        .get_json::<User>(&user_key(&action.user_id))?
        .map(|u| u.username)
        .unwrap_or_default();

    let target = match &action.target {
        Some(Target::User { id }) => store
            .get_json::<User>(&user_key(id))?
            .map(|u| serde_json::json!({"type": "user", "username": u.username, "url": format!("/users/{}/", u.username)})),
        Some(Target::Bookmark { kind, id }) => store
            .get_json::<Bookmark>(&kind.image_key(*id))?
            .map(|b| serde_json::json!({"type": kind, "title": b.title, "url": b.get_absolute_url()})),
        None => None,
    };

    Ok(serde_json::json!({
        "id": action.id,
        "user": username,
        "verb": action.verb,
        "target": target,
        "created": action.created,
    }))
}
