use chrono::Utc;
use serde::Deserialize;
use spin_sdk::http::Request;

use crate::blog::get_published;
use crate::config::*;
use crate::core::errors::HandlerResult;
use crate::core::helpers::{json, next_id, parse_json, sanitize_text};
use crate::core::kv::Kv;
use crate::core::validation::{self, FormErrors};
use crate::models::models::{Comment, EntryKind};

#[derive(Deserialize, Default)]
#[serde(default)]
struct CommentForm {
    name: String,
    email: String,
    body: String,
    rating: Option<i64>,
}

/// Active comments on an entry, oldest first.
pub fn active_comments(store: &impl Kv, kind: EntryKind, entry_id: u64) -> anyhow::Result<Vec<Comment>> {
    let ids: Vec<u64> = store
        .get_json(&kind.comments_list_key(entry_id))?
        .unwrap_or_default();
    let mut comments = Vec::with_capacity(ids.len());
    for id in ids {
        if let Some(comment) = store.get_json::<Comment>(&kind.comment_key(id))? {
            if comment.active {
                comments.push(comment);
            }
        }
    }
    comments.sort_by(|a, b| a.created.cmp(&b.created).then_with(|| a.id.cmp(&b.id)));
    Ok(comments)
}

pub fn post_comment(store: &impl Kv, kind: EntryKind, entry_id: u64, req: Request) -> HandlerResult {
    let entry = get_published(store, kind, entry_id)?;
    let form: CommentForm = parse_json(&req)?;

    let mut errors = FormErrors::default();
    if validation::required(&mut errors, "name", &form.name) {
        validation::max_length(&mut errors, "name", &form.name, MAX_COMMENT_NAME_LENGTH);
    }
    if validation::required(&mut errors, "email", &form.email) {
        validation::max_length(&mut errors, "email", &form.email, MAX_EMAIL_LENGTH);
        validation::email(&mut errors, "email", &form.email);
    }
    validation::required(&mut errors, "body", &form.body);
    let rating = match form.rating {
        None => {
            errors.add("rating", validation::REQUIRED);
            0
        }
        Some(r) if (i64::from(MIN_RATING)..=i64::from(MAX_RATING)).contains(&r) => r as u8,
        Some(r) => {
            errors.add(
                "rating",
                format!("Select a valid choice. {} is not one of the available choices.", r),
            );
            0
        }
    };
    errors.into_result()?;

    let now = Utc::now();
    let comment = Comment {
        id: next_id(store, &format!("{}_comment", kind.prefix()))?,
        kind,
        entry_id: entry.id,
        name: sanitize_text(form.name.trim()),
        email: form.email.trim().to_string(),
        body: sanitize_text(&form.body),
        created: now,
        updated: now,
        active: true,
        rating,
    };
    store.set_json(&kind.comment_key(comment.id), &comment)?;

    let mut ids: Vec<u64> = store
        .get_json(&kind.comments_list_key(entry.id))?
        .unwrap_or_default();
    ids.push(comment.id);
    store.set_json(&kind.comments_list_key(entry.id), &ids)?;

    tracing::info!(kind = kind.prefix(), entry_id = entry.id, comment_id = comment.id, rating, "comment added");
    Ok(json(201, &serde_json::json!({"comment": comment, "entry": entry.get_absolute_url()}))?)
}
