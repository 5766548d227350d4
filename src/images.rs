use chrono::Utc;
use serde::{Deserialize, Serialize};
use spin_sdk::http::{Request, Response};

use crate::actions::create_action;
use crate::auth::require_user;
use crate::config::*;
use crate::core::errors::{ApiError, HandlerResult};
use crate::core::fetch::ImageFetcher;
use crate::core::helpers::{json, next_id, parse_json, random_suffix, redirect, slugify};
use crate::core::kv::Kv;
use crate::core::paginator::{PageLookup, Paginator};
use crate::core::query_params::{get_flag, get_string, parse_query_params};
use crate::core::validation::{self, FormErrors};
use crate::models::models::{Bookmark, ImageKind, Target};

#[derive(Deserialize, Serialize, Default, Clone)]
#[serde(default)]
pub struct ImageCreateForm {
    pub title: String,
    pub url: String,
    pub description: String,
}

impl ImageCreateForm {
    /// Field errors, or the lowercased file extension of `url` when valid.
    pub fn clean(&self) -> Result<String, FormErrors> {
        let mut errors = FormErrors::default();
        if validation::required(&mut errors, "title", &self.title) {
            validation::max_length(&mut errors, "title", &self.title, MAX_IMAGE_TITLE_LENGTH);
        }
        let extension = validation::image_url(&mut errors, "url", self.url.trim());
        errors.into_result()?;
        extension.ok_or_else(FormErrors::default)
    }
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct LikeForm {
    id: Option<serde_json::Value>,
    action: Option<String>,
}

fn parse_id(value: &serde_json::Value) -> Option<u64> {
    match value {
        serde_json::Value::Number(n) => n.as_u64(),
        serde_json::Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

pub fn bookmark_json(bookmark: &Bookmark) -> serde_json::Value {
    let mut value = serde_json::to_value(bookmark).unwrap_or_default();
    value["detail_url"] = serde_json::Value::String(bookmark.get_absolute_url());
    value["media_url"] = serde_json::Value::String(format!("/media/{}", bookmark.file));
    value
}

/// Newest first.
pub fn load_bookmarks(store: &impl Kv, kind: ImageKind) -> anyhow::Result<Vec<Bookmark>> {
    let ids: Vec<u64> = store.get_json(&kind.list_key())?.unwrap_or_default();
    let mut bookmarks = Vec::with_capacity(ids.len());
    for id in ids {
        if let Some(bookmark) = store.get_json::<Bookmark>(&kind.image_key(id))? {
            bookmarks.push(bookmark);
        }
    }
    bookmarks.sort_by(|a, b| b.created.cmp(&a.created).then_with(|| b.id.cmp(&a.id)));
    Ok(bookmarks)
}

pub fn bookmarks_by_user(store: &impl Kv, kind: ImageKind, user_id: &str) -> anyhow::Result<Vec<Bookmark>> {
    Ok(load_bookmarks(store, kind)?
        .into_iter()
        .filter(|b| b.user_id == user_id)
        .collect())
}

/// Bound form for the bookmarklet: echoes the query values and their errors.
pub fn create_form(store: &impl Kv, kind: ImageKind, req: Request) -> HandlerResult {
    require_user(store, &req)?;
    let params = parse_query_params(req.uri());
    let form = ImageCreateForm {
        title: get_string(&params, "title"),
        url: get_string(&params, "url"),
        description: get_string(&params, "description"),
    };
    let errors = form.clean().err().unwrap_or_default();

    let resp = serde_json::json!({
        "section": kind.segment(),
        "form": form,
        "errors": errors,
    });
    Ok(json(200, &resp)?)
}

/// Picks `<dir>/YYYY/MM/DD/<name>.<ext>`, adding a random suffix when taken.
fn upload_path(store: &impl Kv, kind: ImageKind, title: &str, extension: &str) -> anyhow::Result<String> {
    let mut name = slugify(title);
    if name.is_empty() {
        name = kind.prefix().to_string();
    }
    let dir = format!("{}/{}", kind.upload_dir(), Utc::now().format("%Y/%m/%d"));
    let mut path = format!("{}/{}.{}", dir, name, extension);
    while store.exists(&media_key(&path))? {
        path = format!("{}/{}_{}.{}", dir, name, random_suffix(7), extension);
    }
    Ok(path)
}

pub fn create_bookmark(
    store: &impl Kv,
    fetcher: &impl ImageFetcher,
    kind: ImageKind,
    req: Request,
) -> HandlerResult {
    let user = require_user(store, &req)?;
    let form: ImageCreateForm = parse_json(&req)?;
    let extension = form.clean()?;
    let url = form.url.trim().to_string();

    // download image from the given URL
    let bytes = fetcher.fetch(&url).map_err(|e| {
        tracing::warn!(%url, error = %e, "image download failed");
        ApiError::Upstream(format!("Could not download image from {}", url))
    })?;

    let path = upload_path(store, kind, &form.title, &extension)?;
    store.set_raw(&media_key(&path), &bytes)?;

    let title = form.title.trim().to_string();
    let mut slug = slugify(&title);
    if slug.is_empty() {
        slug = kind.prefix().to_string();
    }
    let bookmark = Bookmark {
        id: next_id(store, kind.prefix())?,
        kind,
        user_id: user.id.clone(),
        title,
        slug,
        url,
        file: path,
        description: form.description.trim().to_string(),
        created: Utc::now(),
        total_likes: 0,
        users_like: Vec::new(),
    };
    store.set_json(&kind.image_key(bookmark.id), &bookmark)?;

    let mut ids: Vec<u64> = store.get_json(&kind.list_key())?.unwrap_or_default();
    ids.insert(0, bookmark.id);
    store.set_json(&kind.list_key(), &ids)?;

    create_action(
        store,
        &user.id,
        "bookmarked image",
        Some(Target::Bookmark { kind, id: bookmark.id }),
    )?;
    tracing::info!(kind = kind.prefix(), id = bookmark.id, bytes = bytes.len(), "image added");

    let mut resp = bookmark_json(&bookmark);
    resp["message"] = serde_json::Value::String("Image added successfully".to_string());
    Ok(redirect(&bookmark.get_absolute_url(), &resp)?)
}

pub fn bookmark_detail(store: &impl Kv, kind: ImageKind, id: u64, slug: &str) -> HandlerResult {
    let bookmark = match store.get_json::<Bookmark>(&kind.image_key(id))? {
        Some(b) if b.slug == slug => b,
        _ => return Err(ApiError::NotFound("No image matches the given query.".to_string())),
    };

    let total_views = store.incr(&kind.views_key(bookmark.id))?;
    store.zincrby(&kind.ranking_key(), &bookmark.id.to_string(), 1.0)?;
    tracing::debug!(kind = kind.prefix(), id = bookmark.id, total_views, "image viewed");

    let mut resp = bookmark_json(&bookmark);
    resp["section"] = serde_json::Value::String(kind.segment().to_string());
    resp["total_views"] = serde_json::json!(total_views);
    Ok(json(200, &resp)?)
}

pub fn like_bookmark(store: &impl Kv, kind: ImageKind, req: Request) -> HandlerResult {
    let user = require_user(store, &req)?;
    let form: LikeForm = parse_json(&req)?;
    let error = serde_json::json!({"status": "error"});

    let (id, action) = match (form.id.as_ref().and_then(parse_id), form.action) {
        (Some(id), Some(action)) if !action.is_empty() => (id, action),
        _ => return Ok(json(200, &error)?),
    };
    let key = kind.image_key(id);
    let mut bookmark = match store.get_json::<Bookmark>(&key)? {
        Some(b) => b,
        None => return Ok(json(200, &error)?),
    };

    if action == "like" {
        if !bookmark.users_like.contains(&user.id) {
            bookmark.users_like.push(user.id.clone());
        }
        create_action(store, &user.id, "likes", Some(Target::Bookmark { kind, id }))?;
    } else {
        bookmark.users_like.retain(|u| u != &user.id);
    }
    bookmark.total_likes = bookmark.users_like.len() as u32;
    store.set_json(&key, &bookmark)?;

    Ok(json(200, &serde_json::json!({"status": "ok", "total_likes": bookmark.total_likes}))?)
}

pub fn list_bookmarks(store: &impl Kv, kind: ImageKind, req: Request) -> HandlerResult {
    require_user(store, &req)?;
    let params = parse_query_params(req.uri());
    let images_only = get_flag(&params, "images_only");

    let paginator = Paginator::new(load_bookmarks(store, kind)?, IMAGES_PER_PAGE);
    let number = match paginator.lookup(params.get("page").map(String::as_str)) {
        PageLookup::Page(n) => n,
        // Infinite scroll stops on an empty page
        PageLookup::OutOfRange { .. } if images_only => {
            return Ok(Response::builder().status(200).body(Vec::new()).build());
        }
        PageLookup::OutOfRange { last } => last,
    };
    let page = paginator.page(number);
    let items: Vec<serde_json::Value> = page.items.iter().map(bookmark_json).collect();

    if images_only {
        return Ok(json(200, &items)?);
    }
    let resp = serde_json::json!({
        "section": kind.segment(),
        "page": page.number,
        "num_pages": page.num_pages,
        "has_next": page.has_next,
        "images": items,
    });
    Ok(json(200, &resp)?)
}

/// Most viewed bookmarks, in ranking order.
pub fn ranking(store: &impl Kv, kind: ImageKind, req: Request) -> HandlerResult {
    require_user(store, &req)?;

    let ranked_ids: Vec<u64> = store
        .zrevrange(&kind.ranking_key(), RANKING_SIZE)?
        .iter()
        .filter_map(|id| id.parse().ok())
        .collect();

    let mut most_viewed = Vec::with_capacity(ranked_ids.len());
    for id in ranked_ids {
        if let Some(bookmark) = store.get_json::<Bookmark>(&kind.image_key(id))? {
            let mut value = bookmark_json(&bookmark);
            value["total_views"] = serde_json::json!(store.get_json::<i64>(&kind.views_key(id))?.unwrap_or(0));
            most_viewed.push(value);
        }
    }

    Ok(json(200, &serde_json::json!({"section": kind.segment(), "most_viewed": most_viewed}))?)
}
