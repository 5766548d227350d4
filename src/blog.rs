use ammonia::Builder;
use chrono::{DateTime, Datelike, Utc};
use html_escape::{decode_html_entities, encode_double_quoted_attribute};
use regex::Regex;
use serde::Deserialize;
use spin_sdk::http::Request;
use std::collections::HashMap;
use std::sync::OnceLock;

use crate::auth::require_user;
use crate::comments::active_comments;
use crate::config::*;
use crate::core::errors::{ApiError, HandlerResult};
use crate::core::helpers::{json, next_id, parse_json, slugify};
use crate::core::kv::Kv;
use crate::core::paginator::{PageLookup, Paginator};
use crate::core::query_params::{get_string, parse_query_params};
use crate::core::validation::{self, FormErrors};
use crate::models::models::{Entry, EntryKind, Status};

#[derive(Deserialize, Default)]
#[serde(default)]
struct EntryForm {
    title: Option<String>,
    slug: Option<String>,
    body: Option<String>,
    status: Option<Status>,
    publish: Option<DateTime<Utc>>,
    tags: Option<Vec<String>>,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct ShareForm {
    name: String,
    email: String,
    to: String,
    comments: String,
}

fn url_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| Regex::new(r#"https?://[^\s<>"]+"#).expect("Regex should compile"))
}

fn linkify(text: &str) -> String {
    url_regex()
        .replace_all(text, |caps: &regex::Captures| {
            // Text nodes arrive entity-encoded
            let shown = &caps[0];
            let href = decode_html_entities(shown);
            format!(
                r#"<a href="{}" target="_blank">{}</a>"#,
                encode_double_quoted_attribute(&href),
                shown
            )
        })
        .into_owned()
}

/// Length of the tag starting at `html[0] == '<'`, honouring quoted attribute values.
fn tag_len(html: &str) -> usize {
    let mut quote: Option<char> = None;
    for (i, c) in html.char_indices().skip(1) {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"') | (None, '\'') => quote = Some(c),
            (None, '>') => return i + 1,
            _ => {}
        }
    }
    html.len()
}

/// Safe HTML with bare URLs in text turned into links.
///
/// Only text outside tags and outside existing anchors is linkified.
fn filter_body(content: &str) -> String {
    // Sanitize HTML to remove dangerous scripts and event handlers
    let clean = Builder::default()
        .link_rel(Some("noopener noreferrer"))
        .clean(content)
        .to_string();

    let mut out = String::with_capacity(clean.len());
    let mut anchor_depth = 0usize;
    let mut rest = clean.as_str();
    loop {
        let text_end = rest.find('<').unwrap_or(rest.len());
        let (text, tail) = rest.split_at(text_end);
        if anchor_depth == 0 {
            out.push_str(&linkify(text));
        } else {
            out.push_str(text);
        }
        if tail.is_empty() {
            break;
        }

        let (tag, after) = tail.split_at(tag_len(tail));
        let lower = tag.to_ascii_lowercase();
        if lower.starts_with("<a ") || lower.starts_with("<a>") {
            anchor_depth += 1;
        } else if lower.starts_with("</a>") || lower.starts_with("</a ") {
            anchor_depth = anchor_depth.saturating_sub(1);
        }
        out.push_str(tag);
        rest = after;
    }
    out
}

fn normalize_tags(tags: Vec<String>) -> Vec<String> {
    let mut normalized: Vec<String> = Vec::new();
    for tag in tags {
        let slug = slugify(&tag);
        if !slug.is_empty() && !normalized.contains(&slug) {
            normalized.push(slug);
        }
    }
    normalized
}

pub fn entry_json(entry: &Entry) -> serde_json::Value {
    let mut value = serde_json::to_value(entry).unwrap_or_default();
    value["url"] = serde_json::Value::String(entry.get_absolute_url());
    value
}

pub fn load_entries(store: &impl Kv, kind: EntryKind) -> anyhow::Result<Vec<Entry>> {
    let ids: Vec<u64> = store.get_json(&kind.list_key())?.unwrap_or_default();
    let mut entries = Vec::with_capacity(ids.len());
    for id in ids {
        if let Some(entry) = store.get_json::<Entry>(&kind.entry_key(id))? {
            entries.push(entry);
        }
    }
    Ok(entries)
}

/// Published entries, newest publish date first.
pub fn published_entries(store: &impl Kv, kind: EntryKind) -> anyhow::Result<Vec<Entry>> {
    let mut entries: Vec<Entry> = load_entries(store, kind)?
        .into_iter()
        .filter(Entry::is_published)
        .collect();
    entries.sort_by(|a, b| b.publish.cmp(&a.publish));
    Ok(entries)
}

pub fn get_published(store: &impl Kv, kind: EntryKind, id: u64) -> Result<Entry, ApiError> {
    match store.get_json::<Entry>(&kind.entry_key(id))? {
        Some(entry) if entry.is_published() => Ok(entry),
        _ => Err(ApiError::NotFound(format!("No {} matches the given query.", kind.prefix()))),
    }
}

fn slug_taken(
    store: &impl Kv,
    kind: EntryKind,
    slug: &str,
    publish: &DateTime<Utc>,
    except: Option<u64>,
) -> anyhow::Result<bool> {
    Ok(load_entries(store, kind)?.iter().any(|e| {
        Some(e.id) != except && e.slug == slug && e.publish.date_naive() == publish.date_naive()
    }))
}

fn check_entry(errors: &mut FormErrors, title: &str, slug: &str, body: &str) {
    if validation::required(errors, "title", title) {
        validation::max_length(errors, "title", title, MAX_TITLE_LENGTH);
    }
    if slug.is_empty() {
        errors.add("slug", validation::REQUIRED);
    } else {
        validation::max_length(errors, "slug", slug, MAX_SLUG_LENGTH);
    }
    validation::required(errors, "body", body);
}

pub fn create_entry(store: &impl Kv, kind: EntryKind, req: Request) -> HandlerResult {
    let user = require_user(store, &req)?;
    let form: EntryForm = parse_json(&req)?;

    let title = form.title.unwrap_or_default().trim().to_string();
    let slug = slugify(form.slug.as_deref().unwrap_or(&title));
    let body = form.body.unwrap_or_default();
    let publish = form.publish.unwrap_or_else(Utc::now);

    let mut errors = FormErrors::default();
    check_entry(&mut errors, &title, &slug, &body);
    if !errors.has("slug") && slug_taken(store, kind, &slug, &publish, None)? {
        errors.add("slug", "Slug must be unique for Publish date.");
    }
    errors.into_result()?;

    let now = Utc::now();
    let entry = Entry {
        id: next_id(store, kind.prefix())?,
        kind,
        title,
        slug,
        author_id: user.id.clone(),
        body: filter_body(&body),
        publish,
        created: now,
        updated: now,
        status: form.status.unwrap_or_default(),
        tags: normalize_tags(form.tags.unwrap_or_default()),
    };
    store.set_json(&kind.entry_key(entry.id), &entry)?;

    let mut ids: Vec<u64> = store.get_json(&kind.list_key())?.unwrap_or_default();
    ids.insert(0, entry.id);
    store.set_json(&kind.list_key(), &ids)?;

    tracing::info!(kind = kind.prefix(), id = entry.id, author = %user.id, "created entry");
    Ok(json(201, &entry_json(&entry))?)
}

fn owned_entry(store: &impl Kv, kind: EntryKind, id: u64, user_id: &str) -> Result<Entry, ApiError> {
    let entry = store
        .get_json::<Entry>(&kind.entry_key(id))?
        .ok_or_else(|| ApiError::NotFound(format!("No {} matches the given query.", kind.prefix())))?;
    if entry.author_id != user_id {
        return Err(ApiError::Forbidden);
    }
    Ok(entry)
}

pub fn edit_entry(store: &impl Kv, kind: EntryKind, id: u64, req: Request) -> HandlerResult {
    let user = require_user(store, &req)?;
    let mut entry = owned_entry(store, kind, id, &user.id)?;
    let form: EntryForm = parse_json(&req)?;

    let title = form.title.map(|t| t.trim().to_string()).unwrap_or_else(|| entry.title.clone());
    let slug = form.slug.as_deref().map(slugify).unwrap_or_else(|| entry.slug.clone());
    let body = form.body.map(|b| filter_body(&b)).unwrap_or_else(|| entry.body.clone());
    let publish = form.publish.unwrap_or(entry.publish);

    let mut errors = FormErrors::default();
    check_entry(&mut errors, &title, &slug, &body);
    if !errors.has("slug") && slug_taken(store, kind, &slug, &publish, Some(entry.id))? {
        errors.add("slug", "Slug must be unique for Publish date.");
    }
    errors.into_result()?;

    let tags = form.tags.map(normalize_tags).unwrap_or_else(|| entry.tags.clone());
    let status = form.status.unwrap_or(entry.status);

    // Skip update if nothing changed
    let unchanged = entry.title == title
        && entry.slug == slug
        && entry.body == body
        && entry.publish == publish
        && entry.tags == tags
        && entry.status == status;
    if !unchanged {
        entry.title = title;
        entry.slug = slug;
        entry.body = body;
        entry.publish = publish;
        entry.tags = tags;
        entry.status = status;
        entry.updated = Utc::now();
        store.set_json(&kind.entry_key(entry.id), &entry)?;
        tracing::info!(kind = kind.prefix(), id = entry.id, "updated entry");
    }

    Ok(json(200, &entry_json(&entry))?)
}

pub fn delete_entry(store: &impl Kv, kind: EntryKind, id: u64, req: Request) -> HandlerResult {
    let user = require_user(store, &req)?;
    let entry = owned_entry(store, kind, id, &user.id)?;

    // Comments go with their entry
    let comment_ids: Vec<u64> = store
        .get_json(&kind.comments_list_key(entry.id))?
        .unwrap_or_default();
    for comment_id in comment_ids {
        store.delete(&kind.comment_key(comment_id))?;
    }
    store.delete(&kind.comments_list_key(entry.id))?;
    store.delete(&kind.entry_key(entry.id))?;

    let mut ids: Vec<u64> = store.get_json(&kind.list_key())?.unwrap_or_default();
    ids.retain(|i| *i != entry.id);
    store.set_json(&kind.list_key(), &ids)?;

    tracing::info!(kind = kind.prefix(), id = entry.id, "deleted entry");
    Ok(spin_sdk::http::Response::builder().status(204).build())
}

pub fn list_entries(store: &impl Kv, kind: EntryKind, req: Request, tag: Option<&str>) -> HandlerResult {
    let params = parse_query_params(req.uri());

    let mut entries = published_entries(store, kind)?;
    if let Some(tag) = tag {
        entries.retain(|e| e.tags.iter().any(|t| t == tag));
    }

    let paginator = Paginator::new(entries, ENTRIES_PER_PAGE);
    let number = match paginator.lookup(params.get("page").map(String::as_str)) {
        PageLookup::Page(n) => n,
        PageLookup::OutOfRange { last } => last,
    };
    let page = paginator.page(number);
    let items: Vec<serde_json::Value> = page.items.iter().map(entry_json).collect();

    let mut resp = serde_json::json!({
        "section": kind.segment(),
        "tag": tag,
        "page": page.number,
        "num_pages": page.num_pages,
        "count": page.count,
        "has_next": page.has_next,
        "has_previous": page.has_previous,
    });
    resp[kind.segment()] = serde_json::json!(items);
    Ok(json(200, &resp)?)
}

pub fn entry_detail(
    store: &impl Kv,
    kind: EntryKind,
    year: i32,
    month: u32,
    day: u32,
    slug: &str,
) -> HandlerResult {
    let entry = published_entries(store, kind)?
        .into_iter()
        .find(|e| {
            e.slug == slug
                && e.publish.year() == year
                && e.publish.month() == month
                && e.publish.day() == day
        })
        .ok_or_else(|| ApiError::NotFound(format!("No {} matches the given query.", kind.prefix())))?;

    let comments = active_comments(store, kind, entry.id)?;
    let mut resp = entry_json(&entry);
    resp["comments"] = serde_json::json!(comments);
    Ok(json(200, &resp)?)
}

pub fn share_entry(store: &impl Kv, kind: EntryKind, id: u64, req: Request) -> HandlerResult {
    let entry = get_published(store, kind, id)?;
    let form: ShareForm = parse_json(&req)?;

    let mut errors = FormErrors::default();
    if validation::required(&mut errors, "name", &form.name) {
        validation::max_length(&mut errors, "name", &form.name, MAX_SHARE_NAME_LENGTH);
    }
    validation::required_email(&mut errors, "email", &form.email);
    validation::required_email(&mut errors, "to", &form.to);
    errors.into_result()?;

    let entry_url = format!("{}{}", site_url(), entry.get_absolute_url());
    let subject = format!("{} ({}) recommends you read {}", form.name, form.email, entry.title);
    let message = format!(
        "Read {} at {}\n\n{}'s comments: {}",
        entry.title, entry_url, form.name, form.comments
    );
    // Mail delivery belongs to the host; the composed message is logged
    tracing::info!(kind = kind.prefix(), id = entry.id, to = %form.to, %subject, %message, "shared entry");

    let resp = serde_json::json!({
        "sent": true,
        "subject": subject,
        "to": form.to,
        "url": entry_url,
    });
    Ok(json(200, &resp)?)
}

/// Weighted term match: each query term scores the title and body weights it hits.
pub fn search_rank(entry: &Entry, terms: &[String]) -> f64 {
    let title = entry.title.to_lowercase();
    let body = entry.body.to_lowercase();
    terms
        .iter()
        .map(|term| {
            let mut score = 0.0;
            if title.contains(term.as_str()) {
                score += SEARCH_TITLE_WEIGHT;
            }
            if body.contains(term.as_str()) {
                score += SEARCH_BODY_WEIGHT;
            }
            score
        })
        .sum()
}

pub fn search_entries(store: &impl Kv, kind: EntryKind, req: Request) -> HandlerResult {
    let params: HashMap<String, String> = parse_query_params(req.uri());
    let query = get_string(&params, "query");

    let mut errors = FormErrors::default();
    validation::required(&mut errors, "query", &query);
    errors.into_result()?;

    let terms: Vec<String> = query.split_whitespace().map(str::to_lowercase).collect();
    let mut ranked: Vec<(f64, Entry)> = published_entries(store, kind)?
        .into_iter()
        .map(|e| (search_rank(&e, &terms), e))
        .filter(|(rank, _)| *rank >= SEARCH_MIN_RANK)
        .collect();
    ranked.sort_by(|a, b| b.0.total_cmp(&a.0).then_with(|| b.1.publish.cmp(&a.1.publish)));

    let results: Vec<serde_json::Value> = ranked
        .iter()
        .map(|(rank, entry)| {
            let mut value = entry_json(entry);
            value["rank"] = serde_json::json!(rank);
            value
        })
        .collect();

    Ok(json(200, &serde_json::json!({"query": query, "results": results}))?)
}
