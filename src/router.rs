use spin_sdk::http::{Request, Response};

use crate::core::errors::{ApiError, HandlerResult};
use crate::core::fetch::ImageFetcher;
use crate::core::kv::Kv;
use crate::models::models::{EntryKind, ImageKind};
use crate::{auth, blog, comments, follow, images, static_server, templates, users};

/// Dispatches one request. Handler errors become their HTTP responses here;
/// only failures to build a response at all surface as `Err`.
pub fn route(store: &impl Kv, fetcher: &impl ImageFetcher, req: Request) -> anyhow::Result<Response> {
    let method = req.method().to_string();
    let path = req.path().to_string();
    tracing::debug!(%method, %path, "request");

    match dispatch(store, fetcher, &method, &path, req) {
        Ok(response) => Ok(response),
        Err(err) => {
            if err.status() >= 500 {
                tracing::error!(%method, %path, error = %err, "request failed");
            }
            Ok(err.into())
        }
    }
}

fn not_found() -> ApiError {
    ApiError::NotFound("No route found".to_string())
}

fn dispatch(
    store: &impl Kv,
    fetcher: &impl ImageFetcher,
    method: &str,
    path: &str,
    req: Request,
) -> HandlerResult {
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

    match (method, segments.as_slice()) {
        ("GET", []) | ("GET", ["index.html"]) | ("GET", ["static", ..]) => {
            static_server::serve_static(path)
        }
        ("GET", ["media", ..]) => static_server::serve_media(store, path),
        ("GET", ["bookmarklet.js"]) => Ok(templates::render_bookmarklet()?),

        ("POST", ["register"]) => auth::register(store, req),
        ("POST", ["login"]) => auth::login_user(store, req),
        ("POST", ["logout"]) => auth::logout_user(store, req),
        ("POST", ["password-change"]) => auth::password_change(store, req),
        ("POST", ["password-reset"]) => auth::password_reset(store, req),
        ("POST", ["password-reset", "confirm"]) => auth::password_reset_confirm(store, None, req),
        ("GET", ["password-reset", token]) => auth::password_reset_check(store, token),
        ("POST", ["password-reset", token]) => auth::password_reset_confirm(store, Some(*token), req),
        ("GET", ["dashboard"]) => users::dashboard(store, req),
        ("PUT", ["edit"]) | ("POST", ["edit"]) => users::edit_profile(store, req),
        ("GET", ["users"]) => users::user_list(store, req),
        ("POST", ["users", "follow"]) => follow::user_follow(store, req),
        ("GET", ["users", username]) => users::user_detail(store, req, username),

        ("GET", ["blog", "sitemap.xml"]) => templates::sitemap(store),
        (_, ["blog", kind, rest @ ..]) => {
            let kind = EntryKind::from_segment(kind).ok_or_else(not_found)?;
            route_blog(store, kind, method, rest, req)
        }
        (_, [kind, rest @ ..]) => {
            let kind = ImageKind::from_segment(kind).ok_or_else(not_found)?;
            route_images(store, fetcher, kind, method, rest, req)
        }
        _ => Err(not_found()),
    }
}

fn parse<T: std::str::FromStr>(segment: &str) -> Result<T, ApiError> {
    segment.parse().map_err(|_| not_found())
}

fn route_blog(
    store: &impl Kv,
    kind: EntryKind,
    method: &str,
    rest: &[&str],
    req: Request,
) -> HandlerResult {
    match (method, rest) {
        ("GET", []) => blog::list_entries(store, kind, req, None),
        ("POST", []) => blog::create_entry(store, kind, req),
        ("GET", ["tag", tag]) => blog::list_entries(store, kind, req, Some(*tag)),
        ("GET", ["feed"]) => templates::feed(store, kind),
        ("GET", ["search"]) => blog::search_entries(store, kind, req),
        ("GET", [year, month, day, slug]) => {
            blog::entry_detail(store, kind, parse(year)?, parse(month)?, parse(day)?, slug)
        }
        ("PUT", [id]) => blog::edit_entry(store, kind, parse(id)?, req),
        ("DELETE", [id]) => blog::delete_entry(store, kind, parse(id)?, req),
        ("POST", [id, "share"]) => blog::share_entry(store, kind, parse(id)?, req),
        ("POST", [id, "comment"]) => comments::post_comment(store, kind, parse(id)?, req),
        _ => Err(not_found()),
    }
}

fn route_images(
    store: &impl Kv,
    fetcher: &impl ImageFetcher,
    kind: ImageKind,
    method: &str,
    rest: &[&str],
    req: Request,
) -> HandlerResult {
    match (method, rest) {
        ("GET", []) => images::list_bookmarks(store, kind, req),
        ("GET", ["create"]) => images::create_form(store, kind, req),
        ("POST", ["create"]) => images::create_bookmark(store, fetcher, kind, req),
        ("GET", ["detail", id, slug]) => images::bookmark_detail(store, kind, parse(id)?, slug),
        ("POST", ["like"]) => images::like_bookmark(store, kind, req),
        ("GET", ["ranking"]) => images::ranking(store, kind, req),
        _ => Err(not_found()),
    }
}
