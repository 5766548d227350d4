use spin_sdk::http::Response;

use crate::blog::published_entries;
use crate::config::*;
use crate::core::errors::HandlerResult;
use crate::core::helpers::sanitize_text;
use crate::core::kv::Kv;
use crate::models::models::{Entry, EntryKind};
use crate::static_server::Assets;

fn xml(body: String, content_type: &str) -> Response {
    Response::builder()
        .status(200)
        .header("Content-Type", content_type)
        .body(body.into_bytes())
        .build()
}

/// First `words` words of the entry body with markup removed.
pub fn truncate_words(text: &str, words: usize) -> String {
    let plain = sanitize_text(text);
    let mut parts = plain.split_whitespace();
    let head: Vec<&str> = parts.by_ref().take(words).collect();
    let mut out = head.join(" ");
    if parts.next().is_some() {
        out.push_str(" …");
    }
    out
}

pub fn render_feed(kind: EntryKind, entries: &[Entry], site: &str) -> String {
    let mut items = String::new();
    for entry in entries {
        let link = format!("{}{}", site, entry.get_absolute_url());
        items.push_str(&format!(
            "<item><title>{}</title><link>{}</link><description>{}</description><pubDate>{}</pubDate><guid>{}</guid></item>",
            html_escape::encode_text(&entry.title),
            html_escape::encode_text(&link),
            html_escape::encode_text(&truncate_words(&entry.body, FEED_DESCRIPTION_WORDS)),
            entry.publish.to_rfc2822(),
            html_escape::encode_text(&link),
        ));
    }
    format!(
        r#"<?xml version="1.0" encoding="utf-8"?>
<rss version="2.0"><channel><title>My {label}</title><link>{site}/blog/{segment}/</link><description>New {segment} of my blog.</description><language>en-us</language>{items}</channel></rss>"#,
        label = kind.label(),
        site = html_escape::encode_text(site),
        segment = kind.segment(),
        items = items,
    )
}

pub fn feed(store: &impl Kv, kind: EntryKind) -> HandlerResult {
    let mut entries = published_entries(store, kind)?;
    entries.truncate(FEED_SIZE);
    let body = render_feed(kind, &entries, &site_url());
    Ok(xml(body, "application/rss+xml; charset=utf-8"))
}

pub fn render_sitemap(entries: &[Entry], site: &str) -> String {
    let mut urls = String::new();
    for entry in entries {
        urls.push_str(&format!(
            "<url><loc>{}{}</loc><lastmod>{}</lastmod><changefreq>weekly</changefreq><priority>0.9</priority></url>",
            html_escape::encode_text(site),
            html_escape::encode_text(&entry.get_absolute_url()),
            entry.updated.format("%Y-%m-%d"),
        ));
    }
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">{}</urlset>"#,
        urls
    )
}

pub fn sitemap(store: &impl Kv) -> HandlerResult {
    let mut entries = Vec::new();
    for kind in EntryKind::ALL {
        entries.extend(published_entries(store, kind)?);
    }
    Ok(xml(render_sitemap(&entries, &site_url()), "application/xml; charset=utf-8"))
}

/// Bookmarklet loader with the site origin filled in.
pub fn render_bookmarklet() -> anyhow::Result<Response> {
    let template = Assets::get("js/bookmarklet.js")
        .ok_or_else(|| anyhow::anyhow!("Bookmarklet template not found"))?
        .data
        .to_vec();

    let script = String::from_utf8(template)?.replace("SITE_URL", &site_url());

    Ok(Response::builder()
        .status(200)
        .header("Content-Type", "application/javascript; charset=utf-8")
        .body(script.into_bytes())
        .build())
}
