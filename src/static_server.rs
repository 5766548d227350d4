use mime_guess::from_path;
use rust_embed::RustEmbed;
use spin_sdk::http::Response;

use crate::config::media_key;
use crate::core::errors::{ApiError, HandlerResult};
use crate::core::kv::Kv;

#[derive(RustEmbed)]
#[folder = "static"]
pub(crate) struct Assets;

pub fn serve_static(path: &str) -> HandlerResult {
    let file_path = match path {
        "/" | "/index.html" => "index.html",
        _ => path.trim_start_matches("/static/").trim_start_matches('/'),
    };

    let file = Assets::get(file_path)
        .ok_or_else(|| ApiError::NotFound("File not found".to_string()))?;

    let mime = from_path(file_path).first_or_octet_stream();

    Ok(Response::builder()
        .status(200)
        .header("Content-Type", mime.as_ref())
        .body(file.data.to_vec())
        .build())
}

/// Downloaded bookmark files, stored under `media:<path>`.
pub fn serve_media(store: &impl Kv, path: &str) -> HandlerResult {
    let file_path = path.trim_start_matches("/media/");
    if file_path.is_empty() || file_path.split('/').any(|part| part == "..") {
        return Err(ApiError::NotFound("File not found".to_string()));
    }

    let bytes = store
        .get_raw(&media_key(file_path))?
        .ok_or_else(|| ApiError::NotFound("File not found".to_string()))?;

    let mime = from_path(file_path).first_or_octet_stream();

    Ok(Response::builder()
        .status(200)
        .header("Content-Type", mime.as_ref())
        .body(bytes)
        .build())
}
