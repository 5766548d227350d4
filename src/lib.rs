#[cfg(target_arch = "wasm32")]
use spin_sdk::{
    http::{IntoResponse, Request},
    http_component,
    key_value::Store,
};

pub mod actions;
pub mod auth;
pub mod blog;
pub mod comments;
pub mod config;
pub mod core;
pub mod follow;
pub mod images;
pub mod models;
pub mod router;
pub mod static_server;
pub mod telemetry;
pub mod templates;
pub mod users;

#[cfg(target_arch = "wasm32")]
use crate::core::fetch::OutboundFetcher;

// === Component entrypoint ===
#[cfg(target_arch = "wasm32")]
#[http_component]
fn handle(req: Request) -> anyhow::Result<impl IntoResponse> {
    telemetry::init();
    let store = Store::open_default()?;

    if config::seed_demo_data() {
        crate::core::db::init_demo_data(&store)?;
    }

    router::route(&store, &OutboundFetcher, req)
}
