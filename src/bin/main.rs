#[cfg(not(target_arch = "wasm32"))]
mod native {
    extern crate social_plus;

    use actix_web::{web, App, HttpRequest, HttpResponse, HttpServer};
    use social_plus::core::fetch::OutboundFetcher;
    use social_plus::core::kv::MemoryStore;

    mod adapter {
        use actix_web::HttpRequest;
        use spin_sdk::http::{Method, Request, Response};

        pub fn actix_to_spin_request(
            req: &HttpRequest,
            body: actix_web::web::Bytes,
        ) -> anyhow::Result<Request> {
            let method = match req.method().as_str() {
                "GET" => Method::Get,
                "POST" => Method::Post,
                "PUT" => Method::Put,
                "DELETE" => Method::Delete,
                "HEAD" => Method::Head,
                "OPTIONS" => Method::Options,
                "PATCH" => Method::Patch,
                other => anyhow::bail!("unsupported method {}", other),
            };

            let uri = req.uri().to_string();

            let mut builder = Request::builder();
            builder.method(method).uri(&uri);
            for (name, value) in req.headers() {
                if let Ok(val_str) = value.to_str() {
                    builder.header(name.as_str(), val_str);
                }
            }

            Ok(builder.body(body.to_vec()).build())
        }

        pub fn spin_to_actix_response(spin_resp: Response) -> actix_web::HttpResponse {
            let status = *spin_resp.status();

            let mut response = actix_web::HttpResponse::build(
                actix_web::http::StatusCode::from_u16(status)
                    .unwrap_or(actix_web::http::StatusCode::INTERNAL_SERVER_ERROR),
            );
            // Content-Type and Location carry meaning for clients
            for (name, value) in spin_resp.headers() {
                if let Some(val_str) = value.as_str() {
                    response.insert_header((name, val_str));
                }
            }

            response.body(spin_resp.body().to_vec())
        }
    }

    pub async fn run() -> std::io::Result<()> {
        social_plus::telemetry::init();

        let store = web::Data::new(MemoryStore::new());
        if social_plus::config::seed_demo_data() {
            if let Err(e) = social_plus::core::db::init_demo_data(store.get_ref()) {
                tracing::error!(error = %e, "demo data seeding failed");
            }
        }

        let addr = social_plus::config::bind_addr();
        tracing::info!(%addr, "server listening");

        HttpServer::new(move || {
            App::new()
                .app_data(store.clone())
                .default_service(web::route().to(handle_all))
        })
        .bind(addr)?
        .run()
        .await
    }

    async fn handle_all(
        store: web::Data<MemoryStore>,
        req: HttpRequest,
        body: web::Bytes,
    ) -> HttpResponse {
        let spin_req = match adapter::actix_to_spin_request(&req, body) {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!(error = %e, "rejected request");
                return HttpResponse::BadRequest()
                    .json(serde_json::json!({"error": "Invalid request"}));
            }
        };

        // Handlers block on the store and on outbound downloads
        let result = web::block(move || {
            social_plus::router::route(store.get_ref(), &OutboundFetcher, spin_req)
        })
        .await;

        match result {
            Ok(Ok(spin_resp)) => adapter::spin_to_actix_response(spin_resp),
            Ok(Err(e)) => {
                tracing::error!(error = %e, "handler failed");
                HttpResponse::InternalServerError()
                    .json(serde_json::json!({"error": "Internal server error"}))
            }
            Err(e) => {
                tracing::error!(error = %e, "worker pool failed");
                HttpResponse::InternalServerError()
                    .json(serde_json::json!({"error": "Internal server error"}))
            }
        }
    }
}

#[cfg(not(target_arch = "wasm32"))]
#[actix_web::main]
async fn main() -> std::io::Result<()> {
    native::run().await
}

#[cfg(target_arch = "wasm32")]
fn main() {}
