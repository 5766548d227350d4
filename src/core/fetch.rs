/// Downloads remote files on behalf of the bookmarking handlers.
pub trait ImageFetcher {
    fn fetch(&self, url: &str) -> anyhow::Result<Vec<u8>>;
}

/// Fetcher backed by the host's outbound HTTP: Spin's client inside the
/// component, a blocking reqwest client on the native host.
#[derive(Default, Clone, Copy)]
pub struct OutboundFetcher;

#[cfg(target_arch = "wasm32")]
impl ImageFetcher for OutboundFetcher {
    fn fetch(&self, url: &str) -> anyhow::Result<Vec<u8>> {
        use spin_sdk::http::{Method, Request, Response};

        let request = Request::builder().method(Method::Get).uri(url).build();
        let response: Response = spin_sdk::http::run(spin_sdk::http::send(request))?;
        let status = *response.status();
        if !(200..300).contains(&status) {
            anyhow::bail!("{} responded with status {}", url, status);
        }
        Ok(response.body().to_vec())
    }
}

#[cfg(not(target_arch = "wasm32"))]
impl ImageFetcher for OutboundFetcher {
    fn fetch(&self, url: &str) -> anyhow::Result<Vec<u8>> {
        let response = reqwest::blocking::get(url)?.error_for_status()?;
        Ok(response.bytes()?.to_vec())
    }
}
