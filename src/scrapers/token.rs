//! One-shot capture of the API authorization credential.
//!
//! The site's frontend talks to its API with a bearer token minted during
//! page load. A headless browser visits the listing once, network traffic is
//! observed through the devtools protocol, and the first request seen
//! carrying an `Authorization` header gives up its value.

use anyhow::{Context, Result};
use headless_chrome::{Browser, LaunchOptions};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;
use tracing::{debug, info};

const HANDLER_NAME: &str = "authorization_capture";

/// Visit `url` and return the first `Authorization` request-header value
/// observed within `wait`. Errors when nothing authorized goes over the wire
/// in that window; there is no retry.
pub fn acquire_token(url: &str, wait: Duration) -> Result<String> {
    info!("Launching headless Chrome for token capture...");

    let options = LaunchOptions::default_builder()
        .headless(true)
        .build()
        .context("Failed to build launch options")?;
    let browser = Browser::new(options).context("Failed to launch Chrome browser")?;

    let tab = browser.new_tab().context("Failed to open a tab")?;

    let captured: Arc<Mutex<Option<String>>> = Arc::new(Mutex::new(None));
    let sink = captured.clone();

    // Response events echo the headers the matching request actually sent.
    tab.register_response_handling(
        HANDLER_NAME,
        Box::new(move |event_params, _fetch_body| {
            let headers = match serde_json::to_value(&event_params.response.request_headers) {
                Ok(headers) => headers,
                Err(_) => return,
            };
            if let Some(token) = authorization_header(&headers) {
                let mut slot = sink.lock().unwrap();
                if slot.is_none() {
                    debug!("Authorization header seen on {}", event_params.response.url);
                    *slot = Some(token);
                }
            }
        }),
    )
    .context("Failed to register response handler")?;

    tab.navigate_to(url)?;
    tab.wait_until_navigated()?;
    thread::sleep(wait);

    let _ = tab.deregister_response_handling(HANDLER_NAME);

    let token = captured
        .lock()
        .unwrap()
        .take()
        .context("no authorized request observed during token capture")?;
    info!("Captured authorization token ({} bytes)", token.len());
    Ok(token)
}

/// Case-insensitive `Authorization` lookup in a serialized header map.
fn authorization_header(headers: &serde_json::Value) -> Option<String> {
    headers.as_object()?.iter().find_map(|(name, value)| {
        if name.eq_ignore_ascii_case("authorization") {
            value.as_str().map(str::to_string)
        } else {
            None
        }
    })
}
