mod basic;
mod client;
pub mod auth;

pub use basic::BasicClient;
pub use client::HttpClient;

use reqwest::header::{CONTENT_TYPE, HeaderValue};
use reqwest::{Method, Request};
use serde::Serialize;
use serde_json::Value;

use crate::error::PortalError;

pub fn get_request(url: &str) -> Result<Request, PortalError> {
    let url = url
        .parse::<reqwest::Url>()
        .map_err(|e| PortalError::InvalidRequest(format!("{url}: {e}")))?;
    Ok(Request::new(Method::GET, url))
}

pub fn post_json_request(url: &str, body: &impl Serialize) -> Result<Request, PortalError> {
    let url = url
        .parse::<reqwest::Url>()
        .map_err(|e| PortalError::InvalidRequest(format!("{url}: {e}")))?;
    let body = serde_json::to_vec(body).map_err(|e| PortalError::InvalidRequest(e.to_string()))?;

    let mut req = Request::new(Method::POST, url);
    req.headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    *req.body_mut() = Some(body.into());
    Ok(req)
}

/// Sends `req` and decodes the body as JSON. Non-2xx statuses become
/// [`PortalError::Status`] carrying the response body.
pub async fn fetch_json<C: HttpClient + ?Sized>(
    client: &C,
    req: Request,
) -> Result<Value, PortalError> {
    let resp = client.execute(req).await?;
    let status = resp.status();

    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(PortalError::Status {
            status: status.as_u16(),
            body,
        });
    }

    resp.json::<Value>()
        .await
        .map_err(|e| PortalError::Decode(e.to_string()))
}
