use crate::fetch::client::HttpClient;
use async_trait::async_trait;
use reqwest::header::{HeaderName, HeaderValue};

/// Header carrying the application key on every portal request.
pub const DEV_KEY_HEADER: &str = "Z-Dev-Apikey";

/// Header carrying the session token once logged in.
pub const AUTH_TOKEN_HEADER: &str = "Z-Auth-Token";

/// An [`HttpClient`] wrapper that sets one header on every request.
///
/// Name and value are validated up front so sending can't fail on them.
/// Wrappers nest: the portal session is a token header around a dev-key
/// header around the basic client.
#[derive(Clone)]
pub struct HeaderAuth<C> {
    inner: C,
    name: HeaderName,
    value: HeaderValue,
}

impl<C> HeaderAuth<C> {
    pub fn new(inner: C, name: &str, value: &str) -> anyhow::Result<Self> {
        let name = HeaderName::from_bytes(name.as_bytes())?;
        let mut value = HeaderValue::from_str(value)?;
        value.set_sensitive(true);
        Ok(Self { inner, name, value })
    }

    /// Application key header, required by every endpoint.
    pub fn dev_key(inner: C, key: &str) -> anyhow::Result<Self> {
        Self::new(inner, DEV_KEY_HEADER, key)
    }

    /// Session token header, required by every student endpoint.
    pub fn session_token(inner: C, token: &str) -> anyhow::Result<Self> {
        Self::new(inner, AUTH_TOKEN_HEADER, token)
    }

    pub fn header_name(&self) -> &HeaderName {
        &self.name
    }
}

#[async_trait]
impl<C: HttpClient> HttpClient for HeaderAuth<C> {
    async fn execute(&self, mut req: reqwest::Request) -> reqwest::Result<reqwest::Response> {
        req.headers_mut().insert(self.name.clone(), self.value.clone());
        self.inner.execute(req).await
    }
}
