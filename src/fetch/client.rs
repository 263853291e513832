use async_trait::async_trait;
use reqwest::{Request, Response};

/// Something that can send a prepared request. Auth wrappers stack on top of it.
#[async_trait]
pub trait HttpClient: Send + Sync {
    async fn execute(&self, req: Request) -> reqwest::Result<Response>;
}

