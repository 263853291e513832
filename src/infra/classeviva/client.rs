use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};

use crate::config::PortalConfig;
use crate::error::PortalError;
use crate::fetch::auth::HeaderAuth;
use crate::fetch::{BasicClient, fetch_json, get_request, post_json_request};
use crate::records::RawRecord;
use crate::services::{PortalApi, PortalSession, Profile};

#[derive(Serialize)]
struct LoginRequest<'a> {
    ident: Option<&'a str>,
    pass: &'a str,
    uid: &'a str,
}

#[derive(Deserialize)]
struct LoginResponse {
    #[serde(default)]
    ident: String,
    token: String,
}

/// Classeviva (Spaggiari) REST portal.
pub struct ClassevivaPortal {
    http: HeaderAuth<BasicClient>,
    base_url: String,
}

impl ClassevivaPortal {
    pub fn new(config: &PortalConfig) -> anyhow::Result<Self> {
        let basic = BasicClient::from_config(config)?;
        Ok(Self {
            http: HeaderAuth::dev_key(basic, &config.api_key)?,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl PortalApi for ClassevivaPortal {
    type Session = ClassevivaSession;

    #[tracing::instrument(skip_all, fields(username = %username))]
    async fn authenticate(
        &self,
        username: &str,
        password: &str,
    ) -> Result<ClassevivaSession, PortalError> {
        let url = format!("{}/auth/login", self.base_url);
        let body = LoginRequest {
            ident: None,
            pass: password,
            uid: username,
        };

        let json = match fetch_json(&self.http, post_json_request(&url, &body)?).await {
            Ok(json) => json,
            Err(PortalError::Status { status, .. }) if is_rejection(status) => {
                return Err(PortalError::Authentication(format!(
                    "portal refused the credentials (status {status})"
                )));
            }
            Err(e) => return Err(e),
        };

        let login: LoginResponse = serde_json::from_value(json)
            .map_err(|e| PortalError::Decode(format!("login response: {e}")))?;
        let student_id = student_id(&login.ident).ok_or_else(|| {
            PortalError::Decode(format!("no student id in ident '{}'", login.ident))
        })?;

        let http = HeaderAuth::session_token(self.http.clone(), &login.token)
            .map_err(|e| PortalError::Decode(format!("unusable session token: {e}")))?;

        info!(student_id = %student_id, "Session established");
        Ok(ClassevivaSession {
            http,
            base_url: self.base_url.clone(),
            student_id,
        })
    }
}

/// An authenticated Classeviva session for one student.
pub struct ClassevivaSession {
    http: HeaderAuth<HeaderAuth<BasicClient>>,
    base_url: String,
    student_id: String,
}

impl ClassevivaSession {
    async fn get(&self, resource: &str) -> Result<Value, PortalError> {
        let url = format!("{}/students/{}/{}", self.base_url, self.student_id, resource);
        debug!(resource, "GET");
        match fetch_json(&self.http, get_request(&url)?).await {
            Err(PortalError::Status { status, .. }) if is_rejection(status) => Err(
                PortalError::Authentication(format!("session rejected (status {status})")),
            ),
            other => other,
        }
    }
}

#[async_trait]
impl PortalSession for ClassevivaSession {
    async fn fetch_grades(&self) -> Result<Vec<RawRecord>, PortalError> {
        let json = self.get("grades").await?;
        Ok(records_under(&json, "grades"))
    }

    async fn fetch_absences(&self) -> Result<Vec<RawRecord>, PortalError> {
        let json = self.get("absences/details").await?;
        Ok(records_under(&json, "events"))
    }

    async fn fetch_profile(&self) -> Result<Profile, PortalError> {
        let json = self.get("card").await?;
        let display_name = json["card"]["firstName"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| PortalError::Decode("card has no firstName".into()))?;
        Ok(Profile { display_name })
    }
}

fn is_rejection(status: u16) -> bool {
    matches!(
        StatusCode::from_u16(status),
        Ok(StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN | StatusCode::UNPROCESSABLE_ENTITY)
    )
}

/// The portal's `ident` looks like `S1234567X`; the numeric part addresses the student.
fn student_id(ident: &str) -> Option<String> {
    let digits: String = ident.chars().filter(char::is_ascii_digit).collect();
    (!digits.is_empty()).then_some(digits)
}

/// Objects in the array under `key`. A missing key reads as an empty list.
fn records_under(json: &Value, key: &str) -> Vec<RawRecord> {
    json.get(key)
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(|v| v.as_object().cloned()).collect())
        .unwrap_or_default()
}
