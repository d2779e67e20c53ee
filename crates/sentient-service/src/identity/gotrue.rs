//! Supabase Auth (GoTrue) client.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::types::{AuthSession, IdentityUser, SignUpRequest, SignUpResult, UserMetadata};
use super::{IdentityError, IdentityProvider, Result};

/// GoTrue error body. Newer servers send `error_code`/`msg`, older ones
/// `error`/`error_description`.
#[derive(Debug, Default, Deserialize)]
struct GoTrueErrorBody {
    #[serde(default)]
    error_code: Option<String>,
    #[serde(default)]
    msg: Option<String>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    error_description: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Serialize)]
struct SignUpBody<'a> {
    email: &'a str,
    password: &'a str,
    data: UserMetadata,
}

#[derive(Debug, Serialize)]
struct PasswordGrant<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Debug, Serialize)]
struct RecoverBody<'a> {
    email: &'a str,
}

/// Sign-up answers with a session when auto-confirm is on, else with the
/// bare user awaiting confirmation.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SignUpResponse {
    Session(AuthSession),
    User(IdentityUser),
}

/// Supabase Auth API client.
#[derive(Debug, Clone)]
pub struct GoTrueClient {
    client: Client,
    auth_url: String,
    anon_key: String,
}

impl GoTrueClient {
    /// Create a client for the project at `project_url`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(project_url: &str, anon_key: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| IdentityError::Configuration(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            auth_url: format!("{}/auth/v1", project_url.trim_end_matches('/')),
            anon_key: anon_key.into(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{path}", self.auth_url)
    }

    /// Handle a GoTrue response, classifying errors by their error code.
    async fn handle_response<T: DeserializeOwned>(response: Response) -> Result<T> {
        if response.status().is_success() {
            return Ok(response.json().await?);
        }
        Err(Self::error_from(response).await)
    }

    async fn expect_success(response: Response) -> Result<()> {
        if response.status().is_success() {
            return Ok(());
        }
        Err(Self::error_from(response).await)
    }

    async fn error_from(response: Response) -> IdentityError {
        let status = response.status();
        let body: GoTrueErrorBody = response.json().await.unwrap_or_default();
        let code = body.error_code.or(body.error);
        let message = body
            .msg
            .or(body.error_description)
            .or(body.message)
            .unwrap_or_else(|| format!("HTTP {status}"));

        tracing::debug!(status = %status, code = ?code, error = %message, "Auth request failed");

        match code.as_deref() {
            Some("invalid_credentials" | "invalid_grant") => IdentityError::InvalidCredentials,
            Some("user_already_exists" | "email_exists") => IdentityError::AlreadyRegistered,
            Some("weak_password") => IdentityError::WeakPassword(message),
            Some("bad_jwt" | "session_not_found" | "user_not_found") => IdentityError::InvalidToken,
            Some("over_request_rate_limit" | "over_email_send_rate_limit") => {
                IdentityError::RateLimited
            }
            _ if status == StatusCode::UNAUTHORIZED => IdentityError::InvalidToken,
            _ if status == StatusCode::TOO_MANY_REQUESTS => IdentityError::RateLimited,
            _ => IdentityError::Api {
                status: status.as_u16(),
                code,
                message,
            },
        }
    }
}

#[async_trait]
impl IdentityProvider for GoTrueClient {
    async fn sign_up(&self, request: &SignUpRequest) -> Result<SignUpResult> {
        let body = SignUpBody {
            email: &request.email,
            password: &request.password,
            data: UserMetadata {
                full_name: Some(request.full_name.clone()),
            },
        };

        let response = self
            .client
            .post(self.url("signup"))
            .header("apikey", &self.anon_key)
            .json(&body)
            .send()
            .await?;

        Ok(match Self::handle_response::<SignUpResponse>(response).await? {
            SignUpResponse::Session(session) => SignUpResult {
                user: session.user.clone(),
                session: Some(session),
            },
            SignUpResponse::User(user) => SignUpResult {
                user,
                session: None,
            },
        })
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession> {
        let response = self
            .client
            .post(self.url("token"))
            .query(&[("grant_type", "password")])
            .header("apikey", &self.anon_key)
            .json(&PasswordGrant { email, password })
            .send()
            .await?;

        Self::handle_response(response).await
    }

    async fn sign_out(&self, access_token: &str) -> Result<()> {
        let response = self
            .client
            .post(self.url("logout"))
            .header("apikey", &self.anon_key)
            .bearer_auth(access_token)
            .send()
            .await?;

        Self::expect_success(response).await
    }

    async fn request_password_reset(&self, email: &str, redirect_to: &str) -> Result<()> {
        let response = self
            .client
            .post(self.url("recover"))
            .query(&[("redirect_to", redirect_to)])
            .header("apikey", &self.anon_key)
            .json(&RecoverBody { email })
            .send()
            .await?;

        Self::expect_success(response).await
    }

    async fn get_user(&self, access_token: &str) -> Result<IdentityUser> {
        let response = self
            .client
            .get(self.url("user"))
            .header("apikey", &self.anon_key)
            .bearer_auth(access_token)
            .send()
            .await?;

        Self::handle_response(response).await
    }
}
