//! Client for the authentication service.

use crate::endpoints::{endpoint_url, Route};
use crate::envelope::ResponseEnvelope;
use crate::error::Result;
use crate::http::post_json;
use crate::types::{AuthenticationResponse, Credentials};
use reqwest::Client;

/// Issues login calls against `{base_url}/api/{api_version}/auth/login`.
#[derive(Debug, Clone)]
pub struct AuthServiceClient {
    http: Client,
    base_url: String,
    api_version: String,
}

impl AuthServiceClient {
    /// Creates a client sharing the given HTTP connection pool.
    pub fn new(http: Client, base_url: impl Into<String>, api_version: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into(),
            api_version: api_version.into(),
        }
    }

    /// Sends `{username, password}` and returns the enveloped response.
    ///
    /// A rejected login is an `Ok` envelope with a non-success status.
    pub async fn login(
        &self,
        credentials: &Credentials,
    ) -> Result<ResponseEnvelope<AuthenticationResponse>> {
        post_json(
            &self.http,
            &self.login_url(),
            Some(&credentials.to_login_request()),
            None,
        )
        .await
    }

    /// URL of the login endpoint.
    pub fn login_url(&self) -> String {
        endpoint_url(&self.base_url, &self.api_version, Route::Login)
    }
}
