//! Client for the game-server registry service.

use crate::endpoints::{endpoint_url, Route};
use crate::envelope::ResponseEnvelope;
use crate::error::Result;
use crate::http::post_json;
use crate::types::{
    AllocateServerResponse, AuthToken, DisconnectRequest, DisconnectResponse, HeartbeatRequest,
    HeartbeatResponse, RegisterServerRequest, RegisterServerResponse,
};
use reqwest::Client;

/// Issues registry calls against `{base_url}/api/{api_version}/registry/*`.
#[derive(Debug, Clone)]
pub struct RegistryServiceClient {
    http: Client,
    base_url: String,
    api_version: String,
}

impl RegistryServiceClient {
    /// Creates a client sharing the given HTTP connection pool.
    pub fn new(http: Client, base_url: impl Into<String>, api_version: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into(),
            api_version: api_version.into(),
        }
    }

    /// Registers a game server.
    pub async fn register(
        &self,
        request: &RegisterServerRequest,
    ) -> Result<ResponseEnvelope<RegisterServerResponse>> {
        post_json(&self.http, &self.url(Route::Register), Some(request), None).await
    }

    /// Reports the current player count of a registered server.
    pub async fn heartbeat(
        &self,
        request: &HeartbeatRequest,
    ) -> Result<ResponseEnvelope<HeartbeatResponse>> {
        post_json(&self.http, &self.url(Route::Heartbeat), Some(request), None).await
    }

    /// Asks for a free server. Sends no body; `token` becomes a bearer header.
    pub async fn allocate(
        &self,
        token: Option<&AuthToken>,
    ) -> Result<ResponseEnvelope<AllocateServerResponse>> {
        post_json::<(), _>(&self.http, &self.url(Route::Allocate), None, token).await
    }

    /// Releases a server.
    pub async fn disconnect(
        &self,
        request: &DisconnectRequest,
        token: Option<&AuthToken>,
    ) -> Result<ResponseEnvelope<DisconnectResponse>> {
        post_json(&self.http, &self.url(Route::Disconnect), Some(request), token).await
    }

    /// URL of a registry route.
    pub fn url(&self, route: Route) -> String {
        endpoint_url(&self.base_url, &self.api_version, route)
    }
}
