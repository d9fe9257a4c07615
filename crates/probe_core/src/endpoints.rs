//! Pure URL builders for every probed endpoint.
//!
//! Nothing here performs I/O; the same functions feed the real calls and the
//! report output.

use reqwest::Url;

/// Fixed HTTP routes below `{base}/api/{version}/`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Route {
    /// `auth/login`
    Login,
    /// `registry/register`
    Register,
    /// `registry/heartbeat`
    Heartbeat,
    /// `registry/allocate`
    Allocate,
    /// `registry/disconnect`
    Disconnect,
}

impl Route {
    /// Path of the route relative to the versioned API root.
    pub const fn path(self) -> &'static str {
        match self {
            Self::Login => "auth/login",
            Self::Register => "registry/register",
            Self::Heartbeat => "registry/heartbeat",
            Self::Allocate => "registry/allocate",
            Self::Disconnect => "registry/disconnect",
        }
    }

    /// Every route, in the order the suites call them.
    pub const ALL: [Route; 5] = [
        Self::Login,
        Self::Register,
        Self::Heartbeat,
        Self::Allocate,
        Self::Disconnect,
    ];
}

/// Builds `{base_url}/api/{api_version}/{route}`.
///
/// A trailing `/` on `base_url` is ignored.
pub fn endpoint_url(base_url: &str, api_version: &str, route: Route) -> String {
    format!(
        "{}/api/{}/{}",
        base_url.trim_end_matches('/'),
        api_version,
        route.path()
    )
}

/// Builds the relay URL: http→ws, https→wss, then `/ws?token={token}`.
///
/// A base that already uses ws(s) is kept as-is. The token is
/// form-encoded, so opaque tokens with reserved characters survive the
/// query string.
pub fn websocket_url(base_url: &str, token: &str) -> String {
    let base = base_url.trim_end_matches('/');
    let ws_base = if let Some(rest) = base.strip_prefix("https://") {
        format!("wss://{rest}")
    } else if let Some(rest) = base.strip_prefix("http://") {
        format!("ws://{rest}")
    } else {
        base.to_string()
    };

    let endpoint = format!("{ws_base}/ws");
    match Url::parse(&endpoint) {
        Ok(mut url) => {
            url.query_pairs_mut().append_pair("token", token);
            url.into()
        }
        // Left for the handshake to report.
        Err(_) => format!("{endpoint}?token={token}"),
    }
}
