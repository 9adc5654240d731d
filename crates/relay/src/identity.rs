//! Request-derived enrichment: client IP and caller identity.
//!
//! The hosting platform passes the authenticated caller as a base64 JSON
//! client context. Only descriptive claims are copied onto the event; the
//! identity token in the same context is never forwarded.

use axum::http::HeaderMap;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::Deserialize;
use serde_json::{Map, Value};

/// Header carrying the original client address.
pub const CLIENT_IP_HEADER: &str = "x-nf-client-connection-ip";
/// Standard proxy header, consulted when the platform header is absent.
pub const FORWARDED_FOR_HEADER: &str = "x-forwarded-for";
/// Header carrying the base64 JSON client context.
pub const CLIENT_CONTEXT_HEADER: &str = "x-client-context";
/// Address used when no forwarding header is present.
pub const DEFAULT_CLIENT_IP: &str = "127.0.0.1";
/// Prefix for every identity-derived event field.
pub const IDENTITY_PREFIX: &str = "identity_";

/// Resolve the caller's IP from forwarding headers.
pub fn client_ip(headers: &HeaderMap) -> String {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
    };

    header(CLIENT_IP_HEADER)
        .or_else(|| {
            header(FORWARDED_FOR_HEADER)
                .and_then(|v| v.split(',').next())
                .map(str::trim)
        })
        .unwrap_or(DEFAULT_CLIENT_IP)
        .to_string()
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ClientContext {
    #[serde(default)]
    pub identity: Option<IdentityEndpoint>,
    #[serde(default)]
    pub user: Option<UserClaims>,
}

#[derive(Clone, Default, Deserialize)]
pub struct IdentityEndpoint {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub token: Option<String>,
}

impl std::fmt::Debug for IdentityEndpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdentityEndpoint")
            .field("url", &self.url)
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserClaims {
    #[serde(default)]
    pub sub: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    /// Expiry, epoch seconds.
    #[serde(default)]
    pub exp: Option<i64>,
    #[serde(default)]
    pub app_metadata: Option<AppMetadata>,
    #[serde(default)]
    pub user_metadata: Option<UserMetadata>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppMetadata {
    #[serde(default)]
    pub provider: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserMetadata {
    #[serde(default)]
    pub full_name: Option<String>,
}

/// Why a client context header could not be used.
#[derive(Debug, thiserror::Error)]
pub enum ContextError {
    #[error("client context is not valid base64: {0}")]
    Encoding(#[from] base64::DecodeError),

    #[error("client context is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

impl ClientContext {
    /// Decode a base64 JSON client context.
    pub fn decode(raw: &str) -> Result<Self, ContextError> {
        let bytes = STANDARD.decode(raw.trim())?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Read the context from request headers, if one was sent.
    ///
    /// An undecodable context is logged and treated as absent.
    pub fn from_headers(headers: &HeaderMap) -> Option<Self> {
        let raw = headers.get(CLIENT_CONTEXT_HEADER)?.to_str().ok()?;
        match Self::decode(raw) {
            Ok(ctx) => Some(ctx),
            Err(e) => {
                tracing::warn!(error = %e, "Ignoring client context");
                None
            }
        }
    }

    /// Identity-derived fields, all under [`IDENTITY_PREFIX`].
    pub fn identity_fields(&self) -> Map<String, Value> {
        let mut fields = Map::new();
        let mut put = |name: &str, value: Option<Value>| {
            if let Some(value) = value {
                fields.insert(format!("{IDENTITY_PREFIX}{name}"), value);
            }
        };

        if let Some(identity) = &self.identity {
            put("url", identity.url.clone().map(Value::String));
        }

        if let Some(user) = &self.user {
            put("user_id", user.sub.clone().map(Value::String));
            put("email", user.email.clone().map(Value::String));
            put(
                "provider",
                user.app_metadata
                    .as_ref()
                    .and_then(|m| m.provider.clone())
                    .map(Value::String),
            );
            put(
                "full_name",
                user.user_metadata
                    .as_ref()
                    .and_then(|m| m.full_name.clone())
                    .map(Value::String),
            );
            put(
                "expires_at",
                user.exp
                    .and_then(|exp| chrono::DateTime::from_timestamp(exp, 0))
                    .map(|at| Value::String(at.to_rfc3339())),
            );
        }

        fields
    }
}
