//! services/api/src/adapters/identity.rs
//!
//! This module contains the identity adapter, which is the concrete
//! implementation of the `IdentityService` port from the `core` crate. It
//! verifies a caller's bearer token by asking the identity provider who the
//! token belongs to; the provider's answer is the only source of truth.

use async_trait::async_trait;
use serde::Deserialize;
use uuid::Uuid;

use lessonlab_core::domain::AuthUser;
use lessonlab_core::ports::{IdentityService, PortError, PortResult};

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An identity adapter backed by the hosted provider's `/auth/v1/user`
/// endpoint. The service-role key is sent as the api key; this is safe
/// because the call never leaves the server.
#[derive(Clone)]
pub struct SupabaseIdentityAdapter {
    http: reqwest::Client,
    user_url: String,
    service_key: String,
}

impl SupabaseIdentityAdapter {
    /// Creates a new `SupabaseIdentityAdapter` for the project at `base_url`.
    pub fn new(http: reqwest::Client, base_url: &str, service_key: String) -> Self {
        Self {
            http,
            user_url: format!("{}/auth/v1/user", base_url.trim_end_matches('/')),
            service_key,
        }
    }
}

/// The provider's user payload. Both fields must be present for the token
/// to count as verified.
#[derive(Deserialize)]
struct UserResponse {
    id: Option<Uuid>,
    email: Option<String>,
}

//=========================================================================================
// `IdentityService` Trait Implementation
//=========================================================================================

#[async_trait]
impl IdentityService for SupabaseIdentityAdapter {
    async fn verify_token(&self, token: &str) -> PortResult<AuthUser> {
        let response = self
            .http
            .get(&self.user_url)
            .header("apikey", &self.service_key)
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        if !response.status().is_success() {
            return Err(PortError::Unauthorized);
        }

        let user = response
            .json::<UserResponse>()
            .await
            .map_err(|_| PortError::Unauthorized)?;

        match (user.id, user.email) {
            (Some(id), Some(email)) => Ok(AuthUser { id, email }),
            _ => Err(PortError::Unauthorized),
        }
    }
}
