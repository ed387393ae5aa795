//! Caller identity extraction.
//!
//! The gateway authenticates the user and forwards their identity in headers;
//! this service only scopes data access by company. Role 1 is the
//! cross-company superadmin and bypasses company scoping.

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use service_core::error::AppError;
use uuid::Uuid;

pub const SUPERADMIN_ROLE: i32 = 1;

/// Authenticated caller identity, set upstream by the gateway.
#[derive(Debug, Clone, Copy)]
pub struct AuthContext {
    pub user_id: Uuid,
    pub company_id: Uuid,
    pub role_id: i32,
}

impl AuthContext {
    pub fn is_superadmin(&self) -> bool {
        self.role_id == SUPERADMIN_ROLE
    }

    /// Whether the caller may act on data belonging to `id_empresa`.
    pub fn can_access_company(&self, id_empresa: Uuid) -> bool {
        self.is_superadmin() || self.company_id == id_empresa
    }
}

fn header_uuid(parts: &Parts, name: &str) -> Result<Uuid, AppError> {
    parts
        .headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| {
            AppError::Unauthorized(anyhow::anyhow!("Missing {} header (required from gateway)", name))
        })?
        .parse::<Uuid>()
        .map_err(|_| AppError::Unauthorized(anyhow::anyhow!("Invalid {} header", name)))
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthContext
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user_id = header_uuid(parts, "X-User-ID")?;
        let company_id = header_uuid(parts, "X-Company-ID")?;
        let role_id = parts
            .headers
            .get("X-Role-ID")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.parse::<i32>().ok())
            .ok_or_else(|| {
                AppError::Unauthorized(anyhow::anyhow!(
                    "Missing or invalid X-Role-ID header (required from gateway)"
                ))
            })?;

        Ok(AuthContext {
            user_id,
            company_id,
            role_id,
        })
    }
}
