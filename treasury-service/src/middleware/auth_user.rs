use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use treasury_core::error::AppError;

/// Authenticated caller extracted from the gateway headers.
///
/// The edge gateway authenticates the session and forwards the identity
/// as X-User-Id / X-User-Role / X-Company-Id. These headers are only
/// trusted because the service is never exposed without the gateway in
/// front of it.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: i64,
    pub role: String,
    pub company_id: Option<i64>,
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let id = parts
            .headers
            .get("X-User-Id")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<i64>().ok())
            .ok_or_else(|| {
                AppError::Unauthorized(anyhow::anyhow!("Missing or invalid X-User-Id header"))
            })?;

        let role = parts
            .headers
            .get("X-User-Role")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("user")
            .to_string();

        let company_id = parts
            .headers
            .get("X-Company-Id")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<i64>().ok());

        // Add to tracing span for observability
        tracing::Span::current().record("user_id", id);

        Ok(AuthUser { id, role, company_id })
    }
}
