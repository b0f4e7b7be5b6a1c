use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Supplier collaborator record. Only the attributes the payable
/// workflow reads: notification preferences and the REP requirement.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Supplier {
    pub id: i64,
    pub company_id: i64,
    pub name: String,
    pub email: Option<String>,
    pub email_notifications: bool,
    pub requires_rep: bool,
    pub created_at: DateTime<Utc>,
}
