use axum::{
    extract::{Extension, Query},
    response::Json,
};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::config;
use crate::guard::{self, RoutingDecision};
use crate::middleware::{ApiResponse, ApiResult, TenantContext};

#[derive(Debug, Deserialize)]
pub struct WhoamiQuery {
    /// Client's current location, used to compute the routing decision
    pub location: Option<String>,
}

/// GET /api/auth/whoami - Echo the resolved identity and tenant, plus the
/// routing decision the client-side guard should apply for this identity.
pub async fn whoami(
    Extension(context): Extension<TenantContext>,
    Query(query): Query<WhoamiQuery>,
) -> ApiResult<Value> {
    let superadmin = &config::config().security.superadmin_email;
    let location = query.location.as_deref().unwrap_or("/");

    let routing = match guard::decide(Some(&context.email), location, superadmin) {
        RoutingDecision::Authorized => json!({ "action": "authorized" }),
        RoutingDecision::Redirect { target } => {
            json!({ "action": "redirect", "target": target })
        }
    };

    Ok(ApiResponse::success(json!({
        "user_id": context.user_id,
        "email": context.email,
        "role": context.role,
        "organization_id": context.organization_id,
        "routing": routing,
    })))
}
