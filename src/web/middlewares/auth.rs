use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};
use tower_cookies::Cookies;

use crate::{
    Config, auth,
    model::{CrudRepository, ResourceTyped, entity::UserEntity},
    web::{AppState, RequestContext, context::AuthenticatedUser, error::WebError},
};

/// Access token cookie.
pub static AUTH_TOKEN: &str = "SID";
/// Refresh token cookie.
pub static REFRESH_TOKEN: &str = "RID";

/// `Authorization: Bearer` wins over the cookie.
fn access_token(req: &Request, cookies: &Cookies) -> Option<(String, &'static str)> {
    let bearer = req
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(|t| t.trim().to_string());

    match bearer {
        Some(token) if !token.is_empty() => Some((token, "Authorization")),
        _ => cookies
            .get(AUTH_TOKEN)
            .map(|c| c.value().to_string())
            .filter(|v| !v.is_empty())
            .map(|v| (v, AUTH_TOKEN)),
    }
}

/// Resolves the caller into a [`RequestContext`]. Requests without a token go
/// through anonymously, a bad or expired token is rejected with 401.
pub async fn extract_context_fn(
    State(state): State<AppState>,
    cookies: Cookies,
    mut req: Request,
    next: Next,
) -> Result<Response, WebError> {
    let Some((token, source)) = access_token(&req, &cookies) else {
        req.extensions_mut().insert(RequestContext::new(None));
        return Ok(next.run(req).await);
    };

    let claims = auth::process_token(&token, Config::get_or_init(false).await.app().jwt())
        .map_err(|e| WebError::auth_token_invalid(source, e))?;

    let Ok(id) = claims.claims.sub.parse::<uuid::Uuid>() else {
        return Err(WebError::auth_required());
    };

    // role comes from the database, not the claims
    let found = UserEntity::find_by_id(state.pool(), &AuthenticatedUser::admin(), id)
        .await
        .map_err(|e| WebError::resource_fetch_error(UserEntity::get_resource_type(), e))?;

    let ctx = match found {
        Some(user) => RequestContext::new(Some(user.as_actor())),
        None => RequestContext::new(None),
    };
    req.extensions_mut().insert(ctx);

    Ok(next.run(req).await)
}
