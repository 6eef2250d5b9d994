//! Bearer-token gate for protected routes.
//!
//! Extracts `Authorization: Bearer <token>`, verifies signature and expiry,
//! and on success stores the authenticated principal in request extensions
//! for handlers to pick up via the `CurrentUser` extractor. All failures
//! are answered here; nothing auth-related propagates further.

use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    extract::State,
    http::{Request, header},
    middleware::{self, Next},
    response::Response,
};

use crate::api::v1::extractors::CurrentUser;
use crate::error::ApiError;
use crate::services::auth::jwt::{TokenKeys, VerifyError};
use crate::state::AppState;

/// Wrap `router` so every route in it requires a valid access token.
pub fn apply(router: Router<AppState>, keys: Arc<TokenKeys>) -> Router<AppState> {
    router.layer(middleware::from_fn_with_state(keys, require_auth))
}

async fn require_auth(
    State(keys): State<Arc<TokenKeys>>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    // Extraction is purely syntactic: the header must exist, start with the
    // exact scheme `Bearer `, and carry a non-empty token before we look at
    // the token contents at all.
    let token = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .filter(|token| !token.trim().is_empty())
        .ok_or(ApiError::MissingToken)?;

    let verified = match keys.verify(token) {
        Ok(v) => v,
        Err(VerifyError::Expired) => return Err(ApiError::TokenExpired),
        Err(VerifyError::Invalid) => return Err(ApiError::TokenInvalid),
        Err(VerifyError::Unexpected(err)) => {
            tracing::error!(error = %err, "unexpected failure during token verification");
            return Err(ApiError::AuthVerification);
        }
    };

    // middleware -> extractor hand-off
    req.extensions_mut()
        .insert(CurrentUser::new(verified.user_id));

    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{Extension, http::StatusCode, routing::get};
    use http_body_util::BodyExt;
    use serde_json::Value;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tower::ServiceExt;
    use uuid::Uuid;

    const SECRET: &str = "gate-test-secret";

    /// Router with a single protected route that echoes the principal id
    /// and counts how many times the handler actually ran.
    fn protected_app(keys: Arc<TokenKeys>, calls: Arc<AtomicUsize>) -> Router<()> {
        let handler = move |Extension(user): Extension<CurrentUser>| {
            let calls = calls.clone();
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                user.id.to_string()
            }
        };

        Router::new()
            .route("/me", get(handler))
            .layer(middleware::from_fn_with_state(keys, require_auth))
    }

    fn request(auth_header: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().method("GET").uri("/me");
        if let Some(value) = auth_header {
            builder = builder.header("authorization", value);
        }
        builder.body(Body::empty()).unwrap()
    }

    async fn body_json(resp: Response) -> Value {
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn missing_header_is_rejected_before_the_handler() {
        let keys = Arc::new(TokenKeys::new(SECRET, 600));
        let calls = Arc::new(AtomicUsize::new(0));
        let app = protected_app(keys, calls.clone());

        let resp = app.oneshot(request(None)).await.unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

        let body = body_json(resp).await;
        assert_eq!(
            body["message"],
            "Not authorized to access this route. Please provide a valid token."
        );
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn wrong_scheme_is_treated_as_missing_token() {
        let keys = Arc::new(TokenKeys::new(SECRET, 600));
        let calls = Arc::new(AtomicUsize::new(0));
        let app = protected_app(keys.clone(), calls.clone());

        // Well-formed token, wrong scheme: still a syntactic failure.
        let token = keys.sign(Uuid::new_v4()).unwrap();
        let resp = app
            .oneshot(request(Some(&format!("Token {token}"))))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

        let body = body_json(resp).await;
        assert_eq!(
            body["message"],
            "Not authorized to access this route. Please provide a valid token."
        );
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn empty_token_is_treated_as_missing_token() {
        let keys = Arc::new(TokenKeys::new(SECRET, 600));
        let calls = Arc::new(AtomicUsize::new(0));

        // Scheme present but no token: a syntactic failure, never verified.
        for value in ["Bearer ", "Bearer    "] {
            let app = protected_app(keys.clone(), calls.clone());
            let resp = app.oneshot(request(Some(value))).await.unwrap();
            assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

            let body = body_json(resp).await;
            assert_eq!(
                body["message"],
                "Not authorized to access this route. Please provide a valid token."
            );
        }
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn badly_signed_token_is_rejected_as_invalid() {
        let keys = Arc::new(TokenKeys::new(SECRET, 600));
        let other = TokenKeys::new("a-different-secret", 600);
        let calls = Arc::new(AtomicUsize::new(0));
        let app = protected_app(keys, calls.clone());

        let token = other.sign(Uuid::new_v4()).unwrap();
        let resp = app
            .oneshot(request(Some(&format!("Bearer {token}"))))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

        let body = body_json(resp).await;
        assert_eq!(body["message"], "Invalid token");
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn expired_token_gets_its_own_message() {
        use crate::services::auth::jwt::AccessTokenClaims;
        use jsonwebtoken::{Algorithm, EncodingKey, Header};

        let keys = Arc::new(TokenKeys::new(SECRET, 600));
        let calls = Arc::new(AtomicUsize::new(0));
        let app = protected_app(keys, calls.clone());

        let now = chrono::Utc::now().timestamp() as u64;
        let claims = AccessTokenClaims {
            sub: Uuid::new_v4().to_string(),
            iat: now - 7200,
            exp: now - 3600,
        };
        let token = jsonwebtoken::encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap();

        let resp = app
            .oneshot(request(Some(&format!("Bearer {token}"))))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

        let body = body_json(resp).await;
        assert_eq!(body["message"], "Token has expired");
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn valid_token_reaches_the_handler_exactly_once_with_the_subject() {
        let keys = Arc::new(TokenKeys::new(SECRET, 600));
        let calls = Arc::new(AtomicUsize::new(0));
        let app = protected_app(keys.clone(), calls.clone());

        let user_id = Uuid::new_v4();
        let token = keys.sign(user_id).unwrap();
        let resp = app
            .oneshot(request(Some(&format!("Bearer {token}"))))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(bytes, user_id.to_string().as_bytes());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn the_same_token_verifies_twice_with_identical_outcomes() {
        let keys = Arc::new(TokenKeys::new(SECRET, 600));
        let calls = Arc::new(AtomicUsize::new(0));

        let user_id = Uuid::new_v4();
        let token = keys.sign(user_id).unwrap();

        for expected_calls in 1..=2 {
            let app = protected_app(keys.clone(), calls.clone());
            let resp = app
                .oneshot(request(Some(&format!("Bearer {token}"))))
                .await
                .unwrap();
            assert_eq!(resp.status(), StatusCode::OK);

            let bytes = resp.into_body().collect().await.unwrap().to_bytes();
            assert_eq!(bytes, user_id.to_string().as_bytes());
            assert_eq!(calls.load(Ordering::SeqCst), expected_calls);
        }
    }
}
