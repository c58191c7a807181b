//! Browser-facing page and form handlers.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{StatusCode, Uri},
    response::{IntoResponse, Redirect, Response},
    Form,
};
use tracing::warn;

use super::api::{ResetRequest, SendRequest, SignInRequest};
use super::gate::{Access, SIGNED_IN_ROUTE, SIGN_IN_ROUTE};
use super::pages::{self, Page};
use super::AppState;
use crate::contact::ContactForm;
use crate::notify::Notice;
use crate::upgrade::PaymentForm;

fn gated(access: Access, render: impl FnOnce(Option<String>) -> Page) -> Response {
    match access {
        Access::Loading => pages::loader().into_response(),
        Access::Redirect(to) => Redirect::to(to).into_response(),
        Access::Allow(session) => render(session.and_then(|s| s.user.email)).into_response(),
    }
}

pub async fn index() -> Page {
    pages::index()
}

pub async fn not_found(uri: Uri) -> (StatusCode, Page) {
    (StatusCode::NOT_FOUND, pages::not_found(uri.path()))
}

// === Auth ===

pub async fn auth_page(State(state): State<Arc<AppState>>) -> Response {
    gated(state.gate.sign_in_page().await, |_| pages::auth(None))
}

pub async fn sign_in(
    State(state): State<Arc<AppState>>,
    Form(req): Form<SignInRequest>,
) -> Response {
    match state.sign_in(&req.email, &req.password).await {
        Ok(_) => Redirect::to(SIGNED_IN_ROUTE).into_response(),
        Err(e) => {
            let notice = Notice::error("Sign In Failed", e.to_string());
            (StatusCode::UNAUTHORIZED, pages::auth(Some(&notice))).into_response()
        }
    }
}

pub async fn reset_password(
    State(state): State<Arc<AppState>>,
    Form(req): Form<ResetRequest>,
) -> Page {
    let notice = state
        .reset_password(&req.email)
        .await
        .unwrap_or_else(|e| Notice::error("Reset Failed", e.to_string()));
    pages::auth(Some(&notice))
}

pub async fn sign_out(State(state): State<Arc<AppState>>) -> Redirect {
    if let Err(e) = state.sign_out().await {
        warn!(error = %e, "sign out failed");
    }
    Redirect::to("/")
}

// === Contact ===

pub async fn contact_page() -> Page {
    pages::contact(None)
}

pub async fn contact(Form(form): Form<ContactForm>) -> Page {
    let notice = form.submit().unwrap_or_else(|e| e.notice());
    pages::contact(Some(&notice))
}

// === Chat ===

pub async fn chat_page(State(state): State<Arc<AppState>>) -> Response {
    let access = state.gate.protected().await;
    let snapshot = state.chat.snapshot().await;
    gated(access, |email| pages::chat(&snapshot, email.as_deref()))
}

/// Redirects back to the chat page, or to sign in when signed out.
async fn back_to_chat(state: &AppState) -> Redirect {
    if state.gate.session().await.is_some() {
        Redirect::to(SIGNED_IN_ROUTE)
    } else {
        Redirect::to(SIGN_IN_ROUTE)
    }
}

pub async fn send_message(
    State(state): State<Arc<AppState>>,
    Form(req): Form<SendRequest>,
) -> Redirect {
    if state.gate.session().await.is_some() {
        state.chat.send(&req.text).await;
    }
    back_to_chat(&state).await
}

pub async fn new_chat(State(state): State<Arc<AppState>>) -> Redirect {
    if state.gate.session().await.is_some() {
        state.chat.new_chat().await;
    }
    back_to_chat(&state).await
}

pub async fn switch_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Redirect {
    if state.gate.session().await.is_some() {
        state.chat.switch_session(&id).await;
    }
    back_to_chat(&state).await
}

// === Upgrade ===

pub async fn upgrade_page(State(state): State<Arc<AppState>>) -> Response {
    gated(state.gate.protected().await, |_| pages::upgrade(None))
}

pub async fn upgrade(
    State(state): State<Arc<AppState>>,
    Form(form): Form<PaymentForm>,
) -> Response {
    match state.upgrade.submit(&form).await {
        Ok(outcome) => pages::upgrade_complete(&outcome, state.config.redirect_delay).into_response(),
        Err(e) => {
            warn!(route = "/upgrade", error = %e, "upgrade failed");
            pages::upgrade(Some(&e.notice())).into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{Backend, MemoryBackend};
    use crate::config::AppConfig;
    use crate::server::build_router;
    use crate::server::gate::AuthState;
    use axum::body::Body;
    use axum::http::{header, Method, Request};
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    async fn state() -> Arc<AppState> {
        let memory = Arc::new(MemoryBackend::new());
        memory.add_user("jane@example.com", "pw").await;
        Arc::new(AppState::new(AppConfig::default(), Backend::memory(memory)))
    }

    fn get(uri: &str) -> Request<Body> {
        Request::get(uri).body(Body::empty()).unwrap()
    }

    fn post_form(uri: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_text(response: Response) -> String {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    fn location(response: &Response) -> &str {
        response.headers()[header::LOCATION].to_str().unwrap()
    }

    #[tokio::test]
    async fn test_chat_shows_loader_while_loading() {
        let state = state().await;
        let response = build_router(state).oneshot(get("/chat")).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(body_text(response).await.contains("Loading..."));
    }

    #[tokio::test]
    async fn test_signed_out_redirects_to_auth() {
        let state = state().await;
        state.gate.set(AuthState::SignedOut).await;
        let router = build_router(state);

        for path in ["/chat", "/upgrade"] {
            let response = router.clone().oneshot(get(path)).await.unwrap();
            assert_eq!(response.status(), StatusCode::SEE_OTHER);
            assert_eq!(location(&response), "/auth");
        }

        let response = router.oneshot(get("/auth")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_sign_in_form_then_chat() {
        let state = state().await;
        state.gate.set(AuthState::SignedOut).await;
        let router = build_router(Arc::clone(&state));

        let response = router
            .clone()
            .oneshot(post_form("/auth", "email=jane%40example.com&password=pw"))
            .await
            .unwrap();
        assert_eq!(location(&response), "/chat");

        let response = router.clone().oneshot(get("/auth")).await.unwrap();
        assert_eq!(location(&response), "/chat");

        let response = router
            .clone()
            .oneshot(post_form("/chat/send", "text=Show+revenue"))
            .await
            .unwrap();
        assert_eq!(location(&response), "/chat");

        let html = body_text(router.oneshot(get("/chat")).await.unwrap()).await;
        assert!(html.contains("Show revenue..."));
        assert!(html.contains(">J</button>"));
    }

    #[tokio::test]
    async fn test_bad_sign_in_renders_notice() {
        let state = state().await;
        state.gate.set(AuthState::SignedOut).await;

        let response = build_router(state)
            .oneshot(post_form("/auth", "email=jane%40example.com&password=wrong"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(body_text(response).await.contains("Sign In Failed"));
    }

    #[tokio::test]
    async fn test_chat_form_ignored_when_signed_out() {
        let state = state().await;
        state.gate.set(AuthState::SignedOut).await;

        let response = build_router(Arc::clone(&state))
            .oneshot(post_form("/chat/send", "text=hello"))
            .await
            .unwrap();

        assert_eq!(location(&response), "/auth");
        assert!(state.chat.snapshot().await.active_messages.is_empty());
    }

    #[tokio::test]
    async fn test_contact_form() {
        let state = state().await;
        let response = build_router(state)
            .oneshot(post_form(
                "/contact",
                "name=Jane&email=jane%40example.com&company=&message=Hi",
            ))
            .await
            .unwrap();

        assert!(body_text(response).await.contains("Message Sent!"));
    }

    #[tokio::test]
    async fn test_unknown_route_is_404() {
        let state = state().await;
        let response = build_router(state)
            .oneshot(get("/does-not-exist"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert!(body_text(response).await.contains("does-not-exist"));
    }
}
