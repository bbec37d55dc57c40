//! Gateway behaviour against a mock backend.
//!
//! Covers cold-start refresh, the single refresh-and-replay on 401/403,
//! session teardown when the replay is rejected, strategy headers and
//! plain request failures.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use pong_client::{
    ApiRequest, AuthStrategy, ClientConfig, Endpoints, Error, Session, SessionEvent, SessionState,
};
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

async fn session_for(server: &MockServer, strategy: Option<AuthStrategy>) -> Session {
    init_tracing();
    let session = Session::new(ClientConfig::new(Endpoints::local(&server.uri()))).unwrap();
    if let Some(strategy) = strategy {
        session.profile().set_auth_strategy(strategy).await.unwrap();
    }
    session
}

fn token(access_token: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({ "access_token": access_token }))
}

fn friends_body() -> serde_json::Value {
    json!([{
        "username": "bob",
        "profilePicture": "https://img/bob.png",
        "online": "online",
        "status": "friends"
    }])
}

fn count_session_ends(session: &Session) -> Arc<AtomicUsize> {
    let ended = Arc::new(AtomicUsize::new(0));
    let counter = ended.clone();
    session.events().on(SessionEvent::SessionEnded, move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(())
    });
    ended
}

// ============================================================================
// Credential acquisition
// ============================================================================

mod cold_start_tests {
    use super::*;

    #[tokio::test]
    async fn test_refreshes_before_first_call() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/jwt/refresh/"))
            .respond_with(token("fresh"))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/friends/list/"))
            .and(header("Authorization", "Bearer fresh"))
            .respond_with(ResponseTemplate::new(200).set_body_json(friends_body()))
            .expect(1)
            .mount(&server)
            .await;

        let session = session_for(&server, Some(AuthStrategy::PrimaryCredential)).await;
        let friends = session.api().fetch_friends().await.unwrap();

        assert_eq!(friends.len(), 1);
        assert_eq!(friends[0].username, "bob");
        assert_eq!(session.credentials().credential().unwrap().expose(), "fresh");
        assert_eq!(session.state(), SessionState::Authenticated);
    }

    #[tokio::test]
    async fn test_cold_refresh_failure_is_session_unavailable() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/jwt/refresh/"))
            .respond_with(ResponseTemplate::new(401))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/friends/list/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(friends_body()))
            .expect(0)
            .mount(&server)
            .await;

        let session = session_for(&server, Some(AuthStrategy::PrimaryCredential)).await;
        let err = session.api().fetch_friends().await.unwrap_err();

        assert!(matches!(err, Error::SessionUnavailable { .. }));
        assert_eq!(err.status_code(), Some(401));
        assert!(!session.credentials().has_credential());
    }

    #[tokio::test]
    async fn test_no_strategy_fails_without_network() {
        let server = MockServer::start().await;
        let session = session_for(&server, None).await;

        let err = session
            .gateway()
            .call(ApiRequest::get(format!("{}/api/friends/list/", server.uri())))
            .await
            .unwrap_err();

        assert!(matches!(err, Error::StrategyUnset));
        assert!(server.received_requests().await.unwrap().is_empty());
    }
}

// ============================================================================
// Rejection recovery
// ============================================================================

mod replay_tests {
    use super::*;

    #[tokio::test]
    async fn test_403_then_200_refreshes_once_and_replays() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/jwt/refresh/"))
            .respond_with(token("fresh"))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/friends/list/"))
            .and(header("Authorization", "Bearer stale"))
            .respond_with(ResponseTemplate::new(403))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/friends/list/"))
            .and(header("Authorization", "Bearer fresh"))
            .respond_with(ResponseTemplate::new(200).set_body_json(friends_body()))
            .expect(1)
            .mount(&server)
            .await;

        let session = session_for(&server, Some(AuthStrategy::PrimaryCredential)).await;
        session.credentials().set_credential("stale");

        let friends = session.api().fetch_friends().await.unwrap();
        assert_eq!(friends.len(), 1);
        assert_eq!(server.received_requests().await.unwrap().len(), 3);
        assert_eq!(session.state(), SessionState::Authenticated);
    }

    #[tokio::test]
    async fn test_second_rejection_ends_session() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/jwt/refresh/"))
            .respond_with(token("fresh"))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/friends/list/"))
            .respond_with(ResponseTemplate::new(401))
            .expect(2)
            .mount(&server)
            .await;

        let session = session_for(&server, Some(AuthStrategy::PrimaryCredential)).await;
        session.credentials().set_credential("stale");
        let ended = count_session_ends(&session);

        let err = session.api().fetch_friends().await.unwrap_err();

        assert!(matches!(err, Error::SessionExpired));
        assert!(session.credentials().credential().is_none());
        assert_eq!(ended.load(Ordering::SeqCst), 1);
        assert_eq!(session.state(), SessionState::Anonymous);
        assert_eq!(session.profile().auth_strategy().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_refresh_failure_after_rejection_ends_session() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/jwt/refresh/"))
            .respond_with(ResponseTemplate::new(500))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/game/match-history/"))
            .respond_with(ResponseTemplate::new(403))
            .expect(1)
            .mount(&server)
            .await;

        let session = session_for(&server, Some(AuthStrategy::PrimaryCredential)).await;
        session.credentials().set_credential("stale");
        let ended = count_session_ends(&session);

        let err = session.api().fetch_match_history().await.unwrap_err();

        assert!(matches!(err, Error::SessionExpired));
        assert!(!session.credentials().has_credential());
        assert_eq!(ended.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_delegated_marker_header_on_both_attempts() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/oauth/jwt/refresh/"))
            .respond_with(token("fresh"))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/friends/list/"))
            .and(header("X-42-Token", "true"))
            .and(header("Authorization", "Bearer stale"))
            .respond_with(ResponseTemplate::new(403))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/friends/list/"))
            .and(header("X-42-Token", "true"))
            .and(header("Authorization", "Bearer fresh"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .expect(1)
            .mount(&server)
            .await;

        let session = session_for(&server, Some(AuthStrategy::DelegatedOAuth)).await;
        session.credentials().set_credential("stale");

        let friends = session.api().fetch_friends().await.unwrap();
        assert!(friends.is_empty());
    }

    #[tokio::test]
    async fn test_concurrent_rejections_share_one_refresh() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/jwt/refresh/"))
            .respond_with(token("fresh").set_delay(Duration::from_millis(50)))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/friends/list/"))
            .and(header("Authorization", "Bearer stale"))
            .respond_with(ResponseTemplate::new(401).set_delay(Duration::from_millis(20)))
            .expect(2)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/friends/list/"))
            .and(header("Authorization", "Bearer fresh"))
            .respond_with(ResponseTemplate::new(200).set_body_json(friends_body()))
            .expect(2)
            .mount(&server)
            .await;

        let session = session_for(&server, Some(AuthStrategy::PrimaryCredential)).await;
        session.credentials().set_credential("stale");

        let api = session.api();
        let (first, second) = tokio::join!(api.fetch_friends(), api.fetch_friends());
        tokio_test::assert_ok!(first);
        tokio_test::assert_ok!(second);
    }
}

// ============================================================================
// Request failures
// ============================================================================

mod failure_tests {
    use super::*;

    #[tokio::test]
    async fn test_server_error_is_request_failed_without_refresh() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/jwt/refresh/"))
            .respond_with(token("unused"))
            .expect(0)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/game/match-history/"))
            .respond_with(ResponseTemplate::new(500).set_body_string("down"))
            .expect(1)
            .mount(&server)
            .await;

        let session = session_for(&server, Some(AuthStrategy::PrimaryCredential)).await;
        session.credentials().set_credential("tok");

        let err = session.api().fetch_match_history().await.unwrap_err();
        match err {
            Error::RequestFailed { status, body } => {
                assert_eq!(status, 500);
                assert_eq!(body, "down");
            }
            other => panic!("expected RequestFailed, got {other:?}"),
        }
        assert_eq!(session.credentials().credential().unwrap().expose(), "tok");
    }

    #[tokio::test]
    async fn test_detached_status_update_completes() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/api/friends/update_status/"))
            .and(body_json(json!({ "status": false })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .expect(1)
            .mount(&server)
            .await;

        let session = session_for(&server, Some(AuthStrategy::PrimaryCredential)).await;
        session.credentials().set_credential("tok");

        let handle = session.api().set_online_status_detached(false);
        let status = handle.await.unwrap().unwrap();
        assert_eq!(status.as_u16(), 200);
    }
}
