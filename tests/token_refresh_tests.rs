// SPDX-License-Identifier: MIT

//! Token refresh lifecycle: margin handling, persistence, single-flight
//! behavior under concurrency.

use std::sync::Arc;

use mockito::Matcher;
use oura_tracker::{
    error::AppError,
    services::AuthManager,
    store::{MemoryStore, SettingsStore},
};

mod common;
use common::{expired_credentials, test_config, valid_credentials};

fn manager_with(server: &mockito::ServerGuard, store: Arc<MemoryStore>) -> AuthManager {
    AuthManager::new(test_config(&server.url(), 0), store).unwrap()
}

#[tokio::test]
async fn test_refresh_persists_new_triple() {
    let mut server = mockito::Server::new_async().await;
    let refresh_mock = server
        .mock("POST", "/oauth/token")
        .match_body(Matcher::AllOf(vec![
            Matcher::UrlEncoded("grant_type".into(), "refresh_token".into()),
            Matcher::UrlEncoded("refresh_token".into(), "old_refresh".into()),
            Matcher::UrlEncoded("client_id".into(), "test_client_id".into()),
            Matcher::UrlEncoded("client_secret".into(), "test_secret".into()),
        ]))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"access_token":"new_access","refresh_token":"new_refresh","expires_in":86400}"#)
        .expect(1)
        .create_async()
        .await;

    let store = Arc::new(MemoryStore::with_credentials(expired_credentials()));
    let auth = manager_with(&server, store.clone());

    let refreshed = auth.refresh_credentials().await.unwrap();
    assert_eq!(refreshed.access_token, "new_access");
    assert_eq!(refreshed.refresh_token, "new_refresh");
    refresh_mock.assert_async().await;

    // All three fields replaced together.
    let stored = store.credentials().unwrap().unwrap();
    assert_eq!(stored, refreshed);
    assert!(!auth.is_token_expired().unwrap());
}

#[tokio::test]
async fn test_valid_token_returned_without_refresh() {
    let mut server = mockito::Server::new_async().await;
    let refresh_mock = server
        .mock("POST", "/oauth/token")
        .expect(0)
        .create_async()
        .await;

    let store = Arc::new(MemoryStore::with_credentials(valid_credentials()));
    let auth = manager_with(&server, store);

    let token = auth.ensure_valid_access_token().await.unwrap();
    assert_eq!(token, "valid_access");
    refresh_mock.assert_async().await;
}

#[tokio::test]
async fn test_concurrent_callers_share_one_refresh() {
    let mut server = mockito::Server::new_async().await;
    let refresh_mock = server
        .mock("POST", "/oauth/token")
        .match_body(Matcher::UrlEncoded(
            "grant_type".into(),
            "refresh_token".into(),
        ))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"access_token":"shared_access","refresh_token":"shared_refresh","expires_in":86400}"#)
        .expect(1)
        .create_async()
        .await;

    let store = Arc::new(MemoryStore::with_credentials(expired_credentials()));
    let auth = manager_with(&server, store);

    let (a, b) = tokio::join!(
        auth.ensure_valid_access_token(),
        auth.ensure_valid_access_token(),
    );
    assert_eq!(a.unwrap(), "shared_access");
    assert_eq!(b.unwrap(), "shared_access");
    // The follower reused the winner's result instead of refreshing again.
    refresh_mock.assert_async().await;
}

#[tokio::test]
async fn test_concurrent_manual_refreshes_share_one_exchange() {
    let mut server = mockito::Server::new_async().await;
    let refresh_mock = server
        .mock("POST", "/oauth/token")
        .match_body(Matcher::AllOf(vec![
            Matcher::UrlEncoded("grant_type".into(), "refresh_token".into()),
            Matcher::UrlEncoded("refresh_token".into(), "old_refresh".into()),
        ]))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"access_token":"shared_access","refresh_token":"shared_refresh","expires_in":86400}"#)
        .expect(1)
        .create_async()
        .await;

    let store = Arc::new(MemoryStore::with_credentials(expired_credentials()));
    let auth = manager_with(&server, store.clone());

    // Two explicit refreshes racing each other: only one exchange runs;
    // the loser reuses the winner's rotated triple.
    let (a, b) = tokio::join!(auth.refresh_credentials(), auth.refresh_credentials());
    let a = a.unwrap();
    let b = b.unwrap();
    assert_eq!(a.access_token, "shared_access");
    assert_eq!(b, a);
    refresh_mock.assert_async().await;

    let stored = store.credentials().unwrap().unwrap();
    assert_eq!(stored.refresh_token, "shared_refresh");
}

#[tokio::test]
async fn test_empty_store_is_not_authenticated() {
    let server = mockito::Server::new_async().await;
    let store = Arc::new(MemoryStore::new());
    let auth = manager_with(&server, store);

    assert!(!auth.is_authorized().unwrap());
    assert!(auth.is_token_expired().unwrap());

    let err = auth.ensure_valid_access_token().await.unwrap_err();
    assert!(matches!(err, AppError::NotAuthenticated));
    assert!(err.needs_reauthorization());

    let err = auth.refresh_credentials().await.unwrap_err();
    assert!(matches!(err, AppError::NoRefreshToken));
    assert!(err.needs_reauthorization());
}

#[tokio::test]
async fn test_rejected_refresh_requires_reauthorization() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/oauth/token")
        .with_status(401)
        .with_body(r#"{"error":"invalid_grant"}"#)
        .create_async()
        .await;

    let store = Arc::new(MemoryStore::with_credentials(expired_credentials()));
    let auth = manager_with(&server, store.clone());

    let err = auth.refresh_credentials().await.unwrap_err();
    assert!(matches!(err, AppError::TokenRefresh(401)));
    assert!(err.needs_reauthorization());

    // The stale credentials were not overwritten.
    let stored = store.credentials().unwrap().unwrap();
    assert_eq!(stored.refresh_token, "old_refresh");
}

#[tokio::test]
async fn test_malformed_refresh_response_is_invalid() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/oauth/token")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"access_token":"only_access"}"#)
        .create_async()
        .await;

    let store = Arc::new(MemoryStore::with_credentials(expired_credentials()));
    let auth = manager_with(&server, store);

    let err = auth.refresh_credentials().await.unwrap_err();
    assert!(matches!(err, AppError::InvalidResponse(_)));
    assert!(!err.needs_reauthorization());
}
