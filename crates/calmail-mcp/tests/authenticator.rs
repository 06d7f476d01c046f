mod common;

use std::fs;

use calmail_mcp::auth::store::{CredentialStore, FileCredentialStore};
use calmail_mcp::auth::{AuthState, Authenticator};
use calmail_mcp::common::AuthError;
use calmail_mcp::config::Integration;
use chrono::Duration;

use common::{
    authenticator, credential, expired_credential, valid_credential, FakeConsent, FakeProvider,
    MemoryStore, RefreshOutcome,
};

#[tokio::test]
async fn valid_credential_is_reused_without_io() {
    let store = MemoryStore::holding(valid_credential(Integration::Calendar));
    let provider = FakeProvider::new();
    let consent = FakeConsent::immediate();
    let mut auth = authenticator(Integration::Calendar, &store, &provider, &consent);

    let first = auth.ensure_valid_credential().await.unwrap();
    let second = auth.ensure_valid_credential().await.unwrap();

    assert_eq!(first.access_token, second.access_token);
    assert_eq!(auth.state(), AuthState::Authorized);
    assert_eq!(store.loads(), 1);
    assert_eq!(store.saves(), 0);
    assert_eq!(provider.network_calls(), 0);
    assert_eq!(consent.calls(), 0);
}

#[tokio::test]
async fn expired_credential_is_refreshed_and_persisted() {
    let store = MemoryStore::holding(expired_credential(Integration::Calendar));
    let provider = FakeProvider::new();
    let consent = FakeConsent::immediate();
    let mut auth = authenticator(Integration::Calendar, &store, &provider, &consent);

    let refreshed = auth.ensure_valid_credential().await.unwrap();

    assert_eq!(refreshed.access_token, "ya29.refreshed");
    assert_eq!(refreshed.refresh_token.as_deref(), Some("1//refresh"));
    assert!(!refreshed.is_expired());
    assert_eq!(auth.state(), AuthState::Authorized);
    assert_eq!(provider.refreshes(), 1);
    assert_eq!(consent.calls(), 0);
    assert_eq!(store.current().unwrap().access_token, "ya29.refreshed");

    // Second call is served from memory
    auth.ensure_valid_credential().await.unwrap();
    assert_eq!(provider.refreshes(), 1);
}

#[tokio::test]
async fn revoked_refresh_token_requires_reauth_and_clears_store() {
    let store = MemoryStore::holding(expired_credential(Integration::Email));
    let provider = FakeProvider::new();
    provider.set_refresh_outcome(RefreshOutcome::Revoked);
    let consent = FakeConsent::immediate();
    let mut auth = authenticator(Integration::Email, &store, &provider, &consent);

    let err = auth.ensure_valid_credential().await.unwrap_err();

    assert!(matches!(err, AuthError::ReauthRequired(_)), "got {:?}", err);
    assert_eq!(auth.state(), AuthState::Revoked);
    assert!(store.current().is_none());
    assert_eq!(store.clears(), 1);
    assert_eq!(consent.calls(), 0);

    // The next request runs consent instead of reusing the dead token
    let credential = auth.ensure_valid_credential().await.unwrap();
    assert_eq!(credential.access_token, "ya29.consented");
    assert_eq!(auth.state(), AuthState::Authorized);
    assert_eq!(consent.calls(), 1);
}

#[tokio::test]
async fn transient_refresh_failure_keeps_credential() {
    let store = MemoryStore::holding(expired_credential(Integration::Calendar));
    let provider = FakeProvider::new();
    provider.set_refresh_outcome(RefreshOutcome::Unavailable);
    let consent = FakeConsent::immediate();
    let mut auth = authenticator(Integration::Calendar, &store, &provider, &consent);

    let err = auth.ensure_valid_credential().await.unwrap_err();
    assert!(matches!(err, AuthError::TokenEndpoint(_)), "got {:?}", err);
    assert_eq!(auth.state(), AuthState::Expired);
    assert!(store.current().is_some());

    provider.set_refresh_outcome(RefreshOutcome::Succeed);
    let credential = auth.ensure_valid_credential().await.unwrap();
    assert_eq!(credential.access_token, "ya29.refreshed");
    assert_eq!(provider.refreshes(), 2);
}

#[tokio::test]
async fn expired_without_refresh_token_runs_consent() {
    let stale = credential(Duration::hours(-2), None, Integration::Calendar.scopes());
    let store = MemoryStore::holding(stale);
    let provider = FakeProvider::new();
    let consent = FakeConsent::immediate();
    let mut auth = authenticator(Integration::Calendar, &store, &provider, &consent);

    let credential = auth.ensure_valid_credential().await.unwrap();

    assert_eq!(credential.access_token, "ya29.consented");
    assert_eq!(provider.refreshes(), 0);
    assert_eq!(consent.calls(), 1);
}

#[tokio::test]
async fn missing_scopes_trigger_consent() {
    // A calendar token is useless to the email integration
    let store = MemoryStore::holding(valid_credential(Integration::Calendar));
    let provider = FakeProvider::new();
    let consent = FakeConsent::immediate();
    let mut auth = authenticator(Integration::Email, &store, &provider, &consent);

    let credential = auth.ensure_valid_credential().await.unwrap();

    assert_eq!(consent.calls(), 1);
    assert!(credential.has_scopes(&Integration::Email.scopes()));
    assert_eq!(store.current().unwrap().scopes, Integration::Email.scopes());
}

#[tokio::test]
async fn partial_grant_is_rejected() {
    let store = MemoryStore::empty();
    let provider = FakeProvider::new();
    provider.grant_scopes(vec![Integration::Email.scopes()[0].clone()]);
    let consent = FakeConsent::immediate();
    let mut auth = authenticator(Integration::Email, &store, &provider, &consent);

    let err = auth.ensure_valid_credential().await.unwrap_err();

    assert!(matches!(err, AuthError::ReauthRequired(_)), "got {:?}", err);
    assert_eq!(auth.state(), AuthState::Unauthenticated);
    assert_eq!(store.saves(), 0);
}

#[tokio::test]
async fn corrupt_store_behaves_like_empty_store() {
    for store in [MemoryStore::empty(), MemoryStore::corrupt()] {
        let provider = FakeProvider::new();
        let consent = FakeConsent::immediate();
        let mut auth = authenticator(Integration::Calendar, &store, &provider, &consent);

        let credential = auth.ensure_valid_credential().await.unwrap();

        assert_eq!(credential.access_token, "ya29.consented");
        assert_eq!(consent.calls(), 1);
        assert_eq!(provider.exchanges(), 1);
        assert_eq!(store.saves(), 1);
        assert_eq!(auth.state(), AuthState::Authorized);
    }
}

#[tokio::test]
async fn unparseable_token_file_reads_as_absent() {
    let dir = tempfile::tempdir().unwrap();
    let missing = FileCredentialStore::new(dir.path().join("missing.json"));
    let garbage_path = dir.path().join("garbage.json");
    fs::write(&garbage_path, "{ not json").unwrap();
    let garbage = FileCredentialStore::new(&garbage_path);

    let missing_err = missing.load().unwrap_err();
    let garbage_err = garbage.load().unwrap_err();
    assert!(missing_err.is_absent());
    assert!(garbage_err.is_absent());

    for store in [missing, garbage] {
        let consent = FakeConsent::immediate();
        let mut auth = Authenticator::new(
            store.clone(),
            FakeProvider::new(),
            consent.clone(),
            Integration::Calendar.scopes(),
        );
        auth.ensure_valid_credential().await.unwrap();
        assert_eq!(consent.calls(), 1);
        assert_eq!(store.load().unwrap().access_token, "ya29.consented");
    }
}

#[tokio::test]
async fn denied_consent_leaves_unauthenticated() {
    let store = MemoryStore::empty();
    let provider = FakeProvider::new();
    let consent = FakeConsent::denying();
    let mut auth = authenticator(Integration::Calendar, &store, &provider, &consent);

    let err = auth.ensure_valid_credential().await.unwrap_err();

    assert!(matches!(err, AuthError::Consent(_)), "got {:?}", err);
    assert_eq!(auth.state(), AuthState::Unauthenticated);
    assert_eq!(provider.exchanges(), 0);
    assert!(store.current().is_none());
}

#[tokio::test]
async fn mark_expired_forces_refresh() {
    let store = MemoryStore::holding(valid_credential(Integration::Calendar));
    let provider = FakeProvider::new();
    let consent = FakeConsent::immediate();
    let mut auth = authenticator(Integration::Calendar, &store, &provider, &consent);

    auth.ensure_valid_credential().await.unwrap();
    auth.mark_expired();
    assert_eq!(auth.state(), AuthState::Expired);

    let credential = auth.ensure_valid_credential().await.unwrap();
    assert_eq!(credential.access_token, "ya29.refreshed");
    assert_eq!(provider.refreshes(), 1);
}

#[tokio::test]
async fn revoke_clears_store_and_revokes_refresh_token() {
    let store = MemoryStore::holding(valid_credential(Integration::Calendar));
    let provider = FakeProvider::new();
    let consent = FakeConsent::immediate();
    let mut auth = authenticator(Integration::Calendar, &store, &provider, &consent);

    auth.revoke().await.unwrap();

    assert_eq!(provider.revoked_tokens(), vec!["1//refresh".to_string()]);
    assert!(store.current().is_none());
    assert_eq!(auth.state(), AuthState::Unauthenticated);

    let status = auth.status().unwrap();
    assert_eq!(status.state, AuthState::Unauthenticated);
    assert!(!status.has_refresh_token);
    assert_eq!(status.missing_scopes, Integration::Calendar.scopes());
}

#[tokio::test]
async fn status_reports_without_network() {
    let store = MemoryStore::holding(expired_credential(Integration::Email));
    let provider = FakeProvider::new();
    let consent = FakeConsent::immediate();
    let mut auth = authenticator(Integration::Email, &store, &provider, &consent);

    let status = auth.status().unwrap();

    assert_eq!(status.state, AuthState::Expired);
    assert!(status.has_refresh_token);
    assert!(status.missing_scopes.is_empty());
    assert_eq!(provider.network_calls(), 0);
}

#[tokio::test]
async fn authorize_interactively_replaces_valid_credential() {
    let store = MemoryStore::holding(valid_credential(Integration::Calendar));
    let provider = FakeProvider::new();
    let consent = FakeConsent::immediate();
    let mut auth = authenticator(Integration::Calendar, &store, &provider, &consent);

    let credential = auth.authorize_interactively().await.unwrap();

    assert_eq!(credential.access_token, "ya29.consented");
    assert_eq!(consent.calls(), 1);
    assert_eq!(store.current().unwrap().access_token, "ya29.consented");
}
