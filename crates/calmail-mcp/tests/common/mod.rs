//! Fakes for the injected seams: store, token endpoint, consent, facade.
//!
//! Each fake is `Clone` over shared `Rc` state so a test keeps a handle for
//! assertions after moving a copy into the code under test.

#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use calmail_mcp::auth::consent::{AuthorizationGrant, ConsentProvider};
use calmail_mcp::auth::credential::Credential;
use calmail_mcp::auth::provider::{OAuthProvider, OAuthTokens};
use calmail_mcp::auth::store::CredentialStore;
use calmail_mcp::auth::Authenticator;
use calmail_mcp::common::{ApiError, AuthError, OAuthError, StoreError};
use calmail_mcp::config::{ClientConfig, Integration};
use calmail_mcp::google::{
    EmailQuery, EventPatch, EventQuery, NewEvent, OutgoingEmail, WorkspaceApi,
};
use chrono::{Duration, SecondsFormat, Utc};
use serde_json::{json, Value};
use tokio::sync::oneshot;

pub type FakeAuthenticator = Authenticator<MemoryStore, FakeProvider, FakeConsent>;

pub fn client() -> ClientConfig {
    ClientConfig::new("test-client.apps.googleusercontent.com", "test-secret")
}

pub fn credential(
    expires_in: Duration,
    refresh_token: Option<&str>,
    scopes: Vec<String>,
) -> Credential {
    Credential {
        access_token: "ya29.stored".to_string(),
        refresh_token: refresh_token.map(String::from),
        expiry: Some(Utc::now() + expires_in),
        scopes,
        client_id: "test-client.apps.googleusercontent.com".to_string(),
        client_secret: "test-secret".to_string(),
        token_uri: "https://oauth2.googleapis.com/token".to_string(),
    }
}

pub fn valid_credential(integration: Integration) -> Credential {
    credential(Duration::hours(1), Some("1//refresh"), integration.scopes())
}

pub fn expired_credential(integration: Integration) -> Credential {
    credential(Duration::hours(-1), Some("1//refresh"), integration.scopes())
}

// ── Credential store ────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub enum Stored {
    Empty,
    Corrupt,
    Present(Credential),
}

#[derive(Clone)]
pub struct MemoryStore {
    state: Rc<RefCell<Stored>>,
    loads: Rc<Cell<usize>>,
    saves: Rc<Cell<usize>>,
    clears: Rc<Cell<usize>>,
}

impl MemoryStore {
    fn with_state(state: Stored) -> Self {
        Self {
            state: Rc::new(RefCell::new(state)),
            loads: Rc::default(),
            saves: Rc::default(),
            clears: Rc::default(),
        }
    }

    pub fn empty() -> Self {
        Self::with_state(Stored::Empty)
    }

    pub fn corrupt() -> Self {
        Self::with_state(Stored::Corrupt)
    }

    pub fn holding(credential: Credential) -> Self {
        Self::with_state(Stored::Present(credential))
    }

    pub fn current(&self) -> Option<Credential> {
        match &*self.state.borrow() {
            Stored::Present(credential) => Some(credential.clone()),
            _ => None,
        }
    }

    pub fn loads(&self) -> usize {
        self.loads.get()
    }

    pub fn saves(&self) -> usize {
        self.saves.get()
    }

    pub fn clears(&self) -> usize {
        self.clears.get()
    }
}

impl CredentialStore for MemoryStore {
    fn load(&self) -> Result<Credential, StoreError> {
        self.loads.set(self.loads.get() + 1);
        match &*self.state.borrow() {
            Stored::Empty => Err(StoreError::NotFound("memory".into())),
            Stored::Corrupt => Err(StoreError::CorruptState {
                path: "memory".into(),
                reason: "expected value at line 1 column 1".to_string(),
            }),
            Stored::Present(credential) => Ok(credential.clone()),
        }
    }

    fn save(&self, credential: &Credential) -> Result<(), StoreError> {
        self.saves.set(self.saves.get() + 1);
        *self.state.borrow_mut() = Stored::Present(credential.clone());
        Ok(())
    }

    fn clear(&self) -> Result<(), StoreError> {
        self.clears.set(self.clears.get() + 1);
        *self.state.borrow_mut() = Stored::Empty;
        Ok(())
    }
}

// ── Token endpoint ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RefreshOutcome {
    Succeed,
    Revoked,
    Unavailable,
}

#[derive(Clone)]
pub struct FakeProvider {
    client: ClientConfig,
    refresh_outcome: Rc<Cell<RefreshOutcome>>,
    granted_scopes: Rc<RefCell<Vec<String>>>,
    refreshes: Rc<Cell<usize>>,
    exchanges: Rc<Cell<usize>>,
    revokes: Rc<RefCell<Vec<String>>>,
}

impl FakeProvider {
    pub fn new() -> Self {
        Self {
            client: client(),
            refresh_outcome: Rc::new(Cell::new(RefreshOutcome::Succeed)),
            granted_scopes: Rc::default(),
            refreshes: Rc::default(),
            exchanges: Rc::default(),
            revokes: Rc::default(),
        }
    }

    pub fn set_refresh_outcome(&self, outcome: RefreshOutcome) {
        self.refresh_outcome.set(outcome);
    }

    /// Scopes the token endpoint reports on exchange; empty means "as requested".
    pub fn grant_scopes(&self, scopes: Vec<String>) {
        *self.granted_scopes.borrow_mut() = scopes;
    }

    pub fn refreshes(&self) -> usize {
        self.refreshes.get()
    }

    pub fn exchanges(&self) -> usize {
        self.exchanges.get()
    }

    /// Token endpoint calls of any kind.
    pub fn network_calls(&self) -> usize {
        self.refreshes() + self.exchanges() + self.revokes.borrow().len()
    }

    pub fn revoked_tokens(&self) -> Vec<String> {
        self.revokes.borrow().clone()
    }
}

impl OAuthProvider for FakeProvider {
    fn name(&self) -> &str {
        "fake"
    }

    fn client(&self) -> &ClientConfig {
        &self.client
    }

    fn authorize_url(
        &self,
        _scopes: &[String],
        state: &str,
        _code_challenge: &str,
        redirect_uri: &str,
    ) -> String {
        format!("https://consent.invalid/?state={}&redirect_uri={}", state, redirect_uri)
    }

    async fn exchange_code(
        &self,
        code: &str,
        _code_verifier: &str,
        _redirect_uri: &str,
    ) -> Result<OAuthTokens, OAuthError> {
        self.exchanges.set(self.exchanges.get() + 1);
        if code != "4/0fake" {
            return Err(OAuthError::Rejected {
                error: "invalid_grant".to_string(),
                description: "Malformed auth code.".to_string(),
            });
        }
        Ok(OAuthTokens {
            access_token: "ya29.consented".to_string(),
            refresh_token: Some("1//consented".to_string()),
            token_type: "Bearer".to_string(),
            expires_at: Utc::now() + Duration::hours(1),
            scopes: self.granted_scopes.borrow().clone(),
        })
    }

    async fn refresh_token(&self, _refresh_token: &str) -> Result<OAuthTokens, OAuthError> {
        self.refreshes.set(self.refreshes.get() + 1);
        match self.refresh_outcome.get() {
            RefreshOutcome::Succeed => Ok(OAuthTokens {
                access_token: "ya29.refreshed".to_string(),
                refresh_token: None,
                token_type: "Bearer".to_string(),
                expires_at: Utc::now() + Duration::hours(1),
                scopes: vec![],
            }),
            RefreshOutcome::Revoked => Err(OAuthError::Revoked(
                "Token has been expired or revoked.".to_string(),
            )),
            RefreshOutcome::Unavailable => {
                Err(OAuthError::Network("connection refused".to_string()))
            }
        }
    }

    async fn revoke_token(&self, token: &str) -> Result<(), OAuthError> {
        self.revokes.borrow_mut().push(token.to_string());
        Ok(())
    }
}

// ── Consent ─────────────────────────────────────────────────────────────────

/// Stands in for the browser. Optionally blocks until an "operator" fires
/// the gate.
#[derive(Clone)]
pub struct FakeConsent {
    calls: Rc<Cell<usize>>,
    waiting: Rc<Cell<bool>>,
    gate: Rc<RefCell<Option<oneshot::Receiver<()>>>>,
    deny: bool,
}

impl FakeConsent {
    pub fn immediate() -> Self {
        Self {
            calls: Rc::default(),
            waiting: Rc::default(),
            gate: Rc::default(),
            deny: false,
        }
    }

    pub fn denying() -> Self {
        Self {
            deny: true,
            ..Self::immediate()
        }
    }

    /// Consent that blocks until the returned sender fires.
    pub fn gated() -> (Self, oneshot::Sender<()>) {
        let (tx, rx) = oneshot::channel();
        let consent = Self::immediate();
        *consent.gate.borrow_mut() = Some(rx);
        (consent, tx)
    }

    pub fn calls(&self) -> usize {
        self.calls.get()
    }

    /// True while a consent flow is blocked on the operator.
    pub fn is_waiting(&self) -> bool {
        self.waiting.get()
    }
}

impl ConsentProvider for FakeConsent {
    async fn obtain_grant<P: OAuthProvider>(
        &self,
        _provider: &P,
        _scopes: &[String],
    ) -> Result<AuthorizationGrant, AuthError> {
        self.calls.set(self.calls.get() + 1);

        let gate = self.gate.borrow_mut().take();
        if let Some(gate) = gate {
            self.waiting.set(true);
            let outcome = gate.await;
            self.waiting.set(false);
            outcome.map_err(|_| {
                AuthError::Consent("operator abandoned the browser flow".to_string())
            })?;
        }

        if self.deny {
            return Err(AuthError::Consent("authorization denied: access_denied".to_string()));
        }

        Ok(AuthorizationGrant {
            code: "4/0fake".to_string(),
            code_verifier: "verifier".to_string(),
            redirect_uri: "http://127.0.0.1:0/".to_string(),
        })
    }
}

// ── Facade ──────────────────────────────────────────────────────────────────

#[derive(Clone, Default)]
pub struct FakeWorkspace {
    calls: Rc<Cell<usize>>,
    tokens_seen: Rc<RefCell<Vec<String>>>,
    fail_next: Rc<RefCell<Option<ApiError>>>,
    events: Rc<RefCell<Vec<Value>>>,
    emails: Rc<RefCell<Vec<Value>>>,
}

impl FakeWorkspace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> usize {
        self.calls.get()
    }

    /// Access tokens presented, in call order.
    pub fn tokens_seen(&self) -> Vec<String> {
        self.tokens_seen.borrow().clone()
    }

    pub fn fail_next(&self, error: ApiError) {
        *self.fail_next.borrow_mut() = Some(error);
    }

    pub fn add_event(&self, event: Value) {
        self.events.borrow_mut().push(event);
    }

    pub fn add_email(&self, message: Value) {
        self.emails.borrow_mut().push(message);
    }

    fn record(&self, credential: &Credential) -> Result<(), ApiError> {
        self.calls.set(self.calls.get() + 1);
        self.tokens_seen.borrow_mut().push(credential.access_token.clone());
        match self.fail_next.borrow_mut().take() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    fn find_event(&self, id: &str) -> Result<Value, ApiError> {
        self.events
            .borrow()
            .iter()
            .find(|e| e["id"] == id)
            .cloned()
            .ok_or_else(|| ApiError::NotFound(format!("event {}", id)))
    }
}

fn google_time(instant: chrono::DateTime<Utc>, tz: chrono_tz::Tz) -> Value {
    json!({
        "dateTime": instant.with_timezone(&tz).to_rfc3339_opts(SecondsFormat::Secs, false),
        "timeZone": tz.name(),
    })
}

impl WorkspaceApi for FakeWorkspace {
    async fn create_event(
        &self,
        credential: &Credential,
        event: &NewEvent,
    ) -> Result<Value, ApiError> {
        self.record(credential)?;
        let created = json!({
            "id": format!("evt-{}", self.events.borrow().len() + 1),
            "summary": event.title,
            "start": google_time(event.start, event.timezone),
            "end": google_time(event.end, event.timezone),
            "attendees": event.attendees.iter().map(|a| json!({"email": a})).collect::<Vec<_>>(),
            "description": event.description,
            "location": event.location,
            "htmlLink": "https://calendar.google.com/calendar/event?eid=fake",
            "status": "confirmed",
        });
        self.add_event(created.clone());
        Ok(created)
    }

    async fn list_events(
        &self,
        credential: &Credential,
        query: &EventQuery,
    ) -> Result<Vec<Value>, ApiError> {
        self.record(credential)?;
        Ok(self.events.borrow().iter().take(query.max_results).cloned().collect())
    }

    async fn update_event(
        &self,
        credential: &Credential,
        patch: &EventPatch,
    ) -> Result<Value, ApiError> {
        self.record(credential)?;
        let mut event = self.find_event(&patch.id)?;
        if let Some(title) = &patch.title {
            event["summary"] = json!(title);
        }
        if let Some(start) = patch.start {
            event["start"] = google_time(start, patch.timezone.unwrap_or(chrono_tz::Tz::UTC));
        }
        if let Some(end) = patch.end {
            event["end"] = google_time(end, patch.timezone.unwrap_or(chrono_tz::Tz::UTC));
        }
        Ok(event)
    }

    async fn delete_event(&self, credential: &Credential, event_id: &str) -> Result<(), ApiError> {
        self.record(credential)?;
        self.find_event(event_id)?;
        self.events.borrow_mut().retain(|e| e["id"] != event_id);
        Ok(())
    }

    async fn send_email(
        &self,
        credential: &Credential,
        _email: &OutgoingEmail,
    ) -> Result<Value, ApiError> {
        self.record(credential)?;
        Ok(json!({"id": "msg-sent", "threadId": "thread-sent", "labelIds": ["SENT"]}))
    }

    async fn list_emails(
        &self,
        credential: &Credential,
        query: &EmailQuery,
    ) -> Result<Vec<Value>, ApiError> {
        self.record(credential)?;
        Ok(self.emails.borrow().iter().take(query.max_results).cloned().collect())
    }

    async fn get_email(
        &self,
        credential: &Credential,
        message_id: &str,
    ) -> Result<Value, ApiError> {
        self.record(credential)?;
        self.emails
            .borrow()
            .iter()
            .find(|m| m["id"] == message_id)
            .cloned()
            .ok_or_else(|| ApiError::NotFound(format!("message {}", message_id)))
    }
}

pub fn authenticator(
    integration: Integration,
    store: &MemoryStore,
    provider: &FakeProvider,
    consent: &FakeConsent,
) -> FakeAuthenticator {
    Authenticator::new(store.clone(), provider.clone(), consent.clone(), integration.scopes())
}
