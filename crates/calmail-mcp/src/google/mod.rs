//! Google API Client Module
//!
//! Thin call-through to Calendar v3 and Gmail v1. Every call takes the
//! credential explicitly; nothing here refreshes or stores tokens.

pub mod calendar_api;
pub mod client;
pub mod common;
pub mod gmail;
pub mod types;

use serde_json::Value;

pub use calendar_api::CalendarApi;
pub use gmail::GmailApi;
pub use types::{
    EmailDetail, EmailQuery, EmailSummary, EventPatch, EventQuery, EventSummary, EventTime,
    NewEvent, OutgoingEmail,
};

use crate::auth::credential::Credential;
use crate::common::ApiError;

/// Macro to implement the standard Google API wrapper constructor pattern.
/// Each API struct wraps a `GoogleClient` plus the base URL of its service.
macro_rules! google_api_wrapper {
    ($name:ident) => {
        impl $name {
            /// Create a new API client with an OAuth access token
            pub fn new(
                http: reqwest::Client,
                base_url: impl Into<String>,
                access_token: &str,
            ) -> Self {
                let client = crate::google::client::GoogleClient::new(http, access_token);
                Self {
                    client,
                    base_url: base_url.into(),
                }
            }
        }
    };
}

pub(crate) use google_api_wrapper;

/// One operation per supported vendor action.
#[allow(async_fn_in_trait)]
pub trait WorkspaceApi {
    async fn create_event(
        &self,
        credential: &Credential,
        event: &NewEvent,
    ) -> Result<Value, ApiError>;
    async fn list_events(
        &self,
        credential: &Credential,
        query: &EventQuery,
    ) -> Result<Vec<Value>, ApiError>;
    async fn update_event(
        &self,
        credential: &Credential,
        patch: &EventPatch,
    ) -> Result<Value, ApiError>;
    async fn delete_event(&self, credential: &Credential, event_id: &str) -> Result<(), ApiError>;
    async fn send_email(
        &self,
        credential: &Credential,
        email: &OutgoingEmail,
    ) -> Result<Value, ApiError>;
    async fn list_emails(
        &self,
        credential: &Credential,
        query: &EmailQuery,
    ) -> Result<Vec<Value>, ApiError>;
    async fn get_email(&self, credential: &Credential, message_id: &str) -> Result<Value, ApiError>;
}

/// Service base URLs; overridden in tests.
#[derive(Debug, Clone)]
pub struct Endpoints {
    pub calendar: String,
    pub gmail: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            calendar: calendar_api::CALENDAR_API_BASE.to_string(),
            gmail: gmail::GMAIL_API_BASE.to_string(),
        }
    }
}

/// The real facade over Google's REST endpoints.
pub struct GoogleWorkspace {
    http: reqwest::Client,
    endpoints: Endpoints,
}

impl GoogleWorkspace {
    pub fn new(http: reqwest::Client, endpoints: Endpoints) -> Self {
        Self { http, endpoints }
    }

    fn calendar(&self, credential: &Credential) -> CalendarApi {
        CalendarApi::new(
            self.http.clone(),
            self.endpoints.calendar.as_str(),
            &credential.access_token,
        )
    }

    fn gmail(&self, credential: &Credential) -> GmailApi {
        GmailApi::new(self.http.clone(), self.endpoints.gmail.as_str(), &credential.access_token)
    }
}

impl WorkspaceApi for GoogleWorkspace {
    async fn create_event(
        &self,
        credential: &Credential,
        event: &NewEvent,
    ) -> Result<Value, ApiError> {
        self.calendar(credential).create_event(event).await
    }

    async fn list_events(
        &self,
        credential: &Credential,
        query: &EventQuery,
    ) -> Result<Vec<Value>, ApiError> {
        self.calendar(credential).list_events(query).await
    }

    async fn update_event(
        &self,
        credential: &Credential,
        patch: &EventPatch,
    ) -> Result<Value, ApiError> {
        self.calendar(credential).update_event(patch).await
    }

    async fn delete_event(&self, credential: &Credential, event_id: &str) -> Result<(), ApiError> {
        self.calendar(credential).delete_event(event_id).await
    }

    async fn send_email(
        &self,
        credential: &Credential,
        email: &OutgoingEmail,
    ) -> Result<Value, ApiError> {
        self.gmail(credential).send_message(email).await
    }

    async fn list_emails(
        &self,
        credential: &Credential,
        query: &EmailQuery,
    ) -> Result<Vec<Value>, ApiError> {
        self.gmail(credential).list_messages(query).await
    }

    async fn get_email(
        &self,
        credential: &Credential,
        message_id: &str,
    ) -> Result<Value, ApiError> {
        self.gmail(credential).get_message(message_id, "full").await
    }
}
