use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::config::AppConfig;
use crate::error::AppError;
use crate::services::completion::{CompletionService, OpenAiClient};
use crate::services::drive_client::DriveClient;
use crate::services::storage::StorageBackend;
use crate::services::suggestion_client::SuggestionClient;

/// OAuth material negotiated elsewhere; only the bearer token is consumed here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Credentials {
    pub access_token: String,
}

/// Per-request caller context.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Session {
    pub credentials: Option<Credentials>,
}

impl Session {
    pub fn with_token(access_token: &str) -> Self {
        Self {
            credentials: Some(Credentials {
                access_token: access_token.to_string(),
            }),
        }
    }

    pub fn require_credentials(&self) -> Result<&Credentials, AppError> {
        self.credentials
            .as_ref()
            .filter(|c| !c.access_token.trim().is_empty())
            .ok_or_else(|| AppError::Auth("Not authorized".to_string()))
    }
}

/// Opens a storage backend for one caller.
pub trait StorageConnector: Send + Sync {
    fn connect(&self, credentials: &Credentials) -> Arc<dyn StorageBackend>;
}

pub struct DriveConnector {
    base_url: String,
    client: reqwest::Client,
}

impl DriveConnector {
    pub fn new(base_url: &str, client: reqwest::Client) -> Self {
        Self {
            base_url: base_url.to_string(),
            client,
        }
    }
}

impl StorageConnector for DriveConnector {
    fn connect(&self, credentials: &Credentials) -> Arc<dyn StorageBackend> {
        Arc::new(DriveClient::new(
            &self.base_url,
            &credentials.access_token,
            self.client.clone(),
        ))
    }
}

pub struct AppState {
    pub config: AppConfig,
    pub completion: Arc<dyn CompletionService>,
    pub storage: Arc<dyn StorageConnector>,
}

impl AppState {
    pub fn new(
        config: AppConfig,
        completion: Arc<dyn CompletionService>,
        storage: Arc<dyn StorageConnector>,
    ) -> Self {
        Self {
            config,
            completion,
            storage,
        }
    }

    /// Wires the production clients. Fails with `Auth` when no completion key is set.
    pub fn from_config(config: AppConfig) -> Result<Self, AppError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()?;
        let completion = OpenAiClient::from_config(&config, client.clone())?;
        tracing::info!(
            "completion model {}, drive api {}",
            completion.model_id(),
            config.drive_base_url
        );
        let storage = DriveConnector::new(&config.drive_base_url, client);
        Ok(Self::new(config, Arc::new(completion), Arc::new(storage)))
    }

    pub fn suggestion_client(&self) -> SuggestionClient {
        SuggestionClient::new(
            self.completion.clone(),
            self.config.temperature,
            self.config.max_tokens,
        )
    }

    pub fn storage_for(&self, session: &Session) -> Result<Arc<dyn StorageBackend>, AppError> {
        let credentials = session.require_credentials()?;
        Ok(self.storage.connect(credentials))
    }
}
