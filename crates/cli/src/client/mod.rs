use api_types::{
    history::{
        HistoryCreated, HistoryListQuery, HistoryListResponse, HistoryPush, SyncRequest,
        SyncResponse,
    },
    stats::CalculatorStats,
    user::{ForcedNumberUpdate, Profile},
};
use reqwest::Url;
use serde::Deserialize;

use crate::error::{AppError, Result};

#[derive(Debug)]
pub enum ClientError {
    Unauthorized,
    Forbidden,
    NotFound,
    Validation(String),
    Server(String),
    Transport(reqwest::Error),
}

impl std::fmt::Display for ClientError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unauthorized => write!(f, "unauthorized"),
            Self::Forbidden => write!(f, "forbidden"),
            Self::NotFound => write!(f, "not found"),
            Self::Validation(msg) => write!(f, "validation: {msg}"),
            Self::Server(msg) => write!(f, "server: {msg}"),
            Self::Transport(err) => write!(f, "transport: {err}"),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: String,
}

/// HTTP client for the sync backend.
///
/// The bearer token is passed per call rather than stored in a shared
/// mutable client, so a session change never leaks through hidden state.
#[derive(Debug, Clone)]
pub struct Client {
    base_url: Url,
    http: reqwest::Client,
}

impl Client {
    pub fn new(base_url: &str) -> Result<Self> {
        let base_url = Url::parse(base_url)
            .map_err(|err| AppError::Input(format!("invalid base_url: {err}")))?;
        Ok(Self {
            base_url,
            http: reqwest::Client::new(),
        })
    }

    fn endpoint(&self, path: &str) -> std::result::Result<Url, ClientError> {
        self.base_url
            .join(path)
            .map_err(|err| ClientError::Server(format!("invalid base_url: {err}")))
    }

    async fn error_for(res: reqwest::Response) -> ClientError {
        let status = res.status();
        let body = res
            .json::<ErrorResponse>()
            .await
            .map(|err| err.error)
            .unwrap_or_else(|_| "unknown error".to_string());

        match status.as_u16() {
            401 => ClientError::Unauthorized,
            403 => ClientError::Forbidden,
            404 => ClientError::NotFound,
            400 | 422 => ClientError::Validation(body),
            _ => ClientError::Server(body),
        }
    }

    pub async fn me(&self, token: &str) -> std::result::Result<Profile, ClientError> {
        let res = self
            .http
            .get(self.endpoint("auth/me")?)
            .bearer_auth(token)
            .send()
            .await
            .map_err(ClientError::Transport)?;

        if res.status().is_success() {
            return res.json::<Profile>().await.map_err(ClientError::Transport);
        }
        Err(Self::error_for(res).await)
    }

    pub async fn update_forced_number(
        &self,
        token: &str,
        payload: &ForcedNumberUpdate,
    ) -> std::result::Result<Profile, ClientError> {
        let res = self
            .http
            .put(self.endpoint("auth/forced-number")?)
            .bearer_auth(token)
            .json(payload)
            .send()
            .await
            .map_err(ClientError::Transport)?;

        if res.status().is_success() {
            return res.json::<Profile>().await.map_err(ClientError::Transport);
        }
        Err(Self::error_for(res).await)
    }

    pub async fn history_push(
        &self,
        token: &str,
        payload: &HistoryPush,
    ) -> std::result::Result<HistoryCreated, ClientError> {
        let res = self
            .http
            .post(self.endpoint("calculator/history")?)
            .bearer_auth(token)
            .json(payload)
            .send()
            .await
            .map_err(ClientError::Transport)?;

        if res.status().is_success() {
            return res
                .json::<HistoryCreated>()
                .await
                .map_err(ClientError::Transport);
        }
        Err(Self::error_for(res).await)
    }

    pub async fn history_list(
        &self,
        token: &str,
        query: &HistoryListQuery,
    ) -> std::result::Result<HistoryListResponse, ClientError> {
        let res = self
            .http
            .get(self.endpoint("calculator/history")?)
            .bearer_auth(token)
            .query(query)
            .send()
            .await
            .map_err(ClientError::Transport)?;

        if res.status().is_success() {
            return res
                .json::<HistoryListResponse>()
                .await
                .map_err(ClientError::Transport);
        }
        Err(Self::error_for(res).await)
    }

    pub async fn history_delete(
        &self,
        token: &str,
        device_id: Option<&str>,
    ) -> std::result::Result<(), ClientError> {
        let mut request = self
            .http
            .delete(self.endpoint("calculator/history")?)
            .bearer_auth(token);
        if let Some(device_id) = device_id {
            request = request.query(&[("deviceId", device_id)]);
        }

        let res = request.send().await.map_err(ClientError::Transport)?;
        if res.status().is_success() {
            return Ok(());
        }
        Err(Self::error_for(res).await)
    }

    pub async fn stats(&self, token: &str) -> std::result::Result<CalculatorStats, ClientError> {
        let res = self
            .http
            .get(self.endpoint("calculator/stats")?)
            .bearer_auth(token)
            .send()
            .await
            .map_err(ClientError::Transport)?;

        if res.status().is_success() {
            return res
                .json::<CalculatorStats>()
                .await
                .map_err(ClientError::Transport);
        }
        Err(Self::error_for(res).await)
    }

    pub async fn sync_batch(
        &self,
        token: &str,
        payload: &SyncRequest,
    ) -> std::result::Result<SyncResponse, ClientError> {
        let res = self
            .http
            .post(self.endpoint("calculator/sync")?)
            .bearer_auth(token)
            .json(payload)
            .send()
            .await
            .map_err(ClientError::Transport)?;

        if res.status().is_success() {
            return res
                .json::<SyncResponse>()
                .await
                .map_err(ClientError::Transport);
        }
        Err(Self::error_for(res).await)
    }
}
