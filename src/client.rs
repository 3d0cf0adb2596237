use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::api::DATA_PATH;
use crate::leaderboard::{CommitError, LeaderboardStore};
use crate::store::{Standing, StoreError};

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("server answered {status}: {message}")]
    Status { status: u16, message: String },
    #[error(transparent)]
    Commit(#[from] CommitError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// How a controller talks to the leaderboard.
///
/// Nothing here retries. A failed commit is reported once and the delta is
/// gone.
pub trait LeaderboardClient {
    fn fetch(&self) -> Result<Vec<Standing>, ClientError>;

    fn commit(&self, name: &str, seconds: u64) -> Result<Vec<Standing>, ClientError>;

    /// Best-effort commit that must not wait for completion. Used on teardown,
    /// where the process may exit before the request lands.
    fn dispatch(&self, name: &str, seconds: u64);
}

#[derive(Debug, Serialize)]
struct CommitBody<'a> {
    name: &'a str,
    seconds: u64,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
}

/// Client for a remote `focusboard serve`
#[derive(Debug, Clone)]
pub struct HttpLeaderboardClient {
    http: reqwest::blocking::Client,
    url: String,
}

impl HttpLeaderboardClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ClientError> {
        let http = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()?;
        Ok(Self {
            http,
            url: format!("{}{}", base_url.trim_end_matches('/'), DATA_PATH),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    fn read_standings(response: reqwest::blocking::Response) -> Result<Vec<Standing>, ClientError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response.json()?);
        }

        let message = response
            .json::<ErrorBody>()
            .map(|body| body.error)
            .unwrap_or_else(|_| status.to_string());
        Err(ClientError::Status {
            status: status.as_u16(),
            message,
        })
    }
}

impl LeaderboardClient for HttpLeaderboardClient {
    fn fetch(&self) -> Result<Vec<Standing>, ClientError> {
        Self::read_standings(self.http.get(&self.url).send()?)
    }

    fn commit(&self, name: &str, seconds: u64) -> Result<Vec<Standing>, ClientError> {
        let response = self
            .http
            .post(&self.url)
            .json(&CommitBody { name, seconds })
            .send()?;
        Self::read_standings(response)
    }

    fn dispatch(&self, name: &str, seconds: u64) {
        let client = self.clone();
        let name = name.to_string();
        let spawned = std::thread::Builder::new()
            .name("focusboard-dispatch".into())
            .spawn(move || match client.commit(&name, seconds) {
                Ok(_) => debug!(participant = %name, seconds, "dispatched commit landed"),
                Err(err) => debug!(participant = %name, seconds, error = %err, "dispatched commit lost"),
            });
        if let Err(err) = spawned {
            warn!(error = %err, "could not dispatch commit");
        }
    }
}

/// In-process client over a shared [`LeaderboardStore`], for running without a server
#[derive(Clone)]
pub struct LocalClient {
    board: Arc<LeaderboardStore>,
}

impl LocalClient {
    pub fn new(board: Arc<LeaderboardStore>) -> Self {
        Self { board }
    }
}

impl LeaderboardClient for LocalClient {
    fn fetch(&self) -> Result<Vec<Standing>, ClientError> {
        Ok(self.board.snapshot()?)
    }

    fn commit(&self, name: &str, seconds: u64) -> Result<Vec<Standing>, ClientError> {
        Ok(self.board.commit(name, seconds)?)
    }

    fn dispatch(&self, name: &str, seconds: u64) {
        if let Err(err) = self.board.commit(name, seconds) {
            warn!(participant = name, seconds, error = %err, "dispatched commit lost");
        }
    }
}
