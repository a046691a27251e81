use crate::domain::model::{MatchState, PlayerId};
use crate::domain::ports::{DirectoryPlayer, MatchStore, PlayerDirectory};
use crate::utils::error::{Result, ScorerError};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

fn parse_base_url(base_url: &str) -> Result<Url> {
    let url = Url::parse(base_url).map_err(|e| ScorerError::InvalidConfigValueError {
        field: "endpoint".to_string(),
        value: base_url.to_string(),
        reason: e.to_string(),
    })?;
    if url.cannot_be_a_base() {
        return Err(ScorerError::InvalidConfigValueError {
            field: "endpoint".to_string(),
            value: base_url.to_string(),
            reason: "URL cannot be used as a base".to_string(),
        });
    }
    Ok(url)
}

fn build_client(timeout: Duration) -> Result<Client> {
    Ok(Client::builder().timeout(timeout).build()?)
}

fn endpoint(base: &Url, segments: &[&str]) -> Url {
    let mut url = base.clone();
    if let Ok(mut path) = url.path_segments_mut() {
        path.pop_if_empty().extend(segments);
    }
    url
}

/// Match documents behind a REST-style document service:
/// `GET`/`PUT {base}/matches/{match_id}`.
#[derive(Debug, Clone)]
pub struct HttpMatchStore {
    client: Client,
    base_url: Url,
}

impl HttpMatchStore {
    pub fn new(base_url: &str) -> Result<Self> {
        Self::with_timeout(base_url, DEFAULT_REQUEST_TIMEOUT)
    }

    pub fn with_timeout(base_url: &str, timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: build_client(timeout)?,
            base_url: parse_base_url(base_url)?,
        })
    }
}

#[async_trait]
impl MatchStore for HttpMatchStore {
    async fn load(&self, match_id: &str) -> Result<Option<MatchState>> {
        let url = endpoint(&self.base_url, &["matches", match_id]);
        tracing::debug!("Loading match from: {}", url);

        let response = self.client.get(url).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let state = response.error_for_status()?.json::<MatchState>().await?;
        Ok(Some(state))
    }

    async fn save(&self, match_id: &str, state: &MatchState) -> Result<()> {
        let url = endpoint(&self.base_url, &["matches", match_id]);
        let response = self.client.put(url).json(state).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ScorerError::StoreError {
                message: format!("saving match {} returned {}", match_id, status),
            });
        }
        Ok(())
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct NewPlayer<'a> {
    name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    phone_number: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct CreatedPlayer {
    id: PlayerId,
}

/// Player records behind `GET {base}/players?name=..|phone=..` and
/// `POST {base}/players`.
#[derive(Debug, Clone)]
pub struct HttpPlayerDirectory {
    client: Client,
    base_url: Url,
}

impl HttpPlayerDirectory {
    pub fn new(base_url: &str) -> Result<Self> {
        Self::with_timeout(base_url, DEFAULT_REQUEST_TIMEOUT)
    }

    pub fn with_timeout(base_url: &str, timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: build_client(timeout)?,
            base_url: parse_base_url(base_url)?,
        })
    }

    async fn search(&self, key: &str, value: &str) -> Result<Vec<DirectoryPlayer>> {
        let url = endpoint(&self.base_url, &["players"]);
        let players = self
            .client
            .get(url)
            .query(&[(key, value)])
            .send()
            .await?
            .error_for_status()?
            .json::<Vec<DirectoryPlayer>>()
            .await?;
        Ok(players)
    }
}

#[async_trait]
impl PlayerDirectory for HttpPlayerDirectory {
    async fn find_by_name(&self, name: &str) -> Result<Vec<DirectoryPlayer>> {
        self.search("name", name).await
    }

    async fn find_by_phone(&self, phone_number: &str) -> Result<Vec<DirectoryPlayer>> {
        self.search("phone", phone_number).await
    }

    async fn create(&self, name: &str, phone_number: Option<&str>) -> Result<PlayerId> {
        let url = endpoint(&self.base_url, &["players"]);
        let created = self
            .client
            .post(url)
            .json(&NewPlayer { name, phone_number })
            .send()
            .await?
            .error_for_status()?
            .json::<CreatedPlayer>()
            .await?;
        Ok(created.id)
    }
}
