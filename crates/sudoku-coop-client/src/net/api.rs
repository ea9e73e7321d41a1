//! REST client for the puzzle backend.
//!
//! Every request carries the session's bearer token. Idempotent reads are
//! retried on transient failures; writes are sent once.

use std::future::Future;

use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use sudoku_coop_core::protocol::{
    ApiMessage, CreatePuzzleResponse, HidePuzzleRequest, LeaderboardEntry, LeaderboardResponse,
    PuzzleDto, PuzzleListResponse, SolutionResponse,
};
use sudoku_coop_core::{CreatePuzzle, LocalEdit, Puzzle, PuzzleId, Session};

use crate::config::{ClientConfig, ReconnectPolicy};
use crate::error::{ClientError, Result};
use crate::net::backoff::Backoff;

#[derive(Clone)]
pub struct ApiClient {
    http: Client,
    base_url: String,
    token: String,
    retry: ReconnectPolicy,
}

impl ApiClient {
    pub fn new(config: &ClientConfig, session: &Session) -> Result<Self> {
        let http = Client::builder().timeout(config.request_timeout).build()?;
        Ok(Self {
            http,
            base_url: config.http_base_url(),
            token: session.access_token().to_string(),
            retry: ReconnectPolicy::for_requests(),
        })
    }

    pub fn with_retry(mut self, retry: ReconnectPolicy) -> Self {
        self.retry = retry;
        self
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Attach the credential to the backend's user record.
    pub async fn register(&self) -> Result<()> {
        let res = self
            .http
            .post(self.url("/register"))
            .bearer_auth(&self.token)
            .send()
            .await?;
        check(res).await.map(|_| ())
    }

    /// Puzzles the session user participates in.
    pub async fn list_puzzles(&self) -> Result<Vec<PuzzleDto>> {
        let body: PuzzleListResponse = self
            .get_json(|| self.http.get(self.url("/puzzles")))
            .await?;
        Ok(body.puzzles)
    }

    pub async fn create_puzzle(&self, request: &CreatePuzzle) -> Result<CreatePuzzleResponse> {
        let query = [
            ("difficulty", request.difficulty.to_string()),
            ("size", request.size.to_string()),
            ("additional_players", request.invitees_csv()),
        ];
        let res = self
            .http
            .post(self.url("/puzzles"))
            .query(&query)
            .bearer_auth(&self.token)
            .send()
            .await?;
        let created: CreatePuzzleResponse = check(res).await?.json().await?;
        if !created.unregistered_emails.is_empty() {
            warn!(
                puzzle_id = created.puzzle_id,
                emails = ?created.unregistered_emails,
                "some invitees are not registered"
            );
        }
        Ok(created)
    }

    pub async fn get_puzzle(&self, puzzle_id: PuzzleId) -> Result<Puzzle> {
        let path = format!("/puzzles/{}", puzzle_id);
        let dto: PuzzleDto = self.get_json(|| self.http.get(self.url(&path))).await?;
        Ok(Puzzle::try_from(dto)?)
    }

    /// Persist one cell edit.
    pub async fn move_piece(&self, puzzle_id: PuzzleId, edit: &LocalEdit) -> Result<()> {
        let res = self
            .http
            .post(self.url(&format!("/puzzles/{}/piece", puzzle_id)))
            .bearer_auth(&self.token)
            .json(&edit.to_request())
            .send()
            .await?;
        check(res).await.map(|_| ())
    }

    pub async fn get_solution(&self, puzzle_id: PuzzleId) -> Result<SolutionResponse> {
        let path = format!("/puzzles/{}/solution", puzzle_id);
        self.get_json(|| self.http.get(self.url(&path))).await
    }

    pub async fn hide_puzzle(&self, puzzle_id: PuzzleId) -> Result<()> {
        let res = self
            .http
            .patch(self.url(&format!("/puzzles/{}", puzzle_id)))
            .bearer_auth(&self.token)
            .json(&HidePuzzleRequest { hidden: true })
            .send()
            .await?;
        check(res).await.map(|_| ())
    }

    pub async fn leaderboard(&self) -> Result<Vec<LeaderboardEntry>> {
        let body: LeaderboardResponse = self
            .get_json(|| self.http.get(self.url("/leaderboard")))
            .await?;
        Ok(body.players)
    }

    async fn get_json<T, F>(&self, build: F) -> Result<T>
    where
        T: DeserializeOwned,
        F: Fn() -> RequestBuilder,
    {
        let build = &build;
        retry(&self.retry, move || async move {
            let res = build().bearer_auth(&self.token).send().await?;
            Ok(check(res).await?.json::<T>().await?)
        })
        .await
    }
}

/// Run `op` until it succeeds, fails permanently or the policy runs out.
async fn retry<T, F, Fut>(policy: &ReconnectPolicy, mut op: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut backoff = Backoff::new(policy.clone());
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_transient() => match backoff.next_delay() {
                Some(delay) => {
                    debug!(error = %e, attempt = backoff.attempt(), ?delay, "retrying request");
                    tokio::time::sleep(delay).await;
                }
                None => return Err(e),
            },
            Err(e) => return Err(e),
        }
    }
}

/// Map non-success statuses to errors, reading the `{message, reason}` body.
async fn check(res: Response) -> Result<Response> {
    let status = res.status();
    if status.is_success() {
        return Ok(res);
    }
    let text = res.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ApiMessage>(&text)
        .map(|m| m.describe())
        .ok()
        .filter(|m| !m.is_empty())
        .unwrap_or(text);

    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(ClientError::Unauthorized(message)),
        _ => Err(ClientError::Status { status, message }),
    }
}
