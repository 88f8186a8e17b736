//! Commit backfill from GitHub.
//!
//! Appends one activity record per commit the authenticated user authored in
//! a given month, using the GitHub REST API:
//!
//! - `GET /user` resolves the login behind the token
//! - `GET /search/commits` lists the user's commits, 100 per page, capped at
//!   the 1000 results the search API will return
//!
//! Commits are filtered locally by the `YYYY-MM-` prefix of their committer
//! date, attributed to the repository name, and appended without debouncing.
//! Running the same month twice appends the same commits twice.

use std::fmt;
use std::time::Duration;

use chrono::{Datelike, Local, NaiveDate};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::recorder::{ActivityRecorder, RecorderError};
use crate::types::{ActivityRecord, ProjectKey};

/// HTTP request timeout.
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Results per search page (the API maximum).
const PER_PAGE: usize = 100;

/// The search API never returns more than this many results.
const MAX_SEARCH_RESULTS: usize = 1000;

/// Project name for commits without a repository.
const UNKNOWN_REPOSITORY: &str = "unknown";

const USER_AGENT: &str = concat!("dev-activity/", env!("CARGO_PKG_VERSION"));

/// Errors that can occur during a backfill.
#[derive(Error, Debug)]
pub enum BackfillError {
    /// No token was configured.
    #[error("GITHUB_TOKEN is not set; create a token and export it to backfill commits")]
    MissingToken,

    /// GitHub rejected the token (401 or 403).
    #[error("authentication failed ({status}): check that GITHUB_TOKEN is valid")]
    AuthFailed { status: u16 },

    /// GitHub returned another error status.
    #[error("server error: {status} - {message}")]
    ServerError { status: u16, message: String },

    /// HTTP request or response decoding failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The requested month does not exist.
    #[error("invalid month: {year}-{month:02}")]
    InvalidMonth { year: i32, month: u32 },
}

/// A calendar month to backfill.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackfillMonth {
    year: i32,
    month: u32,
}

impl BackfillMonth {
    /// Creates a month, validating that `month` is `1..=12`.
    ///
    /// # Errors
    ///
    /// Returns `BackfillError::InvalidMonth` for out-of-range values.
    pub fn new(year: i32, month: u32) -> Result<Self, BackfillError> {
        if NaiveDate::from_ymd_opt(year, month, 1).is_none() {
            return Err(BackfillError::InvalidMonth { year, month });
        }
        Ok(Self { year, month })
    }

    /// The current local month.
    #[must_use]
    pub fn current() -> Self {
        let today = Local::now().date_naive();
        Self {
            year: today.year(),
            month: today.month(),
        }
    }

    /// The year.
    #[must_use]
    pub fn year(&self) -> i32 {
        self.year
    }

    /// The month, `1..=12`.
    #[must_use]
    pub fn month(&self) -> u32 {
        self.month
    }

    /// Date prefix shared by every day of the month, e.g. `2024-01-`.
    #[must_use]
    pub fn prefix(&self) -> String {
        format!("{:04}-{:02}-", self.year, self.month)
    }

    /// First day of the month.
    #[must_use]
    pub fn first_day(&self) -> NaiveDate {
        NaiveDate::from_ymd_opt(self.year, self.month, 1).unwrap_or(NaiveDate::MIN)
    }

    /// Last day of the month.
    #[must_use]
    pub fn last_day(&self) -> NaiveDate {
        let (year, month) = if self.month == 12 {
            (self.year + 1, 1)
        } else {
            (self.year, self.month + 1)
        };
        NaiveDate::from_ymd_opt(year, month, 1)
            .and_then(|next| next.pred_opt())
            .unwrap_or(NaiveDate::MAX)
    }
}

impl fmt::Display for BackfillMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

/// One commit attributed to a project on a day.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackfillCommit {
    /// Day taken from the committer date.
    pub date: NaiveDate,
    /// Repository name, or `unknown`.
    pub project: ProjectKey,
    /// Committer timestamp as reported by GitHub.
    pub ts: String,
}

impl BackfillCommit {
    /// Converts into a log record, rewriting a trailing `Z` as `+00:00`.
    #[must_use]
    pub fn into_record(self) -> ActivityRecord {
        let ts = match self.ts.strip_suffix('Z') {
            Some(stripped) => format!("{stripped}+00:00"),
            None => self.ts,
        };
        ActivityRecord {
            date: self.date,
            ts,
            project: self.project,
        }
    }
}

/// Result of appending backfilled commits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackfillOutcome {
    /// No commits matched the month; the log was not touched.
    NothingToAdd,
    /// This many records were appended.
    Appended(usize),
}

#[derive(Debug, Deserialize)]
struct UserResponse {
    login: String,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    total_count: usize,
    #[serde(default)]
    incomplete_results: bool,
    #[serde(default)]
    items: Vec<Value>,
}

/// Minimal GitHub REST client.
#[derive(Debug, Clone)]
pub struct GitHubClient {
    client: Client,
    api_url: String,
    token: String,
}

impl GitHubClient {
    /// Creates a client for `api_url` authenticating with `token`.
    ///
    /// # Errors
    ///
    /// Returns `BackfillError::MissingToken` if `token` is absent or blank,
    /// or `BackfillError::Http` if the HTTP client cannot be built.
    pub fn new(api_url: impl Into<String>, token: Option<String>) -> Result<Self, BackfillError> {
        let token = token
            .filter(|t| !t.trim().is_empty())
            .ok_or(BackfillError::MissingToken)?;

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/vnd.github+json"));
        headers.insert(
            "X-GitHub-Api-Version",
            HeaderValue::from_static("2022-11-28"),
        );

        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            api_url: api_url.into().trim_end_matches('/').to_string(),
            token,
        })
    }

    /// Returns the login of the token's owner.
    ///
    /// # Errors
    ///
    /// Returns `BackfillError` if the request fails or the token is rejected.
    pub async fn authenticated_login(&self) -> Result<String, BackfillError> {
        let url = format!("{}/user", self.api_url);
        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.token)
            .send()
            .await?;
        let user: UserResponse = check_status(response).await?.json().await?;
        debug!(login = %user.login, "Resolved GitHub login");
        Ok(user.login)
    }

    /// Lists raw commit search results authored by `login` in `month`.
    ///
    /// Pages are fetched until a short page, the reported total, or the
    /// search API's 1000-result cap.
    ///
    /// # Errors
    ///
    /// Returns `BackfillError` on the first failing page.
    pub async fn search_commits(
        &self,
        login: &str,
        month: BackfillMonth,
    ) -> Result<Vec<Value>, BackfillError> {
        let url = format!("{}/search/commits", self.api_url);
        let query = format!(
            "author:{login} committer-date:{}..{}",
            month.first_day(),
            month.last_day()
        );

        let per_page = PER_PAGE.to_string();
        let mut items = Vec::new();
        let mut page = 1_usize;

        loop {
            let page_param = page.to_string();
            let response = self
                .client
                .get(&url)
                .bearer_auth(&self.token)
                .query(&[
                    ("q", query.as_str()),
                    ("per_page", per_page.as_str()),
                    ("page", page_param.as_str()),
                ])
                .send()
                .await?;
            let body: SearchResponse = check_status(response).await?.json().await?;

            if body.incomplete_results {
                warn!(page, "GitHub search returned incomplete results");
            }

            let received = body.items.len();
            debug!(page, received, total = body.total_count, "Fetched commit page");
            items.extend(body.items);

            if received < PER_PAGE
                || items.len() >= body.total_count
                || items.len() >= MAX_SEARCH_RESULTS
            {
                break;
            }
            page += 1;
        }

        items.truncate(MAX_SEARCH_RESULTS);
        Ok(items)
    }
}

async fn check_status(response: Response) -> Result<Response, BackfillError> {
    let status = response.status();
    match status {
        s if s.is_success() => Ok(response),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(BackfillError::AuthFailed {
            status: status.as_u16(),
        }),
        _ => {
            let message = response.text().await.unwrap_or_default();
            Err(BackfillError::ServerError {
                status: status.as_u16(),
                message,
            })
        }
    }
}

/// Keeps the commits whose committer date falls in `month`.
///
/// Items without a committer date, or whose date prefix is not a valid day,
/// are skipped. Commits without a repository name count as `unknown`.
#[must_use]
pub fn commits_for_month(items: &[Value], month: BackfillMonth) -> Vec<BackfillCommit> {
    let prefix = month.prefix();

    items
        .iter()
        .filter_map(|item| {
            let ts = item.pointer("/commit/committer/date")?.as_str()?;
            if !ts.starts_with(&prefix) {
                return None;
            }
            let date = NaiveDate::parse_from_str(ts.get(..10)?, "%Y-%m-%d").ok()?;
            let project = item
                .pointer("/repository/name")
                .and_then(Value::as_str)
                .filter(|name| !name.is_empty())
                .unwrap_or(UNKNOWN_REPOSITORY);

            Some(BackfillCommit {
                date,
                project: project.to_string(),
                ts: ts.to_string(),
            })
        })
        .collect()
}

/// Appends one record per commit.
///
/// # Errors
///
/// Returns `RecorderError` if the log cannot be written.
pub fn append_backfill(
    recorder: &ActivityRecorder,
    commits: Vec<BackfillCommit>,
) -> Result<BackfillOutcome, RecorderError> {
    if commits.is_empty() {
        return Ok(BackfillOutcome::NothingToAdd);
    }

    let records: Vec<ActivityRecord> = commits
        .into_iter()
        .map(BackfillCommit::into_record)
        .collect();
    let written = recorder.append_records(&records)?;
    Ok(BackfillOutcome::Appended(written))
}

/// Resolves the login, searches `month`, filters and appends.
///
/// # Errors
///
/// Returns an error if any GitHub request fails or the log cannot be written.
pub async fn backfill_month(
    client: &GitHubClient,
    recorder: &ActivityRecorder,
    month: BackfillMonth,
) -> crate::error::Result<BackfillOutcome> {
    let login = client.authenticated_login().await?;
    let items = client.search_commits(&login, month).await?;
    let commits = commits_for_month(&items, month);

    info!(
        %month,
        login = %login,
        fetched = items.len(),
        matched = commits.len(),
        "Backfilling commits"
    );

    Ok(append_backfill(recorder, commits)?)
}
