//! HTTP client for the caddie backend.
//!
//! Every authenticated call takes the [`Session`] it should act as. The
//! client itself holds no login state.

use anyhow::{Context, anyhow};
use reqwest::{Client, Method, RequestBuilder, StatusCode, Url};
use serde::{Serialize, de::DeserializeOwned};

use crate::{
    Config,
    error::BackendError,
    model::{
        Club, ClubUpdate, HoleScore, PasswordChange, ProfileUpdate, Recommendation,
        RecommendationRequest, Registration, Round, ShotFeedback, StartRound, UserProfile,
    },
    session::Session,
};

type Result<T> = std::result::Result<T, BackendError>;

/// Page size used by the round history screen.
pub const DEFAULT_HISTORY_LIMIT: u32 = 10;

#[derive(Debug, Serialize)]
struct Credentials<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(Debug, serde::Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Debug, Serialize)]
struct HoleScoreUpdate<'a> {
    shots: u32,
    par: u32,
    notes: Option<&'a str>,
}

#[derive(Debug, Serialize)]
struct RoundNotes<'a> {
    notes: Option<&'a str>,
}

#[derive(Debug, Serialize)]
struct AddClubs<'a> {
    clubs: &'a [Club],
}

#[derive(Debug, Clone)]
pub struct BackendClient {
    base_url: Url,
    http: Client,
}

impl BackendClient {
    pub fn new(base_url: &str) -> anyhow::Result<Self> {
        let base_url = Url::parse(base_url.trim())
            .with_context(|| format!("Invalid backend URL '{base_url}'"))?;

        if base_url.cannot_be_a_base() {
            return Err(anyhow!("Backend URL '{base_url}' cannot carry a path"));
        }

        Ok(Self { base_url, http: Client::new() })
    }

    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        Self::new(&config.backend_url())
    }

    pub fn base_url(&self) -> &str {
        self.base_url.as_str()
    }

    /// Base URL with `segments` appended, each percent-encoded.
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn request(&self, method: Method, segments: &[&str]) -> RequestBuilder {
        let url = self.endpoint(segments);
        log::debug!("{method} {url}");
        self.http.request(method, url)
    }

    fn authed(&self, method: Method, segments: &[&str], session: &Session) -> RequestBuilder {
        self.request(method, segments).bearer_auth(&session.token)
    }

    /// Send and return the body of a 2xx response.
    async fn execute(&self, request: RequestBuilder) -> Result<String> {
        let res = request.send().await?;
        let status = res.status();
        let body = res.text().await?;

        check_status(status, body)
    }

    async fn fetch<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        let body = self.execute(request).await?;
        Ok(serde_json::from_str(&body)?)
    }

    // Auth & profile

    /// Exchange credentials for a token and load the matching profile.
    pub async fn login(&self, email: &str, password: &str) -> Result<Session> {
        let username = email.trim().to_lowercase();
        let request = self
            .request(Method::POST, &["auth", "token"])
            .form(&Credentials { username: &username, password });

        let token: TokenResponse = self.fetch(request).await.map_err(login_failure)?;

        let mut session = Session::new(token.access_token);
        session.user = Some(self.me(&session).await?);

        log::info!("Logged in as {username}");
        Ok(session)
    }

    pub async fn me(&self, session: &Session) -> Result<UserProfile> {
        self.fetch(self.authed(Method::GET, &["me"], session)).await
    }

    /// Tell the backend to revoke the token. Failures are logged and
    /// otherwise ignored: the caller forgets the session either way.
    pub async fn logout(&self, session: &Session) {
        let request = self.authed(Method::DELETE, &["auth", "logout"], session);
        if let Err(e) = self.execute(request).await {
            log::warn!("Logout request failed: {e}");
        }
    }

    pub async fn register(&self, registration: &Registration) -> Result<()> {
        let request = self.request(Method::POST, &["user"]).json(registration);
        self.execute(request).await?;
        log::info!("Registered {}", registration.email);
        Ok(())
    }

    pub async fn change_password(&self, session: &Session, change: &PasswordChange) -> Result<()> {
        let request = self.authed(Method::PUT, &["change-password"], session).json(change);
        self.execute(request).await.map(drop)
    }

    /// Returns the names as stored; merge them with [`UserProfile::apply_update`].
    pub async fn update_profile(
        &self,
        session: &Session,
        update: &ProfileUpdate,
    ) -> Result<ProfileUpdate> {
        self.fetch(self.authed(Method::PUT, &["profile"], session).json(update)).await
    }

    // Clubs

    pub async fn clubs(&self, session: &Session) -> Result<Vec<Club>> {
        self.fetch(self.authed(Method::GET, &["clubs"], session)).await
    }

    pub async fn add_clubs(&self, session: &Session, clubs: &[Club]) -> Result<()> {
        let request = self.authed(Method::POST, &["clubs"], session).json(&AddClubs { clubs });
        self.execute(request).await.map(drop)
    }

    pub async fn update_club(
        &self,
        session: &Session,
        name: &str,
        update: &ClubUpdate,
    ) -> Result<()> {
        let request = self.authed(Method::PUT, &["clubs", name], session).json(update);
        self.execute(request).await.map(drop)
    }

    pub async fn delete_club(&self, session: &Session, name: &str) -> Result<()> {
        self.execute(self.authed(Method::DELETE, &["clubs", name], session)).await.map(drop)
    }

    // Rounds

    pub async fn start_round(&self, session: &Session, start: &StartRound) -> Result<Round> {
        let round: Round =
            self.fetch(self.authed(Method::POST, &["rounds", "start"], session).json(start)).await?;
        log::info!("Started round {} at {}", round.id, round.course_name);
        Ok(round)
    }

    /// The unfinished round, if any. The backend answers `null` when there is none.
    pub async fn active_round(&self, session: &Session) -> Result<Option<Round>> {
        self.fetch(self.authed(Method::GET, &["rounds", "active"], session)).await
    }

    pub async fn update_hole_score(
        &self,
        session: &Session,
        round_id: i64,
        hole_number: u32,
        shots: u32,
        par: u32,
        notes: Option<&str>,
    ) -> Result<HoleScore> {
        let id = round_id.to_string();
        let hole = hole_number.to_string();
        let request = self
            .authed(Method::PUT, &["rounds", &id, "hole", &hole], session)
            .json(&HoleScoreUpdate { shots, par, notes });

        self.fetch(request).await
    }

    pub async fn complete_round(
        &self,
        session: &Session,
        round_id: i64,
        notes: Option<&str>,
    ) -> Result<Round> {
        let id = round_id.to_string();
        let request = self
            .authed(Method::POST, &["rounds", &id, "complete"], session)
            .json(&RoundNotes { notes });

        let round: Round = self.fetch(request).await?;
        log::info!("Completed round {}", round.id);
        Ok(round)
    }

    pub async fn round_history(
        &self,
        session: &Session,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<Round>> {
        let request = self
            .authed(Method::GET, &["rounds", "history"], session)
            .query(&[("limit", limit), ("offset", offset)]);

        self.fetch(request).await
    }

    pub async fn round(&self, session: &Session, round_id: i64) -> Result<Round> {
        let id = round_id.to_string();
        self.fetch(self.authed(Method::GET, &["rounds", &id], session)).await
    }

    pub async fn delete_round(&self, session: &Session, round_id: i64) -> Result<()> {
        let id = round_id.to_string();
        self.execute(self.authed(Method::DELETE, &["rounds", &id], session)).await?;
        log::info!("Deleted round {round_id}");
        Ok(())
    }

    // Recommendations

    pub async fn recommend(
        &self,
        session: &Session,
        query: &RecommendationRequest,
    ) -> Result<Recommendation> {
        self.fetch(self.authed(Method::POST, &["agent", "query"], session).json(query)).await
    }

    pub async fn submit_feedback(&self, session: &Session, feedback: &ShotFeedback) -> Result<()> {
        let request = self.authed(Method::POST, &["shots", "feedback"], session).json(feedback);
        self.execute(request).await.map(drop)
    }
}

/// 401 means the token is gone; any other non-2xx carries the backend's `detail`.
fn check_status(status: StatusCode, body: String) -> Result<String> {
    if status == StatusCode::UNAUTHORIZED {
        return Err(BackendError::Unauthorized);
    }
    if !status.is_success() {
        return Err(BackendError::from_status(status, &body));
    }
    Ok(body)
}

/// The token endpoint answers bad credentials with 400 or 401.
fn login_failure(err: BackendError) -> BackendError {
    match err {
        BackendError::Unauthorized => BackendError::InvalidCredentials,
        BackendError::Status { status, .. } if status == StatusCode::BAD_REQUEST => {
            BackendError::InvalidCredentials
        }
        other => other,
    }
}
