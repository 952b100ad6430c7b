use std::{
    ops::{Deref, DerefMut},
    sync::Arc,
};

use anyhow::Context;
use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::{self, request, HeaderMap, HeaderValue},
};
use forum_api::{AuthToken, User, UserId, Uuid};

use crate::{db, Config, Error, JsonError};

pub const SESSION_COOKIE: &str = "session";

#[derive(Clone, FromRef)]
pub struct AppState {
    pub db: PgPool,
    pub config: Arc<Config>,
}

#[derive(Clone)]
pub struct PgPool(sqlx::PgPool);

impl PgPool {
    pub fn new(pool: sqlx::PgPool) -> PgPool {
        PgPool(pool)
    }

    pub async fn acquire(&self) -> Result<PgConn, Error> {
        Ok(PgConn(
            self.0.acquire().await.context("acquiring db connection")?,
        ))
    }

    pub fn num_idle(&self) -> usize {
        self.0.num_idle()
    }
}

pub struct PgConn(sqlx::pool::PoolConnection<sqlx::Postgres>);

#[async_trait]
impl FromRequestParts<AppState> for PgConn {
    type Rejection = Error;

    async fn from_request_parts(
        _req: &mut request::Parts,
        state: &AppState,
    ) -> Result<PgConn, Error> {
        state.db.acquire().await
    }
}

impl Deref for PgConn {
    type Target = sqlx::PgConnection;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl DerefMut for PgConn {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

/// Session token carried by the `session` cookie, if any
pub fn session_token(headers: &HeaderMap) -> Option<AuthToken> {
    headers
        .get_all(http::header::COOKIE)
        .iter()
        .filter_map(|h| h.to_str().ok())
        .flat_map(|h| h.split(';'))
        .filter_map(|c| c.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .and_then(|(_, value)| Uuid::try_from(value.trim_matches('"')).ok())
        .map(AuthToken)
}

pub fn session_cookie(token: AuthToken) -> HeaderValue {
    // a hyphenated uuid is always a valid header value
    HeaderValue::from_str(&format!(
        "{SESSION_COOKIE}={}; Path=/; HttpOnly; SameSite=Lax",
        token.0
    ))
    .unwrap_or_else(|_| HeaderValue::from_static("session=; Path=/"))
}

pub fn expired_session_cookie() -> HeaderValue {
    HeaderValue::from_static("session=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0")
}

/// The user browsing, if signed in
pub struct Viewer(pub Option<User>);

impl Viewer {
    pub fn id(&self) -> Option<UserId> {
        self.0.as_ref().map(|u| u.id)
    }
}

#[async_trait]
impl FromRequestParts<AppState> for Viewer {
    type Rejection = Error;

    async fn from_request_parts(
        req: &mut request::Parts,
        state: &AppState,
    ) -> Result<Viewer, Error> {
        let token = match session_token(&req.headers) {
            None => return Ok(Viewer(None)),
            Some(token) => token,
        };
        let mut conn = state.db.acquire().await?;
        let user = db::recover_session(&mut *conn, token)
            .await
            .context("recovering session")?;
        if user.is_none() {
            tracing::debug!(?token, "unknown session token, treating viewer as anonymous");
        }
        Ok(Viewer(user))
    }
}

pub struct SignedIn(pub User);

#[async_trait]
impl FromRequestParts<AppState> for SignedIn {
    type Rejection = Error;

    async fn from_request_parts(
        req: &mut request::Parts,
        state: &AppState,
    ) -> Result<SignedIn, Error> {
        Viewer::from_request_parts(req, state)
            .await?
            .0
            .map(SignedIn)
            .ok_or_else(Error::sign_in_required)
    }
}

pub struct PreAuth(pub AuthToken);

#[async_trait]
impl<S: Sync> FromRequestParts<S> for PreAuth {
    type Rejection = Error;

    async fn from_request_parts(req: &mut request::Parts, _state: &S) -> Result<PreAuth, Error> {
        let auth = req
            .headers
            .get(http::header::AUTHORIZATION)
            .ok_or_else(Error::permission_denied)?
            .to_str()
            .map_err(|_| Error::permission_denied())?;
        let mut auth = auth.split(' ');
        if !auth
            .next()
            .ok_or_else(Error::permission_denied)?
            .eq_ignore_ascii_case("bearer")
        {
            return Err(Error::permission_denied());
        }
        let token = auth.next().ok_or_else(Error::permission_denied)?;
        if auth.next().is_some() {
            return Err(Error::permission_denied());
        }
        let token = Uuid::try_from(token).map_err(|_| Error::permission_denied())?;
        Ok(PreAuth(AuthToken(token)))
    }
}

pub struct AdminAuth;

#[async_trait]
impl FromRequestParts<AppState> for AdminAuth {
    type Rejection = JsonError;

    async fn from_request_parts(
        req: &mut request::Parts,
        state: &AppState,
    ) -> Result<AdminAuth, JsonError> {
        let token = PreAuth::from_request_parts(req, state).await?.0;
        if Some(token) == state.config.admin_token {
            Ok(AdminAuth)
        } else {
            Err(JsonError(Error::permission_denied()))
        }
    }
}
