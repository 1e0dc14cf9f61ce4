//! Authenticated HTTP transport with single-flight token refresh.

use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt, Shared};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use tokio::sync::Mutex;

use crate::config::ClientConfig;
use crate::error::SessionError;
use crate::models::{RefreshResponse, RefreshTokenBody};
use crate::session::SessionManager;
use crate::token_store::TokenStore;

/// Resolves to the new access token, or `None` once the session has been torn down.
type RefreshFlight = Shared<BoxFuture<'static, Option<String>>>;

struct Inner {
    http: Client,
    config: ClientConfig,
    session: Arc<SessionManager>,
    in_flight: Mutex<Option<RefreshFlight>>,
}

/// Cheap to clone; clones share the session and the pending refresh.
#[derive(Clone)]
pub struct SessionClient {
    inner: Arc<Inner>,
}

impl SessionClient {
    pub fn new(config: ClientConfig, store: Arc<dyn TokenStore>) -> Result<Self, SessionError> {
        let http = Client::builder().timeout(config.timeout).build()?;

        Ok(Self {
            inner: Arc::new(Inner {
                http,
                config,
                session: Arc::new(SessionManager::new(store)),
                in_flight: Mutex::new(None),
            }),
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    pub fn session(&self) -> &SessionManager {
        &self.inner.session
    }

    pub fn url(&self, path: &str) -> String {
        self.inner.config.url(path)
    }

    /// Sends a request without the refresh path. Used by the auth endpoints themselves.
    pub async fn send_anonymous<F>(&self, build: F) -> Result<Response, SessionError>
    where
        F: Fn(&Client) -> RequestBuilder,
    {
        let response = build(&self.inner.http).send().await?;
        ensure_success(response).await
    }

    /// Sends a request with the current bearer token.
    ///
    /// `build` may run twice: a 401 triggers (or joins) a token refresh and
    /// the request is rebuilt and re-sent once with the new token.
    pub async fn send<F>(&self, build: F) -> Result<Response, SessionError>
    where
        F: Fn(&Client) -> RequestBuilder,
    {
        let sent_with = self.inner.session.access_token();
        let response = self.execute(&build, sent_with.as_deref()).await?;
        if response.status() != StatusCode::UNAUTHORIZED {
            return ensure_success(response).await;
        }

        let token = self.fresh_token(sent_with.as_deref()).await?;
        let retry = self.execute(&build, Some(&token)).await?;
        if retry.status() == StatusCode::UNAUTHORIZED {
            tracing::debug!("Request rejected after token refresh");
            return Err(SessionError::Unauthorized);
        }
        ensure_success(retry).await
    }

    async fn execute<F>(&self, build: &F, token: Option<&str>) -> Result<Response, SessionError>
    where
        F: Fn(&Client) -> RequestBuilder,
    {
        let mut request = build(&self.inner.http);
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }
        Ok(request.send().await?)
    }

    /// Returns an access token newer than `stale`, refreshing at most once for all callers.
    async fn fresh_token(&self, stale: Option<&str>) -> Result<String, SessionError> {
        let flight = {
            let mut slot = self.inner.in_flight.lock().await;

            // Another caller already replaced the token this request used
            if let Some(current) = self.inner.session.access_token() {
                if stale != Some(current.as_str()) {
                    return Ok(current);
                }
            }

            match slot.as_ref() {
                Some(flight) => flight.clone(),
                None => {
                    let flight = self.start_refresh();
                    *slot = Some(flight.clone());
                    flight
                }
            }
        };

        let outcome = flight.clone().await;

        {
            let mut slot = self.inner.in_flight.lock().await;
            if slot.as_ref().is_some_and(|current| current.ptr_eq(&flight)) {
                slot.take();
            }
        }

        outcome.ok_or(SessionError::SessionExpired)
    }

    fn start_refresh(&self) -> RefreshFlight {
        let http = self.inner.http.clone();
        let url = self.inner.config.url("/auth/refresh");
        let session = self.inner.session.clone();

        async move {
            session.begin_refresh();
            match request_refresh(&http, &url, &session).await {
                Ok(token) => {
                    tracing::debug!("Access token refreshed");
                    session.refreshed(token.clone());
                    Some(token)
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Token refresh failed, logging out");
                    session.clear().await;
                    None
                }
            }
        }
        .boxed()
        .shared()
    }
}

async fn request_refresh(
    http: &Client,
    url: &str,
    session: &SessionManager,
) -> Result<String, SessionError> {
    let refresh_token = session
        .refresh_token()
        .await?
        .ok_or(SessionError::SessionExpired)?;

    let response = http
        .post(url)
        .json(&RefreshTokenBody {
            refresh_token: &refresh_token,
        })
        .send()
        .await?;
    let response = ensure_success(response).await?;

    let body: RefreshResponse = response.json().await?;
    Ok(body.access_token)
}

async fn ensure_success(response: Response) -> Result<Response, SessionError> {
    if response.status().is_success() {
        Ok(response)
    } else {
        Err(SessionError::from_response(response).await)
    }
}
