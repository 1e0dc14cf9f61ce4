//! The calls the portfolio pages make, one method per endpoint.

use std::sync::Arc;

use reqwest::multipart::{Form, Part};
use tokio::sync::watch;
use uuid::Uuid;

use crate::client::SessionClient;
use crate::config::ClientConfig;
use crate::error::SessionError;
use crate::models::{
    AuthSession, Credentials, LoginOutcome, NewProject, Project, ProjectChanges, ProjectPage,
    RefreshTokenBody, UploadFile, UploadResult, VerifyTwoFactorBody,
};
use crate::session::SessionState;
use crate::token_store::TokenStore;

#[derive(Clone)]
pub struct PortfolioApi {
    client: SessionClient,
}

impl PortfolioApi {
    pub fn new(config: ClientConfig, store: Arc<dyn TokenStore>) -> Result<Self, SessionError> {
        Ok(Self {
            client: SessionClient::new(config, store)?,
        })
    }

    pub fn client(&self) -> &SessionClient {
        &self.client
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.client.session().subscribe()
    }

    pub fn is_authenticated(&self) -> bool {
        self.client.session().is_authenticated()
    }

    async fn start_session(&self, session: &AuthSession) -> Result<(), SessionError> {
        self.client
            .session()
            .establish(session.access_token.clone(), &session.refresh_token)
            .await
    }

    // Auth

    pub async fn login(&self, username: &str, password: &str) -> Result<LoginOutcome, SessionError> {
        let url = self.client.url("/auth/login");
        let outcome: LoginOutcome = self
            .client
            .send_anonymous(|http| http.post(&url).json(&Credentials { username, password }))
            .await?
            .json()
            .await?;

        if let LoginOutcome::Authenticated(session) = &outcome {
            self.start_session(session).await?;
        }
        Ok(outcome)
    }

    pub async fn verify_2fa(&self, user_id: &str, code: &str) -> Result<AuthSession, SessionError> {
        let url = self.client.url("/auth/verify-2fa");
        let session: AuthSession = self
            .client
            .send_anonymous(|http| http.post(&url).json(&VerifyTwoFactorBody { user_id, code }))
            .await?
            .json()
            .await?;

        self.start_session(&session).await?;
        Ok(session)
    }

    pub async fn register(&self, username: &str, password: &str) -> Result<AuthSession, SessionError> {
        let url = self.client.url("/auth/register");
        let session: AuthSession = self
            .client
            .send_anonymous(|http| http.post(&url).json(&Credentials { username, password }))
            .await?
            .json()
            .await?;

        self.start_session(&session).await?;
        Ok(session)
    }

    /// Revokes the refresh token server-side when possible, then clears local state.
    pub async fn logout(&self) {
        let session = self.client.session();
        match session.refresh_token().await {
            Ok(Some(refresh_token)) => {
                let url = self.client.url("/auth/logout");
                let result = self
                    .client
                    .send_anonymous(|http| {
                        http.post(&url).json(&RefreshTokenBody {
                            refresh_token: &refresh_token,
                        })
                    })
                    .await;
                if let Err(e) = result {
                    tracing::warn!(error = %e, "Server-side logout failed");
                }
            }
            Ok(None) => {}
            Err(e) => tracing::warn!(error = %e, "Failed to read stored refresh token"),
        }

        session.clear().await;
    }

    // Projects

    pub async fn projects(&self, page: i64, limit: i64) -> Result<ProjectPage, SessionError> {
        let url = self.client.url("/projects");
        Ok(self
            .client
            .send(|http| http.get(&url).query(&[("page", page), ("limit", limit)]))
            .await?
            .json()
            .await?)
    }

    pub async fn project(&self, id: Uuid) -> Result<Project, SessionError> {
        let url = self.client.url(&format!("/projects/{}", id));
        Ok(self.client.send(|http| http.get(&url)).await?.json().await?)
    }

    pub async fn create_project(&self, project: &NewProject) -> Result<Project, SessionError> {
        let url = self.client.url("/projects");
        Ok(self
            .client
            .send(|http| http.post(&url).json(project))
            .await?
            .json()
            .await?)
    }

    pub async fn update_project(
        &self,
        id: Uuid,
        changes: &ProjectChanges,
    ) -> Result<Project, SessionError> {
        let url = self.client.url(&format!("/projects/{}", id));
        Ok(self
            .client
            .send(|http| http.put(&url).json(changes))
            .await?
            .json()
            .await?)
    }

    pub async fn delete_project(&self, id: Uuid) -> Result<(), SessionError> {
        let url = self.client.url(&format!("/projects/{}", id));
        self.client.send(|http| http.delete(&url)).await?;
        Ok(())
    }

    // Files

    pub async fn upload_files(
        &self,
        project_id: Uuid,
        files: &[UploadFile],
    ) -> Result<UploadResult, SessionError> {
        let url = self.client.url("/files/upload");
        let build = |http: &reqwest::Client| {
            let mut form = Form::new().text("projectId", project_id.to_string());
            for file in files {
                let part = Part::bytes(file.bytes.clone()).file_name(file.filename.clone());
                // An unparseable MIME type falls back to reqwest's default for the part
                let part = match part.mime_str(&file.mimetype) {
                    Ok(part) => part,
                    Err(_) => Part::bytes(file.bytes.clone()).file_name(file.filename.clone()),
                };
                form = form.part("files", part);
            }
            http.post(&url).multipart(form)
        };

        Ok(self.client.send(build).await?.json().await?)
    }

    /// Inline view URL for a stored file.
    pub fn file_url(&self, id: Uuid) -> String {
        self.client.url(&format!("/files/{}", id))
    }

    pub fn download_url(&self, id: Uuid) -> String {
        self.client.url(&format!("/files/{}/download", id))
    }

    pub async fn delete_file(&self, id: Uuid) -> Result<(), SessionError> {
        let url = self.client.url(&format!("/files/{}", id));
        self.client.send(|http| http.delete(&url)).await?;
        Ok(())
    }
}
