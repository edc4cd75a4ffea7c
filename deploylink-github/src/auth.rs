//! GitHub App installation auth: sign a short-lived RS256 JWT with the app
//! key, then trade it for an installation access token.
use chrono::Utc;
use deploylink_http::{HttpClient, RequestOpts};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde::Serialize;

use crate::credentials::Credentials;
use crate::error::GithubError;
use crate::types::InstallationToken;

// GitHub rejects app JWTs living longer than ten minutes; backdate `iat`
// to absorb clock drift on the runner.
const JWT_BACKDATE_SECS: i64 = 60;
const JWT_LIFETIME_SECS: i64 = 9 * 60;

#[derive(Debug, Serialize)]
struct AppClaims {
    iat: i64,
    exp: i64,
    iss: String,
}

pub struct AppAuth {
    app_id: u64,
    installation_id: String,
    key: EncodingKey,
}

impl AppAuth {
    /// Build from loaded credentials; any `None` becomes
    /// [`GithubError::MissingCredential`].
    pub fn from_credentials(creds: &Credentials) -> Result<Self, GithubError> {
        let app_id = creds.app_id.ok_or(GithubError::MissingCredential("app-id"))?;
        let installation_id = creds
            .installation_id
            .clone()
            .filter(|id| !id.is_empty())
            .ok_or(GithubError::MissingCredential("installation-id"))?;
        let pem = creds
            .private_key
            .as_deref()
            .ok_or(GithubError::MissingCredential("private key (*.pem)"))?;
        let key = EncodingKey::from_rsa_pem(pem.as_bytes())?;
        Ok(Self {
            app_id,
            installation_id,
            key,
        })
    }

    pub fn app_id(&self) -> u64 {
        self.app_id
    }

    pub fn installation_id(&self) -> &str {
        &self.installation_id
    }

    /// App-level JWT, valid for a few minutes.
    pub fn app_jwt(&self) -> Result<String, GithubError> {
        let now = Utc::now().timestamp();
        let claims = AppClaims {
            iat: now - JWT_BACKDATE_SECS,
            exp: now + JWT_LIFETIME_SECS,
            iss: self.app_id.to_string(),
        };
        Ok(jsonwebtoken::encode(
            &Header::new(Algorithm::RS256),
            &claims,
            &self.key,
        )?)
    }

    /// `POST app/installations/{id}/access_tokens`
    pub async fn installation_token(
        &self,
        http: &HttpClient,
    ) -> Result<InstallationToken, GithubError> {
        let jwt = self.app_jwt()?;
        let path = format!("app/installations/{}/access_tokens", self.installation_id);
        let token: InstallationToken = http
            .post_json(
                &path,
                &serde_json::json!({}),
                RequestOpts {
                    bearer: Some(&jwt),
                    ..Default::default()
                },
            )
            .await?;
        tracing::debug!(
            app_id = self.app_id,
            installation_id = %self.installation_id,
            expires_at = ?token.expires_at,
            "github.installation_token.issued"
        );
        Ok(token)
    }
}
