//! OAuth 2.0 authentication flow implementation for the Google Sheets API.
//!
//! This module handles the complete OAuth workflow including:
//! - Loading OAuth credentials from client_secret.json
//! - Managing access and refresh tokens in token.json
//! - Running the OAuth consent flow with a local callback server
//! - Refreshing the access token when it is about to expire

use crate::api::files::{File, SecretFile, TokenFile};
use crate::api::OAUTH_SCOPES;
use crate::error::Res;
use anyhow::{bail, Context};
use chrono::{DateTime, Utc};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use oauth2::basic::{BasicClient, BasicTokenResponse};
use oauth2::{
    AuthUrl, AuthorizationCode, ClientId, ClientSecret, CsrfToken, EndpointNotSet, EndpointSet,
    PkceCodeChallenge, RedirectUrl, RefreshToken, Scope, TokenResponse, TokenUrl,
};
use std::convert::Infallible;
use std::path::Path;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

const OAUTH_CALLBACK_PORT: u16 = 3030;

/// How long we wait for the user to finish the consent flow in their browser.
const CONSENT_TIMEOUT: Duration = Duration::from_secs(300);

/// The lifetime we assume when Google does not tell us when the access token expires.
const DEFAULT_TOKEN_LIFETIME: Duration = Duration::from_secs(3600);

type OAuthClient =
    BasicClient<EndpointSet, EndpointNotSet, EndpointNotSet, EndpointNotSet, EndpointSet>;

/// Holds the OAuth client credentials and the cached token, and hands out valid access tokens.
#[derive(Debug)]
pub(crate) struct TokenProvider {
    secret: SecretFile,
    token: File<TokenFile>,
    http: reqwest::Client,
}

impl TokenProvider {
    /// Runs the complete OAuth consent flow and saves the resulting token to `token_path`.
    ///
    /// This function:
    /// 1. Loads OAuth credentials from client_secret.json
    /// 2. Starts a local HTTP server on localhost:3030
    /// 3. Prints the Google consent URL for the user to open
    /// 4. Waits for the OAuth callback with the authorization code
    /// 5. Exchanges the code for access and refresh tokens
    /// 6. Saves tokens to token.json
    pub(crate) async fn initialize(client_secret_path: &Path, token_path: &Path) -> Res<Self> {
        info!("Starting OAuth consent flow");
        let secret = SecretFile::load(client_secret_path).await?;
        let http = http_client()?;
        let client = oauth_client(&secret)?;

        let (pkce_challenge, pkce_verifier) = PkceCodeChallenge::new_random_sha256();
        let (auth_url, csrf_token) = client
            .authorize_url(CsrfToken::new_random)
            .add_scopes(OAUTH_SCOPES.iter().map(|s| Scope::new(s.to_string())))
            .add_extra_param("access_type", "offline")
            .add_extra_param("prompt", "consent")
            .set_pkce_challenge(pkce_challenge)
            .url();

        let listener = TcpListener::bind(("127.0.0.1", OAUTH_CALLBACK_PORT))
            .await
            .with_context(|| format!("Unable to listen on port {OAUTH_CALLBACK_PORT}"))?;
        info!("Open the following link in your browser to authorize access to Google Sheets:");
        info!("{auth_url}");
        info!("Waiting for the callback on {}", secret.redirect_uri(OAUTH_CALLBACK_PORT));

        let callback = tokio::time::timeout(CONSENT_TIMEOUT, wait_for_callback(listener))
            .await
            .context("Timed out waiting for the OAuth callback")??;
        if callback.state != *csrf_token.secret() {
            bail!("The OAuth callback state did not match, refusing to continue");
        }

        let response = client
            .exchange_code(AuthorizationCode::new(callback.code))
            .set_pkce_verifier(pkce_verifier)
            .request_async(&http)
            .await
            .context("Failed to exchange the authorization code for a token")?;

        let refresh_token = response
            .refresh_token()
            .map(|t| t.secret().to_string())
            .context("Google did not return a refresh token")?;
        let token = TokenFile::new(
            granted_scopes(&response),
            response.access_token().secret().to_string(),
            refresh_token,
            expires_at(response.expires_in()),
        );
        token.validate_scopes()?;
        let token = File::new(token_path, token);
        token.save().await?;
        info!("Authorization successful, token saved to {}", token_path.display());

        Ok(Self {
            secret,
            token,
            http,
        })
    }

    /// Loads the client secret and a previously saved token. Never opens a browser.
    pub(crate) async fn load(client_secret_path: &Path, token_path: &Path) -> Res<Self> {
        let secret = SecretFile::load(client_secret_path).await?;
        let token: File<TokenFile> = File::load(token_path)
            .await
            .context("Unable to load the OAuth token file")?;
        token.data().validate_scopes()?;
        debug!(
            "Loaded OAuth token from {}, expires at {}",
            token.path().display(),
            token.data().expires_at()
        );
        Ok(Self {
            secret,
            token,
            http: http_client()?,
        })
    }

    /// The current access token, which may be expired.
    pub(crate) fn token(&self) -> &str {
        self.token.data().access_token()
    }

    /// Returns an access token that is valid for at least a few more minutes, refreshing it first
    /// if needed.
    pub(crate) async fn token_with_refresh(&mut self) -> Res<&str> {
        if self.token.data().is_expired() {
            self.refresh().await?;
        }
        Ok(self.token())
    }

    /// Uses the refresh token to get a new access token and saves it.
    pub(crate) async fn refresh(&mut self) -> Res<()> {
        debug!("Refreshing the OAuth access token");
        let client = oauth_client(&self.secret)?;
        let refresh_token = RefreshToken::new(self.token.data().refresh_token().to_string());
        let response = client
            .exchange_refresh_token(&refresh_token)
            .request_async(&self.http)
            .await
            .context("Failed to refresh the OAuth token")?;

        self.token.data_mut().update(
            response.access_token().secret().to_string(),
            expires_at(response.expires_in()),
            response.refresh_token().map(|t| t.secret().to_string()),
        );
        self.token.save().await?;
        debug!("Token valid until {}", self.token.data().expires_at());
        Ok(())
    }
}

fn oauth_client(secret: &SecretFile) -> Res<OAuthClient> {
    Ok(
        BasicClient::new(ClientId::new(secret.client_id().to_string()))
            .set_client_secret(ClientSecret::new(secret.client_secret().to_string()))
            .set_auth_uri(
                AuthUrl::new(secret.auth_uri().to_string()).context("Invalid auth_uri")?,
            )
            .set_token_uri(
                TokenUrl::new(secret.token_uri().to_string()).context("Invalid token_uri")?,
            )
            .set_redirect_uri(
                RedirectUrl::new(secret.redirect_uri(OAUTH_CALLBACK_PORT))
                    .context("Invalid redirect URI")?,
            ),
    )
}

/// The token endpoint must not follow redirects.
fn http_client() -> Res<reqwest::Client> {
    reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .context("Unable to build the OAuth HTTP client")
}

fn granted_scopes(response: &BasicTokenResponse) -> Vec<String> {
    match response.scopes() {
        Some(scopes) => scopes.iter().map(|s| s.as_str().to_string()).collect(),
        None => OAUTH_SCOPES.iter().map(|s| s.to_string()).collect(),
    }
}

fn expires_at(expires_in: Option<Duration>) -> DateTime<Utc> {
    let lifetime = expires_in.unwrap_or(DEFAULT_TOKEN_LIFETIME);
    Utc::now() + chrono::Duration::from_std(lifetime).unwrap_or(chrono::Duration::hours(1))
}

/// The query parameters Google sends to the redirect URI.
#[derive(Debug, Clone, Eq, PartialEq)]
struct Callback {
    code: String,
    state: String,
}

impl Callback {
    fn from_query(query: &str) -> Option<Self> {
        let mut code = None;
        let mut state = None;
        for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
            match key.as_ref() {
                "code" => code = Some(value.into_owned()),
                "state" => state = Some(value.into_owned()),
                _ => {}
            }
        }
        Some(Self {
            code: code?,
            state: state?,
        })
    }
}

/// Serves the redirect URI until a request carrying `code` and `state` arrives.
async fn wait_for_callback(listener: TcpListener) -> Res<Callback> {
    let (tx, mut rx) = mpsc::channel::<Callback>(1);
    loop {
        tokio::select! {
            Some(callback) = rx.recv() => return Ok(callback),
            accepted = listener.accept() => {
                let (stream, _) = accepted.context("Failed to accept the OAuth callback")?;
                let tx = tx.clone();
                tokio::spawn(async move {
                    let service = service_fn(move |req| {
                        let tx = tx.clone();
                        async move { Ok::<_, Infallible>(on_callback(req, tx).await) }
                    });
                    if let Err(e) = http1::Builder::new()
                        .serve_connection(TokioIo::new(stream), service)
                        .await
                    {
                        warn!("OAuth callback connection error: {e}");
                    }
                });
            }
        }
    }
}

async fn on_callback(req: Request<Incoming>, tx: mpsc::Sender<Callback>) -> Response<String> {
    match req.uri().query().and_then(Callback::from_query) {
        Some(callback) => {
            let _ = tx.send(callback).await;
            Response::new("Authorization received. You may close this window.".to_string())
        }
        None => {
            let mut response = Response::new("Missing code or state.".to_string());
            *response.status_mut() = StatusCode::BAD_REQUEST;
            response
        }
    }
}
