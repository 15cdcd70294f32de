use std::sync::Arc;
use std::time::Duration;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use reqwest::cookie::{CookieStore, Jar};
use reqwest::redirect::Policy;
use reqwest::Url;
use serde::Deserialize;

pub mod api;
mod error;

pub use error::LinkyError;

use api::series::RawPayload;
use api::{DateRange, FormatToApiFmt, Granularity};

const LOGIN_URL: &str = "https://espace-client-connexion.enedis.fr/auth/UI/Login";
const DATA_URL: &str =
    "https://espace-client-particuliers.enedis.fr/group/espace-particuliers/suivi-de-consommation";

/// Liferay portlet carrying the consumption charts.
const REQ_PART: &str = "lincspartdisplaycdc_WAR_lincspartcdcportlet";

/// Session cookie the login endpoint must set for the login to count.
const SESSION_COOKIE: &str = "iPlanetDirectoryPro";

/// The transport seam the data modules consume.
///
/// Returns the raw series payload for one granularity, or `None` when the
/// portal has no data yet for the window (a normal condition, not an error).
pub trait PortalClient {
    fn fetch_raw(
        &self,
        granularity: Granularity,
        range: Option<&DateRange>,
    ) -> Result<Option<RawPayload>, LinkyError>;
}

/// JSON envelope wrapping every data response.
#[derive(Deserialize, Debug)]
struct Envelope {
    #[serde(rename = "etat", default)]
    status: Option<EnvelopeStatus>,
    #[serde(rename = "graphe", default)]
    data: Option<RawPayload>,
}

#[derive(Deserialize, Debug)]
struct EnvelopeStatus {
    #[serde(rename = "valeur", default)]
    value: Option<String>,
}

/// Cookie-session client for the Enedis consumption portal.
///
/// One instance owns one session (its cookie jar); it is never shared
/// process-wide, so several independent accounts can coexist in one process.
/// All requests are blocking, with an optional per-attempt timeout.
pub struct LinkyApi {
    username: String,
    password: String,
    login_url: String,
    data_url: String,
    timeout: Option<Duration>,

    // Owns the session cookie jar through its cookie provider
    session: Option<reqwest::blocking::Client>,
}

impl LinkyApi {
    pub fn new(username: String, password: String) -> Self {
        LinkyApi {
            username,
            password,
            login_url: LOGIN_URL.to_string(),
            data_url: DATA_URL.to_string(),
            timeout: None,
            session: None,
        }
    }

    pub fn from_env_values() -> Self {
        let username = std::env::var("LINKY_USERNAME").expect("LINKY_USERNAME must be set");
        let password = std::env::var("LINKY_PASSWORD").expect("LINKY_PASSWORD must be set");

        LinkyApi::new(username, password)
    }

    pub fn with_login_url(mut self, login_url: String) -> Self {
        self.login_url = login_url;
        self
    }

    pub fn with_data_url(mut self, data_url: String) -> Self {
        self.data_url = data_url;
        self
    }

    /// Bounds every HTTP attempt; retries are bounded separately.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Opens a session by posting the login form.
    ///
    /// The portal answers the form post with a redirect whether or not the
    /// credentials are valid; the session cookie in the jar is the only
    /// reliable success signal.
    pub fn login(&mut self) -> Result<(), LinkyError> {
        let jar = Arc::new(Jar::default());

        let mut builder = reqwest::blocking::Client::builder()
            .cookie_provider(Arc::clone(&jar))
            .redirect(Policy::none());
        if let Some(timeout) = self.timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder
            .build()
            .map_err(|e| LinkyError::fetch(format!("could not build http client: {}", e)))?;

        let realm = BASE64.encode(b"realm=particuliers");
        let form = [
            ("IDToken1", self.username.as_str()),
            ("IDToken2", self.password.as_str()),
            ("SunQueryParamsString", realm.as_str()),
            ("encoded", "true"),
            ("gx_charset", "UTF-8"),
        ];

        http.post(&self.login_url)
            .form(&form)
            .send()
            .map_err(|e| LinkyError::Auth(format!("could not submit login form: {}", e)))?;

        let login_url = Url::parse(&self.login_url)
            .map_err(|e| LinkyError::Auth(format!("bad login url: {}", e)))?;
        let has_session_cookie = jar
            .cookies(&login_url)
            .and_then(|header| header.to_str().map(|s| s.contains(SESSION_COOKIE)).ok())
            .unwrap_or(false);

        if !has_session_cookie {
            tracing::warn!("login rejected, no session cookie set");
            return Err(LinkyError::Auth(
                "login rejected, check your username/password".to_string(),
            ));
        }

        tracing::debug!("session opened");
        self.session = Some(http);
        Ok(())
    }

    pub fn close_session(&mut self) {
        self.session = None;
    }
}

impl PortalClient for LinkyApi {
    fn fetch_raw(
        &self,
        granularity: Granularity,
        range: Option<&DateRange>,
    ) -> Result<Option<RawPayload>, LinkyError> {
        let http = self
            .session
            .as_ref()
            .ok_or_else(|| LinkyError::Auth("no session, call login() first".to_string()))?;

        let resource_id = granularity.to_string();
        let params = [
            ("p_p_id", REQ_PART),
            ("p_p_lifecycle", "2"),
            ("p_p_state", "normal"),
            ("p_p_mode", "view"),
            ("p_p_resource_id", &resource_id),
            ("p_p_cacheability", "cacheLevelPage"),
            ("p_p_col_id", "column-1"),
            ("p_p_col_pos", "1"),
            ("p_p_col_count", "3"),
        ];

        let mut form: Vec<(String, String)> = vec![];
        if let Some(range) = range {
            form.push((
                format!("_{}_dateDebut", REQ_PART),
                range.start.to_api_format(),
            ));
            form.push((format!("_{}_dateFin", REQ_PART), range.end.to_api_format()));
        }

        let send = || {
            http.post(&self.data_url)
                .query(&params)
                .form(&form)
                .send()
                .map_err(|e| LinkyError::fetch(format!("{}: {}", resource_id, e)))
        };

        let mut response = send()?;
        if response.status().is_redirection() {
            // Session refresh redirect; one retry, then give up
            tracing::debug!(status = %response.status(), %resource_id, "redirected, retrying once");
            response = send()?;
        }
        if response.status().is_redirection() {
            return Err(LinkyError::fetch(format!(
                "{}: still redirected after retry",
                resource_id
            )));
        }

        let body = response
            .text()
            .map_err(|e| LinkyError::fetch(format!("{}: {}", resource_id, e)))?;
        let envelope: Envelope = serde_json::from_str(&body)
            .map_err(|e| LinkyError::fetch(format!("{}: malformed response: {}", resource_id, e)))?;

        if let Some(status) = &envelope.status {
            if status.value.as_deref() == Some("erreur") {
                tracing::warn!(%resource_id, "provider signaled an error status");
                return Err(LinkyError::fetch(format!(
                    "{}: provider signaled an error",
                    resource_id
                )));
            }
        }

        Ok(envelope.data)
    }
}
