// TSE middleware client.
//
// Owns the configuration and the cached bearer token, turns operation
// descriptors into HTTP round trips, and hosts the named admin operations.
// Every mutating method takes `&mut self`; one client is one session.

use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use secrecy::ExposeSecret;
use serde::Serialize;
use serde_json::{Value, json};
use tracing::debug;
use url::Url;
use uuid::Uuid;

use crate::auth::AuthToken;
use crate::config::{ClientConfig, ConfigPatch};
use crate::error::Error;
use crate::log::{self, Verbosity};
use crate::payload::{FromBody, Payload};
use crate::route::{ADMIN, ADMIN_AUTH, Operation, TSS, Verb};

const REDACTED_PARAMS: &[&str] = &["api_secret"];

/// Async client for the TSE middleware API.
pub struct TseClient {
    config: ClientConfig,
    http: Option<reqwest::Client>,
    custom_http: bool,
    token: Option<AuthToken>,
    headers: HeaderMap,
}

impl TseClient {
    // ── Constructors ─────────────────────────────────────────────────

    /// Build a client. The HTTP transport is created on the first request.
    pub fn new(config: ClientConfig) -> Self {
        let token = config.seed_token();
        Self {
            config,
            http: None,
            custom_http: false,
            token,
            headers: HeaderMap::new(),
        }
    }

    /// Wrap an existing `reqwest::Client` (caller manages TLS and timeouts).
    pub fn with_http(config: ClientConfig, http: reqwest::Client) -> Self {
        let mut client = Self::new(config);
        client.http = Some(http);
        client.custom_http = true;
        client
    }

    // ── Configuration ────────────────────────────────────────────────

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Overlay new settings. Seeded `token` + `token_expire_at` replace the
    /// cached token.
    pub fn set_config(&mut self, patch: ConfigPatch) {
        if patch.transport.is_some() && !self.custom_http {
            self.http = None;
        }
        let reseed = patch.token.is_some() || patch.token_expire_at.is_some();
        self.config.merge(patch);
        if reseed {
            if let Some(token) = self.config.seed_token() {
                self.token = Some(token);
            }
        }
    }

    /// Numeric log threshold: 0 = error, 1 = warning, 2 = info (clamped).
    pub fn set_log_level(&mut self, level: u8) {
        self.config.log_level = Verbosity::from_level(level);
    }

    pub fn check_config(&self) -> Result<(), Error> {
        self.config.check()
    }

    pub fn base_url(&self) -> Result<Url, Error> {
        self.config.normalized_base_url()
    }

    /// The cached token, alive or not.
    pub fn token(&self) -> Option<&AuthToken> {
        self.token.as_ref()
    }

    pub fn new_uuid() -> Uuid {
        Uuid::new_v4()
    }

    /// Add a header sent with every subsequent request.
    pub fn add_header(&mut self, name: &str, value: &str) -> Result<(), Error> {
        let header_name =
            HeaderName::from_bytes(name.as_bytes()).map_err(|e| Error::InvalidHeader {
                name: name.to_owned(),
                message: e.to_string(),
            })?;
        let header_value = HeaderValue::from_str(value).map_err(|e| Error::InvalidHeader {
            name: name.to_owned(),
            message: e.to_string(),
        })?;
        self.headers.insert(header_name, header_value);
        Ok(())
    }

    pub fn reset_headers(&mut self) {
        self.headers.clear();
    }

    // ── Authentication ───────────────────────────────────────────────

    /// Make sure a live token is cached, fetching one via `POST auth` when
    /// there is none, it has expired, or `force` is set.
    pub async fn ensure_auth(&mut self, force: bool) -> Result<&AuthToken, Error> {
        self.check_config()?;

        let held = self.token.as_ref().map(AuthToken::is_alive);
        if held == Some(true) && !force {
            self.log(
                Verbosity::Info,
                "TSE token",
                &json!({ "message": "Using the existing token" }),
            );
        } else {
            if held == Some(false) {
                self.log(
                    Verbosity::Warning,
                    "TSE token",
                    &json!({ "message": "Token expired" }),
                );
            }
            let body = json!({
                "api_key": self.config.api_key.as_ref().map(ExposeSecret::expose_secret),
                "api_secret": self.config.api_secret.as_ref().map(ExposeSecret::expose_secret),
            });
            let token: AuthToken = self.dispatch(&Operation::auth(), &body).await?;
            self.token = Some(token);
            self.log(
                Verbosity::Info,
                "TSE token",
                &json!({ "message": "New token created" }),
            );
        }

        Ok(&*self.token.get_or_insert_with(AuthToken::new))
    }

    // ── Dispatch ─────────────────────────────────────────────────────

    /// Dynamic call: `<verb>_<seg1>_<seg2>...[?query]`.
    ///
    /// `inject_uuid` appends a fresh v4 UUID as the last path segment.
    pub async fn call<B>(&mut self, name: &str, body: &B, inject_uuid: bool) -> Result<Payload, Error>
    where
        B: Serialize + Sync + ?Sized,
    {
        let op = Operation::parse(name)?.with_uuid(inject_uuid);
        self.send(&op, body).await
    }

    /// Send `op` with `body`, decoding the response as `R`.
    ///
    /// Validates configuration and ensures a live token first, except for the
    /// auth operation itself.
    pub async fn send<R, B>(&mut self, op: &Operation, body: &B) -> Result<R, Error>
    where
        R: FromBody,
        B: Serialize + Sync + ?Sized,
    {
        self.check_config()?;
        let body = serde_json::to_value(body)?;
        if !op.is_auth() {
            self.ensure_auth(false).await?;
        }
        self.dispatch(op, &body).await
    }

    /// One HTTP round trip. No auth refresh, no retries.
    async fn dispatch<R: FromBody>(&mut self, op: &Operation, body: &Value) -> Result<R, Error> {
        let base = self.base_url()?;
        let url = op.url(&base)?;
        let path = url.as_str().strip_prefix(base.as_str()).unwrap_or(url.as_str()).to_owned();

        self.log(
            Verbosity::Info,
            "TSS API",
            &json!({ "path": path, "params": log::redact(body, REDACTED_PARAMS) }),
        );
        debug!("{} {url}", op.verb());

        let headers = self.headers.clone();
        let mut request = self
            .http()?
            .request(op.verb().method(), url)
            .headers(headers)
            .header(CONTENT_TYPE, "application/json");
        if let Some(bearer) = self.token.as_ref().and_then(AuthToken::bearer) {
            let mut value = HeaderValue::from_str(&format!("Bearer {bearer}")).map_err(|e| {
                Error::InvalidHeader {
                    name: AUTHORIZATION.to_string(),
                    message: e.to_string(),
                }
            })?;
            value.set_sensitive(true);
            request = request.header(AUTHORIZATION, value);
        }
        request = match op.verb() {
            Verb::Get => request.query(&query_pairs(body)),
            _ if body.is_null() => request,
            _ => request.json(body),
        };

        let resp = request.send().await?;
        let status = resp.status();
        let text = resp.text().await?;
        if !status.is_success() {
            return Err(Error::HttpStatus {
                status: status.as_u16(),
                body: text,
            });
        }

        let result = R::from_response(status.as_u16(), &text)?;
        self.log(Verbosity::Info, "TSS API Results", &result.summary());
        Ok(result)
    }

    fn http(&mut self) -> Result<&reqwest::Client, Error> {
        if self.http.is_none() {
            self.http = Some(self.config.transport.build_client()?);
        }
        self.http.as_ref().ok_or_else(|| Error::Tls("HTTP client unavailable".into()))
    }

    pub(crate) fn log(&self, level: Verbosity, label: &str, context: &Value) {
        log::emit(self.config.log_level, level, label, context);
    }

    // ── Admin operations ─────────────────────────────────────────────

    /// `PATCH tss/<id>/admin` with `{admin_puk, new_admin_pin}`.
    pub async fn change_admin_pin(
        &mut self,
        tss_id: &str,
        admin_puk: &str,
        new_admin_pin: &str,
    ) -> Result<Payload, Error> {
        let op = Operation::patch().segment(TSS).segment(tss_id).segment(ADMIN);
        let params = json!({ "admin_puk": admin_puk, "new_admin_pin": new_admin_pin });
        let result = self.send(&op, &params).await?;
        self.log(
            Verbosity::Info,
            "Change admin pin",
            &json!({ "message": "Admin pin has been changed", "tss_id": tss_id, "params": params }),
        );
        Ok(result)
    }

    /// `POST tss/<id>/admin_auth` with `{admin_pin}`.
    pub async fn admin_auth(&mut self, tss_id: &str, admin_pin: &str) -> Result<Payload, Error> {
        let op = Operation::post().segment(TSS).segment(tss_id).segment(ADMIN_AUTH);
        let params = json!({ "admin_pin": admin_pin });
        let result = self.send(&op, &params).await?;
        self.log(
            Verbosity::Info,
            "Admin auth",
            &json!({ "tss_id": tss_id, "params": params }),
        );
        Ok(result)
    }
}

/// Flatten an object body into query parameters for GET requests.
fn query_pairs(body: &Value) -> Vec<(String, String)> {
    match body {
        Value::Object(map) => map
            .iter()
            .filter(|(_, v)| !v.is_null())
            .map(|(k, v)| {
                let v = match v {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                (k.clone(), v)
            })
            .collect(),
        _ => Vec::new(),
    }
}
