//! The session client through which all API operations are issued.

use std::{env, time::Duration};

use anyhow::{ensure, Context};
use log::{debug, trace};
use reqwest::Method;
use serde::Serialize;
use serde_json::Value;
use url::Url;

use crate::{
    error::Error,
    response,
    transport::{self, HttpTransport, RawResponse, Request, Transport, TransportSettings},
};

/// Entry point segment of the JSON API, appended to every base URL.
const API_SUFFIX: &str = "/json/";

pub struct ClientBuilder {
    base_url: String,
    cookie: String,
    settings: TransportSettings,
    transport: Option<Box<dyn Transport>>,
}

impl ClientBuilder {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.to_string(),
            cookie: String::new(),
            settings: TransportSettings::default(),
            transport: None,
        }
    }

    /// Builds a client for the server named by `ADMIN_API_URL`.
    pub fn from_env() -> anyhow::Result<Self> {
        let base_url = env::var("ADMIN_API_URL")?;
        let accept_invalid_certs = env::var_os("ADMIN_API_SELF_SIGNED").is_some();
        debug!("Building client for {base_url} from env");
        Ok(Self::new(&base_url).danger_accept_invalid_certs(accept_invalid_certs))
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.settings.connect_timeout = timeout;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.settings.timeout = timeout;
        self
    }

    pub fn max_redirects(mut self, limit: usize) -> Self {
        self.settings.max_redirects = limit;
        self
    }

    pub fn danger_accept_invalid_certs(mut self, accept: bool) -> Self {
        self.settings.accept_invalid_certs = accept;
        self
    }

    /// Resume a previously captured session instead of starting with
    /// [`Client::login`].
    pub fn cookie(mut self, cookie: &str) -> Self {
        self.cookie = cookie.to_string();
        self
    }

    /// Substitute the HTTP transport, e.g. with a test double.
    pub fn with_transport(mut self, transport: impl Transport + 'static) -> Self {
        self.transport = Some(Box::new(transport));
        self
    }

    pub fn build(self) -> anyhow::Result<Client> {
        ensure!(
            transport::is_initialized(),
            "global_init must be called before the first client is built"
        );
        let Self {
            base_url,
            cookie,
            settings,
            transport,
        } = self;
        Url::parse(&base_url).with_context(|| format!("Invalid base URL {base_url}"))?;
        let transport: Box<dyn Transport> = match transport {
            Some(transport) => transport,
            None => Box::new(HttpTransport::new(settings)?),
        };
        Ok(Client {
            base_url: format!("{}{API_SUFFIX}", base_url.trim_end_matches('/')),
            cookie,
            last_error: String::new(),
            is_error: false,
            transport,
        })
    }
}

/// The main client through which the JSON admin API is used.
///
/// Every call records its outcome on the instance: [`Client::succeeded`] and
/// [`Client::last_error`] reflect the most recent call only, while the
/// session cookie persists until [`Client::logout`].
pub struct Client {
    base_url: String,
    cookie: String,
    last_error: String,
    is_error: bool,
    transport: Box<dyn Transport>,
}

enum Payload {
    Json(String),
    Form(String),
}

fn form_encode<T: Serialize>(data: &T) -> String {
    serde_urlencoded::to_string(data).expect("payloads must encode as flat key-value pairs")
}

impl Client {
    pub fn builder(base_url: &str) -> ClientBuilder {
        ClientBuilder::new(base_url)
    }

    /// True if the most recent API call succeeded.
    pub fn succeeded(&self) -> bool {
        !self.is_error
    }

    /// The error message of the most recent call; empty after a success.
    pub fn last_error(&self) -> &str {
        &self.last_error
    }

    /// The session cookie captured at login; empty when logged out.
    pub fn cookie(&self) -> &str {
        &self.cookie
    }

    /// Logs in to the API.
    ///
    /// On success the `Set-Cookie` values of the response become the session
    /// cookie sent on every subsequent request.
    pub fn login(&mut self, username: &str, password: &str) -> bool {
        let form = [("user", username), ("password", password)];
        let Ok(raw) = self.request(Method::POST, "login", Some(Payload::Form(form_encode(&form))))
        else {
            return false;
        };
        for value in response::set_cookie_values(&raw.headers) {
            if !self.cookie.is_empty() {
                self.cookie.push_str("; ");
            }
            self.cookie.push_str(value);
        }
        true
    }

    /// Logs out of the API and releases the session cookie.
    ///
    /// The cookie is cleared even when the logout request itself fails.
    pub fn logout(&mut self) {
        let _ = self.request(Method::GET, "logout", None);
        self.cookie.clear();
    }

    /// Does a GET request against the API server.
    pub fn do_get(&mut self, rel_url: &str) -> Result<Option<Value>, Error> {
        let raw = self.request(Method::GET, rel_url, None)?;
        self.decode(&raw)
    }

    /// Does a GET request with `params` appended as a query string.
    pub fn do_get_params<T: Serialize>(
        &mut self,
        rel_url: &str,
        params: &T,
    ) -> Result<Option<Value>, Error> {
        let query = form_encode(params);
        let rel_url = if query.is_empty() {
            rel_url.to_string()
        } else {
            format!("{rel_url}?{query}")
        };
        let raw = self.request(Method::GET, &rel_url, None)?;
        self.decode(&raw)
    }

    /// Does a PUT request; `data` is sent JSON encoded.
    pub fn do_put<T: Serialize>(
        &mut self,
        rel_url: &str,
        data: &T,
    ) -> Result<Option<Value>, Error> {
        let encoded = serde_json::to_string(data).expect("PUT payloads must serialize to JSON");
        let raw = self.request(Method::PUT, rel_url, Some(Payload::Json(encoded)))?;
        self.decode(&raw)
    }

    /// Does a POST request; `data` is sent form encoded, not JSON.
    pub fn do_post<T: Serialize>(
        &mut self,
        rel_url: &str,
        data: &T,
    ) -> Result<Option<Value>, Error> {
        let raw = self.request(Method::POST, rel_url, Some(Payload::Form(form_encode(data))))?;
        self.decode(&raw)
    }

    /// Does a DELETE request. DELETE responses are never decoded.
    pub fn do_delete(&mut self, rel_url: &str) -> Result<(), Error> {
        self.request(Method::DELETE, rel_url, None).map(|_| ())
    }

    /// One round trip: resets the per-call state, performs the request, and
    /// classifies the response.
    fn request(
        &mut self,
        method: Method,
        rel_url: &str,
        payload: Option<Payload>,
    ) -> Result<RawResponse, Error> {
        self.is_error = false;
        self.last_error.clear();

        let url = format!("{}{}", self.base_url, rel_url.trim_start_matches('/'));
        let mut headers = vec![("Accept".to_string(), "application/json".to_string())];
        if !self.cookie.is_empty() {
            headers.push(("Cookie".to_string(), self.cookie.clone()));
        }
        let body = payload.map(|payload| match payload {
            Payload::Json(encoded) => {
                headers.push(("Content-Type".to_string(), "application/json".to_string()));
                headers.push(("Content-Length".to_string(), encoded.len().to_string()));
                encoded
            }
            Payload::Form(encoded) => {
                headers.push((
                    "Content-Type".to_string(),
                    "application/x-www-form-urlencoded".to_string(),
                ));
                encoded
            }
        });

        debug!("Sending {method} {url}");
        let raw = match self.transport.perform(Request {
            method,
            url,
            headers,
            body,
        }) {
            Ok(raw) => raw,
            Err(e) => return Err(self.fail(Error::Transport(format!("{e:#}")))),
        };
        trace!("Received {}: {}", raw.status_code, raw.body);

        if let Err(e) = response::classify(&raw) {
            return Err(self.fail(e));
        }
        Ok(raw)
    }

    fn decode(&mut self, raw: &RawResponse) -> Result<Option<Value>, Error> {
        response::decode_body(raw).map_err(|e| self.fail(e))
    }

    fn fail(&mut self, error: Error) -> Error {
        self.is_error = true;
        self.last_error = error.to_string();
        error
    }
}
