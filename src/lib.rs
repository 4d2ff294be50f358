// Copyright © 2014, Peter Atashian

use cookie::time::OffsetDateTime;
use cookie::{Cookie, CookieJar};
use reqwest::blocking::{Client, Response};
use reqwest::header::{COOKIE, SET_COOKIE, USER_AGENT};
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::cell::RefCell;
use std::fmt;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

pub mod allpages;
pub mod export;
pub mod logging;
pub mod raw;

pub use allpages::{Allpages, PageList};
pub use export::{ExportSummary, Exporter, Scrubber};
pub use raw::RawPage;

pub const DEFAULT_USERAGENT: &str = concat!("mwexport/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("{url} returned {status}")]
    Status { url: Url, status: StatusCode },
    #[error("unexpected response shape from {what}: {detail}")]
    UnexpectedResponse { what: &'static str, detail: String },
    #[error("invalid url: {0}")]
    Url(#[from] url::ParseError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("bad title pattern: {0}")]
    Regex(#[from] regex::Error),
}

/// Connection settings for a wiki. Requests always go over plain `http://`.
#[derive(Clone)]
pub struct Config {
    pub host: String,
    pub username: String,
    pub password: String,
    pub useragent: String,
    /// `None` lets a stalled request block forever.
    pub timeout: Option<Duration>,
}
impl Config {
    pub fn new(
        host: impl Into<String>, username: impl Into<String>, password: impl Into<String>,
    ) -> Config {
        Config {
            host: host.into(),
            username: username.into(),
            password: password.into(),
            useragent: DEFAULT_USERAGENT.to_owned(),
            timeout: None,
        }
    }
    pub fn api_url(&self) -> Result<Url, Error> {
        Ok(Url::parse(&format!("http://{}/api.php", self.host))?)
    }
    pub fn index_url(&self) -> Result<Url, Error> {
        Ok(Url::parse(&format!("http://{}/index.php", self.host))?)
    }
}
impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Config")
            .field("host", &self.host)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("useragent", &self.useragent)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Decodes the first line of a JSON body. Anything that does not match `T` is
/// reported as an unexpected response from `what`.
pub fn decode_line<T: DeserializeOwned>(what: &'static str, body: &str) -> Result<T, Error> {
    let line = body.lines().next().unwrap_or("");
    let unexpected = |detail: String| Error::UnexpectedResponse { what, detail };
    let value: serde_json::Value = serde_json::from_str(line).map_err(|e| unexpected(e.to_string()))?;
    if !value.is_object() {
        return Err(unexpected(format!("expected a JSON object, got {}", value)))
    }
    T::deserialize(value).map_err(|e| unexpected(e.to_string()))
}

pub struct RequestBuilder<'a> {
    mw: &'a Mediawiki,
    base: Url,
    args: Vec<(String, String)>,
    form: Vec<(String, String)>,
}
impl<'a> RequestBuilder<'a> {
    pub fn arg(&mut self, key: &str, value: &str) -> &mut Self {
        self.args.push((key.to_owned(), value.to_owned()));
        self
    }
    /// Adds a field to the urlencoded body. Only sent by `post`.
    pub fn form(&mut self, key: &str, value: &str) -> &mut Self {
        self.form.push((key.to_owned(), value.to_owned()));
        self
    }
    pub fn url(&self) -> Url {
        let mut url = self.base.clone();
        if !self.args.is_empty() {
            url.query_pairs_mut().extend_pairs(self.args.iter());
        }
        url
    }
    pub fn get(&self) -> Result<Response, Error> {
        self.mw.do_request(Method::GET, self.url(), None)
    }
    pub fn post(&self) -> Result<Response, Error> {
        self.mw.do_request(Method::POST, self.url(), Some(self.form.as_slice()))
    }
    pub fn post_json<T: DeserializeOwned>(&self, what: &'static str) -> Result<T, Error> {
        decode_line(what, &self.post()?.text()?)
    }
}

#[derive(Deserialize)]
struct LoginResponse {
    login: LoginInner,
}
#[derive(Deserialize)]
struct LoginInner {
    result: Option<String>,
    token: Option<String>,
}

/// Applies one `Set-Cookie` value. A cookie with `Max-Age=0` or an `Expires`
/// in the past is removed from the jar instead of stored.
fn apply_set_cookie(jar: &mut CookieJar, header: &str) {
    let cookie = match Cookie::parse(header.to_owned()) {
        Ok(cookie) => cookie,
        Err(e) => {
            warn!(header, error = %e, "ignoring malformed Set-Cookie header");
            return
        },
    };
    let expired = cookie.max_age().map_or(false, |age| age.is_zero() || age.is_negative())
        || cookie.expires_datetime().map_or(false, |at| at <= OffsetDateTime::now_utc());
    if expired {
        debug!(name = cookie.name(), "dropping expired cookie");
        jar.remove(cookie);
    } else {
        debug!(name = cookie.name(), "storing cookie");
        jar.add(cookie);
    }
}

/// A logged in wiki session. Cookies set by any response are sent with every
/// later request.
pub struct Mediawiki {
    client: Client,
    cookies: RefCell<CookieJar>,
    config: Config,
}
impl Mediawiki {
    fn do_request(
        &self, method: Method, url: Url, form: Option<&[(String, String)]>,
    ) -> Result<Response, Error> {
        debug!(%method, %url, "request");
        let mut request = self.client.request(method, url.clone())
            .header(USER_AGENT, &self.config.useragent);
        if let Some(cookies) = self.cookie_header() {
            request = request.header(COOKIE, cookies);
        }
        if let Some(form) = form {
            request = request.form(form);
        }
        let response = request.send()?;
        self.store_cookies(&response);
        let status = response.status();
        if !status.is_success() {
            return Err(Error::Status { url, status })
        }
        Ok(response)
    }
    fn cookie_header(&self) -> Option<String> {
        let jar = self.cookies.borrow();
        let pairs = jar.iter()
            .map(|c| format!("{}={}", c.name(), c.value()))
            .collect::<Vec<_>>();
        if pairs.is_empty() {
            None
        } else {
            Some(pairs.join("; "))
        }
    }
    fn store_cookies(&self, response: &Response) {
        let mut jar = self.cookies.borrow_mut();
        for value in response.headers().get_all(SET_COOKIE) {
            match value.to_str() {
                Ok(value) => apply_set_cookie(&mut jar, value),
                Err(_) => warn!(?value, "ignoring malformed Set-Cookie header"),
            }
        }
    }
    pub fn api(&self) -> Result<RequestBuilder, Error> {
        Ok(self.request(self.config.api_url()?))
    }
    pub fn index(&self) -> Result<RequestBuilder, Error> {
        Ok(self.request(self.config.index_url()?))
    }
    fn request(&self, base: Url) -> RequestBuilder {
        RequestBuilder {
            mw: self,
            base,
            args: Vec::new(),
            form: Vec::new(),
        }
    }
    fn login_request(&self) -> Result<RequestBuilder, Error> {
        let mut request = self.api()?;
        request.arg("action", "login")
            .arg("lgname", &self.config.username)
            .arg("lgpassword", &self.config.password)
            .arg("format", "json");
        Ok(request)
    }
    fn do_login(&self) -> Result<(), Error> {
        info!(host = %self.config.host, user = %self.config.username, "logging in");
        debug!("login step 1/2");
        let response: LoginResponse = self.login_request()?.post_json("login")?;
        if let Some(result) = response.login.result.as_deref() {
            if result != "NeedToken" {
                debug!(result, "first login step did not ask for a token");
            }
        }
        let token = response.login.token.ok_or_else(|| Error::UnexpectedResponse {
            what: "login",
            detail: "missing login token".to_owned(),
        })?;
        debug!("login step 2/2");
        let mut confirm = self.login_request()?;
        confirm.form("lgtoken", &token);
        let body = confirm.post()?.text()?;
        match decode_line::<LoginResponse>("login confirmation", &body) {
            Ok(LoginResponse { login: LoginInner { result: Some(result), .. } })
                if result == "Success" => info!("logged in"),
            Ok(LoginResponse { login }) => {
                warn!(result = ?login.result, "login was not confirmed, continuing anyway")
            },
            Err(e) => warn!(error = %e, "could not read login confirmation, continuing anyway"),
        }
        Ok(())
    }
    pub fn login(config: Config) -> Result<Mediawiki, Error> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()?;
        let mw = Mediawiki {
            client,
            cookies: RefCell::new(CookieJar::new()),
            config,
        };
        mw.do_login()?;
        Ok(mw)
    }
}

/// Logs in, makes sure `export_dir` exists, lists every page and writes each
/// one to `export_dir`.
pub fn run(config: Config, export_dir: &Path) -> Result<ExportSummary, Error> {
    let mw = Mediawiki::login(config)?;
    let mut exporter = Exporter::new(&mw, export_dir)?;
    exporter.prepare()?;
    let pages = mw.list_titles()?;
    exporter.export_all(&pages)
}
