// Copyright © 2014, Peter Atashian

use crate::{Error, Mediawiki, RequestBuilder};
use reqwest::blocking::Response;
use url::Url;

pub trait RawPage {
    /// `index.php?action=raw&title=...` for `title`.
    fn raw_url(&self, title: &str) -> Result<Url, Error>;
    /// The unrendered source of `title`. The body is left unread so callers
    /// can stream it.
    fn fetch_raw(&self, title: &str) -> Result<Response, Error>;
}
impl Mediawiki {
    fn raw_request(&self, title: &str) -> Result<RequestBuilder, Error> {
        let mut request = self.index()?;
        request.arg("action", "raw");
        request.arg("title", title);
        Ok(request)
    }
}
impl RawPage for Mediawiki {
    fn raw_url(&self, title: &str) -> Result<Url, Error> {
        Ok(self.raw_request(title)?.url())
    }
    fn fetch_raw(&self, title: &str) -> Result<Response, Error> {
        self.raw_request(title)?.get()
    }
}
