// Copyright © 2014, Peter Atashian

use crate::{decode_line, Error, Mediawiki};
use serde::Deserialize;
use tracing::info;

#[derive(Deserialize)]
struct AllpagesResponse {
    query: Query,
    #[serde(rename = "continue")]
    cont: Option<Continue>,
    #[serde(rename = "query-continue")]
    query_continue: Option<QueryContinue>,
}
#[derive(Deserialize)]
struct Query {
    allpages: Vec<Page>,
}
#[derive(Deserialize)]
struct Page {
    title: String,
}
#[derive(Deserialize)]
struct Continue {
    apcontinue: Option<String>,
}
#[derive(Deserialize)]
struct QueryContinue {
    allpages: Option<Continue>,
}

/// Page titles from a single `list=allpages` response, in the order the wiki
/// returned them.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PageList {
    pub titles: Vec<String>,
    /// Where the next response would start. Never followed.
    pub continuation: Option<String>,
}
impl PageList {
    pub fn parse(body: &str) -> Result<PageList, Error> {
        let response: AllpagesResponse = decode_line("allpages", body)?;
        let continuation = response.cont
            .and_then(|c| c.apcontinue)
            .or_else(|| response.query_continue
                .and_then(|c| c.allpages)
                .and_then(|c| c.apcontinue));
        Ok(PageList {
            titles: response.query.allpages.into_iter().map(|page| page.title).collect(),
            continuation,
        })
    }
    pub fn is_truncated(&self) -> bool {
        self.continuation.is_some()
    }
}

pub trait Allpages {
    fn list_titles(&self) -> Result<PageList, Error>;
}
impl Allpages for Mediawiki {
    fn list_titles(&self) -> Result<PageList, Error> {
        info!("listing all pages");
        let mut request = self.api()?;
        request.arg("format", "json")
            .arg("action", "query")
            .arg("list", "allpages")
            .arg("aplimit", "max");
        let pages = PageList::parse(&request.get()?.text()?)?;
        info!(count = pages.titles.len(), truncated = pages.is_truncated(), "listed pages");
        Ok(pages)
    }
}
