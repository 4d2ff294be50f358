// Copyright © 2014, Peter Atashian

use crate::{Error, Mediawiki, PageList, RawPage};
use regex::Regex;
use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use tracing::{debug, info, warn};

/// Turns page titles into file stems. Every char outside `[A-Za-z0-9_]`
/// becomes `_`, so different titles can share a stem.
pub struct Scrubber {
    regex: Regex,
}
impl Scrubber {
    pub fn new() -> Result<Scrubber, Error> {
        Ok(Scrubber { regex: Regex::new(r"[^A-Za-z0-9_]")? })
    }
    pub fn scrub(&self, title: &str) -> String {
        self.regex.replace_all(title, "_").into_owned()
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ExportSummary {
    pub pages: usize,
    /// Pages whose file had already been written earlier in the same run.
    pub overwrites: usize,
    pub continuation: Option<String>,
}

pub struct Exporter<'a> {
    mw: &'a Mediawiki,
    dir: PathBuf,
    scrubber: Scrubber,
    written: HashMap<PathBuf, String>,
    overwrites: usize,
}
impl<'a> Exporter<'a> {
    pub fn new(mw: &'a Mediawiki, dir: impl Into<PathBuf>) -> Result<Exporter<'a>, Error> {
        Ok(Exporter {
            mw,
            dir: dir.into(),
            scrubber: Scrubber::new()?,
            written: HashMap::new(),
            overwrites: 0,
        })
    }
    pub fn path_for(&self, title: &str) -> PathBuf {
        self.dir.join(format!("{}.txt", self.scrubber.scrub(title)))
    }
    pub fn prepare(&self) -> Result<(), Error> {
        if !self.dir.is_dir() {
            info!(dir = %self.dir.display(), "creating export directory");
            fs::create_dir_all(&self.dir)?;
        }
        Ok(())
    }
    /// Writes the raw text of `title` plus a trailing newline, replacing any
    /// existing file.
    pub fn export_page(&mut self, title: &str) -> Result<PathBuf, Error> {
        let url = self.mw.raw_url(title)?;
        let path = self.path_for(title);
        println!("{}: {} to {}", title, url, path.display());
        if let Some(previous) = self.written.insert(path.clone(), title.to_owned()) {
            warn!(%title, %previous, path = %path.display(), "title collides with an earlier page, overwriting");
            self.overwrites += 1;
        }
        let mut response = self.mw.fetch_raw(title)?;
        let mut file = BufWriter::new(File::create(&path)?);
        let bytes = io::copy(&mut response, &mut file)?;
        file.write_all(b"\n")?;
        file.flush()?;
        debug!(%title, bytes, "wrote page");
        Ok(path)
    }
    pub fn export_all(&mut self, pages: &PageList) -> Result<ExportSummary, Error> {
        if let Some(token) = &pages.continuation {
            warn!(apcontinue = %token, "the wiki has more pages than one listing returns, only the first batch is exported");
        }
        for title in &pages.titles {
            self.export_page(title)?;
        }
        info!(pages = pages.titles.len(), overwrites = self.overwrites, dir = %self.dir.display(), "export finished");
        Ok(ExportSummary {
            pages: pages.titles.len(),
            overwrites: self.overwrites,
            continuation: pages.continuation.clone(),
        })
    }
}
