//! A throwaway wiki server for integration tests. Responses are queued up
//! front and handed out in order; once the queue is empty every request gets
//! a 500. Every request is recorded.

#![allow(dead_code)]

use mwexport::Config;
use std::collections::VecDeque;
use std::io::Read;
use std::sync::{Arc, Mutex};
use std::thread;

#[derive(Clone, Debug)]
pub struct Recorded {
    pub method: String,
    /// Path and query, e.g. `/api.php?action=login&...`
    pub url: String,
    pub body: String,
    pub cookie: Option<String>,
}

pub struct Canned {
    status: u16,
    content_type: &'static str,
    content: String,
    set_cookie: Vec<String>,
}
impl Canned {
    pub fn json(content: &str) -> Canned {
        Canned {
            status: 200,
            content_type: "application/json",
            content: content.to_owned(),
            set_cookie: Vec::new(),
        }
    }
    pub fn text(content: &str) -> Canned {
        Canned {
            content_type: "text/x-wiki; charset=UTF-8",
            ..Canned::json(content)
        }
    }
    pub fn status(status: u16) -> Canned {
        Canned {
            status,
            content_type: "text/plain",
            ..Canned::json("error")
        }
    }
    pub fn with_cookie(mut self, cookie: &str) -> Canned {
        self.set_cookie.push(cookie.to_owned());
        self
    }
}

pub const NEED_TOKEN: &str = r#"{"login":{"result":"NeedToken","token":"tokenvalue1234abcd","cookieprefix":"wiki","sessionid":"abc123"}}"#;
pub const LOGIN_SUCCESS: &str = r#"{"login":{"result":"Success","lguserid":1,"lgusername":"Myuser"}}"#;
pub const LOGIN_URL: &str = "/api.php?action=login&lgname=myuser&lgpassword=mypass&format=json";
pub const LIST_URL: &str = "/api.php?format=json&action=query&list=allpages&aplimit=max";

pub struct MockWiki {
    server: Arc<tiny_http::Server>,
    host: String,
    responses: Arc<Mutex<VecDeque<Canned>>>,
    requests: Arc<Mutex<Vec<Recorded>>>,
    thread: Option<thread::JoinHandle<()>>,
}
impl MockWiki {
    pub fn start() -> MockWiki {
        let server = Arc::new(tiny_http::Server::http("127.0.0.1:0").unwrap());
        let host = server.server_addr().to_ip().unwrap().to_string();
        let responses = Arc::new(Mutex::new(VecDeque::<Canned>::new()));
        let requests = Arc::new(Mutex::new(Vec::new()));
        let thread = {
            let server = server.clone();
            let responses = responses.clone();
            let requests = requests.clone();
            thread::spawn(move || {
                for mut request in server.incoming_requests() {
                    let mut body = String::new();
                    let _ = request.as_reader().read_to_string(&mut body);
                    let cookie = request.headers().iter()
                        .find(|h| h.field.equiv("Cookie"))
                        .map(|h| h.value.as_str().to_owned());
                    requests.lock().unwrap().push(Recorded {
                        method: request.method().to_string(),
                        url: request.url().to_owned(),
                        body,
                        cookie,
                    });
                    let canned = responses.lock().unwrap().pop_front()
                        .unwrap_or_else(|| Canned::status(500));
                    let mut response = tiny_http::Response::from_string(canned.content)
                        .with_status_code(canned.status)
                        .with_header(header("Content-Type", canned.content_type));
                    for cookie in &canned.set_cookie {
                        response = response.with_header(header("Set-Cookie", cookie));
                    }
                    let _ = request.respond(response);
                }
            })
        };
        MockWiki { server, host, responses, requests, thread: Some(thread) }
    }
    pub fn queue(&self, canned: Canned) -> &Self {
        self.responses.lock().unwrap().push_back(canned);
        self
    }
    /// Queues the two responses of a successful login, the first one setting
    /// a session cookie.
    pub fn queue_login(&self) -> &Self {
        self.queue(Canned::json(NEED_TOKEN).with_cookie("wikisession=abc123; path=/; HttpOnly"))
            .queue(Canned::json(LOGIN_SUCCESS).with_cookie("wikiUserName=Myuser; path=/"))
    }
    pub fn requests(&self) -> Vec<Recorded> {
        self.requests.lock().unwrap().clone()
    }
    pub fn host(&self) -> &str {
        &self.host
    }
    pub fn config(&self) -> Config {
        Config::new(self.host.clone(), "myuser", "mypass")
    }
}
impl Drop for MockWiki {
    fn drop(&mut self) {
        self.server.unblock();
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

fn header(field: &str, value: &str) -> tiny_http::Header {
    tiny_http::Header::from_bytes(field.as_bytes(), value.as_bytes()).unwrap()
}

/// `{"query":{"allpages":[...]}}` for `titles`.
pub fn allpages(titles: &[&str]) -> String {
    let pages = titles.iter()
        .map(|title| serde_json::json!({ "ns": 0, "title": title }))
        .collect::<Vec<_>>();
    serde_json::json!({ "batchcomplete": "", "query": { "allpages": pages } }).to_string()
}

/// Expected raw URL path for `title`, as the client form-encodes it.
pub fn raw_url(title: &str) -> String {
    let mut url = url::Url::parse("http://localhost/index.php").unwrap();
    url.query_pairs_mut().append_pair("action", "raw").append_pair("title", title);
    format!("/index.php?{}", url.query().unwrap())
}
