//! HTTP access.
//!
//! Everything that touches the network goes through [`Transport`], so the crawler can be
//! driven by a proxy-rotating ureq client in production and by an in-memory site in tests.

use crate::error::{Error, Result};
use select::document::Document;
use std::io::Read;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

pub(crate) const FAKE_UA: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:79.0) Gecko/20100101 Firefox/79.0";

/// Raw GET access to the network.
pub trait Transport {
    /// Returns the body of a successful (2xx) response.
    fn get(&self, url: &str) -> Result<Vec<u8>>;
}

impl<T: Transport + ?Sized> Transport for &T {
    fn get(&self, url: &str) -> Result<Vec<u8>> {
        (**self).get(url)
    }
}

/// ureq-backed transport.
/// With proxies configured, each request goes through the next proxy in turn.
pub struct UreqTransport {
    agents: Vec<(Option<String>, ureq::Agent)>,
    next: AtomicUsize,
}

impl UreqTransport {
    pub fn new(proxies: &[String], timeout: Duration, user_agent: Option<&str>) -> Result<Self> {
        let build = |proxy: Option<&String>| -> Result<ureq::Agent> {
            let mut builder = ureq::AgentBuilder::new()
                .timeout(timeout)
                .user_agent(user_agent.unwrap_or(FAKE_UA));
            if let Some(proxy) = proxy {
                check_proxy_scheme(proxy)?;
                let proxy = ureq::Proxy::new(proxy)
                    .map_err(|e| Error::Config(format!("invalid proxy {}: {}", proxy, e)))?;
                builder = builder.proxy(proxy);
            }
            Ok(builder.build())
        };

        let agents = if proxies.is_empty() {
            vec![(None, build(None)?)]
        } else {
            proxies
                .iter()
                .map(|proxy| Ok((Some(proxy.clone()), build(Some(proxy))?)))
                .collect::<Result<Vec<_>>>()?
        };

        Ok(Self {
            agents,
            next: AtomicUsize::new(0),
        })
    }

    /// Proxy the next request will go through, if any.
    pub fn current_proxy(&self) -> Option<&str> {
        let idx = self.next.load(Ordering::Relaxed) % self.agents.len();
        self.agents[idx].0.as_deref()
    }

    fn next_agent(&self) -> &(Option<String>, ureq::Agent) {
        let idx = self.next.fetch_add(1, Ordering::Relaxed) % self.agents.len();
        &self.agents[idx]
    }
}

/// ureq is built without SOCKS support, so only HTTP CONNECT proxies can work.
fn check_proxy_scheme(proxy: &str) -> Result<()> {
    match proxy.split_once("://") {
        None => Ok(()),
        Some((scheme, _)) if scheme.eq_ignore_ascii_case("http") => Ok(()),
        Some((scheme, _)) => Err(Error::Config(format!(
            "unsupported proxy scheme {} in {}",
            scheme, proxy
        ))),
    }
}

impl Transport for UreqTransport {
    fn get(&self, url: &str) -> Result<Vec<u8>> {
        let (proxy, agent) = self.next_agent();
        if let Some(proxy) = proxy {
            log::debug!("GET {} via {}", url, proxy);
        } else {
            log::debug!("GET {}", url);
        }

        let resp = agent.get(url).call().map_err(|e| match e {
            ureq::Error::Status(code, _) => {
                Error::fetch(url, format!("server returned status {}", code))
            }
            other => Error::fetch(url, other),
        })?;

        let mut body = Vec::new();
        resp.into_reader()
            .read_to_end(&mut body)
            .map_err(|e| Error::fetch(url, e))?;
        Ok(body)
    }
}

/// Retrieves pages and files over a [`Transport`], retrying failed requests.
pub struct Fetcher<T> {
    transport: T,
    retries: u32,
    retry_delay: Duration,
}

impl<T: Transport> Fetcher<T> {
    pub fn new(transport: T, retries: u32, retry_delay: Duration) -> Self {
        Self {
            transport,
            retries,
            retry_delay,
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Fetches raw bytes.
    pub fn bytes(&self, url: &str) -> Result<Vec<u8>> {
        let mut attempt = 0;
        loop {
            match self.transport.get(url) {
                Ok(body) => return Ok(body),
                Err(e) if attempt < self.retries => {
                    attempt += 1;
                    log::warn!("{}; retrying ({}/{})", e, attempt, self.retries);
                    if !self.retry_delay.is_zero() {
                        std::thread::sleep(self.retry_delay);
                    }
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Fetches a page and parses it into a document tree.
    pub fn document(&self, url: &str) -> Result<Document> {
        let body = self.bytes(url)?;
        let text = String::from_utf8(body)
            .map_err(|_| Error::fetch(url, "response body is not valid UTF-8"))?;
        Ok(Document::from(text.as_str()))
    }
}
