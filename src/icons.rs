//! Technology icon downloads.
//!
//! Fetches each configured `file name → URL` pair into the icons directory,
//! in file-name order. Some hosts refuse requests without a browser
//! User-Agent, so one is always sent. A failed download is reported and the
//! remaining icons are still fetched.

use std::collections::BTreeMap;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum IconError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Source of icon bytes. [`HttpFetcher`] in production.
pub trait Fetcher {
    /// GET `url`; `Err` carries a human-readable reason.
    fn fetch(&self, url: &str, user_agent: &str) -> Result<Vec<u8>, String>;
}

/// Blocking HTTP fetcher on a shared `ureq` agent.
pub struct HttpFetcher {
    agent: ureq::Agent,
}

impl HttpFetcher {
    pub fn new() -> Self {
        Self {
            agent: ureq::AgentBuilder::new()
                .timeout(Duration::from_secs(30))
                .build(),
        }
    }
}

impl Default for HttpFetcher {
    fn default() -> Self {
        Self::new()
    }
}

impl Fetcher for HttpFetcher {
    fn fetch(&self, url: &str, user_agent: &str) -> Result<Vec<u8>, String> {
        let response = match self.agent.get(url).set("User-Agent", user_agent).call() {
            Ok(response) => response,
            Err(ureq::Error::Status(code, _)) => return Err(format!("HTTP {code}")),
            Err(e) => return Err(e.to_string()),
        };
        if response.status() != 200 {
            return Err(format!("HTTP {}", response.status()));
        }
        let mut body = Vec::new();
        response
            .into_reader()
            .read_to_end(&mut body)
            .map_err(|e| e.to_string())?;
        Ok(body)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IconOutcome {
    Saved { path: PathBuf, bytes: usize },
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IconResult {
    pub name: String,
    pub url: String,
    pub outcome: IconOutcome,
}

/// A bare file name: no separators, not `.`/`..`.
fn is_plain_file_name(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains(['/', '\\'])
}

/// Download every icon in `icons` into `dir`.
pub fn download_icons(
    fetcher: &impl Fetcher,
    dir: &Path,
    icons: &BTreeMap<String, String>,
    user_agent: &str,
) -> Result<Vec<IconResult>, IconError> {
    std::fs::create_dir_all(dir)?;

    let results = icons
        .iter()
        .map(|(name, url)| {
            log::debug!("fetching {name} from {url}");
            let outcome = if !is_plain_file_name(name) {
                IconOutcome::Failed(format!("invalid file name {name:?}"))
            } else {
                match fetcher.fetch(url, user_agent) {
                    Ok(body) => {
                        let path = dir.join(name);
                        match std::fs::write(&path, &body) {
                            Ok(()) => IconOutcome::Saved {
                                path,
                                bytes: body.len(),
                            },
                            Err(e) => IconOutcome::Failed(e.to_string()),
                        }
                    }
                    Err(reason) => IconOutcome::Failed(reason),
                }
            };
            IconResult {
                name: name.clone(),
                url: url.clone(),
                outcome,
            }
        })
        .collect();

    Ok(results)
}
