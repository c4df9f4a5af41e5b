use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use anyhow::Context;
use hurl_index::IndexConfig;
use hurl_server::ServerConfig;
use serde::Deserialize;

use crate::cli::Cli;

/// Settings read from the TOML configuration file. Every key is optional.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct HurlConfig {
    /// The package repository (a git directory).
    pub repo: PathBuf,
    /// The search index directory.
    pub index: PathBuf,
    pub refresh_after_minutes: u64,
    /// Unix datagram socket carrying change notifications.
    pub queue: PathBuf,
    pub bind: SocketAddr,
    pub page_size: usize,
}

impl Default for HurlConfig {
    fn default() -> Self {
        Self {
            repo: PathBuf::from("."),
            index: PathBuf::from("hurl-index"),
            refresh_after_minutes: 30,
            queue: PathBuf::from("/tmp/hurl-index.sock"),
            bind: SocketAddr::from(([127, 0, 0, 1], 8080)),
            page_size: 10,
        }
    }
}

impl HurlConfig {
    pub fn parse(text: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(text)?)
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        Self::parse(&text).with_context(|| format!("parsing config {}", path.display()))
    }

    /// The file named on the command line (or defaults), with global flags
    /// applied on top.
    pub fn resolve(cli: &Cli) -> anyhow::Result<Self> {
        let mut config = match &cli.config {
            Some(path) => Self::load(path)?,
            None => Self::default(),
        };
        if let Some(repo) = &cli.repo {
            config.repo = repo.clone();
        }
        if let Some(index) = &cli.index {
            config.index = index.clone();
        }
        Ok(config)
    }

    pub fn index_config(&self) -> IndexConfig {
        IndexConfig::default()
            .with_refresh_minutes(self.refresh_after_minutes)
            .with_page_size(self.page_size)
    }

    pub fn server_config(&self) -> ServerConfig {
        ServerConfig::default().with_bind_addr(self.bind)
    }
}
