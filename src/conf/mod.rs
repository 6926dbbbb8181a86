mod security;

pub use security::*;

use crate::cli::Cli;
use clap::Parser;
use figment::providers::{Format, Toml};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "lowercase", default)]
pub struct Conf {
    pub security: SecurityConf,
}

impl Default for Conf {
    fn default() -> Self {
        Self {
            security: SecurityConf::default(),
        }
    }
}

impl Conf {
    /// Layers config/default.toml, then config/custom.toml, then
    /// environment variables, then CLI flags — each merged over the
    /// previous one (§10).
    pub fn new() -> anyhow::Result<Self> {
        let mut conf: Conf = figment::Figment::new()
            .merge(Toml::file("config/default.toml"))
            .merge(Toml::file("config/custom.toml"))
            .merge(figment::providers::Env::prefixed("WARDKV_"))
            .extract()?;

        let cli = Cli::parse();
        if let Some(acl_file) = cli.acl_file {
            conf.security.acl_file = Some(acl_file);
        }
        if let Some(requirepass) = cli.requirepass {
            conf.security.requirepass = Some(requirepass);
        }

        Ok(conf)
    }
}
