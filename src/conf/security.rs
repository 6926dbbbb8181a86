//! §10: the ACL-relevant slice of startup configuration. This is a
//! harness/collaborator concern, not part of the library surface in §4 — the
//! library never reads files or environment variables, only the rule strings
//! and values this module hands it after parsing them.

use crate::{authz::CommandCatalog, context::AclContext, error::AclResult, registry::DEFAULT_USER};
use bytes::Bytes;
use serde::Deserialize;
use std::{fs, path::Path};
use tracing::{info, warn};

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SecurityConf {
    /// Legacy single-password mode: equivalent to `default >\"<requirepass>\"`
    /// plus clearing `NOPASS` on `default` at startup.
    pub requirepass: Option<String>,
    /// Whether the `default` user starts with `NOPASS` (true out of the box).
    pub default_nopass: bool,
    /// Path to a file holding one `user ...` line per §6's persisted form,
    /// applied in file order after `default` is seeded.
    pub acl_file: Option<String>,
}

impl Default for SecurityConf {
    fn default() -> Self {
        Self {
            requirepass: None,
            default_nopass: true,
            acl_file: None,
        }
    }
}

impl SecurityConf {
    /// Seeds `ctx`'s registry from this configuration. Called once at
    /// startup, after `AclContext::new()` has created the built-in `default`
    /// user.
    pub fn apply_startup(&self, ctx: &AclContext, catalog: &dyn CommandCatalog) -> AclResult<()> {
        if !self.default_nopass {
            ctx.registry
                .mutate(DEFAULT_USER, |u| u.apply_rule(b"resetpass", catalog))?;
        }

        if let Some(pass) = &self.requirepass {
            ctx.registry.mutate(DEFAULT_USER, |u| {
                let mut rule = vec![b'>'];
                rule.extend_from_slice(pass.as_bytes());
                u.apply_rule(&rule, catalog)
            })?;
        }

        if let Some(path) = &self.acl_file {
            self.load_acl_file(ctx, catalog, path)?;
        }

        Ok(())
    }

    fn load_acl_file(
        &self,
        ctx: &AclContext,
        catalog: &dyn CommandCatalog,
        path: impl AsRef<Path>,
    ) -> AclResult<()> {
        let contents = match fs::read_to_string(path.as_ref()) {
            Ok(c) => c,
            Err(e) => {
                warn!(error = %e, path = %path.as_ref().display(), "failed to read acl_file");
                return Ok(());
            }
        };

        for line in contents.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let mut parts = line.split_whitespace();
            if parts.next() != Some("user") {
                warn!(%line, "skipping malformed acl_file line (expected 'user <name> ...')");
                continue;
            }
            let Some(name) = parts.next() else {
                warn!(%line, "skipping acl_file line with no user name");
                continue;
            };

            let rules: Vec<Bytes> = parts.map(|r| Bytes::copy_from_slice(r.as_bytes())).collect();
            ctx.registry.set_user(name.as_bytes(), &rules, catalog)?;
            info!(user = name, "loaded user from acl_file");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{auth::authenticate, authz::tests::TestCatalog};

    #[test]
    fn requirepass_seeds_default_user_password() {
        let ctx = AclContext::new();
        let catalog = TestCatalog::new();
        let conf = SecurityConf {
            requirepass: Some("s3cret".to_string()),
            default_nopass: true,
            acl_file: None,
        };

        conf.apply_startup(&ctx, &catalog).unwrap();

        assert!(authenticate(&ctx.registry, DEFAULT_USER, b"s3cret").is_ok());
        assert!(authenticate(&ctx.registry, DEFAULT_USER, b"wrong").is_err());
    }

    #[test]
    fn default_nopass_false_clears_nopass() {
        let ctx = AclContext::new();
        let catalog = TestCatalog::new();
        let conf = SecurityConf {
            requirepass: None,
            default_nopass: false,
            acl_file: None,
        };

        conf.apply_startup(&ctx, &catalog).unwrap();

        assert!(authenticate(&ctx.registry, DEFAULT_USER, b"anything").is_err());
    }
}
