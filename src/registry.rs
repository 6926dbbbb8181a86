//! Component D: the name → user map, plus the copy-on-write mutation
//! discipline that lets a client hold an immutable snapshot of a user that
//! survives later edits to (or deletion of) the named record (§5).

use crate::{
    authz::CommandCatalog,
    error::{AclError, AclResult},
    user::User,
};
use arc_swap::ArcSwap;
use bytes::Bytes;
use dashmap::DashMap;
use std::sync::Arc;
use tracing::{info, instrument};

pub const DEFAULT_USER: &[u8] = b"default";

#[derive(Default)]
pub struct UserRegistry {
    users: DashMap<Bytes, ArcSwap<User>>,
}

impl UserRegistry {
    /// A fresh registry, seeded with the `default` user per §3's lifecycle.
    pub fn new() -> Self {
        let registry = Self {
            users: DashMap::new(),
        };
        registry.users.insert(
            Bytes::from_static(DEFAULT_USER),
            ArcSwap::from_pointee(User::new_default(Bytes::from_static(DEFAULT_USER))),
        );
        registry
    }

    #[instrument(level = "info", skip(self))]
    pub fn create(&self, name: Bytes) -> AclResult<Arc<User>> {
        if self.users.contains_key(&name) {
            return Err(AclError::NameExists { name });
        }
        let user = Arc::new(User::new(name.clone()));
        self.users.insert(name, ArcSwap::new(user.clone()));
        info!("user created");
        Ok(user)
    }

    pub fn lookup(&self, name: &[u8]) -> Option<Arc<User>> {
        self.users.get(name).map(|slot| slot.load_full())
    }

    #[instrument(level = "info", skip(self))]
    pub fn delete(&self, name: &[u8]) -> AclResult<()> {
        if name == DEFAULT_USER {
            return Err(AclError::ProtectedUser);
        }
        match self.users.remove(name) {
            Some(_) => {
                info!("user deleted");
                Ok(())
            }
            None => Err(AclError::NameNotFound {
                name: Bytes::copy_from_slice(name),
            }),
        }
    }

    /// Publishes a new value for `name` built by cloning the current
    /// snapshot and running `f` over the clone (read-copy-update, §5): any
    /// session already holding the old `Arc<User>` keeps reading it
    /// unchanged, only new lookups observe the mutation.
    #[instrument(level = "debug", skip(self, f))]
    pub fn mutate(&self, name: &[u8], f: impl FnOnce(&mut User) -> AclResult<()>) -> AclResult<()> {
        let slot = self
            .users
            .get(name)
            .ok_or_else(|| AclError::NameNotFound {
                name: Bytes::copy_from_slice(name),
            })?;

        let mut next = (*slot.load_full()).clone();
        f(&mut next)?;
        slot.store(Arc::new(next));
        Ok(())
    }

    /// Applies a sequence of textual rules to `name`, creating it first if it
    /// does not yet exist (`ACL SETUSER` semantics, §6).
    pub fn set_user(
        &self,
        name: &[u8],
        rules: &[Bytes],
        catalog: &dyn CommandCatalog,
    ) -> AclResult<()> {
        if self.users.get(name).is_none() {
            self.create(Bytes::copy_from_slice(name))?;
        }
        self.mutate(name, |user| {
            for rule in rules {
                user.apply_rule(rule, catalog)?;
            }
            Ok(())
        })
    }

    pub fn names(&self) -> Vec<Bytes> {
        self.users.iter().map(|e| e.key().clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::authz::tests::TestCatalog;

    #[test]
    fn default_user_exists_at_init() {
        let reg = UserRegistry::new();
        let default = reg.lookup(DEFAULT_USER).unwrap();
        assert!(default.is_enabled());
    }

    #[test]
    fn default_cannot_be_deleted() {
        let reg = UserRegistry::new();
        let e = reg.delete(DEFAULT_USER).unwrap_err();
        assert!(matches!(e, AclError::ProtectedUser));
    }

    #[test]
    fn create_rejects_duplicate_name() {
        let reg = UserRegistry::new();
        reg.create("alice".into()).unwrap();
        let e = reg.create("alice".into()).unwrap_err();
        assert!(matches!(e, AclError::NameExists { .. }));
    }

    #[test]
    fn delete_unknown_user_errors() {
        let reg = UserRegistry::new();
        let e = reg.delete(b"ghost").unwrap_err();
        assert!(matches!(e, AclError::NameNotFound { .. }));
    }

    #[test]
    fn live_snapshot_survives_mutation_and_deletion() {
        let reg = UserRegistry::new();
        let catalog = TestCatalog::new();
        reg.set_user(b"alice", &[Bytes::from_static(b"on")], &catalog)
            .unwrap();

        let snapshot = reg.lookup(b"alice").unwrap();
        assert!(snapshot.is_enabled());

        reg.mutate(b"alice", |u| {
            u.apply_rule(b"off", &catalog)
        })
        .unwrap();

        // The snapshot taken before the mutation is untouched.
        assert!(snapshot.is_enabled());
        // But a fresh lookup observes the new state.
        assert!(!reg.lookup(b"alice").unwrap().is_enabled());

        reg.delete(b"alice").unwrap();
        // The old snapshot is still valid even though the record is gone.
        assert!(snapshot.is_enabled());
        assert!(reg.lookup(b"alice").is_none());
    }

    #[test]
    fn mutate_unknown_user_errors() {
        let reg = UserRegistry::new();
        let e = reg.mutate(b"ghost", |_| Ok(())).unwrap_err();
        assert!(matches!(e, AclError::NameNotFound { .. }));
    }
}
