//! Component A: process-stable, dense integer identifiers for command names.
//!
//! `id_of` memoises the first integer handed out for a given name and never
//! changes it again for the lifetime of the process, so a persisted user
//! definition referencing `+somecommand` stays meaningful even if the
//! surrounding server unloads and reloads a module that registers it.

use bytes::Bytes;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU32, Ordering};

/// Minimum bit width of `User::allowed_commands` (§3). IDs at or beyond this
/// value are never satisfiable via the bitmap and fall back to the authorizer's
/// overflow deny (§4.G step 2).
pub const MAX_COMMAND_ID: u32 = 1024;

#[derive(Debug, Default)]
pub struct CommandIdRegistry {
    ids: DashMap<Bytes, u32>,
    next: AtomicU32,
}

impl CommandIdRegistry {
    pub fn new() -> Self {
        Self {
            ids: DashMap::new(),
            next: AtomicU32::new(0),
        }
    }

    /// Returns the stable id for `name`, allocating one on first sight.
    /// IDs are never reused, even past `MAX_COMMAND_ID` — the authorizer is
    /// responsible for treating an overflowing id as a deny (§4.A, §4.G).
    ///
    /// Names are folded to uppercase before being keyed, so `+get` (an ACL
    /// rule body), `GET` (a dispatched command name) and any other casing
    /// all resolve to the same id — callers never have to agree on a
    /// canonical case themselves.
    pub fn id_of(&self, name: &[u8]) -> u32 {
        let name = name.to_ascii_uppercase();

        if let Some(id) = self.ids.get(name.as_slice()) {
            return *id;
        }

        // Two callers can race to allocate an id for the same unseen name;
        // `entry` makes the allocate-or-return atomic under the shard lock.
        *self
            .ids
            .entry(Bytes::from(name))
            .or_insert_with(|| self.next.fetch_add(1, Ordering::Relaxed))
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stable_across_interleaved_calls() {
        let reg = CommandIdRegistry::new();

        let foo1 = reg.id_of(b"FOO");
        let _bar = reg.id_of(b"BAR");
        let _baz = reg.id_of(b"BAZ");
        let foo2 = reg.id_of(b"FOO");

        assert_eq!(foo1, foo2);
    }

    #[test]
    fn distinct_names_get_distinct_ids() {
        let reg = CommandIdRegistry::new();

        let a = reg.id_of(b"GET");
        let b = reg.id_of(b"SET");

        assert_ne!(a, b);
    }

    #[test]
    fn casing_is_folded_to_a_single_id() {
        let reg = CommandIdRegistry::new();

        let upper = reg.id_of(b"GET");
        let lower = reg.id_of(b"get");
        let mixed = reg.id_of(b"Get");

        assert_eq!(upper, lower);
        assert_eq!(upper, mixed);
    }

    #[test]
    fn ids_never_reused() {
        let reg = CommandIdRegistry::new();
        let mut seen = std::collections::HashSet::new();

        for i in 0..64 {
            let name = format!("CMD{i}");
            let id = reg.id_of(name.as_bytes());
            assert!(seen.insert(id), "id {id} reused for {name}");
        }
    }
}
