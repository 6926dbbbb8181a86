//! §9 design note: "global state → explicit context". Everything the ACL core
//! needs across a process lifetime — the user registry and the command id
//! registry — lives in one `AclContext` value threaded through the embedding
//! server's top-level state, instead of behind process-wide singletons.

use crate::{command_id::CommandIdRegistry, registry::UserRegistry};

pub struct AclContext {
    pub registry: UserRegistry,
    pub command_ids: CommandIdRegistry,
}

impl AclContext {
    pub fn new() -> Self {
        Self {
            registry: UserRegistry::new(),
            command_ids: CommandIdRegistry::new(),
        }
    }
}

impl Default for AclContext {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_context_has_default_user() {
        let ctx = AclContext::new();
        assert!(ctx.registry.lookup(crate::registry::DEFAULT_USER).is_some());
    }
}
