//! §12: the command table and the toy commands it backs. Everything here
//! is harness scaffolding — a real server supplies its own `CommandCatalog`
//! built from whatever commands it actually implements.

mod acl;
mod auth;
mod demo;

pub use acl::{AclCat, AclDelUser, AclGetUser, AclHelp, AclList, AclSetUser, AclUsers, AclWhoAmI};
pub use auth::AuthCmd;
pub use demo::{Debug, Del, Get, Set};

use crate::{
    authz::{Category, CommandCatalog, CommandDescriptor},
    command_id::CommandIdRegistry,
};
use bytes::Bytes;
use std::collections::HashMap;

const STRING_CAT: &[Category] = &[Category::String, Category::ReadWrite, Category::Fast];
const KEYSPACE_CAT: &[Category] = &[Category::ReadWrite, Category::Fast];
const ADMIN_CAT: &[Category] = &[Category::Admin, Category::Slow];

struct Descriptor {
    id: u32,
    name: &'static str,
    is_auth: bool,
    has_keys: bool,
    key_indices: Vec<usize>,
    categories: &'static [Category],
}

impl CommandDescriptor for Descriptor {
    fn id(&self) -> u32 {
        self.id
    }
    fn name(&self) -> &str {
        self.name
    }
    fn is_auth(&self) -> bool {
        self.is_auth
    }
    fn has_keys(&self) -> bool {
        self.has_keys
    }
    fn key_indices(&self, _argv: &[Bytes]) -> Vec<usize> {
        self.key_indices.clone()
    }
    fn categories(&self) -> &'static [Category] {
        self.categories
    }
}

/// The handful of demo commands plus the `ACL`/`AUTH` admin surface,
/// enough to exercise authorization against every shape §4.G distinguishes
/// (keyed vs. unkeyed, auth-exempt, subcommand-scoped).
pub struct CommandTable {
    ids: CommandIdRegistry,
    descriptors: HashMap<u32, Descriptor>,
}

impl CommandTable {
    pub fn new() -> Self {
        let ids = CommandIdRegistry::new();
        let mut descriptors = HashMap::new();

        let mut add = |name: &'static str,
                       is_auth: bool,
                       has_keys: bool,
                       key_indices: Vec<usize>,
                       categories: &'static [Category]| {
            let id = ids.id_of(name.as_bytes());
            descriptors.insert(
                id,
                Descriptor {
                    id,
                    name,
                    is_auth,
                    has_keys,
                    key_indices,
                    categories,
                },
            );
        };

        add("AUTH", true, false, vec![], &[]);
        add("GET", false, true, vec![1], STRING_CAT);
        add("SET", false, true, vec![1], STRING_CAT);
        add("DEL", false, true, (1..16).collect(), KEYSPACE_CAT);
        add("DEBUG", false, false, vec![], ADMIN_CAT);
        add("ACL", false, false, vec![], ADMIN_CAT);

        Self { ids, descriptors }
    }
}

impl Default for CommandTable {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandCatalog for CommandTable {
    fn id_of(&self, name: &[u8]) -> u32 {
        self.ids.id_of(name)
    }

    fn descriptor(&self, id: u32) -> Option<&dyn CommandDescriptor> {
        self.descriptors.get(&id).map(|d| d as &dyn CommandDescriptor)
    }

    fn command_ids_in_category(&self, category: Category) -> Vec<u32> {
        self.descriptors
            .values()
            .filter(|d| category == Category::All || d.categories.contains(&category))
            .map(|d| d.id)
            .collect()
    }
}
