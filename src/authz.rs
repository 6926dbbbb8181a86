//! Component G: authorization, plus the `Category`/`CommandCatalog`/
//! `CommandDescriptor` collaborator interfaces the authorizer and the rule
//! mutator (§4.E) both consume. These interfaces are owned by whatever
//! embeds this crate (the "command parsing and dispatch" collaborator named
//! out of scope in §1) — see `cmd::commands` for the harness's instance.

use crate::{
    command_id::MAX_COMMAND_ID,
    error::AclError,
    pattern::glob_match,
    user::{Flags, User},
};
use bytes::Bytes;

/// The closed set of command categories (§4.E).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Set,
    SortedSet,
    List,
    Hash,
    String,
    Bitmap,
    HyperLogLog,
    Stream,
    Admin,
    ReadOnly,
    ReadWrite,
    Fast,
    Slow,
    PubSub,
    All,
}

impl Category {
    pub const ALL: [Category; 15] = [
        Category::Set,
        Category::SortedSet,
        Category::List,
        Category::Hash,
        Category::String,
        Category::Bitmap,
        Category::HyperLogLog,
        Category::Stream,
        Category::Admin,
        Category::ReadOnly,
        Category::ReadWrite,
        Category::Fast,
        Category::Slow,
        Category::PubSub,
        Category::All,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Category::Set => "set",
            Category::SortedSet => "sortedset",
            Category::List => "list",
            Category::Hash => "hash",
            Category::String => "string",
            Category::Bitmap => "bitmap",
            Category::HyperLogLog => "hyperloglog",
            Category::Stream => "stream",
            Category::Admin => "admin",
            Category::ReadOnly => "readonly",
            Category::ReadWrite => "readwrite",
            Category::Fast => "fast",
            Category::Slow => "slow",
            Category::PubSub => "pubsub",
            Category::All => "all",
        }
    }

    pub fn parse(name: &[u8]) -> Option<Category> {
        Self::ALL.into_iter().find(|c| c.name().as_bytes().eq_ignore_ascii_case(name))
    }
}

/// Everything the authorizer (and the `+cmd|sub` rule) need to know about one
/// command. Supplied by the embedding server, not owned by this crate.
pub trait CommandDescriptor {
    fn id(&self) -> u32;
    fn name(&self) -> &str;
    fn is_auth(&self) -> bool {
        false
    }
    fn has_keys(&self) -> bool;
    /// Positions in `argv` (0 = the command name itself) that are key
    /// arguments. Only called when `has_keys()` is true.
    fn key_indices(&self, argv: &[Bytes]) -> Vec<usize>;
    fn categories(&self) -> &'static [Category];
}

/// Name → id resolution plus reverse category lookup, supplied by the
/// embedding server's command table.
pub trait CommandCatalog {
    fn id_of(&self, name: &[u8]) -> u32;
    fn descriptor(&self, id: u32) -> Option<&dyn CommandDescriptor>;
    fn command_ids_in_category(&self, category: Category) -> Vec<u32>;
}

/// Authorizes `user` to run `cmd` with `argv`. `user = None` models the
/// "unauthenticated-but-permitted" internal mode (§4.G step 1).
pub fn authorize(
    user: Option<&User>,
    cmd: &dyn CommandDescriptor,
    argv: &[Bytes],
) -> Result<(), AclError> {
    let Some(user) = user else {
        return Ok(());
    };

    if cmd.id() >= MAX_COMMAND_ID {
        let overflow = AclError::IdOverflow { id: cmd.id() };
        overflow.log_if_overflow();
        return Err(AclError::DeniedCommand {
            cmd: Bytes::copy_from_slice(cmd.name().as_bytes()),
        });
    }

    let command_allowed = cmd.is_auth()
        || user.flags.contains(Flags::ALLCOMMANDS)
        || user.allowed_commands.get(cmd.id());

    if !command_allowed {
        let subs = user.subcommands_for(cmd.id());
        let allowed = match subs {
            Some(subs) if !subs.is_empty() && argv.len() >= 2 => subs
                .iter()
                .any(|s| s.eq_ignore_ascii_case(&argv[1])),
            _ => false,
        };
        if !allowed {
            return Err(AclError::DeniedCommand {
                cmd: Bytes::copy_from_slice(cmd.name().as_bytes()),
            });
        }
    }

    if user.flags.contains(Flags::ALLKEYS) || !cmd.has_keys() {
        return Ok(());
    }

    for idx in cmd.key_indices(argv) {
        let Some(key) = argv.get(idx) else { continue };
        let matches_any = user.patterns.iter().any(|p| glob_match(p, key));
        if !matches_any {
            return Err(AclError::DeniedKey);
        }
    }

    Ok(())
}
