//! The `ACL` admin surface of §6: `WHOAMI`, `LIST`, `USERS`, `GETUSER`,
//! `SETUSER`, `DELUSER`, `CAT`, `HELP`.

use super::CommandTable;
use crate::{
    authz::{Category, CommandCatalog},
    cmd::{CmdError, CmdExecutor, CmdUnparsed, Err, Reply, Session},
    context::AclContext,
    registry::DEFAULT_USER,
    user::{Flags, User},
    util::sha256_hex,
};
use bytes::Bytes;
use tracing::instrument;

#[derive(Debug)]
pub struct AclWhoAmI;

impl CmdExecutor for AclWhoAmI {
    const NAME: &'static str = "ACL|WHOAMI";

    fn parse(_args: &mut CmdUnparsed) -> Result<Self, CmdError> {
        Ok(AclWhoAmI)
    }

    fn execute(self, _ctx: &AclContext, session: &mut Session) -> Result<Reply, CmdError> {
        Ok(Reply::Bulk(session.user.name.clone()))
    }
}

#[derive(Debug)]
pub struct AclUsers;

impl CmdExecutor for AclUsers {
    const NAME: &'static str = "ACL|USERS";

    fn parse(_args: &mut CmdUnparsed) -> Result<Self, CmdError> {
        Ok(AclUsers)
    }

    fn execute(self, ctx: &AclContext, _session: &mut Session) -> Result<Reply, CmdError> {
        let names = ctx
            .registry
            .names()
            .into_iter()
            .map(Reply::Bulk)
            .collect();
        Ok(Reply::Array(names))
    }
}

/// Renders a user's password set the way `ACL LIST`/`GETUSER` show it:
/// `nopass` for a `NOPASS` user, otherwise one `#<sha256-hex>` token per
/// stored password — the raw bytes themselves are never echoed back.
/// Storage and `tscmp` (§4.B) both keep comparing the plaintext; hashing
/// only happens here, at display time.
fn render_passwords(user: &User) -> String {
    if user.flags.contains(Flags::NOPASS) {
        "nopass".to_string()
    } else {
        user.passwords
            .iter()
            .map(|p| format!("#{}", sha256_hex(p)))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Renders a user's command grant as `+@all` (with `ALLCOMMANDS`) or
/// `-@all` followed by each individually granted `+cmd`/`+cmd|sub` token,
/// resolving bitmap bits back to names via `catalog` (§6 `commands`).
fn render_commands(user: &User, catalog: &dyn CommandCatalog) -> String {
    if user.flags.contains(Flags::ALLCOMMANDS) {
        return "+@all".to_string();
    }

    let mut tokens = vec!["-@all".to_string()];
    let mut ids: Vec<u32> = catalog.command_ids_in_category(Category::All);
    ids.sort_unstable();

    for id in ids {
        let Some(descr) = catalog.descriptor(id) else {
            continue;
        };
        if user.allowed_commands.get(id) {
            tokens.push(format!("+{}", descr.name().to_lowercase()));
        } else if let Some(subs) = user.subcommands_for(id) {
            for sub in subs {
                tokens.push(format!(
                    "+{}|{}",
                    descr.name().to_lowercase(),
                    String::from_utf8_lossy(sub)
                ));
            }
        }
    }

    tokens.join(" ")
}

/// Renders one user as its `ACL LIST` line: `user <name> [on|off] ...rules`.
fn render_user_line(user: &User, catalog: &dyn CommandCatalog) -> String {
    let mut s = format!(
        "user {} {}",
        String::from_utf8_lossy(&user.name),
        if user.is_enabled() { "on" } else { "off" }
    );

    s.push(' ');
    s.push_str(&render_passwords(user));

    if user.flags.contains(Flags::ALLKEYS) {
        s.push_str(" ~*");
    } else {
        for p in &user.patterns {
            s.push_str(" ~");
            s.push_str(&String::from_utf8_lossy(p));
        }
    }

    s.push(' ');
    s.push_str(&render_commands(user, catalog));

    s
}

#[derive(Debug)]
pub struct AclList;

impl AclList {
    pub fn parse_with(_args: &mut CmdUnparsed, _table: &CommandTable) -> Result<Self, CmdError> {
        Ok(AclList)
    }

    pub fn execute(
        self,
        ctx: &AclContext,
        table: &CommandTable,
        _session: &mut Session,
    ) -> Result<Reply, CmdError> {
        let mut lines = Vec::new();
        for name in ctx.registry.names() {
            if let Some(user) = ctx.registry.lookup(&name) {
                lines.push(Reply::Simple(render_user_line(&user, table)));
            }
        }
        Ok(Reply::Array(lines))
    }
}

#[derive(Debug)]
pub struct AclGetUser {
    pub name: Bytes,
}

impl AclGetUser {
    pub fn parse_with(args: &mut CmdUnparsed, _table: &CommandTable) -> Result<Self, CmdError> {
        let name = args.next().ok_or(Err::WrongArgNum)?;
        Ok(AclGetUser { name })
    }

    pub fn execute(
        self,
        ctx: &AclContext,
        table: &CommandTable,
        _session: &mut Session,
    ) -> Result<Reply, CmdError> {
        let Some(user) = ctx.registry.lookup(&self.name) else {
            return Ok(Reply::Null);
        };

        let flags = Reply::Array(
            [
                (Flags::ENABLED, "on"),
                (Flags::ALLKEYS, "allkeys"),
                (Flags::ALLCOMMANDS, "allcommands"),
                (Flags::NOPASS, "nopass"),
            ]
            .into_iter()
            .filter(|(f, _)| user.flags.contains(*f))
            .map(|(_, name)| Reply::Simple(name.to_string()))
            .collect(),
        );

        let patterns = Reply::Array(user.patterns.iter().cloned().map(Reply::Bulk).collect());

        let passwords = Reply::Array(
            user.passwords
                .iter()
                .map(|p| Reply::Bulk(Bytes::from(sha256_hex(p))))
                .collect(),
        );

        let commands = Reply::Simple(render_commands(&user, table));

        Ok(Reply::Array(vec![
            Reply::Simple("flags".into()),
            flags,
            Reply::Simple("passwords".into()),
            passwords,
            Reply::Simple("patterns".into()),
            patterns,
            Reply::Simple("commands".into()),
            commands,
        ]))
    }
}

#[derive(Debug)]
pub struct AclDelUser {
    pub users: Vec<Bytes>,
}

impl CmdExecutor for AclDelUser {
    const NAME: &'static str = "ACL|DELUSER";

    fn parse(args: &mut CmdUnparsed) -> Result<Self, CmdError> {
        if args.is_empty() {
            return Err(Err::WrongArgNum.into());
        }
        Ok(AclDelUser {
            users: args.collect(),
        })
    }

    #[instrument(level = "info", skip(self, ctx, _session))]
    fn execute(self, ctx: &AclContext, _session: &mut Session) -> Result<Reply, CmdError> {
        let mut count = 0i64;
        for name in &self.users {
            if name.as_ref() == DEFAULT_USER {
                return Err(crate::error::AclError::ProtectedUser.into());
            }
            if ctx.registry.delete(name).is_ok() {
                count += 1;
            }
        }
        Ok(Reply::Integer(count))
    }
}

#[derive(Debug)]
pub struct AclSetUser {
    pub name: Bytes,
    pub rules: Vec<Bytes>,
}

impl AclSetUser {
    pub fn parse_with(args: &mut CmdUnparsed, _table: &CommandTable) -> Result<Self, CmdError> {
        let name = args.next().ok_or(Err::WrongArgNum)?;
        Ok(AclSetUser {
            name,
            rules: args.collect(),
        })
    }

    #[instrument(level = "info", skip(self, ctx, table, _session))]
    pub fn execute(
        self,
        ctx: &AclContext,
        table: &CommandTable,
        _session: &mut Session,
    ) -> Result<Reply, CmdError> {
        ctx.registry.set_user(&self.name, &self.rules, table)?;
        Ok(Reply::Simple("OK".into()))
    }
}

#[derive(Debug)]
pub struct AclCat {
    pub category: Option<Bytes>,
}

impl AclCat {
    pub fn parse_with(args: &mut CmdUnparsed, _table: &CommandTable) -> Result<Self, CmdError> {
        if args.len() > 1 {
            return Err(Err::WrongArgNum.into());
        }
        Ok(AclCat {
            category: args.next(),
        })
    }

    pub fn execute(
        self,
        _ctx: &AclContext,
        table: &CommandTable,
        _session: &mut Session,
    ) -> Result<Reply, CmdError> {
        if let Some(name) = &self.category {
            let Some(cat) = Category::parse(name) else {
                return Err(crate::error::AclError::UnknownCategory {
                    category: name.clone(),
                }
                .into());
            };
            let names = table
                .command_ids_in_category(cat)
                .into_iter()
                .filter_map(|id| table.descriptor(id))
                .map(|d| Reply::Simple(d.name().to_lowercase()))
                .collect();
            return Ok(Reply::Array(names));
        }

        Ok(Reply::Array(
            Category::ALL
                .into_iter()
                .map(|c| Reply::Simple(c.name().to_string()))
                .collect(),
        ))
    }
}

#[derive(Debug)]
pub struct AclHelp;

impl CmdExecutor for AclHelp {
    const NAME: &'static str = "ACL|HELP";

    fn parse(_args: &mut CmdUnparsed) -> Result<Self, CmdError> {
        Ok(AclHelp)
    }

    fn execute(self, _ctx: &AclContext, _session: &mut Session) -> Result<Reply, CmdError> {
        Ok(Reply::Array(
            [
                "WHOAMI",
                "LIST",
                "USERS",
                "GETUSER <name>",
                "SETUSER <name> [rule ...]",
                "DELUSER <name> [<name> ...]",
                "CAT [category]",
            ]
            .into_iter()
            .map(|s| Reply::Simple(s.to_string()))
            .collect(),
        ))
    }
}
