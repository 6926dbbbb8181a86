//! §12: a minimal command-dispatch harness standing in for the
//! network/event-loop and parsing/dispatch collaborators named out of scope
//! in §1. It exists only to exercise the ACL core end to end and to host the
//! administrative `ACL`/`AUTH` command surface of §6.

pub mod commands;
mod error;

pub use error::*;

use crate::{
    authz::{authorize, CommandCatalog},
    context::AclContext,
    user::User,
};
use bytes::Bytes;
use commands::{
    AclCat, AclDelUser, AclGetUser, AclHelp, AclList, AclSetUser, AclUsers, AclWhoAmI, AuthCmd,
    CommandTable, Debug, Del, Get, Set,
};
use std::sync::Arc;
use tracing::instrument;

pub type Reply = crate::cmd::error::Reply;

/// A bound client session: the one piece of state the harness threads
/// through dispatch calls, per §3's "client session holds a non-owning
/// reference" ownership rule.
pub struct Session {
    pub user: Arc<User>,
    pub store: Arc<commands::Store>,
}

impl Session {
    pub fn new(ctx: &AclContext) -> Self {
        let default = ctx
            .registry
            .lookup(crate::registry::DEFAULT_USER)
            .expect("default user always exists");
        Self {
            user: default,
            store: Arc::new(commands::Store::default()),
        }
    }
}

pub trait CmdExecutor: Sized + std::fmt::Debug {
    const NAME: &'static str;

    fn parse(args: &mut CmdUnparsed) -> Result<Self, CmdError>;

    fn execute(self, ctx: &AclContext, session: &mut Session) -> Result<Reply, CmdError>;
}

/// Splits a whitespace-separated line into an argv, mirroring the very
/// small slice of RESP3 array decoding this harness needs (command parsing
/// proper is out of scope, §1).
#[derive(Debug, Default)]
pub struct CmdUnparsed {
    inner: Vec<Bytes>,
    start: usize,
}

impl CmdUnparsed {
    pub fn len(&self) -> usize {
        self.inner.len() - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start >= self.inner.len()
    }

    pub fn peek(&self, index: usize) -> Option<&Bytes> {
        self.inner.get(self.start + index)
    }

    pub fn advance(&mut self, n: usize) {
        self.start += n;
    }

    /// The full argv including the command name, from the current cursor.
    pub fn as_argv(&self) -> &[Bytes] {
        &self.inner[self.start.saturating_sub(1).min(self.inner.len())..]
    }
}

impl Iterator for CmdUnparsed {
    type Item = Bytes;

    fn next(&mut self) -> Option<Bytes> {
        let item = self.inner.get(self.start).cloned();
        if item.is_some() {
            self.start += 1;
        }
        item
    }
}

impl From<&[&str]> for CmdUnparsed {
    fn from(val: &[&str]) -> Self {
        Self {
            inner: val.iter().map(|s| Bytes::copy_from_slice(s.as_bytes())).collect(),
            start: 0,
        }
    }
}

impl From<Vec<Bytes>> for CmdUnparsed {
    fn from(inner: Vec<Bytes>) -> Self {
        Self { inner, start: 0 }
    }
}

/// Parses a raw command line into an argv, the way a real RESP3 decoder
/// would hand the dispatcher an already-split array of bulk strings.
pub fn split_line(line: &str) -> Vec<Bytes> {
    line.split_whitespace()
        .map(|s| Bytes::copy_from_slice(s.as_bytes()))
        .collect()
}

/// Looks up, authorizes, and executes one command line against `session`.
#[instrument(level = "debug", skip(ctx, table, session))]
pub fn dispatch(
    ctx: &AclContext,
    table: &CommandTable,
    session: &mut Session,
    argv: Vec<Bytes>,
) -> Reply {
    match dispatch_inner(ctx, table, session, argv) {
        Ok(reply) => reply,
        Err(e) => e.into_reply(),
    }
}

fn dispatch_inner(
    ctx: &AclContext,
    table: &CommandTable,
    session: &mut Session,
    argv: Vec<Bytes>,
) -> Result<Reply, CmdError> {
    if argv.is_empty() {
        return Err(Err::WrongArgNum.into());
    }

    let mut name = argv[0].to_vec();
    name.make_ascii_uppercase();
    let id = table.id_of(&name);
    let descriptor = table
        .descriptor(id)
        .ok_or(Err::UnknownCmd)?;

    authorize(Some(&session.user), descriptor, &argv).map_err(CmdError::from)?;

    let mut args: CmdUnparsed = argv.into();
    args.advance(1);

    match name.as_slice() {
        b"AUTH" => AuthCmd::parse(&mut args)?.execute(ctx, session),
        b"GET" => Get::parse(&mut args)?.execute(ctx, session),
        b"SET" => Set::parse(&mut args)?.execute(ctx, session),
        b"DEL" => Del::parse(&mut args)?.execute(ctx, session),
        b"DEBUG" => Debug::parse(&mut args)?.execute(ctx, session),
        b"ACL" => dispatch_acl(ctx, table, session, &mut args),
        _ => Err(Err::UnknownCmd.into()),
    }
}

fn dispatch_acl(
    ctx: &AclContext,
    table: &CommandTable,
    session: &mut Session,
    args: &mut CmdUnparsed,
) -> Result<Reply, CmdError> {
    let mut sub = args.next().ok_or(Err::WrongArgNum)?.to_vec();
    sub.make_ascii_uppercase();

    match sub.as_slice() {
        b"WHOAMI" => AclWhoAmI::parse(args)?.execute(ctx, session),
        b"LIST" => AclList::parse_with(args, table)?.execute(ctx, table, session),
        b"USERS" => AclUsers::parse(args)?.execute(ctx, session),
        b"GETUSER" => AclGetUser::parse_with(args, table)?.execute(ctx, table, session),
        b"SETUSER" => AclSetUser::parse_with(args, table)?.execute(ctx, table, session),
        b"DELUSER" => AclDelUser::parse(args)?.execute(ctx, session),
        b"CAT" => AclCat::parse_with(args, table)?.execute(ctx, table, session),
        b"HELP" => AclHelp::parse(args)?.execute(ctx, session),
        _ => Err(Err::UnknownCmd.into()),
    }
}
