//! §13: the harness's own error layer, sitting above `AclError`. Unlike the
//! library error type this one knows about wire-facing reply tokens, because
//! rendering those tokens is a dispatch concern, not an ACL-core one.

use crate::error::AclError;
use bytes::Bytes;
use snafu::Snafu;

#[derive(Debug, Snafu, Clone, PartialEq, Eq)]
pub enum Err {
    #[snafu(display("ERR unknown command"))]
    UnknownCmd,
    #[snafu(display("ERR wrong number of arguments"))]
    WrongArgNum,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CmdError {
    Acl(AclError),
    Harness(Err),
}

impl From<AclError> for CmdError {
    fn from(e: AclError) -> Self {
        CmdError::Acl(e)
    }
}

impl From<Err> for CmdError {
    fn from(e: Err) -> Self {
        CmdError::Harness(e)
    }
}

impl CmdError {
    /// Maps onto the reply tokens used by the real wire protocol this
    /// harness stands in for (§6): `WRONGPASS`, `NOPERM ... command`,
    /// `NOPERM ... key`.
    pub fn into_reply(self) -> Reply {
        match self {
            CmdError::Acl(AclError::BadCredentials) | CmdError::Acl(AclError::NoSuchUser) => {
                Reply::Error("WRONGPASS invalid username-password pair".into())
            }
            CmdError::Acl(AclError::DeniedCommand { cmd }) => Reply::Error(format!(
                "NOPERM this user has no permissions to run the '{}' command",
                String::from_utf8_lossy(&cmd)
            )),
            CmdError::Acl(AclError::DeniedKey) => Reply::Error(
                "NOPERM this user has no permissions to access one of the keys used as arguments"
                    .to_string(),
            ),
            // Administrative errors (syntax_error, protected_user, name_not_found, ...) are
            // reported verbatim to the admin command that raised them (§6/§7) via their own
            // Display impl, not Debug.
            CmdError::Acl(e) => Reply::Error(e.to_string()),
            CmdError::Harness(e) => Reply::Error(e.to_string()),
        }
    }
}

/// A stand-in for a RESP3 reply, just rich enough for the handful of demo
/// commands and the ACL/AUTH admin surface to express their results.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Simple(String),
    Bulk(Bytes),
    Error(String),
    Integer(i64),
    Array(Vec<Reply>),
    Null,
}
