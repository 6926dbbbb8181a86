use bytes::Bytes;
use snafu::Snafu;
use tracing::warn;

pub type AclResult<T> = Result<T, AclError>;

/// Error surface of the ACL core (§4-§7 of the design). Every fallible operation
/// in this crate returns one of these variants; none are retried internally.
#[derive(Debug, Snafu, Clone, PartialEq, Eq)]
#[snafu(visibility(pub(crate)))]
pub enum AclError {
    #[snafu(display("user '{name:?}' already exists"))]
    NameExists { name: Bytes },

    #[snafu(display("user '{name:?}' not found"))]
    NameNotFound { name: Bytes },

    #[snafu(display("the 'default' user cannot be removed"))]
    ProtectedUser,

    #[snafu(display(
        "Syntax error in ACL SETUSER modifier '{}'",
        String::from_utf8_lossy(rule)
    ))]
    SyntaxError { rule: Bytes },

    #[snafu(display("unknown command category '{category:?}'"))]
    UnknownCategory { category: Bytes },

    NoSuchUser,

    BadCredentials,

    DeniedCommand { cmd: Bytes },

    DeniedKey,

    /// `nextid` has grown past `MAX_COMMAND_ID`; collapses to `DeniedCommand`
    /// at the authorizer per §4.A, but is a distinct kind so the condition can
    /// be logged once at the point it is first observed.
    IdOverflow { id: u32 },
}

impl AclError {
    pub fn log_if_overflow(&self) {
        if let AclError::IdOverflow { id } = self {
            warn!(id, "command id registry exceeded MAX_COMMAND_ID");
        }
    }
}
