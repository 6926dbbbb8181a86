use crate::{
    auth::authenticate,
    cmd::{CmdError, CmdExecutor, CmdUnparsed, Err, Reply, Session},
    context::AclContext,
    registry::DEFAULT_USER,
};
use bytes::Bytes;

/// `AUTH <password>` authenticates as `default`; `AUTH <user> <pass>`
/// authenticates as the named user (§6).
#[derive(Debug)]
pub struct AuthCmd {
    pub username: Bytes,
    pub password: Bytes,
}

impl CmdExecutor for AuthCmd {
    const NAME: &'static str = "AUTH";

    fn parse(args: &mut CmdUnparsed) -> Result<Self, CmdError> {
        match args.len() {
            1 => Ok(AuthCmd {
                username: Bytes::from_static(DEFAULT_USER),
                password: args.next().unwrap(),
            }),
            2 => {
                let username = args.next().unwrap();
                let password = args.next().unwrap();
                Ok(AuthCmd { username, password })
            }
            _ => Err(Err::WrongArgNum.into()),
        }
    }

    fn execute(self, ctx: &AclContext, session: &mut Session) -> Result<Reply, CmdError> {
        let user = authenticate(&ctx.registry, &self.username, &self.password)?;
        session.user = user;
        Ok(Reply::Simple("OK".into()))
    }
}
