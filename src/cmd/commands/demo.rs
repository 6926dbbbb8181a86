//! Toy GET/SET/DEL/DEBUG commands. They exist only so authorization (§4.G)
//! has real keyed and unkeyed commands to run against; the storage model
//! itself is intentionally a single `DashMap`, not a real database engine.

use crate::{
    cmd::{CmdError, CmdExecutor, CmdUnparsed, Err, Reply, Session},
    context::AclContext,
};
use bytes::Bytes;
use dashmap::DashMap;
use std::time::Duration;

#[derive(Default)]
pub struct Store {
    inner: DashMap<Bytes, Bytes>,
}

#[derive(Debug)]
pub struct Get {
    pub key: Bytes,
}

impl CmdExecutor for Get {
    const NAME: &'static str = "GET";

    fn parse(args: &mut CmdUnparsed) -> Result<Self, CmdError> {
        if args.len() != 1 {
            return Err(Err::WrongArgNum.into());
        }
        Ok(Get {
            key: args.next().unwrap(),
        })
    }

    fn execute(self, _ctx: &AclContext, session: &mut Session) -> Result<Reply, CmdError> {
        Ok(match session.store.inner.get(&self.key) {
            Some(v) => Reply::Bulk(v.clone()),
            None => Reply::Null,
        })
    }
}

#[derive(Debug)]
pub struct Set {
    pub key: Bytes,
    pub value: Bytes,
}

impl CmdExecutor for Set {
    const NAME: &'static str = "SET";

    fn parse(args: &mut CmdUnparsed) -> Result<Self, CmdError> {
        if args.len() != 2 {
            return Err(Err::WrongArgNum.into());
        }
        let key = args.next().unwrap();
        let value = args.next().unwrap();
        Ok(Set { key, value })
    }

    fn execute(self, _ctx: &AclContext, session: &mut Session) -> Result<Reply, CmdError> {
        session.store.inner.insert(self.key, self.value);
        Ok(Reply::Simple("OK".into()))
    }
}

#[derive(Debug)]
pub struct Del {
    pub keys: Vec<Bytes>,
}

impl CmdExecutor for Del {
    const NAME: &'static str = "DEL";

    fn parse(args: &mut CmdUnparsed) -> Result<Self, CmdError> {
        if args.is_empty() {
            return Err(Err::WrongArgNum.into());
        }
        Ok(Del {
            keys: args.collect(),
        })
    }

    fn execute(self, _ctx: &AclContext, session: &mut Session) -> Result<Reply, CmdError> {
        let mut count = 0i64;
        for key in &self.keys {
            if session.store.inner.remove(key).is_some() {
                count += 1;
            }
        }
        Ok(Reply::Integer(count))
    }
}

/// `DEBUG SLEEP <seconds>` and `DEBUG OBJECT <key>`, standing in for the
/// admin-category, subcommand-scoped command shape §4.G's `+cmd|sub` rule
/// targets.
#[derive(Debug)]
pub enum Debug {
    Sleep(f64),
    Object(Bytes),
}

impl CmdExecutor for Debug {
    const NAME: &'static str = "DEBUG";

    fn parse(args: &mut CmdUnparsed) -> Result<Self, CmdError> {
        let mut sub = args.next().ok_or(Err::WrongArgNum)?.to_vec();
        sub.make_ascii_uppercase();

        match sub.as_slice() {
            b"SLEEP" => {
                let secs = args.next().ok_or(Err::WrongArgNum)?;
                let secs: f64 = std::str::from_utf8(&secs)
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .ok_or(Err::WrongArgNum)?;
                Ok(Debug::Sleep(secs))
            }
            b"OBJECT" => {
                let key = args.next().ok_or(Err::WrongArgNum)?;
                Ok(Debug::Object(key))
            }
            _ => Err(Err::UnknownCmd.into()),
        }
    }

    fn execute(self, _ctx: &AclContext, session: &mut Session) -> Result<Reply, CmdError> {
        match self {
            Debug::Sleep(secs) => {
                std::thread::sleep(Duration::from_secs_f64(secs));
                Ok(Reply::Simple("OK".into()))
            }
            Debug::Object(key) => match session.store.inner.get(&key) {
                Some(v) => Ok(Reply::Simple(format!("value_len:{}", v.len()))),
                None => Err(Err::WrongArgNum.into()),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cmd::Session;

    #[test]
    fn set_then_get_roundtrips() {
        let ctx = AclContext::new();
        let mut session = Session::new(&ctx);

        Set {
            key: Bytes::from_static(b"k"),
            value: Bytes::from_static(b"v"),
        }
        .execute(&ctx, &mut session)
        .unwrap();

        let resp = Get {
            key: Bytes::from_static(b"k"),
        }
        .execute(&ctx, &mut session)
        .unwrap();
        assert_eq!(resp, Reply::Bulk(Bytes::from_static(b"v")));
    }

    #[test]
    fn get_missing_key_is_null() {
        let ctx = AclContext::new();
        let mut session = Session::new(&ctx);
        let resp = Get {
            key: Bytes::from_static(b"missing"),
        }
        .execute(&ctx, &mut session)
        .unwrap();
        assert_eq!(resp, Reply::Null);
    }

    #[test]
    fn del_counts_only_existing_keys() {
        let ctx = AclContext::new();
        let mut session = Session::new(&ctx);
        Set {
            key: Bytes::from_static(b"k"),
            value: Bytes::from_static(b"v"),
        }
        .execute(&ctx, &mut session)
        .unwrap();

        let resp = Del {
            keys: vec![Bytes::from_static(b"k"), Bytes::from_static(b"ghost")],
        }
        .execute(&ctx, &mut session)
        .unwrap();
        assert_eq!(resp, Reply::Integer(1));
    }

    #[test]
    fn debug_sleep_parses_seconds() {
        let mut args = CmdUnparsed::from(["SLEEP", "0"].as_ref());
        let cmd = Debug::parse(&mut args).unwrap();
        assert!(matches!(cmd, Debug::Sleep(secs) if secs == 0.0));
    }

    #[test]
    fn debug_object_rejects_missing_key() {
        let ctx = AclContext::new();
        let mut session = Session::new(&ctx);
        let err = Debug::Object(Bytes::from_static(b"missing"))
            .execute(&ctx, &mut session)
            .unwrap_err();
        assert!(matches!(err, CmdError::Harness(Err::WrongArgNum)));
    }
}
