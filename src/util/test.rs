use crate::{cmd::commands::CommandTable, context::AclContext};
use std::sync::Once;
use tracing::Level;

pub fn bytes_to_string(bytes: &[u8]) -> String {
    String::from_utf8(bytes.to_vec()).unwrap()
}

pub const TEST_USERNAME: &str = "test_user";
pub const TEST_PASSWORD: &str = "test_pwd";

pub fn test_init() {
    static INIT: Once = Once::new();

    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_max_level(Level::DEBUG)
            .try_init();
    });
}

/// A fresh `AclContext` plus a populated `test_user` account, for tests that
/// want something other than `default` to authenticate and authorize as.
pub fn gen_test_context() -> (AclContext, CommandTable) {
    let ctx = AclContext::new();
    let table = CommandTable::new();

    ctx.registry
        .set_user(
            TEST_USERNAME.as_bytes(),
            &[
                bytes::Bytes::from_static(b"on"),
                bytes::Bytes::from(format!(">{TEST_PASSWORD}")),
                bytes::Bytes::from_static(b"allcommands"),
                bytes::Bytes::from_static(b"allkeys"),
            ],
            &table,
        )
        .expect("test_user setup must succeed");

    (ctx, table)
}
