use std::io::{self, BufRead, Write};
use wardkv::{
    cmd::{commands::CommandTable, dispatch, split_line, Session},
    conf::Conf,
    context::AclContext,
    init,
};

fn main() -> anyhow::Result<()> {
    let conf = Conf::new()?;
    init(&std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()));

    let ctx = AclContext::new();
    let table = CommandTable::new();
    conf.security.apply_startup(&ctx, &table)?;

    let mut session = Session::new(&ctx);

    let stdin = io::stdin();
    print!("> ");
    io::stdout().flush().ok();
    for line in stdin.lock().lines() {
        let line = line?;
        if line.trim().is_empty() {
            print!("> ");
            io::stdout().flush().ok();
            continue;
        }

        let argv = split_line(&line);
        let reply = dispatch(&ctx, &table, &mut session, argv);
        println!("{reply:?}");

        print!("> ");
        io::stdout().flush().ok();
    }

    Ok(())
}
