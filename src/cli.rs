use clap::Parser;

#[derive(Parser)]
pub struct Cli {
    #[clap(long)]
    pub acl_file: Option<String>,
    #[clap(long)]
    pub requirepass: Option<String>,
}
