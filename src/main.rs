mod config;
mod db;
mod job;
mod translate;

use std::path::PathBuf;

use clap::Parser;
use tracing::info;

#[derive(Parser)]
struct Args {
    #[arg(short, long, default_value = "config.json", help = "Path to the JSON job configuration")]
    config: PathBuf,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    let cfg = config::load(&args.config)?;

    let mut db = db::Database::connect(&cfg.database).await?;
    let translator = translate::Translator::new(cfg.translation_api.url.clone());

    job::run(&mut db, &translator, &cfg.translation_tables).await?;

    info!("translation run complete");
    Ok(())
}
