use std::{
    net::SocketAddr,
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::{anyhow, Context};
use axum::ServiceExt;
use forum_server::{config, create_sqlx_pool, shell, Config, PgPool, MIGRATOR};
use structopt::StructOpt;

#[derive(Debug, StructOpt)]
#[structopt(name = "forum-server", about = "Run and administrate the forum")]
struct Opt {
    /// Configuration file, offered to be created when missing
    #[structopt(short, long, parse(from_os_str))]
    config: PathBuf,

    #[structopt(subcommand)]
    cmd: Cmd,
}

#[derive(Debug, StructOpt)]
enum Cmd {
    /// Serve the forum over HTTP
    Serve {
        /// Address to listen on, overriding the configuration file
        #[structopt(long)]
        listen: Option<SocketAddr>,
    },

    /// Create or upgrade the database schema
    Initdb,

    /// Interactive administration shell
    Shell,
}

fn load_config(path: &Path) -> anyhow::Result<Config> {
    if !path.exists() {
        let stdin = std::io::stdin();
        let mut input = stdin.lock();
        let mut output = std::io::stdout();
        if config::create_interactively(path, &mut input, &mut output)?.is_none() {
            return Err(anyhow!("{} doesn't exist", path.display()));
        }
    }
    Config::load(path)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let opt = Opt::from_args();
    let config = load_config(&opt.config)?;
    let pool = create_sqlx_pool(&config.database_url).await?;

    match opt.cmd {
        Cmd::Serve { listen } => {
            let addr = listen.unwrap_or(config.listen);
            let app = forum_server::app(PgPool::new(pool), Arc::new(config))?;
            tracing::info!("listening on {}", addr);
            axum::Server::bind(&addr)
                .serve(app.into_make_service())
                .await
                .context("serving axum webserver")
        }
        Cmd::Initdb => {
            MIGRATOR
                .run(&mut *pool.acquire().await.context("acquiring migrator connection")?)
                .await
                .context("applying migrations")?;
            tracing::info!("database schema is up to date");
            Ok(())
        }
        Cmd::Shell => shell::run(&PgPool::new(pool)).await,
    }
}
