use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use dotenvy::dotenv;
use std::env;

mod agg;
mod auth;
mod config;
mod feed;
mod follow;
mod ingestion;
mod init;
mod output;
mod store;
mod telemetry;
mod user;
mod util;

use config::ConfigFile;
use store::{PgStore, Store, User};

#[derive(Parser)]
#[command(name = "gator", version, about = "RSS feed aggregator")]
struct Cli {
    #[arg(global = true, short, long)]
    dsn: Option<String>,
    /// Act as this user instead of the one saved in the config file
    #[arg(global = true, short, long)]
    user: Option<String>,
    /// Emit a single JSON envelope to stdout; logs go to stderr
    #[arg(global = true, long, default_value_t = false)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Every verb, tagged by whether it acts on behalf of the logged-in user.
#[derive(Subcommand)]
enum Commands {
    /// Apply database migrations
    Init,
    #[command(flatten)]
    Open(OpenCmd),
    #[command(flatten)]
    Authed(AuthedCmd),
}

#[derive(Subcommand)]
enum OpenCmd {
    /// Create a user and make it current
    Register(user::RegisterCmd),
    /// Switch the current user
    Login(user::LoginCmd),
    /// List users
    Users,
    /// Delete every user with their feeds, follows and posts
    Reset(user::ResetCmd),
    /// List every registered feed
    Feeds,
    /// Poll feeds forever, oldest first
    Agg(agg::AggCmd),
}

#[derive(Subcommand)]
enum AuthedCmd {
    /// Register a feed and follow it
    Addfeed(feed::AddFeedCmd),
    /// Follow an existing feed by url
    Follow(follow::FollowCmd),
    /// Stop following a feed
    Unfollow(follow::UnfollowCmd),
    /// List the feeds you follow
    Following,
    /// Show the newest posts from the feeds you follow
    Browse(follow::BrowseCmd),
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    let cli = Cli::parse();
    telemetry::config::set_json_mode(cli.json);

    // initialize logging/tracing (stderr). Respect RUST_LOG and GATOR_LOG_FORMAT
    telemetry::config::init_tracing();

    let mut cfg = ConfigFile::load(ConfigFile::locate()?)?;
    let dsn = config::resolve_dsn(cli.dsn, env::var("DATABASE_URL").ok(), &cfg.data)?;

    let current = config::current_user_name(cli.user.as_deref(), &cfg.data).map(str::to_string);

    match cli.command {
        Commands::Init => init::run(&dsn).await,
        Commands::Open(cmd) => {
            let store = PgStore::new(init::connect(&dsn).await?);
            run_open(&store, &mut cfg, current.as_deref(), cmd).await
        }
        Commands::Authed(cmd) => {
            let store = PgStore::new(init::connect(&dsn).await?);
            let user = auth::require_user(&store, current.as_deref())
                .await
                .context("this command needs a logged-in user")?;
            run_authed(&store, &user, cmd).await
        }
    }
}

async fn run_open<S: Store>(store: &S, cfg: &mut ConfigFile, current: Option<&str>, cmd: OpenCmd) -> Result<()> {
    match cmd {
        OpenCmd::Register(args) => user::register(store, cfg, args).await,
        OpenCmd::Login(args) => user::login(store, cfg, args).await,
        OpenCmd::Users => user::users(store, current).await,
        OpenCmd::Reset(args) => user::reset(store, args).await,
        OpenCmd::Feeds => feed::ls(store).await,
        OpenCmd::Agg(args) => agg::run(store, args).await,
    }
}

async fn run_authed<S: Store>(store: &S, user: &User, cmd: AuthedCmd) -> Result<()> {
    match cmd {
        AuthedCmd::Addfeed(args) => feed::add(store, user, args).await,
        AuthedCmd::Follow(args) => follow::follow(store, user, args).await,
        AuthedCmd::Unfollow(args) => follow::unfollow(store, user, args).await,
        AuthedCmd::Following => follow::following(store, user).await,
        AuthedCmd::Browse(args) => follow::browse(store, user, args).await,
    }
}
