//! CLI smoke and ops entry point.
//!
//! # Responsibility
//! - Verify `watchlist_core` linkage with a deterministic ping when run
//!   without a subcommand.
//! - Offer read-only inspection of a database file for operators.

use clap::{Parser, Subcommand};
use log::info;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;
use std::process::ExitCode;
use watchlist_core::{
    default_log_level, open_db, AccessResolver, ConfigError, CoreConfig, DbError, InviteError,
    InviteService, NotificationService, UserId,
};

#[derive(Parser)]
#[command(name = "watchlist_cli")]
#[command(about = "Watchlist invitation core inspection tool")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    /// TOML file overriding core defaults
    #[arg(long, short = 'c', global = true)]
    config: Option<PathBuf>,

    /// Absolute directory for rolling log files
    #[arg(long, global = true)]
    log_dir: Option<String>,
}

#[derive(Subcommand)]
enum Command {
    /// Count a user's unread alerts
    Unread { db: PathBuf, user_id: UserId },
    /// List invites waiting on a user
    Pending { db: PathBuf, user_id: UserId },
    /// Search users visible to a caller
    Search {
        db: PathBuf,
        user_id: UserId,
        query: String,
    },
}

#[derive(Debug)]
enum CliError {
    Db(DbError),
    Config(ConfigError),
    Invite(InviteError),
}

impl Display for CliError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "database: {err}"),
            Self::Config(err) => write!(f, "{err}"),
            Self::Invite(err) => write!(f, "{err}"),
        }
    }
}

impl From<DbError> for CliError {
    fn from(err: DbError) -> Self {
        Self::Db(err)
    }
}

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        Self::Config(err)
    }
}

impl From<InviteError> for CliError {
    fn from(err: InviteError) -> Self {
        Self::Invite(err)
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    if let Some(log_dir) = &cli.log_dir {
        if let Err(err) = watchlist_core::init_logging(default_log_level(), log_dir) {
            eprintln!("logging disabled: {err}");
        }
    }

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), CliError> {
    let config = match &cli.config {
        Some(path) => CoreConfig::load(path)?,
        None => CoreConfig::default(),
    };

    match cli.command {
        None => {
            println!("watchlist_core ping={}", watchlist_core::ping());
            println!("watchlist_core version={}", watchlist_core::core_version());
        }
        Some(Command::Unread { db, user_id }) => {
            let conn = open_db(&db)?;
            let count = NotificationService::new(&conn).unread_count(user_id)?;
            println!("unread={count}");
        }
        Some(Command::Pending { db, user_id }) => {
            let conn = open_db(&db)?;
            let invites = InviteService::new(&conn, config.invite)?.list_pending_for(user_id)?;
            for invite in &invites {
                println!(
                    "id={} kind={} inviter={} expires_at={}",
                    invite.id,
                    invite.kind().as_str(),
                    invite.inviter_id,
                    invite
                        .expires_at
                        .map_or_else(|| "never".to_string(), |at| at.to_string())
                );
            }
            info!("event=cli_pending module=cli status=ok count={}", invites.len());
        }
        Some(Command::Search { db, user_id, query }) => {
            let conn = open_db(&db)?;
            let matches = AccessResolver::new(&conn, config.search).search_users(user_id, &query)?;
            for user in matches {
                println!(
                    "id={} name={} handle={}",
                    user.id,
                    user.display_name,
                    user.handle.as_deref().unwrap_or("-")
                );
            }
        }
    }
    Ok(())
}
