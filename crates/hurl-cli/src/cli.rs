use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "hurl",
    about = "hurl: browse, search and index a git-hosted package repository",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// TOML configuration file.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Path to the package repository (overrides the config file).
    #[arg(long, global = true)]
    pub repo: Option<PathBuf>,

    /// Path to the search index directory (overrides the config file).
    #[arg(long, global = true)]
    pub index: Option<PathBuf>,

    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create or rebuild the search index
    Index(IndexArgs),
    /// Keep the index in sync with change notifications
    Listen(ListenArgs),
    /// Send a change notification to a running listener
    Notify(NotifyArgs),
    /// Search the index
    Search(SearchArgs),
    /// List branches
    Branches,
    /// List packages, in one branch or across all of them
    Packages(PackagesArgs),
    /// Show the history of a branch or of one package in it
    Log(LogArgs),
    /// Start the HTTP server
    Serve(ServeArgs),
}

#[derive(Args, Debug)]
pub struct IndexArgs {
    #[command(subcommand)]
    pub action: IndexAction,
}

#[derive(Subcommand, Debug)]
pub enum IndexAction {
    /// Create an empty index
    Create,
    /// Index every package of every branch
    Repo,
    /// Index every package of one branch
    Branch { branch: String },
    /// Index the named packages of one branch
    Package {
        branch: String,
        #[arg(required = true)]
        packages: Vec<String>,
    },
}

#[derive(Args, Debug)]
pub struct ListenArgs {
    /// Notification socket (overrides the config file).
    #[arg(long)]
    pub queue: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct NotifyArgs {
    #[command(subcommand)]
    pub event: NotifyEvent,

    /// Notification socket (overrides the config file).
    #[arg(long, global = true)]
    pub queue: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum NotifyEvent {
    /// A package was added or modified (`branch/package`)
    Changed { key: String },
    /// A package was removed (`branch/package`)
    Deleted { key: String },
    /// A branch was removed
    BranchDeleted { branch: String },
}

#[derive(Args, Debug)]
pub struct SearchArgs {
    #[arg(required = true)]
    pub terms: Vec<String>,
    /// Zero-based result page.
    #[arg(long, default_value = "0")]
    pub page: usize,
}

#[derive(Args, Debug)]
pub struct PackagesArgs {
    pub branch: Option<String>,
}

#[derive(Args, Debug)]
pub struct LogArgs {
    pub branch: String,
    pub package: Option<String>,
    #[arg(short = 'n', long, default_value = "20")]
    pub limit: usize,
    #[arg(long)]
    pub oneline: bool,
}

#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Address to listen on (overrides the config file).
    #[arg(long)]
    pub bind: Option<SocketAddr>,
}
