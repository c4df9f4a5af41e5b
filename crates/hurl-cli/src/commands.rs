use std::sync::Arc;

use anyhow::Context;
use colored::Colorize;
use hurl_index::{PackageIndex, SearchResult};
use hurl_listen::{Listener, Notification, SocketNotifier, SocketSource};
use hurl_repo::{package_key, LogEntry, PackageRepo};
use hurl_server::HurlServer;

use crate::cli::*;
use crate::config::HurlConfig;

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    let config = HurlConfig::resolve(&cli)?;
    match cli.command {
        Command::Index(args) => cmd_index(&config, args.action),
        Command::Listen(args) => cmd_listen(&config, args),
        Command::Notify(args) => cmd_notify(&config, args),
        Command::Search(args) => cmd_search(&config, args),
        Command::Branches => cmd_branches(&config),
        Command::Packages(args) => cmd_packages(&config, args),
        Command::Log(args) => cmd_log(&config, args),
        Command::Serve(args) => cmd_serve(&config, args),
    }
}

fn open_repo(config: &HurlConfig) -> anyhow::Result<PackageRepo> {
    PackageRepo::open(&config.repo).with_context(|| format!("opening repository {}", config.repo.display()))
}

fn open_index(config: &HurlConfig) -> PackageIndex {
    PackageIndex::open(&config.index, config.index_config())
}

fn runtime() -> anyhow::Result<tokio::runtime::Runtime> {
    Ok(tokio::runtime::Runtime::new()?)
}

fn cmd_index(config: &HurlConfig, action: IndexAction) -> anyhow::Result<()> {
    let index = open_index(config);
    let indexed = match action {
        IndexAction::Create => {
            if index.create()? {
                println!("{} Created index in {}", "✓".green().bold(), config.index.display().to_string().bold());
            } else {
                println!("Index already exists in {}", config.index.display().to_string().bold());
            }
            return Ok(());
        }
        IndexAction::Repo => index.index_repo(&open_repo(config)?)?,
        IndexAction::Branch { branch } => index.index_branch(&open_repo(config)?, &branch)?,
        IndexAction::Package { branch, packages } => {
            let repo = open_repo(config)?;
            let mut count = 0;
            for package in &packages {
                if index.index_package(&repo, &branch, package)? {
                    count += 1;
                } else {
                    println!("  {} {}", "skipped:".yellow(), package_key(&branch, package));
                }
            }
            count
        }
    };
    index.flush()?;
    println!("{} Indexed {} package(s)", "✓".green().bold(), indexed.to_string().bold());
    Ok(())
}

fn cmd_listen(config: &HurlConfig, args: ListenArgs) -> anyhow::Result<()> {
    let queue = args.queue.unwrap_or_else(|| config.queue.clone());
    let listener = Listener::new(open_repo(config)?, Arc::new(open_index(config)));
    listener.ensure_index()?;
    runtime()?.block_on(async move {
        let mut source = SocketSource::bind(&queue)?;
        tokio::select! {
            result = listener.run(&mut source) => result?,
            _ = tokio::signal::ctrl_c() => tracing::info!("interrupted; listener stopping"),
        }
        Ok::<(), anyhow::Error>(())
    })
}

fn cmd_notify(config: &HurlConfig, args: NotifyArgs) -> anyhow::Result<()> {
    let queue = args.queue.unwrap_or_else(|| config.queue.clone());
    let notification = match args.event {
        NotifyEvent::Changed { key } => split_key(&key).map(|(b, p)| Notification::changed(b, p))?,
        NotifyEvent::Deleted { key } => split_key(&key).map(|(b, p)| Notification::deleted(b, p))?,
        NotifyEvent::BranchDeleted { branch } => Notification::branch_deleted(branch),
    };
    let notifier = SocketNotifier::new(queue);
    runtime()?.block_on(notifier.send(&notification))?;
    println!("{} Sent {}", "✓".green(), notification.to_string().cyan());
    Ok(())
}

fn split_key(key: &str) -> anyhow::Result<(&str, &str)> {
    hurl_repo::split_package_key(key.trim())
        .with_context(|| format!("expected branch/package, got {key:?}"))
}

fn cmd_search(config: &HurlConfig, args: SearchArgs) -> anyhow::Result<()> {
    let index = open_index(config);
    let query = args.terms.join(" ");
    let found = index.search_page(&query, args.page)?;
    let approx = if found.exact { "" } else { "about " };
    println!("{}{} result(s) for {}", approx, found.count.to_string().bold(), query.yellow());
    for result in &found.results {
        print_result(result);
    }
    if found.has_next_page() {
        println!("{}", format!("more: --page {}", found.page + 1).dimmed());
    }
    Ok(())
}

fn print_result(result: &SearchResult) {
    let version = match (&result.version, &result.release) {
        (Some(v), Some(r)) => format!("{v}-{r}"),
        (Some(v), None) => v.clone(),
        _ => String::new(),
    };
    let name = result.name.as_deref().unwrap_or(&result.package);
    println!("{} {} {}", name.bold(), version.green(), format!("({})", result.branch).dimmed());
    if let Some(description) = &result.description {
        println!("    {description}");
    }
}

fn cmd_branches(config: &HurlConfig) -> anyhow::Result<()> {
    let repo = open_repo(config)?;
    for branch in repo.list_branches()? {
        println!("{}", branch.yellow());
    }
    Ok(())
}

fn cmd_packages(config: &HurlConfig, args: PackagesArgs) -> anyhow::Result<()> {
    let repo = open_repo(config)?;
    match args.branch {
        Some(branch) => {
            let packages = repo
                .packages_in_branch(&branch)?
                .with_context(|| format!("no branch named {branch}"))?;
            for package in packages {
                println!("{package}");
            }
        }
        None => {
            for (package, branches) in repo.all_packages()? {
                println!("{} {}", package.bold(), branches.join(" ").dimmed());
            }
        }
    }
    Ok(())
}

fn cmd_log(config: &HurlConfig, args: LogArgs) -> anyhow::Result<()> {
    let repo = open_repo(config)?;
    let what = match &args.package {
        Some(package) => package_key(&args.branch, package),
        None => args.branch.clone(),
    };
    let log = repo
        .package_log(&args.branch, args.package.as_deref())?
        .with_context(|| format!("no branch named {}", args.branch))?;
    if log.is_empty() {
        println!("No history for {}", what.yellow());
    }
    for entry in log.iter().take(args.limit) {
        print_entry(entry, args.oneline);
    }
    Ok(())
}

fn print_entry(entry: &LogEntry, oneline: bool) {
    if oneline {
        let short: String = entry.commit.chars().take(10).collect();
        println!("{} {}", short.yellow(), entry.summary());
        return;
    }
    println!("{} {}", "commit".yellow(), entry.commit.yellow());
    println!("Author: {}", entry.author);
    if let Some(date) = entry.date {
        let tz = entry.timezone.as_deref().unwrap_or("");
        println!("Date:   {} {}", date.format("%Y-%m-%d %H:%M:%S"), tz);
    }
    println!();
    for line in entry.message.lines() {
        println!("    {line}");
    }
    println!();
}

fn cmd_serve(config: &HurlConfig, args: ServeArgs) -> anyhow::Result<()> {
    let mut server_config = config.server_config();
    if let Some(bind) = args.bind {
        server_config.bind_addr = bind;
    }
    let server = HurlServer::new(server_config, open_repo(config)?, Arc::new(open_index(config)));
    println!("hurl server on {} (repo: {})", server.config().bind_addr.to_string().bold(), config.repo.display());
    runtime()?.block_on(server.serve())?;
    Ok(())
}
