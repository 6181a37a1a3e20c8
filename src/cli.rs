use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

use newsdesk::banner::{self, Placement};
use newsdesk::category::CategoryRegistry;
use newsdesk::content::{ContentKind, ContentRecord, ModerationStatus};
use newsdesk::import::{FetchOutcome, ImportLimit, ImportSource, Staged};
use newsdesk::types::ListQuery;
use newsdesk::Newsdesk;

/// Operator tool for the content platform
#[derive(Parser)]
#[command(name = "newsdesk")]
#[command(about = "Manage content records, bulk imports and banners", long_about = None)]
pub struct Cli {
    /// Path to a newsdesk.toml config file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start an admin session with the shared secret
    Login {
        #[arg(long)]
        secret: String,
    },
    /// End the admin session
    Logout,
    /// Show the current session
    Whoami,
    /// List records of one content kind
    List {
        kind: ContentKind,
        #[arg(long)]
        status: Option<ModerationStatus>,
        #[arg(long)]
        category: Option<String>,
        #[arg(long)]
        limit: Option<u32>,
    },
    /// Show one record
    Show { kind: ContentKind, id: i64 },
    /// Delete one record (images, links and tags go with it)
    Delete { kind: ContentKind, id: i64 },
    /// Overview of every section plus status counts
    Dashboard,
    /// List categories
    Categories,
    /// Show banners grouped by zone, highest priority first
    Banners {
        #[arg(long)]
        placement: Option<Placement>,
        /// Only banners a page would actually render
        #[arg(long)]
        active_only: bool,
    },
    /// Fetch candidates from a feed and publish a selection of them
    Import {
        #[arg(long, default_value_t = ImportSource::Rss)]
        source: ImportSource,
        #[arg(long, default_value_t = 20)]
        limit: u32,
        /// Comma-separated candidate indices to publish
        #[arg(long, value_delimiter = ',', conflicts_with = "all")]
        select: Vec<usize>,
        /// Publish every candidate
        #[arg(long)]
        all: bool,
    },
}

impl Commands {
    pub fn needs_session(&self) -> bool {
        !matches!(self, Commands::Login { .. })
    }
}

pub async fn run(desk: &Newsdesk, command: Commands) -> Result<()> {
    match command {
        Commands::Login { secret } => {
            let session = desk.login(&secret).await?;
            println!("logged in, session valid for {}s", session.expires_at - session.issued_at);
        }
        Commands::Logout => {
            if desk.logout().await? {
                println!("logged out");
            }
        }
        Commands::Whoami => {
            let session = desk.require_session().await?;
            println!("admin session {} (issued {}, expires {})", session.token, session.issued_at, session.expires_at);
        }
        Commands::List { kind, status, category, limit } => {
            let query = ListQuery { status, category, limit, offset: None };
            let records = desk.list(kind, &query).await?;
            for r in &records {
                print_row(r);
            }
            println!("{} {kind}", records.len());
        }
        Commands::Show { kind, id } => {
            let r = desk.get(kind, id).await?;
            print_record(&r);
        }
        Commands::Delete { kind, id } => {
            desk.delete(kind, id).await?;
            println!("deleted {kind} #{id}");
        }
        Commands::Dashboard => {
            let dash = desk.dashboard().await?;
            for kind in ContentKind::ALL {
                println!("{:<16}{}", kind.resource(), dash.records(kind).len());
            }
            println!("{:<16}{}", "categories", dash.categories.len());
            if !dash.degraded.is_empty() {
                println!("unavailable: {}", dash.degraded.join(", "));
            }
            match desk.stats().await {
                Ok(stats) => {
                    println!("total news: {}", stats.total);
                    for s in &stats.by_status {
                        println!("  {:<12}{}", s.moderation_status.as_str(), s.count);
                    }
                }
                Err(e) => println!("stats unavailable: {e}"),
            }
        }
        Commands::Categories => {
            let registry = CategoryRegistry::new(desk.categories().await?);
            for c in registry.sorted() {
                let icon = c.icon.as_deref().unwrap_or("");
                println!("{:<16}{:<24}{:<10}{icon}", c.code, c.label, c.color);
            }
        }
        Commands::Banners { placement, active_only } => {
            let pool = desk.banners(placement).await?;
            for (zone, resolved) in banner::group_by_placement(&pool) {
                if placement.is_some_and(|p| p != zone) {
                    continue;
                }
                println!("{zone}");
                if active_only {
                    for (b, _) in banner::renderable(resolved) {
                        println!("  [{:>3}] {}", b.priority, b.title);
                    }
                } else {
                    for b in resolved {
                        let mut flags = String::new();
                        if !b.is_active { flags.push_str(" (inactive)"); }
                        if b.creative().is_none() { flags.push_str(" (incomplete)"); }
                        println!("  [{:>3}] {}{flags}", b.priority, b.title);
                    }
                }
            }
        }
        Commands::Import { source, limit, select, all } => {
            let limit = ImportLimit::new(limit)?;
            if let FetchOutcome::Staged(n) = desk.import(source, limit).await? {
                println!("{n} candidates from {source}");
            }
            if all {
                desk.pipeline().toggle_all()?;
            } else if !select.is_empty() {
                desk.pipeline().select(select)?;
            } else {
                if let Some(staged) = desk.pipeline().staged() {
                    print_candidates(&staged);
                }
                println!("nothing selected; rerun with --select or --all to publish");
                return Ok(());
            }
            let report = desk.commit_import().await?;
            for f in report.failures() {
                if let Err(e) = &f.result {
                    println!("  #{} {}: {e}", f.index, f.title);
                }
            }
            println!("{report}");
        }
    }
    Ok(())
}

fn print_row(r: &ContentRecord) {
    let id = r.id.map(|i| i.to_string()).unwrap_or_default();
    println!("{id:>6}  {:<10} {:<14} {}", r.moderation_status.as_str(), r.category_code, r.title);
}

fn print_record(r: &ContentRecord) {
    print_row(r);
    if !r.time_label.is_empty() { println!("time:     {}", r.time_label); }
    if let Some(a) = &r.author { println!("author:   {a}"); }
    if let Some(d) = &r.description { println!("summary:  {d}"); }
    println!("priority: {}  views: {}", r.priority, r.views);
    for img in &r.images {
        println!("image {}:  {} {}", img.position, img.image_url, img.caption);
    }
    for link in &r.links {
        println!("link {}:   {} <{}>", link.position, link.title, link.url);
    }
    if !r.tags.is_empty() {
        let tags: Vec<&str> = r.tags.iter().map(String::as_str).collect();
        println!("tags:     {}", tags.join(", "));
    }
}

fn print_candidates(staged: &Staged) {
    for (i, c) in staged.candidates().iter().enumerate() {
        println!("{i:>3}  {:<14} {}", c.category_code, c.title);
    }
}
