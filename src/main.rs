use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use chrono::{DateTime, Local, Utc};
use clap::{Parser, Subcommand};
use colored::{Color, Colorize};
use serde_json::json;
use thread_inbox::config::{Deployment, InboxConfig};
use thread_inbox::logging::{self, LogConfig};
use thread_inbox::poll::spawn_poller;
use thread_inbox::threads::{ColorToken, DraftOptions, classify, format_time};
use thread_inbox::{
    AgentDirectory, AgentRef, AgentScope, HttpThreadSource, ListView, QueryConfig,
    RevalidationBridge, StableCallback, StatusFilter, ThreadFilter, ThreadPager, ThreadStatus,
    ThreadSummary, agent_summaries,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Rows fetched for the pinned "Requiring Attention" list.
const PINNED_ATTENTION_LIMIT: usize = 5;
/// Assistants fetched per deployment.
const AGENT_LIMIT: usize = 100;
/// How often watch mode checks for changed pages.
const WATCH_RENDER_INTERVAL: Duration = Duration::from_secs(2);

// ── CLI ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Parser)]
#[command(
    name = "thread-inbox",
    version,
    about = "Inbox of agent threads on a LangGraph-style deployment"
)]
struct Cli {
    /// Path to config file
    #[arg(long, value_name = "PATH", global = true)]
    config: Option<PathBuf>,
    /// Deployment id from the config
    #[arg(long, short, value_name = "ID", global = true)]
    deployment: Option<String>,
    /// API token (sent as a bearer credential)
    #[arg(long, env = "THREAD_INBOX_TOKEN", hide_env_values = true, global = true)]
    token: Option<String>,
    /// Output JSON
    #[arg(long, global = true)]
    json: bool,
    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,
    /// Verbose logging
    #[arg(long, short, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// List threads grouped by attention and age (default)
    List(ListArgs),
    /// One card per agent: latest thread and interrupted count
    Agents,
    /// Write a config file with one deployment
    Init(InitArgs),
}

#[derive(Debug, clap::Args)]
struct InitArgs {
    /// Deployment base URL
    #[arg(long)]
    url: String,
    /// Deployment id
    #[arg(long, default_value = "default")]
    id: String,
    /// Display name
    #[arg(long)]
    name: Option<String>,
    /// Overwrite an existing config file
    #[arg(long)]
    force: bool,
}

#[derive(Debug, Default, clap::Args)]
struct ListArgs {
    /// Only threads of this assistant
    #[arg(long, short, value_name = "ASSISTANT_ID")]
    agent: Option<String>,
    /// Status filter: all, idle, busy, interrupted, error
    #[arg(long, short, default_value_t = StatusFilter::All)]
    status: StatusFilter,
    /// Number of pages to load
    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..))]
    pages: u32,
    /// Show a draft row for the selected agent
    #[arg(long, requires = "agent")]
    draft: bool,
    /// Thread currently open; hides the draft row
    #[arg(long, value_name = "THREAD_ID")]
    thread: Option<String>,
    /// Keep running, refreshing in the background. Press Enter to refresh now.
    #[arg(long, short)]
    watch: bool,
}

// ── Main ────────────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.no_color {
        colored::control::set_override(false);
    }
    let mut log_config = LogConfig::from_env().with_ansi(!cli.no_color);
    if cli.verbose {
        log_config = log_config.verbose();
    }
    logging::init(log_config);

    if let Some(Command::Init(args)) = &cli.command {
        return run_init(cli.config.clone(), args);
    }

    let config = InboxConfig::load(cli.config.clone())?;
    let deployment = config.deployment(cli.deployment.as_deref())?;
    let source = Arc::new(
        HttpThreadSource::for_deployment(deployment, cli.token.clone(), config.request_timeout())
            .with_context(|| format!("failed to set up deployment {}", deployment.id))?,
    );
    info!(deployment = %deployment.id, url = %source.base_url(), "using deployment");

    let agents = source
        .search_assistants(config.default_graph_id.as_deref(), AGENT_LIMIT)
        .await
        .context("failed to load agents")?
        .into_iter()
        .map(|mut agent: AgentRef| {
            agent.deployment_id = deployment.id.clone();
            agent
        });
    let directory = Arc::new(AgentDirectory::for_deployment(agents, &deployment.id));
    debug!(agents = directory.len(), "agent directory loaded");

    match cli.command {
        Some(Command::Agents) => run_agents(source, &directory, cli.json).await,
        Some(Command::List(ref args)) => run_list(source, directory, &config, args, cli.json).await,
        None => run_list(source, directory, &config, &ListArgs::default(), cli.json).await,
        Some(Command::Init(_)) => Ok(()),
    }
}

// ── init ────────────────────────────────────────────────────────────────────

fn run_init(path: Option<PathBuf>, args: &InitArgs) -> Result<()> {
    let target = path.unwrap_or_else(InboxConfig::default_path);
    if target.exists() && !args.force {
        bail!(
            "{} already exists; pass --force to overwrite",
            target.display()
        );
    }

    let config = InboxConfig::with_deployment(Deployment {
        id: args.id.clone(),
        url: args.url.clone(),
        name: args.name.clone(),
    });
    config
        .save(Some(target.clone()))
        .with_context(|| format!("failed to write {}", target.display()))?;
    println!("Wrote {}", target.display());
    Ok(())
}

// ── list ────────────────────────────────────────────────────────────────────

async fn run_list(
    source: Arc<HttpThreadSource>,
    directory: Arc<AgentDirectory>,
    config: &InboxConfig,
    args: &ListArgs,
    json: bool,
) -> Result<()> {
    let scope = match &args.agent {
        Some(id) => {
            if directory.get(id).is_none() {
                debug!(assistant_id = %id, "agent not in directory; listing anyway");
            }
            AgentScope::Agent(id.clone())
        }
        None => AgentScope::AllAgents,
    };
    let filter = ThreadFilter::new(args.status, scope.clone());
    let pager = ThreadPager::new(
        source.clone(),
        directory.clone(),
        config.query_config(),
        filter,
    );

    // The all-status view pins the newest interrupted threads on top.
    let pinned = (args.status == StatusFilter::All).then(|| {
        ThreadPager::new(
            source.clone(),
            directory.clone(),
            QueryConfig {
                page_size: PINNED_ATTENTION_LIMIT,
                ..config.query_config()
            },
            ThreadFilter::new(StatusFilter::Interrupted, scope),
        )
    });

    let selected_agent = args.agent.as_deref().and_then(|id| directory.get(id));
    let draft = DraftOptions {
        show_draft: args.draft,
        current_thread_id: args.thread.as_deref(),
        agent: selected_agent,
    };

    // Fetch failures are kept in the pager and rendered as its error state.
    let _ = pager.set_size(args.pages.max(1) as usize).await;
    if let Some(pinned) = &pinned {
        // A failed pin only costs the pinned rows.
        if let Err(e) = pinned.load().await {
            warn!(error = %e, "failed to load interrupted threads");
        }
    }

    render_list(&pager, pinned.as_ref(), &draft, json)?;
    if !args.watch {
        if let Some(err) = pager.error() {
            bail!(err);
        }
        return Ok(());
    }

    watch_list(&pager, pinned.as_ref(), &draft, config, json).await
}

async fn watch_list(
    pager: &ThreadPager,
    pinned: Option<&ThreadPager>,
    draft: &DraftOptions<'_>,
    config: &InboxConfig,
    json: bool,
) -> Result<()> {
    let cancel = CancellationToken::new();
    let mut pollers = vec![spawn_poller(
        pager.clone(),
        config.poll_interval(),
        cancel.clone(),
    )];
    if let Some(pinned) = pinned {
        pollers.push(spawn_poller(
            pinned.clone(),
            config.poll_interval(),
            cancel.clone(),
        ));
    }

    let refresh = StableCallback::new(pager.revalidator());
    let bridge = RevalidationBridge::new();
    bridge.register(refresh.clone());
    if let Some(pinned) = pinned {
        let main = pager.revalidator();
        let pin = pinned.revalidator();
        refresh.update(move || {
            main();
            pin();
        });
    }

    let mut stdin = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;
    let mut shown = snapshot(pager, pinned);
    let mut ticker = tokio::time::interval(WATCH_RENDER_INTERVAL);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            line = stdin.next_line(), if stdin_open => match line {
                Ok(Some(_)) => bridge.revalidate(),
                // stdin closed; keep polling
                Ok(None) | Err(_) => stdin_open = false,
            },
            _ = ticker.tick() => {
                let current = snapshot(pager, pinned);
                if current != shown {
                    render_list(pager, pinned, draft, json)?;
                    shown = current;
                }
            }
        }
    }

    cancel.cancel();
    for poller in pollers {
        let _ = poller.await;
    }
    Ok(())
}

fn snapshot(pager: &ThreadPager, pinned: Option<&ThreadPager>) -> (u64, Option<u64>) {
    (pager.revision(), pinned.map(ThreadPager::revision))
}

fn render_list(
    pager: &ThreadPager,
    pinned: Option<&ThreadPager>,
    draft: &DraftOptions<'_>,
    json: bool,
) -> Result<()> {
    let now = Utc::now();
    let pinned_rows = pinned.map(ThreadPager::flattened);
    let view = pager.view(now, draft, pinned_rows.as_deref());

    if json {
        let body = match &view {
            ListView::Loading => json!({ "state": "loading" }),
            ListView::Error(message) => json!({ "state": "error", "error": message }),
            ListView::Empty => json!({ "state": "empty" }),
            ListView::Ready(groups) => json!({
                "state": "ready",
                "groups": groups,
                "has_more": !pager.is_reaching_end(),
                "pages": pager.size(),
            }),
        };
        println!("{}", serde_json::to_string_pretty(&body)?);
        return Ok(());
    }

    match view {
        ListView::Loading => println!("{}", "Loading threads...".dimmed()),
        ListView::Error(message) => {
            eprintln!("{} {}", "Error loading threads:".red().bold(), message)
        }
        ListView::Empty => println!("{}", "No threads found".dimmed()),
        ListView::Ready(groups) => {
            for (group, rows) in groups.iter() {
                println!("{}", group.label().bold());
                for row in rows {
                    println!("{}", format_row(row, now));
                }
                println!();
            }
            if !pager.is_reaching_end() {
                println!(
                    "{}",
                    format!(
                        "More threads available; rerun with --pages {}",
                        pager.size() + 1
                    )
                    .dimmed()
                );
            }
        }
    }
    Ok(())
}

fn format_row(row: &ThreadSummary, now: DateTime<Utc>) -> String {
    let class = classify(&row.status);
    let when = row
        .updated_at
        .map(|t| format_time(&t.with_timezone(&Local), &now.with_timezone(&Local)))
        .unwrap_or_default();
    let id = if row.is_draft() {
        String::new()
    } else {
        format!("  {}", row.id.dimmed())
    };

    format!(
        "  {} {:<12} {:<40} {:>9}{}\n      {}",
        "●".color(color_of(class.color)),
        class.label,
        row.title.bold(),
        when.dimmed(),
        id,
        row.description.dimmed()
    )
}

fn color_of(token: ColorToken) -> Color {
    match token {
        ColorToken::Green => Color::Green,
        ColorToken::Yellow => Color::Yellow,
        ColorToken::Red => Color::Red,
        ColorToken::DarkRed => Color::TrueColor {
            r: 220,
            g: 38,
            b: 38,
        },
        ColorToken::Gray => Color::BrightBlack,
    }
}

// ── agents ──────────────────────────────────────────────────────────────────

async fn run_agents(
    source: Arc<HttpThreadSource>,
    directory: &AgentDirectory,
    json: bool,
) -> Result<()> {
    let summaries = agent_summaries(source.as_ref(), directory).await;

    if json {
        println!("{}", serde_json::to_string_pretty(&summaries)?);
        return Ok(());
    }
    if summaries.is_empty() {
        println!("{}", "No agents found".dimmed());
        return Ok(());
    }

    let now = Utc::now();
    for summary in &summaries {
        let badge = summary
            .interrupted
            .as_deref()
            .map(|n| format!(" [{n}]").red().bold().to_string())
            .unwrap_or_default();
        println!(
            "{}{}  {}",
            summary.agent.display_name().bold(),
            badge,
            summary.agent.assistant_id.dimmed()
        );
        match &summary.latest_thread {
            Some(thread) => {
                let when = thread
                    .updated_at
                    .map(|t| format_time(&t.with_timezone(&Local), &now.with_timezone(&Local)))
                    .unwrap_or_default();
                let status = &thread.status;
                let dot = "●".color(color_of(classify(status).color));
                println!("  {dot} {} {}", when.dimmed(), thread.description);
                if *status == ThreadStatus::Interrupted {
                    println!("    {}", "waiting for input".yellow());
                }
            }
            None => println!("  {}", "No threads yet".dimmed()),
        }
    }
    Ok(())
}
