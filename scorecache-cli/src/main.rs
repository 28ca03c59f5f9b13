//! scorecache CLI
//!
//! Runs the API server and exercises the memoized score service from the shell.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use colored::*;
use futures::future::join_all;
use tracing::debug;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use scorecache_api::{ApiConfig, ApiServer};
use scorecache_core::traits::UserStore;
use scorecache_registry::MemoryUserStore;
use scorecache_score::{score_breakdown, ScoreService};

/// scorecache - memoized, request-coalesced user scores
#[derive(Parser)]
#[command(name = "scorecache")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true, env = "SCORECACHE_LOG_JSON")]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the API server
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "3000", env = "SCORECACHE_PORT")]
        port: u16,
        /// Bind address
        #[arg(short, long, default_value = "0.0.0.0", env = "SCORECACHE_BIND")]
        bind: String,
    },

    /// Compute a demo user's score, optionally several times in a row
    Score {
        /// User id
        user_id: u64,
        /// Number of sequential lookups
        #[arg(short, long, default_value = "1")]
        repeat: usize,
        /// Simulated computation cost in milliseconds
        #[arg(long, env = "SCORECACHE_COMPUTE_DELAY_MS")]
        delay_ms: Option<u64>,
    },

    /// Fire concurrent lookups for one user and count the computations that ran
    Bench {
        /// User id
        #[arg(short, long, default_value = "1")]
        user_id: u64,
        /// Number of concurrent lookups
        #[arg(short, long, default_value = "100")]
        concurrency: usize,
        /// Simulated computation cost in milliseconds
        #[arg(long, env = "SCORECACHE_COMPUTE_DELAY_MS")]
        delay_ms: Option<u64>,
    },

    /// List the demo users
    Users,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        "scorecache=debug,info"
    } else {
        "scorecache=info,warn"
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into());
    if cli.json_logs {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }

    match cli.command {
        Commands::Serve { port, bind } => cmd_serve(port, &bind).await,
        Commands::Score {
            user_id,
            repeat,
            delay_ms,
        } => cmd_score(user_id, repeat, delay_ms).await,
        Commands::Bench {
            user_id,
            concurrency,
            delay_ms,
        } => cmd_bench(user_id, concurrency, delay_ms).await,
        Commands::Users => cmd_users().await,
    }
}

fn demo_service(delay_ms: Option<u64>) -> Result<(ScoreService, Arc<MemoryUserStore>)> {
    let mut config = ApiConfig::from_env().context("Invalid configuration")?.score;
    if let Some(delay) = delay_ms {
        config = config.with_compute_delay(Duration::from_millis(delay));
    }
    debug!(?config, "Score service configuration");

    let users = Arc::new(MemoryUserStore::with_demo_users());
    Ok((ScoreService::new(users.clone(), config), users))
}

/// Run API server
async fn cmd_serve(port: u16, bind: &str) -> Result<()> {
    let config = ApiConfig::from_env().context("Invalid configuration")?;

    println!("{}", "🚀 Starting scorecache API server...".cyan().bold());
    println!("   {} http://{}:{}", "Listening on:".green(), bind, port);
    println!("   {} http://{}:{}/health", "Health check:".dimmed(), bind, port);
    println!(
        "   {} {:?}",
        "Score TTL:".dimmed(),
        config.score.cache.default_ttl
    );
    println!("\n   Press Ctrl+C to stop.\n");

    let server = ApiServer::new(config);

    let addr: SocketAddr = format!("{}:{}", bind, port)
        .parse()
        .context("Invalid bind address")?;
    server.run(addr).await?;

    Ok(())
}

/// Compute a score repeatedly, showing which lookups hit the cache
async fn cmd_score(user_id: u64, repeat: usize, delay_ms: Option<u64>) -> Result<()> {
    let (service, users) = demo_service(delay_ms)?;

    let user = users
        .find(user_id)
        .await?
        .with_context(|| format!("No user with id {user_id}"))?;
    println!(
        "{} {} (id {})",
        "🧮 Scoring".cyan().bold(),
        user.name,
        user.id
    );

    for attempt in 1..=repeat.max(1) {
        let start = Instant::now();
        let result = service.calculate(user_id).await?;
        let source = if result.cached {
            "cached".green()
        } else {
            "computed".yellow()
        };
        println!(
            "   #{attempt} score {} ({source}, {:?})",
            result.score.to_string().bold(),
            start.elapsed()
        );
    }

    let breakdown = score_breakdown(&user, Utc::now());
    println!("\n{}", "📋 Breakdown (JSON):".yellow().bold());
    println!("{}", serde_json::to_string_pretty(&breakdown)?);

    Ok(())
}

/// Fire concurrent lookups and report how many computations actually ran
async fn cmd_bench(user_id: u64, concurrency: usize, delay_ms: Option<u64>) -> Result<()> {
    let (service, _users) = demo_service(delay_ms)?;
    let concurrency = concurrency.max(1);

    println!(
        "{} {} concurrent lookups for user {}",
        "📊 Benchmarking".cyan().bold(),
        concurrency,
        user_id
    );

    let start = Instant::now();
    let results = join_all((0..concurrency).map(|_| {
        let service = service.clone();
        tokio::spawn(async move { service.calculate(user_id).await })
    }))
    .await;
    let elapsed = start.elapsed();

    let mut scores = Vec::with_capacity(concurrency);
    for result in results {
        let score = result.context("Lookup task failed")??;
        scores.push(score.score);
    }

    let stats = service.stats();
    println!("\n{}", "📈 Results:".green().bold());
    println!("   Lookups: {}", concurrency);
    println!("   Computations run: {}", stats.coalescer.computations);
    println!("   Coalesced: {}", stats.coalescer.coalesced);
    println!("   Wall time: {:?}", elapsed);

    let consistent = scores.windows(2).all(|w| w[0] == w[1]);
    if stats.coalescer.computations == 1 && consistent {
        println!("   {} Every caller got score {}", "✅".green(), scores[0]);
    } else {
        println!(
            "   {} Expected one computation with a single score, got {} computation(s)",
            "❌".red(),
            stats.coalescer.computations
        );
    }

    Ok(())
}

/// List the demo users
async fn cmd_users() -> Result<()> {
    let users = MemoryUserStore::with_demo_users();

    println!("{}", "👥 Demo users:".cyan().bold());
    for user in users.all().await? {
        println!(
            "   {} {} <{}> {} points, {} activities",
            format!("#{}", user.id).dimmed(),
            user.name,
            user.email,
            user.points,
            user.activities.len()
        );
    }

    Ok(())
}
