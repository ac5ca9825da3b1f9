//! # LfgRelay — cross-server relay and BigLFG bot
//!
//! Usage:
//!   lfgrelay init                                 # Write a default config file
//!   lfgrelay run                                  # Read BigLFG prompts from stdin until Ctrl-C
//!   lfgrelay lfg "Raid at 9" --target 6           # Broadcast a BigLFG and track it
//!   lfgrelay register --channel 1 --guild 2 ...   # Register a relay channel
//!   lfgrelay relay --channel 1 --guild 2 ...      # Relay a single message
//!   lfgrelay --dry-run lfg "test"                 # Use the in-memory platform

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use lfgrelay_channels::{
    ChannelRegistry, DiscordPlatform, MemoryPlatform, RelayFanout, Registration, RetryPolicy,
};
use lfgrelay_core::config::LfgRelayConfig;
use lfgrelay_core::traits::MessagePlatform;
use lfgrelay_core::types::{ChannelId, GuildId, InboundMessage, MessageId};
use lfgrelay_scheduler::{LfgEngine, LfgOptions, LfgSettings};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "lfgrelay",
    version,
    about = "📣 LfgRelay — cross-server relay and BigLFG bot"
)]
struct Cli {
    /// Config file (default: ~/.lfgrelay/config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Use the in-memory platform instead of Discord
    #[arg(long, global = true)]
    dry_run: bool,

    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Write a default config file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Run the BigLFG loop, reading commands from stdin until Ctrl-C.
    /// Each line is a prompt to broadcast, `cancel <id>`, or `list`.
    Run,

    /// Broadcast a BigLFG to every registered channel and track it until it closes
    Lfg {
        prompt: String,
        /// Players needed (default from config)
        #[arg(long)]
        target: Option<u32>,
        /// Minutes before cancelling for inactivity (default from config)
        #[arg(long)]
        timeout_mins: Option<i64>,
    },

    /// Register (or update) a relay channel
    Register {
        #[arg(long)]
        channel: ChannelId,
        #[arg(long)]
        guild: GuildId,
        #[arg(long)]
        guild_name: String,
        #[arg(long)]
        webhook: String,
        #[arg(long, default_value = "general")]
        filter: String,
    },

    /// Remove a relay channel
    Unregister {
        #[arg(long)]
        channel: ChannelId,
    },

    /// List registered channels
    Channels,

    /// Relay one message from a registered channel
    Relay {
        #[arg(long)]
        channel: ChannelId,
        #[arg(long)]
        guild: GuildId,
        #[arg(long)]
        author: String,
        #[arg(long)]
        avatar_url: Option<String>,
        content: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        "lfgrelay=debug,lfgrelay_scheduler=debug,lfgrelay_channels=debug"
    } else {
        "lfgrelay=info,lfgrelay_scheduler=info,lfgrelay_channels=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .with_target(false)
        .init();

    let config = match (&cli.config, &cli.command) {
        (_, Command::Init { .. }) => LfgRelayConfig::default(),
        (Some(path), _) => LfgRelayConfig::load_from(path)?,
        (None, _) => LfgRelayConfig::load()?,
    };
    config.validate()?;

    let registry = Arc::new(ChannelRegistry::open(&config.relay.registry_path()));

    match cli.command {
        Command::Init { force } => {
            let path = cli.config.clone().unwrap_or_else(LfgRelayConfig::default_path);
            if path.exists() && !force {
                anyhow::bail!("{} already exists (use --force to overwrite)", path.display());
            }
            match &cli.config {
                Some(path) => config.save_to(path)?,
                None => config.save()?,
            }
            println!("✅ Wrote {}", path.display());
        }
        Command::Run => {
            let engine = build_engine(cli.dry_run, &config, registry)?;
            let handle = engine.clone().spawn();
            println!(
                "📣 LfgRelay v{} — type a prompt to broadcast a BigLFG, `cancel <id>`, or `list`. Ctrl-C to stop.",
                env!("CARGO_PKG_VERSION")
            );

            let mut lines = BufReader::new(tokio::io::stdin()).lines();
            let mut stdin_open = true;
            let ctrl_c = tokio::signal::ctrl_c();
            tokio::pin!(ctrl_c);
            loop {
                tokio::select! {
                    _ = &mut ctrl_c => break,
                    line = lines.next_line(), if stdin_open => match line? {
                        Some(line) => run_console_line(&engine, &line).await,
                        // Keep reconciling what is already open.
                        None => stdin_open = false,
                    },
                }
            }
            handle.shutdown().await;
        }
        Command::Lfg {
            prompt,
            target,
            timeout_mins,
        } => {
            if target == Some(0) || timeout_mins.is_some_and(|m| m <= 0) {
                anyhow::bail!("--target and --timeout-mins must be positive");
            }
            let timeout = timeout_mins
                .map(|m| chrono::TimeDelta::try_minutes(m).context("--timeout-mins is out of range"))
                .transpose()?;
            let engine = build_engine(cli.dry_run, &config, registry)?;
            let options = LfgOptions {
                target_count: target,
                timeout,
            };
            let id = engine.create_big_lfg(&prompt, options).await?;
            println!("✅ BigLFG {id} posted — waiting for it to fill or expire");

            let handle = engine.clone().spawn();
            let mut check = tokio::time::interval(engine.settings().poll_interval);
            let ctrl_c = tokio::signal::ctrl_c();
            tokio::pin!(ctrl_c);
            loop {
                tokio::select! {
                    _ = &mut ctrl_c => break,
                    _ = check.tick() => {
                        if !engine.store().contains(id) {
                            println!("🏁 BigLFG {id} closed");
                            break;
                        }
                        if handle.is_finished() {
                            tracing::warn!("⚠️ BigLFG loop exited early; {id} is still open");
                            break;
                        }
                    }
                }
            }
            handle.shutdown().await;
        }
        Command::Register {
            channel,
            guild,
            guild_name,
            webhook,
            filter,
        } => {
            registry.register(Registration {
                channel_id: channel,
                guild_id: guild,
                guild_name,
                webhook_url: webhook,
                filter,
            })?;
            println!("✅ Registered #{channel} ({} channels total)", registry.len());
        }
        Command::Unregister { channel } => {
            let removed = registry.unregister(channel)?;
            println!("✅ Unregistered #{channel} ({})", removed.guild_name);
        }
        Command::Channels => {
            let entries = registry.list();
            if entries.is_empty() {
                println!("No channels registered.");
            }
            for r in entries {
                println!("#{:<20} {:<24} filter={}", r.channel_id, r.guild_name, r.filter);
            }
        }
        Command::Relay {
            channel,
            guild,
            author,
            avatar_url,
            content,
        } => {
            let platform = build_platform(cli.dry_run, &config)?;
            let fanout = RelayFanout::new(platform, registry, RetryPolicy::from_config(&config.relay));
            let report = fanout
                .relay(&InboundMessage {
                    channel_id: channel,
                    guild_id: guild,
                    author_name: author,
                    author_avatar_url: avatar_url,
                    content,
                    author_is_bot: false,
                    from_webhook: false,
                })
                .await;
            println!(
                "📨 Delivered to {} channel(s), {} failed",
                report.delivered.len(),
                report.failed.len()
            );
            for (channel, error) in &report.failed {
                println!("   ❌ #{channel}: {error}");
            }
        }
    }

    Ok(())
}

/// One line typed at the `run` console.
#[derive(Debug, PartialEq)]
enum ConsoleCommand {
    Create(String),
    Cancel(MessageId),
    List,
}

fn parse_console_line(line: &str) -> Result<Option<ConsoleCommand>> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    if line == "list" {
        return Ok(Some(ConsoleCommand::List));
    }
    if let Some(rest) = line.strip_prefix("cancel ") {
        let id = rest
            .trim()
            .parse()
            .with_context(|| format!("'{}' is not a BigLFG id", rest.trim()))?;
        return Ok(Some(ConsoleCommand::Cancel(id)));
    }
    Ok(Some(ConsoleCommand::Create(line.to_string())))
}

async fn run_console_line(engine: &LfgEngine, line: &str) {
    let command = match parse_console_line(line) {
        Ok(Some(command)) => command,
        Ok(None) => return,
        Err(e) => {
            println!("❌ {e:#}");
            return;
        }
    };
    match command {
        ConsoleCommand::Create(prompt) => match engine.create_big_lfg(&prompt, LfgOptions::default()).await {
            Ok(id) => println!("✅ BigLFG {id} posted"),
            Err(e) => println!("❌ {e}"),
        },
        ConsoleCommand::Cancel(id) => match engine.cancel_big_lfg(id).await {
            Ok(()) => println!("🛑 BigLFG {id} cancelled"),
            Err(e) => println!("❌ {e}"),
        },
        ConsoleCommand::List => {
            let active = engine.active_requests();
            if active.is_empty() {
                println!("No active BigLFGs.");
            }
            for r in active {
                println!(
                    "{:<20} {}/{} until {}  {}",
                    r.id,
                    r.current_count,
                    r.target_count,
                    r.deadline.format("%H:%M:%S UTC"),
                    r.prompt
                );
            }
        }
    }
}

fn build_platform(dry_run: bool, config: &LfgRelayConfig) -> Result<Arc<dyn MessagePlatform>> {
    let platform: Arc<dyn MessagePlatform> = if dry_run {
        Arc::new(MemoryPlatform::new())
    } else {
        Arc::new(DiscordPlatform::new(config.discord.clone())?)
    };
    tracing::info!("🔌 Platform: {}", platform.name());
    Ok(platform)
}

fn build_engine(
    dry_run: bool,
    config: &LfgRelayConfig,
    registry: Arc<ChannelRegistry>,
) -> Result<Arc<LfgEngine>> {
    let platform = build_platform(dry_run, config)?;
    let settings = LfgSettings::from_config(&config.biglfg)?;
    Ok(Arc::new(LfgEngine::new(platform, registry, settings)))
}
