use std::sync::Arc;

use anyhow::Result;
use clap::{ArgAction, Parser, Subcommand};
use tracing::Level;

use stardust::cli::{
    handle_access_command, handle_auth_command, handle_check_command, handle_template_command,
    handle_use_command, AuthCommands, TemplateCommands,
};
use stardust::config::settings::API_KEY_ENV;
use stardust::config::{Settings, StardustPaths};
use stardust::crypto::{CipherCodec, DeviceIdentity};
use stardust::prompt::manager::JANITOR_PERIOD;
use stardust::prompt::{PromptDecryptor, PromptManager};
use stardust::remote::HttpPromptClient;
use stardust::storage::CredentialStore;
use stardust::template::TemplateEngine;

#[derive(Parser)]
#[command(
    name = "stardust",
    author = "Kaylee Beyene",
    version,
    about = "Secure in-memory prompt delivery for AI-assisted novel writing",
    long_about = "Stardust fetches encrypted writing prompts for a session, decrypts \
                  and fills them entirely in memory, and keeps a device-bound \
                  encrypted credential cache."
)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch, decrypt and fill the prompt for a session
    Use {
        /// Session ID from the web form
        session: String,
        /// API key for this call only
        #[arg(long)]
        api_key: Option<String>,
        /// Print form metadata to stderr
        #[arg(short, long)]
        metadata: bool,
    },

    /// Check whether a session is ready to use
    Check {
        /// Session ID
        session: String,
    },

    /// Verify that a user owns a session
    Access {
        /// Session ID
        session: String,
        /// User ID
        #[arg(short, long)]
        user: String,
    },

    /// Credential cache commands
    #[command(subcommand)]
    Auth(AuthCommands),

    /// Local template commands
    #[command(subcommand)]
    Template(TemplateCommands),

    /// Show current configuration and paths
    Config,
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        _ => Level::DEBUG,
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(level)
        .with_target(false)
        .init();
}

fn template_engine(settings: &Settings) -> TemplateEngine {
    TemplateEngine::new().with_builtins(settings.template.builtin_variables)
}

fn prompt_manager(settings: &Settings) -> Result<PromptManager> {
    let api_key = std::env::var(API_KEY_ENV).ok();
    let client = HttpPromptClient::new(
        &settings.effective_api_base_url(),
        settings.request_timeout(),
    )?
    .with_api_key(api_key);

    Ok(PromptManager::new(
        Arc::new(client),
        PromptDecryptor::new(CipherCodec::new()),
        template_engine(settings),
    )
    .with_thresholds(settings.memory.thresholds())
    .with_cache_ttl(settings.session_cache_ttl()))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    // Initialize paths and settings
    let paths = StardustPaths::new()?;
    let settings = Settings::load_or_create(&paths).await?;

    match cli.command {
        Some(Commands::Use {
            session,
            api_key,
            metadata,
        }) => {
            let manager = prompt_manager(&settings)?;
            handle_use_command(&manager, &session, api_key.as_deref(), metadata).await?;
        }
        Some(Commands::Check { session }) => {
            let manager = prompt_manager(&settings)?;
            handle_check_command(&manager, &session).await?;
        }
        Some(Commands::Access { session, user }) => {
            let manager = prompt_manager(&settings)?;
            let janitor = manager.spawn_cache_janitor(JANITOR_PERIOD);
            let result = handle_access_command(&manager, &session, &user).await;
            janitor.abort();
            result?;
        }
        Some(Commands::Auth(cmd)) => {
            let store = CredentialStore::new(paths, DeviceIdentity::current(), CipherCodec::new());
            handle_auth_command(&store, cmd).await?;
        }
        Some(Commands::Template(cmd)) => {
            handle_template_command(&template_engine(&settings), cmd).await?;
        }
        Some(Commands::Config) => {
            println!("Stardust Configuration");
            println!("======================");
            println!("Storage directory: {}", paths.storage_dir().display());
            println!("Credential file:   {}", paths.auth_file().display());
            println!("Settings file:     {}", paths.settings_file().display());
            println!();
            println!("Settings:");
            println!("  API base URL:       {}", settings.effective_api_base_url());
            println!("  Request timeout:    {}s", settings.request_timeout_secs);
            println!("  Memory warn:        {} MB", settings.memory.warn_threshold_mb);
            println!("  Memory ready:       {} MB", settings.memory.ready_threshold_mb);
            println!("  Session cache TTL:  {}s", settings.session_cache_ttl_secs);
            println!("  Builtin variables:  {}", settings.template.builtin_variables);
        }
        None => {
            println!("Stardust - secure prompt delivery for novel writing");
            println!();
            println!("Run 'stardust --help' for usage information.");
            println!("Run 'stardust use <session>' to fetch a prompt.");
        }
    }

    Ok(())
}
