mod applier;
mod auth_handshake;
mod callback_server;
mod cancel;
mod collector;
mod config;
mod error;
mod logging;
mod menu;
mod model;
mod ports;
mod shuffler;
mod snapshot;
mod spotify;
mod workflow;

use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use color_eyre::{
    Result,
    eyre::{Context, OptionExt, bail},
};

use crate::{
    auth_handshake::AuthHandshake,
    callback_server::CallbackServer,
    cancel::CancelFlag,
    config::Config,
    error::WriteError,
    logging::setup_logging,
    menu::{Menu, Selection, confirm},
    ports::track_provider::TrackProvider,
    shuffler::Shuffler,
    snapshot::SnapshotStore,
    spotify::{
        auth::{SpotifyApiCredentials, SpotifyAuthenticator},
        client::SpotifyWebClient,
    },
    workflow::{ShuffleSession, WorkflowError},
};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// The config file to use
    #[arg(short, long, env = "PLAYLIST_SHUFFLER_CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Console log level (default: info)
    #[arg(long, default_value = "info", global = true, env = "LOG_LEVEL")]
    log_level: log::LevelFilter,

    /// File log level (default: debug)
    #[arg(long, default_value = "debug", global = true)]
    log_file_level: log::LevelFilter,

    /// Path to log file
    #[arg(long, env = "PLAYLIST_SHUFFLER_LOG_FILE", global = true)]
    log_file: Option<PathBuf>,

    /// Spotify application client id
    #[arg(long, env = "SPOTIFY_ID", global = true)]
    client_id: Option<String>,

    /// Spotify application client secret
    #[arg(long, env = "SPOTIFY_SECRET", hide_env_values = true, global = true)]
    client_secret: Option<String>,

    /// Seed for a reproducible shuffle
    #[arg(long, global = true)]
    seed: Option<u64>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Log in, pick a playlist and shuffle it (default)
    Run,
    /// Log in and write the saved snapshot back
    Resume,
    #[command(subcommand)]
    Config(ConfigCommands),
}

#[derive(Subcommand, Debug)]
enum ConfigCommands {
    /// Create a default config file, if it doesn't exist
    CreateDefault,
    /// Print the path to the config file
    Path,
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let args = Args::parse();
    setup_logging(args.log_level, args.log_file.clone(), args.log_file_level)?;

    log::debug!("Playlist shuffler starting");

    let command = args.command.unwrap_or(Commands::Run);
    if let Commands::Config(config_commands) = &command {
        match config_commands {
            ConfigCommands::CreateDefault => {
                let path = Config::create_default()?;
                println!("{}", path.display());
            }
            ConfigCommands::Path => match Config::config_path() {
                Some(path) => println!("{}", path.display()),
                None => println!("No default config path found"),
            },
        }
        return Ok(());
    }

    let config = {
        if let Some(config) = &args.config {
            Config::from_file(config)
        } else {
            Config::load()
        }
    }
    .wrap_err("Failed to load playlist-shuffler config")?;
    let credentials = config.credentials(args.client_id, args.client_secret)?;

    run(
        &config,
        credentials,
        args.seed,
        matches!(command, Commands::Resume),
    )
    .await
}

async fn login(config: &Config, credentials: SpotifyApiCredentials) -> Result<SpotifyWebClient> {
    let redirect_uri = credentials.redirect_uri().clone();
    let authenticator = SpotifyAuthenticator::new(credentials, config.market().to_string())
        .wrap_err("Failed to build Spotify authenticator")?;
    let handshake = Arc::new(AuthHandshake::new(authenticator));
    let server = CallbackServer::start(handshake.clone(), &redirect_uri).await?;

    println!(
        "Please log in to Spotify by visiting the following page in your browser: {}",
        handshake.begin_login()
    );
    let client = handshake.await_client(config.login_timeout()).await;
    server.shutdown();

    client.wrap_err("Login failed")
}

async fn run(
    config: &Config,
    credentials: SpotifyApiCredentials,
    seed: Option<u64>,
    resume_only: bool,
) -> Result<()> {
    let store = SnapshotStore::new(config.snapshot_path());
    let saved = store
        .load_if_present()
        .wrap_err_with(|| format!("Failed to read snapshot {}", store.path().display()))?;
    if resume_only && saved.is_none() {
        bail!("No snapshot found at {}", store.path().display());
    }

    let client = login(config, credentials).await?;
    let user = client.current_user().await?;
    println!("You are logged in as: {}", user.id);

    let cancel = CancelFlag::new();
    cancel.cancel_on_ctrl_c();
    let shuffler = Shuffler::new(config.shuffle_passes()).with_seed(seed);
    let session = ShuffleSession::new(&client, &store, shuffler, cancel)
        .keep_snapshot(config.keep_snapshot());

    let selection = if resume_only {
        Selection::Resume
    } else {
        let playlists = client.current_user_playlists().await?;
        let menu = Menu::new(
            &playlists,
            &user.id,
            saved.as_ref().map(|_| store.path()),
        );
        let mut out = io::stdout().lock();
        menu.render(&mut out)?;
        menu.prompt(&mut io::stdin().lock(), &mut out)
            .wrap_err("No playlist selected")?
    };

    let mut result = match selection {
        Selection::Shuffle(target) => {
            log::info!("Shuffling {target}");
            session.shuffle(target).await
        }
        Selection::Resume => {
            let snapshot = saved.ok_or_eyre("No snapshot to reinstate")?;
            session.resume(snapshot).await
        }
    };

    loop {
        match result {
            Ok(report) => {
                println!(
                    "Done: wrote {} tracks in {} requests",
                    report.tracks, report.calls
                );
                return Ok(());
            }
            Err(WorkflowError::Write {
                source: source @ WriteError::RemoteWrite { .. },
                pending,
            }) => {
                println!("Write-back failed: {source}");
                let retry = confirm(
                    "Retry write-back from snapshot?",
                    &mut io::stdin().lock(),
                    &mut io::stdout().lock(),
                )?;
                if !retry {
                    bail!(
                        "Write-back abandoned, the shuffled order is kept in {}",
                        store.path().display()
                    );
                }
                result = session.resume(pending).await;
            }
            Err(WorkflowError::Write {
                source: source @ WriteError::Cancelled { .. },
                ..
            }) => {
                return Err(source).wrap_err_with(|| {
                    format!(
                        "Resume later from the snapshot in {}",
                        store.path().display()
                    )
                });
            }
            Err(error) => return Err(error.into()),
        }
    }
}
