use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::prelude::*;

mod cache;
mod cli;
mod config;
mod dispatcher;
mod error;
mod local;
mod metadata;
mod paths;
mod remote;
mod sync;
mod tasks;
mod util;

use cli::{Cli, Command};
use config::credentials::Credentials;
use config::defaults::Defaults;
use config::Dirs;
use dispatcher::Dispatcher;
use local::IgnorePatternSet;
use metadata::InferMetadataProbe;
use paths::PathResolver;
use remote::http::HttpRemoteClient;
use remote::signer::{OAuth1Signer, Signer};

fn init_tracing(verbose: bool) -> anyhow::Result<()> {
    let default_directive = if verbose { "info,gallerysync=debug" } else { "info" };

    let env = tracing_subscriber::EnvFilter::builder().parse(
        ["GALLERYSYNC_LOG", "RUST_LOG"]
            .iter()
            .find_map(|key| std::env::var(key).ok())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| default_directive.to_owned()),
    )?;

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_target(false).with_filter(env))
        .init();

    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = init_tracing(cli.verbose) {
        eprintln!("invalid log filter: {e}");
        return ExitCode::from(2);
    }

    match run(cli).await {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            eprintln!("{e:#}");
            ExitCode::from(1)
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<u8> {
    let dirs = Dirs::resolve()?;
    std::fs::create_dir_all(dirs.config_dir())?;

    let command = match cli.command {
        Command::Login { consumer_key, consumer_secret } => return login(&dirs, consumer_key, consumer_secret),
        Command::Logout => {
            Credentials::delete(&dirs.credentials_path())?;
            tracing::info!("credentials removed");
            return Ok(0);
        }
        other => other,
    };

    let Some(creds) = Credentials::load(&dirs.credentials_path()) else {
        eprintln!("not logged in; run `gallerysync login --key K --secret S` first");
        return Ok(1);
    };
    let Some(base_url) = cli.base_url else {
        eprintln!("missing --base-url (or GALLERYSYNC_BASE_URL)");
        return Ok(2);
    };
    let Some(user) = cli.user else {
        eprintln!("missing --user (or GALLERYSYNC_USER)");
        return Ok(2);
    };

    let signer: Arc<dyn Signer> = Arc::new(OAuth1Signer::new(creds.into()));
    let remote = Arc::new(HttpRemoteClient::new(base_url, signer)?);
    let resolver = Arc::new(PathResolver::new(remote.clone(), user));
    let ignore_set = Arc::new(IgnorePatternSet::load(&dirs.ignore_path())?);
    let fingerprint_cache = Arc::new(cache::FingerprintCache::load(dirs.fingerprint_cache_path()));
    let metadata_probe = Arc::new(InferMetadataProbe);
    let defaults = Defaults::load(&dirs.defaults_path());

    let dispatcher = Dispatcher::new(remote, resolver, ignore_set, fingerprint_cache, metadata_probe, dirs, defaults);

    let code = dispatcher.dispatch(command).await?;
    Ok(code as u8)
}

fn login(dirs: &Dirs, consumer_key: String, consumer_secret: String) -> anyhow::Result<u8> {
    use std::io::{self, BufRead, Write};

    print!("oauth_token: ");
    io::stdout().flush()?;
    let mut oauth_token = String::new();
    io::stdin().lock().read_line(&mut oauth_token)?;

    print!("oauth_token_secret: ");
    io::stdout().flush()?;
    let mut oauth_token_secret = String::new();
    io::stdin().lock().read_line(&mut oauth_token_secret)?;

    let creds = Credentials {
        consumer_key,
        consumer_secret,
        oauth_token: oauth_token.trim().to_string(),
        oauth_token_secret: oauth_token_secret.trim().to_string(),
    };
    creds.save(&dirs.credentials_path())?;
    tracing::info!("credentials saved");
    Ok(0)
}
