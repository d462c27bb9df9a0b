//! CLI entry point for the session-auth tool.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result, bail};
use clap::Parser;
use session_auth::check::constants::{CONNECT_TIMEOUT_SECS, READ_TIMEOUT_SECS};
use session_auth::cookie::{cookie_for_host, parse_netscape_cookies};
use session_auth::store::default_encrypted_path;
use session_auth::{
    AuthContext, Authenticator, CookieStore, EncryptedFileCookieStore, FileCookieStore,
    HttpSessionCheck, MemoryCookieStore, RotationPolicy, SessionConfig, SessionSettings,
    StaticCookieStore,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

mod cli;

use cli::{Args, COOKIE_ENV};

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();

    // Priority: RUST_LOG env var > quiet flag > verbose flag > default (info)
    let default_level = if args.quiet {
        "error"
    } else {
        match args.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    debug!(?args, "CLI arguments parsed");

    let settings = match &args.config {
        Some(path) => SessionSettings::load(path)?,
        None => SessionSettings::default(),
    };

    let Some(url) = args.url.clone().or_else(|| settings.check_url.clone()) else {
        bail!("no session check URL: pass --url or set check_url in --config");
    };

    let store = build_store(&args, &settings).await?;
    info!(store = store.name(), url = %url, "checking session");

    let mut builder = settings.apply(SessionConfig::builder()).cookie_store(store);
    if let Some(wait_ms) = args.wait_ms {
        builder = builder.wait_millis(wait_ms);
    }
    if let Some(max_retries) = args.max_retries {
        builder = builder.max_retries(max_retries);
    }
    if args.debug {
        builder = builder.debug(true);
    }
    let config = builder.build()?;

    let mut check = HttpSessionCheck::with_timeouts(
        &url,
        settings.connect_timeout_secs.unwrap_or(CONNECT_TIMEOUT_SECS),
        settings.read_timeout_secs.unwrap_or(READ_TIMEOUT_SECS),
    )?;
    if let Some(pointer) = args.session_pointer.as_ref().or(settings.session_pointer.as_ref()) {
        check = check.require_json_pointer(pointer.clone());
    }

    let shutdown = CancellationToken::new();
    let mut ctx = AuthContext::with_token(shutdown.clone());
    if let Some(secs) = args.timeout_secs {
        ctx = ctx.with_timeout(Duration::from_secs(secs));
    }

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, canceling");
            shutdown.cancel();
        }
    });

    let authenticator = Authenticator::new(config, check);
    let result = authenticator.authenticate(&ctx).await?;

    info!(
        attempts = result.attempts,
        rotated = result.rotated_cookie.is_some(),
        "Session is valid"
    );
    if !args.quiet {
        println!("authenticated");
    }

    Ok(())
}

async fn build_store(args: &Args, settings: &SessionSettings) -> Result<Arc<dyn CookieStore>> {
    if let Some(path) = args.cookie_file.as_ref().or(settings.cookie_file.as_ref()) {
        debug!(path = %path.display(), "using cookie file");
        return Ok(Arc::new(FileCookieStore::new(path)));
    }

    if let (Some(path), Some(domain)) = (&args.netscape_file, &args.domain) {
        return Ok(Arc::new(MemoryCookieStore::new(netscape_cookie(path, domain)?)));
    }

    if args.encrypted {
        let path = default_encrypted_path()?;
        let store = EncryptedFileCookieStore::from_env_or_keychain(path)?;
        if let Some(cookie) = &args.cookie {
            store
                .set_cookie(&AuthContext::new(), cookie.clone())
                .await
                .context("failed to seed encrypted cookie store")?;
            debug!(path = %store.path().display(), "seeded encrypted cookie store");
        }
        return Ok(Arc::new(store));
    }

    match &args.cookie {
        Some(cookie) => Ok(Arc::new(StaticCookieStore::with_policy(
            cookie.clone(),
            RotationPolicy::Warn,
        ))),
        None => bail!(
            "no session cookie: pass --cookie-file, --netscape-file, --encrypted, or set {COOKIE_ENV}"
        ),
    }
}

fn netscape_cookie(path: &Path, domain: &str) -> Result<session_auth::Cookie> {
    let file = File::open(path)
        .with_context(|| format!("failed to open cookie file {}", path.display()))?;
    let parsed = parse_netscape_cookies(BufReader::new(file))?;
    if !parsed.warnings.is_empty() {
        warn!(skipped = parsed.warnings.len(), path = %path.display(), "ignored malformed cookie lines");
    }

    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.as_secs());
    cookie_for_host(&parsed.cookies, domain, now)
        .with_context(|| format!("no unexpired cookies for {domain} in {}", path.display()))
}
