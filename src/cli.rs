//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::Parser;

use session_auth::Cookie;
use session_auth::config::MAX_RETRIES_LIMIT;

/// Environment variable holding the session cookie when no file source is given.
pub const COOKIE_ENV: &str = "SESSION_AUTH_COOKIE";

/// Check whether a browser session cookie is still accepted by a service.
///
/// The cookie is read from a file, a Netscape cookie export, the encrypted
/// store, or the SESSION_AUTH_COOKIE environment variable. A rotated cookie is
/// written back to the file or encrypted store it came from.
#[derive(Parser, Debug)]
#[command(name = "session-auth")]
#[command(author, version, about)]
pub struct Args {
    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long)]
    pub quiet: bool,

    /// Session check endpoint (overrides check_url from --config)
    #[arg(short = 'u', long)]
    pub url: Option<String>,

    /// JSON settings file
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Plain cookie file; rotated cookies are written back to it
    #[arg(long, value_name = "PATH", conflicts_with_all = ["netscape_file", "encrypted"])]
    pub cookie_file: Option<PathBuf>,

    /// Netscape cookies.txt export; requires --domain
    #[arg(long, value_name = "PATH", requires = "domain", conflicts_with = "encrypted")]
    pub netscape_file: Option<PathBuf>,

    /// Host whose cookies are taken from --netscape-file
    #[arg(long)]
    pub domain: Option<String>,

    /// Use the encrypted cookie store, seeding it from SESSION_AUTH_COOKIE when set
    #[arg(long)]
    pub encrypted: bool,

    /// Session cookie value (prefer the environment variable over the flag)
    #[arg(long, env = COOKIE_ENV, hide_env_values = true)]
    pub cookie: Option<Cookie>,

    /// Courtesy wait before each request in milliseconds
    #[arg(short = 'w', long, allow_negative_numbers = true)]
    pub wait_ms: Option<i64>,

    /// Maximum retry attempts for transient failures (0-10)
    #[arg(short = 'r', long, value_parser = clap::value_parser!(u32).range(0..=i64::from(MAX_RETRIES_LIMIT)))]
    pub max_retries: Option<u32>,

    /// Overall deadline for the call in seconds
    #[arg(short = 't', long, value_parser = clap::value_parser!(u64).range(1..=3600))]
    pub timeout_secs: Option<u64>,

    /// JSON pointer that must hold a non-empty value in the check response
    #[arg(long, value_name = "POINTER")]
    pub session_pointer: Option<String>,

    /// Log state transitions and rotation failures at a visible level
    #[arg(long)]
    pub debug: bool,
}
