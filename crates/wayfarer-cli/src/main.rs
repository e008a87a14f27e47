//! Wayfarer CLI - a command-line front end for the wayfarer data layer.
//!
//! Restores the saved session on startup, then runs one command against the
//! backend and prints the result as JSON.

use std::io;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use serde_json::Value;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use wayfarer_core::models::Credentials;
use wayfarer_core::{ApiClient, ApiRequest, Config, FileStorage, SessionStore};

/// Base name of the daily log file written under `log_dir`.
const LOG_FILE: &str = "wayfarer.log";

const USAGE: &str = "\
Usage: wayfarer <command>

Commands:
  status                    Show the current session state
  login <identifier>        Log in (prompts for the password)
  logout                    Forget the saved session
  whoami                    Show the logged-in user
  refresh                   Re-check the saved session with the backend
  get <path> [key=value...] Send a GET request and print the response";

/// Initialize the tracing subscriber for logging.
///
/// Logs go to stderr; when `log_dir` is set they are also written to a
/// daily-rolling file there. The returned guard must stay alive until exit.
fn init_tracing(log_dir: Option<&Path>) -> Option<WorkerGuard> {
    // RUST_LOG controls the level (e.g. RUST_LOG=wayfarer_core=debug)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    let (file_layer, guard) = match log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (Some(fmt::layer().with_ansi(false).with_writer(writer)), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(file_layer)
        .with(filter)
        .init();

    guard
}

fn print_json(value: &Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Split `key=value` arguments into query parameters.
fn parse_params(args: &[String]) -> Result<Vec<(String, String)>> {
    args.iter()
        .map(|arg| {
            arg.split_once('=')
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .with_context(|| format!("Expected key=value, got '{}'", arg))
        })
        .collect()
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let config = Config::load()?;
    let _log_guard = init_tracing(config.log_dir.as_deref());

    let args: Vec<String> = std::env::args().skip(1).collect();
    let Some(command) = args.first() else {
        eprintln!("{}", USAGE);
        return Ok(());
    };

    let session_path = config.session_path()?;
    let storage = Arc::new(FileStorage::open(&session_path)?);
    let expiry_reported = AtomicBool::new(false);
    let client = ApiClient::from_config(&config)
        .storage(storage)
        .on_session_expired(move |login_path| {
            warn!(login_path, "Session expired");
            // Retried calls report every 401; tell the user once.
            if !expiry_reported.swap(true, Ordering::SeqCst) {
                eprintln!("Your session has expired. Run `wayfarer login <identifier>` to sign in again.");
            }
        })
        .build()?;

    info!(base_url = client.base_url(), "Wayfarer starting");

    let mut session = SessionStore::new(client);
    session.initialize_auth().await;

    match command.as_str() {
        "status" => {
            let snapshot = session.debug_state();
            print_json(&serde_json::to_value(&snapshot)?)?;
        }
        "login" => {
            let Some(identifier) = args.get(1) else {
                bail!("Usage: wayfarer login <identifier>");
            };
            let password = rpassword::prompt_password("Password: ")?;
            let credentials = Credentials::new(identifier.as_str(), password);
            session.login(&credentials).await?;
            match session.user_info() {
                Some(user) => println!("Logged in as {}", user.display_name()),
                None => println!("Logged in (user details unavailable)"),
            }
        }
        "logout" => {
            session.logout();
            println!("Logged out");
        }
        "whoami" => match session.user_info() {
            Some(user) => print_json(&serde_json::to_value(user)?)?,
            None => bail!("Not logged in"),
        },
        "refresh" => {
            if session.refresh().await {
                println!("Session is valid");
            } else {
                bail!("Session is no longer valid; please log in again");
            }
        }
        "get" => {
            let Some(path) = args.get(1) else {
                bail!("Usage: wayfarer get <path> [key=value...]");
            };
            let mut request = ApiRequest::get(path.as_str());
            for (key, value) in parse_params(&args[2..])? {
                request = request.query(key, value);
            }
            let payload = session.client().send(&request).await?;
            print_json(&payload.into_json())?;
        }
        other => {
            eprintln!("Unknown command: {}\n\n{}", other, USAGE);
            std::process::exit(2);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_params() {
        let args = vec!["page=0".to_string(), "sort=viewCount,desc".to_string()];
        assert_eq!(
            parse_params(&args).unwrap(),
            vec![
                ("page".to_string(), "0".to_string()),
                ("sort".to_string(), "viewCount,desc".to_string())
            ]
        );
        assert!(parse_params(&["nope".to_string()]).is_err());
    }
}
