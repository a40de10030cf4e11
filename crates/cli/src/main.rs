//! Demo binary that runs a consumer test and a listener test through a
//! session backed by the in-process bus.
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use courier_client::{ConfigError, Payload, Session, SessionConfig};
use courier_messaging_memory::{MemoryRuntime, MemoryRuntimeOptions};
use tokio::sync::mpsc;
use tracing::info;
use tracing_subscriber::filter::{EnvFilter, LevelFilter};

const TEST_BODY: &str = "<xml><body>test</body>";

/// CLI-specific error type
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Session failure
    #[error(transparent)]
    Session(#[from] courier_client::Error),

    /// Config file error
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Consumer task panicked or was cancelled
    #[error("consumer task failed: {0}")]
    Join(#[from] tokio::task::JoinError),

    /// The listener saw nothing
    #[error("listener received nothing within {0:?}")]
    ListenerTimeout(Duration),
}

#[derive(Clone, Debug, Parser)]
#[command(version, about, long_about = None)]
struct Args {
    /// Session config file (TOML). Replaces the connection arguments below
    #[arg(long, env = "COURIER_CONFIG")]
    config: Option<PathBuf>,

    /// Server URL
    #[arg(long, default_value = "tcp://localhost:7222", env = "COURIER_SERVER_URL")]
    server_url: String,

    /// User name
    #[arg(long, default_value = "admin", env = "COURIER_USER")]
    user: String,

    /// Password
    #[arg(long, default_value = "", env = "COURIER_PASSWORD")]
    password: String,

    /// Dump every message to the log
    #[arg(long, env = "COURIER_DEBUG")]
    debug: bool,

    /// Destination used by both tests
    #[arg(long, default_value = "test.request", env = "COURIER_DESTINATION")]
    destination: String,

    /// Treat the destination as a queue rather than a topic
    #[arg(long, env = "COURIER_QUEUE")]
    queue: bool,

    /// Seconds to wait for a message
    #[arg(long, default_value_t = 10, env = "COURIER_TIMEOUT")]
    timeout: u64,
}

impl Args {
    const fn is_topic(&self) -> bool {
        !self.queue
    }

    fn session_config(&self) -> Result<SessionConfig, ConfigError> {
        let config = match &self.config {
            Some(path) => SessionConfig::from_file(path)?,
            None => SessionConfig::new(&self.server_url, &self.user, &self.password),
        };
        let debug = config.debug || self.debug;

        Ok(config.with_debug(debug))
    }
}

/// Receives on one task while sending from another.
async fn consumer_test(session: &Arc<Session<MemoryRuntime>>, args: &Args) -> Result<(), Error> {
    info!("consumer test");

    let receiving = tokio::spawn({
        let session = session.clone();
        let destination = args.destination.clone();
        let (is_topic, timeout) = (args.is_topic(), Duration::from_secs(args.timeout));
        async move { session.receive(&destination, is_topic, timeout).await }
    });

    // Topics only deliver to consumers that are already open.
    tokio::time::sleep(Duration::from_millis(100)).await;

    info!("producer ready");
    session
        .send(&args.destination, args.is_topic(), &Payload::text(TEST_BODY))
        .await?;

    let text = receiving.await??;
    info!("consumer received: {text}");

    Ok(())
}

/// Registers a listener and sends a map message to it.
async fn listener_test(session: &Session<MemoryRuntime>, args: &Args) -> Result<(), Error> {
    info!("listener test");

    let (sender, mut received) = mpsc::unbounded_channel();
    let id = session
        .register_listener(&args.destination, args.is_topic(), move |text| {
            info!("listener received: {text}");
            let _ = sender.send(text);
        })
        .await?;

    session
        .send(
            &args.destination,
            args.is_topic(),
            &Payload::map("DATA", TEST_BODY),
        )
        .await?;

    let timeout = Duration::from_secs(args.timeout);
    let outcome = tokio::time::timeout(timeout, received.recv()).await;
    session.unregister_listener(id).await?;

    match outcome {
        Ok(Some(_)) => Ok(()),
        _ => Err(Error::ListenerTimeout(timeout)),
    }
}

/// Info and above unless `directives` (from `RUST_LOG`) say otherwise.
fn log_filter(directives: &str) -> EnvFilter {
    EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .parse_lossy(directives)
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    let directives = std::env::var(EnvFilter::DEFAULT_ENV).unwrap_or_default();
    tracing_subscriber::fmt()
        .with_env_filter(log_filter(&directives))
        .init();

    let args = Args::parse();
    let config = args.session_config()?;

    // The in-process bus listens wherever the session expects it.
    let server_url = config
        .server_url
        .split(',')
        .next()
        .unwrap_or_default()
        .trim()
        .to_string();
    let runtime = MemoryRuntime::new(MemoryRuntimeOptions {
        server_url,
        ..MemoryRuntimeOptions::default()
    });

    let session = Arc::new(Session::create(&runtime, &config).await?);

    let mut result = consumer_test(&session, &args).await;
    if result.is_ok() {
        result = listener_test(&session, &args).await;
    }

    session.close().await?;
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_filter_shows_info_by_default() {
        assert_eq!(log_filter("").to_string(), "info");
        assert!(
            log_filter("courier_client=debug")
                .to_string()
                .contains("courier_client=debug")
        );
    }

    #[test]
    fn test_destination_defaults_to_topic() {
        let args = Args::parse_from(["courier-demo"]);
        assert!(args.is_topic());
        assert_eq!(args.destination, "test.request");

        let args = Args::parse_from(["courier-demo", "--queue"]);
        assert!(!args.is_topic());
    }

    #[test]
    fn test_debug_flag_reaches_session_config() {
        let args = Args::parse_from(["courier-demo", "--debug", "--user", "demo"]);
        let config = args.session_config().unwrap();
        assert!(config.debug);
        assert_eq!(config.user_name, "demo");
    }
}
