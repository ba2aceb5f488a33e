//! # rawq
//!
//! Operator tool for shared-memory byte ring queues.
//!
//! # Usage
//!
//! ```bash
//! # Own a 64 KiB queue until Ctrl-C
//! rawq --name telemetry serve --capacity 65536
//!
//! # Same, from a config file
//! rawq --config /etc/rawq/telemetry.toml serve
//!
//! # Produce and consume from other shells
//! echo -n "hello" | rawq --name telemetry put
//! rawq --name telemetry get 5
//!
//! # Inspect
//! rawq --name telemetry status
//! rawq list
//!
//! # Remove regions left behind by a crashed owner
//! rawq --name telemetry unlink
//! ```

#![deny(warnings)]

use clap::{Parser, Subcommand};
use rawq_common::prelude::*;
use rawq_shm::RingQueue;
use std::io::{Read, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{Level, error, info};
use tracing_subscriber::EnvFilter;

/// rawq - shared-memory byte ring queue tool
#[derive(Parser, Debug)]
#[command(name = "rawq")]
#[command(version)]
#[command(about = "Create, feed, drain and inspect shared-memory byte ring queues")]
#[command(long_about = None)]
struct Args {
    /// Path to a TOML config file with [shared] and [queue] tables
    #[arg(short, long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Queue base name (overrides the config file)
    #[arg(short, long, global = true)]
    name: Option<String>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output logs in JSON format
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create the queue and own it until SIGINT/SIGTERM
    Serve {
        /// Ring capacity in bytes (overrides the config file)
        #[arg(long)]
        capacity: Option<usize>,
    },
    /// Append bytes (argument, or stdin when omitted)
    Put {
        /// Payload as UTF-8 text
        data: Option<String>,
    },
    /// Remove exactly LENGTH bytes and write them to stdout
    Get {
        /// Number of bytes to read
        length: usize,
    },
    /// Print the queue state as JSON
    Status,
    /// List queues found in /dev/shm as JSON
    List,
    /// Unlink all five regions of the queue
    Unlink,
}

fn main() {
    let args = Args::parse();

    if let Err(e) = run(args) {
        error!("rawq failed: {}", e);
        std::process::exit(1);
    }
}

fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let file_config = match &args.config {
        Some(path) => {
            let config = RawqConfig::load(path)?;
            config.validate()?;
            Some(config)
        }
        None => None,
    };

    let log_level = file_config
        .as_ref()
        .map(|c| c.shared.log_level)
        .unwrap_or_default();
    setup_tracing(tracing_level(log_level, args.verbose), args.json);

    execute(&args, file_config.as_ref())
}

/// Dispatch one subcommand.
fn execute(
    args: &Args,
    file_config: Option<&RawqConfig>,
) -> Result<(), Box<dyn std::error::Error>> {
    match &args.command {
        Command::Serve { capacity } => {
            let queue = resolve_queue(args, file_config, *capacity)?;
            serve(&queue)?;
        }
        Command::Put { data } => {
            let queue = resolve_queue(args, file_config, None)?;
            let bytes = match data {
                Some(text) => text.as_bytes().to_vec(),
                None => {
                    let mut buf = Vec::new();
                    std::io::stdin().read_to_end(&mut buf)?;
                    buf
                }
            };
            let mut handle = RingQueue::attach(&queue.name)?;
            handle.put(&bytes)?;
            info!(queue = %queue.name, len = bytes.len(), "put");
            handle.release()?;
        }
        Command::Get { length } => {
            let queue = resolve_queue(args, file_config, None)?;
            let mut handle = RingQueue::attach(&queue.name)?;
            let bytes = handle.get(*length)?;
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(&bytes)?;
            stdout.flush()?;
            handle.release()?;
        }
        Command::Status => {
            let queue = resolve_queue(args, file_config, None)?;
            let handle = RingQueue::attach(&queue.name)?;
            let status = handle.status()?;
            println!("{}", serde_json::to_string_pretty(&status)?);
            handle.release()?;
        }
        Command::List => {
            let queues = rawq_shm::list_queues()?;
            println!("{}", serde_json::to_string_pretty(&queues)?);
        }
        Command::Unlink => {
            let queue = resolve_queue(args, file_config, None)?;
            let removed = rawq_shm::unlink_queue(&queue.name)?;
            println!("removed {removed} region(s) of '{}'", queue.name);
        }
    }

    Ok(())
}

/// Merge the config file with command-line overrides.
fn resolve_queue(
    args: &Args,
    file_config: Option<&RawqConfig>,
    capacity: Option<usize>,
) -> Result<QueueConfig, Box<dyn std::error::Error>> {
    let mut queue = match (file_config, &args.name) {
        (Some(config), _) => config.queue.clone(),
        (None, Some(name)) => QueueConfig {
            name: name.clone(),
            capacity: DEFAULT_CAPACITY,
        },
        (None, None) => return Err("queue name required (--name or --config)".into()),
    };

    if let Some(name) = &args.name {
        queue.name = name.clone();
    }
    if let Some(capacity) = capacity {
        queue.capacity = capacity;
    }
    queue.validate()?;
    Ok(queue)
}

/// Own the queue until a termination signal arrives.
fn serve(config: &QueueConfig) -> Result<(), Box<dyn std::error::Error>> {
    let queue = RingQueue::create(&config.name, config.capacity)?;
    info!(
        "Serving queue '{}' ({} bytes), Ctrl-C to release",
        queue.name(),
        queue.capacity()
    );

    let running = Arc::new(AtomicBool::new(true));
    let flag = running.clone();
    ctrlc::set_handler(move || {
        info!("Received shutdown signal");
        flag.store(false, Ordering::SeqCst);
    })?;

    while running.load(Ordering::SeqCst) {
        std::thread::sleep(Duration::from_millis(100));
    }

    let status = queue.status()?;
    info!(
        used = status.used,
        free = status.free,
        "releasing queue '{}'",
        status.name
    );
    queue.release()?;
    Ok(())
}

fn tracing_level(log_level: LogLevel, verbose: bool) -> Level {
    if verbose {
        return Level::DEBUG;
    }
    match log_level {
        LogLevel::Trace => Level::TRACE,
        LogLevel::Debug => Level::DEBUG,
        LogLevel::Info => Level::INFO,
        LogLevel::Warn => Level::WARN,
        LogLevel::Error => Level::ERROR,
    }
}

/// Setup tracing subscriber; logs go to stderr so `get` output stays clean.
fn setup_tracing(level: Level, json: bool) {
    let filter = EnvFilter::from_default_env().add_directive(level.into());

    if json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .init();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn parse(argv: &[&str]) -> Args {
        Args::try_parse_from(argv).unwrap()
    }

    fn sample_config() -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r#"[shared]
log_level = "warn"
service_name = "cli-test"

[queue]
name = "from_file"
capacity = 2048
"#
        )
        .unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_parse_subcommands() {
        let args = parse(&["rawq", "--name", "q", "get", "12"]);
        assert!(matches!(args.command, Command::Get { length: 12 }));

        let args = parse(&["rawq", "serve", "--capacity", "1024", "-n", "q"]);
        assert!(matches!(
            args.command,
            Command::Serve {
                capacity: Some(1024)
            }
        ));
        assert_eq!(args.name.as_deref(), Some("q"));

        let args = parse(&["rawq", "put"]);
        assert!(matches!(args.command, Command::Put { data: None }));
    }

    #[test]
    fn test_resolve_requires_name() {
        let args = parse(&["rawq", "status"]);
        assert!(resolve_queue(&args, None, None).is_err());

        let args = parse(&["rawq", "-n", "q", "status"]);
        let queue = resolve_queue(&args, None, None).unwrap();
        assert_eq!(queue.name, "q");
        assert_eq!(queue.capacity, DEFAULT_CAPACITY);
    }

    #[test]
    fn test_resolve_overrides_config_file() {
        let file = sample_config();
        let config = RawqConfig::load(file.path()).unwrap();

        let args = parse(&["rawq", "status"]);
        let queue = resolve_queue(&args, Some(&config), None).unwrap();
        assert_eq!(queue.name, "from_file");
        assert_eq!(queue.capacity, 2048);

        let args = parse(&["rawq", "-n", "override", "serve"]);
        let queue = resolve_queue(&args, Some(&config), Some(512)).unwrap();
        assert_eq!(queue.name, "override");
        assert_eq!(queue.capacity, 512);
    }

    #[test]
    fn test_resolve_rejects_bad_capacity() {
        let args = parse(&["rawq", "-n", "q", "serve"]);
        assert!(resolve_queue(&args, None, Some(0)).is_err());
    }

    #[test]
    fn test_execute_against_live_queue() {
        let name = format!("rawq_cli_{}", std::process::id());
        let mut owner = RingQueue::create(&name, 64).unwrap();

        execute(&parse(&["rawq", "-n", &name, "put", "hello"]), None).unwrap();
        assert_eq!(owner.len(), 5);

        execute(&parse(&["rawq", "-n", &name, "status"]), None).unwrap();
        execute(&parse(&["rawq", "list"]), None).unwrap();
        execute(&parse(&["rawq", "-n", &name, "get", "2"]), None).unwrap();
        assert_eq!(owner.get(3).unwrap(), b"llo");

        assert!(execute(&parse(&["rawq", "-n", &name, "get", "1"]), None).is_err());

        execute(&parse(&["rawq", "-n", &name, "unlink"]), None).unwrap();
        assert!(RingQueue::attach(&name).is_err());
        assert!(execute(&parse(&["rawq", "-n", &name, "status"]), None).is_err());
    }

    #[test]
    fn test_tracing_level() {
        assert_eq!(tracing_level(LogLevel::Warn, false), Level::WARN);
        assert_eq!(tracing_level(LogLevel::Warn, true), Level::DEBUG);
        assert_eq!(tracing_level(LogLevel::default(), false), Level::INFO);
    }
}
