//! CAP CLI
//!
//! Command-line administration of the CAP cache backend.
//!
//! # Usage
//!
//! ```bash
//! capctl --help
//! capctl set tenant:acme '{"plan": "basic"}' --ttl 600
//! capctl get tenant:acme
//! capctl --local key tenants::get '["acme"]'
//! ```

#![deny(unsafe_code)]

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde_json::Value;
use shared::cache::{cache_key, CacheManager, RedisStore};
use shared::config::{LogFormat, LoggingConfig, DEFAULT_REDIS_URL, DEFAULT_TTL_SECS};
use shared::observability::init_logging;
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

/// CAP CLI - cache administration command-line interface
#[derive(Parser)]
#[command(name = "capctl")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Redis URL
    #[arg(long, env = "CAP_REDIS_URL", default_value = DEFAULT_REDIS_URL)]
    redis_url: String,

    /// Use a throwaway in-process cache instead of Redis
    #[arg(long)]
    local: bool,

    /// Log cache internals to the console
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the JSON value stored under a key
    Get {
        /// Cache key
        key: String,
    },
    /// Store a JSON value
    Set {
        /// Cache key
        key: String,
        /// JSON value; bare words are stored as strings
        value: String,
        /// Time to live in seconds
        #[arg(long, default_value_t = DEFAULT_TTL_SECS)]
        ttl: u64,
    },
    /// Delete a key
    Delete {
        /// Cache key
        key: String,
    },
    /// Delete keys matching a glob pattern (Redis only; literal on the local store)
    DeletePattern {
        /// Glob pattern such as `tenant:*`
        pattern: String,
    },
    /// Increment an integer counter
    Incr {
        /// Cache key
        key: String,
        /// Amount to add; negative values decrement
        #[arg(long, default_value_t = 1, allow_hyphen_values = true)]
        by: i64,
    },
    /// Check whether a key exists
    Exists {
        /// Cache key
        key: String,
    },
    /// Remove every key in the current database
    Flush,
    /// Print the memoization key for a function and JSON arguments
    Key {
        /// Fully qualified function name
        function: String,
        /// Arguments as JSON
        args: String,
        /// Key prefix
        #[arg(long)]
        prefix: Option<String>,
    },
}

/// Parses a command-line value as JSON, treating bare words as strings.
fn parse_value(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

fn connect(cli: &Cli) -> Result<CacheManager> {
    let default_ttl = Duration::from_secs(DEFAULT_TTL_SECS);
    if cli.local {
        return Ok(CacheManager::local());
    }

    let store = RedisStore::connect(&cli.redis_url)
        .with_context(|| format!("Failed to connect to Redis at {}", cli.redis_url))?;
    Ok(CacheManager::with_store(Arc::new(store), default_ttl))
}

/// Runs one command against `cache`, writing its result to `out`.
fn execute(cache: &CacheManager, command: &Commands, out: &mut impl Write) -> Result<()> {
    match command {
        Commands::Get { key } => match cache.try_get_value(key)? {
            Some(value) => writeln!(out, "{value}")?,
            None => writeln!(out, "(nil)")?,
        },
        Commands::Set { key, value, ttl } => {
            cache.try_set(key, &parse_value(value), Some(Duration::from_secs(*ttl)))?;
            writeln!(out, "OK")?;
        }
        Commands::Delete { key } => {
            let removed = cache.try_delete(key)?;
            writeln!(out, "{}", u8::from(removed))?;
        }
        Commands::DeletePattern { pattern } => {
            if !cache.supports_patterns() {
                eprintln!("warning: the {} backend only deletes the literal key", cache.backend());
            }
            writeln!(out, "{}", cache.try_delete_pattern(pattern)?)?;
        }
        Commands::Incr { key, by } => {
            writeln!(out, "{}", cache.try_increment(key, *by)?)?;
        }
        Commands::Exists { key } => {
            writeln!(out, "{}", cache.try_exists(key)?)?;
        }
        Commands::Flush => {
            cache.try_flush()?;
            writeln!(out, "OK")?;
        }
        Commands::Key {
            function,
            args,
            prefix,
        } => {
            let args: Value = serde_json::from_str(args).context("Arguments must be valid JSON")?;
            writeln!(out, "{}", cache_key(function, &args, prefix.as_deref()))?;
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    if cli.verbose {
        init_logging(&LoggingConfig {
            level: "debug".to_string(),
            format: LogFormat::Pretty,
        })?;
    }

    let Some(command) = &cli.command else {
        println!("CAP CLI v{}", env!("CARGO_PKG_VERSION"));
        println!("Use --help for usage information");
        return Ok(());
    };

    let cache = connect(&cli)?;
    tracing::debug!(backend = %cache.backend(), "Running cache command");

    let stdout = std::io::stdout();
    execute(&cache, command, &mut stdout.lock())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(cache: &CacheManager, args: &[&str]) -> Result<String> {
        let mut argv = vec!["capctl", "--local"];
        argv.extend_from_slice(args);
        let cli = Cli::try_parse_from(argv)?;

        let mut out = Vec::new();
        execute(cache, cli.command.as_ref().unwrap(), &mut out)?;
        Ok(String::from_utf8(out)?.trim_end().to_string())
    }

    #[test]
    fn test_cli_parse() {
        let cli = Cli::try_parse_from(["capctl"]);
        assert!(cli.is_ok());
        assert!(cli.unwrap().command.is_none());
    }

    #[test]
    fn test_cli_set_command() {
        let cli = Cli::try_parse_from(["capctl", "set", "k", "42", "--ttl", "60"]).unwrap();
        assert!(matches!(cli.command, Some(Commands::Set { ttl: 60, .. })));
    }

    #[test]
    fn test_set_get_delete() {
        let cache = CacheManager::local();

        assert_eq!(run(&cache, &["get", "tenant:acme"]).unwrap(), "(nil)");
        assert_eq!(
            run(&cache, &["set", "tenant:acme", r#"{"plan":"basic"}"#]).unwrap(),
            "OK"
        );
        assert_eq!(
            run(&cache, &["get", "tenant:acme"]).unwrap(),
            r#"{"plan":"basic"}"#
        );
        assert_eq!(run(&cache, &["exists", "tenant:acme"]).unwrap(), "true");
        assert_eq!(run(&cache, &["delete", "tenant:acme"]).unwrap(), "1");
        assert_eq!(run(&cache, &["exists", "tenant:acme"]).unwrap(), "false");
    }

    #[test]
    fn test_bare_word_is_stored_as_string() {
        let cache = CacheManager::local();
        run(&cache, &["set", "greeting", "hello"]).unwrap();
        assert_eq!(cache.get::<String>("greeting").as_deref(), Some("hello"));
    }

    #[test]
    fn test_incr_and_decrement() {
        let cache = CacheManager::local();
        assert_eq!(run(&cache, &["incr", "hits"]).unwrap(), "1");
        assert_eq!(run(&cache, &["incr", "hits", "--by", "10"]).unwrap(), "11");
        assert_eq!(run(&cache, &["incr", "hits", "--by", "-3"]).unwrap(), "8");
    }

    #[test]
    fn test_incr_non_integer_fails() {
        let cache = CacheManager::local();
        run(&cache, &["set", "name", "\"acme\""]).unwrap();
        assert!(run(&cache, &["incr", "name"]).is_err());
    }

    #[test]
    fn test_delete_pattern_is_literal_on_local() {
        let cache = CacheManager::local();
        run(&cache, &["set", "user:1", "1"]).unwrap();
        assert_eq!(run(&cache, &["delete-pattern", "user:*"]).unwrap(), "0");
        assert!(cache.exists("user:1"));
    }

    #[test]
    fn test_flush() {
        let cache = CacheManager::local();
        run(&cache, &["set", "a", "1"]).unwrap();
        assert_eq!(run(&cache, &["flush"]).unwrap(), "OK");
        assert!(!cache.exists("a"));
    }

    #[test]
    fn test_key_matches_library() {
        let cache = CacheManager::local();
        let printed = run(&cache, &["key", "tenants::get", r#"["acme"]"#, "--prefix", "tenant"]).unwrap();
        assert_eq!(
            printed,
            cache_key("tenants::get", &serde_json::json!(["acme"]), Some("tenant"))
        );
        assert!(run(&cache, &["key", "f", "{not json"]).is_err());
    }

    #[test]
    fn test_connect_local() {
        let cli = Cli::try_parse_from(["capctl", "--local", "flush"]).unwrap();
        let cache = connect(&cli).unwrap();
        assert!(!cache.supports_patterns());
    }

    #[test]
    fn test_connect_unreachable_redis_fails() {
        let cli = Cli::try_parse_from(["capctl", "--redis-url", "redis://127.0.0.1:1/0", "flush"]).unwrap();
        assert!(connect(&cli).is_err());
    }
}
