use anyhow::{Result, anyhow};
use tracing_subscriber::{EnvFilter, fmt};

const CLIENT_TARGETS: [&str; 2] = ["feed_cli", "feed_client"];

/// Логи идут в stderr, чтобы не смешиваться с выводом команд.
///
/// Простой уровень вроде `debug` относится только к крейтам клиента,
/// зависимости пишут не ниже `warn`. `RUST_LOG` имеет приоритет.
pub fn init_logging(default_level: &str) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_directives(default_level)))
        .unwrap_or_else(|_| EnvFilter::new(default_directives("info")));

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .compact()
        .try_init()
        .map_err(|e| anyhow!("failed to init logging: {e}"))?;

    Ok(())
}

fn default_directives(level: &str) -> String {
    let level = level.trim();
    if level.contains(['=', ',']) {
        return level.to_string();
    }

    let mut directives = vec!["warn".to_string()];
    directives.extend(CLIENT_TARGETS.iter().map(|target| format!("{target}={level}")));
    directives.join(",")
}
