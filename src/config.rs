/// Worker configuration, loaded from environment variables.
///
/// Every worker process in the cluster runs with the same `DATABASE_URL` and
/// `REDIS_URL`; the supervisor that forks the workers assigns each one a
/// distinct `PORT`.
#[derive(Debug, Clone)]
pub struct Config {
    /// PostgreSQL connection string for the shared message log.
    pub database_url: String,
    /// Redis connection string for cross-worker fan-out. When unset the
    /// worker runs with local-only fan-out (single-process mode).
    pub redis_url: Option<String>,
    /// Pub/sub channel name shared by every worker in the broadcast domain.
    pub bus_channel: String,
    /// Port the HTTP server binds to (assigned by the supervisor).
    pub port: u16,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Panics with a descriptive message if a required variable is missing.
    pub fn from_env() -> Self {
        Self {
            database_url: required_var("DATABASE_URL"),
            redis_url: std::env::var("REDIS_URL").ok().filter(|s| !s.is_empty()),
            bus_channel: std::env::var("BUS_CHANNEL")
                .ok()
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| "murmur:chat".to_string()),
            port: std::env::var("PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(8000),
        }
    }
}

fn required_var(name: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| panic!("{name} env var is required"))
}

/// Rewrite a database URL to point at its `_test`-suffixed sibling database.
/// Used by the migration runner's `--test` flag and the integration-test
/// harness so tests never touch the real log.
pub fn with_test_db_suffix(database_url: &str) -> String {
    let mut parts = database_url.splitn(2, '?');
    let base = parts.next().unwrap_or(database_url);
    let query = parts.next();

    let mut base_parts = base.rsplitn(2, '/');
    let db_name = base_parts.next().unwrap_or("");
    let prefix = base_parts.next().unwrap_or("");

    if db_name.is_empty() || db_name.ends_with("_test") {
        return database_url.to_string();
    }

    let mut updated = format!("{prefix}/{db_name}_test");
    if let Some(query) = query {
        updated.push('?');
        updated.push_str(query);
    }
    updated
}
