//! Configuration loader with TOML parsing and environment variable overrides

use super::schema::DocRepoConfig;
use super::secret::secret_string;
use crate::domain::errors::RepositoryError;
use crate::domain::result::Result;
use regex::Regex;
use std::fs;
use std::path::Path;
use std::sync::OnceLock;

/// Loads configuration from a TOML file
///
/// This function:
/// 1. Reads the TOML file
/// 2. Performs environment variable substitution (${VAR} syntax)
/// 3. Parses the TOML into [`DocRepoConfig`]
/// 4. Applies environment variable overrides (DOCREPO_* prefix)
/// 5. Validates the configuration
///
/// # Errors
///
/// Returns [`RepositoryError::Configuration`] if any step fails.
///
/// # Examples
///
/// ```no_run
/// use docrepo::config::load_config;
///
/// let config = load_config("docrepo.toml").expect("Failed to load config");
/// ```
pub fn load_config(path: impl AsRef<Path>) -> Result<DocRepoConfig> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(RepositoryError::Configuration(format!(
            "Configuration file not found: {}",
            path.display()
        )));
    }

    let contents = fs::read_to_string(path).map_err(|e| {
        RepositoryError::Configuration(format!(
            "Failed to read configuration file {}: {}",
            path.display(),
            e
        ))
    })?;

    parse_config(&contents)
}

/// Parses configuration text, applying substitution, overrides and validation
pub fn parse_config(contents: &str) -> Result<DocRepoConfig> {
    let contents = substitute_env_vars(contents)?;

    let mut config: DocRepoConfig = toml::from_str(&contents)
        .map_err(|e| RepositoryError::Configuration(format!("Failed to parse TOML: {}", e)))?;

    apply_env_overrides(&mut config);

    config.validate().map_err(|e| {
        RepositoryError::Configuration(format!("Configuration validation failed: {}", e))
    })?;

    Ok(config)
}

fn placeholder_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}").expect("placeholder pattern is valid")
    })
}

/// Substitutes environment variables in the format ${VAR_NAME}
///
/// Comment lines are copied verbatim.
///
/// # Errors
///
/// Returns an error naming every referenced variable that is not set.
fn substitute_env_vars(input: &str) -> Result<String> {
    let re = placeholder_pattern();
    let mut result = String::with_capacity(input.len());
    let mut missing_vars: Vec<String> = Vec::new();

    for line in input.lines() {
        if line.trim_start().starts_with('#') {
            result.push_str(line);
            result.push('\n');
            continue;
        }

        let mut processed_line = line.to_string();
        for cap in re.captures_iter(line) {
            let var_name = &cap[1];
            match std::env::var(var_name) {
                Ok(value) => {
                    processed_line = processed_line.replace(&cap[0], &value);
                }
                Err(_) => {
                    if !missing_vars.iter().any(|v| v == var_name) {
                        missing_vars.push(var_name.to_string());
                    }
                }
            }
        }
        result.push_str(&processed_line);
        result.push('\n');
    }

    if !missing_vars.is_empty() {
        return Err(RepositoryError::Configuration(format!(
            "Missing required environment variables: {}",
            missing_vars.join(", ")
        )));
    }

    Ok(result)
}

/// Applies environment variable overrides using the DOCREPO_* prefix
///
/// Variables follow `DOCREPO_<SECTION>_<KEY>`, e.g. `DOCREPO_STORE_DATABASE_NAME`.
/// Unparseable numeric overrides are ignored.
fn apply_env_overrides(config: &mut DocRepoConfig) {
    if let Ok(val) = std::env::var("DOCREPO_APPLICATION_LOG_LEVEL") {
        config.application.log_level = val;
    }

    if let Ok(val) = std::env::var("DOCREPO_STORE_CONNECTION_STRING") {
        config.store.connection_string = secret_string(val);
    }
    if let Ok(val) = std::env::var("DOCREPO_STORE_DATABASE_NAME") {
        config.store.database_name = val;
    }
    if let Ok(val) = std::env::var("DOCREPO_STORE_COLLECTION_NAME") {
        config.store.collection_name = Some(val);
    }
    if let Ok(val) = std::env::var("DOCREPO_STORE_DOWN_TIME_SECONDS") {
        if let Ok(seconds) = val.parse() {
            config.store.down_time_seconds = seconds;
        }
    }

    if let Ok(val) = std::env::var("DOCREPO_RETRY_MAX_ATTEMPTS") {
        if let Ok(attempts) = val.parse() {
            config.retry.max_attempts = attempts;
        }
    }
    if let Ok(val) = std::env::var("DOCREPO_RETRY_DELAY_MS") {
        if let Ok(delay) = val.parse() {
            config.retry.delay_ms = delay;
        }
    }
}
