use std::{
    env, fs,
    path::{Path, PathBuf},
};

use crate::{errors::Error, Result};

/// Typed configuration for the bot, loaded once at process start.
#[derive(Clone, Debug)]
pub struct Config {
    pub telegram_bot_token: String,
    /// Group ids the bot is active in. Everything else is ignored.
    pub registered_groups: Vec<i64>,
    /// Token that introduces a command, e.g. `;add`.
    pub command_prefix: String,
    /// Members per notification message.
    pub mention_batch: usize,
    /// Maximum roles a single user may hold (across groups).
    pub max_roles: usize,
    pub database_path: PathBuf,
}

impl Config {
    pub fn load() -> Result<Self> {
        load_dotenv_if_present(Path::new(".env"));

        let telegram_bot_token = env_str("TELEGRAM_BOT_TOKEN").unwrap_or_default();
        if telegram_bot_token.trim().is_empty() {
            return Err(Error::Config(
                "TELEGRAM_BOT_TOKEN environment variable is required".to_string(),
            ));
        }

        let registered_groups = parse_csv_i64(env_str("REGISTERED_GROUPS"));
        if registered_groups.is_empty() {
            return Err(Error::Config(
                "REGISTERED_GROUPS environment variable is required".to_string(),
            ));
        }

        let command_prefix = env_str("COMMAND_PREFIX")
            .and_then(non_empty)
            .unwrap_or_else(|| ";".to_string());
        let mention_batch = env_usize("MENTION_BATCH").unwrap_or(7).max(1);
        let max_roles = env_usize("MAX_ROLES").unwrap_or(10);
        let database_path =
            PathBuf::from(env_str("DATABASE_PATH").unwrap_or("db/roles.db".to_string()));

        Ok(Self {
            telegram_bot_token,
            registered_groups,
            command_prefix,
            mention_batch,
            max_roles,
            database_path,
        })
    }
}

fn env_str(key: &str) -> Option<String> {
    env::var(key).ok()
}

fn env_usize(key: &str) -> Option<usize> {
    env_str(key).and_then(|s| s.trim().parse::<usize>().ok())
}

fn parse_csv_i64(v: Option<String>) -> Vec<i64> {
    v.unwrap_or_default()
        .split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .filter_map(|s| s.parse::<i64>().ok())
        .collect()
}

fn non_empty(s: String) -> Option<String> {
    if s.trim().is_empty() {
        None
    } else {
        Some(s)
    }
}

fn load_dotenv_if_present(path: &Path) {
    let Ok(contents) = fs::read_to_string(path) else {
        return;
    };

    for raw in contents.lines() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let Some((k, v)) = line.split_once('=') else {
            continue;
        };

        let key = k.trim();
        if key.is_empty() {
            continue;
        }
        if env::var_os(key).is_some() {
            continue; // do not override existing env
        }

        let mut val = v.trim().to_string();
        // Strip optional surrounding quotes.
        if val.len() >= 2
            && ((val.starts_with('"') && val.ends_with('"'))
                || (val.starts_with('\'') && val.ends_with('\'')))
        {
            val = val[1..val.len() - 1].to_string();
        }

        env::set_var(key, val);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn csv_parsing() {
        assert_eq!(
            parse_csv_i64(Some("-100123, -100456".to_string())),
            vec![-100123, -100456]
        );
        assert_eq!(parse_csv_i64(Some(" ,,".to_string())), Vec::<i64>::new());
        assert_eq!(parse_csv_i64(None), Vec::<i64>::new());
        // Junk entries are skipped, not fatal.
        assert_eq!(
            parse_csv_i64(Some("-1,abc,-2".to_string())),
            vec![-1, -2]
        );
    }

    #[test]
    fn non_empty_filters_whitespace() {
        assert_eq!(non_empty("  ".to_string()), None);
        assert_eq!(non_empty(";".to_string()), Some(";".to_string()));
    }
}
