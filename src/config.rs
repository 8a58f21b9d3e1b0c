use anyhow::{anyhow, Context as _};
use reqwest::Url;
use std::{path::PathBuf, time::Duration};
use teloxide::types::{ChatId, UserId};

/// Категории каталога: (эмодзи, название). В фильмах хранится только название.
pub const CATEGORIES: &[(&str, &str)] = &[
    ("🎬", "Action"),
    ("😄", "Comedy"),
    ("🎭", "Drama"),
    ("👻", "Horror"),
    ("💝", "Romance"),
    ("🚀", "Sci-Fi"),
    ("🔍", "Thriller"),
    ("📚", "Documentary"),
];

#[derive(Debug, Clone)]
pub struct Config {
    pub owner_id: UserId,
    /// чат, куда уходят неудачные поиски
    pub log_chat_id: Option<ChatId>,
    pub support_url: Option<Url>,
    pub welcome_image_url: Option<String>,
    pub store_path: PathBuf,
    pub legacy_json_path: Option<PathBuf>,
    pub poster_timeout: Duration,
    pub session_ttl: Duration,
}

impl Config {
    /// Токен бота сюда не входит: его читает `Bot::from_env` (TELOXIDE_TOKEN).
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let var = |key: &str| get(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let owner_id = var("OWNER_ID")
            .ok_or_else(|| anyhow!("OWNER_ID is missing"))?
            .parse::<u64>()
            .context("OWNER_ID must be a numeric Telegram user id")?;
        let log_chat_id = var("LOG_CHAT_ID")
            .map(|v| v.parse::<i64>().context("LOG_CHAT_ID must be a numeric chat id"))
            .transpose()?;
        let support_url = var("SUPPORT_URL")
            .map(|v| Url::parse(&v).context("SUPPORT_URL must be an absolute URL"))
            .transpose()?;
        let poster_timeout = seconds(var("POSTER_TIMEOUT_SECS"), 30).context("POSTER_TIMEOUT_SECS")?;
        let session_ttl = seconds(var("SESSION_TTL_SECS"), 3600).context("SESSION_TTL_SECS")?;

        Ok(Self {
            owner_id: UserId(owner_id),
            log_chat_id: log_chat_id.map(ChatId),
            support_url,
            welcome_image_url: var("WELCOME_IMAGE_URL"),
            store_path: var("STORE_PATH").unwrap_or_else(|| "movies.json".to_string()).into(),
            legacy_json_path: var("LEGACY_JSON_PATH").map(PathBuf::from),
            poster_timeout,
            session_ttl,
        })
    }

    pub fn is_owner(&self, user: UserId) -> bool {
        user == self.owner_id
    }
}

fn seconds(value: Option<String>, default: u64) -> anyhow::Result<Duration> {
    let secs = match value {
        Some(v) => v.parse::<u64>().with_context(|| format!("expected seconds, got {v:?}"))?,
        None => default,
    };
    Ok(Duration::from_secs(secs))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(pairs: &[(&str, &str)]) -> anyhow::Result<Config> {
        let env: HashMap<String, String> =
            pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        Config::from_lookup(|key| env.get(key).cloned())
    }

    #[test]
    fn defaults_apply() {
        let cfg = config(&[("OWNER_ID", "7799390858")]).unwrap();
        assert_eq!(cfg.owner_id, UserId(7799390858));
        assert!(cfg.log_chat_id.is_none());
        assert!(cfg.support_url.is_none());
        assert_eq!(cfg.store_path, PathBuf::from("movies.json"));
        assert_eq!(cfg.poster_timeout, Duration::from_secs(30));
        assert_eq!(cfg.session_ttl, Duration::from_secs(3600));
        assert!(cfg.is_owner(UserId(7799390858)));
        assert!(!cfg.is_owner(UserId(1)));
    }

    #[test]
    fn owner_is_required() {
        assert!(config(&[]).is_err());
        assert!(config(&[("OWNER_ID", "  ")]).is_err());
        assert!(config(&[("OWNER_ID", "abc")]).is_err());
    }

    #[test]
    fn optional_values_are_parsed() {
        let cfg = config(&[
            ("OWNER_ID", "1"),
            ("LOG_CHAT_ID", "-4684890007"),
            ("SUPPORT_URL", "https://t.me/support_channel"),
            ("STORE_PATH", "/var/lib/bot/movies.json"),
            ("LEGACY_JSON_PATH", "data/movies.json"),
            ("POSTER_TIMEOUT_SECS", "5"),
        ])
        .unwrap();
        assert_eq!(cfg.log_chat_id, Some(ChatId(-4684890007)));
        assert_eq!(cfg.support_url.unwrap().host_str(), Some("t.me"));
        assert_eq!(cfg.legacy_json_path, Some(PathBuf::from("data/movies.json")));
        assert_eq!(cfg.poster_timeout, Duration::from_secs(5));
    }

    #[test]
    fn malformed_values_fail() {
        assert!(config(&[("OWNER_ID", "1"), ("SUPPORT_URL", "not a url")]).is_err());
        assert!(config(&[("OWNER_ID", "1"), ("SESSION_TTL_SECS", "soon")]).is_err());
        assert!(config(&[("OWNER_ID", "1"), ("LOG_CHAT_ID", "chat")]).is_err());
    }
}
