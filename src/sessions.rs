use crate::flow::Session;
use moka::future::Cache;
use std::time::Duration;
use teloxide::types::UserId;

/// Сессии диалогов по пользователям. Живут только в памяти процесса;
/// брошенный диалог сам исчезает после `ttl` простоя.
#[derive(Clone)]
pub struct SessionManager {
    cache: Cache<UserId, Session>,
}

impl SessionManager {
    pub fn new(ttl: Duration) -> Self {
        Self { cache: Cache::builder().time_to_idle(ttl).build() }
    }

    pub async fn get(&self, user: UserId) -> Session {
        self.cache.get(&user).await.unwrap_or_default()
    }

    /// `Session::Idle` не храним: это то же самое, что отсутствие сессии.
    pub async fn store(&self, user: UserId, session: Session) {
        if session == Session::Idle {
            self.clear(user).await;
        } else {
            self.cache.insert(user, session).await;
        }
    }

    pub async fn clear(&self, user: UserId) {
        self.cache.invalidate(&user).await;
    }
}
