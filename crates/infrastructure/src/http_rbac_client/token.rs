use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;

/// Tokens are refreshed this long before the server-side expiry.
const EXPIRY_MARGIN: Duration = Duration::from_secs(60);
const DEFAULT_LIFETIME: Duration = Duration::from_secs(300);

#[derive(Debug, Clone)]
struct CachedToken {
    value: String,
    refresh_at: Instant,
}

/// Access token shared by every call of one client.
#[derive(Debug, Default)]
pub(super) struct TokenCache {
    current: Mutex<Option<CachedToken>>,
}

impl TokenCache {
    pub async fn valid_token(&self) -> Option<String> {
        self.current
            .lock()
            .await
            .as_ref()
            .filter(|token| Instant::now() < token.refresh_at)
            .map(|token| token.value.clone())
    }

    pub async fn store(&self, value: String, expires_in: Option<u64>) {
        let lifetime = expires_in.map_or(DEFAULT_LIFETIME, Duration::from_secs);
        let now = Instant::now();
        let refresh_at = now
            .checked_add(lifetime.saturating_sub(EXPIRY_MARGIN))
            .unwrap_or_else(|| now + DEFAULT_LIFETIME.saturating_sub(EXPIRY_MARGIN));
        *self.current.lock().await = Some(CachedToken { value, refresh_at });
    }

    pub async fn invalidate(&self) {
        *self.current.lock().await = None;
    }
}
