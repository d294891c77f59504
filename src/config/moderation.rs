use super::env_parse;
use std::time::Duration;

/// Tunables for the appeal workflow, notice delivery and background maintenance.
#[derive(Debug, Clone)]
pub struct ModerationConfig {
    pub appeal_min_chars: usize,
    pub appeal_max_chars: usize,
    pub notice_poll_interval: Duration,
    pub notice_next_delay: Duration,
    pub reconcile_interval: Duration,
    /// Age after which a `pending` ledger entry is treated as stranded.
    pub pending_effect_grace: Duration,
    pub stats_cache_ttl_secs: u64,
}

impl Default for ModerationConfig {
    fn default() -> Self {
        Self {
            appeal_min_chars: 20,
            appeal_max_chars: 1000,
            notice_poll_interval: Duration::from_secs(60),
            notice_next_delay: Duration::from_millis(500),
            reconcile_interval: Duration::from_secs(30),
            pending_effect_grace: Duration::from_secs(30),
            stats_cache_ttl_secs: 30,
        }
    }
}

impl ModerationConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let appeal_min_chars = env_parse("APPEAL_MIN_CHARS", defaults.appeal_min_chars);
        let appeal_max_chars =
            env_parse("APPEAL_MAX_CHARS", defaults.appeal_max_chars).max(appeal_min_chars);

        Self {
            appeal_min_chars,
            appeal_max_chars,
            notice_poll_interval: Duration::from_secs(
                env_parse("NOTICE_POLL_INTERVAL_SECS", 60u64).max(1),
            ),
            notice_next_delay: Duration::from_millis(env_parse("NOTICE_NEXT_DELAY_MS", 500u64)),
            reconcile_interval: Duration::from_secs(
                env_parse("RECONCILE_INTERVAL_SECS", 30u64).max(1),
            ),
            pending_effect_grace: Duration::from_secs(env_parse(
                "PENDING_EFFECT_GRACE_SECS",
                30u64,
            )),
            stats_cache_ttl_secs: env_parse("STATS_CACHE_TTL_SECS", defaults.stats_cache_ttl_secs),
        }
    }
}
