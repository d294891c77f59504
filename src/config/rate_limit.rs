use super::env_bool;
use std::env;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitRule {
    pub per_second: u64,
    pub burst_size: u32,
}

impl RateLimitRule {
    const fn new(per_second: u64, burst_size: u32) -> Self {
        Self {
            per_second,
            burst_size,
        }
    }
}

/// Two route groups: the moderator console and member-facing endpoints.
#[derive(Debug, Clone, Copy)]
pub struct RateLimitConfig {
    pub enabled: bool,
    pub console: RateLimitRule,
    pub member: RateLimitRule,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            console: RateLimitRule::new(20, 40),
            member: RateLimitRule::new(10, 20),
        }
    }
}

impl RateLimitConfig {
    pub fn from_env() -> Self {
        let mut cfg = Self::default();
        cfg.enabled = env_bool("RATE_LIMIT_ENABLED", cfg.enabled);

        if let Ok(raw) = env::var("RATE_LIMIT_CONFIG") {
            match parse_rate_limit_config(&raw) {
                Ok(overrides) => {
                    for (group, rule) in overrides {
                        match group {
                            Group::Console => cfg.console = rule,
                            Group::Member => cfg.member = rule,
                        }
                    }
                }
                Err(err) => {
                    tracing::warn!("Invalid RATE_LIMIT_CONFIG '{}': {}", raw, err);
                }
            }
        }

        cfg
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Group {
    Console,
    Member,
}

/// Accepts `"10:20"` (both groups) or `"console=20:40,member=5:10"`.
fn parse_rate_limit_config(raw: &str) -> Result<Vec<(Group, RateLimitRule)>, String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err("empty value".to_string());
    }

    if !trimmed.contains('=') {
        let rule = parse_rule(trimmed)?;
        return Ok(vec![(Group::Console, rule), (Group::Member, rule)]);
    }

    trimmed
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(|item| {
            let (name, raw_rule) = item
                .split_once('=')
                .ok_or_else(|| format!("invalid item '{}', expected name=per:burst", item))?;
            let group = match name.trim().to_ascii_lowercase().as_str() {
                "console" | "admin" => Group::Console,
                "member" | "user" => Group::Member,
                other => {
                    return Err(format!(
                        "unknown group '{}', expected console/member",
                        other
                    ))
                }
            };
            Ok((group, parse_rule(raw_rule.trim())?))
        })
        .collect()
}

fn parse_rule(raw: &str) -> Result<RateLimitRule, String> {
    let (per_second_raw, burst_raw) = raw
        .split_once(':')
        .ok_or_else(|| format!("invalid rule '{}', expected per:burst", raw))?;

    let per_second: u64 = per_second_raw
        .trim()
        .parse()
        .map_err(|_| format!("invalid per_second '{}'", per_second_raw.trim()))?;
    let burst_size: u32 = burst_raw
        .trim()
        .parse()
        .map_err(|_| format!("invalid burst_size '{}'", burst_raw.trim()))?;

    if per_second == 0 || burst_size == 0 {
        return Err("per_second and burst_size must be > 0".to_string());
    }

    Ok(RateLimitRule::new(per_second, burst_size))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_global_rule_applies_to_both_groups() {
        let parsed = parse_rate_limit_config("12:24").unwrap();
        assert_eq!(
            parsed,
            vec![
                (Group::Console, RateLimitRule::new(12, 24)),
                (Group::Member, RateLimitRule::new(12, 24)),
            ]
        );
    }

    #[test]
    fn parse_grouped_rules_with_aliases() {
        let parsed = parse_rate_limit_config("admin=1:2, member=3:4").unwrap();
        assert_eq!(parsed[0], (Group::Console, RateLimitRule::new(1, 2)));
        assert_eq!(parsed[1], (Group::Member, RateLimitRule::new(3, 4)));
    }

    #[test]
    fn parse_rejects_zero_and_garbage() {
        assert!(parse_rate_limit_config("0:5").is_err());
        assert!(parse_rate_limit_config("console=abc")
            .unwrap_err()
            .contains("invalid rule"));
        assert!(parse_rate_limit_config("public=1:1").is_err());
    }
}
