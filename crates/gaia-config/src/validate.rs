//! Configuration validation with descriptive errors.

use crate::error::{ConfigError, Result};
use crate::types::GaiaConfig;
use gaia_core::Ecosystem;
use url::Url;

/// Validate a resolved configuration.
///
/// A single problem is returned as-is; several are folded into
/// [`ConfigError::ValidationFailed`].
///
/// # Errors
/// Returns the problems found.
pub fn validate(config: &GaiaConfig) -> Result<()> {
    let mut errors = Vec::new();

    check_range(&mut errors, "http.timeout-secs", config.http.timeout_secs, 1, 300);
    check_range(
        &mut errors,
        "http.connect-timeout-secs",
        config.http.connect_timeout_secs,
        1,
        300,
    );
    check_range(
        &mut errors,
        "http.rate-limit-per-host",
        u64::from(config.http.rate_limit_per_host),
        1,
        10_000,
    );
    if config.http.user_agent.trim().is_empty() {
        errors.push(ConfigError::invalid_value(
            "http.user-agent",
            "must not be empty",
            "registries reject anonymous clients; keep the default or name your tool",
        ));
    }

    let resolver = &config.resolver;
    check_range(&mut errors, "resolver.timeout-secs", resolver.timeout_secs, 1, 3600);
    if let Some(lookup_timeout_secs) = resolver.lookup_timeout_secs {
        check_range(
            &mut errors,
            "resolver.lookup-timeout-secs",
            lookup_timeout_secs,
            1,
            600,
        );
    }
    check_range(
        &mut errors,
        "resolver.rate-limit-retries",
        u64::from(resolver.rate_limit_retries),
        0,
        5,
    );
    check_range(
        &mut errors,
        "resolver.max-backoff-ms",
        resolver.max_backoff_ms,
        1,
        60_000,
    );
    if resolver.rate_limit_backoff_ms > resolver.max_backoff_ms {
        errors.push(ConfigError::invalid_value(
            "resolver.rate-limit-backoff-ms",
            format!(
                "{} exceeds max-backoff-ms ({})",
                resolver.rate_limit_backoff_ms, resolver.max_backoff_ms
            ),
            "lower the backoff or raise max-backoff-ms",
        ));
    }

    for ecosystem in Ecosystem::ALL {
        let endpoint = config.registries.endpoint(ecosystem);
        if !endpoint.enabled {
            continue;
        }
        let prefix = format!("registries.{ecosystem}");
        check_url(&mut errors, &format!("{prefix}.url"), &endpoint.url);
        check_range(
            &mut errors,
            &format!("{prefix}.max-concurrent"),
            endpoint.max_concurrent as u64,
            1,
            256,
        );
    }

    match errors.len() {
        0 => Ok(()),
        1 => Err(errors.remove(0)),
        count => Err(ConfigError::ValidationFailed {
            count,
            errors: errors.iter().map(ToString::to_string).collect(),
        }),
    }
}

fn check_range(errors: &mut Vec<ConfigError>, field: &str, value: u64, min: u64, max: u64) {
    if !(min..=max).contains(&value) {
        errors.push(ConfigError::out_of_range(field, value, min, max));
    }
}

fn check_url(errors: &mut Vec<ConfigError>, field: &str, url: &str) {
    let valid = Url::parse(url).is_ok_and(|parsed| matches!(parsed.scheme(), "http" | "https"));
    if !valid {
        errors.push(ConfigError::InvalidUrl {
            field: field.to_string(),
            url: url.to_string(),
        });
    }
}
