//! Canonical tenant identity.
//!
//! A Salesforce org surfaces under many hostnames: the Lightning host, the
//! legacy core host, sandbox variants, Visualforce and canvas domains,
//! Experience Cloud and setup domains. Cache scopes and token endpoints must
//! agree on a single canonical form or the same logical org splits across
//! inconsistent cache entries.
//!
//! [`lightning_hostname`] is that canonical form; [`core_hostname`] is the
//! "My Domain" core host token exchanges are issued against.

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::warn;
use url::Url;

const LIGHTNING_SUFFIX: &str = ".lightning.force.com";
const CORE_SUFFIX: &str = ".my.salesforce.com";

/// Hostname rewrite rules, applied top to bottom; first match wins.
/// `{s}` in the replacement stands for the target suffix.
const RULES: &[(&str, &str)] = &[
    // sandbox Lightning / core / Sites
    (r"\.sandbox\.lightning\.force\.com$", ".sandbox{s}"),
    (r"\.sandbox\.my\.salesforce\.com$", ".sandbox{s}"),
    (r"\.sandbox\.my\.site\.com$", ".sandbox{s}"),
    // canvas VF & derivatives
    (r"--c(\.[^.]+)?\.vf\.force\.com$", "${1}{s}"),
    // Experience Builder / Sites / Setup
    (r"\.builder\.salesforce-experience\.com$", "{s}"),
    (r"\.my\.salesforce-sites\.com$", "{s}"),
    (r"\.my\.salesforce-setup\.com$", "{s}"),
    (r"\.salesforce-setup\.com$", "{s}"),
    // Visualforce (prod & legacy)
    (r"\.vf\.force\.com$", "{s}"),
    (r"\.visual\.force\.com$", "{s}"),
    // Lightning (prod)
    (r"\.lightning\.force\.com$", "{s}"),
    // Core My Domain (prod)
    (r"\.my\.salesforce\.com$", "{s}"),
    // Legacy core without 'my'
    (r"\.salesforce\.com$", "{s}"),
    // File domains (login)
    (r"\.file\.force\.com$", "{s}"),
    // Experience Cloud (prod)
    (r"\.my\.site\.com$", "{s}"),
];

static LIGHTNING_RULES: Lazy<Vec<(Regex, String)>> = Lazy::new(|| build_rules(LIGHTNING_SUFFIX));
static CORE_RULES: Lazy<Vec<(Regex, String)>> = Lazy::new(|| build_rules(CORE_SUFFIX));

fn build_rules(suffix: &str) -> Vec<(Regex, String)> {
    RULES
        .iter()
        .filter_map(|(pattern, replacement)| {
            Regex::new(pattern).ok().map(|re| (re, replacement.replace("{s}", suffix)))
        })
        .collect()
}

/// Extract a lowercased hostname from a full URL or a bare host.
fn hostname_of(url_or_host: &str) -> String {
    let parsed = if url_or_host.contains("://") {
        Url::parse(url_or_host)
    } else {
        Url::parse(&format!("https://{url_or_host}"))
    };
    match parsed.ok().and_then(|url| url.host_str().map(str::to_owned)) {
        Some(host) => host.to_lowercase(),
        None => {
            warn!(input = %url_or_host, "could not parse hostname, using input verbatim");
            url_or_host.trim().to_lowercase()
        }
    }
}

fn map_instance_hostname(url_or_host: &str, rules: &[(Regex, String)], suffix: &str) -> String {
    let mut host = hostname_of(url_or_host);
    for (re, replacement) in rules {
        if re.is_match(&host) {
            host = re.replace(&host, replacement.as_str()).into_owned();
            break;
        }
    }
    // Unknown instance hostnames pass through untouched so callers still get
    // a usable (if uncanonical) scope.
    if !host.ends_with(suffix) && !host.ends_with(&format!(".sandbox{suffix}")) {
        warn!(hostname = %host, suffix, "unknown instance hostname");
    }
    host
}

/// Canonical Lightning hostname for any platform domain variant.
///
/// This is the canonical tenant identity: all cache scopes and token lookups
/// key off it.
#[must_use]
pub fn lightning_hostname(url_or_host: &str) -> String {
    map_instance_hostname(url_or_host, &LIGHTNING_RULES, LIGHTNING_SUFFIX)
}

/// Canonical Lightning base URL (`https://` + [`lightning_hostname`]).
#[must_use]
pub fn lightning_url(url_or_host: &str) -> String {
    format!("https://{}", lightning_hostname(url_or_host))
}

/// Core "My Domain" hostname for any platform domain variant.
#[must_use]
pub fn core_hostname(url_or_host: &str) -> String {
    map_instance_hostname(url_or_host, &CORE_RULES, CORE_SUFFIX)
}

/// Core base URL (`https://` + [`core_hostname`]), used for token exchanges.
#[must_use]
pub fn core_url(url_or_host: &str) -> String {
    format!("https://{}", core_hostname(url_or_host))
}
