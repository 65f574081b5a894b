//! Robots.txt policy evaluation
//!
//! Only the universal `User-agent: *` group is read. `Disallow` values are plain path prefixes
//! without `*` or `$` wildcards, and `Allow` lines are skipped. An unavailable robots.txt
//! counts as "not blocked".

use url::Url;

/// Whether `target_url` is disallowed for the universal user agent.
///
/// Groups are read in order; entering a `User-agent: *` group resets the verdict, so the last
/// universal group decides.
pub fn is_disallowed(robots_txt: &str, target_url: &str) -> bool {
    match Url::parse(target_url) {
        Ok(url) => is_path_disallowed(robots_txt, url.path()),
        Err(_) => false,
    }
}

/// Same as [`is_disallowed`] for an already extracted URL path
pub fn is_path_disallowed(robots_txt: &str, path: &str) -> bool {
    let mut in_universal_group = false;
    let mut disallowed = false;

    for line in robots_txt.lines() {
        // Drop trailing comments
        let line = line.split('#').next().unwrap_or_default().trim();
        if line.is_empty() {
            continue;
        }

        // Split on first colon
        let Some((directive, value)) = line.split_once(':') else {
            continue;
        };
        let directive = directive.trim().to_lowercase();
        let value = value.trim();

        match directive.as_str() {
            "user-agent" => {
                in_universal_group = value == "*";
                if in_universal_group {
                    disallowed = false;
                }
            }
            "disallow" if in_universal_group => {
                if value == "/" || (!value.is_empty() && path.starts_with(value)) {
                    disallowed = true;
                }
            }
            _ => {}
        }
    }

    disallowed
}

/// Location of robots.txt for a site origin such as `https://example.com`
pub fn robots_url(root_url: &str) -> String {
    format!("{}/robots.txt", root_url.trim_end_matches('/'))
}
