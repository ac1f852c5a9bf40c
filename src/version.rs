use anyhow::Result;
use colored::Colorize;
use log::debug;
use serde::Deserialize;
use std::time::Duration;

const RELEASES_URL: &str = "https://api.github.com/repos/RiyeUK/manga-kindle/releases/latest";
const CURRENT: &str = env!("CARGO_PKG_VERSION");

#[derive(Debug, Deserialize)]
struct Release {
    tag_name: String,
    html_url: String,
}

async fn latest_release() -> Result<Release> {
    let client = reqwest::Client::builder()
        .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
        .timeout(Duration::from_secs(5))
        .build()?;
    Ok(client
        .get(RELEASES_URL)
        .send()
        .await?
        .error_for_status()?
        .json()
        .await?)
}

/// Tells the user when a newer release exists. Never fails, a check that
/// cannot be made is only mentioned.
pub async fn check() {
    match latest_release().await {
        Ok(release) if is_outdated(CURRENT, &release.tag_name) => {
            println!(
                "{}",
                format!(
                    "New version is available! {} -> {}",
                    CURRENT,
                    release.tag_name.trim_start_matches('v')
                )
                .green()
            );
            println!(
                "{}",
                format!("Upgrade to the latest version: {}", release.html_url).green()
            );
        }
        Ok(release) => debug!("{} is the latest version", release.tag_name),
        Err(err) => {
            debug!("Update check failed: {:#}", err);
            println!(
                "{}",
                format!("Cannot check for updates. Version: {}", CURRENT)
                    .yellow()
                    .dimmed()
            );
        }
    }
}

fn segments(version: &str) -> Option<Vec<u64>> {
    version
        .trim()
        .trim_start_matches('v')
        .split('.')
        .map(|segment| segment.parse().ok())
        .collect()
}

/// Whether `latest` is newer than `current`. Versions that are not dotted
/// numbers are only compared for equality.
pub fn is_outdated(current: &str, latest: &str) -> bool {
    match (segments(current), segments(latest)) {
        (Some(current), Some(latest)) => latest > current,
        _ => current.trim_start_matches('v') != latest.trim_start_matches('v'),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn newer_releases() {
        assert!(is_outdated("0.1.0", "v0.2.0"));
        assert!(is_outdated("0.1.9", "0.1.10"));
        assert!(!is_outdated("0.2.0", "v0.2.0"));
        assert!(!is_outdated("1.0.0", "0.9.9"));
        assert!(is_outdated("0.1.0", "nightly"));
        assert!(!is_outdated("v-beta", "-beta"));
    }

    #[test]
    fn release_from_github() -> anyhow::Result<()> {
        let release: Release = serde_json::from_str(
            r#"{"tag_name": "v0.2.0", "html_url": "https://github.com/RiyeUK/manga-kindle/releases/tag/v0.2.0", "draft": false}"#,
        )?;
        assert_eq!(release.tag_name, "v0.2.0");
        assert!(release.html_url.ends_with("v0.2.0"));
        Ok(())
    }
}
