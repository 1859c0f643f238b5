//! Shared plumbing for the HTTP GET uploaders.

use chrono::{DateTime, Utc};
use std::time::{Duration, Instant};

use super::{PublishError, Result};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

const USER_AGENT: &str = concat!("wxpublish/", env!("CARGO_PKG_VERSION"));

/// Base URL for `host`, or for `default_host` when none is configured.
///
/// A host given with a scheme is used as is; a bare host name gets https.
pub fn base_url(host: &str, default_host: &str) -> String {
    let host = match host.trim() {
        "" => default_host,
        h => h,
    };
    let host = host.trim_end_matches('/');
    if host.starts_with("http://") || host.starts_with("https://") {
        host.to_string()
    } else {
        format!("https://{}", host)
    }
}

/// `dateutc` value the station-upload protocols expect.
pub fn date_utc(now: DateTime<Utc>) -> String {
    now.format("%Y-%m-%d %H:%M:%S").to_string()
}

/// Fixed two-decimal rendering used in every query string.
pub fn num(value: f64) -> String {
    format!("{:.2}", value)
}

/// Send one GET upload and check the status.
pub async fn upload(
    client: &reqwest::Client,
    service: &'static str,
    url: &str,
    query: &[(&'static str, String)],
) -> Result<()> {
    let start = Instant::now();
    let response = client
        .get(url)
        .query(query)
        .header(reqwest::header::USER_AGENT, USER_AGENT)
        .timeout(REQUEST_TIMEOUT)
        .send()
        .await?;

    let status = response.status();
    if !status.is_success() {
        return Err(PublishError::Status {
            service,
            status: status.as_u16(),
        });
    }

    log::debug!(
        "[{}] upload complete in {} ms",
        service,
        start.elapsed().as_millis()
    );
    Ok(())
}
