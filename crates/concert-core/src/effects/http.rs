//! HTTP helpers: URL classification, reachability pings and streaming sources.

use std::time::Duration;

use super::Reachability;

/// Check if a locator looks like an HTTP URL.
pub fn is_http_url(locator: &str) -> bool {
    locator.starts_with("http://") || locator.starts_with("https://")
}

/// Extract file extension from a URL, stripping query parameters.
///
/// `"https://example.com/song.mp3?token=abc"` → `Some("mp3")`
pub fn extension_from_url(url: &str) -> Option<String> {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    let segment = path.rsplit('/').next()?;
    let (stem, ext) = segment.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() {
        return None;
    }
    Some(ext.to_lowercase())
}

/// Reachability over plain HTTP GET.
///
/// Any response with a success status counts as reachable. The body is never
/// read, so live streams are safe to ping.
#[derive(Debug, Clone, Copy, Default)]
pub struct HttpProbe;

impl HttpProbe {
    pub fn new() -> Self {
        Self
    }

    fn agent(&self, timeout: Duration) -> ureq::Agent {
        let config = ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .build();
        ureq::Agent::new_with_config(config)
    }
}

impl Reachability for HttpProbe {
    fn ping(&self, url: &str, timeout: Duration) -> bool {
        match self.agent(timeout).get(url).call() {
            Ok(_) => {
                log::info!("concert: pinged {}", url);
                true
            }
            Err(e) => {
                log::warn!("concert: network could not be reached: {} ({})", url, e);
                false
            }
        }
    }
}

/// Open an HTTP/HTTPS URL and return a MediaSourceStream for symphonia.
///
/// `open_timeout` bounds the connect and the wait for response headers. The
/// body has no limit, since live streams never finish.
#[cfg(feature = "native")]
pub fn open_url(
    url: &str,
    open_timeout: Option<Duration>,
) -> Result<symphonia::core::io::MediaSourceStream, Box<dyn std::error::Error>> {
    use symphonia::core::io::{MediaSourceStream, ReadOnlySource};

    let config = ureq::Agent::config_builder()
        .timeout_connect(open_timeout)
        .timeout_recv_response(open_timeout)
        .build();
    let response = ureq::Agent::new_with_config(config).get(url).call()?;
    let reader = response.into_body().into_reader();
    let source = ReadOnlySource::new(reader);
    Ok(MediaSourceStream::new(Box::new(source), Default::default()))
}
