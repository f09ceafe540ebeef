//! Link classification and liveness checks

use reqwest::Client;
use url::Url;

/// Whether a link points at the analyzed site or elsewhere
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkClass {
    Internal,
    External,
}

/// Outcome of a HEAD request against one link
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkCheck {
    /// Responded with a status below 400
    Alive(u16),
    /// Responded with a status of 400 or above
    Broken(u16),
    /// No response (DNS, connect, TLS, timeout or malformed URL)
    Unreachable(String),
}

impl LinkCheck {
    pub fn is_broken(&self) -> bool {
        !matches!(self, Self::Alive(_))
    }

    /// Status to record for a broken link; `None` means unreachable
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Alive(status) | Self::Broken(status) => Some(*status),
            Self::Unreachable(_) => None,
        }
    }
}

/// Classifies a link relative to the host the document was served from
///
/// A link is internal when its host contains `document_host` (so
/// `www.example.com` and `blog.example.com` are internal to `example.com`).
/// Links whose host cannot be parsed fall back to a substring test on the
/// raw link text.
///
/// # Example
///
/// ```
/// use url_analyzer::crawler::{classify_link, LinkClass};
///
/// assert_eq!(classify_link("https://example.com/a", "example.com"), LinkClass::Internal);
/// assert_eq!(classify_link("https://other.com/b", "example.com"), LinkClass::External);
/// ```
pub fn classify_link(link: &str, document_host: &str) -> LinkClass {
    let document_host = document_host.to_ascii_lowercase();
    if document_host.is_empty() {
        return LinkClass::External;
    }

    let is_internal = match Url::parse(link).ok().and_then(|u| u.host_str().map(str::to_string)) {
        Some(host) => host.to_ascii_lowercase().contains(&document_host),
        None => link.to_ascii_lowercase().contains(&document_host),
    };

    if is_internal {
        LinkClass::Internal
    } else {
        LinkClass::External
    }
}

/// Sends a HEAD request to check whether a link is alive
///
/// Redirects are followed by the client, so a 3xx that resolves to a live
/// page counts as alive.
pub async fn check_link(client: &Client, link: &str) -> LinkCheck {
    match client.head(link).send().await {
        Ok(response) => {
            let status = response.status().as_u16();
            if status >= 400 {
                LinkCheck::Broken(status)
            } else {
                LinkCheck::Alive(status)
            }
        }
        Err(e) => LinkCheck::Unreachable(e.to_string()),
    }
}
