//! Best-effort fetches of the audited page and its site resources
//!
//! Only [`probe_url`] can fail. Everything else folds network trouble into a result object and
//! logs a warning.

use reqwest::{Client, StatusCode};

use crate::error::MeasureError;
use crate::types::ResourceStatus;

/// Probed in order; the first one that exists wins.
pub const SITEMAP_CANDIDATES: &[&str] =
    &["/sitemap.xml", "/sitemap_index.xml", "/sitemap-index.xml"];

/// HTML of the audited page as seen by a plain GET
#[derive(Debug, Clone, Default)]
pub struct PageSnapshot {
    pub html: String,
    pub status: Option<u16>,
    pub ok: bool,
}

/// robots.txt lookup with the body kept for policy evaluation
#[derive(Debug, Clone)]
pub struct RobotsFetch {
    pub status: ResourceStatus,
    pub body: Option<String>,
}

/// Check that the page answers at all.
///
/// HEAD first; a 405 is retried once with GET. Any other non-success is fatal.
pub async fn probe_url(client: &Client, url: &str) -> Result<(), MeasureError> {
    let unreachable = |message: String| MeasureError::Unreachable {
        url: url.to_string(),
        message,
    };

    let response = client
        .head(url)
        .send()
        .await
        .map_err(|e| unreachable(e.to_string()))?;

    if response.status().is_success() {
        return Ok(());
    }

    if response.status() == StatusCode::METHOD_NOT_ALLOWED {
        tracing::debug!(url, "HEAD not allowed, retrying probe with GET");
        let fallback = client
            .get(url)
            .send()
            .await
            .map_err(|e| unreachable(e.to_string()))?;
        if fallback.status().is_success() {
            return Ok(());
        }
    }

    Err(unreachable(format!(
        "Received status {}",
        response.status().as_u16()
    )))
}

pub async fn fetch_page_snapshot(client: &Client, url: &str) -> PageSnapshot {
    let response = match client.get(url).send().await {
        Ok(response) => response,
        Err(e) => {
            tracing::warn!(url, error = %e, "failed to fetch page snapshot");
            return PageSnapshot::default();
        }
    };

    let status = response.status();
    match response.text().await {
        Ok(html) => PageSnapshot {
            html,
            status: Some(status.as_u16()),
            ok: status.is_success(),
        },
        Err(e) => {
            tracing::warn!(url, error = %e, "failed to read page snapshot body");
            PageSnapshot {
                html: String::new(),
                status: Some(status.as_u16()),
                ok: false,
            }
        }
    }
}

/// GET a resource and report whether it exists
pub async fn check_resource(client: &Client, url: &str) -> ResourceStatus {
    fetch_resource(client, url, false).await.0
}

pub async fn fetch_robots(client: &Client, root_url: &str) -> RobotsFetch {
    let url = crate::robots::robots_url(root_url);
    let (status, body) = fetch_resource(client, &url, true).await;
    RobotsFetch { status, body }
}

pub async fn locate_sitemap(client: &Client, root_url: &str) -> ResourceStatus {
    let root = root_url.trim_end_matches('/');
    let mut fallback: Option<ResourceStatus> = None;

    for candidate in SITEMAP_CANDIDATES {
        let resource = check_resource(client, &format!("{root}{candidate}")).await;
        if resource.exists {
            return resource;
        }
        fallback.get_or_insert(resource);
    }

    fallback.unwrap_or_else(|| ResourceStatus {
        url: format!("{root}/sitemap.xml"),
        exists: false,
        status: None,
        message: "Sitemap not found".to_string(),
    })
}

async fn fetch_resource(
    client: &Client,
    url: &str,
    keep_body: bool,
) -> (ResourceStatus, Option<String>) {
    let response = match client.get(url).send().await {
        Ok(response) => response,
        Err(e) => {
            tracing::warn!(url, error = %e, "resource check failed");
            let status = ResourceStatus {
                url: url.to_string(),
                exists: false,
                status: None,
                message: e.to_string(),
            };
            return (status, None);
        }
    };

    let code = response.status();
    let exists = code.is_success();
    let message = if exists {
        "Available".to_string()
    } else {
        format!("Status {}", code.as_u16())
    };

    let body = if keep_body && exists {
        match response.text().await {
            Ok(text) => Some(text),
            Err(e) => {
                tracing::warn!(url, error = %e, "failed to read resource body");
                None
            }
        }
    } else {
        None
    };

    tracing::debug!(url, status = code.as_u16(), exists, "checked resource");

    let status = ResourceStatus {
        url: url.to_string(),
        exists,
        status: Some(code.as_u16()),
        message,
    };
    (status, body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_probe_accepts_head_ok() {
        let server = MockServer::start().await;
        Mock::given(method("HEAD"))
            .and(path("/"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let client = Client::new();
        assert!(probe_url(&client, &format!("{}/", server.uri())).await.is_ok());
    }

    #[tokio::test]
    async fn test_probe_falls_back_to_get_on_405() {
        let server = MockServer::start().await;
        Mock::given(method("HEAD"))
            .respond_with(ResponseTemplate::new(405))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let client = Client::new();
        assert!(probe_url(&client, &server.uri()).await.is_ok());
    }

    #[tokio::test]
    async fn test_probe_reports_head_status() {
        let server = MockServer::start().await;
        Mock::given(method("HEAD"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let client = Client::new();
        let url = server.uri();
        let err = probe_url(&client, &url).await.unwrap_err();
        assert_eq!(
            err.to_string(),
            format!("Unable to reach {url}: Received status 503")
        );
    }

    #[tokio::test]
    async fn test_sitemap_first_hit_wins() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/sitemap.xml"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/sitemap_index.xml"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<sitemapindex/>"))
            .mount(&server)
            .await;

        let client = Client::new();
        let sitemap = locate_sitemap(&client, &server.uri()).await;
        assert!(sitemap.exists);
        assert!(sitemap.url.ends_with("/sitemap_index.xml"));
        assert_eq!(sitemap.message, "Available");
    }

    #[tokio::test]
    async fn test_sitemap_miss_reports_first_candidate() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let client = Client::new();
        let sitemap = locate_sitemap(&client, &server.uri()).await;
        assert!(!sitemap.exists);
        assert!(sitemap.url.ends_with("/sitemap.xml"));
        assert_eq!(sitemap.status, Some(404));
        assert_eq!(sitemap.message, "Status 404");
    }

    #[tokio::test]
    async fn test_robots_keeps_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/robots.txt"))
            .respond_with(ResponseTemplate::new(200).set_body_string("User-agent: *\nDisallow:"))
            .mount(&server)
            .await;

        let client = Client::new();
        let robots = fetch_robots(&client, &server.uri()).await;
        assert!(robots.status.exists);
        assert_eq!(robots.body.as_deref(), Some("User-agent: *\nDisallow:"));
    }

    #[tokio::test]
    async fn test_unreachable_resource_is_soft_failure() {
        let client = Client::new();
        // Nothing listens on port 9 locally
        let status = check_resource(&client, "http://127.0.0.1:9/robots.txt").await;
        assert!(!status.exists);
        assert_eq!(status.status, None);
        assert!(!status.message.is_empty());

        let snapshot = fetch_page_snapshot(&client, "http://127.0.0.1:9/").await;
        assert!(snapshot.html.is_empty());
        assert_eq!(snapshot.status, None);
    }
}
