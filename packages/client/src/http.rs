//! `reqwest`-backed [`ReportBackend`] for the real REST server.

use async_trait::async_trait;
use ghost_net_report_models::parse::{ParsedBatch, parse_report, parse_reports};
use ghost_net_report_models::{NewReport, Report, ReportId, StatusUpdate};
use reqwest::{StatusCode, Url};

use crate::{ClientConfig, ClientError, ReportBackend};

/// Header carrying the reporting user's id on create requests.
pub const USER_ID_HEADER: &str = "X-User-Id";

/// Talks to the report REST API over HTTP.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: reqwest::Client,
    reports_url: Url,
    base_url: String,
    status_path: String,
}

impl HttpBackend {
    /// Builds a backend with its own `reqwest` client.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] if the client cannot be built or the
    /// configured URL is invalid.
    pub fn new(config: &ClientConfig) -> Result<Self, ClientError> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.timeout() {
            builder = builder.timeout(timeout);
        }
        Self::with_client(builder.build()?, config)
    }

    /// Builds a backend around an existing `reqwest` client.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::InvalidUrl`] if the configured URL is invalid.
    pub fn with_client(
        client: reqwest::Client,
        config: &ClientConfig,
    ) -> Result<Self, ClientError> {
        let reports_url = build_url(&config.base_url, &config.reports_path, None)?;
        // Validate the template once up front so misconfiguration surfaces
        // at startup rather than on the first status change.
        build_url(&config.base_url, &config.status_path, Some(&ReportId::Numeric(0)))?;

        Ok(Self {
            client,
            reports_url,
            base_url: config.base_url.clone(),
            status_path: config.status_path.clone(),
        })
    }

    /// URL of the report collection.
    #[must_use]
    pub const fn reports_url(&self) -> &Url {
        &self.reports_url
    }

    /// URL of the status endpoint for report `id`.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::InvalidUrl`] if the URL cannot be built.
    pub fn status_url(&self, id: &ReportId) -> Result<Url, ClientError> {
        build_url(&self.base_url, &self.status_path, Some(id))
    }

    async fn send(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<serde_json::Value, ClientError> {
        let response = request.send().await?;
        let status = response.status();
        let url = response.url().to_string();
        let text = response.text().await?;

        if !status.is_success() {
            log::warn!("{url} answered {status}: {text}");
        }
        check_response(status, text)
    }
}

/// Turns a response status and body into the decoded JSON body.
///
/// # Errors
///
/// Returns [`ClientError::Status`] for any non-2xx status, and
/// [`ClientError::Json`] if a successful body is not JSON.
pub fn check_response(status: StatusCode, body: String) -> Result<serde_json::Value, ClientError> {
    if !status.is_success() {
        return Err(ClientError::Status {
            status: status.as_u16(),
            body,
        });
    }

    Ok(serde_json::from_str(&body)?)
}

#[async_trait]
impl ReportBackend for HttpBackend {
    async fn list_reports(&self) -> Result<ParsedBatch, ClientError> {
        log::debug!("GET {}", self.reports_url);
        let body = self.send(self.client.get(self.reports_url.clone())).await?;
        Ok(parse_reports(&body)?)
    }

    async fn create_report(&self, report: &NewReport) -> Result<Report, ClientError> {
        log::debug!("POST {}", self.reports_url);
        let mut request = self.client.post(self.reports_url.clone()).json(report);
        if let Some(user_id) = report.reported_by_user_id {
            request = request.header(USER_ID_HEADER, user_id.to_string());
        }
        let body = self.send(request).await?;
        Ok(parse_report(&body)?)
    }

    async fn update_status(
        &self,
        id: &ReportId,
        update: &StatusUpdate,
    ) -> Result<Report, ClientError> {
        let url = self.status_url(id)?;
        log::debug!("PATCH {url} -> {}", update.status);
        let body = self.send(self.client.patch(url).json(update)).await?;
        Ok(parse_report(&body)?)
    }
}

/// Joins `base` and a path template, substituting a `{id}` segment.
///
/// Each segment is percent-encoded, so string ids containing `/` or spaces
/// stay a single path segment.
///
/// # Errors
///
/// Returns [`ClientError::InvalidUrl`] if `base` is not an absolute URL,
/// cannot carry a path, or the template needs an id that was not given.
pub fn build_url(
    base: &str,
    template: &str,
    id: Option<&ReportId>,
) -> Result<Url, ClientError> {
    let invalid = |message: String| ClientError::InvalidUrl {
        url: format!("{base}{template}"),
        message,
    };

    let mut url = Url::parse(base).map_err(|e| invalid(e.to_string()))?;

    let id_segment = id.map(ToString::to_string);
    let mut segments = Vec::new();
    for segment in template.split('/').filter(|s| !s.is_empty()) {
        if segment == "{id}" {
            let id = id_segment
                .as_deref()
                .ok_or_else(|| invalid("template needs an {id} but none was given".to_string()))?;
            segments.push(id);
        } else {
            segments.push(segment);
        }
    }

    url.path_segments_mut()
        .map_err(|()| invalid("base URL cannot have a path".to_string()))?
        .pop_if_empty()
        .extend(segments);

    Ok(url)
}
