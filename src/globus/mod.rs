//! Globus Flows implementation of the workflow client.
//!
//! The client starts runs of one transfer flow and reads back run status
//! through the Flows REST API. It expects an access token that is already
//! valid for the flow's scope; obtaining and refreshing tokens happens
//! outside this crate.

mod error;
mod types;

use std::time::Duration;

use reqwest::{Client, Response, Url};
use serde::de::DeserializeOwned;

use crate::config::RelayConfig;
use crate::flows::{FlowsClient, FlowsFuture, RunHandle, RunState};
use crate::transfer::TransferRequest;
use types::{RunCreated, RunDocument, RunFlowBody};

pub use error::GlobusError;

/// Default base URL of the Globus Flows service.
pub const DEFAULT_FLOWS_API_URL: &str = "https://flows.globus.org";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Client that talks to the Globus Flows REST API.
#[derive(Clone, Debug)]
pub struct GlobusFlowsClient {
    http: Client,
    base_url: Url,
    flow_id: String,
    access_token: String,
}

impl GlobusFlowsClient {
    /// Creates a client for `flow_id` using a pre-authorised access token.
    ///
    /// # Errors
    ///
    /// Returns [`GlobusError::Config`] when a value is blank or the HTTP
    /// client cannot be constructed.
    pub fn new(
        base_url: impl Into<String>,
        flow_id: impl Into<String>,
        access_token: impl Into<String>,
    ) -> Result<Self, GlobusError> {
        let base = base_url.into().trim().to_owned();
        let flow = flow_id.into().trim().to_owned();
        let token = access_token.into().trim().to_owned();
        for (field, value) in [
            ("flows_api_url", &base),
            ("flow_id", &flow),
            ("access_token", &token),
        ] {
            if value.is_empty() {
                return Err(GlobusError::Config(format!("missing {field}")));
            }
        }

        let parsed = Url::parse(&base)
            .map_err(|err| GlobusError::Config(format!("invalid flows_api_url '{base}': {err}")))?;
        if parsed.cannot_be_a_base() {
            return Err(GlobusError::Config(format!(
                "flows_api_url '{base}' cannot hold endpoint paths"
            )));
        }

        let http = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(concat!("scanrelay/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|err| GlobusError::Config(err.to_string()))?;

        Ok(Self {
            http,
            base_url: parsed,
            flow_id: flow,
            access_token: token,
        })
    }

    /// Constructs a client from configuration.
    ///
    /// Only the client settings are checked; collection settings are
    /// validated where requests are built.
    ///
    /// # Errors
    ///
    /// Returns [`GlobusError::Config`] when the client settings fail
    /// validation.
    pub fn from_config(config: &RelayConfig) -> Result<Self, GlobusError> {
        config.validate_client()?;
        Self::new(&config.flows_api_url, &config.flow_id, &config.access_token)
    }

    async fn start_run(&self, request: &TransferRequest) -> Result<RunHandle, GlobusError> {
        let url = self.endpoint(&["flows", &self.flow_id, "run"])?;
        let body = RunFlowBody {
            body: request.flow_input(),
            label: &request.label,
            tags: request.tag_list(),
        };
        let response = self
            .http
            .post(url.clone())
            .bearer_auth(&self.access_token)
            .json(&body)
            .send()
            .await
            .map_err(|err| http_error(url.as_str(), &err))?;
        let created: RunCreated = decode(url.as_str(), response).await?;
        Ok(RunHandle::new(created.run_id))
    }

    async fn fetch_run(&self, run_id: &str) -> Result<RunState, GlobusError> {
        let url = self.endpoint(&["runs", run_id])?;
        let response = self
            .http
            .get(url.clone())
            .bearer_auth(&self.access_token)
            .send()
            .await
            .map_err(|err| http_error(url.as_str(), &err))?;
        let document: RunDocument = decode(url.as_str(), response).await?;
        Ok(document.into_state())
    }

    /// Appends `segments` to the base URL, percent-encoding each one.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, GlobusError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| {
                GlobusError::Config(format!("{} cannot hold endpoint paths", self.base_url))
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }
}

impl FlowsClient for GlobusFlowsClient {
    type Error = GlobusError;

    fn submit_run<'a>(
        &'a self,
        request: &'a TransferRequest,
    ) -> FlowsFuture<'a, RunHandle, Self::Error> {
        Box::pin(async move { self.start_run(request).await })
    }

    fn run_status<'a>(&'a self, run_id: &'a str) -> FlowsFuture<'a, RunState, Self::Error> {
        Box::pin(async move { self.fetch_run(run_id).await })
    }
}

fn http_error(url: &str, err: &reqwest::Error) -> GlobusError {
    GlobusError::Http {
        url: url.to_owned(),
        message: err.to_string(),
    }
}

async fn decode<T: DeserializeOwned>(url: &str, response: Response) -> Result<T, GlobusError> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(GlobusError::Status {
            url: url.to_owned(),
            status: status.as_u16(),
            body,
        });
    }
    response.json::<T>().await.map_err(|err| GlobusError::Decode {
        url: url.to_owned(),
        message: err.to_string(),
    })
}
