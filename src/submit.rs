//! Single-shot transfer submission.

use thiserror::Error;
use tracing::{info, warn};

use crate::flows::{FlowsClient, RunHandle};
use crate::transfer::TransferRequest;

/// Errors surfaced while submitting a transfer run.
#[derive(Debug, Error)]
pub enum SubmissionError<ClientError>
where
    ClientError: std::error::Error + 'static,
{
    /// The workflow service rejected or never received the submission.
    #[error("failed to submit transfer '{label}': {source}")]
    SubmissionFailed {
        /// Label of the request that failed.
        label: String,
        /// Client specific cause (auth, network, validation).
        #[source]
        source: ClientError,
    },
}

/// Submits `request` through `client` exactly once.
///
/// No retry happens here; re-submission policy belongs to the caller.
///
/// # Errors
///
/// Returns [`SubmissionError::SubmissionFailed`] when the client call fails.
pub async fn submit<C>(
    client: &C,
    request: &TransferRequest,
) -> Result<RunHandle, SubmissionError<C::Error>>
where
    C: FlowsClient + ?Sized,
{
    match client.submit_run(request).await {
        Ok(handle) => {
            info!(
                run_id = %handle.run_id,
                label = %request.label,
                source = %request.source_path,
                destination = %request.dest_path,
                "transfer run submitted"
            );
            Ok(handle)
        }
        Err(err) => {
            warn!(label = %request.label, error = %err, "transfer submission failed");
            Err(SubmissionError::SubmissionFailed {
                label: request.label.clone(),
                source: err,
            })
        }
    }
}
