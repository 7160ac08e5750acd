//! Transfer request construction.
//!
//! A [`TransferRequest`] is the complete, validated description of one
//! recursive directory transfer between two collections. Requests for DAQ
//! scans are derived from a [`ScanIdentity`] with [`build`]; manual requests
//! for arbitrary paths go through [`TransferRequestBuilder`].

use std::collections::BTreeSet;

use serde::Serialize;
use thiserror::Error;

use crate::path::PathTranslator;
use crate::scan::ScanIdentity;

/// Upper bound on label length accepted by the workflow service.
pub const MAX_LABEL_CHARS: usize = 128;

/// Marker appended to labels that had to be shortened.
pub const LABEL_ELLIPSIS: &str = "...";

/// Tags attached to every automatically triggered transfer.
pub const DEFAULT_TAGS: [&str; 3] = ["PAL-XFEL", "Auto", "DAQ"];

/// Tags attached to operator-initiated transfers between explicit paths.
pub const MANUAL_TAGS: [&str; 3] = ["PAL-XFEL", "DAQ", "Raw-Data"];

/// Directory below the experiment folder that holds scan directories.
pub const RAW_DATA_DIR: &str = "rawData";

/// Prefix of the tag carrying the scan idempotency key.
pub const SCAN_TAG_PREFIX: &str = "scan:";

/// Errors raised while building a transfer request.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum BuildError {
    /// The scan path carries no experiment folder, so no destination can be
    /// derived.
    #[error("no experiment folder found in scan path {scan_directory}")]
    MissingExperiment {
        /// Scan directory that was parsed.
        scan_directory: String,
    },
    /// Raised when a required field is empty.
    #[error("missing or empty field: {0}")]
    Validation(String),
}

/// A fully specified recursive transfer between two collections.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TransferRequest {
    /// Source collection identifier.
    pub source_collection_id: String,
    /// Source path in the source collection's addressing scheme.
    pub source_path: String,
    /// Destination collection identifier.
    pub dest_collection_id: String,
    /// Destination path on the destination collection.
    pub dest_path: String,
    /// Whether directories are transferred recursively.
    pub recursive: bool,
    /// Human readable run label, at most [`MAX_LABEL_CHARS`] characters.
    pub label: String,
    /// Tags attached to the run.
    pub tags: BTreeSet<String>,
}

impl TransferRequest {
    /// Starts a builder for a manual [`TransferRequest`].
    #[must_use]
    pub fn builder() -> TransferRequestBuilder {
        TransferRequestBuilder::new()
    }

    /// Validates that identifiers, paths and the label are present.
    ///
    /// # Errors
    ///
    /// Returns [`BuildError::Validation`] naming the first empty field.
    pub fn validate(&self) -> Result<(), BuildError> {
        let fields = [
            ("source_collection_id", &self.source_collection_id),
            ("source_path", &self.source_path),
            ("dest_collection_id", &self.dest_collection_id),
            ("dest_path", &self.dest_path),
            ("label", &self.label),
        ];
        for (name, value) in fields {
            if value.trim().is_empty() {
                return Err(BuildError::Validation(name.to_owned()));
            }
        }
        Ok(())
    }

    /// Renders the workflow input payload for this request.
    #[must_use]
    pub fn flow_input(&self) -> FlowInput<'_> {
        FlowInput {
            input: TransferInput {
                source: CollectionPath {
                    id: &self.source_collection_id,
                    path: &self.source_path,
                },
                destination: CollectionPath {
                    id: &self.dest_collection_id,
                    path: &self.dest_path,
                },
                recursive_tx: self.recursive,
            },
        }
    }

    /// Returns the tags as a sorted list.
    #[must_use]
    pub fn tag_list(&self) -> Vec<String> {
        self.tags.iter().cloned().collect()
    }
}

/// Workflow input body: `{"input": {...}}`.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct FlowInput<'a> {
    /// Transfer parameters consumed by the flow definition.
    pub input: TransferInput<'a>,
}

/// Transfer parameters of a [`FlowInput`].
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct TransferInput<'a> {
    /// Source collection and path.
    pub source: CollectionPath<'a>,
    /// Destination collection and path.
    pub destination: CollectionPath<'a>,
    /// Whether the transfer is recursive.
    pub recursive_tx: bool,
}

/// Collection identifier plus a path on that collection.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct CollectionPath<'a> {
    /// Collection identifier.
    pub id: &'a str,
    /// Path on the collection.
    pub path: &'a str,
}

/// Collection layout and labelling used to derive scan transfers.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TransferSettings {
    /// Source collection identifier.
    pub source_collection: String,
    /// Destination collection identifier.
    pub dest_collection: String,
    /// Root of the destination layout, for example `/backup`.
    pub dest_base_path: String,
    /// Maps local scan directories onto the source collection.
    pub translator: PathTranslator,
    /// Base tag set applied to each request.
    pub tags: BTreeSet<String>,
    /// Label used instead of the scan-derived default when set.
    pub label_override: Option<String>,
}

impl TransferSettings {
    /// Creates settings with the default tags, translator and label.
    #[must_use]
    pub fn new(
        source_collection: impl Into<String>,
        dest_collection: impl Into<String>,
        dest_base_path: impl Into<String>,
    ) -> Self {
        Self {
            source_collection: source_collection.into(),
            dest_collection: dest_collection.into(),
            dest_base_path: dest_base_path.into(),
            translator: PathTranslator::default(),
            tags: DEFAULT_TAGS.iter().map(|tag| (*tag).to_owned()).collect(),
            label_override: None,
        }
    }

    /// Replaces the path translator.
    #[must_use]
    pub fn with_translator(mut self, translator: PathTranslator) -> Self {
        self.translator = translator;
        self
    }

    /// Sets a label override.
    #[must_use]
    pub fn with_label(mut self, label: Option<String>) -> Self {
        self.label_override = label;
        self
    }

    /// Builds a manual request between explicit collection paths.
    ///
    /// Paths are used as given, without translation. The request carries the
    /// configured collections and [`MANUAL_TAGS`]. The label is the override
    /// when one is set, otherwise `PAL-XFEL Transfer: {source_path}`.
    ///
    /// # Errors
    ///
    /// Returns [`BuildError::Validation`] when a path or collection is blank.
    pub fn manual_request(
        &self,
        source_path: &str,
        dest_path: &str,
    ) -> Result<TransferRequest, BuildError> {
        TransferRequest::builder()
            .source_collection_id(self.source_collection.as_str())
            .source_path(source_path)
            .dest_collection_id(self.dest_collection.as_str())
            .dest_path(dest_path)
            .label(Some(pick_label(
                self.label_override.as_deref(),
                &format!("PAL-XFEL Transfer: {}", source_path.trim()),
            )))
            .tags(MANUAL_TAGS)
            .build()
    }
}

/// Builds the transfer request for a completed scan.
///
/// The destination is `{dest_base_path}/{experiment}/rawData/{scan_name}/`
/// and the source is the translated scan directory with a trailing `/`.
///
/// # Errors
///
/// Returns [`BuildError::MissingExperiment`] when the identity has no
/// experiment folder and [`BuildError::Validation`] when a collection
/// identifier is blank.
pub fn build(
    identity: &ScanIdentity,
    settings: &TransferSettings,
) -> Result<TransferRequest, BuildError> {
    let Some(experiment) = identity.experiment.as_deref() else {
        return Err(BuildError::MissingExperiment {
            scan_directory: identity.source_path.to_string(),
        });
    };

    let dest_path = format!(
        "{}/{experiment}/{RAW_DATA_DIR}/{}/",
        settings.dest_base_path.trim_end_matches('/'),
        identity.scan_name
    );
    let source_path = with_trailing_separator(
        settings
            .translator
            .translate(identity.source_path.as_str()),
    );

    let default_label = format!("Auto Transfer: {}", identity.scan_name);
    let label = pick_label(settings.label_override.as_deref(), &default_label);

    let mut tags = settings.tags.clone();
    tags.insert(experiment.to_owned());
    tags.insert(format!("{SCAN_TAG_PREFIX}{}", identity.key()));

    let request = TransferRequest {
        source_collection_id: settings.source_collection.trim().to_owned(),
        source_path,
        dest_collection_id: settings.dest_collection.trim().to_owned(),
        dest_path,
        recursive: true,
        label,
        tags,
    };
    request.validate()?;
    Ok(request)
}

/// Builder for manual [`TransferRequest`]s between explicit paths.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct TransferRequestBuilder {
    source_collection_id: String,
    source_path: String,
    dest_collection_id: String,
    dest_path: String,
    label: Option<String>,
    tags: BTreeSet<String>,
}

impl TransferRequestBuilder {
    /// Creates an empty builder; fields must be populated before build.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the source collection identifier.
    #[must_use]
    pub fn source_collection_id(mut self, value: impl Into<String>) -> Self {
        self.source_collection_id = value.into();
        self
    }

    /// Sets the source path.
    #[must_use]
    pub fn source_path(mut self, value: impl Into<String>) -> Self {
        self.source_path = value.into();
        self
    }

    /// Sets the destination collection identifier.
    #[must_use]
    pub fn dest_collection_id(mut self, value: impl Into<String>) -> Self {
        self.dest_collection_id = value.into();
        self
    }

    /// Sets the destination path.
    #[must_use]
    pub fn dest_path(mut self, value: impl Into<String>) -> Self {
        self.dest_path = value.into();
        self
    }

    /// Sets an optional label.
    #[must_use]
    pub fn label(mut self, value: Option<String>) -> Self {
        self.label = value;
        self
    }

    /// Adds tags to the request.
    #[must_use]
    pub fn tags<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags.extend(values.into_iter().map(Into::into));
        self
    }

    /// Builds and validates the [`TransferRequest`], trimming string inputs.
    ///
    /// The label defaults to `Auto Transfer: {source_path}`.
    ///
    /// # Errors
    ///
    /// Returns [`BuildError::Validation`] when any required field is empty.
    pub fn build(self) -> Result<TransferRequest, BuildError> {
        let source_path = self.source_path.trim().to_owned();
        let default_label = format!("Auto Transfer: {source_path}");
        let request = TransferRequest {
            source_collection_id: self.source_collection_id.trim().to_owned(),
            label: pick_label(self.label.as_deref(), &default_label),
            source_path,
            dest_collection_id: self.dest_collection_id.trim().to_owned(),
            dest_path: self.dest_path.trim().to_owned(),
            recursive: true,
            tags: self
                .tags
                .into_iter()
                .map(|tag| tag.trim().to_owned())
                .filter(|tag| !tag.is_empty())
                .collect(),
        };
        request.validate()?;
        Ok(request)
    }
}

/// Appends `/` when `path` does not already end with one.
#[must_use]
pub fn with_trailing_separator(mut path: String) -> String {
    if !path.ends_with('/') {
        path.push('/');
    }
    path
}

/// Truncates `label` to [`MAX_LABEL_CHARS`], marking the cut with
/// [`LABEL_ELLIPSIS`].
#[must_use]
pub fn truncate_label(label: &str) -> String {
    if label.chars().count() <= MAX_LABEL_CHARS {
        return label.to_owned();
    }
    let keep = MAX_LABEL_CHARS.saturating_sub(LABEL_ELLIPSIS.chars().count());
    let mut truncated: String = label.chars().take(keep).collect();
    truncated.push_str(LABEL_ELLIPSIS);
    truncated
}

fn pick_label(label_override: Option<&str>, default_label: &str) -> String {
    let chosen = label_override
        .map(str::trim)
        .filter(|label| !label.is_empty())
        .unwrap_or(default_label);
    truncate_label(chosen)
}
