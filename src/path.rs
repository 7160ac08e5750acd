//! Local to remote path translation for transfer collections.
//!
//! A transfer collection exposes part of the local filesystem under its own
//! root marker (for Globus collections this is conventionally `/~`). The
//! translator rewrites the configured local prefix to that marker and leaves
//! everything else untouched. Translation is best-effort: a path outside the
//! prefix is returned as-is and any resulting mismatch surfaces later as a
//! remote path-not-found submission failure.

/// Default local mount point of the DAQ storage exposed by the collection.
pub const DEFAULT_LOCAL_PREFIX: &str = "/xfel/ffs";

/// Default remote root marker of the source collection.
pub const DEFAULT_REMOTE_MOUNT_TOKEN: &str = "/~";

/// Rewrites `local_path` into the addressing scheme of a remote collection.
///
/// The prefix only matches on a path-segment boundary, so `/xfel/ffs`
/// translates `/xfel/ffs/dat` but not `/xfel/ffs2/dat`. A trailing `/` on the
/// prefix is ignored and an empty prefix disables translation.
///
/// # Examples
///
/// ```
/// use scanrelay::path::translate;
///
/// assert_eq!(translate("/xfel/ffs/dat/run", "/xfel/ffs", "/~"), "/~/dat/run");
/// assert_eq!(translate("/scratch/run", "/xfel/ffs", "/~"), "/scratch/run");
/// ```
#[must_use]
pub fn translate(local_path: &str, local_prefix: &str, remote_mount_token: &str) -> String {
    let prefix = local_prefix.trim_end_matches('/');
    if prefix.is_empty() {
        return local_path.to_owned();
    }

    match local_path.strip_prefix(prefix) {
        Some(rest) if rest.is_empty() || rest.starts_with('/') => {
            format!("{remote_mount_token}{rest}")
        }
        _ => local_path.to_owned(),
    }
}

/// Translator bound to a configured prefix and remote root marker.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PathTranslator {
    local_prefix: String,
    remote_mount_token: String,
}

impl PathTranslator {
    /// Creates a translator for the given prefix and remote root marker.
    #[must_use]
    pub fn new(local_prefix: impl Into<String>, remote_mount_token: impl Into<String>) -> Self {
        Self {
            local_prefix: local_prefix.into(),
            remote_mount_token: remote_mount_token.into(),
        }
    }

    /// Returns the configured local prefix.
    #[must_use]
    pub fn local_prefix(&self) -> &str {
        &self.local_prefix
    }

    /// Returns the configured remote root marker.
    #[must_use]
    pub fn remote_mount_token(&self) -> &str {
        &self.remote_mount_token
    }

    /// Translates `local_path`; see [`translate`].
    #[must_use]
    pub fn translate(&self, local_path: &str) -> String {
        translate(local_path, &self.local_prefix, &self.remote_mount_token)
    }
}

impl Default for PathTranslator {
    fn default() -> Self {
        Self::new(DEFAULT_LOCAL_PREFIX, DEFAULT_REMOTE_MOUNT_TOKEN)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("/xfel/ffs/dat/ue_251023_FXL", "/~/dat/ue_251023_FXL")]
    #[case("/xfel/ffs", "/~")]
    #[case("/xfel/ffs/", "/~/")]
    #[case("/xfel/ffs/a b/c", "/~/a b/c")]
    fn translates_paths_under_prefix(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(translate(input, "/xfel/ffs", "/~"), expected);
    }

    #[rstest]
    #[case("/data/rawData/scan01")]
    #[case("/xfel/ffs2/dat")]
    #[case("xfel/ffs/dat")]
    #[case("")]
    fn leaves_paths_outside_prefix_unchanged(#[case] input: &str) {
        assert_eq!(translate(input, "/xfel/ffs", "/~"), input);
    }

    #[test]
    fn trailing_slash_on_prefix_is_ignored() {
        assert_eq!(translate("/xfel/ffs/dat", "/xfel/ffs/", "/~"), "/~/dat");
    }

    #[test]
    fn empty_prefix_disables_translation() {
        assert_eq!(translate("/xfel/ffs/dat", "", "/~"), "/xfel/ffs/dat");
    }

    #[test]
    fn only_the_leading_prefix_is_replaced() {
        assert_eq!(
            translate("/xfel/ffs/backup/xfel/ffs/x", "/xfel/ffs", "/~"),
            "/~/backup/xfel/ffs/x"
        );
    }

    #[test]
    fn suffix_after_prefix_is_preserved_exactly() {
        let prefix = "/xfel/ffs";
        for suffix in ["/a", "/a/b/", "/ue_1_X//double", "/ünïcode/scan"] {
            let input = format!("{prefix}{suffix}");
            let translated = translate(&input, prefix, "/~");
            assert!(translated.starts_with("/~"), "translated: {translated}");
            assert_eq!(translated.strip_prefix("/~"), Some(suffix));
        }
    }

    #[test]
    fn translator_uses_configured_values() {
        let translator = PathTranslator::new("/data", "/remote");
        assert_eq!(translator.translate("/data/x"), "/remote/x");
        assert_eq!(PathTranslator::default().local_prefix(), DEFAULT_LOCAL_PREFIX);
    }
}
