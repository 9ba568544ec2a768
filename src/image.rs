//! Sandbox image names.
//!
//! Maps between local image references (`cc-sandbox:base`) and their
//! fully-qualified registry equivalents (`ghcr.io/luwojtaszek/cc-sandbox:base`),
//! and selects which locally present images the updater should re-pull.

use std::collections::HashSet;

use crate::constants::{DEFAULT_REGISTRY, KNOWN_IMAGE_TAGS, TOOL_NAME};

/// Placeholder row printed by `docker images` for dangling images.
const DANGLING_IMAGE: &str = "<none>:<none>";

/// The set of images published for this tool under one registry prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageCatalog {
    registry: String,
}

impl Default for ImageCatalog {
    fn default() -> Self {
        Self::new(DEFAULT_REGISTRY)
    }
}

impl ImageCatalog {
    /// Catalog for images hosted under `registry` (e.g. `ghcr.io/luwojtaszek`).
    pub fn new(registry: impl Into<String>) -> Self {
        Self {
            registry: registry.into().trim_end_matches('/').to_string(),
        }
    }

    /// Registry prefix without a trailing slash.
    #[must_use]
    pub fn registry(&self) -> &str {
        &self.registry
    }

    /// Local reference for a tag, e.g. `cc-sandbox:base`.
    #[must_use]
    pub fn local_image(tag: &str) -> String {
        format!("{TOOL_NAME}:{tag}")
    }

    /// Registry reference for a tag, e.g. `ghcr.io/luwojtaszek/cc-sandbox:base`.
    #[must_use]
    pub fn registry_image(&self, tag: &str) -> String {
        format!("{}/{TOOL_NAME}:{tag}", self.registry)
    }

    /// Whether `image` is one of the published images, local or fully qualified.
    #[must_use]
    pub fn is_relevant(&self, image: &str) -> bool {
        KNOWN_IMAGE_TAGS
            .iter()
            .any(|tag| image == Self::local_image(tag) || image == self.registry_image(tag))
    }

    /// Registry reference to pull for a local image, if it is a known image.
    ///
    /// Images already under the registry prefix are returned unchanged.
    #[must_use]
    pub fn to_registry_image(&self, image: &str) -> Option<String> {
        if image.starts_with(&format!("{}/", self.registry)) {
            return Some(image.to_string());
        }

        KNOWN_IMAGE_TAGS
            .iter()
            .find(|tag| image == Self::local_image(tag))
            .map(|tag| self.registry_image(tag))
    }

    /// Registry images to refresh for a local image listing.
    ///
    /// Keeps first-seen order and drops duplicates, so an image present under
    /// both its local and registry names is pulled once.
    #[must_use]
    pub fn refresh_targets<'a, I>(&self, local_images: I) -> Vec<String>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut seen = HashSet::new();
        let mut targets = Vec::new();

        for image in local_images {
            if !self.is_relevant(image) {
                continue;
            }
            if let Some(registry_image) = self.to_registry_image(image)
                && seen.insert(registry_image.clone())
            {
                targets.push(registry_image);
            }
        }

        targets
    }
}

/// Parse `images --format '{{.Repository}}:{{.Tag}}'` output into references.
///
/// Blank lines and dangling `<none>:<none>` rows are discarded.
#[must_use]
pub fn parse_image_listing(output: &str) -> Vec<String> {
    output
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && *line != DANGLING_IMAGE)
        .map(str::to_string)
        .collect()
}
