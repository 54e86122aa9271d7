//! Picks the distributable that matches the running platform variant.

use serde::{Deserialize, Serialize};

use selfupdate_provider::ReleaseAsset;

/// Naming conventions used to recognise installable assets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetRules {
    /// Required file suffix of an installable package
    #[serde(default = "default_extension")]
    pub extension: String,

    /// Assets whose name contains this marker are never offered
    #[serde(default = "default_debug_marker")]
    pub debug_marker: String,

    /// Marker of the build that runs on every platform variant
    #[serde(default = "default_universal_marker")]
    pub universal_marker: String,
}

fn default_extension() -> String {
    ".apk".to_string()
}

fn default_debug_marker() -> String {
    "debug".to_string()
}

fn default_universal_marker() -> String {
    "-universal-".to_string()
}

impl Default for AssetRules {
    fn default() -> Self {
        Self {
            extension: default_extension(),
            debug_marker: default_debug_marker(),
            universal_marker: default_universal_marker(),
        }
    }
}

impl AssetRules {
    fn is_installable(&self, name: &str) -> bool {
        name.ends_with(&self.extension) && !name.contains(&self.debug_marker)
    }

    /// Platform-specific build first, then the universal build, then any
    /// installable asset in feed order.
    pub fn select<'a>(
        &self,
        assets: &'a [ReleaseAsset],
        platform_tag: &str,
    ) -> Option<&'a ReleaseAsset> {
        let tag_marker = format!("-{}-", platform_tag);
        let installable = || assets.iter().filter(|a| self.is_installable(&a.name));

        let selected = installable()
            .find(|a| a.name.contains(&tag_marker))
            .or_else(|| installable().find(|a| a.name.contains(&self.universal_marker)))
            .or_else(|| installable().next());

        match selected {
            Some(asset) => tracing::debug!("selected {} for platform {}", asset.name, platform_tag),
            None => tracing::debug!(
                "no installable asset among {} for {}",
                assets.len(),
                platform_tag
            ),
        }
        selected
    }
}

/// [`AssetRules::select`] with the default `.apk` naming rules.
pub fn select_asset<'a>(
    assets: &'a [ReleaseAsset],
    platform_tag: &str,
) -> Option<&'a ReleaseAsset> {
    AssetRules::default().select(assets, platform_tag)
}
