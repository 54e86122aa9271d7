/// Tag used when the host cannot name its platform variant.
pub const FALLBACK_PLATFORM_TAG: &str = "universal";

/// Names the platform variant whose build should be downloaded
/// (for Android: the primary ABI).
pub trait PlatformTagProvider: Send + Sync {
    fn platform_tag(&self) -> String;
}

/// Derives the tag from the architecture this binary was compiled for.
#[derive(Debug, Clone, Copy, Default)]
pub struct HostPlatform;

impl HostPlatform {
    pub fn abi() -> &'static str {
        abi_for_arch(std::env::consts::ARCH)
    }
}

fn abi_for_arch(arch: &str) -> &'static str {
    match arch {
        "aarch64" => "arm64-v8a",
        "arm" => "armeabi-v7a",
        "x86_64" => "x86_64",
        "x86" => "x86",
        _ => FALLBACK_PLATFORM_TAG,
    }
}

impl PlatformTagProvider for HostPlatform {
    fn platform_tag(&self) -> String {
        Self::abi().to_string()
    }
}

/// A fixed tag, e.g. from configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticPlatformTag(pub String);

impl StaticPlatformTag {
    pub fn new(tag: impl Into<String>) -> Self {
        Self(tag.into())
    }
}

impl PlatformTagProvider for StaticPlatformTag {
    fn platform_tag(&self) -> String {
        self.0.clone()
    }
}

/// The provider's tag, or the fallback when it reports a blank one.
pub fn resolve_platform_tag(provider: &dyn PlatformTagProvider) -> String {
    let tag = provider.platform_tag();
    let tag = tag.trim();
    if tag.is_empty() {
        FALLBACK_PLATFORM_TAG.to_string()
    } else {
        tag.to_string()
    }
}
