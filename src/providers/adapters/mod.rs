//! Built-in upstream adapters

use crate::errors::ProviderResult;

use super::registry::ProviderRegistry;

pub mod cctv;
pub mod sxrtv;

/// Desktop browser user agent; several upstreams refuse library defaults
pub const DEFAULT_USER_AGENT: &str = concat!(
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 ",
    "(KHTML, like Gecko) Chrome/124.0 Safari/537.36"
);

pub fn register_builtin(registry: &ProviderRegistry) -> ProviderResult<()> {
    registry.register(cctv::PROVIDER_TYPE, cctv::CctvProvider::create)?;
    registry.register(sxrtv::PROVIDER_TYPE, sxrtv::SxrtvProvider::create)?;
    Ok(())
}
