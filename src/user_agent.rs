//! Shared User-Agent strings for document and service HTTP clients.

/// Default User-Agent for document transfers.
#[must_use]
pub(crate) fn default_transfer_user_agent() -> String {
    let version = env!("CARGO_PKG_VERSION");
    format!("harvester/{version} (document-transfer)")
}

/// Default User-Agent for metadata and classification service lookups.
#[must_use]
pub(crate) fn default_service_user_agent() -> String {
    let version = env!("CARGO_PKG_VERSION");
    format!("harvester/{version} (catalog-lookup)")
}
