//! External Collaborators
//!
//! Narrow interfaces to the item catalog, the currency/points issuer and
//! the chat broadcaster. The engine only ever talks to these traits.

use tracing::info;

use super::objective::PlayerId;

/// An item a player is holding, as reported by the host
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeldItem {
    /// Host-specific handle the catalog knows how to interpret
    pub handle: String,
    pub amount: u32,
}

/// Item catalog lookups
pub trait Catalog: Send + Sync {
    /// Display name for a `<catalogType>:<catalogId>` key.
    /// `Ok(None)` means the key is unknown.
    fn resolve_display_name(&self, catalog_key: &str) -> Result<Option<String>, String>;

    /// Catalog key of a held item, if it is a catalog item at all
    fn catalog_key(&self, item: &HeldItem) -> Option<String>;
}

/// Currency and quest point issuance. Delivery problems such as a full
/// inventory are the implementor's concern.
pub trait RewardIssuer: Send + Sync {
    fn issue_currency(
        &self,
        player_id: PlayerId,
        currency_type: &str,
        item_id: &str,
        count: u64,
    ) -> Result<(), String>;

    fn issue_points(&self, player_id: PlayerId, amount: i64) -> Result<(), String>;
}

/// Chat delivery
pub trait Broadcaster: Send + Sync {
    fn send_to_all(&self, message: &str);
    fn send_to(&self, player_id: PlayerId, message: &str);
}

/// Catalog where every handle already is a catalog key and names are the id part
#[derive(Debug, Default)]
pub struct PassthroughCatalog;

impl Catalog for PassthroughCatalog {
    fn resolve_display_name(&self, catalog_key: &str) -> Result<Option<String>, String> {
        Ok(catalog_key
            .split_once(':')
            .map(|(_, id)| id.replace('_', " ")))
    }

    fn catalog_key(&self, item: &HeldItem) -> Option<String> {
        item.handle.contains(':').then(|| item.handle.clone())
    }
}

/// Issuer that only logs what it would hand out
#[derive(Debug, Default)]
pub struct LoggingIssuer;

impl RewardIssuer for LoggingIssuer {
    fn issue_currency(
        &self,
        player_id: PlayerId,
        currency_type: &str,
        item_id: &str,
        count: u64,
    ) -> Result<(), String> {
        info!("Issuing {}x {}:{} to {}", count, currency_type, item_id, player_id);
        Ok(())
    }

    fn issue_points(&self, player_id: PlayerId, amount: i64) -> Result<(), String> {
        info!("Issuing {} quest points to {}", amount, player_id);
        Ok(())
    }
}

/// Broadcaster that writes messages to the log
#[derive(Debug, Default)]
pub struct LoggingBroadcaster;

impl Broadcaster for LoggingBroadcaster {
    fn send_to_all(&self, message: &str) {
        info!("[broadcast] {}", message);
    }

    fn send_to(&self, player_id: PlayerId, message: &str) {
        info!("[to {}] {}", player_id, message);
    }
}
