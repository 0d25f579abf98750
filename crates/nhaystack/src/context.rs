//! Explicit per-request context.

use nhaystack_station::Station;

use crate::config::HaystackConfig;
use crate::ids::IdentityMap;

/// Everything a read-path operation needs: the station it runs against,
/// the adapter configuration and the identity map of that station.
pub struct Context<'a, S: Station + ?Sized> {
    pub station: &'a S,
    pub config: &'a HaystackConfig,
    pub ids: &'a IdentityMap,
}

impl<'a, S: Station + ?Sized> Context<'a, S> {
    pub fn new(station: &'a S, config: &'a HaystackConfig, ids: &'a IdentityMap) -> Self {
        Self {
            station,
            config,
            ids,
        }
    }
}

impl<S: Station + ?Sized> Clone for Context<'_, S> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<S: Station + ?Sized> Copy for Context<'_, S> {}
