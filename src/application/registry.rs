//! Venue registry: the immutable catalog plus live per-venue status.
//!
//! The catalog is fixed at construction and keeps configuration order, which
//! is the canonical order for candidate lists. Status records live behind a
//! single `RwLock`; readers always get copies.

use std::collections::HashMap;

use chrono::Utc;
use parking_lot::RwLock;
use tracing::info;

use crate::domain::{ConnectionState, Venue, VenueId, VenueStatus};
use crate::error::RoutingError;

#[derive(Debug, Clone)]
struct Entry {
    enabled: bool,
    status: VenueStatus,
}

/// Catalog of venues and their live status.
pub struct VenueRegistry {
    /// Venue definitions in catalog order.
    venues: Vec<Venue>,
    index: HashMap<VenueId, usize>,
    entries: RwLock<HashMap<VenueId, Entry>>,
}

impl VenueRegistry {
    /// Build a registry with every venue enabled and in its initial status.
    ///
    /// Duplicate ids keep the first definition.
    #[must_use]
    pub fn new(venues: Vec<Venue>) -> Self {
        let mut unique = Vec::with_capacity(venues.len());
        let mut index = HashMap::new();
        let mut entries = HashMap::new();
        for venue in venues {
            if index.contains_key(&venue.id) {
                continue;
            }
            index.insert(venue.id.clone(), unique.len());
            entries.insert(
                venue.id.clone(),
                Entry {
                    enabled: true,
                    status: VenueStatus::initial(venue.id.clone(), venue.capacity),
                },
            );
            unique.push(venue);
        }
        Self {
            venues: unique,
            index,
            entries: RwLock::new(entries),
        }
    }

    /// Venue definitions in catalog order.
    #[must_use]
    pub fn venues(&self) -> &[Venue] {
        &self.venues
    }

    #[must_use]
    pub fn venue(&self, id: &VenueId) -> Option<&Venue> {
        self.index.get(id).map(|&i| &self.venues[i])
    }

    #[must_use]
    pub fn contains(&self, id: &VenueId) -> bool {
        self.index.contains_key(id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.venues.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.venues.is_empty()
    }

    /// Venues eligible for an order on `symbol`: enabled, online, connected,
    /// not failed away, and listing the symbol. Catalog order.
    #[must_use]
    pub fn list_candidates(&self, symbol: &str) -> Vec<VenueId> {
        let entries = self.entries.read();
        self.venues
            .iter()
            .filter(|v| v.supports_symbol(symbol))
            .filter(|v| {
                entries
                    .get(&v.id)
                    .is_some_and(|e| e.enabled && e.status.is_routable())
            })
            .map(|v| v.id.clone())
            .collect()
    }

    /// Copy of one venue's status.
    pub fn get(&self, id: &VenueId) -> Result<VenueStatus, RoutingError> {
        self.entries
            .read()
            .get(id)
            .map(|e| e.status.clone())
            .ok_or_else(|| RoutingError::VenueNotFound { venue: id.clone() })
    }

    /// Copy of every status, keyed by venue.
    #[must_use]
    pub fn statuses(&self) -> HashMap<VenueId, VenueStatus> {
        self.entries
            .read()
            .iter()
            .map(|(id, e)| (id.clone(), e.status.clone()))
            .collect()
    }

    /// Copy of every status in catalog order.
    #[must_use]
    pub fn snapshot(&self) -> Vec<VenueStatus> {
        let entries = self.entries.read();
        self.venues
            .iter()
            .filter_map(|v| entries.get(&v.id).map(|e| e.status.clone()))
            .collect()
    }

    /// Mutate one status under the write lock. `last_updated` is refreshed.
    pub fn update<F>(&self, id: &VenueId, f: F) -> Result<(), RoutingError>
    where
        F: FnOnce(&mut VenueStatus),
    {
        let mut entries = self.entries.write();
        let entry = entries
            .get_mut(id)
            .ok_or_else(|| RoutingError::VenueNotFound { venue: id.clone() })?;
        f(&mut entry.status);
        entry.status.last_updated = Utc::now();
        Ok(())
    }

    /// Like [`update`](Self::update), but skips disabled venues.
    ///
    /// Returns whether the update was applied.
    pub fn update_enabled<F>(&self, id: &VenueId, f: F) -> Result<bool, RoutingError>
    where
        F: FnOnce(&mut VenueStatus),
    {
        let mut entries = self.entries.write();
        let entry = entries
            .get_mut(id)
            .ok_or_else(|| RoutingError::VenueNotFound { venue: id.clone() })?;
        if !entry.enabled {
            return Ok(false);
        }
        f(&mut entry.status);
        entry.status.last_updated = Utc::now();
        Ok(true)
    }

    /// Enable or disable a venue.
    ///
    /// Disabling takes the venue offline. Re-enabling leaves it `Connecting`
    /// until the next health probe settles its state.
    pub fn set_enabled(&self, id: &VenueId, enabled: bool) -> Result<(), RoutingError> {
        let mut entries = self.entries.write();
        let entry = entries
            .get_mut(id)
            .ok_or_else(|| RoutingError::VenueNotFound { venue: id.clone() })?;
        if entry.enabled == enabled {
            return Ok(());
        }
        entry.enabled = enabled;
        if enabled {
            entry.status.online = true;
            entry.status.connection = ConnectionState::Connecting;
        } else {
            entry.status.online = false;
            entry.status.connection = ConnectionState::Disconnected;
        }
        entry.status.last_updated = Utc::now();
        info!(venue = %id, enabled, "Venue availability changed");
        Ok(())
    }

    #[must_use]
    pub fn is_enabled(&self, id: &VenueId) -> bool {
        self.entries.read().get(id).is_some_and(|e| e.enabled)
    }

    /// Definitions of enabled venues, in catalog order.
    #[must_use]
    pub fn enabled_venues(&self) -> Vec<Venue> {
        let entries = self.entries.read();
        self.venues
            .iter()
            .filter(|v| entries.get(&v.id).is_some_and(|e| e.enabled))
            .cloned()
            .collect()
    }

    #[must_use]
    pub fn online_count(&self) -> usize {
        self.entries
            .read()
            .values()
            .filter(|e| e.enabled && e.status.online)
            .count()
    }
}
