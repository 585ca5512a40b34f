use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tokio::sync::broadcast::{Receiver, Sender};

use cync_proto::mesh;

use crate::error::ApiResult;
use crate::host::{BackendRequest, BulbRecord};
use crate::model::bulb::Bulb;

/// Result of one inventory pass.
#[derive(Debug, Default)]
pub struct ImportOutcome {
    /// Devices created by this pass, in record order.
    pub created: Vec<u32>,
    /// Every device id now known; the host adapter removes accessories
    /// outside this set.
    pub known: HashSet<u32>,
}

/// The authoritative device population, addressable through all three
/// identifier spaces. Bulbs are keyed by `switchID` (one bulb per switch);
/// the other two spaces index into it.
#[derive(Debug)]
pub struct DeviceRegistry {
    bulbs: HashMap<u32, Bulb>,
    by_device: HashMap<u32, u32>,
    by_mesh: HashMap<u16, u32>,
    backend_updates: Sender<Arc<BackendRequest>>,
}

impl DeviceRegistry {
    const BACKEND_CHANNEL_SIZE: usize = 64;

    #[allow(clippy::new_without_default)]
    #[must_use]
    pub fn new() -> Self {
        Self {
            bulbs: HashMap::new(),
            by_device: HashMap::new(),
            by_mesh: HashMap::new(),
            backend_updates: Sender::new(Self::BACKEND_CHANNEL_SIZE),
        }
    }

    pub fn backend_event_stream(&self) -> Receiver<Arc<BackendRequest>> {
        self.backend_updates.subscribe()
    }

    pub fn backend_request(&self, req: BackendRequest) -> ApiResult<()> {
        self.backend_updates.send(Arc::new(req))?;
        Ok(())
    }

    /// Upsert bulbs from an inventory pass. A record whose mesh address
    /// cannot be derived is skipped, not fatal: the rest of the home still
    /// imports.
    pub fn import_inventory(&mut self, records: &[BulbRecord]) -> ImportOutcome {
        let mut outcome = ImportOutcome::default();

        for record in records {
            let mesh_id = match mesh::mesh_id(record.device_id, record.home_id) {
                Ok(mesh_id) => mesh_id,
                Err(err) => {
                    log::warn!(
                        "Skipping device {} ({}): {err}",
                        record.device_id,
                        record.display_name
                    );
                    continue;
                }
            };

            match self.bulbs.entry(record.switch_id) {
                Entry::Occupied(mut entry) => {
                    let bulb = entry.get_mut();
                    self.by_device.remove(&bulb.device_id);
                    // only drop the old mesh mapping if it points here; a
                    // colliding home may own it
                    if self.by_mesh.get(&bulb.mesh_id) == Some(&record.switch_id) {
                        self.by_mesh.remove(&bulb.mesh_id);
                    }
                    bulb.refresh_inventory(record, mesh_id);
                }
                Entry::Vacant(entry) => {
                    entry.insert(Bulb::new(record, mesh_id));
                    outcome.created.push(record.device_id);
                }
            }

            self.by_device.insert(record.device_id, record.switch_id);
            // cross-home collisions keep the first mapping; inbound lookups
            // disambiguate by switch id anyway
            self.by_mesh.entry(mesh_id).or_insert(record.switch_id);
        }

        outcome.known = self.by_device.keys().copied().collect();
        outcome
    }

    pub fn remove_device(&mut self, device_id: u32) -> Option<Bulb> {
        let switch_id = self.by_device.remove(&device_id)?;
        let bulb = self.bulbs.remove(&switch_id)?;
        if self.by_mesh.get(&bulb.mesh_id) == Some(&switch_id) {
            self.by_mesh.remove(&bulb.mesh_id);
        }
        Some(bulb)
    }

    #[must_use]
    pub fn find_by_device_mut(&mut self, device_id: u32) -> Option<&mut Bulb> {
        let switch_id = *self.by_device.get(&device_id)?;
        self.bulbs.get_mut(&switch_id)
    }

    /// Resolve a mesh address from an inbound packet. The packet's switch
    /// id wins when the same mesh address exists in several homes.
    #[must_use]
    pub fn find_by_mesh_mut(&mut self, switch_id: u32, mesh_id: u16) -> Option<&mut Bulb> {
        let exact = self
            .bulbs
            .get(&switch_id)
            .filter(|bulb| bulb.mesh_id == mesh_id)
            .map(|bulb| bulb.switch_id);

        let key = exact.or_else(|| self.by_mesh.get(&mesh_id).copied())?;
        self.bulbs.get_mut(&key)
    }

    #[must_use]
    pub fn find_by_switch_mut(&mut self, switch_id: u32) -> Option<&mut Bulb> {
        self.bulbs.get_mut(&switch_id)
    }

    pub fn bulbs(&self) -> impl Iterator<Item = &Bulb> {
        self.bulbs.values()
    }

    pub fn bulbs_mut(&mut self) -> impl Iterator<Item = &mut Bulb> {
        self.bulbs.values_mut()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.bulbs.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bulbs.is_empty()
    }
}
