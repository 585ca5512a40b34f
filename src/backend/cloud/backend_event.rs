//! Handling of requests arriving from the host side of the bridge.

use cync_proto::capability::Capabilities;
use cync_proto::request;

use crate::backend::cloud::socket::CloudSocket;
use crate::backend::cloud::CloudBackend;
use crate::error::ApiResult;
use crate::host::{BackendRequest, BulbRecord, UserIntent};

impl CloudBackend {
    pub(super) async fn handle_request(
        &mut self,
        socket: Option<&mut CloudSocket>,
        req: &BackendRequest,
    ) -> ApiResult<()> {
        match req {
            BackendRequest::ImportInventory(records) => {
                self.import_inventory(socket, records).await
            }
            BackendRequest::Intent(device_id, intent) => {
                self.handle_intent(socket, *device_id, intent).await
            }
            BackendRequest::RemoveAccessory(device_id) => {
                if let Some(bulb) = self.registry.lock().await.remove_device(*device_id) {
                    log::info!(
                        "[{}] Removed device {device_id} ({})",
                        self.name,
                        bulb.display_name
                    );
                }
                Ok(())
            }
        }
    }

    async fn import_inventory(
        &mut self,
        mut socket: Option<&mut CloudSocket>,
        records: &[BulbRecord],
    ) -> ApiResult<()> {
        let (total, created) = {
            let mut lock = self.registry.lock().await;
            let outcome = lock.import_inventory(records);
            let created: Vec<(u32, u32, Capabilities)> = outcome
                .created
                .iter()
                .filter_map(|device_id| {
                    lock.find_by_device_mut(*device_id)
                        .map(|bulb| (bulb.device_id, bulb.switch_id, bulb.capabilities()))
                })
                .collect();
            (outcome.known.len(), created)
        };

        log::info!(
            "[{}] Imported {total} devices ({} new)",
            self.name,
            created.len()
        );

        for (device_id, _, caps) in &created {
            if let Err(err) = self.host.expose_capabilities(*device_id, *caps).await {
                log::error!("[{}] Host rejected device {device_id}: {err}", self.name);
            }
        }

        // fresh devices get probed right away; the regular cycle re-probes
        // everything every five minutes
        for (_, switch_id, _) in created {
            let seq = self.next_seq();
            self.send(socket.as_deref_mut(), request::connected_probe(switch_id, seq))
                .await?;
        }
        Ok(())
    }

    async fn handle_intent(
        &mut self,
        socket: Option<&mut CloudSocket>,
        device_id: u32,
        intent: &UserIntent,
    ) -> ApiResult<()> {
        let seq = self.next_seq();
        let frame = {
            let mut lock = self.registry.lock().await;
            let Some(bulb) = lock.find_by_device_mut(device_id) else {
                log::warn!("[{}] Intent for unknown device {device_id}", self.name);
                return Ok(());
            };

            if let Err(err) = bulb.apply_intent(intent) {
                log::warn!("[{}] {err}", self.name);
                return Ok(());
            }
            bulb.set_state_request(seq)
        };

        self.send(socket, frame).await
    }
}
