//! Handling of decoded packets arriving from the cloud.

use cync_proto::frame::Frame;
use cync_proto::packet::{Packet, StatusBody, StatusPacket, StatusUpdate};
use cync_proto::request;

use crate::backend::cloud::socket::CloudSocket;
use crate::backend::cloud::{CloudBackend, SessionState};
use crate::error::{ApiError, ApiResult};

impl CloudBackend {
    pub(super) async fn handle_frame(
        &mut self,
        socket: &mut CloudSocket,
        frame: &Frame,
    ) -> ApiResult<()> {
        let packet = match Packet::decode(frame) {
            Ok(packet) => packet,
            Err(err) => {
                log::debug!(
                    "[{}] Dropping malformed {:?} frame: {err}",
                    self.name,
                    frame.packet_type
                );
                return Ok(());
            }
        };

        match packet {
            Packet::AuthReply { success: true } => {
                log::info!(
                    "[{}] Authenticated, flushing {} queued frames",
                    self.name,
                    self.queue.len()
                );
                self.session = SessionState::Connected;
                self.drain_queue(socket).await
            }
            Packet::AuthReply { success: false } => Err(ApiError::AuthRejected),

            Packet::Status(status) => self.handle_status(socket, status).await,

            Packet::Sync { switch_id, updates } => self.apply_updates(switch_id, &updates).await,

            Packet::StatusSync { switch_id, update } => match update {
                Some(update) => self.apply_updates(switch_id, &[update]).await,
                None => Ok(()),
            },

            Packet::Connected { switch_id } => self.handle_reachable(socket, switch_id).await,

            Packet::Ping => Ok(()),
        }
    }

    async fn handle_status(
        &mut self,
        socket: &mut CloudSocket,
        status: StatusPacket,
    ) -> ApiResult<()> {
        if !status.is_response {
            // the ack goes on the wire before anything a handler below
            // might emit
            socket
                .send(&request::status_ack(status.switch_id, status.response_id))
                .await?;
        }

        match status.body {
            StatusBody::Device(update) => self.apply_updates(status.switch_id, &[update]).await,
            StatusBody::Paginated(updates) => {
                self.apply_updates(status.switch_id, &updates).await
            }
            StatusBody::Opaque => Ok(()),
        }
    }

    /// Push a batch of inbound state onto the matching bulbs and fan the
    /// results out to the host. Host failures are logged, never fatal.
    async fn apply_updates(&mut self, switch_id: u32, updates: &[StatusUpdate]) -> ApiResult<()> {
        let notes = {
            let mut lock = self.registry.lock().await;
            updates
                .iter()
                .filter_map(|update| match lock.find_by_mesh_mut(switch_id, update.mesh_id) {
                    Some(bulb) => Some((bulb.device_id, bulb.apply(update))),
                    None => {
                        log::debug!(
                            "[{}] Status for unknown mesh {} under switch {switch_id}",
                            self.name,
                            update.mesh_id
                        );
                        None
                    }
                })
                .collect::<Vec<_>>()
        };

        for (device_id, note) in notes {
            if let Err(err) = self.host.notify_state(device_id, note).await {
                log::error!("[{}] Host notify failed for {device_id}: {err}", self.name);
            }
        }
        Ok(())
    }

    /// A switch answered its probe: it is reachable again, so request the
    /// full mesh state behind it in the same loop turn.
    async fn handle_reachable(
        &mut self,
        socket: &mut CloudSocket,
        switch_id: u32,
    ) -> ApiResult<()> {
        let known = {
            let mut lock = self.registry.lock().await;
            match lock.find_by_switch_mut(switch_id) {
                Some(bulb) => {
                    bulb.connected = true;
                    true
                }
                None => false,
            }
        };

        if known {
            log::debug!(
                "[{}] Switch {switch_id} reachable, requesting mesh state",
                self.name
            );
            let seq = self.next_seq();
            socket
                .send(&request::get_status_paginated(switch_id, seq))
                .await?;
        }
        Ok(())
    }
}
