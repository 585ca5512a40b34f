//! End-to-end session tests against a local stand-in for the cloud.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, Mutex};
use tokio::time::timeout;

use cync_bridge::backend::cloud::CloudBackend;
use cync_bridge::backend::Backend;
use cync_bridge::config::CloudConfig;
use cync_bridge::host::{
    BackendRequest, BulbRecord, HostBridge, HostResult, StateUpdate, UserIntent,
};
use cync_bridge::model::registry::DeviceRegistry;
use cync_proto::capability::Capabilities;
use cync_proto::color;

struct RecordingHost {
    notes: mpsc::UnboundedSender<(u32, StateUpdate)>,
}

#[async_trait]
impl HostBridge for RecordingHost {
    async fn expose_capabilities(&self, _device_id: u32, _caps: Capabilities) -> HostResult {
        Ok(())
    }

    async fn notify_state(&self, device_id: u32, update: StateUpdate) -> HostResult {
        self.notes.send((device_id, update)).ok();
        Ok(())
    }
}

fn test_config(port: u16) -> CloudConfig {
    CloudConfig {
        user_id: 0x1234_5678,
        authorize: "abcdef".into(),
        refresh_token: None,
        host: "127.0.0.1".into(),
        port,
    }
}

// home 1_000_000 keeps the mesh derivation at the raw device id
fn record(device_id: u32, switch_id: u32) -> BulbRecord {
    BulbRecord {
        device_id,
        switch_id,
        device_type: 6,
        display_name: format!("Bulb {device_id}"),
        home_id: 1_000_000,
    }
}

async fn next_frame(stream: &mut TcpStream) -> (u8, Vec<u8>) {
    timeout(Duration::from_secs(5), async {
        let mut header = [0u8; 5];
        stream.read_exact(&mut header).await.unwrap();
        let length =
            u32::from_be_bytes([header[1], header[2], header[3], header[4]]) as usize;
        let mut payload = vec![0u8; length];
        stream.read_exact(&mut payload).await.unwrap();
        (header[0], payload)
    })
    .await
    .expect("no frame within deadline")
}

async fn recv_note(
    notes: &mut mpsc::UnboundedReceiver<(u32, StateUpdate)>,
) -> (u32, StateUpdate) {
    timeout(Duration::from_secs(5), notes.recv())
        .await
        .expect("no host notification within deadline")
        .expect("host channel closed")
}

#[tokio::test]
async fn login_queue_flush_and_status_flow() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    let registry = Arc::new(Mutex::new(DeviceRegistry::new()));
    let chan = registry.lock().await.backend_event_stream();
    let (notes_tx, mut notes) = mpsc::unbounded_channel();

    let backend = CloudBackend::new(
        "test",
        test_config(port),
        registry.clone(),
        Arc::new(RecordingHost { notes: notes_tx }),
        chan,
    );

    // submitted before the session connects; must come out in order
    {
        let lock = registry.lock().await;
        lock.backend_request(BackendRequest::ImportInventory(vec![
            record(5, 1000),
            record(6, 2000),
        ]))
        .unwrap();
        lock.backend_request(BackendRequest::Intent(5, UserIntent::SetOn(true)))
            .unwrap();
    }

    let session = tokio::spawn(backend.run_forever());
    let (mut stream, _) = listener.accept().await.unwrap();

    // login is the first thing on the wire, byte for byte
    let (type_byte, payload) = next_frame(&mut stream).await;
    assert_eq!(type_byte, 0x13);
    assert_eq!(
        payload,
        vec![
            0x03, 0x12, 0x34, 0x56, 0x78, 0x00, 0x06, b'a', b'b', b'c', b'd', b'e', b'f',
            0x00, 0x00, 0xB4,
        ]
    );

    stream.write_all(&[0x13, 0, 0, 0, 2, 0, 0]).await.unwrap();

    // the import's probes flush before the later intent (the periodic
    // probe sweep may add more probes; order of the first two is what
    // the queue guarantees)
    let mut probed = Vec::new();
    let set_state = loop {
        let (type_byte, payload) = next_frame(&mut stream).await;
        match type_byte >> 4 {
            10 => probed.push(u32::from_be_bytes(payload[0..4].try_into().unwrap())),
            7 => break payload,
            other => panic!("unexpected packet type {other}"),
        }
    };
    assert_eq!(&probed[0..2], &[1000, 2000]);
    assert!(probed.iter().all(|s| *s == 1000 || *s == 2000));

    assert_eq!(&set_state[0..4], &1000u32.to_be_bytes());
    assert_eq!(set_state[13], 0xF0);
    assert_eq!(set_state[18 + 8], 1); // on

    // unsolicited paginated status: two mesh records under switch 1000
    let mut status = vec![0u8; 70];
    status[0..4].copy_from_slice(&1000u32.to_be_bytes());
    status[4..6].copy_from_slice(&0x0102u16.to_be_bytes());
    status[13] = 0x52;
    {
        let first = &mut status[22..46];
        first[0] = 5;
        first[8] = 1;
        first[12] = 80;
        first[16] = 30;
        first[20] = 10;
        first[21] = 20;
        first[22] = 30;
    }
    status[46] = 6; // second record: mesh 6, everything off

    let mut wire = vec![0x73, 0, 0, 0, 70];
    wire.extend(&status);
    stream.write_all(&wire).await.unwrap();

    // the ack comes back before anything else the handler might do
    let ack = loop {
        let (type_byte, payload) = next_frame(&mut stream).await;
        match type_byte >> 4 {
            10 => continue, // stragglers from the probe sweep
            7 => break payload,
            other => panic!("unexpected packet type {other}"),
        }
    };
    assert_eq!(ack, vec![0x00, 0x00, 0x03, 0xE8, 0x01, 0x02, 0x00]);

    // both records land on the host, in record order
    let (device_id, note) = recv_note(&mut notes).await;
    assert_eq!(device_id, 5);
    assert_eq!(note.on, Some(true));
    assert_eq!(note.brightness, Some(80));
    assert_eq!(note.color_temp, Some(color::mired_from_wire(30)));
    assert!(note.hue.is_some());

    let (device_id, note) = recv_note(&mut notes).await;
    assert_eq!(device_id, 6);
    assert_eq!(note.on, Some(false));
    assert_eq!(note.brightness, Some(0));

    // a probe answer marks the switch reachable and pulls fresh mesh
    // state in the same turn
    let mut connected = vec![0xA3, 0, 0, 0, 7];
    connected.extend(&1000u32.to_be_bytes());
    connected.extend(&[0, 1, 0]);
    stream.write_all(&connected).await.unwrap();

    let resync = loop {
        let (type_byte, payload) = next_frame(&mut stream).await;
        match type_byte >> 4 {
            10 => continue,
            7 => break payload,
            other => panic!("unexpected packet type {other}"),
        }
    };
    assert_eq!(&resync[0..4], &1000u32.to_be_bytes());
    assert_eq!(resync[13], 0x52);
    assert_eq!(&resync[18..], &[0xFF, 0xFF, 0x00, 0x00, 0x56, 0x7E]);

    assert!(
        registry
            .lock()
            .await
            .find_by_switch_mut(1000)
            .unwrap()
            .connected
    );

    session.abort();
}

#[tokio::test]
async fn rejected_login_closes_the_connection() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    let registry = Arc::new(Mutex::new(DeviceRegistry::new()));
    let chan = registry.lock().await.backend_event_stream();
    let (notes_tx, _notes) = mpsc::unbounded_channel();

    let backend = CloudBackend::new(
        "test",
        test_config(port),
        registry,
        Arc::new(RecordingHost { notes: notes_tx }),
        chan,
    );

    let session = tokio::spawn(backend.run_forever());
    let (mut stream, _) = listener.accept().await.unwrap();

    let (type_byte, _) = next_frame(&mut stream).await;
    assert_eq!(type_byte, 0x13);

    stream.write_all(&[0x13, 0, 0, 0, 2, 0, 1]).await.unwrap();

    // the backend abandons the connection; nothing else is written
    let read = timeout(Duration::from_secs(5), stream.read(&mut [0u8; 1]))
        .await
        .expect("connection not closed within deadline")
        .unwrap();
    assert_eq!(read, 0);

    session.abort();
}
