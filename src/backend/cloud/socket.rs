use socket2::{SockRef, TcpKeepalive};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use cync_proto::frame::{Frame, FrameHeader, HEADER_LEN};

use crate::error::ApiResult;

/// Upper bound on a sane frame payload. A length beyond this means the
/// stream has lost framing, so the session reconnects rather than
/// allocate blindly.
const MAX_PAYLOAD: usize = 64 * 1024;

/// The framed TCP connection to the cloud. Reading runs on a spawned
/// task feeding a channel, so the event loop can select on inbound
/// frames without ever blocking its writes.
pub struct CloudSocket {
    name: String,
    writer: OwnedWriteHalf,
    frames: mpsc::UnboundedReceiver<Frame>,
    reader: JoinHandle<()>,
}

impl CloudSocket {
    pub async fn connect(name: &str, host: &str, port: u16) -> ApiResult<Self> {
        let stream = TcpStream::connect((host, port)).await?;
        SockRef::from(&stream).set_tcp_keepalive(&TcpKeepalive::new())?;

        let (read_half, writer) = stream.into_split();
        let (tx, frames) = mpsc::unbounded_channel();
        let reader = tokio::spawn(read_loop(name.to_string(), read_half, tx));

        Ok(Self {
            name: name.to_string(),
            writer,
            frames,
            reader,
        })
    }

    pub async fn send(&mut self, frame: &Frame) -> ApiResult<()> {
        let bytes = frame.encode();
        log::trace!("[{}] Send {}", self.name, hex::encode(&bytes));
        Ok(self.writer.write_all(&bytes).await?)
    }

    /// Next decoded frame, in on-wire order. `None` once the stream ended
    /// or broke.
    pub async fn next(&mut self) -> Option<Frame> {
        self.frames.recv().await
    }
}

impl Drop for CloudSocket {
    fn drop(&mut self) {
        self.reader.abort();
    }
}

async fn read_loop(name: String, mut stream: OwnedReadHalf, frames: mpsc::UnboundedSender<Frame>) {
    loop {
        let mut header = [0u8; HEADER_LEN];
        if let Err(err) = stream.read_exact(&mut header).await {
            log::debug!("[{name}] Read side closed: {err}");
            break;
        }

        let length = u32::from_be_bytes([header[1], header[2], header[3], header[4]]) as usize;
        if length > MAX_PAYLOAD {
            log::warn!("[{name}] Frame length {length} out of bounds, dropping connection");
            break;
        }

        let mut payload = vec![0u8; length];
        if stream.read_exact(&mut payload).await.is_err() {
            break;
        }

        match FrameHeader::parse(&mut header.as_slice()) {
            Ok(parsed) => {
                log::trace!(
                    "[{name}] Recv {:?} {}",
                    parsed.packet_type,
                    hex::encode(&payload)
                );
                let frame = Frame {
                    packet_type: parsed.packet_type,
                    is_response: parsed.is_response,
                    payload,
                };
                if frames.send(frame).is_err() {
                    break;
                }
            }
            // unknown packet type: the payload was already consumed, so the
            // stream stays framed and the frame is dropped silently
            Err(err) => log::trace!("[{name}] {err}"),
        }
    }
}
