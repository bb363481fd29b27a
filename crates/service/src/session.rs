//! One client session per connection: bounded send queue, read task, write task.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use bytes::{Bytes, BytesMut};
use codec::{decode_frame, frame_with_length_prefix};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::{mpsc, Notify};

use crate::hooks::ServiceHook;
use crate::room::Room;
use crate::Error;

/// Outbound frames queued per session before a sender backs off (every
/// recipient is blocking-enqueue, so a full queue simply delays the sender rather than dropping
/// the recipient immediately).
pub const SEND_QUEUE_CAPACITY: usize = 256;

/// One byte-stream read buffer's worth of slack before growing.
const READ_CHUNK: usize = 4096;

/// A registered client's handle: its id and the bounded queue its write task drains.
pub struct ClientSession {
    id: u16,
    sender: mpsc::Sender<Bytes>,
    close: Notify,
    closing: AtomicBool,
}

impl ClientSession {
    fn new(id: u16, sender: mpsc::Sender<Bytes>) -> Self {
        Self {
            id,
            sender,
            close: Notify::new(),
            closing: AtomicBool::new(false),
        }
    }

    pub fn id(&self) -> u16 {
        self.id
    }

    /// Enqueues `frame` (without its length prefix) for delivery. Blocks if the bounded queue is
    /// full, backpressuring the caller rather than dropping the frame.
    pub async fn send(&self, frame: Bytes) -> Result<(), Error> {
        self.sender.send(frame).await.map_err(|_| {
            Error::Transport(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                "session is closed",
            ))
        })
    }

    /// Requests that both the read and write tasks for this session exit. Idempotent.
    pub fn request_close(&self) {
        if !self.closing.swap(true, Ordering::SeqCst) {
            self.close.notify_waiters();
        }
    }

    fn is_closing(&self) -> bool {
        self.closing.load(Ordering::SeqCst)
    }
}

/// Builds a session around a fresh bounded channel, already carrying its allocated id.
pub(crate) fn build_session(id: u16) -> (Arc<ClientSession>, mpsc::Receiver<Bytes>) {
    let (tx, rx) = mpsc::channel(SEND_QUEUE_CAPACITY);
    (Arc::new(ClientSession::new(id, tx)), rx)
}

/// Splits `stream` and runs the read and write tasks for `id` until either errors or is asked to
/// close. Both tasks call `room.unregister`, which is idempotent, so exactly one of them performs
/// the unregister side effect regardless of which one notices the failure first.
pub fn spawn_session<H, S>(
    stream: S,
    id: u16,
    session: Arc<ClientSession>,
    receiver: mpsc::Receiver<Bytes>,
    room: Arc<Room<H>>,
) where
    H: ServiceHook + Send + Sync + 'static,
    S: AsyncRead + AsyncWrite + Send + Unpin + 'static,
{
    let (read_half, write_half) = tokio::io::split(stream);

    let write_room = room.clone();
    let write_session = session.clone();
    tokio::spawn(async move {
        write_task(write_half, receiver, &write_session).await;
        write_room.unregister(id).await;
    });

    tokio::spawn(async move {
        read_task(read_half, id, &session, &room).await;
        room.unregister(id).await;
    });
}

async fn write_task<W: AsyncWrite + Unpin>(
    mut writer: W,
    mut receiver: mpsc::Receiver<Bytes>,
    session: &ClientSession,
) {
    loop {
        if session.is_closing() {
            return;
        }

        tokio::select! {
            frame = receiver.recv() => {
                let Some(frame) = frame else { return };
                let framed = frame_with_length_prefix(&frame);
                if writer.write_all(&framed).await.is_err() {
                    session.request_close();
                    return;
                }
            }
            _ = session.close.notified() => return,
        }
    }
}

async fn read_task<R: AsyncRead + Unpin, H: ServiceHook>(
    mut reader: R,
    id: u16,
    session: &ClientSession,
    room: &Arc<Room<H>>,
) {
    let mut buf = BytesMut::with_capacity(READ_CHUNK);

    loop {
        if session.is_closing() {
            return;
        }

        let frame = tokio::select! {
            result = read_one_frame(&mut reader, &mut buf) => result,
            _ = session.close.notified() => return,
        };

        let frame = match frame {
            Ok(Some(frame)) => frame,
            Ok(None) | Err(_) => {
                session.request_close();
                return;
            }
        };

        if let Err(e) = room.receive(id, &frame).await {
            log::debug!("room dispatch error for client {id}: {e}");
            session.request_close();
            return;
        }
    }
}

/// Reads bytes from `reader` until a full length-prefixed frame is available in `buf`, or until
/// the stream ends (`Ok(None)`).
async fn read_one_frame<R: AsyncRead + Unpin>(
    reader: &mut R,
    buf: &mut BytesMut,
) -> std::io::Result<Option<BytesMut>> {
    loop {
        match decode_frame(buf) {
            Ok(Some(frame)) => return Ok(Some(frame)),
            Ok(None) => {}
            Err(_) => {
                return Err(std::io::Error::new(
                    std::io::ErrorKind::InvalidData,
                    "malformed frame",
                ))
            }
        }

        let mut chunk = [0u8; READ_CHUNK];
        let n = reader.read(&mut chunk).await?;
        if n == 0 {
            return Ok(None);
        }
        buf.extend_from_slice(&chunk[..n]);
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;

    /// A session with no live write-task behind it; only useful for registry bookkeeping tests
    /// that never call `send`.
    pub fn dummy_session(id: u16) -> Arc<ClientSession> {
        let (session, _receiver) = build_session(id);
        session
    }

    /// A session plus the receiver its (nonexistent) write task would drain, for tests that need
    /// to observe what gets enqueued.
    pub fn session_with_receiver(id: u16) -> (Arc<ClientSession>, mpsc::Receiver<Bytes>) {
        build_session(id)
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::session_with_receiver;
    use bytes::Bytes;

    #[tokio::test]
    async fn send_enqueues_for_the_write_task() {
        let (session, mut receiver) = session_with_receiver(4);
        session.send(Bytes::from_static(b"hi")).await.unwrap();
        assert_eq!(receiver.recv().await.unwrap(), Bytes::from_static(b"hi"));
    }

    #[tokio::test]
    async fn request_close_is_idempotent() {
        let (session, _receiver) = session_with_receiver(1);
        session.request_close();
        session.request_close();
        assert!(session.is_closing());
    }
}
