//! Admission handshake run once per freshly accepted connection, before any room mutation.

use std::sync::Arc;

use bytes::BytesMut;
use tokio::io::{AsyncRead, AsyncReadExt};

use crate::hooks::ServiceHook;
use crate::room::Room;
use crate::Error;

const MAX_HANDSHAKE_FRAME: usize = 4096;

/// Reads one length-prefixed frame (16-bit LE length, then that many bytes) from `reader`.
async fn read_frame<R: AsyncRead + Unpin>(reader: &mut R) -> Result<BytesMut, Error> {
    let mut len_buf = [0u8; 2];
    reader.read_exact(&mut len_buf).await?;
    let len = u16::from_le_bytes(len_buf) as usize;
    if len > MAX_HANDSHAKE_FRAME {
        return Err(Error::Malformed);
    }

    let mut buf = BytesMut::zeroed(len);
    reader.read_exact(&mut buf).await?;
    Ok(buf)
}

async fn read_u32_frame<R: AsyncRead + Unpin>(reader: &mut R) -> Result<u32, Error> {
    let frame = read_frame(reader).await?;
    if frame.len() != 4 {
        return Err(Error::Malformed);
    }
    Ok(u32::from_le_bytes(frame[..4].try_into().unwrap()))
}

async fn read_string_frame<R: AsyncRead + Unpin>(reader: &mut R) -> Result<String, Error> {
    let frame = read_frame(reader).await?;
    String::from_utf8(frame.to_vec()).map_err(|_| Error::Malformed)
}

/// The handshake's result: which room to join, with the creator-token step already applied.
pub struct Admission {
    pub room_id: u32,
}

/// Runs the admission handshake against `reader`: five length-prefixed frames (room-id, application-name, version,
/// password, and — only for a room's first-ever connection — the creator token). `lookup` resolves
/// a room id to its `Room`; capacity is checked immediately after the room is found, before any
/// further frame is read.
pub async fn admit<R, H, F>(reader: &mut R, lookup: F) -> Result<(Admission, Arc<Room<H>>), Error>
where
    R: AsyncRead + Unpin,
    H: ServiceHook,
    F: FnOnce(u32) -> Option<Arc<Room<H>>>,
{
    let room_id = read_u32_frame(reader).await?;
    let room = lookup(room_id).ok_or(Error::UnknownRoom)?;

    if !room.has_capacity() {
        return Err(Error::Full);
    }

    let application_name = read_string_frame(reader).await?;
    if application_name != room.config().application_name {
        return Err(Error::WrongApp);
    }

    let version = read_string_frame(reader).await?;
    if version != room.config().version {
        return Err(Error::WrongVersion);
    }

    let password = read_string_frame(reader).await?;
    if !room.config().password.is_empty() && password != room.config().password {
        return Err(Error::WrongPassword);
    }

    if !room.creator_connected() {
        let token = read_string_frame(reader).await?;
        if token != room.config().creator_token {
            return Err(Error::WrongToken);
        }
        room.mark_creator_connected();
        log::info!("room {room_id}: creator token accepted, connected_user=1");
    }

    Ok((Admission { room_id }, room))
}
