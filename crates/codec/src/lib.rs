//! Length-prefixed binary framing for the relay wire protocol.
//!
//! A logical message on the wire is a 16-bit little-endian length `L` followed by `L` opaque
//! bytes. [`decode_frame`] peels one such frame off a growing buffer; [`Inbound`] and [`Outbound`]
//! project the payload of a frame into the two layouts the relay core understands.

use std::fmt;

use bytes::{Buf, BufMut, Bytes, BytesMut};
use num_enum::TryFromPrimitive;

/// Frames (post length-prefix) larger than this are rejected.
pub const MAX_PAYLOAD: usize = u16::MAX as usize;

const LENGTH_PREFIX_SIZE: usize = 2;
const INBOUND_HEADER_SIZE: usize = 2;
const OUTBOUND_HEADER_SIZE: usize = 3;

#[derive(Debug)]
pub enum Error {
    /// The frame is shorter than its layout requires.
    Malformed,
    /// The frame (or a projected outbound frame) would exceed [`MAX_PAYLOAD`].
    TooLarge,
    /// Byte 0 of an inbound frame, or byte 2 of an outbound frame, is not a known discriminant.
    UnknownDiscriminant(u8),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Malformed => write!(f, "frame too short for its layout"),
            Self::TooLarge => write!(f, "frame exceeds the maximum payload size"),
            Self::UnknownDiscriminant(v) => write!(f, "unknown discriminant: {v}"),
        }
    }
}

impl std::error::Error for Error {}

/// RPC target selector, inbound frame byte 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, TryFromPrimitive)]
#[repr(u8)]
pub enum Target {
    All = 0,
    Others = 1,
    AllBuffered = 2,
    OthersBuffered = 3,
    Host = 4,
    Server = 5,
}

/// Message type, inbound frame byte 1 / outbound frame byte 2.
#[derive(Debug, Clone, Copy, PartialEq, Eq, TryFromPrimitive)]
#[repr(u8)]
pub enum MessageType {
    NewConnection = 0,
    ExitConnection = 1,
    Instantiate = 2,
    Destroy = 3,
    RequestAuthority = 4,
    TransferAuthority = 5,
    MigrateHost = 6,
    Register = 7,
    Transform = 8,
    Rpc = 9,
}

impl MessageType {
    pub const fn as_u8(self) -> u8 {
        self as u8
    }
}

/// A parsed inbound (client → server) frame: `target:u8 | type:u8 | payload`.
#[derive(Debug, Clone, Copy)]
pub struct Inbound<'a> {
    pub target: u8,
    pub message_type: u8,
    pub payload: &'a [u8],
}

impl<'a> Inbound<'a> {
    pub fn parse(bytes: &'a [u8]) -> Result<Self, Error> {
        if bytes.len() < INBOUND_HEADER_SIZE {
            return Err(Error::Malformed);
        }

        Ok(Self {
            target: bytes[0],
            message_type: bytes[1],
            payload: &bytes[INBOUND_HEADER_SIZE..],
        })
    }
}

/// A parsed outbound (server → client) frame: `sender_id:u16 LE | type:u8 | payload`.
#[derive(Debug, Clone, Copy)]
pub struct Outbound<'a> {
    pub sender_id: u16,
    pub message_type: u8,
    pub payload: &'a [u8],
}

impl<'a> Outbound<'a> {
    pub fn parse(bytes: &'a [u8]) -> Result<Self, Error> {
        if bytes.len() < OUTBOUND_HEADER_SIZE {
            return Err(Error::Malformed);
        }

        Ok(Self {
            sender_id: u16::from_le_bytes([bytes[0], bytes[1]]),
            message_type: bytes[2],
            payload: &bytes[OUTBOUND_HEADER_SIZE..],
        })
    }
}

/// Build an outbound frame's payload (without the length prefix) into `buf`.
///
/// Returns `Error::TooLarge` if the resulting payload would exceed [`MAX_PAYLOAD`].
///
/// # Test
///
/// ```
/// use relay_server_codec::{encode_outbound, Outbound};
///
/// let mut buf = bytes::BytesMut::new();
/// encode_outbound(7, 9, b"hello", &mut buf).unwrap();
/// assert_eq!(&buf[..], &[7, 0, 9, b'h', b'e', b'l', b'l', b'o']);
///
/// let parsed = Outbound::parse(&buf).unwrap();
/// assert_eq!(parsed.sender_id, 7);
/// assert_eq!(parsed.message_type, 9);
/// assert_eq!(parsed.payload, b"hello");
/// ```
pub fn encode_outbound(
    sender_id: u16,
    message_type: u8,
    payload: &[u8],
    buf: &mut BytesMut,
) -> Result<(), Error> {
    if OUTBOUND_HEADER_SIZE + payload.len() > MAX_PAYLOAD {
        return Err(Error::TooLarge);
    }

    buf.reserve(OUTBOUND_HEADER_SIZE + payload.len());
    buf.put_u16_le(sender_id);
    buf.put_u8(message_type);
    buf.put_slice(payload);
    Ok(())
}

/// Prepend a 16-bit little-endian length prefix to `frame` and return the wire bytes.
///
/// # Test
///
/// ```
/// use relay_server_codec::frame_with_length_prefix;
///
/// let framed = frame_with_length_prefix(b"ab");
/// assert_eq!(&framed[..], &[2, 0, b'a', b'b']);
/// ```
pub fn frame_with_length_prefix(frame: &[u8]) -> Bytes {
    let mut buf = BytesMut::with_capacity(LENGTH_PREFIX_SIZE + frame.len());
    buf.put_u16_le(frame.len() as u16);
    buf.put_slice(frame);
    buf.freeze()
}

/// Peel exactly one length-prefixed frame off the front of `buf`, if a complete one is present.
///
/// Returns `Ok(None)` when `buf` does not yet hold a full frame; the caller should read more bytes
/// and retry. On success the frame (without its length prefix) is split off the front of `buf`.
///
/// # Test
///
/// ```
/// use relay_server_codec::decode_frame;
///
/// let mut buf = bytes::BytesMut::from(&[2, 0, b'h', b'i', 9][..]);
/// let frame = decode_frame(&mut buf).unwrap().unwrap();
/// assert_eq!(&frame[..], b"hi");
/// assert_eq!(&buf[..], &[9]);
///
/// let mut partial = bytes::BytesMut::from(&[5, 0, b'h'][..]);
/// assert!(decode_frame(&mut partial).unwrap().is_none());
/// ```
pub fn decode_frame(buf: &mut BytesMut) -> Result<Option<BytesMut>, Error> {
    if buf.len() < LENGTH_PREFIX_SIZE {
        return Ok(None);
    }

    let length = u16::from_le_bytes([buf[0], buf[1]]) as usize;
    if buf.len() < LENGTH_PREFIX_SIZE + length {
        return Ok(None);
    }

    buf.advance(LENGTH_PREFIX_SIZE);
    Ok(Some(buf.split_to(length)))
}
