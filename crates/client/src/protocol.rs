//! Wire protocol for bus calls.
//!
//! Wire format: `[4B payload_len_le][payload]`, where the payload is a JSON
//! [`MethodCall`] (client to daemon) or [`Response`] (daemon to client).

use std::io::{self, Read, Write};

use bytes::{Buf, BufMut, BytesMut};
use mlagent_core::{ServiceKind, BUS_NAME};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio_util::codec::{Decoder, Encoder};

/// Maximum payload: 16 MB.
const MAX_FRAME_LEN: u32 = 16 * 1024 * 1024;

/// Header size: 4 bytes payload length.
const HEADER_LEN: usize = 4;

/// A call on one member of one service object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodCall {
    pub destination: String,
    pub path: String,
    pub interface: String,
    pub member: String,
    pub args: Vec<Value>,
}

impl MethodCall {
    #[must_use]
    pub fn new(kind: ServiceKind, member: &str, args: Vec<Value>) -> Self {
        Self {
            destination: BUS_NAME.to_owned(),
            path: kind.object_path().to_owned(),
            interface: kind.interface().to_owned(),
            member: member.to_owned(),
            args,
        }
    }
}

/// Externally tagged (`{"return": {..}}`): internally tagged enums buffer
/// their content and lose `arbitrary_precision` numbers on the way.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Response {
    /// The call was delivered; `result` is the daemon's own result code.
    Return {
        result: i32,
        #[serde(default)]
        values: Vec<Value>,
    },
    /// The call could not complete. `code` is zero unless the daemon got far
    /// enough to produce one.
    Fault {
        #[serde(default)]
        code: i32,
        message: String,
    },
}

fn encode_frame<T: Serialize>(item: &T, buf: &mut impl BufMut) -> io::Result<()> {
    let payload =
        serde_json::to_vec(item).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    let len = u32::try_from(payload.len())
        .ok()
        .filter(|len| *len <= MAX_FRAME_LEN)
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidData, "payload exceeds 16MB limit"))?;
    buf.put_u32_le(len);
    buf.put_slice(&payload);
    Ok(())
}

/// Decode one frame. Returns `Ok(None)` if not enough data yet.
fn decode_frame<T: DeserializeOwned>(src: &mut BytesMut) -> io::Result<Option<T>> {
    if src.len() < HEADER_LEN {
        return Ok(None);
    }

    let len = u32::from_le_bytes([src[0], src[1], src[2], src[3]]);
    if len > MAX_FRAME_LEN {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            "payload exceeds 16MB limit",
        ));
    }

    let total = HEADER_LEN + len as usize;
    if src.len() < total {
        src.reserve(total - src.len());
        return Ok(None);
    }

    src.advance(HEADER_LEN);
    let payload = src.split_to(len as usize);
    serde_json::from_slice(&payload)
        .map(Some)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}

// ─── Tokio codec (daemon side) ──────────────────────────────────────────────

/// Daemon-side codec: decodes calls, encodes responses. The client speaks
/// through [`write_call`] and [`read_response`]; this exists so stub daemons
/// in integration tests frame replies exactly as the client expects.
#[doc(hidden)]
pub struct BusCodec;

impl Decoder for BusCodec {
    type Item = MethodCall;
    type Error = io::Error;

    fn decode(&mut self, src: &mut BytesMut) -> io::Result<Option<MethodCall>> {
        decode_frame(src)
    }
}

impl Encoder<Response> for BusCodec {
    type Error = io::Error;

    fn encode(&mut self, item: Response, dst: &mut BytesMut) -> io::Result<()> {
        encode_frame(&item, dst)
    }
}

// ─── Sync helpers (client) ──────────────────────────────────────────────────

/// Write a method call to a sync writer.
///
/// # Errors
///
/// Returns an error if writing fails or the payload exceeds the size limit.
pub fn write_call<W: Write>(w: &mut W, call: &MethodCall) -> io::Result<()> {
    let mut buf = Vec::new();
    encode_frame(call, &mut buf)?;
    w.write_all(&buf)?;
    w.flush()
}

/// Read a response from a sync reader.
///
/// # Errors
///
/// Returns an error if reading fails, the frame is oversized, or the payload
/// is not a valid response.
pub fn read_response<R: Read>(r: &mut R) -> io::Result<Response> {
    let mut header = [0u8; HEADER_LEN];
    r.read_exact(&mut header)?;
    let len = u32::from_le_bytes(header);
    if len > MAX_FRAME_LEN {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            "payload exceeds 16MB limit",
        ));
    }

    let mut payload = vec![0u8; len as usize];
    r.read_exact(&mut payload)?;
    serde_json::from_slice(&payload).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}
