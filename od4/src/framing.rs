use anyhow::{bail, Ok};
use prost::Message as _;

use crate::messages::Envelope;

const MAGIC: [u8; 2] = [0x0D, 0xA4];
const HEADER_SIZE: usize = 5;
const MAX_PAYLOAD: usize = 0xFF_FFFF;

/// Magic bytes, 24 bit little endian length, then the protobuf envelope.
pub fn encode_frame(envelope: &Envelope) -> anyhow::Result<Vec<u8>> {
    let payload = envelope.encode_to_vec();
    if payload.len() > MAX_PAYLOAD {
        bail!("Envelope of {} bytes does not fit in one frame", payload.len());
    }

    let mut frame = Vec::with_capacity(HEADER_SIZE + payload.len());
    frame.extend_from_slice(&MAGIC);
    frame.extend_from_slice(&(payload.len() as u32).to_le_bytes()[..3]);
    frame.extend_from_slice(&payload);

    Ok(frame)
}

pub fn decode_frame(datagram: &[u8]) -> anyhow::Result<Envelope> {
    if datagram.len() < HEADER_SIZE {
        bail!("Datagram of {} bytes is shorter than the frame header", datagram.len());
    }
    if datagram[..2] != MAGIC {
        bail!("Datagram does not start with the OD4 magic bytes");
    }

    let length = u32::from_le_bytes([datagram[2], datagram[3], datagram[4], 0]) as usize;
    let payload = &datagram[HEADER_SIZE..];
    if payload.len() != length {
        bail!("Frame announces {length} bytes but carries {}", payload.len());
    }

    Ok(Envelope::decode(payload)?)
}
