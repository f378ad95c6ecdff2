//! The abstract `Packet` the pipeline operates on (spec §3 "Packet").
//!
//! Carries the decoded name/variant alongside the original wire bytes so
//! that forwarding never has to re-encode a packet it only needs to relay.

use bytes::Bytes;
use rust_udcn_common::ndn::{Data, Interest, Name, SignatureInfo};

use crate::face::FaceId;

#[derive(Debug, Clone)]
pub enum PacketVariant {
    Interest(Interest),
    Data(Data),
}

#[derive(Debug, Clone)]
pub struct Packet {
    pub variant: PacketVariant,
    /// Fully encoded wire bytes, kept so a packet can be forwarded verbatim
    /// without re-encoding it.
    pub wire: Bytes,
    pub incoming_face: FaceId,
}

impl Packet {
    pub fn new_interest(interest: Interest, wire: Bytes, incoming_face: FaceId) -> Self {
        Self {
            variant: PacketVariant::Interest(interest),
            wire,
            incoming_face,
        }
    }

    pub fn new_data(data: Data, wire: Bytes, incoming_face: FaceId) -> Self {
        Self {
            variant: PacketVariant::Data(data),
            wire,
            incoming_face,
        }
    }

    pub fn name(&self) -> &Name {
        match &self.variant {
            PacketVariant::Interest(i) => &i.name,
            PacketVariant::Data(d) => &d.name,
        }
    }

    pub fn signature(&self) -> Option<&SignatureInfo> {
        match &self.variant {
            PacketVariant::Interest(i) => i.signature.as_ref(),
            PacketVariant::Data(d) => d.signature.as_ref(),
        }
    }

    pub fn as_interest(&self) -> Option<&Interest> {
        match &self.variant {
            PacketVariant::Interest(i) => Some(i),
            PacketVariant::Data(_) => None,
        }
    }

    pub fn as_data(&self) -> Option<&Data> {
        match &self.variant {
            PacketVariant::Data(d) => Some(d),
            PacketVariant::Interest(_) => None,
        }
    }

    pub fn is_interest(&self) -> bool {
        matches!(self.variant, PacketVariant::Interest(_))
    }
}

/// A unit of work delivered to a forwarding thread's inbound queue
/// (spec §4.3: "a multi-producer queue of `(packet, in_face_id)` items").
#[derive(Debug, Clone)]
pub struct InboundItem {
    pub packet: Packet,
    pub in_face_id: FaceId,
}
