//! NDN packet types and structures.
//!
//! This module provides the core data structures that represent NDN packets
//! in the µDCN implementation.

use crate::error::Error;
use crate::tlv::{self, TlvElement};
use bytes::{Buf, Bytes, BytesMut};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{Duration, Instant};

/// Maximum length of an NDN name component.
pub const MAX_NAME_COMPONENT_LENGTH: usize = 255;
/// Maximum number of components in an NDN name.
pub const MAX_NAME_COMPONENTS: usize = 16;
/// Maximum size of an NDN packet.
pub const MAX_NDN_PACKET_SIZE: usize = 8800;

/* ---------------------------------------------------------------- *\
 * Name and NameComponent
\* ---------------------------------------------------------------- */

/// NDN name component type codes (naming convention rev3), narrowed to the
/// ones the forwarding plane needs to tell apart for ordering/matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ComponentType {
    Generic,
    ImplicitSha256Digest,
    ParametersSha256Digest,
    Keyword,
    Segment,
    ByteOffset,
    Version,
    Timestamp,
    SequenceNum,
}

impl ComponentType {
    fn tlv_type(self) -> u8 {
        match self {
            ComponentType::Generic => tlv::TLV_COMPONENT_GENERIC,
            ComponentType::ImplicitSha256Digest => tlv::TLV_COMPONENT_IMPLICIT_SHA256_DIGEST,
            ComponentType::ParametersSha256Digest => tlv::TLV_COMPONENT_PARAMETERS_SHA256_DIGEST,
            ComponentType::Keyword => tlv::TLV_COMPONENT_KEYWORD,
            ComponentType::Segment => tlv::TLV_COMPONENT_SEGMENT,
            ComponentType::ByteOffset => tlv::TLV_COMPONENT_BYTE_OFFSET,
            ComponentType::Version => tlv::TLV_COMPONENT_VERSION,
            ComponentType::Timestamp => tlv::TLV_COMPONENT_TIMESTAMP,
            ComponentType::SequenceNum => tlv::TLV_COMPONENT_SEQUENCE_NUM,
        }
    }

    fn from_tlv_type(t: u8) -> Self {
        match t {
            tlv::TLV_COMPONENT_IMPLICIT_SHA256_DIGEST => ComponentType::ImplicitSha256Digest,
            tlv::TLV_COMPONENT_PARAMETERS_SHA256_DIGEST => ComponentType::ParametersSha256Digest,
            tlv::TLV_COMPONENT_KEYWORD => ComponentType::Keyword,
            tlv::TLV_COMPONENT_SEGMENT => ComponentType::Segment,
            tlv::TLV_COMPONENT_BYTE_OFFSET => ComponentType::ByteOffset,
            tlv::TLV_COMPONENT_VERSION => ComponentType::Version,
            tlv::TLV_COMPONENT_TIMESTAMP => ComponentType::Timestamp,
            tlv::TLV_COMPONENT_SEQUENCE_NUM => ComponentType::SequenceNum,
            _ => ComponentType::Generic,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NameComponent {
    pub typ: ComponentType,
    value: Bytes,
}

impl NameComponent {
    pub fn new(bytes: impl Into<Bytes>) -> Self {
        Self {
            typ: ComponentType::Generic,
            value: bytes.into(),
        }
    }

    pub fn with_type(typ: ComponentType, bytes: impl Into<Bytes>) -> Self {
        Self {
            typ,
            value: bytes.into(),
        }
    }

    pub fn as_bytes(&self) -> &Bytes {
        &self.value
    }

    pub fn to_tlv(&self) -> TlvElement {
        TlvElement::new(self.typ.tlv_type(), self.value.clone())
    }

    pub fn from_tlv(element: &TlvElement) -> Result<Self, Error> {
        Ok(Self {
            typ: ComponentType::from_tlv_type(element.tlv_type),
            value: element.value.clone(),
        })
    }
}

/// Components order first by type code, then lexicographically by value, as
/// required for canonical NDN ordering and constant-per-component comparison.
impl PartialOrd for NameComponent {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for NameComponent {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        (self.typ.tlv_type(), self.value.len())
            .cmp(&(other.typ.tlv_type(), other.value.len()))
            .then_with(|| self.value.cmp(&other.value))
    }
}

impl fmt::Display for NameComponent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let printable = self
            .value
            .iter()
            .all(|&b| (b.is_ascii_graphic() || b == b' '));
        if printable {
            write!(f, "{}", String::from_utf8_lossy(&self.value))
        } else {
            write!(f, "0x")?;
            for &b in &self.value {
                write!(f, "{:02x}", b)?;
            }
            Ok(())
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct Name {
    components: Vec<NameComponent>,
}

impl Name {
    pub fn new() -> Self {
        Self {
            components: Vec::new(),
        }
    }

    pub fn from_string(s: &str) -> Self {
        let components = s
            .split('/')
            .filter(|comp| !comp.is_empty())
            .map(|comp| NameComponent::new(comp.as_bytes().to_vec()))
            .collect();
        Self { components }
    }

    pub fn push(&mut self, component: NameComponent) -> &mut Self {
        self.components.push(component);
        self
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    pub fn components(&self) -> impl Iterator<Item = &NameComponent> {
        self.components.iter()
    }

    pub fn get(&self, index: usize) -> Option<&NameComponent> {
        self.components.get(index)
    }

    pub fn prefix(&self, len: usize) -> Self {
        Self {
            components: self.components.iter().take(len).cloned().collect(),
        }
    }

    /// `self` is a prefix of `other` (component count and each component
    /// compared in O(common-depth), never the full byte content beyond a
    /// mismatch).
    pub fn is_prefix_of(&self, other: &Self) -> bool {
        if self.components.len() > other.components.len() {
            return false;
        }
        self.components
            .iter()
            .zip(other.components.iter())
            .all(|(a, b)| a == b)
    }

    pub fn to_tlv(&self) -> Result<TlvElement, Error> {
        let mut buf = BytesMut::new();
        for component in &self.components {
            component.to_tlv().encode(&mut buf);
        }
        Ok(TlvElement::new(tlv::TLV_NAME, buf.freeze()))
    }

    pub fn from_tlv(element: &TlvElement) -> Result<Self, Error> {
        if element.tlv_type != tlv::TLV_NAME {
            return Err(Error::NdnPacket(format!(
                "Expected name TLV type {}, got {}",
                tlv::TLV_NAME,
                element.tlv_type
            )));
        }

        let mut components = Vec::new();
        let mut buf = element.value.clone();
        while buf.has_remaining() {
            let e = TlvElement::decode(&mut buf)?;
            components.push(NameComponent::from_tlv(&e)?);
        }
        Ok(Self { components })
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.components.is_empty() {
            return write!(f, "/");
        }
        for component in &self.components {
            write!(f, "/{}", component)?;
        }
        Ok(())
    }
}

impl PartialOrd for Name {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Name {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.components.cmp(&other.components)
    }
}

/* ---------------------------------------------------------------- *\
 * ForwardingHint
\* ---------------------------------------------------------------- */

/// An ordered list of delegation names, used when the direct name has no
/// FIB route.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForwardingHint(pub Vec<Name>);

/* ---------------------------------------------------------------- *\
 * Signature info
\* ---------------------------------------------------------------- */

/// Opaque signature material. The forwarding plane never interprets these
/// bytes; it only carries them end to end.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureInfo {
    pub signature_type: u8,
    pub key_locator: Option<Bytes>,
}

/* ---------------------------------------------------------------- *\
 * Interest
\* ---------------------------------------------------------------- */

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Interest {
    pub name: Name,
    pub nonce: u32,
    pub lifetime_ms: u32,
    pub hop_limit: Option<u8>,
    pub can_be_prefix: bool,
    pub must_be_fresh: bool,
    pub forwarding_hint: ForwardingHint,
    pub application_parameters: Option<Bytes>,
    pub signature: Option<SignatureInfo>,
}

impl Interest {
    pub fn new(name: Name) -> Self {
        use std::time::{SystemTime, UNIX_EPOCH};

        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_else(|_| Duration::from_secs(0));
        let nonce = (now.as_millis() % u32::MAX as u128) as u32;

        Self {
            name,
            nonce,
            lifetime_ms: 4000,
            hop_limit: Some(32),
            can_be_prefix: false,
            must_be_fresh: true,
            forwarding_hint: ForwardingHint::default(),
            application_parameters: None,
            signature: None,
        }
    }

    pub fn with_lifetime(mut self, lifetime_ms: u32) -> Self {
        self.lifetime_ms = lifetime_ms;
        self
    }
    pub fn with_nonce(mut self, nonce: u32) -> Self {
        self.nonce = nonce;
        self
    }
    pub fn with_can_be_prefix(mut self, can_be_prefix: bool) -> Self {
        self.can_be_prefix = can_be_prefix;
        self
    }
    pub fn with_must_be_fresh(mut self, must_be_fresh: bool) -> Self {
        self.must_be_fresh = must_be_fresh;
        self
    }
    pub fn with_hop_limit(mut self, hop_limit: Option<u8>) -> Self {
        self.hop_limit = hop_limit;
        self
    }
    pub fn with_forwarding_hint(mut self, hint: ForwardingHint) -> Self {
        self.forwarding_hint = hint;
        self
    }

    /// Applies the hop-limit decrement from spec §4.3 step 1. Returns
    /// `false` if the Interest should be dropped without forwarding.
    pub fn decrement_hop_limit(&mut self) -> bool {
        match self.hop_limit {
            None => true,
            Some(0) => false,
            Some(n) => {
                let new = n - 1;
                self.hop_limit = Some(new);
                new > 0
            }
        }
    }

    pub fn wire_size(&self) -> Result<usize, Error> {
        let mut size = self.name.to_tlv()?.len() + 20;
        if let Some(ap) = &self.application_parameters {
            size += ap.len() + 4;
        }
        Ok(size)
    }

    /// Canonical TLV encoding (spec §8: "any encoded Interest decoded then
    /// re-encoded yields identical bytes").
    pub fn encode(&self) -> Result<Bytes, Error> {
        let mut inner = BytesMut::new();
        self.name.to_tlv()?.encode(&mut inner);
        if self.can_be_prefix {
            TlvElement::new(tlv::TLV_CAN_BE_PREFIX, Bytes::new()).encode(&mut inner);
        }
        if self.must_be_fresh {
            TlvElement::new(tlv::TLV_MUST_BE_FRESH, Bytes::new()).encode(&mut inner);
        }
        if !self.forwarding_hint.0.is_empty() {
            let mut hint_buf = BytesMut::new();
            for name in &self.forwarding_hint.0 {
                name.to_tlv()?.encode(&mut hint_buf);
            }
            TlvElement::new(tlv::TLV_FORWARDING_HINT, hint_buf.freeze()).encode(&mut inner);
        }
        TlvElement::encode_nonneg(tlv::TLV_NONCE, self.nonce as u64).encode(&mut inner);
        TlvElement::encode_nonneg(tlv::TLV_INTEREST_LIFETIME, self.lifetime_ms as u64).encode(&mut inner);
        if let Some(hop_limit) = self.hop_limit {
            TlvElement::new(tlv::TLV_HOP_LIMIT, Bytes::copy_from_slice(&[hop_limit])).encode(&mut inner);
        }
        if let Some(ap) = &self.application_parameters {
            TlvElement::new(tlv::TLV_APPLICATION_PARAMETERS, ap.clone()).encode(&mut inner);
        }

        let mut buf = BytesMut::new();
        TlvElement::new(tlv::TLV_INTEREST, inner.freeze()).encode(&mut buf);
        Ok(buf.freeze())
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, Error> {
        let mut cursor = Bytes::copy_from_slice(bytes);
        let outer = TlvElement::decode(&mut cursor)?;
        if outer.tlv_type != tlv::TLV_INTEREST {
            return Err(Error::NdnPacket(format!(
                "expected Interest TLV type {}, got {}",
                tlv::TLV_INTEREST,
                outer.tlv_type
            )));
        }

        let mut inner = outer.value;
        let mut name = None;
        let mut can_be_prefix = false;
        let mut must_be_fresh = false;
        let mut forwarding_hint = ForwardingHint::default();
        let mut nonce = 0u32;
        let mut lifetime_ms = 4000u32;
        let mut hop_limit = None;
        let mut application_parameters = None;

        while inner.has_remaining() {
            let elem = TlvElement::decode(&mut inner)?;
            match elem.tlv_type {
                tlv::TLV_NAME => name = Some(Name::from_tlv(&elem)?),
                tlv::TLV_CAN_BE_PREFIX => can_be_prefix = true,
                tlv::TLV_MUST_BE_FRESH => must_be_fresh = true,
                tlv::TLV_FORWARDING_HINT => {
                    let mut hbuf = elem.value;
                    let mut names = Vec::new();
                    while hbuf.has_remaining() {
                        let e = TlvElement::decode(&mut hbuf)?;
                        names.push(Name::from_tlv(&e)?);
                    }
                    forwarding_hint = ForwardingHint(names);
                }
                tlv::TLV_NONCE => nonce = elem.decode_nonneg()? as u32,
                tlv::TLV_INTEREST_LIFETIME => lifetime_ms = elem.decode_nonneg()? as u32,
                tlv::TLV_HOP_LIMIT => hop_limit = elem.value.first().copied(),
                tlv::TLV_APPLICATION_PARAMETERS => application_parameters = Some(elem.value),
                _ => {} // unrecognized non-critical TLVs are ignored
            }
        }

        Ok(Self {
            name: name.ok_or_else(|| Error::NdnPacket("Interest missing Name".into()))?,
            nonce,
            lifetime_ms,
            hop_limit,
            can_be_prefix,
            must_be_fresh,
            forwarding_hint,
            application_parameters,
            signature: None,
        })
    }
}

/* ---------------------------------------------------------------- *\
 * Data
\* ---------------------------------------------------------------- */

/// Content type codes carried in Data MetaInfo.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContentType {
    Blob,
    Link,
    Key,
    Nack,
}

impl Default for ContentType {
    fn default() -> Self {
        ContentType::Blob
    }
}

/// Helper used only for deserialisation of `Data`.
#[derive(Deserialize)]
struct DataHelper {
    name: Name,
    content: Bytes,
    ttl_ms: u32,
    #[serde(default)]
    content_type: ContentType,
    #[serde(default)]
    final_block_id: Option<NameComponent>,
    #[serde(default)]
    signature: Option<SignatureInfo>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Data {
    pub name: Name,
    pub content: Bytes,
    /// FreshnessPeriod, in milliseconds. A Data with `ttl_ms == 0` is
    /// considered immediately stale (non-fresh) but is still cacheable.
    pub ttl_ms: u32,
    pub content_type: ContentType,
    pub final_block_id: Option<NameComponent>,
    pub signature: Option<SignatureInfo>,

    /// Creation timestamp – not serialised, regenerated on deserialisation.
    #[serde(skip_serializing)]
    pub creation_time: Instant,
}

impl<'de> Deserialize<'de> for Data {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let helper = DataHelper::deserialize(deserializer)?;
        Ok(Self {
            name: helper.name,
            content: helper.content,
            ttl_ms: helper.ttl_ms,
            content_type: helper.content_type,
            final_block_id: helper.final_block_id,
            signature: helper.signature,
            creation_time: Instant::now(), // fresh timestamp
        })
    }
}

impl Data {
    pub fn new(name: Name, content: impl Into<Bytes>) -> Self {
        Self {
            name,
            content: content.into(),
            ttl_ms: 0,
            content_type: ContentType::Blob,
            final_block_id: None,
            signature: None,
            creation_time: Instant::now(),
        }
    }

    pub fn with_ttl(mut self, ttl_ms: u32) -> Self {
        self.ttl_ms = ttl_ms;
        self
    }

    pub fn with_content_type(mut self, content_type: ContentType) -> Self {
        self.content_type = content_type;
        self
    }

    /// `MustBeFresh` semantics: freshness is measured against
    /// `insertion_time + freshness_period` (spec §4.2, CS).
    pub fn is_fresh(&self) -> bool {
        self.creation_time.elapsed() <= Duration::from_millis(self.ttl_ms as u64)
    }

    pub fn is_expired(&self) -> bool {
        !self.is_fresh()
    }

    pub fn wire_size(&self) -> Result<usize, Error> {
        Ok(self.name.to_tlv()?.len() + self.content.len() + 20)
    }

    fn content_type_code(&self) -> u8 {
        match self.content_type {
            ContentType::Blob => 0,
            ContentType::Link => 1,
            ContentType::Key => 2,
            ContentType::Nack => 3,
        }
    }

    fn content_type_from_code(code: u8) -> ContentType {
        match code {
            1 => ContentType::Link,
            2 => ContentType::Key,
            3 => ContentType::Nack,
            _ => ContentType::Blob,
        }
    }

    /// Canonical TLV encoding (spec §8 round-trip property).
    pub fn encode(&self) -> Result<Bytes, Error> {
        let mut inner = BytesMut::new();
        self.name.to_tlv()?.encode(&mut inner);

        let mut meta = BytesMut::new();
        TlvElement::encode_nonneg(tlv::TLV_CONTENT_TYPE, self.content_type_code() as u64).encode(&mut meta);
        TlvElement::encode_nonneg(tlv::TLV_FRESHNESS_PERIOD, self.ttl_ms as u64).encode(&mut meta);
        if let Some(fbid) = &self.final_block_id {
            let mut fb = BytesMut::new();
            fbid.to_tlv().encode(&mut fb);
            TlvElement::new(tlv::TLV_FINAL_BLOCK_ID, fb.freeze()).encode(&mut meta);
        }
        TlvElement::new(tlv::TLV_META_INFO, meta.freeze()).encode(&mut inner);

        TlvElement::new(tlv::TLV_CONTENT, self.content.clone()).encode(&mut inner);

        let mut buf = BytesMut::new();
        TlvElement::new(tlv::TLV_DATA, inner.freeze()).encode(&mut buf);
        Ok(buf.freeze())
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, Error> {
        let mut cursor = Bytes::copy_from_slice(bytes);
        let outer = TlvElement::decode(&mut cursor)?;
        if outer.tlv_type != tlv::TLV_DATA {
            return Err(Error::NdnPacket(format!(
                "expected Data TLV type {}, got {}",
                tlv::TLV_DATA,
                outer.tlv_type
            )));
        }

        let mut inner = outer.value;
        let mut name = None;
        let mut content = Bytes::new();
        let mut content_type = ContentType::Blob;
        let mut ttl_ms = 0u32;
        let mut final_block_id = None;

        while inner.has_remaining() {
            let elem = TlvElement::decode(&mut inner)?;
            match elem.tlv_type {
                tlv::TLV_NAME => name = Some(Name::from_tlv(&elem)?),
                tlv::TLV_CONTENT => content = elem.value,
                tlv::TLV_META_INFO => {
                    let mut meta = elem.value;
                    while meta.has_remaining() {
                        let m = TlvElement::decode(&mut meta)?;
                        match m.tlv_type {
                            tlv::TLV_CONTENT_TYPE => {
                                content_type = Self::content_type_from_code(m.decode_nonneg()? as u8)
                            }
                            tlv::TLV_FRESHNESS_PERIOD => ttl_ms = m.decode_nonneg()? as u32,
                            tlv::TLV_FINAL_BLOCK_ID => {
                                let mut fb = m.value;
                                let e = TlvElement::decode(&mut fb)?;
                                final_block_id = Some(NameComponent::from_tlv(&e)?);
                            }
                            _ => {}
                        }
                    }
                }
                _ => {}
            }
        }

        Ok(Self {
            name: name.ok_or_else(|| Error::NdnPacket("Data missing Name".into()))?,
            content,
            ttl_ms,
            content_type,
            final_block_id,
            signature: None,
            creation_time: Instant::now(),
        })
    }
}

/* ---------------------------------------------------------------- *\
 * Misc
\* ---------------------------------------------------------------- */

#[derive(Debug, Clone)]
pub enum InterestResult {
    Forwarded,
    SatisfiedByCs(Data),
    Aggregated,
    Dropped(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_prefix_matching() {
        let a = Name::from_string("/a/b");
        let abc = Name::from_string("/a/b/c");
        assert!(a.is_prefix_of(&abc));
        assert!(!abc.is_prefix_of(&a));
    }

    #[test]
    fn name_tlv_roundtrip() {
        let n = Name::from_string("/a/b/c");
        let tlv = n.to_tlv().unwrap();
        let decoded = Name::from_tlv(&tlv).unwrap();
        assert_eq!(n, decoded);
    }

    #[test]
    fn hop_limit_decrement_drops_at_zero() {
        let mut i = Interest::new(Name::from_string("/a")).with_hop_limit(Some(2));
        assert!(i.decrement_hop_limit());
        assert_eq!(i.hop_limit, Some(1));
        assert!(!i.decrement_hop_limit());
        assert_eq!(i.hop_limit, Some(0));

        let mut i2 = Interest::new(Name::from_string("/a")).with_hop_limit(Some(0));
        assert!(!i2.decrement_hop_limit());
    }

    #[test]
    fn interest_encode_decode_roundtrip_is_byte_identical() {
        let interest = Interest::new(Name::from_string("/a/b"))
            .with_nonce(42)
            .with_lifetime(5000)
            .with_can_be_prefix(true)
            .with_must_be_fresh(false)
            .with_hop_limit(Some(10));

        let encoded = interest.encode().unwrap();
        let decoded = Interest::decode(&encoded).unwrap();
        let re_encoded = decoded.encode().unwrap();

        assert_eq!(encoded, re_encoded);
        assert_eq!(decoded.nonce, 42);
        assert_eq!(decoded.lifetime_ms, 5000);
        assert!(decoded.can_be_prefix);
        assert!(!decoded.must_be_fresh);
        assert_eq!(decoded.hop_limit, Some(10));
    }

    #[test]
    fn data_encode_decode_roundtrip_is_byte_identical() {
        let data = Data::new(Name::from_string("/a/b"), "hello").with_ttl(1000);
        let encoded = data.encode().unwrap();
        let decoded = Data::decode(&encoded).unwrap();
        let re_encoded = decoded.encode().unwrap();

        assert_eq!(encoded, re_encoded);
        assert_eq!(decoded.name, data.name);
        assert_eq!(decoded.content, data.content);
        assert_eq!(decoded.ttl_ms, 1000);
    }
}
