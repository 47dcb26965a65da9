//! Wire projection for event kinds: both the stable name and the numeric
//! code travel, and the code is authoritative when decoding.

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::timeline::EventKind;

#[derive(Serialize)]
struct KindEnvelope {
    name: &'static str,
    id: i32,
}

// The name also travels on the wire but the code is what decoding
// trusts; serde drops the unknown field.
#[derive(Deserialize)]
struct KindEnvelopeOwned {
    id: i32,
}

impl Serialize for EventKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        KindEnvelope {
            name: self.name(),
            id: self.code(),
        }
        .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for EventKind {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let envelope = KindEnvelopeOwned::deserialize(deserializer)?;
        EventKind::from_code(envelope.id)
            .ok_or_else(|| D::Error::custom(format_args!("unknown event kind {}", envelope.id)))
    }
}
