//! Shared value types.

/// BLAKE3 digest of a file's full byte content.
///
/// Two files with equal fingerprints are treated as identical content.
pub type Fingerprint = [u8; 32];

/// Lowercase hex rendering of a fingerprint.
pub fn fingerprint_hex(fingerprint: &Fingerprint) -> String {
    hex::encode(fingerprint)
}

/// First twelve hex digits, enough to tell fingerprints apart in logs.
pub fn short_hex(fingerprint: &Fingerprint) -> String {
    hex::encode(&fingerprint[..6])
}

/// Serde helper: fingerprint as a hex string
pub(crate) fn serialize_hex<S>(fingerprint: &Fingerprint, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.serialize_str(&fingerprint_hex(fingerprint))
}

pub(crate) fn serialize_hex_opt<S>(
    fingerprint: &Option<Fingerprint>,
    serializer: S,
) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    match fingerprint {
        Some(fp) => serializer.serialize_some(&fingerprint_hex(fp)),
        None => serializer.serialize_none(),
    }
}
