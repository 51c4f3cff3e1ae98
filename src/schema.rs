//! Structural schema signatures for the tracked record types.
//!
//! Every record declares its field identifiers statically; the signature is
//! a compile-time hash over the record type name, the schema version, and
//! that field list. Readers compare signatures before trusting the field
//! layout of a record reconstructed from stored or external data.

use crate::error::{Result, TrackerError};

/// Bumped whenever any record's declared field set changes shape.
pub const SCHEMA_VERSION: u32 = 1;

const FNV_OFFSET: u32 = 0x811c_9dc5;
const FNV_PRIME: u32 = 0x0100_0193;

/// FNV-1a, folding `bytes` into a running hash.
pub const fn fnv1a32(seed: u32, bytes: &[u8]) -> u32 {
    let mut hash = seed;
    let mut i = 0;
    while i < bytes.len() {
        hash ^= bytes[i] as u32;
        hash = hash.wrapping_mul(FNV_PRIME);
        i += 1;
    }
    hash
}

/// Signature over a record type name and its declared field identifiers.
pub const fn signature_of(record_type: &str, fields: &[&str]) -> u32 {
    let mut hash = fnv1a32(FNV_OFFSET, record_type.as_bytes());
    hash = fnv1a32(hash, &SCHEMA_VERSION.to_be_bytes());
    let mut i = 0;
    while i < fields.len() {
        hash = fnv1a32(hash, fields[i].as_bytes());
        i += 1;
    }
    hash
}

/// Contract every tracked record type supplies: a stable record type name,
/// the declared field identifiers in declaration order, and the structural
/// signature derived from both. Deep cloning is the `Clone` impl; owned
/// sub-records clone recursively and absent optional fields stay absent.
pub trait TrackedComponent: Clone {
    const RECORD_TYPE: &'static str;
    const FIELDS: &'static [&'static str];
    const SIGNATURE: u32 = signature_of(Self::RECORD_TYPE, Self::FIELDS);

    fn signature(&self) -> u32 {
        Self::SIGNATURE
    }
}

/// Validate the signature found on a reconstructed record against the
/// compiled-in schema for `T`.
pub fn check_signature<T: TrackedComponent>(found: u32) -> Result<()> {
    if found != T::SIGNATURE {
        return Err(TrackerError::SchemaMismatch {
            record: T::RECORD_TYPE,
            expected: T::SIGNATURE,
            found,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone)]
    struct Sample;

    impl TrackedComponent for Sample {
        const RECORD_TYPE: &'static str = "test.sample";
        const FIELDS: &'static [&'static str] = &["test.sample.a", "test.sample.b"];
    }

    #[test]
    fn signature_is_stable_and_field_sensitive() {
        assert_eq!(Sample::SIGNATURE, Sample::SIGNATURE);
        let reordered = signature_of("test.sample", &["test.sample.b", "test.sample.a"]);
        assert_ne!(Sample::SIGNATURE, reordered);
        let renamed = signature_of("test.other", Sample::FIELDS);
        assert_ne!(Sample::SIGNATURE, renamed);
    }

    #[test]
    fn mismatch_is_reported() {
        assert!(check_signature::<Sample>(Sample::SIGNATURE).is_ok());
        let err = check_signature::<Sample>(Sample::SIGNATURE ^ 1).unwrap_err();
        match err {
            TrackerError::SchemaMismatch { record, .. } => assert_eq!(record, "test.sample"),
            other => panic!("unexpected error: {other}"),
        }
    }
}
