//! Deterministic statement fingerprinting over category schema and raw text.
#![allow(clippy::cast_possible_truncation)]

use crate::schema::Category;
use sha2::{Digest, Sha256};
use std::fmt;

///
/// StatementFingerprint
///
/// Stable identity of a (category schema, descriptor text) pair. Two
/// descriptors with equal fingerprints compile to the same statement.
///

#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct StatementFingerprint([u8; 32]);

impl StatementFingerprint {
    #[must_use]
    pub fn of(category: &Category, raw: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(b"stmtfp:v1");

        write_tag(&mut hasher, 0x01);
        write_str(&mut hasher, category.name());
        write_u32(&mut hasher, category.keys().len() as u32);
        for key in category.keys() {
            write_str(&mut hasher, key.name());
            write_tag(&mut hasher, key.value_type().tag());
        }

        write_tag(&mut hasher, 0x02);
        write_str(&mut hasher, raw);

        let digest = hasher.finalize();
        let mut out = [0u8; 32];
        out.copy_from_slice(&digest);

        Self(out)
    }

    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    #[must_use]
    pub fn as_hex(&self) -> String {
        let mut out = String::with_capacity(64);
        for byte in self.0 {
            use std::fmt::Write as _;
            let _ = write!(out, "{byte:02x}");
        }
        out
    }
}

impl fmt::Display for StatementFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_hex())
    }
}

fn write_tag(hasher: &mut Sha256, tag: u8) {
    hasher.update([tag]);
}

fn write_u32(hasher: &mut Sha256, value: u32) {
    hasher.update(value.to_be_bytes());
}

fn write_str(hasher: &mut Sha256, value: &str) {
    write_u32(hasher, value.len() as u32);
    hasher.update(value.as_bytes());
}
