//! Opaque entity identifiers.
//!
//! Each ID is a distinct newtype over [`uuid::Uuid`] so a `ChunkId` can never
//! be passed where a `JobId` is expected. Production code mints IDs with
//! [`UuidIdGen`]; tests that need reproducible, order-dependent IDs use
//! [`SequentialIdGen`] instead.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(
            Debug,
            Clone,
            Copy,
            PartialEq,
            Eq,
            Hash,
            PartialOrd,
            Ord,
            serde::Serialize,
            serde::Deserialize,
        )]
        pub struct $name(pub uuid::Uuid);

        impl $name {
            pub fn new() -> Self {
                Self(uuid::Uuid::new_v4())
            }

            pub fn from_generator(r#gen: &dyn IdGenerator) -> Self {
                Self(r#gen.next_id())
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                fmt::Display::fmt(&self.0, f)
            }
        }
    };
}

id_newtype!(PaperId);
id_newtype!(ChunkId);
id_newtype!(JobId);
id_newtype!(EpisodeId);
id_newtype!(StyleId);

/// Mints entity IDs. Production code uses [`UuidIdGen`]; tests that need
/// deterministic, reproducible output use [`SequentialIdGen`].
pub trait IdGenerator: Send + Sync {
    fn next_id(&self) -> uuid::Uuid;
}

#[derive(Debug, Default)]
pub struct UuidIdGen;

impl IdGenerator for UuidIdGen {
    fn next_id(&self) -> uuid::Uuid {
        uuid::Uuid::new_v4()
    }
}

/// Deterministic ID generator for tests and golden-output assertions:
/// produces UUIDs whose low 64 bits are a strictly increasing counter, so
/// two runs of the same test produce byte-identical IDs.
#[derive(Debug, Default)]
pub struct SequentialIdGen(AtomicU64);

impl SequentialIdGen {
    pub fn new() -> Self {
        Self(AtomicU64::new(0))
    }
}

impl IdGenerator for SequentialIdGen {
    fn next_id(&self) -> uuid::Uuid {
        let counter = self.0.fetch_add(1, Ordering::Relaxed);
        uuid::Uuid::from_u128(counter as u128)
    }
}
