use lasso::{Spur, ThreadedRodeo};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::sync::LazyLock;

/// Global interner for record ids handed out by the backend.
static INTERNER: LazyLock<ThreadedRodeo> = LazyLock::new(ThreadedRodeo::default);

const PROVISIONAL_PREFIX: &str = "pending_";

/// Identifier of a remote record (layer, placed asset, media asset, scene).
///
/// Server ids are opaque strings; interning them keeps selection state and
/// history snapshots `Copy` and O(1) to compare.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct RecordId(Spur);

impl RecordId {
    /// Intern a server-issued id, or return the existing handle.
    pub fn intern(s: &str) -> Self {
        RecordId(INTERNER.get_or_intern(s))
    }

    pub fn as_str(&self) -> &str {
        INTERNER.resolve(&self.0)
    }

    /// Mint a local id for a record the server has not acknowledged yet.
    pub fn provisional() -> Self {
        use std::sync::atomic::{AtomicU64, Ordering};
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        let n = COUNTER.fetch_add(1, Ordering::Relaxed);
        Self::intern(&format!("{PROVISIONAL_PREFIX}{n}"))
    }

    /// True for ids minted by [`RecordId::provisional`].
    pub fn is_provisional(&self) -> bool {
        self.as_str().starts_with(PROVISIONAL_PREFIX)
    }
}

impl fmt::Debug for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.as_str())
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for RecordId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Accepts both string and integer ids; some backends still hand out
/// serial primary keys.
impl<'de> Deserialize<'de> for RecordId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Text(String),
            Number(i64),
        }

        Ok(match Raw::deserialize(deserializer)? {
            Raw::Text(s) => RecordId::intern(&s),
            Raw::Number(n) => RecordId::intern(&n.to_string()),
        })
    }
}
