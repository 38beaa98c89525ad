use lasso::{Spur, ThreadedRodeo};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::sync::LazyLock;

/// Global string interner for node ids. O(1) compare and hash.
static INTERNER: LazyLock<ThreadedRodeo> = LazyLock::new(ThreadedRodeo::default);

/// An opaque, interned identifier for a page or a component node.
///
/// Ids are `Copy` and 4 bytes wide; the backing string lives for the
/// lifetime of the process.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(Spur);

impl NodeId {
    /// Intern a string as a `NodeId`, or return the existing one.
    pub fn intern(s: &str) -> Self {
        NodeId(INTERNER.get_or_intern(s))
    }

    /// Look up an already-interned id without interning `s`.
    ///
    /// Handy for queries with user-typed ids: a string that was never
    /// interned cannot name a node.
    pub fn lookup(s: &str) -> Option<Self> {
        INTERNER.get(s).map(NodeId)
    }

    /// Resolve back to a string slice.
    pub fn as_str(&self) -> &str {
        INTERNER.resolve(&self.0)
    }

    /// Build the `n`-th id for a given prefix, e.g. `header-3`.
    pub fn numbered(prefix: &str, n: u64) -> Self {
        Self::intern(&format!("{prefix}-{n}"))
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.as_str())
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for NodeId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for NodeId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(NodeId::intern(&s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interning_roundtrip() {
        let a = NodeId::intern("hero-1");
        let b = NodeId::intern("hero-1");
        assert_eq!(a, b);
        assert_eq!(a.as_str(), "hero-1");
    }

    #[test]
    fn numbered_ids_use_dash_suffix() {
        assert_eq!(NodeId::numbered("contact-form", 4).as_str(), "contact-form-4");
    }

    #[test]
    fn lookup_does_not_intern() {
        assert!(NodeId::lookup("never-seen-before-id-xyz").is_none());
        let id = NodeId::intern("seen-id");
        assert_eq!(NodeId::lookup("seen-id"), Some(id));
    }

    #[test]
    fn serde_as_plain_string() {
        let id = NodeId::intern("footer-2");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"footer-2\"");
        let back: NodeId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }
}
