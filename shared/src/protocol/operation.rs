use std::fmt;

/// Every operation a client may request.
///
/// Resolved from the envelope `type` through a static table rather than by
/// name lookup at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    Select,
    Insert,
    Update,
    Delete,
    Listen,
    Unlisten,
    UnlistenAll,
    ApplyJwt,
    GetCanonicalRepr,
}

const OPERATIONS: &[(&str, OperationKind)] = &[
    ("select", OperationKind::Select),
    ("insert", OperationKind::Insert),
    ("update", OperationKind::Update),
    ("delete", OperationKind::Delete),
    ("listen", OperationKind::Listen),
    ("unlisten", OperationKind::Unlisten),
    ("unlisten-all", OperationKind::UnlistenAll),
    ("apply-jwt", OperationKind::ApplyJwt),
    (
        "get-canonical-representations",
        OperationKind::GetCanonicalRepr,
    ),
];

impl OperationKind {
    /// Look up the operation for a kebab-case message type.
    pub fn from_type(message_type: &str) -> Option<Self> {
        OPERATIONS
            .iter()
            .find(|(name, _)| *name == message_type)
            .map(|(_, kind)| *kind)
    }

    /// The kebab-case message type for this operation.
    pub fn message_type(&self) -> &'static str {
        OPERATIONS
            .iter()
            .find(|(_, kind)| kind == self)
            .map(|(name, _)| *name)
            .unwrap_or("unknown")
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message_type())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_kind_round_trips_through_its_name() {
        for (name, kind) in OPERATIONS {
            assert_eq!(OperationKind::from_type(name), Some(*kind));
            assert_eq!(kind.message_type(), *name);
        }
    }

    #[test]
    fn unknown_types_resolve_to_none() {
        assert_eq!(OperationKind::from_type("frobnicate"), None);
        assert_eq!(OperationKind::from_type("unlisten_all"), None);
        assert_eq!(OperationKind::from_type("Select"), None);
    }
}
