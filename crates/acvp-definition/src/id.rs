//! Remotely assigned identifiers and their flag bits.
//!
//! IDs are 32-bit. Zero means "not yet assigned". The three high bits carry
//! request state; everything below them is the numeric identifier.

/// The entity was rejected or deleted; its stored key must be removed.
pub const REQUEST_REJECTED: u32 = 1 << 31;

/// The value is an outstanding request ID, not an entity ID.
pub const REQUEST_PENDING: u32 = 1 << 30;

/// The request was processed by the server.
pub const REQUEST_PROCESSED: u32 = 1 << 29;

/// All flag bits.
pub const REQUEST_MASK: u32 = REQUEST_REJECTED | REQUEST_PENDING | REQUEST_PROCESSED;

/// Whether the ID is tagged for removal.
pub fn is_rejected(id: u32) -> bool {
    id & REQUEST_REJECTED != 0
}

/// Whether the ID refers to an outstanding asynchronous request.
pub fn is_pending(id: u32) -> bool {
    id & REQUEST_PENDING != 0
}

/// The numeric part of an ID with all flag bits cleared.
pub fn numeric(id: u32) -> u32 {
    id & !REQUEST_MASK
}

/// Whether the ID names a usable remote entity.
pub fn is_assigned(id: u32) -> bool {
    numeric(id) != 0 && id & (REQUEST_REJECTED | REQUEST_PENDING) == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_are_disjoint_from_numeric_part() {
        let id = 42 | REQUEST_PENDING;
        assert!(is_pending(id));
        assert!(!is_rejected(id));
        assert_eq!(numeric(id), 42);
    }

    #[test]
    fn assigned_excludes_flagged_and_zero() {
        assert!(is_assigned(7));
        assert!(!is_assigned(0));
        assert!(!is_assigned(7 | REQUEST_PENDING));
        assert!(!is_assigned(REQUEST_REJECTED));
        assert!(is_assigned(7 | REQUEST_PROCESSED));
    }
}
