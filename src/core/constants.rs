// ============================================================================
// event-signals - Constants
// Reserved signal names fired automatically by the wrappers
// ============================================================================

// =============================================================================
// CHANGE SIGNALS (Signaler and SignalerProperty)
// =============================================================================

/// Fired with the incoming arguments before a wrapped call or property set.
pub const BEFORE_CHANGE: &str = "before_change";

/// Fired with the observed value after a wrapped call or property set.
pub const CHANGE: &str = "change";

// =============================================================================
// DELETE SIGNALS (SignalerProperty only)
// =============================================================================

/// Fired with no arguments before a property value is deleted.
pub const BEFORE_DELETE: &str = "before_delete";

/// Fired with no arguments after a property value is deleted.
pub const DELETE: &str = "delete";

// =============================================================================
// GROUPS
// =============================================================================

/// Signals a `Signaler` fires on every call.
pub const SIGNALER_SIGNALS: [&str; 2] = [BEFORE_CHANGE, CHANGE];

/// Signals a `SignalerProperty` fires on set and delete.
pub const PROPERTY_SIGNALS: [&str; 4] = [BEFORE_DELETE, DELETE, BEFORE_CHANGE, CHANGE];

/// Check whether a name is one of the automatically fired signals.
pub fn is_reserved(name: &str) -> bool {
    PROPERTY_SIGNALS.contains(&name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reserved_names_are_distinct() {
        for (i, a) in PROPERTY_SIGNALS.iter().enumerate() {
            for b in &PROPERTY_SIGNALS[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn signaler_signals_are_reserved() {
        assert!(SIGNALER_SIGNALS.iter().all(|name| is_reserved(name)));
        assert!(!is_reserved("custom_notifier"));
    }
}
