//! The string arena behind `CombatEvent::deep_clone` and JSON import.
//!
//! Parsed events borrow every string from the line buffer; anything that
//! must outlive the line goes through [`intern_str`]. Combat logs repeat the
//! same names millions of times, so the arena is a deduplicating `lasso`
//! rodeo: one stored copy per distinct string, and since the rodeo is never
//! dropped, the slices it hands back are `&'static str`.

use lasso::ThreadedRodeo;
use std::sync::OnceLock;

static ARENA: OnceLock<ThreadedRodeo> = OnceLock::new();

/// Copy `s` into the arena (deduplicated) and return the long-lived slice.
pub fn intern_str(s: &str) -> &'static str {
    let arena = ARENA.get_or_init(ThreadedRodeo::default);
    arena.resolve(&arena.get_or_intern(s))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_and_deduplicates() {
        let a = intern_str("Dread Master Bestia");
        let b = intern_str("Dread Master Bestia");
        assert_eq!(a, "Dread Master Bestia");
        assert!(std::ptr::eq(a, b), "repeat interning must reuse storage");
        assert_eq!(intern_str(""), "");
    }
}
