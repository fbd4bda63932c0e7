//! The processor contract and the shared context handed to processors.

use crate::combat_log::CombatEvent;
use crate::timekeeping::ClockSource;
use crate::tracking::{CombatStateMachine, EntityRegistry};

/// Read-only view of the pipeline, rebuilt for every event.
pub struct PluginContext<'a> {
    pub clock: &'a dyn ClockSource,
    pub state: &'a CombatStateMachine,
    pub registry: &'a EntityRegistry,
    pub last_event: Option<&'a CombatEvent<'static>>,
    pub last_area_entered: Option<&'a CombatEvent<'static>>,
    pub last_enter_combat: Option<&'a CombatEvent<'static>>,
}

/// A stateful processor fed every event in stream order.
///
/// Plugins with priority >= 0 run in ascending priority (registration order
/// breaks ties). Negative priorities are reserved for built-ins the manager
/// drives directly; such plugins never appear in the ordered dispatch.
pub trait Plugin: Send {
    fn name(&self) -> &str;

    fn priority(&self) -> i32 {
        0
    }

    /// Observe (and possibly annotate) one event.
    fn ingest(&mut self, ctx: &PluginContext<'_>, event: &mut CombatEvent<'_>);

    /// Clear all state. Called on every AreaEntered.
    fn reset(&mut self);
}
