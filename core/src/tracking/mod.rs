mod combat_state;
mod registry;

pub use combat_state::{
    CombatPhase, CombatSignal, CombatStateMachine, REVIVE_MERGE_WINDOW_MS,
};
pub use registry::{AppliedEffect, EntityRegistry, EntityState, EntityTotals};
