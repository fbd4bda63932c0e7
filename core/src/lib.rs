pub mod combat_log;
pub mod context;
pub mod game_data;
pub mod pipeline;
pub mod timekeeping;
pub mod tracking;

// Re-exports for convenience
pub use combat_log::{
    from_json, to_json, CombatEvent, Entity, EntityKind, LineParser, MitigationFlags, NamedId,
    ParseError, Trailing, TrailingKind,
};
pub use pipeline::{
    DamageMeter, EncounterStats, Pipeline, PipelineError, PipelineStats, Plugin, PluginContext,
    StatsSummary,
};
pub use timekeeping::{
    ClockSource, NtpTimeKeeper, ReconstructorStats, SystemClock, TimeReconstructor,
};
pub use tracking::{CombatPhase, CombatSignal, CombatStateMachine, EntityRegistry, EntityState};
