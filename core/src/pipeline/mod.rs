//! The pipeline manager: parser → time reconstructor → state machine →
//! entity registry → ordered plugins.
//!
//! Stages run strictly in that order for every event; none may re-order the
//! stream. One pipeline per log stream, no interior threading; consumers
//! that want parallelism run independent pipelines.

pub mod abi;
mod error;
mod meter;
mod plugin;
mod stats;

#[cfg(test)]
mod tests;

pub use error::PipelineError;
pub use meter::DamageMeter;
pub use plugin::{Plugin, PluginContext};
pub use stats::{
    AbilityRow, BurstWindow, DamageSummary, EncounterStats, HealingSummary, SourceRow,
    StatsSummary, TakenSummary, ThreatSummary, UptimeRow,
};

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use tracing::{debug, error};

use crate::combat_log::{CombatEvent, LineParser};
use crate::timekeeping::{ClockSource, ReconstructorStats, SystemClock, TimeReconstructor};
use crate::tracking::{CombatSignal, CombatStateMachine, EntityRegistry};

/// Per-stream ingestion counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PipelineStats {
    pub lines_processed: u64,
    pub malformed_lines: u64,
}

struct RegisteredPlugin {
    id: u16,
    enabled: bool,
    plugin: Box<dyn Plugin>,
}

/// Owns every stage and drives them per event.
pub struct Pipeline {
    parser: LineParser,
    clock: Arc<dyn ClockSource>,
    reconstructor: TimeReconstructor,
    state: CombatStateMachine,
    registry: EntityRegistry,
    plugins: Vec<RegisteredPlugin>,
    next_plugin_id: u16,
    last_event: Option<CombatEvent<'static>>,
    last_area_entered: Option<CombatEvent<'static>>,
    last_enter_combat: Option<CombatEvent<'static>>,
    stats: PipelineStats,
}

impl Pipeline {
    /// Pipeline on the plain host clock.
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock::new()))
    }

    pub fn with_clock(clock: Arc<dyn ClockSource>) -> Self {
        Self {
            parser: LineParser::new(),
            reconstructor: TimeReconstructor::new(Arc::clone(&clock)),
            clock,
            state: CombatStateMachine::new(),
            registry: EntityRegistry::new(),
            plugins: Vec::new(),
            next_plugin_id: 0,
            last_event: None,
            last_area_entered: None,
            last_enter_combat: None,
            stats: PipelineStats::default(),
        }
    }

    /// Register a plugin and return its id (a monotone counter from 1).
    /// Plugins are kept stably sorted by priority.
    pub fn register_plugin(&mut self, plugin: Box<dyn Plugin>) -> u16 {
        self.next_plugin_id += 1;
        let id = self.next_plugin_id;
        self.plugins.push(RegisteredPlugin {
            id,
            enabled: true,
            plugin,
        });
        self.plugins.sort_by_key(|p| p.plugin.priority());
        id
    }

    /// Parse one raw line and run it through every stage. A malformed line
    /// is dropped, counted, and returned as the error.
    pub fn process_line(&mut self, line: &str) -> Result<(), PipelineError> {
        self.stats.lines_processed += 1;
        match self.parser.parse_line(line) {
            Ok(mut event) => {
                self.process_event(&mut event);
                Ok(())
            }
            Err(err) => {
                self.stats.malformed_lines += 1;
                let err = PipelineError::MalformedLine(err);
                debug!(%err, "dropped line");
                Err(err)
            }
        }
    }

    /// Run an already-parsed event through every stage.
    pub fn process_event(&mut self, event: &mut CombatEvent<'_>) {
        self.reconstructor.process(event);

        let signals = self.state.process(event);
        if signals
            .iter()
            .any(|s| matches!(s, CombatSignal::CombatStarted { .. }))
        {
            self.registry.new_combat_reset();
        }
        self.registry.ingest(event);

        if event.is_area_entered() {
            for entry in &mut self.plugins {
                entry.plugin.reset();
            }
        }

        let ctx = PluginContext {
            clock: self.clock.as_ref(),
            state: &self.state,
            registry: &self.registry,
            last_event: self.last_event.as_ref(),
            last_area_entered: self.last_area_entered.as_ref(),
            last_enter_combat: self.last_enter_combat.as_ref(),
        };
        for entry in &mut self.plugins {
            if !entry.enabled || entry.plugin.priority() < 0 {
                continue;
            }
            let outcome = catch_unwind(AssertUnwindSafe(|| entry.plugin.ingest(&ctx, event)));
            if let Err(payload) = outcome {
                let message = payload
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| payload.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "non-string panic payload".to_string());
                entry.enabled = false;
                error!(
                    plugin_id = entry.id,
                    plugin = entry.plugin.name(),
                    panic = %message,
                    "plugin panicked; disabled"
                );
            }
        }
        drop(ctx);

        self.last_event = Some(event.deep_clone());
        if event.is_area_entered() {
            self.last_area_entered = Some(event.deep_clone());
        }
        if event.is_enter_combat() {
            self.last_enter_combat = Some(event.deep_clone());
        }
    }

    /// Reset every registered plugin (not the built-in stages).
    pub fn reset_all_plugins(&mut self) {
        for entry in &mut self.plugins {
            entry.plugin.reset();
        }
    }

    pub fn is_in_combat(&self) -> bool {
        self.state.is_in_combat()
    }

    pub fn clock(&self) -> &dyn ClockSource {
        self.clock.as_ref()
    }

    pub fn state(&self) -> &CombatStateMachine {
        &self.state
    }

    pub fn registry(&self) -> &EntityRegistry {
        &self.registry
    }

    pub fn stats(&self) -> PipelineStats {
        self.stats
    }

    pub fn reconstructor_stats(&self) -> ReconstructorStats {
        self.reconstructor.stats()
    }

    pub fn last_event(&self) -> Option<&CombatEvent<'static>> {
        self.last_event.as_ref()
    }

    pub fn last_area_entered(&self) -> Option<&CombatEvent<'static>> {
        self.last_area_entered.as_ref()
    }

    pub fn last_enter_combat(&self) -> Option<&CombatEvent<'static>> {
        self.last_enter_combat.as_ref()
    }

    pub fn plugin_count(&self) -> usize {
        self.plugins.len()
    }

    /// Id of the plugin with this name, if registered.
    pub fn plugin_id_by_name(&self, name: &str) -> Option<u16> {
        self.plugins
            .iter()
            .find(|p| p.plugin.name() == name)
            .map(|p| p.id)
    }

    /// `(name, priority, enabled)` for a plugin id.
    pub fn plugin_info(&self, id: u16) -> Option<(&str, i32, bool)> {
        self.plugins
            .iter()
            .find(|p| p.id == id)
            .map(|p| (p.plugin.name(), p.plugin.priority(), p.enabled))
    }

    pub fn set_plugin_enabled(&mut self, id: u16, enabled: bool) -> bool {
        match self.plugins.iter_mut().find(|p| p.id == id) {
            Some(entry) => {
                entry.enabled = enabled;
                true
            }
            None => false,
        }
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new()
    }
}
