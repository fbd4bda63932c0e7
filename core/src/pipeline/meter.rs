//! Built-in damage accumulator, the reference consumer of the plugin API.

use std::sync::{Arc, Mutex};

use hashbrown::HashMap;

use crate::combat_log::CombatEvent;

use super::plugin::{Plugin, PluginContext};

#[derive(Debug, Default)]
struct MeterState {
    totals: HashMap<u64, i64>,
    total_damage: i64,
    events_seen: u64,
}

/// Per-source damage totals. Clones share state, so a handle kept outside
/// the pipeline keeps reading after the meter is registered.
#[derive(Debug, Clone, Default)]
pub struct DamageMeter {
    state: Arc<Mutex<MeterState>>,
}

impl DamageMeter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn total_damage(&self) -> i64 {
        self.lock().total_damage
    }

    pub fn damage_for(&self, entity_id: u64) -> i64 {
        self.lock().totals.get(&entity_id).copied().unwrap_or(0)
    }

    /// `(entity id, total damage)` rows, highest first.
    pub fn rows(&self) -> Vec<(u64, i64)> {
        let state = self.lock();
        let mut rows: Vec<(u64, i64)> = state.totals.iter().map(|(&id, &d)| (id, d)).collect();
        rows.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
        rows
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MeterState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Plugin for DamageMeter {
    fn name(&self) -> &str {
        "damage meter"
    }

    fn ingest(&mut self, _ctx: &PluginContext<'_>, event: &mut CombatEvent<'_>) {
        let mut state = self.lock();
        state.events_seen += 1;
        if !event.is_damage() {
            return;
        }
        let amount = event.tail.amount();
        *state.totals.entry(event.source.id()).or_insert(0) += amount;
        state.total_damage += amount;
    }

    fn reset(&mut self) {
        let mut state = self.lock();
        state.totals.clear();
        state.total_damage = 0;
        state.events_seen = 0;
    }
}
