//! Per-entity bookkeeping: running tallies, applied effects, the owner.
//!
//! The registry materializes an [`EntityState`] for every identity it sees
//! and keeps it for the duration of the area. Entering new combat zeroes
//! players and companions and evicts everything else; an area change clears
//! the board entirely.

use hashbrown::HashMap;

use crate::combat_log::{CombatEvent, Entity, MitigationFlags, TrailingKind};


/// Running tallies for one entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EntityTotals {
    pub damage_done: i64,
    pub damage_taken: i64,
    pub healing_done: i64,
    pub healing_taken: i64,
    pub overheal: i64,
    pub absorb: i64,
    pub threat: i64,
    pub shielded: u32,
    pub deflect: u32,
    pub dodge: u32,
    pub glance: u32,
    pub parry: u32,
    pub resist: u32,
    pub miss: u32,
    pub immune: u32,
}

/// One buff/debuff application. The target's `applied_effects` and the
/// source's `applied_by` carry independent records for the same logical
/// effect, identified by `(action_id, source_id, target_id)`.
#[derive(Debug, Clone)]
pub struct AppliedEffect {
    pub action_id: u64,
    pub source_id: u64,
    pub target_id: u64,
    pub ability_id: u64,
    pub charges: i32,
    pub applied_epoch_ms: i64,
    pub origin: CombatEvent<'static>,
}

impl AppliedEffect {
    fn from_event(event: &CombatEvent<'_>) -> Self {
        Self {
            action_id: event.event.action_id,
            source_id: event.source.id(),
            target_id: event.target.id(),
            ability_id: event.ability.id,
            charges: event.tail.charges().unwrap_or(0),
            applied_epoch_ms: event.time.epoch_ms,
            origin: event.deep_clone(),
        }
    }

    pub fn matches(&self, event: &CombatEvent<'_>) -> bool {
        self.action_id == event.event.action_id
            && self.source_id == event.source.id()
            && self.target_id == event.target.id()
    }

    fn update(&mut self, event: &CombatEvent<'_>) {
        self.ability_id = event.ability.id;
        self.charges = event.tail.charges().unwrap_or(self.charges);
        self.applied_epoch_ms = event.time.epoch_ms;
        self.origin = event.deep_clone();
    }
}

/// Everything the registry knows about one entity.
#[derive(Debug, Clone)]
pub struct EntityState {
    pub id: u64,
    pub entity: Entity<'static>,
    pub is_owner: bool,
    pub is_dead: bool,
    pub death_count: u32,
    pub revive_count: u32,
    pub totals: EntityTotals,
    /// Id of the entity currently targeted, from TargetSet/TargetCleared.
    pub current_target: Option<u64>,
    /// Effects applied to this entity.
    pub applied_effects: Vec<AppliedEffect>,
    /// Effects this entity has applied to others.
    pub applied_by: Vec<AppliedEffect>,
}

impl EntityState {
    fn new(entity: &Entity<'_>) -> Self {
        Self {
            id: entity.id(),
            entity: entity.deep_clone(),
            is_owner: false,
            is_dead: false,
            death_count: 0,
            revive_count: 0,
            totals: EntityTotals::default(),
            current_target: None,
            applied_effects: Vec::new(),
            applied_by: Vec::new(),
        }
    }

    pub fn hitpoints_percent(&self) -> f32 {
        if self.entity.health.max > 0 {
            (self.entity.health.current as f32 / self.entity.health.max as f32) * 100.0
        } else {
            0.0
        }
    }
}

/// Dense entity list plus an id index.
#[derive(Debug, Default)]
pub struct EntityRegistry {
    entities: Vec<EntityState>,
    index: HashMap<u64, usize>,
}

impl EntityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn entities(&self) -> &[EntityState] {
        &self.entities
    }

    pub fn get(&self, id: u64) -> Option<&EntityState> {
        self.index.get(&id).map(|&slot| &self.entities[slot])
    }

    /// The entity flagged by the most recent AreaEntered.
    pub fn owner(&self) -> Option<&EntityState> {
        self.entities.iter().find(|e| e.is_owner)
    }

    pub fn reset(&mut self) {
        self.entities.clear();
        self.index.clear();
    }

    /// Entering new combat: players and companions keep their slot with
    /// zeroed counters, every other entity is evicted.
    pub fn new_combat_reset(&mut self) {
        self.entities
            .retain(|e| e.entity.is_player() || e.entity.is_companion());
        for state in &mut self.entities {
            state.totals = EntityTotals::default();
            state.current_target = None;
            state.death_count = 0;
            state.revive_count = 0;
        }
        self.rebuild_index();
    }

    /// Fold one event into the registry.
    pub fn ingest(&mut self, event: &CombatEvent<'_>) {
        if event.is_area_entered() {
            self.reset();
        }

        let src = self.slot_for(&event.source);
        let tgt = if event.target.is_empty() {
            None
        } else if event.target.id() == event.source.id() {
            Some(src)
        } else {
            Some(self.slot_for(&event.target))
        };

        // refresh snapshots (position, health) from the line
        self.entities[src].entity = event.source.deep_clone();
        if let Some(t) = tgt {
            if t != src {
                self.entities[t].entity = event.target.deep_clone();
            }
        }

        if event.is_area_entered() {
            self.entities[src].is_owner = true;
        }

        if event.is_death() {
            if let Some(t) = tgt {
                self.entities[t].is_dead = true;
                self.entities[t].death_count += 1;
            }
        }
        if event.is_revived() {
            self.entities[src].is_dead = false;
            self.entities[src].revive_count += 1;
        }

        let amount = event.tail.amount();
        if event.is_damage() {
            self.entities[src].totals.damage_done += amount;
            if let Some(t) = tgt {
                self.entities[t].totals.damage_taken += amount;
            }
        }
        if event.is_heal() {
            self.entities[src].totals.healing_done += amount;
            if let Some(v) = event.tail.value() {
                self.entities[src].totals.overheal += v.secondary.unwrap_or(0);
            }
            if let Some(t) = tgt {
                self.entities[t].totals.healing_taken += amount;
            }
        }
        if let Some(threat) = event.tail.threat {
            self.entities[src].totals.threat += threat.round() as i64;
        }

        if let TrailingKind::Numeric(value) = &event.tail.kind {
            if !value.mitigation.is_empty() {
                let totals = &mut self.entities[src].totals;
                let m = value.mitigation;
                if m.contains(MitigationFlags::SHIELD) {
                    totals.shielded += 1;
                    totals.absorb += value.shield.map(|s| s.absorbed).unwrap_or(0);
                }
                if m.contains(MitigationFlags::DEFLECT) {
                    totals.deflect += 1;
                }
                if m.contains(MitigationFlags::DODGE) {
                    totals.dodge += 1;
                }
                if m.contains(MitigationFlags::GLANCE) {
                    totals.glance += 1;
                }
                if m.contains(MitigationFlags::PARRY) {
                    totals.parry += 1;
                }
                if m.contains(MitigationFlags::RESIST) {
                    totals.resist += 1;
                }
                if m.contains(MitigationFlags::MISS) {
                    totals.miss += 1;
                }
                if m.contains(MitigationFlags::IMMUNE) {
                    totals.immune += 1;
                }
            }
        }

        if event.is_target_set() {
            if tgt.is_some() {
                self.entities[src].current_target = Some(event.target.id());
            }
        } else if event.is_target_cleared() {
            self.entities[src].current_target = None;
        }

        // effect bookkeeping; damage and heal ApplyEffects are transient
        let effect_like = !event.is_damage() && !event.is_heal();
        if effect_like && tgt.is_some() {
            if event.is_apply_effect() {
                let t = tgt.unwrap_or(src);
                upsert_effect(&mut self.entities[t].applied_effects, event);
                upsert_effect(&mut self.entities[src].applied_by, event);
            } else if event.is_remove_effect() {
                let t = tgt.unwrap_or(src);
                self.entities[t].applied_effects.retain(|e| !e.matches(event));
                self.entities[src].applied_by.retain(|e| !e.matches(event));
            } else if event.is_modify_charges() {
                let t = tgt.unwrap_or(src);
                update_charges(&mut self.entities[t].applied_effects, event);
                update_charges(&mut self.entities[src].applied_by, event);
            }
        }
    }

    fn slot_for(&mut self, entity: &Entity<'_>) -> usize {
        let id = entity.id();
        if let Some(&slot) = self.index.get(&id) {
            return slot;
        }
        let slot = self.entities.len();
        self.entities.push(EntityState::new(entity));
        self.index.insert(id, slot);
        slot
    }

    fn rebuild_index(&mut self) {
        self.index.clear();
        for (slot, state) in self.entities.iter().enumerate() {
            self.index.insert(state.id, slot);
        }
    }
}

fn upsert_effect(effects: &mut Vec<AppliedEffect>, event: &CombatEvent<'_>) {
    if let Some(existing) = effects.iter_mut().find(|e| e.matches(event)) {
        existing.update(event);
    } else {
        effects.push(AppliedEffect::from_event(event));
    }
}

fn update_charges(effects: &mut [AppliedEffect], event: &CombatEvent<'_>) {
    for effect in effects.iter_mut().filter(|e| e.matches(event)) {
        effect.charges = event.tail.charges().unwrap_or(effect.charges);
    }
}
