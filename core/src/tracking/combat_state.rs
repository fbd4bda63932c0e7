//! Encounter lifecycle: in-combat windows, deaths, revives, area changes.
//!
//! The subtle part is "is this still the same fight?". When the owner dies
//! and is revived, the machine enters a monitoring state; the next owner
//! action inside [`REVIVE_MERGE_WINDOW_MS`] resumes the same encounter,
//! anything later starts a fresh one.

use hashbrown::HashSet;

use crate::combat_log::{AreaPayload, CombatEvent, Entity};


/// An owner action within this window of the revive continues the encounter.
pub const REVIVE_MERGE_WINDOW_MS: i64 = 15_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CombatPhase {
    #[default]
    Idle,
    InCombat,
    /// Transient post-revive state; resolved by the next owner action.
    InCombatMonitoring,
}

/// Transition notifications, consumed by the pipeline manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CombatSignal {
    CombatStarted { epoch_ms: i64 },
    CombatEnded { epoch_ms: i64 },
    AreaChanged { epoch_ms: i64 },
}

/// Tracks the combat window and who is standing in it.
#[derive(Debug, Default)]
pub struct CombatStateMachine {
    in_combat: bool,
    monitoring: bool,
    owner: Option<Entity<'static>>,
    owner_dead: bool,
    died_in_combat: bool,
    all_players_dead: bool,
    last_entered_epoch: i64,
    last_exit_epoch: i64,
    last_died_epoch: i64,
    revive_anchor_epoch: i64,
    last_event_epoch: i64,
    dead_players: HashSet<u64>,
    fighting_players: HashSet<u64>,
    last_area: Option<AreaPayload<'static>>,
}

impl CombatStateMachine {
    pub fn new() -> Self {
        Self {
            last_entered_epoch: -1,
            last_exit_epoch: -1,
            last_died_epoch: -1,
            revive_anchor_epoch: -1,
            last_event_epoch: -1,
            ..Self::default()
        }
    }

    pub fn is_in_combat(&self) -> bool {
        self.in_combat
    }

    pub fn phase(&self) -> CombatPhase {
        if self.monitoring {
            CombatPhase::InCombatMonitoring
        } else if self.in_combat {
            CombatPhase::InCombat
        } else {
            CombatPhase::Idle
        }
    }

    /// The logging player: source of the most recent AreaEntered.
    pub fn owner(&self) -> Option<&Entity<'static>> {
        self.owner.as_ref()
    }

    pub fn owner_dead(&self) -> bool {
        self.owner_dead
    }

    pub fn last_area(&self) -> Option<&AreaPayload<'static>> {
        self.last_area.as_ref()
    }

    pub fn last_entered_epoch_ms(&self) -> i64 {
        self.last_entered_epoch
    }

    pub fn last_exit_epoch_ms(&self) -> i64 {
        self.last_exit_epoch
    }

    pub fn last_died_epoch_ms(&self) -> i64 {
        self.last_died_epoch
    }

    pub fn fighting_player_count(&self) -> usize {
        self.fighting_players.len()
    }

    pub fn dead_player_count(&self) -> usize {
        self.dead_players.len()
    }

    /// Duration of the running encounter, or of the last one when idle.
    pub fn combat_duration_ms(&self) -> i64 {
        if self.last_entered_epoch < 0 {
            return 0;
        }
        if self.in_combat {
            (self.last_event_epoch - self.last_entered_epoch).max(0)
        } else {
            (self.last_exit_epoch - self.last_entered_epoch).max(0)
        }
    }

    /// Advance the machine by one event.
    pub fn process(&mut self, event: &CombatEvent<'_>) -> Vec<CombatSignal> {
        let epoch = event.time.epoch_ms;
        self.last_event_epoch = epoch;

        if event.is_enter_combat() {
            self.on_enter_combat(event, epoch)
        } else if event.is_area_entered() {
            self.on_area_entered(event, epoch)
        } else if event.is_revived() {
            self.on_revive(event, epoch)
        } else if event.is_death() {
            self.on_death(event, epoch)
        } else if event.is_damage() {
            self.on_damage(event, epoch)
        } else if event.is_discipline_changed() {
            self.on_discipline_changed(event);
            Vec::new()
        } else if event.is_exit_combat() {
            self.on_exit_combat(epoch)
        } else {
            Vec::new()
        }
    }

    fn on_enter_combat(&mut self, event: &CombatEvent<'_>, epoch: i64) -> Vec<CombatSignal> {
        if self.monitoring && self.is_owner(&event.source) {
            if epoch - self.revive_anchor_epoch < REVIVE_MERGE_WINDOW_MS {
                // same encounter continues
                self.monitoring = false;
                self.died_in_combat = false;
                self.in_combat = true;
                return Vec::new();
            }
            return self.begin_encounter(epoch);
        }
        if !self.in_combat {
            return self.begin_encounter(epoch);
        }
        Vec::new()
    }

    fn on_damage(&mut self, event: &CombatEvent<'_>, epoch: i64) -> Vec<CombatSignal> {
        if self.monitoring && self.is_owner(&event.source) {
            if epoch - self.revive_anchor_epoch < REVIVE_MERGE_WINDOW_MS {
                self.monitoring = false;
                self.died_in_combat = false;
                self.in_combat = true;
                return Vec::new();
            }
            // past the merge window: the owner is fighting something new, so
            // start the encounter rather than leaving the machine stateless
            return self.begin_encounter(epoch);
        }
        Vec::new()
    }

    fn on_death(&mut self, event: &CombatEvent<'_>, epoch: i64) -> Vec<CombatSignal> {
        if self.is_owner(&event.target) {
            self.owner_dead = true;
            self.died_in_combat = true;
            self.last_died_epoch = epoch;
        }
        if event.target.is_player() {
            self.dead_players.insert(event.target.id());
        }
        if self.in_combat && self.compute_all_players_dead() {
            self.all_players_dead = true;
            self.in_combat = false;
            self.monitoring = false;
            self.last_exit_epoch = epoch;
            return vec![CombatSignal::CombatEnded { epoch_ms: epoch }];
        }
        Vec::new()
    }

    fn on_revive(&mut self, event: &CombatEvent<'_>, epoch: i64) -> Vec<CombatSignal> {
        if self.is_owner(&event.source) {
            self.owner_dead = false;
            self.monitoring = true;
            self.revive_anchor_epoch = epoch;
            if self.all_players_dead {
                self.in_combat = false;
            }
            self.all_players_dead = false;
        }
        self.dead_players.remove(&event.source.id());
        self.all_players_dead = self.compute_all_players_dead();
        Vec::new()
    }

    fn on_discipline_changed(&mut self, event: &CombatEvent<'_>) {
        if self.in_combat && event.source.id() != 0 {
            self.fighting_players.insert(event.source.id());
        }
    }

    fn on_exit_combat(&mut self, epoch: i64) -> Vec<CombatSignal> {
        let was_fighting = self.in_combat;
        self.combat_reset();
        self.last_exit_epoch = epoch;
        if was_fighting {
            vec![CombatSignal::CombatEnded { epoch_ms: epoch }]
        } else {
            Vec::new()
        }
    }

    fn on_area_entered(&mut self, event: &CombatEvent<'_>, epoch: i64) -> Vec<CombatSignal> {
        let mut signals = Vec::new();
        if self.in_combat {
            self.last_exit_epoch = epoch;
            signals.push(CombatSignal::CombatEnded { epoch_ms: epoch });
        }
        self.combat_reset();
        self.dead_players.clear();
        self.owner = Some(event.source.deep_clone());
        self.owner_dead = false;
        self.last_entered_epoch = -1;
        self.last_died_epoch = -1;
        self.last_area = event.area.as_ref().map(|a| a.deep_clone());
        signals.push(CombatSignal::AreaChanged { epoch_ms: epoch });
        signals
    }

    fn begin_encounter(&mut self, epoch: i64) -> Vec<CombatSignal> {
        self.combat_reset();
        self.in_combat = true;
        self.last_entered_epoch = epoch;
        self.last_exit_epoch = epoch;
        vec![CombatSignal::CombatStarted { epoch_ms: epoch }]
    }

    /// Clears combat-scoped state. `dead_players` survives until the next
    /// area change; revives prune it in the meantime.
    fn combat_reset(&mut self) {
        self.in_combat = false;
        self.monitoring = false;
        self.died_in_combat = false;
        self.all_players_dead = false;
        self.fighting_players.clear();
    }

    /// With a group, everyone known to be fighting must be down; solo, the
    /// owner's death is the wipe.
    fn compute_all_players_dead(&self) -> bool {
        if self.fighting_players.len() > 1 {
            self.dead_players.len() >= self.fighting_players.len()
        } else {
            self.owner_dead
        }
    }

    fn is_owner(&self, entity: &Entity<'_>) -> bool {
        let id = entity.id();
        id != 0 && self.owner.as_ref().map(|o| o.id()) == Some(id)
    }
}
