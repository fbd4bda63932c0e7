//! Per-player encounter statistics: output, intake, threat, action economy,
//! ability breakdowns, effect uptimes, and burst windows.
//!
//! Tracks one entity. Without an explicit [`EncounterStats::set_tracked_entity`]
//! call, the plugin adopts the owner as soon as the state machine knows one.

use std::sync::{Arc, Mutex};

use hashbrown::HashMap;
use serde::Serialize;

use crate::combat_log::{CombatEvent, MitigationFlags, TrailingKind};
use crate::game_data::action_id;

use super::plugin::{Plugin, PluginContext};

/// A damage or healing ability's share of the tracked entity's output.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct AbilityRow {
    pub name: String,
    pub id: u64,
    pub total: i64,
    pub hits: u32,
    pub avg: f64,
    pub crit_rate: f64,
    pub share: f64,
}

/// Damage taken from (or healing received from) one source entity.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SourceRow {
    pub name: String,
    pub id: u64,
    pub total: i64,
    pub share: f64,
}

/// Uptime of one effect on the tracked entity.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct UptimeRow {
    pub name: String,
    pub id: u64,
    pub uptime: f64,
    pub max_stacks: i32,
}

/// Peak rate over a sliding window.
#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
pub struct BurstWindow {
    pub window_ms: u32,
    pub peak_rate: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Default, PartialEq)]
pub struct DamageSummary {
    pub total: i64,
    pub dps: f64,
    pub largest_hit: i64,
    pub crit_rate: f64,
    pub shielded_rate: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Default, PartialEq)]
pub struct HealingSummary {
    pub total: i64,
    pub effective: i64,
    pub overheal: i64,
    pub hps: f64,
    pub largest_heal: i64,
    pub crit_rate: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Default, PartialEq)]
pub struct TakenSummary {
    pub total: i64,
    pub dtps: f64,
    pub deaths: u32,
    pub defended: u32,
    pub shielded: u32,
    pub resisted: u32,
    pub missed: u32,
    pub immune: u32,
}

#[derive(Debug, Clone, Copy, Serialize, Default, PartialEq)]
pub struct ThreatSummary {
    pub available: bool,
    pub total: i64,
    pub tps: f64,
    pub taunts: u32,
}

/// Everything at once, ready for a report or the compact JSON export.
#[derive(Debug, Clone, Copy, Serialize, Default, PartialEq)]
pub struct StatsSummary {
    pub tracked_id: u64,
    pub duration_ms: i64,
    pub actions: u32,
    pub apm: f64,
    pub damage: DamageSummary,
    pub healing: HealingSummary,
    pub taken: TakenSummary,
    pub threat: ThreatSummary,
}

#[derive(Debug, Clone, Default)]
struct Tally {
    name: String,
    total: i64,
    hits: u32,
    crits: u32,
    largest: i64,
}

#[derive(Debug, Clone, Default)]
struct UptimeState {
    name: String,
    active_since: Option<i64>,
    total_active_ms: i64,
    current_stacks: i32,
    max_stacks: i32,
}

#[derive(Debug, Default)]
struct StatsState {
    tracked_id: Option<u64>,
    tracked_explicitly: bool,
    duration_ms: i64,
    last_epoch_ms: i64,

    actions: u32,

    dmg_total: i64,
    dmg_hits: u32,
    dmg_crits: u32,
    dmg_largest: i64,
    dmg_shielded: u32,
    dmg_by_ability: HashMap<u64, Tally>,
    dmg_series: Vec<(i64, i64)>,

    heal_total: i64,
    heal_overheal: i64,
    heal_hits: u32,
    heal_crits: u32,
    heal_largest: i64,
    heal_by_ability: HashMap<u64, Tally>,
    heal_series: Vec<(i64, i64)>,

    taken_total: i64,
    deaths: u32,
    defended: u32,
    shielded: u32,
    resisted: u32,
    missed: u32,
    immune: u32,
    taken_by_ability: HashMap<u64, Tally>,
    taken_by_source: HashMap<u64, Tally>,
    heal_received_by_source: HashMap<u64, Tally>,

    threat_available: bool,
    threat_total: i64,
    taunts: u32,

    effect_uptimes: HashMap<u64, UptimeState>,
}

fn safe_div(num: f64, den: f64) -> f64 {
    if den > 0.0 {
        num / den
    } else {
        0.0
    }
}

fn per_second(total: i64, duration_ms: i64) -> f64 {
    safe_div(total as f64, duration_ms as f64 / 1000.0)
}

/// Statistics keeper plugin. Clones share state, like [`super::DamageMeter`].
#[derive(Debug, Clone, Default)]
pub struct EncounterStats {
    state: Arc<Mutex<StatsState>>,
}

impl EncounterStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Choose which entity to track. Overrides the owner auto-adoption.
    pub fn set_tracked_entity(&self, id: u64) {
        let mut s = self.lock();
        s.tracked_id = Some(id);
        s.tracked_explicitly = true;
    }

    pub fn tracked_entity(&self) -> Option<u64> {
        self.lock().tracked_id
    }

    pub fn summary(&self) -> StatsSummary {
        let s = self.lock();
        let duration_ms = s.duration_ms;
        StatsSummary {
            tracked_id: s.tracked_id.unwrap_or(0),
            duration_ms,
            actions: s.actions,
            apm: safe_div(s.actions as f64, duration_ms as f64 / 60_000.0),
            damage: DamageSummary {
                total: s.dmg_total,
                dps: per_second(s.dmg_total, duration_ms),
                largest_hit: s.dmg_largest,
                crit_rate: safe_div(s.dmg_crits as f64, s.dmg_hits as f64),
                shielded_rate: safe_div(s.dmg_shielded as f64, s.dmg_hits as f64),
            },
            healing: HealingSummary {
                total: s.heal_total,
                effective: s.heal_total - s.heal_overheal,
                overheal: s.heal_overheal,
                hps: per_second(s.heal_total, duration_ms),
                largest_heal: s.heal_largest,
                crit_rate: safe_div(s.heal_crits as f64, s.heal_hits as f64),
            },
            taken: TakenSummary {
                total: s.taken_total,
                dtps: per_second(s.taken_total, duration_ms),
                deaths: s.deaths,
                defended: s.defended,
                shielded: s.shielded,
                resisted: s.resisted,
                missed: s.missed,
                immune: s.immune,
            },
            threat: ThreatSummary {
                available: s.threat_available,
                total: s.threat_total,
                tps: per_second(s.threat_total, duration_ms),
                taunts: s.taunts,
            },
        }
    }

    /// Compact JSON form of [`EncounterStats::summary`].
    pub fn summary_json(&self) -> String {
        serde_json::to_string(&self.summary()).expect("summary always serializes")
    }

    pub fn top_damage_abilities(&self, n: usize) -> Vec<AbilityRow> {
        let s = self.lock();
        ability_rows(&s.dmg_by_ability, s.dmg_total, n)
    }

    pub fn top_healing_abilities(&self, n: usize) -> Vec<AbilityRow> {
        let s = self.lock();
        ability_rows(&s.heal_by_ability, s.heal_total, n)
    }

    pub fn top_damage_taken_by_ability(&self, n: usize) -> Vec<AbilityRow> {
        let s = self.lock();
        ability_rows(&s.taken_by_ability, s.taken_total, n)
    }

    pub fn top_damage_taken_by_source(&self, n: usize) -> Vec<SourceRow> {
        let s = self.lock();
        source_rows(&s.taken_by_source, s.taken_total, n)
    }

    pub fn top_healing_received_by_source(&self, n: usize) -> Vec<SourceRow> {
        let s = self.lock();
        let total: i64 = s.heal_received_by_source.values().map(|t| t.total).sum();
        source_rows(&s.heal_received_by_source, total, n)
    }

    /// Effect uptimes on the tracked entity, longest first. Still-active
    /// windows are measured up to the last seen event.
    pub fn effect_uptimes(&self) -> Vec<UptimeRow> {
        let s = self.lock();
        if s.duration_ms <= 0 {
            return Vec::new();
        }
        let mut rows: Vec<UptimeRow> = s
            .effect_uptimes
            .iter()
            .map(|(&id, u)| {
                let mut active = u.total_active_ms;
                if let Some(since) = u.active_since {
                    active += (s.last_epoch_ms - since).max(0);
                }
                UptimeRow {
                    name: u.name.clone(),
                    id,
                    uptime: safe_div(active as f64, s.duration_ms as f64).min(1.0),
                    max_stacks: u.max_stacks,
                }
            })
            .collect();
        rows.sort_by(|a, b| b.uptime.total_cmp(&a.uptime));
        rows
    }

    pub fn peak_dps_window(&self, window_ms: u32) -> Option<BurstWindow> {
        peak_window(&self.lock().dmg_series, window_ms)
    }

    pub fn peak_hps_window(&self, window_ms: u32) -> Option<BurstWindow> {
        peak_window(&self.lock().heal_series, window_ms)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, StatsState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

fn ability_rows(map: &HashMap<u64, Tally>, total: i64, n: usize) -> Vec<AbilityRow> {
    let mut rows: Vec<AbilityRow> = map
        .iter()
        .map(|(&id, t)| AbilityRow {
            name: t.name.clone(),
            id,
            total: t.total,
            hits: t.hits,
            avg: safe_div(t.total as f64, t.hits as f64),
            crit_rate: safe_div(t.crits as f64, t.hits as f64),
            share: safe_div(t.total as f64, total as f64),
        })
        .collect();
    rows.sort_by(|a, b| b.total.cmp(&a.total).then(a.id.cmp(&b.id)));
    rows.truncate(n);
    rows
}

fn source_rows(map: &HashMap<u64, Tally>, total: i64, n: usize) -> Vec<SourceRow> {
    let mut rows: Vec<SourceRow> = map
        .iter()
        .map(|(&id, t)| SourceRow {
            name: t.name.clone(),
            id,
            total: t.total,
            share: safe_div(t.total as f64, total as f64),
        })
        .collect();
    rows.sort_by(|a, b| b.total.cmp(&a.total).then(a.id.cmp(&b.id)));
    rows.truncate(n);
    rows
}

fn peak_window(series: &[(i64, i64)], window_ms: u32) -> Option<BurstWindow> {
    if series.is_empty() || window_ms == 0 {
        return None;
    }
    let window = window_ms as i64;
    let mut best: i64 = 0;
    let mut sum: i64 = 0;
    let mut j = 0usize;
    for i in 0..series.len() {
        let end = series[i].0 + window;
        while j < series.len() && series[j].0 <= end {
            sum += series[j].1;
            j += 1;
        }
        best = best.max(sum);
        sum -= series[i].1;
    }
    Some(BurstWindow {
        window_ms,
        peak_rate: best as f64 / (window_ms as f64 / 1000.0),
    })
}

impl StatsState {
    fn tally<'m>(
        map: &'m mut HashMap<u64, Tally>,
        id: u64,
        name: &str,
        amount: i64,
        crit: bool,
    ) -> &'m mut Tally {
        let t = map.entry(id).or_default();
        if t.name.is_empty() {
            t.name = name.to_string();
        }
        t.total += amount;
        t.hits += 1;
        if crit {
            t.crits += 1;
        }
        t.largest = t.largest.max(amount);
        t
    }
}

impl Plugin for EncounterStats {
    fn name(&self) -> &str {
        "encounter stats"
    }

    fn priority(&self) -> i32 {
        10
    }

    fn ingest(&mut self, ctx: &PluginContext<'_>, event: &mut CombatEvent<'_>) {
        let mut s = self.lock();

        // adopt the logging player once the state machine knows them
        if s.tracked_id.is_none() {
            s.tracked_id = ctx.state.owner().map(|o| o.id());
        }
        let Some(tracked) = s.tracked_id else {
            return;
        };

        let epoch = event.time.epoch_ms;
        s.last_epoch_ms = epoch;
        s.duration_ms = ctx.state.combat_duration_ms();

        let from_tracked = event.source.id() == tracked;
        let on_tracked = !event.target.is_empty() && event.target.id() == tracked;

        if from_tracked && event.matches_id(action_id::ABILITY_ACTIVATE) {
            s.actions += 1;
        }

        if let Some(threat) = event.tail.threat {
            if from_tracked {
                s.threat_available = true;
                s.threat_total += threat.round() as i64;
                if event.matches_id(action_id::TAUNT) {
                    s.taunts += 1;
                }
            }
        }

        if event.is_death() && on_tracked {
            s.deaths += 1;
        }

        if let TrailingKind::Numeric(value) = event.tail.kind {
            let amount = value.amount;
            if event.is_damage() {
                if from_tracked {
                    s.dmg_total += amount;
                    s.dmg_hits += 1;
                    if value.crit {
                        s.dmg_crits += 1;
                    }
                    if value.mitigation.contains(MitigationFlags::SHIELD) {
                        s.dmg_shielded += 1;
                    }
                    s.dmg_largest = s.dmg_largest.max(amount);
                    StatsState::tally(
                        &mut s.dmg_by_ability,
                        event.ability.id,
                        event.ability.name,
                        amount,
                        value.crit,
                    );
                    s.dmg_series.push((epoch, amount));
                }
                if on_tracked {
                    s.taken_total += amount;
                    StatsState::tally(
                        &mut s.taken_by_ability,
                        event.ability.id,
                        event.ability.name,
                        amount,
                        value.crit,
                    );
                    StatsState::tally(
                        &mut s.taken_by_source,
                        event.source.id(),
                        event.source.name,
                        amount,
                        value.crit,
                    );
                    let m = value.mitigation;
                    if m.contains(MitigationFlags::DEFLECT)
                        || m.contains(MitigationFlags::PARRY)
                        || m.contains(MitigationFlags::DODGE)
                    {
                        s.defended += 1;
                    }
                    if m.contains(MitigationFlags::SHIELD) {
                        s.shielded += 1;
                    }
                    if m.contains(MitigationFlags::RESIST) {
                        s.resisted += 1;
                    }
                    if m.contains(MitigationFlags::MISS) {
                        s.missed += 1;
                    }
                    if m.contains(MitigationFlags::IMMUNE) {
                        s.immune += 1;
                    }
                }
            } else if event.is_heal() {
                if from_tracked {
                    s.heal_total += amount;
                    s.heal_overheal += value.secondary.unwrap_or(0);
                    s.heal_hits += 1;
                    if value.crit {
                        s.heal_crits += 1;
                    }
                    s.heal_largest = s.heal_largest.max(amount);
                    StatsState::tally(
                        &mut s.heal_by_ability,
                        event.ability.id,
                        event.ability.name,
                        amount,
                        value.crit,
                    );
                    s.heal_series.push((epoch, amount));
                }
                if on_tracked {
                    StatsState::tally(
                        &mut s.heal_received_by_source,
                        event.source.id(),
                        event.source.name,
                        amount,
                        value.crit,
                    );
                }
            }
        }

        // effect uptime windows on the tracked entity
        let effect_like = !event.is_damage() && !event.is_heal();
        if effect_like && on_tracked {
            if event.is_apply_effect() {
                let entry = s.effect_uptimes.entry(event.event.action_id).or_default();
                if entry.name.is_empty() {
                    entry.name = event.event.action_name.to_string();
                }
                if entry.active_since.is_none() {
                    entry.active_since = Some(epoch);
                }
                let stacks = event.tail.charges().unwrap_or(0).max(1);
                entry.current_stacks = stacks;
                entry.max_stacks = entry.max_stacks.max(stacks);
            } else if event.is_remove_effect() {
                if let Some(entry) = s.effect_uptimes.get_mut(&event.event.action_id) {
                    if let Some(since) = entry.active_since.take() {
                        entry.total_active_ms += (epoch - since).max(0);
                    }
                    entry.current_stacks = 0;
                }
            } else if event.is_modify_charges() {
                if let Some(entry) = s.effect_uptimes.get_mut(&event.event.action_id) {
                    if let Some(stacks) = event.tail.charges() {
                        entry.current_stacks = stacks;
                        entry.max_stacks = entry.max_stacks.max(stacks);
                    }
                }
            }
        }
    }

    fn reset(&mut self) {
        let mut s = self.lock();
        let tracked = s.tracked_explicitly.then_some(s.tracked_id).flatten();
        *s = StatsState::default();
        // an explicit tracking choice survives area changes
        if let Some(id) = tracked {
            s.tracked_id = Some(id);
            s.tracked_explicitly = true;
        }
    }
}

#[cfg(test)]
mod tests;
