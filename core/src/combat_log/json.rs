//! Compact JSON codec for combat events.
//!
//! The wire schema is deliberately small: `{t_ms, t_epoch?, src, tgt,
//! ability, event, tail}`. Entity ids are split into two u32 halves so
//! readers backed by double-precision JSON numbers keep every bit.
//! `from_json(to_json(e))` is the identity on every field the schema covers;
//! fields outside it (positions, health, payloads, raw text) import at their
//! defaults.

use serde::{Deserialize, Serialize};

use super::event::{
    CombatEvent, Entity, EntityKind, EventDesc, MitigationFlags, NamedId, PlayerRef, School,
    ShieldDetail, TimeStamp, Trailing, TrailingKind, ValueField,
};
use super::ParseError;
use crate::context::intern_str;

/// Encode an event as compact JSON.
pub fn to_json(event: &CombatEvent<'_>) -> String {
    let wire = WireEvent::from_event(event);
    serde_json::to_string(&wire).expect("wire model always serializes")
}

/// Decode an event from compact JSON. Strings are interned, so the result is
/// free of the input buffer.
pub fn from_json(json: &str) -> Result<CombatEvent<'static>, ParseError> {
    let wire: WireEvent =
        serde_json::from_str(json).map_err(|e| ParseError::Json(e.to_string()))?;
    wire.into_event()
}

fn split_id(id: u64) -> (u32, u32) {
    ((id >> 32) as u32, id as u32)
}

fn join_id(hi: u32, lo: u32) -> u64 {
    ((hi as u64) << 32) | lo as u64
}

fn is_false(b: &bool) -> bool {
    !*b
}

fn is_zero_u16(v: &u16) -> bool {
    *v == 0
}

#[derive(Serialize, Deserialize)]
struct WireEvent {
    t_ms: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    t_epoch: Option<i64>,
    src: WireEntity,
    tgt: WireEntity,
    ability: WireNamedId,
    event: WireEventDesc,
    tail: WireTail,
}

#[derive(Serialize, Deserialize, Default)]
struct WireEntity {
    name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    companion: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    owner: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    owner_id: Option<u64>,
    kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    id_hi: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    id_lo: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    is_player: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    is_companion: Option<bool>,
}

#[derive(Serialize, Deserialize, Default)]
struct WireNamedId {
    name: String,
    #[serde(default)]
    id: u64,
}

#[derive(Serialize, Deserialize, Default)]
struct WireEventDesc {
    type_id: u64,
    type_name: String,
    action_id: u64,
    action_name: String,
}

#[derive(Serialize, Deserialize)]
struct WireTail {
    #[serde(flatten)]
    kind: WireTailKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    threat: Option<f64>,
}

#[derive(Serialize, Deserialize)]
#[serde(tag = "kind")]
enum WireTailKind {
    None,
    Charges {
        count: i32,
    },
    Numeric {
        amount: i64,
        #[serde(default, skip_serializing_if = "is_false")]
        crit: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        secondary: Option<i64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        school: Option<WireSchool>,
        #[serde(default, skip_serializing_if = "is_zero_u16")]
        mitig: u16,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        shield: Option<WireShield>,
    },
    Unknown {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        raw: Option<String>,
    },
}

#[derive(Serialize, Deserialize)]
struct WireSchool {
    name: String,
    #[serde(default)]
    id: u64,
}

#[derive(Serialize, Deserialize)]
struct WireShield {
    effect_id: u64,
    absorbed: i64,
    absorbed_id: u64,
}

impl WireEvent {
    fn from_event(event: &CombatEvent<'_>) -> Self {
        Self {
            t_ms: event.time.combat_ms,
            t_epoch: event.time.has_epoch().then_some(event.time.epoch_ms),
            src: WireEntity::from_entity(&event.source),
            tgt: WireEntity::from_entity(&event.target),
            ability: WireNamedId {
                name: event.ability.name.to_string(),
                id: event.ability.id,
            },
            event: WireEventDesc {
                type_id: event.event.type_id,
                type_name: event.event.type_name.to_string(),
                action_id: event.event.action_id,
                action_name: event.event.action_name.to_string(),
            },
            tail: WireTail::from_trailing(&event.tail),
        }
    }

    fn into_event(self) -> Result<CombatEvent<'static>, ParseError> {
        let mut time = TimeStamp::from_combat_ms(self.t_ms);
        if let Some(epoch) = self.t_epoch {
            time.epoch_ms = epoch;
        }
        Ok(CombatEvent {
            time,
            source: self.src.into_entity()?,
            target: self.tgt.into_entity()?,
            ability: NamedId {
                name: intern_str(&self.ability.name),
                id: self.ability.id,
            },
            event: EventDesc {
                type_id: self.event.type_id,
                type_name: intern_str(&self.event.type_name),
                action_id: self.event.action_id,
                action_name: intern_str(&self.event.action_name),
                raw_text: "",
            },
            tail: self.tail.into_trailing(),
            area: None,
            discipline: None,
        })
    }
}

impl WireEntity {
    fn from_entity(entity: &Entity<'_>) -> Self {
        let mut wire = WireEntity {
            name: entity.name.to_string(),
            ..WireEntity::default()
        };
        match entity.kind {
            EntityKind::Empty => wire.kind = "Empty".into(),
            EntityKind::SameAsSource => wire.kind = "SameAsSource".into(),
            EntityKind::Player { account_id } => {
                wire.kind = "Player".into();
                let (hi, lo) = split_id(account_id);
                wire.id_hi = Some(hi);
                wire.id_lo = Some(lo);
                wire.is_player = Some(true);
            }
            EntityKind::Companion {
                owner, instance_id, ..
            } => {
                wire.kind = "Companion".into();
                wire.companion = Some(entity.name.to_string());
                wire.owner = Some(owner.name.to_string());
                wire.owner_id = Some(owner.id);
                let (hi, lo) = split_id(instance_id);
                wire.id_hi = Some(hi);
                wire.id_lo = Some(lo);
                wire.is_companion = Some(true);
            }
            EntityKind::Npc { instance_id, .. } => {
                wire.kind = "NpcOrObject".into();
                let (hi, lo) = split_id(instance_id);
                wire.id_hi = Some(hi);
                wire.id_lo = Some(lo);
            }
        }
        wire
    }

    fn into_entity(self) -> Result<Entity<'static>, ParseError> {
        let id = join_id(self.id_hi.unwrap_or(0), self.id_lo.unwrap_or(0));
        let kind = match self.kind.as_str() {
            "Empty" => EntityKind::Empty,
            "SameAsSource" => EntityKind::SameAsSource,
            "Player" => EntityKind::Player { account_id: id },
            "Companion" => EntityKind::Companion {
                owner: PlayerRef {
                    name: intern_str(self.owner.as_deref().unwrap_or("")),
                    id: self.owner_id.unwrap_or(0),
                },
                static_id: 0,
                instance_id: id,
            },
            "NpcOrObject" => EntityKind::Npc {
                static_id: 0,
                instance_id: id,
            },
            other => return Err(ParseError::Json(format!("unknown entity kind {other:?}"))),
        };
        Ok(Entity {
            display: "",
            name: intern_str(&self.name),
            kind,
            ..Entity::default()
        })
    }
}

impl WireTail {
    fn from_trailing(tail: &Trailing<'_>) -> Self {
        let kind = match &tail.kind {
            TrailingKind::None => WireTailKind::None,
            TrailingKind::Charges { count } => WireTailKind::Charges { count: *count },
            TrailingKind::Unknown => WireTailKind::Unknown {
                raw: tail.unparsed.map(str::to_string),
            },
            TrailingKind::Numeric(v) => WireTailKind::Numeric {
                amount: v.amount,
                crit: v.crit,
                secondary: v.secondary,
                school: v.school.map(|s| WireSchool {
                    name: s.name.to_string(),
                    id: s.id,
                }),
                mitig: v.mitigation.bits(),
                shield: v.shield.map(|s| WireShield {
                    effect_id: s.effect_id,
                    absorbed: s.absorbed,
                    absorbed_id: s.absorbed_id,
                }),
            },
        };
        WireTail {
            kind,
            threat: tail.threat,
        }
    }

    fn into_trailing(self) -> Trailing<'static> {
        let mut out = Trailing {
            threat: self.threat,
            ..Trailing::default()
        };
        match self.kind {
            WireTailKind::None => {}
            WireTailKind::Charges { count } => out.kind = TrailingKind::Charges { count },
            WireTailKind::Unknown { raw } => {
                out.kind = TrailingKind::Unknown;
                out.unparsed = raw.as_deref().map(intern_str);
            }
            WireTailKind::Numeric {
                amount,
                crit,
                secondary,
                school,
                mitig,
                shield,
            } => {
                out.kind = TrailingKind::Numeric(ValueField {
                    amount,
                    crit,
                    secondary,
                    school: school.map(|s| School {
                        name: intern_str(&s.name),
                        id: s.id,
                    }),
                    mitigation: MitigationFlags::from_bits(mitig),
                    shield: shield.map(|s| ShieldDetail {
                        effect_id: s.effect_id,
                        absorbed: s.absorbed,
                        absorbed_id: s.absorbed_id,
                    }),
                });
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::super::LineParser;
    use super::*;

    fn round_trip(line: &str) {
        let event = LineParser::new().parse_line(line).unwrap();
        let json = to_json(&event);
        let back = from_json(&json).expect("wire json parses");
        assert_eq!(to_json(&back), json, "round trip diverged for {line:?}");
    }

    #[test]
    fn round_trip_damage() {
        round_trip(
            "[10:20:30.400] [@Alice#690129185314118|(1,2,3,0)|(100/200)] \
             [Lurker {2958594829844480}:12345007|(0,0,0,0)|(50000/50000)] [Slash {812005418467328}] \
             [Event {836045448945472}: Damage {836045448945501}] (1500* ~200 kinetic {836045448940873}) <99.5>",
        );
    }

    #[test]
    fn round_trip_companion_and_charges() {
        round_trip(
            "[01:02:03.004] [@Jerran Zeva#689501114780828/Raina Temple {493328533553152}:87481369009487|(0,0,0,0)|(1/1)] \
             [=] [Med Shot {2}] [ApplyEffect {836045448945477}: Heal Over Time {3}] (4 charges)",
        );
    }

    #[test]
    fn round_trip_mitigated_hit() {
        round_trip(
            "[05:06:07.008] [Sentry Droid {100}:200|(0,0,0,0)|(5/5)] [@Bob#7|(0,0,0,0)|(9/9)] \
             [Blast {4}] [Event {836045448945472}: Damage {836045448945501}] \
             (1000 energy {1} -shield {2} (300 absorbed {3}))",
        );
    }

    #[test]
    fn epoch_survives_round_trip() {
        let line = "[10:00:00.000] [@Alice#10|(0,0,0,0)|(1/1)] [] [] \
            [Event {836045448945472}: ExitCombat {836045448945490}]";
        let mut event = LineParser::new().parse_line(line).unwrap();
        event.time.epoch_ms = 1_735_725_600_000;
        let back = from_json(&to_json(&event)).unwrap();
        assert_eq!(back.time.epoch_ms, 1_735_725_600_000);
        assert_eq!(back.time.combat_ms, event.time.combat_ms);
    }

    #[test]
    fn unknown_kind_is_rejected() {
        let json = r#"{"t_ms":0,"src":{"name":"","kind":"Ghost"},"tgt":{"name":"","kind":"Empty"},
            "ability":{"name":"","id":0},
            "event":{"type_id":0,"type_name":"","action_id":0,"action_name":""},
            "tail":{"kind":"None"}}"#;
        assert!(matches!(from_json(json), Err(ParseError::Json(_))));
    }
}
