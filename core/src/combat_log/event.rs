//! The typed model of one combat log line.
//!
//! Every string in a freshly parsed [`CombatEvent`] borrows from the input
//! line; the record costs nothing to produce beyond the parse itself. A
//! processor that needs an event past the line buffer calls
//! [`CombatEvent::deep_clone`], which interns every string into the global
//! interner and yields a `'static` record.

use crate::context::intern_str;
use crate::game_data::{action_id, event_type_id, AreaDifficulty, CombatClass, Discipline, Role};

/// Time-of-day stamp of a line. `epoch_ms` stays at [`TimeStamp::EPOCH_UNSET`]
/// until the time reconstructor has run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeStamp {
    pub h: u32,
    pub m: u32,
    pub s: u32,
    pub ms: u32,
    /// Milliseconds since local midnight.
    pub combat_ms: u32,
    /// Absolute milliseconds since the Unix epoch, local timezone.
    pub epoch_ms: i64,
}

impl TimeStamp {
    pub const EPOCH_UNSET: i64 = -1;

    pub fn from_hms(h: u32, m: u32, s: u32, ms: u32) -> Self {
        Self {
            h,
            m,
            s,
            ms,
            combat_ms: ((h * 60 + m) * 60 + s) * 1000 + ms,
            epoch_ms: Self::EPOCH_UNSET,
        }
    }

    /// Rebuild the clock components from a milliseconds-since-midnight value.
    pub fn from_combat_ms(combat_ms: u32) -> Self {
        let ms = combat_ms % 1000;
        let total_s = combat_ms / 1000;
        Self {
            h: total_s / 3600,
            m: (total_s / 60) % 60,
            s: total_s % 60,
            ms,
            combat_ms,
            epoch_ms: Self::EPOCH_UNSET,
        }
    }

    pub const fn has_epoch(&self) -> bool {
        self.epoch_ms != Self::EPOCH_UNSET
    }
}

impl Default for TimeStamp {
    fn default() -> Self {
        Self::from_hms(0, 0, 0, 0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Position {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub facing: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Health {
    pub current: i64,
    pub max: i64,
}

/// Owner token of a companion: the player name (without `@`) and account id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PlayerRef<'a> {
    pub name: &'a str,
    pub id: u64,
}

/// What kind of thing an entity bracket named, with the ids that identify it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EntityKind<'a> {
    /// `[]`
    #[default]
    Empty,
    /// `[=]` in the target position; the parser substitutes the source.
    SameAsSource,
    /// `@Name#account`
    Player { account_id: u64 },
    /// `owner/Name {staticId}:instanceId`
    Companion {
        owner: PlayerRef<'a>,
        static_id: u64,
        instance_id: u64,
    },
    /// `Name {staticId}:instanceId`
    Npc { static_id: u64, instance_id: u64 },
}

/// One entity bracket: a player, companion, NPC, or object.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Entity<'a> {
    /// The whole display field, verbatim.
    pub display: &'a str,
    /// Player name, companion name, or NPC name.
    pub name: &'a str,
    pub kind: EntityKind<'a>,
    pub position: Position,
    pub health: Health,
}

impl<'a> Entity<'a> {
    /// The 64-bit identity: account id for players, instance id otherwise.
    pub fn id(&self) -> u64 {
        match self.kind {
            EntityKind::Empty | EntityKind::SameAsSource => 0,
            EntityKind::Player { account_id } => account_id,
            EntityKind::Companion { instance_id, .. } => instance_id,
            EntityKind::Npc { instance_id, .. } => instance_id,
        }
    }

    /// The static type id (0 for players).
    pub fn type_id(&self) -> u64 {
        match self.kind {
            EntityKind::Companion { static_id, .. } => static_id,
            EntityKind::Npc { static_id, .. } => static_id,
            _ => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self.kind, EntityKind::Empty)
    }

    pub fn is_player(&self) -> bool {
        matches!(self.kind, EntityKind::Player { .. })
    }

    pub fn is_companion(&self) -> bool {
        matches!(self.kind, EntityKind::Companion { .. })
    }

    pub fn is_npc(&self) -> bool {
        matches!(self.kind, EntityKind::Npc { .. })
    }

    pub fn companion_name(&self) -> Option<&'a str> {
        match self.kind {
            EntityKind::Companion { .. } => Some(self.name),
            _ => None,
        }
    }

    pub fn owner_ref(&self) -> Option<PlayerRef<'a>> {
        match self.kind {
            EntityKind::Companion { owner, .. } => Some(owner),
            _ => None,
        }
    }

    pub fn deep_clone(&self) -> Entity<'static> {
        Entity {
            display: intern_str(self.display),
            name: intern_str(self.name),
            kind: match self.kind {
                EntityKind::Empty => EntityKind::Empty,
                EntityKind::SameAsSource => EntityKind::SameAsSource,
                EntityKind::Player { account_id } => EntityKind::Player { account_id },
                EntityKind::Companion {
                    owner,
                    static_id,
                    instance_id,
                } => EntityKind::Companion {
                    owner: PlayerRef {
                        name: intern_str(owner.name),
                        id: owner.id,
                    },
                    static_id,
                    instance_id,
                },
                EntityKind::Npc {
                    static_id,
                    instance_id,
                } => EntityKind::Npc {
                    static_id,
                    instance_id,
                },
            },
            position: self.position,
            health: self.health,
        }
    }
}

/// A `Name {id}` pair; id 0 means the braces were absent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct NamedId<'a> {
    pub name: &'a str,
    pub id: u64,
}

impl<'a> NamedId<'a> {
    pub fn deep_clone(&self) -> NamedId<'static> {
        NamedId {
            name: intern_str(self.name),
            id: self.id,
        }
    }
}

/// The event bracket: type plus the ability-like action, ids and names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EventDesc<'a> {
    pub type_id: u64,
    pub type_name: &'a str,
    pub action_id: u64,
    pub action_name: &'a str,
    /// Full bracket text, kept for consumers with bespoke needs.
    pub raw_text: &'a str,
}

impl<'a> EventDesc<'a> {
    pub fn deep_clone(&self) -> EventDesc<'static> {
        EventDesc {
            type_id: self.type_id,
            type_name: intern_str(self.type_name),
            action_id: self.action_id,
            action_name: intern_str(self.action_name),
            raw_text: intern_str(self.raw_text),
        }
    }
}

/// How an incoming hit was reduced or avoided. A set because a single value
/// group can chain several `-token` entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MitigationFlags(u16);

impl MitigationFlags {
    pub const NONE: Self = Self(0);
    pub const SHIELD: Self = Self(1 << 0);
    pub const DEFLECT: Self = Self(1 << 1);
    pub const GLANCE: Self = Self(1 << 2);
    pub const DODGE: Self = Self(1 << 3);
    pub const PARRY: Self = Self(1 << 4);
    pub const RESIST: Self = Self(1 << 5);
    pub const MISS: Self = Self(1 << 6);
    pub const IMMUNE: Self = Self(1 << 7);

    pub const fn bits(&self) -> u16 {
        self.0
    }

    pub const fn from_bits(bits: u16) -> Self {
        Self(bits & 0xFF)
    }

    pub const fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub const fn contains(&self, other: Self) -> bool {
        self.0 & other.0 != 0
    }

    pub fn insert(&mut self, other: Self) {
        self.0 |= other.0;
    }
}

impl std::ops::BitOr for MitigationFlags {
    type Output = Self;
    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl std::ops::BitOrAssign for MitigationFlags {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

/// Damage school (`kinetic {id}`, `energy {id}`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct School<'a> {
    pub name: &'a str,
    pub id: u64,
}

/// Shield absorption sub-group of a mitigation chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ShieldDetail {
    pub effect_id: u64,
    pub absorbed: i64,
    pub absorbed_id: u64,
}

/// Numeric value group of the trailing region.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ValueField<'a> {
    pub amount: i64,
    pub crit: bool,
    pub secondary: Option<i64>,
    pub school: Option<School<'a>>,
    pub mitigation: MitigationFlags,
    pub shield: Option<ShieldDetail>,
}

/// What the trailing region carried.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum TrailingKind<'a> {
    #[default]
    None,
    Numeric(ValueField<'a>),
    Charges {
        count: i32,
    },
    /// A paren group was present but did not fit any known shape; the text is
    /// preserved in [`Trailing::unparsed`].
    Unknown,
}

/// The suffix of a line after the event bracket.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Trailing<'a> {
    pub kind: TrailingKind<'a>,
    pub threat: Option<f64>,
    pub unparsed: Option<&'a str>,
}

impl<'a> Trailing<'a> {
    pub fn value(&self) -> Option<&ValueField<'a>> {
        match &self.kind {
            TrailingKind::Numeric(v) => Some(v),
            _ => None,
        }
    }

    /// Damage/heal amount, 0 when the tail carries none.
    pub fn amount(&self) -> i64 {
        self.value().map(|v| v.amount).unwrap_or(0)
    }

    pub fn charges(&self) -> Option<i32> {
        match self.kind {
            TrailingKind::Charges { count } => Some(count),
            _ => None,
        }
    }

    pub fn deep_clone(&self) -> Trailing<'static> {
        Trailing {
            kind: match self.kind {
                TrailingKind::None => TrailingKind::None,
                TrailingKind::Unknown => TrailingKind::Unknown,
                TrailingKind::Charges { count } => TrailingKind::Charges { count },
                TrailingKind::Numeric(v) => TrailingKind::Numeric(ValueField {
                    amount: v.amount,
                    crit: v.crit,
                    secondary: v.secondary,
                    school: v.school.map(|s| School {
                        name: intern_str(s.name),
                        id: s.id,
                    }),
                    mitigation: v.mitigation,
                    shield: v.shield,
                }),
            },
            threat: self.threat,
            unparsed: self.unparsed.map(intern_str),
        }
    }
}

/// Payload of an AreaEntered event.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct AreaPayload<'a> {
    pub area: NamedId<'a>,
    pub difficulty: Option<NamedId<'a>>,
    pub difficulty_kind: AreaDifficulty,
    pub version_tag: Option<&'a str>,
    pub raw_value: Option<&'a str>,
}

impl<'a> AreaPayload<'a> {
    pub fn deep_clone(&self) -> AreaPayload<'static> {
        AreaPayload {
            area: self.area.deep_clone(),
            difficulty: self.difficulty.map(|d| d.deep_clone()),
            difficulty_kind: self.difficulty_kind,
            version_tag: self.version_tag.map(intern_str),
            raw_value: self.raw_value.map(intern_str),
        }
    }
}

/// Payload of a DisciplineChanged event.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DisciplinePayload<'a> {
    pub combat_class: NamedId<'a>,
    pub discipline: NamedId<'a>,
    pub class_kind: Option<CombatClass>,
    pub discipline_kind: Option<Discipline>,
    pub role: Role,
}

impl<'a> DisciplinePayload<'a> {
    pub fn deep_clone(&self) -> DisciplinePayload<'static> {
        DisciplinePayload {
            combat_class: self.combat_class.deep_clone(),
            discipline: self.discipline.deep_clone(),
            class_kind: self.class_kind,
            discipline_kind: self.discipline_kind,
            role: self.role,
        }
    }
}

/// One fully parsed combat log line.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CombatEvent<'a> {
    pub time: TimeStamp,
    pub source: Entity<'a>,
    pub target: Entity<'a>,
    pub ability: NamedId<'a>,
    pub event: EventDesc<'a>,
    pub tail: Trailing<'a>,
    /// Populated only for AreaEntered events.
    pub area: Option<AreaPayload<'a>>,
    /// Populated only for DisciplineChanged events.
    pub discipline: Option<DisciplinePayload<'a>>,
}

impl<'a> CombatEvent<'a> {
    /// True when `id` names either the event type or the action.
    pub fn matches_id(&self, id: u64) -> bool {
        self.event.type_id == id || self.event.action_id == id
    }

    pub fn is_area_entered(&self) -> bool {
        self.event.type_id == event_type_id::AREA_ENTERED
    }

    pub fn is_discipline_changed(&self) -> bool {
        self.event.type_id == event_type_id::DISCIPLINE_CHANGED
    }

    pub fn is_apply_effect(&self) -> bool {
        self.event.type_id == event_type_id::APPLY_EFFECT
    }

    pub fn is_remove_effect(&self) -> bool {
        self.event.type_id == event_type_id::REMOVE_EFFECT
    }

    pub fn is_modify_charges(&self) -> bool {
        self.event.type_id == event_type_id::MODIFY_CHARGES
    }

    pub fn is_damage(&self) -> bool {
        self.matches_id(action_id::DAMAGE)
    }

    pub fn is_heal(&self) -> bool {
        self.matches_id(action_id::HEAL)
    }

    pub fn is_death(&self) -> bool {
        self.matches_id(action_id::DEATH)
    }

    pub fn is_revived(&self) -> bool {
        self.matches_id(action_id::REVIVED)
    }

    pub fn is_enter_combat(&self) -> bool {
        self.matches_id(action_id::ENTER_COMBAT)
    }

    pub fn is_exit_combat(&self) -> bool {
        self.matches_id(action_id::EXIT_COMBAT)
    }

    pub fn is_target_set(&self) -> bool {
        self.matches_id(action_id::TARGET_SET)
    }

    pub fn is_target_cleared(&self) -> bool {
        self.matches_id(action_id::TARGET_CLEARED)
    }

    /// Intern every borrowed string and return a record free of the line
    /// buffer. This is the only supported way to extend an event's lifetime.
    pub fn deep_clone(&self) -> CombatEvent<'static> {
        CombatEvent {
            time: self.time,
            source: self.source.deep_clone(),
            target: self.target.deep_clone(),
            ability: self.ability.deep_clone(),
            event: self.event.deep_clone(),
            tail: self.tail.deep_clone(),
            area: self.area.as_ref().map(|a| a.deep_clone()),
            discipline: self.discipline.as_ref().map(|d| d.deep_clone()),
        }
    }
}
