mod display;
mod error;
mod event;
mod json;
mod parser;
mod trailing;

pub use display::{format_duration_ms, to_text, PrintOptions};
pub use error::ParseError;
pub use event::{
    AreaPayload, CombatEvent, DisciplinePayload, Entity, EntityKind, EventDesc, Health,
    MitigationFlags, NamedId, PlayerRef, Position, School, ShieldDetail, TimeStamp, Trailing,
    TrailingKind, ValueField,
};
pub use json::{from_json, to_json};
pub use parser::LineParser;
