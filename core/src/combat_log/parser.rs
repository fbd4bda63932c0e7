//! The line parser: one log line in, one [`CombatEvent`] out.
//!
//! A line is five bracket segments (timestamp, source, target, ability,
//! event) followed by the trailing region. Everything returned borrows from
//! the input; the hot path allocates nothing.

use super::event::*;
use super::trailing::parse_trailing;
use super::ParseError;
use crate::game_data::{event_type_id, AreaDifficulty, CombatClass, Discipline, Role};
use memchr::memchr;


/// Stateless single-line parser.
#[derive(Debug, Clone, Copy, Default)]
pub struct LineParser;

impl LineParser {
    pub fn new() -> Self {
        Self
    }

    /// Parse one line (without its trailing newline).
    pub fn parse_line<'a>(&self, line: &'a str) -> Result<CombatEvent<'a>, ParseError> {
        let mut seg = Segments { line, pos: 0 };

        let time = parse_timestamp(seg.next_bracket("timestamp")?)?;
        let source = parse_entity(seg.next_bracket("source")?)?;
        let mut target = parse_entity(seg.next_bracket("target")?)?;
        if matches!(target.kind, EntityKind::SameAsSource) {
            target = source;
        }
        let ability = parse_ability(seg.next_bracket("ability")?);
        let event_core = seg.next_bracket("event")?;
        let rest = seg.rest();

        let (event, area, discipline) = parse_event_field(event_core, rest)?;
        // The trailing region of the special events is their payload, not a
        // value group.
        let tail = if area.is_some() || discipline.is_some() {
            Trailing::default()
        } else {
            parse_trailing(rest)
        };

        Ok(CombatEvent {
            time,
            source,
            target,
            ability,
            event,
            tail,
            area,
            discipline,
        })
    }
}

struct Segments<'a> {
    line: &'a str,
    pos: usize,
}

impl<'a> Segments<'a> {
    fn next_bracket(&mut self, what: &'static str) -> Result<&'a str, ParseError> {
        let bytes = self.line.as_bytes();
        let open = memchr(b'[', &bytes[self.pos..])
            .map(|i| i + self.pos)
            .ok_or(ParseError::MissingSegment(what))?;
        let close = memchr(b']', &bytes[open + 1..])
            .map(|i| i + open + 1)
            .ok_or(ParseError::MissingSegment(what))?;
        self.pos = close + 1;
        Ok(&self.line[open + 1..close])
    }

    fn rest(&self) -> &'a str {
        self.line[self.pos..].trim_start()
    }
}

// parse HH:MM:SS.mmm
fn parse_timestamp(seg: &str) -> Result<TimeStamp, ParseError> {
    let b = seg.as_bytes();
    if b.len() != 12 || b[2] != b':' || b[5] != b':' || b[8] != b'.' {
        return Err(ParseError::InvalidTimestamp(seg.to_string()));
    }
    for (i, &c) in b.iter().enumerate() {
        if matches!(i, 2 | 5 | 8) {
            continue;
        }
        if !c.is_ascii_digit() {
            return Err(ParseError::InvalidTimestamp(seg.to_string()));
        }
    }
    let h = (b[0] - b'0') as u32 * 10 + (b[1] - b'0') as u32;
    let m = (b[3] - b'0') as u32 * 10 + (b[4] - b'0') as u32;
    let s = (b[6] - b'0') as u32 * 10 + (b[7] - b'0') as u32;
    let ms =
        (b[9] - b'0') as u32 * 100 + (b[10] - b'0') as u32 * 10 + (b[11] - b'0') as u32;
    if h > 23 || m > 59 || s > 59 {
        return Err(ParseError::InvalidTimestamp(seg.to_string()));
    }
    Ok(TimeStamp::from_hms(h, m, s, ms))
}

// [Display|(x,y,z,f)|(cur/max)] for players, companions, NPCs/objects
fn parse_entity(seg: &str) -> Result<Entity<'_>, ParseError> {
    if seg.is_empty() {
        return Ok(Entity::default());
    }
    if seg == "=" {
        return Ok(Entity {
            display: seg,
            kind: EntityKind::SameAsSource,
            ..Entity::default()
        });
    }

    let first_pipe = seg
        .find('|')
        .ok_or_else(|| ParseError::InvalidEntity(seg.to_string()))?;
    let second_pipe = seg[first_pipe + 1..]
        .find('|')
        .map(|i| i + first_pipe + 1)
        .ok_or_else(|| ParseError::InvalidEntity(seg.to_string()))?;
    let display = &seg[..first_pipe];
    let position = parse_position(&seg[first_pipe + 1..second_pipe])?;
    let health = parse_health(&seg[second_pipe + 1..])?;

    let (name, kind) = parse_display(display)?;
    Ok(Entity {
        display,
        name,
        kind,
        position,
        health,
    })
}

/// Classify the display field by its syntactic cues: `/` marks a companion,
/// a leading `@` a player, anything else an NPC or object.
fn parse_display(display: &str) -> Result<(&str, EntityKind<'_>), ParseError> {
    if let Some(slash) = display.find('/') {
        let (owner_name, owner_id) = parse_player_token(&display[..slash]);
        let right = &display[slash + 1..];
        let (name, static_id, instance_id) = parse_npc_token(right)?;
        return Ok((
            name,
            EntityKind::Companion {
                owner: PlayerRef {
                    name: owner_name,
                    id: owner_id,
                },
                static_id,
                instance_id,
            },
        ));
    }
    if display.starts_with('@') {
        let (name, account_id) = parse_player_token(display);
        return Ok((name, EntityKind::Player { account_id }));
    }
    let (name, static_id, instance_id) = parse_npc_token(display)?;
    Ok((
        name,
        EntityKind::Npc {
            static_id,
            instance_id,
        },
    ))
}

// "@Name#123456" → (Name, 123456); the account suffix is optional
fn parse_player_token(token: &str) -> (&str, u64) {
    let token = token.strip_prefix('@').unwrap_or(token);
    if let Some(hash) = token.rfind('#') {
        if let Ok(id) = token[hash + 1..].parse::<u64>() {
            return (&token[..hash], id);
        }
    }
    (token, 0)
}

// "Name {staticId}:instanceId" → (Name, staticId, instanceId); braces optional
fn parse_npc_token(token: &str) -> Result<(&str, u64, u64), ParseError> {
    let Some(open) = token.rfind('{') else {
        return Ok((token.trim(), 0, 0));
    };
    let close = token
        .rfind('}')
        .filter(|&c| c > open)
        .ok_or_else(|| ParseError::InvalidEntity(token.to_string()))?;
    let static_id = token[open + 1..close]
        .parse::<u64>()
        .map_err(|_| ParseError::InvalidNumber("entity static id"))?;
    let instance_id = match token[close + 1..].find(':') {
        Some(colon) => token[close + 1 + colon + 1..].parse::<u64>().unwrap_or(0),
        None => 0,
    };
    Ok((token[..open].trim_end(), static_id, instance_id))
}

// (x,y,z,facing)
fn parse_position(seg: &str) -> Result<Position, ParseError> {
    let core = seg
        .strip_prefix('(')
        .and_then(|s| s.strip_suffix(')'))
        .ok_or_else(|| ParseError::InvalidEntity(seg.to_string()))?;
    let mut parts = core.split(',');
    let mut next = || -> Result<f32, ParseError> {
        parts
            .next()
            .and_then(|p| p.trim().parse::<f32>().ok())
            .ok_or(ParseError::InvalidNumber("entity position"))
    };
    Ok(Position {
        x: next()?,
        y: next()?,
        z: next()?,
        facing: next()?,
    })
}

// (current/max)
fn parse_health(seg: &str) -> Result<Health, ParseError> {
    let core = seg
        .strip_prefix('(')
        .and_then(|s| s.strip_suffix(')'))
        .ok_or_else(|| ParseError::InvalidEntity(seg.to_string()))?;
    let (cur, max) = core
        .split_once('/')
        .ok_or_else(|| ParseError::InvalidEntity(seg.to_string()))?;
    Ok(Health {
        current: cur.parse().map_err(|_| ParseError::InvalidNumber("health"))?,
        max: max.parse().map_err(|_| ParseError::InvalidNumber("health"))?,
    })
}

// [Name {id}], braces optional
fn parse_ability(seg: &str) -> NamedId<'_> {
    if seg.is_empty() {
        return NamedId::default();
    }
    parse_named_id(seg).unwrap_or(NamedId {
        name: seg.trim(),
        id: 0,
    })
}

// "Name {id}"
fn parse_named_id(text: &str) -> Option<NamedId<'_>> {
    let open = text.find('{')?;
    let close = text[open + 1..].find('}').map(|i| i + open + 1)?;
    let id = text[open + 1..close].parse::<u64>().ok()?;
    Some(NamedId {
        name: text[..open].trim_end(),
        id,
    })
}

type EventField<'a> = (
    EventDesc<'a>,
    Option<AreaPayload<'a>>,
    Option<DisciplinePayload<'a>>,
);

/// Route the event bracket. AreaEntered and DisciplineChanged bypass the
/// generic action extraction and populate their own payloads; AreaEntered
/// additionally reads the `(raw_value)` and `<version>` groups that follow
/// the closing bracket.
fn parse_event_field<'a>(core: &'a str, rest: &'a str) -> Result<EventField<'a>, ParseError> {
    let mut desc = EventDesc {
        raw_text: core,
        ..EventDesc::default()
    };
    if core.is_empty() {
        return Ok((desc, None, None));
    }

    let brace = core.find('{');
    let colon = core.find(':');
    let name_end = brace
        .unwrap_or(core.len())
        .min(colon.unwrap_or(core.len()));
    desc.type_name = core[..name_end].trim_end();

    if let Some(open) = brace {
        if open < colon.unwrap_or(core.len()) {
            if let Some(close) = core[open + 1..].find('}').map(|i| i + open + 1) {
                desc.type_id = core[open + 1..close].parse().unwrap_or(0);
            }
        }
    }

    let after_colon = colon.map(|c| core[c + 1..].trim_start());

    if desc.type_id == event_type_id::AREA_ENTERED {
        let body = after_colon.ok_or_else(|| ParseError::InvalidEvent(core.to_string()))?;
        let area = parse_area_payload(body, rest)
            .ok_or_else(|| ParseError::InvalidEvent(core.to_string()))?;
        return Ok((desc, Some(area), None));
    }
    if desc.type_id == event_type_id::DISCIPLINE_CHANGED {
        let body = after_colon.ok_or_else(|| ParseError::InvalidEvent(core.to_string()))?;
        let payload = parse_discipline_payload(body)
            .ok_or_else(|| ParseError::InvalidEvent(core.to_string()))?;
        return Ok((desc, None, Some(payload)));
    }

    if let Some(part) = after_colon {
        match (part.rfind('{'), part.rfind('}')) {
            (Some(open), Some(close)) if close > open => {
                desc.action_name = part[..open].trim_end();
                desc.action_id = part[open + 1..close].parse().unwrap_or(0);
            }
            _ => desc.action_name = part,
        }
    }
    Ok((desc, None, None))
}

/// `Area Name {id} [Difficulty {id}]` after the colon, then optionally
/// `(raw_value)` and `<vX.Y>` past the closing bracket.
fn parse_area_payload<'a>(body: &'a str, rest: &'a str) -> Option<AreaPayload<'a>> {
    let mut brace_count = 0usize;
    let mut first_close = 0usize;
    for (i, b) in body.bytes().enumerate() {
        if b == b'}' {
            if brace_count == 0 {
                first_close = i;
            }
            brace_count += 1;
        }
    }

    let (area, difficulty) = match brace_count {
        1 => (parse_named_id(body)?, None),
        2 => {
            let area = parse_named_id(&body[..=first_close])?;
            let difficulty = parse_named_id(body[first_close + 1..].trim_start())?;
            (area, Some(difficulty))
        }
        _ => return None,
    };

    let mut payload = AreaPayload {
        area,
        difficulty,
        difficulty_kind: difficulty
            .map(|d| AreaDifficulty::from_id(d.id))
            .unwrap_or_default(),
        version_tag: None,
        raw_value: None,
    };

    let mut cur = rest.trim_start();
    if cur.starts_with('(') {
        if let Some(close) = memchr(b')', cur.as_bytes()) {
            let inner = &cur[1..close];
            if !inner.is_empty() {
                payload.raw_value = Some(inner);
            }
            cur = cur[close + 1..].trim_start();
        }
    }
    if cur.starts_with('<') {
        if let Some(close) = memchr(b'>', cur.as_bytes()) {
            let inner = &cur[1..close];
            if inner.starts_with('v') {
                payload.version_tag = Some(inner);
            }
        }
    }
    Some(payload)
}

// `Class {id}/Discipline {id}` after the colon
fn parse_discipline_payload(body: &str) -> Option<DisciplinePayload<'_>> {
    let (class_part, disc_part) = body.split_once('/')?;
    let combat_class = parse_named_id(class_part)?;
    let discipline = parse_named_id(disc_part)?;
    let discipline_kind = Discipline::from_id(discipline.id);
    Some(DisciplinePayload {
        combat_class,
        discipline,
        class_kind: CombatClass::from_id(combat_class.id),
        discipline_kind,
        role: discipline_kind.map(|d| d.role()).unwrap_or(Role::Unknown),
    })
}
