//! Human-readable rendering of events and durations.

use std::fmt::Write;

use super::event::{CombatEvent, Entity, EntityKind, TrailingKind};

/// Options for [`to_text`].
#[derive(Debug, Clone, Copy)]
pub struct PrintOptions {
    pub multiline: bool,
    pub include_positions: bool,
    pub include_health: bool,
}

impl Default for PrintOptions {
    fn default() -> Self {
        Self {
            multiline: true,
            include_positions: false,
            include_health: false,
        }
    }
}

/// Render an event for logs and consoles.
pub fn to_text(event: &CombatEvent<'_>, opt: &PrintOptions) -> String {
    let mut out = String::new();
    let time = &event.time;
    let stamp = format!("{:02}:{:02}:{:02}.{:03}", time.h, time.m, time.s, time.ms);

    if opt.multiline {
        let _ = writeln!(out, "----- combat line -----");
        let _ = writeln!(out, "time:    {stamp}");
        let _ = writeln!(out, "source:  {}", entity_text(&event.source, opt));
        let _ = writeln!(out, "target:  {}", entity_text(&event.target, opt));
        let _ = writeln!(out, "ability: {}", event.ability.name);
        let _ = writeln!(out, "event:   {} / {}", event.event.type_name, event.event.action_name);
        let _ = writeln!(out, "tail:    {}", tail_text(event));
        return out;
    }

    let _ = write!(
        out,
        "[{stamp}] {} -> {}",
        entity_text(&event.source, opt),
        entity_text(&event.target, opt)
    );
    if !event.ability.name.is_empty() {
        let _ = write!(out, " [{}]", event.ability.name);
    }
    let _ = write!(out, " {}", event.event.action_name);
    let tail = tail_text(event);
    if !tail.is_empty() {
        let _ = write!(out, " ({tail})");
    }
    out
}

fn entity_text(entity: &Entity<'_>, opt: &PrintOptions) -> String {
    let mut out = match entity.kind {
        EntityKind::Empty => "<none>".to_string(),
        EntityKind::SameAsSource => "<self>".to_string(),
        EntityKind::Player { .. } => format!("@{}", entity.name),
        EntityKind::Companion { owner, .. } => format!("@{}/{}", owner.name, entity.name),
        EntityKind::Npc { .. } => entity.name.to_string(),
    };
    if opt.include_health && entity.health.max > 0 {
        let _ = write!(out, " ({}/{})", entity.health.current, entity.health.max);
    }
    if opt.include_positions && !matches!(entity.kind, EntityKind::Empty | EntityKind::SameAsSource)
    {
        let p = entity.position;
        let _ = write!(out, " @({:.1},{:.1},{:.1})", p.x, p.y, p.z);
    }
    out
}

fn tail_text(event: &CombatEvent<'_>) -> String {
    let mut out = String::new();
    match &event.tail.kind {
        TrailingKind::None => {}
        TrailingKind::Charges { count } => {
            let _ = write!(out, "{count} charges");
        }
        TrailingKind::Unknown => {
            let _ = write!(out, "?{}", event.tail.unparsed.unwrap_or(""));
        }
        TrailingKind::Numeric(v) => {
            let _ = write!(out, "{}", v.amount);
            if v.crit {
                out.push('*');
            }
            if let Some(sec) = v.secondary {
                let _ = write!(out, " ~{sec}");
            }
            if let Some(school) = v.school {
                let _ = write!(out, " {}", school.name);
            }
        }
    }
    if let Some(threat) = event.tail.threat {
        if !out.is_empty() {
            out.push(' ');
        }
        let _ = write!(out, "<{threat}>");
    }
    out
}

/// `SS.mmm`, `MM:SS.mmm`, or `HH:MM:SS.mmm`, whichever is shortest.
pub fn format_duration_ms(total_ms: i64) -> String {
    let total_ms = total_ms.max(0);
    let ms = total_ms % 1000;
    let total_s = total_ms / 1000;
    let s = total_s % 60;
    let m = (total_s / 60) % 60;
    let h = total_s / 3600;

    if h > 0 {
        format!("{h:02}:{m:02}:{s:02}.{ms:03}")
    } else if m > 0 {
        format!("{m:02}:{s:02}.{ms:03}")
    } else {
        format!("{s}.{ms:03}")
    }
}

#[cfg(test)]
mod tests {
    use super::super::LineParser;
    use super::*;

    #[test]
    fn single_line_rendering() {
        let line = "[10:20:30.400] [@Alice#10|(0,0,0,0)|(100/100)] [=] [Slash {1}] \
            [Event {836045448945472}: Damage {836045448945501}] (1500* kinetic {7}) <99.5>";
        let event = LineParser::new().parse_line(line).unwrap();
        let text = to_text(
            &event,
            &PrintOptions {
                multiline: false,
                ..PrintOptions::default()
            },
        );
        assert_eq!(text, "[10:20:30.400] @Alice -> @Alice [Slash] Damage (1500* kinetic <99.5>)");
    }

    #[test]
    fn multiline_contains_every_field() {
        let line = "[10:20:30.400] [@Alice#10|(0,0,0,0)|(100/100)] [] [Slash {1}] \
            [Event {836045448945472}: Damage {836045448945501}] (50)";
        let event = LineParser::new().parse_line(line).unwrap();
        let text = to_text(&event, &PrintOptions::default());
        assert!(text.contains("source:  @Alice"));
        assert!(text.contains("target:  <none>"));
        assert!(text.contains("event:   Event / Damage"));
        assert!(text.contains("tail:    50"));
    }

    #[test]
    fn duration_formats() {
        assert_eq!(format_duration_ms(-5), "0.000");
        assert_eq!(format_duration_ms(9_250), "9.250");
        assert_eq!(format_duration_ms(75_003), "01:15.003");
        assert_eq!(format_duration_ms(3_675_003), "01:01:15.003");
    }
}
