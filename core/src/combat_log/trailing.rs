//! Grammar for the trailing region of a line: value groups, charge counts,
//! mitigation chains, shield absorbs, and the terminal threat marker.
//!
//! The region is the most ambiguous part of the format, so parsing is
//! tolerant: anything that fits no known shape degrades to
//! [`TrailingKind::Unknown`] with the text preserved, never a hard error.
//! The common shape `(amount[*] [~sec] school {id}) [<threat>]` is handled by
//! a single linear byte scan; everything else falls through to the flexible
//! parser.

use super::event::{MitigationFlags, School, ShieldDetail, Trailing, TrailingKind, ValueField};
use memchr::memchr;

pub(crate) fn parse_trailing(tail: &str) -> Trailing<'_> {
    let mut out = Trailing::default();
    let (rest, threat) = peel_terminal_threat(tail.trim());
    out.threat = threat;

    if rest.is_empty() {
        return out;
    }
    if !rest.starts_with('(') {
        out.unparsed = Some(rest);
        return out;
    }
    let Some((group, after)) = peel_paren_group(rest) else {
        out.unparsed = Some(rest);
        return out;
    };
    let after = after.trim();
    if !after.is_empty() {
        out.unparsed = Some(after);
    }

    if let Some(count) = parse_charges_group(group) {
        out.kind = TrailingKind::Charges { count };
        return out;
    }
    if let Some(vf) = fast_value_group(group) {
        out.kind = TrailingKind::Numeric(vf);
        return out;
    }
    match parse_value_group(group) {
        Some(vf) => out.kind = TrailingKind::Numeric(vf),
        None => {
            out.kind = TrailingKind::Unknown;
            out.unparsed = Some(group);
        }
    }
    out
}

/// Peel a terminal `<number>` as threat. The angle group is consumed whether
/// or not its body parses; threat is reported only when it does.
fn peel_terminal_threat(tail: &str) -> (&str, Option<f64>) {
    if !tail.ends_with('>') {
        return (tail, None);
    }
    let Some(open) = tail.rfind('<') else {
        return (tail, None);
    };
    let inner = &tail[open + 1..tail.len() - 1];
    let threat = inner.trim().parse::<f64>().ok();
    (tail[..open].trim_end(), threat)
}

/// Split a balanced `(...)` group off the front, returning (inner, rest).
fn peel_paren_group(s: &str) -> Option<(&str, &str)> {
    let bytes = s.as_bytes();
    if bytes.first() != Some(&b'(') {
        return None;
    }
    let mut depth = 0usize;
    for (i, &b) in bytes.iter().enumerate() {
        match b {
            b'(' => depth += 1,
            b')' => {
                depth -= 1;
                if depth == 0 {
                    return Some((&s[1..i], &s[i + 1..]));
                }
            }
            _ => {}
        }
    }
    None
}

/// `<int> charges`, optionally followed by the effect id the game appends
/// (`3 charges {836045448953667}`). Only the count is kept.
fn parse_charges_group(group: &str) -> Option<i32> {
    let core = group.trim();
    let (num, rest) = match core.find(' ') {
        Some(p) => (&core[..p], core[p + 1..].trim_start()),
        None => return None,
    };
    let count = num.parse::<i32>().ok()?;
    let rest = rest.strip_prefix("charges")?.trim();
    if rest.is_empty() || (rest.starts_with('{') && rest.ends_with('}')) {
        Some(count)
    } else {
        None
    }
}

/// One pass over `amount[*] [~sec] [school [{id}]]` with nothing else in the
/// group. Fails (returns None) on any other byte so the flexible parser can
/// take over.
fn fast_value_group(group: &str) -> Option<ValueField<'_>> {
    let b = group.as_bytes();
    let mut i = 0usize;
    let n = b.len();
    let mut vf = ValueField::default();

    let neg = i < n && b[i] == b'-';
    if neg {
        i += 1;
    }
    let amt_start = i;
    while i < n && b[i].is_ascii_digit() {
        i += 1;
    }
    if i == amt_start {
        return None;
    }
    let mut amount: i64 = group[amt_start..i].parse().ok()?;
    if neg {
        amount = -amount;
    }
    vf.amount = amount;
    while i < n && b[i] == b' ' {
        i += 1;
    }

    if i < n && b[i] == b'*' {
        vf.crit = true;
        i += 1;
        while i < n && b[i] == b' ' {
            i += 1;
        }
    }

    if i < n && b[i] == b'~' {
        i += 1;
        while i < n && b[i] == b' ' {
            i += 1;
        }
        let sneg = i < n && b[i] == b'-';
        if sneg {
            i += 1;
        }
        let sec_start = i;
        while i < n && b[i].is_ascii_digit() {
            i += 1;
        }
        if i == sec_start {
            return None;
        }
        let mut sec: i64 = group[sec_start..i].parse().ok()?;
        if sneg {
            sec = -sec;
        }
        vf.secondary = Some(sec);
        while i < n && b[i] == b' ' {
            i += 1;
        }
    }

    let school_start = i;
    while i < n && b[i].is_ascii_alphabetic() {
        i += 1;
    }
    if i > school_start {
        let name = &group[school_start..i];
        let mut id = 0u64;
        while i < n && b[i] == b' ' {
            i += 1;
        }
        if i < n && b[i] == b'{' {
            i += 1;
            let id_start = i;
            while i < n && b[i].is_ascii_digit() {
                i += 1;
            }
            if i == id_start || i >= n || b[i] != b'}' {
                return None;
            }
            id = group[id_start..i].parse().ok()?;
            i += 1;
        }
        vf.school = Some(School { name, id });
        while i < n && b[i] == b' ' {
            i += 1;
        }
    }

    if i != n {
        return None;
    }
    Some(vf)
}

/// Flexible value-group parser: handles mitigation chains, shield ids,
/// absorbed sub-groups, and irregular spacing.
fn parse_value_group(group: &str) -> Option<ValueField<'_>> {
    let mut cur = group.trim();
    let mut vf = ValueField::default();

    let stop = cur
        .find(|c: char| c == ' ' || c == '*' || c == '~')
        .unwrap_or(cur.len());
    vf.amount = cur[..stop].parse::<i64>().ok()?;
    cur = cur[stop..].trim_start();

    if let Some(rest) = cur.strip_prefix('*') {
        vf.crit = true;
        cur = rest.trim_start();
    }

    if let Some(rest) = cur.strip_prefix('~') {
        let rest = rest.trim_start();
        let stop = rest
            .find(|c: char| c == ' ' || c == ')')
            .unwrap_or(rest.len());
        vf.secondary = Some(rest[..stop].parse::<i64>().ok()?);
        cur = rest[stop..].trim_start();
    }

    // optional school, possibly with {id}
    if !cur.is_empty() && !cur.starts_with('-') && !cur.starts_with('(') {
        let stop = cur
            .find(|c: char| c == ' ' || c == '{')
            .unwrap_or(cur.len());
        let name = &cur[..stop];
        cur = cur[stop..].trim_start();
        let mut id = 0u64;
        if cur.starts_with('{') {
            if let Some(close) = memchr(b'}', cur.as_bytes()) {
                id = cur[1..close].parse().unwrap_or(0);
                cur = cur[close + 1..].trim_start();
            }
        }
        if !name.is_empty() {
            vf.school = Some(School { name, id });
        }
    }

    if cur.starts_with('-') {
        parse_mitigation_chain(cur, &mut vf);
    }
    Some(vf)
}

/// Zero or more `-token [{shield_effect_id}] [(N absorbed {id})]` entries.
fn parse_mitigation_chain<'a>(rest: &'a str, vf: &mut ValueField<'a>) {
    let mut cur = rest;
    while let Some(after_dash) = cur.strip_prefix('-') {
        cur = after_dash;
        let stop = cur.find(|c: char| c == ' ' || c == '{');
        let token = match stop {
            Some(p) => &cur[..p],
            None => cur,
        };
        vf.mitigation |= mitigation_token(token);
        let Some(p) = stop else {
            break;
        };
        cur = cur[p..].trim_start();

        // optional {shield_effect_id}
        if cur.starts_with('{') {
            if let Some(close) = memchr(b'}', cur.as_bytes()) {
                if let Ok(id) = cur[1..close].parse::<u64>() {
                    if vf.mitigation.contains(MitigationFlags::SHIELD) {
                        vf.shield.get_or_insert_with(ShieldDetail::default).effect_id = id;
                    }
                }
                cur = cur[close + 1..].trim_start();
            }
        }

        // optional "(123 absorbed {id})"
        if cur.starts_with('(') {
            if let Some((grp, rest2)) = peel_paren_group(cur) {
                parse_absorbed_group(grp, vf);
                cur = rest2.trim_start();
            }
        }

        if !cur.starts_with('-') {
            break;
        }
    }
}

fn parse_absorbed_group(grp: &str, vf: &mut ValueField<'_>) {
    let grp = grp.trim();
    let Some(space) = grp.find(' ') else {
        return;
    };
    let (num, rest) = (&grp[..space], grp[space + 1..].trim_start());
    if !rest.starts_with("absorbed") {
        return;
    }
    let shield = vf.shield.get_or_insert_with(ShieldDetail::default);
    if let Ok(absorbed) = num.parse::<i64>() {
        shield.absorbed = absorbed;
    }
    if let (Some(open), Some(close)) = (rest.find('{'), rest.find('}')) {
        if close > open {
            if let Ok(id) = rest[open + 1..close].parse::<u64>() {
                shield.absorbed_id = id;
            }
        }
    }
}

/// Mitigation tokens are recognized by first character and length.
fn mitigation_token(tok: &str) -> MitigationFlags {
    let b = tok.as_bytes();
    match b.first() {
        Some(b's') if tok == "shield" => MitigationFlags::SHIELD,
        Some(b'd') if tok == "deflect" => MitigationFlags::DEFLECT,
        Some(b'd') if tok == "dodge" => MitigationFlags::DODGE,
        Some(b'g') if tok == "glance" => MitigationFlags::GLANCE,
        Some(b'p') if tok == "parry" => MitigationFlags::PARRY,
        Some(b'r') if tok == "resist" => MitigationFlags::RESIST,
        Some(b'm') if tok == "miss" => MitigationFlags::MISS,
        Some(b'i') if tok == "immune" => MitigationFlags::IMMUNE,
        _ => MitigationFlags::NONE,
    }
}
