use super::*;
use crate::context::intern;
use memchr::memchr_iter;

#[cfg(test)]
mod tests;

const DAMAGE_FIELDS: usize = 9;
const TAUNT_FIELDS: usize = 5;
const SPELL_FLAG: &str = "spell";
const NO_FLAGS: &str = "-";

/// Decodes typed record lines:
///
/// ```text
/// <time>\tD\t<attacker>\t<defender>\t<total>\t<over_total>\t<type>\t<sub_type>\t<flags>[\t<owner>]
/// <time>\tH\t<healer>\t<healed>\t<total>\t<over_total>\t<type>\t<sub_type>\t<flags>
/// <time>\tT\t<player>\t<npc>\t<0|1>
/// ```
#[derive(Debug, Default, Clone, Copy)]
pub struct RecordParser;

impl RecordParser {
    pub fn new() -> Self {
        Self
    }

    /// Returns `Ok(None)` for blank and `#` comment lines.
    pub fn parse_line(&self, line_number: u64, line: &str) -> Result<Option<CombatEvent>, ParseError> {
        let line = line.trim_end_matches(['\r', '\n']);
        if line.trim().is_empty() || line.starts_with('#') {
            return Ok(None);
        }

        let fields = split_fields(line);
        if fields.len() < TAUNT_FIELDS {
            return Err(ParseError::InvalidLineFormat {
                line_number,
                expected: TAUNT_FIELDS,
                found: fields.len(),
            });
        }

        let timestamp = parse_timestamp(line_number, fields[0])?;
        let action = match fields[1] {
            "D" => LogAction::Damage(parse_damage(line_number, &fields)?),
            "H" => LogAction::Heal(parse_heal(line_number, &fields)?),
            "T" => LogAction::Taunt(parse_taunt(line_number, &fields)?),
            other => {
                return Err(ParseError::InvalidKind {
                    line_number,
                    kind: other.to_string(),
                });
            }
        };

        Ok(Some(CombatEvent {
            line_number,
            timestamp,
            action,
        }))
    }
}

fn split_fields(line: &str) -> Vec<&str> {
    let mut fields = Vec::with_capacity(DAMAGE_FIELDS + 1);
    let mut start = 0;
    for pos in memchr_iter(b'\t', line.as_bytes()) {
        fields.push(&line[start..pos]);
        start = pos + 1;
    }
    fields.push(&line[start..]);
    fields
}

fn parse_timestamp(line_number: u64, segment: &str) -> Result<f64, ParseError> {
    match segment.trim().parse::<f64>() {
        Ok(t) if t.is_finite() && t >= 0.0 => Ok(t),
        _ => Err(ParseError::InvalidTimestamp {
            line_number,
            segment: segment.to_string(),
        }),
    }
}

fn parse_amount(line_number: u64, name: &str, segment: &str) -> Result<i64, ParseError> {
    segment
        .trim()
        .parse::<i64>()
        .map_err(|_| ParseError::InvalidValue {
            line_number,
            detail: format!("{name} '{segment}'"),
        })
}

fn require_fields(line_number: u64, fields: &[&str], expected: usize) -> Result<(), ParseError> {
    if fields.len() < expected {
        return Err(ParseError::InvalidLineFormat {
            line_number,
            expected,
            found: fields.len(),
        });
    }
    Ok(())
}

/// Unknown labels fall back to melee for hits with an amount, miss otherwise.
fn parse_hit_type(label: &str, total: i64) -> HitType {
    HitType::from_label(label.trim()).unwrap_or(if total > 0 {
        HitType::Melee
    } else {
        HitType::Miss
    })
}

fn parse_flags(line_number: u64, segment: &str) -> Result<(Modifiers, bool), ParseError> {
    let segment = segment.trim();
    if segment.is_empty() || segment == NO_FLAGS {
        return Ok((Modifiers::NONE, false));
    }

    let mut modifiers = Modifiers::NONE;
    let mut is_spell = false;
    for flag in segment.split(',').map(str::trim).filter(|f| !f.is_empty()) {
        if flag.eq_ignore_ascii_case(SPELL_FLAG) {
            is_spell = true;
            continue;
        }
        match Modifiers::from_name(flag) {
            Some(m) => modifiers = modifiers | m,
            None => {
                return Err(ParseError::InvalidValue {
                    line_number,
                    detail: format!("unknown flag '{flag}'"),
                });
            }
        }
    }
    Ok((modifiers, is_spell))
}

fn parse_damage(line_number: u64, fields: &[&str]) -> Result<DamageRecord, ParseError> {
    require_fields(line_number, fields, DAMAGE_FIELDS)?;

    let total = parse_amount(line_number, "total", fields[4])?;
    let over_total = parse_amount(line_number, "over_total", fields[5])?;
    let (modifiers, attacker_is_spell) = parse_flags(line_number, fields[8])?;
    let attacker_owner = fields
        .get(9)
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(intern);

    Ok(DamageRecord {
        line_number,
        attacker: intern(fields[2].trim()),
        attacker_owner,
        defender: intern(fields[3].trim()),
        total,
        over_total,
        hit_type: parse_hit_type(fields[6], total),
        sub_type: intern(fields[7].trim()),
        modifiers,
        attacker_is_spell,
    })
}

fn parse_heal(line_number: u64, fields: &[&str]) -> Result<HealRecord, ParseError> {
    require_fields(line_number, fields, DAMAGE_FIELDS)?;

    let total = parse_amount(line_number, "total", fields[4])?;
    let over_total = parse_amount(line_number, "over_total", fields[5])?;
    let (modifiers, _) = parse_flags(line_number, fields[8])?;
    let hit_type = match HitType::from_label(fields[6].trim()) {
        Some(HitType::HealOverTime) => HitType::HealOverTime,
        _ => HitType::Heal,
    };

    Ok(HealRecord {
        line_number,
        healer: intern(fields[2].trim()),
        healed: intern(fields[3].trim()),
        total,
        over_total,
        hit_type,
        sub_type: intern(fields[7].trim()),
        modifiers,
    })
}

fn parse_taunt(line_number: u64, fields: &[&str]) -> Result<TauntRecord, ParseError> {
    let success = match fields[4].trim() {
        "1" => true,
        "0" => false,
        other => {
            return Err(ParseError::InvalidValue {
                line_number,
                detail: format!("taunt success '{other}'"),
            });
        }
    };

    Ok(TauntRecord {
        line_number,
        player: intern(fields[2].trim()),
        npc: intern(fields[3].trim()),
        success,
    })
}
