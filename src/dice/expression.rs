//! Dice notation parser (spec §4.1).
//!
//! Grammar, informally:
//!
//! ```text
//! expression := term (('+' | '-') term)* [advDis]
//! term       := diceGroup | integer
//! diceGroup  := count 'd' sides [groupMod]
//! groupMod   := ('+' | '-') integer   ; only the first dice group may carry one
//! advDis     := 'a' | 'd' | 'A' | 'D' ; trailing flag
//! ```
//!
//! `+`/`-` are evaluated strictly left to right (no precedence: there is
//! no multiplication). The trickiest part of the grammar is telling a
//! dice group's own inline modifier (`1d8+3`) apart from the top-level
//! `+`/`-` that introduces the *next* term (`1d8+2d6`): a signed digit
//! run immediately after `NdS` is a group modifier only when it is not
//! itself immediately followed by `d`/`D` — if it is, it's the start of
//! another dice group and the sign was a top-level operator all along.
//! Only the *first* dice group in the expression attempts that inline
//! attachment at all; every later group's trailing `+k` is a standalone
//! modifier (this is what keeps `2d6+1d4+3` from folding the `+3` into
//! the `1d4` group — see the worked example in spec §8).

use super::ParseError;

/// One `NdS[+/-M]` group within a parsed expression (spec §3 `DiceRoll`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct DiceRollGroup {
    pub count: u32,
    pub sides: u32,
    pub modifier: i64,
}

impl DiceRollGroup {
    /// The `"NdS"` key used to bucket rolls/subtotals by group (spec §3).
    pub fn key(&self) -> String {
        format!("{}d{}", self.count, self.sides)
    }
}

/// A fully parsed, validated dice expression (spec §3 `DiceExpression`).
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct DiceExpression {
    pub original_text: String,
    pub groups: Vec<DiceRollGroup>,
    pub modifiers: Vec<i64>,
    pub has_advantage: bool,
    pub has_disadvantage: bool,
}

impl DiceExpression {
    /// Signed sum of every standalone modifier plus every group's own
    /// internal modifier (spec §4.1: "totalModifier equal to the signed
    /// sum of standalone modifiers plus each group's internal modifier").
    pub fn total_modifier(&self) -> i64 {
        let standalone: i64 = self.modifiers.iter().sum();
        let per_group: i64 = self.groups.iter().map(|g| g.modifier).sum();
        standalone + per_group
    }

    /// Build the critical-hit version of a (typically single-group)
    /// damage expression: double each group's dice count, leave
    /// modifiers untouched (spec §4.6: `NdS+M -> 2N·dS+M`).
    pub fn doubled_dice(&self) -> DiceExpression {
        let groups = self
            .groups
            .iter()
            .map(|g| DiceRollGroup {
                count: g.count.saturating_mul(2),
                sides: g.sides,
                modifier: g.modifier,
            })
            .collect();
        DiceExpression {
            original_text: self.original_text.clone(),
            groups,
            modifiers: self.modifiers.clone(),
            has_advantage: self.has_advantage,
            has_disadvantage: self.has_disadvantage,
        }
    }
}

/// Default bounds from spec §3/§4.1.
pub const DEFAULT_MAX_DICE_COUNT: u32 = 1000;
pub const DEFAULT_MAX_DIE_SIDES: u32 = 1000;

/// Parse with the spec's default bounds (1..=1000 for both count and sides).
pub fn parse(text: &str) -> Result<DiceExpression, ParseError> {
    parse_with_bounds(text, DEFAULT_MAX_DICE_COUNT, DEFAULT_MAX_DIE_SIDES)
}

/// Parse with caller-supplied bounds (used when `CombatConfig` overrides
/// the defaults).
pub fn parse_with_bounds(
    text: &str,
    max_count: u32,
    max_sides: u32,
) -> Result<DiceExpression, ParseError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(ParseError::InvalidExpression(
            "expression is empty".to_string(),
        ));
    }
    let normalized: String = trimmed.chars().filter(|c| !c.is_whitespace()).collect();
    if normalized.is_empty() {
        return Err(ParseError::InvalidExpression(
            "expression is empty".to_string(),
        ));
    }
    if !normalized.is_ascii() {
        return Err(ParseError::InvalidExpression(
            "expression contains unsupported characters".to_string(),
        ));
    }

    let (body, has_advantage, has_disadvantage) = split_trailing_flag(&normalized)?;
    let (raw_groups, modifiers) = scan_terms(&body)?;

    if raw_groups.is_empty() {
        return Err(ParseError::Validation(
            "expression must contain at least one dice group".to_string(),
        ));
    }

    let mut groups = Vec::with_capacity(raw_groups.len());
    for (count, sides, modifier) in raw_groups {
        if count < 1 || count > max_count as u64 {
            return Err(ParseError::Validation(format!(
                "dice count {} is outside [1,{}]",
                count, max_count
            )));
        }
        if sides < 1 || sides > max_sides as u64 {
            return Err(ParseError::Validation(format!(
                "die sides {} is outside [1,{}]",
                sides, max_sides
            )));
        }
        groups.push(DiceRollGroup {
            count: count as u32,
            sides: sides as u32,
            modifier,
        });
    }

    Ok(DiceExpression {
        original_text: text.to_string(),
        groups,
        modifiers,
        has_advantage,
        has_disadvantage,
    })
}

fn is_flag_char(b: u8) -> bool {
    matches!(b, b'a' | b'A' | b'd' | b'D')
}

fn flag_bits(b: u8) -> (bool, bool) {
    if matches!(b, b'a' | b'A') {
        (true, false)
    } else {
        (false, true)
    }
}

/// Peel off a trailing advantage/disadvantage flag, if the body doesn't
/// already parse cleanly on its own. Tries zero, then one, then (to
/// produce the "both markers present" error) two trailing flag chars.
fn split_trailing_flag(s: &str) -> Result<(String, bool, bool), ParseError> {
    if let Ok((groups, _)) = scan_terms(s) {
        if !groups.is_empty() {
            return Ok((s.to_string(), false, false));
        }
    }

    if let Some(&last) = s.as_bytes().last() {
        if is_flag_char(last) {
            let remainder = &s[..s.len() - 1];
            // A flag only peels off if what's left still has a dice
            // group of its own — otherwise "2d" would read as the
            // integer "2" plus a disadvantage flag instead of a dice
            // group missing its sides.
            if let Ok((groups, _)) = scan_terms(remainder) {
                if !groups.is_empty() {
                    let (adv, dis) = flag_bits(last);
                    return Ok((remainder.to_string(), adv, dis));
                }
            }
            if let Some(&second_last) = remainder.as_bytes().last() {
                if is_flag_char(second_last) {
                    let last_is_adv = matches!(last, b'a' | b'A');
                    let second_is_adv = matches!(second_last, b'a' | b'A');
                    if last_is_adv != second_is_adv {
                        return Err(ParseError::InvalidExpression(
                            "expression cannot mark both advantage and disadvantage".to_string(),
                        ));
                    }
                }
            }
        }
    }

    // Nothing salvageable: report the error from the unmodified body.
    Err(scan_terms(s).unwrap_err())
}

type RawGroup = (u64, u64, i64);

/// Pure syntactic/semantic scan (no bounds checking): returns the raw
/// `(count, sides, modifier)` groups and standalone modifiers in source
/// order, or a syntax error.
fn scan_terms(body: &str) -> Result<(Vec<RawGroup>, Vec<i64>), ParseError> {
    let bytes = body.as_bytes();
    let n = bytes.len();
    let mut groups: Vec<RawGroup> = Vec::new();
    let mut modifiers: Vec<i64> = Vec::new();
    let mut i = 0usize;
    let mut sign: i64 = 1;
    let mut first_term = true;

    loop {
        if i >= n {
            return Err(ParseError::InvalidExpression(
                "expression ends with an operator".to_string(),
            ));
        }
        if first_term && (bytes[i] == b'+' || bytes[i] == b'-') {
            return Err(ParseError::InvalidExpression(
                "expression cannot start with an operator".to_string(),
            ));
        }

        let start = i;
        while i < n && bytes[i].is_ascii_digit() {
            i += 1;
        }
        let digits = &body[start..i];
        let next_is_d = i < n && (bytes[i] == b'd' || bytes[i] == b'D');

        if next_is_d {
            if digits.is_empty() {
                return Err(ParseError::InvalidExpression(
                    "dice group is missing its count".to_string(),
                ));
            }
            if sign < 0 {
                return Err(ParseError::InvalidExpression(
                    "dice groups cannot be subtracted".to_string(),
                ));
            }
            let count = parse_u64(digits)?;
            i += 1; // consume 'd'/'D'

            let sides_start = i;
            while i < n && bytes[i].is_ascii_digit() {
                i += 1;
            }
            let sides_str = &body[sides_start..i];
            if sides_str.is_empty() {
                return Err(ParseError::InvalidExpression(
                    "dice group is missing its number of sides".to_string(),
                ));
            }
            let sides = parse_u64(sides_str)?;

            let mut modifier: i64 = 0;
            if groups.is_empty() && i < n && (bytes[i] == b'+' || bytes[i] == b'-') {
                let mod_sign: i64 = if bytes[i] == b'+' { 1 } else { -1 };
                let mut j = i + 1;
                let mstart = j;
                while j < n && bytes[j].is_ascii_digit() {
                    j += 1;
                }
                let followed_by_d = j < n && (bytes[j] == b'd' || bytes[j] == b'D');
                if j > mstart && !followed_by_d {
                    let value: i64 = body[mstart..j].parse().map_err(|_| {
                        ParseError::InvalidExpression(format!(
                            "invalid group modifier '{}'",
                            &body[mstart..j]
                        ))
                    })?;
                    modifier = mod_sign * value;
                    i = j;
                }
            }

            groups.push((count, sides, modifier));
        } else {
            if digits.is_empty() {
                return Err(ParseError::InvalidExpression(format!(
                    "unexpected character '{}'",
                    bytes[i] as char
                )));
            }
            let value: i64 = digits.parse().map_err(|_| {
                ParseError::InvalidExpression(format!("invalid modifier '{}'", digits))
            })?;
            modifiers.push(sign * value);
        }

        if i >= n {
            break;
        }
        match bytes[i] {
            b'+' => sign = 1,
            b'-' => sign = -1,
            other => {
                return Err(ParseError::InvalidExpression(format!(
                    "unexpected character '{}'",
                    other as char
                )))
            }
        }
        i += 1;
        first_term = false;
        if i >= n {
            return Err(ParseError::InvalidExpression(
                "expression ends with an operator".to_string(),
            ));
        }
    }

    Ok((groups, modifiers))
}

fn parse_u64(digits: &str) -> Result<u64, ParseError> {
    digits
        .parse::<u64>()
        .map_err(|_| ParseError::Validation(format!("'{}' is too large", digits)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn group(count: u32, sides: u32, modifier: i64) -> DiceRollGroup {
        DiceRollGroup {
            count,
            sides,
            modifier,
        }
    }

    #[test]
    fn parses_simple_group() {
        let e = parse("2d6").unwrap();
        assert_eq!(e.groups, vec![group(2, 6, 0)]);
        assert_eq!(e.modifiers, Vec::<i64>::new());
        assert!(!e.has_advantage && !e.has_disadvantage);
    }

    #[test]
    fn parses_first_group_inline_modifier() {
        let e = parse("1d20+5").unwrap();
        assert_eq!(e.groups, vec![group(1, 20, 5)]);
        assert_eq!(e.total_modifier(), 5);

        let e = parse("3d8-2").unwrap();
        assert_eq!(e.groups, vec![group(3, 8, -2)]);
        assert_eq!(e.total_modifier(), -2);
    }

    #[test]
    fn scenario_1_two_groups_and_standalone_modifier() {
        let e = parse("2d6+1d4+3").unwrap();
        assert_eq!(e.groups, vec![group(2, 6, 0), group(1, 4, 0)]);
        assert_eq!(e.modifiers, vec![3]);
        assert_eq!(e.total_modifier(), 3);
        assert!(!e.has_advantage);
    }

    #[test]
    fn parses_more_multi_group_examples() {
        let e = parse("1d8+2d6+5").unwrap();
        assert_eq!(e.groups, vec![group(1, 8, 0), group(2, 6, 0)]);
        assert_eq!(e.modifiers, vec![5]);

        let e = parse("1d10+1d6-2").unwrap();
        assert_eq!(e.groups, vec![group(1, 10, 0), group(1, 6, 0)]);
        assert_eq!(e.modifiers, vec![-2]);
    }

    #[test]
    fn parses_advantage_and_disadvantage_flags() {
        let e = parse("1d20a").unwrap();
        assert!(e.has_advantage && !e.has_disadvantage);
        assert_eq!(e.groups, vec![group(1, 20, 0)]);

        let e = parse("1d20d").unwrap();
        assert!(!e.has_advantage && e.has_disadvantage);

        let e = parse("2d6+3a").unwrap();
        assert!(e.has_advantage);
        assert_eq!(e.groups, vec![group(2, 6, 3)]);
        assert_eq!(e.modifiers, Vec::<i64>::new());
    }

    #[test]
    fn original_text_is_preserved_verbatim() {
        let e = parse("  1d20 + 5 ").unwrap();
        assert_eq!(e.original_text, "  1d20 + 5 ");
    }

    #[test]
    fn rejects_out_of_bounds_counts_and_sides() {
        assert!(matches!(parse("0d6"), Err(ParseError::Validation(_))));
        assert!(matches!(parse("2d0"), Err(ParseError::Validation(_))));
        assert!(matches!(parse("1001d6"), Err(ParseError::Validation(_))));
        assert!(matches!(parse("2d1001"), Err(ParseError::Validation(_))));
    }

    #[test]
    fn rejects_malformed_syntax() {
        for bad in [
            "2d6++1d4",
            "d6+",
            "d20",
            "2d",
            "2x6",
            "1d20ad",
            "",
            "   ",
            "+2d6",
            "2d6+",
        ] {
            let result = parse(bad);
            assert!(result.is_err(), "expected '{}' to be rejected", bad);
        }
    }

    #[test]
    fn missing_sides_is_invalid_expression_not_validation() {
        assert!(matches!(parse("2d"), Err(ParseError::InvalidExpression(_))));
        assert!(matches!(parse("10d"), Err(ParseError::InvalidExpression(_))));
    }

    #[test]
    fn rejects_expression_with_no_dice_group() {
        assert!(matches!(parse("5"), Err(ParseError::Validation(_))));
        assert!(matches!(parse("3+2"), Err(ParseError::Validation(_))));
    }

    #[test]
    fn doubled_dice_doubles_count_not_modifier() {
        let e = parse("1d8+3").unwrap();
        let doubled = e.doubled_dice();
        assert_eq!(doubled.groups, vec![group(2, 8, 3)]);
    }

    #[test]
    fn boundary_1000d1000_is_accepted() {
        let e = parse("1000d1000").unwrap();
        assert_eq!(e.groups, vec![group(1000, 1000, 0)]);
    }
}
