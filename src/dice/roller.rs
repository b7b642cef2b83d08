//! Dice evaluation (spec §4.2): turns a parsed `DiceExpression` into a
//! `RollResult` by sampling from an injected RNG, plus the no-roll
//! `GetStatistics` auxiliary.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::expression::DiceExpression;
use crate::rng::DiceRng;

/// The outcome of evaluating a `DiceExpression` (spec §3 `RollResult`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RollResult {
    pub expression: String,
    pub individual_rolls: Vec<u32>,
    pub rolls_by_group: BTreeMap<String, Vec<u32>>,
    pub subtotals_by_group: BTreeMap<String, i64>,
    pub total_modifier: i64,
    pub final_total: i64,
    pub is_advantage: bool,
    pub is_disadvantage: bool,
    /// Present iff `is_advantage || is_disadvantage`: the two independent
    /// nested rolls, in the order they were rolled.
    pub advantage_roll_results: Option<Vec<RollResult>>,
}

/// Evaluate `expression` against `rng`, applying advantage/disadvantage
/// if the expression carries either flag (spec §4.2 step 1).
pub fn roll(expression: &DiceExpression, rng: &mut dyn DiceRng) -> RollResult {
    if expression.has_advantage || expression.has_disadvantage {
        let first = roll_once(expression, rng);
        let second = roll_once(expression, rng);
        let selected = if expression.has_advantage {
            if first.final_total >= second.final_total {
                &first
            } else {
                &second
            }
        } else if first.final_total <= second.final_total {
            &first
        } else {
            &second
        };
        RollResult {
            expression: expression.original_text.clone(),
            individual_rolls: selected.individual_rolls.clone(),
            rolls_by_group: selected.rolls_by_group.clone(),
            subtotals_by_group: selected.subtotals_by_group.clone(),
            total_modifier: selected.total_modifier,
            final_total: selected.final_total,
            is_advantage: expression.has_advantage,
            is_disadvantage: expression.has_disadvantage,
            advantage_roll_results: Some(vec![first, second]),
        }
    } else {
        roll_once(expression, rng)
    }
}

/// One non-advantaged evaluation of `expression` (spec §4.2 steps 2-4).
fn roll_once(expression: &DiceExpression, rng: &mut dyn DiceRng) -> RollResult {
    let mut individual_rolls = Vec::new();
    let mut rolls_by_group: BTreeMap<String, Vec<u32>> = BTreeMap::new();
    let mut subtotals_by_group: BTreeMap<String, i64> = BTreeMap::new();

    for group in &expression.groups {
        let key = group.key();
        let outcomes: Vec<u32> = (0..group.count).map(|_| rng.roll_die(group.sides)).collect();
        individual_rolls.extend(outcomes.iter().copied());

        let outcomes_sum: i64 = outcomes.iter().map(|&v| v as i64).sum();
        rolls_by_group.entry(key.clone()).or_default().extend(outcomes);
        *subtotals_by_group.entry(key).or_insert(0) += outcomes_sum + group.modifier;
    }

    let standalone: i64 = expression.modifiers.iter().sum();
    let total_modifier = expression.total_modifier();
    let final_total: i64 = subtotals_by_group.values().sum::<i64>() + standalone;

    RollResult {
        expression: expression.original_text.clone(),
        individual_rolls,
        rolls_by_group,
        subtotals_by_group,
        total_modifier,
        final_total,
        is_advantage: false,
        is_disadvantage: false,
        advantage_roll_results: None,
    }
}

/// Bounds + central tendency of `expression`'s total, computed without
/// rolling (spec §4.2 "Statistics").
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DiceStatistics {
    pub min: i64,
    pub max: i64,
    pub mean: f64,
}

/// `min`/`max` are exact even under advantage/disadvantage (both extremes
/// of a single roll remain reachable by either of the two rolls). `mean`
/// under advantage/disadvantage is reported as the single-roll mean — an
/// approximation of the true order-statistic mean, which would require
/// enumerating the joint distribution of a (possibly very large)
/// multi-group sum; see DESIGN.md for the rationale spec §9 explicitly
/// leaves open.
pub fn get_statistics(expression: &DiceExpression) -> DiceStatistics {
    let mut min: i64 = 0;
    let mut max: i64 = 0;
    let mut mean: f64 = 0.0;

    for group in &expression.groups {
        let n = group.count as i64;
        let s = group.sides as i64;
        min += n * 1 + group.modifier;
        max += n * s + group.modifier;
        mean += n as f64 * (s as f64 + 1.0) / 2.0 + group.modifier as f64;
    }

    let standalone: i64 = expression.modifiers.iter().sum();
    min += standalone;
    max += standalone;
    mean += standalone as f64;

    DiceStatistics { min, max, mean }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dice::expression::parse;
    use crate::rng::seeded_rng;

    #[test]
    fn roll_stays_within_group_bounds() {
        let expr = parse("3d6+2").unwrap();
        let mut rng = seeded_rng(1);
        let result = roll(&expr, &mut rng);
        assert_eq!(result.individual_rolls.len(), 3);
        for v in &result.individual_rolls {
            assert!((1..=6).contains(v));
        }
        assert_eq!(result.total_modifier, 2);
        let raw_sum: i64 = result.individual_rolls.iter().map(|&v| v as i64).sum();
        assert_eq!(result.final_total, raw_sum + 2);
    }

    #[test]
    fn same_seed_produces_equal_results() {
        let expr = parse("2d6+1d4+3").unwrap();
        let mut rng_a = seeded_rng(99);
        let mut rng_b = seeded_rng(99);
        assert_eq!(roll(&expr, &mut rng_a), roll(&expr, &mut rng_b));
    }

    #[test]
    fn advantage_picks_higher_total() {
        let expr = parse("1d20a").unwrap();
        let mut rng = seeded_rng(5);
        let result = roll(&expr, &mut rng);
        assert!(result.is_advantage);
        let nested = result.advantage_roll_results.unwrap();
        assert_eq!(nested.len(), 2);
        assert_eq!(
            result.final_total,
            nested[0].final_total.max(nested[1].final_total)
        );
        assert_eq!(result.individual_rolls.len(), 1);
    }

    #[test]
    fn disadvantage_picks_lower_total() {
        let expr = parse("1d20d").unwrap();
        let mut rng = seeded_rng(123);
        let result = roll(&expr, &mut rng);
        assert!(result.is_disadvantage);
        let nested = result.advantage_roll_results.unwrap();
        assert_eq!(
            result.final_total,
            nested[0].final_total.min(nested[1].final_total)
        );
    }

    #[test]
    fn one_d_one_always_totals_one() {
        let expr = parse("1d1").unwrap();
        let mut rng = seeded_rng(77);
        let result = roll(&expr, &mut rng);
        assert_eq!(result.final_total, 1);
    }

    #[test]
    fn statistics_match_spec_formula() {
        let expr = parse("2d6+3").unwrap();
        let stats = get_statistics(&expr);
        assert_eq!(stats.min, 2 * 1 + 3);
        assert_eq!(stats.max, 2 * 6 + 3);
        assert_eq!(stats.mean, 2.0 * 3.5 + 3.0);
    }

    #[test]
    fn statistics_bound_every_possible_roll() {
        let expr = parse("2d6+1d4+3").unwrap();
        let stats = get_statistics(&expr);
        let mut rng = seeded_rng(4242);
        for _ in 0..200 {
            let result = roll(&expr, &mut rng);
            assert!(result.final_total >= stats.min);
            assert!(result.final_total <= stats.max);
        }
    }

    #[test]
    fn shared_group_keys_concatenate() {
        let expr = parse("1d6+1d6").unwrap();
        let mut rng = seeded_rng(3);
        let result = roll(&expr, &mut rng);
        assert_eq!(result.rolls_by_group.get("1d6").unwrap().len(), 2);
    }
}
