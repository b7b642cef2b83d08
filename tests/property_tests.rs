// Property-Based Tests for Dice and Combat Invariants
//
// These tests use proptest to validate that the quantified invariants in
// spec §8 hold across a wide range of generated dice expressions and
// combatant rosters, not just the handful of fixed examples covered by
// the unit tests alongside each module.

use proptest::prelude::*;

use combat_core::combat::{
    compute_order, Combatant, CombatantSpec, CombatantType, CombatEncounter, EncounterRepository,
    InMemoryEncounterRepository,
};
use combat_core::dice::{get_statistics, parse, roll};
use combat_core::rng::seeded_rng;
use uuid::Uuid;

/// Build `"NdS+NdS+...+m1-m2"` text for a set of groups and standalone
/// modifiers, with no inline per-group modifier (kept out to avoid the
/// sign-attachment ambiguity the parser resolves only for the first
/// group — see `dice::expression`'s module doc).
fn build_expression_text(groups: &[(u32, u32)], modifiers: &[i64]) -> String {
    let mut text = String::new();
    for (i, (count, sides)) in groups.iter().enumerate() {
        if i > 0 {
            text.push('+');
        }
        text.push_str(&format!("{}d{}", count, sides));
    }
    for m in modifiers {
        if *m >= 0 {
            text.push('+');
            text.push_str(&m.to_string());
        } else {
            text.push('-');
            text.push_str(&(-m).to_string());
        }
    }
    text
}

fn groups_strategy() -> impl Strategy<Value = Vec<(u32, u32)>> {
    prop::collection::vec((1u32..=20, 1u32..=20), 1..=4)
}

fn modifiers_strategy() -> impl Strategy<Value = Vec<i64>> {
    prop::collection::vec(-20i64..=20, 0..=3)
}

proptest! {
    /// Spec §8: "every value in r.individualRolls lies in [1, S] for its
    /// originating group" and "r.finalTotal = Σ subtotalsByGroup + Σ
    /// standalone modifiers".
    #[test]
    fn prop_roll_stays_within_group_bounds_and_total_matches_formula(
        groups in groups_strategy(),
        modifiers in modifiers_strategy(),
        seed in any::<u64>(),
    ) {
        let text = build_expression_text(&groups, &modifiers);
        let expr = parse(&text).expect("generated text must conform to the grammar");
        let mut rng = seeded_rng(seed);
        let result = roll(&expr, &mut rng);

        let mut cursor = 0usize;
        for (count, sides) in &groups {
            let slice = &result.individual_rolls[cursor..cursor + *count as usize];
            for v in slice {
                prop_assert!((1..=*sides).contains(v));
            }
            cursor += *count as usize;
        }
        prop_assert_eq!(result.individual_rolls.len(), cursor);

        let standalone: i64 = modifiers.iter().sum();
        let expected_total: i64 =
            result.subtotals_by_group.values().sum::<i64>() + standalone;
        prop_assert_eq!(result.final_total, expected_total);
        prop_assert_eq!(result.total_modifier, standalone);
    }

    /// Spec §8: "min_stat(e) <= r.finalTotal <= max_stat(e) (non-advantaged)".
    #[test]
    fn prop_final_total_stays_within_statistics_bounds(
        groups in groups_strategy(),
        modifiers in modifiers_strategy(),
        seed in any::<u64>(),
    ) {
        let text = build_expression_text(&groups, &modifiers);
        let expr = parse(&text).unwrap();
        let stats = get_statistics(&expr);
        let mut rng = seeded_rng(seed);
        let result = roll(&expr, &mut rng);

        prop_assert!(result.final_total >= stats.min);
        prop_assert!(result.final_total <= stats.max);
    }

    /// Spec §8: "under advantage/disadvantage, r.finalTotal =
    /// max/min(r.advantageRollResults[0].finalTotal, [1].finalTotal)".
    #[test]
    fn prop_advantage_and_disadvantage_select_correct_extreme(
        groups in groups_strategy(),
        seed in any::<u64>(),
        advantage in any::<bool>(),
    ) {
        // Advantage/disadvantage only attaches to a body that already
        // parses standalone (dice::expression's open question #2): keep
        // to a single group, matching the one case spec §4.1 documents
        // ("2d6+3a").
        let (count, sides) = groups[0];
        let flag = if advantage { "a" } else { "d" };
        let text = format!("{}d{}{}", count, sides, flag);
        let expr = parse(&text).unwrap();
        prop_assert_eq!(expr.has_advantage, advantage);
        prop_assert_eq!(expr.has_disadvantage, !advantage);

        let mut rng = seeded_rng(seed);
        let result = roll(&expr, &mut rng);
        let nested = result.advantage_roll_results.as_ref().unwrap();
        prop_assert_eq!(nested.len(), 2);

        let expected = if advantage {
            nested[0].final_total.max(nested[1].final_total)
        } else {
            nested[0].final_total.min(nested[1].final_total)
        };
        prop_assert_eq!(result.final_total, expected);
    }

    /// Spec §8: "E.initiativeOrder is a permutation of {c.id | c in
    /// E.combatants}", exercised over arbitrary roster sizes and dex
    /// modifiers rather than the single worked example in §8.
    #[test]
    fn prop_initiative_order_is_a_permutation_of_combatant_ids(
        character_dex in prop::collection::vec(-5i64..=10, 1..=6),
        enemy_dex in prop::collection::vec(-5i64..=10, 1..=6),
        seed in any::<u64>(),
    ) {
        let mut rng = seeded_rng(seed);
        let mut combatants = Vec::new();
        for dex in &character_dex {
            combatants.push(make_combatant(CombatantType::Character, *dex, &mut rng));
        }
        for dex in &enemy_dex {
            combatants.push(make_combatant(CombatantType::Enemy, *dex, &mut rng));
        }

        let order = compute_order(&combatants);
        let mut expected: Vec<Uuid> = combatants.iter().map(|c| c.id).collect();
        let mut got = order.clone();
        expected.sort();
        got.sort();
        prop_assert_eq!(expected, got);
        prop_assert_eq!(order.len(), combatants.len());
    }

    /// Spec §8 monotonicity: "version strictly increases on every
    /// successful save".
    #[test]
    fn prop_version_strictly_increases_across_saves(
        save_count in 1usize..=8,
    ) {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .build()
            .unwrap();
        runtime.block_on(async {
            let mut rng = seeded_rng(1);
            let hero = make_combatant(CombatantType::Character, 2, &mut rng);
            let goblin = make_combatant(CombatantType::Enemy, 1, &mut rng);
            let encounter = CombatEncounter::create(Uuid::new_v4(), vec![hero, goblin]).unwrap();

            let repo = InMemoryEncounterRepository::new();
            repo.create(encounter.clone()).await.unwrap();

            let mut version = 0u64;
            for i in 0..save_count {
                let (mut loaded, loaded_version) = repo.load(encounter.id).await.unwrap();
                prop_assert_eq!(loaded_version, version);
                loaded.current_round = i as u32 + 2;
                repo.save(&loaded, loaded_version).await.unwrap();
                version += 1;
            }

            let (_, final_version) = repo.load(encounter.id).await.unwrap();
            prop_assert_eq!(final_version, version);
            Ok(())
        })?;
    }
}

fn make_combatant(kind: CombatantType, dex: i64, rng: &mut impl rand::RngCore) -> Combatant {
    let (character_id, enemy_id) = match kind {
        CombatantType::Character => (Some(Uuid::new_v4()), None),
        CombatantType::Enemy => (None, Some(Uuid::new_v4())),
    };
    Combatant::new(
        kind,
        CombatantSpec {
            display_name: "Roster Member".to_string(),
            character_id,
            enemy_id,
            max_health: 20,
            armor_class: 14,
            dexterity_modifier: dex,
            attack_modifier: 3,
            weapon_damage_expression: "1d6".to_string(),
            resistant: false,
            vulnerable: false,
            flee_threshold: None,
        },
        rng,
    )
    .unwrap()
}
