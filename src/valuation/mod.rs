//! Valuation engine: `(sex, age, conditions)` to a bounded price.

pub mod engine;
pub mod perturbation;

pub use engine::*;
pub use perturbation::*;

#[cfg(test)]
mod proptests {
    use proptest::prelude::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;
    use crate::domain::{Age, AgeBucket, ConditionSet, Sex};

    const VOCABULARY: [&str; 6] = ["healthy", "Dermatitis", "Ecthym", "Respiratory", "lumpy", "Skin"];

    fn arb_sex() -> impl Strategy<Value = Sex> {
        prop_oneof![Just(Sex::Male), Just(Sex::Female)]
    }

    fn arb_conditions() -> impl Strategy<Value = ConditionSet> {
        proptest::sample::subsequence(VOCABULARY.to_vec(), 0..=3).prop_map(|labels| ConditionSet::from_labels(labels))
    }

    proptest! {
        #[test]
        fn price_never_below_floor(
            sex in arb_sex(),
            years in 1u8..=15,
            conditions in arb_conditions(),
            seed in any::<u64>(),
        ) {
            let engine = ValuationEngine::default();
            let age = Age::Bucket(AgeBucket::new(years).unwrap());
            let price = engine.price(sex, &age, &conditions, &mut StdRng::seed_from_u64(seed)).unwrap();
            prop_assert!(price >= 1000);
        }

        #[test]
        fn price_is_reproducible_for_a_seed(
            sex in arb_sex(),
            years in 1u8..=15,
            conditions in arb_conditions(),
            seed in any::<u64>(),
        ) {
            let engine = ValuationEngine::default();
            let age = Age::Bucket(AgeBucket::new(years).unwrap());
            let a = engine.price(sex, &age, &conditions, &mut StdRng::seed_from_u64(seed)).unwrap();
            let b = engine.price(sex, &age, &conditions, &mut StdRng::seed_from_u64(seed)).unwrap();
            prop_assert_eq!(a, b);
        }

        #[test]
        fn perturbation_stays_within_spread(
            sex in arb_sex(),
            years in 1u8..=10,
            conditions in arb_conditions(),
            seed in any::<u64>(),
        ) {
            // Ages up to 10Y keep the base above floor + spread, so no clamping happens.
            let engine = ValuationEngine::default();
            let age = Age::Bucket(AgeBucket::new(years).unwrap());
            let base = engine.base_price(sex, &age, &conditions).unwrap();
            let price = engine.price(sex, &age, &conditions, &mut StdRng::seed_from_u64(seed)).unwrap();
            prop_assert!((price - base).abs() <= 200);
        }
    }
}
