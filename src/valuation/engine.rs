//! The pricing rule.
//!
//! ```text
//! base  = base_price - per_year_decrement * years
//!       + male_bonus          (if Male)
//!       - condition_penalty   (if "healthy" is not among the conditions)
//! price = max(base + perturbation, floor)
//! ```
//!
//! Everything except the perturbation draw is a pure function of the inputs.

use tracing::debug;

use crate::domain::{
    Age, AnimalObservation, ConditionSet, PricedObservation, PricingConfig, Sex, ValuationInput,
};
use crate::error::ValuationError;
use crate::valuation::perturbation::PerturbationSource;

#[derive(Debug, Clone, Default)]
pub struct ValuationEngine {
    config: PricingConfig,
}

impl ValuationEngine {
    pub fn new(config: PricingConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PricingConfig {
        &self.config
    }

    /// Price before perturbation and floor.
    pub fn base_price(
        &self,
        sex: Sex,
        age: &Age,
        conditions: &ConditionSet,
    ) -> Result<i64, ValuationError> {
        let years = age_in_years(age)?;
        let c = &self.config;

        let mut base = c
            .per_year_decrement
            .checked_mul(i64::from(years))
            .and_then(|decrement| c.base_price.checked_sub(decrement))
            .ok_or(ValuationError::Overflow)?;
        if sex == Sex::Male {
            base = base.checked_add(c.male_bonus).ok_or(ValuationError::Overflow)?;
        }
        if !conditions.is_healthy() {
            base = base
                .checked_sub(c.condition_penalty)
                .ok_or(ValuationError::Overflow)?;
        }
        Ok(base)
    }

    pub fn price<P>(
        &self,
        sex: Sex,
        age: &Age,
        conditions: &ConditionSet,
        noise: &mut P,
    ) -> Result<i64, ValuationError>
    where
        P: PerturbationSource + ?Sized,
    {
        let base = self.base_price(sex, age, conditions)?;
        let n = noise.draw(self.config.perturbation_spread);
        let price = base.checked_add(n).ok_or(ValuationError::Overflow)?.max(self.config.floor);
        debug!(?sex, %age, base, perturbation = n, price, "priced");
        Ok(price)
    }

    /// Price an age given as a raw label such as `"10Y"` or `"4"`.
    pub fn price_label<P>(
        &self,
        sex: Sex,
        age: &str,
        conditions: &ConditionSet,
        noise: &mut P,
    ) -> Result<i64, ValuationError>
    where
        P: PerturbationSource + ?Sized,
    {
        let years = parse_years(age)?;
        self.price(sex, &Age::Years(f64::from(years)), conditions, noise)
    }

    pub fn price_input<P>(
        &self,
        input: ValuationInput,
        noise: &mut P,
    ) -> Result<PricedObservation, ValuationError>
    where
        P: PerturbationSource + ?Sized,
    {
        let price = self.price(input.sex, &input.age, &input.health, noise)?;
        Ok(PricedObservation { input, price })
    }

    /// Price a normalized observation. Fails if its sex or age is unknown.
    pub fn price_observation<P>(
        &self,
        observation: &AnimalObservation,
        noise: &mut P,
    ) -> Result<PricedObservation, ValuationError>
    where
        P: PerturbationSource + ?Sized,
    {
        let sex = observation.sex.known().ok_or(ValuationError::UnknownSex)?;
        let input = ValuationInput {
            sex,
            age: observation.age,
            health: observation.conditions.clone(),
        };
        self.price_input(input, noise)
    }
}

/// Whole number of years carried by an age, or `InvalidAge`.
pub fn age_in_years(age: &Age) -> Result<u32, ValuationError> {
    match age {
        Age::Bucket(bucket) => Ok(u32::from(bucket.years())),
        Age::Years(years)
            if years.is_finite()
                && *years >= 0.0
                && years.fract() == 0.0
                && *years <= f64::from(u32::MAX) =>
        {
            Ok(*years as u32)
        }
        other => Err(ValuationError::InvalidAge {
            age: other.to_string(),
        }),
    }
}

/// Parse a year count from a label, stripping a trailing unit suffix (`Y`, `y`, `years`).
pub fn parse_years(label: &str) -> Result<u32, ValuationError> {
    let trimmed = label.trim();
    let digits = ["years", "year", "yrs", "y", "Y"]
        .iter()
        .find_map(|suffix| trimmed.strip_suffix(suffix))
        .unwrap_or(trimmed)
        .trim();

    digits.parse::<u32>().map_err(|_| ValuationError::InvalidAge {
        age: label.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;
    use crate::domain::{AgeBucket, SexCall};
    use crate::valuation::FixedPerturbation;

    fn bucket(years: u8) -> Age {
        Age::Bucket(AgeBucket::new(years).unwrap())
    }

    fn conditions(labels: &[&str]) -> ConditionSet {
        ConditionSet::from_labels(labels.iter().copied())
    }

    #[test]
    fn young_healthy_female_without_noise() {
        let engine = ValuationEngine::default();
        let price = engine
            .price_label(Sex::Female, "1Y", &ConditionSet::healthy(), &mut FixedPerturbation(0))
            .unwrap();
        assert_eq!(price, 4700);
    }

    #[test]
    fn male_with_condition_without_noise() {
        let engine = ValuationEngine::default();
        let price = engine
            .price_label(Sex::Male, "10Y", &conditions(&["Dermatitis"]), &mut FixedPerturbation(0))
            .unwrap();
        assert_eq!(price, 1700);
    }

    #[test]
    fn floor_clamps_old_sick_female() {
        let engine = ValuationEngine::default();
        let price = engine
            .price(
                Sex::Female,
                &bucket(15),
                &conditions(&["Respiratory"]),
                &mut FixedPerturbation(-200),
            )
            .unwrap();
        assert_eq!(price, 1000);
    }

    #[test]
    fn sex_bonus_is_isolated() {
        let engine = ValuationEngine::default();
        // Past 13Y the female price sits on the floor.
        for years in 1..=13 {
            let male = engine
                .price(Sex::Male, &bucket(years), &ConditionSet::healthy(), &mut FixedPerturbation(0))
                .unwrap();
            let female = engine
                .price(Sex::Female, &bucket(years), &ConditionSet::healthy(), &mut FixedPerturbation(0))
                .unwrap();
            assert_eq!(male - female, 200, "age {years}Y");
        }
    }

    #[test]
    fn floor_absorbs_sex_bonus_for_old_animals() {
        let engine = ValuationEngine::default();
        let healthy = ConditionSet::healthy();
        // 14Y: female base 800, male base 1000. 15Y: 500 and 700.
        for years in [14, 15] {
            let male = engine
                .price(Sex::Male, &bucket(years), &healthy, &mut FixedPerturbation(0))
                .unwrap();
            let female = engine
                .price(Sex::Female, &bucket(years), &healthy, &mut FixedPerturbation(0))
                .unwrap();
            assert_eq!((male, female), (1000, 1000), "age {years}Y");
        }
        assert_eq!(
            engine.base_price(Sex::Male, &bucket(14), &healthy).unwrap()
                - engine.base_price(Sex::Female, &bucket(14), &healthy).unwrap(),
            200
        );
    }

    #[test]
    fn sex_bonus_survives_seeded_noise() {
        let engine = ValuationEngine::default();
        let healthy = ConditionSet::healthy();
        // Up to 12Y neither price can reach the floor, even at -200.
        for years in 1..=12 {
            for seed in 0..20u64 {
                let male_seed = seed;
                let female_seed = seed + 1000;
                let male = engine
                    .price(Sex::Male, &bucket(years), &healthy, &mut StdRng::seed_from_u64(male_seed))
                    .unwrap();
                let female = engine
                    .price(Sex::Female, &bucket(years), &healthy, &mut StdRng::seed_from_u64(female_seed))
                    .unwrap();
                let male_draw = StdRng::seed_from_u64(male_seed).draw(200);
                let female_draw = StdRng::seed_from_u64(female_seed).draw(200);
                assert_eq!(male - female - 200, male_draw - female_draw, "age {years}Y seed {seed}");
            }
        }
    }

    #[test]
    fn oversized_constants_are_an_error_not_a_panic() {
        let engine = ValuationEngine::new(PricingConfig {
            base_price: i64::MAX,
            ..PricingConfig::default()
        });
        assert!(engine.config().validate().is_ok());

        let healthy = ConditionSet::healthy();
        assert_eq!(
            engine.price_label(Sex::Male, "0Y", &healthy, &mut FixedPerturbation(0)),
            Err(ValuationError::Overflow)
        );
        assert_eq!(
            engine.price_label(Sex::Female, "0Y", &healthy, &mut FixedPerturbation(200)),
            Err(ValuationError::Overflow)
        );
        assert_eq!(
            engine.price_label(Sex::Female, "0Y", &healthy, &mut FixedPerturbation(0)),
            Ok(i64::MAX)
        );

        let engine = ValuationEngine::new(PricingConfig {
            per_year_decrement: i64::MAX,
            ..PricingConfig::default()
        });
        assert_eq!(
            engine.price_label(Sex::Female, "3Y", &healthy, &mut FixedPerturbation(0)),
            Err(ValuationError::Overflow)
        );
    }

    #[test]
    fn same_seed_same_price() {
        let engine = ValuationEngine::default();
        let health = conditions(&["lumpy", "Skin"]);
        let a = engine
            .price(Sex::Male, &bucket(4), &health, &mut StdRng::seed_from_u64(99))
            .unwrap();
        let b = engine
            .price(Sex::Male, &bucket(4), &health, &mut StdRng::seed_from_u64(99))
            .unwrap();
        assert_eq!(a, b);
        // 5000 - 4 * 300 + 200 - 500
        assert!((3300..=3700).contains(&a));
    }

    #[test]
    fn invalid_ages_are_errors_not_prices() {
        let engine = ValuationEngine::default();
        let healthy = ConditionSet::healthy();
        let mut noise = FixedPerturbation(0);

        for label in ["", "Y", "abc", "-3Y", "2.5Y", "Unknown"] {
            let err = engine
                .price_label(Sex::Female, label, &healthy, &mut noise)
                .unwrap_err();
            assert!(matches!(err, ValuationError::InvalidAge { .. }), "{label}");
        }
        assert!(engine.price(Sex::Female, &Age::Unknown, &healthy, &mut noise).is_err());
        assert!(engine.price(Sex::Female, &Age::Years(2.5), &healthy, &mut noise).is_err());
        assert_eq!(
            engine.price(Sex::Female, &Age::Years(2.0), &healthy, &mut noise),
            Ok(4400)
        );
    }

    #[test]
    fn unit_suffixes_are_stripped() {
        assert_eq!(parse_years("7Y"), Ok(7));
        assert_eq!(parse_years("7y"), Ok(7));
        assert_eq!(parse_years("7 years"), Ok(7));
        assert_eq!(parse_years(" 12 "), Ok(12));
        assert_eq!(parse_years("0Y"), Ok(0));
    }

    #[test]
    fn observation_with_unknown_sex_is_rejected() {
        let engine = ValuationEngine::default();
        let observation = AnimalObservation {
            animal_id: "A-1".to_string(),
            timestamp: chrono::Utc::now(),
            breed: crate::domain::Breed::Unknown,
            breed_confidence: crate::domain::Confidence::ZERO,
            age: bucket(3),
            sex: SexCall::Unknown,
            conditions: ConditionSet::healthy(),
            findings: Vec::new(),
        };
        assert_eq!(
            engine.price_observation(&observation, &mut FixedPerturbation(0)),
            Err(ValuationError::UnknownSex)
        );

        let observation = AnimalObservation {
            sex: SexCall::Male,
            ..observation
        };
        let priced = engine
            .price_observation(&observation, &mut FixedPerturbation(0))
            .unwrap();
        assert_eq!(priced.price, 5000 - 900 + 200);
        assert_eq!(priced.input.sex, Sex::Male);
    }

    #[test]
    fn alternate_constants_are_honoured() {
        let engine = ValuationEngine::new(PricingConfig {
            base_price: 800,
            floor: 50,
            ..PricingConfig::default()
        });
        let price = engine
            .price(Sex::Female, &bucket(2), &ConditionSet::healthy(), &mut FixedPerturbation(0))
            .unwrap();
        assert_eq!(price, 200);
    }
}
