//! Nutrition target calculator
//!
//! Pure derivation of daily nutrition targets from a biometric profile.
//! Deterministic, no I/O, no side effects. Users without a profile receive
//! a fixed default bundle; users with partial profiles receive documented
//! per-field defaults before the calculation runs.

use macroplan_domain::{ActivityLevel, GoalTargets, MainGoal, UserProfile};

const DEFAULT_WEIGHT_KG: f64 = 70.0;
const DEFAULT_HEIGHT_CM: f64 = 170.0;
const DEFAULT_AGE: i32 = 25;

const MIN_CALORIES: i32 = 1200;
const MIN_PROTEIN_G: i32 = 50;
const MIN_FIBER_G: i32 = 25;
const MIN_WATER_ML: i32 = 2000;
const SODIUM_MG: i32 = 2300;

/// Fixed targets returned when no profile exists at all.
const DEFAULT_TARGETS: GoalTargets = GoalTargets {
    calories: 2000,
    protein_g: 150,
    carbs_g: 250,
    fats_g: 67,
    fiber_g: 25,
    sodium_mg: SODIUM_MG,
    sugar_g: 50,
    water_ml: 2500,
};

/// Compute daily nutrition targets for a user.
///
/// Absent profile returns the fixed default bundle. Otherwise the targets
/// derive from the Mifflin-St Jeor basal metabolic rate, scaled by activity
/// level, adjusted by the main goal, and split into macros.
pub fn compute(profile: Option<&UserProfile>) -> GoalTargets {
    let Some(profile) = profile else {
        return DEFAULT_TARGETS;
    };

    let weight = profile.weight_kg.unwrap_or(DEFAULT_WEIGHT_KG);
    let height = profile.height_cm.unwrap_or(DEFAULT_HEIGHT_CM);
    let age = profile.age.unwrap_or(DEFAULT_AGE);

    let sex_offset = if is_male(profile.sex.as_deref()) { 5.0 } else { -161.0 };
    let bmr = 10.0 * weight + 6.25 * height - 5.0 * f64::from(age) + sex_offset;

    // Missing or unrecognized activity levels count as moderate
    let activity = profile.activity_level.unwrap_or(ActivityLevel::Moderate);
    let tdee = bmr * activity_multiplier(activity);

    let goal = profile.main_goal.unwrap_or(MainGoal::Maintenance);
    let adjusted = match goal {
        MainGoal::WeightLoss => tdee - 500.0,
        MainGoal::WeightGain => tdee + 300.0,
        MainGoal::SportsPerformance => tdee + 200.0,
        MainGoal::Maintenance => tdee,
    };
    let calories = (adjusted.round() as i32).max(MIN_CALORIES);
    let cal = f64::from(calories);

    let keto = profile
        .dietary_style
        .as_deref()
        .map(|style| style.to_lowercase().contains("keto"))
        .unwrap_or(false);

    let (protein, carbs, fats) = if goal == MainGoal::SportsPerformance {
        (weight * 2.0, cal * 0.55 / 4.0, cal * 0.25 / 9.0)
    } else if keto {
        (weight * 1.6, cal * 0.05 / 4.0, cal * 0.75 / 9.0)
    } else {
        (weight * 1.6, cal * 0.45 / 4.0, cal * 0.30 / 9.0)
    };

    let mut water = weight * 35.0;
    if activity == ActivityLevel::High {
        water += 500.0;
    }

    GoalTargets {
        calories,
        protein_g: (protein.round() as i32).max(MIN_PROTEIN_G),
        carbs_g: carbs.round() as i32,
        fats_g: fats.round() as i32,
        fiber_g: ((cal / 80.0).round() as i32).max(MIN_FIBER_G),
        sodium_mg: SODIUM_MG,
        sugar_g: (cal * 0.10 / 4.0).round() as i32,
        water_ml: (water.round() as i32).max(MIN_WATER_ML),
    }
}

fn activity_multiplier(level: ActivityLevel) -> f64 {
    match level {
        ActivityLevel::None => 1.2,
        ActivityLevel::Light => 1.375,
        ActivityLevel::Moderate => 1.55,
        ActivityLevel::High => 1.725,
    }
}

/// Sex classification for the basal-rate offset.
///
/// Case-insensitive match against a "male" marker. A value that also
/// carries a female marker classifies female, as does anything else.
fn is_male(sex: Option<&str>) -> bool {
    match sex {
        Some(value) => {
            let lower = value.trim().to_lowercase();
            lower.contains("male") && !lower.contains("female")
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile() -> UserProfile {
        UserProfile {
            id: "profile-1".into(),
            user_id: "user-1".into(),
            weight_kg: Some(70.0),
            height_cm: Some(170.0),
            age: Some(25),
            sex: Some("male".into()),
            activity_level: Some(ActivityLevel::Moderate),
            main_goal: Some(MainGoal::WeightLoss),
            dietary_style: None,
            created_at: 1_750_000_000,
            updated_at: 1_750_000_000,
        }
    }

    #[test]
    fn absent_profile_returns_fixed_defaults() {
        let targets = compute(None);
        assert_eq!(targets.calories, 2000);
        assert_eq!(targets.protein_g, 150);
        assert_eq!(targets.carbs_g, 250);
        assert_eq!(targets.fats_g, 67);
        assert_eq!(targets.fiber_g, 25);
        assert_eq!(targets.sodium_mg, 2300);
        assert_eq!(targets.sugar_g, 50);
        assert_eq!(targets.water_ml, 2500);
    }

    #[test]
    fn worked_example_moderate_male_weight_loss() {
        // bmr = 10*70 + 6.25*170 - 5*25 + 5 = 1642.5
        // tdee = 1642.5 * 1.55 = 2545.875; weight loss -500 -> 2046 kcal
        let targets = compute(Some(&profile()));
        assert_eq!(targets.calories, 2046);
        assert_eq!(targets.protein_g, 112); // 70 * 1.6
        assert_eq!(targets.carbs_g, 230); // 45% of calories / 4
        assert_eq!(targets.fats_g, 68); // 30% of calories / 9
        assert_eq!(targets.water_ml, 2450); // 70 * 35
        assert_eq!(targets.fiber_g, 26); // round(2046 / 80)
        assert_eq!(targets.sugar_g, 51); // round(2046 * 0.10 / 4)
        assert_eq!(targets.sodium_mg, 2300);
    }

    #[test]
    fn missing_numeric_fields_use_biometric_defaults() {
        let mut partial = profile();
        partial.weight_kg = None;
        partial.height_cm = None;
        partial.age = None;
        // Same biometrics as the worked example once defaults apply
        assert_eq!(compute(Some(&partial)), compute(Some(&profile())));
    }

    #[test]
    fn unknown_sex_takes_female_offset() {
        let mut p = profile();
        p.sex = Some("unspecified".into());
        let unknown = compute(Some(&p));
        p.sex = Some("Female".into());
        let female = compute(Some(&p));
        assert_eq!(unknown.calories, female.calories);

        p.sex = Some("MALE".into());
        let male = compute(Some(&p));
        assert!(male.calories > female.calories);
    }

    #[test]
    fn female_marker_is_not_misread_as_male() {
        let mut p = profile();
        p.sex = Some("female".into());
        let female = compute(Some(&p));
        p.sex = None;
        let absent = compute(Some(&p));
        assert_eq!(female.calories, absent.calories);
    }

    #[test]
    fn missing_activity_level_defaults_to_moderate() {
        let mut p = profile();
        p.activity_level = None;
        assert_eq!(compute(Some(&p)), compute(Some(&profile())));
    }

    #[test]
    fn sports_performance_macro_split() {
        let mut p = profile();
        p.main_goal = Some(MainGoal::SportsPerformance);
        let targets = compute(Some(&p));
        // tdee + 200 = 2745.875 -> 2746 kcal
        assert_eq!(targets.calories, 2746);
        assert_eq!(targets.protein_g, 140); // 70 * 2.0
        assert_eq!(targets.carbs_g, (2746.0_f64 * 0.55 / 4.0).round() as i32);
        assert_eq!(targets.fats_g, (2746.0_f64 * 0.25 / 9.0).round() as i32);
    }

    #[test]
    fn keto_dietary_style_macro_split() {
        let mut p = profile();
        p.main_goal = Some(MainGoal::Maintenance);
        p.dietary_style = Some("Keto (strict)".into());
        let targets = compute(Some(&p));
        assert_eq!(targets.calories, 2546); // tdee rounded
        assert_eq!(targets.protein_g, 112);
        assert_eq!(targets.carbs_g, (2546.0_f64 * 0.05 / 4.0).round() as i32);
        assert_eq!(targets.fats_g, (2546.0_f64 * 0.75 / 9.0).round() as i32);
    }

    #[test]
    fn high_activity_adds_water_bonus() {
        let mut p = profile();
        p.activity_level = Some(ActivityLevel::High);
        let targets = compute(Some(&p));
        assert_eq!(targets.water_ml, 2950); // 70 * 35 + 500
    }

    #[test]
    fn calorie_floor_applies_to_small_deficits() {
        let mut p = profile();
        p.weight_kg = Some(40.0);
        p.height_cm = Some(140.0);
        p.age = Some(80);
        p.sex = Some("female".into());
        p.activity_level = Some(ActivityLevel::None);
        let targets = compute(Some(&p));
        assert_eq!(targets.calories, 1200);
    }

    #[test]
    fn protein_and_water_floors_apply() {
        let mut p = profile();
        p.weight_kg = Some(25.0);
        let targets = compute(Some(&p));
        assert_eq!(targets.protein_g, 50); // 25 * 1.6 = 40 floored
        assert_eq!(targets.water_ml, 2000); // 25 * 35 = 875 floored
    }

    #[test]
    fn all_outputs_are_strictly_positive() {
        let cases = [
            None,
            Some(profile()),
            Some(UserProfile { user_id: "empty".into(), ..UserProfile::default() }),
        ];
        for case in &cases {
            let targets = compute(case.as_ref());
            assert!(targets.calories > 0);
            assert!(targets.protein_g > 0);
            assert!(targets.carbs_g > 0);
            assert!(targets.fats_g > 0);
            assert!(targets.fiber_g > 0);
            assert!(targets.sodium_mg > 0);
            assert!(targets.sugar_g > 0);
            assert!(targets.water_ml > 0);
        }
    }
}
