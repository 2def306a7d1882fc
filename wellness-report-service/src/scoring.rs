//! Deterministic wellness scoring.
//!
//! Pure functions over the session's answers and optional photo attributes.
//! The fallback report path depends on this module producing identical output
//! for identical input, so nothing here touches a clock, RNG or I/O.
//!
//! The numeric tables are product parameters, kept in one place so they can
//! be revised without hunting through the codebase.

use report_flow::{PhotoAnalysis, SkinStatus};
use serde_json::{Map, Value};

/// Result of scoring a session.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Score {
    pub total_score: i32,
    pub age_adjustment_years: i32,
    pub bmi: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SleepBand {
    LessThanFive,
    FiveToSix,
    SevenToEight,
    MoreThanEight,
}

impl SleepBand {
    pub fn from_answer(raw: &str) -> Option<Self> {
        match raw {
            "Less than 5 hours" => Some(Self::LessThanFive),
            "5-6 hours" => Some(Self::FiveToSix),
            "7-8 hours" => Some(Self::SevenToEight),
            "More than 8 hours" => Some(Self::MoreThanEight),
            _ => None,
        }
    }

    fn contribution(self) -> i32 {
        match self {
            Self::LessThanFive => 2,
            Self::FiveToSix => 1,
            Self::SevenToEight => 0,
            Self::MoreThanEight => 1,
        }
    }

    pub fn metric_score(self) -> f64 {
        match self {
            Self::LessThanFive => 30.0,
            Self::FiveToSix => 60.0,
            Self::SevenToEight => 95.0,
            Self::MoreThanEight => 85.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivityBand {
    Rarely,
    OneToTwo,
    ThreeToFour,
    FivePlus,
}

impl ActivityBand {
    pub fn from_answer(raw: &str) -> Option<Self> {
        match raw {
            "Rarely" => Some(Self::Rarely),
            "1-2 times" => Some(Self::OneToTwo),
            "3-4 times" => Some(Self::ThreeToFour),
            "5+ times" => Some(Self::FivePlus),
            _ => None,
        }
    }

    fn contribution(self) -> i32 {
        match self {
            Self::Rarely => 2,
            Self::OneToTwo => 1,
            Self::ThreeToFour => 0,
            Self::FivePlus => -1,
        }
    }

    pub fn metric_score(self) -> f64 {
        match self {
            Self::Rarely => 20.0,
            Self::OneToTwo => 60.0,
            Self::ThreeToFour => 90.0,
            Self::FivePlus => 100.0,
        }
    }
}

/// Daily fruit and vegetable servings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NutritionBand {
    ZeroToOne,
    TwoToThree,
    FourToFive,
    MoreThanFive,
}

impl NutritionBand {
    pub fn from_answer(raw: &str) -> Option<Self> {
        match raw {
            "0-1" => Some(Self::ZeroToOne),
            "2-3" => Some(Self::TwoToThree),
            "4-5" => Some(Self::FourToFive),
            "More than 5" => Some(Self::MoreThanFive),
            _ => None,
        }
    }

    fn contribution(self) -> i32 {
        match self {
            Self::ZeroToOne => 2,
            Self::TwoToThree => 1,
            Self::FourToFive => 0,
            Self::MoreThanFive => -1,
        }
    }

    pub fn metric_score(self) -> f64 {
        match self {
            Self::ZeroToOne => 30.0,
            Self::TwoToThree => 70.0,
            Self::FourToFive => 90.0,
            Self::MoreThanFive => 100.0,
        }
    }
}

/// Processed-food meals per week.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessedFoodBand {
    Rarely,
    OneToTwo,
    ThreeToFour,
    Daily,
}

impl ProcessedFoodBand {
    pub fn from_answer(raw: &str) -> Option<Self> {
        match raw {
            "Rarely" => Some(Self::Rarely),
            "1-2 times" => Some(Self::OneToTwo),
            "3-4 times" => Some(Self::ThreeToFour),
            "Daily" => Some(Self::Daily),
            _ => None,
        }
    }

    fn contribution(self) -> i32 {
        match self {
            Self::Rarely => 0,
            Self::OneToTwo => 1,
            Self::ThreeToFour => 2,
            Self::Daily => 3,
        }
    }

    pub fn metric_score(self) -> f64 {
        match self {
            Self::Rarely => 100.0,
            Self::OneToTwo => 80.0,
            Self::ThreeToFour => 50.0,
            Self::Daily => 20.0,
        }
    }
}

/// Glasses of water per day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HydrationBand {
    OneToThree,
    FourToSix,
    SevenToNine,
    TenPlus,
}

impl HydrationBand {
    pub fn from_answer(raw: &str) -> Option<Self> {
        match raw {
            "1-3 glasses" => Some(Self::OneToThree),
            "4-6 glasses" => Some(Self::FourToSix),
            "7-9 glasses" => Some(Self::SevenToNine),
            "10+ glasses" => Some(Self::TenPlus),
            _ => None,
        }
    }

    fn contribution(self) -> i32 {
        match self {
            Self::OneToThree => 2,
            Self::FourToSix => 1,
            Self::SevenToNine => 0,
            Self::TenPlus => -1,
        }
    }

    pub fn metric_score(self) -> f64 {
        match self {
            Self::OneToThree => 30.0,
            Self::FourToSix => 70.0,
            Self::SevenToNine => 95.0,
            Self::TenPlus => 100.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MindfulnessBand {
    Daily,
    Weekly,
    Occasionally,
    Never,
}

impl MindfulnessBand {
    pub fn from_answer(raw: &str) -> Option<Self> {
        match raw {
            "Daily" => Some(Self::Daily),
            "Weekly" => Some(Self::Weekly),
            "Occasionally" => Some(Self::Occasionally),
            "Never" => Some(Self::Never),
            _ => None,
        }
    }

    fn contribution(self) -> i32 {
        match self {
            Self::Daily => -1,
            Self::Weekly => 0,
            Self::Occasionally => 1,
            Self::Never => 2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoodBand {
    HappyEnergetic,
    GenerallyContent,
    Varies,
    OftenStressedOrSad,
}

impl MoodBand {
    pub fn from_answer(raw: &str) -> Option<Self> {
        match raw {
            "Happy & Energetic" => Some(Self::HappyEnergetic),
            "Generally Content" => Some(Self::GenerallyContent),
            "It varies a lot" => Some(Self::Varies),
            "Often Stressed or Sad" => Some(Self::OftenStressedOrSad),
            _ => None,
        }
    }

    fn contribution(self) -> i32 {
        match self {
            Self::HappyEnergetic => -1,
            Self::GenerallyContent => 0,
            Self::Varies => 1,
            Self::OftenStressedOrSad => 2,
        }
    }
}

/// Alcoholic drinks per week.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlcoholBand {
    None,
    OneToThree,
    FourToSeven,
    EightPlus,
}

impl AlcoholBand {
    pub fn from_answer(raw: &str) -> Option<Self> {
        match raw {
            "0" => Some(Self::None),
            "1-3" => Some(Self::OneToThree),
            "4-7" => Some(Self::FourToSeven),
            "8+" => Some(Self::EightPlus),
            _ => None,
        }
    }

    fn contribution(self) -> i32 {
        match self {
            Self::None => 0,
            Self::OneToThree => 1,
            Self::FourToSeven => 2,
            Self::EightPlus => 3,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SmokingBand {
    Never,
    Quit,
    Occasionally,
    Daily,
}

impl SmokingBand {
    pub fn from_answer(raw: &str) -> Option<Self> {
        match raw {
            "No, never" => Some(Self::Never),
            "Used to, but quit" => Some(Self::Quit),
            "Occasionally" => Some(Self::Occasionally),
            "Yes, daily" => Some(Self::Daily),
            _ => None,
        }
    }

    fn contribution(self) -> i32 {
        match self {
            Self::Never => 0,
            Self::Quit => 1,
            Self::Occasionally => 2,
            Self::Daily => 3,
        }
    }
}

/// Non-work screen time per day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScreenTimeBand {
    LessThanTwo,
    TwoToFour,
    FourToSix,
    MoreThanSix,
}

impl ScreenTimeBand {
    pub fn from_answer(raw: &str) -> Option<Self> {
        match raw {
            "Less than 2 hours" => Some(Self::LessThanTwo),
            "2-4 hours" => Some(Self::TwoToFour),
            "4-6 hours" => Some(Self::FourToSix),
            "More than 6 hours" => Some(Self::MoreThanSix),
            _ => None,
        }
    }

    fn contribution(self) -> i32 {
        match self {
            Self::LessThanTwo => 0,
            Self::TwoToFour => 1,
            Self::FourToSix => 2,
            Self::MoreThanSix => 3,
        }
    }
}

/// Longevity of closest relatives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeneticsBand {
    EightyFivePlus,
    SeventyFiveToEightyFive,
    SixtyFiveToSeventyFive,
    UnderSixtyFive,
}

impl GeneticsBand {
    pub fn from_answer(raw: &str) -> Option<Self> {
        match raw {
            "85+ years" => Some(Self::EightyFivePlus),
            "75-85 years" => Some(Self::SeventyFiveToEightyFive),
            "65-75 years" => Some(Self::SixtyFiveToSeventyFive),
            "<65 years" => Some(Self::UnderSixtyFive),
            _ => None,
        }
    }

    fn contribution(self) -> i32 {
        match self {
            Self::EightyFivePlus => -2,
            Self::SeventyFiveToEightyFive => -1,
            Self::SixtyFiveToSeventyFive => 0,
            Self::UnderSixtyFive => 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChronicBand {
    None,
    Mild,
    Serious,
}

impl ChronicBand {
    pub fn from_answer(raw: &str) -> Option<Self> {
        match raw {
            "None" => Some(Self::None),
            "Mild" => Some(Self::Mild),
            "Serious" => Some(Self::Serious),
            _ => None,
        }
    }

    fn contribution(self) -> i32 {
        match self {
            Self::None => 0,
            Self::Mild => 1,
            Self::Serious => 2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SunProtectionBand {
    DailySpf,
    Sometimes,
    Never,
}

impl SunProtectionBand {
    pub fn from_answer(raw: &str) -> Option<Self> {
        match raw {
            "Daily SPF" => Some(Self::DailySpf),
            "Sometimes" => Some(Self::Sometimes),
            "Never" => Some(Self::Never),
            _ => None,
        }
    }

    fn contribution(self) -> i32 {
        match self {
            Self::DailySpf => -1,
            Self::Sometimes => 0,
            Self::Never => 1,
        }
    }
}

/// Typed view over the raw answer map. Unrecognized keys and unparseable
/// values simply stay `None` and contribute nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct ParsedAnswers {
    pub sleep: Option<SleepBand>,
    pub activity: Option<ActivityBand>,
    pub nutrition: Option<NutritionBand>,
    pub processed_food: Option<ProcessedFoodBand>,
    pub hydration: Option<HydrationBand>,
    pub mindfulness: Option<MindfulnessBand>,
    pub mood: Option<MoodBand>,
    pub alcohol: Option<AlcoholBand>,
    pub smoking: Option<SmokingBand>,
    pub screen_time: Option<ScreenTimeBand>,
    pub genetics: Option<GeneticsBand>,
    pub chronic: Option<ChronicBand>,
    pub sun_protection: Option<SunProtectionBand>,
    pub stress: Option<i64>,
    pub height_cm: Option<f64>,
    pub weight_kg: Option<f64>,
}

impl ParsedAnswers {
    pub fn from_map(answers: &Map<String, Value>) -> Self {
        fn banded<T>(
            answers: &Map<String, Value>,
            key: &str,
            parse: fn(&str) -> Option<T>,
        ) -> Option<T> {
            answers.get(key).and_then(Value::as_str).and_then(parse)
        }

        Self {
            sleep: banded(answers, "sleep", SleepBand::from_answer),
            activity: banded(answers, "activity", ActivityBand::from_answer),
            nutrition: banded(answers, "nutrition", NutritionBand::from_answer),
            processed_food: banded(answers, "processed_food", ProcessedFoodBand::from_answer),
            hydration: banded(answers, "hydration", HydrationBand::from_answer),
            mindfulness: banded(answers, "mindfulness", MindfulnessBand::from_answer),
            mood: banded(answers, "mood", MoodBand::from_answer),
            alcohol: banded(answers, "alcohol", AlcoholBand::from_answer),
            smoking: banded(answers, "smoking", SmokingBand::from_answer),
            screen_time: banded(answers, "screen_time", ScreenTimeBand::from_answer),
            genetics: banded(answers, "genetics", GeneticsBand::from_answer),
            chronic: banded(answers, "chronic", ChronicBand::from_answer),
            sun_protection: banded(answers, "sun_protection", SunProtectionBand::from_answer),
            stress: answer_i64(answers, "stress"),
            height_cm: answer_f64(answers, "height"),
            weight_kg: answer_f64(answers, "weight"),
        }
    }

    fn table_contribution(&self) -> i32 {
        self.sleep.map_or(0, SleepBand::contribution)
            + self.activity.map_or(0, ActivityBand::contribution)
            + self.nutrition.map_or(0, NutritionBand::contribution)
            + self.processed_food.map_or(0, ProcessedFoodBand::contribution)
            + self.hydration.map_or(0, HydrationBand::contribution)
            + self.mindfulness.map_or(0, MindfulnessBand::contribution)
            + self.mood.map_or(0, MoodBand::contribution)
            + self.alcohol.map_or(0, AlcoholBand::contribution)
            + self.smoking.map_or(0, SmokingBand::contribution)
            + self.screen_time.map_or(0, ScreenTimeBand::contribution)
            + self.genetics.map_or(0, GeneticsBand::contribution)
            + self.chronic.map_or(0, ChronicBand::contribution)
            + self.sun_protection.map_or(0, SunProtectionBand::contribution)
    }
}

/// Accepts numbers or numeric strings; quiz clients have sent both.
fn answer_f64(answers: &Map<String, Value>, key: &str) -> Option<f64> {
    match answers.get(key)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn answer_i64(answers: &Map<String, Value>, key: &str) -> Option<i64> {
    match answers.get(key)? {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Chronological age from the `age` answer. Free-form values such as
/// "35-44" yield their first number.
pub fn chrono_age(answers: &Map<String, Value>) -> Option<u32> {
    match answers.get("age")? {
        Value::Number(n) => n.as_u64().map(|v| v as u32),
        Value::String(s) => {
            let digits: String = s
                .chars()
                .skip_while(|c| !c.is_ascii_digit())
                .take_while(|c| c.is_ascii_digit())
                .collect();
            digits.parse().ok()
        }
        _ => None,
    }
}

fn bmi_value(parsed: &ParsedAnswers) -> Option<f64> {
    let height_m = parsed.height_cm? / 100.0;
    let weight_kg = parsed.weight_kg?;
    if height_m > 0.0 && weight_kg > 0.0 {
        Some(weight_kg / (height_m * height_m))
    } else {
        None
    }
}

fn bmi_contribution(bmi: f64) -> i32 {
    if bmi < 18.5 || (25.0..30.0).contains(&bmi) {
        1
    } else if bmi >= 30.0 {
        2
    } else {
        0
    }
}

fn stress_contribution(stress: i64) -> i32 {
    match stress {
        1..=3 => -1,
        7..=8 => 1,
        9..=10 => 2,
        _ => 0,
    }
}

/// Facial indicators: (score, threshold, weight). An indicator contributes
/// its weight only when the score strictly exceeds the threshold.
fn photo_contribution(skin: &SkinStatus) -> i32 {
    let indicators = [
        (skin.eye_pouch, 30.0, 2),
        (skin.dark_circle, 30.0, 2),
        (skin.eye_finelines, 20.0, 1),
        (skin.crows_feet, 20.0, 2),
        (skin.forehead_wrinkle, 20.0, 2),
        (skin.glabella_wrinkle, 20.0, 2),
        (skin.nasolabial_fold, 20.0, 2),
        (skin.blackhead, 10.0, 1),
        (skin.acne, 10.0, 1),
        (skin.skin_spot, 10.0, 2),
    ];
    indicators
        .iter()
        .filter(|(score, threshold, _)| score > threshold)
        .map(|(_, _, weight)| weight)
        .sum()
}

/// Age adjustment in years from the total score. The bands cover every
/// integer exactly once.
pub fn age_adjustment(total_score: i32) -> i32 {
    match total_score {
        ..=-5 => -7,
        -4..=-1 => -3,
        0..=3 => 0,
        4..=7 => 3,
        8..=12 => 6,
        13.. => 10,
    }
}

/// Score a session. Pure and deterministic: identical input always yields
/// identical output.
pub fn score(answers: &Map<String, Value>, photo: Option<&PhotoAnalysis>) -> Score {
    let parsed = ParsedAnswers::from_map(answers);
    let mut total = parsed.table_contribution();

    let bmi = bmi_value(&parsed);
    if let Some(bmi) = bmi {
        total += bmi_contribution(bmi);
    }
    if let Some(stress) = parsed.stress {
        total += stress_contribution(stress);
    }
    if let Some(photo) = photo {
        total += photo_contribution(&photo.skin);
    }

    Score {
        total_score: total,
        age_adjustment_years: age_adjustment(total),
        bmi: bmi.map(|v| (v * 10.0).round() / 10.0),
    }
}

/// Boundary validation for answer submission. Recognized question keys must
/// carry a value their enum (or numeric range) accepts; anything else is
/// stored as-is and ignored by the scorer.
pub fn validate_answer(question_id: &str, answer: &Value) -> Result<(), String> {
    fn expect_band<T>(
        question_id: &str,
        answer: &Value,
        parse: fn(&str) -> Option<T>,
    ) -> Result<(), String> {
        let raw = answer
            .as_str()
            .ok_or_else(|| format!("answer for {question_id:?} must be a string"))?;
        parse(raw)
            .map(|_| ())
            .ok_or_else(|| format!("unrecognized answer for {question_id:?}: {raw:?}"))
    }

    fn expect_number(question_id: &str, answer: &Value, min: f64, max: f64) -> Result<(), String> {
        let value = match answer {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
        .ok_or_else(|| format!("answer for {question_id:?} must be numeric"))?;
        if value < min || value > max {
            return Err(format!(
                "answer for {question_id:?} must be between {min} and {max}"
            ));
        }
        Ok(())
    }

    match question_id {
        "sleep" => expect_band(question_id, answer, SleepBand::from_answer),
        "activity" => expect_band(question_id, answer, ActivityBand::from_answer),
        "nutrition" => expect_band(question_id, answer, NutritionBand::from_answer),
        "processed_food" => expect_band(question_id, answer, ProcessedFoodBand::from_answer),
        "hydration" => expect_band(question_id, answer, HydrationBand::from_answer),
        "mindfulness" => expect_band(question_id, answer, MindfulnessBand::from_answer),
        "mood" => expect_band(question_id, answer, MoodBand::from_answer),
        "alcohol" => expect_band(question_id, answer, AlcoholBand::from_answer),
        "smoking" => expect_band(question_id, answer, SmokingBand::from_answer),
        "screen_time" => expect_band(question_id, answer, ScreenTimeBand::from_answer),
        "genetics" => expect_band(question_id, answer, GeneticsBand::from_answer),
        "chronic" => expect_band(question_id, answer, ChronicBand::from_answer),
        "sun_protection" => expect_band(question_id, answer, SunProtectionBand::from_answer),
        "stress" => expect_number(question_id, answer, 1.0, 10.0),
        "height" => expect_number(question_id, answer, 1.0, 300.0),
        "weight" => expect_number(question_id, answer, 1.0, 500.0),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn answers(pairs: &[(&str, Value)]) -> Map<String, Value> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn scoring_is_deterministic() {
        let map = answers(&[
            ("sleep", json!("Less than 5 hours")),
            ("activity", json!("Rarely")),
            ("stress", json!(9)),
            ("height", json!(180)),
            ("weight", json!(95)),
        ]);
        assert_eq!(score(&map, None), score(&map, None));
    }

    #[test]
    fn neutral_profile_scores_zero() {
        let map = answers(&[
            ("sleep", json!("7-8 hours")),
            ("activity", json!("3-4 times")),
            ("height", json!(175)),
            ("weight", json!(70)),
        ]);
        let result = score(&map, None);
        assert_eq!(result.total_score, 0);
        assert_eq!(result.age_adjustment_years, 0);
        assert_eq!(result.bmi, Some(22.9));
    }

    #[test]
    fn stress_nine_contributes_two() {
        let map = answers(&[("stress", json!(9))]);
        assert_eq!(score(&map, None).total_score, 2);
        // Also accepted as a numeric string.
        let map = answers(&[("stress", json!("9"))]);
        assert_eq!(score(&map, None).total_score, 2);
    }

    #[test]
    fn stress_bands() {
        for (stress, expected) in [(1, -1), (3, -1), (4, 0), (6, 0), (7, 1), (8, 1), (10, 2)] {
            let map = answers(&[("stress", json!(stress))]);
            assert_eq!(score(&map, None).total_score, expected, "stress {stress}");
        }
    }

    #[test]
    fn bmi_bands() {
        // 175cm / 50kg -> 16.3, underweight
        let map = answers(&[("height", json!(175)), ("weight", json!(50))]);
        assert_eq!(score(&map, None).total_score, 1);
        // 175cm / 80kg -> 26.1, overweight
        let map = answers(&[("height", json!(175)), ("weight", json!(80))]);
        assert_eq!(score(&map, None).total_score, 1);
        // 175cm / 95kg -> 31.0, obese
        let map = answers(&[("height", json!(175)), ("weight", json!(95))]);
        assert_eq!(score(&map, None).total_score, 2);
        // Missing weight: no BMI, no contribution
        let map = answers(&[("height", json!(175))]);
        let result = score(&map, None);
        assert_eq!(result.total_score, 0);
        assert_eq!(result.bmi, None);
    }

    #[test]
    fn unrecognized_keys_contribute_zero() {
        let map = answers(&[
            ("sleep", json!("7-8 hours")),
            ("favorite_color", json!("teal")),
            ("sleep_quality", json!("great")),
        ]);
        assert_eq!(score(&map, None).total_score, 0);
    }

    #[test]
    fn age_adjustment_bands_are_total_and_monotonic() {
        for total in -40..=40 {
            let adjustment = age_adjustment(total);
            assert!([-7, -3, 0, 3, 6, 10].contains(&adjustment));
        }
        assert_eq!(age_adjustment(-5), -7);
        assert_eq!(age_adjustment(-4), -3);
        assert_eq!(age_adjustment(-1), -3);
        assert_eq!(age_adjustment(0), 0);
        assert_eq!(age_adjustment(3), 0);
        assert_eq!(age_adjustment(4), 3);
        assert_eq!(age_adjustment(7), 3);
        assert_eq!(age_adjustment(8), 6);
        assert_eq!(age_adjustment(12), 6);
        assert_eq!(age_adjustment(13), 10);
        assert_eq!(age_adjustment(100), 10);
    }

    #[test]
    fn photo_indicators_respect_thresholds() {
        let mut photo = PhotoAnalysis {
            age_estimate: Some(40),
            skin: SkinStatus::default(),
        };
        // At the threshold: no contribution.
        photo.skin.dark_circle = 30.0;
        assert_eq!(score(&Map::new(), Some(&photo)).total_score, 0);
        // Above the threshold: weighted contribution.
        photo.skin.dark_circle = 31.0;
        photo.skin.eye_finelines = 25.0;
        photo.skin.acne = 11.0;
        assert_eq!(score(&Map::new(), Some(&photo)).total_score, 4);
    }

    #[test]
    fn worst_case_profile_hits_top_band() {
        let map = answers(&[
            ("sleep", json!("Less than 5 hours")),
            ("activity", json!("Rarely")),
            ("nutrition", json!("0-1")),
            ("processed_food", json!("Daily")),
            ("hydration", json!("1-3 glasses")),
            ("mindfulness", json!("Never")),
            ("mood", json!("Often Stressed or Sad")),
            ("alcohol", json!("8+")),
            ("smoking", json!("Yes, daily")),
            ("screen_time", json!("More than 6 hours")),
            ("genetics", json!("<65 years")),
            ("chronic", json!("Serious")),
            ("sun_protection", json!("Never")),
            ("stress", json!(10)),
        ]);
        let result = score(&map, None);
        assert_eq!(result.total_score, 30);
        assert_eq!(result.age_adjustment_years, 10);
    }

    #[test]
    fn chrono_age_accepts_numbers_and_ranges() {
        assert_eq!(chrono_age(&answers(&[("age", json!(42))])), Some(42));
        assert_eq!(chrono_age(&answers(&[("age", json!("35-44"))])), Some(35));
        assert_eq!(chrono_age(&answers(&[("age", json!("unknown"))])), None);
        assert_eq!(chrono_age(&Map::new()), None);
    }

    #[test]
    fn validate_answer_rejects_unknown_variants() {
        assert!(validate_answer("sleep", &json!("7-8 hours")).is_ok());
        assert!(validate_answer("sleep", &json!("a lot")).is_err());
        assert!(validate_answer("stress", &json!(11)).is_err());
        assert!(validate_answer("stress", &json!("4")).is_ok());
        assert!(validate_answer("height", &json!(-3)).is_err());
        // Free-form questions pass through untouched.
        assert!(validate_answer("name", &json!("Jessica")).is_ok());
        assert!(validate_answer("skin_concerns", &json!(["acne"])).is_ok());
    }
}
