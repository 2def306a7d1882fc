//! Deterministic report construction.
//!
//! `FallbackReportBuilder::build` is total: for any session record, however
//! sparse, it produces a schema-valid report from the scoring engine and the
//! static content library below. This is the path that keeps a paying user
//! from ever being stuck behind a failed model call.

use report_flow::{PlanType, SessionRecord, SkinStatus};

use crate::report::schema::{
    Archetype, Insights, Metric, PlanDay, Potential, ReportData, ReportMetrics, SkinFindings,
};
use crate::scoring::{
    self, ActivityBand, HydrationBand, MindfulnessBand, NutritionBand, ParsedAnswers,
    ProcessedFoodBand, ScreenTimeBand, SleepBand,
};

const INCREASING_STRESS: &str =
    "High stress levels are a key factor accelerating cellular aging.";
const INCREASING_SLEEP: &str =
    "Lack of consistent, quality sleep prevents your body from fully repairing itself overnight.";
const INCREASING_PROCESSED_FOOD: &str =
    "Frequent consumption of processed foods can lead to inflammation and negatively impact wellness.";
const INCREASING_BMI_HIGH: &str =
    "A high BMI is associated with increased inflammation and metabolic stress.";

const DECREASING_ACTIVITY: &str =
    "Your consistent exercise routine is a major benefit to your cardiovascular health and longevity.";
const DECREASING_NUTRITION: &str =
    "A diet rich in fruits and vegetables provides you with crucial antioxidants to fight aging.";
const DECREASING_MINDFULNESS: &str =
    "Your mindfulness practice is an excellent tool for managing stress and improving focus.";
const DECREASING_BMI_NORMAL: &str =
    "Maintaining a healthy BMI reduces strain on your body's systems.";

const INSIGHT_GOOD_STRESS_GOOD_SLEEP: &str = "Your ability to manage stress and get quality sleep is a powerful combination for healthy aging. These two factors work together to ensure your body and mind recover effectively each day. Keep prioritizing these habits!";
const INSIGHT_HIGH_STRESS_GOOD_SLEEP: &str = "You're getting good sleep, which is excellent. However, your high stress levels mean your body is working overtime during the day. Focusing on stress-reduction techniques like meditation or short walks can make your great sleep even more restorative.";
const INSIGHT_LOW_STRESS_BAD_SLEEP: &str = "You manage stress well, but your sleep is not optimal. This is your biggest opportunity for improvement. A consistent sleep schedule and a relaxing bedtime routine will supercharge your body's natural rejuvenation process.";
const INSIGHT_HIGH_STRESS_BAD_SLEEP: &str = "High stress combined with short sleep puts your recovery in a deficit: stress hormones stay elevated while the body gets too little time to repair. Start with a fixed wind-down hour; better sleep will also blunt the stress itself.";
const INSIGHT_STRESS_SLEEP_DEFAULT: &str = "Your stress and sleep levels are in a moderate range. Focusing on consistency in both areas, like a regular sleep schedule and short daily walks, can provide significant wellness benefits.";

const INSIGHT_GOOD_NUTRITION_BAD_HYDRATION: &str = "Your diet is strong, but your water intake is undermining it: many of the nutrients you eat need adequate hydration to be absorbed and used. Keep the plate as it is and add two extra glasses of water a day.";
const INSIGHT_POOR_NUTRITION_POOR_HYDRATION: &str = "Improving your diet and water intake is a critical step. Start small: add one extra vegetable to your dinner and drink one extra glass of water each day. These small changes will have a big impact over time.";
const INSIGHT_NUTRITION_HYDRATION_DEFAULT: &str = "You have a solid foundation in nutrition and hydration. Continue to focus on whole foods and consistent water intake to maintain your results.";

const INSIGHT_HIGH_ACTIVITY_POOR_SLEEP: &str = "Your high activity level is fantastic for your cardiovascular health, but without adequate sleep, your body can't fully recover. Prioritizing sleep will unlock the full benefits of your workouts and prevent burnout.";
const INSIGHT_LOW_ACTIVITY_HIGH_STRESS: &str = "A powerful way to combat your high stress levels is through physical activity. Even a 15-minute brisk walk can release endorphins and reduce stress hormones. Think of exercise not as a chore, but as a potent stress-relief tool.";
const INSIGHT_ACTIVITY_DEFAULT: &str = "Your activity level is a good starting point. Aim for consistency, and remember that even short walks can have a significant positive impact on your well-being.";

struct ArchetypeTemplate {
    name: &'static str,
    icon: &'static str,
    description: &'static str,
}

const DRIVEN_ACHIEVER: ArchetypeTemplate = ArchetypeTemplate {
    name: "The Driven Achiever",
    icon: "🚀",
    description: "You excel in your professional life and stay active, but high stress and suboptimal sleep might be holding you back from your full wellness potential.",
};
const DIGITAL_NIGHT_OWL: ArchetypeTemplate = ArchetypeTemplate {
    name: "The Digital Night Owl",
    icon: "🦉",
    description: "You are highly connected and informed, but late nights and high screen time may be impacting your sleep quality and accelerating the aging process.",
};
const ZEN_MASTER: ArchetypeTemplate = ArchetypeTemplate {
    name: "The Zen Master",
    icon: "🧘",
    description: "You have a strong foundation in nutrition and mindfulness, putting you on an excellent path for healthy aging. Consistency is your superpower.",
};
const BALANCED_INDIVIDUAL: ArchetypeTemplate = ArchetypeTemplate {
    name: "The Balanced Individual",
    icon: "⚖️",
    description: "You have a healthy mix of positive habits and areas for improvement, providing a solid base to build upon for even better wellness.",
};

struct PlanDayTemplate {
    theme: &'static str,
    icon: &'static str,
    morning: &'static str,
    nutrition: &'static str,
    activity: &'static str,
    evening: &'static str,
}

/// The tiered day plans: basic covers days 1-7, advanced 1-14, premium 1-21.
const PLAN_DAYS: [PlanDayTemplate; 21] = [
    PlanDayTemplate {
        theme: "Foundation & Awareness",
        icon: "🌅",
        morning: "Start your day with a full glass of water. While drinking, think of one thing you're grateful for.",
        nutrition: "Ensure your lunch includes at least 3 different colors of vegetables.",
        activity: "Take a 15-minute walk after lunch or dinner. Focus on your breathing.",
        evening: "Put away all screens 30 minutes before your planned bedtime.",
    },
    PlanDayTemplate {
        theme: "Boosting Energy",
        icon: "⚡",
        morning: "Do 5 minutes of light stretching or yoga right after waking up to get your blood flowing.",
        nutrition: "Add a source of healthy fats to your breakfast, like avocado, nuts, or seeds.",
        activity: "Try 10 minutes of bodyweight exercises: squats, push-ups (on knees is fine!), and planks.",
        evening: "Read a chapter of a book (a physical book, not on a screen) before sleeping.",
    },
    PlanDayTemplate {
        theme: "Mindful Nutrition",
        icon: "🥗",
        morning: "Prepare a healthy, protein-rich breakfast to stay full and energized until lunch.",
        nutrition: "Eat lunch without distractions (no phone, no TV). Just focus on your food.",
        activity: "Take the stairs instead of the elevator all day.",
        evening: "Brew a cup of caffeine-free herbal tea, like chamomile or peppermint, to help you relax.",
    },
    PlanDayTemplate {
        theme: "Stress Reduction",
        icon: "🧘",
        morning: "Before starting work, write down your top 3 priorities for the day to create focus and reduce overwhelm.",
        nutrition: "Avoid sugary snacks. If you need a pick-me-up, opt for a piece of fruit and a handful of almonds.",
        activity: "Mid-afternoon, take a 5-minute break to stand up, stretch your arms, and roll your neck and shoulders.",
        evening: "Listen to 10 minutes of calming music or a guided meditation podcast before bed.",
    },
    PlanDayTemplate {
        theme: "Active Living",
        icon: "🏃",
        morning: "Start your day with an upbeat song to boost your mood and energy.",
        nutrition: "Incorporate a lean protein source (like chicken, fish, or beans) into your dinner to aid muscle repair.",
        activity: "Go for a 30-minute brisk walk or jog. Challenge yourself to go a little faster than usual.",
        evening: "Reflect on one accomplishment from the day, no matter how small.",
    },
    PlanDayTemplate {
        theme: "Recovery & Joy",
        icon: "☀️",
        morning: "Allow yourself to wake up without an alarm if possible. Give your body the rest it needs.",
        nutrition: "Enjoy a meal you truly love, without guilt. Savor every bite.",
        activity: "Engage in a fun activity you enjoy, like dancing, hiking, or playing a sport.",
        evening: "Connect with a friend or family member, either in person or with a phone call.",
    },
    PlanDayTemplate {
        theme: "Planning for Success",
        icon: "🗓️",
        morning: "Review your week. What went well? What was challenging? No judgment, just observation.",
        nutrition: "Plan one or two healthy meals for the upcoming week to make healthy eating easier.",
        activity: "Schedule your workouts for the next week in your calendar like important appointments.",
        evening: "Set a clear intention for the week ahead. What is one small, positive change you want to continue?",
    },
    PlanDayTemplate {
        theme: "Metabolic Boost",
        icon: "🔥",
        morning: "Try a high-intensity interval training (HIIT) workout for 10 minutes.",
        nutrition: "Add cinnamon to your coffee or oatmeal to help regulate blood sugar.",
        activity: "Ensure you hit 8,000 steps today.",
        evening: "Avoid eating heavy meals at least 2 hours before bed.",
    },
    PlanDayTemplate {
        theme: "Gut Health",
        icon: "🦠",
        morning: "Incorporate a probiotic source like yogurt or kefir into your breakfast.",
        nutrition: "Eat a high-fiber snack, such as an apple or a handful of berries.",
        activity: "Perform 15 minutes of core exercises like planks and leg raises.",
        evening: "Dim the lights in your home an hour before bed to support melatonin production.",
    },
    PlanDayTemplate {
        theme: "Brain Power",
        icon: "🧠",
        morning: "Challenge your brain with a puzzle like Sudoku or a crossword for 10 minutes.",
        nutrition: "Eat a serving of fatty fish (like salmon) or walnuts for Omega-3s.",
        activity: "Try a coordination-based activity, like dancing or juggling, for 10 minutes.",
        evening: "Write down one new thing you learned today.",
    },
    PlanDayTemplate {
        theme: "Strength & Stability",
        icon: "💪",
        morning: "Hold a plank for as long as you can. Try to beat your time tomorrow.",
        nutrition: "Ensure you have a source of protein with every meal today.",
        activity: "Focus on your posture. Sit up straight and pull your shoulders back.",
        evening: "Gently stretch your major muscle groups before getting into bed.",
    },
    PlanDayTemplate {
        theme: "Cardio Endurance",
        icon: "❤️",
        morning: "Jump rope for 5 minutes, or simply jump in place.",
        nutrition: "Eat a banana or a small bowl of oatmeal for energy before your main activity.",
        activity: "Do an activity that gets your heart rate up for 30 continuous minutes.",
        evening: "Practice deep belly breathing for 3 minutes to calm your nervous system.",
    },
    PlanDayTemplate {
        theme: "Flexibility & Flow",
        icon: "🤸",
        morning: "Try a 10-minute guided yoga session.",
        nutrition: "Drink green tea, which is rich in antioxidants.",
        activity: "Spend 10 minutes foam rolling or stretching tight muscles.",
        evening: "Avoid looking at your phone for the first and last 10 minutes of your day.",
    },
    PlanDayTemplate {
        theme: "Consistent Progress",
        icon: "📈",
        morning: "Look back at the last 14 days. What was the most impactful change you made?",
        nutrition: "Batch cook a healthy meal for the start of next week.",
        activity: "Plan your workouts for the next 7 days.",
        evening: "Set a new, small wellness goal for the upcoming week.",
    },
    PlanDayTemplate {
        theme: "Advanced Wellness",
        icon: "🌟",
        morning: "Practice box breathing (inhale 4s, hold 4s, exhale 4s, hold 4s) for 3 minutes.",
        nutrition: "Incorporate a fermented food like yogurt, kefir, or kimchi for gut health.",
        activity: "Try a new type of physical activity you've never done before.",
        evening: "Reflect on your long-term wellness goals.",
    },
    PlanDayTemplate {
        theme: "Social Connection",
        icon: "👥",
        morning: "Send a thoughtful message to a friend you haven't spoken to in a while.",
        nutrition: "Share a healthy meal with someone, even virtually.",
        activity: "Go for a walk with a friend or family member.",
        evening: "Plan a social activity for the upcoming weekend.",
    },
    PlanDayTemplate {
        theme: "Digital Detox",
        icon: "📵",
        morning: "Keep your phone out of reach for the first hour of your day.",
        nutrition: "Eat your breakfast without looking at any screens.",
        activity: "Take a 20-minute walk outside without headphones or your phone.",
        evening: "Declare the last hour before bed a 'no-screen zone'.",
    },
    PlanDayTemplate {
        theme: "Advanced Strength",
        icon: "🏋️",
        morning: "Perform 3 sets of your most challenging bodyweight exercise.",
        nutrition: "Consume a protein-rich snack within an hour after your workout.",
        activity: "Focus on compound movements like squats, deadlifts, or push-ups.",
        evening: "Take a warm bath with Epsom salts to soothe sore muscles.",
    },
    PlanDayTemplate {
        theme: "Mind-Body Sync",
        icon: "🧘",
        morning: "Try a 15-minute guided meditation focusing on a body scan.",
        nutrition: "Pay attention to your body's hunger and fullness cues all day.",
        activity: "Engage in a low-impact activity like swimming or tai chi.",
        evening: "Journal for 10 minutes about how you felt physically and emotionally today.",
    },
    PlanDayTemplate {
        theme: "Creative Expression",
        icon: "🎨",
        morning: "Spend 10 minutes journaling, sketching, or playing an instrument.",
        nutrition: "Try a new healthy recipe you've never made before.",
        activity: "Put on your favorite music and dance for 15 minutes.",
        evening: "Read a few pages from a fiction book before sleep.",
    },
    PlanDayTemplate {
        theme: "Sustaining Momentum",
        icon: "🚀",
        morning: "Review the past 21 days and write down the 3 most impactful habits you've built.",
        nutrition: "Meal prep two healthy lunches for the start of next week.",
        activity: "Create a realistic workout schedule for the next month.",
        evening: "Set a new, inspiring wellness goal for the next 30 days.",
    },
];

const STANDARD_LIFESPAN: i64 = 82;

fn plan_days(tier: PlanType) -> usize {
    match tier {
        PlanType::Basic => 7,
        PlanType::Advanced => 14,
        PlanType::Premium => 21,
    }
}

fn age_reduction_prediction(tier: PlanType) -> &'static str {
    match tier {
        PlanType::Basic => "1-2 years",
        PlanType::Advanced => "2-3 years",
        PlanType::Premium => "3-4 years",
    }
}

fn potential_for(tier: PlanType, wellness_age: i64) -> Potential {
    let (age_gain, lifespan_gain) = match tier {
        PlanType::Basic => (1, 2),
        PlanType::Advanced => (2, 4),
        PlanType::Premium => (3, 5),
    };
    Potential {
        age: wellness_age - age_gain,
        lifespan: STANDARD_LIFESPAN + lifespan_gain,
    }
}

fn build_plan(tier: PlanType) -> Vec<PlanDay> {
    PLAN_DAYS
        .iter()
        .take(plan_days(tier))
        .enumerate()
        .map(|(index, template)| PlanDay {
            day: index as u32 + 1,
            theme: template.theme.to_string(),
            icon: template.icon.to_string(),
            morning: template.morning.to_string(),
            nutrition: template.nutrition.to_string(),
            activity: template.activity.to_string(),
            evening: template.evening.to_string(),
        })
        .collect()
}

fn select_archetype(parsed: &ParsedAnswers) -> &'static ArchetypeTemplate {
    let stress = parsed.stress.unwrap_or(5);
    let active = matches!(
        parsed.activity,
        Some(ActivityBand::ThreeToFour | ActivityBand::FivePlus)
    );
    if stress > 7 && active {
        return &DRIVEN_ACHIEVER;
    }
    if parsed.sleep == Some(SleepBand::LessThanFive)
        && parsed.screen_time == Some(ScreenTimeBand::MoreThanSix)
    {
        return &DIGITAL_NIGHT_OWL;
    }
    if parsed.nutrition == Some(NutritionBand::MoreThanFive)
        && parsed.mindfulness == Some(MindfulnessBand::Daily)
    {
        return &ZEN_MASTER;
    }
    &BALANCED_INDIVIDUAL
}

fn determine_factors(parsed: &ParsedAnswers, bmi: Option<f64>) -> (Vec<String>, Vec<String>) {
    let mut increasing = Vec::new();
    if parsed.stress.is_some_and(|s| s >= 7) {
        increasing.push(INCREASING_STRESS.to_string());
    }
    if matches!(
        parsed.sleep,
        Some(SleepBand::LessThanFive | SleepBand::FiveToSix)
    ) {
        increasing.push(INCREASING_SLEEP.to_string());
    }
    if matches!(
        parsed.processed_food,
        Some(ProcessedFoodBand::Daily | ProcessedFoodBand::ThreeToFour)
    ) {
        increasing.push(INCREASING_PROCESSED_FOOD.to_string());
    }
    if bmi.is_some_and(|v| v >= 25.0) {
        increasing.push(INCREASING_BMI_HIGH.to_string());
    }

    let mut decreasing = Vec::new();
    if matches!(
        parsed.activity,
        Some(ActivityBand::FivePlus | ActivityBand::ThreeToFour)
    ) {
        decreasing.push(DECREASING_ACTIVITY.to_string());
    }
    if parsed.nutrition == Some(NutritionBand::MoreThanFive) {
        decreasing.push(DECREASING_NUTRITION.to_string());
    }
    if parsed.mindfulness == Some(MindfulnessBand::Daily) {
        decreasing.push(DECREASING_MINDFULNESS.to_string());
    }
    if bmi.is_some_and(|v| (18.5..25.0).contains(&v)) {
        decreasing.push(DECREASING_BMI_NORMAL.to_string());
    }

    increasing.truncate(3);
    decreasing.truncate(3);
    (increasing, decreasing)
}

fn build_metrics(parsed: &ParsedAnswers, total_score: i32, bmi: Option<f64>, skin: Option<&SkinStatus>) -> ReportMetrics {
    let wellness = (100 - total_score * 4).clamp(30, 99) as f64;
    let stress = parsed
        .stress
        .map_or(50.0, |level| ((11 - level) * 10) as f64);
    let sleep = parsed.sleep.map_or(50.0, SleepBand::metric_score);
    let nutrition = (parsed.nutrition.map_or(50.0, NutritionBand::metric_score)
        + parsed
            .processed_food
            .map_or(50.0, ProcessedFoodBand::metric_score))
        / 2.0;
    let hydration = parsed.hydration.map_or(50.0, HydrationBand::metric_score);
    let activity = parsed.activity.map_or(50.0, ActivityBand::metric_score);
    let skin_quality = skin.and_then(|s| s.health).unwrap_or(85.0);

    ReportMetrics {
        wellness_score: Metric::new(
            wellness,
            "This score provides a holistic measure of your current well-being, combining all lifestyle, physical, and skin health factors.",
        ),
        energy: None,
        stress: Some(Metric::new(
            stress,
            "Your body's response to daily pressures. A lower reported stress level raises this score.",
        )),
        sleep: Some(Metric::new(
            sleep,
            "Quality and consistency of your sleep.",
        )),
        nutrition: Some(Metric::new(
            nutrition.round(),
            "An assessment of your dietary balance and habits.",
        )),
        hydration: Some(Metric::new(hydration, "Your daily fluid intake.")),
        activity: Some(Metric::new(activity, "Your weekly physical activity.")),
        skin_quality: Some(Metric::new(
            skin_quality,
            "Based on visual analysis of hydration, texture, and tone.",
        )),
        bmi: bmi.map(|value| {
            Metric::new(
                value,
                "Your Body Mass Index. A healthy range is typically 18.5-24.9.",
            )
        }),
        healthy_habits: None,
    }
}

fn build_insights(metrics: &ReportMetrics) -> Insights {
    let stress = metrics.stress.as_ref().map_or(50.0, |m| m.value);
    let sleep = metrics.sleep.as_ref().map_or(50.0, |m| m.value);
    let nutrition = metrics.nutrition.as_ref().map_or(50.0, |m| m.value);
    let hydration = metrics.hydration.as_ref().map_or(50.0, |m| m.value);
    let activity = metrics.activity.as_ref().map_or(50.0, |m| m.value);

    let stress_sleep = if stress > 70.0 && sleep > 70.0 {
        INSIGHT_GOOD_STRESS_GOOD_SLEEP
    } else if stress < 50.0 && sleep > 70.0 {
        INSIGHT_HIGH_STRESS_GOOD_SLEEP
    } else if stress > 70.0 && sleep < 70.0 {
        INSIGHT_LOW_STRESS_BAD_SLEEP
    } else if stress < 50.0 && sleep < 70.0 {
        INSIGHT_HIGH_STRESS_BAD_SLEEP
    } else {
        INSIGHT_STRESS_SLEEP_DEFAULT
    };

    let nutrition_hydration = if nutrition > 80.0 && hydration < 70.0 {
        INSIGHT_GOOD_NUTRITION_BAD_HYDRATION
    } else if nutrition < 60.0 && hydration < 60.0 {
        INSIGHT_POOR_NUTRITION_POOR_HYDRATION
    } else {
        INSIGHT_NUTRITION_HYDRATION_DEFAULT
    };

    let activity_insight = if activity > 80.0 && sleep < 70.0 {
        INSIGHT_HIGH_ACTIVITY_POOR_SLEEP
    } else if activity < 50.0 && stress < 50.0 {
        INSIGHT_LOW_ACTIVITY_HIGH_STRESS
    } else {
        INSIGHT_ACTIVITY_DEFAULT
    };

    Insights {
        stress_sleep: stress_sleep.to_string(),
        nutrition_hydration: nutrition_hydration.to_string(),
        activity: activity_insight.to_string(),
    }
}

fn skin_findings(skin: &SkinStatus) -> SkinFindings {
    let flag = |score: f64, threshold: f64| u8::from(score > threshold);
    SkinFindings {
        dark_circle: flag(skin.dark_circle, 30.0),
        eye_pouch: flag(skin.eye_pouch, 30.0),
        eye_finelines: flag(skin.eye_finelines, 20.0),
        crows_feet: flag(skin.crows_feet, 20.0),
        forehead_wrinkle: flag(skin.forehead_wrinkle, 20.0),
        glabella_wrinkle: flag(skin.glabella_wrinkle, 20.0),
        nasolabial_fold: flag(skin.nasolabial_fold, 20.0),
        blackhead: flag(skin.blackhead, 10.0),
        acne: flag(skin.acne, 10.0),
        skin_spot: flag(skin.skin_spot, 10.0),
    }
}

fn skin_conclusion(skin: Option<&SkinStatus>) -> String {
    let Some(skin) = skin else {
        return "Skin analysis was not performed.".to_string();
    };
    let mut issues = Vec::new();
    if skin.dark_circle > 30.0 {
        issues.push("dark circles");
    }
    if skin.eye_pouch > 30.0 {
        issues.push("eye puffiness");
    }
    if skin.forehead_wrinkle > 20.0 {
        issues.push("forehead lines");
    }
    if skin.acne > 10.0 {
        issues.push("acne");
    }
    if issues.is_empty() {
        "Your skin is in excellent condition! Continue with your current skincare routine and healthy habits.".to_string()
    } else {
        format!(
            "Your skin analysis reveals some areas for improvement, including {}. These indicators often correlate with stress, sleep quality, and hydration levels.",
            issues.join(", ")
        )
    }
}

fn age_explanation(age_correction: i32) -> String {
    if age_correction > 0 {
        format!(
            "Your biological age is {age_correction} years higher than your chronological age. This indicates that certain lifestyle factors are accelerating your aging process. The good news is that a personalized plan can help you reverse this trend."
        )
    } else if age_correction < 0 {
        format!(
            "Excellent! Your biological age is {} years younger than your chronological age. Your healthy habits are paying off, and the plan will help you maintain and improve these results.",
            -age_correction
        )
    } else {
        "Your biological age matches your chronological age. This means you're aging at a normal rate, but there's still room for improvement to potentially reverse your biological clock.".to_string()
    }
}

pub struct FallbackReportBuilder;

impl FallbackReportBuilder {
    /// Build a complete report from the session alone. Total: never fails,
    /// always satisfies the canonical schema.
    pub fn build(session: &SessionRecord) -> ReportData {
        let parsed = ParsedAnswers::from_map(&session.answers);
        let score = scoring::score(&session.answers, session.photo_analysis.as_ref());
        let skin = session.photo_analysis.as_ref().map(|photo| &photo.skin);

        let chrono_age = scoring::chrono_age(&session.answers).unwrap_or(35);
        let age_correction = score.age_adjustment_years;
        let wellness_age = (i64::from(chrono_age) + i64::from(age_correction)).max(18);

        let tier = session.plan_type.unwrap_or(PlanType::Basic);
        let metrics = build_metrics(&parsed, score.total_score, score.bmi, skin);
        let insights = build_insights(&metrics);
        let (increasing_factors, decreasing_factors) = determine_factors(&parsed, score.bmi);
        let archetype = select_archetype(&parsed);

        let user_name = session
            .answers
            .get("name")
            .and_then(|value| value.as_str())
            .filter(|name| !name.trim().is_empty())
            .unwrap_or("Valued User")
            .to_string();

        ReportData {
            schema_version: super::schema::REPORT_SCHEMA_VERSION.to_string(),
            user_name,
            chrono_age,
            wellness_age,
            age_correction,
            age_explanation: Some(age_explanation(age_correction)),
            age_reduction_prediction: age_reduction_prediction(tier).to_string(),
            increasing_factors,
            decreasing_factors,
            metrics,
            insights: Some(insights),
            skin_analysis: skin.map(skin_findings),
            skin_conclusion: Some(skin_conclusion(skin)),
            archetype: Some(Archetype {
                name: archetype.name.to_string(),
                icon: archetype.icon.to_string(),
                description: archetype.description.to_string(),
            }),
            plan: build_plan(tier),
            potential: Some(potential_for(tier, wellness_age)),
        }
    }
}

#[cfg(test)]
mod tests {
    use report_flow::PhotoAnalysis;
    use serde_json::json;

    use super::*;

    fn session_with(pairs: &[(&str, serde_json::Value)]) -> SessionRecord {
        let mut session = SessionRecord::new("s1");
        for (key, value) in pairs {
            session.answers.insert(key.to_string(), value.clone());
        }
        session
    }

    #[test]
    fn empty_session_builds_valid_report() {
        let session = SessionRecord::new("empty");
        let report = FallbackReportBuilder::build(&session);
        report.validate().unwrap();
        assert_eq!(report.chrono_age, 35);
        assert_eq!(report.plan.len(), 7);
        assert_eq!(
            report.skin_conclusion.as_deref(),
            Some("Skin analysis was not performed.")
        );
    }

    #[test]
    fn full_session_builds_valid_report() {
        let mut session = session_with(&[
            ("name", json!("Jessica")),
            ("age", json!("34")),
            ("sleep", json!("5-6 hours")),
            ("activity", json!("3-4 times")),
            ("nutrition", json!("2-3")),
            ("processed_food", json!("3-4 times")),
            ("hydration", json!("4-6 glasses")),
            ("mindfulness", json!("Occasionally")),
            ("stress", json!(8)),
            ("height", json!(168)),
            ("weight", json!(74)),
        ]);
        let mut photo = PhotoAnalysis {
            age_estimate: Some(36),
            skin: Default::default(),
        };
        photo.skin.dark_circle = 42.0;
        photo.skin.acne = 15.0;
        session.photo_analysis = Some(photo);

        let report = FallbackReportBuilder::build(&session);
        report.validate().unwrap();
        assert_eq!(report.user_name, "Jessica");
        assert_eq!(report.chrono_age, 34);
        assert_eq!(report.wellness_age, i64::from(34 + report.age_correction));
        let findings = report.skin_analysis.unwrap();
        assert_eq!(findings.dark_circle, 1);
        assert_eq!(findings.acne, 1);
        assert_eq!(findings.eye_pouch, 0);
        assert!(
            report
                .skin_conclusion
                .unwrap()
                .contains("dark circles, acne")
        );
        // High stress and poor sleep both raise the age; BMI 26.2 adds more.
        assert!(
            report
                .increasing_factors
                .contains(&INCREASING_STRESS.to_string())
        );
        assert!(
            report
                .increasing_factors
                .contains(&INCREASING_SLEEP.to_string())
        );
    }

    #[test]
    fn plan_length_follows_tier() {
        for (tier, expected) in [
            (PlanType::Basic, 7),
            (PlanType::Advanced, 14),
            (PlanType::Premium, 21),
        ] {
            let mut session = SessionRecord::new("s1");
            session.plan_type = Some(tier);
            let report = FallbackReportBuilder::build(&session);
            assert_eq!(report.plan.len(), expected);
            assert_eq!(report.plan[0].day, 1);
            assert_eq!(report.plan[expected - 1].day, expected as u32);
            assert_eq!(
                report.age_reduction_prediction,
                age_reduction_prediction(tier)
            );
        }
    }

    #[test]
    fn archetype_decision_tree() {
        let driven = session_with(&[("stress", json!(9)), ("activity", json!("5+ times"))]);
        assert_eq!(
            FallbackReportBuilder::build(&driven).archetype.unwrap().name,
            DRIVEN_ACHIEVER.name
        );

        let owl = session_with(&[
            ("sleep", json!("Less than 5 hours")),
            ("screen_time", json!("More than 6 hours")),
        ]);
        assert_eq!(
            FallbackReportBuilder::build(&owl).archetype.unwrap().name,
            DIGITAL_NIGHT_OWL.name
        );

        let zen = session_with(&[
            ("nutrition", json!("More than 5")),
            ("mindfulness", json!("Daily")),
        ]);
        assert_eq!(
            FallbackReportBuilder::build(&zen).archetype.unwrap().name,
            ZEN_MASTER.name
        );

        let balanced = session_with(&[("sleep", json!("7-8 hours"))]);
        assert_eq!(
            FallbackReportBuilder::build(&balanced)
                .archetype
                .unwrap()
                .name,
            BALANCED_INDIVIDUAL.name
        );
    }

    #[test]
    fn wellness_score_is_clamped() {
        // Worst-case answers drive the raw score far below 30.
        let session = session_with(&[
            ("sleep", json!("Less than 5 hours")),
            ("activity", json!("Rarely")),
            ("nutrition", json!("0-1")),
            ("processed_food", json!("Daily")),
            ("smoking", json!("Yes, daily")),
            ("alcohol", json!("8+")),
            ("screen_time", json!("More than 6 hours")),
            ("chronic", json!("Serious")),
            ("stress", json!(10)),
        ]);
        let report = FallbackReportBuilder::build(&session);
        assert_eq!(report.metrics.wellness_score.value, 30.0);
        report.validate().unwrap();

        // A flawless profile is capped at 99.
        let session = session_with(&[
            ("activity", json!("5+ times")),
            ("nutrition", json!("More than 5")),
            ("hydration", json!("10+ glasses")),
            ("mindfulness", json!("Daily")),
            ("genetics", json!("85+ years")),
            ("stress", json!(2)),
        ]);
        let report = FallbackReportBuilder::build(&session);
        assert_eq!(report.metrics.wellness_score.value, 99.0);
    }

    #[test]
    fn build_is_deterministic() {
        let session = session_with(&[("sleep", json!("7-8 hours")), ("stress", json!(4))]);
        let first = serde_json::to_value(FallbackReportBuilder::build(&session)).unwrap();
        let second = serde_json::to_value(FallbackReportBuilder::build(&session)).unwrap();
        assert_eq!(first, second);
    }
}
