//! Generation request assembly for the generative-text collaborator.

use std::fmt::Write;

use report_flow::SessionRecord;

use crate::scoring;

/// Answer keys that are bookkeeping rather than quiz content; they never
/// reach the model.
const EXCLUDED_KEYS: &[&str] = &["selfie", "email", "report_data", "report_status", "report_error"];

pub fn build_generation_prompt(session: &SessionRecord) -> String {
    let mut quiz_data = String::new();
    for (key, value) in &session.answers {
        if EXCLUDED_KEYS.contains(&key.as_str()) {
            continue;
        }
        let rendered = match value.as_str() {
            Some(text) => text.to_string(),
            None => value.to_string(),
        };
        let _ = writeln!(quiz_data, "{key}: {rendered}");
    }
    if quiz_data.is_empty() {
        quiz_data.push_str("No quiz answers provided.\n");
    }

    let face_data = match &session.photo_analysis {
        Some(photo) => {
            let skin = &photo.skin;
            format!(
                "Face analysis data (all scores 0-100):\n\
                 - Age appearance: {}\n\
                 - Skin health score: {}\n\
                 - Dark circles: {}\n\
                 - Eye pouch: {}\n\
                 - Acne: {}\n\
                 - Skin spots: {}\n\
                 - Blackheads: {}\n\
                 - Forehead wrinkles: {}\n\
                 - Glabella wrinkles: {}\n\
                 - Nasolabial folds: {}\n\
                 - Eye fine lines: {}\n\
                 - Crow's feet: {}\n",
                photo
                    .age_estimate
                    .map_or("N/A".to_string(), |v| v.to_string()),
                skin.health.map_or("N/A".to_string(), |v| v.to_string()),
                skin.dark_circle,
                skin.eye_pouch,
                skin.acne,
                skin.skin_spot,
                skin.blackhead,
                skin.forehead_wrinkle,
                skin.glabella_wrinkle,
                skin.nasolabial_fold,
                skin.eye_finelines,
                skin.crows_feet,
            )
        }
        None => "No face analysis available.\n".to_string(),
    };

    let chrono_age = scoring::chrono_age(&session.answers).unwrap_or(35);

    format!(
        r#"You are an AI wellness and dermatology analyst. Create a personalized wellness report based on the user's quiz answers and face analysis data.

USER DATA:
{quiz_data}
{face_data}
Generate a complete, personalized JSON report. Be specific and base all calculations and text on the provided user data.

REQUIRED JSON STRUCTURE (return ONLY valid JSON, no other text):
{{
  "user_name": "[User's name if provided, otherwise 'there']",
  "chrono_age": {chrono_age},
  "wellness_age": "[Realistic wellness age from all lifestyle and face analysis data, as a number]",
  "age_correction": "[wellness_age minus chrono_age, as a number]",
  "age_explanation": "[2-3 sentences explaining the difference between wellness age and chronological age]",
  "age_reduction_prediction": "2-3 years",
  "increasing_factors": ["[2-3 specific factors from the data that raise the wellness age]"],
  "decreasing_factors": ["[2-3 specific factors from the data that lower the wellness age]"],
  "metrics": {{
    "wellness_score": {{ "value": "[Holistic 1-100 score]", "description": "This score provides a holistic measure of your current well-being." }},
    "energy": {{ "value": "[1-100 from sleep, activity and nutrition]", "description": "Reflects your vitality based on sleep, nutrition, and activity." }},
    "stress": {{ "value": "[1-100; lower reported stress means a higher value]", "description": "Your body's response to daily pressures." }},
    "sleep": {{ "value": "[1-100 from sleep answers]", "description": "Quality and consistency of your sleep." }},
    "nutrition": {{ "value": "[1-100 from diet answers]", "description": "An assessment of your dietary balance and habits." }},
    "hydration": {{ "value": "[1-100 from water intake]", "description": "Your daily fluid intake." }},
    "activity": {{ "value": "[1-100 from exercise answers]", "description": "Your weekly physical activity." }},
    "skin_quality": {{ "value": "[1-100 from the face analysis data]", "description": "Based on visual analysis of hydration, texture, and tone." }},
    "bmi": {{ "value": "[BMI if height and weight provided, otherwise omit this metric]", "description": "Your Body Mass Index. A healthy range is typically 18.5-24.9." }}
  }},
  "insights": {{
    "stress_sleep": "[2-3 sentences on how their stress and sleep interact]",
    "nutrition_hydration": "[2-3 sentences on their nutrition and hydration]",
    "activity": "[2-3 sentences on their activity level]"
  }},
  "skin_analysis": {{
    "dark_circle": "[1 if dark circle score > 30, else 0]",
    "eye_pouch": "[1 if eye pouch score > 30, else 0]",
    "eye_finelines": "[1 if eye fine lines score > 20, else 0]",
    "crows_feet": "[1 if crow's feet score > 20, else 0]",
    "forehead_wrinkle": "[1 if forehead wrinkle score > 20, else 0]",
    "glabella_wrinkle": "[1 if glabella wrinkle score > 20, else 0]",
    "nasolabial_fold": "[1 if nasolabial fold score > 20, else 0]",
    "blackhead": "[1 if blackhead score > 10, else 0]",
    "acne": "[1 if acne score > 10, else 0]",
    "skin_spot": "[1 if skin spot score > 10, else 0]"
  }},
  "skin_conclusion": "[2-3 sentence summary of their skin condition, or state that no photo was analyzed]",
  "archetype": {{ "name": "[A short wellness archetype name]", "icon": "[One emoji]", "description": "[2 sentences describing the archetype]" }},
  "plan": [
    {{ "day": 1, "theme": "[Theme]", "icon": "[Emoji]", "morning": "[Task]", "nutrition": "[Task]", "activity": "[Task]", "evening": "[Task]" }}
  ],
  "potential": {{ "age": "[Achievable wellness age after following the plan]", "lifespan": "[Projected lifespan]" }}
}}

The "plan" array must contain exactly 7 days."#
    )
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn prompt_excludes_bookkeeping_keys() {
        let mut session = SessionRecord::new("s1");
        session
            .answers
            .insert("sleep".to_string(), json!("7-8 hours"));
        session
            .answers
            .insert("selfie".to_string(), json!("https://cdn.example/p.jpg"));
        session
            .answers
            .insert("email".to_string(), json!("user@example.com"));

        let prompt = build_generation_prompt(&session);
        assert!(prompt.contains("sleep: 7-8 hours"));
        assert!(!prompt.contains("cdn.example"));
        assert!(!prompt.contains("user@example.com"));
    }

    #[test]
    fn prompt_includes_face_block_when_present() {
        let mut session = SessionRecord::new("s1");
        let mut photo = report_flow::PhotoAnalysis {
            age_estimate: Some(41),
            skin: Default::default(),
        };
        photo.skin.dark_circle = 44.0;
        session.photo_analysis = Some(photo);

        let prompt = build_generation_prompt(&session);
        assert!(prompt.contains("Age appearance: 41"));
        assert!(prompt.contains("Dark circles: 44"));

        session.photo_analysis = None;
        let prompt = build_generation_prompt(&session);
        assert!(prompt.contains("No face analysis available."));
    }
}
