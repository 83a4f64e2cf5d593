//! Prompt templates and response parsing for completion-backed steps.

use serde_json::Value;
use tracing::{info, warn};

/// System prompt for search query generation.
pub const QUERY_SYSTEM_PROMPT: &str = "You generate Pinterest search queries that find beautiful, aesthetic images.

Pinterest is a visual discovery platform. Effective queries combine:
- Subject matter (what's in the image)
- Visual style (photography, illustration, minimalist, editorial, etc.)
- Mood/atmosphere (cozy, dramatic, serene, moody, vibrant, etc.)
- Aesthetic category (cottagecore, dark academia, coastal grandmother, etc.)

Your goal: Generate queries that are BOTH effective on Pinterest AND diverse from each other.

Each query should find a completely different SET of images - vary the style, mood, color palette, or interpretation.

Output ONLY valid JSON.";

/// User prompt asking for `count` diverse queries about `topic`.
#[must_use]
pub fn query_user_prompt(topic: &str, count: usize) -> String {
    let placeholders = (1..=count)
        .map(|i| format!("\"query{i}\""))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "User wants images about: {topic}

Generate {count} Pinterest search queries. Requirements:

1. Each query must find DIFFERENT images (vary style, mood, aesthetic, or angle)
2. Use 3-5 words per query - specific enough to find good results
3. Include at least one style/mood/aesthetic term in each query
4. Think about different visual interpretations:
   - Different color palettes (warm vs cool, bright vs muted)
   - Different styles (photography vs illustration, minimal vs maximal)
   - Different moods (cozy vs dramatic, peaceful vs energetic)
   - Different contexts or settings

JSON format:
{{\"queries\": [{placeholders}]}}"
    )
}

/// Extracts up to `limit` queries from a `{"queries": [...]}` response.
///
/// Falls back to `[topic]` when the list is missing, empty or malformed.
#[must_use]
pub fn parse_queries(response: &Value, topic: &str, limit: usize) -> Vec<String> {
    let queries: Vec<String> = response
        .get("queries")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::trim)
                .filter(|q| !q.is_empty())
                .map(ToString::to_string)
                .take(limit)
                .collect()
        })
        .unwrap_or_default();

    if queries.is_empty() {
        warn!(topic, "Failed to generate queries, using prompt directly");
        return vec![topic.to_string()];
    }

    for (i, query) in queries.iter().enumerate() {
        info!(topic, index = i + 1, query = %query, "Generated search query");
    }
    queries
}

/// System prompt for the person-image prompt.
pub const PERSON_SYSTEM_PROMPT: &str = "You write hyper-detailed JSON prompts for authentic-looking UGC selfies \
that read like real social media content. Describe subject, expression, wardrobe, setting, lighting and camera. \
Output ONLY valid JSON.";

/// System prompt for the animation prompt.
pub const REACTION_SYSTEM_PROMPT: &str = "You describe subtle movements that bring a still reaction photo to life: \
eyes, head, breathing and micro-expressions. Output ONLY valid JSON with keys \"movements\" (list of strings) and \
\"final_prompt\" (string).";

/// Appearance attributes for the person-image prompt.
#[derive(Debug, Clone, Copy)]
pub struct PersonTraits<'a> {
    /// e.g. "female".
    pub gender: &'a str,
    /// e.g. "early_20s".
    pub age_range: &'a str,
    /// e.g. "shocked".
    pub emotion: &'a str,
    /// e.g. "coquette".
    pub style: &'a str,
    /// e.g. "bedroom".
    pub setting: &'a str,
    /// e.g. "brown".
    pub hair_color: &'a str,
    /// e.g. "caucasian".
    pub ethnicity: &'a str,
    /// e.g. "casual".
    pub clothing: &'a str,
    /// Extra guidance from the caller.
    pub context: Option<&'a str>,
}

/// User prompt for the person-image prompt.
#[must_use]
pub fn person_user_prompt(traits: &PersonTraits<'_>) -> String {
    format!(
        "Create a UGC person image prompt.\n\
         gender: {}\nage_range: {}\nemotion: {}\nstyle: {}\nsetting: {}\n\
         hair_color: {}\nethnicity: {}\nclothing: {}\ncontext: {}",
        traits.gender,
        traits.age_range,
        traits.emotion,
        traits.style,
        traits.setting,
        traits.hair_color,
        traits.ethnicity,
        traits.clothing,
        traits.context.unwrap_or("casual social media content"),
    )
}

/// Image models take the structured prompt as compact JSON.
#[must_use]
pub fn person_prompt_text(response: &Value) -> String {
    match response {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// User prompt for the animation prompt.
#[must_use]
pub fn reaction_user_prompt(emotion: &str, context: Option<&str>, duration_secs: u32) -> String {
    format!(
        "Animate a still photo of a person reacting.\nemotion: {emotion}\ncontext: {}\nduration: {duration_secs} seconds",
        context.unwrap_or("something surprising"),
    )
}

/// Picks `final_prompt`, else builds one from `movements`, else a generic
/// reaction prompt.
#[must_use]
pub fn reaction_prompt_text(response: &Value, emotion: &str) -> String {
    if let Some(prompt) = response
        .get("final_prompt")
        .and_then(Value::as_str)
        .filter(|p| !p.trim().is_empty())
    {
        return prompt.to_string();
    }

    let movements: Vec<&str> = response
        .get("movements")
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default();

    let closing =
        format!("Slow, cinematic {emotion} reaction. No speech, no text, mouth stays closed.");
    if movements.is_empty() {
        closing
    } else {
        format!("{}. {closing}", movements.join(". "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_query_prompt_mentions_count_and_format() {
        let prompt = query_user_prompt("cozy autumn", 3);
        assert!(prompt.starts_with("User wants images about: cozy autumn"));
        assert!(prompt.contains("Generate 3 Pinterest search queries"));
        assert!(prompt.contains(r#"{"queries": ["query1", "query2", "query3"]}"#));
    }

    #[test]
    fn test_parse_queries_truncates() {
        let response = json!({"queries": ["a", "b", " ", "c", "d"]});
        assert_eq!(parse_queries(&response, "topic", 2), vec!["a", "b"]);
        assert_eq!(parse_queries(&response, "topic", 10), vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn test_parse_queries_falls_back_to_topic() {
        assert_eq!(parse_queries(&json!({}), "cozy autumn", 5), vec!["cozy autumn"]);
        assert_eq!(parse_queries(&json!({"queries": []}), "t", 5), vec!["t"]);
        assert_eq!(parse_queries(&json!({"queries": "nope"}), "t", 5), vec!["t"]);
        assert_eq!(parse_queries(&json!([1, 2]), "t", 5), vec!["t"]);
    }

    #[test]
    fn test_reaction_prompt_fallbacks() {
        let full = json!({"final_prompt": "She gasps.", "movements": ["x"]});
        assert_eq!(reaction_prompt_text(&full, "shocked"), "She gasps.");

        let movements = json!({"movements": ["Eyes widen", "Head tilts back"]});
        assert_eq!(
            reaction_prompt_text(&movements, "shocked"),
            "Eyes widen. Head tilts back. Slow, cinematic shocked reaction. No speech, no text, mouth stays closed."
        );

        assert!(reaction_prompt_text(&json!({}), "scared").starts_with("Slow, cinematic scared"));
    }

    #[test]
    fn test_person_prompt_is_compact_json() {
        let response = json!({"subject": {"age": "early_20s"}});
        assert_eq!(person_prompt_text(&response), r#"{"subject":{"age":"early_20s"}}"#);
    }
}
