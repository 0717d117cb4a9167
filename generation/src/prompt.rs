//! Prompt construction.
//!
//! [`build_prompt`] is a pure function of the identity: the same identity
//! always yields the same prompt, and every non-empty attribute appears in
//! it exactly once.

use portrait_core::ProfileIdentity;

pub const DEFAULT_TRAIT: &str = "a natural and authentic expression";

const STYLE_DIRECTIVES: &str = "Shot with soft, even studio lighting against a neutral background. \
     Head-and-shoulders framing with sharp focus on the eyes. \
     Photorealistic, high resolution, no text and no watermark.";

const PERSONALITY_TRAITS: [(&str, &str); 16] = [
    ("INTJ", "a composed, thoughtful gaze with a subtle, confident expression"),
    ("INTP", "a curious, contemplative look with a hint of a wry smile"),
    ("ENTJ", "a confident, assertive expression with a steady, direct gaze"),
    ("ENTP", "a playful, quick-witted smile with bright, inquisitive eyes"),
    ("INFJ", "a gentle, insightful expression with warm, knowing eyes"),
    ("INFP", "a soft, dreamy expression with a kind, sincere smile"),
    ("ENFJ", "a warm, encouraging smile with an open, engaging presence"),
    ("ENFP", "an enthusiastic, bright smile with lively and expressive eyes"),
    ("ISTJ", "a calm, dependable expression with a neat, composed posture"),
    ("ISFJ", "a kind, gentle smile with a caring, attentive look"),
    ("ESTJ", "a polished, self-assured expression with a firm, professional demeanor"),
    ("ESFJ", "a friendly, welcoming smile with approachable warmth"),
    ("ISTP", "a relaxed, observant expression with cool, understated confidence"),
    ("ISFP", "a serene, artistic expression with a soft, natural smile"),
    ("ESTP", "a bold, energetic grin with a lively, adventurous spark"),
    ("ESFP", "a radiant, joyful smile with vibrant, outgoing energy")
];

/// Visual trait phrase for a four-letter personality code, case-insensitive.
pub fn personality_trait(code: Option<&str>) -> &'static str {
    let Some(code) = code.map(str::trim).filter(|code| !code.is_empty()) else {
        return DEFAULT_TRAIT;
    };

    PERSONALITY_TRAITS
        .iter()
        .find(|(key, _)| key.eq_ignore_ascii_case(code))
        .map_or(DEFAULT_TRAIT, |(_, phrase)| *phrase)
}

pub fn build_prompt(identity: &ProfileIdentity) -> String {
    let subject = subject_phrase(identity);
    let name = identity.full_name();

    let mut prompt = if name.is_empty() {
        format!("Professional headshot portrait photograph of {subject}.")
    } else {
        format!("Professional headshot portrait photograph of {name}, {subject}.")
    };

    prompt.push_str(" They have ");
    prompt.push_str(personality_trait(identity.personality_type.as_deref()));
    prompt.push('.');

    if let Some(bio) = non_empty(identity.bio.as_deref()) {
        prompt.push_str(" Background: ");
        prompt.push_str(bio);
        if !bio.ends_with(['.', '!', '?']) {
            prompt.push('.');
        }
    }

    prompt.push(' ');
    prompt.push_str(STYLE_DIRECTIVES);
    prompt
}

/// "a 26-year-old Hispanic woman", "an Asian person", ...
fn subject_phrase(identity: &ProfileIdentity) -> String {
    let mut words = Vec::with_capacity(3);
    if let Some(age) = identity.age {
        words.push(format!("{age}-year-old"));
    }
    if let Some(ethnicity) = non_empty(identity.ethnicity.as_deref()) {
        words.push(ethnicity.to_string());
    }
    words.push(
        identity
            .gender
            .map_or("person", |gender| gender.descriptor())
            .to_string()
    );

    let article = if starts_with_vowel_sound(&words[0], identity.age) { "an" } else { "a" };
    format!("{article} {}", words.join(" "))
}

fn starts_with_vowel_sound(word: &str, age: Option<u32>) -> bool {
    match age {
        Some(age) => age == 11 || age == 18 || age.to_string().starts_with('8'),
        None => word
            .chars()
            .next()
            .is_some_and(|c| matches!(c.to_ascii_lowercase(), 'a' | 'e' | 'i' | 'o' | 'u'))
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use portrait_core::Gender;

    fn occurrences(haystack: &str, needle: &str) -> usize {
        haystack.matches(needle).count()
    }

    fn enfp_profile() -> ProfileIdentity {
        ProfileIdentity::new("p1", "Maria", "Lopez")
            .with_age(26)
            .with_ethnicity("Hispanic")
            .with_gender(Gender::Female)
            .with_bio("Loves hiking")
            .with_personality("ENFP")
    }

    #[test]
    fn test_prompt_contains_every_attribute_once() {
        let prompt = build_prompt(&enfp_profile());

        for expected in ["26-year-old", "Hispanic", "woman", "Loves hiking", "enthusiastic", "Maria Lopez"] {
            assert_eq!(occurrences(&prompt, expected), 1, "{expected} in {prompt}");
        }
        assert!(prompt.contains("no watermark"));
    }

    #[test]
    fn test_prompt_is_deterministic() {
        let profile = enfp_profile();
        assert_eq!(build_prompt(&profile), build_prompt(&profile.clone()));
    }

    #[test]
    fn test_blank_bio_omits_clause() {
        let profile = enfp_profile().with_bio("   ");
        let prompt = build_prompt(&profile);
        assert!(!prompt.contains("Background:"));

        let mut profile = enfp_profile();
        profile.bio = None;
        assert_eq!(build_prompt(&profile), prompt);
    }

    #[test]
    fn test_unknown_personality_falls_back() {
        assert_eq!(personality_trait(Some("XXXX")), DEFAULT_TRAIT);
        assert_eq!(personality_trait(None), DEFAULT_TRAIT);
        assert_eq!(personality_trait(Some(" ")), DEFAULT_TRAIT);

        let prompt = build_prompt(&enfp_profile().with_personality("unknown"));
        assert!(prompt.contains(DEFAULT_TRAIT));
        assert!(!prompt.contains("enthusiastic"));
    }

    #[test]
    fn test_personality_lookup_is_case_insensitive() {
        assert_eq!(personality_trait(Some("enfp")), personality_trait(Some("ENFP")));
        assert!(personality_trait(Some("istj")).contains("dependable"));
    }

    #[test]
    fn test_every_table_entry_is_distinct() {
        let mut phrases: Vec<_> = PERSONALITY_TRAITS.iter().map(|(_, phrase)| *phrase).collect();
        phrases.sort_unstable();
        phrases.dedup();
        assert_eq!(phrases.len(), 16);
    }

    #[test]
    fn test_gender_terms_are_neutral_descriptors() {
        let male = build_prompt(&ProfileIdentity::new("m", "Sam", "Lee").with_gender(Gender::Male));
        assert!(male.contains("a man."));

        let other = build_prompt(&ProfileIdentity::new("o", "Alex", "Kim").with_gender(Gender::NonBinary));
        assert!(other.contains("a person."));
    }

    #[test]
    fn test_article_follows_leading_sound() {
        let eighty = build_prompt(&ProfileIdentity::new("a", "Ann", "Doe").with_age(80));
        assert!(eighty.contains("an 80-year-old"));

        let asian = build_prompt(&ProfileIdentity::new("b", "Bo", "Chen").with_ethnicity("Asian"));
        assert!(asian.contains("an Asian person"));

        let young = build_prompt(&ProfileIdentity::new("c", "Cy", "Ray").with_age(26));
        assert!(young.contains("a 26-year-old"));
    }

    #[test]
    fn test_empty_name_is_omitted() {
        let prompt = build_prompt(&ProfileIdentity::new("anon", "", " "));
        assert!(prompt.starts_with("Professional headshot portrait photograph of a person."));
    }
}
