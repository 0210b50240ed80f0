#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentType {
    Exciting,
    Technical,
    Controversial,
    Complex,
    General,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentEmotion {
    Positive,
    Neutral,
    Negative,
}

const EXCITING: &[&str] = &["breakthrough", "remarkable", "stunning", "groundbreaking", "surprising"];
const TECHNICAL: &[&str] = &["algorithm", "architecture", "parameter", "gradient", "matrix", "equation"];
const CONTROVERSIAL: &[&str] = &["debate", "criticized", "disputed", "controversial", "flawed"];
const COMPLEX: &[&str] = &["nonetheless", "furthermore", "notwithstanding", "concomitant"];

const POSITIVE: &[&str] = &["excellent", "success", "improve", "promising", "effective"];
const NEGATIVE: &[&str] = &["fail", "problem", "limitation", "concerning", "risk"];

fn score(text: &str, lexicon: &[&str]) -> usize {
    let lower = text.to_ascii_lowercase();
    lexicon.iter().filter(|w| lower.contains(*w)).count()
}

/// Returns the highest-scoring bucket; ties favor the order
/// exciting > technical > controversial > complex, with `general` as the
/// fallback when nothing matches.
pub fn classify_content_type(text: &str) -> ContentType {
    let scores = [
        (ContentType::Exciting, score(text, EXCITING)),
        (ContentType::Technical, score(text, TECHNICAL)),
        (ContentType::Controversial, score(text, CONTROVERSIAL)),
        (ContentType::Complex, score(text, COMPLEX)),
    ];
    scores
        .into_iter()
        .filter(|(_, s)| *s > 0)
        .max_by_key(|(_, s)| *s)
        .map(|(t, _)| t)
        .unwrap_or(ContentType::General)
}

pub fn classify_content_emotion(text: &str) -> ContentEmotion {
    let positive = score(text, POSITIVE);
    let negative = score(text, NEGATIVE);
    if positive == 0 && negative == 0 {
        ContentEmotion::Neutral
    } else if positive >= negative {
        ContentEmotion::Positive
    } else {
        ContentEmotion::Negative
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_technical_content() {
        assert_eq!(
            classify_content_type("The gradient descent algorithm converges on this architecture"),
            ContentType::Technical
        );
    }

    #[test]
    fn falls_back_to_general_with_no_matches() {
        assert_eq!(classify_content_type("The weather was nice today"), ContentType::General);
    }

    #[test]
    fn classifies_negative_emotion() {
        assert_eq!(
            classify_content_emotion("This has a serious limitation and failed to replicate"),
            ContentEmotion::Negative
        );
    }
}
