//! Relevance scoring heuristics for social documents.

/// A social post prepared for scoring.
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct SocialDocument {
    pub text: String,
    pub created_at: String,
    pub username: String,
    pub verified: bool,
    pub like_count: u64,
    pub retweet_count: u64,
    pub reply_count: u64,
    pub followers_count: u64,
    pub media_image_urls: Vec<String>,
    pub score: f64,
}

const POSITIVE_KEYWORDS: [&str; 3] = ["good", "great", "excellent"];
const NEGATIVE_KEYWORDS: [&str; 3] = ["bad", "poor", "terrible"];
const IMPORTANT_KEYWORDS: [&str; 3] = ["important", "urgent", "breaking"];

const SCORE_MAX: f64 = 5.0;

/// Additive relevance score over text length, author verification,
/// engagement, media presence, sentiment, keyword frequency and
/// follower influence; capped at 5.0.
pub fn relevance_score(doc: &SocialDocument) -> f64 {
    let mut score = 0.0;

    score += (doc.text.len() as f64 / 500.0).min(1.0);

    if doc.verified {
        score += 0.5;
    }

    let engagement = (doc.like_count + doc.retweet_count + doc.reply_count) as f64 / 1000.0;
    score += engagement.min(1.0);

    if !doc.media_image_urls.is_empty() {
        score += 0.5;
    }

    score += sentiment(&doc.text);
    score += keyword_frequency(&doc.text);
    score += follower_influence(doc.followers_count);

    score.min(SCORE_MAX)
}

fn sentiment(text: &str) -> f64 {
    let lower = text.to_lowercase();
    let positive: usize = POSITIVE_KEYWORDS.iter().map(|w| lower.matches(w).count()).sum();
    let negative: usize = NEGATIVE_KEYWORDS.iter().map(|w| lower.matches(w).count()).sum();

    if positive > negative {
        0.5
    } else if negative > positive {
        -0.5
    } else {
        0.0
    }
}

fn keyword_frequency(text: &str) -> f64 {
    let lower = text.to_lowercase();
    let hits: usize = IMPORTANT_KEYWORDS.iter().map(|w| lower.matches(w).count()).sum();
    (hits as f64 * 0.2).min(1.0)
}

fn follower_influence(followers: u64) -> f64 {
    (followers as f64 / 100_000.0).min(0.5)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_scores_zero() {
        let doc = SocialDocument::default();
        assert_eq!(relevance_score(&doc), 0.0);
    }

    #[test]
    fn verification_and_media_add_half_each() {
        let doc = SocialDocument {
            verified: true,
            media_image_urls: vec!["https://img.example/a.png".into()],
            ..Default::default()
        };
        assert_eq!(relevance_score(&doc), 1.0);
    }

    #[test]
    fn negative_sentiment_subtracts() {
        let positive = SocialDocument {
            text: "great great news".into(),
            ..Default::default()
        };
        let negative = SocialDocument {
            text: "terrible awful news".into(),
            ..Default::default()
        };
        assert!(relevance_score(&positive) > relevance_score(&negative));
    }

    #[test]
    fn score_is_capped() {
        let doc = SocialDocument {
            text: "breaking important urgent great ".repeat(100),
            verified: true,
            like_count: 100_000,
            retweet_count: 100_000,
            reply_count: 100_000,
            followers_count: 10_000_000,
            media_image_urls: vec!["x".into()],
            ..Default::default()
        };
        assert_eq!(relevance_score(&doc), 5.0);
    }
}
