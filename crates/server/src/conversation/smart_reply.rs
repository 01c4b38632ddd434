//! Smart-reply fallback for unmatched conversation input.
//!
//! Ordered substring categories with fixed canned responses, then a random
//! generic acknowledgement. The random source is injectable so tests can
//! pin the choice.

use rand::Rng;

/// Fallback display name when the user never gave one.
const FALLBACK_NAME: &str = "friend";

/// Generic acknowledgement replies, one picked at random when nothing
/// else matches. `{name}` is replaced with the user's display name.
pub const GENERIC_REPLIES: [&str; 4] = [
    "Thanks for your message, {name}! 🙏",
    "Got it! How else can I help you? 🤝",
    "Hi {name}, type 'help' to see what I can do for you! 💡",
    "I appreciate you reaching out. Is there something specific you need? 🎯",
];

/// Source of randomness for the generic fallback reply.
pub trait ReplyPicker: Send + Sync {
    /// Pick an index in `0..len`. `len` is always non-zero.
    fn pick(&self, len: usize) -> usize;
}

/// Production picker backed by the thread-local RNG.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomPicker;

impl ReplyPicker for RandomPicker {
    fn pick(&self, len: usize) -> usize {
        rand::rng().random_range(0..len)
    }
}

/// Build the fallback reply for content that matched no command.
///
/// Categories are checked in order; the first hit wins. The question-mark
/// check covers both the ASCII and the Arabic mark.
#[must_use]
pub fn smart_reply(normalized: &str, name: Option<&str>, picker: &dyn ReplyPicker) -> String {
    let name = name.unwrap_or(FALLBACK_NAME);

    if contains_any(normalized, &["thank", "شكر"]) {
        return format!("You're welcome, {name}! 😊 Always happy to help.");
    }
    if contains_any(normalized, &["price", "cost", "سعر", "تكلفة"]) {
        return "💰 For pricing details, type 'services' or reach out to our sales team."
            .to_string();
    }
    if contains_any(normalized, &["when", "متى", "وقت"]) {
        return "⏰ We are available 24/7. Type 'time' to see the current time.".to_string();
    }
    if normalized.contains('?') || normalized.contains('؟') {
        return format!("🤔 Great question, {name}! Type 'help' for a full list of answers.");
    }

    let index = picker.pick(GENERIC_REPLIES.len());
    GENERIC_REPLIES
        .get(index)
        .unwrap_or(&GENERIC_REPLIES[0])
        .replace("{name}", name)
}

fn contains_any(haystack: &str, needles: &[&str]) -> bool {
    needles.iter().any(|n| haystack.contains(n))
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Picker that always returns a fixed index.
    struct FixedPicker(usize);

    impl ReplyPicker for FixedPicker {
        fn pick(&self, len: usize) -> usize {
            self.0 % len
        }
    }

    #[test]
    fn test_gratitude_category() {
        let reply = smart_reply("thank you so much", Some("Sara"), &FixedPicker(0));
        assert!(reply.contains("You're welcome, Sara"));
    }

    #[test]
    fn test_gratitude_arabic() {
        let reply = smart_reply("شكرا جزيلا", None, &FixedPicker(0));
        assert!(reply.contains("You're welcome, friend"));
    }

    #[test]
    fn test_price_category() {
        let reply = smart_reply("what does it cost", None, &FixedPicker(0));
        assert!(reply.contains("pricing"));
    }

    #[test]
    fn test_time_category() {
        let reply = smart_reply("when are you open", None, &FixedPicker(0));
        assert!(reply.contains("24/7"));
    }

    #[test]
    fn test_question_mark_category() {
        let reply = smart_reply("do you ship abroad?", Some("Omar"), &FixedPicker(0));
        assert!(reply.contains("Great question, Omar"));
    }

    #[test]
    fn test_arabic_question_mark() {
        let reply = smart_reply("هل تشحنون للخارج؟", None, &FixedPicker(0));
        assert!(reply.contains("Great question"));
    }

    #[test]
    fn test_category_order_gratitude_beats_question() {
        // "thank" appears before the question mark in the category order.
        let reply = smart_reply("thank you?", None, &FixedPicker(0));
        assert!(reply.contains("You're welcome"));
    }

    #[test]
    fn test_generic_fallback_uses_picker() {
        for (index, template) in GENERIC_REPLIES.iter().enumerate() {
            let reply = smart_reply("xyz123", Some("Nadia"), &FixedPicker(index));
            assert_eq!(reply, template.replace("{name}", "Nadia"));
        }
    }

    #[test]
    fn test_generic_fallback_is_in_candidate_set() {
        let reply = smart_reply("xyz123", None, &RandomPicker);
        let candidates: Vec<String> = GENERIC_REPLIES
            .iter()
            .map(|t| t.replace("{name}", FALLBACK_NAME))
            .collect();
        assert!(candidates.contains(&reply));
    }
}
