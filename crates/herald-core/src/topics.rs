//! Topic vocabulary and keyword/URL classification.
//!
//! The vocabulary is a static table. Each topic's keywords compile once into
//! a single case-insensitive, word-bounded regular expression.

use std::collections::BTreeSet;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::models::TopicSlug;

/// One entry of the topic vocabulary.
#[derive(Debug, Clone, Copy)]
pub struct TopicDef {
    pub slug: &'static str,
    pub label: &'static str,
    pub keywords: &'static [&'static str],
}

pub const TOPICS: &[TopicDef] = &[
    TopicDef {
        slug: "weather-flood",
        label: "Flooding",
        keywords: &["flood", "flooding", "flash flood", "high water", "storm surge"],
    },
    TopicDef {
        slug: "weather-storm",
        label: "Severe storms",
        keywords: &[
            "storm", "thunderstorm", "tornado", "hail", "blizzard", "hurricane",
            "severe weather",
        ],
    },
    TopicDef {
        slug: "weather-heat",
        label: "Extreme heat",
        keywords: &["heat wave", "heat advisory", "extreme heat", "heatstroke"],
    },
    TopicDef {
        slug: "wildfire",
        label: "Wildfires",
        keywords: &["wildfire", "brush fire", "forest fire", "evacuation order"],
    },
    TopicDef {
        slug: "structure-fire",
        label: "Fires",
        keywords: &["house fire", "apartment fire", "blaze", "firefighters", "fire crews"],
    },
    TopicDef {
        slug: "earthquake",
        label: "Earthquakes",
        keywords: &["earthquake", "quake", "aftershock", "tremor", "magnitude"],
    },
    TopicDef {
        slug: "power-outage",
        label: "Power outages",
        keywords: &["power outage", "outage", "blackout", "without power", "downed lines"],
    },
    TopicDef {
        slug: "traffic-crash",
        label: "Traffic incidents",
        keywords: &["crash", "collision", "pileup", "road closure", "highway closed"],
    },
    TopicDef {
        slug: "crime-shooting",
        label: "Shootings",
        keywords: &["shooting", "shot", "gunfire", "gunman", "shots fired"],
    },
    TopicDef {
        slug: "crime-theft",
        label: "Theft and burglary",
        keywords: &["burglary", "robbery", "theft", "stolen", "carjacking"],
    },
    TopicDef {
        slug: "public-health",
        label: "Public health",
        keywords: &["outbreak", "boil water", "health advisory", "contamination", "recall"],
    },
    TopicDef {
        slug: "missing-person",
        label: "Missing persons",
        keywords: &["missing", "amber alert", "silver alert", "search and rescue"],
    },
];

pub fn is_known_topic(slug: &str) -> bool {
    TOPICS.iter().any(|t| t.slug == slug)
}

pub fn find_topic(slug: &str) -> Option<&'static TopicDef> {
    TOPICS.iter().find(|t| t.slug == slug)
}

/// One `("kw1" OR "kw2" ...)` clause per distinct known slug, in input order.
pub fn filter_query_clauses(slugs: &[TopicSlug]) -> Vec<String> {
    let mut seen: Vec<&str> = Vec::new();
    let mut clauses = Vec::new();
    for slug in slugs {
        let Some(topic) = find_topic(slug) else {
            continue;
        };
        if seen.contains(&topic.slug) {
            continue;
        }
        seen.push(topic.slug);
        let terms: Vec<String> = topic.keywords.iter().map(|k| format!("\"{k}\"")).collect();
        clauses.push(format!("({})", terms.join(" OR ")));
    }
    clauses
}

struct CompiledTopic {
    slug: &'static str,
    pattern: Regex,
    slug_parts: Vec<&'static str>,
}

static COMPILED: Lazy<Vec<CompiledTopic>> = Lazy::new(|| {
    TOPICS
        .iter()
        .filter_map(|topic| {
            let alternation = topic
                .keywords
                .iter()
                .map(|k| regex::escape(k))
                .collect::<Vec<_>>()
                .join("|");
            let pattern = Regex::new(&format!(r"(?i)\b(?:{alternation})\b")).ok()?;
            Some(CompiledTopic {
                slug: topic.slug,
                pattern,
                slug_parts: topic.slug.split('-').filter(|p| !p.is_empty()).collect(),
            })
        })
        .collect()
});

/// Tag `text` (title and summary) and optionally its URL with matching topics.
///
/// A topic matches when one of its keywords appears as a whole word in the
/// text, or when any hyphen-separated part of its slug appears in the URL.
pub fn classify(text: &str, url: Option<&str>) -> BTreeSet<TopicSlug> {
    let url = url.map(str::to_lowercase);
    COMPILED
        .iter()
        .filter(|topic| {
            topic.pattern.is_match(text)
                || url
                    .as_deref()
                    .is_some_and(|u| topic.slug_parts.iter().any(|part| u.contains(part)))
        })
        .map(|topic| topic.slug.to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_topic_compiles() {
        assert_eq!(COMPILED.len(), TOPICS.len());
    }

    #[test]
    fn known_topics() {
        assert!(is_known_topic("weather-flood"));
        assert!(!is_known_topic("not-a-real-slug"));
    }

    #[test]
    fn classify_by_keyword_is_case_insensitive() {
        let tags = classify("FLASH FLOOD warning issued for river towns", None);
        assert!(tags.contains("weather-flood"));
    }

    #[test]
    fn classify_respects_word_boundaries() {
        let tags = classify("Shotput champion crowned at state meet", None);
        assert!(!tags.contains("crime-shooting"));
    }

    #[test]
    fn classify_matches_many_topics() {
        let tags = classify("Storm leaves thousands without power", None);
        assert!(tags.contains("weather-storm"));
        assert!(tags.contains("power-outage"));
    }

    #[test]
    fn classify_by_url_slug_part() {
        let tags = classify(
            "City council meets Tuesday",
            Some("https://news.example.com/Earthquake/update"),
        );
        assert_eq!(tags.into_iter().collect::<Vec<_>>(), vec!["earthquake"]);
    }

    #[test]
    fn classify_can_return_nothing() {
        assert!(classify("Library extends weekend hours", Some("https://a.com/library")).is_empty());
    }

    #[test]
    fn clauses_are_deduplicated_and_skip_unknown() {
        let clauses = filter_query_clauses(&[
            "wildfire".into(),
            "wildfire".into(),
            "bogus".into(),
            "earthquake".into(),
        ]);
        assert_eq!(clauses.len(), 2);
        assert!(clauses[0].starts_with("(\"wildfire\" OR"));
    }
}
