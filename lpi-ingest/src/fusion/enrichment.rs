// Enrichment Pass - Headline Heuristics
//
// Derives tags and a role level from the merged headline. Deterministic and
// recomputable; nothing here feeds back into merging.

use crate::types::{EnrichedProfile, MergedProfile, RoleLevel};

/// Characters that separate tag candidates in a headline
const TAG_SEPARATORS: &[char] = &['|', '-', '@', ',', '&', '(', ')'];

/// Tags must be longer than this many characters
const MIN_TAG_CHARS: usize = 2;

/// Tags must be shorter than this many characters
const MAX_TAG_CHARS: usize = 50;

pub const MAX_TAGS: usize = 5;

/// Keyword sets checked in order; the first set with a match wins
const ROLE_KEYWORDS: [(RoleLevel, &[&str]); 4] = [
    (
        RoleLevel::Senior,
        &[
            "senior", "sr", "lead", "principal", "staff", "head", "director", "manager", "vp",
            "chief", "cto", "ceo", "cfo", "coo", "founder", "cofounder", "architect", "partner",
        ],
    ),
    (
        RoleLevel::Junior,
        &["junior", "jr", "entry", "intern", "internship", "trainee", "graduate", "apprentice", "associate"],
    ),
    (
        RoleLevel::Engineer,
        &[
            "software", "engineer", "engineering", "developer", "programmer", "devops", "sre",
            "fullstack", "frontend", "backend", "coder",
        ],
    ),
    (
        RoleLevel::Student,
        &["student", "phd", "researcher", "candidate", "undergraduate", "postgraduate", "msc", "bsc"],
    ),
];

/// Split a headline into at most five distinct tags
///
/// Order of first appearance is kept; duplicates are exact matches after
/// trimming.
pub fn extract_tags(headline: &str) -> Vec<String> {
    let mut tags: Vec<String> = Vec::new();

    for part in headline.split(TAG_SEPARATORS) {
        let part = part.trim();
        let chars = part.chars().count();
        if chars <= MIN_TAG_CHARS || chars >= MAX_TAG_CHARS {
            continue;
        }
        if tags.iter().any(|t| t == part) {
            continue;
        }

        tags.push(part.to_string());
        if tags.len() == MAX_TAGS {
            break;
        }
    }

    tags
}

/// Classify the headline into a role level
///
/// Keywords match whole words case-insensitively, so "Leadership" is not
/// "lead" and "Associate Professor" is junior only by the "associate" word.
pub fn classify_role(headline: &str) -> RoleLevel {
    let words: Vec<String> = headline
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
        .collect();

    ROLE_KEYWORDS
        .iter()
        .find(|(_, keywords)| words.iter().any(|w| keywords.contains(&w.as_str())))
        .map(|(level, _)| *level)
        .unwrap_or(RoleLevel::Professional)
}

/// Attach derived attributes to a merged profile
pub fn enrich(profile: MergedProfile) -> EnrichedProfile {
    let tags = extract_tags(&profile.headline);
    let role_level = classify_role(&profile.headline);

    tracing::debug!(
        tags = tags.len(),
        role_level = role_level.as_str(),
        "Profile enriched"
    );

    EnrichedProfile {
        profile,
        tags,
        role_level,
    }
}
