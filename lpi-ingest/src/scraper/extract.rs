//! Public profile page extraction
//!
//! Pattern-based extraction from profile HTML. Paths are tried in priority
//! order and the first that yields anything wins:
//! 1. JSON-LD `Person` structured data
//! 2. `description` / `og:description` meta tags
//! 3. The page `<title>`
//! 4. The embedded client-side state blob (`<code>` elements)
//!
//! Markup changes break this regularly; every path returns `None` rather
//! than failing so a broken path simply falls through to the next.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use std::collections::HashMap;

use super::{ExtractionMethod, ScrapedFragment};

static JSON_LD_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?is)<script[^>]*type\s*=\s*["']application/ld\+json["'][^>]*>(.*?)</script>"#)
        .expect("valid JSON-LD regex")
});

static META_TAG_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<meta\s[^>]*>").expect("valid meta regex"));

static ATTRIBUTE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?s)([a-zA-Z_:-]+)\s*=\s*(?:"([^"]*)"|'([^']*)')"#).expect("valid attribute regex")
});

static TITLE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<title[^>]*>(.*?)</title>").expect("valid title regex"));

static CODE_BLOCK_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<code[^>]*>(.*?)</code>").expect("valid code regex"));

static STATE_FIELD_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#""(headline|firstName|lastName)"\s*:\s*"((?:[^"\\]|\\.)*)""#)
        .expect("valid state field regex")
});

static ENTITY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"&(#[xX][0-9a-fA-F]+|#[0-9]+|[a-zA-Z]+);").expect("valid entity regex")
});

/// Separators LinkedIn uses between headline and the rest of a description
const DESCRIPTION_SEPARATORS: [&str; 2] = [" · ", " | "];

/// Extract profile fields from a public profile page
pub fn extract_profile(html: &str) -> ScrapedFragment {
    let paths: [(ExtractionMethod, fn(&str) -> Option<ScrapedFragment>); 4] = [
        (ExtractionMethod::JsonLd, from_json_ld),
        (ExtractionMethod::MetaDescription, from_meta_tags),
        (ExtractionMethod::Title, from_title),
        (ExtractionMethod::EmbeddedState, from_embedded_state),
    ];

    for (method, extract) in paths {
        if let Some(mut fragment) = extract(html).filter(|f| !f.is_empty()) {
            tracing::debug!(method = method.as_str(), "Profile page fields extracted");
            fragment.extraction_method = Some(method);
            return fragment;
        }
    }

    tracing::debug!("No extraction path matched the profile page");
    ScrapedFragment::default()
}

// ============================================================================
// JSON-LD
// ============================================================================

fn from_json_ld(html: &str) -> Option<ScrapedFragment> {
    JSON_LD_RE
        .captures_iter(html)
        .filter_map(|caps| serde_json::from_str::<Value>(caps.get(1)?.as_str().trim()).ok())
        .find_map(|doc| find_person(&doc).map(person_to_fragment))
}

/// Locate a `Person` node in a JSON-LD document (object, array, or `@graph`)
fn find_person(doc: &Value) -> Option<&Value> {
    match doc {
        Value::Array(items) => items.iter().find_map(find_person),
        Value::Object(map) => {
            if is_person(doc) {
                return Some(doc);
            }
            map.get("@graph").and_then(find_person)
        }
        _ => None,
    }
}

fn is_person(node: &Value) -> bool {
    match node.get("@type") {
        Some(Value::String(t)) => t == "Person",
        Some(Value::Array(types)) => types.iter().any(|t| t.as_str() == Some("Person")),
        _ => false,
    }
}

fn person_to_fragment(person: &Value) -> ScrapedFragment {
    let text = |key: &str| first_string(person.get(key)).map(|s| decode_entities(&s));

    let mut fragment = ScrapedFragment {
        first_name: text("givenName"),
        last_name: text("familyName"),
        headline: text("jobTitle").or_else(|| text("description")),
        image_url: image_url(person.get("image")),
        profile_url: text("url"),
        ..Default::default()
    };

    if fragment.first_name.is_none() && fragment.last_name.is_none() {
        if let Some(name) = text("name") {
            let (first, last) = split_full_name(&name);
            fragment.first_name = first;
            fragment.last_name = last;
        }
    }

    fragment.normalized()
}

/// String value, or the first string of an array
fn first_string(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) => Some(s.clone()),
        Value::Array(items) => items.iter().find_map(|v| v.as_str().map(str::to_string)),
        _ => None,
    }
}

/// `image` as a URL string or an `ImageObject`
fn image_url(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) => Some(s.clone()),
        Value::Object(obj) => obj
            .get("contentUrl")
            .or_else(|| obj.get("url"))
            .and_then(Value::as_str)
            .map(str::to_string),
        Value::Array(items) => items.iter().find_map(|v| image_url(Some(v))),
        _ => None,
    }
}

// ============================================================================
// Meta tags
// ============================================================================

fn from_meta_tags(html: &str) -> Option<ScrapedFragment> {
    let meta = meta_contents(html);

    let description = meta
        .get("description")
        .or_else(|| meta.get("og:description"))
        .map(String::as_str)
        .filter(|d| !is_boilerplate_description(d));

    let headline = description.map(|d| {
        DESCRIPTION_SEPARATORS
            .iter()
            .filter_map(|sep| d.split_once(sep).map(|(head, _)| head))
            .min_by_key(|head| head.len())
            .unwrap_or(d)
            .to_string()
    });

    let fragment = ScrapedFragment {
        headline,
        image_url: meta.get("og:image").cloned(),
        ..Default::default()
    };

    // og:image alone is usually the generic LinkedIn logo, not a profile
    if fragment.headline.is_none() {
        return None;
    }

    Some(fragment.normalized())
}

/// `name`/`property` → decoded `content` for every meta tag
fn meta_contents(html: &str) -> HashMap<String, String> {
    let mut out = HashMap::new();

    for tag in META_TAG_RE.find_iter(html) {
        let mut key = None;
        let mut content = None;

        for attr in ATTRIBUTE_RE.captures_iter(tag.as_str()) {
            let name = attr.get(1).map(|m| m.as_str().to_ascii_lowercase());
            let value = attr.get(2).or_else(|| attr.get(3)).map(|m| m.as_str());
            match (name.as_deref(), value) {
                (Some("name") | Some("property"), Some(v)) => key = Some(v.to_ascii_lowercase()),
                (Some("content"), Some(v)) => content = Some(decode_entities(v)),
                _ => {}
            }
        }

        if let (Some(k), Some(c)) = (key, content) {
            out.entry(k).or_insert(c);
        }
    }

    out
}

fn is_boilerplate_description(description: &str) -> bool {
    let lower = description.to_lowercase();
    lower.starts_with("view ") && lower.contains("profile on linkedin")
}

// ============================================================================
// Title
// ============================================================================

/// `<title>Jane Doe - Senior Engineer - Acme | LinkedIn</title>`
fn from_title(html: &str) -> Option<ScrapedFragment> {
    let raw = TITLE_RE.captures(html)?.get(1)?.as_str();
    let title = decode_entities(raw.trim());

    let title = title
        .strip_suffix("| LinkedIn")
        .or_else(|| title.strip_suffix("- LinkedIn"))
        .unwrap_or(&title)
        .trim();

    if title.is_empty() || title.eq_ignore_ascii_case("linkedin") || title.contains("Sign Up") {
        return None;
    }

    let (name, headline) = match title.split_once(" - ") {
        Some((name, rest)) => (name.trim(), Some(rest.trim().to_string())),
        None => (title, None),
    };

    let (first_name, last_name) = split_full_name(name);

    Some(
        ScrapedFragment {
            first_name,
            last_name,
            headline,
            ..Default::default()
        }
        .normalized(),
    )
}

// ============================================================================
// Embedded state
// ============================================================================

fn from_embedded_state(html: &str) -> Option<ScrapedFragment> {
    let mut fragment = ScrapedFragment::default();

    for block in CODE_BLOCK_RE.captures_iter(html) {
        let Some(body) = block.get(1) else { continue };
        let decoded = decode_entities(body.as_str());

        for field in STATE_FIELD_RE.captures_iter(&decoded) {
            let (Some(key), Some(raw)) = (field.get(1), field.get(2)) else {
                continue;
            };
            let Some(value) = unescape_json_string(raw.as_str()) else {
                continue;
            };

            let slot = match key.as_str() {
                "headline" => &mut fragment.headline,
                "firstName" => &mut fragment.first_name,
                "lastName" => &mut fragment.last_name,
                _ => continue,
            };
            if slot.is_none() && !value.trim().is_empty() {
                *slot = Some(value);
            }
        }
    }

    Some(fragment.normalized())
}

fn unescape_json_string(raw: &str) -> Option<String> {
    serde_json::from_str::<String>(&format!("\"{}\"", raw)).ok()
}

// ============================================================================
// Helpers
// ============================================================================

fn split_full_name(name: &str) -> (Option<String>, Option<String>) {
    let name = name.trim();
    if name.is_empty() {
        return (None, None);
    }
    match name.split_once(' ') {
        Some((first, last)) => (Some(first.to_string()), Some(last.trim().to_string())),
        None => (Some(name.to_string()), None),
    }
}

/// Decode the HTML entities that appear in LinkedIn markup
pub fn decode_entities(text: &str) -> String {
    ENTITY_RE
        .replace_all(text, |caps: &regex::Captures<'_>| {
            let entity = &caps[1];
            let decoded = if let Some(hex) = entity.strip_prefix("#x").or_else(|| entity.strip_prefix("#X")) {
                u32::from_str_radix(hex, 16).ok().and_then(char::from_u32)
            } else if let Some(dec) = entity.strip_prefix('#') {
                dec.parse::<u32>().ok().and_then(char::from_u32)
            } else {
                match entity {
                    "amp" => Some('&'),
                    "lt" => Some('<'),
                    "gt" => Some('>'),
                    "quot" => Some('"'),
                    "apos" => Some('\''),
                    "nbsp" => Some(' '),
                    _ => None,
                }
            };
            decoded.map(String::from).unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}
