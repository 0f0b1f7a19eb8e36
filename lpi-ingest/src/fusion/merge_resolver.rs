// Field Merge Resolver - Precedence-Based Field Selection
//
// Scrape > LegacyApi > EmailLookup > UserInfo > Constructed, per field.

use crate::types::{
    CandidateObservation, FieldName, ImageVariant, MergedProfile, ObservationSet, ObservedValue,
    ProfileProvenance, SourceId,
};
use tracing::debug;

/// Combines candidate observations into one profile
///
/// Stateless; `resolve` is a pure function of the observation set and does
/// not depend on the order observations were gathered in.
#[derive(Debug, Clone, Copy, Default)]
pub struct FieldMergeResolver;

impl FieldMergeResolver {
    pub fn new() -> Self {
        Self
    }

    /// Resolve every field of the profile
    pub fn resolve(&self, observations: &ObservationSet) -> MergedProfile {
        let mut profile = MergedProfile::default();
        let mut provenance = ProfileProvenance::default();

        for field in FieldName::ALL {
            let Some((source, value)) = resolve_field(observations, field) else {
                continue;
            };

            log_disagreement(observations, field, source, &value);

            match field {
                FieldName::IdentityId => profile.identity_id = value,
                FieldName::GivenName => profile.given_name = value,
                FieldName::FamilyName => profile.family_name = value,
                FieldName::Headline => profile.headline = value,
                FieldName::Email => profile.email = value,
                FieldName::Avatar => profile.avatar_url = value,
                FieldName::ProfileUrl => profile.profile_url = value,
            }
            provenance.set(field, Some(source));
        }

        profile.profile_url_guessed = provenance.profile_url == Some(SourceId::Constructed);
        profile.provenance = provenance;

        debug!(
            fields_present = profile.fields_present().len(),
            guessed_url = profile.profile_url_guessed,
            "Profile fields resolved"
        );

        profile
    }
}

/// Winning source and value for one field, `None` when unobserved
fn resolve_field(observations: &ObservationSet, field: FieldName) -> Option<(SourceId, String)> {
    let winner = SourceId::PRECEDENCE
        .into_iter()
        .find(|source| observations.iter().any(|o| o.field == field && o.source == *source))?;

    let candidates: Vec<&CandidateObservation> = observations
        .iter()
        .filter(|o| o.field == field && o.source == winner)
        .collect();

    let value = match field {
        FieldName::Avatar => {
            let variants: Vec<&ImageVariant> = candidates
                .iter()
                .filter_map(|o| match &o.value {
                    ObservedValue::Images(v) => Some(v.iter()),
                    ObservedValue::Text(_) => None,
                })
                .flatten()
                .collect();
            pick_avatar(&variants)?.url.clone()
        }
        // One source emitting two values for a field is a strategy bug;
        // the smallest value keeps the choice independent of arrival order
        _ => candidates.iter().filter_map(|o| o.as_text()).min()?.to_string(),
    };

    Some((winner, value))
}

/// Largest variant by `width × height`; the first when no dimensions are known
pub fn pick_avatar<'a>(variants: &[&'a ImageVariant]) -> Option<&'a ImageVariant> {
    let mut best: Option<(&'a ImageVariant, u64)> = None;

    for &variant in variants {
        if let Some(area) = variant.area() {
            if best.map_or(true, |(_, best_area)| area > best_area) {
                best = Some((variant, area));
            }
        }
    }

    best.map(|(v, _)| v).or_else(|| variants.first().copied())
}

fn log_disagreement(observations: &ObservationSet, field: FieldName, winner: SourceId, value: &str) {
    if field == FieldName::Avatar {
        return;
    }

    for other in observations
        .iter()
        .filter(|o| o.field == field && o.source != winner)
    {
        if let Some(text) = other.as_text() {
            if text != value {
                debug!(
                    field = field.as_str(),
                    winner = winner.as_str(),
                    loser = other.source.as_str(),
                    "Sources disagree, higher precedence wins"
                );
            }
        }
    }
}
