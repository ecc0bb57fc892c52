//! Declarative candidate constraints
//!
//! A [`ConstraintSpec`] holds optional bounds per facet plus player-count and
//! playtime sub-specs. Absent entries impose nothing. Specs are validated once
//! when built; evaluation is pure.

use crate::overlap::range_overlap;
use crate::scorer::MetaScore;
use gamerec_core::{Error, FacetKind, FacetMap, FeatureSnapshot, Result};
use serde::{Deserialize, Serialize};

/// Bounds on one facet's Jaccard score and shared-value count
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FacetBounds {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jaccard_min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jaccard_max: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_overlap: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_overlap: Option<usize>,
}

impl FacetBounds {
    pub fn jaccard_at_least(min: f64) -> Self {
        Self { jaccard_min: Some(min), ..Self::default() }
    }

    pub fn overlap_at_least(min: usize) -> Self {
        Self { min_overlap: Some(min), ..Self::default() }
    }

    pub fn validate(&self, facet: FacetKind) -> Result<()> {
        for (name, bound) in [("jaccard_min", self.jaccard_min), ("jaccard_max", self.jaccard_max)] {
            if let Some(v) = bound {
                if !v.is_finite() || !(0.0..=1.0).contains(&v) {
                    return Err(Error::MalformedConstraint(format!(
                        "{}.{} must be within [0, 1], got {}",
                        facet, name, v
                    )));
                }
            }
        }
        if let (Some(lo), Some(hi)) = (self.jaccard_min, self.jaccard_max) {
            if lo > hi {
                return Err(Error::MalformedConstraint(format!(
                    "{}: jaccard_min {} exceeds jaccard_max {}",
                    facet, lo, hi
                )));
            }
        }
        if let (Some(lo), Some(hi)) = (self.min_overlap, self.max_overlap) {
            if lo > hi {
                return Err(Error::MalformedConstraint(format!(
                    "{}: min_overlap {} exceeds max_overlap {}",
                    facet, lo, hi
                )));
            }
        }
        Ok(())
    }

    pub fn admits(&self, jaccard: f64, shared: usize) -> bool {
        self.jaccard_min.map_or(true, |min| jaccard >= min)
            && self.jaccard_max.map_or(true, |max| jaccard <= max)
            && self.min_overlap.map_or(true, |min| shared >= min)
            && self.max_overlap.map_or(true, |max| shared <= max)
    }
}

/// Player-count rules
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PlayerConstraint {
    /// Candidate must support exactly this many players
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exact: Option<u32>,
    /// Minimum number of player counts shared with the reference
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_overlap: Option<u32>,
    /// Accept `exact` when the community recommends it even if the box
    /// minimum is higher
    #[serde(default)]
    pub use_recommended: bool,
    /// Best-voted counts of reference and candidate differ by at most one
    #[serde(default)]
    pub similar_best: bool,
}

impl PlayerConstraint {
    /// Whether evaluating this constraint needs the reference snapshot.
    /// `similar_best` does not: without best-count data it passes.
    pub fn needs_reference(&self) -> bool {
        self.min_overlap.is_some()
    }

    pub fn validate(&self) -> Result<()> {
        if self.exact == Some(0) {
            return Err(Error::MalformedConstraint("players.exact must be at least 1".to_string()));
        }
        if self.min_overlap == Some(0) {
            return Err(Error::MalformedConstraint("players.min_overlap must be at least 1".to_string()));
        }
        Ok(())
    }

    /// Evaluate against a candidate. Rules that need the reference pass when
    /// it is absent; callers decide beforehand whether that is acceptable.
    pub fn admits(&self, reference: Option<&FeatureSnapshot>, candidate: &FeatureSnapshot) -> bool {
        if let Some(exact) = self.exact {
            if !self.admits_exact(exact, candidate) {
                return false;
            }
        }
        let Some(reference) = reference else {
            return true;
        };
        if let Some(min) = self.min_overlap {
            if player_overlap(reference, candidate) < min {
                return false;
            }
        }
        if self.similar_best {
            if let (Some(a), Some(b)) = (reference.votes.best, candidate.votes.best) {
                if a.abs_diff(b) > 1 {
                    return false;
                }
            }
        }
        true
    }

    fn admits_exact(&self, exact: u32, candidate: &FeatureSnapshot) -> bool {
        let max_ok = candidate.max_players.map_or(true, |max| max >= exact);
        if !max_ok {
            return false;
        }
        let min_ok = candidate.min_players.map_or(true, |min| min <= exact);
        if min_ok {
            return true;
        }
        self.use_recommended
            && (candidate.votes.recommended.contains(&exact) || within_box_range(exact, candidate))
    }
}

fn within_box_range(count: u32, snapshot: &FeatureSnapshot) -> bool {
    match (snapshot.min_players, snapshot.max_players) {
        (Some(min), Some(max)) => (min..=max).contains(&count),
        _ => false,
    }
}

/// Shared player counts: box ranges when both sides have them, otherwise
/// the recommended-count sets.
fn player_overlap(a: &FeatureSnapshot, b: &FeatureSnapshot) -> u32 {
    match (a.min_players, a.max_players, b.min_players, b.max_players) {
        (Some(a_lo), Some(a_hi), Some(b_lo), Some(b_hi)) => range_overlap(a_lo, a_hi, b_lo, b_hi),
        _ => a.votes.recommended.intersection(&b.votes.recommended).count() as u32,
    }
}

pub const DEFAULT_PLAYTIME_TOLERANCE: f64 = 0.25;

fn default_tolerance() -> f64 {
    DEFAULT_PLAYTIME_TOLERANCE
}

/// Playtime band around a target, in minutes
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PlaytimeConstraint {
    pub target: f64,
    /// Fraction of `target` allowed on either side
    #[serde(default = "default_tolerance")]
    pub tolerance: f64,
}

impl PlaytimeConstraint {
    pub fn new(target: f64, tolerance: f64) -> Self {
        Self { target, tolerance }
    }

    pub fn validate(&self) -> Result<()> {
        if !self.target.is_finite() || self.target <= 0.0 {
            return Err(Error::MalformedConstraint(format!(
                "playtime.target must be positive, got {}",
                self.target
            )));
        }
        if !self.tolerance.is_finite() || self.tolerance < 0.0 {
            return Err(Error::MalformedConstraint(format!(
                "playtime.tolerance must be non-negative, got {}",
                self.tolerance
            )));
        }
        Ok(())
    }

    /// An item without playtime data is never rejected
    pub fn admits(&self, estimate: Option<f64>) -> bool {
        match estimate {
            Some(minutes) => {
                let lo = self.target * (1.0 - self.tolerance);
                let hi = self.target * (1.0 + self.tolerance);
                minutes >= lo && minutes <= hi
            }
            None => true,
        }
    }
}

/// Full per-request constraint specification
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawConstraintSpec", into = "RawConstraintSpec")]
pub struct ConstraintSpec {
    facets: FacetMap<Option<FacetBounds>>,
    players: Option<PlayerConstraint>,
    playtime: Option<PlaytimeConstraint>,
}

impl ConstraintSpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_facet(mut self, facet: FacetKind, bounds: FacetBounds) -> Self {
        self.facets[facet] = Some(bounds);
        self
    }

    pub fn with_players(mut self, players: PlayerConstraint) -> Self {
        self.players = Some(players);
        self
    }

    pub fn with_playtime(mut self, playtime: PlaytimeConstraint) -> Self {
        self.playtime = Some(playtime);
        self
    }

    /// Parse and validate a JSON constraint document.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| Error::MalformedConstraint(e.to_string()))
    }

    pub fn validate(&self) -> Result<()> {
        for (facet, bounds) in self.facets.iter() {
            if let Some(bounds) = bounds {
                bounds.validate(facet)?;
            }
        }
        if let Some(players) = &self.players {
            players.validate()?;
        }
        if let Some(playtime) = &self.playtime {
            playtime.validate()?;
        }
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.facets.iter().all(|(_, b)| b.is_none()) && self.players.is_none() && self.playtime.is_none()
    }

    pub fn facet(&self, facet: FacetKind) -> Option<&FacetBounds> {
        self.facets[facet].as_ref()
    }

    pub fn players(&self) -> Option<&PlayerConstraint> {
        self.players.as_ref()
    }

    pub fn playtime(&self) -> Option<&PlaytimeConstraint> {
        self.playtime.as_ref()
    }

    pub fn has_facet_bounds(&self) -> bool {
        self.facets.iter().any(|(_, b)| b.is_some())
    }

    /// Whether any active rule compares the candidate to the reference
    pub fn needs_reference(&self) -> bool {
        self.has_facet_bounds() || self.players.map_or(false, |p| p.needs_reference())
    }

    /// Every facet bound against a computed meta score
    pub fn satisfies_generic(&self, score: &MetaScore) -> bool {
        self.facets.iter().all(|(kind, bounds)| match bounds {
            Some(bounds) => bounds.admits(score.jaccard[kind], score.shared[kind].len()),
            None => true,
        })
    }

    pub fn satisfies_players(&self, reference: Option<&FeatureSnapshot>, candidate: &FeatureSnapshot) -> bool {
        self.players.map_or(true, |p| p.admits(reference, candidate))
    }

    pub fn satisfies_playtime(&self, estimate: Option<f64>) -> bool {
        self.playtime.map_or(true, |p| p.admits(estimate))
    }
}

/// Wire form: one optional key per facet plus `players` and `playtime`.
/// Any other key is an unknown facet and is rejected.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawConstraintSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    mechanics: Option<FacetBounds>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    categories: Option<FacetBounds>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    families: Option<FacetBounds>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    designers: Option<FacetBounds>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    artists: Option<FacetBounds>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    publishers: Option<FacetBounds>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    players: Option<PlayerConstraint>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    playtime: Option<PlaytimeConstraint>,
}

impl TryFrom<RawConstraintSpec> for ConstraintSpec {
    type Error = Error;

    fn try_from(raw: RawConstraintSpec) -> Result<Self> {
        let mut facets = FacetMap::default();
        facets[FacetKind::Mechanics] = raw.mechanics;
        facets[FacetKind::Categories] = raw.categories;
        facets[FacetKind::Families] = raw.families;
        facets[FacetKind::Designers] = raw.designers;
        facets[FacetKind::Artists] = raw.artists;
        facets[FacetKind::Publishers] = raw.publishers;
        let spec = ConstraintSpec {
            facets,
            players: raw.players,
            playtime: raw.playtime,
        };
        spec.validate()?;
        Ok(spec)
    }
}

impl From<ConstraintSpec> for RawConstraintSpec {
    fn from(spec: ConstraintSpec) -> Self {
        RawConstraintSpec {
            mechanics: spec.facets[FacetKind::Mechanics],
            categories: spec.facets[FacetKind::Categories],
            families: spec.facets[FacetKind::Families],
            designers: spec.facets[FacetKind::Designers],
            artists: spec.facets[FacetKind::Artists],
            publishers: spec.facets[FacetKind::Publishers],
            players: spec.players,
            playtime: spec.playtime,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scorer::MetaScorer;
    use gamerec_core::ItemId;

    fn players(min: Option<u32>, max: Option<u32>, recommended: &[u32], best: Option<u32>) -> FeatureSnapshot {
        let mut s = FeatureSnapshot::new(ItemId(1));
        s.min_players = min;
        s.max_players = max;
        s.votes.recommended = recommended.iter().copied().collect();
        s.votes.best = best;
        s
    }

    #[test]
    fn test_facet_bounds_admits() {
        let bounds = FacetBounds { jaccard_min: Some(0.6), max_overlap: Some(2), ..Default::default() };
        assert!(!bounds.admits(0.5, 1));
        assert!(bounds.admits(0.6, 2));
        assert!(!bounds.admits(0.9, 3));
    }

    #[test]
    fn test_generic_rejects_low_jaccard() {
        let mut a = FeatureSnapshot::new(ItemId(1));
        a.facets[FacetKind::Mechanics] = ["Deck Building", "Drafting"].iter().map(|s| s.to_string()).collect();
        let mut b = FeatureSnapshot::new(ItemId(2));
        b.facets[FacetKind::Mechanics] = ["Deck Building"].iter().map(|s| s.to_string()).collect();
        let score = MetaScorer::new().score(&a, &b, None);

        let strict = ConstraintSpec::new().with_facet(FacetKind::Mechanics, FacetBounds::jaccard_at_least(0.6));
        assert!(!strict.satisfies_generic(&score));
        let loose = ConstraintSpec::new().with_facet(FacetKind::Mechanics, FacetBounds::overlap_at_least(1));
        assert!(loose.satisfies_generic(&score));
        assert!(ConstraintSpec::new().satisfies_generic(&score));
    }

    #[test]
    fn test_exact_players() {
        let spec = PlayerConstraint { exact: Some(4), ..Default::default() };
        assert!(!spec.admits(None, &players(Some(2), Some(3), &[], None)));
        assert!(spec.admits(None, &players(Some(2), Some(5), &[], None)));
        assert!(spec.admits(None, &players(None, None, &[], None)));
    }

    #[test]
    fn test_exact_players_with_recommendation() {
        let candidate = players(Some(5), Some(8), &[4, 5], None);
        let strict = PlayerConstraint { exact: Some(4), ..Default::default() };
        assert!(!strict.admits(None, &candidate));
        let relaxed = PlayerConstraint { exact: Some(4), use_recommended: true, ..Default::default() };
        assert!(relaxed.admits(None, &candidate));
    }

    #[test]
    fn test_player_overlap_ranges_and_votes() {
        let spec = PlayerConstraint { min_overlap: Some(2), ..Default::default() };
        let reference = players(Some(2), Some(4), &[3], None);
        assert!(spec.admits(Some(&reference), &players(Some(3), Some(6), &[], None)));
        assert!(!spec.admits(Some(&reference), &players(Some(4), Some(6), &[], None)));

        let reference = players(None, None, &[2, 3, 4], None);
        assert!(spec.admits(Some(&reference), &players(None, None, &[3, 4], None)));
        assert!(!spec.admits(Some(&reference), &players(None, None, &[4, 5], None)));
    }

    #[test]
    fn test_similar_best_is_non_blocking() {
        let spec = PlayerConstraint { similar_best: true, ..Default::default() };
        let reference = players(None, None, &[], Some(3));
        assert!(spec.admits(Some(&reference), &players(None, None, &[], Some(4))));
        assert!(!spec.admits(Some(&reference), &players(None, None, &[], Some(5))));
        assert!(spec.admits(Some(&reference), &players(None, None, &[], None)));
        assert!(spec.admits(None, &players(None, None, &[], Some(8))));
        assert!(!spec.needs_reference());
        assert!(!ConstraintSpec::new().with_players(spec).needs_reference());
    }

    #[test]
    fn test_playtime_band() {
        let spec = PlaytimeConstraint::new(60.0, 0.25);
        assert!(spec.admits(Some(45.0)));
        assert!(spec.admits(Some(75.0)));
        assert!(!spec.admits(Some(90.0)));
        assert!(spec.admits(None));
    }

    #[test]
    fn test_parse_valid_document() {
        let spec = ConstraintSpec::from_json(
            r#"{"mechanics": {"jaccard_min": 0.5}, "players": {"exact": 4, "use_recommended": true}, "playtime": {"target": 60}}"#,
        )
        .unwrap();
        assert_eq!(spec.facet(FacetKind::Mechanics).and_then(|b| b.jaccard_min), Some(0.5));
        assert_eq!(spec.players().and_then(|p| p.exact), Some(4));
        assert_eq!(spec.playtime().map(|p| p.tolerance), Some(DEFAULT_PLAYTIME_TOLERANCE));
        assert!(spec.needs_reference());
    }

    #[test]
    fn test_parse_rejects_malformed() {
        for doc in [
            r#"{"themes": {"min_overlap": 1}}"#,
            r#"{"mechanics": {"jaccard_min": 1.5}}"#,
            r#"{"mechanics": {"jaccard_min": 0.8, "jaccard_max": 0.2}}"#,
            r#"{"mechanics": {"overlap": 1}}"#,
            r#"{"playtime": {"target": -5}}"#,
            r#"{"players": {"exact": 0}}"#,
        ] {
            assert!(
                matches!(ConstraintSpec::from_json(doc), Err(Error::MalformedConstraint(_))),
                "accepted {}",
                doc
            );
        }
    }

    #[test]
    fn test_serialize_skips_absent_keys() {
        let spec = ConstraintSpec::new().with_facet(FacetKind::Designers, FacetBounds::overlap_at_least(1));
        let json = serde_json::to_value(&spec).unwrap();
        assert_eq!(json["designers"]["min_overlap"], 1);
        assert!(json.get("mechanics").is_none());
        let back: ConstraintSpec = serde_json::from_value(json).unwrap();
        assert_eq!(back, spec);
    }
}
