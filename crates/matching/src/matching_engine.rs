//! MatchingEngine - Competency-based candidate ranking
//!
//! Scoring:
//! 1. Each requirement scores 0 when the resource lacks it, otherwise the
//!    configured value for the resource's proficiency level.
//! 2. The aggregate is the mean over all requirements. No requirements
//!    means no constraint, so every resource scores 1.0.
//! 3. Ranking is by aggregate descending, then by number of requirements
//!    held at expert level, then by total competency count, then by
//!    resource id ascending. Nothing is left to iteration order.
//!
//! Aggregates are compared on exact fixed-point totals (see
//! `ScoringScale::units`); every resource in one ranking shares the same
//! denominator, so comparing totals compares means.

use serde::{Deserialize, Serialize};
use shared::{CompetencyKey, Proficiency, Resource, ResourceId, ScoringScale, SCORE_UNITS};
use std::borrow::Borrow;
use std::cmp::Ordering;
use std::collections::{BTreeSet, HashSet};

/// One entry of a ranked candidate list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RankedCandidate {
    pub resource_id: ResourceId,
    pub score: f64,
    /// Requirements the resource holds at all
    pub matched_requirements: usize,
    /// Requirements the resource holds at expert level
    pub expert_matches: usize,
}

/// Score of a single requirement for a single resource
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequirementScore {
    pub requirement: CompetencyKey,
    pub level: Option<Proficiency>,
    pub score: f64,
}

/// Full explanation of how a resource scored
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchBreakdown {
    pub resource_id: ResourceId,
    pub requirements: Vec<RequirementScore>,
    pub expert_matches: usize,
    pub score: f64,
}

/// Sort key plus output for one resource
struct Scored<'a> {
    resource: &'a Resource,
    /// Sum of requirement scores in `SCORE_UNITS`
    total: i128,
    score: f64,
    matched: usize,
    expert_matches: usize,
}

impl Scored<'_> {
    /// Best candidate first
    fn rank_order(&self, other: &Self) -> Ordering {
        other
            .total
            .cmp(&self.total)
            .then_with(|| other.expert_matches.cmp(&self.expert_matches))
            .then_with(|| {
                other
                    .resource
                    .competencies
                    .len()
                    .cmp(&self.resource.competencies.len())
            })
            .then_with(|| self.resource.id.cmp(&other.resource.id))
            // Only reachable for a repeated id
            .then_with(|| other.matched.cmp(&self.matched))
    }

    fn into_candidate(self) -> RankedCandidate {
        RankedCandidate {
            resource_id: self.resource.id.clone(),
            score: self.score,
            matched_requirements: self.matched,
            expert_matches: self.expert_matches,
        }
    }
}

/// Matching engine
///
/// Pure: holds only the scoring scale, so one instance can be shared
/// across threads ranking independent opportunities.
#[derive(Debug, Clone, Default)]
pub struct MatchingEngine {
    scale: ScoringScale,
}

impl MatchingEngine {
    /// Create a matching engine with a validated scoring scale
    pub fn new(scale: ScoringScale) -> Self {
        Self { scale }
    }

    pub fn scale(&self) -> &ScoringScale {
        &self.scale
    }

    fn evaluate<'a>(&self, requirements: &BTreeSet<CompetencyKey>, resource: &'a Resource) -> Scored<'a> {
        if requirements.is_empty() {
            return Scored {
                resource,
                total: 0,
                score: 1.0,
                matched: 0,
                expert_matches: 0,
            };
        }

        let mut total = 0;
        let mut matched = 0;
        let mut expert_matches = 0;
        for requirement in requirements {
            if let Some(level) = resource.competencies.level(requirement) {
                total += self.scale.units(level);
                matched += 1;
                if level == Proficiency::Expert {
                    expert_matches += 1;
                }
            }
        }

        Scored {
            resource,
            total,
            score: total as f64 / SCORE_UNITS / requirements.len() as f64,
            matched,
            expert_matches,
        }
    }

    /// Rank a pool against a requirement set
    ///
    /// Resources holding none of a non-empty requirement set are not
    /// eligible and are left out, so an unmatched pool yields an empty
    /// list. A pool that repeats an id keeps only its best-ranked entry.
    pub fn rank<R: Borrow<Resource>>(
        &self,
        requirements: &BTreeSet<CompetencyKey>,
        pool: &[R],
    ) -> Vec<RankedCandidate> {
        let mut scored: Vec<Scored<'_>> = pool
            .iter()
            .map(|r| self.evaluate(requirements, r.borrow()))
            .filter(|s| requirements.is_empty() || s.matched > 0)
            .collect();

        scored.sort_by(|a, b| a.rank_order(b));

        let mut seen = HashSet::new();
        scored
            .into_iter()
            .filter(|s| seen.insert(&s.resource.id))
            .map(Scored::into_candidate)
            .collect()
    }

    /// Ranked list cut to at most `limit` candidates scoring `min_score` or more
    pub fn shortlist<R: Borrow<Resource>>(
        &self,
        requirements: &BTreeSet<CompetencyKey>,
        pool: &[R],
        limit: usize,
        min_score: f64,
    ) -> Vec<RankedCandidate> {
        self.rank(requirements, pool)
            .into_iter()
            .take_while(|c| c.score >= min_score)
            .take(limit)
            .collect()
    }

    /// Per-requirement explanation of a single resource's score
    pub fn explain(&self, requirements: &BTreeSet<CompetencyKey>, resource: &Resource) -> MatchBreakdown {
        let scored = self.evaluate(requirements, resource);
        let details = requirements
            .iter()
            .map(|key| {
                let level = resource.competencies.level(key);
                RequirementScore {
                    requirement: key.clone(),
                    level,
                    score: level.map_or(0.0, |l| self.scale.score(l)),
                }
            })
            .collect();

        MatchBreakdown {
            resource_id: resource.id.clone(),
            requirements: details,
            expert_matches: scored.expert_matches,
            score: scored.score,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn key(category: &str, label: &str) -> CompetencyKey {
        CompetencyKey::new(category, label)
    }

    fn reqs(keys: &[(&str, &str)]) -> BTreeSet<CompetencyKey> {
        keys.iter().map(|(c, l)| key(c, l)).collect()
    }

    fn ids(ranked: &[RankedCandidate]) -> Vec<&str> {
        ranked.iter().map(|c| c.resource_id.as_str()).collect()
    }

    // ============== Scoring Tests ==============

    #[test]
    fn test_mean_of_requirement_scores() {
        let engine = MatchingEngine::default();
        let resource = Resource::new(ResourceId::new("r-001"), "Dev")
            .with_competency("lang", "rust", Proficiency::Expert)
            .with_competency("lang", "go", Proficiency::Intermediate);

        let ranked = engine.rank(
            &reqs(&[("lang", "rust"), ("lang", "go"), ("lang", "sql")]),
            &[resource],
        );

        assert_eq!(ranked.len(), 1);
        assert!((ranked[0].score - 0.5).abs() < 1e-12);
        assert_eq!(ranked[0].matched_requirements, 2);
        assert_eq!(ranked[0].expert_matches, 1);
    }

    #[test]
    fn test_empty_requirements_score_one() {
        let engine = MatchingEngine::default();
        let pool = vec![
            Resource::new(ResourceId::new("b"), "B").with_competency("x", "y", Proficiency::Basic),
            Resource::new(ResourceId::new("a"), "A"),
            Resource::new(ResourceId::new("c"), "C")
                .with_competency("x", "y", Proficiency::Basic)
                .with_competency("x", "z", Proficiency::Basic),
        ];

        let ranked = engine.rank(&BTreeSet::new(), &pool);

        assert!(ranked.iter().all(|c| c.score == 1.0));
        // Falls through to competency count, then id
        assert_eq!(ids(&ranked), vec!["c", "b", "a"]);
    }

    #[test]
    fn test_custom_scale_is_used() {
        let engine = MatchingEngine::new(ScoringScale {
            basic: 0.1,
            intermediate: 0.2,
            advanced: 0.3,
            expert: 0.4,
        });
        let resource = Resource::new(ResourceId::new("r"), "R")
            .with_competency("lang", "rust", Proficiency::Advanced);

        let ranked = engine.rank(&reqs(&[("lang", "rust")]), &[resource]);
        assert!((ranked[0].score - 0.3).abs() < 1e-12);
    }

    // ============== Ranking Tests ==============

    #[test]
    fn test_tie_break_on_expert_matches() {
        let engine = MatchingEngine::default();
        // Both average 0.75 over two requirements
        let pool = vec![
            Resource::new(ResourceId::new("a"), "Even")
                .with_competency("lang", "rust", Proficiency::Advanced)
                .with_competency("lang", "go", Proficiency::Advanced),
            Resource::new(ResourceId::new("b"), "Spiky")
                .with_competency("lang", "rust", Proficiency::Expert)
                .with_competency("lang", "go", Proficiency::Intermediate),
        ];

        let ranked = engine.rank(&reqs(&[("lang", "rust"), ("lang", "go")]), &pool);
        assert_eq!(ids(&ranked), vec!["b", "a"]);
    }

    #[test]
    fn test_tie_break_on_competency_count_then_id() {
        let engine = MatchingEngine::default();
        let pool = vec![
            Resource::new(ResourceId::new("z"), "Z").with_competency("lang", "rust", Proficiency::Expert),
            Resource::new(ResourceId::new("y"), "Y")
                .with_competency("lang", "rust", Proficiency::Expert)
                .with_competency("tool", "git", Proficiency::Basic),
            Resource::new(ResourceId::new("x"), "X").with_competency("lang", "rust", Proficiency::Expert),
        ];

        let ranked = engine.rank(&reqs(&[("lang", "rust")]), &pool);
        assert_eq!(ids(&ranked), vec!["y", "x", "z"]);
    }

    #[test]
    fn test_unmatched_pool_is_empty_not_error() {
        let engine = MatchingEngine::default();
        let pool = vec![Resource::new(ResourceId::new("a"), "A").with_competency("lang", "go", Proficiency::Expert)];

        assert!(engine.rank(&reqs(&[("lang", "rust")]), &pool).is_empty());
        assert!(engine.rank::<Resource>(&reqs(&[("lang", "rust")]), &[]).is_empty());
    }

    #[test]
    fn test_duplicate_ids_keep_best_entry() {
        let engine = MatchingEngine::default();
        let pool = vec![
            Resource::new(ResourceId::new("a"), "A old").with_competency("lang", "rust", Proficiency::Basic),
            Resource::new(ResourceId::new("a"), "A new").with_competency("lang", "rust", Proficiency::Expert),
        ];

        let ranked = engine.rank(&reqs(&[("lang", "rust")]), &pool);
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].score, 1.0);
    }

    #[test]
    fn test_tenths_scale_ties_go_to_tie_breaks() {
        let engine = MatchingEngine::new(tenths());
        // basic + intermediate over two requirements equals advanced over two
        let pool = vec![
            Resource::new(ResourceId::new("a-spread"), "Spread")
                .with_competency("a", "x", Proficiency::Basic)
                .with_competency("a", "y", Proficiency::Intermediate),
            Resource::new(ResourceId::new("b-deep"), "Deep")
                .with_competency("a", "x", Proficiency::Advanced)
                .with_competency("b", "p", Proficiency::Basic)
                .with_competency("b", "q", Proficiency::Basic),
        ];

        let ranked = engine.rank(&reqs(&[("a", "x"), ("a", "y")]), &pool);

        assert_eq!(ids(&ranked), vec!["b-deep", "a-spread"]);
        assert_eq!(ranked[0].score, ranked[1].score);
    }

    #[test]
    fn test_duplicate_ids_ignore_pool_order() {
        let engine = MatchingEngine::default();
        // Same total, expert count and competency count; different coverage
        let narrow = Resource::new(ResourceId::new("a"), "A narrow")
            .with_competency("lang", "rust", Proficiency::Intermediate)
            .with_competency("tool", "git", Proficiency::Basic);
        let wide = Resource::new(ResourceId::new("a"), "A wide")
            .with_competency("lang", "rust", Proficiency::Basic)
            .with_competency("lang", "go", Proficiency::Basic);
        let requirements = reqs(&[("lang", "rust"), ("lang", "go")]);

        let forward = engine.rank(&requirements, &[narrow.clone(), wide.clone()]);
        let backward = engine.rank(&requirements, &[wide, narrow]);

        assert_eq!(forward, backward);
        assert_eq!(forward.len(), 1);
        assert_eq!(forward[0].matched_requirements, 2);
    }

    #[test]
    fn test_shortlist_applies_limit_and_floor() {
        let engine = MatchingEngine::default();
        let pool: Vec<Resource> = Proficiency::ALL
            .iter()
            .enumerate()
            .map(|(i, level)| {
                Resource::new(ResourceId::new(format!("r-{}", i)), "R").with_competency("lang", "rust", *level)
            })
            .collect();
        let requirements = reqs(&[("lang", "rust")]);

        let top = engine.shortlist(&requirements, &pool, 2, 0.0);
        assert_eq!(ids(&top), vec!["r-3", "r-2"]);

        let strong = engine.shortlist(&requirements, &pool, 10, 0.6);
        assert_eq!(strong.len(), 2);
    }

    #[test]
    fn test_explain_breakdown() {
        let engine = MatchingEngine::default();
        let resource = Resource::new(ResourceId::new("r"), "R")
            .with_competency("lang", "rust", Proficiency::Expert);

        let breakdown = engine.explain(&reqs(&[("lang", "rust"), ("lang", "sql")]), &resource);

        assert_eq!(breakdown.requirements.len(), 2);
        let sql = breakdown
            .requirements
            .iter()
            .find(|r| r.requirement.label == "sql")
            .unwrap();
        assert_eq!(sql.level, None);
        assert_eq!(sql.score, 0.0);
        assert_eq!(breakdown.expert_matches, 1);
        assert!((breakdown.score - 0.5).abs() < 1e-12);
    }

    // ============== Property Tests ==============

    fn tenths() -> ScoringScale {
        ScoringScale {
            basic: 0.1,
            intermediate: 0.2,
            advanced: 0.3,
            expert: 0.4,
        }
    }

    fn arb_scale() -> impl Strategy<Value = ScoringScale> {
        prop_oneof![Just(ScoringScale::default()), Just(tenths())]
    }

    const CATEGORIES: [&str; 2] = ["lang", "domain"];
    const LABELS: [&str; 3] = ["rust", "banking", "sql"];

    fn arb_key() -> impl Strategy<Value = CompetencyKey> {
        (0..CATEGORIES.len(), 0..LABELS.len()).prop_map(|(c, l)| key(CATEGORIES[c], LABELS[l]))
    }

    fn arb_level() -> impl Strategy<Value = Proficiency> {
        (0..Proficiency::ALL.len()).prop_map(|i| Proficiency::ALL[i])
    }

    fn arb_pool() -> impl Strategy<Value = Vec<Resource>> {
        prop::collection::btree_map(
            "[a-z]{1,4}",
            prop::collection::vec((arb_key(), arb_level()), 0..6),
            0..10,
        )
        .prop_map(|profiles| {
            profiles
                .into_iter()
                .map(|(id, competencies)| {
                    competencies.into_iter().fold(
                        Resource::new(ResourceId::new(id.clone()), id),
                        |r, (k, level)| r.with_competency(k.category, k.label, level),
                    )
                })
                .collect()
        })
    }

    fn arb_requirements() -> impl Strategy<Value = BTreeSet<CompetencyKey>> {
        prop::collection::btree_set(arb_key(), 0..4)
    }

    proptest! {
        /// Identical input gives identical output, order included.
        #[test]
        fn prop_rank_is_deterministic(pool in arb_pool(), requirements in arb_requirements(), scale in arb_scale()) {
            let engine = MatchingEngine::new(scale);
            prop_assert_eq!(engine.rank(&requirements, &pool), engine.rank(&requirements, &pool));
        }

        /// Input order never influences the ranking.
        #[test]
        fn prop_rank_ignores_pool_order(pool in arb_pool(), requirements in arb_requirements(), scale in arb_scale()) {
            let engine = MatchingEngine::new(scale);
            let mut reversed = pool.clone();
            reversed.reverse();
            prop_assert_eq!(engine.rank(&requirements, &pool), engine.rank(&requirements, &reversed));
        }

        /// Scores never increase down the list and every id appears once.
        #[test]
        fn prop_rank_is_a_total_order(pool in arb_pool(), requirements in arb_requirements(), scale in arb_scale()) {
            let engine = MatchingEngine::new(scale);
            let ranked = engine.rank(&requirements, &pool);

            for pair in ranked.windows(2) {
                prop_assert!(pair[0].score >= pair[1].score);
                prop_assert_ne!(&pair[0].resource_id, &pair[1].resource_id);
                if pair[0].score == pair[1].score {
                    prop_assert!(pair[0].expert_matches >= pair[1].expert_matches);
                }
            }
            let unique: HashSet<_> = ranked.iter().map(|c| &c.resource_id).collect();
            prop_assert_eq!(unique.len(), ranked.len());

            if requirements.is_empty() {
                prop_assert_eq!(ranked.len(), pool.len());
                prop_assert!(ranked.iter().all(|c| c.score == 1.0));
            }
        }

        /// An all-expert profile beats anyone missing a requirement.
        #[test]
        fn prop_all_expert_dominates(pool in arb_pool(), requirements in arb_requirements(), scale in arb_scale()) {
            prop_assume!(!requirements.is_empty());
            let engine = MatchingEngine::new(scale);

            let star = requirements.iter().fold(
                Resource::new(ResourceId::new("~star"), "Star"),
                |r, k| r.with_competency(k.category.clone(), k.label.clone(), Proficiency::Expert),
            );
            let mut full_pool = pool.clone();
            full_pool.push(star);

            let ranked = engine.rank(&requirements, &full_pool);
            let star_pos = ranked.iter().position(|c| c.resource_id.as_str() == "~star").unwrap();

            for (pos, candidate) in ranked.iter().enumerate() {
                if candidate.matched_requirements < requirements.len() {
                    prop_assert!(star_pos < pos);
                    prop_assert!(ranked[star_pos].score > candidate.score);
                }
            }
        }
    }
}
