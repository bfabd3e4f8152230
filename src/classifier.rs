//! Account classification rules: tech cohort, sales play, priority tier.
//!
//! A pure, three-stage decision function over [`AccountSignals`]. It runs
//! at upload time with only the technology flags and again whenever
//! secondary-layer signals (journey stage, partner overlap, industry
//! boost) land. Absent inputs are the zero case at every stage — the
//! engine never fails, and identical inputs always produce identical
//! output.

use crate::types::{AccountSignals, ClassificationResult, JourneyStage, SalesPlay, TechCohort, Tier};

// ---------------------------------------------------------------------------
// Scoring constants
// ---------------------------------------------------------------------------

/// Composite score at or above this is `HOT`.
pub const TIER_HOT_THRESHOLD: u32 = 70;
/// Composite score at or above this (and below hot) is `WARM`.
pub const TIER_WARM_THRESHOLD: u32 = 40;

const POINTS_JACKPOT: u32 = 30;
const POINTS_HIGH: u32 = 20;
const POINTS_MEDIUM: u32 = 10;
const POINTS_BASE_OR_NONE: u32 = 5;

const POINTS_QUALIFIED: u32 = 25;
const POINTS_ENGAGEMENT: u32 = 15;
const POINTS_AWARENESS: u32 = 5;

const POINTS_PARTNER_OVERLAP: u32 = 20;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Vendor lists the rules consult. Injected at construction so tests can
/// substitute fixtures; `Default` carries the production lists.
#[derive(Debug, Clone)]
pub struct ClassifierConfig {
    /// Commerce platforms strong enough to matter without a CMS (`MEDIUM`).
    pub premium_commerce: Vec<String>,
    /// Search vendors whose presence makes the account a displacement play.
    pub search_competitors: Vec<String>,
    /// Search value meaning "platform built-in search" — never a
    /// competitor, and excluded from the `JACKPOT` search condition.
    pub native_search: String,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            premium_commerce: vec![
                "Shopify Plus".to_string(),
                "Salesforce Commerce Cloud".to_string(),
                "Adobe Commerce".to_string(),
                "BigCommerce Enterprise".to_string(),
                "commercetools".to_string(),
            ],
            search_competitors: vec![
                "Algolia".to_string(),
                "Searchspring".to_string(),
                "Klevu".to_string(),
                "Bloomreach".to_string(),
                "Constructor".to_string(),
                "Coveo".to_string(),
            ],
            native_search: "Native".to_string(),
        }
    }
}

pub struct Classifier {
    config: ClassifierConfig,
}

impl Default for Classifier {
    fn default() -> Self {
        Self::new(ClassifierConfig::default())
    }
}

impl Classifier {
    pub fn new(config: ClassifierConfig) -> Self {
        Self { config }
    }

    /// Classify one account. Pure — no reads, no caching, no state.
    pub fn classify(&self, signals: &AccountSignals) -> ClassificationResult {
        let tech_cohort = self.tech_cohort(signals);
        let sales_play = self.sales_play(signals);
        let score = self.composite_score(tech_cohort, signals);

        ClassificationResult {
            tech_cohort,
            sales_play,
            tier: tier_for_score(score),
            score,
        }
    }

    /// Ordered cohort chain, first match wins. Order matters: a stack can
    /// satisfy several clauses, and the best one must be assigned.
    fn tech_cohort(&self, signals: &AccountSignals) -> Option<TechCohort> {
        let has_cms = signals.cms.is_some();
        let has_commerce = signals.commerce.is_some();
        let has_marketing = signals.marketing.is_some();
        let non_native_search = signals
            .search
            .as_deref()
            .map(|s| !self.is_native_search(s))
            .unwrap_or(false);

        if has_cms && has_commerce && (has_marketing || non_native_search) {
            Some(TechCohort::Jackpot)
        } else if has_cms && has_commerce {
            Some(TechCohort::High)
        } else if !has_cms && self.is_premium_commerce(signals.commerce.as_deref()) {
            Some(TechCohort::Medium)
        } else if signals.has_any_technology() {
            Some(TechCohort::Base)
        } else {
            None
        }
    }

    /// Driven solely by the search flag. Native search and no-search-at-all
    /// deliberately land in the same greenfield bucket.
    fn sales_play(&self, signals: &AccountSignals) -> SalesPlay {
        match signals.search.as_deref() {
            Some(vendor) if self.is_search_competitor(vendor) => SalesPlay::Displacement,
            _ => SalesPlay::Greenfield,
        }
    }

    /// Cohort points + journey points + overlap bonus + industry boost.
    /// With no secondary-layer signals this degrades to the cohort-only
    /// score — same formula, zero-valued terms.
    fn composite_score(&self, cohort: Option<TechCohort>, signals: &AccountSignals) -> u32 {
        cohort_points(cohort)
            + journey_points(signals.journey_stage)
            + if signals.partner_overlap {
                POINTS_PARTNER_OVERLAP
            } else {
                0
            }
            + signals.industry_boost
    }

    fn is_native_search(&self, vendor: &str) -> bool {
        vendor.trim().eq_ignore_ascii_case(&self.config.native_search)
    }

    fn is_search_competitor(&self, vendor: &str) -> bool {
        self.config
            .search_competitors
            .iter()
            .any(|c| c.eq_ignore_ascii_case(vendor.trim()))
    }

    fn is_premium_commerce(&self, vendor: Option<&str>) -> bool {
        match vendor {
            Some(v) => self
                .config
                .premium_commerce
                .iter()
                .any(|p| p.eq_ignore_ascii_case(v.trim())),
            None => false,
        }
    }
}

/// Classify with the production vendor lists.
pub fn classify(signals: &AccountSignals) -> ClassificationResult {
    Classifier::default().classify(signals)
}

// ---------------------------------------------------------------------------
// Shared scoring helpers
// ---------------------------------------------------------------------------

fn cohort_points(cohort: Option<TechCohort>) -> u32 {
    match cohort {
        Some(TechCohort::Jackpot) => POINTS_JACKPOT,
        Some(TechCohort::High) => POINTS_HIGH,
        Some(TechCohort::Medium) => POINTS_MEDIUM,
        Some(TechCohort::Base) | None => POINTS_BASE_OR_NONE,
    }
}

fn journey_points(stage: Option<JourneyStage>) -> u32 {
    match stage {
        Some(JourneyStage::Qualified) => POINTS_QUALIFIED,
        Some(JourneyStage::Engagement) => POINTS_ENGAGEMENT,
        Some(JourneyStage::Awareness) => POINTS_AWARENESS,
        None => 0,
    }
}

/// The single tier cut used everywhere a tier comes from a score. Both the
/// cohort-only path and the full composite path go through here so the
/// 70/40 break points cannot drift apart.
pub fn tier_for_score(score: u32) -> Tier {
    if score >= TIER_HOT_THRESHOLD {
        Tier::Hot
    } else if score >= TIER_WARM_THRESHOLD {
        Tier::Warm
    } else {
        Tier::Cold
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signals(
        cms: Option<&str>,
        commerce: Option<&str>,
        marketing: Option<&str>,
        search: Option<&str>,
    ) -> AccountSignals {
        AccountSignals {
            cms: cms.map(String::from),
            commerce: commerce.map(String::from),
            marketing: marketing.map(String::from),
            search: search.map(String::from),
            ..Default::default()
        }
    }

    #[test]
    fn test_jackpot_needs_third_condition() {
        // CMS + commerce + marketing
        let result = classify(&signals(
            Some("WordPress"),
            Some("Shopify Plus"),
            Some("Klaviyo"),
            None,
        ));
        assert_eq!(result.tech_cohort, Some(TechCohort::Jackpot));

        // CMS + commerce + non-native search also qualifies
        let result = classify(&signals(
            Some("WordPress"),
            Some("Shopify Plus"),
            None,
            Some("Algolia"),
        ));
        assert_eq!(result.tech_cohort, Some(TechCohort::Jackpot));
    }

    #[test]
    fn test_high_when_cms_and_commerce_only() {
        let result = classify(&signals(Some("WordPress"), Some("Magento"), None, None));
        assert_eq!(result.tech_cohort, Some(TechCohort::High));
    }

    #[test]
    fn test_native_search_excluded_from_jackpot() {
        // Scenario: CMS + commerce + Native search, no marketing → HIGH,
        // and native search is a greenfield play
        let result = classify(&signals(
            Some("WordPress"),
            Some("Shopify Plus"),
            None,
            Some("Native"),
        ));
        assert_eq!(result.tech_cohort, Some(TechCohort::High));
        assert_eq!(result.sales_play, SalesPlay::Greenfield);
    }

    #[test]
    fn test_medium_requires_premium_commerce_without_cms() {
        let result = classify(&signals(None, Some("Shopify Plus"), None, None));
        assert_eq!(result.tech_cohort, Some(TechCohort::Medium));

        // Non-premium commerce without a CMS falls through to BASE
        let result = classify(&signals(None, Some("WooCommerce"), None, None));
        assert_eq!(result.tech_cohort, Some(TechCohort::Base));
    }

    #[test]
    fn test_base_on_any_technology_none_otherwise() {
        let result = classify(&signals(None, None, Some("Mailchimp"), None));
        assert_eq!(result.tech_cohort, Some(TechCohort::Base));

        let result = classify(&AccountSignals::default());
        assert_eq!(result.tech_cohort, None);
        assert_eq!(result.sales_play, SalesPlay::Greenfield);
        assert_eq!(result.score, 5);
        assert_eq!(result.tier, Tier::Cold);
    }

    #[test]
    fn test_competitor_search_is_displacement() {
        // Scenario: CMS + commerce + listed competitor → HIGH + DISPLACEMENT
        let result = classify(&signals(
            Some("Contentful"),
            Some("BigCommerce Enterprise"),
            None,
            Some("Searchspring"),
        ));
        // Competitor search is non-native, so the JACKPOT third condition holds
        assert_eq!(result.tech_cohort, Some(TechCohort::Jackpot));
        assert_eq!(result.sales_play, SalesPlay::Displacement);

        // Without commerce the cohort drops but the play stays
        let result = classify(&signals(Some("Contentful"), None, None, Some("algolia")));
        assert_eq!(result.tech_cohort, Some(TechCohort::Base));
        assert_eq!(result.sales_play, SalesPlay::Displacement);
    }

    #[test]
    fn test_ordered_chain_assigns_best_cohort() {
        // CMS + commerce + a competitor search engine and no marketing:
        // the competitor flag is non-native, so it completes the first
        // clause's third condition and the account lands on JACKPOT, not
        // HIGH. The chain is evaluated in order and the best clause wins.
        let result = classify(&signals(
            Some("WordPress"),
            Some("Shopify Plus"),
            None,
            Some("Algolia"),
        ));
        assert_eq!(result.tech_cohort, Some(TechCohort::Jackpot));
        assert_eq!(result.sales_play, SalesPlay::Displacement);
    }

    #[test]
    fn test_unknown_search_vendor_is_greenfield() {
        let result = classify(&signals(None, None, None, Some("HomegrownSearch")));
        assert_eq!(result.sales_play, SalesPlay::Greenfield);
        assert_eq!(result.tech_cohort, Some(TechCohort::Base));
    }

    #[test]
    fn test_composite_scenario_hot() {
        // JACKPOT 30 + Qualified 25 + overlap 20 + boost 0 = 75 → HOT
        let mut s = signals(
            Some("WordPress"),
            Some("Shopify Plus"),
            Some("Klaviyo"),
            None,
        );
        s.journey_stage = Some(JourneyStage::Qualified);
        s.partner_overlap = true;

        let result = classify(&s);
        assert_eq!(result.score, 75);
        assert_eq!(result.tier, Tier::Hot);
    }

    #[test]
    fn test_tier_thresholds_exact() {
        assert_eq!(tier_for_score(39), Tier::Cold);
        assert_eq!(tier_for_score(40), Tier::Warm);
        assert_eq!(tier_for_score(69), Tier::Warm);
        assert_eq!(tier_for_score(70), Tier::Hot);
    }

    #[test]
    fn test_industry_boost_is_additive() {
        // HIGH 20 + Engagement 15 + boost 5 = 40 → exactly WARM
        let mut s = signals(Some("WordPress"), Some("Magento"), None, None);
        s.journey_stage = Some(JourneyStage::Engagement);
        s.industry_boost = 5;

        let result = classify(&s);
        assert_eq!(result.score, 40);
        assert_eq!(result.tier, Tier::Warm);
    }

    #[test]
    fn test_classification_is_pure() {
        let mut s = signals(Some("Drupal"), Some("Shopify Plus"), None, Some("Coveo"));
        s.journey_stage = Some(JourneyStage::Awareness);
        s.industry_boost = 3;

        let first = classify(&s);
        let second = classify(&s);
        assert_eq!(first, second);
    }

    #[test]
    fn test_fixture_config_substitution() {
        let classifier = Classifier::new(ClassifierConfig {
            premium_commerce: vec!["TestCart".to_string()],
            search_competitors: vec!["RivalSearch".to_string()],
            native_search: "BuiltIn".to_string(),
        });

        let result = classifier.classify(&signals(None, Some("TestCart"), None, None));
        assert_eq!(result.tech_cohort, Some(TechCohort::Medium));

        let result =
            classifier.classify(&signals(None, None, None, Some("rivalsearch")));
        assert_eq!(result.sales_play, SalesPlay::Displacement);

        let result = classifier.classify(&signals(
            Some("WordPress"),
            Some("TestCart"),
            None,
            Some("BuiltIn"),
        ));
        assert_eq!(result.tech_cohort, Some(TechCohort::High));
    }
}
