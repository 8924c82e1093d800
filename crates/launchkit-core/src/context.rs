use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::assistant::{GeneratedContent, IdeaCandidate, MarketResearch, Refinement};
use crate::prompt::slugify;
use crate::types::{Analytics, Audience, Feature, IdeaSource, PricingModel, Tone, WizardState};

// ---------------------------------------------------------------------------
// Nested records
// ---------------------------------------------------------------------------

/// Inputs and results of the idea-discovery path.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Discovery {
    /// `None` means "surprise me".
    pub sector: Option<String>,
    pub rough_idea: Option<String>,
    pub candidates: Vec<IdeaCandidate>,
    /// Index into `candidates` highlighted at the select step.
    pub selected: Option<usize>,
    /// Set by "show me more": the next research run appends instead of
    /// replacing.
    pub want_more: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureSelection {
    pub features: Vec<Feature>,
    pub pricing: PricingModel,
    pub analytics: Analytics,
}

impl Default for FeatureSelection {
    fn default() -> Self {
        Self {
            features: vec![Feature::Authentication, Feature::Payments],
            pricing: PricingModel::default(),
            analytics: Analytics::default(),
        }
    }
}

impl FeatureSelection {
    pub fn for_audience(audience: Audience) -> Self {
        Self {
            features: audience.default_features(),
            pricing: audience.default_pricing(),
            analytics: Analytics::Plausible,
        }
    }

    pub fn has(&self, feature: Feature) -> bool {
        self.features.contains(&feature)
    }

    /// Payments are only wired up when something is actually charged for.
    pub fn charges(&self) -> bool {
        self.has(Feature::Payments) && self.pricing.charges()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Branding {
    /// `#rrggbb`
    pub primary_color: String,
    pub tone: Tone,
}

impl Default for Branding {
    fn default() -> Self {
        Self {
            primary_color: "#6366f1".to_string(),
            tone: Tone::default(),
        }
    }
}

/// A research result remembered together with the inputs it was computed
/// from. It is reused only while those inputs are unchanged.
#[derive(Debug, Clone, PartialEq)]
pub struct Keyed<T> {
    pub key: String,
    pub value: T,
}

// ---------------------------------------------------------------------------
// WizardContext
// ---------------------------------------------------------------------------

/// Everything the wizard has gathered so far. Owned by the wizard loop;
/// handlers mutate it in place.
#[derive(Debug, Clone, Default)]
pub struct WizardContext {
    /// Project slug.
    pub name: String,
    pub description: String,
    pub idea_source: IdeaSource,

    pub discovery: Discovery,
    pub discovered_idea: Option<IdeaCandidate>,
    /// Derived from the discovered idea; `None` on the direct path.
    pub audience: Option<Audience>,

    pub refinement: Option<Refinement>,
    pub research: Option<Keyed<MarketResearch>>,

    pub features: FeatureSelection,
    /// Description the current feature selection was seeded for.
    pub config_suggested_for: Option<String>,

    pub branding: Branding,

    pub content: GeneratedContent,
    /// Set once AI content generation ran (or fell back) for the current
    /// branding; cleared when the user backtracks past branding.
    pub content_generated: bool,

    pub output_dir: Option<PathBuf>,
}

impl WizardContext {
    pub fn research_key(&self) -> String {
        format!("{}\n{}", self.name, self.description)
    }

    /// The remembered research, if it matches the current name and
    /// description.
    pub fn current_research(&self) -> Option<&MarketResearch> {
        let key = self.research_key();
        self.research
            .as_ref()
            .filter(|r| r.key == key)
            .map(|r| &r.value)
    }

    /// The remembered refinement, if the current description is either its
    /// input or its output.
    pub fn current_refinement(&self) -> Option<&Refinement> {
        self.refinement
            .as_ref()
            .filter(|r| r.original == self.description || r.refined == self.description)
    }

    /// Audience to seed defaults from: the discovered idea's category, or an
    /// inference from the description.
    pub fn effective_audience(&self) -> Audience {
        self.audience
            .unwrap_or_else(|| Audience::infer(&self.description))
    }

    /// Link the wizard to a discovered idea and prefill what it implies.
    pub fn adopt_idea(&mut self, idea: IdeaCandidate) {
        self.idea_source = IdeaSource::Discovered;
        self.description = idea.description.clone();
        self.audience = Some(idea.audience());
        self.name = slugify(&idea.name);
        self.discovered_idea = Some(idea);
    }

    /// Forget the discovered idea and everything derived from it.
    pub fn drop_discovered_idea(&mut self) {
        if let Some(idea) = self.discovered_idea.take() {
            if self.description == idea.description {
                self.description.clear();
            }
            if self.name == slugify(&idea.name) {
                self.name.clear();
            }
        }
        self.audience = None;
        if self.idea_source == IdeaSource::Discovered {
            self.idea_source = IdeaSource::Unset;
        }
    }

    /// Reset the discovery path entirely (user switched to direct entry).
    pub fn clear_discovery(&mut self) {
        self.drop_discovered_idea();
        self.discovery = Discovery::default();
    }

    /// Clear the fields derived by `state`. Called for every state the
    /// navigator unwinds past; user-typed answers survive as defaults.
    pub fn invalidate(&mut self, state: WizardState) {
        match state {
            WizardState::DiscoveryResearch => {
                self.discovery.candidates.clear();
                self.discovery.selected = None;
                self.discovery.want_more = false;
            }
            WizardState::DiscoverySelect => self.discovery.selected = None,
            WizardState::DiscoveryConfirm => self.drop_discovered_idea(),
            WizardState::Branding | WizardState::AiContent => {
                self.content = GeneratedContent::default();
                self.content_generated = false;
            }
            WizardState::ProjectLocation | WizardState::Summary => self.output_dir = None,
            WizardState::IdeaMode
            | WizardState::DiscoverySector
            | WizardState::DiscoveryRoughIdea
            | WizardState::DiscoveryResults
            | WizardState::Name
            | WizardState::Description
            | WizardState::IdeaRefinement
            | WizardState::NameResearch
            | WizardState::ProjectConfig
            | WizardState::Generate => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn idea() -> IdeaCandidate {
        IdeaCandidate {
            name: "Shift Swap".into(),
            tagline: "Trade shifts".into(),
            description: "Let hourly teams trade shifts".into(),
            target_audience: "restaurant businesses".into(),
            ..Default::default()
        }
    }

    #[test]
    fn adopt_and_drop_idea_round_trip() {
        let mut ctx = WizardContext::default();
        ctx.adopt_idea(idea());
        assert_eq!(ctx.name, "shift-swap");
        assert_eq!(ctx.audience, Some(Audience::B2b));
        assert_eq!(ctx.idea_source, IdeaSource::Discovered);

        ctx.invalidate(WizardState::DiscoveryConfirm);
        assert!(ctx.discovered_idea.is_none());
        assert!(ctx.audience.is_none());
        assert!(ctx.name.is_empty());
        assert!(ctx.description.is_empty());
        assert_eq!(ctx.idea_source, IdeaSource::Unset);
    }

    #[test]
    fn dropping_idea_keeps_user_edits() {
        let mut ctx = WizardContext::default();
        ctx.adopt_idea(idea());
        ctx.name = "my-own-name".into();
        ctx.drop_discovered_idea();
        assert_eq!(ctx.name, "my-own-name");
    }

    #[test]
    fn branding_invalidation_resets_content_flag() {
        let mut ctx = WizardContext {
            content_generated: true,
            content: GeneratedContent {
                tagline: "x".into(),
                ..Default::default()
            },
            ..Default::default()
        };
        ctx.invalidate(WizardState::Branding);
        assert!(!ctx.content_generated);
        assert!(ctx.content.is_empty());
    }

    #[test]
    fn research_cache_keyed_on_name_and_description() {
        let mut ctx = WizardContext {
            name: "acme".into(),
            description: "rockets".into(),
            ..Default::default()
        };
        ctx.research = Some(Keyed {
            key: ctx.research_key(),
            value: MarketResearch::default(),
        });
        assert!(ctx.current_research().is_some());
        ctx.description = "anvils".into();
        assert!(ctx.current_research().is_none());
    }

    #[test]
    fn refinement_matches_original_or_refined() {
        let mut ctx = WizardContext {
            description: "rough".into(),
            refinement: Some(Refinement {
                original: "rough".into(),
                refined: "polished".into(),
                ..Default::default()
            }),
            ..Default::default()
        };
        assert!(ctx.current_refinement().is_some());
        ctx.description = "polished".into();
        assert!(ctx.current_refinement().is_some());
        ctx.description = "different".into();
        assert!(ctx.current_refinement().is_none());
    }
}
