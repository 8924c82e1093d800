//! The AI assistant contract the wizard consumes.
//!
//! Every method may fail with an [`AssistError`]; callers own the fallback.
//! Payload types are deserialized leniently (`#[serde(default)]` throughout)
//! because they come from model output.

use regex::Regex;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

use crate::context::{FeatureSelection, WizardContext};
use crate::error::AssistError;
use crate::types::{Audience, Feature, PricingModel};

// ---------------------------------------------------------------------------
// Payloads
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IdeaCandidate {
    pub name: String,
    pub tagline: String,
    pub description: String,
    pub target_audience: String,
    pub problem: String,
    pub why_now: String,
}

impl IdeaCandidate {
    pub fn audience(&self) -> Audience {
        Audience::infer(&format!("{} {}", self.target_audience, self.description))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DiscoveryRequest {
    pub sector: Option<String>,
    pub rough_idea: Option<String>,
    pub count: usize,
    /// Names already shown; a "more ideas" request must not repeat them.
    pub exclude: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Refinement {
    /// The description that was refined. Filled in by the wizard.
    pub original: String,
    pub refined: String,
    pub suggested_names: Vec<String>,
    pub reasoning: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Competitor {
    pub name: String,
    pub url: String,
    pub note: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarketResearch {
    pub summary: String,
    pub competitors: Vec<Competitor>,
    /// Existing products or trademarks that clash with the chosen name.
    pub name_conflicts: Vec<String>,
    pub alternative_names: Vec<String>,
    /// Source URLs the research was based on.
    pub sources: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigSuggestion {
    pub features: Vec<String>,
    pub pricing: Option<String>,
    pub analytics: Option<String>,
    pub reasoning: String,
}

impl ConfigSuggestion {
    /// Apply the suggestion over `base`; unknown names are ignored.
    pub fn into_selection(self, base: &FeatureSelection) -> FeatureSelection {
        let mut features: Vec<Feature> = self
            .features
            .iter()
            .filter_map(|f| Feature::parse(f))
            .collect();
        features.sort();
        features.dedup();
        FeatureSelection {
            features: if features.is_empty() {
                base.features.clone()
            } else {
                features
            },
            pricing: self
                .pricing
                .as_deref()
                .and_then(PricingModel::parse)
                .unwrap_or(base.pricing),
            analytics: self
                .analytics
                .as_deref()
                .and_then(crate::types::Analytics::parse)
                .unwrap_or(base.analytics),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureBlurb {
    pub title: String,
    pub description: String,
}

/// Marketing copy for the landing page.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratedContent {
    pub tagline: String,
    pub headline: String,
    pub subheadline: String,
    pub features: Vec<FeatureBlurb>,
    pub cta: String,
    pub seo_keywords: Vec<String>,
}

impl GeneratedContent {
    pub fn is_empty(&self) -> bool {
        self.tagline.is_empty()
            && self.headline.is_empty()
            && self.subheadline.is_empty()
            && self.features.is_empty()
            && self.cta.is_empty()
            && self.seo_keywords.is_empty()
    }

    /// Generic copy derived from what the user typed.
    pub fn placeholder(ctx: &WizardContext) -> Self {
        let title = display_name(&ctx.name);
        let description = if ctx.description.trim().is_empty() {
            format!("{title} helps you get more done.")
        } else {
            ctx.description.trim().to_string()
        };
        let mut features: Vec<FeatureBlurb> = ctx
            .features
            .features
            .iter()
            .map(|f| FeatureBlurb {
                title: f.label().to_string(),
                description: format!("{} is built in from day one.", f.label()),
            })
            .collect();
        if features.is_empty() {
            features.push(FeatureBlurb {
                title: "Fast setup".into(),
                description: "Get started in minutes, not weeks.".into(),
            });
        }
        Self {
            tagline: format!("{title}: built for you"),
            headline: title.clone(),
            subheadline: description,
            features,
            cta: "Get started".into(),
            seo_keywords: ctx
                .name
                .split('-')
                .filter(|w| !w.is_empty())
                .map(str::to_string)
                .collect(),
        }
    }

    /// Fill any empty field from `fallback`.
    pub fn or_fill(mut self, fallback: GeneratedContent) -> Self {
        if self.tagline.is_empty() {
            self.tagline = fallback.tagline;
        }
        if self.headline.is_empty() {
            self.headline = fallback.headline;
        }
        if self.subheadline.is_empty() {
            self.subheadline = fallback.subheadline;
        }
        if self.features.is_empty() {
            self.features = fallback.features;
        }
        if self.cta.is_empty() {
            self.cta = fallback.cta;
        }
        if self.seo_keywords.is_empty() {
            self.seo_keywords = fallback.seo_keywords;
        }
        self
    }
}

/// `acme-app` → `Acme App`.
pub fn display_name(slug: &str) -> String {
    let words: Vec<String> = slug
        .split(['-', '_', ' '])
        .filter(|w| !w.is_empty())
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect();
    if words.is_empty() {
        "My App".to_string()
    } else {
        words.join(" ")
    }
}

// ---------------------------------------------------------------------------
// Assistant
// ---------------------------------------------------------------------------

pub trait Assistant {
    fn discover_ideas(&self, req: &DiscoveryRequest) -> Result<Vec<IdeaCandidate>, AssistError>;

    fn refine_idea(&self, description: &str) -> Result<Refinement, AssistError>;

    fn research_market(&self, name: &str, description: &str)
        -> Result<MarketResearch, AssistError>;

    fn suggest_config(&self, ctx: &WizardContext) -> Result<ConfigSuggestion, AssistError>;

    fn generate_content(&self, ctx: &WizardContext) -> Result<GeneratedContent, AssistError>;
}

/// Stand-in used when the CLI is missing or `--skip-ai` was given.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoAssistant;

impl Assistant for NoAssistant {
    fn discover_ideas(&self, _: &DiscoveryRequest) -> Result<Vec<IdeaCandidate>, AssistError> {
        Err(AssistError::Unavailable)
    }

    fn refine_idea(&self, _: &str) -> Result<Refinement, AssistError> {
        Err(AssistError::Unavailable)
    }

    fn research_market(&self, _: &str, _: &str) -> Result<MarketResearch, AssistError> {
        Err(AssistError::Unavailable)
    }

    fn suggest_config(&self, _: &WizardContext) -> Result<ConfigSuggestion, AssistError> {
        Err(AssistError::Unavailable)
    }

    fn generate_content(&self, _: &WizardContext) -> Result<GeneratedContent, AssistError> {
        Err(AssistError::Unavailable)
    }
}

// ---------------------------------------------------------------------------
// JSON extraction
// ---------------------------------------------------------------------------

fn fenced_block() -> &'static Regex {
    static FENCE: OnceLock<Regex> = OnceLock::new();
    FENCE.get_or_init(|| {
        Regex::new(r"(?s)```(?:json|JSON)?\s*\n(.*?)```").expect("static regex is valid")
    })
}

/// Pull a JSON value of type `T` out of model output.
///
/// Tries, in order: the whole text, each fenced code block, and the widest
/// `{…}` / `[…]` span.
pub fn extract_json<T: DeserializeOwned>(text: &str) -> Result<T, AssistError> {
    let trimmed = text.trim();
    if let Ok(v) = serde_json::from_str(trimmed) {
        return Ok(v);
    }
    for cap in fenced_block().captures_iter(trimmed) {
        if let Ok(v) = serde_json::from_str(cap[1].trim()) {
            return Ok(v);
        }
    }
    for (open, close) in [('{', '}'), ('[', ']')] {
        if let (Some(start), Some(end)) = (trimmed.find(open), trimmed.rfind(close)) {
            if start < end {
                if let Ok(v) = serde_json::from_str(&trimmed[start..=end]) {
                    return Ok(v);
                }
            }
        }
    }
    let preview: String = trimmed.chars().take(120).collect();
    Err(AssistError::Unparseable(preview))
}
