use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// WizardState
// ---------------------------------------------------------------------------

/// One step of the wizard. `Generate` is the only terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WizardState {
    IdeaMode,
    DiscoverySector,
    DiscoveryRoughIdea,
    DiscoveryResearch,
    DiscoveryResults,
    DiscoverySelect,
    DiscoveryConfirm,
    Name,
    Description,
    IdeaRefinement,
    NameResearch,
    ProjectConfig,
    Branding,
    AiContent,
    Summary,
    ProjectLocation,
    Generate,
}

impl WizardState {
    pub fn all() -> &'static [WizardState] {
        &[
            WizardState::IdeaMode,
            WizardState::DiscoverySector,
            WizardState::DiscoveryRoughIdea,
            WizardState::DiscoveryResearch,
            WizardState::DiscoveryResults,
            WizardState::DiscoverySelect,
            WizardState::DiscoveryConfirm,
            WizardState::Name,
            WizardState::Description,
            WizardState::IdeaRefinement,
            WizardState::NameResearch,
            WizardState::ProjectConfig,
            WizardState::Branding,
            WizardState::AiContent,
            WizardState::Summary,
            WizardState::ProjectLocation,
            WizardState::Generate,
        ]
    }

    pub fn as_str(self) -> &'static str {
        match self {
            WizardState::IdeaMode => "idea_mode",
            WizardState::DiscoverySector => "discovery_sector",
            WizardState::DiscoveryRoughIdea => "discovery_rough_idea",
            WizardState::DiscoveryResearch => "discovery_research",
            WizardState::DiscoveryResults => "discovery_results",
            WizardState::DiscoverySelect => "discovery_select",
            WizardState::DiscoveryConfirm => "discovery_confirm",
            WizardState::Name => "name",
            WizardState::Description => "description",
            WizardState::IdeaRefinement => "idea_refinement",
            WizardState::NameResearch => "name_research",
            WizardState::ProjectConfig => "project_config",
            WizardState::Branding => "branding",
            WizardState::AiContent => "ai_content",
            WizardState::Summary => "summary",
            WizardState::ProjectLocation => "project_location",
            WizardState::Generate => "generate",
        }
    }

    /// States that only exist when the AI assistant is available.
    pub fn requires_ai(self) -> bool {
        matches!(
            self,
            WizardState::IdeaMode
                | WizardState::DiscoverySector
                | WizardState::DiscoveryRoughIdea
                | WizardState::DiscoveryResearch
                | WizardState::DiscoveryResults
                | WizardState::DiscoverySelect
                | WizardState::DiscoveryConfirm
                | WizardState::IdeaRefinement
                | WizardState::NameResearch
                | WizardState::AiContent
        )
    }

    /// States that do work without asking anything. Backtracking never lands
    /// on them.
    pub fn is_transient(self) -> bool {
        matches!(
            self,
            WizardState::DiscoveryResearch | WizardState::AiContent
        )
    }

    pub fn is_terminal(self) -> bool {
        self == WizardState::Generate
    }

    /// One-line prefix used when this state's optional work degrades.
    pub fn fallback_notice(self) -> &'static str {
        match self {
            WizardState::DiscoveryResearch => "idea discovery failed",
            WizardState::IdeaRefinement => "idea refinement skipped",
            WizardState::NameResearch => "market research incomplete",
            WizardState::ProjectConfig => "configuration suggestions unavailable",
            WizardState::AiContent => "AI content unavailable, using placeholder copy",
            _ => "step skipped",
        }
    }
}

impl fmt::Display for WizardState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// IdeaSource
// ---------------------------------------------------------------------------

/// How the project idea entered the wizard.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdeaSource {
    #[default]
    Unset,
    Direct,
    Discovered,
}

// ---------------------------------------------------------------------------
// Feature
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Feature {
    Authentication,
    Payments,
    Email,
    Blog,
    Waitlist,
    DarkMode,
}

impl Feature {
    pub fn all() -> &'static [Feature] {
        &[
            Feature::Authentication,
            Feature::Payments,
            Feature::Email,
            Feature::Blog,
            Feature::Waitlist,
            Feature::DarkMode,
        ]
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Feature::Authentication => "authentication",
            Feature::Payments => "payments",
            Feature::Email => "email",
            Feature::Blog => "blog",
            Feature::Waitlist => "waitlist",
            Feature::DarkMode => "dark_mode",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Feature::Authentication => "Authentication (NextAuth)",
            Feature::Payments => "Payments (Stripe)",
            Feature::Email => "Transactional email (Resend)",
            Feature::Blog => "Blog (Markdown)",
            Feature::Waitlist => "Waitlist signup",
            Feature::DarkMode => "Dark mode",
        }
    }

    /// Lenient parse for free-form names (AI suggestions, manifests).
    pub fn parse(s: &str) -> Option<Feature> {
        let key = s.trim().to_ascii_lowercase().replace([' ', '-'], "_");
        match key.as_str() {
            "authentication" | "auth" | "login" => Some(Feature::Authentication),
            "payments" | "payment" | "stripe" | "billing" => Some(Feature::Payments),
            "email" | "emails" | "transactional_email" => Some(Feature::Email),
            "blog" => Some(Feature::Blog),
            "waitlist" | "wait_list" => Some(Feature::Waitlist),
            "dark_mode" | "darkmode" | "theme" => Some(Feature::DarkMode),
            _ => None,
        }
    }
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// PricingModel
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PricingModel {
    Free,
    Freemium,
    #[default]
    Subscription,
    OneTime,
    UsageBased,
}

impl PricingModel {
    pub fn all() -> &'static [PricingModel] {
        &[
            PricingModel::Free,
            PricingModel::Freemium,
            PricingModel::Subscription,
            PricingModel::OneTime,
            PricingModel::UsageBased,
        ]
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PricingModel::Free => "free",
            PricingModel::Freemium => "freemium",
            PricingModel::Subscription => "subscription",
            PricingModel::OneTime => "one_time",
            PricingModel::UsageBased => "usage_based",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            PricingModel::Free => "Free",
            PricingModel::Freemium => "Freemium",
            PricingModel::Subscription => "Subscription",
            PricingModel::OneTime => "One-time purchase",
            PricingModel::UsageBased => "Usage-based",
        }
    }

    pub fn parse(s: &str) -> Option<PricingModel> {
        let key = s.trim().to_ascii_lowercase().replace([' ', '-'], "_");
        PricingModel::all()
            .iter()
            .copied()
            .find(|p| p.as_str() == key)
            .or(match key.as_str() {
                "subscriptions" | "recurring" | "saas" => Some(PricingModel::Subscription),
                "one_off" | "lifetime" => Some(PricingModel::OneTime),
                "metered" | "pay_as_you_go" => Some(PricingModel::UsageBased),
                _ => None,
            })
    }

    /// Whether this model needs a payment provider.
    pub fn charges(self) -> bool {
        self != PricingModel::Free
    }
}

// ---------------------------------------------------------------------------
// Analytics
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Analytics {
    #[default]
    None,
    Plausible,
    PostHog,
    GoogleAnalytics,
}

impl Analytics {
    pub fn all() -> &'static [Analytics] {
        &[
            Analytics::None,
            Analytics::Plausible,
            Analytics::PostHog,
            Analytics::GoogleAnalytics,
        ]
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Analytics::None => "none",
            Analytics::Plausible => "plausible",
            Analytics::PostHog => "posthog",
            Analytics::GoogleAnalytics => "google_analytics",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Analytics::None => "None",
            Analytics::Plausible => "Plausible",
            Analytics::PostHog => "PostHog",
            Analytics::GoogleAnalytics => "Google Analytics",
        }
    }

    pub fn parse(s: &str) -> Option<Analytics> {
        let key = s.trim().to_ascii_lowercase().replace([' ', '-'], "_");
        match key.as_str() {
            "none" | "" => Some(Analytics::None),
            "plausible" => Some(Analytics::Plausible),
            "posthog" | "post_hog" => Some(Analytics::PostHog),
            "google_analytics" | "ga" | "ga4" | "google" => Some(Analytics::GoogleAnalytics),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Audience
// ---------------------------------------------------------------------------

/// Coarse customer category, inferred from a discovered idea.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Audience {
    B2b,
    B2c,
    Developers,
    Creators,
}

impl Audience {
    pub fn as_str(self) -> &'static str {
        match self {
            Audience::B2b => "b2b",
            Audience::B2c => "b2c",
            Audience::Developers => "developers",
            Audience::Creators => "creators",
        }
    }

    /// Keyword heuristic; consumer is the fallback. Short keywords must match
    /// a whole word, longer ones also match as a prefix ("agenc" → "agencies").
    pub fn infer(text: &str) -> Audience {
        let lower = text.to_ascii_lowercase();
        let words: Vec<&str> = lower
            .split(|c: char| !c.is_ascii_alphanumeric())
            .filter(|w| !w.is_empty())
            .collect();
        let has = |keys: &[&str]| {
            words
                .iter()
                .any(|w| keys.iter().any(|k| *w == *k || (k.len() > 4 && w.starts_with(k))))
        };
        if has(&["developer", "engineer", "api", "apis", "devops", "programmer", "sdk", "cli"]) {
            Audience::Developers
        } else if has(&["creator", "youtuber", "podcast", "newsletter", "influencer", "artist"]) {
            Audience::Creators
        } else if has(&["b2b", "business", "team", "teams", "compan", "enterprise", "agenc", "startup", "saas"]) {
            Audience::B2b
        } else {
            Audience::B2c
        }
    }

    pub fn default_features(self) -> Vec<Feature> {
        match self {
            Audience::B2b => vec![Feature::Authentication, Feature::Payments, Feature::Email],
            Audience::B2c => vec![Feature::Authentication, Feature::Payments, Feature::Waitlist],
            Audience::Developers => vec![Feature::Authentication, Feature::Payments, Feature::DarkMode],
            Audience::Creators => vec![Feature::Authentication, Feature::Blog, Feature::Email],
        }
    }

    pub fn default_pricing(self) -> PricingModel {
        match self {
            Audience::B2b => PricingModel::Subscription,
            Audience::B2c => PricingModel::Freemium,
            Audience::Developers => PricingModel::UsageBased,
            Audience::Creators => PricingModel::Subscription,
        }
    }
}

impl fmt::Display for Audience {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Tone
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tone {
    #[default]
    Professional,
    Friendly,
    Playful,
    Bold,
    Minimal,
}

impl Tone {
    pub fn all() -> &'static [Tone] {
        &[
            Tone::Professional,
            Tone::Friendly,
            Tone::Playful,
            Tone::Bold,
            Tone::Minimal,
        ]
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Tone::Professional => "professional",
            Tone::Friendly => "friendly",
            Tone::Playful => "playful",
            Tone::Bold => "bold",
            Tone::Minimal => "minimal",
        }
    }
}

impl fmt::Display for Tone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_names_are_unique_snake_case() {
        let names: std::collections::HashSet<_> =
            WizardState::all().iter().map(|s| s.as_str()).collect();
        assert_eq!(names.len(), WizardState::all().len());
        assert!(names.iter().all(|n| n.chars().all(|c| c.is_ascii_lowercase() || c == '_')));
    }

    #[test]
    fn only_generate_is_terminal() {
        let terminal: Vec<_> = WizardState::all()
            .iter()
            .filter(|s| s.is_terminal())
            .collect();
        assert_eq!(terminal, vec![&WizardState::Generate]);
    }

    #[test]
    fn transient_states_require_ai() {
        for s in WizardState::all() {
            if s.is_transient() {
                assert!(s.requires_ai(), "{s}");
            }
        }
    }

    #[test]
    fn feature_parse_is_lenient() {
        assert_eq!(Feature::parse("Auth"), Some(Feature::Authentication));
        assert_eq!(Feature::parse("dark-mode"), Some(Feature::DarkMode));
        assert_eq!(Feature::parse("Stripe"), Some(Feature::Payments));
        assert_eq!(Feature::parse("teleportation"), None);
    }

    #[test]
    fn pricing_and_analytics_parse() {
        assert_eq!(PricingModel::parse("one-time"), Some(PricingModel::OneTime));
        assert_eq!(PricingModel::parse("Recurring"), Some(PricingModel::Subscription));
        assert_eq!(Analytics::parse("PostHog"), Some(Analytics::PostHog));
        assert_eq!(Analytics::parse("GA4"), Some(Analytics::GoogleAnalytics));
        assert!(!PricingModel::Free.charges());
    }

    #[test]
    fn audience_inference() {
        assert_eq!(Audience::infer("CLI for backend developers"), Audience::Developers);
        assert_eq!(Audience::infer("Newsletter tools for creators"), Audience::Creators);
        assert_eq!(Audience::infer("Invoicing for small agencies"), Audience::B2b);
        assert_eq!(Audience::infer("Meal planning for families"), Audience::B2c);
        assert_eq!(Audience::infer("Rapid client booking for clinics"), Audience::B2c);
    }
}
