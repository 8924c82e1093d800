//! The wizard state machine.
//!
//! [`Wizard::run`] loops over the current [`WizardState`]: it dispatches to
//! that state's handler, which asks questions and/or calls the assistant,
//! merges results into the [`WizardContext`] and returns a [`Transition`].
//! The [`Navigator`] applies the transition, including provenance-aware
//! backtracking and invalidation. The loop ends at [`WizardState::Generate`]
//! or when the user declines at the summary.
//!
//! Graph (AI available, no supplied name):
//!
//! ```text
//! idea_mode ─┬─ description → idea_refinement → name ─┐
//!            └─ discovery_sector → discovery_rough_idea → discovery_research
//!                 → discovery_results → discovery_select → discovery_confirm → name
//! name → name_research → project_config → branding → ai_content → summary
//!      → [project_location] → generate
//! ```
//!
//! Without the assistant: `name → description → project_config → branding →
//! summary → [project_location] → generate`.

use std::path::{Path, PathBuf};

use crate::assistant::{Assistant, DiscoveryRequest, GeneratedContent, MarketResearch};
use crate::context::{Branding, FeatureSelection, Keyed, WizardContext};
use crate::error::{AssistError, LaunchError, Result};
use crate::navigation::{Entry, Navigator};
use crate::prompt::{slugify, Answer, Prompter, TextPrompt, Validator};
use crate::types::{Analytics, Feature, IdeaSource, PricingModel, Tone, WizardState};

/// Sectors offered at the start of idea discovery.
pub const SECTORS: &[&str] = &[
    "Developer tools",
    "Productivity",
    "Finance",
    "Health & fitness",
    "Education",
    "E-commerce",
    "Marketing",
    "Creator economy",
];

/// Ideas requested per discovery run.
pub const DISCOVERY_BATCH: usize = 5;

// ---------------------------------------------------------------------------
// Transition / options / outcome
// ---------------------------------------------------------------------------

/// What a handler decided.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Next(WizardState),
    /// The user asked to go back; the navigator picks the predecessor.
    Back,
    /// Loop back to a state visited earlier ("more ideas", "different
    /// sector", a rejected idea).
    Rewind(WizardState),
    /// The user declined at the summary.
    Decline,
}

#[derive(Debug, Clone)]
pub struct WizardOptions {
    pub ai_available: bool,
    pub skip_research: bool,
    /// Project name given on the command line.
    pub supplied_name: Option<String>,
    /// Confirm the summary without asking.
    pub assume_yes: bool,
    /// Directory the project folder is created in.
    pub base_dir: PathBuf,
}

impl Default for WizardOptions {
    fn default() -> Self {
        Self {
            ai_available: false,
            skip_research: false,
            supplied_name: None,
            assume_yes: false,
            base_dir: PathBuf::from("."),
        }
    }
}

#[derive(Debug)]
pub enum WizardOutcome {
    /// Reached `generate`; the context has `output_dir` set.
    Generate(Box<WizardContext>),
    Declined,
}

// ---------------------------------------------------------------------------
// Wizard
// ---------------------------------------------------------------------------

pub struct Wizard<'a, P: ?Sized, A: ?Sized> {
    prompter: &'a mut P,
    assistant: &'a A,
    opts: WizardOptions,
    ctx: WizardContext,
    nav: Navigator,
    visited: Vec<WizardState>,
}

impl<'a, P, A> Wizard<'a, P, A>
where
    P: Prompter + ?Sized,
    A: Assistant + ?Sized,
{
    pub fn new(prompter: &'a mut P, assistant: &'a A, mut opts: WizardOptions) -> Self {
        opts.supplied_name = opts
            .supplied_name
            .as_deref()
            .map(slugify)
            .filter(|s| !s.is_empty());

        let ctx = WizardContext {
            name: opts.supplied_name.clone().unwrap_or_default(),
            ..Default::default()
        };
        let root = if opts.supplied_name.is_some() {
            WizardState::Description
        } else if opts.ai_available {
            WizardState::IdeaMode
        } else {
            WizardState::Name
        };
        tracing::debug!(root = %root, ai = opts.ai_available, "wizard starting");

        Self {
            prompter,
            assistant,
            opts,
            ctx,
            nav: Navigator::new(root),
            visited: Vec::new(),
        }
    }

    /// Every state entered so far, in order (including repeats).
    pub fn visited(&self) -> &[WizardState] {
        &self.visited
    }

    pub fn context(&self) -> &WizardContext {
        &self.ctx
    }

    pub fn current(&self) -> WizardState {
        self.nav.current()
    }

    pub fn run(&mut self) -> Result<WizardOutcome> {
        let mut entry = Entry::Forward;
        loop {
            let state = self.nav.current();
            self.visited.push(state);
            if state.is_terminal() {
                tracing::debug!(steps = self.visited.len(), "wizard complete");
                let ctx = std::mem::take(&mut self.ctx);
                return Ok(WizardOutcome::Generate(Box::new(ctx)));
            }
            debug_assert!(self.opts.ai_available || !state.requires_ai());
            tracing::debug!(state = %state, ?entry, "entering state");

            let transition = match self.dispatch(state, entry) {
                Ok(t) => t,
                Err(e) if e.is_optional() => {
                    self.degrade(state, &e);
                    Transition::Next(self.skip_successor(state))
                }
                Err(e) => return Err(e),
            };

            entry = match transition {
                Transition::Next(to) | Transition::Rewind(to) => {
                    self.nav.forward(to, &mut self.ctx);
                    Entry::Forward
                }
                Transition::Back => match self.nav.back(&mut self.ctx) {
                    Some(_) => Entry::Back,
                    None => Entry::Forward,
                },
                Transition::Decline => {
                    tracing::info!("generation declined at summary");
                    return Ok(WizardOutcome::Declined);
                }
            };
        }
    }

    fn dispatch(&mut self, state: WizardState, entry: Entry) -> Result<Transition> {
        match state {
            WizardState::IdeaMode => self.idea_mode(),
            WizardState::DiscoverySector => self.discovery_sector(),
            WizardState::DiscoveryRoughIdea => self.discovery_rough_idea(),
            WizardState::DiscoveryResearch => self.discovery_research(),
            WizardState::DiscoveryResults => self.discovery_results(),
            WizardState::DiscoverySelect => self.discovery_select(),
            WizardState::DiscoveryConfirm => self.discovery_confirm(),
            WizardState::Name => self.name(),
            WizardState::Description => self.description(),
            WizardState::IdeaRefinement => self.idea_refinement(entry),
            WizardState::NameResearch => self.name_research(entry),
            WizardState::ProjectConfig => self.project_config(),
            WizardState::Branding => self.branding(),
            WizardState::AiContent => self.ai_content(),
            WizardState::Summary => self.summary(),
            WizardState::ProjectLocation => self.project_location(),
            WizardState::Generate => Ok(Transition::Next(WizardState::Generate)),
        }
    }

    // ---------------------------------------------------------------------
    // Graph edges
    // ---------------------------------------------------------------------

    fn ai(&self) -> bool {
        self.opts.ai_available
    }

    fn allow_back(&self) -> bool {
        !self.nav.is_root()
    }

    fn after_description(&self) -> WizardState {
        if self.ai() {
            WizardState::IdeaRefinement
        } else {
            WizardState::ProjectConfig
        }
    }

    fn after_refinement(&self) -> WizardState {
        if self.opts.supplied_name.is_some() {
            self.after_name()
        } else {
            WizardState::Name
        }
    }

    fn after_name(&self) -> WizardState {
        if !self.ai() {
            WizardState::Description
        } else if self.opts.skip_research {
            WizardState::ProjectConfig
        } else {
            WizardState::NameResearch
        }
    }

    fn after_branding(&self) -> WizardState {
        if self.ai() {
            WizardState::AiContent
        } else {
            WizardState::Summary
        }
    }

    /// Where the loop goes when an optional failure escapes `state`.
    fn skip_successor(&self, state: WizardState) -> WizardState {
        match state {
            WizardState::IdeaMode
            | WizardState::DiscoverySector
            | WizardState::DiscoveryRoughIdea
            | WizardState::DiscoveryResearch
            | WizardState::DiscoveryResults
            | WizardState::DiscoverySelect
            | WizardState::DiscoveryConfirm => WizardState::Description,
            WizardState::Description => self.after_description(),
            WizardState::IdeaRefinement => self.after_refinement(),
            WizardState::Name => self.after_name(),
            WizardState::NameResearch => WizardState::ProjectConfig,
            WizardState::ProjectConfig => WizardState::Branding,
            WizardState::Branding => self.after_branding(),
            WizardState::AiContent => WizardState::Summary,
            WizardState::Summary | WizardState::ProjectLocation | WizardState::Generate => state,
        }
    }

    /// States with nothing to ask continue in the direction they were
    /// entered from.
    fn pass(entry: Entry, next: WizardState) -> Transition {
        match entry {
            Entry::Forward => Transition::Next(next),
            Entry::Back => Transition::Back,
        }
    }

    fn degrade(&mut self, state: WizardState, err: &dyn std::fmt::Display) {
        tracing::warn!(state = %state, error = %err, "optional step degraded");
        self.prompter
            .warn(&format!("{}: {err}", state.fallback_notice()));
    }

    // ---------------------------------------------------------------------
    // Idea entry
    // ---------------------------------------------------------------------

    fn idea_mode(&mut self) -> Result<Transition> {
        let items = vec![
            "I have an idea".to_string(),
            "Help me discover one".to_string(),
        ];
        let default = usize::from(!self.ctx.discovery.candidates.is_empty());
        let Answer::Value(choice) =
            self.prompter
                .select("How would you like to start?", &items, default, self.allow_back())?
        else {
            return Ok(Transition::Back);
        };
        if choice == 0 {
            self.ctx.clear_discovery();
            self.ctx.idea_source = IdeaSource::Direct;
            Ok(Transition::Next(WizardState::Description))
        } else {
            Ok(Transition::Next(WizardState::DiscoverySector))
        }
    }

    fn description(&mut self) -> Result<Transition> {
        let prompt = TextPrompt::new("Describe your product in a sentence or two")
            .default_value(self.ctx.description.clone())
            .validate(Validator::MinLength(10))
            .allow_back(self.allow_back());
        let Answer::Value(description) = self.prompter.text(&prompt)? else {
            return Ok(Transition::Back);
        };
        self.ctx.description = description;
        if self.ctx.idea_source == IdeaSource::Unset {
            self.ctx.idea_source = IdeaSource::Direct;
        }
        Ok(Transition::Next(self.after_description()))
    }

    fn idea_refinement(&mut self, entry: Entry) -> Result<Transition> {
        let next = self.after_refinement();
        if self.ctx.current_refinement().is_none() {
            // Stepping back never re-runs a step that produced nothing.
            if entry == Entry::Back {
                return Ok(Transition::Back);
            }
            match self.assistant.refine_idea(&self.ctx.description) {
                Ok(mut refinement) => {
                    refinement.original = self.ctx.description.clone();
                    self.ctx.refinement = Some(refinement);
                }
                Err(e) => {
                    self.degrade(WizardState::IdeaRefinement, &e);
                    return Ok(Self::pass(entry, next));
                }
            }
        }
        let Some(refinement) = self.ctx.current_refinement().cloned() else {
            return Ok(Self::pass(entry, next));
        };
        if refinement.refined.trim().is_empty() || refinement.refined == refinement.original {
            return Ok(Self::pass(entry, next));
        }

        let body = if refinement.reasoning.is_empty() {
            refinement.refined.clone()
        } else {
            format!("{}\n\n{}", refinement.refined, refinement.reasoning)
        };
        self.prompter.note("Refined idea", &body);
        let items = vec![
            "Use the refined description".to_string(),
            "Keep my original description".to_string(),
        ];
        let Answer::Value(choice) = self.prompter.select(
            "Which description should we use?",
            &items,
            0,
            self.allow_back(),
        )?
        else {
            return Ok(Transition::Back);
        };
        self.ctx.description = if choice == 0 {
            refinement.refined
        } else {
            refinement.original
        };
        Ok(Transition::Next(next))
    }

    fn name(&mut self) -> Result<Transition> {
        let suggested: Vec<String> = self
            .ctx
            .current_refinement()
            .map(|r| r.suggested_names.iter().map(|n| slugify(n)).filter(|n| !n.is_empty()).collect())
            .unwrap_or_default();
        if !suggested.is_empty() {
            self.prompter.note("Suggested names", &suggested.join(", "));
        }
        let default = if self.ctx.name.is_empty() {
            suggested.first().cloned().unwrap_or_default()
        } else {
            self.ctx.name.clone()
        };

        let prompt = TextPrompt::new("Project name")
            .default_value(default)
            .validate(Validator::ProjectName)
            .allow_back(self.allow_back());
        let Answer::Value(name) = self.prompter.text(&prompt)? else {
            return Ok(Transition::Back);
        };
        self.ctx.name = name;
        Ok(Transition::Next(self.after_name()))
    }

    fn name_research(&mut self, entry: Entry) -> Result<Transition> {
        let next = WizardState::ProjectConfig;
        if self.ctx.current_research().is_none() {
            if entry == Entry::Back {
                return Ok(Transition::Back);
            }
            match self
                .assistant
                .research_market(&self.ctx.name, &self.ctx.description)
            {
                Ok(research) => {
                    self.ctx.research = Some(Keyed {
                        key: self.ctx.research_key(),
                        value: research,
                    });
                }
                // The loop reports it and moves on to project_config.
                Err(e) => return Err(e.into()),
            }
        }
        let Some(research) = self.ctx.current_research().cloned() else {
            return Ok(Self::pass(entry, next));
        };
        self.prompter.note(
            &format!("Market research for {}", self.ctx.name),
            &research_summary(&research),
        );

        let alternatives: Vec<String> = research
            .alternative_names
            .iter()
            .map(|n| slugify(n))
            .filter(|n| !n.is_empty() && *n != self.ctx.name)
            .collect();
        if research.name_conflicts.is_empty() || alternatives.is_empty() {
            return Ok(Self::pass(entry, next));
        }

        let mut items = vec![format!("Keep \"{}\"", self.ctx.name)];
        items.extend(alternatives.iter().map(|n| format!("Switch to \"{n}\"")));
        let Answer::Value(choice) = self.prompter.select(
            "The name may clash with existing products. What should we do?",
            &items,
            0,
            self.allow_back(),
        )?
        else {
            return Ok(Transition::Back);
        };
        if let Some(alt) = choice.checked_sub(1).and_then(|i| alternatives.get(i)) {
            self.ctx.name = alt.clone();
            // Same market, new name: keep the findings for the new key.
            self.ctx.research = Some(Keyed {
                key: self.ctx.research_key(),
                value: research,
            });
        }
        Ok(Transition::Next(next))
    }

    // ---------------------------------------------------------------------
    // Idea discovery
    // ---------------------------------------------------------------------

    fn discovery_sector(&mut self) -> Result<Transition> {
        let mut items: Vec<String> = SECTORS.iter().map(|s| s.to_string()).collect();
        items.push("Surprise me".to_string());
        let default = self
            .ctx
            .discovery
            .sector
            .as_deref()
            .and_then(|s| SECTORS.iter().position(|x| *x == s))
            .unwrap_or(SECTORS.len());
        let Answer::Value(choice) =
            self.prompter
                .select("Which sector interests you?", &items, default, self.allow_back())?
        else {
            return Ok(Transition::Back);
        };
        self.ctx.discovery.sector = SECTORS.get(choice).map(|s| s.to_string());
        Ok(Transition::Next(WizardState::DiscoveryRoughIdea))
    }

    fn discovery_rough_idea(&mut self) -> Result<Transition> {
        let prompt = TextPrompt::new("Any rough idea or problem you care about? (optional)")
            .default_value(self.ctx.discovery.rough_idea.clone().unwrap_or_default())
            .validate(Validator::Optional)
            .allow_back(self.allow_back());
        let Answer::Value(rough) = self.prompter.text(&prompt)? else {
            return Ok(Transition::Back);
        };
        self.ctx.discovery.rough_idea = (!rough.is_empty()).then_some(rough);
        Ok(Transition::Next(WizardState::DiscoveryResearch))
    }

    fn discovery_research(&mut self) -> Result<Transition> {
        let more = std::mem::take(&mut self.ctx.discovery.want_more);
        let req = DiscoveryRequest {
            sector: self.ctx.discovery.sector.clone(),
            rough_idea: self.ctx.discovery.rough_idea.clone(),
            count: DISCOVERY_BATCH,
            exclude: if more {
                self.ctx
                    .discovery
                    .candidates
                    .iter()
                    .map(|c| c.name.clone())
                    .collect()
            } else {
                Vec::new()
            },
        };

        let found = self.assistant.discover_ideas(&req).and_then(|ideas| {
            let ideas: Vec<_> = ideas
                .into_iter()
                .filter(|i| !i.name.trim().is_empty())
                .collect();
            if ideas.is_empty() {
                Err(AssistError::Failed("no ideas were returned".into()))
            } else {
                Ok(ideas)
            }
        });
        match found {
            Ok(ideas) if more => {
                let candidates = &mut self.ctx.discovery.candidates;
                for idea in ideas {
                    if !candidates.iter().any(|c| c.name.eq_ignore_ascii_case(&idea.name)) {
                        candidates.push(idea);
                    }
                }
            }
            Ok(ideas) => self.ctx.discovery.candidates = ideas,
            Err(e) => self.degrade(WizardState::DiscoveryResearch, &e),
        }

        if self.ctx.discovery.candidates.is_empty() {
            return Ok(Transition::Rewind(WizardState::IdeaMode));
        }
        Ok(Transition::Next(WizardState::DiscoveryResults))
    }

    fn discovery_results(&mut self) -> Result<Transition> {
        let list = self
            .ctx
            .discovery
            .candidates
            .iter()
            .enumerate()
            .map(|(i, c)| {
                let mut entry = format!("{}. {}: {}\n   {}", i + 1, c.name, c.tagline, c.description);
                if !c.target_audience.is_empty() {
                    entry.push_str(&format!("\n   For: {}", c.target_audience));
                }
                entry
            })
            .collect::<Vec<_>>()
            .join("\n");
        let title = format!("{} idea(s) found", self.ctx.discovery.candidates.len());
        self.prompter.note(&title, &list);
        let Answer::Value(()) = self
            .prompter
            .pause("Press Enter to choose one", self.allow_back())?
        else {
            return Ok(Transition::Back);
        };
        Ok(Transition::Next(WizardState::DiscoverySelect))
    }

    fn discovery_select(&mut self) -> Result<Transition> {
        let mut items: Vec<String> = self
            .ctx
            .discovery
            .candidates
            .iter()
            .map(|c| format!("{}: {}", c.name, c.tagline))
            .collect();
        let more = items.len();
        items.push("Show me more ideas".to_string());
        items.push("Try a different sector".to_string());

        let default = self.ctx.discovery.selected.unwrap_or(0);
        let Answer::Value(choice) =
            self.prompter
                .select("Which idea do you want to build?", &items, default, self.allow_back())?
        else {
            return Ok(Transition::Back);
        };
        if choice < more {
            self.ctx.discovery.selected = Some(choice);
            Ok(Transition::Next(WizardState::DiscoveryConfirm))
        } else if choice == more {
            self.ctx.discovery.want_more = true;
            Ok(Transition::Rewind(WizardState::DiscoveryResearch))
        } else {
            Ok(Transition::Rewind(WizardState::DiscoverySector))
        }
    }

    fn discovery_confirm(&mut self) -> Result<Transition> {
        let picked = self
            .ctx
            .discovery
            .selected
            .and_then(|i| self.ctx.discovery.candidates.get(i))
            .cloned();
        let Some(idea) = picked else {
            return Ok(Transition::Rewind(WizardState::DiscoverySelect));
        };

        let mut body = format!("{}\n\n{}", idea.tagline, idea.description);
        if !idea.problem.is_empty() {
            body.push_str(&format!("\n\nProblem: {}", idea.problem));
        }
        if !idea.why_now.is_empty() {
            body.push_str(&format!("\nWhy now: {}", idea.why_now));
        }
        self.prompter.note(&idea.name, &body);

        let Answer::Value(yes) = self.prompter.confirm(
            &format!("Build \"{}\"?", idea.name),
            true,
            self.allow_back(),
        )?
        else {
            return Ok(Transition::Back);
        };
        if !yes {
            return Ok(Transition::Rewind(WizardState::DiscoverySelect));
        }
        tracing::debug!(idea = %idea.name, "discovered idea adopted");
        self.ctx.adopt_idea(idea);
        Ok(Transition::Next(WizardState::Name))
    }

    // ---------------------------------------------------------------------
    // Configuration
    // ---------------------------------------------------------------------

    fn project_config(&mut self) -> Result<Transition> {
        let seeded_for = Some(self.ctx.description.clone());
        if self.ctx.config_suggested_for != seeded_for {
            let base = FeatureSelection::for_audience(self.ctx.effective_audience());
            let selection = if self.ai() {
                match self.assistant.suggest_config(&self.ctx) {
                    Ok(suggestion) => {
                        if !suggestion.reasoning.is_empty() {
                            self.prompter.note("Suggested setup", &suggestion.reasoning);
                        }
                        suggestion.into_selection(&base)
                    }
                    Err(e) => {
                        self.degrade(WizardState::ProjectConfig, &e);
                        base
                    }
                }
            } else {
                base
            };
            self.ctx.features = selection;
            self.ctx.config_suggested_for = seeded_for;
        }

        let all = Feature::all();
        let items: Vec<String> = all.iter().map(|f| f.label().to_string()).collect();
        let defaults: Vec<bool> = all.iter().map(|f| self.ctx.features.has(*f)).collect();
        let Answer::Value(picked) = self.prompter.multi_select(
            "Which features should be included?",
            &items,
            &defaults,
            self.allow_back(),
        )?
        else {
            return Ok(Transition::Back);
        };
        let features: Vec<Feature> = picked.into_iter().filter_map(|i| all.get(i).copied()).collect();

        let mut pricing = self.ctx.features.pricing;
        if features.contains(&Feature::Payments) {
            let models = PricingModel::all();
            let items: Vec<String> = models.iter().map(|p| p.label().to_string()).collect();
            let default = models.iter().position(|p| *p == pricing).unwrap_or(0);
            let Answer::Value(i) =
                self.prompter
                    .select("Pricing model", &items, default, self.allow_back())?
            else {
                return Ok(Transition::Back);
            };
            pricing = models.get(i).copied().unwrap_or_default();
        }

        let options = Analytics::all();
        let items: Vec<String> = options.iter().map(|a| a.label().to_string()).collect();
        let default = options
            .iter()
            .position(|a| *a == self.ctx.features.analytics)
            .unwrap_or(0);
        let Answer::Value(i) = self
            .prompter
            .select("Analytics", &items, default, self.allow_back())?
        else {
            return Ok(Transition::Back);
        };
        let analytics = options.get(i).copied().unwrap_or_default();

        self.ctx.features = FeatureSelection {
            features,
            pricing,
            analytics,
        };
        Ok(Transition::Next(WizardState::Branding))
    }

    fn branding(&mut self) -> Result<Transition> {
        let prompt = TextPrompt::new("Primary brand colour")
            .default_value(self.ctx.branding.primary_color.clone())
            .validate(Validator::HexColor)
            .allow_back(self.allow_back());
        let Answer::Value(color) = self.prompter.text(&prompt)? else {
            return Ok(Transition::Back);
        };

        let tones = Tone::all();
        let items: Vec<String> = tones.iter().map(|t| t.as_str().to_string()).collect();
        let default = tones
            .iter()
            .position(|t| *t == self.ctx.branding.tone)
            .unwrap_or(0);
        let Answer::Value(i) = self
            .prompter
            .select("Tone of voice", &items, default, self.allow_back())?
        else {
            return Ok(Transition::Back);
        };

        self.ctx.branding = Branding {
            primary_color: color,
            tone: tones.get(i).copied().unwrap_or_default(),
        };
        Ok(Transition::Next(self.after_branding()))
    }

    fn ai_content(&mut self) -> Result<Transition> {
        if self.ctx.content_generated {
            tracing::debug!("content already generated; skipping");
            return Ok(Transition::Next(WizardState::Summary));
        }
        let placeholder = GeneratedContent::placeholder(&self.ctx);
        self.ctx.content = match self.assistant.generate_content(&self.ctx) {
            Ok(content) => content.or_fill(placeholder),
            Err(e) => {
                self.degrade(WizardState::AiContent, &e);
                placeholder
            }
        };
        self.ctx.content_generated = true;
        Ok(Transition::Next(WizardState::Summary))
    }

    // ---------------------------------------------------------------------
    // Summary
    // ---------------------------------------------------------------------

    fn summary(&mut self) -> Result<Transition> {
        let text = summary_text(&self.ctx);
        self.prompter.note("Summary", &text);

        let confirmed = if self.opts.assume_yes {
            true
        } else {
            match self
                .prompter
                .confirm("Generate the project?", true, self.allow_back())?
            {
                Answer::Value(v) => v,
                Answer::Back => return Ok(Transition::Back),
            }
        };
        if !confirmed {
            return Ok(Transition::Decline);
        }

        let target = self.opts.base_dir.join(&self.ctx.name);
        if target.exists() {
            if self.opts.assume_yes {
                return Err(LaunchError::OutputExists(target));
            }
            self.prompter
                .warn(&format!("{} already exists", target.display()));
            return Ok(Transition::Next(WizardState::ProjectLocation));
        }
        self.ctx.output_dir = Some(target);
        Ok(Transition::Next(WizardState::Generate))
    }

    fn project_location(&mut self) -> Result<Transition> {
        let mut default = free_sibling(&self.opts.base_dir, &self.ctx.name);
        loop {
            let prompt = TextPrompt::new("Directory for the project")
                .default_value(default.clone())
                .validate(Validator::NonEmpty)
                .allow_back(self.allow_back());
            let Answer::Value(dir) = self.prompter.text(&prompt)? else {
                return Ok(Transition::Back);
            };
            let path = if Path::new(&dir).is_absolute() {
                PathBuf::from(&dir)
            } else {
                self.opts.base_dir.join(&dir)
            };
            if path.exists() {
                self.prompter
                    .warn(&format!("{} already exists; choose another directory", path.display()));
                default = free_sibling(&self.opts.base_dir, &self.ctx.name);
                continue;
            }
            self.ctx.output_dir = Some(path);
            return Ok(Transition::Next(WizardState::Generate));
        }
    }
}

/// First `name-N` under `base` that does not exist yet.
fn free_sibling(base: &Path, name: &str) -> String {
    (2..100)
        .map(|n| format!("{name}-{n}"))
        .find(|candidate| !base.join(candidate).exists())
        .unwrap_or_else(|| format!("{name}-new"))
}

fn research_summary(research: &MarketResearch) -> String {
    let mut lines = Vec::new();
    if !research.summary.is_empty() {
        lines.push(research.summary.clone());
    }
    if !research.competitors.is_empty() {
        lines.push("Competitors:".to_string());
        for c in &research.competitors {
            let mut line = format!("  - {}", c.name);
            if !c.url.is_empty() {
                line.push_str(&format!(" ({})", c.url));
            }
            if !c.note.is_empty() {
                line.push_str(&format!(": {}", c.note));
            }
            lines.push(line);
        }
    }
    if !research.name_conflicts.is_empty() {
        lines.push(format!(
            "Possible name conflicts: {}",
            research.name_conflicts.join(", ")
        ));
    }
    if !research.sources.is_empty() {
        lines.push(format!("Based on {} source(s)", research.sources.len()));
    }
    if lines.is_empty() {
        lines.push("No notable competitors found.".to_string());
    }
    lines.join("\n")
}

fn summary_text(ctx: &WizardContext) -> String {
    let mut lines = vec![
        format!("Name:        {}", ctx.name),
        format!("Description: {}", ctx.description),
    ];
    if let Some(idea) = &ctx.discovered_idea {
        lines.push(format!("Idea:        {} (discovered)", idea.name));
    }
    if let Some(audience) = ctx.audience {
        lines.push(format!("Audience:    {audience}"));
    }
    let features: Vec<&str> = ctx.features.features.iter().map(|f| f.label()).collect();
    lines.push(format!(
        "Features:    {}",
        if features.is_empty() {
            "none".to_string()
        } else {
            features.join(", ")
        }
    ));
    if ctx.features.has(Feature::Payments) {
        lines.push(format!("Pricing:     {}", ctx.features.pricing.label()));
    }
    lines.push(format!("Analytics:   {}", ctx.features.analytics.label()));
    lines.push(format!(
        "Branding:    {} / {}",
        ctx.branding.primary_color, ctx.branding.tone
    ));
    if !ctx.content.tagline.is_empty() {
        lines.push(format!("Tagline:     {}", ctx.content.tagline));
    }
    if let Some(research) = ctx.current_research() {
        lines.push(format!("Competitors: {}", research.competitors.len()));
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assistant::{ConfigSuggestion, IdeaCandidate, Refinement};
    use std::cell::Cell;

    struct Silent;

    impl Prompter for Silent {
        fn text(&mut self, _: &TextPrompt) -> Result<Answer<String>> {
            Err(LaunchError::InputClosed)
        }
        fn select(&mut self, _: &str, _: &[String], _: usize, _: bool) -> Result<Answer<usize>> {
            Err(LaunchError::InputClosed)
        }
        fn multi_select(
            &mut self,
            _: &str,
            _: &[String],
            _: &[bool],
            _: bool,
        ) -> Result<Answer<Vec<usize>>> {
            Err(LaunchError::InputClosed)
        }
        fn confirm(&mut self, _: &str, _: bool, _: bool) -> Result<Answer<bool>> {
            Err(LaunchError::InputClosed)
        }
        fn pause(&mut self, _: &str, _: bool) -> Result<Answer<()>> {
            Err(LaunchError::InputClosed)
        }
        fn note(&mut self, _: &str, _: &str) {}
        fn warn(&mut self, _: &str) {}
    }

    #[derive(Default)]
    struct Counting {
        content_calls: Cell<usize>,
    }

    impl Assistant for Counting {
        fn discover_ideas(
            &self,
            _: &DiscoveryRequest,
        ) -> std::result::Result<Vec<IdeaCandidate>, AssistError> {
            Err(AssistError::Unavailable)
        }
        fn refine_idea(&self, _: &str) -> std::result::Result<Refinement, AssistError> {
            Err(AssistError::Unavailable)
        }
        fn research_market(
            &self,
            _: &str,
            _: &str,
        ) -> std::result::Result<MarketResearch, AssistError> {
            Err(AssistError::Unavailable)
        }
        fn suggest_config(
            &self,
            _: &WizardContext,
        ) -> std::result::Result<ConfigSuggestion, AssistError> {
            Err(AssistError::Unavailable)
        }
        fn generate_content(
            &self,
            _: &WizardContext,
        ) -> std::result::Result<GeneratedContent, AssistError> {
            self.content_calls.set(self.content_calls.get() + 1);
            Ok(GeneratedContent {
                tagline: "Fresh copy".into(),
                ..Default::default()
            })
        }
    }

    fn ai() -> WizardOptions {
        WizardOptions {
            ai_available: true,
            ..Default::default()
        }
    }

    #[test]
    fn root_depends_on_ai_and_supplied_name() {
        let a = Counting::default();
        let mut p = Silent;
        assert_eq!(Wizard::new(&mut p, &a, ai()).current(), WizardState::IdeaMode);
        assert_eq!(
            Wizard::new(&mut p, &a, WizardOptions::default()).current(),
            WizardState::Name
        );
        let named = WizardOptions {
            supplied_name: Some("Acme App".into()),
            ..ai()
        };
        let w = Wizard::new(&mut p, &a, named);
        assert_eq!(w.current(), WizardState::Description);
        assert_eq!(w.context().name, "acme-app");
    }

    #[test]
    fn unusable_supplied_name_is_ignored() {
        let a = Counting::default();
        let mut p = Silent;
        let opts = WizardOptions {
            supplied_name: Some("!!!".into()),
            ..Default::default()
        };
        assert_eq!(Wizard::new(&mut p, &a, opts).current(), WizardState::Name);
    }

    #[test]
    fn ai_content_runs_once_until_invalidated() {
        let a = Counting::default();
        let mut p = Silent;
        let mut w = Wizard::new(&mut p, &a, ai());

        assert_eq!(
            w.ai_content().unwrap(),
            Transition::Next(WizardState::Summary)
        );
        assert_eq!(
            w.ai_content().unwrap(),
            Transition::Next(WizardState::Summary)
        );
        assert_eq!(a.content_calls.get(), 1);
        assert_eq!(w.ctx.content.tagline, "Fresh copy");

        w.ctx.invalidate(WizardState::Branding);
        w.ai_content().unwrap();
        assert_eq!(a.content_calls.get(), 2);
    }

    #[test]
    fn generated_copy_is_completed_from_placeholder() {
        let a = Counting::default();
        let mut p = Silent;
        let mut w = Wizard::new(&mut p, &a, ai());
        w.ctx.name = "acme-app".into();
        w.ai_content().unwrap();
        assert_eq!(w.ctx.content.tagline, "Fresh copy");
        assert_eq!(w.ctx.content.headline, "Acme App");
    }

    #[test]
    fn skip_successors_follow_the_graph() {
        let a = Counting::default();
        let mut p = Silent;
        let w = Wizard::new(&mut p, &a, ai());
        assert_eq!(
            w.skip_successor(WizardState::DiscoveryResearch),
            WizardState::Description
        );
        assert_eq!(
            w.skip_successor(WizardState::IdeaRefinement),
            WizardState::Name
        );
        assert_eq!(
            w.skip_successor(WizardState::NameResearch),
            WizardState::ProjectConfig
        );
        assert_eq!(
            w.skip_successor(WizardState::Branding),
            WizardState::AiContent
        );

        let mut p = Silent;
        let w = Wizard::new(&mut p, &a, WizardOptions::default());
        assert_eq!(w.skip_successor(WizardState::Name), WizardState::Description);
        assert_eq!(w.skip_successor(WizardState::Branding), WizardState::Summary);
    }

    #[test]
    fn free_sibling_skips_taken_names() {
        let dir = tempfile::TempDir::new().unwrap();
        std::fs::create_dir(dir.path().join("app-2")).unwrap();
        assert_eq!(free_sibling(dir.path(), "app"), "app-3");
    }
}
