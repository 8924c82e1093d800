//! [`Assistant`] backed by the claude CLI.
//!
//! Each call is one `run_task` on the shared runtime, driven from the
//! wizard's thread with `Handle::block_on`. A spinner on stderr mirrors the
//! task's progress events.

use indicatif::{ProgressBar, ProgressStyle};
use launchkit_agent::{run_task, AgentError, Progress, ProgressKind, TaskOptions, TaskOutput};
use launchkit_core::assistant::{
    extract_json, Assistant, ConfigSuggestion, DiscoveryRequest, GeneratedContent,
    IdeaCandidate, MarketResearch, Refinement,
};
use launchkit_core::context::WizardContext;
use launchkit_core::types::{Analytics, Feature, PricingModel};
use launchkit_core::AssistError;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tokio::runtime::Handle;

const WEB_TOOLS: &[&str] = &["WebSearch", "WebFetch"];

pub struct ClaudeAssistant {
    handle: Handle,
    base: TaskOptions,
}

impl ClaudeAssistant {
    pub fn new(handle: Handle, base: TaskOptions) -> Self {
        Self { handle, base }
    }

    fn ask<T: DeserializeOwned>(
        &self,
        label: &str,
        prompt: &str,
        tools: &[&str],
    ) -> Result<(T, TaskOutput), AssistError> {
        let opts = TaskOptions {
            allowed_tools: tools.iter().map(|t| t.to_string()).collect(),
            ..self.base.clone()
        };
        let spinner = spinner(label);
        let result = self.handle.block_on(run_task(prompt, opts, |p| {
            if let Some(msg) = progress_line(label, &p) {
                spinner.set_message(msg);
            }
        }));
        spinner.finish_and_clear();

        let out = result.map_err(to_assist)?;
        tracing::debug!(label, searches = out.searches, sources = out.sources.len(), "task done");
        let value = extract_json(&out.text)?;
        Ok((value, out))
    }
}

fn spinner(label: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner:.cyan} {msg} {elapsed:.dim}") {
        pb.set_style(style);
    }
    pb.enable_steady_tick(Duration::from_millis(100));
    pb.set_message(format!("{label}…"));
    pb
}

fn progress_line(label: &str, p: &Progress) -> Option<String> {
    match p.kind {
        ProgressKind::Finished => None,
        ProgressKind::Heartbeat if p.searches == 0 => Some(format!("{label}…")),
        _ if p.searches > 0 => Some(format!(
            "{label}: {} ({} searches, {} sources)",
            p.status, p.searches, p.sources
        )),
        _ => Some(format!("{label}: {}", p.status)),
    }
}

fn to_assist(e: AgentError) -> AssistError {
    match e {
        AgentError::Timeout { after } => AssistError::Timeout(after),
        AgentError::NotInstalled(_) => AssistError::Unavailable,
        other => AssistError::Failed(other.to_string()),
    }
}

// ---------------------------------------------------------------------------
// Prompts
// ---------------------------------------------------------------------------

fn discovery_prompt(req: &DiscoveryRequest) -> String {
    let mut p = format!(
        "Suggest {} distinct SaaS product ideas a solo developer could launch.",
        req.count
    );
    if let Some(sector) = &req.sector {
        p.push_str(&format!(" Focus on the {sector} sector."));
    }
    if let Some(idea) = &req.rough_idea {
        p.push_str(&format!(" Build on this rough idea: {idea}"));
    }
    if !req.exclude.is_empty() {
        p.push_str(&format!(
            " Do not repeat any of these: {}.",
            req.exclude.join(", ")
        ));
    }
    p.push_str(
        " Search the web for current demand before answering.\n\
         Reply with only a JSON array of objects with the string fields \
         name, tagline, description, target_audience, problem and why_now. \
         Names must be short and lowercase with hyphens.",
    );
    p
}

fn refine_prompt(description: &str) -> String {
    format!(
        "A founder describes their product as:\n\n{description}\n\n\
         Rewrite it as a sharper two-sentence pitch and suggest five short \
         product names (lowercase, hyphens allowed).\n\
         Reply with only a JSON object: \
         {{\"refined\": string, \"suggested_names\": [string], \"reasoning\": string}}"
    )
}

fn research_prompt(name: &str, description: &str) -> String {
    format!(
        "Research the market for a product called \"{name}\": {description}\n\n\
         Find the main competitors and any existing products or trademarks \
         using the same name. If the name is taken, suggest alternatives.\n\
         Reply with only a JSON object: \
         {{\"summary\": string, \
         \"competitors\": [{{\"name\": string, \"url\": string, \"note\": string}}], \
         \"name_conflicts\": [string], \"alternative_names\": [string], \
         \"sources\": [string]}}"
    )
}

fn config_prompt(ctx: &WizardContext) -> String {
    let features: Vec<&str> = Feature::all().iter().map(|f| f.as_str()).collect();
    let pricing: Vec<&str> = PricingModel::all().iter().map(|p| p.as_str()).collect();
    let analytics: Vec<&str> = Analytics::all().iter().map(|a| a.as_str()).collect();
    format!(
        "Product: {}\nDescription: {}\nAudience: {}\n\n\
         Choose the starter features, pricing model and analytics provider.\n\
         Features (any of): {}\nPricing (one of): {}\nAnalytics (one of): {}\n\
         Reply with only a JSON object: \
         {{\"features\": [string], \"pricing\": string, \"analytics\": string, \
         \"reasoning\": string}}",
        ctx.name,
        ctx.description,
        ctx.effective_audience().as_str(),
        features.join(", "),
        pricing.join(", "),
        analytics.join(", "),
    )
}

fn content_prompt(ctx: &WizardContext) -> String {
    let features: Vec<&str> = ctx.features.features.iter().map(|f| f.label()).collect();
    format!(
        "Write landing page copy for {}.\nDescription: {}\nAudience: {}\n\
         Tone: {}\nPricing: {}\nFeatures: {}\n\n\
         Reply with only a JSON object: \
         {{\"tagline\": string, \"headline\": string, \"subheadline\": string, \
         \"features\": [{{\"title\": string, \"description\": string}}], \
         \"cta\": string, \"seo_keywords\": [string]}}",
        ctx.name,
        ctx.description,
        ctx.effective_audience().as_str(),
        ctx.branding.tone.as_str(),
        ctx.features.pricing.label(),
        features.join(", "),
    )
}

// ---------------------------------------------------------------------------
// Assistant
// ---------------------------------------------------------------------------

impl Assistant for ClaudeAssistant {
    fn discover_ideas(&self, req: &DiscoveryRequest) -> Result<Vec<IdeaCandidate>, AssistError> {
        let (ideas, _): (Vec<IdeaCandidate>, _) =
            self.ask("Discovering ideas", &discovery_prompt(req), WEB_TOOLS)?;
        let ideas: Vec<IdeaCandidate> = ideas
            .into_iter()
            .filter(|i| !i.name.trim().is_empty())
            .filter(|i| !req.exclude.contains(&i.name))
            .collect();
        if ideas.is_empty() {
            return Err(AssistError::Failed("no ideas were returned".into()));
        }
        Ok(ideas)
    }

    fn refine_idea(&self, description: &str) -> Result<Refinement, AssistError> {
        let (refinement, _): (Refinement, _) =
            self.ask("Refining your idea", &refine_prompt(description), &[])?;
        Ok(refinement)
    }

    fn research_market(
        &self,
        name: &str,
        description: &str,
    ) -> Result<MarketResearch, AssistError> {
        let (mut research, out): (MarketResearch, _) = self.ask(
            "Researching the market",
            &research_prompt(name, description),
            WEB_TOOLS,
        )?;
        if research.sources.is_empty() {
            research.sources = out.sources;
        }
        Ok(research)
    }

    fn suggest_config(&self, ctx: &WizardContext) -> Result<ConfigSuggestion, AssistError> {
        let (suggestion, _) = self.ask("Choosing features", &config_prompt(ctx), &[])?;
        Ok(suggestion)
    }

    fn generate_content(&self, ctx: &WizardContext) -> Result<GeneratedContent, AssistError> {
        let (content, _) = self.ask("Writing landing page copy", &content_prompt(ctx), &[])?;
        Ok(content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn agent_errors_map_to_assist_errors() {
        let after = Duration::from_secs(180);
        assert!(matches!(
            to_assist(AgentError::Timeout { after }),
            AssistError::Timeout(d) if d == after
        ));
        assert!(matches!(
            to_assist(AgentError::NotInstalled("claude".into())),
            AssistError::Unavailable
        ));
        assert!(matches!(
            to_assist(AgentError::Process("exit 1".into())),
            AssistError::Failed(m) if m.contains("exit 1")
        ));
    }

    #[test]
    fn discovery_prompt_carries_request() {
        let req = DiscoveryRequest {
            sector: Some("Health".into()),
            rough_idea: None,
            count: 5,
            exclude: vec!["pill-pal".into()],
        };
        let p = discovery_prompt(&req);
        assert!(p.contains("Suggest 5"));
        assert!(p.contains("Health sector"));
        assert!(p.contains("pill-pal"));
        assert!(!p.contains("rough idea"));
    }

    #[test]
    fn config_prompt_lists_choices() {
        let ctx = WizardContext {
            name: "acme".into(),
            ..Default::default()
        };
        let p = config_prompt(&ctx);
        for f in Feature::all() {
            assert!(p.contains(f.as_str()));
        }
        assert!(p.contains("freemium"));
    }

    #[test]
    fn progress_lines() {
        let mut p = Progress {
            kind: ProgressKind::Search,
            status: "searching \"crm\"".into(),
            searches: 2,
            sources: 3,
            elapsed: Duration::from_secs(4),
        };
        assert_eq!(
            progress_line("Research", &p).as_deref(),
            Some("Research: searching \"crm\" (2 searches, 3 sources)")
        );
        p.kind = ProgressKind::Finished;
        assert!(progress_line("Research", &p).is_none());
    }
}
