//! History-dependent backtracking.
//!
//! The [`Navigator`] keeps a predecessor stack. Moving forward pushes the
//! state being left; moving forward into a state already on the stack (the
//! "more ideas" and "different sector" loops) truncates back to it. Going
//! back pops to a computed predecessor, and every state unwound on the way
//! has its derived context invalidated.

use crate::context::WizardContext;
use crate::types::{IdeaSource, WizardState};

/// How a state's handler was entered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entry {
    Forward,
    /// Reached by backtracking; handlers with nothing to ask pass through.
    Back,
}

#[derive(Debug, Clone)]
pub struct Navigator {
    current: WizardState,
    history: Vec<WizardState>,
}

impl Navigator {
    pub fn new(root: WizardState) -> Self {
        Self {
            current: root,
            history: Vec::new(),
        }
    }

    pub fn current(&self) -> WizardState {
        self.current
    }

    pub fn history(&self) -> &[WizardState] {
        &self.history
    }

    /// At the root there is nothing to go back to.
    pub fn is_root(&self) -> bool {
        self.history.is_empty()
    }

    /// Advance to `to`. If `to` is already on the stack, the states after it
    /// and the current state are unwound and invalidated; `to` itself keeps
    /// its data.
    pub fn forward(&mut self, to: WizardState, ctx: &mut WizardContext) {
        if to == self.current {
            return;
        }
        match self.history.iter().position(|s| *s == to) {
            Some(pos) => {
                let unwound: Vec<WizardState> = self.history.drain(pos..).skip(1).collect();
                ctx.invalidate(self.current);
                for s in unwound.into_iter().rev() {
                    ctx.invalidate(s);
                }
                tracing::debug!(from = %self.current, to = %to, "rewinding");
            }
            None => {
                self.history.push(self.current);
                tracing::debug!(from = %self.current, to = %to, "advancing");
            }
        }
        self.current = to;
    }

    /// Backtrack to the predecessor of the current state. Returns `None`
    /// (and changes nothing) at the root.
    pub fn back(&mut self, ctx: &mut WizardContext) -> Option<WizardState> {
        let pos = self.predecessor(ctx)?;
        let target = self.history[pos];
        let unwound: Vec<WizardState> = self.history.drain(pos..).skip(1).collect();
        ctx.invalidate(self.current);
        for s in unwound.into_iter().rev() {
            ctx.invalidate(s);
        }
        tracing::debug!(from = %self.current, to = %target, "going back");
        self.current = target;
        Some(target)
    }

    /// Stack index of the state Back lands on.
    fn predecessor(&self, ctx: &WizardContext) -> Option<usize> {
        let explicit = match self.current {
            WizardState::Name if ctx.idea_source == IdeaSource::Discovered => {
                Some(WizardState::DiscoveryResults)
            }
            WizardState::Summary => Some(WizardState::Branding),
            _ => None,
        };
        explicit
            .and_then(|target| self.history.iter().rposition(|s| *s == target))
            .or_else(|| self.history.iter().rposition(|s| !s.is_transient()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assistant::IdeaCandidate;
    use WizardState::*;

    fn walk(nav: &mut Navigator, ctx: &mut WizardContext, states: &[WizardState]) {
        for s in states {
            nav.forward(*s, ctx);
        }
    }

    #[test]
    fn back_is_swallowed_at_root() {
        let mut ctx = WizardContext::default();
        let mut nav = Navigator::new(Name);
        assert!(nav.is_root());
        assert_eq!(nav.back(&mut ctx), None);
        assert_eq!(nav.current(), Name);
    }

    #[test]
    fn linear_back_returns_to_previous_state() {
        let mut ctx = WizardContext::default();
        let mut nav = Navigator::new(Name);
        walk(&mut nav, &mut ctx, &[Description, ProjectConfig]);
        assert_eq!(nav.back(&mut ctx), Some(Description));
        assert_eq!(nav.history(), &[Name]);
    }

    #[test]
    fn back_skips_transient_states() {
        let mut ctx = WizardContext::default();
        let mut nav = Navigator::new(IdeaMode);
        walk(
            &mut nav,
            &mut ctx,
            &[DiscoverySector, DiscoveryRoughIdea, DiscoveryResearch, DiscoveryResults],
        );
        ctx.discovery.candidates.push(IdeaCandidate::default());
        assert_eq!(nav.back(&mut ctx), Some(DiscoveryRoughIdea));
        // research was unwound, so its candidates are gone
        assert!(ctx.discovery.candidates.is_empty());
    }

    #[test]
    fn name_reached_by_discovery_backs_to_results() {
        let mut ctx = WizardContext::default();
        let mut nav = Navigator::new(IdeaMode);
        walk(
            &mut nav,
            &mut ctx,
            &[
                DiscoverySector,
                DiscoveryRoughIdea,
                DiscoveryResearch,
                DiscoveryResults,
                DiscoverySelect,
                DiscoveryConfirm,
            ],
        );
        ctx.adopt_idea(IdeaCandidate {
            name: "Pilot".into(),
            description: "Autopilot for ops".into(),
            ..Default::default()
        });
        nav.forward(Name, &mut ctx);

        assert_eq!(nav.back(&mut ctx), Some(DiscoveryResults));
        assert!(ctx.discovered_idea.is_none());
        assert!(ctx.audience.is_none());
    }

    #[test]
    fn summary_backs_to_branding_past_ai_content() {
        let mut ctx = WizardContext::default();
        let mut nav = Navigator::new(Name);
        walk(&mut nav, &mut ctx, &[Description, ProjectConfig, Branding, AiContent]);
        ctx.content_generated = true;
        nav.forward(Summary, &mut ctx);

        assert_eq!(nav.back(&mut ctx), Some(Branding));
        assert!(!ctx.content_generated);
    }

    #[test]
    fn forward_into_history_truncates() {
        let mut ctx = WizardContext::default();
        let mut nav = Navigator::new(IdeaMode);
        walk(
            &mut nav,
            &mut ctx,
            &[
                DiscoverySector,
                DiscoveryRoughIdea,
                DiscoveryResearch,
                DiscoveryResults,
                DiscoverySelect,
            ],
        );
        ctx.discovery.candidates.push(IdeaCandidate::default());
        ctx.discovery.selected = Some(0);

        nav.forward(DiscoveryResearch, &mut ctx);
        assert_eq!(nav.current(), DiscoveryResearch);
        assert_eq!(nav.history(), &[IdeaMode, DiscoverySector, DiscoveryRoughIdea]);
        // the rewind target keeps its candidates; the select step's choice goes
        assert_eq!(ctx.discovery.candidates.len(), 1);
        assert_eq!(ctx.discovery.selected, None);
    }
}
