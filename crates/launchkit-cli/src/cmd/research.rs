use crate::assistant::ClaudeAssistant;
use crate::cancel;
use crate::cmd::{runtime, Globals};
use crate::output::{heading, print_json, print_table};
use anyhow::Context;
use launchkit_agent::{detect, ProcessRegistry, PROBE_TIMEOUT};
use launchkit_core::assistant::{Assistant, MarketResearch};
use launchkit_core::prompt::slugify;

/// A single token is a product name; anything longer is an idea, named
/// after its first few words.
fn subject(input: &str) -> (String, String) {
    let input = input.trim();
    let words: Vec<&str> = input.split_whitespace().collect();
    if words.len() <= 1 {
        return (input.to_string(), input.to_string());
    }
    let name = slugify(&words[..words.len().min(3)].join(" "));
    (name, input.to_string())
}

fn print_research(research: &MarketResearch) {
    if !research.summary.is_empty() {
        println!("{}", research.summary);
    }
    if !research.competitors.is_empty() {
        heading("Competitors");
        let rows = research
            .competitors
            .iter()
            .map(|c| vec![c.name.clone(), c.url.clone(), c.note.clone()])
            .collect();
        print_table(&["NAME", "URL", "NOTE"], rows);
    }
    if !research.name_conflicts.is_empty() {
        heading("Name conflicts");
        for c in &research.name_conflicts {
            println!("  {c}");
        }
    }
    if !research.alternative_names.is_empty() {
        heading("Alternative names");
        println!("  {}", research.alternative_names.join(", "));
    }
    if !research.sources.is_empty() {
        heading("Sources");
        for s in &research.sources {
            println!("  {s}");
        }
    }
}

pub fn run(globals: &Globals, input: &str, json: bool) -> anyhow::Result<()> {
    let settings = globals.settings()?;
    let rt = runtime()?;
    cancel::install(&rt, ProcessRegistry::global());

    let opts = globals.task_options(&settings);
    rt.block_on(detect(opts.executable(), PROBE_TIMEOUT))
        .context("the research command needs the claude CLI")?;

    let (name, description) = subject(input);
    let assistant = ClaudeAssistant::new(rt.handle().clone(), opts);
    let research = assistant
        .research_market(&name, &description)
        .context("market research failed")?;

    if json {
        print_json(&research)
    } else {
        print_research(&research);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_word_is_a_name() {
        assert_eq!(subject(" notion "), ("notion".into(), "notion".into()));
    }

    #[test]
    fn ideas_are_named_from_leading_words() {
        let (name, description) = subject("Shared grocery lists for families");
        assert_eq!(name, "shared-grocery-lists");
        assert_eq!(description, "Shared grocery lists for families");
    }
}
