//! Fix-prompt builder for deterministic agent input.

use std::sync::LazyLock;

use minijinja::{Environment, context};

use crate::core::hooks::failed_hook_ids;

const FIX_TEMPLATE: &str = include_str!("prompts/fix.md");

static ENGINE: LazyLock<PromptEngine> = LazyLock::new(PromptEngine::new);

/// Template engine wrapper around minijinja.
struct PromptEngine {
    env: Environment<'static>,
}

impl PromptEngine {
    fn new() -> Self {
        let mut env = Environment::new();
        env.add_template("fix", FIX_TEMPLATE)
            .expect("fix template should be valid");
        Self { env }
    }

    fn render_fix(&self, raw_output: &str) -> String {
        let hooks = failed_hook_ids(raw_output);
        let template = self
            .env
            .get_template("fix")
            .expect("fix template registered");
        template
            .render(context! {
                hooks => (!hooks.is_empty()).then(|| hooks.join(", ")),
                output => raw_output,
            })
            .expect("fix template renders for any input")
    }
}

/// Build the instruction prompt for one agent turn.
///
/// Pure function of `raw_output`: identical input yields a byte-identical
/// prompt, and the raw lint output appears verbatim as a contiguous
/// substring. The fixed instruction lines constrain the agent to minimal,
/// dependency-free, scope-limited edits.
pub fn build_fix_prompt(raw_output: &str) -> String {
    ENGINE.render_fix(raw_output)
}
