//! Prompt templates for pairwise classification.

use crate::knowledge::Item;

/// Asks for a bare yes/no answer.
pub const SIMPLE_TEMPLATE: &str = "Question: Here are two parts of software development artifacts.\n\n\
{source_type}: '''{source_content}'''\n\n\
{target_type}: '''{target_content}'''\n\
Are they related?\n\n\
Answer with 'yes' or 'no'.\n";

/// Asks for reasoning followed by an answer inside `<trace>` tags.
pub const REASONING_TEMPLATE: &str = "Below are two artifacts from the same software system. \
Is there a traceability link between (1) and (2)? Give your reasoning and then answer with \
'yes' or 'no' enclosed in <trace> </trace>.\n \
(1) {source_type}: '''{source_content}''' \n \
(2) {target_type}: '''{target_content}''' ";

/// System message sent ahead of the prompt when enabled.
pub const SYSTEM_MESSAGE: &str =
    "Your job is to determine if there is a traceability link between two artifacts of a system.";

/// Fills the `{source_type}`, `{source_content}`, `{target_type}` and
/// `{target_content}` placeholders.
pub fn render_prompt(template: &str, source: &Item, target: &Item) -> String {
    template
        .replace("{source_type}", source.kind())
        .replace("{source_content}", source.content())
        .replace("{target_type}", target.kind())
        .replace("{target_content}", target.content())
}
