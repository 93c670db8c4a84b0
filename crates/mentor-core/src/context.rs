//! System prompt building for an agent turn

use tracing::debug;

use crate::agents::AgentProfile;

/// Build the system prompt for `agent` from its instructions and capability set
pub fn build_system_prompt(agent: &AgentProfile) -> String {
    let mut prompt = String::new();

    prompt.push_str("# IDENTITY\n\n");
    prompt.push_str(&format!("You are the {}.", agent.name));
    prompt.push_str("\n\n");

    if !agent.instructions.is_empty() {
        prompt.push_str("# INSTRUCTIONS\n\n");
        prompt.push_str(&agent.instructions);
        prompt.push_str("\n\n");
    }

    if !agent.capabilities.is_empty() {
        prompt.push_str("# CAPABILITIES\n\n");
        for tool in &agent.capabilities {
            prompt.push_str(&format!("- {}\n", tool));
        }
        prompt.push('\n');
    }

    prompt.push_str("# CURRENT TIME\n\n");
    prompt.push_str(&chrono::Utc::now().to_rfc3339());
    prompt.push_str("\n\n");

    prompt.push_str("# CONVERSATION\n\n");
    prompt.push_str(
        "Earlier turns may have been answered by other specialists before this \
         conversation was handed to you. Continue from the full history.\n",
    );

    debug!("Built system prompt for '{}' ({} chars)", agent.name, prompt.len());

    prompt
}
