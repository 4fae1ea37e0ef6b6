//! `skillrt prompt`: print the skills block a model would receive.

use anyhow::Result;

use skillrt_core::prompt::PromptOptions;
use skillrt_types::skill::SkillFilter;

use crate::state::AppState;

/// Render the prompt. With `active` skills, a throwaway session is seeded
/// with them so their bodies render in the given order.
pub async fn print_prompt(
    state: &AppState,
    active: &[String],
    tool_only: bool,
    json: bool,
) -> Result<()> {
    let options = PromptOptions {
        filter: None,
        tool_only,
    };

    let prompt = if active.is_empty() {
        state.prompts.catalog_prompt(&options)?
    } else {
        let info = state
            .sessions
            .create_session(None, active, SkillFilter::all())?;
        let rendered = state.prompts.session_prompt(info.session_id, &options).await;
        state.sessions.close_session(info.session_id);
        rendered?
    };

    if json {
        let out = serde_json::json!({ "prompt": prompt });
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        println!("{prompt}");
    }
    Ok(())
}
