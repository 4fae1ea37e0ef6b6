//! `skillrt read` and `skillrt run`: exercise the resource tools from a shell.
//!
//! Each invocation opens a one-off session with the named skill active and
//! routes through the same dispatcher the REST API uses.

use std::collections::BTreeMap;

use anyhow::{bail, Result};
use console::style;

use skillrt_core::tool::ToolCall;
use skillrt_types::skill::SkillFilter;
use skillrt_types::tool::{ContentEncoding, ReadArgs, ReadOutput, RunScriptArgs, RunScriptOutput};

use crate::state::AppState;

async fn with_skill_session<T>(
    state: &AppState,
    skill: &str,
    call: ToolCall,
) -> Result<T>
where
    T: serde::de::DeserializeOwned,
{
    let info = state
        .sessions
        .create_session(None, &[skill.to_owned()], SkillFilter::all())?;
    let result = state
        .dispatcher
        .dispatch(info.session_id, call)
        .await;
    state.sessions.close_session(info.session_id);

    match result {
        Ok(value) => Ok(serde_json::from_value(value)?),
        Err(failure) => bail!("{failure}"),
    }
}

/// Read a resource file from a skill and print it.
pub async fn read_resource(state: &AppState, skill: &str, path: &str, json: bool) -> Result<()> {
    let output: ReadOutput = with_skill_session(
        state,
        skill,
        ToolCall::Read(ReadArgs {
            skill: None,
            path: path.to_owned(),
        }),
    )
    .await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    if output.encoding == ContentEncoding::Base64 {
        eprintln!(
            "  {} binary file, {} bytes, printed as base64",
            style("note:").dim(),
            output.bytes
        );
    }
    println!("{}", output.content);
    if output.truncated {
        eprintln!(
            "  {} truncated to the configured read limit ({} bytes total)",
            style("note:").yellow(),
            output.bytes
        );
    }
    Ok(())
}

/// Run a skill script and relay its output. Exits non-zero when the script does.
pub async fn run_script(
    state: &AppState,
    skill: &str,
    path: &str,
    args: Vec<String>,
    timeout_ms: Option<u64>,
    json: bool,
) -> Result<()> {
    if timeout_ms == Some(0) {
        bail!("--timeout-ms must be positive");
    }
    let output: RunScriptOutput = with_skill_session(
        state,
        skill,
        ToolCall::RunScript(RunScriptArgs {
            skill: None,
            path: path.to_owned(),
            args,
            env: BTreeMap::new(),
            workdir: None,
            timeout_ms,
        }),
    )
    .await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        print!("{}", output.stdout);
        eprint!("{}", output.stderr);
        if output.truncated_stdout || output.truncated_stderr {
            eprintln!("  {} output truncated", style("note:").yellow());
        }
        eprintln!(
            "  {} exit {} in {}ms",
            style("→").dim(),
            output
                .exit_code
                .map_or_else(|| "signal".to_string(), |c| c.to_string()),
            output.duration_ms
        );
    }

    if output.exit_code != Some(0) {
        bail!("Script {} exited unsuccessfully", output.path);
    }
    Ok(())
}
