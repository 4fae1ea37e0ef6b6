//! Instruction block assembled before every model call.
//!
//! Progressive disclosure: the catalog lists each available skill's name and
//! description so the model knows what exists, and only loaded skills have
//! their bodies included. Output is tagged text:
//!
//! ```xml
//! <skills_system>
//! <rule>...</rule>
//! <available_skills>
//!   <skill>
//!     <name>pdf</name>
//!     <description>Work with PDF files</description>
//!     <location>/skills/pdf/SKILL.md</location>
//!   </skill>
//! </available_skills>
//! <active_skills>
//! <skill name="pdf" digest="...">
//! <![CDATA[
//! ...body...
//! ]]>
//! </skill>
//! </active_skills>
//! </skills_system>
//! ```
//!
//! Metadata is entity-escaped. Bodies go out verbatim inside a CDATA section,
//! with any `]]>` in the body split across two sections, so body text cannot
//! close the surrounding tags.
//!
//! Conversation history is never touched; the block is recomputed per call.

use std::sync::Arc;

use skillrt_types::error::SkillError;
use skillrt_types::skill::{SkillFilter, SkillRecord};
use uuid::Uuid;

use crate::session::SessionManager;
use crate::skill::registry::SkillRegistry;

/// Fixed rule emitted ahead of the catalog.
pub const BASE_RULE: &str = "Skills extend what you can do. Only a skill's name and \
description are known until it is loaded: do not assume its instructions, resources, \
or scripts are available before calling skills.load for it. When several skills are \
active and their instructions conflict, the skill listed later takes precedence.";

/// Per-call rendering options.
#[derive(Debug, Clone, Default)]
pub struct PromptOptions {
    /// Narrows the catalog for this call only.
    pub filter: Option<SkillFilter>,
    /// Omit locations, for consumers that only reach skills through tools.
    pub tool_only: bool,
}

pub struct PromptComposer {
    registry: Arc<SkillRegistry>,
    sessions: Arc<SessionManager>,
}

impl PromptComposer {
    pub fn new(sessions: Arc<SessionManager>) -> Self {
        Self {
            registry: Arc::clone(sessions.registry()),
            sessions,
        }
    }

    /// Base rule and catalog, without any session.
    pub fn catalog_prompt(&self, options: &PromptOptions) -> Result<String, SkillError> {
        self.registry.ensure_available()?;
        let available = self.available(&SkillFilter::all(), options);
        Ok(render_prompt(&available, &[], options.tool_only))
    }

    /// Full block for one session: base rule, catalog within the session's
    /// visibility, then active bodies in active order.
    pub async fn session_prompt(
        &self,
        session_id: Uuid,
        options: &PromptOptions,
    ) -> Result<String, SkillError> {
        self.registry.ensure_available()?;
        let visible = self.sessions.filter(session_id).await?;
        let active = self.sessions.active_records(session_id).await?;
        let available = self.available(&visible, options);

        tracing::trace!(
            session_id = %session_id,
            available = available.len(),
            active = active.len(),
            "Composed skills prompt"
        );
        Ok(render_prompt(&available, &active, options.tool_only))
    }

    fn available(&self, base: &SkillFilter, options: &PromptOptions) -> Vec<Arc<SkillRecord>> {
        self.registry
            .list(base)
            .into_iter()
            .filter(|r| r.enabled)
            .filter(|r| options.filter.as_ref().is_none_or(|f| f.matches(&r.def)))
            .collect()
    }
}

/// Render the block from already selected records.
pub fn render_prompt(
    available: &[Arc<SkillRecord>],
    active: &[Arc<SkillRecord>],
    tool_only: bool,
) -> String {
    let mut out = String::from("<skills_system>\n");
    out.push_str("<rule>");
    out.push_str(BASE_RULE);
    out.push_str("</rule>\n");

    if available.is_empty() {
        out.push_str("<available_skills />\n");
    } else {
        out.push_str("<available_skills>\n");
        for record in available {
            out.push_str("  <skill>\n");
            out.push_str(&format!("    <name>{}</name>\n", escape_xml(record.name())));
            out.push_str(&format!(
                "    <description>{}</description>\n",
                escape_xml(&record.description)
            ));
            if !tool_only {
                out.push_str(&format!(
                    "    <location>{}</location>\n",
                    escape_xml(&record.def.location)
                ));
            }
            out.push_str("  </skill>\n");
        }
        out.push_str("</available_skills>\n");
    }

    if !active.is_empty() {
        out.push_str("<active_skills>\n");
        for record in active {
            out.push_str(&format!(
                "<skill name=\"{}\" digest=\"{}\">\n<![CDATA[\n{}\n]]>\n</skill>\n",
                escape_xml(record.name()),
                escape_xml(&record.digest),
                fence_cdata(record.instructions.trim())
            ));
        }
        out.push_str("</active_skills>\n");
    }

    out.push_str("</skills_system>");
    out
}

fn fence_cdata(body: &str) -> String {
    body.replace("]]>", "]]]]><![CDATA[>")
}

fn escape_xml(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
