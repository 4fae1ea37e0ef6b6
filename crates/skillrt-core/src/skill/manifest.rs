//! SKILL.md manifest parsing and validation.
//!
//! A manifest is YAML frontmatter fenced by `---` lines, followed by the
//! markdown instruction body that is injected once the skill is loaded.

use std::collections::BTreeMap;

use anyhow::{bail, Context};
use skillrt_types::skill::SkillManifest;

/// A SKILL.md split into its typed manifest, raw properties, and body.
#[derive(Debug, Clone)]
pub struct ParsedSkill {
    pub manifest: SkillManifest,
    /// Every frontmatter key, converted to JSON.
    pub properties: BTreeMap<String, serde_json::Value>,
    pub body: String,
}

/// Split SKILL.md content into `(frontmatter, body)`.
///
/// The first line must be `---`. The frontmatter ends at the next line that
/// is exactly `---`; everything after it, minus leading blank lines, is the
/// body. CRLF line endings are accepted.
pub fn extract_frontmatter(content: &str) -> anyhow::Result<(&str, &str)> {
    let content = content.strip_prefix('\u{feff}').unwrap_or(content);

    let mut lines = content.split_inclusive('\n');
    let first = lines.next().unwrap_or("");
    if first.trim_end() != "---" {
        bail!("SKILL.md must start with YAML frontmatter delimiter '---'");
    }

    let yaml_start = first.len();
    let mut offset = yaml_start;
    for line in lines {
        if line.trim_end() == "---" {
            let yaml = &content[yaml_start..offset];
            let body = &content[offset + line.len()..];
            return Ok((yaml, body.trim_start_matches(['\n', '\r'])));
        }
        offset += line.len();
    }

    bail!("SKILL.md missing closing frontmatter delimiter '---'")
}

/// Parse SKILL.md content into a [`ParsedSkill`].
///
/// The frontmatter is decoded twice: once into the typed manifest, once into
/// a free-form map so unknown keys survive as properties.
pub fn parse_skill_md(content: &str) -> anyhow::Result<ParsedSkill> {
    let (yaml_str, body) = extract_frontmatter(content)?;

    let raw: serde_yaml_ng::Value =
        serde_yaml_ng::from_str(yaml_str).context("Failed to parse SKILL.md YAML frontmatter")?;
    if !raw.is_mapping() {
        bail!("SKILL.md frontmatter must be a YAML mapping");
    }

    let manifest: SkillManifest = serde_yaml_ng::from_value(raw.clone())
        .context("SKILL.md frontmatter is missing required fields")?;

    let properties = match serde_json::to_value(&raw)
        .context("SKILL.md frontmatter contains non-string keys")?
    {
        serde_json::Value::Object(map) => map.into_iter().collect(),
        _ => BTreeMap::new(),
    };

    Ok(ParsedSkill {
        manifest,
        properties,
        body: body.to_owned(),
    })
}

/// Validate a parsed [`SkillManifest`].
///
/// Checks:
/// - `name` is a non-empty slug (lowercase alphanumerics and hyphens, no
///   leading or trailing hyphen)
/// - `description` is non-blank
/// - `version`, when present, is valid semver
pub fn validate_manifest(manifest: &SkillManifest) -> anyhow::Result<()> {
    if manifest.name.is_empty() {
        bail!("Skill name must not be empty");
    }

    let is_valid_slug = manifest
        .name
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-');
    if !is_valid_slug {
        bail!(
            "Skill name '{}' must contain only lowercase letters, digits, and hyphens",
            manifest.name
        );
    }

    if manifest.name.starts_with('-') || manifest.name.ends_with('-') {
        bail!(
            "Skill name '{}' must not start or end with a hyphen",
            manifest.name
        );
    }

    if manifest.description.trim().is_empty() {
        bail!("Skill description must not be empty");
    }

    if let Some(ref version) = manifest.version {
        version
            .parse::<semver::Version>()
            .with_context(|| format!("Invalid semver version '{version}'"))?;
    }

    Ok(())
}

/// Parse and validate in one step, warning when the declared name differs
/// from the directory the manifest was found in.
pub fn load_skill_md(content: &str, dir_name: Option<&str>) -> anyhow::Result<ParsedSkill> {
    let parsed = parse_skill_md(content)?;
    validate_manifest(&parsed.manifest)?;

    if let Some(dir) = dir_name {
        if dir != parsed.manifest.name {
            tracing::warn!(
                skill = %parsed.manifest.name,
                directory = %dir,
                "Skill name does not match its directory name"
            );
        }
    }

    Ok(parsed)
}
