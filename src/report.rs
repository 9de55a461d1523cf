//! Final report assembly.
//!
//! Assembly is pure string work and fully deterministic: given the same
//! introduction, body, and conclusion it always produces the same report.
//! The body arrives with a leading `## Insights` header and (usually) a
//! trailing `## Sources` block; assembly strips the header, lifts the
//! sources block out, and re-appends it after the conclusion.

use std::collections::HashSet;

use crate::state::ResearchState;

/// Concatenate the three reduction outputs into the final report.
pub(crate) fn assemble_report(state: &ResearchState) -> String {
    let content = strip_insights_header(&state.content);
    let (body, sources) = split_sources(content);
    let mut report = format!(
        "{}\n\n---\n\n{}\n\n---\n\n{}",
        state.introduction, body, state.conclusion
    );
    if let Some(sources) = sources {
        report.push_str("\n\n## Sources\n");
        report.push_str(&sources);
    }
    report
}

fn strip_insights_header(content: &str) -> &str {
    match content.strip_prefix("## Insights") {
        Some(rest) => rest.strip_prefix('\n').unwrap_or(rest),
        None => content,
    }
}

/// Split the body from its trailing `## Sources` block.
///
/// Only a body with exactly one marker is split; zero or several markers
/// means the generated content doesn't follow the contract, and the body is
/// passed through untouched rather than cut at a guessed position. The
/// newline that followed the marker stays with the body, so the assembled
/// report keeps the stripped marker's blank-line artifact.
fn split_sources(content: &str) -> (String, Option<String>) {
    if content.matches("## Sources").count() != 1 {
        return (content.to_string(), None);
    }
    match content.split_once("## Sources") {
        Some((body, after)) => match after.strip_prefix('\n') {
            Some(sources) => (format!("{body}\n"), Some(sources.to_string())),
            None => (body.to_string(), Some(after.to_string())),
        },
        None => (content.to_string(), None),
    }
}

/// Collapse duplicate entries in a section's `### Sources` list.
///
/// Two entries are duplicates when they name the same target, ignoring the
/// `[n]` numbering prefix. The first occurrence wins; everything outside the
/// sources list is left untouched.
pub(crate) fn dedupe_section_sources(section: &str) -> String {
    if !section.contains("### Sources") {
        return section.to_string();
    }

    let mut seen: HashSet<String> = HashSet::new();
    let mut in_sources = false;
    let mut out: Vec<&str> = Vec::new();

    for line in section.lines() {
        let trimmed = line.trim();
        if trimmed.starts_with("### Sources") {
            in_sources = true;
            out.push(line);
            continue;
        }
        if in_sources && trimmed.starts_with('#') {
            in_sources = false;
        }
        if in_sources && !trimmed.is_empty() {
            let target = source_target(trimmed).to_string();
            if !seen.insert(target) {
                continue;
            }
        }
        out.push(line);
    }

    let mut deduped = out.join("\n");
    if section.ends_with('\n') {
        deduped.push('\n');
    }
    deduped
}

fn source_target(entry: &str) -> &str {
    if let Some(rest) = entry.strip_prefix('[') {
        if let Some((_, target)) = rest.split_once(']') {
            return target.trim();
        }
    }
    entry
}
