use toolsmith_patterns as patterns;
use toolsmith_patterns::InitFunction;

/// Result of running one patch step against a text buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    Applied,
    SkippedAlreadyPresent,
    SkippedAnchorNotFound,
}

/// One named rewrite. The kind carries everything the transform needs;
/// steps never touch storage, they only map text to text.
#[derive(Debug)]
pub struct PatchStep {
    pub name: String,
    kind: StepKind,
}

#[derive(Debug)]
enum StepKind {
    CondenseHeader,
    InjectHelpers,
    CollapsePhaseInfo,
    InjectIncludeCall(&'static InitFunction),
    ThreadIncludesParam(&'static InitFunction),
    RewireInitCall(&'static InitFunction),
    ParseIncludeLine,
    AugmentExports,
    AugmentRequires {
        module: &'static str,
        names: &'static [&'static str],
    },
}

impl PatchStep {
    pub fn condense_header() -> Self {
        Self {
            name: "condense-header".into(),
            kind: StepKind::CondenseHeader,
        }
    }

    pub fn inject_helpers() -> Self {
        Self {
            name: "inject-helpers".into(),
            kind: StepKind::InjectHelpers,
        }
    }

    pub fn collapse_phase_info() -> Self {
        Self {
            name: "collapse-phase-info".into(),
            kind: StepKind::CollapsePhaseInfo,
        }
    }

    pub fn inject_include_call(function: &'static InitFunction) -> Self {
        Self {
            name: format!("inject-include-call:{}", function.name),
            kind: StepKind::InjectIncludeCall(function),
        }
    }

    pub fn thread_includes(function: &'static InitFunction) -> Self {
        Self {
            name: format!("thread-includes:{}", function.name),
            kind: StepKind::ThreadIncludesParam(function),
        }
    }

    pub fn rewire_init_call(function: &'static InitFunction) -> Self {
        Self {
            name: format!("rewire-init-call:{}", function.name),
            kind: StepKind::RewireInitCall(function),
        }
    }

    pub fn parse_include_line() -> Self {
        Self {
            name: "router-parse-include".into(),
            kind: StepKind::ParseIncludeLine,
        }
    }

    pub fn augment_exports() -> Self {
        Self {
            name: "augment-exports".into(),
            kind: StepKind::AugmentExports,
        }
    }

    pub fn augment_requires(
        module: &'static str,
        names: &'static [&'static str],
    ) -> Self {
        Self {
            name: format!("augment-requires:{module}"),
            kind: StepKind::AugmentRequires { module, names },
        }
    }

    /// True when the step's effect is already present in `content`.
    pub fn is_applied(&self, content: &str) -> bool {
        match &self.kind {
            StepKind::CondenseHeader => content.contains(patterns::CONDENSED_HEADER_MARKER),
            StepKind::InjectHelpers => content.contains(patterns::HELPER_MARKER),
            StepKind::CollapsePhaseInfo => {
                content.contains(patterns::PHASE_INFO_SPREAD)
                    && !patterns::PHASE_INFO_BLOCK.is_match(content)
            }
            StepKind::InjectIncludeCall(f) => include_call_span(content, f.name)
                .map(|(start, end)| content[start..end].contains("applyIncludes"))
                .unwrap_or(false),
            StepKind::ThreadIncludesParam(f) => content.contains(f.new_signature),
            StepKind::RewireInitCall(f) => content.contains(f.new_call),
            // The probe is the whole assignment: the helper bundle's own
            // `function parseIncludeFlag(args)` declaration must not count.
            StepKind::ParseIncludeLine => content.contains(patterns::PARSE_INCLUDE_CALL),
            StepKind::AugmentExports => exports_block(content)
                .map(|block| block.contains("applyIncludes"))
                .unwrap_or(false),
            StepKind::AugmentRequires { module, names } => {
                match patterns::require_line(module).captures(content) {
                    Some(caps) => {
                        let list = caps[1].to_string();
                        names.iter().all(|n| require_list_contains(&list, n))
                    }
                    None => false,
                }
            }
        }
    }

    /// Performs the transform, or None when the anchor is absent.
    fn rewrite(&self, content: &str) -> Option<String> {
        match &self.kind {
            StepKind::CondenseHeader => {
                let caps = patterns::HEADER_BLOCK.captures(content)?;
                let whole = caps.get(0).expect("regex match has a whole capture");
                let mut next = String::with_capacity(content.len());
                next.push_str(&content[..whole.start()]);
                next.push_str(patterns::CONDENSED_HEADER);
                next.push('\n');
                next.push_str(&caps[1]);
                next.push_str(&content[whole.end()..]);
                Some(next)
            }
            StepKind::InjectHelpers => {
                let at = content.find(patterns::HELPER_ANCHOR)?;
                let mut next = String::with_capacity(content.len() + patterns::HELPER_BUNDLE.len());
                next.push_str(&content[..at]);
                next.push_str(patterns::HELPER_BUNDLE);
                next.push_str("\n\n");
                next.push_str(&content[at..]);
                Some(next)
            }
            StepKind::CollapsePhaseInfo => {
                if !patterns::PHASE_INFO_BLOCK.is_match(content) {
                    return None;
                }
                Some(
                    patterns::PHASE_INFO_BLOCK
                        .replace_all(content, patterns::PHASE_INFO_SPREAD)
                        .into_owned(),
                )
            }
            StepKind::InjectIncludeCall(f) => {
                let (_, output_at) = include_call_span(content, f.name)?;
                let line_start = content[..output_at].rfind('\n').map_or(0, |i| i + 1);
                let indent: String = content[line_start..]
                    .chars()
                    .take_while(|c| *c == ' ' || *c == '\t')
                    .collect();
                let mut next = String::with_capacity(content.len() + f.include_call.len() + 8);
                next.push_str(&content[..line_start]);
                next.push_str(&indent);
                next.push_str(f.include_call);
                next.push('\n');
                next.push_str(&content[line_start..]);
                Some(next)
            }
            StepKind::ThreadIncludesParam(f) => {
                if !content.contains(f.old_signature) {
                    return None;
                }
                // Signature first, so the declaration line can no longer be
                // re-matched as a call site.
                let next = content.replacen(f.old_signature, f.new_signature, 1);
                Some(next.replace(f.old_call, f.new_call))
            }
            StepKind::RewireInitCall(f) => {
                if !content.contains(f.old_call) {
                    return None;
                }
                Some(content.replace(f.old_call, f.new_call))
            }
            StepKind::ParseIncludeLine => {
                let caps = patterns::INIT_CASE.captures(content)?;
                let whole = caps.get(0).expect("regex match has a whole capture");
                let indent = &caps[1];
                let mut next = String::with_capacity(content.len() + 64);
                next.push_str(&content[..whole.end()]);
                next.push('\n');
                next.push_str(indent);
                next.push_str(patterns::PARSE_INCLUDE_CALL);
                next.push_str(&content[whole.end()..]);
                Some(next)
            }
            StepKind::AugmentExports => {
                let at = content.find(patterns::EXPORTS_ANCHOR)?;
                let line_end = at + content[at..].find('\n')?;
                let block = exports_block(content)?;
                let mut additions = String::new();
                for name in patterns::EXPORTED_HELPERS {
                    if !require_list_contains(block, name) {
                        additions.push_str("  ");
                        additions.push_str(name);
                        additions.push_str(",\n");
                    }
                }
                let mut next = String::with_capacity(content.len() + additions.len());
                next.push_str(&content[..=line_end]);
                next.push_str(&additions);
                next.push_str(&content[line_end + 1..]);
                Some(next)
            }
            StepKind::AugmentRequires { module, names } => {
                let re = patterns::require_line(module);
                let caps = re.captures(content)?;
                let whole = caps.get(0).expect("regex match has a whole capture");
                let mut entries: Vec<String> = caps[1]
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect();
                for name in names.iter() {
                    if !entries.iter().any(|e| e == name) {
                        entries.push((*name).to_string());
                    }
                }
                let line = format!(
                    "const {{ {} }} = require('{module}');",
                    entries.join(", ")
                );
                let mut next = String::with_capacity(content.len() + line.len());
                next.push_str(&content[..whole.start()]);
                next.push_str(&line);
                next.push_str(&content[whole.end()..]);
                Some(next)
            }
        }
    }
}

/// Applies one step: idempotency check, then anchor lookup, then the
/// transform. An absent anchor leaves the buffer bitwise unchanged.
pub fn apply_step(step: &PatchStep, content: String) -> (String, StepOutcome) {
    if step.is_applied(&content) {
        return (content, StepOutcome::SkippedAlreadyPresent);
    }
    match step.rewrite(&content) {
        Some(next) => (next, StepOutcome::Applied),
        None => (content, StepOutcome::SkippedAnchorNotFound),
    }
}

/// Start of a function's declaration and the offset of its first
/// output-emission statement.
fn include_call_span(content: &str, function: &str) -> Option<(usize, usize)> {
    let decl = format!("function {function}(");
    let start = content.find(&decl)?;
    let output = content[start..].find(patterns::OUTPUT_CALL)? + start;
    Some((start, output))
}

/// Text between the export-list anchor and its closing brace.
fn exports_block(content: &str) -> Option<&str> {
    let at = content.find(patterns::EXPORTS_ANCHOR)?;
    let body = &content[at..];
    let end = body.find("};")?;
    Some(&body[..end])
}

fn require_list_contains(list: &str, name: &str) -> bool {
    list.split([',', '\n'])
        .any(|entry| entry.trim().trim_end_matches(',') == name)
}
