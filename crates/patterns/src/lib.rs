//! Anchor patterns and replacement templates for the refit pipeline.
//!
//! Pure data: every anchor a patch step matches on, and every block of
//! tool-module text a step inserts, lives here so each matcher can be
//! exercised on its own.

use once_cell::sync::Lazy;
use regex::Regex;

/// Condensed replacement for the generated long-form header comment.
pub const CONDENSED_HEADER: &str = r#"/**
 * GSD Tools — CLI utility for GSD workflow operations
 * Usage: node gsd-tools.cjs <command> [args] [--raw] [--include field1,field2]
 *
 * Commands: state, resolve-model, find-phase, commit, verify-summary, generate-slug,
 *   current-timestamp, list-todos, verify-path-exists, config-ensure-section, config-set,
 *   config-get, history-digest, phases, roadmap, requirements, phase, milestone,
 *   validate, progress, todo, scaffold, phase-plan-index, state-snapshot, summary-extract,
 *   websearch, frontmatter, verify, template, init
 *
 * Run with --help for detailed usage of each command.
 */"#;

/// Substring that only the condensed header carries.
pub const CONDENSED_HEADER_MARKER: &str = "GSD Tools — CLI utility for GSD workflow operations";

/// One `/** … */` block directly preceding the first require line. The
/// comment body is matched without crossing a `*/`, so an intervening
/// declaration can never be swallowed.
pub static HEADER_BLOCK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"/\*\*(?:[^*]+|\*+[^*/])*\*+/\s*\n(const fs = require)")
        .expect("header block pattern")
});

/// The shared helper bundle, inserted as one contiguous block. Order is
/// fixed: flag parser, artifact discovery, include-file table, include
/// applier, phase-base builder.
pub const HELPER_BUNDLE: &str = r#"function parseIncludeFlag(args) {
  const includeIndex = args.indexOf('--include');
  if (includeIndex === -1) return new Set();
  const includeValue = args[includeIndex + 1];
  if (!includeValue) return new Set();
  return new Set(includeValue.split(',').map(s => s.trim()));
}

function discoverPhaseArtifacts(cwd, phaseDir) {
  if (!phaseDir) return {};
  const full = path.join(cwd, phaseDir);
  try {
    const files = fs.readdirSync(full);
    const find = (suffix) => {
      const f = files.find(n => n.endsWith(`-${suffix}.md`) || n === `${suffix}.md`);
      return f ? path.join(phaseDir, f) : null;
    };
    return { context: find('CONTEXT'), research: find('RESEARCH'), verification: find('VERIFICATION'), uat: find('UAT') };
  } catch { return {}; }
}

const INCLUDE_FILES = {
  state: '.planning/STATE.md',
  roadmap: '.planning/ROADMAP.md',
  config: '.planning/config.json',
  project: '.planning/PROJECT.md',
  requirements: '.planning/REQUIREMENTS.md',
};

function applyIncludes(result, includes, cwd, phaseDir) {
  if (!includes || includes.size === 0) return;
  for (const [key, rel] of Object.entries(INCLUDE_FILES)) {
    if (!includes.has(key)) continue;
    const text = safeReadFile(path.join(cwd, rel));
    if (text != null) result[`${key}_content`] = text;
  }
  if (phaseDir) {
    const artifacts = discoverPhaseArtifacts(cwd, phaseDir);
    for (const [key, filePath] of Object.entries(artifacts)) {
      if (!includes.has(key) || !filePath) continue;
      const text = safeReadFile(path.join(cwd, filePath));
      if (text != null) result[`${key}_content`] = text;
    }
  }
}

function buildPhaseBase(phaseInfo) {
  return {
    phase_found: !!phaseInfo,
    phase_dir: phaseInfo?.directory || null,
    phase_number: phaseInfo?.phase_number || null,
    phase_name: phaseInfo?.phase_name || null,
    phase_slug: phaseInfo?.phase_slug || null,
  };
}"#;

/// The bundle lands immediately above this declaration.
pub const HELPER_ANCHOR: &str = "function safeReadFile(";

/// Present once the bundle has been injected.
pub const HELPER_MARKER: &str = "function discoverPhaseArtifacts";

/// The five consecutive phase field assignments, with an optional comment
/// line above and any whitespace style between them.
pub static PHASE_INFO_BLOCK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?://[^\n]*\n\s*)?phase_found: !!phaseInfo,\s*\n\s*phase_dir: phaseInfo\?\.directory \|\| null,\s*\n\s*phase_number: phaseInfo\?\.phase_number \|\| null,\s*\n\s*phase_name: phaseInfo\?\.phase_name \|\| null,\s*\n\s*phase_slug: phaseInfo\?\.phase_slug \|\| null,",
    )
    .expect("phase info block pattern")
});

/// Shorthand that replaces the matched field block.
pub const PHASE_INFO_SPREAD: &str = "...buildPhaseBase(phaseInfo),";

/// Emission statement the include call is spliced above.
pub const OUTPUT_CALL: &str = "output(result, raw)";

/// Per-function rewrite data for the three init entry points.
#[derive(Debug)]
pub struct InitFunction {
    pub name: &'static str,
    /// `applyIncludes` call line; the phase-dir argument differs per
    /// function (result field, input parameter, or absent).
    pub include_call: &'static str,
    pub old_signature: &'static str,
    pub new_signature: &'static str,
    pub old_call: &'static str,
    pub new_call: &'static str,
}

pub static INIT_FUNCTIONS: [InitFunction; 3] = [
    InitFunction {
        name: "cmdInitExecutePhase",
        include_call: "applyIncludes(result, includes, cwd, result.phase_dir);",
        old_signature: "function cmdInitExecutePhase(cwd, phase, raw)",
        new_signature: "function cmdInitExecutePhase(cwd, phase, includes, raw)",
        old_call: "cmdInitExecutePhase(cwd, args[2], raw)",
        new_call: "cmdInitExecutePhase(cwd, args[2], includes, raw)",
    },
    InitFunction {
        name: "cmdInitPlanPhase",
        include_call: "applyIncludes(result, includes, cwd, phaseInfo?.directory);",
        old_signature: "function cmdInitPlanPhase(cwd, phase, raw)",
        new_signature: "function cmdInitPlanPhase(cwd, phase, includes, raw)",
        old_call: "cmdInitPlanPhase(cwd, args[2], raw)",
        new_call: "cmdInitPlanPhase(cwd, args[2], includes, raw)",
    },
    InitFunction {
        name: "cmdInitProgress",
        include_call: "applyIncludes(result, includes, cwd);",
        old_signature: "function cmdInitProgress(cwd, raw)",
        new_signature: "function cmdInitProgress(cwd, includes, raw)",
        old_call: "cmdInitProgress(cwd, raw)",
        new_call: "cmdInitProgress(cwd, includes, raw)",
    },
];

/// Head of the init dispatch branch; the capture is the branch indent.
pub static INIT_CASE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"case 'init': \{\n([ \t]+)const workflow = args\[1\];").expect("init case pattern")
});

/// Line the router gains so every init workflow sees the include set.
pub const PARSE_INCLUDE_CALL: &str = "const includes = parseIncludeFlag(args);";

/// Export-list anchor in the core module.
pub const EXPORTS_ANCHOR: &str = "module.exports = {";

/// Helper names the core module must export after injection.
pub const EXPORTED_HELPERS: [&str; 4] = [
    "parseIncludeFlag",
    "discoverPhaseArtifacts",
    "applyIncludes",
    "buildPhaseBase",
];

/// Core-module path as required from the dispatcher.
pub const DISPATCHER_CORE_REQUIRE: &str = "./lib/core";
/// Core-module path as required from its sibling init module.
pub const INIT_CORE_REQUIRE: &str = "./core";

/// Helpers each role file needs in its destructured require.
pub static DISPATCHER_REQUIRED_HELPERS: [&str; 1] = ["parseIncludeFlag"];
pub static INIT_REQUIRED_HELPERS: [&str; 2] = ["applyIncludes", "buildPhaseBase"];

/// Matcher for a destructured require of the given module path.
pub fn require_line(module: &str) -> Regex {
    Regex::new(&format!(
        r"const \{{([^}}]*)\}} = require\('{}'\);",
        regex::escape(module)
    ))
    .expect("require line pattern")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_block_matches_leading_comment_only() {
        let src = "/**\n * Huge generated header\n * spanning lines\n */\nconst fs = require('fs');\n";
        let m = HEADER_BLOCK.find(src).unwrap();
        assert_eq!(m.start(), 0);
        assert!(src[m.range()].ends_with("const fs = require"));
    }

    #[test]
    fn header_block_does_not_span_across_code() {
        // Two separate comments with a declaration between: the match may
        // only cover the comment adjacent to the require line.
        let src = "/** first */\nfunction keep() {}\n/** second */\nconst fs = require('fs');\n";
        let m = HEADER_BLOCK.find(src).unwrap();
        assert!(!src[m.range()].contains("function keep"));
    }

    #[test]
    fn condensed_header_is_its_own_fixed_point() {
        let src = format!("{CONDENSED_HEADER}\nconst fs = require('fs');\n");
        assert!(HEADER_BLOCK.is_match(&src));
        assert!(src.contains(CONDENSED_HEADER_MARKER));
    }

    #[test]
    fn phase_info_block_matches_with_and_without_comment() {
        let with_comment = "    // Phase info\n    phase_found: !!phaseInfo,\n    phase_dir: phaseInfo?.directory || null,\n    phase_number: phaseInfo?.phase_number || null,\n    phase_name: phaseInfo?.phase_name || null,\n    phase_slug: phaseInfo?.phase_slug || null,\n";
        let without = "  phase_found: !!phaseInfo,\n  phase_dir: phaseInfo?.directory || null,\n  phase_number: phaseInfo?.phase_number || null,\n  phase_name: phaseInfo?.phase_name || null,\n  phase_slug: phaseInfo?.phase_slug || null,\n";
        assert!(PHASE_INFO_BLOCK.is_match(with_comment));
        assert!(PHASE_INFO_BLOCK.is_match(without));
    }

    #[test]
    fn phase_info_block_requires_all_five_fields() {
        let truncated = "  phase_found: !!phaseInfo,\n  phase_dir: phaseInfo?.directory || null,\n";
        assert!(!PHASE_INFO_BLOCK.is_match(truncated));
    }

    #[test]
    fn init_case_captures_branch_indent() {
        let src = "switch (command) {\n    case 'init': {\n      const workflow = args[1];\n";
        let caps = INIT_CASE.captures(src).unwrap();
        assert_eq!(&caps[1], "      ");
    }

    #[test]
    fn require_line_captures_destructured_names() {
        let src = "const { cmdInitProgress, findPhase } = require('./lib/core');\n";
        let caps = require_line(DISPATCHER_CORE_REQUIRE).captures(src).unwrap();
        assert_eq!(caps[1].trim(), "cmdInitProgress, findPhase");
    }

    #[test]
    fn phase_base_builder_covers_the_replaced_fields() {
        // The shorthand call must yield the same five fields the expanded
        // block assigned.
        for key in [
            "phase_found",
            "phase_dir",
            "phase_number",
            "phase_name",
            "phase_slug",
        ] {
            assert!(HELPER_BUNDLE.contains(&format!("{key}:")), "missing {key}");
        }
    }

    #[test]
    fn helper_bundle_keeps_the_fixed_internal_order() {
        let positions = [
            "function parseIncludeFlag",
            "function discoverPhaseArtifacts",
            "const INCLUDE_FILES",
            "function applyIncludes",
            "function buildPhaseBase",
        ]
        .map(|needle| HELPER_BUNDLE.find(needle).unwrap());
        assert!(positions.windows(2).all(|w| w[0] < w[1]));
    }
}
