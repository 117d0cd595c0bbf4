mod config;

pub use config::RefitConfig;

use anyhow::{anyhow, Context, Result};
use camino::{Utf8Path, Utf8PathBuf};
use fs_err as fs;
use thiserror::Error;
use toolsmith_engine::{apply_step, PatchStep, StepOutcome};
use toolsmith_patterns as patterns;
use tracing::{debug, warn};
use walkdir::WalkDir;

/// The single fatal precondition: nothing is mutated when the target is
/// absent.
#[derive(Debug, Error)]
#[error("target path {0} does not exist")]
pub struct MissingTarget(pub Utf8PathBuf);

/// In-flight text buffer for one tool module. Only the orchestrator
/// loads and writes; patch steps mutate `content` through `apply`.
pub struct TargetFile {
    pub path: Utf8PathBuf,
    pub content: String,
    pub modified: bool,
}

impl TargetFile {
    fn load(path: &Utf8Path) -> Result<Self> {
        let content =
            fs::read_to_string(path).with_context(|| format!("reading target {path}"))?;
        Ok(Self {
            path: path.to_path_buf(),
            content,
            modified: false,
        })
    }

    fn normalize(&mut self) {
        let next = toolsmith_textnorm::normalize(&self.content);
        if next != self.content {
            self.content = next;
            self.modified = true;
        }
    }

    fn apply(&mut self, step: &PatchStep) -> StepOutcome {
        let buffer = std::mem::take(&mut self.content);
        let (next, outcome) = apply_step(step, buffer);
        self.content = next;
        if outcome == StepOutcome::Applied {
            self.modified = true;
        }
        outcome
    }

    fn write_back(&self) -> Result<()> {
        fs::write(&self.path, &self.content)
            .with_context(|| format!("writing target {}", self.path))
    }

    fn line_count(&self) -> usize {
        self.content.split('\n').count()
    }
}

#[derive(Debug, Default)]
pub struct RunSummary {
    pub files_processed: usize,
    pub files_written: usize,
    pub steps_applied: usize,
    pub steps_skipped: usize,
    pub anchors_missed: usize,
}

/// Refits one tool file, or a modular tree when `target` is a directory.
pub fn run(target: &Utf8Path, cfg: &RefitConfig) -> Result<RunSummary> {
    if !target.exists() {
        return Err(MissingTarget(target.to_path_buf()).into());
    }
    let mut summary = RunSummary::default();
    if target.is_dir() {
        refit_tree(target, cfg, &mut summary)?;
    } else {
        refit_single(target, &mut summary)?;
    }
    Ok(summary)
}

fn refit_single(path: &Utf8Path, summary: &mut RunSummary) -> Result<()> {
    println!("refit {path}");
    let mut file = TargetFile::load(path)?;
    file.normalize();
    run_steps(&mut file, &single_file_steps(), summary);
    summary.files_processed += 1;
    finish_file(&file, summary)
}

fn refit_tree(root: &Utf8Path, cfg: &RefitConfig, summary: &mut RunSummary) -> Result<()> {
    let tracked = discover(root, &cfg.extension)?;
    if tracked.is_empty() {
        println!("no .{} modules under {root}", cfg.extension);
        return Ok(());
    }
    debug!("tracked {} modules under {root}", tracked.len());

    for path in &tracked {
        let mut file = TargetFile::load(path)?;
        file.normalize();
        summary.files_processed += 1;
        if file.modified {
            file.write_back()?;
            summary.files_written += 1;
            println!("  ✅ normalize {path}");
        } else {
            println!("  ⏭️  normalize {path} already canonical");
        }
    }

    // Core before init before dispatcher: helper definitions and
    // signatures land before the references the later files gain.
    let lib = root.join(&cfg.lib_dir);
    apply_role(&lib.join(&cfg.core_module), core_module_steps(), summary)?;
    apply_role(&lib.join(&cfg.init_module), init_module_steps(), summary)?;
    apply_role(&root.join(&cfg.dispatcher), dispatcher_steps(), summary)?;
    Ok(())
}

fn apply_role(path: &Utf8Path, steps: Vec<PatchStep>, summary: &mut RunSummary) -> Result<()> {
    if !path.exists() {
        println!("  ⚠️ {path} not found, skipping its steps");
        warn!("role module {path} missing");
        summary.anchors_missed += 1;
        return Ok(());
    }
    println!("refit {path}");
    let mut file = TargetFile::load(path)?;
    run_steps(&mut file, &steps, summary);
    finish_file(&file, summary)
}

fn run_steps(file: &mut TargetFile, steps: &[PatchStep], summary: &mut RunSummary) {
    for step in steps {
        match file.apply(step) {
            StepOutcome::Applied => {
                println!("  ✅ {}", step.name);
                summary.steps_applied += 1;
            }
            StepOutcome::SkippedAlreadyPresent => {
                println!("  ⏭️  {} already applied, skipping", step.name);
                summary.steps_skipped += 1;
            }
            StepOutcome::SkippedAnchorNotFound => {
                println!("  ⚠️ {}: anchor not found", step.name);
                warn!("step {} found no anchor in {}", step.name, file.path);
                summary.anchors_missed += 1;
            }
        }
    }
}

fn finish_file(file: &TargetFile, summary: &mut RunSummary) -> Result<()> {
    if file.modified {
        file.write_back()?;
        summary.files_written += 1;
        println!(
            "  📊 {}: {} lines, {:.1} KB",
            file.path,
            file.line_count(),
            file.content.len() as f64 / 1024.0
        );
    }
    Ok(())
}

fn discover(root: &Utf8Path, extension: &str) -> Result<Vec<Utf8PathBuf>> {
    let mut found = Vec::new();
    for entry in WalkDir::new(root).into_iter().filter_entry(|e| !is_ignored(e)) {
        let entry = entry.with_context(|| format!("walking {root}"))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let path = Utf8PathBuf::from_path_buf(entry.into_path())
            .map_err(|p| anyhow!("non-UTF-8 path {}", p.display()))?;
        if path.extension() == Some(extension) {
            found.push(path);
        }
    }
    found.sort();
    Ok(found)
}

fn is_ignored(entry: &walkdir::DirEntry) -> bool {
    entry.file_type().is_dir()
        && matches!(entry.file_name().to_str(), Some(".git") | Some("node_modules"))
}

/// Full fixed sequence for one self-contained tool file.
pub fn single_file_steps() -> Vec<PatchStep> {
    let mut steps = vec![
        PatchStep::condense_header(),
        PatchStep::inject_helpers(),
        PatchStep::collapse_phase_info(),
    ];
    for f in &patterns::INIT_FUNCTIONS {
        steps.push(PatchStep::inject_include_call(f));
    }
    for f in &patterns::INIT_FUNCTIONS {
        steps.push(PatchStep::thread_includes(f));
    }
    steps.push(PatchStep::parse_include_line());
    steps
}

/// Header and router wiring for the root dispatcher module.
pub fn dispatcher_steps() -> Vec<PatchStep> {
    let mut steps = vec![
        PatchStep::condense_header(),
        PatchStep::augment_requires(
            patterns::DISPATCHER_CORE_REQUIRE,
            &patterns::DISPATCHER_REQUIRED_HELPERS,
        ),
        PatchStep::parse_include_line(),
    ];
    for f in &patterns::INIT_FUNCTIONS {
        steps.push(PatchStep::rewire_init_call(f));
    }
    steps
}

/// Helper bundle and export wiring for the shared core module.
pub fn core_module_steps() -> Vec<PatchStep> {
    vec![PatchStep::inject_helpers(), PatchStep::augment_exports()]
}

/// Call-site and signature wiring for the init module.
pub fn init_module_steps() -> Vec<PatchStep> {
    let mut steps = vec![PatchStep::collapse_phase_info()];
    for f in &patterns::INIT_FUNCTIONS {
        steps.push(PatchStep::inject_include_call(f));
    }
    for f in &patterns::INIT_FUNCTIONS {
        steps.push(PatchStep::thread_includes(f));
    }
    steps.push(PatchStep::augment_requires(
        patterns::INIT_CORE_REQUIRE,
        &patterns::INIT_REQUIRED_HELPERS,
    ));
    steps
}
