use anyhow::Result;
use camino::Utf8PathBuf;
use clap::Parser;
use toolsmith_core::{run, RefitConfig};
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser, Debug)]
#[command(
    name = "gsd-toolsmith",
    version,
    about = "Refits generated GSD tool modules to house conventions"
)]
struct Cli {
    /// Tool file (single-file mode) or module tree root (directory mode)
    target: Utf8PathBuf,
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let cfg = RefitConfig::load(&cli.target)?;
    let summary = run(&cli.target, &cfg)?;
    println!(
        "\n✅ refit complete: {} file(s) processed, {} written, {} step(s) applied, {} skipped, {} warning(s)",
        summary.files_processed,
        summary.files_written,
        summary.steps_applied,
        summary.steps_skipped,
        summary.anchors_missed
    );
    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt().with_env_filter(filter).try_init();
}
