use std::env;

use anyhow::{Context, Result};
use camino::Utf8PathBuf;
use toolsmith_install::install_tree;
use tracing_subscriber::{fmt, EnvFilter};

fn main() -> Result<()> {
    init_tracing();
    let source = resolve_source()?;
    let cwd = Utf8PathBuf::from_path_buf(env::current_dir().context("resolving cwd")?)
        .map_err(|p| anyhow::anyhow!("non-UTF-8 working directory {}", p.display()))?;
    let dest = cwd.join(".agent");

    println!("🌌 Installing GSD agent tree...");
    println!("📦 Copying {source} into {dest}...");
    let report = install_tree(&source, &dest)?;
    println!(
        "✅ installed {} file(s) across {} dir(s)",
        report.files_copied, report.dirs_created
    );
    println!("\nNext: run `gsd-toolsmith .agent` to refit the shipped tool modules.");
    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt().with_env_filter(filter).try_init();
}

// The packaged layout ships `.agent` next to the binary directory; an
// explicit override wins so installs can run from a checkout.
fn resolve_source() -> Result<Utf8PathBuf> {
    if let Ok(dir) = env::var("GSD_TOOLSMITH_AGENT_DIR") {
        return Ok(Utf8PathBuf::from(dir));
    }
    let exe = env::current_exe().context("resolving executable path")?;
    let exe = Utf8PathBuf::from_path_buf(exe)
        .map_err(|p| anyhow::anyhow!("non-UTF-8 executable path {}", p.display()))?;
    let bin_dir = exe
        .parent()
        .context("executable has no parent directory")?;
    Ok(bin_dir.join("..").join(".agent"))
}
