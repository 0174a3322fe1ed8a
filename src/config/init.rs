use anyhow::{bail, Context, Result};
use atomic_write_file::AtomicWriteFile;
use std::io::Write;
use std::path::Path;

use crate::config::Config;

const HEADER: &str = "\
# loan-score configuration
#
# inputs.dir holds customers.csv, loans.csv, repayments.csv,
# defaulters_delinq.csv, defaulters_detail.csv and excluded_members.csv.
# Any rules section may be removed to fall back to the built-in defaults.
";

/// Write the starter configuration to `path`.
///
/// Refuses to replace an existing file unless `force` is set. Parent
/// directories are created as needed.
pub fn write_default_config(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        bail!(
            "Config already exists at {}. Use --force to overwrite.",
            path.display()
        );
    }

    let yaml = serde_saphyr::to_string(&Config::starter())
        .map_err(|e| anyhow::anyhow!("Failed to serialize config: {}", e))?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory {}", parent.display()))?;
    }

    let mut file = AtomicWriteFile::open(path)
        .with_context(|| format!("Failed to open atomic write file at {}", path.display()))?;
    file.write_all(HEADER.as_bytes())
        .and_then(|_| file.write_all(yaml.as_bytes()))
        .with_context(|| format!("Failed to write config to {}", path.display()))?;
    file.commit()
        .with_context(|| format!("Failed to save config to {}", path.display()))?;

    Ok(())
}
