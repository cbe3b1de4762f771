//! Output root preparation: the run-scoped directory every certificate and
//! the sighting log live under.

use std::io;
use std::path::{Path, PathBuf};

use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

use crate::config::Config;
use crate::error::HarvestError;

/// The prepared, run-scoped output directory: `<output_root>/<run-id>/`,
/// where `run-id` is an RFC3339-UTC timestamp with `:` replaced by `_` (a
/// raw colon is awkward in a path component on several filesystems).
pub struct OutputRoot {
    path: PathBuf,
}

impl OutputRoot {
    /// Creates the run-scoped subdirectory under `config.output_root` with
    /// mode 0755, before any stream is allowed to run.
    pub fn prepare(config: &Config) -> Result<Self, HarvestError> {
        let run_id = OffsetDateTime::now_utc()
            .format(&Rfc3339)
            .unwrap_or_else(|_| "unknown-run".to_string())
            .replace(':', "_");

        let path = config.output_root.join(run_id);
        create(&path).map_err(|source| HarvestError::OutputRoot { path: path.clone(), source })?;

        Ok(OutputRoot { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn create(path: &Path) -> io::Result<()> {
    std::fs::create_dir_all(path)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755))?;
    }

    Ok(())
}
