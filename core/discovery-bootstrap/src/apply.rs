//! Applying a decrypted config payload to the device.

use crate::error::{BootstrapError, BootstrapResult};
use discovery_types::ConfigPayload;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::info;

pub const HOSTNAME_FILE: &str = "hostname";
pub const AUTHORIZED_KEYS_FILE: &str = "authorized_keys";
pub const CREDENTIAL_FILE: &str = "enrollment_credential";
pub const CONFIG_FILE: &str = "discovery_config.json";

pub const BLOCK_START: &str = "---BOOTSTRAP_CONFIG_START---";
pub const BLOCK_END: &str = "---BOOTSTRAP_CONFIG_END---";

/// Installs the delivered identity and secrets locally.
pub trait ConfigApplier: Send + Sync {
    fn apply(&self, payload: &ConfigPayload) -> BootstrapResult<AppliedConfig>;
}

/// What was written, for the machine-readable summary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppliedConfig {
    pub hostname: String,
    pub ssh_keys_count: usize,
    pub config_file: PathBuf,
    pub enrollment_credential: String,
}

impl AppliedConfig {
    /// `KEY=value` block printed on stdout for the surrounding boot scripts.
    pub fn render_block(&self) -> String {
        format!(
            "{BLOCK_START}\nHOSTNAME={}\nENROLLMENT_CREDENTIAL={}\n\
             SSH_KEYS_COUNT={}\nCONFIG_FILE={}\n{BLOCK_END}\n",
            self.hostname,
            self.enrollment_credential,
            self.ssh_keys_count,
            self.config_file.display(),
        )
    }
}

/// Writes the payload as plain files under one directory; the OS layer picks
/// them up from there.
#[derive(Debug, Clone)]
pub struct FileApplier {
    output_dir: PathBuf,
}

impl FileApplier {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }
}

impl ConfigApplier for FileApplier {
    fn apply(&self, payload: &ConfigPayload) -> BootstrapResult<AppliedConfig> {
        fs::create_dir_all(&self.output_dir).map_err(|source| BootstrapError::Apply {
            path: self.output_dir.clone(),
            source,
        })?;

        let hostname = payload.hostname.as_str();
        write_file(&self.output_dir.join(HOSTNAME_FILE), &format!("{hostname}\n"), false)?;

        let mut keys = payload.ssh_keys.join("\n");
        if !keys.is_empty() {
            keys.push('\n');
        }
        write_file(&self.output_dir.join(AUTHORIZED_KEYS_FILE), &keys, true)?;
        write_file(
            &self.output_dir.join(CREDENTIAL_FILE),
            &format!("{}\n", payload.enrollment_credential),
            true,
        )?;

        let config_file = self.output_dir.join(CONFIG_FILE);
        let json = serde_json::to_string_pretty(payload)
            .map_err(|e| BootstrapError::InvalidResponse(e.to_string()))?;
        write_file(&config_file, &json, true)?;

        info!(
            hostname,
            ssh_keys = payload.ssh_keys.len(),
            dir = %self.output_dir.display(),
            "config applied"
        );
        Ok(AppliedConfig {
            hostname: hostname.to_string(),
            ssh_keys_count: payload.ssh_keys.len(),
            config_file,
            enrollment_credential: payload.enrollment_credential.clone(),
        })
    }
}

fn write_file(path: &Path, contents: &str, private: bool) -> BootstrapResult<()> {
    let to_apply_err = |source| BootstrapError::Apply {
        path: path.to_path_buf(),
        source,
    };
    let mut options = fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(if private { 0o600 } else { 0o644 });
    }
    let mut file = options.open(path).map_err(to_apply_err)?;
    file.write_all(contents.as_bytes()).map_err(to_apply_err)?;

    // `mode` only applies on creation; tighten files left by an earlier run.
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        if private {
            fs::set_permissions(path, fs::Permissions::from_mode(0o600)).map_err(to_apply_err)?;
        }
    }
    #[cfg(not(unix))]
    let _ = private;
    Ok(())
}
