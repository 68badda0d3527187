use std::env;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use serde::Serialize;

#[derive(Debug, Default, Deserialize, Serialize, Clone)]
pub struct ConfigFile {
    pub url: Option<String>,
    pub placeholder: Option<String>,
    pub os: Option<String>,
    pub max_depth: Option<usize>,
    pub file: Option<String>,
    #[serde(alias = "fc")]
    pub filter_status: Option<String>,
    #[serde(alias = "fs")]
    pub filter_size: Option<String>,
    pub concurrency: Option<usize>,
    pub workers: Option<usize>,
    pub timeout: Option<usize>,
    pub follow_redirects: Option<bool>,
    pub output: Option<String>,
    pub output_format: Option<String>,
    pub hide_content: Option<bool>,
    pub no_color: Option<bool>,
}

fn home_dir() -> Option<PathBuf> {
    env::var_os("HOME")
        .map(PathBuf::from)
        .or_else(|| env::var_os("USERPROFILE").map(PathBuf::from))
        .or_else(|| {
            let drive = env::var_os("HOMEDRIVE")?;
            let path = env::var_os("HOMEPATH")?;
            Some(PathBuf::from(drive).join(path))
        })
}

pub fn default_config_path() -> Option<PathBuf> {
    Some(home_dir()?.join(".traversal-probe").join("config.yml"))
}

pub fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/").or_else(|| path.strip_prefix("~\\")) {
        if let Some(home) = home_dir() {
            return home.join(stripped);
        }
    }
    PathBuf::from(path)
}

pub fn expand_tilde_string(path: &str) -> String {
    expand_tilde(path).to_string_lossy().to_string()
}

pub fn load_config(path: &Path, allow_missing: bool) -> Result<ConfigFile, String> {
    match std::fs::read_to_string(path) {
        Ok(contents) => serde_yaml::from_str::<ConfigFile>(&contents)
            .map_err(|e| format!("failed to parse config '{}': {e}", path.display())),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound && allow_missing => {
            Ok(ConfigFile::default())
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(format!("config file not found '{}'", path.display()))
        }
        Err(e) => Err(format!("failed to read config '{}': {e}", path.display())),
    }
}

fn default_config_yaml() -> String {
    r#"# traversal-probe config
#
# Location (default):
#   ~/.traversal-probe/config.yml

# Target (the placeholder is replaced by every payload)
# url: https://example.com/img.php?file=FUZZ
placeholder: FUZZ

# Traversal
# linux, windows, or anything else for both lists
os: linux
max_depth: 5
# A custom file replaces the OS default list
# file: /etc/passwd

# Filters ('*' any digits, '?' optional digit)
filter_status: "200"
# Only the first entry is used, as a minimum body size in bytes
filter_size: ""

# Performance (0 = every payload in flight at once)
concurrency: 0
workers: 4

# HTTP (timeout 0 = client default)
timeout: 0
follow_redirects: true

# Output (optional)
# output: ./hits.json
# output_format: json
hide_content: false
no_color: false
"#
    .to_string()
}

pub fn ensure_default_config_file(path: &Path) -> Result<bool, String> {
    if path.exists() {
        return Ok(false);
    }
    let parent = path
        .parent()
        .ok_or_else(|| format!("invalid config path '{}'", path.display()))?;
    std::fs::create_dir_all(parent).map_err(|e| {
        format!(
            "failed to create config directory '{}': {e}",
            parent.display()
        )
    })?;
    std::fs::write(path, default_config_yaml())
        .map_err(|e| format!("failed to write config file '{}': {e}", path.display()))?;
    Ok(true)
}
