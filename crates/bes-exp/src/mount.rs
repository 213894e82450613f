use std::path::{Component, Path, PathBuf};

use bes_core::errors::{ErrorInfo, SweepError};

/// Translates host paths into the paths the engine sees.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathMapping {
    /// The engine runs on the host; paths are used verbatim.
    Native,
    /// The engine runs in a container with `host_root` mounted at `container_root`.
    Container {
        /// Host directory bound into the container.
        host_root: PathBuf,
        /// Mount point inside the container.
        container_root: String,
    },
}

impl PathMapping {
    /// Maps a host path into the engine's filesystem view.
    pub fn map(&self, host_path: &Path) -> Result<String, SweepError> {
        match self {
            PathMapping::Native => Ok(host_path.display().to_string()),
            PathMapping::Container {
                host_root,
                container_root,
            } => to_container_path(host_root, container_root, host_path),
        }
    }
}

/// Rewrites `host_path` relative to `host_root` under `container_root`.
///
/// Paths outside the mounted root, or escaping it through `..`, cannot be
/// seen by the container and are rejected.
pub fn to_container_path(
    host_root: &Path,
    container_root: &str,
    host_path: &Path,
) -> Result<String, SweepError> {
    let relative = host_path.strip_prefix(host_root).map_err(|_| {
        SweepError::Config(
            ErrorInfo::new("mount-outside-root", "path is not below the mounted root")
                .with_context("path", host_path.display().to_string())
                .with_context("root", host_root.display().to_string()),
        )
    })?;
    let mut mapped = container_root.trim_end_matches('/').to_string();
    for component in relative.components() {
        match component {
            Component::Normal(part) => {
                mapped.push('/');
                mapped.push_str(&part.to_string_lossy());
            }
            Component::CurDir => {}
            _ => {
                return Err(SweepError::Config(
                    ErrorInfo::new("mount-escape", "path escapes the mounted root")
                        .with_context("path", host_path.display().to_string()),
                ))
            }
        }
    }
    if mapped.is_empty() {
        mapped.push('/');
    }
    Ok(mapped)
}

/// Formats a host directory as a container runtime bind-mount source.
///
/// Windows drive paths use the Docker Desktop convention
/// (`C:\Users\me` becomes `/c/Users/me`); other paths pass through.
/// Verbatim prefixes from `canonicalize` (`\\?\`, `\\?\UNC\`) are dropped first.
pub fn docker_mount_source(host_root: &str) -> String {
    let host_root = match host_root.strip_prefix(r"\\?\UNC\") {
        Some(share) => return format!(r"\\{share}"),
        None => host_root.strip_prefix(r"\\?\").unwrap_or(host_root),
    };
    let bytes = host_root.as_bytes();
    if bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':' {
        let drive = (bytes[0] as char).to_ascii_lowercase();
        let rest = host_root[2..].replace('\\', "/");
        let rest = rest.trim_end_matches('/');
        if rest.is_empty() {
            return format!("/{drive}");
        }
        if rest.starts_with('/') {
            return format!("/{drive}{rest}");
        }
        return format!("/{drive}/{rest}");
    }
    host_root.to_string()
}
