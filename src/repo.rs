use crate::service_name::ServiceName;
use regex::Regex;
use std::path::Path;
use std::sync::OnceLock;

fn last_segment() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"([^/:\\]+?)(?:\.git)?[/\\]*$").unwrap())
}

/// Last segment of a git remote URL or path, without a trailing `.git`.
///
/// Accepts `https://host/org/repo.git`, `git@host:org/repo.git`,
/// `ssh://git@host/org/repo`, and plain paths. Trailing slashes are ignored.
/// A URL naming only a host, or a bare `.git`, has no repository name.
pub fn repo_name(source: &str) -> Option<String> {
    let source = source.trim();
    if source.is_empty() {
        return None;
    }

    if let Some((_, rest)) = source.split_once("://") {
        let path = rest.split_once('/').map_or("", |(_, path)| path);
        if path.trim_matches('/').is_empty() {
            return None;
        }
    }

    let name = last_segment().captures(source)?.get(1)?.as_str();

    match name {
        "" | "." | ".." | ".git" => None,
        _ => Some(name.to_string()),
    }
}

/// Name of a local checkout, resolving `.` and other relative paths first.
pub fn dir_name(dir: &Path) -> Option<String> {
    let resolved = dir.canonicalize().ok()?;
    let name = resolved.file_name()?.to_str()?;
    repo_name(name)
}

/// Service name derived from a remote URL, a directory on disk, or a bare name.
pub fn candidate_service_name(source: &str) -> Option<ServiceName> {
    let path = Path::new(source);
    let name = if path.is_dir() {
        dir_name(path)
    } else {
        repo_name(source)
    }?;

    let service = ServiceName::from_candidate(&name);
    tracing::debug!(source, candidate = %name, service = %service, "derived service name");
    Some(service)
}
