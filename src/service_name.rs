use std::fmt;

/// Longest name Cloud Run accepts for a service.
pub const MAX_SERVICE_NAME_LEN: usize = 63;

/// Prepended when a name does not start with a letter.
pub const SERVICE_NAME_PREFIX: &str = "svc-";

/// Turns an arbitrary repository or directory name into something Cloud Run
/// will accept as a service name.
///
/// The name gets [`SERVICE_NAME_PREFIX`] when its first character is not a
/// letter, is then cut to [`MAX_SERVICE_NAME_LEN`] characters, and finally
/// loses any trailing dashes. An empty name stays empty.
///
/// The length limit counts `char`s, so truncation never splits a multi-byte
/// sequence.
pub fn try_fix_service_name(name: &str) -> String {
    let first = match name.chars().next() {
        Some(c) => c,
        None => return String::new(),
    };

    let prefixed = if first.is_alphabetic() {
        name.to_string()
    } else {
        format!("{}{}", SERVICE_NAME_PREFIX, name)
    };

    let truncated: String = prefixed.chars().take(MAX_SERVICE_NAME_LEN).collect();

    // Dashes exposed by the cut have to go too, so this runs after truncation.
    truncated.trim_end_matches('-').to_string()
}

/// A service name that has already been through [`try_fix_service_name`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ServiceName(String);

impl ServiceName {
    /// Sanitizes `candidate` with [`try_fix_service_name`].
    pub fn from_candidate(candidate: &str) -> Self {
        ServiceName(try_fix_service_name(candidate))
    }

    /// The sanitized name.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Unwraps into the owned sanitized name.
    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for ServiceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ServiceName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
