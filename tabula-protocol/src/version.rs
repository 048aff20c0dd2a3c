//! Protocol version and handshake compatibility rules.
//!
//! A client announces its connector version as `MAJOR.MINOR[.PATCH]`
//! (decimal digits only). The server rejects clients whose major version
//! is below its own, or whose minor version is below its own at the same
//! major. Newer clients are accepted without further checks; the patch
//! component is validated but never compared.

use crate::reply::HandshakeStatus;

pub const MAJOR: u32 = 1;
pub const MINOR: u32 = 1;

/// Version string the connector sends during the handshake.
pub fn connector_version() -> String {
    format!("{MAJOR}.{MINOR}")
}

/// Parse `MAJOR.MINOR[.PATCH]`, digits only in every component.
pub fn parse(version: &str) -> Option<(u32, u32)> {
    let mut parts = version.split('.');
    let major = parse_component(parts.next()?)?;
    let minor = parse_component(parts.next()?)?;
    if let Some(patch) = parts.next() {
        parse_component(patch)?;
    }
    if parts.next().is_some() {
        return None;
    }
    Some((major, minor))
}

// str::parse alone is too lenient here: it accepts a leading `+`.
fn parse_component(part: &str) -> Option<u32> {
    if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    part.parse().ok()
}

/// Check a client's announced version against this protocol version.
pub fn check(version: &str) -> HandshakeStatus {
    match parse(version) {
        None => HandshakeStatus::VersionMalformed,
        Some((major, minor)) => {
            if major < MAJOR || (major == MAJOR && minor < MINOR) {
                HandshakeStatus::VersionTooLow
            } else {
                HandshakeStatus::Ok
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_current_version_is_compatible() {
        assert_eq!(check(&connector_version()), HandshakeStatus::Ok);
    }

    #[test]
    fn test_patch_component_is_ignored() {
        assert_eq!(check("1.1.13"), HandshakeStatus::Ok);
    }

    #[test]
    fn test_major_too_low() {
        assert_eq!(check("0.1"), HandshakeStatus::VersionTooLow);
    }

    #[test]
    fn test_minor_too_low() {
        assert_eq!(check("1.0"), HandshakeStatus::VersionTooLow);
    }

    #[test]
    fn test_newer_versions_accepted() {
        assert_eq!(check("1.9"), HandshakeStatus::Ok);
        assert_eq!(check("2.0"), HandshakeStatus::Ok);
    }

    #[test]
    fn test_malformed_versions() {
        for vs in ["3", "", "1.", ".1", "1.2.3.4", "1.x", "+1.2", "1.2.x", "1. 2"] {
            assert_eq!(check(vs), HandshakeStatus::VersionMalformed, "{vs:?}");
        }
    }
}
