//! Tarball filename parsing.
//!
//! Registry tarballs follow the `<name>-<version>.tgz` convention. The
//! version segment is what the gate needs; anything that does not carry a
//! semver-looking suffix is not a package tarball and must be forwarded
//! untouched (over-blocking unrelated assets is worse than an occasional
//! bypass).

use regex::Regex;
use semver::Version;
use std::sync::LazyLock;

static TARBALL_FILENAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?P<name>.+)-(?P<version>\d+\.\d+\.\d+(?:-[0-9A-Za-z.-]+)?(?:\+[0-9A-Za-z.-]+)?)\.tgz$",
    )
    .expect("tarball filename regex must compile")
});

/// Extract the version from a `<name>-<version>.tgz` filename, or `None`
/// when the filename does not follow the convention.
pub fn parse_tarball_version(filename: &str) -> Option<Version> {
    let caps = TARBALL_FILENAME.captures(filename)?;
    Version::parse(caps.name("version")?.as_str()).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_version() {
        let version = parse_tarball_version("left-pad-0.0.1.tgz").unwrap();
        assert_eq!(version, Version::parse("0.0.1").unwrap());
    }

    #[test]
    fn test_name_containing_digits_and_dashes() {
        let version = parse_tarball_version("pkg-2-tools-1.4.0.tgz").unwrap();
        assert_eq!(version.to_string(), "1.4.0");
    }

    #[test]
    fn test_prerelease_and_build_metadata() {
        let version = parse_tarball_version("react-19.0.0-rc.1.tgz").unwrap();
        assert_eq!(version.to_string(), "19.0.0-rc.1");

        let version = parse_tarball_version("lib-2.0.0-beta.3+build.7.tgz").unwrap();
        assert_eq!(version.to_string(), "2.0.0-beta.3+build.7");
    }

    #[test]
    fn test_non_tarball_filenames_do_not_parse() {
        assert!(parse_tarball_version("README.txt").is_none());
        assert!(parse_tarball_version("left-pad.tgz").is_none());
        assert!(parse_tarball_version("left-pad-1.0.tgz").is_none());
        assert!(parse_tarball_version("archive.tar.gz").is_none());
    }
}
