//! Parsing and comparison for the versioned interface identifiers a
//! guest import references: `pkg:ns/iface@major.minor.patch`
//! (spec.md §3 "Host registry", §6 "Host import ABI").

use componentrt_types::{Error, ErrorKind, Phase};
use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Version {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
}

impl Version {
    pub fn new(major: u64, minor: u64, patch: u64) -> Self {
        Version { major, minor, patch }
    }

    fn parse(s: &str) -> Result<Self, Error> {
        let mut parts = s.split('.');
        let mut next = || -> Result<u64, Error> {
            parts
                .next()
                .ok_or_else(|| registration_err(format!("malformed version `{s}`")))?
                .parse::<u64>()
                .map_err(|_| registration_err(format!("malformed version `{s}`")))
        };
        let version = Version::new(next()?, next()?, next()?);
        if parts.next().is_some() {
            return Err(registration_err(format!("malformed version `{s}`")));
        }
        Ok(version)
    }

    /// Whether a host registered at `self` satisfies a guest import
    /// requesting `requested` (spec.md §4.3: same major, host patch
    /// `W` at or below the import's requested patch `Z`; the import's
    /// minor is otherwise unconstrained by this engine — callers that
    /// need stricter minor matching enforce it above this layer).
    pub fn satisfies(&self, requested: Version) -> bool {
        self.major == requested.major && self.minor == requested.minor && self.patch <= requested.patch
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// A fully-qualified, versioned interface name: `pkg:ns/iface@1.2.3`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Namespace {
    pub package: String,
    pub ns: String,
    pub iface: String,
    pub version: Version,
}

impl Namespace {
    pub fn parse(raw: &str) -> Result<Self, Error> {
        let (path, version_str) = raw
            .split_once('@')
            .ok_or_else(|| registration_err(format!("namespace `{raw}` is missing a version")))?;
        let version = Version::parse(version_str)?;
        let (package, rest) = path
            .split_once(':')
            .ok_or_else(|| registration_err(format!("namespace `{raw}` is missing a `pkg:` prefix")))?;
        let (ns, iface) = rest
            .split_once('/')
            .ok_or_else(|| registration_err(format!("namespace `{raw}` is missing a `/iface` suffix")))?;
        if package.is_empty() || ns.is_empty() || iface.is_empty() {
            return Err(registration_err(format!("namespace `{raw}` has an empty component")));
        }
        Ok(Namespace {
            package: package.to_string(),
            ns: ns.to_string(),
            iface: iface.to_string(),
            version,
        })
    }

    /// The `pkg:ns/iface` prefix without its version, used as the
    /// registry's first-level lookup key (registrations at different
    /// versions of the same unversioned path compete for the same
    /// import via [`Version::satisfies`], not via distinct keys).
    pub fn unversioned(&self) -> String {
        format!("{}:{}/{}", self.package, self.ns, self.iface)
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.unversioned(), self.version)
    }
}

fn registration_err(detail: impl Into<String>) -> Error {
    Error::new(ErrorKind::Registration, Phase::Host, detail)
}
