//! Target-application version context for version-gated hazards.
//!
//! Versions follow the toolkit format: dot-separated parts, each a number
//! optionally followed by a pre-release tag (`17.0a1`, `4.0b2pre`, `3.6.*`).

use crate::diagnostics::CompatInfo;
use crate::level::Severity;
use std::cmp::Ordering;
use std::collections::BTreeMap;

pub const FIREFOX_GUID: &str = "{ec8030f7-c20a-464f-9b0e-13a3a9e97384}";
pub const THUNDERBIRD_GUID: &str = "{3550f703-e582-4d05-9a08-453d09bdfdc6}";
pub const SEAMONKEY_GUID: &str = "{92650c4d-4b8e-4d2a-b7eb-24ecf4f6b63a}";

/// Half-open version range `[min, max)` for one application.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VersionRange {
    pub app: &'static str,
    pub min: &'static str,
    pub max: Option<&'static str>,
}

impl VersionRange {
    pub const fn firefox(min: &'static str) -> Self {
        Self {
            app: FIREFOX_GUID,
            min,
            max: None,
        }
    }

    pub const fn until(mut self, max: &'static str) -> Self {
        self.max = Some(max);
        self
    }

    pub fn contains(&self, version: &str) -> bool {
        compare_versions(version, self.min) != Ordering::Less
            && self
                .max
                .is_none_or(|max| compare_versions(version, max) == Ordering::Less)
    }
}

/// Applications and versions the add-on is being checked against.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompatContext {
    targets: BTreeMap<String, Vec<String>>,
}

impl CompatContext {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_target(mut self, app: impl Into<String>, version: impl Into<String>) -> Self {
        self.add_target(app, version);
        self
    }

    pub fn add_target(&mut self, app: impl Into<String>, version: impl Into<String>) {
        let versions = self.targets.entry(app.into()).or_default();
        let version = version.into();
        if !versions.contains(&version) {
            versions.push(version);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    /// Targeted versions that fall within any of `ranges`, keyed by app.
    pub fn matching(&self, ranges: &[VersionRange]) -> BTreeMap<String, Vec<String>> {
        let mut out: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for range in ranges {
            let Some(versions) = self.targets.get(range.app) else {
                continue;
            };
            for version in versions.iter().filter(|v| range.contains(v)) {
                let entry = out.entry(range.app.to_string()).or_default();
                if !entry.contains(version) {
                    entry.push(version.clone());
                }
            }
        }
        out
    }

    pub fn supports(&self, ranges: &[VersionRange]) -> bool {
        !self.matching(ranges).is_empty()
    }

    /// Compatibility payload for a finding gated on `ranges`, if any target matches.
    pub fn compat_info(&self, ranges: &[VersionRange], kind: Severity) -> Option<CompatInfo> {
        let for_appversions = self.matching(ranges);
        if for_appversions.is_empty() {
            return None;
        }
        Some(CompatInfo {
            compatibility_type: kind,
            for_appversions,
        })
    }
}

#[derive(Debug, PartialEq, Eq)]
struct VersionPart {
    number: u64,
    pre_tag: String,
    pre_number: u64,
}

impl VersionPart {
    fn parse(part: &str) -> Self {
        if part == "*" {
            return Self {
                number: u64::MAX,
                pre_tag: String::new(),
                pre_number: 0,
            };
        }
        let digits_end = part
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(part.len());
        let number = part[..digits_end].parse().unwrap_or(0);
        let rest = &part[digits_end..];
        let tag_end = rest
            .find(|c: char| c.is_ascii_digit())
            .unwrap_or(rest.len());
        let pre_tag = rest[..tag_end].to_string();
        let pre_number = rest[tag_end..]
            .chars()
            .take_while(|c| c.is_ascii_digit())
            .collect::<String>()
            .parse()
            .unwrap_or(0);
        Self {
            number,
            pre_tag,
            pre_number,
        }
    }

    fn cmp(&self, other: &Self) -> Ordering {
        self.number.cmp(&other.number).then_with(|| {
            // A release sorts after any of its pre-releases.
            match (self.pre_tag.is_empty(), other.pre_tag.is_empty()) {
                (true, true) => Ordering::Equal,
                (true, false) => Ordering::Greater,
                (false, true) => Ordering::Less,
                (false, false) => self
                    .pre_tag
                    .cmp(&other.pre_tag)
                    .then(self.pre_number.cmp(&other.pre_number)),
            }
        })
    }
}

/// Compare two toolkit version strings. Missing parts count as `0`.
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    let a_parts: Vec<&str> = a.split('.').collect();
    let b_parts: Vec<&str> = b.split('.').collect();
    let len = a_parts.len().max(b_parts.len());
    for i in 0..len {
        let left = VersionPart::parse(a_parts.get(i).copied().unwrap_or("0"));
        let right = VersionPart::parse(b_parts.get(i).copied().unwrap_or("0"));
        let ord = left.cmp(&right);
        if ord != Ordering::Equal {
            return ord;
        }
    }
    Ordering::Equal
}
