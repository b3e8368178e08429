//! Generator revisions and where each expects its transform chain
//!
//! Generators before 1.0.0 read their parameters, transform chain included,
//! from an `input` section; later ones read everything from the document
//! root. The builder probes the version once and picks an [`InstallStrategy`].

use std::fmt;
use std::str::FromStr;

use serde_yaml::Value;

use crate::config::{ConfigDocument, TRANSFORMS_KEY};
use crate::error::{BuildError, Result};

/// Section holding the parameters of pre-1.0 generators
pub const INPUT_SECTION: &str = "input";

/// `major.minor.patch`, compared numerically
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct GeneratorVersion {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl GeneratorVersion {
    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    /// Parse `1`, `1.2`, `1.2.3` or `v1.2.3`; pre-release and build suffixes
    /// (`-rc1`, `+abc`) are ignored.
    pub fn parse(text: &str) -> Result<Self> {
        let trimmed = text.trim();
        let core = trimmed
            .strip_prefix('v')
            .unwrap_or(trimmed)
            .split(['-', '+'])
            .next()
            .unwrap_or_default();

        let mut parts = [0u32; 3];
        let mut count = 0;
        for component in core.split('.') {
            if count == parts.len() {
                return Err(invalid_version(text));
            }
            parts[count] = component.parse().map_err(|_| invalid_version(text))?;
            count += 1;
        }
        Ok(Self::new(parts[0], parts[1], parts[2]))
    }
}

fn invalid_version(text: &str) -> BuildError {
    BuildError::Config(format!("invalid generator version '{text}'"))
}

impl FromStr for GeneratorVersion {
    type Err = BuildError;

    fn from_str(text: &str) -> Result<Self> {
        Self::parse(text)
    }
}

impl fmt::Display for GeneratorVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// Where the transform chain is installed in the base document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallStrategy {
    /// `transforms` at the document root (generator >= 1.0.0)
    TopLevel,
    /// `input.transforms` (generator < 1.0.0)
    InputSection,
}

impl InstallStrategy {
    /// First revision reading the chain from the document root
    pub const TOP_LEVEL_SINCE: GeneratorVersion = GeneratorVersion::new(1, 0, 0);

    pub fn negotiate(version: GeneratorVersion) -> Self {
        if version >= Self::TOP_LEVEL_SINCE {
            InstallStrategy::TopLevel
        } else {
            InstallStrategy::InputSection
        }
    }

    /// Install `chain` into `document`, replacing any chain already there.
    pub fn install(
        self,
        version: GeneratorVersion,
        document: &mut ConfigDocument,
        chain: Value,
    ) -> Result<()> {
        let mismatch = |reason: String| BuildError::GeneratorVersionMismatch {
            version,
            strategy: self,
            reason,
        };

        let previous = match self {
            InstallStrategy::TopLevel => {
                if document.section(INPUT_SECTION).is_some() {
                    return Err(mismatch(format!(
                        "{} wraps its parameters in an `{INPUT_SECTION}` section",
                        document.origin()
                    )));
                }
                document.insert(TRANSFORMS_KEY, chain)
            }
            InstallStrategy::InputSection => {
                let origin = document.origin().to_string();
                let input = document.section_mut(INPUT_SECTION).ok_or_else(|| {
                    mismatch(format!("{origin} has no `{INPUT_SECTION}` section"))
                })?;
                input.insert(Value::String(TRANSFORMS_KEY.to_string()), chain)
            }
        };

        if previous.is_some() {
            log::debug!("Replaced the transform chain of {} ({self})", document.origin());
        }
        Ok(())
    }
}

impl fmt::Display for InstallStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InstallStrategy::TopLevel => write!(f, "at `{TRANSFORMS_KEY}`"),
            InstallStrategy::InputSection => write!(f, "at `{INPUT_SECTION}.{TRANSFORMS_KEY}`"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_versions() {
        assert_eq!(GeneratorVersion::parse("1.0.0").unwrap(), GeneratorVersion::new(1, 0, 0));
        assert_eq!(GeneratorVersion::parse("v0.6").unwrap(), GeneratorVersion::new(0, 6, 0));
        assert_eq!(GeneratorVersion::parse(" 2 ").unwrap(), GeneratorVersion::new(2, 0, 0));
        assert_eq!(
            GeneratorVersion::parse("1.4.2-rc1+abc").unwrap(),
            GeneratorVersion::new(1, 4, 2)
        );
        assert!(GeneratorVersion::parse("1.x").is_err());
        assert!(GeneratorVersion::parse("1.2.3.4").is_err());
        assert!(GeneratorVersion::parse("").is_err());
    }

    #[test]
    fn test_versions_compare_numerically() {
        let ten: GeneratorVersion = "10.0.0".parse().unwrap();
        let nine: GeneratorVersion = "9.9.9".parse().unwrap();
        assert!(ten > nine);
        assert_eq!(InstallStrategy::negotiate(ten), InstallStrategy::TopLevel);
        assert_eq!(
            InstallStrategy::negotiate(GeneratorVersion::new(0, 9, 12)),
            InstallStrategy::InputSection
        );
    }

    #[test]
    fn test_top_level_install() {
        let mut doc = ConfigDocument::from_yaml_str("n_particle: 4\ntransforms: {}\n").unwrap();
        let chain = Value::String("chain".to_string());
        InstallStrategy::TopLevel
            .install(GeneratorVersion::new(1, 0, 0), &mut doc, chain.clone())
            .unwrap();
        assert_eq!(doc.get(TRANSFORMS_KEY), Some(&chain));
    }

    #[test]
    fn test_input_section_install() {
        let mut doc = ConfigDocument::from_yaml_str("input:\n  n_particle: 4\n").unwrap();
        let chain = Value::String("chain".to_string());
        InstallStrategy::InputSection
            .install(GeneratorVersion::new(0, 5, 0), &mut doc, chain.clone())
            .unwrap();
        assert_eq!(doc.section(INPUT_SECTION).and_then(|s| s.get(TRANSFORMS_KEY)), Some(&chain));
        assert!(!doc.contains_key(TRANSFORMS_KEY));
    }

    #[test]
    fn test_mismatched_layouts() {
        let mut legacy = ConfigDocument::from_yaml_str("input:\n  n_particle: 4\n").unwrap();
        let result = InstallStrategy::TopLevel.install(GeneratorVersion::new(1, 1, 0), &mut legacy, Value::Null);
        assert!(matches!(result, Err(BuildError::GeneratorVersionMismatch { .. })));

        let mut modern = ConfigDocument::from_yaml_str("n_particle: 4\n").unwrap();
        let result =
            InstallStrategy::InputSection.install(GeneratorVersion::new(0, 9, 0), &mut modern, Value::Null);
        assert!(matches!(
            result,
            Err(BuildError::GeneratorVersionMismatch {
                strategy: InstallStrategy::InputSection,
                ..
            })
        ));
    }
}
