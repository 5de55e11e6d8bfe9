//! Fully-qualified resource/trait type names, form `<group>/<Kind>@<majorVersion>`.

use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Fqn {
    pub group: String,
    pub kind: String,
    pub major_version: u32,
}

impl Fqn {
    pub fn new(group: impl Into<String>, kind: impl Into<String>, major_version: u32) -> Self {
        Self { group: group.into(), kind: kind.into(), major_version }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("invalid FQN {0:?}: expected \"<group>/<Kind>@<majorVersion>\"")]
pub struct FqnParseError(String);

impl FromStr for Fqn {
    type Err = FqnParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (group, rest) = s.split_once('/').ok_or_else(|| FqnParseError(s.to_string()))?;
        let (kind, version) = rest.split_once('@').ok_or_else(|| FqnParseError(s.to_string()))?;
        let major_version: u32 = version.parse().map_err(|_| FqnParseError(s.to_string()))?;
        if group.is_empty() || kind.is_empty() {
            return Err(FqnParseError(s.to_string()));
        }
        Ok(Fqn { group: group.to_string(), kind: kind.to_string(), major_version })
    }
}

impl TryFrom<String> for Fqn {
    type Error = FqnParseError;
    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<Fqn> for String {
    fn from(fqn: Fqn) -> Self {
        fqn.to_string()
    }
}

impl fmt::Display for Fqn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}@{}", self.group, self.kind, self.major_version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_well_formed_fqn() {
        let fqn: Fqn = "apps/Deployment@1".parse().unwrap();
        assert_eq!(fqn, Fqn::new("apps", "Deployment", 1));
        assert_eq!(fqn.to_string(), "apps/Deployment@1");
    }

    #[test]
    fn rejects_missing_version() {
        assert!("apps/Deployment".parse::<Fqn>().is_err());
    }

    #[test]
    fn rejects_empty_group() {
        assert!("/Deployment@1".parse::<Fqn>().is_err());
    }
}
