use anyhow::bail;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How ungraded work affects the final estimate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize, Serialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
#[value(rename_all = "snake_case")]
pub enum FinalPolicy {
    /// Ungraded work counts for nothing; final equals running
    IgnoreAll,
    /// Missing work counts as zero, not-yet-due work is ignored
    #[default]
    MissingZeroUpcomingIgnore,
    /// Every ungraded assignment counts as zero
    AllZero,
}

impl FinalPolicy {
    pub const ALL: [FinalPolicy; 3] = [
        FinalPolicy::IgnoreAll,
        FinalPolicy::MissingZeroUpcomingIgnore,
        FinalPolicy::AllZero,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FinalPolicy::IgnoreAll => "ignore_all",
            FinalPolicy::MissingZeroUpcomingIgnore => "missing_zero_upcoming_ignore",
            FinalPolicy::AllZero => "all_zero",
        }
    }

    /// Comma-separated list of every policy name
    pub fn names() -> String {
        Self::ALL
            .iter()
            .map(FinalPolicy::as_str)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl fmt::Display for FinalPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FinalPolicy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        match Self::ALL.iter().find(|p| p.as_str() == s) {
            Some(policy) => Ok(*policy),
            None => bail!("unknown policy '{}' (expected one of: {})", s, Self::names()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_policy() {
        assert_eq!(FinalPolicy::default(), FinalPolicy::MissingZeroUpcomingIgnore);
    }

    #[test]
    fn test_parse_and_display_agree() {
        for policy in FinalPolicy::ALL {
            assert_eq!(policy.to_string().parse::<FinalPolicy>().unwrap(), policy);
        }
    }

    #[test]
    fn test_parse_unknown_lists_options() {
        let err = "zero_everything".parse::<FinalPolicy>().unwrap_err();
        assert!(err.to_string().contains("all_zero"));
    }

    #[test]
    fn test_serde_uses_snake_case_names() {
        let json = serde_json::to_string(&FinalPolicy::AllZero).unwrap();
        assert_eq!(json, "\"all_zero\"");
        let parsed: FinalPolicy = serde_json::from_str("\"ignore_all\"").unwrap();
        assert_eq!(parsed, FinalPolicy::IgnoreAll);
    }
}
