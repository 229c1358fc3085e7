use crate::duration::duration_serde;
use serde::{
    Deserialize,
    Serialize,
};
use std::time::Duration;
use strum::{
    Display,
    EnumString,
};

/// A named set of families refreshed back-to-back, then paused for `interval`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GroupConfig {
    pub name: String,
    #[serde(with = "duration_serde")]
    pub interval: Duration,
    pub families: Vec<String>,
}

/// What a failed family refresh means for the rest of the process.
#[derive(Debug, Default, Clone, Copy, Display, EnumString, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum FailurePolicy {
    /// Keep the previous snapshot of the failed family and carry on.
    #[default]
    Isolate,
    /// Stop every group and exit with the error.
    Exit,
}

#[cfg(test)]
mod test {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn failure_policy_round_trips_through_strings() {
        assert_eq!(FailurePolicy::from_str("isolate").unwrap(), FailurePolicy::Isolate);
        assert_eq!(FailurePolicy::from_str("exit").unwrap(), FailurePolicy::Exit);
        assert_eq!(FailurePolicy::Exit.to_string(), "exit");
        assert!(FailurePolicy::from_str("retry").is_err());
    }
}
