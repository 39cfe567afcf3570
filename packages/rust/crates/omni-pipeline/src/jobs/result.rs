use std::fmt;

/// Jenkins execution result code (`hudson.model.Result`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionResult {
    Success,
    Unstable,
    Failure,
    NotBuilt,
    Aborted,
    /// Unrecognised code, upper-cased.
    Other(String),
}

impl ExecutionResult {
    /// Classify a raw result code; matching is case-insensitive.
    #[must_use]
    pub fn parse(code: &str) -> Self {
        let code = code.trim().to_ascii_uppercase();
        match code.as_str() {
            "SUCCESS" => Self::Success,
            "UNSTABLE" => Self::Unstable,
            "FAILURE" => Self::Failure,
            "NOT_BUILT" => Self::NotBuilt,
            "ABORTED" => Self::Aborted,
            _ => Self::Other(code),
        }
    }

    /// Success and Unstable count as a passing run.
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success | Self::Unstable)
    }

    #[must_use]
    pub fn label(&self) -> &str {
        match self {
            Self::Success => "Success",
            Self::Unstable => "Unstable",
            Self::Failure => "Failure",
            Self::NotBuilt => "Not built",
            Self::Aborted => "Aborted",
            Self::Other(code) => code,
        }
    }
}

impl fmt::Display for ExecutionResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_codes_map_to_labels() {
        assert_eq!(ExecutionResult::parse("SUCCESS").label(), "Success");
        assert_eq!(ExecutionResult::parse("unstable").label(), "Unstable");
        assert_eq!(ExecutionResult::parse("FAILURE").label(), "Failure");
        assert_eq!(ExecutionResult::parse("NOT_BUILT").label(), "Not built");
        assert_eq!(ExecutionResult::parse("ABORTED").label(), "Aborted");
    }

    #[test]
    fn unknown_code_passes_through_upper_cased() {
        let result = ExecutionResult::parse("cycle_detected");
        assert_eq!(result, ExecutionResult::Other("CYCLE_DETECTED".to_string()));
        assert_eq!(result.label(), "CYCLE_DETECTED");
        assert!(!result.is_success());
    }

    #[test]
    fn only_success_and_unstable_pass() {
        assert!(ExecutionResult::Success.is_success());
        assert!(ExecutionResult::Unstable.is_success());
        assert!(!ExecutionResult::Failure.is_success());
        assert!(!ExecutionResult::NotBuilt.is_success());
        assert!(!ExecutionResult::Aborted.is_success());
    }
}
