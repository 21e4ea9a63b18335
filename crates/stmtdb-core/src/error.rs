use crate::{
    db::{
        executor::ExecutionError,
        pipeline::PipelineError,
        statement::{BindingError, ParseError, SemanticError, StatementKind},
    },
    schema::CategoryRegistryError,
};
use std::fmt;
use thiserror::Error as ThisError;

///
/// StatementError
///
/// Every failure a caller can observe for one statement, tagged by the
/// taxonomy class that decides whether a retry can ever help.
///

#[derive(Debug, ThisError)]
pub enum StatementError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Semantic(#[from] SemanticError),

    #[error(transparent)]
    Binding(#[from] BindingError),

    #[error(transparent)]
    Execution(#[from] ExecutionError),

    #[error(transparent)]
    Registry(#[from] CategoryRegistryError),

    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    #[error("{statement} statement cannot be run as {requested}")]
    KindMismatch {
        statement: StatementKind,
        requested: &'static str,
    },
}

impl StatementError {
    #[must_use]
    pub const fn class(&self) -> ErrorClass {
        match self {
            Self::Parse(_) => ErrorClass::Parse,
            Self::Semantic(_) => ErrorClass::Semantic,
            Self::Binding(_) | Self::KindMismatch { .. } => ErrorClass::Binding,
            Self::Execution(_) => ErrorClass::Execution,
            Self::Registry(_) => ErrorClass::Registry,
            Self::Pipeline(_) => ErrorClass::Pipeline,
        }
    }

    /// Whether the same statement might succeed if submitted again.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        self.class().is_retryable()
    }

    #[must_use]
    pub fn display_with_class(&self) -> String {
        format!("{}: {self}", self.class())
    }
}

///
/// ErrorClass
///
/// Coarse error taxonomy. Only backend execution failures are transient;
/// everything else is a defect at the call site or in a descriptor.
///

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum ErrorClass {
    Parse,
    Semantic,
    Binding,
    Execution,
    Registry,
    Pipeline,
}

impl ErrorClass {
    #[must_use]
    pub const fn is_retryable(self) -> bool {
        matches!(self, Self::Execution)
    }
}

impl fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Parse => "parse",
            Self::Semantic => "semantic",
            Self::Binding => "binding",
            Self::Execution => "execution",
            Self::Registry => "registry",
            Self::Pipeline => "pipeline",
        };
        write!(f, "{label}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::statement::Expected;

    #[test]
    fn only_execution_errors_are_retryable() {
        let parse = StatementError::from(ParseError::UnexpectedEnd {
            expected: Expected::CategoryName,
        });
        let execution = StatementError::from(ExecutionError::Unavailable {
            backend: "memory".to_string(),
            reason: "connection refused".to_string(),
        });
        let pipeline = StatementError::from(PipelineError::Closed);

        assert!(!parse.is_retryable());
        assert!(execution.is_retryable());
        assert!(!pipeline.is_retryable());
        assert_eq!(execution.class(), ErrorClass::Execution);
    }

    #[test]
    fn display_with_class_prefixes_the_label() {
        let err = StatementError::from(SemanticError::UnknownKey {
            category: "desc-tester-category".to_string(),
            key: "foo".to_string(),
        });

        assert_eq!(
            err.display_with_class(),
            "semantic: unknown key 'foo' in category 'desc-tester-category'"
        );
    }
}
