//! The clause record carried by a loop marker.

use crate::utils::errors::{value_error, AccResult, ValueErrorKind};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Clause flags of one loop marker.
///
/// Fields are only changed through the setters, which keep `seq` apart from
/// `gang` and `vector`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoopClauses {
    sequential: bool,
    gang: bool,
    vector: bool,
    collapse: Option<usize>,
}

impl LoopClauses {
    pub fn sequential(&self) -> bool {
        self.sequential
    }

    pub fn gang(&self) -> bool {
        self.gang
    }

    pub fn vector(&self) -> bool {
        self.vector
    }

    pub fn collapse(&self) -> Option<usize> {
        self.collapse
    }

    pub(crate) fn set_sequential(&mut self) -> AccResult<()> {
        if self.gang {
            return value_error(ValueErrorKind::ClauseConflict, "Cannot apply seq to a loop with a gang clause.");
        }
        if self.vector {
            return value_error(
                ValueErrorKind::ClauseConflict,
                "Cannot apply seq to a loop with a vector clause.",
            );
        }
        self.sequential = true;
        Ok(())
    }

    pub(crate) fn set_gang(&mut self) -> AccResult<()> {
        if self.sequential {
            return value_error(ValueErrorKind::ClauseConflict, "Cannot apply gang to a loop with a seq clause.");
        }
        self.gang = true;
        Ok(())
    }

    pub(crate) fn set_vector(&mut self) -> AccResult<()> {
        if self.sequential {
            return value_error(
                ValueErrorKind::ClauseConflict,
                "Cannot apply vector to a loop with a seq clause.",
            );
        }
        self.vector = true;
        Ok(())
    }

    pub(crate) fn set_collapse(&mut self, depth: usize) {
        self.collapse = Some(depth);
    }
}

impl fmt::Display for LoopClauses {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();
        if self.sequential {
            parts.push("seq".to_string());
        }
        if self.gang {
            parts.push("gang".to_string());
        }
        if self.vector {
            parts.push("vector".to_string());
        }
        if let Some(n) = self.collapse {
            parts.push(format!("collapse({})", n));
        }
        write!(f, "{}", parts.join(" "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seq_excludes_gang_and_vector() {
        let mut clauses = LoopClauses::default();
        clauses.set_gang().unwrap();
        clauses.set_vector().unwrap();
        let err = clauses.set_sequential().unwrap_err();
        assert_eq!(err.to_string(), "Value error: Cannot apply seq to a loop with a gang clause.");
        assert!(!clauses.sequential());

        let mut clauses = LoopClauses::default();
        clauses.set_sequential().unwrap();
        assert!(clauses.set_gang().is_err());
        assert!(clauses.set_vector().is_err());
        clauses.set_sequential().unwrap();
    }

    #[test]
    fn test_display() {
        let mut clauses = LoopClauses::default();
        assert_eq!(clauses.to_string(), "");
        clauses.set_gang().unwrap();
        clauses.set_vector().unwrap();
        clauses.set_collapse(2);
        assert_eq!(clauses.to_string(), "gang vector collapse(2)");
    }
}
