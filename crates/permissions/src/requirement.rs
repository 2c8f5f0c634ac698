//! Requirement evaluation.

use crate::{Error, PermissionCode, PermissionSet, Result};
use std::fmt;

/// True iff `held` contains every code in `required`.
///
/// An empty `required` list is satisfied by any set.
pub fn has_permission(held: &PermissionSet, required: &[PermissionCode]) -> bool {
    required.iter().all(|code| held.contains(code))
}

/// True iff `held` contains at least one code in `required`.
///
/// An empty `required` list means "no restriction" and is satisfied by any
/// set, matching [`has_permission`].
pub fn has_any_permission(held: &PermissionSet, required: &[PermissionCode]) -> bool {
    required.is_empty() || required.iter().any(|code| held.contains(code))
}

/// What a route demands of the session's permissions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Requirement {
    /// Any authenticated session passes.
    #[default]
    None,
    /// Every listed code must be held.
    AllOf(Vec<PermissionCode>),
    /// At least one listed code must be held.
    AnyOf(Vec<PermissionCode>),
}

/// Result of a requirement check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny { missing: Vec<PermissionCode> },
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allow)
    }
}

impl Requirement {
    pub fn all_of(codes: impl IntoIterator<Item = PermissionCode>) -> Self {
        Self::AllOf(codes.into_iter().collect())
    }

    pub fn any_of(codes: impl IntoIterator<Item = PermissionCode>) -> Self {
        Self::AnyOf(codes.into_iter().collect())
    }

    /// The codes named by this requirement.
    pub fn codes(&self) -> &[PermissionCode] {
        match self {
            Self::None => &[],
            Self::AllOf(codes) | Self::AnyOf(codes) => codes,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.codes().is_empty()
    }

    /// Reject requirements that name no codes.
    ///
    /// Routes that demand permissions must say which ones.
    pub fn ensure_non_empty(&self, context: &str) -> Result<()> {
        if self.is_empty() {
            Err(Error::EmptyRequirement(context.to_string()))
        } else {
            Ok(())
        }
    }

    pub fn is_satisfied_by(&self, held: &PermissionSet) -> bool {
        match self {
            Self::None => true,
            Self::AllOf(codes) => has_permission(held, codes),
            Self::AnyOf(codes) => has_any_permission(held, codes),
        }
    }

    /// Check the requirement, reporting which codes were missing on denial.
    ///
    /// For `AnyOf` every listed code is reported, since holding any one of
    /// them would have been enough.
    pub fn check(&self, held: &PermissionSet) -> Decision {
        if self.is_satisfied_by(held) {
            return Decision::Allow;
        }

        let missing = match self {
            Self::None => Vec::new(),
            Self::AllOf(codes) => codes
                .iter()
                .filter(|code| !held.contains(code))
                .cloned()
                .collect(),
            Self::AnyOf(codes) => codes.clone(),
        };
        Decision::Deny { missing }
    }
}

impl fmt::Display for Requirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let list = |codes: &[PermissionCode]| {
            codes
                .iter()
                .map(PermissionCode::as_str)
                .collect::<Vec<_>>()
                .join(", ")
        };
        match self {
            Self::None => write!(f, "authenticated"),
            Self::AllOf(codes) => write!(f, "all of [{}]", list(codes)),
            Self::AnyOf(codes) => write!(f, "any of [{}]", list(codes)),
        }
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Decision::Allow => write!(f, "allowed"),
            Decision::Deny { missing } => {
                let missing: Vec<&str> = missing.iter().map(PermissionCode::as_str).collect();
                write!(f, "missing {}", missing.join(", "))
            }
        }
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    fn code() -> impl Strategy<Value = PermissionCode> {
        prop::sample::select(PermissionCode::KNOWN.to_vec())
    }

    fn codes() -> impl Strategy<Value = Vec<PermissionCode>> {
        prop::collection::vec(code(), 0..6)
    }

    proptest! {
        #[test]
        fn all_of_is_superset(held in codes(), required in codes()) {
            let set: PermissionSet = held.iter().cloned().collect();
            let expected = required.iter().all(|c| held.contains(c));
            prop_assert_eq!(Requirement::AllOf(required).is_satisfied_by(&set), expected);
        }

        #[test]
        fn any_of_is_intersection(held in codes(), required in prop::collection::vec(code(), 1..6)) {
            let set: PermissionSet = held.iter().cloned().collect();
            let expected = required.iter().any(|c| held.contains(c));
            prop_assert_eq!(Requirement::AnyOf(required).is_satisfied_by(&set), expected);
        }

        #[test]
        fn removing_one_required_code_denies(required in prop::collection::vec(code(), 1..6), drop in 0usize..6) {
            let victim = required[drop % required.len()].clone();
            let set: PermissionSet = required.iter().filter(|c| **c != victim).cloned().collect();
            match Requirement::AllOf(required).check(&set) {
                Decision::Allow => prop_assert!(false, "access granted without {}", victim),
                Decision::Deny { missing } => {
                    prop_assert!(!missing.is_empty());
                    prop_assert!(missing.iter().all(|c| *c == victim));
                }
            }
        }
    }
}
