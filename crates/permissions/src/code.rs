use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// A grantable capability tag, e.g. `VIEW_PAYMENTS`.
///
/// The portal knows a fixed set of codes at build time (see the associated
/// constants), but codes received from the backend are kept verbatim even
/// when unknown so newer servers keep working with older clients.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PermissionCode(Cow<'static, str>);

impl PermissionCode {
    pub const VIEW_DASHBOARD: Self = Self(Cow::Borrowed("VIEW_DASHBOARD"));
    pub const VIEW_PROFILE: Self = Self(Cow::Borrowed("VIEW_PROFILE"));
    pub const VIEW_PAYMENTS: Self = Self(Cow::Borrowed("VIEW_PAYMENTS"));
    pub const MAKE_PAYMENTS: Self = Self(Cow::Borrowed("MAKE_PAYMENTS"));
    pub const PARTICIPATE_VOTING: Self = Self(Cow::Borrowed("PARTICIPATE_VOTING"));
    pub const VIEW_FORUM: Self = Self(Cow::Borrowed("VIEW_FORUM"));
    pub const SUBMIT_METER_READINGS: Self = Self(Cow::Borrowed("SUBMIT_METER_READINGS"));
    pub const VIEW_CALENDAR: Self = Self(Cow::Borrowed("VIEW_CALENDAR"));

    /// Every code the portal itself checks for.
    pub const KNOWN: [Self; 8] = [
        Self::VIEW_DASHBOARD,
        Self::VIEW_PROFILE,
        Self::VIEW_PAYMENTS,
        Self::MAKE_PAYMENTS,
        Self::PARTICIPATE_VOTING,
        Self::VIEW_FORUM,
        Self::SUBMIT_METER_READINGS,
        Self::VIEW_CALENDAR,
    ];

    /// Create a code from an arbitrary tag.
    ///
    /// Surrounding whitespace is trimmed; a blank tag is rejected.
    pub fn new(code: impl Into<String>) -> Result<Self> {
        let code = code.into();
        let trimmed = code.trim();
        if trimmed.is_empty() {
            return Err(Error::InvalidCode(code));
        }
        if trimmed.len() == code.len() {
            Ok(Self(Cow::Owned(code)))
        } else {
            Ok(Self(Cow::Owned(trimmed.to_string())))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this is one of the codes in [`PermissionCode::KNOWN`].
    pub fn is_known(&self) -> bool {
        Self::KNOWN.iter().any(|known| known == self)
    }
}

impl fmt::Display for PermissionCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for PermissionCode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

impl TryFrom<String> for PermissionCode {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Self::new(value)
    }
}

impl From<PermissionCode> for String {
    fn from(code: PermissionCode) -> Self {
        code.0.into_owned()
    }
}

/// The set of permissions held by a session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PermissionSet(BTreeSet<PermissionCode>);

impl PermissionSet {
    pub const fn new() -> Self {
        Self(BTreeSet::new())
    }

    /// Parse a comma-separated list such as `"VIEW_DASHBOARD, VIEW_FORUM"`.
    ///
    /// Empty items between commas are skipped.
    pub fn parse_list(list: &str) -> Result<Self> {
        list.split(',')
            .filter(|item| !item.trim().is_empty())
            .map(PermissionCode::new)
            .collect()
    }

    pub fn insert(&mut self, code: PermissionCode) -> bool {
        self.0.insert(code)
    }

    pub fn contains(&self, code: &PermissionCode) -> bool {
        self.0.contains(code)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PermissionCode> {
        self.0.iter()
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }
}

impl FromIterator<PermissionCode> for PermissionSet {
    fn from_iter<I: IntoIterator<Item = PermissionCode>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl Extend<PermissionCode> for PermissionSet {
    fn extend<I: IntoIterator<Item = PermissionCode>>(&mut self, iter: I) {
        self.0.extend(iter);
    }
}

impl IntoIterator for PermissionSet {
    type Item = PermissionCode;
    type IntoIter = std::collections::btree_set::IntoIter<PermissionCode>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a PermissionSet {
    type Item = &'a PermissionCode;
    type IntoIter = std::collections::btree_set::Iter<'a, PermissionCode>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl fmt::Display for PermissionSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let codes: Vec<&str> = self.0.iter().map(PermissionCode::as_str).collect();
        write!(f, "{{{}}}", codes.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constant_equals_parsed() {
        let parsed: PermissionCode = "VIEW_FORUM".parse().unwrap();
        assert_eq!(parsed, PermissionCode::VIEW_FORUM);

        let mut set = PermissionSet::new();
        set.insert(parsed);
        assert!(set.contains(&PermissionCode::VIEW_FORUM));
    }

    #[test]
    fn test_blank_code_rejected() {
        assert!(PermissionCode::new("").is_err());
        assert!(PermissionCode::new("   ").is_err());
        assert_eq!(PermissionCode::new(" VIEW_FORUM ").unwrap().as_str(), "VIEW_FORUM");
    }

    #[test]
    fn test_unknown_code_kept() {
        let code = PermissionCode::new("MANAGE_PLOTS").unwrap();
        assert!(!code.is_known());
        assert!(PermissionCode::VIEW_CALENDAR.is_known());
    }

    #[test]
    fn test_parse_list() {
        let set = PermissionSet::parse_list("VIEW_DASHBOARD, VIEW_FORUM,,").unwrap();
        assert_eq!(set.len(), 2);
        assert!(set.contains(&PermissionCode::VIEW_DASHBOARD));
        assert!(PermissionSet::parse_list("").unwrap().is_empty());
    }

    #[test]
    fn test_set_serde() {
        let set: PermissionSet =
            serde_json::from_str(r#"["VIEW_PAYMENTS", "FUTURE_CODE"]"#).unwrap();
        assert!(set.contains(&PermissionCode::VIEW_PAYMENTS));
        assert_eq!(set.len(), 2);

        assert!(serde_json::from_str::<PermissionSet>(r#"[""]"#).is_err());
        assert_eq!(
            serde_json::to_string(&set).unwrap(),
            r#"["FUTURE_CODE","VIEW_PAYMENTS"]"#
        );
    }
}
