use std::collections::HashSet;

/// Members flagged upstream as duplicated or inconsistent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExcludedMemberSet {
    members: HashSet<String>,
}

impl ExcludedMemberSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Check if a member must be left out of scoring
    pub fn is_excluded(&self, member_id: &str) -> bool {
        self.members.contains(member_id)
    }

    /// Returns true if the member was newly added
    pub fn insert(&mut self, member_id: impl Into<String>) -> bool {
        self.members.insert(member_id.into())
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

impl<S: Into<String>> FromIterator<S> for ExcludedMemberSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self {
            members: iter.into_iter().map(Into::into).collect(),
        }
    }
}
