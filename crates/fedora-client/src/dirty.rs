//! Change tracking for datastream attributes
//!
//! `DirtyTracker` keeps the locally assigned value of every attribute the
//! caller touched, next to the value it had before the first assignment.
//! That value may not be known yet when the server profile was never
//! loaded; such attributes count as changed until [`DirtyTracker::resolve`]
//! supplies it.
//! Content is tracked separately: comparing it may need the server copy,
//! which the datastream fetches only when `content_decision` asks for it.

use std::collections::{BTreeMap, BTreeSet};

use crate::attributes::DsAttribute;
use crate::content::Content;
use crate::value::Value;

/// Value an attribute had before its first local assignment
#[derive(Clone, Debug, PartialEq)]
pub enum Baseline {
    Known(Option<Value>),
    /// The server value was not loaded at assignment time
    Unknown,
}

impl From<Option<Value>> for Baseline {
    fn from(value: Option<Value>) -> Self {
        Baseline::Known(value)
    }
}

#[derive(Clone, Debug, Default)]
pub struct DirtyTracker {
    /// Locally assigned values; `None` means explicitly cleared
    current: BTreeMap<DsAttribute, Option<Value>>,
    /// Baseline before the first local assignment since the last reset
    original: BTreeMap<DsAttribute, Baseline>,
    content_flagged: bool,
}

impl DirtyTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Locally assigned value, if the attribute was assigned at all
    pub fn local(&self, attr: DsAttribute) -> Option<&Option<Value>> {
        self.current.get(&attr)
    }

    /// Record an assignment. `previous` is the value the attribute had
    /// before it; only the first one since the last reset is kept.
    pub fn assign(
        &mut self,
        attr: DsAttribute,
        previous: impl Into<Baseline>,
        value: Option<Value>,
    ) {
        self.original.entry(attr).or_insert_with(|| previous.into());
        self.current.insert(attr, value);
    }

    pub fn is_changed(&self, attr: DsAttribute) -> bool {
        match (self.original.get(&attr), self.current.get(&attr)) {
            (Some(Baseline::Known(original)), Some(current)) => original != current,
            (Some(Baseline::Unknown), Some(_)) => true,
            _ => false,
        }
    }

    /// Attributes assigned while their baseline was unknown
    pub fn unresolved(&self) -> Vec<DsAttribute> {
        self.original
            .iter()
            .filter(|(_, baseline)| **baseline == Baseline::Unknown)
            .map(|(attr, _)| *attr)
            .collect()
    }

    /// Supply the baseline of an attribute assigned while it was unknown
    pub fn resolve(&mut self, attr: DsAttribute, value: Option<Value>) {
        if let Some(baseline) = self.original.get_mut(&attr)
            && *baseline == Baseline::Unknown
        {
            *baseline = Baseline::Known(value);
        }
    }

    /// Attributes whose local value differs from the original. Content is
    /// not included; see [`content_decision`].
    pub fn changed_attributes(&self) -> BTreeSet<DsAttribute> {
        self.original
            .keys()
            .copied()
            .filter(|attr| self.is_changed(*attr))
            .collect()
    }

    pub fn flag_content(&mut self) {
        self.content_flagged = true;
    }

    pub fn content_flagged(&self) -> bool {
        self.content_flagged
    }

    /// Forget originals and the content flag, keeping local values as the
    /// new baseline
    pub fn reset(&mut self) {
        self.original.clear();
        self.content_flagged = false;
    }
}

/// Outcome of the content change policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentDecision {
    Unchanged,
    Changed,
    /// Staged content must be compared with the server copy
    CompareWithServer,
}

/// Decide whether staged content counts as a change without touching the
/// network.
///
/// - external/redirect datastreams never change content through this path
/// - new datastreams change iff non-blank content is staged
/// - persisted datastreams with nothing staged are unchanged
/// - with eager loading the flag recorded at assignment time is the answer
/// - otherwise the staged content is compared against the server copy
pub fn content_decision(
    by_reference: bool,
    is_new: bool,
    staged: Option<&Content>,
    eager: bool,
    flagged: bool,
) -> ContentDecision {
    if by_reference {
        return ContentDecision::Unchanged;
    }
    if is_new {
        return match staged {
            Some(content) if !content.is_blank() => ContentDecision::Changed,
            _ => ContentDecision::Unchanged,
        };
    }
    if staged.is_none() {
        return ContentDecision::Unchanged;
    }
    if eager {
        return if flagged {
            ContentDecision::Changed
        } else {
            ContentDecision::Unchanged
        };
    }
    ContentDecision::CompareWithServer
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_assign_tracks_change() {
        let mut tracker = DirtyTracker::new();
        assert!(tracker.changed_attributes().is_empty());

        tracker.assign(DsAttribute::DsLabel, Baseline::Known(None), Some(Value::from("label")));
        assert!(tracker.is_changed(DsAttribute::DsLabel));
        assert_eq!(
            tracker.local(DsAttribute::DsLabel),
            Some(&Some(Value::from("label")))
        );
        assert_eq!(
            tracker.changed_attributes(),
            BTreeSet::from([DsAttribute::DsLabel])
        );
    }

    #[test]
    fn test_assign_back_to_original_is_unchanged() {
        let mut tracker = DirtyTracker::new();
        tracker.assign(DsAttribute::DsState, Some(Value::from("A")), Some(Value::from("I")));
        assert!(tracker.is_changed(DsAttribute::DsState));

        // Second assignment keeps the first original
        tracker.assign(DsAttribute::DsState, Some(Value::from("I")), Some(Value::from("A")));
        assert!(!tracker.is_changed(DsAttribute::DsState));
        assert!(tracker.changed_attributes().is_empty());
    }

    #[test]
    fn test_assign_same_value_is_unchanged() {
        let mut tracker = DirtyTracker::new();
        tracker.assign(DsAttribute::MimeType, Some(Value::from("text/xml")), Some(Value::from("text/xml")));
        assert!(!tracker.is_changed(DsAttribute::MimeType));
    }

    #[test]
    fn test_unknown_baseline_counts_as_changed() {
        let mut tracker = DirtyTracker::new();
        tracker.assign(DsAttribute::DsState, Baseline::Unknown, Some(Value::from("A")));
        tracker.assign(DsAttribute::DsLabel, Baseline::Known(None), Some(Value::from("label")));

        assert!(tracker.is_changed(DsAttribute::DsState));
        assert_eq!(tracker.unresolved(), vec![DsAttribute::DsState]);

        tracker.resolve(DsAttribute::DsState, Some(Value::from("A")));
        assert!(!tracker.is_changed(DsAttribute::DsState));
        assert!(tracker.unresolved().is_empty());
    }

    #[test]
    fn test_resolve_keeps_known_baseline() {
        let mut tracker = DirtyTracker::new();
        tracker.assign(DsAttribute::DsState, Some(Value::from("I")), Some(Value::from("A")));
        tracker.resolve(DsAttribute::DsState, Some(Value::from("A")));
        assert!(tracker.is_changed(DsAttribute::DsState));
    }

    #[test]
    fn test_reset_keeps_values() {
        let mut tracker = DirtyTracker::new();
        tracker.assign(DsAttribute::DsLabel, Baseline::Known(None), Some(Value::from("label")));
        tracker.flag_content();
        tracker.reset();

        assert!(tracker.changed_attributes().is_empty());
        assert!(!tracker.content_flagged());
        assert_eq!(
            tracker.local(DsAttribute::DsLabel),
            Some(&Some(Value::from("label")))
        );
    }

    #[test]
    fn test_content_decision_by_reference() {
        let staged = Content::from("hello");
        assert_eq!(
            content_decision(true, true, Some(&staged), false, true),
            ContentDecision::Unchanged
        );
        assert_eq!(
            content_decision(true, false, Some(&staged), true, true),
            ContentDecision::Unchanged
        );
    }

    #[test]
    fn test_content_decision_new() {
        let staged = Content::from("hello");
        let blank = Content::from("  ");
        assert_eq!(
            content_decision(false, true, Some(&staged), false, false),
            ContentDecision::Changed
        );
        assert_eq!(
            content_decision(false, true, Some(&blank), false, true),
            ContentDecision::Unchanged
        );
        assert_eq!(
            content_decision(false, true, None, false, false),
            ContentDecision::Unchanged
        );
    }

    #[test]
    fn test_content_decision_persisted() {
        let staged = Content::from("hello");
        assert_eq!(
            content_decision(false, false, None, false, false),
            ContentDecision::Unchanged
        );
        assert_eq!(
            content_decision(false, false, Some(&staged), false, false),
            ContentDecision::CompareWithServer
        );
        assert_eq!(
            content_decision(false, false, Some(&staged), true, true),
            ContentDecision::Changed
        );
        assert_eq!(
            content_decision(false, false, Some(&staged), true, false),
            ContentDecision::Unchanged
        );
    }
}
