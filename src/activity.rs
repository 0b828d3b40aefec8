use crate::timetable::TimetableId;
use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::hash::{Hash, Hasher};

/// An activity scheduled in a timetable period.
///
/// Activities are immutable values. Equality, ordering and hashing look at
/// the title, the owner and the resources only; the back-reference to the
/// timetable the activity was added to is ignored so that the same activity
/// coming from two different timetables compares equal.
#[derive(Debug, Clone)]
pub struct Activity {
    title: String,
    owner: Option<String>,
    resources: BTreeSet<String>,
    timetable: Option<TimetableId>,
}

impl Activity {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            owner: None,
            resources: BTreeSet::new(),
            timetable: None,
        }
    }

    pub fn with_owner(mut self, owner: impl Into<String>) -> Self {
        self.owner = Some(owner.into());
        self
    }

    pub fn with_resources<I, S>(mut self, resources: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.resources = resources.into_iter().map(Into::into).collect();
        self
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn owner(&self) -> Option<&str> {
        self.owner.as_deref()
    }

    pub fn resources(&self) -> &BTreeSet<String> {
        &self.resources
    }

    pub fn timetable(&self) -> Option<TimetableId> {
        self.timetable
    }

    /// Returns a copy attached to `timetable`.
    pub fn attached_to(&self, timetable: Option<TimetableId>) -> Self {
        Self {
            timetable,
            ..self.clone()
        }
    }

    fn identity(&self) -> (&str, Option<&str>, &BTreeSet<String>) {
        (&self.title, self.owner.as_deref(), &self.resources)
    }
}

impl PartialEq for Activity {
    fn eq(&self, other: &Self) -> bool {
        self.identity() == other.identity()
    }
}

impl Eq for Activity {}

impl Hash for Activity {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.identity().hash(state);
    }
}

impl PartialOrd for Activity {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Activity {
    fn cmp(&self, other: &Self) -> Ordering {
        self.identity().cmp(&other.identity())
    }
}
