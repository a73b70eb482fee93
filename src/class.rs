//! Process classes and a small per-class lookup table.

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::ops::{Index, IndexMut};

/// Scheduling class of a simulated process, fixed at creation.
///
/// The class decides which end of the tiered ready queue a process is admitted to: foreground
/// work lands in the top tier, background work in tier 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ProcessClass {
    Foreground,
    Background,
}

impl ProcessClass {
    /// Every class in table order.
    pub const ALL: [ProcessClass; 2] = [ProcessClass::Foreground, ProcessClass::Background];

    /// Stable index for class based arrays.
    pub const fn index(self) -> usize {
        match self {
            ProcessClass::Foreground => 0,
            ProcessClass::Background => 1,
        }
    }

    /// `true` for work that should be admitted at the top tier.
    pub const fn is_foreground(self) -> bool {
        matches!(self, ProcessClass::Foreground)
    }

    /// One-letter tag used by the textual reports (`F` / `B`).
    pub const fn tag(self) -> char {
        match self {
            ProcessClass::Foreground => 'F',
            ProcessClass::Background => 'B',
        }
    }
}

impl fmt::Display for ProcessClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ProcessClass::Foreground => "foreground",
            ProcessClass::Background => "background",
        };
        write!(f, "{label}")
    }
}

/// Helper structure wrapping a value per [`ProcessClass`].
///
/// Used for per-class configuration knobs (for example the execution time handed to freshly
/// produced processes) and per-class counters in reports. A table always holds exactly one
/// value per class; deserializing any other length fails.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClassTable<T> {
    values: Vec<T>,
}

impl<T> ClassTable<T> {
    /// Build a table by executing a closure for each class in [`ProcessClass::ALL`] order.
    pub fn from_fn(mut f: impl FnMut(ProcessClass) -> T) -> Self {
        let mut values = Vec::with_capacity(ProcessClass::ALL.len());
        for class in ProcessClass::ALL {
            values.push(f(class));
        }
        ClassTable { values }
    }

    /// Build a table from values listed in [`ProcessClass::ALL`] order.
    ///
    /// # Arguments
    /// * `values` - one value per class
    ///
    /// # Returns
    /// `None` when `values` does not hold exactly one entry per class.
    pub fn from_vec(values: Vec<T>) -> Option<Self> {
        (values.len() == ProcessClass::ALL.len()).then_some(ClassTable { values })
    }

    /// Get a reference to the value associated with `class`.
    ///
    /// # Arguments
    /// * `class` - class to look up
    ///
    /// # Returns
    /// Reference to the stored value
    pub fn get(&self, class: ProcessClass) -> &T {
        &self.values[class.index()]
    }

    /// Mutable counterpart of [`ClassTable::get`].
    pub fn get_mut(&mut self, class: ProcessClass) -> &mut T {
        &mut self.values[class.index()]
    }

    /// Iterate `(class, value)` pairs in table order.
    pub fn iter(&self) -> impl Iterator<Item = (ProcessClass, &T)> {
        ProcessClass::ALL.into_iter().zip(self.values.iter())
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for ClassTable<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        struct Raw<T> {
            values: Vec<T>,
        }

        let raw = Raw::<T>::deserialize(deserializer)?;
        let found = raw.values.len();
        ClassTable::from_vec(raw.values).ok_or_else(|| {
            D::Error::custom(format!(
                "class table needs {} values, found {found}",
                ProcessClass::ALL.len()
            ))
        })
    }
}

impl<T> Index<ProcessClass> for ClassTable<T> {
    type Output = T;

    fn index(&self, index: ProcessClass) -> &Self::Output {
        self.get(index)
    }
}

impl<T> IndexMut<ProcessClass> for ClassTable<T> {
    fn index_mut(&mut self, index: ProcessClass) -> &mut Self::Output {
        self.get_mut(index)
    }
}
