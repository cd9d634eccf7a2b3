use std::fmt;
use std::ops::RangeInclusive;
use uuid::Uuid;

/// A generated record at any level of the hierarchy.
///
/// Records are immutable once generated. The assembler wraps each one in an
/// [`std::sync::Arc`] so both stores receive the same allocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntheticRecord {
    pub id: Uuid,
    pub name: String,
    pub body: String,
}

impl SyntheticRecord {
    /// Creates a record with a fresh random v4 id.
    pub fn new(name: String, body: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            name,
            body,
        }
    }
}

/// Level of a record in the containers → groups → items hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordLevel {
    /// A forum.
    Container,
    /// A thread inside a forum.
    Group,
    /// A post inside a thread.
    Item,
}

/// Word count ranges used to generate the text fields of a record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextShape {
    pub name_words: RangeInclusive<usize>,
    pub body_words: RangeInclusive<usize>,
}

impl RecordLevel {
    pub const ALL: [RecordLevel; 3] = [RecordLevel::Container, RecordLevel::Group, RecordLevel::Item];

    pub fn text_shape(&self) -> TextShape {
        match self {
            RecordLevel::Container => TextShape {
                name_words: 1..=3,
                body_words: 3..=6,
            },
            RecordLevel::Group => TextShape {
                name_words: 3..=10,
                body_words: 50..=100,
            },
            RecordLevel::Item => TextShape {
                name_words: 3..=10,
                body_words: 50..=200,
            },
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RecordLevel::Container => "container",
            RecordLevel::Group => "group",
            RecordLevel::Item => "item",
        }
    }
}

impl fmt::Display for RecordLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
