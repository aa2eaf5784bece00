use std::fmt;

/// Kinds of data a cached query can depend on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TagKind {
  Blog,
  Category,
  Place,
  Stats,
}

impl fmt::Display for TagKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let name = match self {
      Self::Blog => "Blog",
      Self::Category => "Category",
      Self::Place => "Place",
      Self::Stats => "Stats",
    };
    f.write_str(name)
  }
}

/// Invalidation label attached to cached query results.
///
/// A tag without an id stands for the whole collection of that kind; a tag with
/// an id stands for one record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Tag {
  pub kind: TagKind,
  pub id: Option<String>,
}

impl Tag {
  pub const fn of(kind: TagKind) -> Self {
    Self { kind, id: None }
  }

  pub fn with_id(kind: TagKind, id: impl Into<String>) -> Self {
    Self {
      kind,
      id: Some(id.into()),
    }
  }

  /// Whether invalidating `self` should invalidate an entry that provided `provided`.
  ///
  /// A collection tag matches every tag of its kind. A record tag only matches
  /// the same record.
  pub fn matches(&self, provided: &Tag) -> bool {
    self.kind == provided.kind && (self.id.is_none() || self.id == provided.id)
  }
}

impl fmt::Display for Tag {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match &self.id {
      Some(id) => write!(f, "{}:{}", self.kind, id),
      None => write!(f, "{}", self.kind),
    }
  }
}
