//! Immutable range-scan specifications.

use crate::{Database, Slice};

/// Precise range bounds for a scan, one optional key per form.
///
/// `gte`/`gt` delimit the side nearer the beginning of the walk, `lte`/`lt`
/// the far side. When both the inclusive and the exclusive form of one side
/// are supplied, the inclusive form wins.
#[derive(Clone, Debug, Default)]
pub struct Bounds {
    gte: Option<Vec<u8>>,
    gt: Option<Vec<u8>>,
    lte: Option<Vec<u8>>,
    lt: Option<Vec<u8>>,
}

impl Bounds {
    /// Creates empty bounds (an unbounded walk).
    pub const fn new() -> Self {
        Self { gte: None, gt: None, lte: None, lt: None }
    }

    /// Keys greater than or equal to `key`.
    pub fn gte(mut self, key: &(impl Slice + ?Sized)) -> Self {
        self.gte = Some(key.to_bytes());
        self
    }

    /// Keys strictly greater than `key`.
    pub fn gt(mut self, key: &(impl Slice + ?Sized)) -> Self {
        self.gt = Some(key.to_bytes());
        self
    }

    /// Keys less than or equal to `key`.
    pub fn lte(mut self, key: &(impl Slice + ?Sized)) -> Self {
        self.lte = Some(key.to_bytes());
        self
    }

    /// Keys strictly less than `key`.
    pub fn lt(mut self, key: &(impl Slice + ?Sized)) -> Self {
        self.lt = Some(key.to_bytes());
        self
    }
}

/// An immutable specification of one range scan over one database.
///
/// Holds the resolved start/end bounds, their inclusivity, and the walk
/// direction. Construction never fails; a malformed range (start past end
/// for its direction) is only detected during the walk, by yielding zero
/// items.
#[derive(Clone, Debug)]
pub struct Query {
    database: Database,
    start: Option<Vec<u8>>,
    end: Option<Vec<u8>>,
    start_inclusive: bool,
    end_inclusive: bool,
    reversed: bool,
}

impl Query {
    /// Creates a query from plain start/end keys, both inclusive.
    pub fn span<S: Slice + ?Sized>(
        database: &Database,
        start: Option<&S>,
        end: Option<&S>,
        reversed: bool,
    ) -> Self {
        Self {
            database: database.clone(),
            start: start.map(|s| s.to_bytes()),
            end: end.map(|e| e.to_bytes()),
            start_inclusive: true,
            end_inclusive: true,
            reversed,
        }
    }

    /// Creates a query from precise [`Bounds`].
    ///
    /// Resolution prefers the inclusive form on each side, and records
    /// whether the inclusive form was the one supplied.
    pub fn bounded(database: &Database, bounds: &Bounds, reversed: bool) -> Self {
        let start_inclusive = bounds.gte.is_some();
        let end_inclusive = bounds.lte.is_some();
        Self {
            database: database.clone(),
            start: bounds.gte.clone().or_else(|| bounds.gt.clone()),
            end: bounds.lte.clone().or_else(|| bounds.lt.clone()),
            start_inclusive,
            end_inclusive,
            reversed,
        }
    }

    /// The database this query scans.
    pub const fn database(&self) -> &Database {
        &self.database
    }

    /// The bound nearer the beginning of the walk, if any.
    pub fn start(&self) -> Option<&[u8]> {
        self.start.as_deref()
    }

    /// The bound at the far end of the walk, if any.
    pub fn end(&self) -> Option<&[u8]> {
        self.end.as_deref()
    }

    /// Whether the start bound includes the key equal to it.
    pub const fn start_inclusive(&self) -> bool {
        self.start_inclusive
    }

    /// Whether the end bound includes the key equal to it.
    pub const fn end_inclusive(&self) -> bool {
        self.end_inclusive
    }

    /// Whether the walk runs from high keys to low keys.
    pub const fn reversed(&self) -> bool {
        self.reversed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Environment, EnvironmentArguments};

    fn test_db() -> (tempfile::TempDir, Database) {
        let dir = tempfile::tempdir().unwrap();
        let env = Environment::open(dir.path(), EnvironmentArguments::new()).unwrap();
        let db = Database::create(&env, "query_tests").unwrap();
        (dir, db)
    }

    #[test]
    fn span_is_inclusive_on_both_sides() {
        let (_dir, db) = test_db();
        let q = Query::span(&db, Some("a"), Some("z"), false);
        assert_eq!(q.start(), Some(b"a".as_slice()));
        assert_eq!(q.end(), Some(b"z".as_slice()));
        assert!(q.start_inclusive());
        assert!(q.end_inclusive());
        assert!(!q.reversed());
    }

    #[test]
    fn inclusive_form_wins_on_each_side() {
        let (_dir, db) = test_db();
        let bounds = Bounds::new().gte("b").gt("a").lte("x").lt("y");
        let q = Query::bounded(&db, &bounds, false);
        assert_eq!(q.start(), Some(b"b".as_slice()));
        assert_eq!(q.end(), Some(b"x".as_slice()));
        assert!(q.start_inclusive());
        assert!(q.end_inclusive());
    }

    #[test]
    fn exclusive_bounds_are_recorded_as_exclusive() {
        let (_dir, db) = test_db();
        let q = Query::bounded(&db, &Bounds::new().gt("a").lt("y"), true);
        assert_eq!(q.start(), Some(b"a".as_slice()));
        assert_eq!(q.end(), Some(b"y".as_slice()));
        assert!(!q.start_inclusive());
        assert!(!q.end_inclusive());
        assert!(q.reversed());
    }

    #[test]
    fn missing_bounds_resolve_to_none() {
        let (_dir, db) = test_db();
        let q = Query::bounded(&db, &Bounds::new(), false);
        assert_eq!(q.start(), None);
        assert_eq!(q.end(), None);
        assert!(!q.start_inclusive());
        assert!(!q.end_inclusive());
    }
}
