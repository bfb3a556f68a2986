//! Compiled predicates and store-side scan filtering
//!
//! A [`Predicate`] is a small interpreter over rows. Evaluation yields a
//! [`Verdict`]; `Halt` ends the whole scan rather than skipping one row.

use std::fmt;

use bytes::Bytes;

use crate::error::Result;
use crate::store::Row;

/// Comparison operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Equal,
    NotEqual,
}

/// Outcome of evaluating a predicate against one row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Row matches
    Pass,
    /// Row does not match; keep scanning
    Reject,
    /// Row does not match and no later row can; stop the scan
    Halt,
}

/// A compiled predicate
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// Compare one cell's encoded value; rows without the cell are rejected
    Column {
        family: String,
        qualifier: String,
        op: CompareOp,
        value: Bytes,
    },
    /// Every child must pass
    All(Vec<Predicate>),
    /// At least one child must pass
    Any(Vec<Predicate>),
    /// Scan continues only while the child keeps matching
    WhileMatch(Box<Predicate>),
}

impl Predicate {
    /// Evaluate against one row
    pub fn evaluate(&self, row: &Row) -> Verdict {
        match self {
            Predicate::Column {
                family,
                qualifier,
                op,
                value,
            } => {
                let matched = match row.value(family, qualifier) {
                    None => return Verdict::Reject,
                    Some(stored) => match op {
                        CompareOp::Equal => stored == value,
                        CompareOp::NotEqual => stored != value,
                    },
                };
                if matched {
                    Verdict::Pass
                } else {
                    Verdict::Reject
                }
            }
            Predicate::All(children) => {
                // A halting child wins even after an earlier rejection
                let mut verdict = Verdict::Pass;
                for child in children {
                    match child.evaluate(row) {
                        Verdict::Halt => return Verdict::Halt,
                        Verdict::Reject => verdict = Verdict::Reject,
                        Verdict::Pass => {}
                    }
                }
                verdict
            }
            Predicate::Any(children) => {
                if children.is_empty() {
                    return Verdict::Pass;
                }
                let mut halted = 0;
                for child in children {
                    match child.evaluate(row) {
                        Verdict::Pass => return Verdict::Pass,
                        Verdict::Halt => halted += 1,
                        Verdict::Reject => {}
                    }
                }
                if halted == children.len() {
                    Verdict::Halt
                } else {
                    Verdict::Reject
                }
            }
            Predicate::WhileMatch(child) => match child.evaluate(row) {
                Verdict::Pass => Verdict::Pass,
                Verdict::Reject | Verdict::Halt => Verdict::Halt,
            },
        }
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Predicate::Column {
                family,
                qualifier,
                op,
                ..
            } => write!(f, "{}:{} {:?}", family, qualifier, op),
            Predicate::All(children) => write!(f, "All({})", children.len()),
            Predicate::Any(children) => write!(f, "Any({})", children.len()),
            Predicate::WhileMatch(child) => write!(f, "WhileMatch({})", child),
        }
    }
}

// =============================================================================
// Scan filter
// =============================================================================

/// Store-side filter: an optional predicate composed with a page limit
///
/// The limit counts rows that passed the predicate; once reached the scan
/// ends without examining further rows.
#[derive(Debug, Clone, Default)]
pub struct ScanFilter {
    predicate: Option<Predicate>,
    page_limit: Option<usize>,
    passed: usize,
}

impl ScanFilter {
    pub fn new(predicate: Option<Predicate>, page_limit: Option<usize>) -> Self {
        Self {
            predicate,
            page_limit,
            passed: 0,
        }
    }

    pub fn predicate(&self) -> Option<&Predicate> {
        self.predicate.as_ref()
    }

    pub fn page_limit(&self) -> Option<usize> {
        self.page_limit
    }

    /// True once the page limit has been reached
    pub fn exhausted(&self) -> bool {
        matches!(self.page_limit, Some(limit) if self.passed >= limit)
    }

    /// Check one row, counting it toward the page limit when it passes
    pub fn check(&mut self, row: &Row) -> Verdict {
        if self.exhausted() {
            return Verdict::Halt;
        }
        let verdict = match &self.predicate {
            Some(predicate) => predicate.evaluate(row),
            None => Verdict::Pass,
        };
        if verdict == Verdict::Pass {
            self.passed += 1;
        }
        verdict
    }
}

/// Applies a [`ScanFilter`] to a row iterator
///
/// Stores call this from `Table::scan` so filtering happens before rows
/// leave the store.
pub struct FilteredRows<I> {
    inner: I,
    filter: Option<ScanFilter>,
    done: bool,
}

impl<I> FilteredRows<I>
where
    I: Iterator<Item = Result<Row>>,
{
    pub fn new(inner: I, filter: Option<ScanFilter>) -> Self {
        Self {
            inner,
            filter,
            done: false,
        }
    }
}

impl<I> Iterator for FilteredRows<I>
where
    I: Iterator<Item = Result<Row>>,
{
    type Item = Result<Row>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.done {
                return None;
            }
            if self.filter.as_ref().is_some_and(ScanFilter::exhausted) {
                self.done = true;
                return None;
            }

            let row = match self.inner.next()? {
                Ok(row) => row,
                Err(e) => return Some(Err(e)),
            };

            let verdict = match self.filter.as_mut() {
                Some(filter) => filter.check(&row),
                None => Verdict::Pass,
            };
            match verdict {
                Verdict::Pass => return Some(Ok(row)),
                Verdict::Reject => continue,
                Verdict::Halt => {
                    self.done = true;
                    return None;
                }
            }
        }
    }
}
