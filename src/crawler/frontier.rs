//! Crawl frontier: a LIFO worklist plus the visited set
//!
//! The stack gives depth-first order; siblings come off in reverse order of
//! discovery. A URL may sit on the stack more than once (pushed from two pages
//! before either copy is popped), so callers must check
//! `mark_visited_and_proceed` right after `pop` and skip on `false`.

use crate::url::{CanonicalUrl, LinkKind};
use std::collections::HashSet;

/// What `Frontier::offer` did with a link
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Offer {
    /// A page, pushed for a later visit
    Queued,
    /// A file seen for the first time; now marked visited, the caller downloads it
    Download,
    /// Already visited; nothing to do
    Skipped,
}

/// LIFO worklist of canonical URLs and the set already visited
#[derive(Debug, Default)]
pub struct Frontier {
    stack: Vec<CanonicalUrl>,
    visited: HashSet<CanonicalUrl>,
}

impl Frontier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pushes the crawl's starting URL
    pub fn seed(&mut self, url: CanonicalUrl) {
        self.stack.push(url);
    }

    /// Pops the most recently pushed URL
    pub fn pop(&mut self) -> Option<CanonicalUrl> {
        self.stack.pop()
    }

    /// Marks `url` visited; returns false if it already was
    pub fn mark_visited_and_proceed(&mut self, url: &CanonicalUrl) -> bool {
        self.visited.insert(url.clone())
    }

    /// Offers a discovered link
    ///
    /// Pages not yet visited are pushed. Files are terminal: they are marked
    /// visited on the spot and never pushed.
    pub fn offer(&mut self, url: CanonicalUrl, kind: LinkKind) -> Offer {
        if self.visited.contains(&url) {
            return Offer::Skipped;
        }

        match kind {
            LinkKind::File => {
                self.visited.insert(url);
                Offer::Download
            }
            LinkKind::Page => {
                self.stack.push(url);
                Offer::Queued
            }
        }
    }

    /// Number of URLs waiting on the stack (duplicates included)
    pub fn len(&self) -> usize {
        self.stack.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stack.is_empty()
    }

    pub fn visited_count(&self) -> usize {
        self.visited.len()
    }
}
