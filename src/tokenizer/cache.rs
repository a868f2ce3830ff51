use super::TokenCounter;
use std::cell::{Cell, RefCell};
use std::collections::HashMap;

/// Per-call memo in front of a tokenizer
///
/// Created at the start of one segmentation or optimization run and
/// dropped at its end. Not shared across threads.
pub struct CachedCounter<'a> {
    inner: &'a dyn TokenCounter,
    cache: RefCell<HashMap<String, usize>>,
    hits: Cell<usize>,
    misses: Cell<usize>,
}

impl<'a> CachedCounter<'a> {
    pub fn new(inner: &'a dyn TokenCounter) -> Self {
        Self {
            inner,
            cache: RefCell::new(HashMap::new()),
            hits: Cell::new(0),
            misses: Cell::new(0),
        }
    }

    pub fn hits(&self) -> usize {
        self.hits.get()
    }

    pub fn misses(&self) -> usize {
        self.misses.get()
    }
}

impl TokenCounter for CachedCounter<'_> {
    fn count(&self, text: &str) -> usize {
        if let Some(&n) = self.cache.borrow().get(text) {
            self.hits.set(self.hits.get() + 1);
            return n;
        }

        let n = self.inner.count(text);
        self.misses.set(self.misses.get() + 1);
        self.cache.borrow_mut().insert(text.to_string(), n);
        n
    }
}
