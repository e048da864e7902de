use crate::area::PageViewport;
use crate::error::{RenderError, Result};

/// Retained page viewports, indexed by zero-based page number.
#[derive(Debug, Default)]
pub struct PageViewportStore {
    pages: Vec<PageViewport>,
}

impl PageViewportStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, page: PageViewport) -> usize {
        self.pages.push(page);
        self.pages.len() - 1
    }

    pub fn get(&self, index: usize) -> Result<&PageViewport> {
        self.pages.get(index).ok_or(RenderError::PageOutOfRange {
            index,
            count: self.pages.len(),
        })
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    pub fn clear(&mut self) {
        self.pages.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = &PageViewport> {
        self.pages.iter()
    }
}
