// Page-based row storage
// Rows are appended into fixed-capacity pages; a row id encodes (page, slot)

use super::Row;
use serde::{Deserialize, Serialize};

/// A block of rows with a fixed capacity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page {
    pub id: usize,
    pub rows: Vec<Row>,
}

impl Page {
    pub fn new(id: usize) -> Self {
        Self {
            id,
            rows: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Owns the pages of one table
///
/// Rows are only ever appended, so a row id stays valid for the table's lifetime.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageManager {
    pages: Vec<Page>,
    rows_per_page: usize,
}

impl PageManager {
    pub fn new(rows_per_page: usize) -> Self {
        Self {
            pages: Vec::new(),
            rows_per_page: rows_per_page.max(1),
        }
    }

    /// Append a row, opening a new page when the last one is full.
    /// Returns the row id.
    pub fn append(&mut self, row: Row) -> usize {
        let rows_per_page = self.rows_per_page;

        match self.pages.last_mut() {
            Some(page) if page.len() < rows_per_page => {
                page.rows.push(row);
                page.id * rows_per_page + page.len() - 1
            }
            _ => {
                let mut page = Page::new(self.pages.len());
                page.rows.push(row);
                let row_id = page.id * rows_per_page;
                self.pages.push(page);
                row_id
            }
        }
    }

    pub fn get(&self, row_id: usize) -> Option<&Row> {
        let page = self.pages.get(row_id / self.rows_per_page)?;
        page.rows.get(row_id % self.rows_per_page)
    }

    /// All rows with their ids, in insertion order
    pub fn scan(&self) -> impl Iterator<Item = (usize, &Row)> + '_ {
        self.pages.iter().flat_map(move |page| {
            page.rows
                .iter()
                .enumerate()
                .map(move |(slot, row)| (page.id * self.rows_per_page + slot, row))
        })
    }

    pub fn total_rows(&self) -> usize {
        self.pages.iter().map(Page::len).sum()
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Check the layout of pages read back from disk
    pub fn validate(&self) -> Result<(), String> {
        if self.rows_per_page == 0 {
            return Err("rows_per_page must be positive".to_string());
        }
        for (expected, page) in self.pages.iter().enumerate() {
            if page.id != expected {
                return Err(format!("page {} found where page {expected} belongs", page.id));
            }
            if page.len() > self.rows_per_page {
                return Err(format!(
                    "page {} holds {} rows, more than {}",
                    page.id,
                    page.len(),
                    self.rows_per_page
                ));
            }
        }
        Ok(())
    }
}
