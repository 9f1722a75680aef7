/// Size of a page in bytes (4 KB)
pub const DEFAULT_PAGE_SIZE: usize = 4096;

/// Default number of pages the buffer pool caches
pub const DEFAULT_BUFFER_POOL_PAGES: usize = 50;

/// Default maximum byte length of a text field
pub const DEFAULT_TEXT_LEN: u16 = 128;

/// Engine-wide tunables, fixed once a `Database` is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    /// Bytes per page, including the occupancy header
    pub page_size: usize,
    /// Maximum number of pages held by the buffer pool
    pub buffer_pool_pages: usize,
}

impl Config {
    /// Returns a copy with the given page size.
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    /// Returns a copy with the given buffer pool capacity.
    pub fn with_buffer_pool_pages(mut self, pages: usize) -> Self {
        self.buffer_pool_pages = pages;
        self
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            buffer_pool_pages: DEFAULT_BUFFER_POOL_PAGES,
        }
    }
}
