//! Cache key definitions
//!
//! Keys for rendered grid pages and for the shared page/photo counts used to
//! validate them.

/// Cache key for one rendered page at one page size
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PageKey {
    pub page_number: u32,
    pub page_size: u32,
}

impl PageKey {
    pub fn new(page_number: u32, page_size: u32) -> Self {
        Self {
            page_number,
            page_size,
        }
    }

    /// Convert to storage key string
    /// Format: namespace:page:number:size
    pub fn to_storage_key(&self, namespace: &str) -> String {
        format!("{}:page:{}:{}", namespace, self.page_number, self.page_size)
    }
}

/// Storage key for the expected page count at last fetch
pub fn page_count_key(namespace: &str) -> String {
    format!("{}:pages", namespace)
}

/// Storage key for the total photo count at last fetch
pub fn photo_count_key(namespace: &str) -> String {
    format!("{}:photos", namespace)
}
