use std::fmt;

/// The active tab of the friends screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum View {
    #[default]
    Connections,
    Requests,
    Add,
}

impl View {
    pub fn all() -> [View; 3] {
        [View::Connections, View::Requests, View::Add]
    }

    pub fn label(&self) -> &'static str {
        match self {
            View::Connections => "Friends",
            View::Requests => "Requests",
            View::Add => "Add",
        }
    }
}

impl fmt::Display for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Search and paging state of the connection list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageState {
    /// Applied query, passed to the service verbatim
    pub query: String,
    /// 1-based
    pub page_number: u32,
    pub page_size: u32,
    pub total_count: u64,
}

impl PageState {
    pub fn new(page_size: u32) -> Self {
        Self {
            query: String::new(),
            page_number: 1,
            page_size: page_size.max(1),
            total_count: 0,
        }
    }

    /// Never less than one, so an empty result still has a page 1
    pub fn total_pages(&self) -> u32 {
        let size = u64::from(self.page_size.max(1));
        let pages = self.total_count.div_ceil(size).max(1);
        u32::try_from(pages).unwrap_or(u32::MAX)
    }

    /// Pull `page_number` into `[1, total_pages]`. Returns true if it moved.
    pub fn clamp_page(&mut self) -> bool {
        let clamped = self.page_number.clamp(1, self.total_pages());
        let moved = clamped != self.page_number;
        self.page_number = clamped;
        moved
    }

    pub fn has_next(&self) -> bool {
        self.page_number < self.total_pages()
    }

    pub fn has_prev(&self) -> bool {
        self.page_number > 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state(total: u64, size: u32, page: u32) -> PageState {
        PageState {
            query: String::new(),
            page_number: page,
            page_size: size,
            total_count: total,
        }
    }

    #[test]
    fn test_total_pages() {
        assert_eq!(state(45, 20, 1).total_pages(), 3);
        assert_eq!(state(40, 20, 1).total_pages(), 2);
        assert_eq!(state(41, 20, 1).total_pages(), 3);
        assert_eq!(state(0, 20, 1).total_pages(), 1);
        assert_eq!(state(1, 20, 1).total_pages(), 1);
    }

    #[test]
    fn test_clamp_page_after_shrink() {
        let mut page = state(40, 20, 3);
        assert!(page.clamp_page());
        assert_eq!(page.page_number, 2);
        assert!(!page.clamp_page());
    }

    #[test]
    fn test_clamp_page_zero() {
        let mut page = state(10, 20, 0);
        assert!(page.clamp_page());
        assert_eq!(page.page_number, 1);
    }

    #[test]
    fn test_next_prev() {
        let page = state(45, 20, 2);
        assert!(page.has_next());
        assert!(page.has_prev());
        assert!(!state(45, 20, 3).has_next());
        assert!(!state(45, 20, 1).has_prev());
    }

    #[test]
    fn test_new_guards_zero_page_size() {
        let page = PageState::new(0);
        assert_eq!(page.page_size, 1);
        assert_eq!(page.page_number, 1);
    }
}
