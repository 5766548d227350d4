use serde::Serialize;

/// Result of resolving a requested page number against a collection.
#[derive(Debug, PartialEq, Eq)]
pub enum PageLookup {
    Page(usize),
    /// Requested page is past the end; carries the last page.
    OutOfRange { last: usize },
}

#[derive(Serialize, Debug)]
pub struct Page<T> {
    pub number: usize,
    pub num_pages: usize,
    pub count: usize,
    pub has_next: bool,
    pub has_previous: bool,
    pub items: Vec<T>,
}

pub struct Paginator<T> {
    items: Vec<T>,
    per_page: usize,
}

impl<T> Paginator<T> {
    pub fn new(items: Vec<T>, per_page: usize) -> Self {
        Self {
            items,
            per_page: per_page.max(1),
        }
    }

    /// Always at least one page, even for an empty collection.
    pub fn num_pages(&self) -> usize {
        self.items.len().div_ceil(self.per_page).max(1)
    }

    /// Missing or non-numeric input resolves to the first page.
    pub fn lookup(&self, requested: Option<&str>) -> PageLookup {
        let number = match requested.and_then(|p| p.trim().parse::<i64>().ok()) {
            Some(n) => n,
            None => return PageLookup::Page(1),
        };
        let num_pages = self.num_pages();
        match usize::try_from(number) {
            Ok(n) if (1..=num_pages).contains(&n) => PageLookup::Page(n),
            _ => PageLookup::OutOfRange { last: num_pages },
        }
    }

    pub fn page(self, number: usize) -> Page<T> {
        let num_pages = self.num_pages();
        let number = number.clamp(1, num_pages);
        let count = self.items.len();
        let items = self
            .items
            .into_iter()
            .skip((number - 1) * self.per_page)
            .take(self.per_page)
            .collect();
        Page {
            number,
            num_pages,
            count,
            has_next: number < num_pages,
            has_previous: number > 1,
            items,
        }
    }
}
