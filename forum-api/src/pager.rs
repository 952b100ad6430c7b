/// What a pager entry stands for
#[derive(Clone, Copy, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub enum PageFlag {
    /// First page, shown before a gap
    First,

    /// Last page, shown after a gap
    Last,

    /// Currently selected page
    Selected,

    /// Any other page
    Number,
}

/// Page number listing of the form
///
/// ```text
/// [1]  2  3  4  5  6  7  8  9  10  ...  123
/// 1  ...  53  54  55  56  57  [58]  59  60  61  62  ...  123
/// 1  ...  113  114  115  116  117  118  119  120  121  122  [123]
/// ```
///
/// `length` is the number of pages, `width` the number of consecutive page
/// numbers shown, first and last excluded. Pages are numbered from 1.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Pager {
    pub length: usize,
    pub selected: usize,
    pub width: usize,
}

impl Pager {
    pub const DEFAULT_WIDTH: usize = 10;

    pub fn new(length: usize, selected: usize) -> Pager {
        Pager {
            length,
            selected,
            width: Self::DEFAULT_WIDTH,
        }
    }

    pub fn with_width(self, width: usize) -> Pager {
        Pager { width, ..self }
    }

    /// Pager over `total` items shown `limit` at a time, skipping `offset`
    pub fn for_offset(total: usize, offset: usize, limit: usize) -> Pager {
        let limit = std::cmp::max(limit, 1);
        let length = total / limit + usize::from(total % limit != 0);
        Pager::new(length, (offset / limit).saturating_add(1))
    }

    pub fn iter(&self) -> PagerIter {
        let half = self.width / 2;
        let (first, start) = if self.length > self.width && self.selected > half + 2 {
            let start = if self.selected.saturating_add(half) >= self.length {
                self.length - self.width + 1
            } else {
                self.selected - half
            };
            (true, start)
        } else {
            (false, 1)
        };
        let end = std::cmp::min(
            start.saturating_add(self.width),
            self.length.saturating_add(1),
        );
        PagerIter {
            first,
            next: start,
            end,
            selected: self.selected,
            last: std::cmp::max(self.selected, end) <= self.length,
            length: self.length,
        }
    }
}

impl IntoIterator for Pager {
    type Item = (PageFlag, usize);
    type IntoIter = PagerIter;

    fn into_iter(self) -> PagerIter {
        self.iter()
    }
}

pub struct PagerIter {
    first: bool,
    next: usize,
    end: usize,
    selected: usize,
    last: bool,
    length: usize,
}

impl Iterator for PagerIter {
    type Item = (PageFlag, usize);

    fn next(&mut self) -> Option<(PageFlag, usize)> {
        if std::mem::replace(&mut self.first, false) {
            return Some((PageFlag::First, 1));
        }
        if self.next < self.end {
            let page = self.next;
            self.next += 1;
            let flag = match page == self.selected {
                true => PageFlag::Selected,
                false => PageFlag::Number,
            };
            return Some((flag, page));
        }
        if std::mem::replace(&mut self.last, false) {
            return Some((PageFlag::Last, self.length));
        }
        None
    }
}
