//! Page window arithmetic
//!
//! Pure functions deciding which page a view shows after a mutation or a
//! navigation request, plus the sort state of the winners table and the
//! json-server query pairs for both listings.

use crate::types::{SortKey, SortOrder};

/// First page of every listing
pub const FIRST_PAGE: u32 = 1;

/// What just happened to the listing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PageAction {
    Add,
    Update,
    Delete,
    Next,
    Prev,
    Refresh,
}

// ----------------------------------------------------------------------------
// Page Policy
// ----------------------------------------------------------------------------

/// Page selection rules for a listing with a fixed page size
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PagePolicy {
    page_size: u32,
}

impl PagePolicy {
    /// A zero page size is treated as one.
    pub fn new(page_size: u32) -> Self {
        Self {
            page_size: page_size.max(1),
        }
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    /// Last page for `total_count` items, never below the first page.
    pub fn last_page(&self, total_count: u32) -> u32 {
        total_count.div_ceil(self.page_size).max(FIRST_PAGE)
    }

    pub fn clamp(&self, page: u32, total_count: u32) -> u32 {
        page.clamp(FIRST_PAGE, self.last_page(total_count))
    }

    /// Page to show after `action`.
    ///
    /// For `Add`, `total_count` is the count after the add and `items_on_page`
    /// the count shown before it. For `Delete`, `items_on_page` is the count
    /// shown before the deletion.
    pub fn next_page(
        &self,
        current: u32,
        total_count: u32,
        items_on_page: u32,
        action: PageAction,
    ) -> u32 {
        let last = self.last_page(total_count);
        let page = match action {
            PageAction::Update | PageAction::Refresh => current,
            PageAction::Add if items_on_page.saturating_add(1) >= self.page_size => last,
            PageAction::Add => current,
            PageAction::Delete if items_on_page <= 1 => current.saturating_sub(1),
            PageAction::Delete => current,
            PageAction::Next if current < last => current + 1,
            PageAction::Next => current,
            PageAction::Prev if current > FIRST_PAGE => current - 1,
            PageAction::Prev => current,
        };
        self.clamp(page, total_count)
    }
}

// ----------------------------------------------------------------------------
// Winners Sorting
// ----------------------------------------------------------------------------

/// Sort key and direction of the winners table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SortState {
    pub key: SortKey,
    pub order: SortOrder,
}

impl SortState {
    /// Select `key` and flip the direction.
    ///
    /// The direction is shared by both columns, so switching columns flips it
    /// as well.
    pub fn toggle(&mut self, key: SortKey) {
        self.key = key;
        self.order = self.order.flipped();
    }
}

// ----------------------------------------------------------------------------
// Query Builders
// ----------------------------------------------------------------------------

/// Query of one winners page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WinnersQuery {
    pub page: u32,
    pub limit: u32,
    pub sort: SortKey,
    pub order: SortOrder,
}

impl WinnersQuery {
    pub fn new(page: u32, limit: u32, sort: SortState) -> Self {
        Self {
            page,
            limit,
            sort: sort.key,
            order: sort.order,
        }
    }

    /// `_page`, `_limit`, `_sort` and `_order` query pairs.
    pub fn to_pairs(&self) -> Vec<(&'static str, String)> {
        vec![
            ("_page", self.page.to_string()),
            ("_limit", self.limit.to_string()),
            ("_sort", self.sort.as_str().to_string()),
            ("_order", self.order.as_str().to_string()),
        ]
    }
}

/// `_page` and `_limit` query pairs of a garage page.
pub fn garage_query(page: u32, limit: u32) -> Vec<(&'static str, String)> {
    vec![("_page", page.to_string()), ("_limit", limit.to_string())]
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_last_page() {
        let policy = PagePolicy::new(7);
        assert_eq!(policy.last_page(0), 1);
        assert_eq!(policy.last_page(7), 1);
        assert_eq!(policy.last_page(8), 2);
        assert_eq!(policy.last_page(21), 3);
    }

    #[test]
    fn test_update_and_refresh_keep_page() {
        let policy = PagePolicy::new(7);
        assert_eq!(policy.next_page(2, 10, 3, PageAction::Update), 2);
        assert_eq!(policy.next_page(2, 10, 3, PageAction::Refresh), 2);
    }

    #[test]
    fn test_add_filling_page_jumps_to_last() {
        let policy = PagePolicy::new(7);
        // page 1 showed 6 cars, the add made it 7
        assert_eq!(policy.next_page(1, 7, 6, PageAction::Add), 1);
        // page 1 full, new car lands on page 2
        assert_eq!(policy.next_page(1, 8, 7, PageAction::Add), 2);
        // room left on the page, stay
        assert_eq!(policy.next_page(1, 4, 3, PageAction::Add), 1);
    }

    #[test]
    fn test_delete_last_item_steps_back() {
        let policy = PagePolicy::new(7);
        assert_eq!(policy.next_page(3, 14, 1, PageAction::Delete), 2);
        assert_eq!(policy.next_page(3, 16, 2, PageAction::Delete), 3);
        assert_eq!(policy.next_page(1, 0, 1, PageAction::Delete), 1);
    }

    #[test]
    fn test_navigation_bounds() {
        let policy = PagePolicy::new(7);
        assert_eq!(policy.next_page(1, 15, 7, PageAction::Next), 2);
        assert_eq!(policy.next_page(3, 15, 1, PageAction::Next), 3);
        assert_eq!(policy.next_page(1, 15, 7, PageAction::Prev), 1);
        assert_eq!(policy.next_page(2, 15, 7, PageAction::Prev), 1);
        assert_eq!(policy.next_page(1, 0, 0, PageAction::Next), 1);
    }

    #[test]
    fn test_stale_page_is_clamped() {
        let policy = PagePolicy::new(7);
        assert_eq!(policy.next_page(5, 8, 0, PageAction::Refresh), 2);
    }

    #[test]
    fn test_sort_toggle_always_flips() {
        let mut sort = SortState::default();
        assert_eq!((sort.key, sort.order), (SortKey::Wins, SortOrder::Desc));

        sort.toggle(SortKey::Wins);
        sort.toggle(SortKey::Wins);
        assert_eq!(sort.order, SortOrder::Desc);

        // switching columns flips too, which users may not expect
        sort.toggle(SortKey::Wins);
        sort.toggle(SortKey::Time);
        assert_eq!((sort.key, sort.order), (SortKey::Time, SortOrder::Desc));
    }

    #[test]
    fn test_query_pairs() {
        assert_eq!(
            garage_query(2, 7),
            vec![("_page", "2".to_string()), ("_limit", "7".to_string())]
        );
        let query = WinnersQuery::new(1, 10, SortState::default());
        assert_eq!(
            query.to_pairs(),
            vec![
                ("_page", "1".to_string()),
                ("_limit", "10".to_string()),
                ("_sort", "wins".to_string()),
                ("_order", "desc".to_string()),
            ]
        );
    }

    proptest! {
        #[test]
        fn prop_page_stays_in_range(
            page_size in 1u32..20,
            ops in proptest::collection::vec(any::<bool>(), 0..200),
        ) {
            let policy = PagePolicy::new(page_size);
            let mut total = 0u32;
            let mut page = FIRST_PAGE;

            for add in ops {
                let on_page = total
                    .saturating_sub((page - 1) * page_size)
                    .min(page_size);
                if add {
                    total += 1;
                    page = policy.next_page(page, total, on_page, PageAction::Add);
                } else if total > 0 && on_page > 0 {
                    total -= 1;
                    page = policy.next_page(page, total, on_page, PageAction::Delete);
                }
                prop_assert!(page >= FIRST_PAGE);
                prop_assert!(page <= policy.last_page(total));
            }
        }

        #[test]
        fn prop_deleting_only_item_steps_back_once(
            page_size in 1u32..20,
            page in 2u32..50,
        ) {
            let policy = PagePolicy::new(page_size);
            // the page held exactly one item, which is now gone
            let total = (page - 1) * page_size;
            prop_assert_eq!(policy.next_page(page, total, 1, PageAction::Delete), page - 1);
        }

        #[test]
        fn prop_filling_add_lands_on_last_page(
            page_size in 1u32..20,
            full_pages in 0u32..50,
        ) {
            let policy = PagePolicy::new(page_size);
            let total = (full_pages + 1) * page_size;
            let page = full_pages + 1;
            let expected = total.div_ceil(page_size);
            prop_assert_eq!(
                policy.next_page(page, total, page_size - 1, PageAction::Add),
                expected
            );
        }
    }
}
