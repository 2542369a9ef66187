use std::num::NonZeroUsize;

use crate::pager::DataPager;

/// Slicing policy for a [`DataPager`].
///
/// Any `Fn(&[T], total_count, current_page, page_size) -> Vec<T>` closure is a visitor too.
pub trait PageDataVisitor<T> {
    fn get_result(&self, data: &[T], total_count: usize, current_page: usize, page_size: NonZeroUsize) -> Vec<T>;

    fn visit_data_pager(&self, pager: &mut DataPager<T>) {
        let page = pager.page(self);
        pager.on_result(page);
    }
}

impl<T, F> PageDataVisitor<T> for F
where
    F: Fn(&[T], usize, usize, NonZeroUsize) -> Vec<T>,
{
    fn get_result(&self, data: &[T], total_count: usize, current_page: usize, page_size: NonZeroUsize) -> Vec<T> {
        self(data, total_count, current_page, page_size)
    }
}

/// Equal-size pages: page `p` holds items `[p * size, min(total, (p + 1) * size))`, and is empty past the end.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultPageDataVisitor;

impl<T> PageDataVisitor<T> for DefaultPageDataVisitor
where
    T: Clone,
{
    fn get_result(&self, data: &[T], total_count: usize, current_page: usize, page_size: NonZeroUsize) -> Vec<T> {
        let end_of_data = total_count.min(data.len());
        let start = current_page.saturating_mul(page_size.get());
        if start >= end_of_data {
            return Vec::new();
        }
        let end = start.saturating_add(page_size.get()).min(end_of_data);
        data[start..end].to_vec()
    }
}
