use std::fmt::Debug;
use std::num::NonZeroUsize;
use std::sync::Arc;

use crate::error::Error;
use crate::error::Result;
use crate::visitor::DefaultPageDataVisitor;
use crate::visitor::PageDataVisitor;

pub type PageCallback<T> = Box<dyn FnMut(Vec<T>) + Send>;

/// Pages over a snapshot of a list.
///
/// The pager never advances by itself: [`next_page`](Self::next_page) only tells what the next page would be, the
/// caller decides when to [`set_current_page`](Self::set_current_page). Page numbers start at 0.
pub struct DataPager<T> {
    current_page: usize,
    page_size:    NonZeroUsize,
    data:         Arc<[T]>,
    callback:     Option<PageCallback<T>>,
}

impl<T> DataPager<T> {
    pub fn new(data: Vec<T>) -> Self {
        Self::from_shared(data.into())
    }

    /// Page over data shared with someone else.
    pub fn from_shared(data: Arc<[T]>) -> Self {
        Self {
            current_page: 0,
            page_size: NonZeroUsize::MIN,
            data,
            callback: None,
        }
    }

    /// Same as [`set_page_size`](Self::set_page_size), builder style.
    pub fn with_page_size(mut self, page_size: usize) -> Result<Self> {
        self.set_page_size(page_size)?;
        Ok(self)
    }

    pub fn with_current_page(mut self, current_page: usize) -> Self {
        self.current_page = current_page;
        self
    }

    pub fn current_page(&self) -> usize {
        self.current_page
    }

    pub fn set_current_page(&mut self, current_page: usize) {
        self.current_page = current_page;
    }

    #[inline]
    pub fn next_page(&self) -> usize {
        self.current_page.saturating_add(1)
    }

    pub fn page_size(&self) -> NonZeroUsize {
        self.page_size
    }

    pub fn set_page_size(&mut self, page_size: usize) -> Result<()> {
        self.page_size = NonZeroUsize::new(page_size).ok_or(Error::ZeroPageSize)?;
        Ok(())
    }

    pub fn set_page_callback<F>(&mut self, callback: F)
    where
        F: FnMut(Vec<T>) + Send + 'static,
    {
        self.callback = Some(Box::new(callback));
    }

    pub fn data(&self) -> &[T] {
        &self.data
    }

    pub fn total_count(&self) -> usize {
        self.data.len()
    }

    pub fn page_count(&self) -> usize {
        self.total_count().div_ceil(self.page_size.get())
    }

    pub fn has_next_page(&self) -> bool {
        self.next_page() < self.page_count()
    }

    pub fn accept<V>(&mut self, visitor: &V)
    where
        V: PageDataVisitor<T> + ?Sized,
    {
        visitor.visit_data_pager(self);
    }

    /// Deliver a page to the registered callback.
    pub fn on_result(&mut self, page: Vec<T>) {
        match self.callback.as_mut() {
            Some(callback) => callback(page),
            None => tracing::debug!(
                "page {} of {} items produced with no callback set",
                self.current_page,
                page.len()
            ),
        }
    }

    /// Slice the current page with `visitor` and return it, bypassing the callback.
    pub fn page<V>(&self, visitor: &V) -> Vec<T>
    where
        V: PageDataVisitor<T> + ?Sized,
    {
        visitor.get_result(&self.data, self.total_count(), self.current_page, self.page_size)
    }

    pub fn current(&self) -> Vec<T>
    where
        T: Clone,
    {
        self.page(&DefaultPageDataVisitor)
    }
}

impl<T> Debug for DataPager<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataPager")
            .field("current_page", &self.current_page)
            .field("page_size", &self.page_size)
            .field("total_count", &self.data.len())
            .field("has_callback", &self.callback.is_some())
            .finish()
    }
}
