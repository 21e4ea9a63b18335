use crate::{
    db::executor::ExecutionError,
    value::{Document, FromDocument},
};
use std::{fmt, marker::PhantomData};

type RowIter = Box<dyn Iterator<Item = Result<Document, ExecutionError>> + Send>;
type CloseHook = Box<dyn FnOnce() + Send>;

///
/// Cursor
///
/// Lazy, finite, forward-only query result. Closing (explicitly or by
/// drop) releases the backend rows and runs the adapter's close hook once.
///

pub struct Cursor {
    rows: Option<RowIter>,
    on_close: Option<CloseHook>,
}

impl Cursor {
    pub fn new<I>(rows: I) -> Self
    where
        I: Iterator<Item = Result<Document, ExecutionError>> + Send + 'static,
    {
        Self {
            rows: Some(Box::new(rows)),
            on_close: None,
        }
    }

    #[must_use]
    pub fn from_documents(documents: Vec<Document>) -> Self {
        Self::new(documents.into_iter().map(Ok))
    }

    #[must_use]
    pub fn empty() -> Self {
        Self::from_documents(Vec::new())
    }

    /// Run `hook` when the cursor is closed or dropped.
    #[must_use]
    pub fn with_close_hook(mut self, hook: impl FnOnce() + Send + 'static) -> Self {
        self.on_close = Some(Box::new(hook));
        self
    }

    #[must_use]
    pub const fn is_closed(&self) -> bool {
        self.rows.is_none()
    }

    /// Release backend resources. Idempotent.
    pub fn close(&mut self) {
        self.rows = None;
        if let Some(hook) = self.on_close.take() {
            hook();
        }
    }

    /// Drain the remaining rows, stopping at the first error.
    pub fn collect_documents(mut self) -> Result<Vec<Document>, ExecutionError> {
        let rows: Result<Vec<_>, _> = self.by_ref().collect();
        self.close();

        rows
    }

    /// Decode every row into `T`.
    #[must_use]
    pub fn typed<T: FromDocument>(self) -> TypedCursor<T> {
        TypedCursor {
            inner: self,
            _marker: PhantomData,
        }
    }
}

impl Iterator for Cursor {
    type Item = Result<Document, ExecutionError>;

    fn next(&mut self) -> Option<Self::Item> {
        let row = self.rows.as_mut()?.next();
        if row.is_none() {
            self.close();
        }

        row
    }
}

impl Drop for Cursor {
    fn drop(&mut self) {
        self.close();
    }
}

impl fmt::Debug for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cursor")
            .field("closed", &self.is_closed())
            .finish_non_exhaustive()
    }
}

///
/// TypedCursor
///

pub struct TypedCursor<T> {
    inner: Cursor,
    _marker: PhantomData<fn() -> T>,
}

impl<T> TypedCursor<T> {
    pub fn close(&mut self) {
        self.inner.close();
    }
}

impl<T: FromDocument> Iterator for TypedCursor<T> {
    type Item = Result<T, ExecutionError>;

    fn next(&mut self) -> Option<Self::Item> {
        let row = self.inner.next()?;

        Some(row.and_then(|document| Ok(T::from_document(&document)?)))
    }
}

impl<T> fmt::Debug for TypedCursor<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypedCursor")
            .field("inner", &self.inner)
            .finish()
    }
}
