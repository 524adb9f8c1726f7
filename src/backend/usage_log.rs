//! A selection backend adapter which prints function calls.

use std::{
    io::Write,
    sync::{Arc, Mutex, MutexGuard},
};

use itertools::Itertools;

use crate::hyperslab::HyperslabBlock;

use super::{BackendError, SelectionBackend, SelectionSpaceId};

/// The usage log backend adapter. Logs selection backend method calls.
///
/// It is intended to aid in debugging by revealing the exact sequence of selection calls made while resolving a plan.
///
/// ### Example (log to stdout)
/// ```rust
/// # use std::sync::{Arc, Mutex};
/// # use hyperslabs::backend::{MemoryBackend, UsageLogBackend};
/// let backend = Arc::new(MemoryBackend::new());
/// let log_writer = Arc::new(Mutex::new(std::io::stdout()));
/// let backend = Arc::new(UsageLogBackend::new(backend, log_writer, || {
///     format!("[{:?}] ", std::thread::current().id())
/// }));
/// ```
///
/// Resolving a plan with the above [`UsageLogBackend`] prints outputs like:
/// ```text
/// [ThreadId(1)] create_selection_space([4]) -> Ok(SelectionSpaceId(0))
/// [ThreadId(1)] select_none(0) -> Ok(())
/// [ThreadId(1)] union_blocks(0, [start [0] block [4]]) -> Ok(())
/// [ThreadId(1)] create_selection_space([8]) -> Ok(SelectionSpaceId(1))
/// [ThreadId(1)] select_none(1) -> Ok(())
/// [ThreadId(1)] union_blocks(1, [start [4] block [4]]) -> Ok(())
/// [ThreadId(1)] count_selected(0) -> Ok(4)
/// [ThreadId(1)] count_selected(1) -> Ok(4)
/// ```
pub struct UsageLogBackend<TBackend: ?Sized> {
    backend: Arc<TBackend>,
    handle: Arc<Mutex<dyn Write + Send + Sync>>,
    prefix_func: fn() -> String,
}

impl<TBackend: ?Sized> core::fmt::Debug for UsageLogBackend<TBackend> {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        writeln!(f, "usage log")
    }
}

impl<TBackend: ?Sized> UsageLogBackend<TBackend> {
    /// Create a new usage log backend adapter.
    pub fn new(
        backend: Arc<TBackend>,
        handle: Arc<Mutex<dyn Write + Send + Sync>>,
        prefix_func: fn() -> String,
    ) -> Self {
        Self {
            backend,
            handle,
            prefix_func,
        }
    }

    fn handle(&self) -> Result<MutexGuard<'_, dyn Write + Send + Sync + 'static>, BackendError> {
        self.handle
            .lock()
            .map_err(|_| BackendError::from("usage log handle is poisoned"))
    }
}

impl<TBackend: ?Sized + SelectionBackend> SelectionBackend for UsageLogBackend<TBackend> {
    fn create_selection_space(&self, shape: &[u64]) -> Result<SelectionSpaceId, BackendError> {
        let result = self.backend.create_selection_space(shape);
        writeln!(
            self.handle()?,
            "{}create_selection_space({shape:?}) -> {result:?}",
            (self.prefix_func)()
        )?;
        result
    }

    fn select_none(&self, space: SelectionSpaceId) -> Result<(), BackendError> {
        let result = self.backend.select_none(space);
        writeln!(
            self.handle()?,
            "{}select_none({space}) -> {result:?}",
            (self.prefix_func)()
        )?;
        result
    }

    fn union_blocks(
        &self,
        space: SelectionSpaceId,
        blocks: &[HyperslabBlock],
    ) -> Result<(), BackendError> {
        let result = self.backend.union_blocks(space, blocks);
        writeln!(
            self.handle()?,
            "{}union_blocks({space}, [{}]) -> {result:?}",
            (self.prefix_func)(),
            blocks.iter().format(", ")
        )?;
        result
    }

    fn subtract_blocks(
        &self,
        space: SelectionSpaceId,
        blocks: &[HyperslabBlock],
    ) -> Result<(), BackendError> {
        let result = self.backend.subtract_blocks(space, blocks);
        writeln!(
            self.handle()?,
            "{}subtract_blocks({space}, [{}]) -> {result:?}",
            (self.prefix_func)(),
            blocks.iter().format(", ")
        )?;
        result
    }

    fn count_selected(&self, space: SelectionSpaceId) -> Result<u64, BackendError> {
        let result = self.backend.count_selected(space);
        writeln!(
            self.handle()?,
            "{}count_selected({space}) -> {result:?}",
            (self.prefix_func)()
        )?;
        result
    }

    fn release_selection_space(&self, space: SelectionSpaceId) -> Result<(), BackendError> {
        let result = self.backend.release_selection_space(space);
        writeln!(
            self.handle()?,
            "{}release_selection_space({space}) -> {result:?}",
            (self.prefix_func)()
        )?;
        result
    }
}
