//! Bounded page exchange between pipelines, with backpressure expressed
//! through blocked signals on both sides.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

use futures::channel::oneshot;

use veloq_common::{EngineConfig, Result, VeloqError};
use veloq_data::Page;

use crate::operator::Operator;
use crate::signal::Blocked;

/// Capacity-bounded page queue shared between a producing sink operator
/// and a consuming source operator (or an external drain). Producers are
/// blocked while full; consumers are blocked while empty and unfinished.
#[derive(Clone)]
pub struct PageBuffer {
    inner: Arc<Mutex<BufferInner>>,
    capacity: usize,
}

struct BufferInner {
    pages: VecDeque<Page>,
    finished: bool,
    space_waiters: Vec<oneshot::Sender<()>>,
    page_waiters: Vec<oneshot::Sender<()>>,
}

impl PageBuffer {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            inner: Arc::new(Mutex::new(BufferInner {
                pages: VecDeque::new(),
                finished: false,
                space_waiters: Vec::new(),
                page_waiters: Vec::new(),
            })),
            capacity: capacity.max(1),
        }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::with_capacity(config.page_buffer_capacity)
    }

    fn lock(&self) -> MutexGuard<'_, BufferInner> {
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    pub fn len(&self) -> usize {
        self.lock().pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().pages.is_empty()
    }

    pub fn is_full(&self) -> bool {
        let inner = self.lock();
        inner.pages.len() >= self.capacity
    }

    /// Producer finished and every page was drained.
    pub fn is_finished(&self) -> bool {
        let inner = self.lock();
        inner.finished && inner.pages.is_empty()
    }

    pub fn push(&self, page: Page) -> Result<()> {
        let mut inner = self.lock();
        if inner.finished {
            return Err(VeloqError::IllegalState(
                "page buffer is finished".to_string(),
            ));
        }
        if inner.pages.len() >= self.capacity {
            return Err(VeloqError::IllegalState("page buffer is full".to_string()));
        }
        inner.pages.push_back(page);
        for waiter in inner.page_waiters.drain(..) {
            let _ = waiter.send(());
        }
        Ok(())
    }

    pub fn pop(&self) -> Option<Page> {
        let mut inner = self.lock();
        let page = inner.pages.pop_front();
        if page.is_some() {
            for waiter in inner.space_waiters.drain(..) {
                let _ = waiter.send(());
            }
        }
        page
    }

    pub fn finish(&self) {
        let mut inner = self.lock();
        inner.finished = true;
        for waiter in inner.space_waiters.drain(..) {
            let _ = waiter.send(());
        }
        for waiter in inner.page_waiters.drain(..) {
            let _ = waiter.send(());
        }
    }

    /// Resolves when capacity frees up (or the buffer is finished).
    pub fn space_blocked(&self) -> Blocked {
        let mut inner = self.lock();
        if inner.pages.len() < self.capacity || inner.finished {
            return Blocked::ready();
        }
        let (tx, rx) = oneshot::channel();
        inner.space_waiters.push(tx);
        Blocked::from_future(async move {
            let _ = rx.await;
        })
    }

    /// Resolves when a page arrives (or the producer finishes).
    pub fn pages_blocked(&self) -> Blocked {
        let mut inner = self.lock();
        if !inner.pages.is_empty() || inner.finished {
            return Blocked::ready();
        }
        let (tx, rx) = oneshot::channel();
        inner.page_waiters.push(tx);
        Blocked::from_future(async move {
            let _ = rx.await;
        })
    }
}

/// Terminal operator feeding a [`PageBuffer`]; applies backpressure by
/// blocking while the buffer is full.
pub struct PageBufferSinkOperator {
    buffer: PageBuffer,
    finished: bool,
}

impl PageBufferSinkOperator {
    pub fn new(buffer: PageBuffer) -> Self {
        Self {
            buffer,
            finished: false,
        }
    }
}

impl Operator for PageBufferSinkOperator {
    fn name(&self) -> &'static str {
        "PageBufferSinkOperator"
    }

    fn needs_input(&self) -> bool {
        !self.finished && !self.buffer.is_full()
    }

    fn add_input(&mut self, page: Page) -> Result<()> {
        if !self.needs_input() {
            return Err(VeloqError::IllegalState(
                "PageBufferSinkOperator cannot accept input".to_string(),
            ));
        }
        self.buffer.push(page)
    }

    fn output(&mut self) -> Result<Option<Page>> {
        Ok(None)
    }

    fn blocked(&self) -> Blocked {
        if self.finished {
            Blocked::ready()
        } else {
            self.buffer.space_blocked()
        }
    }

    fn is_finished(&self) -> bool {
        self.finished
    }

    fn finish(&mut self) -> Result<()> {
        if !self.finished {
            self.buffer.finish();
            self.finished = true;
        }
        Ok(())
    }
}

/// Source operator draining a [`PageBuffer`] filled by another pipeline.
pub struct PageBufferSourceOperator {
    buffer: PageBuffer,
    closed: bool,
}

impl PageBufferSourceOperator {
    pub fn new(buffer: PageBuffer) -> Self {
        Self {
            buffer,
            closed: false,
        }
    }
}

impl Operator for PageBufferSourceOperator {
    fn name(&self) -> &'static str {
        "PageBufferSourceOperator"
    }

    fn needs_input(&self) -> bool {
        false
    }

    fn add_input(&mut self, _page: Page) -> Result<()> {
        Err(VeloqError::IllegalState(
            "PageBufferSourceOperator accepts no input".to_string(),
        ))
    }

    fn output(&mut self) -> Result<Option<Page>> {
        if self.closed {
            return Ok(None);
        }
        Ok(self.buffer.pop())
    }

    fn blocked(&self) -> Blocked {
        if self.closed {
            Blocked::ready()
        } else {
            self.buffer.pages_blocked()
        }
    }

    fn is_finished(&self) -> bool {
        self.closed || self.buffer.is_finished()
    }

    fn finish(&mut self) -> Result<()> {
        self.closed = true;
        Ok(())
    }
}
