//! Pull rows from a decoder that pushes them.
//!
//! The decoder runs on its own thread and hands rows over through a
//! single-slot mailbox: it blocks until the consumer has taken the previous
//! row, and the consumer blocks until the next row arrives. Closing the
//! iterator cancels the decoder at its next hand-off and joins its thread.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};

use crate::error::{DecodeError, PixelError, Result};
use crate::format::{PixelFormat, Sample};
use crate::iter::{PixelIterator, check_dest};

/// What a decoder announces before its first row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageHeader {
    pub width: usize,
    pub height: usize,
    pub format: PixelFormat,
}

struct State<S> {
    header: Option<ImageHeader>,
    slot: Option<Vec<S>>,
    finished: bool,
    error: Option<DecodeError>,
    closed: bool,
}

struct Shared<S> {
    state: Mutex<State<S>>,
    changed: Condvar,
}

impl<S> Shared<S> {
    fn lock(&self) -> MutexGuard<'_, State<S>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn wait<'a>(&self, guard: MutexGuard<'a, State<S>>) -> MutexGuard<'a, State<S>> {
        self.changed
            .wait(guard)
            .unwrap_or_else(PoisonError::into_inner)
    }
}

/// The decoder's end of a [`ProducerPixelIterator`].
pub struct RowSink<S> {
    shared: Arc<Shared<S>>,
    header: Option<ImageHeader>,
    rows: usize,
}

impl<S: Sample> RowSink<S> {
    /// Announce the image. Must be called exactly once, before any row.
    pub fn start(&mut self, header: ImageHeader) -> Result<()> {
        if self.header.is_some() {
            return Err(PixelError::InvalidLayout(
                "image header delivered twice".to_string(),
            ));
        }
        let mut state = self.shared.lock();
        if state.closed {
            return Err(PixelError::Cancelled);
        }
        state.header = Some(header);
        self.header = Some(header);
        self.shared.changed.notify_all();
        Ok(())
    }

    /// Hand over the next row, waiting until the consumer has taken the
    /// previous one.
    ///
    /// Returns [`PixelError::Cancelled`] once the consumer has closed the
    /// iterator; the decoder should stop and return.
    pub fn push_row(&mut self, row: Vec<S>) -> Result<()> {
        let Some(header) = self.header else {
            return Err(PixelError::InvalidLayout(
                "row delivered before the image header".to_string(),
            ));
        };
        if self.rows >= header.height {
            return Err(PixelError::InvalidLayout(format!(
                "image header declared {} rows",
                header.height
            )));
        }
        let mut state = self.shared.lock();
        while state.slot.is_some() && !state.closed {
            state = self.shared.wait(state);
        }
        if state.closed {
            return Err(PixelError::Cancelled);
        }
        log::trace!("row {} handed over", self.rows);
        state.slot = Some(row);
        self.rows += 1;
        self.shared.changed.notify_all();
        Ok(())
    }

    /// [`push_row`](Self::push_row) with a copy of `row`.
    pub fn push_slice(&mut self, row: &[S]) -> Result<()> {
        self.push_row(row.to_vec())
    }

    pub fn is_cancelled(&self) -> bool {
        self.shared.lock().closed
    }
}

/// Spawns decoders for [`ProducerPixelIterator`].
#[derive(Debug, Clone, Default)]
pub struct ProducerBuilder {
    name: Option<String>,
    stack_size: Option<usize>,
}

impl ProducerBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Name of the decoder thread.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn stack_size(mut self, bytes: usize) -> Self {
        self.stack_size = Some(bytes);
        self
    }

    /// Run `decode` on a new thread and wait for its image header.
    ///
    /// `decode` returning an error, or panicking, fails the iterator. A
    /// [`PixelError::Cancelled`] from the sink is a normal way to stop.
    pub fn spawn<S, F>(self, decode: F) -> Result<ProducerPixelIterator<S>>
    where
        S: Sample,
        F: FnOnce(RowSink<S>) -> Result<()> + Send + 'static,
    {
        let shared = Arc::new(Shared {
            state: Mutex::new(State {
                header: None,
                slot: None,
                finished: false,
                error: None,
                closed: false,
            }),
            changed: Condvar::new(),
        });
        let sink = RowSink {
            shared: Arc::clone(&shared),
            header: None,
            rows: 0,
        };
        let name = self.name.unwrap_or_else(|| "scanrow-producer".to_string());
        let mut builder = thread::Builder::new().name(name.clone());
        if let Some(size) = self.stack_size {
            builder = builder.stack_size(size);
        }
        let thread_shared = Arc::clone(&shared);
        let handle = builder
            .spawn(move || {
                log::debug!("producer thread {name} started");
                let outcome = panic::catch_unwind(AssertUnwindSafe(move || decode(sink)));
                let mut state = thread_shared.lock();
                match outcome {
                    Ok(Ok(()) | Err(PixelError::Cancelled)) => state.finished = true,
                    Ok(Err(PixelError::Decode(e))) => state.error = Some(e),
                    Ok(Err(e)) => state.error = Some(DecodeError::new(e)),
                    Err(payload) => {
                        state.error = Some(DecodeError::new(format!(
                            "decoder panicked: {}",
                            panic_message(payload.as_ref())
                        )))
                    }
                }
                log::debug!(
                    "producer thread {name} finished{}",
                    state
                        .error
                        .as_ref()
                        .map(|e| format!(" with error: {e}"))
                        .unwrap_or_default()
                );
                thread_shared.changed.notify_all();
            })
            .map_err(|e| DecodeError::new(format!("cannot spawn decoder thread: {e}")))?;

        let mut iter = ProducerPixelIterator {
            shared,
            handle: Some(handle),
            header: ImageHeader {
                width: 0,
                height: 0,
                format: PixelFormat::IntArgb,
            },
            y: 0,
            failed: None,
        };
        match iter.wait_for_header() {
            Ok(header) if header.format.sample_kind() == S::KIND => {
                iter.header = header;
                Ok(iter)
            }
            Ok(header) => {
                iter.close();
                Err(PixelError::SampleKindMismatch {
                    format: header.format.name(),
                    expected: header.format.sample_kind(),
                    actual: S::KIND,
                })
            }
            Err(e) => {
                iter.close();
                Err(e)
            }
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s
    } else {
        "unknown panic payload"
    }
}

/// Pull-side adapter over a push-style decoder. Built by
/// [`ProducerBuilder::spawn`].
///
/// Call [`close`](PixelIterator::close) when done, particularly when
/// stopping early; dropping the iterator does the same but logs a warning.
pub struct ProducerPixelIterator<S: Sample> {
    shared: Arc<Shared<S>>,
    handle: Option<JoinHandle<()>>,
    header: ImageHeader,
    y: usize,
    failed: Option<DecodeError>,
}

impl<S: Sample> ProducerPixelIterator<S> {
    /// Start a decoder with default thread settings.
    pub fn spawn<F>(decode: F) -> Result<Self>
    where
        F: FnOnce(RowSink<S>) -> Result<()> + Send + 'static,
    {
        ProducerBuilder::new().spawn(decode)
    }

    pub fn header(&self) -> ImageHeader {
        self.header
    }

    fn wait_for_header(&self) -> Result<ImageHeader> {
        let mut state = self.shared.lock();
        loop {
            if let Some(header) = state.header {
                return Ok(header);
            }
            if let Some(e) = &state.error {
                return Err(PixelError::Decode(e.clone()));
            }
            if state.finished {
                return Err(DecodeError::new("image ended before its header arrived").into());
            }
            state = self.shared.wait(state);
        }
    }

    /// Take the next row out of the mailbox, recording any failure.
    fn take_row(&mut self) -> Result<Vec<S>> {
        if let Some(e) = &self.failed {
            return Err(PixelError::Decode(e.clone()));
        }
        if self.y >= self.header.height {
            return Err(PixelError::EndOfData);
        }
        let taken = {
            let mut state = self.shared.lock();
            loop {
                if let Some(row) = state.slot.take() {
                    self.shared.changed.notify_all();
                    break Ok(row);
                }
                if let Some(e) = &state.error {
                    break Err(e.clone());
                }
                if state.finished || state.closed {
                    break Err(DecodeError::new(format!(
                        "unexpected end of image reached at y = {}",
                        self.y
                    )));
                }
                state = self.shared.wait(state);
            }
        };
        match taken {
            Ok(row) => {
                self.y += 1;
                Ok(row)
            }
            Err(e) => {
                self.failed = Some(e.clone());
                Err(PixelError::Decode(e))
            }
        }
    }
}

impl<S: Sample> PixelIterator for ProducerPixelIterator<S> {
    type Sample = S;

    fn width(&self) -> usize {
        self.header.width
    }

    fn height(&self) -> usize {
        self.header.height
    }

    fn format(&self) -> PixelFormat {
        self.header.format
    }

    fn is_top_down(&self) -> bool {
        true
    }

    fn is_done(&self) -> bool {
        self.y >= self.header.height
    }

    fn skip(&mut self) -> Result<()> {
        self.take_row().map(drop)
    }

    fn next_row(&mut self, dest: &mut [S]) -> Result<()> {
        let len = self.minimum_row_len();
        check_dest(dest, len)?;
        let row = self.take_row()?;
        let Some(src) = row.get(..len) else {
            let e = DecodeError::new(format!(
                "row {} has {} samples, expected {len}",
                self.y - 1,
                row.len()
            ));
            self.failed = Some(e.clone());
            return Err(e.into());
        };
        dest[..len].copy_from_slice(src);
        Ok(())
    }

    fn close(&mut self) {
        let Some(handle) = self.handle.take() else {
            return;
        };
        {
            let mut state = self.shared.lock();
            state.closed = true;
            state.slot = None;
            self.shared.changed.notify_all();
        }
        if handle.join().is_err() {
            log::warn!("producer thread exited abnormally");
        }
    }
}

impl<S: Sample> Drop for ProducerPixelIterator<S> {
    fn drop(&mut self) {
        if self.handle.is_some() {
            if !self.is_done() && self.failed.is_none() {
                log::warn!(
                    "producer iterator dropped at row {} of {} without close()",
                    self.y,
                    self.header.height
                );
            }
            self.close();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::iter::collect_rows;
    use std::sync::atomic::{AtomicBool, Ordering};

    fn header(width: usize, height: usize, format: PixelFormat) -> ImageHeader {
        ImageHeader {
            width,
            height,
            format,
        }
    }

    #[test_log::test]
    fn streams_every_row() {
        let mut iter = ProducerBuilder::new()
            .name("decode-test")
            .spawn(|mut sink: RowSink<u32>| {
                sink.start(header(2, 3, PixelFormat::IntArgb))?;
                for y in 0..3u32 {
                    sink.push_row(vec![y, y + 10])?;
                }
                Ok(())
            })
            .unwrap();
        assert_eq!(iter.header(), header(2, 3, PixelFormat::IntArgb));
        assert_eq!(collect_rows(&mut iter).unwrap(), [0, 10, 1, 11, 2, 12]);
        assert!(iter.is_done());
        let mut row = [0u32; 2];
        assert_eq!(iter.next_row(&mut row), Err(PixelError::EndOfData));
        iter.close();
        iter.close();
    }

    #[test_log::test]
    fn decoder_error_is_terminal() {
        let mut iter = ProducerPixelIterator::spawn(|mut sink: RowSink<u8>| {
            sink.start(header(1, 4, PixelFormat::ByteGray))?;
            sink.push_row(vec![7])?;
            Err(DecodeError::from("corrupt block").into())
        })
        .unwrap();
        let mut row = [0u8; 1];
        iter.next_row(&mut row).unwrap();
        assert_eq!(row, [7]);
        let expected = PixelError::Decode(DecodeError::from("corrupt block"));
        assert_eq!(iter.next_row(&mut row), Err(expected.clone()));
        assert_eq!(iter.skip(), Err(expected.clone()));
        assert_eq!(iter.next_row(&mut row), Err(expected));
        iter.close();
    }

    #[test_log::test]
    fn early_end_is_an_error() {
        let mut iter = ProducerPixelIterator::spawn(|mut sink: RowSink<u8>| {
            sink.start(header(1, 3, PixelFormat::ByteGray))?;
            sink.push_row(vec![1])
        })
        .unwrap();
        iter.skip().unwrap();
        match iter.skip() {
            Err(PixelError::Decode(e)) => {
                assert_eq!(e.message(), "unexpected end of image reached at y = 1")
            }
            other => panic!("expected a decode error, got {other:?}"),
        }
        iter.close();
    }

    #[test_log::test]
    fn panics_become_decode_errors() {
        let mut iter = ProducerPixelIterator::spawn(|mut sink: RowSink<u32>| {
            sink.start(header(1, 1, PixelFormat::IntRgb))?;
            panic!("decoder exploded");
        })
        .unwrap();
        let mut row = [0u32; 1];
        match iter.next_row(&mut row) {
            Err(PixelError::Decode(e)) => assert!(e.message().contains("decoder exploded")),
            other => panic!("expected a decode error, got {other:?}"),
        }
        iter.close();
    }

    #[test_log::test]
    fn close_cancels_a_blocked_decoder() {
        let cancelled = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&cancelled);
        let mut iter = ProducerPixelIterator::spawn(move |mut sink: RowSink<u8>| {
            sink.start(header(2, 1000, PixelFormat::ByteGray))?;
            for y in 0..1000 {
                if let Err(e) = sink.push_row(vec![y as u8; 2]) {
                    flag.store(sink.is_cancelled(), Ordering::SeqCst);
                    return Err(e);
                }
            }
            Ok(())
        })
        .unwrap();
        let mut row = [0u8; 2];
        iter.next_row(&mut row).unwrap();
        iter.close();
        assert!(cancelled.load(Ordering::SeqCst));
        // Closing does not fabricate rows.
        assert!(iter.next_row(&mut row).is_err());
    }

    #[test_log::test]
    fn dropping_mid_stream_releases_the_decoder() {
        let iter = ProducerPixelIterator::spawn(|mut sink: RowSink<u8>| {
            sink.start(header(1, 10, PixelFormat::ByteGray))?;
            loop {
                sink.push_row(vec![0])?;
            }
        })
        .unwrap();
        drop(iter);
    }

    #[test_log::test]
    fn header_must_match_the_sample_type() {
        let err = ProducerPixelIterator::<u8>::spawn(|mut sink| {
            sink.start(header(1, 1, PixelFormat::IntArgb))
        })
        .err()
        .unwrap();
        assert!(matches!(err, PixelError::SampleKindMismatch { .. }));
    }

    #[test_log::test]
    fn missing_header_fails_construction() {
        let err = ProducerPixelIterator::<u32>::spawn(|_sink| Ok(()))
            .err()
            .unwrap();
        assert!(matches!(err, PixelError::Decode(_)));
    }
}
