// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Raw task output plumbing.
//!
//! A [`MultiWriter`] is a cheap, clonable handle that fans every byte out to all
//! of its registered sinks. Tasks hold one and write into it; callers register
//! sinks before the task runs. Three sinks cover the usual needs:
//!
//! * [`CaptureBuffer`] keeps everything for error reporting,
//! * [`PrefixWriter`] passes lines through to another writer with a prefix,
//! * [`NotifyingBuffer`] keeps everything and bumps a `watch` counter on every
//!   write so a live view can redraw.

use std::io::{self, Write};
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::watch;

type Sink = Box<dyn Write + Send>;

fn poisoned() -> io::Error {
    io::Error::new(io::ErrorKind::Other, "output sink lock poisoned")
}

/// Fan-out writer shared between a task and whoever wires up its output.
#[derive(Clone, Default)]
pub struct MultiWriter {
    sinks: Arc<Mutex<Vec<Sink>>>,
}

impl MultiWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a sink. Every byte written afterwards reaches it.
    pub fn add_sink<W>(&self, sink: W)
    where
        W: Write + Send + 'static,
    {
        if let Ok(mut sinks) = self.sinks.lock() {
            sinks.push(Box::new(sink));
        }
    }

    pub fn sink_count(&self) -> usize {
        self.sinks.lock().map(|s| s.len()).unwrap_or(0)
    }

    /// Write a chunk to every sink. All sinks are attempted even if one fails;
    /// the first error is returned.
    pub fn write_chunk(&self, chunk: &[u8]) -> io::Result<()> {
        let mut sinks = self.sinks.lock().map_err(|_| poisoned())?;
        let mut first_err = None;
        for sink in sinks.iter_mut() {
            if let Err(e) = sink.write_all(chunk) {
                first_err.get_or_insert(e);
            }
        }
        match first_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

impl Write for MultiWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.write_chunk(buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        let mut sinks = self.sinks.lock().map_err(|_| poisoned())?;
        for sink in sinks.iter_mut() {
            sink.flush()?;
        }
        Ok(())
    }
}

impl std::fmt::Debug for MultiWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MultiWriter")
            .field("sink_count", &self.sink_count())
            .finish()
    }
}

/// In-memory sink. Clones share the same buffer.
#[derive(Clone, Default, Debug)]
pub struct CaptureBuffer {
    inner: Arc<Mutex<Vec<u8>>>,
}

impl CaptureBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> io::Result<MutexGuard<'_, Vec<u8>>> {
        self.inner.lock().map_err(|_| poisoned())
    }

    pub fn contents(&self) -> Vec<u8> {
        self.lock().map(|b| b.clone()).unwrap_or_default()
    }

    pub fn contents_lossy(&self) -> String {
        String::from_utf8_lossy(&self.contents()).into_owned()
    }

    /// The last `max_bytes` bytes, decoded lossily.
    pub fn tail(&self, max_bytes: usize) -> String {
        let contents = self.contents();
        let start = contents.len().saturating_sub(max_bytes);
        String::from_utf8_lossy(&contents[start..]).into_owned()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().map(|b| b.is_empty()).unwrap_or(true)
    }
}

impl Write for CaptureBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.lock()?.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Passes output through to `inner`, starting every line with `prefix`.
pub struct PrefixWriter<W: Write> {
    prefix: String,
    inner: W,
    at_line_start: bool,
}

impl<W: Write> PrefixWriter<W> {
    pub fn new(prefix: impl Into<String>, inner: W) -> Self {
        Self {
            prefix: prefix.into(),
            inner,
            at_line_start: true,
        }
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl<W: Write> Write for PrefixWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        for line in buf.split_inclusive(|b| *b == b'\n') {
            if self.at_line_start {
                self.inner.write_all(self.prefix.as_bytes())?;
            }
            self.inner.write_all(line)?;
            self.at_line_start = line.ends_with(b"\n");
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

/// Buffer that signals every change through a `watch` channel carrying the
/// number of bytes written so far.
#[derive(Clone)]
pub struct NotifyingBuffer {
    buffer: CaptureBuffer,
    changed: Arc<watch::Sender<usize>>,
}

impl NotifyingBuffer {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(0);
        Self {
            buffer: CaptureBuffer::new(),
            changed: Arc::new(tx),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<usize> {
        self.changed.subscribe()
    }

    pub fn contents_lossy(&self) -> String {
        self.buffer.contents_lossy()
    }
}

impl Default for NotifyingBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl Write for NotifyingBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let written = self.buffer.write(buf)?;
        self.changed.send_modify(|total| *total += written);
        Ok(written)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
