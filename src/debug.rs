//! Realtime-safe diagnostics for the audio thread.
//!
//! With the `debug` feature every processor owns an [`RtLogger`]: the producer
//! half of its own preallocated ring. [`fp_log!`](crate::fp_log) formats into a
//! fixed stack buffer and pushes the line onto that ring. The consumer half, a
//! [`logger::LogDrain`], is handed to a non-realtime thread which forwards the
//! queued lines into the `log` facade. Without the feature the logger is an
//! empty struct and the macro compiles to nothing.

#[cfg(not(feature = "debug"))]
use std::fmt;

#[cfg(feature = "debug")]
pub mod logger {
    use ringbuf::{Consumer, Producer, RingBuffer};
    use std::fmt;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    const RING_CAP: usize = 128;
    const LINE_MAX: usize = 192;

    #[derive(Copy, Clone)]
    struct Line {
        len: u16,
        bytes: [u8; LINE_MAX],
    }

    impl Line {
        const EMPTY: Line = Line {
            len: 0,
            bytes: [0; LINE_MAX],
        };

        fn as_str(&self) -> &str {
            let len = (self.len as usize).min(LINE_MAX);
            match std::str::from_utf8(&self.bytes[..len]) {
                Ok(s) => s,
                // Truncation can split a multi-byte char
                Err(e) => std::str::from_utf8(&self.bytes[..e.valid_up_to()]).unwrap_or(""),
            }
        }
    }

    impl fmt::Write for Line {
        fn write_str(&mut self, s: &str) -> fmt::Result {
            let used = self.len as usize;
            let n = s.len().min(LINE_MAX - used);
            self.bytes[used..used + n].copy_from_slice(&s.as_bytes()[..n]);
            self.len = (used + n) as u16;
            Ok(())
        }
    }

    /// Audio-thread end of one processor's log ring.
    pub struct RtLogger {
        producer: Producer<Line>,
        dropped: Arc<AtomicUsize>,
    }

    /// Control-thread end of one processor's log ring.
    pub struct LogDrain {
        consumer: Consumer<Line>,
        dropped: Arc<AtomicUsize>,
    }

    /// Allocate a ring and split it. Not realtime-safe.
    pub fn channel() -> (RtLogger, LogDrain) {
        let (producer, consumer) = RingBuffer::<Line>::new(RING_CAP).split();
        let dropped = Arc::new(AtomicUsize::new(0));
        (
            RtLogger {
                producer,
                dropped: Arc::clone(&dropped),
            },
            LogDrain { consumer, dropped },
        )
    }

    impl RtLogger {
        /// Format and enqueue one line. Drops it if the ring is full.
        pub fn log(&mut self, args: fmt::Arguments) {
            let mut line = Line::EMPTY;
            let _ = fmt::write(&mut line, args);
            if self.producer.push(line).is_err() {
                self.dropped.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    impl LogDrain {
        /// Hand every queued line to `sink`, oldest first. Returns the count.
        pub fn drain(&mut self, mut sink: impl FnMut(&str)) -> usize {
            let mut count = 0;
            while let Some(line) = self.consumer.pop() {
                if line.len == 0 {
                    continue;
                }
                sink(line.as_str());
                count += 1;
            }
            count
        }

        /// Lines lost to a full ring since the last call.
        pub fn take_dropped(&self) -> usize {
            self.dropped.swap(0, Ordering::Relaxed)
        }

        /// Forward queued lines to `log::debug!`. Returns the number forwarded.
        pub fn drain_to_log(&mut self) -> usize {
            let count = self.drain(|line| log::debug!(target: "fatpressor::rt", "{line}"));

            let dropped = self.take_dropped();
            if dropped > 0 {
                log::warn!(target: "fatpressor::rt", "{dropped} realtime log lines dropped (ring full)");
            }
            count
        }
    }

}

#[cfg(feature = "debug")]
pub use logger::RtLogger;

/// Stand-in used when the `debug` feature is off.
#[cfg(not(feature = "debug"))]
#[derive(Debug, Default)]
pub struct RtLogger;

#[cfg(not(feature = "debug"))]
impl RtLogger {
    #[inline(always)]
    pub fn log(&mut self, _args: fmt::Arguments) {}
}

/// Log from the audio thread without allocating or locking.
///
/// The first argument is the [`RtLogger`] to write to.
#[macro_export]
macro_rules! fp_log {
    ($logger:expr, $($arg:tt)*) => {
        $logger.log(format_args!($($arg)*))
    };
}
