use serde::Serialize;
use thiserror::Error;

/// Nanoseconds in one second of trace time
pub const NSEC_PER_SEC: u64 = 1_000_000_000;

/// Errors that can occur during WindowController operations
#[derive(Error, Debug, PartialEq)]
pub enum Error {
    /// A timestamp was observed that goes backward in time
    #[error("Non-monotonic timestamp: previous={0}, new={1}")]
    NonMonotonicTimestamp(u64, u64),

    /// A timestamp was observed after the stream was finished
    #[error("Window controller is already finished")]
    Finished,
}

/// A closed span of trace time, in nanoseconds.
///
/// Periodic windows are half-open (`[start_ts, end_ts)`): the event at
/// `end_ts` belongs to the next window. The final window includes its last
/// event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Window {
    pub start_ts: u64,
    pub end_ts: u64,
    /// True for the flush that happens when the event stream ends
    pub is_final: bool,
}

impl Window {
    /// Length of the window in nanoseconds
    pub fn duration_ns(&self) -> u64 {
        self.end_ts.saturating_sub(self.start_ts)
    }
}

/// Where the controller is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    /// No event observed yet
    Empty,
    /// A window is open
    Accumulating {
        /// Timestamp of the first event in the open window
        start_ts: u64,
        /// Integer second of `start_ts`
        start_sec: u64,
    },
    /// The stream ended and the final window was handed out
    Done,
}

/// Decides where refresh windows begin and end.
///
/// `WindowController` watches the timestamps of a trace as they are consumed
/// and reports a [`Window`] each time a refresh boundary is crossed. A
/// refresh period of zero selects whole-trace mode, in which the only window
/// is the one returned by [`WindowController::finish`].
///
/// Boundaries are decided on whole seconds: a window that opened during
/// second `S` closes at the first event whose second is at least
/// `S + refresh_period_secs`.
///
/// # Examples
///
/// ```
/// use window::{Window, WindowController};
///
/// // One second refresh period
/// let mut controller = WindowController::new(1);
///
/// assert_eq!(controller.observe(100).unwrap(), None);
/// assert_eq!(controller.observe(900_000_000).unwrap(), None);
///
/// // Crossing into the next second closes the first window
/// let window = controller.observe(1_000_000_100).unwrap();
/// assert_eq!(
///     window,
///     Some(Window { start_ts: 100, end_ts: 1_000_000_100, is_final: false })
/// );
///
/// // The end of the stream closes whatever is still open
/// controller.observe(1_200_000_000).unwrap();
/// assert_eq!(
///     controller.finish(),
///     Some(Window { start_ts: 1_000_000_100, end_ts: 1_200_000_000, is_final: true })
/// );
/// ```
pub struct WindowController {
    /// Refresh period in seconds, 0 for whole-trace mode
    refresh_period_secs: u64,

    state: State,

    /// First timestamp of the whole stream
    first_ts: Option<u64>,

    /// Latest timestamp observed
    last_ts: Option<u64>,
}

impl WindowController {
    /// Creates a new WindowController.
    ///
    /// # Arguments
    ///
    /// * `refresh_period_secs` - The refresh period in seconds, or 0 to
    ///   treat the whole trace as a single window
    pub fn new(refresh_period_secs: u64) -> Self {
        Self {
            refresh_period_secs,
            state: State::Empty,
            first_ts: None,
            last_ts: None,
        }
    }

    /// Creates a controller that never closes a window before the stream ends
    pub fn whole_trace() -> Self {
        Self::new(0)
    }

    /// Returns true if windows are closed periodically
    pub fn is_periodic(&self) -> bool {
        self.refresh_period_secs > 0
    }

    pub fn state(&self) -> State {
        self.state
    }

    /// Timestamp of the first event observed
    pub fn trace_start(&self) -> Option<u64> {
        self.first_ts
    }

    /// Timestamp of the latest event observed
    pub fn trace_end(&self) -> Option<u64> {
        self.last_ts
    }

    /// Records the timestamp of the next event in the stream.
    ///
    /// Must be called before the event itself is accounted, since the event
    /// belongs to the window that starts at its timestamp when it closes the
    /// previous one.
    ///
    /// # Returns
    ///
    /// * `Ok(Some(window))` - The event crossed a refresh boundary and
    ///   `window` is now closed
    /// * `Ok(None)` - The event falls inside the open window
    ///
    /// # Errors
    ///
    /// Returns an error if:
    ///
    /// * The timestamp is lower than the latest one observed (`NonMonotonicTimestamp`).
    ///   The controller state is left untouched.
    /// * [`WindowController::finish`] was already called (`Finished`)
    ///
    /// # Examples
    ///
    /// ```
    /// use window::{Error, WindowController};
    ///
    /// let mut controller = WindowController::new(2);
    /// controller.observe(5_000).unwrap();
    ///
    /// assert_eq!(
    ///     controller.observe(4_000),
    ///     Err(Error::NonMonotonicTimestamp(5_000, 4_000))
    /// );
    /// ```
    pub fn observe(&mut self, timestamp: u64) -> Result<Option<Window>, Error> {
        let (start_ts, start_sec) = match self.state {
            State::Done => return Err(Error::Finished),
            State::Empty => {
                // First event opens the first window
                self.first_ts = Some(timestamp);
                self.last_ts = Some(timestamp);
                self.state = State::Accumulating {
                    start_ts: timestamp,
                    start_sec: timestamp / NSEC_PER_SEC,
                };
                return Ok(None);
            }
            State::Accumulating {
                start_ts,
                start_sec,
            } => (start_ts, start_sec),
        };

        if let Some(prev) = self.last_ts {
            if timestamp < prev {
                return Err(Error::NonMonotonicTimestamp(prev, timestamp));
            }
        }
        self.last_ts = Some(timestamp);

        if !self.is_periodic() {
            return Ok(None);
        }

        let event_sec = timestamp / NSEC_PER_SEC;
        if event_sec != start_sec && event_sec >= start_sec + self.refresh_period_secs {
            // Close the open window and start the next one at this event
            self.state = State::Accumulating {
                start_ts: timestamp,
                start_sec: event_sec,
            };
            return Ok(Some(Window {
                start_ts,
                end_ts: timestamp,
                is_final: false,
            }));
        }

        Ok(None)
    }

    /// Ends the stream.
    ///
    /// Returns the final window, covering whatever was still open, or `None`
    /// if no event was ever observed. In periodic mode this is only the last
    /// segment of the trace, not the whole trace. Calling it again returns
    /// `None`.
    pub fn finish(&mut self) -> Option<Window> {
        let window = match self.state {
            State::Accumulating { start_ts, .. } => Some(Window {
                start_ts,
                end_ts: self.last_ts.unwrap_or(start_ts),
                is_final: true,
            }),
            State::Empty | State::Done => None,
        };
        self.state = State::Done;
        window
    }
}
