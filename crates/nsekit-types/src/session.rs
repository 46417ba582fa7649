//! Trading session windows.

use chrono::{NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::SessionWindowError;

/// Time-of-day window of the regular trading session.
///
/// The window is half-open: `open` is inside it, `close` is not.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionWindow {
    open: NaiveTime,
    close: NaiveTime,
}

impl SessionWindow {
    /// Creates a new session window, validating that open < close.
    ///
    /// # Errors
    ///
    /// Returns an error if `open` is not strictly before `close`.
    pub fn new(open: NaiveTime, close: NaiveTime) -> Result<Self, SessionWindowError> {
        if open >= close {
            return Err(SessionWindowError::InvalidRange { open, close });
        }
        Ok(Self { open, close })
    }

    /// Creates a session window from hour/minute pairs.
    ///
    /// # Errors
    ///
    /// Returns an error if either pair is not a valid time of day, or if the
    /// window is empty.
    pub fn from_hm(
        open_hour: u32,
        open_minute: u32,
        close_hour: u32,
        close_minute: u32,
    ) -> Result<Self, SessionWindowError> {
        let open = hm(open_hour, open_minute)?;
        let close = hm(close_hour, close_minute)?;
        Self::new(open, close)
    }

    /// The NSE regular equity session, 09:15 to 15:30.
    #[must_use]
    pub fn regular() -> Self {
        Self {
            open: NaiveTime::from_hms_opt(9, 15, 0).unwrap_or_default(),
            close: NaiveTime::from_hms_opt(15, 30, 0).unwrap_or_default(),
        }
    }

    /// Returns the opening time (inclusive).
    #[must_use]
    pub const fn open(&self) -> NaiveTime {
        self.open
    }

    /// Returns the closing time (exclusive).
    #[must_use]
    pub const fn close(&self) -> NaiveTime {
        self.close
    }

    /// Returns true if the time of day falls inside the session.
    #[must_use]
    pub fn contains(&self, time: NaiveTime) -> bool {
        time >= self.open && time < self.close
    }

    /// Returns true if the datetime's time of day falls inside the session.
    #[must_use]
    pub fn contains_datetime(&self, datetime: NaiveDateTime) -> bool {
        self.contains(datetime.time())
    }
}

impl Default for SessionWindow {
    fn default() -> Self {
        Self::regular()
    }
}

impl std::fmt::Display for SessionWindow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}-{}",
            self.open.format("%H:%M"),
            self.close.format("%H:%M")
        )
    }
}

fn hm(hour: u32, minute: u32) -> Result<NaiveTime, SessionWindowError> {
    NaiveTime::from_hms_opt(hour, minute, 0).ok_or(SessionWindowError::InvalidTime { hour, minute })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn test_regular_window_bounds() {
        let window = SessionWindow::regular();

        assert!(!window.contains(t(9, 14)));
        assert!(window.contains(t(9, 15)));
        assert!(window.contains(t(15, 29)));
        assert!(!window.contains(t(15, 30)));
        assert_eq!(window.to_string(), "09:15-15:30");
    }

    #[test]
    fn test_invalid_window() {
        assert!(matches!(
            SessionWindow::from_hm(15, 30, 9, 15),
            Err(SessionWindowError::InvalidRange { .. })
        ));
        assert!(matches!(
            SessionWindow::from_hm(25, 0, 26, 0),
            Err(SessionWindowError::InvalidTime { hour: 25, .. })
        ));
    }

    #[test]
    fn test_custom_window() {
        let window = SessionWindow::from_hm(9, 14, 15, 31).unwrap();
        assert!(window.contains(t(9, 14)));
        assert!(window.contains(t(15, 30)));
        assert_eq!(window, SessionWindow::new(t(9, 14), t(15, 31)).unwrap());
    }
}
