use std::time::{Duration, Instant};

/// How long a receive may wait for a datagram.
///
/// The integer convention used by configuration and the CLI is milliseconds:
/// `0` polls once without waiting, a positive value waits that long, and a
/// negative value waits indefinitely. See [`RecvTimeout::from_millis`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecvTimeout {
    /// Check once for a pending datagram and return immediately.
    Poll,
    /// Wait up to the given duration.
    After(Duration),
    /// Wait until a datagram arrives.
    Forever,
}

impl RecvTimeout {
    /// Interpret a millisecond count using the `0` / positive / negative convention.
    pub fn from_millis(millis: i64) -> Self {
        match millis {
            0 => RecvTimeout::Poll,
            ms if ms < 0 => RecvTimeout::Forever,
            ms => RecvTimeout::After(Duration::from_millis(ms.unsigned_abs())),
        }
    }

    /// The millisecond count for this timeout, `-1` for [`RecvTimeout::Forever`].
    pub fn as_millis(self) -> i64 {
        match self {
            RecvTimeout::Poll => 0,
            RecvTimeout::After(d) => i64::try_from(d.as_millis()).unwrap_or(i64::MAX),
            RecvTimeout::Forever => -1,
        }
    }

    /// The wait duration, `None` when waiting indefinitely.
    pub fn duration(self) -> Option<Duration> {
        match self {
            RecvTimeout::Poll => Some(Duration::ZERO),
            RecvTimeout::After(d) => Some(d),
            RecvTimeout::Forever => None,
        }
    }

    /// Absolute deadline measured from `now`, `None` when waiting indefinitely.
    pub fn deadline_from(self, now: Instant) -> Option<Instant> {
        self.duration().map(|d| now + d)
    }

    /// What is left of this timeout after waiting since `start`.
    ///
    /// An exhausted budget becomes [`RecvTimeout::Poll`], so a follow-up
    /// receive still drains an already queued datagram without waiting.
    pub fn remaining_since(self, start: Instant) -> Self {
        match self {
            RecvTimeout::After(d) => RecvTimeout::from(d.saturating_sub(start.elapsed())),
            other => other,
        }
    }
}

impl From<Duration> for RecvTimeout {
    fn from(d: Duration) -> Self {
        if d.is_zero() {
            RecvTimeout::Poll
        } else {
            RecvTimeout::After(d)
        }
    }
}

/// Time left until `deadline`, in `poll(2)` milliseconds (`-1` waits forever).
///
/// Rounds up so a sub-millisecond remainder still waits instead of spinning.
pub(crate) fn remaining_poll_millis(deadline: Option<Instant>) -> i32 {
    match deadline {
        None => -1,
        Some(deadline) => {
            let left = deadline.saturating_duration_since(Instant::now());
            let millis = left.as_micros().div_ceil(1000);
            i32::try_from(millis).unwrap_or(i32::MAX)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn millis_convention() {
        assert_eq!(RecvTimeout::from_millis(0), RecvTimeout::Poll);
        assert_eq!(RecvTimeout::from_millis(-1), RecvTimeout::Forever);
        assert_eq!(RecvTimeout::from_millis(-250), RecvTimeout::Forever);
        assert_eq!(
            RecvTimeout::from_millis(50),
            RecvTimeout::After(Duration::from_millis(50))
        );
    }

    #[test]
    fn millis_roundtrip() {
        for ms in [0, 1, 50, 100, -1] {
            assert_eq!(RecvTimeout::from_millis(ms).as_millis(), ms);
        }
    }

    #[test]
    fn from_duration() {
        assert_eq!(RecvTimeout::from(Duration::ZERO), RecvTimeout::Poll);
        assert_eq!(
            RecvTimeout::from(Duration::from_secs(1)),
            RecvTimeout::After(Duration::from_secs(1))
        );
    }

    #[test]
    fn remaining_since_shrinks_budget() {
        let start = Instant::now() - Duration::from_millis(40);
        match RecvTimeout::After(Duration::from_millis(100)).remaining_since(start) {
            RecvTimeout::After(left) => assert!(left <= Duration::from_millis(60)),
            other => panic!("unexpected {other:?}"),
        }

        let start = Instant::now() - Duration::from_millis(200);
        assert_eq!(
            RecvTimeout::After(Duration::from_millis(100)).remaining_since(start),
            RecvTimeout::Poll
        );
        assert_eq!(
            RecvTimeout::Forever.remaining_since(start),
            RecvTimeout::Forever
        );
    }

    #[test]
    fn remaining_millis() {
        assert_eq!(remaining_poll_millis(None), -1);
        assert_eq!(remaining_poll_millis(Some(Instant::now())), 0);

        let later = Instant::now() + Duration::from_millis(500);
        let left = remaining_poll_millis(Some(later));
        assert!(left > 0 && left <= 500);
    }
}
