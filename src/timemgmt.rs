use std::time::Duration;

/// Constraints on a single search, as given by `go`.
#[derive(PartialEq, Eq, Clone, Debug, Default)]
pub enum SearchLimit {
    #[default]
    Infinite,
    Depth(i32),
    /// Milliseconds to think for.
    Time(u64),
    /// Play from a clock; converted to a time window at the start of the search.
    Dynamic {
        our_clock: u64,
        our_inc: u64,
        moves_to_go: Option<u64>,
    },
}

/// Budget reserved for communication latency.
pub const MOVE_OVERHEAD: u64 = 10;
/// Assumed number of remaining moves when the GUI doesn't tell us.
pub const SEARCH_TIME_FRACTION: u64 = 20;

impl SearchLimit {
    pub const fn depth(&self) -> Option<i32> {
        match self {
            Self::Depth(d) => Some(*d),
            _ => None,
        }
    }

    /// How long a search under this limit may run, if it is timed at all.
    pub fn time_window(&self) -> Option<Duration> {
        match *self {
            Self::Infinite | Self::Depth(_) => None,
            Self::Time(millis) => Some(Duration::from_millis(millis)),
            Self::Dynamic {
                our_clock,
                our_inc,
                moves_to_go,
            } => Some(Duration::from_millis(Self::compute_time_window(
                our_clock,
                moves_to_go,
                our_inc,
            ))),
        }
    }

    /// Converts a clock reading into the number of milliseconds to spend on this move.
    pub fn compute_time_window(our_clock: u64, moves_to_go: Option<u64>, our_inc: u64) -> u64 {
        let max_time = our_clock.saturating_sub(MOVE_OVERHEAD);
        if let Some(moves_to_go) = moves_to_go {
            let divisor = moves_to_go.clamp(2, SEARCH_TIME_FRACTION);
            let computed_time_window = our_clock / divisor;
            return computed_time_window.min(max_time);
        }
        let computed_time_window =
            (our_clock / SEARCH_TIME_FRACTION + our_inc / 2).saturating_sub(MOVE_OVERHEAD);
        computed_time_window.min(max_time)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clock_conversion() {
        // a twentieth of the clock plus half the increment, less the overhead.
        assert_eq!(SearchLimit::compute_time_window(60_000, None, 1_000), 3_490);
        // never more than the clock allows.
        assert_eq!(SearchLimit::compute_time_window(100, None, 10_000), 90);
        assert_eq!(SearchLimit::compute_time_window(0, None, 0), 0);
        // moves to go divides the clock, but at least in two.
        assert_eq!(SearchLimit::compute_time_window(60_000, Some(10), 0), 6_000);
        assert_eq!(SearchLimit::compute_time_window(60_000, Some(1), 0), 30_000);
        assert_eq!(SearchLimit::compute_time_window(60_000, Some(40), 0), 3_000);
    }

    #[test]
    fn windows_by_kind() {
        assert_eq!(SearchLimit::Infinite.time_window(), None);
        assert_eq!(SearchLimit::Depth(5).time_window(), None);
        assert_eq!(SearchLimit::Depth(5).depth(), Some(5));
        assert_eq!(SearchLimit::Time(250).time_window(), Some(Duration::from_millis(250)));
        let dynamic = SearchLimit::Dynamic {
            our_clock: 60_000,
            our_inc: 1_000,
            moves_to_go: None,
        };
        assert_eq!(dynamic.time_window(), Some(Duration::from_millis(3_490)));
    }
}
