use std::{
    sync::mpsc,
    time::{Duration, Instant},
};

use crate::timemgmt::SearchLimit;

/// How many nodes pass between checks of the clock and of stdin.
pub const CHECK_INTERVAL: u64 = 2048;

/// Per-search bookkeeping and the cooperative cancellation token.
pub struct SearchInfo<'a> {
    /// The starting time of the search.
    pub start_time: Instant,
    /// The point after which the search must stop, if it is timed.
    pub stop_time: Option<Instant>,
    pub limit: SearchLimit,
    pub nodes: u64,

    /// Signal to quit the program.
    pub quit: bool,
    /// Signal to stop the search.
    pub stopped: bool,

    /// Whether to print `info` lines and `bestmove` to stdout.
    pub print_to_stdout: bool,

    /// A handle to a receiver for stdin.
    pub stdin_rx: Option<&'a mpsc::Receiver<String>>,
    /// A command that interrupted the search and still has to be run by the UCI loop.
    pub deferred: Option<String>,
}

impl Default for SearchInfo<'_> {
    fn default() -> Self {
        Self {
            start_time: Instant::now(),
            stop_time: None,
            limit: SearchLimit::Infinite,
            nodes: 0,
            quit: false,
            stopped: false,
            print_to_stdout: true,
            stdin_rx: None,
            deferred: None,
        }
    }
}

impl<'a> SearchInfo<'a> {
    pub fn new(limit: SearchLimit) -> Self {
        let mut info = Self::default();
        info.set_limit(limit);
        info
    }

    /// Resets the counters and starts the clock under a new limit.
    pub fn set_limit(&mut self, limit: SearchLimit) {
        self.start_time = Instant::now();
        self.stop_time = limit.time_window().map(|window| self.start_time + window);
        self.limit = limit;
        self.nodes = 0;
        self.stopped = false;
    }

    pub fn set_stdin(&mut self, stdin_rx: &'a mpsc::Receiver<String>) {
        self.stdin_rx = Some(stdin_rx);
    }

    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Counts a node, and polls for cancellation every `CHECK_INTERVAL` nodes.
    pub fn visit(&mut self) {
        self.nodes += 1;
        if self.nodes % CHECK_INTERVAL == 0 {
            self.check_up();
        }
    }

    /// Sets `stopped` if the deadline has passed or a command has arrived on stdin.
    /// At most one line is taken per poll, and none once the search is stopped, so
    /// commands queued behind a `stop` stay in the channel for the UCI loop.
    pub fn check_up(&mut self) {
        if self.stop_time.is_some_and(|stop| Instant::now() >= stop) {
            self.stopped = true;
        }
        if self.stopped {
            return;
        }
        let Some(Ok(cmd)) = self.stdin_rx.map(mpsc::Receiver::try_recv) else {
            return;
        };
        match cmd.trim() {
            "isready" => println!("readyok"),
            "stop" => self.stopped = true,
            "quit" => {
                self.stopped = true;
                self.quit = true;
            }
            _ => {
                self.stopped = true;
                self.deferred = Some(cmd);
            }
        }
    }

    pub fn nps(&self) -> u64 {
        #![allow(clippy::cast_possible_truncation)]
        let micros = self.elapsed().as_micros().max(1);
        (u128::from(self.nodes) * 1_000_000 / micros) as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deadline_stops_the_search() {
        let mut info = SearchInfo::new(SearchLimit::Time(0));
        info.check_up();
        assert!(info.stopped);
        let mut info = SearchInfo::new(SearchLimit::Depth(3));
        info.check_up();
        assert!(!info.stopped);
    }

    #[test]
    fn stdin_commands() {
        let (tx, rx) = mpsc::channel();
        let mut info = SearchInfo::new(SearchLimit::Infinite);
        info.set_stdin(&rx);
        tx.send("isready".to_string()).unwrap();
        info.check_up();
        assert!(!info.stopped);
        tx.send("stop".to_string()).unwrap();
        info.check_up();
        assert!(info.stopped && !info.quit);
        info.set_limit(SearchLimit::Infinite);
        tx.send("quit".to_string()).unwrap();
        info.check_up();
        assert!(info.quit);
    }

    #[test]
    fn commands_behind_a_stop_are_kept() {
        let (tx, rx) = mpsc::channel();
        let mut info = SearchInfo::new(SearchLimit::Infinite);
        info.set_stdin(&rx);
        for cmd in ["stop", "position startpos moves e2e4", "go depth 5"] {
            tx.send(cmd.to_string()).unwrap();
        }
        info.check_up();
        info.check_up();
        assert!(info.stopped);
        assert_eq!(info.deferred, None);
        assert_eq!(rx.try_iter().collect::<Vec<_>>(), ["position startpos moves e2e4", "go depth 5"]);
    }

    #[test]
    fn interrupting_command_is_deferred() {
        let (tx, rx) = mpsc::channel();
        let mut info = SearchInfo::new(SearchLimit::Infinite);
        info.set_stdin(&rx);
        tx.send("ucinewgame".to_string()).unwrap();
        tx.send("go depth 5".to_string()).unwrap();
        info.check_up();
        assert!(info.stopped && !info.quit);
        assert_eq!(info.deferred.as_deref(), Some("ucinewgame"));
        assert_eq!(rx.try_recv().as_deref(), Ok("go depth 5"));
    }

    #[test]
    fn polling_cadence() {
        let mut info = SearchInfo::new(SearchLimit::Time(0));
        for _ in 0..CHECK_INTERVAL - 1 {
            info.visit();
        }
        assert!(!info.stopped);
        info.visit();
        assert!(info.stopped);
    }
}
