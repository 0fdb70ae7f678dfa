//! Bounded wait for the server to accept connections.
//!
//! Modelled as a small state machine so that the loop can be driven one step
//! at a time, with time supplied by a [`Clock`].

use std::time::Duration;

use async_trait::async_trait;

use crate::error::{ReadinessError, SqlError};
use crate::transport::Connector;

/// Fixed pause between probes.
pub const PROBE_INTERVAL: Duration = Duration::from_secs(1);

/// Monotonic time source.
#[async_trait]
pub trait Clock: Send + Sync {
    /// Time elapsed since an arbitrary fixed origin.
    fn now(&self) -> Duration;

    async fn sleep(&self, duration: Duration);
}

/// Wall-clock time from the tokio runtime.
#[derive(Debug, Clone, Copy)]
pub struct TokioClock {
    origin: tokio::time::Instant,
}

impl TokioClock {
    #[must_use]
    pub fn new() -> Self {
        Self {
            origin: tokio::time::Instant::now(),
        }
    }
}

impl Default for TokioClock {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Clock for TokioClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

#[derive(Debug)]
pub enum ReadinessState {
    Waiting {
        attempts: u32,
        last_error: Option<SqlError>,
    },
    Ready {
        attempts: u32,
    },
    TimedOut {
        attempts: u32,
        last_error: Option<SqlError>,
    },
}

impl ReadinessState {
    #[must_use]
    pub fn initial() -> Self {
        ReadinessState::Waiting {
            attempts: 0,
            last_error: None,
        }
    }

    #[must_use]
    pub fn is_terminal(&self) -> bool {
        !matches!(self, ReadinessState::Waiting { .. })
    }
}

/// Polls `SELECT 1` on one database until it answers or the budget runs out.
pub struct ReadinessWaiter<'a> {
    connector: &'a dyn Connector,
    clock: &'a dyn Clock,
    dbname: &'a str,
    timeout: Duration,
    interval: Duration,
}

impl<'a> ReadinessWaiter<'a> {
    #[must_use]
    pub fn new(
        connector: &'a dyn Connector,
        clock: &'a dyn Clock,
        dbname: &'a str,
        timeout: Duration,
    ) -> Self {
        Self {
            connector,
            clock,
            dbname,
            timeout,
            interval: PROBE_INTERVAL,
        }
    }

    #[must_use]
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Advance the state machine by one probe. Terminal states are returned unchanged.
    pub async fn step(&self, state: ReadinessState, started: Duration) -> ReadinessState {
        let (attempts, last_error) = match state {
            ReadinessState::Waiting {
                attempts,
                last_error,
            } => (attempts, last_error),
            terminal => return terminal,
        };

        if self.clock.now().saturating_sub(started) > self.timeout {
            return ReadinessState::TimedOut {
                attempts,
                last_error,
            };
        }

        let attempts = attempts + 1;
        match self.probe().await {
            Ok(()) => ReadinessState::Ready { attempts },
            Err(err) => {
                tracing::debug!("readiness probe {attempts} failed: {err}");
                self.clock.sleep(self.interval).await;
                ReadinessState::Waiting {
                    attempts,
                    last_error: Some(err),
                }
            }
        }
    }

    /// Run the state machine to completion.
    ///
    /// # Errors
    /// Returns `ReadinessError` carrying the last probe failure once the
    /// timeout has elapsed.
    pub async fn wait(&self) -> Result<u32, ReadinessError> {
        let started = self.clock.now();
        let mut state = ReadinessState::initial();
        while !state.is_terminal() {
            state = self.step(state, started).await;
        }
        match state {
            ReadinessState::Ready { attempts } => Ok(attempts),
            ReadinessState::TimedOut {
                attempts,
                last_error,
            }
            | ReadinessState::Waiting {
                attempts,
                last_error,
            } => Err(ReadinessError {
                timeout: self.timeout,
                attempts,
                last_error,
            }),
        }
    }

    async fn probe(&self) -> Result<(), SqlError> {
        let mut session = self.connector.connect(self.dbname).await?;
        session.query("SELECT 1", &[]).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{FakeServer, ManualClock};

    #[tokio::test]
    async fn ready_on_first_probe() {
        let server = FakeServer::new();
        let clock = ManualClock::new();
        let waiter = ReadinessWaiter::new(&server, &clock, "postgres", Duration::from_secs(5));
        assert_eq!(waiter.wait().await.unwrap(), 1);
        assert_eq!(clock.now(), Duration::ZERO);
    }

    #[tokio::test]
    async fn retries_until_the_server_comes_up() {
        let server = FakeServer::new();
        server.refuse_connections(3);
        let clock = ManualClock::new();
        let waiter = ReadinessWaiter::new(&server, &clock, "postgres", Duration::from_secs(10));
        assert_eq!(waiter.wait().await.unwrap(), 4);
        assert_eq!(clock.now(), Duration::from_secs(3));
    }

    #[tokio::test]
    async fn times_out_with_last_error() {
        let server = FakeServer::new();
        server.refuse_connections(u32::MAX);
        let clock = ManualClock::new();
        let waiter = ReadinessWaiter::new(&server, &clock, "postgres", Duration::from_secs(3));
        let err = waiter.wait().await.unwrap_err();
        // probes at t=0,1,2,3; the check at t=4 exceeds the budget
        assert_eq!(err.attempts, 4);
        assert!(err.last_error.is_some());
        assert!(err.to_string().contains("not ready after 3s"));
    }

    #[tokio::test]
    async fn probe_interval_is_configurable() {
        let server = FakeServer::new();
        server.refuse_connections(3);
        let clock = ManualClock::new();
        let waiter = ReadinessWaiter::new(&server, &clock, "postgres", Duration::from_secs(1))
            .with_interval(Duration::from_millis(250));
        assert_eq!(waiter.wait().await.unwrap(), 4);
        assert_eq!(clock.now(), Duration::from_millis(750));
    }

    #[tokio::test]
    async fn terminal_states_do_not_probe_again() {
        let server = FakeServer::new();
        let clock = ManualClock::new();
        let waiter = ReadinessWaiter::new(&server, &clock, "postgres", Duration::from_secs(3));
        let state = waiter
            .step(ReadinessState::Ready { attempts: 2 }, Duration::ZERO)
            .await;
        assert!(matches!(state, ReadinessState::Ready { attempts: 2 }));
        assert_eq!(server.connect_count(), 0);
    }
}
