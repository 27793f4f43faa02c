//! Protective-mechanism signals.
//!
//! Protective plugins report what they did to a request as an [`Outcome`]
//! under their [`Mechanism`]. The metrics stage owns the mapping from
//! `(mechanism, outcome)` to a counter; plugins never name counters.

use crate::names;

/// Closed set of protective mechanisms that may report to the metrics stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mechanism {
    /// Flow control + circuit breaking.
    Sentinel,
    /// Rate limiter + circuit breaker.
    Resilience4j,
    /// Circuit breaker only.
    Hystrix,
    /// Standalone rate limiter.
    RateLimiter,
}

impl Mechanism {
    pub const COUNT: usize = 4;

    pub const ALL: [Mechanism; Mechanism::COUNT] = [
        Mechanism::Sentinel,
        Mechanism::Resilience4j,
        Mechanism::Hystrix,
        Mechanism::RateLimiter,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Mechanism::Sentinel => "sentinel",
            Mechanism::Resilience4j => "resilience4j",
            Mechanism::Hystrix => "hystrix",
            Mechanism::RateLimiter => "ratelimiter",
        }
    }

    /// Dense slot index, `0..COUNT`.
    pub fn index(self) -> usize {
        match self {
            Mechanism::Sentinel => 0,
            Mechanism::Resilience4j => 1,
            Mechanism::Hystrix => 2,
            Mechanism::RateLimiter => 3,
        }
    }

    /// Counter incremented when this mechanism reports `outcome`.
    ///
    /// `None` means the outcome is not tracked for this mechanism. Outcomes
    /// are compared by status, so `Other(429)` counts as `TooManyRequests`.
    pub fn counter_for(self, outcome: Outcome) -> Option<&'static str> {
        match (self, outcome.normalized()) {
            (Mechanism::Sentinel, Outcome::TooManyRequests) => {
                Some(names::SENTINEL_REQUEST_RESTRICT_TOTAL)
            }
            (Mechanism::Sentinel, Outcome::InternalError) => {
                Some(names::SENTINEL_REQUEST_CIRCUITBREAKER_TOTAL)
            }
            (Mechanism::Resilience4j, Outcome::TooManyRequests) => {
                Some(names::RESILIENCE4J_REQUEST_RESTRICT_TOTAL)
            }
            (Mechanism::Resilience4j, Outcome::InternalError) => {
                Some(names::RESILIENCE4J_REQUEST_CIRCUITBREAKER_TOTAL)
            }
            (Mechanism::Hystrix, Outcome::InternalError) => {
                Some(names::HYSTRIX_REQUEST_CIRCUITBREAKER_TOTAL)
            }
            (Mechanism::RateLimiter, Outcome::TooManyRequests) => {
                Some(names::RATELIMITER_REQUEST_RESTRICT_TOTAL)
            }
            _ => None,
        }
    }
}

/// What a protective stage did to a request, expressed as the status it
/// answered (or would answer) with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Outcome {
    /// 429: the request was rejected by admission control.
    TooManyRequests,
    /// 500: the request was short-circuited by a breaker.
    InternalError,
    /// Any other status; never counted. `Other(429)` and `Other(500)` are
    /// treated as their named variants.
    Other(u16),
}

impl Outcome {
    pub fn from_status(status: u16) -> Self {
        match status {
            429 => Outcome::TooManyRequests,
            500 => Outcome::InternalError,
            other => Outcome::Other(other),
        }
    }

    /// Named variant for 429/500 even when built as `Other`.
    pub fn normalized(self) -> Self {
        Outcome::from_status(self.status())
    }

    pub fn status(self) -> u16 {
        match self {
            Outcome::TooManyRequests => 429,
            Outcome::InternalError => 500,
            Outcome::Other(s) => s,
        }
    }
}

impl From<u16> for Outcome {
    fn from(status: u16) -> Self {
        Outcome::from_status(status)
    }
}
