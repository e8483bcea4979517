/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Display-only currency rates.
//!
//! Rates are fetched by a library-user-provided [`RateProvider`] on a fixed interval, on a thread of
//! their own so that a slow provider never stalls the ledger. A failed fetch is replaced by
//! [`ExchangeRates::FALLBACK`] and never reaches the caller.

use std::{
    sync::mpsc::{Receiver, RecvTimeoutError, Sender},
    thread::{self, JoinHandle},
    time::Duration,
};

use thiserror::Error;

/// Conversion rates into Sri Lankan rupees.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ExchangeRates {
    pub usd_to_lkr: f64,
    pub eur_to_lkr: f64,
}

impl ExchangeRates {
    pub const FALLBACK: ExchangeRates = ExchangeRates {
        usd_to_lkr: 310.0,
        eur_to_lkr: 335.0,
    };

    /// Derive rates from a USD-based quote table: `lkr_per_usd` rupees and `eur_per_usd` euros buy one
    /// dollar. Both results are rounded up to whole rupees. Returns `None` unless both quotes and
    /// both derived rates are positive and finite.
    pub fn from_usd_quotes(lkr_per_usd: f64, eur_per_usd: f64) -> Option<ExchangeRates> {
        if !is_usable(lkr_per_usd) || !is_usable(eur_per_usd) {
            return None;
        }
        let rates = ExchangeRates {
            usd_to_lkr: lkr_per_usd.ceil(),
            eur_to_lkr: (lkr_per_usd / eur_per_usd).ceil(),
        };
        rates.is_valid().then_some(rates)
    }

    /// Whether both rates are positive and finite.
    pub fn is_valid(&self) -> bool {
        is_usable(self.usd_to_lkr) && is_usable(self.eur_to_lkr)
    }
}

fn is_usable(rate: f64) -> bool {
    rate.is_finite() && rate > 0.0
}

#[derive(Debug, Error)]
pub enum RateError {
    #[error("rate source unavailable: {0}")]
    Unavailable(String),

    #[error("rate source returned an unusable quote")]
    InvalidQuote,
}

/// A source of [`ExchangeRates`].
pub trait RateProvider: Send {
    fn fetch(&mut self) -> Result<ExchangeRates, RateError>;
}

/// A provider that always returns the same rates.
#[derive(Clone, Copy, Debug)]
pub struct FixedRates(pub ExchangeRates);

impl Default for FixedRates {
    fn default() -> Self {
        FixedRates(ExchangeRates::FALLBACK)
    }
}

impl RateProvider for FixedRates {
    fn fetch(&mut self) -> Result<ExchangeRates, RateError> {
        Ok(self.0)
    }
}

/// Fetch from `provider`, substituting the fallback rates on failure or when the provider returns
/// rates that are not [valid](ExchangeRates::is_valid).
pub fn fetch_or_fallback(provider: &mut impl RateProvider) -> ExchangeRates {
    match provider.fetch() {
        Ok(rates) if rates.is_valid() => rates,
        Ok(rates) => {
            log::warn!("Using fallback exchange rates: {}: {:?}", RateError::InvalidQuote, rates);
            ExchangeRates::FALLBACK
        }
        Err(err) => {
            log::warn!("Using fallback exchange rates: {}", err);
            ExchangeRates::FALLBACK
        }
    }
}

/// Spawn the rate poller thread. It fetches immediately, then once every `interval`, forwarding each
/// result into `inbox`, until it is told to shut down or the inbox is dropped.
pub(crate) fn start_rate_poller<P: RateProvider + 'static, I: From<ExchangeRates> + Send + 'static>(
    mut provider: P,
    interval: Duration,
    inbox: Sender<I>,
    shutdown_signal: Receiver<()>,
) -> JoinHandle<()> {
    thread::spawn(move || loop {
        let rates = fetch_or_fallback(&mut provider);
        if inbox.send(rates.into()).is_err() {
            return;
        }

        match shutdown_signal.recv_timeout(interval) {
            Ok(()) | Err(RecvTimeoutError::Disconnected) => return,
            Err(RecvTimeoutError::Timeout) => (),
        }
    })
}

#[cfg(test)]
mod tests {
    use std::sync::mpsc;

    use super::*;

    struct Broken;

    impl RateProvider for Broken {
        fn fetch(&mut self) -> Result<ExchangeRates, RateError> {
            Err(RateError::Unavailable("offline".to_string()))
        }
    }

    #[test]
    fn derives_euro_rate_from_usd_quotes() {
        let rates = ExchangeRates::from_usd_quotes(300.2, 0.92).unwrap();
        assert_eq!(rates.usd_to_lkr, 301.0);
        assert_eq!(rates.eur_to_lkr, (300.2f64 / 0.92).ceil());
    }

    #[test]
    fn rejects_unusable_quotes() {
        assert_eq!(ExchangeRates::from_usd_quotes(0.0, 0.9), None);
        assert_eq!(ExchangeRates::from_usd_quotes(300.0, f64::NAN), None);
    }

    #[test]
    fn failure_falls_back() {
        assert_eq!(fetch_or_fallback(&mut Broken), ExchangeRates::FALLBACK);
    }

    #[test]
    fn unusable_provider_rates_fall_back() {
        let unusable = [
            (f64::NAN, 335.0),
            (310.0, f64::INFINITY),
            (0.0, 335.0),
            (310.0, -1.0),
        ];
        for (usd_to_lkr, eur_to_lkr) in unusable {
            let mut provider = FixedRates(ExchangeRates { usd_to_lkr, eur_to_lkr });
            assert_eq!(fetch_or_fallback(&mut provider), ExchangeRates::FALLBACK);
        }

        let good = ExchangeRates {
            usd_to_lkr: 301.0,
            eur_to_lkr: 327.0,
        };
        assert_eq!(fetch_or_fallback(&mut FixedRates(good)), good);
    }

    #[test]
    fn poller_fetches_immediately_and_stops_on_shutdown() {
        let (inbox, rates) = mpsc::channel::<ExchangeRates>();
        let (shutdown, shutdown_receiver) = mpsc::channel();
        let provider = FixedRates(ExchangeRates {
            usd_to_lkr: 1.0,
            eur_to_lkr: 2.0,
        });
        let poller = start_rate_poller(provider, Duration::from_secs(3600), inbox, shutdown_receiver);

        let first = rates.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(first.eur_to_lkr, 2.0);

        shutdown.send(()).unwrap();
        poller.join().unwrap();
    }
}
