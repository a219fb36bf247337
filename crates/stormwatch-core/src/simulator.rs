//! Simulated lightning feed.
//!
//! On a fixed period the simulator scatters one strike around a reference
//! point, asks the geocoder for a best-effort place label, inserts the
//! strike and then drops everything past the retention window. The first
//! strike lands one full period after start.
//!
//! The feed is an explicit task: [`LightningSimulator::spawn`] returns a
//! [`SimulatorHandle`] whose [`shutdown`](SimulatorHandle::shutdown) stops
//! the loop and waits for it to exit.

use std::sync::Arc;

use chrono::Utc;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use stormwatch_providers::ReverseGeocoder;
use stormwatch_store::{EventStore, StoreError};
use stormwatch_types::{Coordinates, Intensity, NewStrike, StrikeRecord};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::config::{ConfigError, SimulationConfig};

/// Errors produced by a single simulation cycle or by the task itself.
#[derive(Debug, thiserror::Error)]
pub enum SimulatorError {
    /// The settings cannot drive a generator.
    #[error("invalid simulator settings: {source}")]
    Config {
        /// The validation failure.
        #[from]
        source: ConfigError,
    },

    /// The store rejected the generated strike.
    #[error("store rejected simulated strike: {source}")]
    Store {
        /// The underlying store error.
        #[from]
        source: StoreError,
    },

    /// The simulator task panicked or was cancelled.
    #[error("simulator task failed: {source}")]
    Join {
        /// The underlying join error.
        #[from]
        source: tokio::task::JoinError,
    },
}

/// Periodic strike generator bound to one store and one geocoder.
pub struct LightningSimulator<G> {
    store: Arc<EventStore>,
    geocoder: G,
    config: SimulationConfig,
    rng: StdRng,
}

impl<G> std::fmt::Debug for LightningSimulator<G> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LightningSimulator")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl<G: ReverseGeocoder + 'static> LightningSimulator<G> {
    /// Create a simulator. A configured seed makes the sequence of
    /// coordinates and intensities reproducible.
    ///
    /// # Errors
    ///
    /// Returns [`SimulatorError::Config`] if `config` fails
    /// [`SimulationConfig::validate`].
    pub fn new(
        store: Arc<EventStore>,
        geocoder: G,
        config: SimulationConfig,
    ) -> Result<Self, SimulatorError> {
        config.validate()?;
        let rng = config
            .seed
            .map_or_else(StdRng::from_os_rng, StdRng::seed_from_u64);
        Ok(Self {
            store,
            geocoder,
            config,
            rng,
        })
    }

    /// Draw the next strike without a location label.
    pub fn generate(&mut self) -> NewStrike {
        let reference = self.config.reference_point();
        let jitter = self.config.jitter_degrees;
        let lat = self.rng.random_range(-jitter..=jitter);
        let lon = self.rng.random_range(-jitter..=jitter);
        let coordinates =
            Coordinates::new(reference.lat + lat, reference.lon + lon).clamped();
        let intensity = self
            .rng
            .random_range(i64::from(Intensity::MIN.get())..=i64::from(Intensity::MAX.get()));

        NewStrike {
            coordinates,
            location: None,
            intensity,
            timestamp: Utc::now(),
        }
    }

    /// Run one cycle: generate, label, insert, evict.
    ///
    /// A failed lookup only drops the label. The lookup completes before
    /// the store is touched.
    ///
    /// # Errors
    ///
    /// Returns [`SimulatorError::Store`] if the store rejects the strike.
    pub async fn tick_once(&mut self) -> Result<StrikeRecord, SimulatorError> {
        let mut strike = self.generate();

        match self.geocoder.reverse_geocode(strike.coordinates).await {
            Ok(label) => strike.location = label,
            Err(e) => {
                warn!(
                    lat = strike.coordinates.lat,
                    lon = strike.coordinates.lon,
                    error = %e,
                    "reverse lookup failed, storing strike without a label"
                );
            }
        }

        let (record, evicted) = self
            .store
            .add_and_evict(strike, self.config.retention_minutes)
            .await?;

        info!(
            strike_id = %record.id,
            intensity = record.intensity.get(),
            location = record.location.as_deref().unwrap_or("-"),
            evicted,
            "simulated lightning strike"
        );
        Ok(record)
    }

    /// Drive cycles until `shutdown` flips to `true` or its sender drops.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        let period = self.config.interval();
        let start = Instant::now().checked_add(period).unwrap_or_else(Instant::now);
        let mut ticker = tokio::time::interval_at(start, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(
            interval_ms = self.config.interval_ms,
            retention_minutes = self.config.retention_minutes,
            "lightning simulator started"
        );

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(e) = self.tick_once().await {
                        warn!(error = %e, "simulation cycle failed");
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        debug!("lightning simulator stopped");
    }

    /// Start the feed on the current runtime.
    pub fn spawn(self) -> SimulatorHandle {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let join = tokio::spawn(self.run(shutdown_rx));
        SimulatorHandle { shutdown_tx, join }
    }
}

/// Owner of a running simulator task.
#[derive(Debug)]
pub struct SimulatorHandle {
    shutdown_tx: watch::Sender<bool>,
    join: JoinHandle<()>,
}

impl SimulatorHandle {
    /// Signal the loop to stop and wait for it.
    ///
    /// # Errors
    ///
    /// Returns [`SimulatorError::Join`] if the task panicked.
    pub async fn shutdown(self) -> Result<(), SimulatorError> {
        // The receiver may already be gone if the task ended on its own.
        let _ = self.shutdown_tx.send(true);
        self.join.await?;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use stormwatch_providers::ProviderError;

    use super::*;

    #[derive(Clone, Default)]
    struct FakeGeocoder {
        calls: Arc<AtomicUsize>,
        fail: bool,
    }

    impl ReverseGeocoder for FakeGeocoder {
        async fn reverse_geocode(
            &self,
            _coordinates: Coordinates,
        ) -> Result<Option<String>, ProviderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                Err(ProviderError::Upstream("boom".to_owned()))
            } else {
                Ok(Some("Oakland, California, United States".to_owned()))
            }
        }
    }

    fn seeded(seed: u64) -> SimulationConfig {
        SimulationConfig {
            seed: Some(seed),
            ..SimulationConfig::default()
        }
    }

    #[test]
    fn generated_strikes_stay_inside_the_jitter_box() {
        let store = Arc::new(EventStore::new());
        let mut sim = LightningSimulator::new(store, FakeGeocoder::default(), seeded(42)).unwrap();
        for _ in 0..1_000 {
            let strike = sim.generate();
            assert!((strike.coordinates.lat - 37.7749).abs() <= 1.0 + 1e-9);
            assert!((strike.coordinates.lon - -122.4194).abs() <= 1.0 + 1e-9);
            assert!((1..=10).contains(&strike.intensity));
            assert!(strike.location.is_none());
        }
    }

    #[test]
    fn unusable_settings_are_rejected() {
        let bad = [
            SimulationConfig {
                interval_ms: 0,
                ..seeded(1)
            },
            SimulationConfig {
                jitter_degrees: -0.5,
                ..seeded(1)
            },
            SimulationConfig {
                jitter_degrees: f64::NAN,
                ..seeded(1)
            },
            SimulationConfig {
                reference_lat: 91.0,
                ..seeded(1)
            },
        ];
        for config in bad {
            let result =
                LightningSimulator::new(Arc::new(EventStore::new()), FakeGeocoder::default(), config);
            assert!(matches!(
                result,
                Err(SimulatorError::Config {
                    source: ConfigError::Invalid { .. }
                })
            ));
        }
    }

    #[test]
    fn zero_jitter_pins_strikes_to_the_reference_point() {
        let config = SimulationConfig {
            jitter_degrees: 0.0,
            ..seeded(2)
        };
        let mut sim =
            LightningSimulator::new(Arc::new(EventStore::new()), FakeGeocoder::default(), config)
                .unwrap();
        let strike = sim.generate();
        assert_eq!(strike.coordinates, SimulationConfig::default().reference_point());
    }

    #[test]
    fn same_seed_same_sequence() {
        let store = Arc::new(EventStore::new());
        let mut a = LightningSimulator::new(Arc::clone(&store), FakeGeocoder::default(), seeded(7)).unwrap();
        let mut b = LightningSimulator::new(store, FakeGeocoder::default(), seeded(7)).unwrap();
        for _ in 0..20 {
            let (x, y) = (a.generate(), b.generate());
            assert_eq!(x.coordinates, y.coordinates);
            assert_eq!(x.intensity, y.intensity);
        }
    }

    #[test]
    fn coordinates_near_the_pole_are_clamped() {
        let config = SimulationConfig {
            reference_lat: 89.9,
            reference_lon: 179.9,
            ..seeded(1)
        };
        let mut sim =
            LightningSimulator::new(Arc::new(EventStore::new()), FakeGeocoder::default(), config)
                .unwrap();
        for _ in 0..500 {
            assert!(sim.generate().coordinates.is_valid());
        }
    }

    #[tokio::test]
    async fn tick_inserts_labelled_strike() {
        let store = Arc::new(EventStore::new());
        let geocoder = FakeGeocoder::default();
        let mut sim = LightningSimulator::new(Arc::clone(&store), geocoder.clone(), seeded(3)).unwrap();

        let record = sim.tick_once().await.unwrap();
        assert_eq!(
            record.location.as_deref(),
            Some("Oakland, California, United States")
        );
        assert_eq!(geocoder.calls.load(Ordering::SeqCst), 1);
        assert_eq!(store.recent(10).await, vec![record]);
    }

    #[tokio::test]
    async fn failed_lookup_still_inserts() {
        let store = Arc::new(EventStore::new());
        let geocoder = FakeGeocoder {
            fail: true,
            ..FakeGeocoder::default()
        };
        let mut sim = LightningSimulator::new(Arc::clone(&store), geocoder, seeded(3)).unwrap();

        let record = sim.tick_once().await.unwrap();
        assert!(record.location.is_none());
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn first_strike_lands_one_period_after_start() {
        let store = Arc::new(EventStore::new());
        let sim =
            LightningSimulator::new(Arc::clone(&store), FakeGeocoder::default(), seeded(9)).unwrap();
        let handle = sim.spawn();

        tokio::time::sleep(Duration::from_millis(14_900)).await;
        assert!(store.is_empty().await);

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(store.len().await, 1);

        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(store.len().await, 3);

        handle.shutdown().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn lookup_failures_do_not_stop_the_loop() {
        let store = Arc::new(EventStore::new());
        let geocoder = FakeGeocoder {
            fail: true,
            ..FakeGeocoder::default()
        };
        let config = SimulationConfig {
            interval_ms: 1_000,
            ..seeded(5)
        };
        let handle = LightningSimulator::new(Arc::clone(&store), geocoder.clone(), config)
            .unwrap()
            .spawn();

        tokio::time::sleep(Duration::from_millis(5_500)).await;
        assert_eq!(store.len().await, 5);
        assert_eq!(geocoder.calls.load(Ordering::SeqCst), 5);

        handle.shutdown().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_stops_generation() {
        let store = Arc::new(EventStore::new());
        let config = SimulationConfig {
            interval_ms: 1_000,
            ..seeded(11)
        };
        let handle = LightningSimulator::new(Arc::clone(&store), FakeGeocoder::default(), config)
            .unwrap()
            .spawn();

        tokio::time::sleep(Duration::from_millis(2_500)).await;
        handle.shutdown().await.unwrap();
        let after_shutdown = store.len().await;

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(store.len().await, after_shutdown);
        assert_eq!(after_shutdown, 2);
    }
}
