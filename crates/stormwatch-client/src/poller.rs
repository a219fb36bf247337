//! Async driver that owns the strikes and weather views.
//!
//! The driver is a single task. Presentation code talks to it through
//! [`PollerCommand`]s and observes it through a `watch` channel of
//! [`DashboardSnapshot`]s. Fetches run as separate tasks over a
//! [`DashboardApi`] and report back on an internal channel, so a slow
//! provider never blocks commands or the other view.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use stormwatch_types::{CitySearchResult, StrikeRecord, WeatherSnapshot};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::api::{is_searchable, DashboardApi};
use crate::error::ClientError;
use crate::location::{weather_key, SelectedLocation};
use crate::view::{PolledView, Ticket, ViewSnapshot};

/// Capacity of the command channel.
const COMMAND_CAPACITY: usize = 32;

/// Polling schedule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollerConfig {
    /// Time between strike list fetches.
    pub strikes_interval: Duration,
    /// Age after which the strike list is flagged stale.
    pub strikes_stale_after: Duration,
    /// Time between weather fetches.
    pub weather_interval: Duration,
    /// Age after which weather is flagged stale.
    pub weather_stale_after: Duration,
    /// Connection state at start.
    pub connected: bool,
    /// Whether strike alerts are enabled at start.
    pub strikes_enabled: bool,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            strikes_interval: Duration::from_secs(10),
            strikes_stale_after: Duration::ZERO,
            weather_interval: Duration::from_secs(300),
            weather_stale_after: Duration::from_secs(120),
            connected: true,
            strikes_enabled: true,
        }
    }
}

/// Instructions from presentation code.
#[derive(Debug, Clone, PartialEq)]
pub enum PollerCommand {
    /// The user connected or disconnected.
    SetConnected(bool),
    /// Strike alerts were switched on or off.
    SetStrikesEnabled(bool),
    /// A location was picked (or cleared).
    SelectLocation(Option<SelectedLocation>),
    /// Re-fetch both views now.
    Refresh,
    /// Stop the driver.
    Shutdown,
}

/// Everything presentation code needs to render the dashboard.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSnapshot {
    /// Whether polling is connected.
    pub connected: bool,
    /// Whether strike alerts are enabled.
    pub strikes_enabled: bool,
    /// The selected location, if any.
    pub selection: Option<SelectedLocation>,
    /// Weather key derived from the selection (`None` while suppressed).
    pub weather_key: Option<String>,
    /// Recent strikes.
    pub strikes: ViewSnapshot<Vec<StrikeRecord>>,
    /// Weather for `weather_key`.
    pub weather: ViewSnapshot<WeatherSnapshot>,
}

enum FetchOutcome {
    Strikes(Ticket<()>, Result<Vec<StrikeRecord>, ClientError>),
    Weather(Ticket<String>, Result<WeatherSnapshot, ClientError>),
}

/// The driver task state.
pub struct DashboardPoller<A> {
    api: Arc<A>,
    connected: bool,
    strikes_enabled: bool,
    selection: Option<SelectedLocation>,
    strikes: PolledView<(), Vec<StrikeRecord>>,
    weather: PolledView<String, WeatherSnapshot>,
    results_tx: mpsc::UnboundedSender<FetchOutcome>,
    results_rx: mpsc::UnboundedReceiver<FetchOutcome>,
    snapshot_tx: watch::Sender<DashboardSnapshot>,
}

impl<A> std::fmt::Debug for DashboardPoller<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DashboardPoller")
            .field("connected", &self.connected)
            .field("strikes_enabled", &self.strikes_enabled)
            .field("selection", &self.selection)
            .finish_non_exhaustive()
    }
}

impl<A: DashboardApi> DashboardPoller<A> {
    /// Start the driver on the current runtime.
    pub fn spawn(api: Arc<A>, config: &PollerConfig) -> PollerHandle<A> {
        let (command_tx, command_rx) = mpsc::channel(COMMAND_CAPACITY);
        let (results_tx, results_rx) = mpsc::unbounded_channel();

        let strikes = PolledView::new(config.strikes_interval, config.strikes_stale_after)
            .with_key(());
        let weather = PolledView::new(config.weather_interval, config.weather_stale_after);

        let mut poller = Self {
            api: Arc::clone(&api),
            connected: config.connected,
            strikes_enabled: config.strikes_enabled,
            selection: None,
            strikes,
            weather,
            results_tx,
            results_rx,
            snapshot_tx: watch::Sender::new(DashboardSnapshot {
                connected: config.connected,
                strikes_enabled: config.strikes_enabled,
                selection: None,
                weather_key: None,
                strikes: ViewSnapshot::default(),
                weather: ViewSnapshot::default(),
            }),
        };

        let now = Instant::now();
        poller.weather.set_key(weather_key(None), now);
        poller.sync_activity(now);
        poller.publish(now);

        let snapshots = poller.snapshot_tx.subscribe();
        let join = tokio::spawn(poller.run(command_rx));
        PollerHandle {
            api,
            commands: command_tx,
            snapshots,
            join,
        }
    }

    async fn run(mut self, mut commands: mpsc::Receiver<PollerCommand>) {
        info!(connected = self.connected, "dashboard poller started");

        loop {
            let now = Instant::now();
            let deadline = [
                self.strikes.next_due(),
                self.weather.next_due(),
                self.strikes.stale_at().filter(|at| *at > now),
                self.weather.stale_at().filter(|at| *at > now),
            ]
            .into_iter()
            .flatten()
            .min();

            tokio::select! {
                command = commands.recv() => match command {
                    None | Some(PollerCommand::Shutdown) => break,
                    Some(command) => self.apply(command, Instant::now()),
                },
                Some(outcome) = self.results_rx.recv() => self.complete(outcome, Instant::now()),
                // Scheduled fetches, and staleness flips that need publishing.
                () = tokio::time::sleep_until(deadline.unwrap_or(now)), if deadline.is_some() => {
                    self.poll_due(Instant::now());
                }
            }

            self.publish(Instant::now());
        }

        debug!("dashboard poller stopped");
    }

    fn apply(&mut self, command: PollerCommand, now: Instant) {
        debug!(?command, "poller command");
        match command {
            PollerCommand::SetConnected(connected) => {
                self.connected = connected;
                self.sync_activity(now);
            }
            PollerCommand::SetStrikesEnabled(enabled) => {
                self.strikes_enabled = enabled;
                self.sync_activity(now);
            }
            PollerCommand::SelectLocation(selection) => {
                let key = weather_key(selection.as_ref());
                self.selection = selection;
                if let Some(ticket) = self.weather.set_key(key, now) {
                    self.fetch_weather(ticket);
                }
            }
            PollerCommand::Refresh => {
                if let Some(ticket) = self.strikes.refresh(now) {
                    self.fetch_strikes(ticket);
                }
                if let Some(ticket) = self.weather.refresh(now) {
                    self.fetch_weather(ticket);
                }
            }
            PollerCommand::Shutdown => {}
        }
    }

    fn sync_activity(&mut self, now: Instant) {
        let strikes_active = self.connected && self.strikes_enabled;
        if let Some(ticket) = self.strikes.set_active(strikes_active, now) {
            self.fetch_strikes(ticket);
        }
        if let Some(ticket) = self.weather.set_active(self.connected, now) {
            self.fetch_weather(ticket);
        }
    }

    fn poll_due(&mut self, now: Instant) {
        if let Some(ticket) = self.strikes.poll_due(now) {
            self.fetch_strikes(ticket);
        }
        if let Some(ticket) = self.weather.poll_due(now) {
            self.fetch_weather(ticket);
        }
    }

    fn complete(&mut self, outcome: FetchOutcome, now: Instant) {
        match outcome {
            FetchOutcome::Strikes(ticket, result) => {
                let result = result.map_err(|e| e.to_string());
                if !self.strikes.complete(&ticket, result, now) {
                    debug!(generation = ticket.generation, "discarding superseded strikes result");
                }
            }
            FetchOutcome::Weather(ticket, result) => {
                if let Err(e) = &result {
                    warn!(city = %ticket.key, error = %e, "weather fetch failed");
                }
                let result = result.map_err(|e| e.to_string());
                if !self.weather.complete(&ticket, result, now) {
                    debug!(city = %ticket.key, "discarding superseded weather result");
                }
            }
        }
    }

    fn fetch_strikes(&self, ticket: Ticket<()>) {
        let api = Arc::clone(&self.api);
        let results = self.results_tx.clone();
        tokio::spawn(async move {
            let result = api.recent_strikes().await;
            // The driver may have stopped; nothing to report to then.
            let _ = results.send(FetchOutcome::Strikes(ticket, result));
        });
    }

    fn fetch_weather(&self, ticket: Ticket<String>) {
        let api = Arc::clone(&self.api);
        let results = self.results_tx.clone();
        tokio::spawn(async move {
            let result = api.weather(&ticket.key).await;
            let _ = results.send(FetchOutcome::Weather(ticket, result));
        });
    }

    fn publish(&self, now: Instant) {
        let snapshot = DashboardSnapshot {
            connected: self.connected,
            strikes_enabled: self.strikes_enabled,
            selection: self.selection.clone(),
            weather_key: self.weather.key().cloned(),
            strikes: self.strikes.snapshot(now),
            weather: self.weather.snapshot(now),
        };
        self.snapshot_tx.send_if_modified(|current| {
            if *current == snapshot {
                false
            } else {
                *current = snapshot;
                true
            }
        });
    }
}

/// Handle to a running [`DashboardPoller`].
#[derive(Debug)]
pub struct PollerHandle<A> {
    api: Arc<A>,
    commands: mpsc::Sender<PollerCommand>,
    snapshots: watch::Receiver<DashboardSnapshot>,
    join: JoinHandle<()>,
}

impl<A: DashboardApi> PollerHandle<A> {
    /// Send a command to the driver.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Stopped`] if the driver has stopped.
    pub async fn send(&self, command: PollerCommand) -> Result<(), ClientError> {
        self.commands.send(command).await.map_err(|e| {
            debug!(command = ?e.0, "poller stopped, command dropped");
            ClientError::Stopped
        })
    }

    /// Place suggestions for `query`.
    ///
    /// Searching follows the connection: while disconnected, or for a
    /// query shorter than [`MIN_SEARCH_LEN`](crate::api::MIN_SEARCH_LEN)
    /// characters, the answer is empty and no request is made.
    ///
    /// # Errors
    ///
    /// Propagates the [`DashboardApi::search_cities`] failure.
    pub async fn search_cities(&self, query: &str) -> Result<Vec<CitySearchResult>, ClientError> {
        let connected = self.snapshots.borrow().connected;
        if !connected || !is_searchable(query) {
            debug!(query, connected, "city search suppressed");
            return Ok(Vec::new());
        }
        self.api.search_cities(query).await
    }

    /// A receiver that sees every published snapshot.
    pub fn subscribe(&self) -> watch::Receiver<DashboardSnapshot> {
        self.snapshots.clone()
    }

    /// The latest snapshot.
    pub fn snapshot(&self) -> DashboardSnapshot {
        self.snapshots.borrow().clone()
    }

    /// Stop the driver and wait for it.
    pub async fn shutdown(self) {
        // Already stopped is fine.
        let _ = self.commands.send(PollerCommand::Shutdown).await;
        if let Err(e) = self.join.await {
            warn!(error = %e, "dashboard poller task failed");
        }
    }
}
