//! Heartbeat sender for periodic liveness announcements

use chrono::Utc;
use parking_lot::{Mutex, RwLock};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::error::{Error, Result};
use crate::heartbeat::counter::HeartbeatCounter;
use crate::heartbeat::payload::HeartbeatPayloadBuilder;
use crate::heartbeat::tracker::MsgCounterTracker;
use crate::heartbeat::types::{HeartbeatConfig, LifecycleState, MIN_HEARTBEAT_PERIOD_MS};
use crate::model::{FeatureAddress, Header, MsgCounter};
use crate::transport::Sender;

/// Addresses the periodic heartbeat is sent from and to
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Endpoints {
    pub sender: Option<FeatureAddress>,
    pub destination: Option<FeatureAddress>,
}

/// Periodic heartbeat sender of one connection
///
/// While running, a background task notifies the destination every
/// `period` and remembers the message counters the transport assigned.
/// Requests for the current heartbeat are answered with
/// [`report_now`](Self::report_now). Both paths draw from the same
/// sequence counter, which like the correlation history survives
/// stop/start cycles.
///
/// Must be started from within a tokio runtime.
pub struct HeartbeatSender {
    config: HeartbeatConfig,
    shared: Arc<HeartbeatShared>,
    lifecycle: Mutex<Lifecycle>,
}

struct Lifecycle {
    state: LifecycleState,
    stop: Option<CancellationToken>,
}

impl HeartbeatSender {
    /// Create a heartbeat sender with the default period and timeout
    pub fn new(sender: Arc<dyn Sender>) -> Self {
        Self::with_config(sender, HeartbeatConfig::default())
    }

    /// Create a heartbeat sender with an explicit configuration
    ///
    /// A period below [`MIN_HEARTBEAT_PERIOD_MS`] is raised to it.
    pub fn with_config(sender: Arc<dyn Sender>, mut config: HeartbeatConfig) -> Self {
        if config.period_ms < MIN_HEARTBEAT_PERIOD_MS {
            warn!(
                "Heartbeat period of {}ms raised to {}ms",
                config.period_ms, MIN_HEARTBEAT_PERIOD_MS
            );
            config.period_ms = MIN_HEARTBEAT_PERIOD_MS;
        }

        let payload =
            HeartbeatPayloadBuilder::new(Arc::new(HeartbeatCounter::new()), config.timeout());

        Self {
            config,
            shared: Arc::new(HeartbeatShared {
                sender,
                payload,
                tracker: MsgCounterTracker::new(),
                endpoints: RwLock::new(Endpoints::default()),
            }),
            lifecycle: Mutex::new(Lifecycle {
                state: LifecycleState::Idle,
                stop: None,
            }),
        }
    }

    /// Start sending heartbeats from `sender_addr` to `destination_addr`
    ///
    /// A loop that is already running is stopped first. Ticks are skipped
    /// while either address is `None`.
    pub fn start(
        &self,
        sender_addr: impl Into<Option<FeatureAddress>>,
        destination_addr: impl Into<Option<FeatureAddress>>,
    ) {
        let mut lifecycle = self.lifecycle.lock();
        Self::stop_locked(&mut lifecycle);

        let endpoints = Endpoints {
            sender: sender_addr.into(),
            destination: destination_addr.into(),
        };
        info!(
            "Heartbeat started (every {}ms, {} -> {})",
            self.config.period_ms,
            display_addr(endpoints.sender.as_ref()),
            display_addr(endpoints.destination.as_ref()),
        );
        *self.shared.endpoints.write() = endpoints.clone();

        let stop = CancellationToken::new();
        let shared = Arc::clone(&self.shared);
        let period = self.config.period();
        let loop_stop = stop.clone();
        tokio::spawn(async move {
            shared.run_loop(period, endpoints, loop_stop).await;
        });

        lifecycle.stop = Some(stop);
        lifecycle.state = LifecycleState::Running;
    }

    /// Stop the heartbeat loop
    ///
    /// Safe to call in any state and any number of times. A tick that is
    /// already sending completes, no further tick starts.
    pub fn stop(&self) {
        let mut lifecycle = self.lifecycle.lock();
        Self::stop_locked(&mut lifecycle);
    }

    fn stop_locked(lifecycle: &mut Lifecycle) {
        if let Some(stop) = lifecycle.stop.take() {
            stop.cancel();
            info!("Heartbeat stopped");
        }
        lifecycle.state = LifecycleState::Stopped;
    }

    /// Answer a heartbeat request with the current heartbeat
    ///
    /// Unlike periodic sends, a delivery failure is returned to the caller.
    pub async fn report_now(&self, request_header: &Header) -> Result<()> {
        let cmd = self.shared.payload.build_cmd(Utc::now());
        let sender_addr = self.shared.endpoints.read().sender.clone();

        self.shared
            .sender
            .reply(request_header, sender_addr.as_ref(), cmd)
            .await
            .map_err(|e| {
                error!("Failed to reply with heartbeat: {}", e);
                Error::ReplyFailed(Box::new(e))
            })
    }

    /// Register the message counter of a sent heartbeat; `None` is ignored
    pub fn add_msg_counter(&self, msg_counter: Option<MsgCounter>) {
        if let Some(msg_counter) = msg_counter {
            self.shared.tracker.record(msg_counter);
        }
    }

    /// Whether `msg_counter` belongs to one of the recent heartbeats
    pub fn is_heartbeat_msg_counter(&self, msg_counter: MsgCounter) -> bool {
        self.shared.tracker.contains(msg_counter)
    }

    /// Message counters of the recent heartbeats, oldest first
    pub fn tracked_msg_counters(&self) -> Vec<MsgCounter> {
        self.shared.tracker.snapshot()
    }

    /// Last heartbeat sequence number issued, 0 if none
    pub fn counter(&self) -> u64 {
        self.shared.payload.counter().current()
    }

    pub fn state(&self) -> LifecycleState {
        self.lifecycle.lock().state
    }

    pub fn is_running(&self) -> bool {
        self.state() == LifecycleState::Running
    }

    pub fn config(&self) -> &HeartbeatConfig {
        &self.config
    }

    pub fn endpoints(&self) -> Endpoints {
        self.shared.endpoints.read().clone()
    }

    /// Get sender status
    pub fn status(&self) -> serde_json::Value {
        let endpoints = self.endpoints();

        serde_json::json!({
            "state": self.state(),
            "period_ms": self.config.period_ms,
            "timeout_ms": self.config.timeout_ms,
            "counter": self.counter(),
            "sender": endpoints.sender.as_ref().map(ToString::to_string),
            "destination": endpoints.destination.as_ref().map(ToString::to_string),
            "msg_counters": self.tracked_msg_counters(),
        })
    }
}

impl Drop for HeartbeatSender {
    fn drop(&mut self) {
        if let Some(stop) = self.lifecycle.get_mut().stop.take() {
            stop.cancel();
        }
    }
}

/// State shared with the background loop
struct HeartbeatShared {
    sender: Arc<dyn Sender>,
    payload: HeartbeatPayloadBuilder,
    tracker: MsgCounterTracker,
    endpoints: RwLock<Endpoints>,
}

impl HeartbeatShared {
    /// Tick every `period` until `stop` fires
    ///
    /// The loop keeps the endpoints it was started with, so a loop replaced
    /// by a later `start` never sends to the new destination.
    async fn run_loop(&self, period: Duration, endpoints: Endpoints, stop: CancellationToken) {
        let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                biased;
                _ = stop.cancelled() => break,
                _ = ticker.tick() => {}
            }

            self.tick(&endpoints).await;
        }

        debug!("Heartbeat loop ended");
    }

    async fn tick(&self, endpoints: &Endpoints) {
        let (Some(sender_addr), Some(destination_addr)) =
            (&endpoints.sender, &endpoints.destination)
        else {
            return;
        };

        let cmd = self.payload.build_cmd(Utc::now());
        match self.sender.notify(sender_addr, destination_addr, cmd).await {
            Ok(msg_counter) => {
                debug!("Heartbeat sent to {} (msg_counter={})", destination_addr, msg_counter);
                self.tracker.record(msg_counter);
            }
            Err(e) => {
                warn!("Failed to send heartbeat to {}: {}", destination_addr, e);
            }
        }
    }
}

fn display_addr(addr: Option<&FeatureAddress>) -> String {
    addr.map(ToString::to_string)
        .unwrap_or_else(|| "<unset>".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Cmd, CmdClassifier, FunctionType, HeartbeatData};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

    /// Transport double recording every call
    #[derive(Default)]
    struct RecordingSender {
        notifications: Mutex<Vec<(FeatureAddress, HeartbeatData)>>,
        replies: Mutex<Vec<(Option<FeatureAddress>, HeartbeatData)>>,
        notify_calls: AtomicUsize,
        next_msg_counter: AtomicU64,
        /// 1-based notify calls that fail
        failing_notifies: Vec<usize>,
        fail_replies: bool,
    }

    impl RecordingSender {
        fn failing_notifies(calls: Vec<usize>) -> Self {
            Self {
                failing_notifies: calls,
                ..Default::default()
            }
        }

        fn failing_replies() -> Self {
            Self {
                fail_replies: true,
                ..Default::default()
            }
        }

        fn notified_counters(&self) -> Vec<u64> {
            self.notifications
                .lock()
                .iter()
                .filter_map(|(_, data)| data.heartbeat_counter)
                .collect()
        }

        fn notified_destinations(&self) -> Vec<FeatureAddress> {
            self.notifications
                .lock()
                .iter()
                .map(|(destination, _)| destination.clone())
                .collect()
        }
    }

    fn heartbeat(cmd: Cmd) -> HeartbeatData {
        match cmd {
            Cmd::DeviceDiagnosisHeartbeatData(data) => data,
            other => panic!("unexpected cmd {:?}", other),
        }
    }

    #[async_trait]
    impl Sender for RecordingSender {
        async fn notify(
            &self,
            _sender: &FeatureAddress,
            destination: &FeatureAddress,
            cmd: Cmd,
        ) -> Result<MsgCounter> {
            let call = self.notify_calls.fetch_add(1, Ordering::SeqCst) + 1;
            self.notifications
                .lock()
                .push((destination.clone(), heartbeat(cmd)));
            if self.failing_notifies.contains(&call) {
                return Err(Error::Transport("link down".to_string()));
            }
            Ok(100 + self.next_msg_counter.fetch_add(1, Ordering::SeqCst))
        }

        async fn reply(
            &self,
            _request_header: &Header,
            sender: Option<&FeatureAddress>,
            cmd: Cmd,
        ) -> Result<()> {
            self.replies.lock().push((sender.cloned(), heartbeat(cmd)));
            if self.fail_replies {
                return Err(Error::Transport("link down".to_string()));
            }
            Ok(())
        }

        async fn request(
            &self,
            _sender: &FeatureAddress,
            _destination: &FeatureAddress,
            _function: FunctionType,
        ) -> Result<MsgCounter> {
            unreachable!("heartbeat never requests data")
        }
    }

    fn local() -> FeatureAddress {
        FeatureAddress::new("local", vec![0], 1)
    }

    fn remote(device: &str) -> FeatureAddress {
        FeatureAddress::new(device, vec![1], 2)
    }

    fn request_header() -> Header {
        Header::new(CmdClassifier::Read)
            .with_source(remote("peer"))
            .with_msg_counter(9)
    }

    fn ms(millis: u64) -> Duration {
        Duration::from_millis(millis)
    }

    #[tokio::test(start_paused = true)]
    async fn test_new_sender_is_idle() {
        let sender = HeartbeatSender::new(Arc::new(RecordingSender::default()));

        assert_eq!(sender.state(), LifecycleState::Idle);
        assert_eq!(sender.config(), &HeartbeatConfig::default());
        assert_eq!(sender.counter(), 0);
        assert!(sender.tracked_msg_counters().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_periodic_heartbeats_are_tracked() {
        let transport = Arc::new(RecordingSender::default());
        let sender = HeartbeatSender::new(transport.clone());

        sender.start(local(), remote("peer"));
        assert!(sender.is_running());

        tokio::time::sleep(ms(2400) + ms(10)).await;

        let counters = transport.notified_counters();
        assert!(counters.len() >= 2);
        assert_eq!(counters, (1..=counters.len() as u64).collect::<Vec<_>>());
        assert!(sender.is_heartbeat_msg_counter(100));
        assert!(sender.is_heartbeat_msg_counter(101));
        assert!(!sender.is_heartbeat_msg_counter(42));

        let notifications = transport.notifications.lock();
        let (_, first) = &notifications[0];
        assert_eq!(first.heartbeat_timeout.as_deref(), Some("PT4S"));
        assert!(first.timestamp.as_deref().unwrap().ends_with('Z'));
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_heartbeat_before_first_period() {
        let transport = Arc::new(RecordingSender::default());
        let sender = HeartbeatSender::new(transport.clone());

        sender.start(local(), remote("peer"));
        tokio::time::sleep(ms(790)).await;

        assert!(transport.notified_counters().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_ticks_skipped_without_endpoints() {
        let transport = Arc::new(RecordingSender::default());
        let sender = HeartbeatSender::new(transport.clone());

        sender.start(None, remote("peer"));
        tokio::time::sleep(ms(3000)).await;

        assert!(transport.notified_counters().is_empty());
        assert_eq!(sender.counter(), 0);
        assert!(sender.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_notify_keeps_loop_running() {
        let transport = Arc::new(RecordingSender::failing_notifies(vec![3]));
        let sender = HeartbeatSender::new(transport.clone());

        sender.start(local(), remote("peer"));
        tokio::time::sleep(ms(4000) + ms(100)).await;

        let counters = transport.notified_counters();
        assert_eq!(counters, vec![1, 2, 3, 4, 5]);
        assert_eq!(counters[3], counters[1] + 2);

        // The failed third send is not tracked; msg counters 100..=103 belong to sends 1, 2, 4, 5.
        assert_eq!(sender.tracked_msg_counters(), vec![100, 101, 102, 103]);
        assert!(sender.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn test_tracker_keeps_last_ten() {
        let transport = Arc::new(RecordingSender::default());
        let sender = HeartbeatSender::new(transport.clone());

        sender.start(local(), remote("peer"));
        tokio::time::sleep(ms(800 * 12) + ms(100)).await;

        assert_eq!(transport.notified_counters().len(), 12);
        assert_eq!(sender.tracked_msg_counters(), (102..=111).collect::<Vec<_>>());
        assert!(!sender.is_heartbeat_msg_counter(100));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_is_idempotent_in_every_state() {
        let transport = Arc::new(RecordingSender::default());
        let sender = HeartbeatSender::new(transport.clone());

        sender.stop();
        sender.stop();
        assert_eq!(sender.state(), LifecycleState::Stopped);

        sender.start(local(), remote("peer"));
        sender.stop();
        sender.stop();
        assert_eq!(sender.state(), LifecycleState::Stopped);

        tokio::time::sleep(ms(2000)).await;
        assert!(transport.notified_counters().is_empty());
    }

    #[test]
    fn test_concurrent_stops_do_not_panic() {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .enable_all()
            .build()
            .unwrap();
        let sender = Arc::new(HeartbeatSender::new(Arc::new(RecordingSender::default())));

        runtime.block_on(async {
            sender.start(local(), remote("peer"));
        });

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let sender = Arc::clone(&sender);
                std::thread::spawn(move || sender.stop())
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(sender.state(), LifecycleState::Stopped);
    }

    #[tokio::test(start_paused = true)]
    async fn test_restart_after_stop_continues_sequence() {
        let transport = Arc::new(RecordingSender::default());
        let sender = HeartbeatSender::new(transport.clone());

        sender.start(local(), remote("peer"));
        tokio::time::sleep(ms(1700)).await;
        sender.stop();
        tokio::time::sleep(ms(2000)).await;
        assert_eq!(transport.notified_counters(), vec![1, 2]);

        sender.start(local(), remote("peer"));
        tokio::time::sleep(ms(900)).await;

        assert_eq!(transport.notified_counters(), vec![1, 2, 3]);
        assert_eq!(sender.tracked_msg_counters(), vec![100, 101, 102]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_while_running_replaces_loop() {
        let transport = Arc::new(RecordingSender::default());
        let sender = HeartbeatSender::new(transport.clone());

        sender.start(local(), remote("old"));
        tokio::time::sleep(ms(1000)).await;
        sender.start(local(), remote("new"));
        tokio::time::sleep(ms(2000)).await;

        // Old loop: tick at 800. New loop: ticks at 1800 and 2600.
        assert_eq!(
            transport.notified_destinations(),
            vec![remote("old"), remote("new"), remote("new")]
        );
        assert_eq!(sender.endpoints().destination, Some(remote("new")));
        assert!(sender.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn test_loop_keeps_endpoints_it_started_with() {
        let transport = Arc::new(RecordingSender::default());
        let sender = HeartbeatSender::new(transport.clone());

        sender.start(local(), remote("old"));
        sender.shared.endpoints.write().destination = Some(remote("new"));
        tokio::time::sleep(ms(1700)).await;

        assert_eq!(
            transport.notified_destinations(),
            vec![remote("old"), remote("old")]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_period_is_raised_to_minimum() {
        let transport = Arc::new(RecordingSender::default());
        let config = HeartbeatConfig {
            period_ms: 0,
            timeout_ms: 0,
        };
        let sender = HeartbeatSender::with_config(transport.clone(), config);
        assert_eq!(sender.config().period_ms, MIN_HEARTBEAT_PERIOD_MS);

        sender.start(local(), remote("peer"));
        tokio::time::sleep(ms(5) + Duration::from_micros(500)).await;

        assert!(sender.is_running());
        assert_eq!(transport.notified_counters(), vec![1, 2, 3, 4, 5]);
        let notifications = transport.notifications.lock();
        let (_, first) = &notifications[0];
        assert_eq!(first.heartbeat_timeout.as_deref(), Some("PT0S"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_repeated_starts_leave_one_loop() {
        let transport = Arc::new(RecordingSender::default());
        let sender = HeartbeatSender::new(transport.clone());

        for device in ["a", "b", "c"] {
            sender.start(local(), remote(device));
        }
        tokio::time::sleep(ms(2000)).await;

        assert_eq!(transport.notified_destinations(), vec![remote("c"), remote("c")]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_starts_leave_one_loop() {
        let transport = Arc::new(RecordingSender::default());
        let config = HeartbeatConfig {
            period_ms: 20,
            timeout_ms: 100,
        };
        let sender = Arc::new(HeartbeatSender::with_config(transport.clone(), config));

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let sender = Arc::clone(&sender);
                tokio::spawn(async move {
                    sender.start(local(), remote(&format!("peer-{}", i)));
                })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap();
        }

        // Let superseded loops finish any tick they were already in.
        tokio::time::sleep(ms(50)).await;
        let settled = transport.notified_destinations().len();
        tokio::time::sleep(ms(200)).await;

        let winner = sender.endpoints().destination.unwrap();
        let later = transport.notified_destinations().split_off(settled);
        assert!(!later.is_empty());
        assert!(later.iter().all(|destination| *destination == winner));
        sender.stop();
    }

    #[tokio::test(start_paused = true)]
    async fn test_report_now_before_start() {
        let transport = Arc::new(RecordingSender::default());
        let sender = HeartbeatSender::new(transport.clone());

        sender.report_now(&request_header()).await.unwrap();

        let replies = transport.replies.lock();
        assert_eq!(replies.len(), 1);
        assert_eq!(replies[0].0, None);
        assert_eq!(replies[0].1.heartbeat_counter, Some(1));
        assert_eq!(sender.state(), LifecycleState::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_report_now_shares_sequence_with_ticks() {
        let transport = Arc::new(RecordingSender::default());
        let sender = HeartbeatSender::new(transport.clone());

        sender.start(local(), remote("peer"));
        tokio::time::sleep(ms(1000)).await;
        sender.report_now(&request_header()).await.unwrap();
        tokio::time::sleep(ms(800)).await;

        assert_eq!(transport.notified_counters(), vec![1, 3]);
        let replies = transport.replies.lock();
        assert_eq!(replies[0].0, Some(local()));
        assert_eq!(replies[0].1.heartbeat_counter, Some(2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_report_now_propagates_transport_error() {
        let transport = Arc::new(RecordingSender::failing_replies());
        let sender = HeartbeatSender::new(transport.clone());

        let err = sender.report_now(&request_header()).await.unwrap_err();
        assert!(matches!(err, Error::ReplyFailed(_)));

        // The counter value is consumed even though delivery failed.
        assert_eq!(sender.counter(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_add_msg_counter() {
        let sender = HeartbeatSender::new(Arc::new(RecordingSender::default()));

        sender.add_msg_counter(None);
        assert!(sender.tracked_msg_counters().is_empty());

        for msg_counter in 1..=11 {
            sender.add_msg_counter(Some(msg_counter));
        }
        assert!(!sender.is_heartbeat_msg_counter(1));
        assert!(sender.is_heartbeat_msg_counter(11));
        assert_eq!(sender.tracked_msg_counters().len(), 10);
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_stops_loop() {
        let transport = Arc::new(RecordingSender::default());
        let sender = HeartbeatSender::new(transport.clone());

        sender.start(local(), remote("peer"));
        tokio::time::sleep(ms(900)).await;
        drop(sender);
        tokio::time::sleep(ms(2000)).await;

        assert_eq!(transport.notified_counters(), vec![1]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_status() {
        let sender = HeartbeatSender::new(Arc::new(RecordingSender::default()));
        sender.start(local(), remote("peer"));
        tokio::time::sleep(ms(900)).await;

        let status = sender.status();
        assert_eq!(status["state"], "running");
        assert_eq!(status["period_ms"].as_u64().unwrap(), 800);
        assert_eq!(status["counter"].as_u64().unwrap(), 1);
        assert_eq!(status["destination"], "peer:1:2");
        assert_eq!(status["msg_counters"][0], 100);
    }
}
