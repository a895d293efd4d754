//! Tracks issued commands through their acknowledgement stages

use super::scheduler::Scheduler;
use crate::notify::{Notification, NotificationSender};
use fleetdeck_shared::stage::StageTransition;
use fleetdeck_shared::{limits, now_ms, CommandStage, MissionStatus, OperatorMode};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::debug;

/// One issued command, retained until evicted by newer ones
#[derive(Debug, Clone)]
pub struct CommandRecord {
    pub id: u64,
    pub description: String,
    pub stage: CommandStage,
    pub issued_at: u64,
}

/// Timing and retention settings for the tracker
#[derive(Debug, Clone)]
pub struct TrackerConfig {
    /// Delay from creation to the acknowledged stage
    pub ack_delay: Duration,
    /// Delay from creation to the executed stage. Must exceed
    /// `ack_delay`; the stage ordering relies on it.
    pub execute_delay: Duration,
    /// Commands retained, newest first
    pub capacity: usize,
    /// Delay before an operator override releases back to standby
    pub override_reset_delay: Duration,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            ack_delay: Duration::from_millis(limits::COMMAND_ACK_DELAY_MS),
            execute_delay: Duration::from_millis(limits::COMMAND_EXECUTE_DELAY_MS),
            capacity: limits::MAX_COMMANDS,
            override_reset_delay: Duration::from_millis(limits::OVERRIDE_RESET_MS),
        }
    }
}

/// Issues commands and walks each one through `sent -> acknowledged ->
/// executed` on independent fixed-delay timers.
///
/// Both timers are measured from creation and both always fire; a timer
/// landing after its command was evicted finds no matching id and does
/// nothing.
pub struct CommandTracker {
    commands: Arc<RwLock<Vec<CommandRecord>>>,
    next_id: AtomicU64,
    config: TrackerConfig,
    scheduler: Arc<dyn Scheduler>,
    notify_tx: NotificationSender,
    mission_status: Arc<RwLock<MissionStatus>>,
    operator_mode: Arc<RwLock<OperatorMode>>,
}

impl CommandTracker {
    pub fn new(scheduler: Arc<dyn Scheduler>, notify_tx: NotificationSender) -> Self {
        Self::with_config(TrackerConfig::default(), scheduler, notify_tx)
    }

    pub fn with_config(
        config: TrackerConfig,
        scheduler: Arc<dyn Scheduler>,
        notify_tx: NotificationSender,
    ) -> Self {
        Self {
            commands: Arc::new(RwLock::new(Vec::new())),
            next_id: AtomicU64::new(1),
            config,
            scheduler,
            notify_tx,
            mission_status: Arc::new(RwLock::new(MissionStatus::Idle)),
            operator_mode: Arc::new(RwLock::new(OperatorMode::Standby)),
        }
    }

    /// Issue a new command: track it, notify the operator once, and
    /// schedule both stage transitions.
    pub async fn issue(&self, description: &str) -> u64 {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let record = CommandRecord {
            id,
            description: description.to_string(),
            stage: CommandStage::initial(),
            issued_at: now_ms(),
        };

        {
            let mut commands = self.commands.write().await;
            commands.insert(0, record);
            commands.truncate(self.config.capacity);
        }

        // One notification per creation; stage transitions are silent.
        let _ = self
            .notify_tx
            .send(Notification::new(format!("Command sent: {description}")));

        self.schedule_transition(id, self.config.ack_delay, CommandStage::Acknowledged);
        self.schedule_transition(id, self.config.execute_delay, CommandStage::Executed);

        id
    }

    /// Snapshot of tracked commands, newest first
    pub async fn snapshot(&self) -> Vec<CommandRecord> {
        self.commands.read().await.clone()
    }

    /// Stage of one command, if it is still tracked
    pub async fn stage_of(&self, id: u64) -> Option<CommandStage> {
        self.commands
            .read()
            .await
            .iter()
            .find(|c| c.id == id)
            .map(|c| c.stage)
    }

    /// Current fleet mission phase
    pub async fn mission_status(&self) -> MissionStatus {
        *self.mission_status.read().await
    }

    /// Current control mode of the operator panel
    pub async fn operator_mode(&self) -> OperatorMode {
        *self.operator_mode.read().await
    }

    /// Start the mission and track the command
    pub async fn start_mission(&self) -> u64 {
        *self.mission_status.write().await = MissionStatus::Active;
        self.issue("Mission Start").await
    }

    /// Hold the fleet in place without ending the mission
    pub async fn pause_mission(&self) -> u64 {
        *self.mission_status.write().await = MissionStatus::Paused;
        self.issue("Mission Pause").await
    }

    /// Recall the fleet; the mission counts as returning until landed
    pub async fn return_to_home(&self) -> u64 {
        *self.mission_status.write().await = MissionStatus::Returning;
        self.issue("Return to Home").await
    }

    /// Drop everything and go idle
    pub async fn emergency_stop(&self) -> u64 {
        *self.mission_status.write().await = MissionStatus::Idle;
        self.issue("Emergency Stop").await
    }

    /// Hard abort from the operator panel
    pub async fn emergency_abort(&self) {
        self.operator_command("Emergency Mission Abort", Some(OperatorMode::Emergency))
            .await;
    }

    /// Recompute the route around an obstacle
    pub async fn initiate_reroute(&self) {
        self.operator_command("Route Recalculation Initiated", Some(OperatorMode::Override))
            .await;
    }

    /// Force the fleet home regardless of mission state
    pub async fn force_return(&self) {
        self.operator_command("Force Return to Home", Some(OperatorMode::Override))
            .await;
    }

    /// Take the sticks without changing the panel mode
    pub async fn override_autopilot(&self) {
        self.operator_command("Manual Control Override", None).await;
    }

    /// Operator panel commands bypass the tracked list: they notify, may
    /// switch the control mode, and always arm a standby reset.
    async fn operator_command(&self, description: &str, mode: Option<OperatorMode>) {
        if let Some(mode) = mode {
            *self.operator_mode.write().await = mode;
        }

        let _ = self.notify_tx.send(Notification::new(format!(
            "Operator command executed: {description}"
        )));

        let operator_mode = self.operator_mode.clone();
        self.scheduler.schedule(
            self.config.override_reset_delay,
            Box::pin(async move {
                *operator_mode.write().await = OperatorMode::Standby;
                debug!("Operator mode -> standby");
            }),
        );
    }

    fn schedule_transition(&self, id: u64, delay: Duration, target: CommandStage) {
        let commands = self.commands.clone();
        self.scheduler.schedule(
            delay,
            Box::pin(async move {
                advance(&commands, id, target).await;
            }),
        );
    }
}

/// Move a command forward by id. An unknown id means the command was
/// evicted after its timer was armed; that is a silent no-op.
async fn advance(commands: &RwLock<Vec<CommandRecord>>, id: u64, target: CommandStage) {
    let mut commands = commands.write().await;
    let Some(command) = commands.iter_mut().find(|c| c.id == id) else {
        return;
    };

    match command.stage.advance_to(target) {
        StageTransition::Advanced(stage) => {
            command.stage = stage;
            debug!("Command {} -> {}", id, stage.label());
        }
        StageTransition::Ignored { from, to } => {
            debug!("Command {} stays {} (late {} timer)", id, from.label(), to.label());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::ManualScheduler;
    use crate::notify;

    fn tracker_with_manual() -> (Arc<ManualScheduler>, CommandTracker, notify::NotificationReceiver)
    {
        let scheduler = Arc::new(ManualScheduler::new());
        let (tx, rx) = notify::channel();
        let tracker = CommandTracker::new(scheduler.clone(), tx);
        (scheduler, tracker, rx)
    }

    #[tokio::test]
    async fn test_command_walks_the_full_sequence() {
        let (scheduler, tracker, _rx) = tracker_with_manual();
        let id = tracker.issue("Mission Start").await;

        assert_eq!(tracker.stage_of(id).await, Some(CommandStage::Sent));

        scheduler.run_until(Duration::from_millis(1_000)).await;
        assert_eq!(tracker.stage_of(id).await, Some(CommandStage::Acknowledged));

        scheduler.run_until(Duration::from_millis(2_000)).await;
        assert_eq!(tracker.stage_of(id).await, Some(CommandStage::Executed));
        assert_eq!(scheduler.pending(), 0);
    }

    #[tokio::test]
    async fn test_stage_never_observed_out_of_sequence() {
        let (scheduler, tracker, _rx) = tracker_with_manual();
        let id = tracker.issue("Return to Home").await;

        let mut observed = vec![tracker.stage_of(id).await.unwrap()];
        for elapsed_ms in [500u64, 1_000, 1_500, 2_000, 2_500] {
            scheduler.run_until(Duration::from_millis(elapsed_ms)).await;
            observed.push(tracker.stage_of(id).await.unwrap());
        }

        for pair in observed.windows(2) {
            assert!(pair[0] <= pair[1], "stage regressed: {:?}", observed);
        }
        assert_eq!(*observed.last().unwrap(), CommandStage::Executed);
    }

    #[tokio::test]
    async fn test_list_bounded_to_five_newest() {
        let (_scheduler, tracker, _rx) = tracker_with_manual();

        let mut ids = Vec::new();
        for i in 0..8 {
            ids.push(tracker.issue(&format!("Command {i}")).await);
        }

        let commands = tracker.snapshot().await;
        assert_eq!(commands.len(), limits::MAX_COMMANDS);
        let tracked: Vec<u64> = commands.iter().map(|c| c.id).collect();
        let expected: Vec<u64> = ids.iter().rev().take(5).copied().collect();
        assert_eq!(tracked, expected);
    }

    #[tokio::test]
    async fn test_evicted_command_timer_is_noop() {
        let (scheduler, tracker, _rx) = tracker_with_manual();

        let first = tracker.issue("Old command").await;
        for i in 0..5 {
            tracker.issue(&format!("Newer {i}")).await;
        }
        assert_eq!(tracker.stage_of(first).await, None);

        // The first command's timers still fire; nothing must change.
        let before: Vec<u64> = tracker.snapshot().await.iter().map(|c| c.id).collect();
        scheduler.run_until(Duration::from_millis(10_000)).await;
        let after: Vec<u64> = tracker.snapshot().await.iter().map(|c| c.id).collect();

        assert_eq!(before, after);
        assert_eq!(tracker.stage_of(first).await, None);
        for command in tracker.snapshot().await {
            assert_eq!(command.stage, CommandStage::Executed);
        }
    }

    #[tokio::test]
    async fn test_one_notification_per_creation_only() {
        let (scheduler, tracker, mut rx) = tracker_with_manual();

        tracker.issue("Emergency Stop").await;
        scheduler.run_until(Duration::from_millis(5_000)).await;

        let first = rx.try_recv().unwrap();
        assert_eq!(first.message, "Command sent: Emergency Stop");
        // Stage transitions emit nothing further
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_mission_status_follows_issued_commands() {
        let (_scheduler, tracker, _rx) = tracker_with_manual();
        assert_eq!(tracker.mission_status().await, MissionStatus::Idle);

        tracker.start_mission().await;
        assert_eq!(tracker.mission_status().await, MissionStatus::Active);

        tracker.pause_mission().await;
        assert_eq!(tracker.mission_status().await, MissionStatus::Paused);

        tracker.return_to_home().await;
        assert_eq!(tracker.mission_status().await, MissionStatus::Returning);

        tracker.emergency_stop().await;
        assert_eq!(tracker.mission_status().await, MissionStatus::Idle);

        // Every mission command lands in the tracked list
        let descriptions: Vec<String> = tracker
            .snapshot()
            .await
            .iter()
            .map(|c| c.description.clone())
            .collect();
        assert_eq!(
            descriptions,
            vec!["Emergency Stop", "Return to Home", "Mission Pause", "Mission Start"]
        );
    }

    #[tokio::test]
    async fn test_override_sets_mode_and_resets_to_standby() {
        let (scheduler, tracker, mut rx) = tracker_with_manual();
        assert_eq!(tracker.operator_mode().await, OperatorMode::Standby);

        tracker.emergency_abort().await;
        assert_eq!(tracker.operator_mode().await, OperatorMode::Emergency);

        let note = rx.try_recv().unwrap();
        assert_eq!(note.message, "Operator command executed: Emergency Mission Abort");

        // Operator commands never enter the tracked list
        assert!(tracker.snapshot().await.is_empty());

        scheduler.run_until(Duration::from_millis(4_999)).await;
        assert_eq!(tracker.operator_mode().await, OperatorMode::Emergency);

        scheduler.run_until(Duration::from_millis(5_000)).await;
        assert_eq!(tracker.operator_mode().await, OperatorMode::Standby);
    }

    #[tokio::test]
    async fn test_reroute_and_force_return_enter_override() {
        let (scheduler, tracker, _rx) = tracker_with_manual();

        tracker.initiate_reroute().await;
        assert_eq!(tracker.operator_mode().await, OperatorMode::Override);
        scheduler.run_until(Duration::from_millis(5_000)).await;
        assert_eq!(tracker.operator_mode().await, OperatorMode::Standby);

        tracker.force_return().await;
        assert_eq!(tracker.operator_mode().await, OperatorMode::Override);
    }

    #[tokio::test]
    async fn test_manual_override_leaves_mode_unchanged() {
        let (_scheduler, tracker, mut rx) = tracker_with_manual();

        tracker.initiate_reroute().await;
        let _ = rx.try_recv();
        assert_eq!(tracker.operator_mode().await, OperatorMode::Override);

        tracker.override_autopilot().await;
        assert_eq!(tracker.operator_mode().await, OperatorMode::Override);
        let note = rx.try_recv().unwrap();
        assert_eq!(note.message, "Operator command executed: Manual Control Override");
    }

    #[tokio::test]
    async fn test_issue_records_timestamp_and_description() {
        let (_scheduler, tracker, _rx) = tracker_with_manual();
        let before = now_ms();
        let id = tracker.issue("Mission Pause").await;

        let commands = tracker.snapshot().await;
        assert_eq!(commands[0].id, id);
        assert_eq!(commands[0].description, "Mission Pause");
        assert!(commands[0].issued_at >= before);
    }
}
