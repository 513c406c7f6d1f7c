//! Audio and haptic feedback
//!
//! The tick turns game events into `FeedbackCommand`s through the arbitrator,
//! which keeps cues from overlapping with a frame-based timed lock and rate
//! limits the rare "special" cues. A worker thread drains the commands into a
//! `FeedbackSink`; the simulation never waits on playback.

use std::collections::HashMap;
use std::sync::mpsc::{Receiver, Sender, channel};
use std::thread::JoinHandle;

use serde::{Deserialize, Serialize};

use crate::consts::SPECIAL_CUE_WINDOW;
use crate::error::FeedbackError;
use crate::ms_to_frames;
use crate::sim::state::{CollectibleKind, ObstacleKind};

/// Event categories the arbitrator distinguishes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FeedbackCategory {
    Collect,
    Hit,
    Powerup,
    LevelUp,
}

/// What happened, with the subkind that caused it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FeedbackKind {
    Collect(CollectibleKind),
    Hit(ObstacleKind),
    /// An obstacle hit was negated by the tier shield
    Powerup,
    LevelUp { tier: usize },
}

impl FeedbackKind {
    pub fn category(self) -> FeedbackCategory {
        match self {
            FeedbackKind::Collect(_) => FeedbackCategory::Collect,
            FeedbackKind::Hit(_) => FeedbackCategory::Hit,
            FeedbackKind::Powerup => FeedbackCategory::Powerup,
            FeedbackKind::LevelUp { .. } => FeedbackCategory::LevelUp,
        }
    }

    /// The rare cue reserved for this subkind, if it has one
    fn special_cue(self) -> Option<CueId> {
        match self {
            FeedbackKind::Collect(CollectibleKind::Heart) => Some(CueId::CollectBonus),
            FeedbackKind::Hit(ObstacleKind::Bomb) => Some(CueId::HitBomb),
            _ => None,
        }
    }

    fn generic_cue(self) -> CueId {
        match self {
            FeedbackKind::Collect(_) => CueId::Collect,
            FeedbackKind::Hit(_) => CueId::Hit,
            FeedbackKind::Powerup => CueId::Shield,
            FeedbackKind::LevelUp { .. } => CueId::LevelUp,
        }
    }

    fn haptic(self) -> HapticKind {
        match self {
            FeedbackKind::Collect(_) => HapticKind::Light,
            FeedbackKind::Hit(_) => HapticKind::Heavy,
            FeedbackKind::Powerup | FeedbackKind::LevelUp { .. } => HapticKind::Success,
        }
    }
}

/// A game event waiting for arbitration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedbackEvent {
    pub kind: FeedbackKind,
    pub frame: u64,
}

/// Sound cues known to the audio engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CueId {
    Collect,
    CollectBonus,
    Hit,
    HitBomb,
    Shield,
    LevelUp,
}

impl CueId {
    pub fn as_str(&self) -> &'static str {
        match self {
            CueId::Collect => "collect",
            CueId::CollectBonus => "collect_bonus",
            CueId::Hit => "hit",
            CueId::HitBomb => "hit_bomb",
            CueId::Shield => "shield",
            CueId::LevelUp => "level_up",
        }
    }

    /// Estimated playback length, used only to size the lock
    pub fn duration_ms(&self) -> u32 {
        match self {
            CueId::Collect => 400,
            CueId::CollectBonus => 1000,
            CueId::Hit => 600,
            CueId::HitBomb => 800,
            CueId::Shield => 500,
            CueId::LevelUp => 3000,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HapticKind {
    Light,
    Heavy,
    Success,
}

/// Fire-and-forget instruction for the playback worker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FeedbackCommand {
    PlayCue(CueId),
    PulseHaptic(HapticKind),
}

/// Mutual exclusion expressed as an expiry frame
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimedLock {
    expires_at: u64,
}

impl TimedLock {
    pub fn is_held(&self, now: u64) -> bool {
        now < self.expires_at
    }

    /// Hold the lock for `frames` from `now`, replacing any current holder
    pub fn hold(&mut self, now: u64, frames: u64) {
        self.expires_at = now + frames;
    }

    pub fn expires_at(&self) -> u64 {
        self.expires_at
    }
}

/// Decides which cues actually play
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeedbackArbitrator {
    pub lock: TimedLock,
    /// Score at which each category last played its special cue
    last_special: HashMap<FeedbackCategory, u64>,
}

impl FeedbackArbitrator {
    fn special_due(&self, category: FeedbackCategory, score: u64) -> bool {
        self.last_special
            .get(&category)
            .is_none_or(|&last| score.saturating_sub(last) >= SPECIAL_CUE_WINDOW)
    }

    pub fn last_special(&self, category: FeedbackCategory) -> Option<u64> {
        self.last_special.get(&category).copied()
    }

    /// Arbitrate one event at frame `now`, appending the resulting commands
    pub fn dispatch(
        &mut self,
        event: &FeedbackEvent,
        score: u64,
        now: u64,
        out: &mut Vec<FeedbackCommand>,
    ) {
        let kind = event.kind;
        match kind.category() {
            FeedbackCategory::LevelUp => {
                // Highest priority: ignores and then takes the lock
                out.push(FeedbackCommand::PlayCue(CueId::LevelUp));
                out.push(FeedbackCommand::PulseHaptic(kind.haptic()));
                self.lock.hold(now, ms_to_frames(CueId::LevelUp.duration_ms()));
            }
            FeedbackCategory::Powerup => {
                // TODO: confirm with product whether shield cues should respect the lock
                out.push(FeedbackCommand::PlayCue(CueId::Shield));
                out.push(FeedbackCommand::PulseHaptic(kind.haptic()));
            }
            category @ (FeedbackCategory::Collect | FeedbackCategory::Hit) => {
                out.push(FeedbackCommand::PulseHaptic(kind.haptic()));
                if self.lock.is_held(now) {
                    log::trace!(
                        "dropped {:?} cue at frame {} (lock until {})",
                        kind,
                        now,
                        self.lock.expires_at()
                    );
                    return;
                }
                let cue = match kind.special_cue() {
                    Some(special) if self.special_due(category, score) => {
                        self.last_special.insert(category, score);
                        special
                    }
                    _ => kind.generic_cue(),
                };
                out.push(FeedbackCommand::PlayCue(cue));
                self.lock.hold(now, ms_to_frames(cue.duration_ms()));
            }
        }
    }
}

/// The external audio/haptic engine
pub trait FeedbackSink: Send {
    fn play_cue(&mut self, cue: CueId) -> Result<(), FeedbackError>;
    fn pulse_haptic(&mut self, kind: HapticKind) -> Result<(), FeedbackError>;
}

/// Sink that only logs, for headless runs
#[derive(Debug, Default)]
pub struct LogSink;

impl FeedbackSink for LogSink {
    fn play_cue(&mut self, cue: CueId) -> Result<(), FeedbackError> {
        log::debug!("cue: {}", cue.as_str());
        Ok(())
    }

    fn pulse_haptic(&mut self, kind: HapticKind) -> Result<(), FeedbackError> {
        log::debug!("haptic: {:?}", kind);
        Ok(())
    }
}

/// Run one command against the sink, swallowing failures
pub fn perform(sink: &mut dyn FeedbackSink, command: FeedbackCommand) {
    let result = match command {
        FeedbackCommand::PlayCue(cue) => sink.play_cue(cue),
        FeedbackCommand::PulseHaptic(kind) => sink.pulse_haptic(kind),
    };
    if let Err(e) = result {
        log::warn!("feedback command {:?} failed: {}", command, e);
    }
}

/// What travels over the worker queue
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerMessage {
    Command(FeedbackCommand),
    /// Stop after everything queued before it
    Shutdown,
}

/// Sending half of the worker queue. Only commands can be sent through it.
#[derive(Debug, Clone)]
pub struct FeedbackQueue {
    sender: Sender<WorkerMessage>,
}

impl FeedbackQueue {
    /// Unattached queue; whoever holds the receiver plays the commands
    pub fn channel() -> (Self, Receiver<WorkerMessage>) {
        let (sender, receiver) = channel();
        (Self { sender }, receiver)
    }

    /// Queue a command. Fails once the worker has stopped.
    pub fn send(&self, command: FeedbackCommand) -> Result<(), FeedbackCommand> {
        self.sender
            .send(WorkerMessage::Command(command))
            .map_err(|_| command)
    }
}

/// Background thread draining feedback commands into a sink
pub struct FeedbackWorker {
    queue: Option<FeedbackQueue>,
    handle: Option<JoinHandle<()>>,
}

impl FeedbackWorker {
    pub fn spawn<S: FeedbackSink + 'static>(mut sink: S) -> Self {
        let (queue, receiver) = FeedbackQueue::channel();
        let handle = std::thread::Builder::new()
            .name("feedback".into())
            .spawn(move || {
                for message in receiver {
                    match message {
                        WorkerMessage::Command(command) => perform(&mut sink, command),
                        WorkerMessage::Shutdown => break,
                    }
                }
                log::debug!("feedback worker stopped");
            });
        let handle = match handle {
            Ok(handle) => Some(handle),
            Err(e) => {
                log::warn!("failed to start feedback worker, feedback disabled: {}", e);
                None
            }
        };
        Self {
            queue: handle.as_ref().map(|_| queue),
            handle,
        }
    }

    /// Queue handle for the session driver
    pub fn queue(&self) -> Option<FeedbackQueue> {
        self.queue.clone()
    }

    /// Play what is already queued, then stop. Handles still held elsewhere
    /// start failing their sends.
    pub fn shutdown(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        if let Some(queue) = self.queue.take() {
            // Only fails if the thread is already gone
            let _ = queue.sender.send(WorkerMessage::Shutdown);
        }
        if let Some(handle) = self.handle.take()
            && handle.join().is_err()
        {
            log::warn!("feedback worker panicked");
        }
    }
}

impl Drop for FeedbackWorker {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    fn cues(commands: &[FeedbackCommand]) -> Vec<CueId> {
        commands
            .iter()
            .filter_map(|c| match c {
                FeedbackCommand::PlayCue(cue) => Some(*cue),
                _ => None,
            })
            .collect()
    }

    fn event(kind: FeedbackKind, frame: u64) -> FeedbackEvent {
        FeedbackEvent { kind, frame }
    }

    #[test]
    fn test_lock_expiry() {
        let mut lock = TimedLock::default();
        assert!(!lock.is_held(0));
        lock.hold(10, 24);
        assert!(lock.is_held(10));
        assert!(lock.is_held(33));
        assert!(!lock.is_held(34));
    }

    #[test]
    fn test_hits_inside_lock_window_play_once() {
        let mut arb = FeedbackArbitrator::default();
        let mut out = Vec::new();
        let hit = FeedbackKind::Hit(ObstacleKind::Rock);
        arb.dispatch(&event(hit, 100), 0, 100, &mut out);
        arb.dispatch(&event(hit, 110), 0, 110, &mut out);
        assert_eq!(cues(&out), vec![CueId::Hit]);
        // Haptics still fire for the dropped cue
        let haptics = out
            .iter()
            .filter(|c| matches!(c, FeedbackCommand::PulseHaptic(HapticKind::Heavy)))
            .count();
        assert_eq!(haptics, 2);
    }

    #[test]
    fn test_level_up_overrides_lock() {
        let mut arb = FeedbackArbitrator::default();
        let mut out = Vec::new();
        let hit = FeedbackKind::Hit(ObstacleKind::Spike);
        arb.dispatch(&event(hit, 100), 0, 100, &mut out);
        arb.dispatch(&event(hit, 105), 0, 105, &mut out);
        arb.dispatch(&event(FeedbackKind::LevelUp { tier: 1 }, 110), 500, 110, &mut out);
        assert_eq!(cues(&out), vec![CueId::Hit, CueId::LevelUp]);
        assert_eq!(arb.lock.expires_at(), 110 + ms_to_frames(3000));

        // Anything after the level-up inside its window is dropped
        out.clear();
        arb.dispatch(&event(hit, 200), 500, 200, &mut out);
        assert!(cues(&out).is_empty());
    }

    #[test]
    fn test_cue_plays_again_after_lock_expires() {
        let mut arb = FeedbackArbitrator::default();
        let mut out = Vec::new();
        let collect = FeedbackKind::Collect(CollectibleKind::Coin);
        arb.dispatch(&event(collect, 0), 10, 0, &mut out);
        arb.dispatch(&event(collect, 24), 20, 24, &mut out);
        assert_eq!(cues(&out), vec![CueId::Collect, CueId::Collect]);
    }

    #[test]
    fn test_special_cue_rate_limited_by_score() {
        let mut arb = FeedbackArbitrator::default();
        let mut out = Vec::new();
        let heart = FeedbackKind::Collect(CollectibleKind::Heart);
        // First special is always due
        arb.dispatch(&event(heart, 0), 100, 0, &mut out);
        // Lock expired, but only 300 points later: generic
        arb.dispatch(&event(heart, 1000), 400, 1000, &mut out);
        // 400 points after the last special: special again
        arb.dispatch(&event(heart, 2000), 500, 2000, &mut out);
        assert_eq!(
            cues(&out),
            vec![CueId::CollectBonus, CueId::Collect, CueId::CollectBonus]
        );
        assert_eq!(arb.last_special(FeedbackCategory::Collect), Some(500));
        assert_eq!(arb.last_special(FeedbackCategory::Hit), None);
    }

    #[test]
    fn test_special_windows_are_per_category() {
        let mut arb = FeedbackArbitrator::default();
        let mut out = Vec::new();
        arb.dispatch(&event(FeedbackKind::Collect(CollectibleKind::Heart), 0), 50, 0, &mut out);
        arb.dispatch(&event(FeedbackKind::Hit(ObstacleKind::Bomb), 500), 50, 500, &mut out);
        assert_eq!(cues(&out), vec![CueId::CollectBonus, CueId::HitBomb]);
    }

    #[test]
    fn test_powerup_ignores_lock() {
        let mut arb = FeedbackArbitrator::default();
        let mut out = Vec::new();
        arb.dispatch(&event(FeedbackKind::Hit(ObstacleKind::Rock), 0), 0, 0, &mut out);
        let expiry = arb.lock.expires_at();
        arb.dispatch(&event(FeedbackKind::Powerup, 1), 0, 1, &mut out);
        assert_eq!(cues(&out), vec![CueId::Hit, CueId::Shield]);
        // And does not take the lock itself
        assert_eq!(arb.lock.expires_at(), expiry);
    }

    struct RecordingSink {
        played: Arc<Mutex<Vec<CueId>>>,
        fail_hits: bool,
    }

    impl FeedbackSink for RecordingSink {
        fn play_cue(&mut self, cue: CueId) -> Result<(), FeedbackError> {
            if self.fail_hits && cue == CueId::Hit {
                return Err(FeedbackError::Playback {
                    cue: cue.as_str(),
                    reason: "device busy".into(),
                });
            }
            self.played.lock().unwrap().push(cue);
            Ok(())
        }

        fn pulse_haptic(&mut self, _kind: HapticKind) -> Result<(), FeedbackError> {
            Err(FeedbackError::Haptic("no vibrator".into()))
        }
    }

    #[test]
    fn test_worker_drains_and_survives_failures() {
        let played = Arc::new(Mutex::new(Vec::new()));
        let worker = FeedbackWorker::spawn(RecordingSink {
            played: played.clone(),
            fail_hits: true,
        });
        let queue = worker.queue().unwrap();
        queue.send(FeedbackCommand::PlayCue(CueId::Hit)).unwrap();
        queue.send(FeedbackCommand::PulseHaptic(HapticKind::Heavy)).unwrap();
        queue.send(FeedbackCommand::PlayCue(CueId::Collect)).unwrap();
        drop(queue);
        worker.shutdown();
        assert_eq!(*played.lock().unwrap(), vec![CueId::Collect]);
    }

    #[test]
    fn test_drop_with_outstanding_queue_handle() {
        let played = Arc::new(Mutex::new(Vec::new()));
        let worker = FeedbackWorker::spawn(RecordingSink {
            played: played.clone(),
            fail_hits: false,
        });
        let queue = worker.queue().unwrap();
        queue.send(FeedbackCommand::PlayCue(CueId::Shield)).unwrap();

        let (done_tx, done_rx) = std::sync::mpsc::channel();
        std::thread::spawn(move || {
            drop(worker);
            let _ = done_tx.send(());
        });
        assert!(
            done_rx
                .recv_timeout(std::time::Duration::from_secs(3))
                .is_ok(),
            "dropping the worker blocked on a live queue handle"
        );

        // Queued work still ran; later sends fail instead of piling up
        assert_eq!(*played.lock().unwrap(), vec![CueId::Shield]);
        assert_eq!(
            queue.send(FeedbackCommand::PlayCue(CueId::Hit)),
            Err(FeedbackCommand::PlayCue(CueId::Hit))
        );
    }
}
