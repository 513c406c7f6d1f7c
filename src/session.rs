//! Session driver
//!
//! Owns the `GameState`, runs one tick per display frame and publishes an
//! immutable snapshot for the presentation layer. Everything that leaves the
//! simulation (feedback commands, the final score) goes out through here.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::PersistenceError;
use crate::feedback::{FeedbackCommand, FeedbackQueue};
use crate::settings::Settings;
use crate::sim::particles::ParticleKind;
use crate::sim::player::{GestureCell, GestureSample};
use crate::sim::state::{EntityKind, GameEvent, GamePhase, GameState};
use crate::sim::tick::{TickInput, tick};

/// Who is playing, as handed over by the host application
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerProfile {
    pub player_id: String,
    pub display_name: String,
    pub avatar_ref: Option<String>,
}

impl Default for PlayerProfile {
    fn default() -> Self {
        Self {
            player_id: "local".into(),
            display_name: "Player".into(),
            avatar_ref: None,
        }
    }
}

/// A finished run handed to the score store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreSubmission {
    pub player_id: String,
    pub display_name: String,
    pub avatar_ref: Option<String>,
    pub final_score: u64,
    pub final_tier_label: String,
}

/// External score persistence
pub trait ScoreRecorder {
    /// Store a finished run; `Ok(true)` if it is a new high score
    fn record_score(&mut self, submission: &ScoreSubmission) -> Result<bool, PersistenceError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EntityView {
    pub id: u32,
    pub kind: EntityKind,
    pub x: f32,
    pub y: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PlayerView {
    pub x: f32,
    pub y: f32,
    pub tilt: f32,
}

/// A particle sampled at the snapshot frame
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParticleView {
    pub id: u32,
    pub kind: ParticleKind,
    pub x: f32,
    pub y: f32,
    pub color: u32,
    pub size: f32,
    pub opacity: f32,
    pub scale: f32,
    pub text: Option<String>,
}

/// Everything the presentation layer needs for one frame
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Snapshot {
    /// Increases by one per published snapshot
    pub version: u64,
    pub frame: u64,
    pub phase: GamePhase,
    pub entities: Vec<EntityView>,
    pub player: PlayerView,
    pub particles: Vec<ParticleView>,
    pub score: u64,
    pub lives: u32,
    pub tier_label: &'static str,
    pub banner: Option<String>,
    pub screen_shake: f32,
}

impl Snapshot {
    fn capture(state: &GameState, settings: &Settings, version: u64) -> Self {
        let frame = state.clock.frame;
        let entities = state
            .entities
            .iter()
            .map(|e| EntityView {
                id: e.id,
                kind: e.kind,
                x: e.x,
                y: e.y_at(frame),
            })
            .collect();
        let particles = if settings.particles {
            state
                .particles
                .effects
                .iter()
                .filter_map(|effect| {
                    let pose = effect.sample(frame)?;
                    Some(ParticleView {
                        id: effect.id,
                        kind: effect.kind,
                        x: pose.pos.x,
                        y: pose.pos.y,
                        color: effect.color,
                        size: effect.size,
                        opacity: pose.opacity,
                        scale: pose.scale,
                        text: effect.text.clone(),
                    })
                })
                .collect()
        } else {
            Vec::new()
        };
        let screen_shake = if settings.effective_screen_shake() {
            state.screen_shake
        } else {
            0.0
        };

        Self {
            version,
            frame,
            phase: state.phase,
            entities,
            player: PlayerView {
                x: state.player.x,
                y: state.player.y,
                tilt: state.player.tilt,
            },
            particles,
            score: state.player.score,
            lives: state.player.lives,
            tier_label: state.tier_label(),
            banner: state.banner.as_ref().map(|b| b.label.clone()),
            screen_shake,
        }
    }
}

/// One minigame session
pub struct GameSession {
    state: GameState,
    settings: Settings,
    profile: PlayerProfile,
    gesture: GestureCell,
    pending: TickInput,
    feedback: Option<FeedbackQueue>,
    scores: Box<dyn ScoreRecorder>,
    snapshot: Arc<Snapshot>,
    version: u64,
}

impl GameSession {
    pub fn new(
        seed: u64,
        settings: Settings,
        profile: PlayerProfile,
        scores: Box<dyn ScoreRecorder>,
    ) -> Self {
        let state = GameState::new(seed);
        let snapshot = Arc::new(Snapshot::capture(&state, &settings, 0));
        log::info!("session created for {} (seed {})", profile.player_id, seed);
        Self {
            state,
            settings,
            profile,
            gesture: GestureCell::new(),
            pending: TickInput::default(),
            feedback: None,
            scores,
            snapshot,
            version: 0,
        }
    }

    /// Route feedback commands to a playback worker
    pub fn with_feedback(mut self, queue: FeedbackQueue) -> Self {
        self.feedback = Some(queue);
        self
    }

    pub fn start(&mut self) {
        self.pending.start = true;
    }

    pub fn pause(&mut self) {
        self.pending.pause = true;
    }

    pub fn resume(&mut self) {
        self.pending.resume = true;
    }

    pub fn restart(&mut self) {
        self.pending.restart = true;
    }

    pub fn exit(&mut self) {
        self.pending.exit = true;
    }

    /// Store a gesture sample from the calling thread
    pub fn gesture(&self, sample: GestureSample) {
        self.gesture.store(sample);
    }

    /// Handle for writing gesture samples from another thread
    pub fn gesture_handle(&self) -> GestureCell {
        self.gesture.clone()
    }

    /// Presentation callback: the effect with `id` finished animating
    pub fn effect_finished(&mut self, id: u32) {
        if !self.state.particles.remove(id) {
            log::trace!("effect {} already removed", id);
        }
    }

    /// Run one display tick and publish the resulting snapshot.
    ///
    /// Effects whose animation has run out are dropped here as well, so hosts
    /// that never call `effect_finished` do not accumulate them.
    pub fn frame(&mut self) -> Arc<Snapshot> {
        let mut input = std::mem::take(&mut self.pending);
        input.gesture = self.gesture.latest();
        let before = self.state.phase;
        tick(&mut self.state, &input);

        // A restart starts from the field-centre default, not the last drag
        if before == GamePhase::GameOver && self.state.phase == GamePhase::Playing {
            self.gesture.clear();
        }
        for id in self.state.particles.finished_ids(self.state.clock.frame) {
            self.state.particles.remove(id);
        }

        self.flush_commands();
        self.handle_events();

        self.version += 1;
        self.snapshot = Arc::new(Snapshot::capture(&self.state, &self.settings, self.version));
        Arc::clone(&self.snapshot)
    }

    /// Latest published snapshot
    pub fn snapshot(&self) -> Arc<Snapshot> {
        Arc::clone(&self.snapshot)
    }

    pub fn phase(&self) -> GamePhase {
        self.state.phase
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn set_settings(&mut self, settings: Settings) {
        self.settings = settings;
    }

    fn flush_commands(&mut self) {
        for command in self.state.commands.drain(..) {
            let allowed = match command {
                FeedbackCommand::PlayCue(_) => self.settings.sound,
                FeedbackCommand::PulseHaptic(_) => self.settings.haptics,
            };
            if !allowed {
                continue;
            }
            let Some(queue) = &self.feedback else {
                continue;
            };
            if queue.send(command).is_err() {
                log::warn!("feedback worker gone, dropping further commands");
                self.feedback = None;
            }
        }
    }

    fn handle_events(&mut self) {
        for event in std::mem::take(&mut self.state.events) {
            match event {
                GameEvent::Feedback(feedback) => {
                    log::trace!("feedback event {:?}", feedback);
                }
                GameEvent::GameOver { score, tier_label } => {
                    let submission = ScoreSubmission {
                        player_id: self.profile.player_id.clone(),
                        display_name: self.profile.display_name.clone(),
                        avatar_ref: self.profile.avatar_ref.clone(),
                        final_score: score,
                        final_tier_label: tier_label.to_string(),
                    };
                    match self.scores.record_score(&submission) {
                        Ok(true) => log::info!("new high score: {}", score),
                        Ok(false) => log::debug!("score {} recorded", score),
                        Err(e) => log::warn!("failed to record score {}: {}", score, e),
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::*;
    use crate::sim::state::{CollectibleKind, ObstacleKind};
    use std::sync::Mutex;
    use crate::feedback::WorkerMessage;
    use crate::sim::tick::next_run_seed;

    #[derive(Clone, Default)]
    struct SharedScores(Arc<Mutex<Vec<ScoreSubmission>>>);

    impl ScoreRecorder for SharedScores {
        fn record_score(&mut self, submission: &ScoreSubmission) -> Result<bool, PersistenceError> {
            self.0.lock().unwrap().push(submission.clone());
            Ok(true)
        }
    }

    struct FailingScores;

    impl ScoreRecorder for FailingScores {
        fn record_score(&mut self, _: &ScoreSubmission) -> Result<bool, PersistenceError> {
            Err(PersistenceError::Rejected("offline".into()))
        }
    }

    fn session_with(settings: Settings, scores: Box<dyn ScoreRecorder>) -> GameSession {
        let mut session = GameSession::new(7, settings, PlayerProfile::default(), scores);
        session.start();
        session.frame();
        session
    }

    /// Spawn an entity that lands on the player during the next frame
    fn drop_on_player(session: &mut GameSession, kind: EntityKind) {
        let state = &mut session.state;
        state.entities.clear();
        state.spawner.last_spawn_frame = state.clock.frame + 1;
        let x = state.player.x;
        let y = state.player.y;
        state.spawn_entity(kind, x);
        if let Some(entity) = state.entities.last_mut() {
            entity.speed = y + ENTITY_SIZE;
        }
    }

    #[test]
    fn test_start_publishes_versions() {
        let mut session = GameSession::new(
            1,
            Settings::default(),
            PlayerProfile::default(),
            Box::new(SharedScores::default()),
        );
        assert_eq!(session.snapshot().phase, GamePhase::Idle);
        assert_eq!(session.snapshot().version, 0);

        session.start();
        let first = session.frame();
        assert_eq!(first.phase, GamePhase::Playing);
        assert_eq!(first.frame, 0);

        let second = session.frame();
        assert_eq!(second.version, 2);
        assert_eq!(second.frame, 1);
        assert_eq!(second.lives, STARTING_LIVES);
        assert_eq!(second.tier_label, "Rookie");
        assert!(Arc::ptr_eq(&second, &session.snapshot()));
    }

    #[test]
    fn test_pause_freezes_frame() {
        let mut session = session_with(Settings::default(), Box::new(SharedScores::default()));
        session.frame();
        session.pause();
        let paused = session.frame();
        assert_eq!(paused.phase, GamePhase::Paused);
        let still = session.frame();
        assert_eq!(still.frame, paused.frame);

        session.resume();
        let resumed = session.frame();
        assert_eq!(resumed.phase, GamePhase::Playing);
        assert_eq!(resumed.frame, paused.frame + 1);
    }

    #[test]
    fn test_gesture_from_other_thread_moves_player() {
        let mut session = session_with(Settings::default(), Box::new(SharedScores::default()));
        let handle = session.gesture_handle();
        let start_x = session.snapshot().player.x;
        std::thread::spawn(move || {
            handle.store(GestureSample {
                x: 40.0,
                y: 400.0,
                velocity_x: -300.0,
                active: true,
            });
        })
        .join()
        .unwrap();

        let mut snapshot = session.frame();
        for _ in 0..5 {
            snapshot = session.frame();
        }
        assert!(snapshot.player.x < start_x);
        assert!(snapshot.player.tilt < 0.0);
    }

    #[test]
    fn test_game_over_records_once() {
        let scores = SharedScores::default();
        let mut session = session_with(Settings::default(), Box::new(scores.clone()));
        session.state.player.lives = 1;
        session.state.player.score = 120;
        drop_on_player(&mut session, EntityKind::Obstacle(ObstacleKind::Rock));

        let snapshot = session.frame();
        assert_eq!(snapshot.phase, GamePhase::GameOver);
        assert_eq!(snapshot.lives, 0);
        for _ in 0..10 {
            session.frame();
        }

        let recorded = scores.0.lock().unwrap();
        assert_eq!(recorded.len(), 1);
        assert_eq!(recorded[0].final_score, 120);
        assert_eq!(recorded[0].final_tier_label, "Rookie");
        assert_eq!(recorded[0].player_id, "local");
    }

    #[test]
    fn test_record_failure_is_ignored() {
        let mut session = session_with(Settings::default(), Box::new(FailingScores));
        session.state.player.lives = 1;
        drop_on_player(&mut session, EntityKind::Obstacle(ObstacleKind::Spike));
        assert_eq!(session.frame().phase, GamePhase::GameOver);

        session.restart();
        let snapshot = session.frame();
        assert_eq!(snapshot.phase, GamePhase::Playing);
        assert_eq!(snapshot.score, 0);
        assert_eq!(snapshot.lives, STARTING_LIVES);
    }

    #[test]
    fn test_restart_matches_fresh_session() {
        let mut session = session_with(Settings::default(), Box::new(SharedScores::default()));
        for _ in 0..30 {
            session.gesture(GestureSample {
                x: 0.0,
                y: 80.0,
                velocity_x: -900.0,
                active: true,
            });
            session.frame();
        }
        session.state.player.lives = 1;
        drop_on_player(&mut session, EntityKind::Obstacle(ObstacleKind::Rock));
        assert_eq!(session.frame().phase, GamePhase::GameOver);

        session.restart();
        session.frame();
        let restarted = session.frame();

        let mut fresh = GameSession::new(
            next_run_seed(7),
            Settings::default(),
            PlayerProfile::default(),
            Box::new(SharedScores::default()),
        );
        fresh.start();
        fresh.frame();
        let expected = fresh.frame();

        assert_eq!(restarted.phase, GamePhase::Playing);
        assert_eq!(restarted.frame, expected.frame);
        assert_eq!(restarted.player, expected.player);
        assert_eq!(restarted.entities, expected.entities);
        assert_eq!(restarted.particles, expected.particles);
        assert_eq!(restarted.score, expected.score);
        assert_eq!(restarted.lives, expected.lives);
        assert_eq!(session.gesture_handle().latest(), None);
    }

    #[test]
    fn test_commands_reach_worker() {
        let (queue, receiver) = FeedbackQueue::channel();
        let mut session = GameSession::new(
            3,
            Settings::default(),
            PlayerProfile::default(),
            Box::new(SharedScores::default()),
        )
        .with_feedback(queue);
        session.start();
        session.frame();
        drop_on_player(&mut session, EntityKind::Collectible(CollectibleKind::Coin));
        session.frame();

        let commands: Vec<_> = receiver
            .try_iter()
            .filter_map(|m| match m {
                WorkerMessage::Command(c) => Some(c),
                WorkerMessage::Shutdown => None,
            })
            .collect();
        assert!(commands.iter().any(|c| matches!(c, FeedbackCommand::PlayCue(_))));
        assert!(commands.iter().any(|c| matches!(c, FeedbackCommand::PulseHaptic(_))));
    }

    #[test]
    fn test_sound_off_drops_cues() {
        let (queue, receiver) = FeedbackQueue::channel();
        let settings = Settings {
            sound: false,
            ..Settings::default()
        };
        let mut session = GameSession::new(
            3,
            settings,
            PlayerProfile::default(),
            Box::new(SharedScores::default()),
        )
        .with_feedback(queue);
        session.start();
        session.frame();
        drop_on_player(&mut session, EntityKind::Collectible(CollectibleKind::Coin));
        session.frame();

        let commands: Vec<_> = receiver
            .try_iter()
            .filter_map(|m| match m {
                WorkerMessage::Command(c) => Some(c),
                WorkerMessage::Shutdown => None,
            })
            .collect();
        assert!(!commands.is_empty());
        assert!(
            commands
                .iter()
                .all(|c| matches!(c, FeedbackCommand::PulseHaptic(_)))
        );
    }

    #[test]
    fn test_reduced_motion_zeroes_shake() {
        let mut session = session_with(Settings::default(), Box::new(SharedScores::default()));
        drop_on_player(&mut session, EntityKind::Obstacle(ObstacleKind::Rock));
        assert!(session.frame().screen_shake > 0.0);

        let mut calm = session_with(
            Settings {
                reduced_motion: true,
                ..Settings::default()
            },
            Box::new(SharedScores::default()),
        );
        drop_on_player(&mut calm, EntityKind::Obstacle(ObstacleKind::Rock));
        let snapshot = calm.frame();
        assert_eq!(snapshot.lives, STARTING_LIVES - 1);
        assert_eq!(snapshot.screen_shake, 0.0);
        assert!(calm.state().screen_shake > 0.0);
    }

    #[test]
    fn test_particles_follow_settings_and_expire() {
        let mut session = session_with(Settings::default(), Box::new(SharedScores::default()));
        drop_on_player(&mut session, EntityKind::Collectible(CollectibleKind::Gem));
        let snapshot = session.frame();
        assert!(!snapshot.particles.is_empty());

        let first = snapshot.particles[0].id;
        session.effect_finished(first);
        session.effect_finished(first);
        assert!(session.frame().particles.iter().all(|p| p.id != first));

        session.set_settings(Settings {
            particles: false,
            ..Settings::default()
        });
        assert!(session.frame().particles.is_empty());
        assert!(!session.state().particles.is_empty());

        for _ in 0..ParticleKind::Text.duration_frames() {
            session.frame();
        }
        // Expired effects go away without any completion callback
        assert!(session.state().particles.is_empty());
    }

    #[test]
    fn test_exit_after_game_over() {
        let mut session = session_with(Settings::default(), Box::new(SharedScores::default()));
        session.exit();
        assert_eq!(session.frame().phase, GamePhase::Playing);

        session.state.player.lives = 1;
        drop_on_player(&mut session, EntityKind::Obstacle(ObstacleKind::Bomb));
        session.frame();
        session.exit();
        assert_eq!(session.frame().phase, GamePhase::Exited);
        session.restart();
        assert_eq!(session.frame().phase, GamePhase::Exited);
    }

    #[test]
    fn test_same_seed_same_snapshots() {
        let run = || {
            let mut session = GameSession::new(
                99,
                Settings::default(),
                PlayerProfile::default(),
                Box::new(SharedScores::default()),
            );
            session.start();
            let mut last = session.frame();
            for i in 0..600 {
                session.gesture(GestureSample {
                    x: (i % 300) as f32,
                    y: 450.0,
                    velocity_x: 120.0,
                    active: i % 90 != 0,
                });
                last = session.frame();
            }
            last
        };
        assert_eq!(run(), run());
    }
}
