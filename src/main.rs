//! Tier Runner headless demo
//!
//! Plays one seeded run with a simple autopilot feeding gestures from its own
//! thread, logs feedback through a logging sink, records the result in a JSON
//! leaderboard and prints the final snapshot.
//!
//! Usage: `tier-runner [DATA_DIR]` (defaults to the current directory).

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::mpsc::{Receiver, Sender, channel};
use std::time::{SystemTime, UNIX_EPOCH};

use tier_runner::consts::*;
use tier_runner::feedback::{FeedbackWorker, LogSink};
use tier_runner::highscores::HighScoreFile;
use tier_runner::session::{GameSession, PlayerProfile, Snapshot};
use tier_runner::settings::Settings;
use tier_runner::sim::{EntityKind, GamePhase, GestureCell, GestureSample};

/// Give up after this many frames even if the autopilot survives
const MAX_FRAMES: u64 = 60 * 60 * 5;

/// How far above the player the autopilot looks for obstacles
const LOOKAHEAD: f32 = 220.0;

fn main() {
    env_logger::init();
    log::info!("Tier Runner (headless) starting...");

    let data_dir = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."));
    let settings = Settings::load(&data_dir.join("tier-runner-settings.json"));
    let seed = settings.seed.unwrap_or_else(time_seed);
    let scores = HighScoreFile::open(data_dir.join("tier-runner-scores.json"));
    let previous_best = scores.scores.top_score();

    let worker = FeedbackWorker::spawn(LogSink);
    let mut session = GameSession::new(seed, settings, PlayerProfile::default(), Box::new(scores));
    if let Some(queue) = worker.queue() {
        session = session.with_feedback(queue);
    }

    let (snapshots, autopilot_rx) = channel::<Arc<Snapshot>>();
    let gesture = session.gesture_handle();
    let pilot = std::thread::Builder::new()
        .name("autopilot".into())
        .spawn(move || autopilot(autopilot_rx, gesture));
    if let Err(e) = &pilot {
        log::warn!("autopilot unavailable, player will stand still: {}", e);
    }

    session.start();
    let mut last = session.frame();
    let mut snapshots = Some(snapshots);
    while last.phase == GamePhase::Playing && last.frame < MAX_FRAMES {
        forward(&mut snapshots, &last);
        last = session.frame();
    }
    drop(snapshots);

    if let Ok(handle) = pilot
        && handle.join().is_err()
    {
        log::warn!("autopilot panicked");
    }
    session.exit();
    session.frame();
    drop(session);
    worker.shutdown();

    log::info!(
        "run finished: score {} tier {} after {} frames (previous best {:?})",
        last.score,
        last.tier_label,
        last.frame,
        previous_best
    );
    match serde_json::to_string_pretty(&*last) {
        Ok(json) => println!("{}", json),
        Err(e) => log::warn!("failed to serialize snapshot: {}", e),
    }
}

fn time_seed() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0)
}

/// Hand the autopilot the latest snapshot; once it is gone, stop trying
fn forward(snapshots: &mut Option<Sender<Arc<Snapshot>>>, snapshot: &Arc<Snapshot>) {
    if let Some(tx) = snapshots
        && tx.send(Arc::clone(snapshot)).is_err()
    {
        log::warn!(
            "autopilot stopped at frame {}, continuing without it",
            snapshot.frame
        );
        *snapshots = None;
    }
}

/// Dodge the nearest obstacle overhead, otherwise chase the nearest collectible
fn autopilot(snapshots: Receiver<Arc<Snapshot>>, gesture: GestureCell) {
    for snapshot in snapshots {
        let px = snapshot.player.x;
        let py = snapshot.player.y;
        let centre = px + PLAYER_SIZE / 2.0;

        let threat = snapshot
            .entities
            .iter()
            .filter(|e| matches!(e.kind, EntityKind::Obstacle(_)))
            .filter(|e| e.y + ENTITY_SIZE > py - LOOKAHEAD && e.y < py + PLAYER_SIZE)
            .filter(|e| e.x < px + PLAYER_SIZE + 12.0 && e.x + ENTITY_SIZE > px - 12.0)
            .max_by(|a, b| a.y.total_cmp(&b.y));

        let target = match threat {
            Some(obstacle) => {
                let obstacle_centre = obstacle.x + ENTITY_SIZE / 2.0;
                if obstacle_centre > centre && obstacle.x > PLAYER_SIZE + 8.0 {
                    obstacle.x - PLAYER_SIZE - 8.0
                } else if obstacle.x + ENTITY_SIZE + PLAYER_SIZE + 8.0 < FIELD_WIDTH {
                    obstacle.x + ENTITY_SIZE + 8.0
                } else {
                    obstacle.x - PLAYER_SIZE - 8.0
                }
            }
            None => snapshot
                .entities
                .iter()
                .filter(|e| matches!(e.kind, EntityKind::Collectible(_)) && e.y < py)
                .max_by(|a, b| a.y.total_cmp(&b.y))
                .map(|e| e.x + ENTITY_SIZE / 2.0 - PLAYER_SIZE / 2.0)
                .unwrap_or(px),
        };

        gesture.store(GestureSample {
            x: target,
            y: py,
            velocity_x: (target - px) * 4.0,
            active: true,
        });
    }
    gesture.release();
}
