// Score simulation scheduler.
//
// Fakes live stat updates by running one independent randomized recurring
// timer per player. Each timer fire bumps that player's season and week
// points through the directory and reports the new season value to the
// subscriber callback. `start` and `stop` are idempotent; after `stop`
// returns, no further mutation or callback can occur.

use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::players::{PlayerDirectory, PlayerId};

/// Minimum delay before a player's next update, inclusive.
pub const MIN_UPDATE_DELAY_MS: u64 = 5_000;
/// Maximum delay before a player's next update, exclusive.
pub const MAX_UPDATE_DELAY_MS: u64 = 30_000;
/// Smallest per-update score change, inclusive.
pub const MIN_SCORE_DELTA: i32 = -5;
/// Largest per-update score change, inclusive. The range is deliberately
/// asymmetric: scores trend upward over a session.
pub const MAX_SCORE_DELTA: i32 = 10;

/// Subscriber callback: `(player_id, new_season_points)`. Only the season
/// value is reported even though the week value is mutated too. Invoked
/// under the simulator's control lock; see [`ScoreSimulator::start`] for the
/// reentrancy constraint.
pub type UpdateCallback = Arc<dyn Fn(PlayerId, f64) + Send + Sync>;

/// Mutable control state shared with every per-player timer task. Timer
/// fires check `running` and invoke the callback while holding this lock,
/// so flipping `running` under the lock in `stop()` is a hard cutoff.
struct Control {
    running: bool,
    on_update: Option<UpdateCallback>,
}

struct SimShared {
    directory: Arc<PlayerDirectory>,
    control: Mutex<Control>,
}

impl SimShared {
    fn control(&self) -> std::sync::MutexGuard<'_, Control> {
        self.control.lock().expect("simulator control mutex poisoned")
    }
}

/// The score simulation scheduler. One instance per process; dependencies
/// (directory, RNG seed) are injected at construction so tests can run
/// deterministically under a paused clock.
pub struct ScoreSimulator {
    shared: Arc<SimShared>,
    tasks: Mutex<HashMap<PlayerId, JoinHandle<()>>>,
    seed: u64,
}

impl ScoreSimulator {
    /// Create a simulator with an entropy-derived seed.
    pub fn new(directory: Arc<PlayerDirectory>) -> Self {
        Self::with_seed(directory, rand::random())
    }

    /// Create a simulator with a fixed seed. Each player's schedule draws
    /// from its own ChaCha8 stream derived from `seed` and the player id,
    /// so schedules are independent but reproducible.
    pub fn with_seed(directory: Arc<PlayerDirectory>, seed: u64) -> Self {
        ScoreSimulator {
            shared: Arc::new(SimShared {
                directory,
                control: Mutex::new(Control {
                    running: false,
                    on_update: None,
                }),
            }),
            tasks: Mutex::new(HashMap::new()),
            seed,
        }
    }

    /// Start simulating score updates for every player currently in the
    /// directory. No-op if already running: no duplicate timers are created
    /// and the original callback stays registered.
    ///
    /// `on_update` runs with the control lock held (that lock is what makes
    /// `stop()` a hard cutoff), so it must not call back into this simulator:
    /// `start`, `stop`, or `is_running` from inside the callback deadlocks.
    /// Hand the update off to a channel instead, as the binary does.
    pub fn start(&self, on_update: impl Fn(PlayerId, f64) + Send + Sync + 'static) {
        let mut control = self.shared.control();
        if control.running {
            debug!("start ignored: simulation already running");
            return;
        }
        control.running = true;
        control.on_update = Some(Arc::new(on_update));

        // Snapshot the id set now; players added or removed later are not
        // picked up mid-run.
        let ids = self.shared.directory.ids();
        let mut tasks = self.lock_tasks();
        for id in ids {
            let rng = ChaCha8Rng::seed_from_u64(self.seed.wrapping_add(u64::from(id)));
            let handle = tokio::spawn(run_schedule(Arc::clone(&self.shared), id, rng));
            tasks.insert(id, handle);
        }

        info!("Started score simulation for {} players", tasks.len());
    }

    /// Stop all simulations. No-op if already stopped. Cancellation is
    /// complete once this returns: timers still waiting are aborted, and a
    /// fire already racing this call observes `running == false` under the
    /// control lock before it can mutate or call back.
    pub fn stop(&self) {
        let mut control = self.shared.control();
        if !control.running {
            debug!("stop ignored: simulation not running");
            return;
        }
        control.running = false;
        control.on_update = None;

        let mut tasks = self.lock_tasks();
        for (_, handle) in tasks.drain() {
            handle.abort();
        }

        info!("Stopped score simulation");
    }

    /// Whether the simulation is currently running.
    pub fn is_running(&self) -> bool {
        self.shared.control().running
    }

    /// Number of player schedules in the handle map. Equals the directory's
    /// player count at the time of the last `start()` while running, zero
    /// when stopped.
    pub fn active_count(&self) -> usize {
        self.lock_tasks().len()
    }

    fn lock_tasks(&self) -> std::sync::MutexGuard<'_, HashMap<PlayerId, JoinHandle<()>>> {
        self.tasks.lock().expect("simulator task map mutex poisoned")
    }
}

/// One player's recurring schedule: sleep a random delay, apply a random
/// delta, report, re-arm. Exits when the simulator stops or the player
/// record has disappeared.
async fn run_schedule(shared: Arc<SimShared>, id: PlayerId, mut rng: ChaCha8Rng) {
    loop {
        let delay = random_delay(&mut rng);
        tokio::time::sleep(delay).await;

        // Everything from the running-state check to the callback happens
        // under the control lock; `stop()` takes the same lock, so once it
        // returns no fire can get past this check.
        let control = shared.control();
        if !control.running {
            return;
        }

        let delta = random_delta(&mut rng);
        let Some(change) = shared.directory.apply_score_delta(id, f64::from(delta)) else {
            // Record gone: skip silently and let this schedule lapse.
            debug!("player {id} absent at fire time; schedule lapses");
            return;
        };

        debug!(
            "player {id}: {}{} points (season {:.2}, week {:.2})",
            if delta > 0 { "+" } else { "" },
            delta,
            change.season_points,
            change.week_points
        );

        if let Some(on_update) = &control.on_update {
            // A panicking subscriber must not take down this or any other
            // player's schedule.
            let result =
                std::panic::catch_unwind(AssertUnwindSafe(|| on_update(id, change.season_points)));
            if result.is_err() {
                warn!("score update callback panicked for player {id}");
            }
        }
        // Lock released at end of scope; re-arm with a fresh delay.
    }
}

fn random_delay(rng: &mut impl Rng) -> Duration {
    Duration::from_millis(rng.gen_range(MIN_UPDATE_DELAY_MS..MAX_UPDATE_DELAY_MS))
}

fn random_delta(rng: &mut impl Rng) -> i32 {
    rng.gen_range(MIN_SCORE_DELTA..=MAX_SCORE_DELTA)
}
