//! The presentation collaborator.
//!
//! The scheduler never waits on wall-clock animation timing; it hands each
//! visual a [`Completion`] token and suspends the owning command until the
//! token comes back through the [`SignalBus`]. A presentation impl may take
//! as long as it likes, but must fire each token exactly once -- which the
//! token's move semantics already guarantee.
//!
//! [`InstantView`] is the built-in headless presentation: it holds every
//! token for a configurable number of frames and records what it was asked
//! to play, which is what the integration tests assert against.

use mattock_world::prelude::*;

use crate::signal::{Completion, SignalBus};

// ---------------------------------------------------------------------------
// Animation requests
// ---------------------------------------------------------------------------

/// A completed step from one cell to the next.
#[derive(Debug, Clone)]
pub struct MoveAnim {
    pub entity: EntityId,
    pub from: GridPos,
    pub to: GridPos,
    pub facing: Facing,
}

/// A refused step: the entity stays on `at`, bumping toward `facing`.
#[derive(Debug, Clone)]
pub struct BumpAnim {
    pub entity: EntityId,
    pub at: GridPos,
    pub facing: Facing,
}

/// An in-place turn to `facing`.
#[derive(Debug, Clone)]
pub struct TurnAnim {
    pub entity: EntityId,
    pub facing: Facing,
}

/// A block appearing or disappearing at `at`.
#[derive(Debug, Clone)]
pub struct BlockAnim {
    pub entity: EntityId,
    pub at: GridPos,
    pub block: BlockKind,
}

/// `user` using `target` (e.g. shearing) at `at`.
#[derive(Debug, Clone)]
pub struct UseAnim {
    pub user: EntityId,
    pub target: EntityId,
    pub at: GridPos,
}

// ---------------------------------------------------------------------------
// Presentation
// ---------------------------------------------------------------------------

/// What the scheduler asks of a renderer. Every method that takes a
/// [`Completion`] must eventually fire it into the bus passed to
/// [`pump`](Presentation::pump).
pub trait Presentation {
    fn play_move(&mut self, anim: MoveAnim, done: Completion);
    fn play_bump(&mut self, anim: BumpAnim, done: Completion);
    fn play_turn(&mut self, anim: TurnAnim, done: Completion);
    fn play_destroy_block(&mut self, anim: BlockAnim, done: Completion);
    fn play_punch_air(&mut self, anim: BumpAnim, done: Completion);
    fn play_place_block(&mut self, anim: BlockAnim, done: Completion);
    /// The placement attempt the grid refused: a bounce instead of a
    /// placement frame.
    fn play_place_bounce(&mut self, anim: BlockAnim, done: Completion);
    fn play_shear(&mut self, anim: UseAnim, done: Completion);
    fn play_flash(&mut self, entity: EntityId, done: Completion);
    /// Fire-and-forget effect; nothing suspends on it.
    fn play_explosion(&mut self, at: GridPos);
    fn play_success(&mut self, done: Completion);
    fn play_failure(&mut self, done: Completion);
    fn play_sound(&mut self, sound: &str);
    /// Called once per engine tick: fire the tokens of any playback that
    /// has finished.
    fn pump(&mut self, signals: &mut SignalBus);
}

// ---------------------------------------------------------------------------
// InstantView
// ---------------------------------------------------------------------------

/// Headless presentation that completes every playback after
/// `latency_frames` pumps and keeps a label history.
#[derive(Debug)]
pub struct InstantView {
    latency_frames: u32,
    pending: Vec<(u32, Completion)>,
    /// Labels of every play call, in order: `"moveForward Player"`,
    /// `"destroyBlock logOak (2, 1)"`, ...
    pub history: Vec<String>,
}

impl InstantView {
    /// One frame of playback latency.
    pub fn new() -> Self {
        Self::with_latency(1)
    }

    /// Completions fire on the pump after `latency_frames` further pumps
    /// (0 = the very next pump; the scheduler observes the resolution on
    /// that tick).
    pub fn with_latency(latency_frames: u32) -> Self {
        Self {
            latency_frames,
            pending: Vec::new(),
            history: Vec::new(),
        }
    }

    fn stash(&mut self, label: String, done: Completion) {
        self.history.push(label);
        self.pending.push((self.latency_frames, done));
    }

    /// True while some playback is holding an unfired token.
    pub fn is_animating(&self) -> bool {
        !self.pending.is_empty()
    }
}

impl Default for InstantView {
    fn default() -> Self {
        Self::new()
    }
}

impl Presentation for InstantView {
    fn play_move(&mut self, anim: MoveAnim, done: Completion) {
        self.stash(format!("move {} {}", anim.entity, anim.to), done);
    }

    fn play_bump(&mut self, anim: BumpAnim, done: Completion) {
        self.stash(format!("bump {} {}", anim.entity, anim.at), done);
    }

    fn play_turn(&mut self, anim: TurnAnim, done: Completion) {
        self.stash(format!("turn {} {:?}", anim.entity, anim.facing), done);
    }

    fn play_destroy_block(&mut self, anim: BlockAnim, done: Completion) {
        self.stash(format!("destroyBlock {} {}", anim.block, anim.at), done);
    }

    fn play_punch_air(&mut self, anim: BumpAnim, done: Completion) {
        self.stash(format!("punchAir {} {}", anim.entity, anim.at), done);
    }

    fn play_place_block(&mut self, anim: BlockAnim, done: Completion) {
        self.stash(format!("placeBlock {} {}", anim.block, anim.at), done);
    }

    fn play_place_bounce(&mut self, anim: BlockAnim, done: Completion) {
        self.stash(format!("placeBounce {} {}", anim.block, anim.at), done);
    }

    fn play_shear(&mut self, anim: UseAnim, done: Completion) {
        self.stash(format!("shear {} by {}", anim.target, anim.user), done);
    }

    fn play_flash(&mut self, entity: EntityId, done: Completion) {
        self.stash(format!("flash {entity}"), done);
    }

    fn play_explosion(&mut self, at: GridPos) {
        self.history.push(format!("explosion {at}"));
    }

    fn play_success(&mut self, done: Completion) {
        self.stash("success".to_owned(), done);
    }

    fn play_failure(&mut self, done: Completion) {
        self.stash("failure".to_owned(), done);
    }

    fn play_sound(&mut self, sound: &str) {
        self.history.push(format!("sound {sound}"));
    }

    fn pump(&mut self, signals: &mut SignalBus) {
        let mut still_pending = Vec::with_capacity(self.pending.len());
        for (frames, done) in self.pending.drain(..) {
            if frames == 0 {
                signals.fire(done);
            } else {
                still_pending.push((frames - 1, done));
            }
        }
        self.pending = still_pending;
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::{CommandIds, CommandState};

    #[test]
    fn instant_view_fires_after_its_latency() {
        let mut ids = CommandIds::new();
        let cmd = ids.alloc();
        let mut bus = SignalBus::new();
        let mut view = InstantView::with_latency(2);

        let done = bus.arm(cmd, CommandState::Succeeded);
        view.play_success(done);
        assert!(view.is_animating());

        view.pump(&mut bus); // frame 1
        view.pump(&mut bus); // frame 2
        assert!(bus.drain().is_empty());

        view.pump(&mut bus); // frame 3: latency elapsed
        let resolutions = bus.drain();
        assert_eq!(resolutions.len(), 1);
        assert_eq!(resolutions[0].command, cmd);
        assert!(!view.is_animating());
    }

    #[test]
    fn history_records_every_request() {
        let mut ids = CommandIds::new();
        let mut bus = SignalBus::new();
        let mut view = InstantView::new();

        view.play_sound("fizz");
        view.play_explosion(GridPos::new(1, 2));
        let done = bus.arm(ids.alloc(), CommandState::Succeeded);
        view.play_flash(EntityId::new("sheep1"), done);

        assert_eq!(
            view.history,
            vec!["sound fizz", "explosion (1, 2)", "flash sheep1"]
        );
    }
}
