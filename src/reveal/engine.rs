//! Typewriter reveal of a markup tree into a [`MountPoint`].
//!
//! A [`Reveal`] is a pull-based stream of [`Frame`]s. Each pull mounts every
//! element it reaches as an empty shell and then appends text, one glyph (or
//! one batch of glyphs) at a time; the frame tells the host how long to wait
//! before pulling again. Between pulls the target always holds a valid tree.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::mount::{Epoch, MountPoint};
use crate::markup::escape::glyphs;
use crate::markup::{Document, Node, Shell, to_tree};

/// How much text each frame reveals, and how long the host waits between
/// frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pacing {
    /// Timer-driven: one glyph per frame.
    PerGlyph { delay: Duration },
    /// Frame-clock driven: a random batch of `min..=max` glyphs per frame.
    Batched {
        min: usize,
        max: usize,
        interval: Duration,
    },
}

impl Pacing {
    fn budget(&self, rng: &mut StdRng) -> usize {
        match *self {
            Self::PerGlyph { .. } => 1,
            Self::Batched { min, max, .. } => {
                let min = min.max(1);
                rng.random_range(min..=max.max(min))
            }
        }
    }

    const fn wait(&self) -> Duration {
        match *self {
            Self::PerGlyph { delay } => delay,
            Self::Batched { interval, .. } => interval,
        }
    }
}

/// Work done by one pull.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Frame {
    pub glyphs: usize,
    pub mounted: usize,
    /// Suggested pause before the next pull.
    pub wait: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Running,
    Completed,
    Cancelled,
}

/// Host-owned time source the blocking driver waits on.
pub trait Clock {
    fn wait(&mut self, duration: Duration);
}

/// Sleeps the current thread.
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadClock;

impl Clock for ThreadClock {
    fn wait(&mut self, duration: Duration) {
        if !duration.is_zero() {
            std::thread::sleep(duration);
        }
    }
}

/// Records waits without sleeping.
#[derive(Debug, Default, Clone, Copy)]
pub struct ManualClock {
    pub waits: usize,
    pub elapsed: Duration,
}

impl Clock for ManualClock {
    fn wait(&mut self, duration: Duration) {
        self.waits += 1;
        self.elapsed += duration;
    }
}

#[derive(Debug, Clone)]
enum Op {
    Mount {
        parent: usize,
        slot: usize,
        shell: Shell,
    },
    Text {
        parent: usize,
        text: String,
        /// End offset of each glyph in `text`.
        ends: Vec<usize>,
    },
}

/// Flatten the tree depth-first. Slot 0 is the mount point's root; a node's
/// `Mount` always precedes anything written into it.
fn compile(nodes: &[Node], parent: usize, ops: &mut Vec<Op>, next_slot: &mut usize) {
    for node in nodes {
        match node {
            Node::Element { shell, children } => {
                let slot = *next_slot;
                *next_slot += 1;
                ops.push(Op::Mount {
                    parent,
                    slot,
                    shell: shell.clone(),
                });
                compile(children, slot, ops, next_slot);
            }
            Node::Text(text) if text.is_empty() => {}
            Node::Text(text) => {
                let ends = glyphs(text)
                    .iter()
                    .scan(0, |end, glyph| {
                        *end += glyph.len();
                        Some(*end)
                    })
                    .collect();
                ops.push(Op::Text {
                    parent,
                    text: text.clone(),
                    ends,
                });
            }
        }
    }
}

/// An in-flight reveal. Owns (or exclusively borrows) its target until it is
/// dropped or [`into_mount`](Self::into_mount) is called.
pub struct Reveal<M: MountPoint> {
    mount: M,
    ops: Vec<Op>,
    pc: usize,
    cursor: usize,
    handles: Vec<Option<M::Handle>>,
    epoch: Epoch,
    pacing: Pacing,
    rng: StdRng,
    outcome: Outcome,
    revealed: usize,
    total: usize,
}

impl<M: MountPoint> Reveal<M> {
    /// Prepare a reveal of `nodes` into `mount`. Nothing is written until the
    /// first pull.
    pub fn new(mount: M, nodes: &[Node], pacing: Pacing) -> Self {
        let mut ops = Vec::new();
        let mut slots = 1;
        compile(nodes, 0, &mut ops, &mut slots);
        let total = ops
            .iter()
            .map(|op| match op {
                Op::Text { ends, .. } => ends.len(),
                Op::Mount { .. } => 0,
            })
            .sum();
        let mut handles = vec![None; slots];
        handles[0] = Some(mount.root());
        let epoch = mount.epoch();
        tracing::debug!(ops = ops.len(), glyphs = total, "reveal prepared");
        Self {
            mount,
            ops,
            pc: 0,
            cursor: 0,
            handles,
            epoch,
            pacing,
            rng: StdRng::from_os_rng(),
            outcome: Outcome::Running,
            revealed: 0,
            total,
        }
    }

    pub fn document(mount: M, document: &Document, pacing: Pacing) -> Self {
        Self::new(mount, &to_tree(document), pacing)
    }

    /// Fix the batch-size sequence, for reproducible frames.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    /// Stop scheduling. Nothing else is written to the target.
    pub fn cancel(&mut self) {
        if self.outcome == Outcome::Running {
            self.finish(Outcome::Cancelled);
        }
    }

    pub const fn outcome(&self) -> Outcome {
        self.outcome
    }

    /// Glyphs revealed so far and in total.
    pub const fn progress(&self) -> (usize, usize) {
        (self.revealed, self.total)
    }

    pub const fn mount(&self) -> &M {
        &self.mount
    }

    pub fn into_mount(self) -> M {
        self.mount
    }

    /// Drive the reveal to the end on `clock`. `stop` is polled before every
    /// frame; once it is set the reveal is cancelled.
    pub fn run<C: Clock>(&mut self, clock: &mut C, stop: Option<&AtomicBool>) -> Outcome {
        loop {
            if stop.is_some_and(|flag| flag.load(Ordering::SeqCst)) {
                self.cancel();
            }
            match self.next() {
                Some(frame) if self.outcome == Outcome::Running => clock.wait(frame.wait),
                Some(_) => {}
                None => return self.outcome,
            }
        }
    }

    fn finish(&mut self, outcome: Outcome) {
        self.outcome = outcome;
        match outcome {
            Outcome::Cancelled => tracing::debug!(
                revealed = self.revealed,
                total = self.total,
                "reveal cancelled"
            ),
            Outcome::Completed => tracing::debug!(glyphs = self.total, "reveal completed"),
            Outcome::Running => {}
        }
    }
}

impl<M: MountPoint> Iterator for Reveal<M> {
    type Item = Frame;

    fn next(&mut self) -> Option<Frame> {
        if self.outcome != Outcome::Running {
            return None;
        }
        if !self.mount.is_still_live(self.epoch) {
            self.finish(Outcome::Cancelled);
            return None;
        }

        let budget = self.pacing.budget(&mut self.rng);
        let mut frame = Frame {
            glyphs: 0,
            mounted: 0,
            wait: self.pacing.wait(),
        };

        while let Some(op) = self.ops.get(self.pc) {
            match op {
                Op::Mount {
                    parent,
                    slot,
                    shell,
                } => {
                    if let Some(parent) = self.handles[*parent] {
                        self.handles[*slot] = Some(self.mount.attach_child(parent, shell));
                        frame.mounted += 1;
                    }
                    self.pc += 1;
                }
                Op::Text { parent, text, ends } => {
                    if frame.glyphs == budget {
                        break;
                    }
                    let start = if self.cursor == 0 {
                        0
                    } else {
                        ends[self.cursor - 1]
                    };
                    if let Some(parent) = self.handles[*parent] {
                        self.mount
                            .append_char(parent, &text[start..ends[self.cursor]]);
                    }
                    frame.glyphs += 1;
                    self.revealed += 1;
                    self.cursor += 1;
                    if self.cursor == ends.len() {
                        self.cursor = 0;
                        self.pc += 1;
                    }
                }
            }
        }

        if self.pc == self.ops.len() {
            self.finish(Outcome::Completed);
        }
        (frame.glyphs > 0 || frame.mounted > 0).then_some(frame)
    }
}
