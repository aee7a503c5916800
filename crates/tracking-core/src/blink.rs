//! Blink-to-click detection.
//!
//! A blink is declared when the vertical gap between the lower and upper
//! eyelid landmarks drops below a threshold. Accepted clicks are debounced
//! with a timestamp cooldown instead of pausing the loop, so frames keep
//! flowing (and the cursor keeps tracking) while the cooldown runs.
//!
//! With `rearm_on_open` set, the eye also has to reopen before the next
//! click, which yields exactly one click per continuous closure no matter
//! how long it lasts.

/// Outcome of evaluating one frame's eyelid gap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlinkDecision {
    /// Gap at or above the threshold.
    Open,
    /// Blink accepted; issue a click.
    Click,
    /// Blink seen, but the previous click is too recent.
    CoolingDown,
    /// Eye still closed after a click; waiting for it to reopen.
    Held,
}

/// Eyelid-gap blink detector with a non-blocking cooldown.
#[derive(Debug, Clone)]
pub struct BlinkDetector {
    threshold: f64,
    cooldown_ns: u64,
    rearm_on_open: bool,
    last_click_ns: Option<u64>,
    armed: bool,
}

impl BlinkDetector {
    pub fn new(threshold: f64, cooldown_ns: u64, rearm_on_open: bool) -> Self {
        Self {
            threshold,
            cooldown_ns,
            rearm_on_open,
            last_click_ns: None,
            armed: true,
        }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn cooldown_ns(&self) -> u64 {
        self.cooldown_ns
    }

    /// Timestamp of the last accepted click.
    pub fn last_click_ns(&self) -> Option<u64> {
        self.last_click_ns
    }

    /// Whether a gap counts as a closed eye. NaN never does.
    pub fn is_closed(&self, gap: f64) -> bool {
        gap < self.threshold
    }

    /// Whether the cooldown started by the last click is still running.
    pub fn cooling_down(&self, now_ns: u64) -> bool {
        self.last_click_ns
            .is_some_and(|last| now_ns.saturating_sub(last) < self.cooldown_ns)
    }

    /// Evaluate one frame's eyelid gap at `now_ns`.
    pub fn evaluate(&mut self, gap: f64, now_ns: u64) -> BlinkDecision {
        if !self.is_closed(gap) {
            self.armed = true;
            return BlinkDecision::Open;
        }
        if !self.armed {
            return BlinkDecision::Held;
        }
        if self.cooling_down(now_ns) {
            return BlinkDecision::CoolingDown;
        }

        self.last_click_ns = Some(now_ns);
        if self.rearm_on_open {
            self.armed = false;
        }
        BlinkDecision::Click
    }
}
