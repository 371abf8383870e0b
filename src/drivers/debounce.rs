//! Polled debounce filter for the reset trigger input.
//!
//! The raw level is sampled once per tick from the main loop; the debounced
//! state only follows after the raw level has held unchanged for the full
//! configured interval. Glitches shorter than the interval never surface.

/// Debounced view over a sampled digital input.
#[derive(Debug, Clone, Copy)]
pub struct Debouncer {
    interval_ms: u64,
    /// Last accepted (stable) level.
    stable: bool,
    /// Raw level currently being timed.
    candidate: bool,
    /// When `candidate` was first observed.
    candidate_since_ms: u64,
}

impl Debouncer {
    /// `interval_ms` is how long the raw level must hold before it is
    /// accepted. `initial` seeds both the stable and candidate levels.
    pub fn new(interval_ms: u64, initial: bool) -> Self {
        Self {
            interval_ms,
            stable: initial,
            candidate: initial,
            candidate_since_ms: 0,
        }
    }

    /// Feed one raw sample. Call every tick with the current monotonic
    /// time. Returns `true` when the stable level changed on this sample.
    pub fn update(&mut self, raw: bool, now_ms: u64) -> bool {
        if raw != self.candidate {
            self.candidate = raw;
            self.candidate_since_ms = now_ms;
            return false;
        }
        if raw != self.stable && now_ms.wrapping_sub(self.candidate_since_ms) >= self.interval_ms {
            self.stable = raw;
            return true;
        }
        false
    }

    /// Current debounced level.
    pub fn read(&self) -> bool {
        self.stable
    }
}
