use std::collections::VecDeque;

/// Rolling-mean smoother over per-frame fused scores.
///
/// Weapon-escalated frames flood the window so the alert is not delayed by
/// smoothing lag, then hold the reported score at the escalated value for the
/// next `window_size` frames.
#[derive(Clone, Debug)]
pub struct TemporalSmoother {
    history: VecDeque<f64>,
    window_size: usize,
    hold: Option<EscalationHold>,
}

#[derive(Clone, Copy, Debug)]
struct EscalationHold {
    floor: f64,
    frames_left: usize,
}

impl TemporalSmoother {
    pub fn new(window_size: usize) -> Self {
        let window_size = window_size.max(1);
        Self {
            history: VecDeque::with_capacity(window_size),
            window_size,
            hold: None,
        }
    }

    /// Push a frame score in [0, 1]; returns the reported score in [0, 100].
    pub fn push(&mut self, score: f64, escalated: bool) -> f64 {
        if escalated {
            self.history.clear();
            self.history.extend(std::iter::repeat(score).take(self.window_size));
            self.hold = Some(EscalationHold {
                floor: score,
                frames_left: self.window_size,
            });
            return self.mean_percent();
        }

        self.history.push_back(score);
        while self.history.len() > self.window_size {
            self.history.pop_front();
        }

        let mut reported = self.mean_percent();
        if let Some(hold) = self.hold.as_mut() {
            reported = reported.max((hold.floor * 100.0).min(100.0));
            hold.frames_left -= 1;
            if hold.frames_left == 0 {
                self.hold = None;
            }
        }
        reported
    }

    fn mean_percent(&self) -> f64 {
        if self.history.is_empty() {
            return 0.0;
        }
        let sum: f64 = self.history.iter().sum();
        (sum / self.history.len() as f64 * 100.0).min(100.0)
    }

    pub fn is_holding(&self) -> bool {
        self.hold.is_some()
    }

    pub fn len(&self) -> usize {
        self.history.len()
    }

    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }

    pub fn reset(&mut self) {
        self.history.clear();
        self.hold = None;
    }
}
