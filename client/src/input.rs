//! Paddle movement reporting with change detection
//!
//! `movePaddle` is sent opportunistically: only when the controlled
//! paddle's position actually changed since the previous report. This
//! bounds message volume to real movement instead of emitting every
//! frame.

use shared::GameAction;

/// Positions closer than this are treated as unchanged.
const MIN_REPORT_DELTA: f32 = 0.5;

/// Tracks the last reported paddle position and produces a `movePaddle`
/// action only on real movement.
pub struct PaddleReporter {
    last_sent_y: Option<f32>,
}

impl PaddleReporter {
    pub fn new() -> Self {
        Self { last_sent_y: None }
    }

    /// Returns the action to send for this frame, if the paddle moved.
    pub fn report(&mut self, current_y: f32) -> Option<GameAction> {
        let moved = match self.last_sent_y {
            Some(last) => (current_y - last).abs() >= MIN_REPORT_DELTA,
            None => true,
        };

        if moved {
            self.last_sent_y = Some(current_y);
            Some(GameAction::MovePaddle { y: current_y })
        } else {
            None
        }
    }

    /// Forgets the last report, forcing the next frame to resend (used
    /// after reconnects and game resets).
    pub fn reset(&mut self) {
        self.last_sent_y = None;
    }
}

impl Default for PaddleReporter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_position_is_always_reported() {
        let mut reporter = PaddleReporter::new();
        assert!(matches!(
            reporter.report(250.0),
            Some(GameAction::MovePaddle { y }) if y == 250.0
        ));
    }

    #[test]
    fn unchanged_position_is_not_resent() {
        let mut reporter = PaddleReporter::new();
        reporter.report(250.0);
        assert!(reporter.report(250.0).is_none());
        assert!(reporter.report(250.2).is_none());
    }

    #[test]
    fn movement_is_reported_again() {
        let mut reporter = PaddleReporter::new();
        reporter.report(250.0);
        assert!(reporter.report(260.0).is_some());
        assert!(reporter.report(260.0).is_none());
    }

    #[test]
    fn reset_forces_resend() {
        let mut reporter = PaddleReporter::new();
        reporter.report(250.0);
        reporter.reset();
        assert!(reporter.report(250.0).is_some());
    }
}
