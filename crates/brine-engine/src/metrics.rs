//! Per-step and cumulative scheduler metrics.
//!
//! [`StepMetrics`] captures what a single firing cost; [`EngineMetrics`]
//! accumulates over the life of an engine.

/// Metrics collected during a single step.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct StepMetrics {
    /// Wall-clock time for the entire step, in microseconds.
    pub total_us: u64,
    /// Reactions whose firing time was recomputed, the fired one included.
    pub refreshed: usize,
    /// Structural changes applied (reactions or nodes added or removed).
    pub structural_changes: usize,
    /// `true` if the popped reaction's guard was false and nothing ran.
    pub skipped: bool,
}

/// Cumulative metrics over the life of an engine.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct EngineMetrics {
    /// Firings that executed their actions.
    pub fired: u64,
    /// Pops whose guard was false.
    pub skipped: u64,
    /// Total reaction refreshes.
    pub refreshed: u64,
    /// Total structural changes applied.
    pub structural_changes: u64,
    /// Metrics of the most recent step.
    pub last_step: StepMetrics,
}

impl EngineMetrics {
    /// Fold one step into the totals.
    pub fn record(&mut self, step: StepMetrics) {
        if step.skipped {
            self.skipped += 1;
        } else {
            self.fired += 1;
        }
        self.refreshed += step.refreshed as u64;
        self.structural_changes += step.structural_changes as u64;
        self.last_step = step;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_metrics_are_zero() {
        let m = EngineMetrics::default();
        assert_eq!(m.fired, 0);
        assert_eq!(m.skipped, 0);
        assert_eq!(m.refreshed, 0);
        assert_eq!(m.last_step, StepMetrics::default());
    }

    #[test]
    fn record_accumulates() {
        let mut m = EngineMetrics::default();
        m.record(StepMetrics {
            total_us: 5,
            refreshed: 3,
            structural_changes: 1,
            skipped: false,
        });
        m.record(StepMetrics {
            refreshed: 1,
            skipped: true,
            ..StepMetrics::default()
        });
        assert_eq!(m.fired, 1);
        assert_eq!(m.skipped, 1);
        assert_eq!(m.refreshed, 4);
        assert_eq!(m.structural_changes, 1);
        assert!(m.last_step.skipped);
    }
}
