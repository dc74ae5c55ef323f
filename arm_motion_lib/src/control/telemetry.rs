use std::collections::VecDeque;

use crate::types::{JointAngles, TelemetryConfig, TelemetrySample};

/// Decimated shoulder velocity and load estimates with a bounded history.
#[derive(Debug, Clone)]
pub struct TelemetryEstimator {
    decimation: u64,
    payload_load: f64,
    capacity: usize,
    history: VecDeque<TelemetrySample>,
}

impl TelemetryEstimator {
    pub fn new(config: &TelemetryConfig) -> Self {
        let capacity = config.history_capacity.max(1);
        Self {
            decimation: config.decimation.max(1),
            payload_load: config.payload_load,
            capacity,
            history: VecDeque::with_capacity(capacity),
        }
    }

    /// Observe one tick of actual joint motion.
    ///
    /// Only every `decimation`-th tick produces a sample. `elapsed` is the time
    /// between `previous` and `current`; a non-positive value yields zero
    /// velocity.
    pub fn observe(
        &mut self,
        tick: u64,
        previous: &JointAngles,
        current: &JointAngles,
        elapsed: f64,
        carrying: bool,
    ) -> Option<TelemetrySample> {
        if tick % self.decimation != 0 {
            return None;
        }

        let velocity = if elapsed > 0.0 {
            (current.shoulder - previous.shoulder).abs() / elapsed
        } else {
            0.0
        };

        let payload = if carrying { self.payload_load } else { 0.0 };
        let load = (current.shoulder.cos() + payload).abs();

        let sample = TelemetrySample {
            tick,
            velocity,
            load,
        };
        self.push(sample);
        Some(sample)
    }

    fn push(&mut self, sample: TelemetrySample) {
        while self.history.len() >= self.capacity {
            self.history.pop_front();
        }
        self.history.push_back(sample);
    }

    /// Samples oldest first.
    pub fn history(&self) -> &VecDeque<TelemetrySample> {
        &self.history
    }

    pub fn latest(&self) -> Option<&TelemetrySample> {
        self.history.back()
    }

    pub fn clear(&mut self) {
        self.history.clear();
    }
}
