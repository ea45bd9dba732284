//! # Frame Timing
//!
//! Rolling wall-clock frame times for the editor's diagnostics panel.
//!
//! Samples are written into a fixed ring at the start of every rendered frame.
//! The write index doubles as the plot offset, so the graph scrolls without
//! copying the history.
//!
//! ## Usage
//!
//! ```rust
//! use std::time::{Duration, Instant};
//! use ggine::performance::FrameTimings;
//!
//! let mut timings = FrameTimings::new(240);
//! let start = Instant::now();
//! timings.record(start);
//! timings.record(start + Duration::from_millis(16));
//! assert!(timings.latest_ms().is_some());
//! ```

use std::time::Instant;

/// Upper bound of the frame-time plot in milliseconds
pub const PLOT_MAX_MS: f32 = 40.0;

/// Fixed-size ring of frame times in milliseconds
#[derive(Debug, Clone)]
pub struct FrameTimings {
    samples: Vec<f32>,
    write_index: usize,
    recorded: usize,
    last_frame: Option<Instant>,
}

impl FrameTimings {
    pub fn new(sample_count: usize) -> Self {
        Self {
            samples: vec![0.0; sample_count.max(1)],
            write_index: 0,
            recorded: 0,
            last_frame: None,
        }
    }

    /// Records the time since the previous call; the first call only starts the clock
    pub fn record(&mut self, now: Instant) {
        if let Some(last) = self.last_frame.replace(now) {
            let delta = now.saturating_duration_since(last);
            self.push_sample(delta.as_secs_f32() * 1000.0);
        }
    }

    /// Writes one sample, overwriting the oldest once the ring is full
    pub fn push_sample(&mut self, ms: f32) {
        self.samples[self.write_index] = ms;
        self.write_index = (self.write_index + 1) % self.samples.len();
        self.recorded = (self.recorded + 1).min(self.samples.len());
    }

    /// Raw ring contents, oldest sample at [`write_index`](Self::write_index)
    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn write_index(&self) -> usize {
        self.write_index
    }

    pub fn latest_ms(&self) -> Option<f32> {
        if self.recorded == 0 {
            return None;
        }
        let len = self.samples.len();
        Some(self.samples[(self.write_index + len - 1) % len])
    }

    /// Mean over the samples recorded so far
    pub fn average_ms(&self) -> Option<f32> {
        if self.recorded == 0 {
            return None;
        }
        let len = self.samples.len();
        let sum: f32 = (0..self.recorded)
            .map(|i| self.samples[(self.write_index + len - 1 - i) % len])
            .sum();
        Some(sum / self.recorded as f32)
    }

    pub fn fps(&self) -> Option<f32> {
        self.average_ms().filter(|ms| *ms > 0.0).map(|ms| 1000.0 / ms)
    }

    /// Scrolling frame-time graph, 0 to [`PLOT_MAX_MS`]
    pub fn render_plot(&self, ui: &imgui::Ui) {
        let overlay = match (self.latest_ms(), self.fps()) {
            (Some(ms), Some(fps)) => format!("{:.2} ms ({:.0} fps)", ms, fps),
            _ => String::from("waiting for frames"),
        };
        ui.plot_lines("##frame_times", &self.samples)
            .values_offset(self.write_index)
            .overlay_text(overlay)
            .graph_size([0.0, 60.0])
            .scale_min(0.0)
            .scale_max(PLOT_MAX_MS)
            .build();
    }
}

impl Default for FrameTimings {
    fn default() -> Self {
        Self::new(240)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn test_first_record_only_starts_clock() {
        let mut timings = FrameTimings::new(4);
        timings.record(Instant::now());
        assert_eq!(timings.latest_ms(), None);
        assert_eq!(timings.write_index(), 0);
    }

    #[test]
    fn test_record_measures_delta() {
        let mut timings = FrameTimings::new(4);
        let start = Instant::now();
        timings.record(start);
        timings.record(start + Duration::from_millis(20));

        assert!((timings.latest_ms().unwrap() - 20.0).abs() < 1e-3);
        assert_eq!(timings.write_index(), 1);
    }

    #[test]
    fn test_ring_wraps_and_overwrites_oldest() {
        let mut timings = FrameTimings::new(3);
        for ms in [1.0, 2.0, 3.0, 4.0] {
            timings.push_sample(ms);
        }

        assert_eq!(timings.samples(), &[4.0, 2.0, 3.0]);
        assert_eq!(timings.write_index(), 1);
        assert_eq!(timings.latest_ms(), Some(4.0));
        assert_eq!(timings.average_ms(), Some(3.0));
    }

    #[test]
    fn test_average_ignores_unwritten_slots() {
        let mut timings = FrameTimings::new(240);
        timings.push_sample(10.0);
        timings.push_sample(20.0);

        assert_eq!(timings.average_ms(), Some(15.0));
        assert!((timings.fps().unwrap() - 66.666_67).abs() < 1e-3);
    }
}
