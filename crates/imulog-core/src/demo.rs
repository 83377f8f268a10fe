//! Demo Mode - Simulated IMU link for testing
//!
//! Generates plausible accelerometer/gyroscope/temperature frames without a
//! device attached. The simulated sensor rests flat (gravity on Z) with a
//! slow rocking motion, sensor noise and a warming temperature. A fraction of
//! frames can be corrupted to exercise the rejection path.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::time::{Duration, Instant};

use crate::protocol::{Link, LinkError};

/// Standard gravity (m/s^2)
const GRAVITY: f64 = 9.81;

/// Default frame rate of the simulated device
pub const DEFAULT_DEMO_RATE_HZ: f64 = 50.0;

/// Simulated IMU emitting CSV frames at a fixed rate
pub struct DemoLink {
    rng: StdRng,
    rate_hz: f64,
    /// Probability in [0, 1] that a frame is corrupted
    corruption: f64,
    started: Option<Instant>,
    frames_emitted: u64,
    pending: Vec<u8>,
}

impl Default for DemoLink {
    fn default() -> Self {
        Self::new(DEFAULT_DEMO_RATE_HZ)
    }
}

impl DemoLink {
    /// Create a demo link producing `rate_hz` frames per second
    pub fn new(rate_hz: f64) -> Self {
        Self::with_rng(StdRng::from_entropy(), rate_hz)
    }

    /// Create a reproducible demo link
    pub fn seeded(seed: u64, rate_hz: f64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed), rate_hz)
    }

    fn with_rng(rng: StdRng, rate_hz: f64) -> Self {
        Self {
            rng,
            rate_hz: rate_hz.clamp(1.0, 1000.0),
            corruption: 0.0,
            started: None,
            frames_emitted: 0,
            pending: Vec::new(),
        }
    }

    /// Corrupt roughly `fraction` of the frames
    pub fn with_corruption(mut self, fraction: f64) -> Self {
        self.corruption = fraction.clamp(0.0, 1.0);
        self
    }

    /// Generate the next frame, including its line terminator
    pub fn next_frame(&mut self) -> Vec<u8> {
        let t = self.frames_emitted as f64 / self.rate_hz;
        self.frames_emitted += 1;

        let noise = |rng: &mut StdRng, amplitude: f64| rng.gen_range(-amplitude..amplitude);

        // Slow rocking around X moves gravity between Y and Z
        let tilt = 0.3 * (t * 0.5).sin();
        let acc_x = noise(&mut self.rng, 0.05);
        let acc_y = GRAVITY * tilt.sin() + noise(&mut self.rng, 0.05);
        let acc_z = GRAVITY * tilt.cos() + noise(&mut self.rng, 0.05);
        let gyro_x = (0.3 * 0.5 * (t * 0.5).cos()).to_degrees() + noise(&mut self.rng, 0.2);
        let gyro_y = noise(&mut self.rng, 0.2);
        let gyro_z = noise(&mut self.rng, 0.2);
        let temp = 28.0 + 4.0 * (1.0 - (-t / 300.0).exp()) + noise(&mut self.rng, 0.02);

        let line = format!(
            "{:.3},{:.3},{:.3},{:.3},{:.3},{:.3},{:.2}\r\n",
            acc_x, acc_y, acc_z, gyro_x, gyro_y, gyro_z, temp
        );

        if self.corruption > 0.0 && self.rng.gen_bool(self.corruption) {
            self.corrupt(line.into_bytes())
        } else {
            line.into_bytes()
        }
    }

    fn corrupt(&mut self, mut frame: Vec<u8>) -> Vec<u8> {
        match self.rng.gen_range(0..3) {
            // Line noise: invalid UTF-8
            0 => {
                let at = self.rng.gen_range(0..frame.len() - 2);
                frame[at] = 0xFF;
                frame
            }
            // Truncated frame
            1 => {
                let comma = frame.iter().rposition(|&b| b == b',').unwrap_or(0);
                let mut truncated = frame[..comma].to_vec();
                truncated.extend_from_slice(b"\r\n");
                truncated
            }
            // Dropped digit field
            _ => {
                let first_comma = frame.iter().position(|&b| b == b',').unwrap_or(0);
                frame.drain(..first_comma);
                frame
            }
        }
    }

    fn frames_due(&self, elapsed: Duration) -> u64 {
        (elapsed.as_secs_f64() * self.rate_hz) as u64
    }
}

impl Link for DemoLink {
    fn poll(&mut self, buf: &mut [u8]) -> Result<usize, LinkError> {
        let started = *self.started.get_or_insert_with(Instant::now);

        if self.pending.is_empty() {
            let due = self.frames_due(started.elapsed());
            while self.frames_emitted < due && self.pending.len() < buf.len() {
                let frame = self.next_frame();
                self.pending.extend_from_slice(&frame);
            }
        }

        let n = self.pending.len().min(buf.len());
        buf[..n].copy_from_slice(&self.pending[..n]);
        self.pending.drain(..n);
        Ok(n)
    }

    fn describe(&self) -> String {
        format!("demo ({} Hz)", self.rate_hz)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::{Channel, FrameParser};

    #[test]
    fn test_clean_frames_parse() {
        let mut link = DemoLink::seeded(7, 100.0);
        for _ in 0..200 {
            let frame = link.next_frame();
            let sample = FrameParser::parse(&frame).expect("demo frame should parse");
            assert!((sample.get(Channel::AccZ) - GRAVITY).abs() < 1.5);
            assert!(sample.get(Channel::Temp) > 27.0);
        }
    }

    #[test]
    fn test_corrupted_frames_are_rejected() {
        let mut link = DemoLink::seeded(7, 100.0).with_corruption(1.0);
        for _ in 0..100 {
            let frame = link.next_frame();
            assert!(FrameParser::parse(&frame).is_err());
        }
    }

    #[test]
    fn test_poll_before_first_frame_is_due() {
        let mut link = DemoLink::seeded(1, 1.0);
        let mut buf = [0u8; 256];
        assert_eq!(link.poll(&mut buf).unwrap(), 0);
    }

    #[test]
    fn test_poll_eventually_yields_frames() {
        let mut link = DemoLink::seeded(1, 1000.0);
        let mut buf = [0u8; 4096];
        std::thread::sleep(Duration::from_millis(20));
        let n = link.poll(&mut buf).unwrap();
        assert!(n > 0);
        assert!(buf[..n].contains(&b'\n'));
    }
}
