//! Simulated source
//!
//! Replays a fixed buffer of synthetic samples at a constant cadence,
//! wrapping to the start when exhausted. The buffer is generated once from a
//! seeded RNG, so the same configuration always replays the same sequence.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::time::Duration;
use tidewatch_core::{Record, RecordSource, Result, SourceMetadata};
use tidewatch_types::{RawFields, SimulatedSourceConfig};
use tokio::time::{self, Interval, MissedTickBehavior};

/// Generate `count` synthetic samples shaped like a calm-water deployment
pub fn synthetic_samples(count: usize, seed: u64) -> Vec<Record> {
    let mut rng = StdRng::seed_from_u64(seed);

    (0..count)
        .map(|index| {
            let i = index as f64;
            let raw = RawFields {
                tds: Some(1800.0 + (i / 5.0).sin() * 100.0 + rng.gen_range(0.0..50.0)),
                turbidity: Some(1.5 + (i / 7.0).cos() * 0.4 + rng.gen_range(0.0..0.2)),
                pressure: Some(105.0 + (i / 6.0).sin() * 4.0),
                int_temp: Some(30.0 + (i / 8.0).sin() * 3.0),
                ext_temp: Some(25.0 + (i / 10.0).cos() * 2.0),
                conductivity: Some(50.0 + (i / 9.0).sin() * 6.0),
                acc_x: Some((i / 4.0).sin()),
                acc_y: Some((i / 4.0).cos()),
                acc_z: Some((i / 3.0).sin()),
                gyro_x: Some((i / 5.0).sin() * 30.0),
                gyro_y: Some((i / 5.0).cos() * 30.0),
                gyro_z: Some((i / 6.0).sin() * 30.0),
                ..RawFields::default()
            };
            Record::from_raw_with_clock(raw, || sample_clock(index))
        })
        .collect()
}

/// Clock string for a sample, one second apart from midnight
fn sample_clock(index: usize) -> String {
    let seconds = index % 86_400;
    format!(
        "{:02}:{:02}:{:02}",
        seconds / 3600,
        (seconds / 60) % 60,
        seconds % 60
    )
}

pub struct SimulatedSource {
    metadata: SourceMetadata,
    samples: Vec<Record>,
    cursor: usize,
    period: Duration,
    interval: Option<Interval>,
}

impl SimulatedSource {
    pub fn new(config: &SimulatedSourceConfig) -> Self {
        let samples = synthetic_samples(config.sample_count.max(1), config.seed);
        Self::from_samples(samples, Duration::from_millis(config.interval_ms.max(1)))
    }

    /// Replay an explicit buffer. An empty buffer replays a single default record.
    pub fn from_samples(samples: Vec<Record>, period: Duration) -> Self {
        let samples = if samples.is_empty() {
            vec![Record::default()]
        } else {
            samples
        };

        let metadata = SourceMetadata {
            id: "simulated".to_string(),
            name: "Simulated".to_string(),
            description: format!("{} synthetic samples, looped", samples.len()),
            nominal_interval: Some(period),
        };

        Self {
            metadata,
            samples,
            cursor: 0,
            period,
            interval: None,
        }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Next sample without waiting for the cadence
    fn advance(&mut self) -> Record {
        let record = self.samples[self.cursor].clone();
        self.cursor = (self.cursor + 1) % self.samples.len();
        record
    }
}

impl RecordSource for SimulatedSource {
    fn metadata(&self) -> &SourceMetadata {
        &self.metadata
    }

    async fn next_record(&mut self) -> Result<Record> {
        let period = self.period;
        let interval = self.interval.get_or_insert_with(|| {
            let mut interval = time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            interval
        });
        interval.tick().await;

        Ok(self.advance())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::Instant;

    #[test]
    fn test_same_seed_same_buffer() {
        assert_eq!(synthetic_samples(50, 7), synthetic_samples(50, 7));
        assert_ne!(synthetic_samples(50, 7), synthetic_samples(50, 8));
    }

    #[test]
    fn test_sample_shape() {
        let samples = synthetic_samples(200, 42);
        assert_eq!(samples.len(), 200);

        let first = &samples[0];
        assert_eq!(first.timestamp, "00:00:00");
        assert!((1800.0..1850.0).contains(&first.salinity));
        assert!((1.9..2.1).contains(&first.turbidity));
        assert_eq!(first.pressure, 105.0);
        assert_eq!(first.ext_temp, 27.0);
        assert_eq!(first.acceleration(), [0.0, 1.0, 0.0]);
        assert_eq!(first.angular_rate(), [0.0, 30.0, 0.0]);

        for record in &samples {
            assert!((1700.0..1950.0).contains(&record.salinity));
            assert!((101.0..=109.0).contains(&record.pressure));
            assert!(!record.leak);
        }
        assert_eq!(samples[61].timestamp, "00:01:01");
    }

    #[tokio::test(start_paused = true)]
    async fn test_wraps_around_after_last_sample() {
        let config = SimulatedSourceConfig {
            sample_count: 5,
            interval_ms: 1000,
            seed: 1,
        };
        let mut source = SimulatedSource::new(&config);
        let expected = synthetic_samples(5, 1);

        let mut emitted = Vec::new();
        for _ in 0..6 {
            emitted.push(source.next_record().await.unwrap());
        }

        assert_eq!(&emitted[..5], &expected[..]);
        assert_eq!(emitted[5], emitted[0]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_sample_immediate_then_fixed_cadence() {
        let mut source =
            SimulatedSource::from_samples(synthetic_samples(3, 0), Duration::from_millis(1000));
        let started = Instant::now();

        source.next_record().await.unwrap();
        assert!(started.elapsed() < Duration::from_millis(1));

        source.next_record().await.unwrap();
        source.next_record().await.unwrap();
        assert!(started.elapsed() >= Duration::from_millis(2000));
        assert!(started.elapsed() < Duration::from_millis(2100));
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_buffer_replays_default() {
        let mut source = SimulatedSource::from_samples(Vec::new(), Duration::from_millis(10));
        assert_eq!(source.len(), 1);
        assert_eq!(source.next_record().await.unwrap(), Record::default());
    }
}
