use std::time::Duration;

/// Turns elapsed wall time into a whole number of events at a fixed rate.
///
/// Leftover time carries over to the next call. When more than
/// `max_per_advance` events are due, the excess is dropped instead of being
/// replayed, so a stalled host does not fast-forward the machine.
#[derive(Debug, Clone)]
pub struct FixedRate {
    period: Duration,
    accumulator: Duration,
    max_per_advance: u32,
}

impl FixedRate {
    pub fn from_hz(hz: u32) -> Self {
        Self {
            period: Duration::from_secs(1) / hz.max(1),
            accumulator: Duration::ZERO,
            max_per_advance: u32::MAX,
        }
    }

    pub fn max_per_advance(mut self, max: u32) -> Self {
        self.max_per_advance = max;
        self
    }

    pub fn advance(&mut self, elapsed: Duration) -> u32 {
        self.accumulator += elapsed;
        let due = self.accumulator.as_nanos() / self.period.as_nanos().max(1);
        if due > self.max_per_advance as u128 {
            self.accumulator = Duration::ZERO;
            return self.max_per_advance;
        }
        let due = due as u32;
        self.accumulator -= self.period * due;
        due
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::FixedRate;

    #[test]
    fn test_carries_remainder() {
        let mut clock = FixedRate::from_hz(100);
        assert_eq!(clock.advance(Duration::from_millis(25)), 2);
        assert_eq!(clock.advance(Duration::from_millis(4)), 0);
        assert_eq!(clock.advance(Duration::from_millis(1)), 1);
    }

    #[test]
    fn test_clamps_and_drops_backlog() {
        let mut clock = FixedRate::from_hz(100).max_per_advance(4);
        assert_eq!(clock.advance(Duration::from_secs(1)), 4);
        assert_eq!(clock.advance(Duration::from_millis(5)), 0);
    }

    #[test]
    fn test_sixty_hertz_over_one_second() {
        let mut clock = FixedRate::from_hz(60);
        let ticks: u32 = (0..100)
            .map(|_| clock.advance(Duration::from_millis(10)))
            .sum();
        assert_eq!(ticks, 60);
    }
}
