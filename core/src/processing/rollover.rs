use crate::prelude::{NavError, NavResult};

const COUNTER_SPAN: u64 = 1 << 16;

/// Turns wrapping 16-bit ensemble numbers into a strictly increasing index.
///
/// Ensembles arrive in production order, so any decrease is a wrap. A repeat
/// of the previous raw value is reported as out of order and leaves the
/// state untouched.
#[derive(Debug, Default, Clone)]
pub struct RolloverTracker {
    last_raw: Option<u16>,
    wraps: u64,
}

impl RolloverTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Logical index `raw` would receive, without committing it.
    pub fn peek(&self, raw: u16) -> NavResult<u64> {
        match self.last_raw {
            None => Ok(self.logical(self.wraps, raw)),
            Some(last) if raw == last => Err(NavError::OutOfOrder {
                previous: self.logical(self.wraps, last),
                raw,
            }),
            Some(last) if raw < last => Ok(self.logical(self.wraps + 1, raw)),
            Some(_) => Ok(self.logical(self.wraps, raw)),
        }
    }

    pub fn next(&mut self, raw: u16) -> NavResult<u64> {
        let index = self.peek(raw)?;
        self.wraps = index / COUNTER_SPAN;
        self.last_raw = Some(raw);
        Ok(index)
    }

    pub fn last_index(&self) -> Option<u64> {
        self.last_raw.map(|raw| self.logical(self.wraps, raw))
    }

    pub fn wraps(&self) -> u64 {
        self.wraps
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    fn logical(&self, wraps: u64, raw: u16) -> u64 {
        wraps * COUNTER_SPAN + u64::from(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wrap_continues_the_count() {
        let mut tracker = RolloverTracker::new();
        let indices: Vec<u64> = [65534u16, 65535, 0, 1]
            .iter()
            .map(|&raw| tracker.next(raw).unwrap())
            .collect();
        assert_eq!(indices, vec![65534, 65535, 65536, 65537]);
        assert_eq!(tracker.wraps(), 1);
    }

    #[test]
    fn repeated_number_is_out_of_order() {
        let mut tracker = RolloverTracker::new();
        tracker.next(5).unwrap();
        assert_eq!(
            tracker.next(5),
            Err(NavError::OutOfOrder {
                previous: 5,
                raw: 5
            })
        );
        assert_eq!(tracker.last_index(), Some(5));
        assert_eq!(tracker.next(6), Ok(6));
    }

    #[test]
    fn peek_does_not_commit() {
        let mut tracker = RolloverTracker::new();
        tracker.next(10).unwrap();
        assert_eq!(tracker.peek(3), Ok(65539));
        assert_eq!(tracker.wraps(), 0);
        assert_eq!(tracker.peek(11), Ok(11));
    }

    #[test]
    fn reset_starts_a_new_run() {
        let mut tracker = RolloverTracker::new();
        tracker.next(100).unwrap();
        tracker.next(2).unwrap();
        tracker.reset();
        assert_eq!(tracker.last_index(), None);
        assert_eq!(tracker.next(2), Ok(2));
    }
}
