//! Quadrature decoding into a signed pulse count.

/// Cumulative encoder position in pulses since the last reset.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PulseCounter {
    phi: i64,
}

impl PulseCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rising edge on the leading channel. The lagging channel being high
    /// means the shaft turns backwards.
    #[inline]
    pub fn on_edge(&mut self, lagging_high: bool) {
        if lagging_high {
            self.phi = self.phi.saturating_sub(1);
        } else {
            self.phi = self.phi.saturating_add(1);
        }
    }

    #[inline]
    pub fn value(&self) -> i64 {
        self.phi
    }

    pub fn reset(&mut self) {
        self.phi = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_both_directions() {
        let mut c = PulseCounter::new();
        for _ in 0..5 {
            c.on_edge(false);
        }
        for _ in 0..2 {
            c.on_edge(true);
        }
        assert_eq!(c.value(), 3);
        for _ in 0..10 {
            c.on_edge(true);
        }
        assert_eq!(c.value(), -7);
        c.reset();
        assert_eq!(c.value(), 0);
    }
}
