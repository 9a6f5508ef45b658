/// How a heap's backing store grows once it is full.
///
/// Given the current capacity `cap`, the next capacity is
///
/// ```text
/// cap * (1 + factor) / (1 + ratio) + increment
/// ```
///
/// and if that does not exceed `cap` (for example with all three parameters at zero),
/// `cap + 1` is used instead so that growth always makes progress. Use
/// [`stalls_at`](Self::stalls_at) to detect parameters that rely on that fallback.
///
/// # Examples
///
/// ```
/// use binheap::GrowthPolicy;
///
/// assert_eq!(GrowthPolicy::DOUBLING.next_capacity(10), Some(20));
/// assert_eq!(GrowthPolicy::new(0, 0, 16).next_capacity(10), Some(26));
/// assert_eq!(GrowthPolicy::new(0, 0, 0).next_capacity(10), Some(11));
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct GrowthPolicy {
    /// Multiplies the capacity by `1 + factor`.
    pub factor: usize,
    /// Divides the scaled capacity by `1 + ratio`.
    pub ratio: usize,
    /// Added after scaling.
    pub increment: usize,
}

impl GrowthPolicy {
    /// Doubles the capacity on every growth.
    pub const DOUBLING: GrowthPolicy = GrowthPolicy::new(1, 0, 0);

    /// Creates a growth policy from its three parameters.
    #[must_use]
    pub const fn new(factor: usize, ratio: usize, increment: usize) -> Self {
        GrowthPolicy { factor, ratio, increment }
    }

    /// Returns the capacity that follows `capacity`, or `None` if it cannot be represented.
    #[must_use]
    pub fn next_capacity(&self, capacity: usize) -> Option<usize> {
        match self.formula(capacity)? {
            grown if grown > capacity => Some(grown),
            _ => capacity.checked_add(1),
        }
    }

    /// Returns `true` if the formula alone would not grow `capacity`, so that
    /// [`next_capacity`](Self::next_capacity) falls back to `capacity + 1`.
    #[must_use]
    pub fn stalls_at(&self, capacity: usize) -> bool {
        matches!(self.formula(capacity), Some(grown) if grown <= capacity)
    }

    fn formula(&self, capacity: usize) -> Option<usize> {
        // `1 + factor` and `1 + ratio` may themselves wrap; both cases are exact.
        let scaled = if capacity == 0 {
            0
        } else {
            capacity.checked_mul(self.factor.checked_add(1)?)?
        };
        let scaled = match self.ratio.checked_add(1) {
            Some(divisor) => scaled / divisor,
            None => 0,
        };
        scaled.checked_add(self.increment)
    }
}

impl Default for GrowthPolicy {
    /// Returns [`GrowthPolicy::DOUBLING`].
    fn default() -> Self {
        GrowthPolicy::DOUBLING
    }
}
