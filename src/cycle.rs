//! Endless walk over the imported images, in file order or shuffled once.

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

/// How the display order is chosen when a session is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ImageOrder {
    Sequential,
    #[default]
    Shuffled,
    /// Shuffled with a fixed seed, for repeatable runs.
    Seeded(u64),
}

/// A circular cursor over image indices.
///
/// The order is fixed at construction; [`ImageCycle::advance`] wraps back to
/// the first entry after the last one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ImageCycle {
    order: Vec<usize>,
    /// Position in `order` of the last image handed out.
    last_used: Option<usize>,
}

impl ImageCycle {
    #[must_use]
    pub fn new(len: usize, order: ImageOrder) -> Self {
        match order {
            ImageOrder::Sequential => Self::sequential(len),
            ImageOrder::Shuffled => Self::shuffled(len, None),
            ImageOrder::Seeded(seed) => Self::shuffled(len, Some(seed)),
        }
    }

    /// Visit `len` images in their natural order.
    #[must_use]
    pub fn sequential(len: usize) -> Self {
        Self {
            order: (0..len).collect(),
            last_used: None,
        }
    }

    /// Visit `len` images in a random order; a fixed `seed` repeats it.
    #[must_use]
    pub fn shuffled(len: usize, seed: Option<u64>) -> Self {
        let mut rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        let mut order: Vec<usize> = (0..len).collect();
        order.shuffle(&mut rng);
        Self {
            order,
            last_used: None,
        }
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.order.len()
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Position of the last image handed out, `None` before the first one.
    #[must_use]
    pub const fn last_used(&self) -> Option<usize> {
        self.last_used
    }

    /// Step to the next position, wrapping at the end, and return the image
    /// index stored there.
    pub fn advance(&mut self) -> Option<usize> {
        if self.order.is_empty() {
            return None;
        }
        let next = self.last_used.map_or(0, |i| (i + 1) % self.order.len());
        self.last_used = Some(next);
        Some(self.order[next])
    }

    /// Image index stored at `position`.
    #[must_use]
    pub fn image_at(&self, position: usize) -> Option<usize> {
        self.order.get(position).copied()
    }

    /// Forget the position so the next [`advance`](Self::advance) starts over.
    pub const fn reset(&mut self) {
        self.last_used = None;
    }

    #[must_use]
    pub fn as_slice(&self) -> &[usize] {
        &self.order
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequential_wraps() {
        let mut cycle = ImageCycle::sequential(3);
        let seen: Vec<_> = (0..5).map(|_| cycle.advance().unwrap()).collect();
        assert_eq!(seen, vec![0, 1, 2, 0, 1]);
        assert_eq!(cycle.last_used(), Some(1));
        cycle.reset();
        assert_eq!(cycle.advance(), Some(0));
    }

    #[test]
    fn shuffle_is_a_permutation_and_seed_repeats() {
        let a = ImageCycle::shuffled(50, Some(7));
        let b = ImageCycle::shuffled(50, Some(7));
        assert_eq!(a, b);
        let mut sorted = a.as_slice().to_vec();
        sorted.sort_unstable();
        assert_eq!(sorted, (0..50).collect::<Vec<_>>());
    }

    #[test]
    fn empty_cycle_yields_nothing() {
        let mut cycle = ImageCycle::shuffled(0, None);
        assert!(cycle.is_empty());
        assert_eq!(cycle.advance(), None);
        assert_eq!(cycle.last_used(), None);
    }
}
