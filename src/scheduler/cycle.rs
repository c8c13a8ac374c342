//! Round-robin helpers for the fortune loop.

use std::path::{Path, PathBuf};

use rand::Rng;
use rand::seq::SliceRandom;
use tracing::info;

/// Visits every category once per cycle, reshuffling only when a cycle
/// completes.
#[derive(Debug, Clone)]
pub struct CategoryCycle {
    names: Vec<String>,
    position: usize,
}

impl CategoryCycle {
    pub fn new(names: Vec<String>) -> Self {
        Self { names, position: 0 }
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Next category name, or None when there are no categories.
    pub fn next<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Option<String> {
        if self.names.is_empty() {
            return None;
        }
        if self.position == 0 {
            self.names.shuffle(rng);
        }
        let name = self.names[self.position].clone();
        self.position = (self.position + 1) % self.names.len();
        Some(name)
    }
}

/// Sequential `{n}.jpg` images in a directory, starting at 1 and wrapping
/// back to 1 when the expected file is missing.
#[derive(Debug, Clone)]
pub struct ImageRotation {
    dir: PathBuf,
    next: usize,
}

impl ImageRotation {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            next: 1,
        }
    }

    fn path_for(&self, index: usize) -> PathBuf {
        self.dir.join(format!("{index}.jpg"))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Return the current image and advance the pointer. None when the
    /// directory has no `1.jpg`.
    pub fn advance(&mut self) -> Option<PathBuf> {
        let mut path = self.path_for(self.next);
        if !path.exists() {
            if self.next != 1 {
                info!("Image {}.jpg not found, resetting to 1.jpg", self.next);
            }
            self.next = 1;
            path = self.path_for(1);
            if !path.exists() {
                return None;
            }
        }
        self.next += 1;
        Some(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use std::collections::HashSet;

    fn names(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("Quark{i}")).collect()
    }

    #[test]
    fn test_each_category_once_per_cycle() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut cycle = CategoryCycle::new(names(16));

        for _ in 0..3 {
            let picked: HashSet<String> = (0..16).map(|_| cycle.next(&mut rng).unwrap()).collect();
            assert_eq!(picked.len(), 16);
        }
    }

    #[test]
    fn test_order_reshuffled_between_cycles() {
        let mut rng = StdRng::seed_from_u64(42);
        let mut cycle = CategoryCycle::new(names(16));

        let first: Vec<String> = (0..16).map(|_| cycle.next(&mut rng).unwrap()).collect();
        let later: Vec<Vec<String>> = (0..4)
            .map(|_| (0..16).map(|_| cycle.next(&mut rng).unwrap()).collect())
            .collect();
        // 16! orderings; identical repeats across four cycles would mean no reshuffle
        assert!(later.iter().any(|order| *order != first));
    }

    #[test]
    fn test_no_reshuffle_mid_cycle() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut cycle = CategoryCycle::new(names(4));
        let a = cycle.next(&mut rng).unwrap();
        let snapshot = cycle.names.clone();
        let b = cycle.next(&mut rng).unwrap();
        assert_eq!(cycle.names, snapshot);
        assert_ne!(a, b);
    }

    #[test]
    fn test_empty_cycle() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut cycle = CategoryCycle::new(vec![]);
        assert!(cycle.next(&mut rng).is_none());
    }

    #[test]
    fn test_images_wrap_modulo_count() {
        let dir = tempfile::tempdir().unwrap();
        for i in 1..=3 {
            std::fs::write(dir.path().join(format!("{i}.jpg")), b"jpg").unwrap();
        }
        let mut images = ImageRotation::new(dir.path());

        let seen: Vec<String> = (0..7)
            .map(|_| {
                images
                    .advance()
                    .unwrap()
                    .file_name()
                    .unwrap()
                    .to_string_lossy()
                    .into_owned()
            })
            .collect();
        assert_eq!(seen, ["1.jpg", "2.jpg", "3.jpg", "1.jpg", "2.jpg", "3.jpg", "1.jpg"]);
    }

    #[test]
    fn test_no_images() {
        let dir = tempfile::tempdir().unwrap();
        let mut images = ImageRotation::new(dir.path());
        assert!(images.advance().is_none());
        assert!(images.advance().is_none());
    }
}
