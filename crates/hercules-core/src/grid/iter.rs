use super::{Dataset, GridHit};
use crate::domain::HerculesErrorKind;
use tracing::trace;

/// Mixed-radix odometer over the full Cartesian product of a dataset's
/// axes. Combinations without a run are skipped.
///
/// Each iterator owns its cursor, so any number of them can walk the same
/// dataset independently.
#[derive(Debug, Clone)]
pub struct GridEntries<'a> {
    dataset: &'a Dataset,
    shape: Vec<usize>,
    cursor: Vec<usize>,
    exhausted: bool,
}

impl<'a> GridEntries<'a> {
    pub(super) fn new(dataset: &'a Dataset) -> Self {
        let shape = dataset.shape();
        let exhausted = shape.is_empty() || shape.contains(&0);
        Self {
            dataset,
            cursor: vec![0; shape.len()],
            shape,
            exhausted,
        }
    }

    /// Increments the last position and carries towards the first; wrapping
    /// past the first field ends the cycle.
    fn advance(&mut self) {
        for (position, extent) in self.cursor.iter_mut().zip(&self.shape).rev() {
            *position += 1;
            if *position < *extent {
                return;
            }
            *position = 0;
        }
        self.exhausted = true;
    }
}

impl Iterator for GridEntries<'_> {
    type Item = GridHit;

    fn next(&mut self) -> Option<Self::Item> {
        while !self.exhausted {
            let positions = self.cursor.clone();
            self.advance();
            match self.dataset.lookup_index(&positions) {
                Ok(hit) => return Some(hit),
                Err(error) if error.kind() == HerculesErrorKind::NotFound => {
                    trace!(?positions, "skipping grid point without a run");
                }
                Err(error) => {
                    trace!(?positions, %error, "skipping unresolvable grid point");
                }
            }
        }
        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        if self.exhausted {
            (0, Some(0))
        } else {
            (0, Some(self.dataset.len()))
        }
    }
}

impl std::iter::FusedIterator for GridEntries<'_> {}
