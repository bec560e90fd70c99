//! Borrowed views over recorded samples.

/// One recorded sample: the simulated time and the port value at that time.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Sample<'a> {
    /// Simulated time the sample was taken at.
    pub time: f64,
    /// The port value; scalars are a one-element slice.
    pub values: &'a [f64],
}

impl Sample<'_> {
    /// The value of a scalar port, or `None` for vectors.
    pub fn scalar(&self) -> Option<f64> {
        match self.values {
            [x] => Some(*x),
            _ => None,
        }
    }
}

/// The samples recorded for one port, in time order.
///
/// A `Series` is a cheap `Copy` view. Each call to [`iter`](Self::iter)
/// starts again from the first sample, so the sequence can be walked any
/// number of times.
#[derive(Clone, Copy, Debug)]
pub struct Series<'a> {
    width: usize,
    times: &'a [f64],
    values: &'a [f64],
}

impl<'a> Series<'a> {
    pub(crate) fn new(width: usize, times: &'a [f64], values: &'a [f64]) -> Self {
        debug_assert_eq!(times.len() * width, values.len());
        Self {
            width,
            times,
            values,
        }
    }

    /// Number of samples.
    pub fn len(&self) -> usize {
        self.times.len()
    }

    /// Whether nothing has been recorded yet.
    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    /// Number of `f64` values per sample (1 for scalars).
    pub fn width(&self) -> usize {
        self.width
    }

    /// Sample times.
    pub fn times(&self) -> &'a [f64] {
        self.times
    }

    /// The `i`-th sample.
    pub fn get(&self, i: usize) -> Option<Sample<'a>> {
        let time = *self.times.get(i)?;
        let start = i * self.width;
        Some(Sample {
            time,
            values: &self.values[start..start + self.width],
        })
    }

    /// The most recent sample.
    pub fn last(&self) -> Option<Sample<'a>> {
        self.len().checked_sub(1).and_then(|i| self.get(i))
    }

    /// Walk the samples from the first.
    pub fn iter(&self) -> impl ExactSizeIterator<Item = Sample<'a>> + 'a {
        // chunks_exact panics on zero width.
        let width = self.width.max(1);
        self.times
            .iter()
            .zip(self.values.chunks_exact(width))
            .map(|(&time, values)| Sample { time, values })
    }

    /// The scalar values in time order. Vector samples are skipped.
    pub fn scalars(&self) -> impl Iterator<Item = f64> + 'a {
        self.iter().filter_map(|s| s.scalar())
    }
}

impl<'a> IntoIterator for Series<'a> {
    type Item = Sample<'a>;
    type IntoIter = Box<dyn ExactSizeIterator<Item = Sample<'a>> + 'a>;

    fn into_iter(self) -> Self::IntoIter {
        Box::new(self.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn walks_samples_and_restarts() {
        let times = [0.0, 0.1, 0.2];
        let values = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
        let series = Series::new(2, &times, &values);

        let first: Vec<_> = series.iter().map(|s| s.values.to_vec()).collect();
        let second: Vec<_> = series.iter().map(|s| s.values.to_vec()).collect();
        assert_eq!(first, vec![vec![1.0, 2.0], vec![3.0, 4.0], vec![5.0, 6.0]]);
        assert_eq!(first, second);
        assert_eq!(series.iter().len(), 3);
    }

    #[test]
    fn scalar_accessors() {
        let times = [0.0, 0.5];
        let values = [7.0, 8.0];
        let series = Series::new(1, &times, &values);
        assert_eq!(series.scalars().collect::<Vec<_>>(), vec![7.0, 8.0]);
        assert_eq!(series.last().and_then(|s| s.scalar()), Some(8.0));
        assert_eq!(series.get(2), None);
    }

    #[test]
    fn empty_series() {
        let series = Series::new(3, &[], &[]);
        assert!(series.is_empty());
        assert!(series.last().is_none());
        assert_eq!(series.iter().count(), 0);
    }
}
