//! Missing-aware column statistics.
//!
//! Every function takes the present values of one column; missing cells are
//! excluded before the call. Empty input yields `None`. Moments and ranks
//! come from `statrs`, order statistics from polars.

use polars::prelude::{
    ChunkQuantile, Float64Chunked, NamedFrom, NewChunkedArray, PolarsResult, QuantileMethod,
    Series,
};
use statrs::statistics::{Data, OrderStatistics, RankTieBreaker, Statistics};

/// Present values of a column, in row order.
pub fn present(values: &[Option<f64>]) -> Vec<f64> {
    values.iter().filter_map(|value| *value).collect()
}

/// `statrs` reports undefined statistics as NaN.
fn defined(value: f64) -> Option<f64> {
    (!value.is_nan()).then_some(value)
}

fn chunked(values: &[f64]) -> Float64Chunked {
    Float64Chunked::from_slice("values".into(), values)
}

pub fn mean(values: &[f64]) -> Option<f64> {
    defined(Statistics::mean(values.iter()))
}

pub fn median(values: &[f64]) -> Option<f64> {
    chunked(values).median()
}

pub fn min(values: &[f64]) -> Option<f64> {
    defined(Statistics::min(values.iter()))
}

/// Standard deviation with `n` in the denominator.
pub fn population_std(values: &[f64]) -> Option<f64> {
    defined(Statistics::population_std_dev(values.iter()))
}

/// Standard deviation with `n - 1` in the denominator; needs two values.
pub fn sample_std(values: &[f64]) -> Option<f64> {
    defined(Statistics::std_dev(values.iter()))
}

/// Quantile with linear interpolation between closest ranks.
pub fn quantile(values: &[f64], q: f64) -> PolarsResult<Option<f64>> {
    chunked(values).quantile(q, QuantileMethod::Linear)
}

/// Number of distinct values; `-0.0` and `0.0` count once.
pub fn distinct_count(values: &[f64]) -> PolarsResult<usize> {
    let canonical: Vec<f64> = values.iter().map(|value| value + 0.0).collect();
    Series::new("values".into(), canonical).n_unique()
}

/// Ranks present values from 1, averaging ties; missing stays missing.
pub fn average_ranks(values: &[Option<f64>]) -> Vec<Option<f64>> {
    let mut ranks = Data::new(present(values))
        .ranks(RankTieBreaker::Average)
        .into_iter();
    values
        .iter()
        .map(|value| value.and_then(|_| ranks.next()))
        .collect()
}
