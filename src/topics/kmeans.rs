// K-means clustering of post embeddings.
//
// k-means++ seeding driven by a seeded ChaCha RNG, followed by Lloyd
// iterations. For the same vectors, k and seed the partition is identical on
// every run and every platform.
//
// Validation is fail-fast: empty input, k = 0 and k greater than the number
// of vectors are all rejected instead of producing degenerate clusters.

use std::fmt;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::{debug, info};

use crate::error::{PipelineError, PipelineResult};

use super::Embedding;

/// Human-readable cluster label: zero-based index `i` renders as `C{i+1}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClusterLabel(pub usize);

impl ClusterLabel {
    pub fn index(&self) -> usize {
        self.0
    }
}

impl fmt::Display for ClusterLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "C{}", self.0 + 1)
    }
}

/// Parameters for a clustering run.
#[derive(Debug, Clone)]
pub struct KMeansConfig {
    /// Number of clusters
    pub k: usize,
    /// Seed for centroid initialization
    pub seed: u64,
    /// Upper bound on Lloyd iterations per initialization
    pub max_iterations: usize,
    /// Stop once no centroid moves farther than this
    pub tolerance: f64,
    /// Number of independent initializations; the lowest inertia wins
    pub n_init: usize,
}

impl Default for KMeansConfig {
    fn default() -> Self {
        Self {
            k: 5,
            seed: 42,
            max_iterations: 300,
            tolerance: 1e-4,
            n_init: 1,
        }
    }
}

impl KMeansConfig {
    pub fn new(k: usize, seed: u64) -> Self {
        Self {
            k,
            seed,
            ..Default::default()
        }
    }

    /// Check the parameters independently of the data.
    pub fn validate(&self) -> PipelineResult<()> {
        if self.k == 0 {
            return Err(PipelineError::misconfiguration("number of clusters must be >= 1"));
        }
        if self.max_iterations == 0 {
            return Err(PipelineError::misconfiguration("max_iterations must be >= 1"));
        }
        if self.n_init == 0 {
            return Err(PipelineError::misconfiguration("n_init must be >= 1"));
        }
        if !self.tolerance.is_finite() || self.tolerance < 0.0 {
            return Err(PipelineError::misconfiguration(
                "tolerance must be a finite, non-negative number",
            ));
        }
        Ok(())
    }
}

/// Result of a clustering run.
#[derive(Debug, Clone, PartialEq)]
pub struct Clustering {
    /// Cluster index per input vector, in input order
    pub assignments: Vec<usize>,
    pub centroids: Vec<Embedding>,
    /// Within-cluster sum of squared distances
    pub inertia: f64,
    pub iterations: usize,
    pub converged: bool,
}

impl Clustering {
    /// Label per input vector, in input order.
    pub fn labels(&self) -> Vec<ClusterLabel> {
        self.assignments.iter().map(|&i| ClusterLabel(i)).collect()
    }

    /// Number of vectors per cluster, indexed by cluster.
    pub fn sizes(&self) -> Vec<usize> {
        let mut sizes = vec![0; self.centroids.len()];
        for &a in &self.assignments {
            sizes[a] += 1;
        }
        sizes
    }

    pub fn k(&self) -> usize {
        self.centroids.len()
    }
}

/// Partitions embedding vectors into a fixed number of clusters.
#[derive(Debug, Clone, Default)]
pub struct ClusterEngine {
    config: KMeansConfig,
}

impl ClusterEngine {
    pub fn new(config: KMeansConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &KMeansConfig {
        &self.config
    }

    /// Cluster `vectors` and return the full result.
    pub fn fit(&self, vectors: &[Embedding]) -> PipelineResult<Clustering> {
        self.config.validate()?;
        let k = self.config.k;
        let dim = validate_vectors(vectors)?;

        if k > vectors.len() {
            return Err(PipelineError::misconfiguration(format!(
                "number of clusters ({k}) exceeds the number of records ({})",
                vectors.len()
            )));
        }

        info!(
            records = vectors.len(),
            dim,
            k,
            seed = self.config.seed,
            "Clustering embeddings"
        );

        let mut rng = ChaCha8Rng::seed_from_u64(self.config.seed);
        let mut best: Option<Clustering> = None;

        for run in 0..self.config.n_init {
            let initial = kmeans_plus_plus(vectors, k, &mut rng);
            let result = lloyd(vectors, initial, &self.config);
            debug!(
                run,
                inertia = result.inertia,
                iterations = result.iterations,
                converged = result.converged,
                "k-means initialization finished"
            );
            if best.as_ref().map_or(true, |b| result.inertia < b.inertia) {
                best = Some(result);
            }
        }

        let best = best.ok_or_else(|| PipelineError::misconfiguration("no k-means run executed"))?;
        info!(
            inertia = best.inertia,
            iterations = best.iterations,
            converged = best.converged,
            "Clustering complete"
        );
        Ok(best)
    }

    /// Cluster `vectors` and return one label per vector.
    pub fn cluster(&self, vectors: &[Embedding]) -> PipelineResult<Vec<ClusterLabel>> {
        Ok(self.fit(vectors)?.labels())
    }
}

/// Ensure the vectors are non-empty, equally sized and finite. Returns the
/// dimension.
fn validate_vectors(vectors: &[Embedding]) -> PipelineResult<usize> {
    let first = vectors
        .first()
        .ok_or_else(|| PipelineError::misconfiguration("cannot cluster an empty set of vectors"))?;
    let dim = first.len();
    if dim == 0 {
        return Err(PipelineError::invalid_input("embedding vectors have dimension 0"));
    }

    for (i, v) in vectors.iter().enumerate() {
        if v.len() != dim {
            return Err(PipelineError::invalid_input(format!(
                "vector {i} has dimension {}, expected {dim}",
                v.len()
            )));
        }
        if v.iter().any(|x| !x.is_finite()) {
            return Err(PipelineError::invalid_input(format!(
                "vector {i} contains a non-finite value"
            )));
        }
    }
    Ok(dim)
}

#[inline]
fn squared_distance(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}

/// Index and squared distance of the nearest centroid. Ties go to the lower
/// index.
fn nearest(vector: &[f64], centroids: &[Embedding]) -> (usize, f64) {
    let mut best = (0, f64::INFINITY);
    for (j, c) in centroids.iter().enumerate() {
        let d = squared_distance(vector, c);
        if d < best.1 {
            best = (j, d);
        }
    }
    best
}

/// k-means++ seeding: first centroid uniform, the rest sampled with
/// probability proportional to squared distance from the nearest chosen
/// centroid.
fn kmeans_plus_plus(vectors: &[Embedding], k: usize, rng: &mut ChaCha8Rng) -> Vec<Embedding> {
    let n = vectors.len();
    let mut chosen = Vec::with_capacity(k);
    chosen.push(rng.random_range(0..n));

    let mut min_dist: Vec<f64> = vectors
        .iter()
        .map(|v| squared_distance(v, &vectors[chosen[0]]))
        .collect();

    while chosen.len() < k {
        let total: f64 = min_dist.iter().sum();
        let next = if total > 0.0 {
            let target = rng.random::<f64>() * total;
            let mut acc = 0.0;
            let mut pick = None;
            for (i, &d) in min_dist.iter().enumerate() {
                acc += d;
                if d > 0.0 && acc >= target {
                    pick = Some(i);
                    break;
                }
            }
            // Rounding can leave target just above the final sum.
            pick.or_else(|| min_dist.iter().rposition(|&d| d > 0.0))
                .unwrap_or(0)
        } else {
            // Every remaining point coincides with a centroid; take the first
            // index not used yet so the k seeds stay distinct records.
            (0..n).find(|i| !chosen.contains(i)).unwrap_or(0)
        };

        chosen.push(next);
        for (i, v) in vectors.iter().enumerate() {
            let d = squared_distance(v, &vectors[next]);
            if d < min_dist[i] {
                min_dist[i] = d;
            }
        }
    }

    chosen.into_iter().map(|i| vectors[i].clone()).collect()
}

/// Lloyd iterations from the given initial centroids.
fn lloyd(vectors: &[Embedding], mut centroids: Vec<Embedding>, config: &KMeansConfig) -> Clustering {
    let k = centroids.len();
    let dim = centroids[0].len();
    let mut assignments = vec![usize::MAX; vectors.len()];
    let mut iterations = 0;
    let mut converged = false;

    for iter in 0..config.max_iterations {
        iterations = iter + 1;

        // Assignment step
        let mut changed = false;
        let mut distances = vec![0.0; vectors.len()];
        for (i, v) in vectors.iter().enumerate() {
            let (j, d) = nearest(v, &centroids);
            if assignments[i] != j {
                assignments[i] = j;
                changed = true;
            }
            distances[i] = d;
        }

        // Update step
        let mut sums = vec![vec![0.0; dim]; k];
        let mut counts = vec![0usize; k];
        for (v, &a) in vectors.iter().zip(&assignments) {
            counts[a] += 1;
            for (s, x) in sums[a].iter_mut().zip(v) {
                *s += x;
            }
        }

        let mut new_centroids: Vec<Embedding> = sums
            .into_iter()
            .zip(&counts)
            .map(|(sum, &count)| {
                if count > 0 {
                    sum.into_iter().map(|s| s / count as f64).collect()
                } else {
                    Vec::new()
                }
            })
            .collect();

        // Empty clusters take the point farthest from its centroid.
        for j in 0..k {
            if counts[j] == 0 {
                let far = farthest_point(&distances);
                new_centroids[j] = vectors[far].clone();
                distances[far] = 0.0;
                changed = true;
            }
        }

        let max_shift = centroids
            .iter()
            .zip(&new_centroids)
            .map(|(old, new)| squared_distance(old, new).sqrt())
            .fold(0.0, f64::max);
        centroids = new_centroids;

        if !changed || max_shift <= config.tolerance {
            converged = true;
            break;
        }
    }

    // Final assignment against the last centroids, so labels and inertia
    // agree with the returned centroids.
    let mut inertia = 0.0;
    for (i, v) in vectors.iter().enumerate() {
        let (j, d) = nearest(v, &centroids);
        assignments[i] = j;
        inertia += d;
    }

    Clustering {
        assignments,
        centroids,
        inertia,
        iterations,
        converged,
    }
}

fn farthest_point(distances: &[f64]) -> usize {
    let mut best = (0, f64::NEG_INFINITY);
    for (i, &d) in distances.iter().enumerate() {
        if d > best.1 {
            best = (i, d);
        }
    }
    best.0
}
