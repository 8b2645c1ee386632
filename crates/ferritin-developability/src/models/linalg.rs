//! Small dense linear algebra on `ndarray` matrices.
//!
//! Only what PCA and ridge need: a symmetric eigendecomposition (delegated to
//! `nalgebra`) and the principal axes of a centred data matrix.
use nalgebra::{DMatrix, SymmetricEigen};
use ndarray::{Array1, Array2};

/// Eigen-decomposition of a symmetric matrix.
///
/// Returns eigenvalues in descending order and the matching unit eigenvectors
/// as the columns of the second matrix. Only the upper triangle of `matrix`
/// needs to be meaningful; it is mirrored before decomposing.
pub fn symmetric_eigen(matrix: &Array2<f64>) -> (Array1<f64>, Array2<f64>) {
    let n = matrix.nrows();
    if n == 0 {
        return (Array1::zeros(0), Array2::zeros((0, 0)));
    }
    let symmetric = DMatrix::from_fn(n, n, |i, j| matrix[[i.min(j), i.max(j)]]);
    let eigen = SymmetricEigen::new(symmetric);

    // nalgebra does not order its eigenvalues
    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&i, &j| eigen.eigenvalues[j].total_cmp(&eigen.eigenvalues[i]));
    let eigenvalues = order.iter().map(|&i| eigen.eigenvalues[i]).collect();
    let eigenvectors =
        Array2::from_shape_fn((n, n), |(row, col)| eigen.eigenvectors[(row, order[col])]);
    (eigenvalues, eigenvectors)
}

/// Principal axes of a column-centred `n x p` matrix.
#[derive(Debug, Clone)]
pub struct PrincipalAxes {
    /// Eigenvalues of `ZᵀZ`, descending and strictly positive.
    pub eigenvalues: Vec<f64>,
    /// Unit directions, one per row (`k x p`).
    pub directions: Array2<f64>,
    /// Sum of all eigenvalues of `ZᵀZ` (the total sum of squares).
    pub total: f64,
}

/// Computes at most `max_axes` principal axes of `z`.
///
/// The eigenproblem is solved on whichever of `ZᵀZ` (p x p) and `ZZᵀ` (n x n)
/// is smaller. Eigenvalues at or below `1e-10` of the largest one are dropped,
/// so the result never has more axes than the numerical rank of `z`. Each
/// direction is sign-fixed so its largest-magnitude loading is positive.
pub fn principal_axes(z: &Array2<f64>, max_axes: usize) -> PrincipalAxes {
    let (n, p) = z.dim();
    let total = z.iter().map(|x| x * x).sum::<f64>();
    if n == 0 || p == 0 || max_axes == 0 {
        return PrincipalAxes {
            eigenvalues: Vec::new(),
            directions: Array2::zeros((0, p)),
            total,
        };
    }

    let (eigenvalues, vectors) = if p <= n {
        symmetric_eigen(&z.t().dot(z))
    } else {
        symmetric_eigen(&z.dot(&z.t()))
    };
    let largest = eigenvalues.first().copied().unwrap_or(0.0);
    let kept: Vec<usize> = eigenvalues
        .iter()
        .enumerate()
        .take_while(|&(_, &lambda)| largest > 0.0 && lambda > 1e-10 * largest)
        .map(|(j, _)| j)
        .take(max_axes)
        .collect();

    let mut directions = Array2::zeros((kept.len(), p));
    for (row, &j) in kept.iter().enumerate() {
        let mut direction = if p <= n {
            vectors.column(j).to_owned()
        } else {
            // v = Zᵀu / sqrt(λ)
            z.t().dot(&vectors.column(j)) / eigenvalues[j].sqrt()
        };
        let norm = direction.dot(&direction).sqrt();
        if norm > 0.0 {
            direction /= norm;
        }
        let pivot = direction
            .iter()
            .copied()
            .fold(0.0_f64, |best, x| if x.abs() > best.abs() { x } else { best });
        if pivot < 0.0 {
            direction.mapv_inplace(|x| -x);
        }
        directions.row_mut(row).assign(&direction);
    }

    PrincipalAxes {
        eigenvalues: kept.iter().map(|&j| eigenvalues[j]).collect(),
        directions,
        total,
    }
}
