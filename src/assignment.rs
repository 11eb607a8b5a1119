use ndarray::{Array2, ArrayView2};

/// Maximum-weight one-to-one matching between the rows and columns of
/// `weights`.
///
/// Returns `min(n, m)` `(row, col)` pairs sorted by row. Every row (or every
/// column, whichever side is smaller) is matched exactly once.
///
/// Hungarian algorithm with row/column potentials, O(n^2 m) for n <= m.
pub fn max_weight_assignment(weights: ArrayView2<'_, f64>) -> Vec<(usize, usize)> {
    let (n, m) = weights.dim();
    if n == 0 || m == 0 {
        return Vec::new();
    }

    if n > m {
        let mut pairs: Vec<(usize, usize)> = min_cost_rows(&weights.t().mapv(|w| -w))
            .into_iter()
            .map(|(col, row)| (row, col))
            .collect();
        pairs.sort_unstable();
        return pairs;
    }

    let mut pairs = min_cost_rows(&weights.mapv(|w| -w));
    pairs.sort_unstable();
    pairs
}

/// Minimum-cost assignment of every row of `cost` (rows <= cols).
fn min_cost_rows(cost: &Array2<f64>) -> Vec<(usize, usize)> {
    let (n, m) = cost.dim();

    // 1-based bookkeeping; slot 0 is the virtual column.
    let mut u = vec![0.0_f64; n + 1];
    let mut v = vec![0.0_f64; m + 1];
    let mut owner = vec![0_usize; m + 1];
    let mut way = vec![0_usize; m + 1];

    for i in 1..=n {
        owner[0] = i;
        let mut j0 = 0;
        let mut min_slack = vec![f64::INFINITY; m + 1];
        let mut used = vec![false; m + 1];

        loop {
            used[j0] = true;
            let i0 = owner[j0];
            let mut delta = f64::INFINITY;
            let mut j1 = 0;

            for j in 1..=m {
                if used[j] {
                    continue;
                }
                let slack = cost[[i0 - 1, j - 1]] - u[i0] - v[j];
                if slack < min_slack[j] {
                    min_slack[j] = slack;
                    way[j] = j0;
                }
                if min_slack[j] < delta {
                    delta = min_slack[j];
                    j1 = j;
                }
            }

            for j in 0..=m {
                if used[j] {
                    u[owner[j]] += delta;
                    v[j] -= delta;
                } else {
                    min_slack[j] -= delta;
                }
            }

            j0 = j1;
            if owner[j0] == 0 {
                break;
            }
        }

        // augment along the alternating path
        loop {
            let j1 = way[j0];
            owner[j0] = owner[j1];
            j0 = j1;
            if j0 == 0 {
                break;
            }
        }
    }

    (1..=m)
        .filter(|&j| owner[j] != 0)
        .map(|j| (owner[j] - 1, j - 1))
        .collect()
}
