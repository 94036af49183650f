//! Clustering of raw sliding-window hits into final detections.

use crate::shared::detection::Detection;

/// Merges overlapping hits.
///
/// Hits are partitioned into classes of mutually similar boxes (transitive
/// closure of edge-wise similarity). Each class is averaged into one box and kept
/// when it has more than `min_neighbors` members. A surviving box that
/// lies inside a stronger one (grown by `eps` of its size) is dropped.
/// `min_neighbors == 0` returns the hits untouched.
pub fn group_rectangles(hits: Vec<Detection>, min_neighbors: u32, eps: f64) -> Vec<Detection> {
    if min_neighbors == 0 || hits.is_empty() {
        return hits;
    }

    let (labels, n_classes) = partition(&hits, eps);

    let mut sums = vec![[0i64; 4]; n_classes];
    let mut counts = vec![0u32; n_classes];
    for (hit, &label) in hits.iter().zip(&labels) {
        let s = &mut sums[label];
        s[0] += i64::from(hit.x);
        s[1] += i64::from(hit.y);
        s[2] += i64::from(hit.width);
        s[3] += i64::from(hit.height);
        counts[label] += 1;
    }

    let averaged: Vec<Detection> = sums
        .iter()
        .zip(&counts)
        .map(|(s, &n)| {
            let avg = |v: i64| (v as f64 / f64::from(n)).round() as i32;
            Detection::new(avg(s[0]), avg(s[1]), avg(s[2]), avg(s[3]))
        })
        .collect();

    let mut grouped = Vec::new();
    for (i, r1) in averaged.iter().enumerate() {
        let n1 = counts[i];
        if n1 <= min_neighbors {
            continue;
        }

        let swallowed = averaged.iter().enumerate().any(|(j, r2)| {
            let n2 = counts[j];
            if j == i || n2 <= min_neighbors {
                return false;
            }
            let dx = (f64::from(r2.width) * eps).round() as i32;
            let dy = (f64::from(r2.height) * eps).round() as i32;
            r1.lies_within(r2, dx, dy) && (n2 > n1.max(3) || n1 < 3)
        });

        if !swallowed {
            grouped.push(*r1);
        }
    }
    grouped
}

/// Two boxes are similar when every edge is within `eps` of their mean
/// smaller side.
fn similar(a: &Detection, b: &Detection, eps: f64) -> bool {
    let delta = eps * f64::from(a.width.min(b.width) + a.height.min(b.height)) * 0.5;
    let close = |p: i32, q: i32| f64::from((p - q).abs()) <= delta;
    close(a.x, b.x)
        && close(a.y, b.y)
        && close(a.right(), b.right())
        && close(a.bottom(), b.bottom())
}

/// Union-find partition. Returns a class label per hit, numbered in order
/// of first appearance, and the number of classes.
fn partition(hits: &[Detection], eps: f64) -> (Vec<usize>, usize) {
    fn root(parent: &mut [usize], mut i: usize) -> usize {
        while parent[i] != i {
            parent[i] = parent[parent[i]];
            i = parent[i];
        }
        i
    }

    let n = hits.len();
    let mut parent: Vec<usize> = (0..n).collect();
    for i in 0..n {
        for j in (i + 1)..n {
            if similar(&hits[i], &hits[j], eps) {
                let (a, b) = (root(&mut parent, i), root(&mut parent, j));
                if a != b {
                    parent[b] = a;
                }
            }
        }
    }

    let mut class_of_root = vec![usize::MAX; n];
    let mut labels = Vec::with_capacity(n);
    let mut n_classes = 0;
    for i in 0..n {
        let r = root(&mut parent, i);
        if class_of_root[r] == usize::MAX {
            class_of_root[r] = n_classes;
            n_classes += 1;
        }
        labels.push(class_of_root[r]);
    }
    (labels, n_classes)
}
