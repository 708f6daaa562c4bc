use crate::shared::region::Region;

/// Similarity tolerance used when clustering raw cascade hits.
pub const GROUP_EPS: f64 = 0.2;

/// Clusters overlapping raw detections into final detections.
///
/// Hits are partitioned into equivalence classes of similar rectangles.
/// Each class with more than `min_neighbors` members is averaged into one
/// rectangle; classes lying inside a stronger class are then dropped.
/// With `min_neighbors == 0` the raw hits are returned unchanged.
pub fn group_rectangles(rects: &[Region], min_neighbors: usize, eps: f64) -> Vec<Region> {
    if min_neighbors == 0 || rects.is_empty() {
        return rects.to_vec();
    }

    let (labels, class_count) = partition(rects, |a, b| a.is_similar(b, eps));

    let mut sums = vec![[0i64; 4]; class_count];
    let mut counts = vec![0usize; class_count];
    for (rect, &label) in rects.iter().zip(&labels) {
        let s = &mut sums[label];
        s[0] += rect.x as i64;
        s[1] += rect.y as i64;
        s[2] += rect.width as i64;
        s[3] += rect.height as i64;
        counts[label] += 1;
    }

    let averaged: Vec<Region> = sums
        .iter()
        .zip(&counts)
        .map(|(s, &n)| {
            let inv = 1.0 / n as f64;
            let avg = |v: i64| (v as f64 * inv).round_ties_even() as i32;
            Region::new(avg(s[0]), avg(s[1]), avg(s[2]), avg(s[3]))
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
            j != i
                && n2 > min_neighbors
                && r1.is_inside(r2, eps)
                && (n2 > n1.max(3) || n1 < 3)
        });
        if !swallowed {
            grouped.push(*r1);
        }
    }
    grouped
}

/// Union-find partition; labels are numbered in order of first appearance.
fn partition<F>(items: &[Region], same: F) -> (Vec<usize>, usize)
where
    F: Fn(&Region, &Region) -> bool,
{
    let n = items.len();
    let mut parent: Vec<usize> = (0..n).collect();

    fn root(parent: &mut [usize], mut i: usize) -> usize {
        while parent[i] != i {
            parent[i] = parent[parent[i]];
            i = parent[i];
        }
        i
    }

    for i in 0..n {
        for j in (i + 1)..n {
            if same(&items[i], &items[j]) {
                let ri = root(&mut parent, i);
                let rj = root(&mut parent, j);
                if ri != rj {
                    parent[rj] = ri;
                }
            }
        }
    }

    let mut class_of_root = vec![usize::MAX; n];
    let mut labels = Vec::with_capacity(n);
    let mut classes = 0;
    for i in 0..n {
        let r = root(&mut parent, i);
        if class_of_root[r] == usize::MAX {
            class_of_root[r] = classes;
            classes += 1;
        }
        labels.push(class_of_root[r]);
    }
    (labels, classes)
}
