//! Agglomerative clustering cut at several thresholds, plus Newick trees.

use crate::config::{LinkageMethod, Thresholds, TreeMode};
use crate::data::{format_number, DistanceMatrix};
use crate::error::{ClusterError, Result};
use indexmap::IndexMap;
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::debug;

/// Clusters a distance matrix at every threshold level.
pub trait ClusterService: Send + Sync {
    fn cluster(
        &self,
        matrix_path: &Path,
        thresholds: &Thresholds,
        linkage: LinkageMethod,
        tree_mode: TreeMode,
    ) -> Result<Clustering>;
}

/// One merge of two clusters into a new node.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Merge {
    pub left: usize,
    pub right: usize,
    pub height: f64,
}

/// Binary merge tree over `n` leaves.
///
/// Leaves are nodes `0..n`; the i-th merge creates node `n + i`.
#[derive(Debug, Clone, PartialEq)]
pub struct Dendrogram {
    labels: Vec<String>,
    merges: Vec<Merge>,
}

impl Dendrogram {
    /// Build the tree with Lance-Williams distance updates.
    ///
    /// Ties are broken by the first pair in row-major order.
    pub fn build(matrix: &DistanceMatrix, linkage: LinkageMethod) -> Self {
        let n = matrix.n();
        let mut dist: Vec<Vec<f64>> = (0..n).map(|i| matrix.row(i).to_vec()).collect();
        let mut size = vec![1usize; n];
        let mut node = (0..n).collect::<Vec<usize>>();
        let mut active = vec![true; n];
        let mut merges = Vec::with_capacity(n.saturating_sub(1));

        for step in 0..n.saturating_sub(1) {
            let mut best: Option<(usize, usize, f64)> = None;
            for i in (0..n).filter(|&i| active[i]) {
                for j in ((i + 1)..n).filter(|&j| active[j]) {
                    if best.map_or(true, |(_, _, d)| dist[i][j] < d) {
                        best = Some((i, j, dist[i][j]));
                    }
                }
            }
            let Some((i, j, height)) = best else { break };

            for k in (0..n).filter(|&k| active[k] && k != i && k != j) {
                let updated = match linkage {
                    LinkageMethod::Single => dist[i][k].min(dist[j][k]),
                    LinkageMethod::Complete => dist[i][k].max(dist[j][k]),
                    LinkageMethod::Average => {
                        (size[i] as f64 * dist[i][k] + size[j] as f64 * dist[j][k])
                            / (size[i] + size[j]) as f64
                    }
                };
                dist[i][k] = updated;
                dist[k][i] = updated;
            }

            merges.push(Merge {
                left: node[i],
                right: node[j],
                height,
            });
            size[i] += size[j];
            node[i] = n + step;
            active[j] = false;
        }

        Self {
            labels: matrix.labels().to_vec(),
            merges,
        }
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn merges(&self) -> &[Merge] {
        &self.merges
    }

    /// Flat cluster ids at `threshold`, one per leaf.
    ///
    /// Leaves joined by merges no higher than the threshold share a cluster. Ids are
    /// numbered from 1 in order of first appearance among the leaves.
    pub fn cut(&self, threshold: f64) -> Vec<usize> {
        let n = self.labels.len();
        let mut parent: Vec<usize> = (0..n + self.merges.len()).collect();

        fn find(parent: &mut [usize], mut x: usize) -> usize {
            while parent[x] != x {
                parent[x] = parent[parent[x]];
                x = parent[x];
            }
            x
        }

        for (step, merge) in self.merges.iter().enumerate() {
            if merge.height <= threshold {
                let created = n + step;
                let l = find(&mut parent, merge.left);
                let r = find(&mut parent, merge.right);
                parent[l] = created;
                parent[r] = created;
            }
        }

        let mut ids: HashMap<usize, usize> = HashMap::new();
        (0..n)
            .map(|leaf| {
                let root = find(&mut parent, leaf);
                let next = ids.len() + 1;
                *ids.entry(root).or_insert(next)
            })
            .collect()
    }

    /// Newick text with branch lengths derived from node heights.
    pub fn newick(&self, tree_mode: TreeMode) -> String {
        let n = self.labels.len();
        if n == 1 {
            return format!("{};", newick_label(&self.labels[0]));
        }
        let scale = match tree_mode {
            TreeMode::Patristic => 0.5,
            TreeMode::Cophenetic => 1.0,
        };

        let mut text: Vec<String> = self.labels.iter().map(|l| newick_label(l)).collect();
        let mut height = vec![0.0; n];
        for merge in &self.merges {
            let h = merge.height * scale;
            let left = std::mem::take(&mut text[merge.left]);
            let right = std::mem::take(&mut text[merge.right]);
            text.push(format!(
                "({}:{},{}:{})",
                left,
                format_number(h - height[merge.left]),
                right,
                format_number(h - height[merge.right])
            ));
            height.push(h);
        }
        let root = text.pop().unwrap_or_default();
        format!("{};", root)
    }
}

/// Leaf label, single-quoted when it holds Newick punctuation or whitespace.
fn newick_label(label: &str) -> String {
    let needs_quotes = label.is_empty()
        || label
            .chars()
            .any(|c| c.is_whitespace() || "()[]':;,".contains(c));
    if needs_quotes {
        format!("'{}'", label.replace('\'', "''"))
    } else {
        label.to_string()
    }
}

/// Cluster memberships at every threshold level, plus the tree.
#[derive(Debug, Clone, PartialEq)]
pub struct Clustering {
    /// Level names, `level_1` for the largest threshold.
    pub levels: Vec<String>,
    /// Sample → cluster id per level.
    pub memberships: IndexMap<String, Vec<usize>>,
    pub newick: String,
}

impl Clustering {
    /// Cluster address of every sample: its per-level ids joined by `delimiter`.
    pub fn addresses(&self, delimiter: &str) -> IndexMap<String, String> {
        self.memberships
            .iter()
            .map(|(sample, ids)| {
                let address = ids
                    .iter()
                    .map(|id| id.to_string())
                    .collect::<Vec<_>>()
                    .join(delimiter);
                (sample.clone(), address)
            })
            .collect()
    }

    /// Addresses qualified by their group, as `<group>|<address>`.
    pub fn group_addresses(&self, group: &str, delimiter: &str) -> IndexMap<String, String> {
        self.addresses(delimiter)
            .into_iter()
            .map(|(sample, address)| (sample, format!("{}|{}", group, address)))
            .collect()
    }

    /// Write `id`, the group-qualified `address` and one column per level.
    pub fn write_clusters<P: AsRef<Path>>(&self, path: P, group: &str, delimiter: &str) -> Result<()> {
        let mut writer = BufWriter::new(File::create(path)?);
        writeln!(writer, "id\taddress\t{}", self.levels.join("\t"))?;
        for (sample, address) in self.group_addresses(group, delimiter) {
            let ids = &self.memberships[&sample];
            let ids: Vec<String> = ids.iter().map(|id| id.to_string()).collect();
            writeln!(writer, "{}\t{}\t{}", sample, address, ids.join("\t"))?;
        }
        writer.flush()?;
        Ok(())
    }

    /// Write the tree followed by a newline.
    pub fn write_newick<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let mut file = File::create(path)?;
        writeln!(file, "{}", self.newick)?;
        Ok(())
    }
}

/// Cluster an in-memory matrix.
pub fn cluster_matrix(
    matrix: &DistanceMatrix,
    thresholds: &Thresholds,
    linkage: LinkageMethod,
    tree_mode: TreeMode,
) -> Result<Clustering> {
    if matrix.n() == 0 {
        return Err(ClusterError::EmptyData("cannot cluster an empty matrix".into()));
    }
    let tree = Dendrogram::build(matrix, linkage);
    let cuts: Vec<Vec<usize>> = thresholds.as_slice().iter().map(|&t| tree.cut(t)).collect();

    let memberships = tree
        .labels()
        .iter()
        .enumerate()
        .map(|(leaf, label)| (label.clone(), cuts.iter().map(|c| c[leaf]).collect()))
        .collect();

    Ok(Clustering {
        levels: thresholds.threshold_map().into_keys().collect(),
        memberships,
        newick: tree.newick(tree_mode),
    })
}

/// Hierarchical clustering of a matrix TSV file.
#[derive(Debug, Clone, Copy, Default)]
pub struct MultiLevelClustering;

impl ClusterService for MultiLevelClustering {
    fn cluster(
        &self,
        matrix_path: &Path,
        thresholds: &Thresholds,
        linkage: LinkageMethod,
        tree_mode: TreeMode,
    ) -> Result<Clustering> {
        let matrix = DistanceMatrix::from_tsv(matrix_path)?;
        let clustering = cluster_matrix(&matrix, thresholds, linkage, tree_mode)?;
        debug!(
            n = matrix.n(),
            levels = clustering.levels.len(),
            %linkage,
            "clustered distance matrix"
        );
        Ok(clustering)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // a-b at 1, c at 4 from both, d far away
    fn matrix() -> DistanceMatrix {
        DistanceMatrix::new(
            vec!["a".into(), "b".into(), "c".into(), "d".into()],
            vec![
                0.0, 1.0, 4.0, 10.0, //
                1.0, 0.0, 4.0, 12.0, //
                4.0, 4.0, 0.0, 10.0, //
                10.0, 12.0, 10.0, 0.0,
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_single_linkage_merges() {
        let tree = Dendrogram::build(&matrix(), LinkageMethod::Single);
        let heights: Vec<f64> = tree.merges().iter().map(|m| m.height).collect();
        assert_eq!(heights, vec![1.0, 4.0, 10.0]);
        assert_eq!(tree.merges()[0].left, 0);
        assert_eq!(tree.merges()[0].right, 1);
    }

    #[test]
    fn test_complete_and_average_heights() {
        let complete = Dendrogram::build(&matrix(), LinkageMethod::Complete);
        let heights: Vec<f64> = complete.merges().iter().map(|m| m.height).collect();
        assert_eq!(heights, vec![1.0, 4.0, 12.0]);

        let average = Dendrogram::build(&matrix(), LinkageMethod::Average);
        let last = average.merges()[2].height;
        assert!((last - 32.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_cut_groups_within_threshold() {
        let tree = Dendrogram::build(&matrix(), LinkageMethod::Single);
        assert_eq!(tree.cut(0.0), vec![1, 2, 3, 4]);
        assert_eq!(tree.cut(1.0), vec![1, 1, 2, 3]);
        assert_eq!(tree.cut(5.0), vec![1, 1, 1, 2]);
        assert_eq!(tree.cut(100.0), vec![1, 1, 1, 1]);
    }

    #[test]
    fn test_addresses_per_level() {
        let thresholds = Thresholds::new(vec![5.0, 1.0, 0.0]).unwrap();
        let c = cluster_matrix(&matrix(), &thresholds, LinkageMethod::Single, TreeMode::Patristic)
            .unwrap();
        let addresses = c.addresses(".");
        assert_eq!(addresses["a"], "1.1.1");
        assert_eq!(addresses["b"], "1.1.2");
        assert_eq!(addresses["c"], "1.2.3");
        assert_eq!(addresses["d"], "2.3.4");
        assert_eq!(c.levels, vec!["level_1", "level_2", "level_3"]);
    }

    #[test]
    fn test_newick_branch_lengths() {
        let m = DistanceMatrix::new(
            vec!["a".into(), "b".into()],
            vec![0.0, 2.0, 2.0, 0.0],
        )
        .unwrap();
        let tree = Dendrogram::build(&m, LinkageMethod::Average);
        assert_eq!(tree.newick(TreeMode::Patristic), "(a:1,b:1);");
        assert_eq!(tree.newick(TreeMode::Cophenetic), "(a:2,b:2);");

        let nested = Dendrogram::build(&matrix(), LinkageMethod::Single).newick(TreeMode::Cophenetic);
        assert_eq!(nested, "(((a:1,b:1):3,c:4):6,d:10);");
    }

    #[test]
    fn test_newick_quotes_labels() {
        assert_eq!(newick_label("S1"), "S1");
        assert_eq!(newick_label("S 1"), "'S 1'");
        assert_eq!(newick_label("a,b"), "'a,b'");
        assert_eq!(newick_label("o'neil"), "'o''neil'");

        let m = DistanceMatrix::new(
            vec!["s(1)".into(), "s:2".into()],
            vec![0.0, 2.0, 2.0, 0.0],
        )
        .unwrap();
        let tree = Dendrogram::build(&m, LinkageMethod::Single);
        assert_eq!(tree.newick(TreeMode::Patristic), "('s(1)':1,'s:2':1);");
    }

    #[test]
    fn test_service_reads_matrix_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("matrix.tsv");
        matrix().to_tsv(&path).unwrap();
        let thresholds = Thresholds::new(vec![2.0]).unwrap();
        let c = MultiLevelClustering
            .cluster(&path, &thresholds, LinkageMethod::Complete, TreeMode::Cophenetic)
            .unwrap();
        assert_eq!(c.memberships["a"], vec![1]);
        assert_eq!(c.memberships["c"], vec![2]);

        let out = dir.path().join("clusters.tsv");
        c.write_clusters(&out, "east", ".").unwrap();
        let text = std::fs::read_to_string(&out).unwrap();
        assert!(text.starts_with("id\taddress\tlevel_1\n"));
        assert!(text.contains("b\teast|1\t1\n"));
        assert!(text.contains("c\teast|2\t2\n"));
    }
}
