//! Exact maximum-clique search for sparse undirected graphs.
//!
//! Closely follows the branch-and-bound algorithm described in:
//! "Fast Algorithms for the Maximum Clique Problem on Massive Sparse Graphs",
//! Pattabiraman, Patwary, Gebremedhin, Liao, Choudhary
//! (<https://arxiv.org/abs/1209.5818>)
//! The algorithm is modified so that the outer loop visits vertices in
//! increasing degeneracy order: after a vertex is processed it is peeled from
//! the graph and the residual degrees of its neighbors are lowered in place,
//! with the degree-sorted vertex array repaired by O(1) bin swaps. This
//! bounds the recursion depth by the degeneracy of the graph, which stays
//! small for the sparse consistency graphs produced by the match builders.

use super::UndirectedGraph;

// ── Degree utilities ────────────────────────────────────────────────────────

/// Compute the degree of every vertex.
///
/// Returns the degree vector and the maximum degree found in the graph.
pub fn vertex_degrees<G: UndirectedGraph>(graph: &G) -> (Vec<usize>, usize) {
    let n_vertices = graph.num_vertices();
    let mut degrees = vec![0usize; n_vertices];
    let mut maximum_degree = 0usize;
    for v in 0..n_vertices {
        degrees[v] = graph.neighbors(v as u32).len();
        maximum_degree = maximum_degree.max(degrees[v]);
    }
    (degrees, maximum_degree)
}

// ── Mutating bin-sort ───────────────────────────────────────────────────────

/// Vertices of a graph sorted in increasing residual-degree order by
/// bin-sort, together with the auxiliary arrays needed to keep the order
/// valid while vertices are peeled one by one.
///
/// Invariant: for any degree `d`, the slice
/// `sorted_vertices[bin_starts[d]..bin_starts[d + 1]]` contains exactly the
/// not-yet-peeled vertices whose current residual degree equals `d`.
pub struct BinSortedVertices {
    /// Starting position of the bin for each residual degree.
    pub bin_starts: Vec<usize>,
    /// Permutation of the vertices in increasing residual-degree order.
    pub sorted_vertices: Vec<u32>,
    /// Inverse permutation: position of each vertex in `sorted_vertices`.
    pub vertex_positions: Vec<usize>,
    /// Current residual degree of each vertex.
    pub vertex_degrees: Vec<usize>,
}

impl BinSortedVertices {
    /// Bin-sort the vertices of `graph` by degree.
    pub fn new<G: UndirectedGraph>(graph: &G) -> Self {
        let (degrees, maximum_degree) = vertex_degrees(graph);
        let n_vertices = graph.num_vertices();

        // 1) Size of each bin.
        let mut bin_sizes = vec![0usize; maximum_degree + 1];
        for &degree in &degrees {
            bin_sizes[degree] += 1;
        }

        // 2) Starting index of each bin.
        let mut bin_starts = vec![0usize; maximum_degree + 1];
        let mut next_bin_start = 0usize;
        for (degree, &size) in bin_sizes.iter().enumerate() {
            bin_starts[degree] = next_bin_start;
            next_bin_start += size;
        }

        // 3) Place every vertex in its bin.
        let mut bin_offsets = bin_starts.clone();
        let mut sorted_vertices = vec![0u32; n_vertices];
        let mut vertex_positions = vec![0usize; n_vertices];
        for v in 0..n_vertices {
            let position = bin_offsets[degrees[v]];
            bin_offsets[degrees[v]] += 1;
            vertex_positions[v] = position;
            sorted_vertices[position] = v as u32;
        }

        Self {
            bin_starts,
            sorted_vertices,
            vertex_positions,
            vertex_degrees: degrees,
        }
    }

    /// Peel `vertex` from the graph: lower the residual degree of every
    /// neighbor of higher degree, swapping each into the head of its old bin
    /// so the sorted order stays valid. Equivalent to removing the vertex
    /// and its incident edges.
    fn peel<G: UndirectedGraph>(&mut self, graph: &G, vertex: u32) {
        let vertex_degree = self.vertex_degrees[vertex as usize];
        for &neighbor in graph.neighbors(vertex) {
            let neighbor_degree = self.vertex_degrees[neighbor as usize];
            if neighbor_degree > vertex_degree {
                let neighbor_position = self.vertex_positions[neighbor as usize];
                let swapped_position = self.bin_starts[neighbor_degree];
                let swapped_vertex = self.sorted_vertices[swapped_position];
                if neighbor != swapped_vertex {
                    self.vertex_positions[neighbor as usize] = swapped_position;
                    self.vertex_positions[swapped_vertex as usize] = neighbor_position;
                    self.sorted_vertices[neighbor_position] = swapped_vertex;
                    self.sorted_vertices[swapped_position] = neighbor;
                }
                self.bin_starts[neighbor_degree] += 1;
                self.vertex_degrees[neighbor as usize] -= 1;
            }
        }
    }
}

// ── Maximum-clique search ───────────────────────────────────────────────────

/// Find the vertices of a maximum clique of `graph`. Only one maximum clique
/// is returned; ties between maximum cliques are broken by traversal order.
///
/// `min_clique_size` must be greater or equal 2. Cliques smaller than the
/// minimum are ignored: an empty vector means no clique of the required size
/// exists. The result is deterministic for a given adjacency and vertex
/// indexing.
pub fn find_maximum_clique<G: UndirectedGraph>(graph: &G, min_clique_size: usize) -> Vec<u32> {
    assert!(min_clique_size >= 2, "min_clique_size must be at least 2");

    let n_vertices = graph.num_vertices();
    let mut neighbors: Vec<u32> = Vec::with_capacity(n_vertices);

    let mut maximum_clique_tmp: Vec<u32> = Vec::with_capacity(n_vertices);
    let mut maximum_clique: Vec<u32> = Vec::new();
    let mut max_found_size = min_clique_size - 1;

    let mut bins = BinSortedVertices::new(graph);

    // Try to find a clique starting from each vertex, visiting the vertices
    // in increasing degeneracy order.
    for i in 0..n_vertices {
        let vertex = bins.sorted_vertices[i];
        let vertex_degree = bins.vertex_degrees[vertex as usize];

        // Skip the vertex if it doesn't have enough neighbors left to be
        // part of a bigger clique.
        if vertex_degree >= max_found_size {
            neighbors.clear();

            // Collect the forward neighbors that still have enough neighbors
            // themselves.
            for &neighbor in graph.neighbors(vertex) {
                if bins.vertex_positions[neighbor as usize] > bins.vertex_positions[vertex as usize]
                    && bins.vertex_degrees[neighbor as usize] >= max_found_size
                {
                    neighbors.push(neighbor);
                }
            }

            // Size of the maximum clique contained in the subgraph spanned
            // by the current vertex and its forward neighbors.
            let new_found_size = find_maximum_clique_subset(
                graph,
                &mut neighbors,
                &bins.vertex_degrees,
                1,
                max_found_size,
                &mut maximum_clique_tmp,
            );

            if new_found_size > max_found_size {
                max_found_size = new_found_size;
                maximum_clique_tmp.push(vertex);
                maximum_clique = std::mem::take(&mut maximum_clique_tmp);
            } else {
                maximum_clique_tmp.clear();
            }
        }

        bins.peel(graph, vertex);
    }

    maximum_clique
}

/// Recursive helper for [`find_maximum_clique`].
///
/// `subset` holds the remaining candidate vertices (a forward cone under the
/// current ordering), `clique_size` the number of vertices already committed.
/// Returns the size of the best clique found; when that beats
/// `max_found_size`, the non-root clique vertices are accumulated in
/// `maximum_clique_tmp` on unwind.
fn find_maximum_clique_subset<G: UndirectedGraph>(
    graph: &G,
    subset: &mut Vec<u32>,
    vertex_degrees: &[usize],
    clique_size: usize,
    mut max_found_size: usize,
    maximum_clique_tmp: &mut Vec<u32>,
) -> usize {
    // Final step of the recursion: no vertices left to process, the search
    // along this branch is complete.
    if subset.is_empty() {
        if clique_size > max_found_size {
            maximum_clique_tmp.clear();
            return clique_size;
        }
        return max_found_size;
    }

    let mut neighbors: Vec<u32> = Vec::with_capacity(subset.len());

    loop {
        // Continue only while enough candidates remain to beat the best
        // clique found so far.
        if clique_size + subset.len() <= max_found_size {
            break;
        }
        let Some(vertex) = subset.pop() else { break };

        // Keep the candidates that are connected to the current vertex and
        // still have enough neighbors themselves.
        for &candidate in subset.iter() {
            if vertex_degrees[candidate as usize] >= max_found_size
                && graph.has_edge(vertex, candidate)
            {
                neighbors.push(candidate);
            }
        }

        let new_found_size = find_maximum_clique_subset(
            graph,
            &mut neighbors,
            vertex_degrees,
            clique_size + 1,
            max_found_size,
            maximum_clique_tmp,
        );

        // A bigger clique was completed below; the current vertex is part of
        // it.
        if new_found_size > max_found_size {
            max_found_size = new_found_size;
            maximum_clique_tmp.push(vertex);
        }
        neighbors.clear();
    }

    max_found_size
}
