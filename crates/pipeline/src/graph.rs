//! In-memory citation graph with bounded traversal
//!
//! Built from the stored edge set for one facade query. Traversal is
//! breadth-first, capped at [`MAX_TRAVERSAL_DEPTH`], and visits each
//! node at most once, so cycles (A cites B cites A) terminate.

use serde::Serialize;
use std::collections::{HashMap, HashSet, VecDeque};
use uuid::Uuid;

/// Hard cap on traversal depth, independent of what callers ask for
pub const MAX_TRAVERSAL_DEPTH: usize = 3;

/// Which edges to follow from the root
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TraversalDirection {
    /// Papers this paper cites (outgoing edges)
    Citing,
    /// Papers citing this paper (incoming edges)
    CitedBy,
    /// Both directions
    Both,
}

impl TraversalDirection {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "citing" => Some(TraversalDirection::Citing),
            "cited-by" => Some(TraversalDirection::CitedBy),
            "both" => Some(TraversalDirection::Both),
            _ => None,
        }
    }
}

/// One reachable paper with its distance from the root
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GraphNode {
    pub paper_id: Uuid,
    pub title: String,
    pub depth: usize,
}

/// One resolved edge between two visited papers, in its stored
/// orientation regardless of the direction walked
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GraphEdge {
    pub citing_paper_id: Uuid,
    pub cited_paper_id: Uuid,
    pub confidence: i16,
}

/// Traversal result for the facade
#[derive(Debug, Clone, Serialize)]
pub struct GraphView {
    pub root: Uuid,
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
}

/// Adjacency maps over the resolved edge set
#[derive(Default)]
pub struct CitationGraph {
    outgoing: HashMap<Uuid, Vec<(Uuid, i16)>>,
    incoming: HashMap<Uuid, Vec<(Uuid, i16)>>,
    titles: HashMap<Uuid, String>,
}

impl CitationGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_paper(&mut self, paper_id: Uuid, title: &str) {
        self.titles.insert(paper_id, title.to_string());
    }

    pub fn add_edge(&mut self, citing: Uuid, cited: Uuid, confidence: i16) {
        self.outgoing
            .entry(citing)
            .or_default()
            .push((cited, confidence));
        self.incoming
            .entry(cited)
            .or_default()
            .push((citing, confidence));
    }

    fn neighbors(&self, paper_id: Uuid, direction: TraversalDirection) -> Vec<(Uuid, i16)> {
        let outgoing = self.outgoing.get(&paper_id).map(Vec::as_slice).unwrap_or(&[]);
        let incoming = self.incoming.get(&paper_id).map(Vec::as_slice).unwrap_or(&[]);
        match direction {
            TraversalDirection::Citing => outgoing.to_vec(),
            TraversalDirection::CitedBy => incoming.to_vec(),
            TraversalDirection::Both => {
                let mut both = outgoing.to_vec();
                both.extend_from_slice(incoming);
                both
            }
        }
    }

    /// Breadth-first walk from the root. The requested depth is capped
    /// at [`MAX_TRAVERSAL_DEPTH`]; each node appears once at its
    /// shallowest distance.
    pub fn traverse(
        &self,
        root: Uuid,
        depth: usize,
        direction: TraversalDirection,
    ) -> GraphView {
        let depth = depth.min(MAX_TRAVERSAL_DEPTH);

        let mut visited: HashSet<Uuid> = HashSet::new();
        let mut nodes: Vec<GraphNode> = Vec::new();
        let mut queue: VecDeque<(Uuid, usize)> = VecDeque::new();

        visited.insert(root);
        queue.push_back((root, 0));
        nodes.push(GraphNode {
            paper_id: root,
            title: self.title_of(root),
            depth: 0,
        });

        while let Some((current, current_depth)) = queue.pop_front() {
            if current_depth >= depth {
                continue;
            }
            for (neighbor, _) in self.neighbors(current, direction) {
                if visited.insert(neighbor) {
                    nodes.push(GraphNode {
                        paper_id: neighbor,
                        title: self.title_of(neighbor),
                        depth: current_depth + 1,
                    });
                    queue.push_back((neighbor, current_depth + 1));
                }
            }
        }

        // Keep only edges whose endpoints both made it into the view
        let mut edges: Vec<GraphEdge> = self
            .outgoing
            .iter()
            .filter(|(citing, _)| visited.contains(citing))
            .flat_map(|(&citing, cited_list)| {
                cited_list
                    .iter()
                    .filter(|(cited, _)| visited.contains(cited))
                    .map(move |&(cited, confidence)| GraphEdge {
                        citing_paper_id: citing,
                        cited_paper_id: cited,
                        confidence,
                    })
            })
            .collect();
        edges.sort_by_key(|e| (e.citing_paper_id, e.cited_paper_id));

        GraphView { root, nodes, edges }
    }

    fn title_of(&self, paper_id: Uuid) -> String {
        self.titles.get(&paper_id).cloned().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(n: u128) -> Uuid {
        Uuid::from_u128(n)
    }

    fn chain_graph() -> CitationGraph {
        // a -> b -> c -> d -> e
        let mut graph = CitationGraph::new();
        for n in 1..=5u128 {
            graph.add_paper(id(n), &format!("Paper {}", n));
        }
        for n in 1..=4u128 {
            graph.add_edge(id(n), id(n + 1), 90);
        }
        graph
    }

    #[test]
    fn test_depth_limits_reach() {
        let graph = chain_graph();

        let view = graph.traverse(id(1), 2, TraversalDirection::Citing);
        let reached: Vec<Uuid> = view.nodes.iter().map(|n| n.paper_id).collect();
        assert_eq!(reached, vec![id(1), id(2), id(3)]);
        assert_eq!(view.nodes[2].depth, 2);

        // Requested depth beyond the cap is clamped to 3
        let deep = graph.traverse(id(1), 10, TraversalDirection::Citing);
        assert_eq!(deep.nodes.len(), 4);
    }

    #[test]
    fn test_cycle_terminates_without_revisit() {
        // A cites B, B cites A
        let mut graph = CitationGraph::new();
        graph.add_paper(id(1), "A");
        graph.add_paper(id(2), "B");
        graph.add_edge(id(1), id(2), 88);
        graph.add_edge(id(2), id(1), 91);

        let view = graph.traverse(id(1), 3, TraversalDirection::Both);
        assert_eq!(view.nodes.len(), 2);
        assert_eq!(view.edges.len(), 2);
    }

    #[test]
    fn test_direction_selects_edges() {
        let graph = chain_graph();

        let upstream = graph.traverse(id(3), 3, TraversalDirection::CitedBy);
        let reached: Vec<Uuid> = upstream.nodes.iter().map(|n| n.paper_id).collect();
        assert_eq!(reached, vec![id(3), id(2), id(1)]);

        let both = graph.traverse(id(3), 1, TraversalDirection::Both);
        assert_eq!(both.nodes.len(), 3);
    }

    #[test]
    fn test_edges_confined_to_view() {
        let graph = chain_graph();
        let view = graph.traverse(id(1), 1, TraversalDirection::Citing);
        // Only a -> b is inside the view; b -> c leaves it
        assert_eq!(view.edges.len(), 1);
        assert_eq!(view.edges[0].citing_paper_id, id(1));
        assert_eq!(view.edges[0].cited_paper_id, id(2));
    }

    #[test]
    fn test_isolated_root() {
        let mut graph = CitationGraph::new();
        graph.add_paper(id(7), "Lonely");
        let view = graph.traverse(id(7), 3, TraversalDirection::Both);
        assert_eq!(view.nodes.len(), 1);
        assert!(view.edges.is_empty());
    }

    #[test]
    fn test_direction_parse() {
        assert_eq!(
            TraversalDirection::parse("citing"),
            Some(TraversalDirection::Citing)
        );
        assert_eq!(
            TraversalDirection::parse("cited-by"),
            Some(TraversalDirection::CitedBy)
        );
        assert_eq!(TraversalDirection::parse("sideways"), None);
    }
}
