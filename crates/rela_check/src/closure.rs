//! Relevant-type narrowing under transitive closure

use petgraph::algo::has_path_connecting;
use petgraph::graphmap::DiGraphMap;
use rela_types::{BasicType, Type};

/// Keep the binary tuples `c1->c2` of `child` that lie on some path
/// `p1 -> .. -> c1 -> c2 -> .. -> p2` for a binary tuple `p1->p2` of
/// `parent`, where overlapping basic types are mutually reachable.
pub(crate) fn narrow_closure(parent: &Type, child: &Type) -> Type {
    if parent.size() == 0 {
        return Type::empty();
    }
    let mut graph: DiGraphMap<u32, ()> = DiGraphMap::new();
    let mut nodes: Vec<BasicType> = Vec::new();
    for c in child.rels().filter(|c| c.arity() == 2) {
        for end in [c.first(), c.last()] {
            if !nodes.iter().any(|n| n.id() == end.id()) {
                nodes.push(end.clone());
            }
        }
        graph.add_edge(c.first().id(), c.last().id(), ());
    }
    for a in &nodes {
        for b in &nodes {
            if a.id() != b.id() && a.intersects(b) {
                graph.add_edge(a.id(), b.id(), ());
            }
        }
    }
    for p in parent.rels().filter(|p| p.arity() == 2) {
        for end in [p.first(), p.last()] {
            if nodes.iter().any(|n| n.id() == end.id()) {
                continue;
            }
            graph.add_node(end.id());
            for other in &nodes {
                if end.intersects(other) {
                    graph.add_edge(end.id(), other.id(), ());
                    graph.add_edge(other.id(), end.id(), ());
                }
            }
            nodes.push(end.clone());
        }
    }

    let kept = child.rels().filter(|c| c.arity() == 2).filter(|c| {
        parent.rels().filter(|p| p.arity() == 2).any(|p| {
            has_path_connecting(&graph, p.first().id(), c.first().id(), None)
                && has_path_connecting(&graph, c.last().id(), p.last().id(), None)
        })
    });
    Type::from_rels(kept.cloned())
}
