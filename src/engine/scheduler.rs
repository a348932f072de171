use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use tracing::trace;

use crate::model::*;

use super::allocate::allocate_in;
use super::conflict::{conflicts, conflicts_any, days_until, gap_days};
use super::hierarchy::Session;

/// Result of scheduling one unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Pass {
    /// Indices into the pool, ascending, to place on the unit.
    Chain(Vec<usize>),
    /// A booking pinned to this unit overlaps another booking pinned here.
    Irreconcilable(BookingId),
}

/// Pick the bookings `unit` should take from `pool` (sorted by start day).
///
/// `connected` holds the bookings of every unit that shares space with this
/// one.
pub(crate) fn schedule_unit(
    session: &mut Session<'_>,
    unit: &Unit,
    pool: &[Booking],
    connected: &[Booking],
) -> Pass {
    let locked: Vec<&Booking> = pool.iter().filter(|b| b.unit == Some(unit.id)).collect();

    let mut eligible = Vec::with_capacity(pool.len());
    for (j, b) in pool.iter().enumerate() {
        if b.unit.is_some_and(|u| u != unit.id) {
            continue;
        }
        if locked
            .iter()
            .any(|lb| lb.id != b.id && conflicts(&lb.span, &b.span))
        {
            if b.is_locked() {
                return Pass::Irreconcilable(b.id);
            }
            continue;
        }
        if conflicts_any(&b.span, connected) {
            continue;
        }
        if !session.snapshot.contains_booking(b.id)
            && session.snapshot.is_composite(unit.id)
            && !parts_accept(session, unit, b)
        {
            trace!(unit = %unit.id, booking = %b.id, "rejected by sub-unit probe");
            continue;
        }
        eligible.push(j);
    }

    if eligible.is_empty() {
        return Pass::Chain(Vec::new());
    }
    Pass::Chain(CandidateGraph::build(pool, &eligible).best_chain())
}

/// A new booking on a composite unit occupies every part. Each part's
/// category must still be assignable with the booking pinned to that part.
fn parts_accept(session: &mut Session<'_>, unit: &Unit, booking: &Booking) -> bool {
    let snapshot = session.snapshot;
    for &part in snapshot.children(unit.id) {
        let Some(part_category) = snapshot.unit(part).map(|u| u.category) else {
            continue;
        };
        let probe = Booking {
            category: part_category,
            unit: Some(part),
            ..booking.clone()
        };
        if allocate_in(session, part_category, &[probe]).is_some_and(|a| !a.success) {
            return false;
        }
    }
    true
}

/// Per-unit DAG over eligible pool bookings plus a virtual origin.
///
/// Edge weights are idle days: origin→j is measured from the first pool
/// start, i→j from i's checkout. Edges only run forward in pool order.
pub(crate) struct CandidateGraph {
    graph: DiGraph<Option<usize>, u64>,
    origin: NodeIndex,
}

impl CandidateGraph {
    pub(crate) fn build(pool: &[Booking], eligible: &[usize]) -> Self {
        let mut graph = DiGraph::with_capacity(eligible.len() + 1, eligible.len() * 2);
        let origin = graph.add_node(None);
        let nodes: Vec<NodeIndex> = eligible.iter().map(|&j| graph.add_node(Some(j))).collect();

        let boundary = pool[0].span.start;
        for (&j, &node) in eligible.iter().zip(&nodes) {
            graph.add_edge(origin, node, days_until(boundary, &pool[j].span));
        }
        for (a, (&i, &from)) in eligible.iter().zip(&nodes).enumerate() {
            for (&j, &to) in eligible[a + 1..].iter().zip(&nodes[a + 1..]) {
                if pool[i].span.end <= pool[j].span.start {
                    graph.add_edge(from, to, gap_days(&pool[i].span, &pool[j].span));
                }
            }
        }

        Self { graph, origin }
    }

    /// Dijkstra from the origin. Returns per-node `(distance, predecessor)`;
    /// `None` distance means unreachable.
    ///
    /// The next node is the unvisited one with the smallest distance, lowest
    /// index first on ties; relaxation only replaces on strictly shorter paths.
    pub(crate) fn shortest_paths(&self) -> (Vec<Option<u64>>, Vec<Option<NodeIndex>>) {
        let n = self.graph.node_count();
        let mut dist: Vec<Option<u64>> = vec![None; n];
        let mut prev: Vec<Option<NodeIndex>> = vec![None; n];
        let mut visited = vec![false; n];
        dist[self.origin.index()] = Some(0);

        loop {
            let mut current: Option<(usize, u64)> = None;
            for (i, d) in dist.iter().enumerate() {
                if visited[i] {
                    continue;
                }
                if let Some(d) = *d
                    && current.is_none_or(|(_, best)| d < best)
                {
                    current = Some((i, d));
                }
            }
            let Some((u, du)) = current else { break };
            visited[u] = true;

            for edge in self.graph.edges(NodeIndex::new(u)) {
                let v = edge.target().index();
                let alt = du + *edge.weight();
                if dist[v].is_none_or(|dv| alt < dv) {
                    dist[v] = Some(alt);
                    prev[v] = Some(NodeIndex::new(u));
                }
            }
        }

        (dist, prev)
    }

    /// Chain ending at the reachable node with the most bookings behind it,
    /// fewest idle days on ties, lowest node index after that.
    pub(crate) fn best_chain(&self) -> Vec<usize> {
        let (dist, prev) = self.shortest_paths();

        let mut best: Option<(NodeIndex, usize, u64)> = None;
        for node in self.graph.node_indices() {
            if node == self.origin {
                continue;
            }
            let Some(d) = dist[node.index()] else {
                continue;
            };
            let len = self.chain_len(node, &prev);
            let better = match best {
                None => true,
                Some((_, best_len, best_d)) => len > best_len || (len == best_len && d < best_d),
            };
            if better {
                best = Some((node, len, d));
            }
        }

        let Some((mut node, _, _)) = best else {
            return Vec::new();
        };
        let mut chain = Vec::new();
        while let Some(j) = self.graph[node] {
            chain.push(j);
            match prev[node.index()] {
                Some(p) => node = p,
                None => break,
            }
        }
        chain.reverse();
        chain
    }

    fn chain_len(&self, mut node: NodeIndex, prev: &[Option<NodeIndex>]) -> usize {
        let mut len = 0;
        while node != self.origin {
            len += 1;
            match prev[node.index()] {
                Some(p) => node = p,
                None => break,
            }
        }
        len
    }
}
