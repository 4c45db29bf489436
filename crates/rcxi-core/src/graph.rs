//! Spiderweb propagation graph.
//!
//! Nodes live in a flat arena and refer to each other by index. Each node
//! carries a 5-D coordinate (thought, emotion, space, time, speed) and an
//! activation in [0, 1]. Signals spread by synchronous decay-weighted
//! averaging. An optional [`StateEngine`] can be attached and is owned by
//! the graph.

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::config::{GraphConfig, Topology};
use crate::constants::NODE_DIMENSIONS;
use crate::engine::StateEngine;
use crate::error::{RcxiError, Result};
use crate::glyph::IdentityGlyph;
use crate::snapshot::RcXiSnapshot;
use crate::vector::{blend, clamp_unit, distance, mean, variance, weighted_sum};

pub type Coordinates = [f64; NODE_DIMENSIONS];

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpiderwebNode {
    pub index: usize,
    pub coordinates: Coordinates,
    pub activation: f64,
}

/// Undirected edge, reported with `from_index < to_index`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpiderwebEdge {
    pub from_index: usize,
    pub to_index: usize,
    pub weight: f64,
}

#[derive(Clone, Debug)]
pub struct PropagationGraph {
    config: GraphConfig,
    nodes: Vec<SpiderwebNode>,
    /// adjacency[i] = (neighbour index, weight), sorted by neighbour index.
    adjacency: Vec<Vec<(usize, f64)>>,
    engine: Option<StateEngine>,
}

impl PropagationGraph {
    /// Build a graph with coordinates drawn uniformly from [0, 1)^5 using
    /// `config.coordinate_seed`.
    pub fn new(config: GraphConfig) -> Result<Self> {
        config.validate()?;
        let mut rng = SmallRng::seed_from_u64(config.coordinate_seed);
        let coordinates = (0..config.node_count)
            .map(|_| std::array::from_fn(|_| rng.random::<f64>()))
            .collect();
        Self::with_coordinates(config, coordinates)
    }

    /// Build a graph over caller-supplied coordinates, one per node.
    pub fn with_coordinates(config: GraphConfig, coordinates: Vec<Coordinates>) -> Result<Self> {
        config.validate()?;
        if coordinates.len() != config.node_count {
            return Err(RcxiError::config(format!(
                "expected {} coordinates, got {}",
                config.node_count,
                coordinates.len()
            )));
        }
        if coordinates.iter().flatten().any(|c| !c.is_finite()) {
            return Err(RcxiError::config("coordinates must be finite"));
        }

        let nodes: Vec<SpiderwebNode> = coordinates
            .into_iter()
            .enumerate()
            .map(|(index, coordinates)| SpiderwebNode {
                index,
                coordinates,
                activation: 0.0,
            })
            .collect();
        let edges = build_edges(&config.topology, &nodes)?;
        let graph = Self::from_edges(config, nodes, &edges)?;

        tracing::info!(
            nodes = graph.nodes.len(),
            edges = graph.edge_count(),
            decay = graph.config.decay,
            "propagation graph built"
        );
        Ok(graph)
    }

    /// Reassemble a graph from stored nodes and edges without regenerating
    /// the topology.
    pub(crate) fn from_parts(
        config: GraphConfig,
        nodes: Vec<SpiderwebNode>,
        edges: &[SpiderwebEdge],
    ) -> Result<Self> {
        config.validate()?;
        if nodes.len() != config.node_count {
            return Err(RcxiError::config(format!(
                "expected {} nodes, got {}",
                config.node_count,
                nodes.len()
            )));
        }
        if nodes.iter().flat_map(|n| n.coordinates).any(|c| !c.is_finite()) {
            return Err(RcxiError::config("coordinates must be finite"));
        }
        let nodes = nodes
            .into_iter()
            .enumerate()
            .map(|(index, node)| SpiderwebNode {
                index,
                activation: clamp_unit(node.activation),
                ..node
            })
            .collect();
        Self::from_edges(config, nodes, edges)
    }

    fn from_edges(
        config: GraphConfig,
        nodes: Vec<SpiderwebNode>,
        edges: &[SpiderwebEdge],
    ) -> Result<Self> {
        let n = nodes.len();
        let mut adjacency: Vec<Vec<(usize, f64)>> = vec![Vec::new(); n];
        for edge in edges {
            for index in [edge.from_index, edge.to_index] {
                if index >= n {
                    return Err(RcxiError::Index { index, len: n });
                }
            }
            if !(edge.weight > 0.0 && edge.weight.is_finite()) {
                return Err(RcxiError::config(format!(
                    "edge weight must be positive and finite, got {}",
                    edge.weight
                )));
            }
            // No self loops
            if edge.from_index == edge.to_index {
                continue;
            }
            link(&mut adjacency, edge.from_index, edge.to_index, edge.weight);
            link(&mut adjacency, edge.to_index, edge.from_index, edge.weight);
        }
        for list in &mut adjacency {
            list.sort_by_key(|(j, _)| *j);
        }

        Ok(Self {
            config,
            nodes,
            adjacency,
            engine: None,
        })
    }

    pub fn config(&self) -> &GraphConfig {
        &self.config
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn nodes(&self) -> &[SpiderwebNode] {
        &self.nodes
    }

    pub fn node(&self, index: usize) -> Result<&SpiderwebNode> {
        self.nodes.get(index).ok_or(RcxiError::Index {
            index,
            len: self.nodes.len(),
        })
    }

    /// Direct neighbours of `index` as (neighbour, weight).
    pub fn neighbors(&self, index: usize) -> Result<&[(usize, f64)]> {
        self.check_index(index)?;
        Ok(&self.adjacency[index])
    }

    /// Every undirected edge once, ordered by (from, to).
    pub fn edges(&self) -> Vec<SpiderwebEdge> {
        self.adjacency
            .iter()
            .enumerate()
            .flat_map(|(i, list)| {
                list.iter()
                    .filter(move |(j, _)| i < *j)
                    .map(move |&(j, weight)| SpiderwebEdge {
                        from_index: i,
                        to_index: j,
                        weight,
                    })
            })
            .collect()
    }

    pub fn edge_count(&self) -> usize {
        self.adjacency.iter().map(Vec::len).sum::<usize>() / 2
    }

    pub fn activations(&self) -> Vec<f64> {
        self.nodes.iter().map(|n| n.activation).collect()
    }

    /// Set one activation, clamped to [0, 1].
    pub fn set_activation(&mut self, index: usize, value: f64) -> Result<()> {
        self.check_index(index)?;
        self.nodes[index].activation = clamp_unit(value);
        Ok(())
    }

    pub fn reset_activations(&mut self) {
        for node in &mut self.nodes {
            node.activation = 0.0;
        }
    }

    fn check_index(&self, index: usize) -> Result<()> {
        if index < self.nodes.len() {
            Ok(())
        } else {
            Err(RcxiError::Index {
                index,
                len: self.nodes.len(),
            })
        }
    }

    // --- Engine attachment ---

    /// Attach an engine, returning the one it replaces.
    pub fn attach_engine(&mut self, engine: StateEngine) -> Option<StateEngine> {
        self.engine.replace(engine)
    }

    pub fn detach_engine(&mut self) -> Option<StateEngine> {
        self.engine.take()
    }

    pub fn engine(&self) -> Option<&StateEngine> {
        self.engine.as_ref()
    }

    pub fn engine_mut(&mut self) -> Option<&mut StateEngine> {
        self.engine.as_mut()
    }

    // --- Propagation ---

    /// Spread `input_signal` from `origin_index`.
    ///
    /// Each iteration updates every node from the previous iteration's
    /// activations: γ·(weighted neighbour mean) + (1 − γ)·own, with the
    /// signal added at the origin on the first iteration only. Activations
    /// are clamped to [0, 1] after every iteration. Stops once the largest
    /// per-node change is below `convergence_epsilon` or after
    /// `max_iterations`.
    pub fn propagate_thought(
        &mut self,
        origin_index: usize,
        input_signal: f64,
        max_iterations: usize,
        convergence_epsilon: f64,
    ) -> Result<Vec<f64>> {
        self.check_index(origin_index)?;
        let gamma = self.config.decay;
        let signal = if input_signal.is_finite() { input_signal } else { 0.0 };

        let mut current = self.activations();
        let mut performed = 0;
        for iteration in 0..max_iterations {
            let next: Vec<f64> = (0..current.len())
                .map(|i| {
                    let mut a = blend(self.neighbor_mean(i, &current), current[i], gamma);
                    if iteration == 0 && i == origin_index {
                        a += signal;
                    }
                    clamp_unit(a)
                })
                .collect();

            let max_delta = next
                .iter()
                .zip(&current)
                .map(|(a, b)| (a - b).abs())
                .fold(0.0, f64::max);
            current = next;
            performed = iteration + 1;
            if max_delta < convergence_epsilon {
                break;
            }
        }

        for (node, a) in self.nodes.iter_mut().zip(&current) {
            node.activation = *a;
        }
        tracing::debug!(
            origin = origin_index,
            signal,
            iterations = performed,
            "thought propagated"
        );
        Ok(current)
    }

    /// Weighted mean of neighbour activations. Isolated nodes return their own.
    fn neighbor_mean(&self, index: usize, activations: &[f64]) -> f64 {
        let neighbors = &self.adjacency[index];
        let total_weight: f64 = neighbors.iter().map(|(_, w)| w).sum();
        if neighbors.is_empty() || total_weight <= 0.0 {
            return activations[index];
        }
        neighbors
            .iter()
            .map(|&(j, w)| w * activations[j])
            .sum::<f64>()
            / total_weight
    }

    /// Variance of the activations of `index`'s direct neighbours.
    pub fn local_disagreement(&self, index: usize) -> Result<f64> {
        let values: Vec<f64> = self
            .neighbors(index)?
            .iter()
            .map(|(j, _)| self.nodes[*j].activation)
            .collect();
        Ok(variance(&values))
    }

    // --- Tension ---

    /// Local tension at `node_index`.
    ///
    /// With an engine: weighted sum of the engine's measured ξ and the
    /// neighbour disagreement. Without: the disagreement alone.
    pub fn detect_tension(
        &self,
        node_index: usize,
        symbolic_context: &str,
        engine: Option<&mut StateEngine>,
    ) -> Result<f64> {
        let disagreement = self.local_disagreement(node_index)?;
        let tension = match engine {
            Some(engine) => self.combine_tension(engine.measure_tension().xi, disagreement),
            None => disagreement,
        };
        tracing::debug!(
            node = node_index,
            context = symbolic_context,
            disagreement,
            tension,
            "local tension detected"
        );
        Ok(tension)
    }

    /// [`detect_tension`](Self::detect_tension) using the attached engine, if any.
    pub fn detect_tension_attached(
        &mut self,
        node_index: usize,
        symbolic_context: &str,
    ) -> Result<f64> {
        let mut engine = self.engine.take();
        let result = self.detect_tension(node_index, symbolic_context, engine.as_mut());
        self.engine = engine;
        result
    }

    fn combine_tension(&self, xi: f64, disagreement: f64) -> f64 {
        weighted_sum(&[
            (self.config.engine_weight, xi),
            (self.config.disagreement_weight, disagreement),
        ])
    }

    // --- Snapshots ---

    /// Graph statistics plus the attached engine's state.
    pub fn get_rc_xi_consciousness(&self) -> RcXiSnapshot {
        let activations = self.activations();
        RcXiSnapshot {
            node_count: self.nodes.len(),
            mean_activation: mean(&activations),
            active_nodes: activations
                .iter()
                .filter(|a| **a > self.config.active_threshold)
                .count(),
            stability: 1.0 - variance(&activations),
            engine: self.engine.as_ref().map(StateEngine::get_consciousness_state),
        }
    }

    pub fn form_identity_glyph(&self, context: &str) -> Result<IdentityGlyph> {
        self.engine
            .as_ref()
            .map(|engine| engine.form_glyph(context))
            .ok_or_else(|| RcxiError::not_available("no state engine attached"))
    }
}

fn link(adjacency: &mut [Vec<(usize, f64)>], from: usize, to: usize, weight: f64) {
    if !adjacency[from].iter().any(|(j, _)| *j == to) {
        adjacency[from].push((to, weight));
    }
}

fn coordinate_weight(a: &SpiderwebNode, b: &SpiderwebNode) -> f64 {
    1.0 / (1.0 + distance(&a.coordinates, &b.coordinates))
}

fn build_edges(topology: &Topology, nodes: &[SpiderwebNode]) -> Result<Vec<SpiderwebEdge>> {
    let n = nodes.len();
    let edge = |i: usize, j: usize| SpiderwebEdge {
        from_index: i.min(j),
        to_index: i.max(j),
        weight: coordinate_weight(&nodes[i], &nodes[j]),
    };

    let edges = match topology {
        Topology::NearestNeighbor { k } => {
            let mut edges = Vec::new();
            for i in 0..n {
                let mut others: Vec<(usize, f64)> = (0..n)
                    .filter(|j| *j != i)
                    .map(|j| (j, distance(&nodes[i].coordinates, &nodes[j].coordinates)))
                    .collect();
                others.sort_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)));
                edges.extend(others.into_iter().take(*k).map(|(j, _)| edge(i, j)));
            }
            edges
        }
        Topology::FixedRandom { seed, density } => {
            let mut rng = SmallRng::seed_from_u64(*seed);
            let mut edges = Vec::new();
            for i in 0..n {
                for j in (i + 1)..n {
                    if rng.random_bool(*density) {
                        edges.push(edge(i, j));
                    }
                }
            }
            edges
        }
        Topology::Explicit { edges } => {
            let mut out = Vec::with_capacity(edges.len());
            for &(from, to, weight) in edges {
                for index in [from, to] {
                    if index >= n {
                        return Err(RcxiError::Index { index, len: n });
                    }
                }
                out.push(SpiderwebEdge {
                    from_index: from,
                    to_index: to,
                    weight,
                });
            }
            out
        }
    };
    Ok(edges)
}
