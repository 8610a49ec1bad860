//! Node and connection genes.

use serde::{Deserialize, Serialize};

/// Identity of a node gene (assigned once by the innovation registry)
pub type NodeId = u32;

/// Identity of a connection gene (the historical mutation that created it)
pub type Innovation = u32;

/// Role of a node in the network
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeKind {
    Bias,
    Input,
    Hidden,
    Output,
}

/// Three-level threshold activation.
///
/// Returns exactly `1.0`, `-1.0` or `0.0`.
#[inline]
pub fn activate(sum: f32) -> f32 {
    if sum >= 1.0 {
        1.0
    } else if sum <= -1.0 {
        -1.0
    } else {
        0.0
    }
}

/// A vertex of the genome graph
#[derive(Clone, Debug)]
pub struct NodeGene {
    pub id: NodeId,
    pub kind: NodeKind,
    /// Layer index, 0 = earliest
    pub layer: usize,
    /// Value before activation
    pub sum: f32,
    /// Value after activation, passed along outgoing connections
    pub output: f32,
    /// Outgoing connections, by innovation number
    pub outgoing: Vec<Innovation>,
}

impl NodeGene {
    pub fn new(id: NodeId, kind: NodeKind, layer: usize) -> Self {
        let mut node = Self {
            id,
            kind,
            layer,
            sum: 0.0,
            output: 0.0,
            outgoing: Vec::new(),
        };
        if kind == NodeKind::Bias {
            node.accumulate(1.0);
        }
        node
    }

    /// Add to the sum and re-apply the activation
    #[inline]
    pub fn accumulate(&mut self, value: f32) {
        self.sum += value;
        self.output = activate(self.sum);
    }

    /// Clear transient evaluation state. The bias node keeps its constant output.
    pub fn reset(&mut self) {
        if self.kind == NodeKind::Bias {
            return;
        }
        self.sum = 0.0;
        self.output = 0.0;
    }

    /// Copy of this gene with fresh evaluation state and no outgoing edges
    pub fn blank_copy(&self) -> Self {
        Self::new(self.id, self.kind, self.layer)
    }
}

/// A directed weighted edge of the genome graph
#[derive(Clone, Debug, PartialEq)]
pub struct ConnectionGene {
    pub innovation: Innovation,
    pub from: NodeId,
    pub to: NodeId,
    pub weight: f32,
    pub enabled: bool,
}

impl ConnectionGene {
    pub fn new(innovation: Innovation, from: NodeId, to: NodeId, weight: f32) -> Self {
        Self {
            innovation,
            from,
            to,
            weight,
            enabled: true,
        }
    }

    /// Disabling keeps innovation, endpoints and weight intact
    pub fn disable(&mut self) {
        self.enabled = false;
    }
}
