//! Transition systems and tableaux in DOT (Graphviz) format.
//!
//! # Examples
//!
//! ```
//! use mucalc_rs::lts::Lts;
//! use mucalc_rs::ts::{TransitionSystem, TransitionSystemMut};
//! use mucalc_rs::types::Label;
//!
//! let mut lts = Lts::new(["a"]);
//! let s1 = lts.add_state();
//! lts.add_arc(lts.initial_state(), Label::new("a"), s1);
//!
//! let dot = lts.to_dot().unwrap();
//! assert!(dot.contains("s0 -> s1 [label=\"a\"];"));
//! // Render with: dot -Tpng output.dot -o output.png
//! ```

use std::fmt::{Debug, Write as _};

use crate::lts::Lts;
use crate::pool::TermPool;
use crate::tableau::{NodeKind, Tableau};
use crate::ts::TransitionSystem;

/// Configuration options for DOT output generation.
#[derive(Debug, Clone)]
pub struct DotConfig {
    /// Shape for states and inner tableau nodes (default: "circle")
    pub node_shape: &'static str,
    /// Shape for the initial state and the tableau root (default: "doublecircle")
    pub initial_shape: &'static str,
    /// Shape for terminal tableau nodes (default: "box")
    pub terminal_shape: &'static str,
    /// Color of successful tableau nodes (default: "darkgreen")
    pub success_color: &'static str,
    /// Color of failed tableau nodes (default: "red")
    pub failure_color: &'static str,
}

impl Default for DotConfig {
    fn default() -> Self {
        Self {
            node_shape: "circle",
            initial_shape: "doublecircle",
            terminal_shape: "box",
            success_color: "darkgreen",
            failure_color: "red",
        }
    }
}

fn escape(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}

impl Lts {
    pub fn to_dot(&self) -> Result<String, std::fmt::Error> {
        self.to_dot_with_config(&DotConfig::default())
    }

    pub fn to_dot_with_config(&self, config: &DotConfig) -> Result<String, std::fmt::Error> {
        let mut dot = String::new();
        writeln!(dot, "digraph {{")?;
        writeln!(dot, "node [shape={}];", config.node_shape)?;

        for s in self.states() {
            if s == self.initial_state() {
                writeln!(dot, "{} [shape={}];", s, config.initial_shape)?;
            } else {
                writeln!(dot, "{};", s)?;
            }
        }
        for (s, a, t) in self.arcs() {
            writeln!(dot, "{} -> {} [label=\"{}\"];", s, t, escape(a.as_str()))?;
        }

        writeln!(dot, "}}")?;
        Ok(dot)
    }
}

impl<S: Debug> Tableau<S> {
    /// Render the tableau with every node labeled by its state and formula.
    pub fn to_dot(&self, pool: &TermPool) -> Result<String, std::fmt::Error> {
        self.to_dot_with_config(pool, &DotConfig::default())
    }

    pub fn to_dot_with_config(&self, pool: &TermPool, config: &DotConfig) -> Result<String, std::fmt::Error> {
        let mut dot = String::new();
        writeln!(dot, "digraph {{")?;
        writeln!(dot, "node [shape={}];", config.node_shape)?;

        for (id, node) in self.nodes() {
            let shape = match node.kind {
                _ if id == self.root() => config.initial_shape,
                NodeKind::True | NodeKind::False => config.terminal_shape,
                _ => config.node_shape,
            };
            let color = if node.success {
                config.success_color
            } else {
                config.failure_color
            };
            let mut label = escape(&format!("{:?} ⊢ {}", node.state, pool.display(node.formula)));
            if let Some(a) = &node.missing {
                write!(label, "\\nmissing {}", escape(a.as_str()))?;
            }
            writeln!(dot, "{} [shape={}, color={}, label=\"{}\"];", id, shape, color, label)?;
        }
        for (id, node) in self.nodes() {
            for c in &node.children {
                writeln!(dot, "{} -> {};", id, c)?;
            }
        }

        writeln!(dot, "}}")?;
        Ok(dot)
    }
}
