//! Task/dependency lists → renderable graph model.
//!
//! The model is purely semantic: ids, sizes, colours and edges. Coordinates
//! belong to a [`LayoutEngine`], which is a separate collaborator so that
//! [`GraphModelBuilder::build`] stays deterministic.

use std::collections::HashSet;
use std::fmt;

use ow_api_types::{Dependency, Task, TaskStatus};
use rand::Rng;
use serde::{Deserialize, Serialize};

pub const MIN_NODE_SIZE: f64 = 40.0;
pub const MAX_NODE_SIZE: f64 = 140.0;
const SIZE_SCALE: f64 = 25.0;

/// Characters of the description kept in a node summary.
pub const SUMMARY_TITLE_CHARS: usize = 32;
const ELLIPSIS: char = '…';
const PLACEHOLDER: &str = "-";

// ---------------------------------------------------------------------------
// ColorKey
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColorKey {
    Green,
    Blue,
    Red,
    Gray,
}

impl ColorKey {
    /// Status → colour. Anything that is not done/doing/failed, including
    /// statuses this client has never heard of, is neutral gray.
    pub fn for_status(status: &TaskStatus) -> Self {
        match status {
            TaskStatus::Done => ColorKey::Green,
            TaskStatus::Doing => ColorKey::Blue,
            TaskStatus::Failed => ColorKey::Red,
            TaskStatus::Todo
            | TaskStatus::Blocked
            | TaskStatus::Skipped
            | TaskStatus::BudgetExceeded
            | TaskStatus::Other(_) => ColorKey::Gray,
        }
    }

    pub fn hex(self) -> &'static str {
        match self {
            ColorKey::Green => "#22c55e",
            ColorKey::Blue => "#3b82f6",
            ColorKey::Red => "#ef4444",
            ColorKey::Gray => "#64748b",
        }
    }
}

/// Node diameter in pixels: `clamp(log2(bv + 1) * 25 + 40, 40, 140)`.
///
/// A missing business value counts as 1. Negative values are floored at 0
/// and NaN maps to the minimum size, so the result is always in range.
pub fn node_size(business_value: Option<f64>) -> f64 {
    let bv = match business_value {
        None => 1.0,
        Some(v) if v.is_nan() => 0.0,
        Some(v) => v.max(0.0),
    };
    ((bv + 1.0).log2() * SIZE_SCALE + MIN_NODE_SIZE).clamp(MIN_NODE_SIZE, MAX_NODE_SIZE)
}

// ---------------------------------------------------------------------------
// Model
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeSummary {
    pub title: String,
    pub business_value: Option<f64>,
    pub tokens_plan: Option<u64>,
    pub tokens_actual: Option<u64>,
    pub status: TaskStatus,
}

impl NodeSummary {
    fn from_task(task: &Task) -> Self {
        Self {
            title: truncate_title(&task.description),
            business_value: task.business_value,
            tokens_plan: task.tokens_plan,
            tokens_actual: task.tokens_actual,
            status: task.status.clone(),
        }
    }
}

impl fmt::Display for NodeSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} | BV: {} | tokens plan/actual: {} / {} | status: {}",
            self.title,
            placeholder(self.business_value),
            placeholder(self.tokens_plan),
            placeholder(self.tokens_actual),
            self.status
        )
    }
}

fn placeholder<T: fmt::Display>(value: Option<T>) -> String {
    value
        .map(|v| v.to_string())
        .unwrap_or_else(|| PLACEHOLDER.to_string())
}

fn truncate_title(description: &str) -> String {
    let mut chars = description.chars();
    let head: String = chars.by_ref().take(SUMMARY_TITLE_CHARS).collect();
    if chars.next().is_some() {
        format!("{head}{ELLIPSIS}")
    } else {
        head
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphNode {
    pub id: String,
    pub size_px: f64,
    pub color_key: ColorKey,
    pub summary: NodeSummary,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct GraphEdge {
    pub id: String,
    pub source: String,
    pub target: String,
}

impl GraphEdge {
    pub fn edge_id(from_id: &str, to_id: &str) -> String {
        format!("{from_id}->{to_id}")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GraphModel {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
}

impl GraphModel {
    pub fn node(&self, id: &str) -> Option<&GraphNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

pub struct GraphModelBuilder;

impl GraphModelBuilder {
    /// Build the semantic graph for a task snapshot.
    ///
    /// Nodes keep task order; a repeated task id keeps its first occurrence.
    /// Edges keep dependency order; dangling edges (either end missing from
    /// `tasks`) and repeats of an already emitted edge id are dropped.
    pub fn build(tasks: &[Task], dependencies: &[Dependency]) -> GraphModel {
        let mut ids: HashSet<&str> = HashSet::with_capacity(tasks.len());
        let nodes: Vec<GraphNode> = tasks
            .iter()
            .filter(|t| ids.insert(t.id.as_str()))
            .map(|t| GraphNode {
                id: t.id.clone(),
                size_px: node_size(t.business_value),
                color_key: ColorKey::for_status(&t.status),
                summary: NodeSummary::from_task(t),
            })
            .collect();

        let mut seen_edges: HashSet<String> = HashSet::new();
        let mut dangling = 0usize;
        let mut edges = Vec::with_capacity(dependencies.len());
        for dep in dependencies {
            if !ids.contains(dep.from_id.as_str()) || !ids.contains(dep.to_id.as_str()) {
                dangling += 1;
                continue;
            }
            let id = GraphEdge::edge_id(&dep.from_id, &dep.to_id);
            if !seen_edges.insert(id.clone()) {
                continue;
            }
            edges.push(GraphEdge {
                id,
                source: dep.from_id.clone(),
                target: dep.to_id.clone(),
            });
        }

        if dangling > 0 {
            tracing::debug!(dangling, "dropped dependencies referencing unknown tasks");
        }

        GraphModel { nodes, edges }
    }
}

// ---------------------------------------------------------------------------
// Layout
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PositionedNode {
    pub id: String,
    pub position: Position,
}

/// Turns a semantic graph into on-screen coordinates.
pub trait LayoutEngine {
    fn place(&self, model: &GraphModel) -> Vec<PositionedNode>;
}

/// Uniform random placement in `[0, side)²`.
///
/// Non-deterministic: two calls on the same model yield different
/// coordinates. Only node ids are stable across calls.
#[derive(Debug, Clone, Copy)]
pub struct RandomLayout {
    pub side: f64,
}

impl Default for RandomLayout {
    fn default() -> Self {
        Self { side: 600.0 }
    }
}

impl LayoutEngine for RandomLayout {
    fn place(&self, model: &GraphModel) -> Vec<PositionedNode> {
        let mut rng = rand::thread_rng();
        let side = if self.side.is_finite() { self.side } else { 0.0 };
        model
            .nodes
            .iter()
            .map(|n| {
                let position = if side > 0.0 {
                    Position {
                        x: rng.gen_range(0.0..side),
                        y: rng.gen_range(0.0..side),
                    }
                } else {
                    Position { x: 0.0, y: 0.0 }
                };
                PositionedNode {
                    id: n.id.clone(),
                    position,
                }
            })
            .collect()
    }
}
