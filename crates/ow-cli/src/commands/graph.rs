use ow_core::graph::{GraphModel, LayoutEngine, PositionedNode, RandomLayout};
use serde::Serialize;

use super::AppContext;

#[derive(Debug, Serialize)]
struct GraphOutput {
    #[serde(flatten)]
    graph: GraphModel,
    #[serde(skip_serializing_if = "Option::is_none")]
    positions: Option<Vec<PositionedNode>>,
}

/// Run the `graph` subcommand: print the graph model as JSON.
pub async fn run(ctx: &AppContext, layout: bool) -> anyhow::Result<()> {
    let model = ctx.snapshot().await?;
    println!("{}", render(model.graph(), layout)?);
    Ok(())
}

pub fn render(graph: GraphModel, layout: bool) -> anyhow::Result<String> {
    let positions = layout.then(|| RandomLayout::default().place(&graph));
    let out = GraphOutput { graph, positions };
    Ok(serde_json::to_string_pretty(&out)?)
}
