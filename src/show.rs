// One-call diagram helpers
//
// Build a diagram and hand it straight to a presenter.

use crate::error::{Error, Result};
use crate::graph::{Direction, GraphBuilder, GraphOptions};
use crate::object::{EdgeSource, ObjectId, ObjectSpace, Referents, Referrers};
use crate::output::{GraphOutput, Presentation, Presenter};
use std::collections::HashSet;

/// Build a diagram from `roots` over `edges` and present it
///
/// Conflicting output destinations are rejected before any traversal.
pub fn show_graph(
    space: &dyn ObjectSpace,
    roots: &[ObjectId],
    edges: &dyn EdgeSource,
    direction: Direction,
    options: GraphOptions<'_>,
    output: GraphOutput<'_>,
    presenter: &Presenter<'_>,
) -> Result<Presentation> {
    output.validate()?;
    let diagram = GraphBuilder::new(space, options).build(roots, edges, direction)?;
    presenter.show(&diagram, output)
}

/// Show what refers to `roots`, directly and indirectly
pub fn show_backrefs(
    space: &dyn ObjectSpace,
    roots: &[ObjectId],
    options: GraphOptions<'_>,
    output: GraphOutput<'_>,
    presenter: &Presenter<'_>,
) -> Result<Presentation> {
    show_graph(
        space,
        roots,
        &Referrers(space),
        Direction::Backward,
        options,
        output,
        presenter,
    )
}

/// Show what is reachable from `roots`
pub fn show_refs(
    space: &dyn ObjectSpace,
    roots: &[ObjectId],
    options: GraphOptions<'_>,
    output: GraphOutput<'_>,
    presenter: &Presenter<'_>,
) -> Result<Presentation> {
    show_graph(
        space,
        roots,
        &Referents(space),
        Direction::Forward,
        options,
        output,
        presenter,
    )
}

/// Draw only the objects on the given chains
///
/// Chains are ordered as the chain finders return them: with `backrefs`
/// the last element of each chain is a root, otherwise the first is.
/// `options.filter` and `options.max_depth` are replaced.
pub fn show_chain(
    space: &dyn ObjectSpace,
    chains: &[Vec<ObjectId>],
    backrefs: bool,
    options: GraphOptions<'_>,
    output: GraphOutput<'_>,
    presenter: &Presenter<'_>,
) -> Result<Presentation> {
    let chains: Vec<&Vec<ObjectId>> = chains.iter().filter(|c| !c.is_empty()).collect();
    let longest = chains
        .iter()
        .map(|c| c.len())
        .max()
        .ok_or_else(|| Error::argument("at least one non-empty chain is required"))?;

    let members: HashSet<ObjectId> = chains.iter().flat_map(|c| c.iter().copied()).collect();
    let options = options
        .max_depth(longest - 1)
        .filter(move |id, _| members.contains(&id));

    if backrefs {
        let roots: Vec<ObjectId> = chains.iter().filter_map(|c| c.last().copied()).collect();
        show_backrefs(space, &roots, options, output, presenter)
    } else {
        let roots: Vec<ObjectId> = chains.iter().filter_map(|c| c.first().copied()).collect();
        show_refs(space, &roots, options, output, presenter)
    }
}
