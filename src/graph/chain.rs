// Shortest reference chain search

use crate::object::{EdgeSource, Inspect, ObjectId, ObjectSpace, Referents, Referrers};
use std::collections::{HashMap, HashSet, VecDeque};

/// Default search depth for chain lookups
pub const DEFAULT_CHAIN_DEPTH: usize = 20;

/// Breadth-first search from `start` to the nearest object matching
/// `predicate`.
///
/// The returned chain starts at the matching object and ends at `start`.
/// When nothing matches within `max_depth` hops the chain is just `[start]`.
pub fn find_chain<P>(
    space: &dyn ObjectSpace,
    start: ObjectId,
    predicate: P,
    edges: &dyn EdgeSource,
    max_depth: usize,
    extra_ignore: &HashSet<ObjectId>,
) -> Vec<ObjectId>
where
    P: Fn(ObjectId, &dyn Inspect) -> bool,
{
    let mut queue = VecDeque::from([start]);
    let mut depth: HashMap<ObjectId, usize> = HashMap::from([(start, 0)]);
    let mut parent: HashMap<ObjectId, Option<ObjectId>> = HashMap::from([(start, None)]);

    while let Some(target) = queue.pop_front() {
        let Some(obj) = space.get(target) else {
            continue;
        };
        if predicate(target, obj) {
            let mut chain = vec![target];
            let mut cursor = target;
            while let Some(Some(next)) = parent.get(&cursor) {
                chain.push(*next);
                cursor = *next;
            }
            tracing::debug!(length = chain.len(), "reference chain found");
            return chain;
        }

        let tdepth = depth[&target];
        if tdepth >= max_depth {
            continue;
        }
        for source in edges.neighbors(target) {
            if extra_ignore.contains(&source) || depth.contains_key(&source) {
                continue;
            }
            depth.insert(source, tdepth + 1);
            parent.insert(source, Some(target));
            queue.push_back(source);
        }
    }

    tracing::debug!(visited = depth.len(), "no reference chain found");
    vec![start]
}

/// Chain of referrers leading to `obj`, matching object first
pub fn find_backref_chain<P>(
    space: &dyn ObjectSpace,
    obj: ObjectId,
    predicate: P,
    max_depth: usize,
    extra_ignore: &HashSet<ObjectId>,
) -> Vec<ObjectId>
where
    P: Fn(ObjectId, &dyn Inspect) -> bool,
{
    find_chain(space, obj, predicate, &Referrers(space), max_depth, extra_ignore)
}

/// Chain of references leading from `obj`, `obj` first
pub fn find_ref_chain<P>(
    space: &dyn ObjectSpace,
    obj: ObjectId,
    predicate: P,
    max_depth: usize,
    extra_ignore: &HashSet<ObjectId>,
) -> Vec<ObjectId>
where
    P: Fn(ObjectId, &dyn Inspect) -> bool,
{
    let mut chain = find_chain(space, obj, predicate, &Referents(space), max_depth, extra_ignore);
    chain.reverse();
    chain
}
