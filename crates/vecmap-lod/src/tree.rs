//! Blend quadtree producing each frame's draw list.
//!
//! Nodes mirror the tile hierarchy and live in an arena addressed by index.
//! Top-layer nodes hang off an implicit root. Each frame the tree is walked
//! top-down against the visible tile windows:
//!
//! - nodes outside the window are dropped with their subtree
//! - missing nodes are created only down to the desired layer
//! - blend moves toward 1 at or above the desired layer and toward 0 below it
//! - a node whose on-screen children are all opaque is not drawn, but keeps
//!   its blend so it can reappear at once if a child goes away

use rustc_hash::FxHashSet;
use tracing::trace;
use vecmap_tile::layers::children_per_axis;
use vecmap_tile::{NR_LAYERS, TOP_LAYER, TilePosition};

use crate::viewport::{ScreenEdges, TileEdges, all_tile_edges, layer_for_scale};

/// Answers whether a tile's geometry is ready to draw without blocking.
pub trait TileAvailability {
    fn is_loaded(&self, pos: TilePosition) -> bool;
}

impl<F: Fn(TilePosition) -> bool> TileAvailability for F {
    fn is_loaded(&self, pos: TilePosition) -> bool {
        self(pos)
    }
}

/// One entry of the draw list.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DrawItem {
    pub position: TilePosition,
    pub blend: f32,
}

/// Blend state of one node, for inspection.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct NodeState {
    pub blend: f32,
    pub drawn_blend: f32,
    pub fully_overdrawn: bool,
}

#[derive(Clone, Debug)]
pub struct LodConfig {
    /// Seconds for a tile to blend fully in or out.
    pub blend_duration_secs: f32,
}

impl Default for LodConfig {
    fn default() -> Self {
        Self {
            blend_duration_secs: 1.0 / 3.0,
        }
    }
}

struct TileNode {
    pos: TilePosition,
    /// Row-major child slots, `children_per_axis(layer)^2` of them.
    children: Vec<Option<usize>>,
    blend: f32,
    drawn_blend: f32,
    fully_overdrawn: bool,
}

struct Frame<'a, A: ?Sized> {
    tile_edges: [TileEdges; NR_LAYERS],
    desired: u8,
    step: f32,
    prev_edges: Option<ScreenEdges>,
    tiles: &'a A,
}

/// The LOD blend tree. Single-threaded; owned by the render thread.
pub struct LodTree {
    nodes: Vec<TileNode>,
    free: Vec<usize>,
    roots: Vec<usize>,
    blend_rate: f32,
    prev_edges: Option<ScreenEdges>,
    desired_layer: Option<u8>,
}

impl LodTree {
    pub fn new(config: &LodConfig) -> Self {
        let blend_rate = if config.blend_duration_secs > 0.0 {
            1.0 / config.blend_duration_secs
        } else {
            f32::INFINITY
        };
        Self {
            nodes: Vec::new(),
            free: Vec::new(),
            roots: Vec::new(),
            blend_rate,
            prev_edges: None,
            desired_layer: None,
        }
    }

    /// Advances one frame and returns the tiles to draw, parents before children.
    ///
    /// `elapsed` is seconds since the previous frame; negative or non-finite
    /// values count as no time passing.
    pub fn get_draw_order<A: TileAvailability + ?Sized>(
        &mut self,
        edges: ScreenEdges,
        scale: f32,
        elapsed: f32,
        tiles: &A,
    ) -> Vec<DrawItem> {
        let desired = layer_for_scale(scale);
        let step = if elapsed.is_finite() && elapsed > 0.0 {
            elapsed * self.blend_rate
        } else {
            0.0
        };
        let frame = Frame {
            tile_edges: all_tile_edges(&edges),
            desired,
            step,
            prev_edges: self.prev_edges,
            tiles,
        };

        let top = frame.tile_edges[TOP_LAYER as usize];
        let mut kept = Vec::new();
        for id in std::mem::take(&mut self.roots) {
            let pos = self.nodes[id].pos;
            if top.contains(pos.tx(), pos.ty()) {
                kept.push(id);
            } else {
                self.remove_subtree(id);
            }
        }
        for pos in top.positions(TOP_LAYER) {
            let id = match kept.iter().find(|&&id| self.nodes[id].pos == pos) {
                Some(&id) => id,
                None => self.create(pos, &frame),
            };
            self.roots.push(id);
            self.visit(id, false, &frame);
        }

        let mut draw = Vec::new();
        for &id in &self.roots {
            self.collect(id, &mut draw);
        }

        if self.desired_layer != Some(desired) {
            trace!("Desired layer now {desired}");
        }
        trace!(
            "LOD frame: {} nodes, {} drawn, desired layer {desired}",
            self.node_count(),
            draw.len()
        );
        self.prev_edges = Some(edges);
        self.desired_layer = Some(desired);
        draw
    }

    fn visit<A: TileAvailability + ?Sized>(
        &mut self,
        id: usize,
        covered: bool,
        frame: &Frame<'_, A>,
    ) {
        let pos = self.nodes[id].pos;
        let layer = pos.layer();
        let loaded = frame.tiles.is_loaded(pos);

        let node = &mut self.nodes[id];
        node.blend = if !loaded {
            0.0
        } else if layer >= frame.desired {
            (node.blend + frame.step).min(1.0)
        } else if covered {
            (node.blend - frame.step).max(0.0)
        } else {
            node.blend
        };
        // A loaded tile at or above the desired layer lets finer ones fade out.
        let child_covered = covered || (loaded && layer <= frame.desired);

        let mut overdrawn = false;
        if layer > 0 {
            let child_layer = layer - 1;
            let n = children_per_axis(layer);
            let (bx, by) = (pos.tx() * n, pos.ty() * n);
            let range =
                frame.tile_edges[child_layer as usize].intersect(&TileEdges::children_of(pos));
            let mut children = std::mem::take(&mut self.nodes[id].children);

            for (slot, child) in children.iter_mut().enumerate() {
                if let Some(child_id) = *child {
                    let (cx, cy) = (bx + slot as u32 % n, by + slot as u32 / n);
                    if !range.contains(cx, cy) {
                        self.remove_subtree(child_id);
                        *child = None;
                    }
                }
            }

            overdrawn = !range.is_empty();
            for cpos in range.positions(child_layer) {
                let slot = ((cpos.ty() - by) * n + (cpos.tx() - bx)) as usize;
                let child_id = match children[slot] {
                    Some(child_id) => child_id,
                    None if child_layer >= frame.desired => {
                        let child_id = self.create(cpos, frame);
                        children[slot] = Some(child_id);
                        child_id
                    }
                    None => {
                        overdrawn = false;
                        continue;
                    }
                };

                self.visit(child_id, child_covered, frame);

                let child = &self.nodes[child_id];
                if child_layer < frame.desired
                    && child.blend == 0.0
                    && child.children.iter().all(Option::is_none)
                {
                    self.release(child_id);
                    children[slot] = None;
                    overdrawn = false;
                    continue;
                }
                if child.blend < 1.0 && !child.fully_overdrawn {
                    overdrawn = false;
                }
            }
            self.nodes[id].children = children;
        }

        let node = &mut self.nodes[id];
        node.fully_overdrawn = overdrawn;
        node.drawn_blend = if node.blend > 0.0 && overdrawn {
            0.0
        } else {
            node.blend
        };
    }

    fn collect(&self, id: usize, out: &mut Vec<DrawItem>) {
        let node = &self.nodes[id];
        if node.drawn_blend > 0.0 {
            out.push(DrawItem {
                position: node.pos,
                blend: node.drawn_blend,
            });
        }
        for &child in node.children.iter().flatten() {
            self.collect(child, out);
        }
    }

    fn create<A: ?Sized>(&mut self, pos: TilePosition, frame: &Frame<'_, A>) -> usize {
        // Tiles already on screen last frame fade in; newly panned-in ones appear at once.
        let blend = match frame.prev_edges {
            Some(prev) if ScreenEdges::from_tile(pos).intersects(&prev) => 0.0,
            _ => 1.0,
        };
        let n = children_per_axis(pos.layer()) as usize;
        let node = TileNode {
            pos,
            children: vec![None; n * n],
            blend,
            drawn_blend: 0.0,
            fully_overdrawn: false,
        };
        match self.free.pop() {
            Some(id) => {
                self.nodes[id] = node;
                id
            }
            None => {
                self.nodes.push(node);
                self.nodes.len() - 1
            }
        }
    }

    fn release(&mut self, id: usize) {
        self.nodes[id].children.clear();
        self.free.push(id);
    }

    fn remove_subtree(&mut self, id: usize) {
        let children = std::mem::take(&mut self.nodes[id].children);
        for child in children.into_iter().flatten() {
            self.remove_subtree(child);
        }
        self.free.push(id);
    }

    fn find(&self, pos: TilePosition) -> Option<usize> {
        let mut path = vec![pos];
        while let Some(parent) = path.last().and_then(|p| p.parent()) {
            path.push(parent);
        }
        let top = path.pop()?;
        let mut id = *self.roots.iter().find(|&&id| self.nodes[id].pos == top)?;
        while let Some(next) = path.pop() {
            let parent = self.nodes[id].pos;
            let n = children_per_axis(parent.layer());
            let slot = ((next.ty() - parent.ty() * n) * n + (next.tx() - parent.tx() * n)) as usize;
            id = (*self.nodes[id].children.get(slot)?)?;
        }
        Some(id)
    }

    /// Blend state of the node at `pos`, if it is in the tree.
    pub fn node_state(&self, pos: TilePosition) -> Option<NodeState> {
        self.find(pos).map(|id| {
            let node = &self.nodes[id];
            NodeState {
                blend: node.blend,
                drawn_blend: node.drawn_blend,
                fully_overdrawn: node.fully_overdrawn,
            }
        })
    }

    /// Positions of every node with a nonzero blend, including overdrawn ones.
    ///
    /// These tiles are on screen or about to be, so the store must not evict them.
    pub fn active_positions(&self) -> FxHashSet<TilePosition> {
        let mut out = FxHashSet::default();
        let mut stack: Vec<usize> = self.roots.clone();
        while let Some(id) = stack.pop() {
            let node = &self.nodes[id];
            if node.blend > 0.0 {
                out.insert(node.pos);
            }
            stack.extend(node.children.iter().flatten());
        }
        out
    }

    /// Live nodes in the tree.
    pub fn node_count(&self) -> usize {
        self.nodes.len() - self.free.len()
    }

    /// Layer selected by the most recent frame.
    pub fn desired_layer(&self) -> Option<u8> {
        self.desired_layer
    }

    /// Drops every node.
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.free.clear();
        self.roots.clear();
        self.prev_edges = None;
    }
}
