//! Min-cut seam optimization. A patch of the candidate atlas (layer A) is
//! laid over the matching patch of the example (layer B); the solver returns
//! the binary compositing mask for layer A that cuts along the cheapest seam
//! allowed by the constraint labels.

use std::collections::VecDeque;

use image::{Luma, Rgb, RgbImage};

use crate::{img, unsync::UnsyncGrayImage, Error, Patch};

pub const CONSTRAINT_COLOR_SOURCE: Rgb<u8> = Rgb([255, 0, 0]);
pub const CONSTRAINT_COLOR_SINK: Rgb<u8> = Rgb([0, 255, 0]);
pub const CONSTRAINT_COLOR_FREE: Rgb<u8> = Rgb([100, 100, 100]);

const INFINITE_CAPACITY: f32 = f32::INFINITY;

/// Per-tile solver record.
#[derive(Copy, Clone, Debug, Default)]
pub struct AlgoStats {
    /// Augmenting paths pushed before the cut was found.
    pub iteration_count: u32,
    /// Accumulated flow, which equals the cost of the cut.
    pub max_flow: f32,
}

struct Edge {
    target: u32,
    capacity: f32,
    flow: f32,
    /// Index of the paired reverse edge in the target node's edge list.
    /// Edge lists are append-only, so stored indices stay valid.
    rev: u32,
}

#[derive(Default)]
struct Node {
    edges: Vec<Edge>,
}

#[derive(Copy, Clone, PartialEq)]
enum Visit {
    Unvisited,
    Root,
    Via { node: u32, edge: u32 },
}

pub(crate) struct GraphCut {
    nodes: Vec<Node>,
    visit: Vec<Visit>,
    queue: VecDeque<u32>,
    patch_size: u32,
}

impl GraphCut {
    /// Builds the pixel-adjacency graph for `patch_a` over `patch_b`.
    ///
    /// The constraints image must match the patch size and label every pixel
    /// SOURCE (keep layer A), SINK (keep layer B) or FREE.
    pub fn new(
        image_a: &RgbImage,
        patch_a: Patch,
        image_b: &RgbImage,
        patch_b: Patch,
        constraints: &RgbImage,
    ) -> Result<Self, Error> {
        let size = patch_a.size;
        if size < 2 || size != patch_b.size {
            return Err(Error::InvalidPatchSize {
                a: size,
                b: patch_b.size,
            });
        }
        if constraints.width() != size || constraints.height() != size {
            return Err(Error::InvalidPatchSize {
                a: size,
                b: constraints.width(),
            });
        }

        let node_count = (size * size + 2) as usize;
        let mut cut = Self {
            nodes: (0..node_count).map(|_| Node::default()).collect(),
            visit: vec![Visit::Unvisited; node_count],
            queue: VecDeque::new(),
            patch_size: size,
        };

        for y in 0..size {
            for x in 0..size {
                if y > 0 {
                    cut.link_pixels(image_a, patch_a, image_b, patch_b, (x, y), (x, y - 1));
                }
                if y < size - 1 {
                    cut.link_pixels(image_a, patch_a, image_b, patch_b, (x, y), (x, y + 1));
                }
                if x > 0 {
                    cut.link_pixels(image_a, patch_a, image_b, patch_b, (x, y), (x - 1, y));
                }
                if x < size - 1 {
                    cut.link_pixels(image_a, patch_a, image_b, patch_b, (x, y), (x + 1, y));
                }
            }
        }

        let source = cut.source_index();
        let sink = cut.sink_index();
        let mut source_pixels = 0u32;
        let mut sink_pixels = 0u32;
        for y in 0..size {
            for x in 0..size {
                let label = *constraints.get_pixel(x, y);
                if label == CONSTRAINT_COLOR_SOURCE {
                    cut.link(cut.pixel_index(x, y), source, INFINITE_CAPACITY);
                    source_pixels += 1;
                } else if label == CONSTRAINT_COLOR_SINK {
                    cut.link(cut.pixel_index(x, y), sink, INFINITE_CAPACITY);
                    sink_pixels += 1;
                }
            }
        }
        if source_pixels == 0 {
            return Err(Error::MalformedConstraints("no source pixels"));
        }
        if sink_pixels == 0 {
            return Err(Error::MalformedConstraints("no sink pixels"));
        }

        Ok(cut)
    }

    /// Runs the max-flow solver and writes the cut mask into `mask` at
    /// `mask_patch`: 255 where layer A survives, 0 where layer B shows.
    pub fn compute_cut_mask(
        &mut self,
        mask: &UnsyncGrayImage,
        mask_patch: Patch,
    ) -> Result<AlgoStats, Error> {
        let size = self.patch_size;
        if size != mask_patch.size {
            return Err(Error::InvalidPatchSize {
                a: size,
                b: mask_patch.size,
            });
        }
        {
            let dst = mask.as_ref();
            if mask_patch.x + size > dst.width() || mask_patch.y + size > dst.height() {
                return Err(Error::InvalidPatchSize {
                    a: size,
                    b: dst.width(),
                });
            }
        }

        let stats = self.max_flow()?;

        // one full BFS over the residual graph; the reachable set is the
        // source side of the cut
        self.bfs(false);
        for y in 0..size {
            for x in 0..size {
                let reachable =
                    self.visit[self.pixel_index(x, y) as usize] != Visit::Unvisited;
                mask.put_pixel(
                    x + mask_patch.x,
                    y + mask_patch.y,
                    Luma([if reachable { 255 } else { 0 }]),
                );
            }
        }
        Ok(stats)
    }

    fn max_flow(&mut self) -> Result<AlgoStats, Error> {
        let source = self.source_index();
        let sink = self.sink_index();
        let mut stats = AlgoStats::default();
        loop {
            self.bfs(true);
            if self.visit[sink as usize] == Visit::Unvisited {
                break;
            }

            // minimum residual capacity along the predecessor chain;
            // infinite edges do not constrain the bottleneck
            let mut flow = INFINITE_CAPACITY;
            let mut cur = sink;
            while cur != source {
                let (pnode, pedge) = self.prev_step(cur);
                let edge = &self.nodes[pnode as usize].edges[pedge as usize];
                flow = flow.min(edge.capacity - edge.flow);
                cur = pnode;
            }
            if flow.is_infinite() {
                // the only all-infinite path is source -> pixel -> sink
                return Err(Error::MalformedConstraints(
                    "a pixel is wired to both source and sink",
                ));
            }

            let mut cur = sink;
            while cur != source {
                let (pnode, pedge) = self.prev_step(cur);
                let (target, rev, pushed) = {
                    let edge = &mut self.nodes[pnode as usize].edges[pedge as usize];
                    edge.flow += flow;
                    (edge.target, edge.rev, edge.flow)
                };
                self.nodes[target as usize].edges[rev as usize].flow = -pushed;
                cur = pnode;
            }
            stats.max_flow += flow;
            stats.iteration_count += 1;
        }
        Ok(stats)
    }

    /// FIFO search over edges with positive residual capacity, recording
    /// predecessors. Neighbor order is construction order, which makes the
    /// cut deterministic for symmetric weights.
    fn bfs(&mut self, stop_on_sink: bool) {
        let source = self.source_index();
        let sink = self.sink_index();
        for v in self.visit.iter_mut() {
            *v = Visit::Unvisited;
        }
        self.queue.clear();
        self.visit[source as usize] = Visit::Root;
        self.queue.push_back(source);

        while let Some(cur) = self.queue.pop_front() {
            for (i, edge) in self.nodes[cur as usize].edges.iter().enumerate() {
                if self.visit[edge.target as usize] != Visit::Unvisited {
                    continue;
                }
                if edge.flow < edge.capacity {
                    self.visit[edge.target as usize] = Visit::Via {
                        node: cur,
                        edge: i as u32,
                    };
                    self.queue.push_back(edge.target);
                }
            }
            if stop_on_sink && self.visit[sink as usize] != Visit::Unvisited {
                break;
            }
        }
    }

    fn prev_step(&self, node: u32) -> (u32, u32) {
        match self.visit[node as usize] {
            Visit::Via { node, edge } => (node, edge),
            _ => unreachable!("predecessor chain broken at node {}", node),
        }
    }

    // weights must stay symmetric: both directions carry the same capacity
    fn link_pixels(
        &mut self,
        image_a: &RgbImage,
        patch_a: Patch,
        image_b: &RgbImage,
        patch_b: Patch,
        p: (u32, u32),
        q: (u32, u32),
    ) {
        let n0 = self.pixel_index(p.0, p.1);
        let n1 = self.pixel_index(q.0, q.1);
        if n0 > n1 {
            return;
        }

        let a0 = img::to_vec3(*image_a.get_pixel(patch_a.x + p.0, patch_a.y + p.1));
        let a1 = img::to_vec3(*image_a.get_pixel(patch_a.x + q.0, patch_a.y + q.1));
        let b0 = img::to_vec3(*image_b.get_pixel(patch_b.x + p.0, patch_b.y + p.1));
        let b1 = img::to_vec3(*image_b.get_pixel(patch_b.x + q.0, patch_b.y + q.1));
        let cost = img::distance(a0, b0) + img::distance(a1, b1) + 1.0;

        self.link(n0, n1, cost);
    }

    fn link(&mut self, n0: u32, n1: u32, capacity: f32) {
        let e0 = self.nodes[n0 as usize].edges.len() as u32;
        let e1 = self.nodes[n1 as usize].edges.len() as u32;
        self.nodes[n0 as usize].edges.push(Edge {
            target: n1,
            capacity,
            flow: 0.0,
            rev: e1,
        });
        self.nodes[n1 as usize].edges.push(Edge {
            target: n0,
            capacity,
            flow: 0.0,
            rev: e0,
        });
    }

    #[inline]
    fn pixel_index(&self, x: u32, y: u32) -> u32 {
        y * self.patch_size + x
    }

    #[inline]
    fn source_index(&self) -> u32 {
        self.patch_size * self.patch_size
    }

    #[inline]
    fn sink_index(&self) -> u32 {
        self.patch_size * self.patch_size + 1
    }
}
