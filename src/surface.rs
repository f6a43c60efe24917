//! Isosurface extraction by marching tetrahedra inside each grid cube.
//!
//! This is not table-driven marching cubes: there are no 256-case lookup
//! tables and no ambiguous face cases to resolve. Every cell of the grid is visited; cells whose eight corners all lie on the
//! same side of the iso level are skipped. A crossing cell is split into six
//! tetrahedra around its main diagonal (corner 0 to corner 7) and each
//! tetrahedron is polygonised on its own. Neighbouring cells split their shared
//! faces along the same diagonal, so the output has no cracks.
//!
//! Vertices live on grid edges and are shared through an edge-keyed lookup, so
//! the mesh is indexed and every edge of a closed surface is used by exactly two
//! triangles. Normals point out of the blob (down the field gradient).
//!
//! ```text
//!       6-------7        corner bit 0 = +x
//!      /|      /|               bit 1 = +y
//!     4-------5 |               bit 2 = +z
//!     | 2-----|-3
//!     |/      |/
//!     0-------1
//! ```

use crate::field::FieldGrid;
use bytemuck::{Pod, Zeroable};
use glam::Vec3;
use std::collections::HashMap;

/// Corner offsets, indexed by the bit layout in the module docs.
const CORNERS: [[usize; 3]; 8] = [
    [0, 0, 0],
    [1, 0, 0],
    [0, 1, 0],
    [1, 1, 0],
    [0, 0, 1],
    [1, 0, 1],
    [0, 1, 1],
    [1, 1, 1],
];

/// Six tetrahedra sharing the 0-7 diagonal, one per axis ordering.
const TETRAHEDRA: [[usize; 4]; 6] = [
    [0, 1, 3, 7],
    [0, 1, 5, 7],
    [0, 2, 3, 7],
    [0, 2, 6, 7],
    [0, 4, 5, 7],
    [0, 4, 6, 7],
];

/// GPU-ready vertex: position and outward normal in normalized field space.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct MeshVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
}

/// Indexed triangle mesh handed to the rendering backend.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Mesh {
    pub vertices: Vec<MeshVertex>,
    /// Three indices per triangle, counter-clockwise seen from outside.
    pub indices: Vec<u32>,
}

impl Mesh {
    /// Number of triangles.
    #[inline]
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Whether the mesh has no triangles.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Drop all geometry while keeping allocations.
    pub fn clear(&mut self) {
        self.vertices.clear();
        self.indices.clear();
    }

    /// Vertex buffer as raw bytes for upload.
    pub fn vertex_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.vertices)
    }

    /// Index buffer as raw bytes for upload.
    pub fn index_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.indices)
    }

    /// Triangle corner positions.
    pub fn triangles(&self) -> impl Iterator<Item = [Vec3; 3]> + '_ {
        self.indices.chunks_exact(3).map(move |tri| {
            [tri[0], tri[1], tri[2]].map(|i| Vec3::from_array(self.vertices[i as usize].position))
        })
    }

    /// Axis-aligned bounds of all vertices.
    pub fn bounds(&self) -> Option<(Vec3, Vec3)> {
        let mut iter = self.vertices.iter().map(|v| Vec3::from_array(v.position));
        let first = iter.next()?;
        Some(iter.fold((first, first), |(lo, hi), p| (lo.min(p), hi.max(p))))
    }

    /// True when every edge is shared by exactly two triangles.
    ///
    /// An empty mesh counts as closed.
    pub fn is_closed(&self) -> bool {
        let mut edges: HashMap<(u32, u32), u32> = HashMap::new();
        for tri in self.indices.chunks_exact(3) {
            for (a, b) in [(tri[0], tri[1]), (tri[1], tri[2]), (tri[2], tri[0])] {
                *edges.entry((a.min(b), a.max(b))).or_insert(0) += 1;
            }
        }
        edges.values().all(|&n| n == 2)
    }
}

/// Extract the `iso_level` surface of `grid`.
pub fn extract(grid: &FieldGrid, iso_level: f32) -> Mesh {
    let mut builder = SurfaceBuilder {
        grid,
        iso: iso_level,
        mesh: Mesh::default(),
        edge_vertices: HashMap::new(),
    };
    if !iso_level.is_finite() {
        return builder.mesh;
    }

    let r = grid.resolution() as usize;
    let values = grid.values();
    for z in 0..r - 1 {
        for y in 0..r - 1 {
            for x in 0..r - 1 {
                let mut cell = Cell::default();
                let mut inside = 0u8;
                for (i, offset) in CORNERS.iter().enumerate() {
                    let coord = [x + offset[0], y + offset[1], z + offset[2]];
                    let index = grid.index(coord[0], coord[1], coord[2]);
                    cell.coords[i] = coord;
                    cell.indices[i] = index;
                    cell.values[i] = values[index];
                    if cell.values[i] > iso_level {
                        inside |= 1 << i;
                    }
                }
                if inside == 0 || inside == 0xFF {
                    continue;
                }
                for tet in &TETRAHEDRA {
                    builder.polygonise(&cell, tet);
                }
            }
        }
    }

    builder.mesh
}

#[derive(Default)]
struct Cell {
    coords: [[usize; 3]; 8],
    indices: [usize; 8],
    values: [f32; 8],
}

struct SurfaceBuilder<'a> {
    grid: &'a FieldGrid,
    iso: f32,
    mesh: Mesh,
    edge_vertices: HashMap<(usize, usize), u32>,
}

impl SurfaceBuilder<'_> {
    fn polygonise(&mut self, cell: &Cell, tet: &[usize; 4]) {
        let mut inside = [0usize; 4];
        let mut outside = [0usize; 4];
        let (mut n_in, mut n_out) = (0, 0);
        for &corner in tet {
            if cell.values[corner] > self.iso {
                inside[n_in] = corner;
                n_in += 1;
            } else {
                outside[n_out] = corner;
                n_out += 1;
            }
        }

        match n_in {
            1 => {
                let a = self.edge_vertex(cell, inside[0], outside[0]);
                let b = self.edge_vertex(cell, inside[0], outside[1]);
                let c = self.edge_vertex(cell, inside[0], outside[2]);
                self.emit(cell, [a, b, c], &inside[..1], &outside[..3]);
            }
            3 => {
                let a = self.edge_vertex(cell, inside[0], outside[0]);
                let b = self.edge_vertex(cell, inside[1], outside[0]);
                let c = self.edge_vertex(cell, inside[2], outside[0]);
                self.emit(cell, [a, b, c], &inside[..3], &outside[..1]);
            }
            2 => {
                // Quad around the tetrahedron, in cyclic order.
                let a = self.edge_vertex(cell, inside[0], outside[0]);
                let b = self.edge_vertex(cell, inside[0], outside[1]);
                let c = self.edge_vertex(cell, inside[1], outside[1]);
                let d = self.edge_vertex(cell, inside[1], outside[0]);
                self.emit(cell, [a, b, c], &inside[..2], &outside[..2]);
                self.emit(cell, [a, c, d], &inside[..2], &outside[..2]);
            }
            _ => {}
        }
    }

    /// Push a triangle, flipping it so its face normal points from the inside
    /// corners toward the outside corners.
    fn emit(&mut self, cell: &Cell, tri: [u32; 3], inside: &[usize], outside: &[usize]) {
        let centroid = |corners: &[usize]| -> Vec3 {
            corners
                .iter()
                .map(|&c| {
                    let [x, y, z] = cell.coords[c];
                    Vec3::new(x as f32, y as f32, z as f32)
                })
                .sum::<Vec3>()
                / corners.len() as f32
        };
        let outward = centroid(outside) - centroid(inside);

        let p = tri.map(|i| Vec3::from_array(self.mesh.vertices[i as usize].position));
        let face = (p[1] - p[0]).cross(p[2] - p[0]);
        let [a, b, c] = tri;
        if face.dot(outward) < 0.0 {
            self.mesh.indices.extend_from_slice(&[a, c, b]);
        } else {
            self.mesh.indices.extend_from_slice(&[a, b, c]);
        }
    }

    /// Vertex where the surface crosses the edge between corners `a` and `b`.
    fn edge_vertex(&mut self, cell: &Cell, a: usize, b: usize) -> u32 {
        let (ia, ib) = (cell.indices[a], cell.indices[b]);
        let key = (ia.min(ib), ia.max(ib));
        if let Some(&existing) = self.edge_vertices.get(&key) {
            return existing;
        }

        // Interpolate from the lower grid index so both neighbours agree bit for bit.
        let (lo, hi) = if ia < ib { (a, b) } else { (b, a) };
        let (v_lo, v_hi) = (cell.values[lo], cell.values[hi]);
        let t = ((self.iso - v_lo) / (v_hi - v_lo)).clamp(0.0, 1.0);

        let [lx, ly, lz] = cell.coords[lo];
        let [hx, hy, hz] = cell.coords[hi];
        let position = self
            .grid
            .cell_position(lx, ly, lz)
            .lerp(self.grid.cell_position(hx, hy, hz), t);
        let gradient = self
            .grid
            .gradient(lx, ly, lz)
            .lerp(self.grid.gradient(hx, hy, hz), t);
        let normal = (-gradient).normalize_or_zero();

        let id = self.mesh.vertices.len() as u32;
        self.mesh.vertices.push(MeshVertex {
            position: position.to_array(),
            normal: normal.to_array(),
        });
        self.edge_vertices.insert(key, id);
        id
    }
}
