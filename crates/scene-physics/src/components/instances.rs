use glam::Mat4;

/// Per-instance world matrices of a batched entity.
///
/// The count is fixed at construction; there is no way to grow or shrink the buffer.
/// `version` increases every time the buffer is marked dirty so a renderer can
/// skip uploads when nothing changed.
#[derive(Debug, Clone, PartialEq)]
pub struct InstanceBuffer {
    matrices: Vec<Mat4>,
    version: u64,
}

impl InstanceBuffer {
    /// `count` instances, all at the identity transform.
    pub fn new(count: usize) -> Self {
        Self {
            matrices: vec![Mat4::IDENTITY; count],
            version: 0,
        }
    }

    pub fn from_matrices(matrices: Vec<Mat4>) -> Self {
        Self {
            matrices,
            version: 0,
        }
    }

    /// Number of instances.
    pub fn count(&self) -> usize {
        self.matrices.len()
    }

    pub fn matrix(&self, index: usize) -> Option<Mat4> {
        self.matrices.get(index).copied()
    }

    /// Overwrite one instance matrix. Returns `false` when `index` is out of range.
    /// Does not mark the buffer dirty; callers batch that with `mark_dirty`.
    pub fn set_matrix(&mut self, index: usize, matrix: Mat4) -> bool {
        match self.matrices.get_mut(index) {
            Some(slot) => {
                *slot = matrix;
                true
            }
            None => false,
        }
    }

    pub fn matrices(&self) -> &[Mat4] {
        &self.matrices
    }

    /// Column-major floats, 16 per instance, ready for a GPU upload.
    pub fn as_floats(&self) -> &[f32] {
        bytemuck::cast_slice(&self.matrices)
    }

    pub fn mark_dirty(&mut self) {
        self.version += 1;
    }

    pub fn version(&self) -> u64 {
        self.version
    }
}
