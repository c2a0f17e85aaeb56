// q_shared.rs: definitions shared by every qmove crate
//
// Coordinates are Y-up: index 1 is the vertical axis.

pub type Vec3 = [f32; 3];

pub const VEC3_ORIGIN: Vec3 = [0.0, 0.0, 0.0];

/// Straight up in world space.
pub const VEC3_UP: Vec3 = [0.0, 1.0, 0.0];

// ============================================================
// MATHLIB: vector operations
// ============================================================

#[inline]
pub fn dot_product(a: &Vec3, b: &Vec3) -> f32 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

#[inline]
pub fn vector_subtract(a: &Vec3, b: &Vec3) -> Vec3 {
    [a[0] - b[0], a[1] - b[1], a[2] - b[2]]
}

#[inline]
pub fn vector_add(a: &Vec3, b: &Vec3) -> Vec3 {
    [a[0] + b[0], a[1] + b[1], a[2] + b[2]]
}

#[inline]
pub fn vector_clear(v: &mut Vec3) {
    v[0] = 0.0;
    v[1] = 0.0;
    v[2] = 0.0;
}

#[inline]
pub fn vector_set(v: &mut Vec3, x: f32, y: f32, z: f32) {
    v[0] = x;
    v[1] = y;
    v[2] = z;
}

/// Exact component-wise equality.
pub fn vector_compare(v1: &Vec3, v2: &Vec3) -> bool {
    v1[0] == v2[0] && v1[1] == v2[1] && v1[2] == v2[2]
}

/// veca + scale * vecb
pub fn vector_ma(veca: &Vec3, scale: f32, vecb: &Vec3) -> Vec3 {
    [
        veca[0] + scale * vecb[0],
        veca[1] + scale * vecb[1],
        veca[2] + scale * vecb[2],
    ]
}

/// In-place form of [`vector_ma`]: v += scale * dir
pub fn vector_ma_mut(v: &mut Vec3, scale: f32, dir: &Vec3) {
    v[0] += scale * dir[0];
    v[1] += scale * dir[1];
    v[2] += scale * dir[2];
}

/// Normalize in place, returns original length.
pub fn vector_normalize(v: &mut Vec3) -> f32 {
    let length = (v[0] * v[0] + v[1] * v[1] + v[2] * v[2]).sqrt();
    if length != 0.0 {
        let ilength = 1.0 / length;
        v[0] *= ilength;
        v[1] *= ilength;
        v[2] *= ilength;
    }
    length
}

pub fn vector_length(v: &Vec3) -> f32 {
    (v[0] * v[0] + v[1] * v[1] + v[2] * v[2]).sqrt()
}

pub fn vector_scale(v: &Vec3, scale: f32) -> Vec3 {
    [v[0] * scale, v[1] * scale, v[2] * scale]
}

pub fn vector_scale_mut(v: &mut Vec3, scale: f32) {
    v[0] *= scale;
    v[1] *= scale;
    v[2] *= scale;
}

// ============================================================
// Axis-aligned boxes
// ============================================================

/// Axis-aligned bounding box. Bodies store theirs in local space; translate
/// by the owning entity's position to get world space.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Box3 {
    pub mins: Vec3,
    pub maxs: Vec3,
}

impl Box3 {
    pub const fn new(mins: Vec3, maxs: Vec3) -> Self {
        Self { mins, maxs }
    }

    /// Box of the given full size centred on the local origin.
    pub fn from_size(size: &Vec3) -> Self {
        let half = vector_scale(size, 0.5);
        Self {
            mins: [-half[0], -half[1], -half[2]],
            maxs: half,
        }
    }

    pub fn translate(&self, offset: &Vec3) -> Self {
        Self {
            mins: vector_add(&self.mins, offset),
            maxs: vector_add(&self.maxs, offset),
        }
    }

    pub fn translate_mut(&mut self, offset: &Vec3) {
        self.mins = vector_add(&self.mins, offset);
        self.maxs = vector_add(&self.maxs, offset);
    }

    /// True iff the boxes intersect on all three axes. Touching faces count.
    pub fn overlaps(&self, other: &Box3) -> bool {
        !(self.mins[0] > other.maxs[0]
            || self.mins[1] > other.maxs[1]
            || self.mins[2] > other.maxs[2]
            || self.maxs[0] < other.mins[0]
            || self.maxs[1] < other.mins[1]
            || self.maxs[2] < other.mins[2])
    }

    pub fn size(&self) -> Vec3 {
        vector_subtract(&self.maxs, &self.mins)
    }
}

// ============================================================
// Tests
// ============================================================

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    #[test]
    fn test_normalize_returns_length() {
        let mut v: Vec3 = [3.0, 0.0, 4.0];
        let len = vector_normalize(&mut v);
        assert_eq!(len, 5.0);
        assert!((vector_length(&v) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_normalize_zero_vector_untouched() {
        let mut v = VEC3_ORIGIN;
        assert_eq!(vector_normalize(&mut v), 0.0);
        assert_eq!(v, VEC3_ORIGIN);
    }

    #[test]
    fn test_vector_ma_mut() {
        let mut v: Vec3 = [1.0, 2.0, 3.0];
        vector_ma_mut(&mut v, 2.0, &[1.0, 0.0, -1.0]);
        assert_eq!(v, [3.0, 2.0, 1.0]);
    }

    #[test]
    fn test_vector_set_clear_compare() {
        let mut v = VEC3_ORIGIN;
        vector_set(&mut v, 1.0, -2.0, 3.5);
        assert!(vector_compare(&v, &[1.0, -2.0, 3.5]));
        assert!(!vector_compare(&v, &[1.0, -2.0, 3.0]));

        vector_clear(&mut v);
        assert!(vector_compare(&v, &VEC3_ORIGIN));
    }

    #[test]
    fn test_box_from_size() {
        let b = Box3::from_size(&[32.0, 56.0, 32.0]);
        assert_eq!(b.mins, [-16.0, -28.0, -16.0]);
        assert_eq!(b.maxs, [16.0, 28.0, 16.0]);
        assert_eq!(b.size(), [32.0, 56.0, 32.0]);
    }

    #[test]
    fn test_box_translate() {
        let b = Box3::new([-1.0; 3], [1.0; 3]).translate(&[10.0, 0.0, -5.0]);
        assert_eq!(b.mins, [9.0, -1.0, -6.0]);
        assert_eq!(b.maxs, [11.0, 1.0, -4.0]);
    }

    #[test]
    fn test_box_overlap_touching_counts() {
        let a = Box3::new([0.0; 3], [1.0; 3]);
        let b = Box3::new([1.0, 0.0, 0.0], [2.0, 1.0, 1.0]);
        assert!(a.overlaps(&b));
        assert!(b.overlaps(&a));
    }

    #[test]
    fn test_box_overlap_separated_on_one_axis() {
        let a = Box3::new([0.0; 3], [1.0; 3]);
        let b = Box3::new([0.0, 1.5, 0.0], [1.0, 2.0, 1.0]);
        assert!(!a.overlaps(&b));
    }

    #[test]
    fn test_box_overlap_is_symmetric() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..500 {
            let a = Box3::new([0.0; 3], [1.0; 3]).translate(&[
                rng.gen_range(-2.0..2.0),
                rng.gen_range(-2.0..2.0),
                rng.gen_range(-2.0..2.0),
            ]);
            let b = Box3::new([0.0; 3], [1.0; 3]);
            assert_eq!(a.overlaps(&b), b.overlaps(&a));
        }
    }
}
