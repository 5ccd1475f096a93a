use serde::{Deserialize, Serialize};

/// Bounding box given by the two corners of a drag. `(x, y)` is where the drag
/// started and `(x2, y2)` is the current tail, so the raw fields are not ordered.
/// The `*_min`/`*_max` accessors normalize, a drag may go in any direction.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct BoxCorners {
    pub x: u32,
    pub y: u32,
    pub x2: u32,
    pub y2: u32,
}

impl BoxCorners {
    /// Starts a box at the given position, both corners coincide until the
    /// tail is moved.
    pub fn new(x: u32, y: u32) -> Self {
        BoxCorners { x, y, x2: x, y2: y }
    }
    pub fn update_tail(&mut self, x: u32, y: u32) {
        self.x2 = x;
        self.y2 = y;
    }
    pub fn x_min(&self) -> u32 {
        self.x.min(self.x2)
    }
    pub fn y_min(&self) -> u32 {
        self.y.min(self.y2)
    }
    pub fn x_max(&self) -> u32 {
        self.x.max(self.x2)
    }
    pub fn y_max(&self) -> u32 {
        self.y.max(self.y2)
    }
    pub fn w(&self) -> u32 {
        self.x_max() - self.x_min()
    }
    pub fn h(&self) -> u32 {
        self.y_max() - self.y_min()
    }
    pub fn x_mid(&self) -> u32 {
        (self.x_min() + self.x_max()) / 2
    }
    pub fn y_mid(&self) -> u32 {
        (self.y_min() + self.y_max()) / 2
    }
}

#[test]
fn test_normalization() {
    fn assert_extents(bc: BoxCorners) {
        assert_eq!(bc.x_min(), 1);
        assert_eq!(bc.y_min(), 1);
        assert_eq!(bc.x_max(), 5);
        assert_eq!(bc.y_max(), 5);
        assert_eq!(bc.w(), 4);
        assert_eq!(bc.h(), 4);
        assert_eq!(bc.x_mid(), 3);
        assert_eq!(bc.y_mid(), 3);
    }
    let mut bc = BoxCorners::new(5, 5);
    bc.update_tail(1, 1);
    assert_extents(bc);
    let mut bc = BoxCorners::new(1, 1);
    bc.update_tail(5, 5);
    assert_extents(bc);
    let mut bc = BoxCorners::new(1, 5);
    bc.update_tail(5, 1);
    assert_extents(bc);
    let mut bc = BoxCorners::new(5, 1);
    bc.update_tail(1, 5);
    assert_extents(bc);
}

#[test]
fn test_degenerate() {
    let bc = BoxCorners::new(4, 7);
    assert_eq!((bc.x_min(), bc.y_min()), (4, 7));
    assert_eq!((bc.x_max(), bc.y_max()), (4, 7));
    assert_eq!((bc.w(), bc.h()), (0, 0));
}

#[test]
fn test_tail_moves() {
    let mut bc = BoxCorners::new(3, 3);
    bc.update_tail(7, 2);
    assert_eq!((bc.x2, bc.y2), (7, 2));
    bc.update_tail(0, 9);
    assert_eq!((bc.x, bc.y), (3, 3));
    assert_eq!((bc.x_min(), bc.y_min()), (0, 3));
    assert_eq!((bc.x_max(), bc.y_max()), (3, 9));
}
