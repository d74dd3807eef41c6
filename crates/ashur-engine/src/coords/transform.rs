use super::Vec2;

/// 2D affine transform used as the compositor's view matrix.
///
/// Maps `(x, y)` to `(a·x + c·y + tx, b·x + d·y + ty)`. `translate` and
/// `rotate_degrees` post-multiply, so the most recently applied operation acts
/// first on incoming points (classic view-stack semantics).
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Transform2D {
    pub a: f32,
    pub b: f32,
    pub c: f32,
    pub d: f32,
    pub tx: f32,
    pub ty: f32,
}

impl Default for Transform2D {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Transform2D {
    pub const IDENTITY: Transform2D = Transform2D {
        a: 1.0,
        b: 0.0,
        c: 0.0,
        d: 1.0,
        tx: 0.0,
        ty: 0.0,
    };

    #[inline]
    pub const fn translation(dx: f32, dy: f32) -> Self {
        Self { tx: dx, ty: dy, ..Self::IDENTITY }
    }

    /// Clockwise rotation on screen (Y down).
    pub fn rotation_degrees(deg: f32) -> Self {
        let (s, c) = deg.to_radians().sin_cos();
        Self { a: c, b: s, c: -s, d: c, tx: 0.0, ty: 0.0 }
    }

    /// Returns `self ∘ next`: `next` is applied to points first.
    pub fn then_local(self, next: Transform2D) -> Self {
        Self {
            a: self.a * next.a + self.c * next.b,
            b: self.b * next.a + self.d * next.b,
            c: self.a * next.c + self.c * next.d,
            d: self.b * next.c + self.d * next.d,
            tx: self.a * next.tx + self.c * next.ty + self.tx,
            ty: self.b * next.tx + self.d * next.ty + self.ty,
        }
    }

    pub fn translate(&mut self, dx: f32, dy: f32) {
        *self = self.then_local(Self::translation(dx, dy));
    }

    pub fn rotate_degrees(&mut self, deg: f32) {
        *self = self.then_local(Self::rotation_degrees(deg));
    }

    #[inline]
    pub fn apply(&self, p: Vec2) -> Vec2 {
        Vec2::new(
            self.a * p.x + self.c * p.y + self.tx,
            self.b * p.x + self.d * p.y + self.ty,
        )
    }

    #[inline]
    pub fn is_identity(&self) -> bool {
        *self == Self::IDENTITY
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: Vec2, b: Vec2) -> bool {
        a.distance(b) < 1e-4
    }

    #[test]
    fn translate_then_rotate_pivots_around_translated_origin() {
        let mut view = Transform2D::IDENTITY;
        view.translate(100.0, 50.0);
        view.rotate_degrees(90.0);

        // A point one unit to the right of the pivot ends up one unit below it.
        assert!(close(view.apply(Vec2::new(1.0, 0.0)), Vec2::new(100.0, 51.0)));
        assert!(close(view.apply(Vec2::zero()), Vec2::new(100.0, 50.0)));
    }

    #[test]
    fn zero_rotation_is_identity() {
        let t = Transform2D::rotation_degrees(0.0);
        assert!(close(t.apply(Vec2::new(3.0, 4.0)), Vec2::new(3.0, 4.0)));
        assert!(Transform2D::default().is_identity());
    }
}
