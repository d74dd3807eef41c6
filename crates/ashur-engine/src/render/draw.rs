use crate::coords::Rect;
use crate::texture::MAX_BACKING_TEXTURES;

/// One sub-draw of a source rectangle that spans backing textures.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct DrawPiece {
    /// Index of the backing texture.
    pub texture: usize,
    /// Source rows relative to that texture.
    pub src: Rect,
    pub dst: Rect,
}

/// Splits `src` at multiples of `unit_rows` into per-texture pieces.
///
/// Destination heights are proportional to the source rows and tile `dst`
/// exactly; with a vertical flip the pieces are stacked in reverse. Source
/// rows above zero are clipped together with their share of `dst`. Pieces
/// whose backing texture is missing are dropped.
pub fn split_draw(
    src: Rect,
    dst: Rect,
    unit_rows: u32,
    available: [bool; MAX_BACKING_TEXTURES],
    flip_vertical: bool,
) -> Vec<DrawPiece> {
    if src.h() <= 0.0 || src.w() <= 0.0 {
        return Vec::new();
    }

    let unit = unit_rows.max(1) as f32;
    let y0 = src.y().max(0.0);
    let y1 = src.y() + src.h();
    if y1 <= y0 {
        return Vec::new();
    }

    let clipped = (y0 - src.y()) * dst.h() / src.h();
    let dst = if flip_vertical {
        Rect::new(dst.x(), dst.y(), dst.w(), dst.h() - clipped)
    } else {
        Rect::new(dst.x(), dst.y() + clipped, dst.w(), dst.h() - clipped)
    };

    let mut cuts = vec![y0];
    let mut next = ((y0 / unit).floor() + 1.0) * unit;
    while next < y1 {
        cuts.push(next);
        next += unit;
    }
    cuts.push(y1);

    let span = y1 - y0;
    let offset = |y: f32| -> f32 {
        if y <= y0 {
            0.0
        } else if y >= y1 {
            dst.h()
        } else {
            (y - y0) * dst.h() / span
        }
    };

    cuts.windows(2)
        .filter_map(|w| {
            let (a, b) = (w[0], w[1]);
            let texture = (a / unit).floor() as usize;
            if texture >= MAX_BACKING_TEXTURES || !available[texture] {
                return None;
            }
            let base = texture as f32 * unit;
            let (top, bottom) = if flip_vertical {
                (dst.h() - offset(b), dst.h() - offset(a))
            } else {
                (offset(a), offset(b))
            };
            Some(DrawPiece {
                texture,
                src: Rect::new(src.x(), a - base, src.w(), b - a),
                dst: Rect::new(dst.x(), dst.y() + top, dst.w(), bottom - top),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [bool; 3] = [true, true, true];

    fn total_height(pieces: &[DrawPiece]) -> f32 {
        pieces.iter().map(|p| p.dst.h()).sum()
    }

    #[test]
    fn draw_within_one_texture_is_a_single_piece() {
        let pieces = split_draw(
            Rect::new(0.0, 10.0, 32.0, 32.0),
            Rect::new(5.0, 5.0, 64.0, 64.0),
            1024,
            ALL,
            false,
        );
        assert_eq!(pieces.len(), 1);
        assert_eq!(pieces[0].src, Rect::new(0.0, 10.0, 32.0, 32.0));
        assert_eq!(pieces[0].dst, Rect::new(5.0, 5.0, 64.0, 64.0));
    }

    #[test]
    fn straddling_draw_splits_at_the_texture_boundary() {
        let pieces = split_draw(
            Rect::new(0.0, 1000.0, 100.0, 200.0),
            Rect::new(0.0, 0.0, 100.0, 200.0),
            1024,
            ALL,
            false,
        );
        assert_eq!(pieces.len(), 2);
        assert_eq!(pieces[0].texture, 0);
        assert_eq!(pieces[0].src, Rect::new(0.0, 1000.0, 100.0, 24.0));
        assert_eq!(pieces[0].dst, Rect::new(0.0, 0.0, 100.0, 24.0));
        assert_eq!(pieces[1].texture, 1);
        assert_eq!(pieces[1].src, Rect::new(0.0, 0.0, 100.0, 176.0));
        assert_eq!(pieces[1].dst, Rect::new(0.0, 24.0, 100.0, 176.0));
    }

    #[test]
    fn scaled_pieces_tile_the_destination_exactly() {
        let dst = Rect::new(3.0, 7.0, 50.0, 333.0);
        let pieces = split_draw(Rect::new(0.0, 900.0, 10.0, 2100.0), dst, 1024, ALL, false);
        assert_eq!(pieces.len(), 3);
        assert_eq!(pieces[0].dst.y(), dst.y());
        for w in pieces.windows(2) {
            assert!((w[0].dst.y() + w[0].dst.h() - w[1].dst.y()).abs() < 1e-3);
        }
        let last = pieces[2].dst;
        assert!((last.y() + last.h() - (dst.y() + dst.h())).abs() < 1e-3);
        assert!((total_height(&pieces) - dst.h()).abs() < 1e-3);
    }

    #[test]
    fn split_at_2048_rows() {
        let pieces = split_draw(
            Rect::new(0.0, 2000.0, 8.0, 100.0),
            Rect::new(0.0, 0.0, 8.0, 100.0),
            2048,
            ALL,
            false,
        );
        assert_eq!(pieces.len(), 2);
        assert_eq!(pieces[0].dst.h(), 48.0);
        assert_eq!(pieces[1].src.y(), 0.0);
    }

    #[test]
    fn vertical_flip_mirrors_piece_order() {
        let pieces = split_draw(
            Rect::new(0.0, 1000.0, 100.0, 200.0),
            Rect::new(0.0, 0.0, 100.0, 200.0),
            1024,
            ALL,
            true,
        );
        assert_eq!(pieces[0].texture, 0);
        assert_eq!(pieces[0].dst, Rect::new(0.0, 176.0, 100.0, 24.0));
        assert_eq!(pieces[1].dst, Rect::new(0.0, 0.0, 100.0, 176.0));
    }

    #[test]
    fn rows_above_the_picture_are_clipped_from_the_destination() {
        let pieces = split_draw(
            Rect::new(0.0, -10.0, 40.0, 50.0),
            Rect::new(0.0, 0.0, 80.0, 100.0),
            1024,
            ALL,
            false,
        );
        assert_eq!(pieces.len(), 1);
        assert_eq!(pieces[0].src, Rect::new(0.0, 0.0, 40.0, 40.0));
        assert_eq!(pieces[0].dst, Rect::new(0.0, 20.0, 80.0, 80.0));

        let flipped = split_draw(
            Rect::new(0.0, -10.0, 40.0, 50.0),
            Rect::new(0.0, 0.0, 80.0, 100.0),
            1024,
            ALL,
            true,
        );
        assert_eq!(flipped[0].dst, Rect::new(0.0, 0.0, 80.0, 80.0));
    }

    #[test]
    fn fully_clipped_source_draws_nothing() {
        let pieces = split_draw(
            Rect::new(0.0, -20.0, 40.0, 10.0),
            Rect::new(0.0, 0.0, 80.0, 20.0),
            1024,
            ALL,
            false,
        );
        assert!(pieces.is_empty());
    }

    #[test]
    fn missing_backing_texture_is_skipped() {
        let pieces = split_draw(
            Rect::new(0.0, 1000.0, 100.0, 200.0),
            Rect::new(0.0, 0.0, 100.0, 200.0),
            1024,
            [true, false, false],
            false,
        );
        assert_eq!(pieces.len(), 1);
        assert_eq!(pieces[0].texture, 0);
    }
}
