use crate::colors::Color;
use crate::types::PaletteOrdering;

use std::cmp::{Ordering, Reverse};

/// Sorts the palette so neighbouring gradient rows blend related colors.
/// The sort is stable; the palette keeps every color it came in with.
pub fn order_palette(colors: &[Color], ordering: PaletteOrdering) -> Vec<Color> {
    let mut ordered = colors.to_vec();
    match ordering {
        PaletteOrdering::Brightness => {
            ordered.sort_by_key(|c| Reverse(c.brightness()));
        }
        PaletteOrdering::Hue => {
            ordered.sort_by(|a, b| {
                a.hue()
                    .partial_cmp(&b.hue())
                    .unwrap_or(Ordering::Equal)
                    .then_with(|| b.brightness().cmp(&a.brightness()))
            });
        }
    }
    ordered
}
