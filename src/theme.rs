use crate::report::Category;

/// An opaque sRGB color.
pub type Color = [u8; 3];

pub const WHITE: Color = [0xff, 0xff, 0xff];
pub const BLACK: Color = [0x00, 0x00, 0x00];
pub const GRAY_50: Color = [0xf9, 0xfa, 0xfb];
pub const GRAY_100: Color = [0xf3, 0xf4, 0xf6];
pub const GRAY_200: Color = [0xe5, 0xe7, 0xeb];
pub const GRAY_300: Color = [0xd1, 0xd5, 0xdb];
pub const GRAY_400: Color = [0x9c, 0xa3, 0xaf];
pub const GRAY_800: Color = [0x1f, 0x29, 0x37];
pub const GRAY_900: Color = [0x11, 0x18, 0x27];

const RED_600: Color = [0xdc, 0x26, 0x26];
const RED_700: Color = [0xb9, 0x1c, 0x1c];
const YELLOW_400: Color = [0xfa, 0xcc, 0x15];
const YELLOW_500: Color = [0xea, 0xb3, 0x08];
const YELLOW_700: Color = [0xa1, 0x62, 0x07];
const GREEN_500: Color = [0x22, 0xc5, 0x5e];
const GREEN_600: Color = [0x16, 0xa3, 0x4a];
const GREEN_700: Color = [0x15, 0x80, 0x3d];
const BLUE_600: Color = [0x25, 0x63, 0xeb];
const BLUE_700: Color = [0x1d, 0x4e, 0xd8];
const BLUE_800: Color = [0x1e, 0x40, 0xaf];
const PURPLE_600: Color = [0x93, 0x33, 0xea];
const ORANGE_400: Color = [0xfb, 0x92, 0x3c];
const ORANGE_600: Color = [0xea, 0x58, 0x0c];

/// The visual tokens of one reporting category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Theme {
    pub border: Color,
    pub text: Color,
    /// Left, middle and right stops of the horizontal banner gradient.
    pub gradient: [Color; 3],
}

const PENTADBIRAN: Theme = Theme {
    border: RED_600,
    text: RED_700,
    gradient: [RED_600, RED_700, BLUE_800],
};

const HEM: Theme = Theme {
    border: YELLOW_500,
    text: YELLOW_700,
    gradient: [YELLOW_400, YELLOW_500, BLUE_700],
};

const KURIKULUM: Theme = Theme {
    border: GREEN_600,
    text: GREEN_700,
    gradient: [GREEN_600, GREEN_500, YELLOW_400],
};

const KOKURIKULUM: Theme = Theme {
    border: BLUE_600,
    text: BLUE_700,
    gradient: [BLUE_600, BLUE_700, PURPLE_600],
};

const KESENIAN: Theme = Theme {
    border: YELLOW_500,
    text: YELLOW_700,
    gradient: [YELLOW_400, ORANGE_400, ORANGE_600],
};

impl Theme {
    /// The theme of the given category, the table is fixed at compile time.
    pub fn for_category(category: Category) -> &'static Theme {
        match category {
            Category::Pentadbiran => &PENTADBIRAN,
            Category::Hem => &HEM,
            Category::Kurikulum => &KURIKULUM,
            Category::Kokurikulum => &KOKURIKULUM,
            Category::Kesenian => &KESENIAN,
        }
    }
}

/// Mixes `color` over white with the given opacity, standing in for the translucent borders of the layout.
pub fn faded(color: Color, opacity: f32) -> Color {
    let opacity = opacity.clamp(0.0, 1.0);
    let mut faded_color = WHITE;
    for (channel, component) in faded_color.iter_mut().zip(color) {
        *channel = (component as f32 * opacity + 255.0 * (1.0 - opacity)).round() as u8;
    }
    faded_color
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_category_has_its_own_gradient() {
        let gradients: Vec<_> = Category::ALL
            .iter()
            .map(|category| Theme::for_category(*category).gradient)
            .collect();

        for (index, gradient) in gradients.iter().enumerate() {
            assert!(!gradients[index + 1..].contains(gradient));
        }
    }

    #[test]
    fn fading_moves_towards_white() {
        assert_eq!(faded(BLACK, 1.0), BLACK);
        assert_eq!(faded(BLACK, 0.0), WHITE);
        assert_eq!(faded([0, 100, 200], 0.5), [128, 178, 228]);
    }
}
