//! The four fixed output styles and their SVG templates.
//!
//! Styles are a constant table, not a runtime registry: the artifact matrix
//! (4 styles × {svg, png-200, png-800}) is part of the output contract and
//! the path scheme depends on it staying closed.

/// Which canonical buffer a style consumes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Aspect {
    /// 3:2, base 300×200.
    Wide,
    /// 1:1, base 200×200.
    Square,
}

/// Corner treatment applied to raster output (and mirrored by the SVG clip).
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum CornerShape {
    None,
    /// Rounded rectangle; `radius` is in pixels at the style's base size.
    Rounded { radius: f32 },
    /// Circle inscribed in the (square) frame.
    Circle,
}

#[derive(Clone, Copy, Debug)]
pub struct StyleSpec {
    /// Directory name of the style in the output tree.
    pub name: &'static str,
    /// Filename suffix (`{ibge}-{slug}-{suffix}.{ext}`).
    pub suffix: &'static str,
    /// Base pixel size. PNG output also exists at 4× this size.
    pub width: u32,
    pub height: u32,
    pub aspect: Aspect,
    pub corner: CornerShape,
    /// SVG wrapper with a `{data_uri}` placeholder for the embedded raster.
    pub svg_template: &'static str,
}

const SVG_FULL: &str = r#"<svg xmlns="http://www.w3.org/2000/svg" xmlns:xlink="http://www.w3.org/1999/xlink"
     viewBox="0 0 300 200" width="300" height="200">
  <image width="300" height="200" href="{data_uri}" preserveAspectRatio="xMidYMid slice"/>
</svg>"#;

const SVG_ROUNDED: &str = r#"<svg xmlns="http://www.w3.org/2000/svg" xmlns:xlink="http://www.w3.org/1999/xlink"
     viewBox="0 0 300 200" width="300" height="200">
  <defs><clipPath id="r"><rect width="300" height="200" rx="20"/></clipPath></defs>
  <image width="300" height="200" href="{data_uri}" clip-path="url(#r)" preserveAspectRatio="xMidYMid slice"/>
</svg>"#;

const SVG_CIRCLE: &str = r#"<svg xmlns="http://www.w3.org/2000/svg" xmlns:xlink="http://www.w3.org/1999/xlink"
     viewBox="0 0 200 200" width="200" height="200">
  <defs><clipPath id="c"><circle cx="100" cy="100" r="100"/></clipPath></defs>
  <image width="200" height="200" href="{data_uri}" clip-path="url(#c)" preserveAspectRatio="xMidYMid slice"/>
</svg>"#;

const SVG_SQUARE_ROUNDED: &str = r#"<svg xmlns="http://www.w3.org/2000/svg" xmlns:xlink="http://www.w3.org/1999/xlink"
     viewBox="0 0 200 200" width="200" height="200">
  <defs><clipPath id="sr"><rect width="200" height="200" rx="20"/></clipPath></defs>
  <image width="200" height="200" href="{data_uri}" clip-path="url(#sr)" preserveAspectRatio="xMidYMid slice"/>
</svg>"#;

/// Base corner radius shared by `rounded` and `square-rounded`.
pub const BASE_CORNER_RADIUS: f32 = 20.0;

pub const STYLES: [StyleSpec; 4] = [
    StyleSpec {
        name: "full",
        suffix: "full",
        width: 300,
        height: 200,
        aspect: Aspect::Wide,
        corner: CornerShape::None,
        svg_template: SVG_FULL,
    },
    StyleSpec {
        name: "rounded",
        suffix: "rounded",
        width: 300,
        height: 200,
        aspect: Aspect::Wide,
        corner: CornerShape::Rounded {
            radius: BASE_CORNER_RADIUS,
        },
        svg_template: SVG_ROUNDED,
    },
    StyleSpec {
        name: "circle",
        suffix: "circle",
        width: 200,
        height: 200,
        aspect: Aspect::Square,
        corner: CornerShape::Circle,
        svg_template: SVG_CIRCLE,
    },
    StyleSpec {
        name: "square-rounded",
        suffix: "sq",
        width: 200,
        height: 200,
        aspect: Aspect::Square,
        corner: CornerShape::Rounded {
            radius: BASE_CORNER_RADIUS,
        },
        svg_template: SVG_SQUARE_ROUNDED,
    },
];

impl StyleSpec {
    pub fn by_name(name: &str) -> Option<&'static StyleSpec> {
        STYLES.iter().find(|s| s.name == name)
    }

    /// Pixel size of the raster output at `scale`× the base size.
    pub fn scaled_size(&self, scale: u32) -> (u32, u32) {
        (self.width * scale, self.height * scale)
    }
}
