pub mod constants;
pub mod layout;
mod options;
pub mod render;
mod surface;
mod types;

pub use layout::{
    ImagePlacement, Rect, TableLayout, canvas_dims, compute_table_layout, image_placement,
    table_bounds,
};
pub use options::*;
pub use render::{EncodedComposite, Scene, encode_for_upload, load_font, render_composite};
pub use surface::CompositeSurface;
pub use types::*;
