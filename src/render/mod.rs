/*!
 * Remote rendering.
 *
 * - `scene`: render source JSON for a narrated story, plus JSON patching
 * - `client`: submit / poll / download against the render API
 */

pub mod client;
pub mod scene;

pub use client::{RenderClient, RenderJob, RenderStatus, TemplateRender};
pub use scene::{apply_patch, build_render_source, parse_key_path, parse_override, random_title_color, PatchOp};
