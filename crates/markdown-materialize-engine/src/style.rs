//! One-time style sheet bootstrap.
//!
//! The sheet is tagged with a marker attribute and looked up before writing,
//! so any number of renderers sharing one document inject it once.

use crate::dom::{Document, ElementId};
use crate::error::RenderError;
use crate::options::MaterializeOptions;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StyleInjection {
    Injected(ElementId),
    AlreadyPresent(ElementId),
}

impl StyleInjection {
    pub fn element(self) -> ElementId {
        match self {
            StyleInjection::Injected(id) | StyleInjection::AlreadyPresent(id) => id,
        }
    }
}

/// The CSS the hidden/revealed classes rely on.
pub fn stylesheet(options: &MaterializeOptions) -> String {
    let hidden = &options.hidden_class;
    let revealed = &options.revealed_class;
    let root = &options.root_class;
    format!(
        r#"
@keyframes materialize {{
    from {{ opacity: 0; transform: translateY(5px); }}
    to {{ opacity: 1; transform: translateY(0); }}
}}
.{hidden} {{ opacity: 0; }}
.{revealed} {{ animation: materialize 0.3s ease-out forwards; }}
.{root} h1, .{root} h2, .{root} h3,
.{root} h4, .{root} h5, .{root} h6 {{ margin-top: 20px; margin-bottom: 10px; line-height: 1.4; }}
.{root} p {{ margin-bottom: 10px; line-height: 1.6; }}
.{root} pre {{ padding: 10px; border-radius: 4px; overflow-x: auto; margin: 10px 0; }}
.{root} blockquote {{ border-left: 4px solid #ddd; padding-left: 15px; margin: 10px 0; }}
.{root} ul, .{root} ol {{ margin: 10px 0; padding-left: 30px; }}
.{root} table {{ border-collapse: collapse; width: 100%; margin: 10px 0; }}
.{root} td {{ border: 1px solid #ddd; padding: 8px; text-align: left; }}
.{root} hr {{ border: none; border-top: 1px solid #ddd; margin: 20px 0; }}
"#
    )
}

/// Injects the style sheet into `head` unless a sheet carrying the marker is
/// already connected.
pub fn ensure_styles(
    doc: &mut Document,
    options: &MaterializeOptions,
) -> Result<StyleInjection, RenderError> {
    let existing = doc.query_all("style", &options.style_marker);
    match existing.as_slice() {
        [] => {}
        [id] => return Ok(StyleInjection::AlreadyPresent(*id)),
        _ => {
            return Err(RenderError::DoubleInjection {
                count: existing.len(),
            });
        }
    }

    let style = doc.create_element("style");
    doc.set_attribute(style, &options.style_marker, "")?;
    doc.append_text(style, &stylesheet(options))?;
    let head = doc.head();
    doc.append_child(head, style)?;
    log::debug!("injected materialize style sheet as {style}");
    Ok(StyleInjection::Injected(style))
}
