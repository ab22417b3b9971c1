//! Resolve a named draft into a merge template

use std::collections::{BTreeMap, HashMap};

use log::{debug, info};

use crate::error::MergeError;
use crate::markup::find_inline_images;
use crate::models::{Attachment, MessageFields, Template};
use crate::storage::DraftStore;

/// Build the template for a run from the first draft whose subject equals
/// `subject_line`.
///
/// # Errors
/// [`MergeError::TemplateNotFound`] when no draft matches, or
/// [`MergeError::Backend`] when the draft store fails.
pub fn resolve_template(drafts: &dyn DraftStore, subject_line: &str) -> Result<Template, MergeError> {
    let draft = drafts
        .find_by_subject(subject_line)?
        .ok_or_else(|| MergeError::TemplateNotFound {
            subject: subject_line.to_string(),
        })?;

    let inline_images = bind_inline_images(&draft.html, &draft.inline_images);
    info!(
        "Using draft {} ({} attachments, {} inline images)",
        draft.id,
        draft.attachments.len(),
        inline_images.len()
    );

    Ok(Template {
        message: MessageFields {
            subject: subject_line.to_string(),
            text: draft.plain,
            html: draft.html,
        },
        attachments: draft.attachments,
        inline_images,
    })
}

/// Map each `cid:` reference in `html` to the inline attachment named by
/// the image's alt text
///
/// References whose alt text names no attachment are left out.
pub fn bind_inline_images(html: &str, inline: &[Attachment]) -> BTreeMap<String, Attachment> {
    let by_name: HashMap<&str, &Attachment> =
        inline.iter().map(|a| (a.name.as_str(), a)).collect();

    find_inline_images(html)
        .into_iter()
        .filter_map(|image| match by_name.get(image.alt.as_str()) {
            Some(attachment) => Some((image.content_id, (*attachment).clone())),
            None => {
                debug!("No inline attachment named {:?}", image.alt);
                None
            }
        })
        .collect()
}
