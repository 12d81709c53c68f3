//! Replace-vs-keep policy for product images.
//!
//! A form carries at most one image signal, checked in this order: a URL that was uploaded
//! out of band through `/upload`, an attached file, or an explicit request to keep the
//! current image. [`plan_image_change`] turns the signal into the image the product should
//! end up with and the hosted object (if any) that becomes garbage once the change is
//! committed. Nothing is released here; callers do that after their transaction commits.

use crate::{
    entities::ImageRef,
    images::{ImageGateway, ImageHostError, ImageUpload},
};
use tracing::debug;

/// What the submitted form asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageIntent {
    /// Adopt an image that was already uploaded
    PreUploaded {
        /// Public URL
        url: String,
        /// Provider id, when the uploader reported one
        file_id: Option<String>,
    },
    /// Upload the attached file
    NewFile(ImageUpload),
    /// Keep the current image (`keep_image=yes`)
    Keep,
    /// No image signal at all
    Unspecified,
}

/// How the image part of a create or update went.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageOutcome {
    /// The product has no image and none was supplied
    NoImage,
    /// The existing image was left in place
    Kept,
    /// A new image was adopted
    Stored(ImageRef),
    /// The upload failed; the image fields were not touched
    UploadFailed(ImageHostError),
}

/// A hosted object that was released after a commit, and how that went.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Release {
    /// Provider id of the released object
    pub file_id: String,
    /// Failure, if the provider refused or could not be reached
    pub error: Option<ImageHostError>,
}

/// Result of applying the policy, before anything is persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImagePlan {
    /// Image the product ends up with
    pub image: Option<ImageRef>,
    /// Hosted object to release once the change is committed
    pub release: Option<String>,
    /// Object uploaded by this request; must be discarded if the change is not committed
    pub uploaded: Option<String>,
    /// Outcome to report
    pub outcome: ImageOutcome,
}

impl ImagePlan {
    fn unchanged(current: Option<ImageRef>, outcome: ImageOutcome) -> Self {
        Self {
            image: current,
            release: None,
            uploaded: None,
            outcome,
        }
    }

    fn replace(current: Option<&ImageRef>, new: ImageRef, keep_old: bool) -> Self {
        let release = if keep_old {
            None
        } else {
            current
                .and_then(ImageRef::hosted_file_id)
                .filter(|old| Some(*old) != new.hosted_file_id())
                .map(ToString::to_string)
        };
        Self {
            image: Some(new.clone()),
            release,
            uploaded: None,
            outcome: ImageOutcome::Stored(new),
        }
    }
}

/// Decides the product's image, uploading the attached file if there is one.
///
/// `keep_old` prevents the current hosted object from being scheduled for release even
/// though a new image replaces it. An upload failure leaves `current` in place.
pub async fn plan_image_change(
    gateway: &ImageGateway,
    current: Option<ImageRef>,
    intent: ImageIntent,
    keep_old: bool,
) -> ImagePlan {
    match intent {
        ImageIntent::PreUploaded { url, file_id } => {
            match ImageRef::from_columns(Some(&url), file_id.as_deref()) {
                Some(new) => ImagePlan::replace(current.as_ref(), new, keep_old),
                None => untouched(current),
            }
        }
        ImageIntent::NewFile(upload) => {
            match gateway.upload(upload, gateway.folder()).await {
                Ok(uploaded) => {
                    let new = ImageRef::Hosted {
                        url: uploaded.url,
                        file_id: uploaded.file_id.clone(),
                    };
                    ImagePlan {
                        uploaded: uploaded.file_id,
                        ..ImagePlan::replace(current.as_ref(), new, keep_old)
                    }
                }
                Err(e) => ImagePlan::unchanged(current, ImageOutcome::UploadFailed(e)),
            }
        }
        ImageIntent::Keep | ImageIntent::Unspecified => untouched(current),
    }
}

fn untouched(current: Option<ImageRef>) -> ImagePlan {
    let outcome = if current.is_some() {
        ImageOutcome::Kept
    } else {
        ImageOutcome::NoImage
    };
    ImagePlan::unchanged(current, outcome)
}

/// Releases a hosted object, logging instead of failing.
pub async fn release(gateway: &ImageGateway, file_id: String) -> Release {
    let error = gateway.delete(&file_id).await.err();
    if error.is_none() {
        debug!(file_id = %file_id, "Released previous image");
    }
    Release { file_id, error }
}
