//! Pipeline compositions.
//!
//! This module provides:
//! - [`ReactionVideoPipeline`], a strictly sequential generate-and-post-process flow
//! - [`ImageCollectionPipeline`], a fan-out scrape followed by selection
//! - [`Uploader`] and storage key helpers shared by both

mod prompts;
mod scrape_select;
mod sequential;
mod upload;


pub use prompts::{parse_queries, query_user_prompt, QUERY_SYSTEM_PROMPT};
pub use scrape_select::{
    ImageCollectionInput, ImageCollectionOutput, ImageCollectionPipeline, COLLECTION_PIPELINE,
};
pub use sequential::{
    ReactionVideoInput, ReactionVideoOutput, ReactionVideoPipeline, REACTION_PIPELINE,
};
pub use upload::{
    extension_for_content_type, extension_from_url, infer_extension, storage_key, UploadTarget,
    Uploader, UPLOAD_TIMEOUT,
};
