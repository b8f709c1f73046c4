pub mod object_store;
pub mod validation;

pub use object_store::{FsObjectStore, ObjectInfo, ObjectStore};
pub use validation::{
    guess_content_type, object_name, validate_url, UploadCandidate, UploadPolicy,
    DEFAULT_MAX_UPLOAD_BYTES,
};
