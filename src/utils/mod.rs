mod slug;

pub use slug::{document_file_name, slugify, FALLBACK_FILE_NAME};
