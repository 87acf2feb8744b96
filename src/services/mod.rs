pub mod comment_reader;
pub mod llm_service;
pub mod pdf_text;

pub use comment_reader::{CommentSource, FileCommentSource};
pub use llm_service::{GenerationRequest, OpenAiGenerator, TextGenerator};
pub use pdf_text::{PdfExtractor, TextDirExtractor};
