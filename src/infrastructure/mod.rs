// External collaborators: session storage, language model, document retrieval

pub mod llm;
pub mod retrieval;
pub mod storage;
