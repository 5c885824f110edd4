//! Retrieval engine: vector index, intent classification, context assembly and prompts.

mod classifier;
mod context;
mod index;
mod intent;
mod prompt;

pub use classifier::{
    ClassificationRule, FACTUAL_PHRASES, GLOBAL_PHRASES, META_PHRASES, QueryClassifier,
    RuleCategory, VERBATIM_PHRASES,
};
pub use context::{
    BoundedContext, CONTEXT_SEPARATOR, ContextAssembler, RetrievalError, RetrievalPlan,
    limit_context,
};
pub use index::{
    Epoch, EpochSource, IndexError, IndexHandle, IndexStatus, VectorIndex, VectorRecord,
    cosine_similarity,
};
pub use intent::{Mode, QueryIntent};
pub use prompt::{
    Language, NO_RELEVANT_INFORMATION, PromptBuilder, PromptTemplate, VERBATIM_DISCLAIMER,
    annotate_answer,
};
