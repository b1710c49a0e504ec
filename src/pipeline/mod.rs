//! Pipeline module - preprocessing stages, partitioning, evaluation and model selection

pub mod config;
pub mod correlation;
pub mod evaluate;
pub mod frame;
pub mod identifiers;
pub mod labels;
pub mod loader;
pub mod missing;
pub mod normalize;
pub mod partition;
pub mod preprocess;
pub mod profile;
pub mod run;
pub mod selection;
pub mod variance;

pub use config::{PipelineConfig, TieBreak};
pub use correlation::{CorrelatedPair, CorrelationMatrix, CorrelationPruner};
pub use evaluate::{ClassMetrics, ConfusionMatrix, Evaluator, UnknownLabelPolicy};
pub use frame::FeatureMatrix;
pub use identifiers::IdentifierStripper;
pub use labels::ClassSet;
pub use loader::{get_column_names, load_dataset, save_predictions};
pub use missing::MissingnessFilter;
pub use normalize::{DegeneratePolicy, Normalizer};
pub use partition::{stratified_split, Partition};
pub use preprocess::{Preprocessor, ReductionLog, Transform};
pub use profile::{profile_columns, ColumnStatistics};
pub use run::{run_pipeline, PipelineOutcome, PreparedData};
pub use selection::{CandidateReport, ModelSelector, SelectionOutcome};
pub use variance::{VarianceConfig, VarianceFilter, VarianceRule};
