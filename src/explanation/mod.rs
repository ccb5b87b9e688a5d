pub mod explainer;
pub mod narrative;
pub mod tree_shap;

pub use explainer::{
    explain, global_importance_chart, Attribution, AttributionMethod, FeatureAttribution,
};
pub use narrative::{describe, level, narrate, Level};
pub use tree_shap::{forest_shap, tree_shap};
