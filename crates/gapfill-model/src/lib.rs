pub mod error;
pub mod method;
pub mod settings;
pub mod variable;

pub use error::{GapfillError, Result};
pub use method::{FillMethod, MethodMap};
pub use settings::{GroupBySpec, ImputeSettings, SettingsFile};
pub use variable::{VariableCatalog, VariableSpec, parse_flag};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn variable_spec_serde_round_trip() {
        let spec = VariableSpec::of_type("percentage")
            .with_filter("internet == 1")
            .with_impute_method(FillMethod::Mean);
        let json = serde_json::to_string(&spec).unwrap();
        assert!(json.contains("\"type\":\"percentage\""));
        assert!(json.contains("\"impute_method\":\"mean\""));
        let back: VariableSpec = serde_json::from_str(&json).unwrap();
        assert_eq!(back, spec);
    }
}
