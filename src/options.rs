//! Execution behavior flags.

use serde::{Deserialize, Serialize};

/// Flags that change how a plan is executed.
///
/// Deserializes from the camelCase JSON the surrounding application
/// stores; missing keys take their defaults.
///
/// # Examples
///
/// ```rust
/// use gachaplan::ExecutionOptions;
///
/// let options: ExecutionOptions =
///     serde_json::from_str(r#"{"allowOutOfStockGuaranteeItem": true}"#).unwrap();
/// assert!(options.allow_out_of_stock_guarantee_item);
/// assert!(!options.include_out_of_stock_in_complete);
/// assert!(options.apply_lower_threshold_guarantees);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ExecutionOptions {
    /// Complete sets also hand out items whose stock is exhausted.
    pub include_out_of_stock_in_complete: bool,
    /// Guarantees may hand out a depleted item when it has a finite cap.
    pub allow_out_of_stock_guarantee_item: bool,
    /// Every met guarantee applies, not only those at the highest met
    /// threshold.
    pub apply_lower_threshold_guarantees: bool,
}

impl Default for ExecutionOptions {
    fn default() -> Self {
        Self {
            include_out_of_stock_in_complete: false,
            allow_out_of_stock_guarantee_item: false,
            apply_lower_threshold_guarantees: true,
        }
    }
}

impl ExecutionOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn include_out_of_stock_in_complete(mut self, value: bool) -> Self {
        self.include_out_of_stock_in_complete = value;
        self
    }

    pub fn allow_out_of_stock_guarantee_item(mut self, value: bool) -> Self {
        self.allow_out_of_stock_guarantee_item = value;
        self
    }

    pub fn apply_lower_threshold_guarantees(mut self, value: bool) -> Self {
        self.apply_lower_threshold_guarantees = value;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_empty_json() {
        let options: ExecutionOptions = serde_json::from_str("{}").unwrap();
        assert_eq!(options, ExecutionOptions::default());
    }

    #[test]
    fn test_builder() {
        let options = ExecutionOptions::new()
            .include_out_of_stock_in_complete(true)
            .apply_lower_threshold_guarantees(false);
        assert!(options.include_out_of_stock_in_complete);
        assert!(!options.apply_lower_threshold_guarantees);
        assert!(!options.allow_out_of_stock_guarantee_item);
    }
}
