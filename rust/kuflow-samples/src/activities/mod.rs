//! Activities executed by the sample workflows.
//!
//! Each activity is registered in a [`ActivityRegistry`] under the name the
//! workflows use to schedule it:
//!
//! | Activity                          | Module         |
//! |-----------------------------------|----------------|
//! | `KuFlow_Engine_*`                 | [`kuflow`]     |
//! | `CurrencyConversion_convert`      | [`currency`]   |
//! | `DataSource_runQuery`             | [`datasource`] |
//! | `DataSource_validateValue`        | [`datasource`] |
//! | `Email_sendMail`                  | [`email`]      |
//! | `UIVision_executeUIVisionMacro`   | [`uivision`]   |

pub mod currency;
pub mod datasource;
pub mod email;
pub mod kuflow;
pub mod uivision;

use durable_kuflow::activities::{ActivityRegistry, ActivityResult};
use kuflow_rest::{KuFlowError, KuFlowRestClient};

pub use currency::{CurrencyConversionActivity, CurrencyConverter};
pub use datasource::{DataSourceQueryActivity, DataSourceValidateValueActivity};
pub use email::{
    Email, EmailActivity, EmailRenderer, HttpRelayTransport, LogTransport, MailTransport,
};
pub use kuflow::{KuFlowActivities, KuFlowActivity};
pub use uivision::{UIVisionActivity, UIVisionSettings};

/// Turn a KuFlow client error into an activity failure.
///
/// Client errors (4xx except 408 and 429) will fail the same way on every
/// attempt and are reported as non-retryable.
pub(crate) fn kuflow_failure(operation: &str, err: &KuFlowError) -> ActivityResult {
    tracing::warn!(operation, error = %err, retryable = err.is_retryable(), "KuFlow call failed");
    ActivityResult::failure(format!("{operation}: {err}"), err.is_retryable())
}

/// Register every `KuFlow_Engine_*` activity backed by `client`.
pub fn register_kuflow_activities(registry: &mut ActivityRegistry, client: &KuFlowRestClient) {
    for activity in KuFlowActivity::all(client) {
        registry.register(activity);
    }
}

/// Register the currency conversion and mock datasource activities.
pub fn register_loan_activities(registry: &mut ActivityRegistry, converter: CurrencyConverter) {
    registry.register(CurrencyConversionActivity::new(converter));
    registry.register(DataSourceQueryActivity);
    registry.register(DataSourceValidateValueActivity);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kuflow_failure_keeps_retryability() {
        let conflict = KuFlowError::Api {
            status: 409,
            code: None,
            message: "Invalid state".to_string(),
        };
        let result = kuflow_failure("KuFlow_Engine_completeProcess", &conflict);
        assert!(result.is_non_retryable());
        assert_eq!(
            result.error_message(),
            Some("KuFlow_Engine_completeProcess: KuFlow API error 409: Invalid state")
        );

        let unavailable = KuFlowError::Api {
            status: 503,
            code: None,
            message: "Service Unavailable".to_string(),
        };
        assert!(!kuflow_failure("op", &unavailable).is_non_retryable());
    }

    #[test]
    fn test_register_loan_activities() {
        let mut registry = ActivityRegistry::new();
        let converter = CurrencyConverter::new("http://localhost:1", std::time::Duration::from_secs(1)).unwrap();
        register_loan_activities(&mut registry, converter);
        assert_eq!(
            registry.names(),
            vec![
                "CurrencyConversion_convert",
                "DataSource_runQuery",
                "DataSource_validateValue"
            ]
        );
    }
}
