//! Mock datasource activities over a static product catalogue.
//!
//! `DataSource_runQuery` pages through the catalogue filtered by label and
//! `DataSource_validateValue` checks submitted selections against it.

pub mod mocks;

use async_trait::async_trait;
use durable_kuflow::activities::{Activity, ActivityContext, ActivityResult};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use uuid::Uuid;

use mocks::{is_known_product, Product, MOCK_PRODUCTS};

/// Query activity name.
pub const RUN_QUERY: &str = "DataSource_runQuery";

/// Validation activity name.
pub const VALIDATE_VALUE: &str = "DataSource_validateValue";

/// Input of [`RUN_QUERY`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataSourceQueryRequest {
    #[serde(default)]
    pub tenant_id: Option<Uuid>,
    /// Datasource code, only logged.
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub query: Option<String>,
    #[serde(default)]
    pub page_number: Option<i64>,
    #[serde(default)]
    pub page_size: Option<i64>,
    #[serde(default)]
    pub context: Option<Map<String, Value>>,
}

/// Output of [`RUN_QUERY`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataSourceQueryResponse {
    pub page_number: u64,
    pub page_size: u64,
    pub total_elements: u64,
    pub total_pages: u64,
    pub items: Vec<Value>,
}

/// Input of [`VALIDATE_VALUE`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataSourceValidateValueRequest {
    #[serde(default)]
    pub tenant_id: Option<Uuid>,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub values: Vec<Value>,
}

/// Validation outcome of one submitted value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataSourceValidateValueResult {
    pub valid: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Output of [`VALIDATE_VALUE`], one result per submitted value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataSourceValidateValueResponse {
    pub validations: Vec<DataSourceValidateValueResult>,
}

/// Invalid query parameters.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DataSourceError {
    #[error("Pagination is required: {0} must be specified")]
    MissingPagination(&'static str),

    #[error("Invalid pageNumber: must be >= 0, got {0}")]
    InvalidPageNumber(i64),

    #[error("Invalid pageSize: must be > 0, got {0}")]
    InvalidPageSize(i64),
}

fn page_number(value: Option<i64>) -> Result<u64, DataSourceError> {
    let value = value.ok_or(DataSourceError::MissingPagination("pageNumber"))?;
    u64::try_from(value).map_err(|_| DataSourceError::InvalidPageNumber(value))
}

fn page_size(value: Option<i64>) -> Result<u64, DataSourceError> {
    let value = value.ok_or(DataSourceError::MissingPagination("pageSize"))?;
    match u64::try_from(value) {
        Ok(size) if size > 0 => Ok(size),
        _ => Err(DataSourceError::InvalidPageSize(value)),
    }
}

/// Products whose label contains `query`, ignoring case and surrounding
/// whitespace. A blank query matches everything.
pub fn filter_products<'a>(products: &'a [Product], query: Option<&str>) -> Vec<&'a Product> {
    let needle = query.map(str::trim).unwrap_or_default().to_lowercase();
    if needle.is_empty() {
        return products.iter().collect();
    }
    products
        .iter()
        .filter(|p| p.label.to_lowercase().contains(&needle))
        .collect()
}

/// Run a paged query over the catalogue.
pub fn run_query(request: &DataSourceQueryRequest) -> Result<DataSourceQueryResponse, DataSourceError> {
    let page_number = page_number(request.page_number)?;
    let page_size = page_size(request.page_size)?;

    let filtered = filter_products(MOCK_PRODUCTS, request.query.as_deref());
    let total = filtered.len() as u64;
    let total_pages = total.div_ceil(page_size);

    let start = usize::try_from(page_number.saturating_mul(page_size)).unwrap_or(usize::MAX);
    let items = if start >= filtered.len() {
        tracing::debug!(page_number, "Page out of range, returning empty list");
        Vec::new()
    } else {
        let take = usize::try_from(page_size).unwrap_or(usize::MAX);
        filtered
            .iter()
            .skip(start)
            .take(take)
            .map(|p| p.to_json())
            .collect()
    };

    Ok(DataSourceQueryResponse {
        page_number,
        page_size,
        total_elements: total,
        total_pages,
        items,
    })
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Validate one submitted value: an object whose `id` names a product.
pub fn validate_value(value: &Value) -> DataSourceValidateValueResult {
    let invalid = |message: String| DataSourceValidateValueResult {
        valid: false,
        message: Some(message),
    };

    let Value::Object(item) = value else {
        return invalid(format!("Invalid value type. Got {}", json_type_name(value)));
    };

    let id = match item.get("id") {
        Some(Value::String(s)) => s.trim().to_string(),
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    };
    if id.is_empty() {
        return invalid("Value map does not contain a valid 'id' key".to_string());
    }
    if !is_known_product(&id) {
        return invalid(format!("Product ID '{id}' not found in data source"));
    }

    DataSourceValidateValueResult {
        valid: true,
        message: None,
    }
}

/// `DataSource_runQuery` activity.
#[derive(Debug, Clone, Copy, Default)]
pub struct DataSourceQueryActivity;

#[async_trait]
impl Activity for DataSourceQueryActivity {
    fn name(&self) -> &'static str {
        RUN_QUERY
    }

    async fn execute(&self, _ctx: &ActivityContext, input: Value) -> ActivityResult {
        let request: DataSourceQueryRequest = match ActivityResult::parse_input(input) {
            Ok(r) => r,
            Err(failure) => return failure,
        };
        let code = request.code.as_deref().unwrap_or_default();
        tracing::info!(code, "Started data source query");

        match run_query(&request) {
            Ok(response) => {
                tracing::info!(
                    code,
                    page = response.page_number,
                    items = response.items.len(),
                    total = response.total_elements,
                    "Finished data source query"
                );
                ActivityResult::success(response)
            }
            Err(e) => {
                tracing::error!(code, error = %e, "Invalid data source query");
                ActivityResult::non_retryable(format!("validation: {e}"))
            }
        }
    }
}

/// `DataSource_validateValue` activity.
#[derive(Debug, Clone, Copy, Default)]
pub struct DataSourceValidateValueActivity;

#[async_trait]
impl Activity for DataSourceValidateValueActivity {
    fn name(&self) -> &'static str {
        VALIDATE_VALUE
    }

    async fn execute(&self, _ctx: &ActivityContext, input: Value) -> ActivityResult {
        let request: DataSourceValidateValueRequest = match ActivityResult::parse_input(input) {
            Ok(r) => r,
            Err(failure) => return failure,
        };

        let validations: Vec<_> = request.values.iter().map(validate_value).collect();
        tracing::info!(
            code = request.code.as_deref().unwrap_or_default(),
            valid = validations.iter().filter(|v| v.valid).count(),
            total = validations.len(),
            "Finished data source validation"
        );
        ActivityResult::success(DataSourceValidateValueResponse { validations })
    }
}
