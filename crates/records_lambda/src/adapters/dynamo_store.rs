use async_trait::async_trait;
use aws_sdk_dynamodb::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_dynamodb::types::{AttributeValue as DynamoValue, ReturnValue};
use aws_sdk_dynamodb::Client;
use records_core::contract::MAX_RECORD_BYTES;
use records_core::cursor::Cursor;
use records_core::record::{Attributes, Record, ID_ATTRIBUTE};

use super::dynamo_item::{item_to_record, key_for, record_to_item, to_dynamo};
use super::record_store::{Page, RecordStore, StoreError};

const CONDITIONAL_CHECK_FAILED: &str = "ConditionalCheckFailedException";
const TRANSIENT_ERROR_CODES: &[&str] = &[
    "ProvisionedThroughputExceededException",
    "RequestLimitExceeded",
    "ThrottlingException",
    "InternalServerError",
    "ServiceUnavailable",
    "TransactionConflictException",
];
const VALIDATION_ERROR: &str = "ValidationException";
const ID_EXISTS: &str = "attribute_exists(#id)";
const ID_ABSENT: &str = "attribute_not_exists(#id)";

/// Record store backed by a single DynamoDB table keyed by `id`.
#[derive(Clone, Debug)]
pub struct DynamoRecordStore {
    client: Client,
    table_name: String,
}

impl DynamoRecordStore {
    pub fn new(client: Client, table_name: impl Into<String>) -> Self {
        Self {
            client,
            table_name: table_name.into(),
        }
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    /// Conditional put; `condition` is checked against the existing item.
    async fn put_with_condition(
        &self,
        record: Record,
        condition: Option<&str>,
        on_condition_failed: StoreError,
    ) -> Result<Record, StoreError> {
        let mut request = self
            .client
            .put_item()
            .table_name(&self.table_name)
            .set_item(Some(record_to_item(&record)));
        if let Some(condition) = condition {
            request = request
                .condition_expression(condition)
                .expression_attribute_names("#id", ID_ATTRIBUTE);
        }

        match request.send().await {
            Ok(_) => Ok(record),
            Err(error) if is_condition_failure(&error) => Err(on_condition_failed),
            Err(error) => Err(classify_sdk_error(error)),
        }
    }
}

#[async_trait]
impl RecordStore for DynamoRecordStore {
    async fn get(&self, id: &str) -> Result<Record, StoreError> {
        let output = self
            .client
            .get_item()
            .table_name(&self.table_name)
            .set_key(Some(key_for(id)))
            .consistent_read(true)
            .send()
            .await
            .map_err(classify_sdk_error)?;

        match output.item {
            Some(item) => item_to_record(item),
            None => Err(StoreError::NotFound),
        }
    }

    async fn put(&self, record: Record) -> Result<Record, StoreError> {
        // An unconditional put never fails its condition.
        self.put_with_condition(record, None, StoreError::NotFound).await
    }

    async fn insert(&self, record: Record) -> Result<Record, StoreError> {
        self.put_with_condition(record, Some(ID_ABSENT), StoreError::AlreadyExists).await
    }

    async fn replace(&self, record: Record) -> Result<Record, StoreError> {
        self.put_with_condition(record, Some(ID_EXISTS), StoreError::NotFound).await
    }

    async fn merge(&self, id: &str, patch: Attributes) -> Result<Record, StoreError> {
        let Some(expression) = UpdateExpression::from_patch(&patch) else {
            return self.get(id).await;
        };

        let mut request = self
            .client
            .update_item()
            .table_name(&self.table_name)
            .set_key(Some(key_for(id)))
            .update_expression(expression.text)
            .condition_expression(ID_EXISTS)
            .expression_attribute_names("#id", ID_ATTRIBUTE)
            .return_values(ReturnValue::AllNew);
        for (placeholder, name) in expression.names {
            request = request.expression_attribute_names(placeholder, name);
        }
        for (placeholder, value) in expression.values {
            request = request.expression_attribute_values(placeholder, value);
        }

        let output = match request.send().await {
            Ok(output) => output,
            Err(error) if is_condition_failure(&error) => return Err(StoreError::NotFound),
            Err(error) => return Err(classify_sdk_error(error)),
        };

        match output.attributes {
            Some(item) => item_to_record(item),
            None => Err(StoreError::Corrupt(
                "update returned no attributes".to_string(),
            )),
        }
    }

    async fn delete(&self, id: &str) -> Result<(), StoreError> {
        let result = self
            .client
            .delete_item()
            .table_name(&self.table_name)
            .set_key(Some(key_for(id)))
            .condition_expression(ID_EXISTS)
            .expression_attribute_names("#id", ID_ATTRIBUTE)
            .send()
            .await;

        match result {
            Ok(_) => Ok(()),
            Err(error) if is_condition_failure(&error) => Err(StoreError::NotFound),
            Err(error) => Err(classify_sdk_error(error)),
        }
    }

    async fn list(&self, limit: usize, cursor: Option<&Cursor>) -> Result<Page, StoreError> {
        let limit = i32::try_from(limit).unwrap_or(i32::MAX);
        let output = self
            .client
            .scan()
            .table_name(&self.table_name)
            .limit(limit)
            .consistent_read(true)
            .set_exclusive_start_key(cursor.map(|cursor| key_for(cursor.last_id())))
            .send()
            .await
            .map_err(classify_sdk_error)?;

        let records = output
            .items
            .unwrap_or_default()
            .into_iter()
            .map(item_to_record)
            .collect::<Result<Vec<_>, _>>()?;

        let next_cursor = match output.last_evaluated_key {
            Some(mut key) => match key.remove(ID_ATTRIBUTE) {
                Some(DynamoValue::S(last_id)) => Some(Cursor::after(last_id)),
                _ => {
                    return Err(StoreError::Corrupt(
                        "scan returned a key without a string id".to_string(),
                    ))
                }
            },
            None => None,
        };

        Ok(Page {
            records,
            next_cursor,
        })
    }
}

/// `SET`/`REMOVE` expression built from a patch with positional placeholders,
/// so attribute names never collide with DynamoDB reserved words.
#[derive(Debug, PartialEq)]
struct UpdateExpression {
    text: String,
    names: Vec<(String, String)>,
    values: Vec<(String, DynamoValue)>,
}

impl UpdateExpression {
    fn from_patch(patch: &Attributes) -> Option<Self> {
        if patch.is_empty() {
            return None;
        }

        let mut sets = Vec::new();
        let mut removes = Vec::new();
        let mut names = Vec::with_capacity(patch.len());
        let mut values = Vec::new();

        for (index, (name, value)) in patch.iter().enumerate() {
            let name_placeholder = format!("#a{index}");
            if value.is_null() {
                removes.push(name_placeholder.clone());
            } else {
                let value_placeholder = format!(":v{index}");
                sets.push(format!("{name_placeholder} = {value_placeholder}"));
                values.push((value_placeholder, to_dynamo(value)));
            }
            names.push((name_placeholder, name.clone()));
        }

        let mut clauses = Vec::new();
        if !sets.is_empty() {
            clauses.push(format!("SET {}", sets.join(", ")));
        }
        if !removes.is_empty() {
            clauses.push(format!("REMOVE {}", removes.join(", ")));
        }

        Some(Self {
            text: clauses.join(" "),
            names,
            values,
        })
    }
}

fn is_condition_failure<E, R>(error: &SdkError<E, R>) -> bool
where
    E: ProvideErrorMetadata,
{
    match error {
        SdkError::ServiceError(context) => context.err().code() == Some(CONDITIONAL_CHECK_FAILED),
        _ => false,
    }
}

/// Splits SDK failures into transient ones (retried) and everything else.
fn classify_sdk_error<E, R>(error: SdkError<E, R>) -> StoreError
where
    E: ProvideErrorMetadata + std::error::Error + 'static,
    R: std::fmt::Debug,
{
    let message = DisplayErrorContext(&error).to_string();
    match &error {
        SdkError::TimeoutError(_) | SdkError::DispatchFailure(_) | SdkError::ResponseError(_) => {
            StoreError::Unavailable(message)
        }
        SdkError::ServiceError(context) => match context.err().code() {
            Some(code) if TRANSIENT_ERROR_CODES.contains(&code) => {
                StoreError::Unavailable(message)
            }
            Some(VALIDATION_ERROR) => match caller_fault(context.err().message()) {
                Some(reason) => StoreError::Invalid(reason),
                None => StoreError::Rejected(message),
            },
            _ => StoreError::Rejected(message),
        },
        _ => StoreError::Rejected(message),
    }
}

/// Validation failures caused by the record's content rather than by the
/// request this adapter built.
fn caller_fault(message: Option<&str>) -> Option<String> {
    let message = message?;
    if message.contains("Item size") {
        return Some(format!("record exceeds {MAX_RECORD_BYTES} bytes"));
    }
    if ["Number overflow", "Number underflow", "significant digits"]
        .iter()
        .any(|marker| message.contains(marker))
    {
        return Some("record holds a number outside the storable range".to_string());
    }
    None
}
