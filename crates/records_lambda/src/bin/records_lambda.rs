use aws_config::retry::RetryConfig;
use aws_config::BehaviorVersion;
use lambda_runtime::{service_fn, Error, LambdaEvent};
use records_lambda::adapters::dynamo_store::DynamoRecordStore;
use records_lambda::adapters::retrying::RetryingStore;
use records_lambda::config::RuntimeConfig;
use records_lambda::handlers::gateway::{ApiGatewayResponse, Entrypoint};
use records_lambda::handlers::records::RecordHandler;
use records_lambda::logging::init_logging;
use serde_json::Value;
use tracing::Instrument;

type RecordsEntrypoint = Entrypoint<RetryingStore<DynamoRecordStore>>;

async fn build_entrypoint(config: RuntimeConfig) -> RecordsEntrypoint {
    // Store calls are retried by `RetryingStore`; the SDK must not retry underneath it.
    let aws_config = aws_config::defaults(BehaviorVersion::latest())
        .retry_config(RetryConfig::disabled())
        .load()
        .await;
    let dynamo = DynamoRecordStore::new(
        aws_sdk_dynamodb::Client::new(&aws_config),
        config.table_name,
    );
    let store = RetryingStore::new(dynamo, config.retry);

    Entrypoint::new(
        RecordHandler::new(store, config.page_limits),
        config.ignore_stage_in_path,
    )
}

async fn handle_request(
    entrypoint: &RecordsEntrypoint,
    event: LambdaEvent<Value>,
) -> Result<ApiGatewayResponse, Error> {
    let span = tracing::info_span!("invocation", request_id = %event.context.request_id);
    Ok(entrypoint.handle_event(event.payload).instrument(span).await)
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    init_logging();

    let config = RuntimeConfig::from_env()?;
    tracing::info!(
        table = %config.table_name,
        max_attempts = config.retry.max_attempts,
        timeout_ms = config.retry.attempt_timeout.as_millis() as u64,
        "starting record service"
    );

    let entrypoint = build_entrypoint(config).await;
    lambda_runtime::run(service_fn(|event| handle_request(&entrypoint, event))).await
}
