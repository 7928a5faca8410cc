//! Translation between records and DynamoDB items.
//!
//! The partition key is stored as `id` (`S`); every other attribute is stored
//! verbatim as a non-key field of the same item.

use std::collections::HashMap;

use aws_sdk_dynamodb::types::AttributeValue as DynamoValue;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use records_core::record::{AttributeValue, Attributes, Record, ID_ATTRIBUTE};
use serde_json::Number;

use super::record_store::StoreError;

pub type Item = HashMap<String, DynamoValue>;

pub fn key_for(id: &str) -> Item {
    HashMap::from([(ID_ATTRIBUTE.to_string(), DynamoValue::S(id.to_string()))])
}

pub fn record_to_item(record: &Record) -> Item {
    let mut item: Item = record
        .attributes
        .iter()
        .map(|(name, value)| (name.clone(), to_dynamo(value)))
        .collect();
    item.insert(ID_ATTRIBUTE.to_string(), DynamoValue::S(record.id.clone()));
    item
}

pub fn item_to_record(mut item: Item) -> Result<Record, StoreError> {
    let id = match item.remove(ID_ATTRIBUTE) {
        Some(DynamoValue::S(id)) if !id.is_empty() => id,
        Some(_) => return Err(StoreError::Corrupt("id is not a non-empty string".to_string())),
        None => return Err(StoreError::Corrupt("item has no id".to_string())),
    };

    let attributes = item
        .into_iter()
        .map(|(name, value)| from_dynamo(value).map(|value| (name, value)))
        .collect::<Result<Attributes, StoreError>>()?;

    Ok(Record::new(id, attributes))
}

pub fn to_dynamo(value: &AttributeValue) -> DynamoValue {
    match value {
        AttributeValue::Null => DynamoValue::Null(true),
        AttributeValue::Bool(flag) => DynamoValue::Bool(*flag),
        AttributeValue::Number(number) => DynamoValue::N(number.to_string()),
        AttributeValue::String(text) => DynamoValue::S(text.clone()),
        AttributeValue::List(values) => DynamoValue::L(values.iter().map(to_dynamo).collect()),
        AttributeValue::Map(fields) => DynamoValue::M(
            fields
                .iter()
                .map(|(name, value)| (name.clone(), to_dynamo(value)))
                .collect(),
        ),
    }
}

pub fn from_dynamo(value: DynamoValue) -> Result<AttributeValue, StoreError> {
    Ok(match value {
        DynamoValue::Null(_) => AttributeValue::Null,
        DynamoValue::Bool(flag) => AttributeValue::Bool(flag),
        DynamoValue::N(text) => AttributeValue::Number(parse_number(&text)?),
        DynamoValue::S(text) => AttributeValue::String(text),
        DynamoValue::L(values) => AttributeValue::List(
            values
                .into_iter()
                .map(from_dynamo)
                .collect::<Result<_, _>>()?,
        ),
        DynamoValue::M(fields) => AttributeValue::Map(
            fields
                .into_iter()
                .map(|(name, value)| from_dynamo(value).map(|value| (name, value)))
                .collect::<Result<_, _>>()?,
        ),
        DynamoValue::Ss(values) => {
            AttributeValue::List(values.into_iter().map(AttributeValue::String).collect())
        }
        DynamoValue::Ns(values) => AttributeValue::List(
            values
                .iter()
                .map(|text| parse_number(text).map(AttributeValue::Number))
                .collect::<Result<_, _>>()?,
        ),
        DynamoValue::B(blob) => AttributeValue::String(STANDARD.encode(blob.as_ref())),
        DynamoValue::Bs(blobs) => AttributeValue::List(
            blobs
                .iter()
                .map(|blob| AttributeValue::String(STANDARD.encode(blob.as_ref())))
                .collect(),
        ),
        other => {
            return Err(StoreError::Corrupt(format!(
                "unsupported attribute type: {other:?}"
            )))
        }
    })
}

/// DynamoDB numbers arrive as decimal strings; integers stay integers.
fn parse_number(text: &str) -> Result<Number, StoreError> {
    if let Ok(integer) = text.parse::<i64>() {
        return Ok(Number::from(integer));
    }
    if let Ok(integer) = text.parse::<u64>() {
        return Ok(Number::from(integer));
    }
    text.parse::<f64>()
        .ok()
        .and_then(Number::from_f64)
        .ok_or_else(|| StoreError::Corrupt(format!("invalid number '{text}'")))
}

#[cfg(test)]
mod tests {
    use aws_sdk_dynamodb::primitives::Blob;
    use serde_json::json;

    use super::*;

    #[test]
    fn item_carries_id_as_partition_key() {
        let record = Record::new(
            "r-1",
            Attributes::from([("name".to_string(), AttributeValue::from("a"))]),
        );

        let item = record_to_item(&record);

        assert_eq!(item.get("id"), Some(&DynamoValue::S("r-1".to_string())));
        assert_eq!(item.get("name"), Some(&DynamoValue::S("a".to_string())));
        assert_eq!(item_to_record(item).expect("item should decode"), record);
    }

    #[test]
    fn nested_values_survive_translation() {
        let value = AttributeValue::from(json!({
            "list": [1, 2.5, "x", null, false],
            "map": {"inner": {"deep": true}},
        }));

        assert_eq!(from_dynamo(to_dynamo(&value)).expect("decode"), value);
    }

    #[test]
    fn foreign_set_and_binary_types_decode_as_lists_and_strings() {
        let decoded = from_dynamo(DynamoValue::Ss(vec!["a".to_string(), "b".to_string()]))
            .expect("string set should decode");
        assert_eq!(decoded, AttributeValue::from(json!(["a", "b"])));

        let decoded = from_dynamo(DynamoValue::Ns(vec!["1".to_string(), "1.5".to_string()]))
            .expect("number set should decode");
        assert_eq!(decoded, AttributeValue::from(json!([1, 1.5])));

        let decoded =
            from_dynamo(DynamoValue::B(Blob::new(b"hi".to_vec()))).expect("binary should decode");
        assert_eq!(decoded, AttributeValue::from("aGk="));
    }

    #[test]
    fn rejects_items_without_usable_id() {
        assert!(matches!(
            item_to_record(Item::new()),
            Err(StoreError::Corrupt(_))
        ));

        let item = HashMap::from([("id".to_string(), DynamoValue::N("1".to_string()))]);
        assert!(matches!(item_to_record(item), Err(StoreError::Corrupt(_))));
    }

    #[test]
    fn rejects_invalid_numbers() {
        assert!(matches!(
            from_dynamo(DynamoValue::N("NaN-ish".to_string())),
            Err(StoreError::Corrupt(_))
        ));
    }
}
